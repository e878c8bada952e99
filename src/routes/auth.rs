use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::middleware::{from_fn, from_fn_with_state};
use axum::routing::{get, patch, post};
use axum::{Extension, Json, Router};
use serde::{Deserialize, Serialize};
use sqlx::{Postgres, QueryBuilder, Row, Transaction};
use time::Date;
use uuid::Uuid;

use crate::domain::appointment::{format_date, parse_date};
use crate::domain::profile::{DoctorDetails, SubProfile};
use crate::domain::user::{Gender, Role, User};
use crate::middleware;
use crate::routes::{require_field, MessageResponse};
use crate::security::jwt::Claims;
use crate::security::password;
use crate::state::AppState;
use crate::ApiError;

const REGISTER_ERROR: &str = "An error occurred while creating the user";
const UPDATE_USER_ERROR: &str = "An error occurred while updating the user";
const DELETE_USER_ERROR: &str = "An error occurred while deleting the user";
const EMAIL_TAKEN: &str = "Email already registered";
const INVALID_CREDENTIALS: &str = "Invalid credentials";
const USER_NOT_FOUND: &str = "User not found";

pub fn router(state: Arc<AppState>) -> Router<Arc<AppState>> {
    let public = Router::new()
        .route("/api/auth/register", post(register))
        .route("/api/auth/login", post(login));

    let current = Router::new()
        .route("/api/auth/user", get(current_user))
        .route_layer(from_fn_with_state(
            state.clone(),
            middleware::auth::require_auth,
        ));

    // require_auth is added last so it wraps the admin gate and runs first.
    let admin = Router::new()
        .route("/api/auth/user/{id}", patch(update_user).delete(delete_user))
        .route_layer(from_fn(middleware::admin::require_admin))
        .route_layer(from_fn_with_state(state, middleware::auth::require_auth));

    public.merge(current).merge(admin)
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RegisterPayload {
    email: Option<String>,
    password: Option<String>,
    first_name: Option<String>,
    last_name: Option<String>,
    gender: Option<String>,
    age: Option<i32>,
    contact_num: Option<String>,
    profile_pic: Option<String>,
    role: Option<String>,
    date_of_birth: Option<String>,
    specialization: Option<String>,
    experience_years: Option<i32>,
    availability: Option<String>,
}

/// A payload with every required field present, still unvalidated.
#[derive(Debug)]
struct CompleteRegistration {
    email: String,
    password: String,
    first_name: String,
    last_name: String,
    gender: String,
    age: i32,
    contact_num: String,
    profile_pic: String,
    role: String,
    date_of_birth: String,
    doctor_details: DoctorDetails,
}

/// Presence check in documented field order; the first gap names its field.
fn require_fields(payload: RegisterPayload) -> Result<CompleteRegistration, ApiError> {
    Ok(CompleteRegistration {
        email: require_field(payload.email, "email")?,
        password: require_field(payload.password, "password")?,
        first_name: require_field(payload.first_name, "firstName")?,
        last_name: require_field(payload.last_name, "lastName")?,
        gender: require_field(payload.gender, "gender")?,
        age: require_field(payload.age, "age")?,
        contact_num: require_field(payload.contact_num, "contactNum")?,
        profile_pic: require_field(payload.profile_pic, "profilePic")?,
        role: require_field(payload.role, "role")?,
        date_of_birth: require_field(payload.date_of_birth, "dateOfBirth")?,
        doctor_details: DoctorDetails {
            specialization: payload.specialization,
            experience_years: payload.experience_years,
            availability: payload.availability,
        },
    })
}

#[derive(Debug)]
struct ValidRegistration {
    email: String,
    password: String,
    first_name: String,
    last_name: String,
    gender: Gender,
    age: i32,
    contact_num: String,
    profile_pic: String,
    role: Role,
    date_of_birth: Date,
    doctor_details: DoctorDetails,
}

/// Enum and format checks. Runs after the duplicate-email lookup so a payload
/// that is wrong in several ways reports errors in the documented order.
fn validate_registration(complete: CompleteRegistration) -> Result<ValidRegistration, ApiError> {
    let role = Role::parse(&complete.role)
        .ok_or_else(|| ApiError::Validation("Invalid role".into()))?;
    let gender = Gender::parse(&complete.gender)
        .ok_or_else(|| ApiError::Validation("Invalid gender".into()))?;
    let date_of_birth = parse_date(&complete.date_of_birth)?;
    Ok(ValidRegistration {
        email: complete.email,
        password: complete.password,
        first_name: complete.first_name,
        last_name: complete.last_name,
        gender,
        age: complete.age,
        contact_num: complete.contact_num,
        profile_pic: complete.profile_pic,
        role,
        date_of_birth,
        doctor_details: complete.doctor_details,
    })
}

async fn register(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<RegisterPayload>,
) -> Result<(StatusCode, Json<MessageResponse>), ApiError> {
    let complete = require_fields(payload)?;

    let existing = sqlx::query("SELECT id FROM users WHERE email = $1")
        .bind(&complete.email)
        .fetch_optional(&state.db)
        .await
        .map_err(ApiError::db(REGISTER_ERROR))?;
    if existing.is_some() {
        return Err(ApiError::Conflict(EMAIL_TAKEN.into()));
    }

    let valid = validate_registration(complete)?;
    let password_hash =
        password::hash_password(&valid.password).map_err(|e| ApiError::Internal(e.to_string()))?;

    let user_id = Uuid::new_v4();
    let sub_profile = SubProfile::for_role(valid.role, user_id, valid.doctor_details);

    let mut tx = state.db.begin().await.map_err(ApiError::db(REGISTER_ERROR))?;
    sqlx::query(
        "INSERT INTO users (id, email, password_hash, first_name, last_name, gender, age, \
         contact_num, profile_pic, date_of_birth, role) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)",
    )
    .bind(user_id)
    .bind(&valid.email)
    .bind(&password_hash)
    .bind(&valid.first_name)
    .bind(&valid.last_name)
    .bind(valid.gender.as_str())
    .bind(valid.age)
    .bind(&valid.contact_num)
    .bind(&valid.profile_pic)
    .bind(valid.date_of_birth)
    .bind(valid.role.as_str())
    .execute(&mut *tx)
    .await
    .map_err(map_email_conflict(REGISTER_ERROR))?;

    insert_sub_profile(&mut tx, &sub_profile)
        .await
        .map_err(ApiError::db(REGISTER_ERROR))?;
    link_sub_profile(&mut tx, user_id, &sub_profile)
        .await
        .map_err(ApiError::db(REGISTER_ERROR))?;
    tx.commit().await.map_err(ApiError::db(REGISTER_ERROR))?;

    tracing::info!(%user_id, role = valid.role.as_str(), "user registered");
    Ok((
        StatusCode::CREATED,
        Json(MessageResponse {
            message: "User created successfully".into(),
        }),
    ))
}

/// The pre-write uniqueness checks race with concurrent writers; the unique
/// index is what actually decides, so its violation maps to the same conflict
/// answer whether the email arrives by insert or by update.
fn map_email_conflict(context: &'static str) -> impl FnOnce(sqlx::Error) -> ApiError {
    move |err| {
        if let sqlx::Error::Database(db_err) = &err {
            if db_err.constraint() == Some("users_email_key") {
                return ApiError::Conflict(EMAIL_TAKEN.into());
            }
        }
        ApiError::db(context)(err)
    }
}

async fn insert_sub_profile(
    tx: &mut Transaction<'_, Postgres>,
    sub_profile: &SubProfile,
) -> Result<(), sqlx::Error> {
    match sub_profile {
        SubProfile::Doctor(doctor) => {
            sqlx::query(
                "INSERT INTO doctors (id, user_id, specialization, experience_years, availability) \
                 VALUES ($1, $2, $3, $4, $5)",
            )
            .bind(doctor.id)
            .bind(doctor.user_id)
            .bind(&doctor.specialization)
            .bind(doctor.experience_years)
            .bind(&doctor.availability)
            .execute(&mut **tx)
            .await?;
        }
        SubProfile::Patient(patient) => {
            sqlx::query("INSERT INTO patients (id, user_id) VALUES ($1, $2)")
                .bind(patient.id)
                .bind(patient.user_id)
                .execute(&mut **tx)
                .await?;
        }
        SubProfile::Admin(admin) => {
            sqlx::query("INSERT INTO admins (id, user_id) VALUES ($1, $2)")
                .bind(admin.id)
                .bind(admin.user_id)
                .execute(&mut **tx)
                .await?;
        }
    }
    Ok(())
}

async fn link_sub_profile(
    tx: &mut Transaction<'_, Postgres>,
    user_id: Uuid,
    sub_profile: &SubProfile,
) -> Result<(), sqlx::Error> {
    let query = match sub_profile {
        SubProfile::Doctor(_) => "UPDATE users SET doctor_id = $1 WHERE id = $2",
        SubProfile::Patient(_) => "UPDATE users SET patient_id = $1 WHERE id = $2",
        SubProfile::Admin(_) => "UPDATE users SET admin_id = $1 WHERE id = $2",
    };
    sqlx::query(query)
        .bind(sub_profile.id())
        .bind(user_id)
        .execute(&mut **tx)
        .await?;
    Ok(())
}

#[derive(Deserialize)]
struct LoginPayload {
    email: Option<String>,
    password: Option<String>,
}

/// Public profile snapshot. Shared with the appointment routes for the
/// embedded patient object.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileResponse {
    pub id: Uuid,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub profile_pic: Option<String>,
    pub contact_num: Option<String>,
    pub age: Option<i32>,
    pub gender: Option<String>,
    pub date_of_birth: Option<String>,
    pub role: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub doctor_id: Option<Uuid>,
}

fn profile_response(user: &User, doctor_id: Option<Uuid>) -> ProfileResponse {
    ProfileResponse {
        id: user.id,
        email: user.email.clone(),
        first_name: user.first_name.clone(),
        last_name: user.last_name.clone(),
        profile_pic: user.profile_pic.clone(),
        contact_num: user.contact_num.clone(),
        age: user.age,
        gender: user.gender.clone(),
        date_of_birth: user.date_of_birth.map(format_date),
        role: user.role.clone(),
        doctor_id,
    }
}

#[derive(Serialize)]
struct LoginResponse {
    token: String,
    #[serde(flatten)]
    profile: ProfileResponse,
}

async fn login(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<LoginPayload>,
) -> Result<Json<LoginResponse>, ApiError> {
    let email = require_field(payload.email, "email")?;
    let plain = require_field(payload.password, "password")?;

    // A missing account and a wrong password answer identically.
    let Some(user) = fetch_user_by_email(&state, &email).await? else {
        return Err(ApiError::Unauthorized(INVALID_CREDENTIALS.into()));
    };
    let matches = password::verify_password(&plain, &user.password_hash)
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    if !matches {
        return Err(ApiError::Unauthorized(INVALID_CREDENTIALS.into()));
    }

    let role = parse_stored_role(&user.role)?;
    let doctor_id = match role {
        Role::Doctor => linked_doctor_id(&state, user.id).await?,
        _ => None,
    };
    let token = state
        .jwt
        .issue(user.id, role, &user.email, doctor_id)
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    tracing::debug!(user_id = %user.id, "login succeeded");
    Ok(Json(LoginResponse {
        token,
        profile: profile_response(&user, doctor_id),
    }))
}

async fn current_user(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<ProfileResponse>, ApiError> {
    let user = fetch_user_by_id(&state, claims.id)
        .await?
        .ok_or_else(|| ApiError::NotFound(USER_NOT_FOUND.into()))?;

    // The doctorId claim can be a week stale; read the link fresh.
    let role = parse_stored_role(&user.role)?;
    let doctor_id = match role {
        Role::Doctor => linked_doctor_id(&state, user.id).await?,
        _ => None,
    };
    Ok(Json(profile_response(&user, doctor_id)))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateUserPayload {
    email: Option<String>,
    first_name: Option<String>,
    last_name: Option<String>,
    gender: Option<String>,
    age: Option<i32>,
    contact_num: Option<String>,
    profile_pic: Option<String>,
    date_of_birth: Option<String>,
    role: Option<String>,
}

#[derive(Debug)]
struct UserChanges {
    email: Option<String>,
    first_name: Option<String>,
    last_name: Option<String>,
    gender: Option<Gender>,
    age: Option<i32>,
    contact_num: Option<String>,
    profile_pic: Option<String>,
    date_of_birth: Option<Date>,
    role: Option<Role>,
}

impl UserChanges {
    /// Re-validates enums and formats; absent fields stay untouched. An
    /// effectively empty payload is an error, not a silent success.
    fn from_payload(payload: UpdateUserPayload) -> Result<UserChanges, ApiError> {
        let gender = match payload.gender {
            Some(raw) => Some(
                Gender::parse(&raw).ok_or_else(|| ApiError::Validation("Invalid gender".into()))?,
            ),
            None => None,
        };
        let role = match payload.role {
            Some(raw) => {
                Some(Role::parse(&raw).ok_or_else(|| ApiError::Validation("Invalid role".into()))?)
            }
            None => None,
        };
        let date_of_birth = payload
            .date_of_birth
            .as_deref()
            .map(parse_date)
            .transpose()?;

        let changes = UserChanges {
            email: payload.email,
            first_name: payload.first_name,
            last_name: payload.last_name,
            gender,
            age: payload.age,
            contact_num: payload.contact_num,
            profile_pic: payload.profile_pic,
            date_of_birth,
            role,
        };
        if changes.is_empty() {
            return Err(ApiError::Validation("No update parameters provided".into()));
        }
        Ok(changes)
    }

    fn is_empty(&self) -> bool {
        self.email.is_none()
            && self.first_name.is_none()
            && self.last_name.is_none()
            && self.gender.is_none()
            && self.age.is_none()
            && self.contact_num.is_none()
            && self.profile_pic.is_none()
            && self.date_of_birth.is_none()
            && self.role.is_none()
    }
}

async fn update_user(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateUserPayload>,
) -> Result<Json<MessageResponse>, ApiError> {
    let target = sqlx::query("SELECT id FROM users WHERE id = $1")
        .bind(id)
        .fetch_optional(&state.db)
        .await
        .map_err(ApiError::db(UPDATE_USER_ERROR))?;
    if target.is_none() {
        return Err(ApiError::NotFound(USER_NOT_FOUND.into()));
    }

    let changes = UserChanges::from_payload(payload)?;

    if let Some(email) = &changes.email {
        let taken = sqlx::query("SELECT id FROM users WHERE email = $1 AND id <> $2")
            .bind(email)
            .bind(id)
            .fetch_optional(&state.db)
            .await
            .map_err(ApiError::db(UPDATE_USER_ERROR))?;
        if taken.is_some() {
            return Err(ApiError::Conflict(EMAIL_TAKEN.into()));
        }
    }

    let UserChanges {
        email,
        first_name,
        last_name,
        gender,
        age,
        contact_num,
        profile_pic,
        date_of_birth,
        role,
    } = changes;

    let mut builder = QueryBuilder::<Postgres>::new("UPDATE users SET ");
    {
        let mut fields = builder.separated(", ");
        if let Some(email) = email {
            fields.push("email = ").push_bind_unseparated(email);
        }
        if let Some(first_name) = first_name {
            fields.push("first_name = ").push_bind_unseparated(first_name);
        }
        if let Some(last_name) = last_name {
            fields.push("last_name = ").push_bind_unseparated(last_name);
        }
        if let Some(gender) = gender {
            fields.push("gender = ").push_bind_unseparated(gender.as_str());
        }
        if let Some(age) = age {
            fields.push("age = ").push_bind_unseparated(age);
        }
        if let Some(contact_num) = contact_num {
            fields.push("contact_num = ").push_bind_unseparated(contact_num);
        }
        if let Some(profile_pic) = profile_pic {
            fields.push("profile_pic = ").push_bind_unseparated(profile_pic);
        }
        if let Some(date_of_birth) = date_of_birth {
            fields
                .push("date_of_birth = ")
                .push_bind_unseparated(date_of_birth);
        }
        if let Some(role) = role {
            fields.push("role = ").push_bind_unseparated(role.as_str());
        }
        fields.push("updated_at = now()");
    }
    builder.push(" WHERE id = ").push_bind(id);
    builder
        .build()
        .execute(&state.db)
        .await
        .map_err(map_email_conflict(UPDATE_USER_ERROR))?;

    Ok(Json(MessageResponse {
        message: "User updated successfully".into(),
    }))
}

async fn delete_user(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<MessageResponse>, ApiError> {
    let target = sqlx::query("SELECT id FROM users WHERE id = $1")
        .bind(id)
        .fetch_optional(&state.db)
        .await
        .map_err(ApiError::db(DELETE_USER_ERROR))?;
    if target.is_none() {
        return Err(ApiError::NotFound(USER_NOT_FOUND.into()));
    }

    // Dropping a doctors row cascades to its appointments; dropping a
    // patients row detaches bookings instead. One transaction covers all of
    // it so a half-deleted account can never be observed.
    let mut tx = state
        .db
        .begin()
        .await
        .map_err(ApiError::db(DELETE_USER_ERROR))?;
    for query in [
        "DELETE FROM doctors WHERE user_id = $1",
        "DELETE FROM patients WHERE user_id = $1",
        "DELETE FROM admins WHERE user_id = $1",
        "DELETE FROM users WHERE id = $1",
    ] {
        sqlx::query(query)
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(ApiError::db(DELETE_USER_ERROR))?;
    }
    tx.commit().await.map_err(ApiError::db(DELETE_USER_ERROR))?;

    tracing::info!(user_id = %id, "user deleted");
    Ok(Json(MessageResponse {
        message: "User deleted successfully".into(),
    }))
}

async fn fetch_user_by_email(state: &AppState, email: &str) -> Result<Option<User>, ApiError> {
    sqlx::query_as::<_, User>(
        "SELECT id, email, password_hash, first_name, last_name, gender, age, contact_num, \
         profile_pic, date_of_birth, role FROM users WHERE email = $1",
    )
    .bind(email)
    .fetch_optional(&state.db)
    .await
    .map_err(ApiError::db("Error fetching user"))
}

async fn fetch_user_by_id(state: &AppState, id: Uuid) -> Result<Option<User>, ApiError> {
    sqlx::query_as::<_, User>(
        "SELECT id, email, password_hash, first_name, last_name, gender, age, contact_num, \
         profile_pic, date_of_birth, role FROM users WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(&state.db)
    .await
    .map_err(ApiError::db("Error fetching user"))
}

fn parse_stored_role(raw: &str) -> Result<Role, ApiError> {
    Role::parse(raw).ok_or_else(|| ApiError::Internal(format!("unknown role in store: {raw}")))
}

/// Current doctors-row id for a user, if one exists.
pub(super) async fn linked_doctor_id(
    state: &AppState,
    user_id: Uuid,
) -> Result<Option<Uuid>, ApiError> {
    let row = sqlx::query("SELECT id FROM doctors WHERE user_id = $1")
        .bind(user_id)
        .fetch_optional(&state.db)
        .await
        .map_err(ApiError::db("Error fetching doctor profile"))?;
    Ok(row.map(|row| row.get("id")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{from_value, json, to_value};

    fn payload(value: serde_json::Value) -> RegisterPayload {
        from_value(value).unwrap()
    }

    fn full_payload() -> serde_json::Value {
        json!({
            "email": "pat@clinic.test",
            "password": "hunter2!",
            "firstName": "Pat",
            "lastName": "Smith",
            "gender": "Female",
            "age": 34,
            "contactNum": "555-0101",
            "profilePic": "https://cdn.clinic.test/p/pat.png",
            "role": "Patient",
            "dateOfBirth": "1990-01-15"
        })
    }

    #[test]
    fn the_first_missing_field_is_named_in_order() {
        let err = require_fields(payload(json!({}))).unwrap_err();
        assert_eq!(err.to_string(), "Missing required field: email");

        let mut partial = full_payload();
        partial.as_object_mut().unwrap().remove("contactNum");
        partial.as_object_mut().unwrap().remove("role");
        let err = require_fields(payload(partial)).unwrap_err();
        assert_eq!(err.to_string(), "Missing required field: contactNum");
    }

    #[test]
    fn complete_payloads_pass_the_presence_check() {
        let complete = require_fields(payload(full_payload())).unwrap();
        assert_eq!(complete.email, "pat@clinic.test");
        assert_eq!(complete.age, 34);
    }

    #[test]
    fn unknown_roles_and_genders_are_rejected() {
        let mut bad_role = full_payload();
        bad_role["role"] = json!("Superuser");
        let err = validate_registration(require_fields(payload(bad_role)).unwrap()).unwrap_err();
        assert_eq!(err.to_string(), "Invalid role");

        let mut bad_gender = full_payload();
        bad_gender["gender"] = json!("female");
        let err = validate_registration(require_fields(payload(bad_gender)).unwrap()).unwrap_err();
        assert_eq!(err.to_string(), "Invalid gender");
    }

    #[test]
    fn role_is_checked_before_gender() {
        let mut both_bad = full_payload();
        both_bad["role"] = json!("nope");
        both_bad["gender"] = json!("nope");
        let err = validate_registration(require_fields(payload(both_bad)).unwrap()).unwrap_err();
        assert_eq!(err.to_string(), "Invalid role");
    }

    #[test]
    fn birth_dates_must_be_iso() {
        let mut bad_dob = full_payload();
        bad_dob["dateOfBirth"] = json!("15/01/1990");
        let err = validate_registration(require_fields(payload(bad_dob)).unwrap()).unwrap_err();
        assert_eq!(err.to_string(), "Invalid date format. Use 'YYYY-MM-DD'");
    }

    #[test]
    fn doctor_registrations_keep_their_details() {
        let mut doctor = full_payload();
        doctor["role"] = json!("Doctor");
        doctor["specialization"] = json!("Dermatology");
        doctor["experienceYears"] = json!(7);
        let valid = validate_registration(require_fields(payload(doctor)).unwrap()).unwrap();
        assert_eq!(valid.role, Role::Doctor);
        assert_eq!(valid.doctor_details.specialization.as_deref(), Some("Dermatology"));
        assert_eq!(valid.doctor_details.experience_years, Some(7));
    }

    #[test]
    fn empty_user_updates_are_rejected() {
        let empty: UpdateUserPayload = from_value(json!({})).unwrap();
        let err = UserChanges::from_payload(empty).unwrap_err();
        assert_eq!(err.to_string(), "No update parameters provided");

        let unknown_only: UpdateUserPayload = from_value(json!({"favoriteColor": "teal"})).unwrap();
        let err = UserChanges::from_payload(unknown_only).unwrap_err();
        assert_eq!(err.to_string(), "No update parameters provided");
    }

    #[test]
    fn user_updates_revalidate_enums_and_dates() {
        let bad_role: UpdateUserPayload = from_value(json!({"role": "King"})).unwrap();
        assert_eq!(
            UserChanges::from_payload(bad_role).unwrap_err().to_string(),
            "Invalid role"
        );

        let bad_dob: UpdateUserPayload = from_value(json!({"dateOfBirth": "Jan 1"})).unwrap();
        assert_eq!(
            UserChanges::from_payload(bad_dob).unwrap_err().to_string(),
            "Invalid date format. Use 'YYYY-MM-DD'"
        );

        let ok: UpdateUserPayload =
            from_value(json!({"firstName": "Sam", "gender": "Male"})).unwrap();
        let changes = UserChanges::from_payload(ok).unwrap();
        assert_eq!(changes.first_name.as_deref(), Some("Sam"));
        assert_eq!(changes.gender, Some(Gender::Male));
    }

    #[test]
    fn email_conflict_mapping_keeps_the_context_for_other_failures() {
        let err = map_email_conflict(UPDATE_USER_ERROR)(sqlx::Error::RowNotFound);
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.to_string(), UPDATE_USER_ERROR);
    }

    #[test]
    fn profile_snapshots_hide_the_hash_and_optional_doctor_link() {
        let user = User {
            id: Uuid::new_v4(),
            email: "doc@clinic.test".into(),
            password_hash: "$argon2id$secret".into(),
            first_name: Some("Ida".into()),
            last_name: Some("Nguyen".into()),
            gender: Some("Female".into()),
            age: Some(41),
            contact_num: Some("555-0102".into()),
            profile_pic: None,
            date_of_birth: None,
            role: "Doctor".into(),
        };

        let with_link = to_value(profile_response(&user, Some(Uuid::new_v4()))).unwrap();
        assert!(with_link.get("passwordHash").is_none());
        assert!(with_link.get("password_hash").is_none());
        assert!(with_link.get("doctorId").is_some());
        assert_eq!(with_link["firstName"], "Ida");
        assert_eq!(with_link["dateOfBirth"], serde_json::Value::Null);

        let without_link = to_value(profile_response(&user, None)).unwrap();
        assert!(without_link.get("doctorId").is_none());
    }

    #[test]
    fn login_responses_flatten_the_profile_next_to_the_token() {
        let user = User {
            id: Uuid::new_v4(),
            email: "pat@clinic.test".into(),
            password_hash: "$argon2id$secret".into(),
            first_name: Some("Pat".into()),
            last_name: Some("Smith".into()),
            gender: Some("Female".into()),
            age: Some(34),
            contact_num: None,
            profile_pic: None,
            date_of_birth: Some(time::macros::date!(1990 - 01 - 15)),
            role: "Patient".into(),
        };
        let body = to_value(LoginResponse {
            token: "signed.jwt.here".into(),
            profile: profile_response(&user, None),
        })
        .unwrap();
        assert_eq!(body["token"], "signed.jwt.here");
        assert_eq!(body["email"], "pat@clinic.test");
        assert_eq!(body["dateOfBirth"], "1990-01-15");
        assert!(body.get("profile").is_none());
    }
}
