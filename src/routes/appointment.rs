use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::middleware::from_fn_with_state;
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use serde::{Deserialize, Serialize};
use sqlx::postgres::PgRow;
use sqlx::{FromRow, Postgres, QueryBuilder, Row};
use time::{Date, OffsetDateTime, Time};
use uuid::Uuid;

use crate::domain::appointment::{format_date, format_time, parse_date, parse_time, Appointment};
use crate::domain::user::Role;
use crate::middleware;
use crate::routes::auth::{linked_doctor_id, ProfileResponse};
use crate::routes::{require_field, MessageResponse};
use crate::security::jwt::Claims;
use crate::state::AppState;
use crate::ApiError;

const CREATE_ERROR: &str = "Error creating appointment";
const FETCH_ERROR: &str = "Error fetching appointments";
const UPDATE_ERROR: &str = "Error updating appointment";
const DELETE_ERROR: &str = "Error deleting appointment";
const APPOINTMENT_NOT_FOUND: &str = "Appointment not found";
const ROLE_FORBIDDEN: &str = "Access restricted to admins and doctors";
const NOT_YOUR_APPOINTMENT: &str = "You do not have access to this appointment";

pub fn router(state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/api/appointment",
            post(create_appointment).get(view_appointments),
        )
        .route("/api/appointment/date", post(appointments_by_date))
        .route(
            "/api/appointment/{id}",
            get(get_appointment)
                .patch(update_appointment)
                .delete(delete_appointment),
        )
        .route_layer(from_fn_with_state(state, middleware::auth::require_auth))
}

/// Visibility derived from the caller's role: admins manage every
/// appointment, doctors only rows bound to their own doctors-row id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scope {
    All,
    Doctor(Uuid),
}

impl Scope {
    fn allows(self, doctor_id: Uuid) -> bool {
        match self {
            Scope::All => true,
            Scope::Doctor(own) => own == doctor_id,
        }
    }

    fn doctor_filter(self) -> Option<Uuid> {
        match self {
            Scope::All => None,
            Scope::Doctor(own) => Some(own),
        }
    }
}

/// Patients are turned away before any store access. Doctors resolve their
/// doctors-row id fresh here rather than trusting the week-old claim.
async fn resolve_scope(state: &AppState, claims: &Claims) -> Result<Scope, ApiError> {
    match claims.role {
        Role::Admin => Ok(Scope::All),
        Role::Doctor => {
            let doctor_id = linked_doctor_id(state, claims.id).await?.ok_or_else(|| {
                ApiError::Forbidden("No doctor profile linked to this account".into())
            })?;
            Ok(Scope::Doctor(doctor_id))
        }
        Role::Patient => Err(ApiError::Forbidden(ROLE_FORBIDDEN.into())),
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateAppointmentPayload {
    doctor_id: Option<Uuid>,
    date: Option<String>,
    title: Option<String>,
    time: Option<String>,
    price: Option<f64>,
    notes: Option<String>,
    patient_id: Option<Uuid>,
}

#[derive(Debug)]
struct ValidAppointment {
    doctor_id: Uuid,
    date: Date,
    time: Time,
    title: String,
    price: Option<f64>,
    notes: Option<String>,
    patient_id: Option<Uuid>,
}

fn validate_new_appointment(payload: CreateAppointmentPayload) -> Result<ValidAppointment, ApiError> {
    let doctor_id = require_field(payload.doctor_id, "doctorId")?;
    let date_raw = require_field(payload.date, "date")?;
    let title = require_field(payload.title, "title")?;
    let time_raw = require_field(payload.time, "time")?;
    let date = parse_date(&date_raw)?;
    let time = parse_time(&time_raw)?;
    Ok(ValidAppointment {
        doctor_id,
        date,
        time,
        title,
        price: payload.price,
        notes: payload.notes,
        patient_id: payload.patient_id,
    })
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AppointmentCreated {
    message: String,
    appointment_id: Uuid,
}

async fn create_appointment(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreateAppointmentPayload>,
) -> Result<(StatusCode, Json<AppointmentCreated>), ApiError> {
    let valid = validate_new_appointment(payload)?;

    let doctor = sqlx::query("SELECT id FROM doctors WHERE id = $1")
        .bind(valid.doctor_id)
        .fetch_optional(&state.db)
        .await
        .map_err(ApiError::db(CREATE_ERROR))?;
    if doctor.is_none() {
        return Err(ApiError::NotFound("Doctor not found".into()));
    }

    let scope = resolve_scope(&state, &claims).await?;
    if !scope.allows(valid.doctor_id) {
        return Err(ApiError::Forbidden(
            "Doctors may only create their own appointments".into(),
        ));
    }

    if let Some(patient_id) = valid.patient_id {
        let patient = sqlx::query("SELECT id FROM patients WHERE id = $1")
            .bind(patient_id)
            .fetch_optional(&state.db)
            .await
            .map_err(ApiError::db(CREATE_ERROR))?;
        if patient.is_none() {
            return Err(ApiError::NotFound("Patient not found".into()));
        }
    }

    let appointment_id = Uuid::new_v4();
    let mut tx = state.db.begin().await.map_err(ApiError::db(CREATE_ERROR))?;
    sqlx::query(
        "INSERT INTO appointments (id, doctor_id, patient_id, date, time, title, notes, price) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
    )
    .bind(appointment_id)
    .bind(valid.doctor_id)
    .bind(valid.patient_id)
    .bind(valid.date)
    .bind(valid.time)
    .bind(&valid.title)
    .bind(&valid.notes)
    .bind(valid.price)
    .execute(&mut *tx)
    .await
    .map_err(ApiError::db(CREATE_ERROR))?;
    tx.commit().await.map_err(ApiError::db(CREATE_ERROR))?;

    tracing::info!(%appointment_id, doctor_id = %valid.doctor_id, "appointment created");
    Ok((
        StatusCode::CREATED,
        Json(AppointmentCreated {
            message: "Appointment created successfully".into(),
            appointment_id,
        }),
    ))
}

#[derive(Serialize)]
struct AppointmentList<T> {
    appointments: Vec<T>,
}

async fn view_appointments(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<AppointmentList<AppointmentWithPatient>>, ApiError> {
    let scope = resolve_scope(&state, &claims).await?;
    let appointments = fetch_all_with_patient(&state, scope.doctor_filter()).await?;
    Ok(Json(AppointmentList { appointments }))
}

async fn get_appointment(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<Json<AppointmentWithPatient>, ApiError> {
    let scope = resolve_scope(&state, &claims).await?;
    let found = fetch_one_with_patient(&state, id)
        .await?
        .ok_or_else(|| ApiError::NotFound(APPOINTMENT_NOT_FOUND.into()))?;
    if !scope.allows(found.appointment.doctor_id) {
        return Err(ApiError::Forbidden(NOT_YOUR_APPOINTMENT.into()));
    }
    Ok(Json(found))
}

#[derive(Deserialize)]
struct UpdateAppointmentPayload {
    date: Option<String>,
    time: Option<String>,
    title: Option<String>,
}

#[derive(Debug)]
struct AppointmentChanges {
    date: Option<Date>,
    time: Option<Time>,
    title: Option<String>,
}

impl AppointmentChanges {
    /// Only date, time and title may change. Formats are re-validated; an
    /// effectively empty payload is an error, not a silent success.
    fn from_payload(payload: UpdateAppointmentPayload) -> Result<AppointmentChanges, ApiError> {
        let date = payload.date.as_deref().map(parse_date).transpose()?;
        let time = payload.time.as_deref().map(parse_time).transpose()?;
        let changes = AppointmentChanges {
            date,
            time,
            title: payload.title,
        };
        if changes.date.is_none() && changes.time.is_none() && changes.title.is_none() {
            return Err(ApiError::Validation("No update parameters provided".into()));
        }
        Ok(changes)
    }
}

async fn update_appointment(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateAppointmentPayload>,
) -> Result<Json<MessageResponse>, ApiError> {
    let scope = resolve_scope(&state, &claims).await?;
    let appointment = fetch_appointment_row(&state, id)
        .await?
        .ok_or_else(|| ApiError::NotFound(APPOINTMENT_NOT_FOUND.into()))?;
    if !scope.allows(appointment.doctor_id) {
        return Err(ApiError::Forbidden(NOT_YOUR_APPOINTMENT.into()));
    }

    let AppointmentChanges { date, time, title } = AppointmentChanges::from_payload(payload)?;

    let mut tx = state.db.begin().await.map_err(ApiError::db(UPDATE_ERROR))?;
    let mut builder = QueryBuilder::<Postgres>::new("UPDATE appointments SET ");
    {
        let mut fields = builder.separated(", ");
        if let Some(date) = date {
            fields.push("date = ").push_bind_unseparated(date);
        }
        if let Some(time) = time {
            fields.push("time = ").push_bind_unseparated(time);
        }
        if let Some(title) = title {
            fields.push("title = ").push_bind_unseparated(title);
        }
        fields.push("updated_at = now()");
    }
    builder.push(" WHERE id = ").push_bind(id);
    builder
        .build()
        .execute(&mut *tx)
        .await
        .map_err(ApiError::db(UPDATE_ERROR))?;
    tx.commit().await.map_err(ApiError::db(UPDATE_ERROR))?;

    Ok(Json(MessageResponse {
        message: "Appointment updated successfully".into(),
    }))
}

async fn delete_appointment(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<Json<MessageResponse>, ApiError> {
    let scope = resolve_scope(&state, &claims).await?;
    let appointment = fetch_appointment_row(&state, id)
        .await?
        .ok_or_else(|| ApiError::NotFound(APPOINTMENT_NOT_FOUND.into()))?;
    if !scope.allows(appointment.doctor_id) {
        return Err(ApiError::Forbidden(NOT_YOUR_APPOINTMENT.into()));
    }

    let mut tx = state.db.begin().await.map_err(ApiError::db(DELETE_ERROR))?;
    sqlx::query("DELETE FROM appointments WHERE id = $1")
        .bind(id)
        .execute(&mut *tx)
        .await
        .map_err(ApiError::db(DELETE_ERROR))?;
    tx.commit().await.map_err(ApiError::db(DELETE_ERROR))?;

    tracing::info!(appointment_id = %id, "appointment deleted");
    Ok(Json(MessageResponse {
        message: "Appointment deleted successfully".into(),
    }))
}

#[derive(Deserialize)]
struct DateQueryPayload {
    date: Option<String>,
}

/// Day view for any signed-in role; no patient embed, ordered by time.
async fn appointments_by_date(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<DateQueryPayload>,
) -> Result<Json<AppointmentList<AppointmentResponse>>, ApiError> {
    let raw = require_field(payload.date, "date")?;
    let date = parse_date(&raw)?;

    let rows = sqlx::query_as::<_, Appointment>(
        "SELECT id, doctor_id, patient_id, date, time, title, notes, price, created_at, \
         updated_at FROM appointments WHERE date = $1 ORDER BY time",
    )
    .bind(date)
    .fetch_all(&state.db)
    .await
    .map_err(ApiError::db(FETCH_ERROR))?;
    if rows.is_empty() {
        return Err(ApiError::NotFound("No appointments found for this date".into()));
    }

    let appointments = rows.into_iter().map(AppointmentResponse::from).collect();
    Ok(Json(AppointmentList { appointments }))
}

/// Wire form of an appointment: date and time as the strings clients send,
/// audit timestamps as RFC 3339.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AppointmentResponse {
    id: Uuid,
    doctor_id: Uuid,
    patient_id: Option<Uuid>,
    date: String,
    time: String,
    title: String,
    notes: Option<String>,
    price: Option<f64>,
    #[serde(with = "time::serde::rfc3339")]
    created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    updated_at: OffsetDateTime,
}

impl From<Appointment> for AppointmentResponse {
    fn from(appointment: Appointment) -> Self {
        AppointmentResponse {
            id: appointment.id,
            doctor_id: appointment.doctor_id,
            patient_id: appointment.patient_id,
            date: format_date(appointment.date),
            time: format_time(appointment.time),
            title: appointment.title,
            notes: appointment.notes,
            price: appointment.price,
            created_at: appointment.created_at,
            updated_at: appointment.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
struct AppointmentWithPatient {
    #[serde(flatten)]
    appointment: AppointmentResponse,
    #[serde(serialize_with = "patient_or_empty")]
    patient: Option<ProfileResponse>,
}

/// Unbooked slots serialize the patient as `{}`; clients rely on the key
/// always holding an object.
fn patient_or_empty<S>(patient: &Option<ProfileResponse>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    use serde::ser::SerializeMap;
    match patient {
        Some(profile) => profile.serialize(serializer),
        None => serializer.serialize_map(Some(0))?.end(),
    }
}

const WITH_PATIENT_SELECT: &str =
    "SELECT a.id, a.doctor_id, a.patient_id, a.date, a.time, a.title, a.notes, a.price, \
     a.created_at, a.updated_at, u.id AS patient_user_id, u.email AS patient_email, \
     u.first_name AS patient_first_name, u.last_name AS patient_last_name, \
     u.profile_pic AS patient_profile_pic, u.contact_num AS patient_contact_num, \
     u.age AS patient_age, u.gender AS patient_gender, \
     u.date_of_birth AS patient_date_of_birth, u.role AS patient_role \
     FROM appointments a \
     LEFT JOIN patients p ON p.id = a.patient_id \
     LEFT JOIN users u ON u.id = p.user_id";

fn appointment_with_patient(row: &PgRow) -> Result<AppointmentWithPatient, sqlx::Error> {
    let appointment = Appointment::from_row(row)?;
    let patient = match row.try_get::<Option<Uuid>, _>("patient_user_id")? {
        Some(patient_user_id) => Some(ProfileResponse {
            id: patient_user_id,
            email: row.try_get("patient_email")?,
            first_name: row.try_get("patient_first_name")?,
            last_name: row.try_get("patient_last_name")?,
            profile_pic: row.try_get("patient_profile_pic")?,
            contact_num: row.try_get("patient_contact_num")?,
            age: row.try_get("patient_age")?,
            gender: row.try_get("patient_gender")?,
            date_of_birth: row
                .try_get::<Option<Date>, _>("patient_date_of_birth")?
                .map(format_date),
            role: row.try_get("patient_role")?,
            doctor_id: None,
        }),
        None => None,
    };
    Ok(AppointmentWithPatient {
        appointment: appointment.into(),
        patient,
    })
}

async fn fetch_all_with_patient(
    state: &AppState,
    doctor: Option<Uuid>,
) -> Result<Vec<AppointmentWithPatient>, ApiError> {
    let rows = match doctor {
        Some(doctor_id) => {
            sqlx::query(&format!(
                "{WITH_PATIENT_SELECT} WHERE a.doctor_id = $1 ORDER BY a.date, a.time"
            ))
            .bind(doctor_id)
            .fetch_all(&state.db)
            .await
        }
        None => {
            sqlx::query(&format!("{WITH_PATIENT_SELECT} ORDER BY a.date, a.time"))
                .fetch_all(&state.db)
                .await
        }
    }
    .map_err(ApiError::db(FETCH_ERROR))?;

    rows.iter()
        .map(appointment_with_patient)
        .collect::<Result<Vec<_>, _>>()
        .map_err(ApiError::db(FETCH_ERROR))
}

async fn fetch_one_with_patient(
    state: &AppState,
    id: Uuid,
) -> Result<Option<AppointmentWithPatient>, ApiError> {
    let row = sqlx::query(&format!("{WITH_PATIENT_SELECT} WHERE a.id = $1"))
        .bind(id)
        .fetch_optional(&state.db)
        .await
        .map_err(ApiError::db(FETCH_ERROR))?;
    row.as_ref()
        .map(appointment_with_patient)
        .transpose()
        .map_err(ApiError::db(FETCH_ERROR))
}

async fn fetch_appointment_row(
    state: &AppState,
    id: Uuid,
) -> Result<Option<Appointment>, ApiError> {
    sqlx::query_as::<_, Appointment>(
        "SELECT id, doctor_id, patient_id, date, time, title, notes, price, created_at, \
         updated_at FROM appointments WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(&state.db)
    .await
    .map_err(ApiError::db(FETCH_ERROR))
}
