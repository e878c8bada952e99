use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::Date;
use uuid::Uuid;

/// A `users` row as handlers consume it. The password hash never leaves this
/// type through a response; profile snapshots are built field by field.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub password_hash: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub gender: Option<String>,
    pub age: Option<i32>,
    pub contact_num: Option<String>,
    pub profile_pic: Option<String>,
    pub date_of_birth: Option<Date>,
    pub role: String,
}

/// Account type. Stored as TEXT and matched case-sensitively, so `"doctor"`
/// is rejected at the same place `"superuser"` is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    Doctor,
    Admin,
    Patient,
}

impl Role {
    pub fn parse(raw: &str) -> Option<Role> {
        match raw {
            "Doctor" => Some(Role::Doctor),
            "Admin" => Some(Role::Admin),
            "Patient" => Some(Role::Patient),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Doctor => "Doctor",
            Role::Admin => "Admin",
            Role::Patient => "Patient",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Gender {
    Male,
    Female,
}

impl Gender {
    pub fn parse(raw: &str) -> Option<Gender> {
        match raw {
            "Male" => Some(Gender::Male),
            "Female" => Some(Gender::Female),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Gender::Male => "Male",
            Gender::Female => "Female",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roles_parse_exact_case_only() {
        assert_eq!(Role::parse("Doctor"), Some(Role::Doctor));
        assert_eq!(Role::parse("Admin"), Some(Role::Admin));
        assert_eq!(Role::parse("Patient"), Some(Role::Patient));
        assert_eq!(Role::parse("doctor"), None);
        assert_eq!(Role::parse("ADMIN"), None);
        assert_eq!(Role::parse("Nurse"), None);
        assert_eq!(Role::parse(""), None);
    }

    #[test]
    fn roles_round_trip_through_storage_form() {
        for role in [Role::Doctor, Role::Admin, Role::Patient] {
            assert_eq!(Role::parse(role.as_str()), Some(role));
        }
    }

    #[test]
    fn genders_parse_exact_case_only() {
        assert_eq!(Gender::parse("Male"), Some(Gender::Male));
        assert_eq!(Gender::parse("Female"), Some(Gender::Female));
        assert_eq!(Gender::parse("male"), None);
        assert_eq!(Gender::parse("other"), None);
    }

    #[test]
    fn roles_serialize_as_bare_strings() {
        assert_eq!(serde_json::to_value(Role::Doctor).unwrap(), "Doctor");
        assert_eq!(serde_json::to_value(Gender::Female).unwrap(), "Female");
    }
}
