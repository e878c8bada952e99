use uuid::Uuid;

use crate::domain::user::Role;

/// Optional doctor metadata a registration payload may carry. Ignored for
/// patients and admins.
#[derive(Debug, Clone, Default)]
pub struct DoctorDetails {
    pub specialization: Option<String>,
    pub experience_years: Option<i32>,
    pub availability: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewDoctor {
    pub id: Uuid,
    pub user_id: Uuid,
    pub specialization: Option<String>,
    pub experience_years: Option<i32>,
    pub availability: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewPatient {
    pub id: Uuid,
    pub user_id: Uuid,
}

#[derive(Debug, Clone)]
pub struct NewAdmin {
    pub id: Uuid,
    pub user_id: Uuid,
}

/// The role-matching sub-profile row to insert alongside a new user. The
/// registration transaction asks for the variant once and stays the single
/// place that writes rows.
#[derive(Debug, Clone)]
pub enum SubProfile {
    Doctor(NewDoctor),
    Patient(NewPatient),
    Admin(NewAdmin),
}

impl SubProfile {
    pub fn for_role(role: Role, user_id: Uuid, details: DoctorDetails) -> SubProfile {
        match role {
            Role::Doctor => SubProfile::Doctor(NewDoctor {
                id: Uuid::new_v4(),
                user_id,
                specialization: details.specialization,
                experience_years: details.experience_years,
                availability: details.availability,
            }),
            Role::Patient => SubProfile::Patient(NewPatient {
                id: Uuid::new_v4(),
                user_id,
            }),
            Role::Admin => SubProfile::Admin(NewAdmin {
                id: Uuid::new_v4(),
                user_id,
            }),
        }
    }

    /// Id of the row this variant will insert, written back to the user row.
    pub fn id(&self) -> Uuid {
        match self {
            SubProfile::Doctor(doctor) => doctor.id,
            SubProfile::Patient(patient) => patient.id,
            SubProfile::Admin(admin) => admin.id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn factory_matches_variant_to_role() {
        let user_id = Uuid::new_v4();
        assert!(matches!(
            SubProfile::for_role(Role::Doctor, user_id, DoctorDetails::default()),
            SubProfile::Doctor(_)
        ));
        assert!(matches!(
            SubProfile::for_role(Role::Patient, user_id, DoctorDetails::default()),
            SubProfile::Patient(_)
        ));
        assert!(matches!(
            SubProfile::for_role(Role::Admin, user_id, DoctorDetails::default()),
            SubProfile::Admin(_)
        ));
    }

    #[test]
    fn doctor_details_are_carried_through() {
        let details = DoctorDetails {
            specialization: Some("Cardiology".into()),
            experience_years: Some(12),
            availability: Some("Mon-Fri 9-17".into()),
        };
        let sub = SubProfile::for_role(Role::Doctor, Uuid::new_v4(), details);
        let SubProfile::Doctor(doctor) = sub else {
            panic!("expected a doctor sub-profile");
        };
        assert_eq!(doctor.specialization.as_deref(), Some("Cardiology"));
        assert_eq!(doctor.experience_years, Some(12));
        assert_eq!(doctor.availability.as_deref(), Some("Mon-Fri 9-17"));
    }

    #[test]
    fn sub_profile_ids_are_fresh_per_call() {
        let user_id = Uuid::new_v4();
        let a = SubProfile::for_role(Role::Patient, user_id, DoctorDetails::default());
        let b = SubProfile::for_role(Role::Patient, user_id, DoctorDetails::default());
        assert_ne!(a.id(), b.id());
        assert_ne!(a.id(), user_id);
    }
}
