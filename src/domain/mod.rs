pub mod appointment;
pub mod profile;
pub mod user;
