//! Domain models for the medical office.

mod appointment;
mod audit;
mod doctor;
mod lookup;
mod patient;
mod photo;
mod validation;

pub use appointment::{fields as appointment_fields, Appointment, DEFAULT_EXTRA_FEE};
pub use audit::*;
pub use doctor::{fields as doctor_fields, Doctor};
pub use lookup::*;
pub use patient::{fields as patient_fields, Coverage, Patient};
pub use photo::StoredImage;
pub use validation::*;
