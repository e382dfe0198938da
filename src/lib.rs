//! # Clinic Registry
//!
//! Record keeping for a small clinic: patients, doctors and appointments,
//! each kept as a JSON array under a configured data directory.
//!
//! - [`store::RecordStore`] reads and writes whole collections.
//! - [`registry::ClinicRegistry`] owns the in-memory state, assigns IDs,
//!   checks references and persists after every change.

pub mod config;
pub mod error;
pub mod models;
pub mod registry;
pub mod store;

pub use config::ClinicConfig;
pub use error::{ClinicError, ClinicResult, StorageError};
pub use models::{Appointment, AppointmentParty, Doctor, EntityKind, Patient};
pub use registry::{ClinicRegistry, RegistrySummary};
pub use store::RecordStore;
