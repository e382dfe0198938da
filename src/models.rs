/// Data models for the clinic registry.
///
/// This module defines the records kept on disk and the typed parsing of
/// raw user input into values the registry accepts:
/// - Patient, Doctor, Appointment: the persisted entities
/// - EntityKind / AppointmentParty: which collection an ID belongs to
/// - parse_age / parse_scheduled_at: input validation boundaries
/// - next_id: sequential `<prefix><n>` identifier generation

use crate::error::{ClinicError, ClinicResult};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Fixed textual format of appointment times.
///
/// Zero-padded output sorts lexicographically in chronological order.
pub const SCHEDULE_FORMAT: &str = "%Y-%m-%d %H:%M";

/// The three entity collections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Patient,
    Doctor,
    Appointment,
}

impl EntityKind {
    /// Prefix used for generated IDs of this kind.
    pub fn id_prefix(&self) -> &'static str {
        match self {
            EntityKind::Patient => "P",
            EntityKind::Doctor => "D",
            EntityKind::Appointment => "A",
        }
    }

    /// Name of the persisted collection holding this kind.
    pub fn collection_name(&self) -> &'static str {
        match self {
            EntityKind::Patient => "patients",
            EntityKind::Doctor => "doctors",
            EntityKind::Appointment => "appointments",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EntityKind::Patient => "patient",
            EntityKind::Doctor => "doctor",
            EntityKind::Appointment => "appointment",
        };
        f.write_str(name)
    }
}

/// Side of an appointment used when listing appointments for someone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppointmentParty {
    Patient,
    Doctor,
}

/// Anything searchable by name.
pub trait Named {
    fn name(&self) -> &str;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Patient {
    pub id: String,
    pub name: String,
    pub age: u32,
    pub gender: String,
    pub phone: String,
    #[serde(default)]
    pub notes: String,
}

impl Patient {
    /// Create a patient with validation. IDs are assigned by the registry.
    pub(crate) fn new(
        id: String,
        name: &str,
        age: u32,
        gender: &str,
        phone: &str,
        notes: &str,
    ) -> ClinicResult<Self> {
        Ok(Patient {
            id,
            name: required("Patient name", name)?,
            age,
            gender: required("Patient gender", gender)?,
            phone: required("Patient phone", phone)?,
            notes: notes.trim().to_string(),
        })
    }
}

impl Named for Patient {
    fn name(&self) -> &str {
        &self.name
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Doctor {
    pub id: String,
    pub name: String,
    pub speciality: String,
    pub phone: String,
}

impl Doctor {
    pub(crate) fn new(id: String, name: &str, speciality: &str, phone: &str) -> ClinicResult<Self> {
        Ok(Doctor {
            id,
            name: required("Doctor name", name)?,
            speciality: required("Doctor speciality", speciality)?,
            phone: required("Doctor phone", phone)?,
        })
    }
}

impl Named for Doctor {
    fn name(&self) -> &str {
        &self.name
    }
}

/// A booked appointment. `scheduled_at` is always in canonical
/// [`SCHEDULE_FORMAT`] form once created by the registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Appointment {
    pub id: String,
    pub patient_id: String,
    pub doctor_id: String,
    pub scheduled_at: String,
    #[serde(default)]
    pub reason: String,
}

impl Appointment {
    /// Whether this appointment involves the given patient or doctor.
    pub fn involves(&self, party: AppointmentParty, id: &str) -> bool {
        match party {
            AppointmentParty::Patient => self.patient_id == id,
            AppointmentParty::Doctor => self.doctor_id == id,
        }
    }

    /// Parsed appointment time, if the stored text is well formed.
    pub fn scheduled_datetime(&self) -> Option<NaiveDateTime> {
        NaiveDateTime::parse_from_str(&self.scheduled_at, SCHEDULE_FORMAT).ok()
    }
}

fn required(field: &str, value: &str) -> ClinicResult<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ClinicError::Validation(format!("{} cannot be empty", field)));
    }
    Ok(value.to_string())
}

/// Parse an age typed by the user. Only plain decimal digits are accepted.
pub fn parse_age(value: &str) -> ClinicResult<u32> {
    let value = value.trim();
    if value.is_empty() || !value.chars().all(|c| c.is_ascii_digit()) {
        return Err(ClinicError::Validation(format!(
            "Age must be a non-negative integer, got '{}'",
            value
        )));
    }
    value
        .parse::<u32>()
        .map_err(|_| ClinicError::Validation(format!("Age is out of range: '{}'", value)))
}

/// Date and time separated by a single space, four-digit unsigned year.
///
/// chrono alone would also take a missing separator, a signed year or a
/// short year.
fn has_schedule_shape(value: &str) -> bool {
    let Some((date, time)) = value.split_once(' ') else {
        return false;
    };
    let year = date.split('-').next().unwrap_or_default();

    year.len() == 4
        && year.chars().all(|c| c.is_ascii_digit())
        && date.chars().all(|c| c.is_ascii_digit() || c == '-')
        && !time.is_empty()
        && time.chars().all(|c| c.is_ascii_digit() || c == ':')
}

/// Parse an appointment time and return it in canonical form.
pub fn parse_scheduled_at(value: &str) -> ClinicResult<String> {
    let value = value.trim();
    let invalid = || {
        ClinicError::Validation(format!(
            "Datetime '{}' should be in the format YYYY-MM-DD HH:MM",
            value
        ))
    };

    if !has_schedule_shape(value) {
        return Err(invalid());
    }
    NaiveDateTime::parse_from_str(value, SCHEDULE_FORMAT)
        .map(|dt| dt.format(SCHEDULE_FORMAT).to_string())
        .map_err(|_| invalid())
}

/// Numeric suffix of an ID with the given prefix, e.g. `P12` -> 12.
pub fn id_number(prefix: &str, id: &str) -> Option<u64> {
    let digits = id.strip_prefix(prefix)?;
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// Next sequential ID: one past the highest existing suffix for `prefix`.
///
/// IDs that do not carry the prefix or a numeric suffix are ignored. Fails
/// when the highest suffix is already `u64::MAX`.
pub fn next_id<'a, I>(prefix: &str, existing: I) -> ClinicResult<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let max = existing
        .into_iter()
        .filter_map(|id| id_number(prefix, id))
        .max()
        .unwrap_or(0);
    let next = max.checked_add(1).ok_or_else(|| {
        ClinicError::Validation(format!("no {} IDs left after {}{}", prefix, prefix, max))
    })?;
    Ok(format!("{}{}", prefix, next))
}
