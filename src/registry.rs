/// Patient, doctor and appointment registry.
///
/// This module provides the ClinicRegistry struct which owns the in-memory
/// collections, assigns IDs, enforces references between appointments and
/// the people they involve, and writes every collection back to disk after
/// each change.

use crate::error::{ClinicError, ClinicResult};
use crate::models::{
    next_id, parse_scheduled_at, Appointment, AppointmentParty, Doctor, EntityKind, Named,
    Patient,
};
use crate::store::RecordStore;
use std::fmt;

/// Number of records in each collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RegistrySummary {
    pub patients: usize,
    pub doctors: usize,
    pub appointments: usize,
}

pub struct ClinicRegistry {
    store: RecordStore,
    patients: Vec<Patient>,
    doctors: Vec<Doctor>,
    appointments: Vec<Appointment>,
}

impl ClinicRegistry {
    /// Load all collections from the store. The registry is ready on return.
    pub fn open(store: RecordStore) -> Self {
        let patients = store.load_collection(EntityKind::Patient.collection_name());
        let doctors = store.load_collection(EntityKind::Doctor.collection_name());
        let appointments = store.load_collection(EntityKind::Appointment.collection_name());

        let registry = ClinicRegistry {
            store,
            patients,
            doctors,
            appointments,
        };
        tracing::info!("opened registry: {}", registry);
        registry
    }

    /// Write all three collections back to disk.
    ///
    /// Mutating methods undo their in-memory change when this fails. Files
    /// written before the failing one keep their new content.
    fn persist(&self) -> ClinicResult<()> {
        self.store
            .save_collection(EntityKind::Patient.collection_name(), &self.patients)?;
        self.store
            .save_collection(EntityKind::Doctor.collection_name(), &self.doctors)?;
        self.store.save_collection(
            EntityKind::Appointment.collection_name(),
            &self.appointments,
        )?;
        Ok(())
    }

    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    /// All patients in insertion order.
    pub fn patients(&self) -> &[Patient] {
        &self.patients
    }

    /// All doctors in insertion order.
    pub fn doctors(&self) -> &[Doctor] {
        &self.doctors
    }

    /// All appointments sorted by time.
    pub fn appointments(&self) -> Vec<&Appointment> {
        let mut appointments: Vec<&Appointment> = self.appointments.iter().collect();
        appointments.sort_by(|a, b| a.scheduled_at.cmp(&b.scheduled_at));
        appointments
    }

    pub fn patient(&self, id: &str) -> Option<&Patient> {
        self.patients.iter().find(|p| p.id == id)
    }

    pub fn doctor(&self, id: &str) -> Option<&Doctor> {
        self.doctors.iter().find(|d| d.id == id)
    }

    pub fn appointment(&self, id: &str) -> Option<&Appointment> {
        self.appointments.iter().find(|a| a.id == id)
    }

    pub fn summary(&self) -> RegistrySummary {
        RegistrySummary {
            patients: self.patients.len(),
            doctors: self.doctors.len(),
            appointments: self.appointments.len(),
        }
    }

    /// Add a patient under a fresh `P<n>` ID.
    pub fn add_patient(
        &mut self,
        name: &str,
        age: u32,
        gender: &str,
        phone: &str,
        notes: &str,
    ) -> ClinicResult<Patient> {
        let id = next_id(
            EntityKind::Patient.id_prefix(),
            self.patients.iter().map(|p| p.id.as_str()),
        )?;
        let patient = Patient::new(id, name, age, gender, phone, notes)?;

        self.patients.push(patient.clone());
        if let Err(e) = self.persist() {
            self.patients.pop();
            return Err(e);
        }

        tracing::info!("added patient {} ({})", patient.id, patient.name);
        Ok(patient)
    }

    /// Add a doctor under a fresh `D<n>` ID.
    pub fn add_doctor(&mut self, name: &str, speciality: &str, phone: &str) -> ClinicResult<Doctor> {
        let id = next_id(
            EntityKind::Doctor.id_prefix(),
            self.doctors.iter().map(|d| d.id.as_str()),
        )?;
        let doctor = Doctor::new(id, name, speciality, phone)?;

        self.doctors.push(doctor.clone());
        if let Err(e) = self.persist() {
            self.doctors.pop();
            return Err(e);
        }

        tracing::info!("added doctor {} ({})", doctor.id, doctor.name);
        Ok(doctor)
    }

    pub fn find_patients_by_name(&self, query: &str) -> Vec<&Patient> {
        find_by_name(&self.patients, query)
    }

    pub fn find_doctors_by_name(&self, query: &str) -> Vec<&Doctor> {
        find_by_name(&self.doctors, query)
    }

    /// Delete a patient and every appointment they hold.
    ///
    /// Returns `Ok(false)` when no patient has this ID.
    pub fn delete_patient(&mut self, id: &str) -> ClinicResult<bool> {
        let Some(index) = self.patients.iter().position(|p| p.id == id) else {
            return Ok(false);
        };

        let appointments_before = self.appointments.clone();
        let patient = self.patients.remove(index);
        let removed = self.remove_appointments_for(AppointmentParty::Patient, id);
        if let Err(e) = self.persist() {
            self.patients.insert(index, patient);
            self.appointments = appointments_before;
            return Err(e);
        }

        tracing::info!("deleted patient {} and {} appointment(s)", id, removed);
        Ok(true)
    }

    /// Delete a doctor and every appointment booked with them.
    ///
    /// Returns `Ok(false)` when no doctor has this ID.
    pub fn delete_doctor(&mut self, id: &str) -> ClinicResult<bool> {
        let Some(index) = self.doctors.iter().position(|d| d.id == id) else {
            return Ok(false);
        };

        let appointments_before = self.appointments.clone();
        let doctor = self.doctors.remove(index);
        let removed = self.remove_appointments_for(AppointmentParty::Doctor, id);
        if let Err(e) = self.persist() {
            self.doctors.insert(index, doctor);
            self.appointments = appointments_before;
            return Err(e);
        }

        tracing::info!("deleted doctor {} and {} appointment(s)", id, removed);
        Ok(true)
    }

    fn remove_appointments_for(&mut self, party: AppointmentParty, id: &str) -> usize {
        let before = self.appointments.len();
        self.appointments.retain(|a| !a.involves(party, id));
        before - self.appointments.len()
    }

    /// Book an appointment under a fresh `A<n>` ID.
    ///
    /// Checks run in a fixed order: patient exists, doctor exists, time
    /// parses, doctor is free at that time.
    pub fn schedule_appointment(
        &mut self,
        patient_id: &str,
        doctor_id: &str,
        scheduled_at: &str,
        reason: &str,
    ) -> ClinicResult<Appointment> {
        if self.patient(patient_id).is_none() {
            return Err(ClinicError::NotFound {
                kind: EntityKind::Patient,
                id: patient_id.to_string(),
            });
        }
        if self.doctor(doctor_id).is_none() {
            return Err(ClinicError::NotFound {
                kind: EntityKind::Doctor,
                id: doctor_id.to_string(),
            });
        }

        let scheduled_at = parse_scheduled_at(scheduled_at)?;

        if self
            .appointments
            .iter()
            .any(|a| a.doctor_id == doctor_id && a.scheduled_at == scheduled_at)
        {
            return Err(ClinicError::Conflict {
                doctor_id: doctor_id.to_string(),
                scheduled_at,
            });
        }

        let appointment = Appointment {
            id: next_id(
                EntityKind::Appointment.id_prefix(),
                self.appointments.iter().map(|a| a.id.as_str()),
            )?,
            patient_id: patient_id.to_string(),
            doctor_id: doctor_id.to_string(),
            scheduled_at,
            reason: reason.trim().to_string(),
        };

        self.appointments.push(appointment.clone());
        if let Err(e) = self.persist() {
            self.appointments.pop();
            return Err(e);
        }

        tracing::info!(
            "scheduled appointment {} for patient {} with doctor {} at {}",
            appointment.id,
            appointment.patient_id,
            appointment.doctor_id,
            appointment.scheduled_at
        );
        Ok(appointment)
    }

    /// Cancel an appointment. Returns `Ok(false)` when no appointment has this ID.
    pub fn cancel_appointment(&mut self, id: &str) -> ClinicResult<bool> {
        let Some(index) = self.appointments.iter().position(|a| a.id == id) else {
            return Ok(false);
        };

        let appointment = self.appointments.remove(index);
        if let Err(e) = self.persist() {
            self.appointments.insert(index, appointment);
            return Err(e);
        }

        tracing::info!("cancelled appointment {}", id);
        Ok(true)
    }

    /// Appointments involving a patient or doctor, sorted by time.
    pub fn list_appointments_for(&self, party: AppointmentParty, id: &str) -> Vec<&Appointment> {
        let mut appointments: Vec<&Appointment> = self
            .appointments
            .iter()
            .filter(|a| a.involves(party, id))
            .collect();
        appointments.sort_by(|a, b| a.scheduled_at.cmp(&b.scheduled_at));
        appointments
    }
}

/// Case-insensitive substring match on `name`, in collection order.
///
/// An empty query matches every record.
pub fn find_by_name<'a, T: Named>(records: &'a [T], query: &str) -> Vec<&'a T> {
    let query = query.to_lowercase();
    records
        .iter()
        .filter(|r| r.name().to_lowercase().contains(&query))
        .collect()
}

impl fmt::Display for ClinicRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ClinicRegistry({}, patients={}, doctors={}, appointments={})",
            self.store.data_dir().display(),
            self.patients.len(),
            self.doctors.len(),
            self.appointments.len()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClinicConfig;
    use std::fs;
    use tempfile::TempDir;

    fn open_in(temp: &TempDir) -> ClinicRegistry {
        let cfg = ClinicConfig::new(temp.path().join("clinic")).unwrap();
        ClinicRegistry::open(RecordStore::new(&cfg))
    }

    /// Registry with patient P1 (Alice), doctor D1 (Bob) and appointment A1.
    fn seeded(temp: &TempDir) -> ClinicRegistry {
        let mut registry = open_in(temp);
        registry.add_patient("Alice", 30, "F", "555-1", "").unwrap();
        registry.add_doctor("Bob", "Cardiology", "555-2").unwrap();
        registry
            .schedule_appointment("P1", "D1", "2024-01-01 09:00", "checkup")
            .unwrap();
        registry
    }

    #[test]
    fn patient_ids_are_sequential() {
        let temp = TempDir::new().unwrap();
        let mut registry = open_in(&temp);

        let ids: Vec<String> = ["Ann", "Ben", "Cat"]
            .iter()
            .map(|name| registry.add_patient(name, 40, "X", "1", "").unwrap().id)
            .collect();
        assert_eq!(ids, vec!["P1", "P2", "P3"]);
    }

    #[test]
    fn ids_are_not_reused_after_deleting_an_older_record() {
        let temp = TempDir::new().unwrap();
        let mut registry = open_in(&temp);

        registry.add_patient("Ann", 40, "F", "1", "").unwrap();
        registry.add_patient("Ben", 41, "M", "2", "").unwrap();
        assert!(registry.delete_patient("P1").unwrap());

        // Only P2 is left, so the next ID is derived from it.
        let patient = registry.add_patient("Cat", 42, "F", "3", "").unwrap();
        assert_eq!(patient.id, "P3");
    }

    #[test]
    fn deleting_the_newest_record_frees_its_number() {
        let temp = TempDir::new().unwrap();
        let mut registry = open_in(&temp);

        registry.add_patient("Ann", 40, "F", "1", "").unwrap();
        registry.add_patient("Ben", 41, "M", "2", "").unwrap();
        assert!(registry.delete_patient("P2").unwrap());

        // max + 1 over what is left.
        let patient = registry.add_patient("Cat", 42, "F", "3", "").unwrap();
        assert_eq!(patient.id, "P2");
    }

    #[test]
    fn exhausted_id_space_is_reported_not_a_panic() {
        let temp = TempDir::new().unwrap();
        let registry = open_in(&temp);
        fs::create_dir_all(registry.store().data_dir()).unwrap();
        fs::write(
            registry.store().collection_path("doctors"),
            r#"[{"id":"D18446744073709551615","name":"Max","speciality":"GP","phone":"1"}]"#,
        )
        .unwrap();

        let mut registry = ClinicRegistry::open(registry.store().clone());
        assert_eq!(registry.doctors().len(), 1);

        let err = registry.add_doctor("Bob", "Cardiology", "555-2").unwrap_err();
        assert!(matches!(err, ClinicError::Validation(_)));
        assert_eq!(registry.doctors().len(), 1);
    }

    #[test]
    fn add_patient_rejects_empty_required_fields_without_persisting() {
        let temp = TempDir::new().unwrap();
        let mut registry = open_in(&temp);

        let err = registry.add_patient("", 30, "F", "555-1", "").unwrap_err();
        assert!(matches!(err, ClinicError::Validation(_)));
        assert!(registry.patients().is_empty());
        assert!(!registry.store().collection_path("patients").exists());
    }

    #[test]
    fn duplicate_names_are_allowed() {
        let temp = TempDir::new().unwrap();
        let mut registry = open_in(&temp);

        registry.add_doctor("Bob", "Cardiology", "1").unwrap();
        let second = registry.add_doctor("Bob", "Cardiology", "1").unwrap();
        assert_eq!(second.id, "D2");
        assert_eq!(registry.doctors().len(), 2);
    }

    #[test]
    fn find_by_name_is_case_insensitive_substring() {
        let temp = TempDir::new().unwrap();
        let mut registry = open_in(&temp);
        registry.add_patient("Alice Smith", 30, "F", "1", "").unwrap();
        registry.add_patient("Bob", 31, "M", "2", "").unwrap();
        registry.add_patient("MALICE", 32, "F", "3", "").unwrap();

        let found: Vec<&str> = registry
            .find_patients_by_name("alice")
            .iter()
            .map(|p| p.id.as_str())
            .collect();
        assert_eq!(found, vec!["P1", "P3"]);

        assert_eq!(registry.find_patients_by_name("").len(), 3);
        assert!(registry.find_patients_by_name("zed").is_empty());
        assert!(registry.find_doctors_by_name("").is_empty());
    }

    #[test]
    fn schedule_reports_missing_patient_before_anything_else() {
        let temp = TempDir::new().unwrap();
        let mut registry = seeded(&temp);

        let err = registry
            .schedule_appointment("P9", "D9", "not a date", "")
            .unwrap_err();
        assert!(matches!(
            err,
            ClinicError::NotFound { kind: EntityKind::Patient, ref id } if id == "P9"
        ));
    }

    #[test]
    fn schedule_reports_missing_doctor_before_bad_date() {
        let temp = TempDir::new().unwrap();
        let mut registry = seeded(&temp);

        let err = registry
            .schedule_appointment("P1", "D9", "not a date", "")
            .unwrap_err();
        assert!(matches!(
            err,
            ClinicError::NotFound { kind: EntityKind::Doctor, .. }
        ));
    }

    #[test]
    fn schedule_reports_bad_date_before_conflict() {
        let temp = TempDir::new().unwrap();
        let mut registry = seeded(&temp);

        let err = registry
            .schedule_appointment("P1", "D1", "2024-01-01 9am", "")
            .unwrap_err();
        assert!(matches!(err, ClinicError::Validation(_)));
    }

    #[test]
    fn double_booking_is_a_conflict_regardless_of_patient_or_spelling() {
        let temp = TempDir::new().unwrap();
        let mut registry = seeded(&temp);
        registry.add_patient("Carol", 50, "F", "555-3", "").unwrap();

        let err = registry
            .schedule_appointment("P2", "D1", "2024-1-1 9:00", "other reason")
            .unwrap_err();
        assert!(matches!(err, ClinicError::Conflict { .. }));
        assert_eq!(registry.appointments().len(), 1);
    }

    #[test]
    fn same_time_with_another_doctor_is_fine() {
        let temp = TempDir::new().unwrap();
        let mut registry = seeded(&temp);
        registry.add_doctor("Dana", "Dermatology", "555-4").unwrap();

        let appointment = registry
            .schedule_appointment("P1", "D2", "2024-01-01 09:00", "")
            .unwrap();
        assert_eq!(appointment.id, "A2");
    }

    #[test]
    fn delete_patient_cascades_to_appointments_only_for_that_patient() {
        let temp = TempDir::new().unwrap();
        let mut registry = seeded(&temp);
        registry.add_patient("Carol", 50, "F", "555-3", "").unwrap();
        registry
            .schedule_appointment("P2", "D1", "2024-01-02 10:00", "")
            .unwrap();

        assert!(registry.delete_patient("P1").unwrap());
        assert!(registry.patient("P1").is_none());
        assert!(registry.appointment("A1").is_none());
        assert!(registry.appointment("A2").is_some());
        assert!(registry
            .list_appointments_for(AppointmentParty::Patient, "P1")
            .is_empty());
    }

    #[test]
    fn delete_doctor_cascades() {
        let temp = TempDir::new().unwrap();
        let mut registry = seeded(&temp);

        assert!(registry.delete_doctor("D1").unwrap());
        assert!(registry.doctors().is_empty());
        assert!(registry.appointments().is_empty());
        assert!(registry.patient("P1").is_some());
    }

    #[test]
    fn deleting_unknown_ids_reports_not_found() {
        let temp = TempDir::new().unwrap();
        let mut registry = seeded(&temp);

        assert!(!registry.delete_patient("P42").unwrap());
        assert!(!registry.delete_doctor("D42").unwrap());
        assert!(!registry.cancel_appointment("A42").unwrap());
        assert_eq!(
            registry.summary(),
            RegistrySummary {
                patients: 1,
                doctors: 1,
                appointments: 1
            }
        );
    }

    #[test]
    fn cancel_removes_the_appointment_and_persists() {
        let temp = TempDir::new().unwrap();
        let mut registry = seeded(&temp);

        assert!(registry.cancel_appointment("A1").unwrap());
        assert!(registry.appointment("A1").is_none());

        let reopened = ClinicRegistry::open(registry.store().clone());
        assert!(reopened.appointments().is_empty());
    }

    #[test]
    fn listings_are_sorted_by_time() {
        let temp = TempDir::new().unwrap();
        let mut registry = seeded(&temp);
        registry
            .schedule_appointment("P1", "D1", "2023-12-31 17:30", "")
            .unwrap();
        registry
            .schedule_appointment("P1", "D1", "2024-01-01 08:15", "")
            .unwrap();

        let order: Vec<&str> = registry
            .list_appointments_for(AppointmentParty::Doctor, "D1")
            .iter()
            .map(|a| a.id.as_str())
            .collect();
        assert_eq!(order, vec!["A2", "A3", "A1"]);

        let all: Vec<&str> = registry.appointments().iter().map(|a| a.id.as_str()).collect();
        assert_eq!(all, order);
    }

    #[test]
    fn every_mutation_is_visible_after_reopen() {
        let temp = TempDir::new().unwrap();
        let registry = seeded(&temp);

        let reopened = ClinicRegistry::open(registry.store().clone());
        assert_eq!(reopened.patients(), registry.patients());
        assert_eq!(reopened.doctors(), registry.doctors());
        assert_eq!(reopened.appointments(), registry.appointments());
    }

    #[test]
    fn corrupt_appointments_file_opens_as_empty() {
        let temp = TempDir::new().unwrap();
        let registry = seeded(&temp);
        fs::write(registry.store().collection_path("appointments"), "[{").unwrap();

        let reopened = ClinicRegistry::open(registry.store().clone());
        assert_eq!(reopened.patients().len(), 1);
        assert!(reopened.appointments().is_empty());
    }

    #[test]
    fn storage_failure_surfaces_as_unrecoverable() {
        let temp = TempDir::new().unwrap();
        let blocker = temp.path().join("blocker");
        fs::write(&blocker, "").unwrap();
        let cfg = ClinicConfig::new(blocker.join("clinic")).unwrap();
        let mut registry = ClinicRegistry::open(RecordStore::new(&cfg));

        let err = registry.add_doctor("Bob", "Cardiology", "555-2").unwrap_err();
        assert!(matches!(err, ClinicError::Storage(_)));
        assert!(!err.is_recoverable());
        assert!(registry.doctors().is_empty());
    }

    /// Put a directory where patients.json lives so the next save fails.
    fn block_saves(registry: &ClinicRegistry) {
        let path = registry.store().collection_path("patients");
        fs::remove_file(&path).unwrap();
        fs::create_dir(&path).unwrap();
    }

    #[test]
    fn failed_save_leaves_memory_unchanged_on_delete() {
        let temp = TempDir::new().unwrap();
        let mut registry = seeded(&temp);
        registry.add_patient("Carol", 50, "F", "555-3", "").unwrap();
        block_saves(&registry);

        let err = registry.delete_patient("P1").unwrap_err();
        assert!(matches!(err, ClinicError::Storage(_)));
        let ids: Vec<&str> = registry.patients().iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["P1", "P2"]);
        assert!(registry.appointment("A1").is_some());

        assert!(registry.delete_doctor("D1").is_err());
        assert!(registry.doctor("D1").is_some());
        assert_eq!(registry.appointments().len(), 1);
    }

    #[test]
    fn failed_save_leaves_memory_unchanged_on_schedule_and_cancel() {
        let temp = TempDir::new().unwrap();
        let mut registry = seeded(&temp);
        block_saves(&registry);

        let err = registry
            .schedule_appointment("P1", "D1", "2024-01-02 10:00", "")
            .unwrap_err();
        assert!(matches!(err, ClinicError::Storage(_)));
        assert_eq!(registry.appointments().len(), 1);

        assert!(registry.cancel_appointment("A1").is_err());
        assert!(registry.appointment("A1").is_some());

        assert!(registry.add_patient("Dan", 20, "M", "9", "").is_err());
        assert_eq!(registry.patients().len(), 1);
    }
}
