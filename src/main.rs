/// Command-line interface for the clinic registry.
///
/// This module provides an interactive menu for managing patients, doctors
/// and appointments. All state changes go through `ClinicRegistry`.

use anyhow::Context;
use clap::Parser;
use clinic_registry::models::{parse_age, Appointment};
use clinic_registry::{
    AppointmentParty, ClinicConfig, ClinicRegistry, ClinicResult, RecordStore,
};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "clinic")]
#[command(about = "Patient, doctor and appointment records for a small clinic")]
struct Cli {
    /// Directory holding patients.json, doctors.json and appointments.json
    #[arg(long, env = "CLINIC_DATA_DIR", default_value = clinic_registry::config::DEFAULT_DATA_DIR)]
    data_dir: PathBuf,
}

/// Raised when standard input is exhausted.
#[derive(Debug, thiserror::Error)]
#[error("end of input")]
struct EndOfInput;

struct ClinicCLI {
    registry: ClinicRegistry,
    running: bool,
}

impl ClinicCLI {
    fn new(registry: ClinicRegistry) -> Self {
        ClinicCLI {
            registry,
            running: true,
        }
    }

    fn print_header(&self) {
        println!("\n{}", "=".repeat(60));
        println!("       CLINIC RECORD SYSTEM");
        println!("{}", "=".repeat(60));
    }

    fn print_menu(&self) {
        println!("\n--- Main Menu ---");
        println!("1. Patients");
        println!("2. Doctors");
        println!("3. Appointments");
        println!("4. Show all");
        println!("0. Exit");
        println!("{}", "-".repeat(20));
    }

    fn get_input(&self, prompt: &str) -> anyhow::Result<String> {
        print!("{}: ", prompt);
        io::stdout().flush()?;

        let mut input = String::new();
        if io::stdin().lock().read_line(&mut input)? == 0 {
            return Err(EndOfInput.into());
        }
        Ok(input.trim().to_string())
    }

    fn get_nonempty_input(&self, prompt: &str) -> anyhow::Result<String> {
        loop {
            let input = self.get_input(prompt)?;
            if !input.is_empty() {
                return Ok(input);
            }
            println!("Input cannot be empty");
        }
    }

    fn get_age_input(&self, prompt: &str) -> anyhow::Result<u32> {
        loop {
            match parse_age(&self.get_input(prompt)?) {
                Ok(age) => return Ok(age),
                Err(e) => println!("{}", e),
            }
        }
    }

    /// Print a recoverable error, or pass a storage failure up.
    fn report<T>(result: ClinicResult<T>) -> anyhow::Result<Option<T>> {
        match result {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.is_recoverable() => {
                println!("Error: {}", e);
                Ok(None)
            }
            Err(e) => Err(e).context("could not save clinic records"),
        }
    }

    fn patients_menu(&mut self) -> anyhow::Result<()> {
        loop {
            println!("\n--- Patients ---");
            println!("1. Add patient");
            println!("2. View all patients");
            println!("3. Search patients by name");
            println!("4. Delete patient");
            println!("0. Back");

            match self.get_input("Choose")?.as_str() {
                "1" => self.add_patient()?,
                "2" => self.view_patients(),
                "3" => {
                    let query = self.get_input("Search name")?;
                    let found = self.registry.find_patients_by_name(&query);
                    if found.is_empty() {
                        println!("No patients found.");
                    }
                    for p in found {
                        println!("  {}: {}, age {}, phone {}", p.id, p.name, p.age, p.phone);
                    }
                }
                "4" => {
                    let id = self.get_nonempty_input("Patient ID to delete")?;
                    let deleted = Self::report(self.registry.delete_patient(&id))?;
                    match deleted {
                        Some(true) => println!("Deleted."),
                        Some(false) => println!("Patient not found."),
                        None => {}
                    }
                }
                "0" => return Ok(()),
                _ => println!("Invalid choice"),
            }
        }
    }

    fn add_patient(&mut self) -> anyhow::Result<()> {
        let name = self.get_nonempty_input("Name")?;
        let age = self.get_age_input("Age")?;
        let gender = self.get_nonempty_input("Gender")?;
        let phone = self.get_nonempty_input("Phone")?;
        let notes = self.get_input("Notes (optional)")?;

        let result = self.registry.add_patient(&name, age, &gender, &phone, &notes);
        if let Some(patient) = Self::report(result)? {
            println!("\nAdded patient {} - {}", patient.id, patient.name);
        }
        Ok(())
    }

    fn view_patients(&self) {
        let patients = self.registry.patients();
        if patients.is_empty() {
            println!("No patients found.");
            return;
        }
        println!("Patients:");
        for p in patients {
            print!("  {}: {}, age {}, {}, phone {}", p.id, p.name, p.age, p.gender, p.phone);
            if p.notes.is_empty() {
                println!();
            } else {
                println!(" ({})", p.notes);
            }
        }
    }

    fn doctors_menu(&mut self) -> anyhow::Result<()> {
        loop {
            println!("\n--- Doctors ---");
            println!("1. Add doctor");
            println!("2. View all doctors");
            println!("3. Search doctors by name");
            println!("4. Delete doctor");
            println!("0. Back");

            match self.get_input("Choose")?.as_str() {
                "1" => {
                    let name = self.get_nonempty_input("Name")?;
                    let speciality = self.get_nonempty_input("Speciality")?;
                    let phone = self.get_nonempty_input("Phone")?;

                    let result = self.registry.add_doctor(&name, &speciality, &phone);
                    if let Some(doctor) = Self::report(result)? {
                        println!("\nAdded doctor {} - Dr. {}", doctor.id, doctor.name);
                    }
                }
                "2" => self.view_doctors(),
                "3" => {
                    let query = self.get_input("Search name")?;
                    let found = self.registry.find_doctors_by_name(&query);
                    if found.is_empty() {
                        println!("No doctors found.");
                    }
                    for d in found {
                        println!("  {}: Dr. {}, {}, phone {}", d.id, d.name, d.speciality, d.phone);
                    }
                }
                "4" => {
                    let id = self.get_nonempty_input("Doctor ID to delete")?;
                    let deleted = Self::report(self.registry.delete_doctor(&id))?;
                    match deleted {
                        Some(true) => println!("Deleted."),
                        Some(false) => println!("Doctor not found."),
                        None => {}
                    }
                }
                "0" => return Ok(()),
                _ => println!("Invalid choice"),
            }
        }
    }

    fn view_doctors(&self) {
        let doctors = self.registry.doctors();
        if doctors.is_empty() {
            println!("No doctors found.");
            return;
        }
        println!("Doctors:");
        for d in doctors {
            println!("  {}: Dr. {} ({}), phone {}", d.id, d.name, d.speciality, d.phone);
        }
    }

    fn appointments_menu(&mut self) -> anyhow::Result<()> {
        loop {
            println!("\n--- Appointments ---");
            println!("1. Schedule appointment");
            println!("2. View all appointments");
            println!("3. View appointments for patient");
            println!("4. View appointments for doctor");
            println!("5. Cancel appointment");
            println!("0. Back");

            match self.get_input("Choose")?.as_str() {
                "1" => self.schedule_appointment()?,
                "2" => self.view_appointments(),
                "3" => {
                    let id = self.get_nonempty_input("Patient ID")?;
                    self.print_appointments_for(AppointmentParty::Patient, &id);
                }
                "4" => {
                    let id = self.get_nonempty_input("Doctor ID")?;
                    self.print_appointments_for(AppointmentParty::Doctor, &id);
                }
                "5" => {
                    let id = self.get_nonempty_input("Appointment ID to cancel")?;
                    let cancelled = Self::report(self.registry.cancel_appointment(&id))?;
                    match cancelled {
                        Some(true) => println!("Cancelled."),
                        Some(false) => println!("Appointment not found."),
                        None => {}
                    }
                }
                "0" => return Ok(()),
                _ => println!("Invalid choice"),
            }
        }
    }

    fn schedule_appointment(&mut self) -> anyhow::Result<()> {
        let patient_id = self.get_nonempty_input("Patient ID")?;
        let doctor_id = self.get_nonempty_input("Doctor ID")?;
        let when = self.get_nonempty_input("Datetime (YYYY-MM-DD HH:MM)")?;
        let reason = self.get_input("Reason (optional)")?;

        let result = self
            .registry
            .schedule_appointment(&patient_id, &doctor_id, &when, &reason);
        if let Some(apt) = Self::report(result)? {
            println!("\nAppointment scheduled: {} at {}", apt.id, apt.scheduled_at);
        }
        Ok(())
    }

    fn patient_label(&self, apt: &Appointment) -> String {
        self.registry
            .patient(&apt.patient_id)
            .map(|p| p.name.clone())
            .unwrap_or_else(|| apt.patient_id.clone())
    }

    fn doctor_label(&self, apt: &Appointment) -> String {
        self.registry
            .doctor(&apt.doctor_id)
            .map(|d| d.name.clone())
            .unwrap_or_else(|| apt.doctor_id.clone())
    }

    fn view_appointments(&self) {
        let appointments = self.registry.appointments();
        if appointments.is_empty() {
            println!("No appointments.");
            return;
        }
        println!("Appointments:");
        for apt in appointments {
            println!(
                "  {}: {} - Patient: {} | Doctor: {} | Reason: {}",
                apt.id,
                apt.scheduled_at,
                self.patient_label(apt),
                self.doctor_label(apt),
                apt.reason
            );
        }
    }

    fn print_appointments_for(&self, party: AppointmentParty, id: &str) {
        let appointments = self.registry.list_appointments_for(party, id);
        if appointments.is_empty() {
            match party {
                AppointmentParty::Patient => println!("No appointments for patient."),
                AppointmentParty::Doctor => println!("No appointments for doctor."),
            }
            return;
        }
        for apt in appointments {
            match party {
                AppointmentParty::Patient => println!(
                    "  {}: {} with Dr. {} | Reason: {}",
                    apt.id,
                    apt.scheduled_at,
                    self.doctor_label(apt),
                    apt.reason
                ),
                AppointmentParty::Doctor => println!(
                    "  {}: {} - Patient: {} | Reason: {}",
                    apt.id,
                    apt.scheduled_at,
                    self.patient_label(apt),
                    apt.reason
                ),
            }
        }
    }

    fn show_all(&self) {
        let summary = self.registry.summary();
        println!(
            "\n--- All Data ({} patients, {} doctors, {} appointments) ---",
            summary.patients, summary.doctors, summary.appointments
        );
        self.view_patients();
        println!();
        self.view_doctors();
        println!();
        self.view_appointments();
    }

    fn run(&mut self) -> anyhow::Result<()> {
        self.print_header();

        while self.running {
            self.print_menu();

            let outcome = match self.get_input("Enter choice")?.as_str() {
                "1" => self.patients_menu(),
                "2" => self.doctors_menu(),
                "3" => self.appointments_menu(),
                "4" => {
                    self.show_all();
                    Ok(())
                }
                "0" => {
                    self.running = false;
                    println!("\nGoodbye!");
                    Ok(())
                }
                _ => {
                    println!("Invalid choice");
                    Ok(())
                }
            };
            outcome?;
        }
        Ok(())
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "clinic_registry=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let config = ClinicConfig::new(cli.data_dir)?;
    let registry = ClinicRegistry::open(RecordStore::new(&config));
    let mut app = ClinicCLI::new(registry);

    match app.run() {
        Err(e) if e.is::<EndOfInput>() => {
            println!("\nGoodbye!");
            Ok(())
        }
        other => other,
    }
}
