use crate::record_validation::{self, RecordValidationError};
use crate::student::{Student, StudentStatus};
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum RosterError {
    Invalid(RecordValidationError),
}

impl fmt::Display for RosterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RosterError::Invalid(err) => write!(f, "invalid student: {err}"),
        }
    }
}

impl std::error::Error for RosterError {}

impl From<RecordValidationError> for RosterError {
    fn from(value: RecordValidationError) -> Self {
        Self::Invalid(value)
    }
}

/// Destination for students accepted by an import.
pub trait StudentSink {
    fn add_student(&mut self, student: Student) -> Result<(), RosterError>;
}

/// Search criteria; empty fields match everything.
#[derive(Debug, Clone, Default)]
pub struct StudentFilter {
    pub term: String,
    pub belt: String,
    pub status: Option<StudentStatus>,
}

#[derive(Debug, Clone, Default)]
pub struct Roster {
    students: Vec<Student>,
}

impl Roster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_students(students: Vec<Student>) -> Self {
        Self { students }
    }

    pub fn students(&self) -> &[Student] {
        &self.students
    }

    pub fn len(&self) -> usize {
        self.students.len()
    }

    pub fn is_empty(&self) -> bool {
        self.students.is_empty()
    }

    /// Replaces the whole collection, as a startup rehydrate does.
    pub fn set_students(&mut self, students: Vec<Student>) {
        self.students = students;
    }

    pub fn update_student(&mut self, student: Student) -> Result<bool, RosterError> {
        record_validation::validate_student(&student)?;
        match self.students.iter_mut().find(|s| s.id == student.id) {
            Some(slot) => {
                *slot = student;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub fn delete_student(&mut self, id: &str) -> bool {
        let before = self.students.len();
        self.students.retain(|s| s.id != id);
        self.students.len() != before
    }

    pub fn get(&self, id: &str) -> Option<&Student> {
        self.students.iter().find(|s| s.id == id)
    }

    pub fn find_by_dni(&self, dni: &str) -> Option<&Student> {
        let dni = dni.trim();
        if dni.is_empty() {
            return None;
        }
        self.students.iter().find(|s| s.dni.trim() == dni)
    }

    pub fn filter(&self, filter: &StudentFilter) -> Vec<&Student> {
        let term = filter.term.to_lowercase();
        self.students
            .iter()
            .filter(|s| {
                term.is_empty()
                    || s.name.to_lowercase().contains(&term)
                    || s.email.to_lowercase().contains(&term)
            })
            .filter(|s| filter.belt.is_empty() || s.belt == filter.belt)
            .filter(|s| filter.status.is_none_or(|status| s.status == status))
            .collect()
    }
}

impl StudentSink for Roster {
    fn add_student(&mut self, student: Student) -> Result<(), RosterError> {
        record_validation::validate_student(&student)?;
        self.students.push(student);
        Ok(())
    }
}

impl StudentSink for Vec<Student> {
    fn add_student(&mut self, student: Student) -> Result<(), RosterError> {
        self.push(student);
        Ok(())
    }
}
