use crate::belts::Gup;
use crate::config::DEFAULT_BELT;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StudentStatus {
    #[default]
    Active,
    Inactive,
    Suspended,
}

impl StudentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            StudentStatus::Active => "active",
            StudentStatus::Inactive => "inactive",
            StudentStatus::Suspended => "suspended",
        }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "active" => Some(StudentStatus::Active),
            "inactive" => Some(StudentStatus::Inactive),
            "suspended" => Some(StudentStatus::Suspended),
            _ => None,
        }
    }

    /// Unknown or blank values fall back to `Active`.
    pub fn parse_lenient(value: &str) -> Self {
        Self::from_str(value).unwrap_or_default()
    }
}

impl fmt::Display for StudentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A student on the school roster.
///
/// Dates are kept as the text the school typed in (`YYYY-MM-DD` when entered
/// through the app, anything a spreadsheet produced when imported).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    pub id: String,
    #[serde(default)]
    pub dni: String,
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub emergency_contact: String,
    #[serde(default)]
    pub birth_date: String,
    #[serde(default)]
    pub join_date: String,
    #[serde(default = "default_belt")]
    pub belt: String,
    #[serde(default)]
    pub monthly_fee: f64,
    #[serde(default)]
    pub status: StudentStatus,
    #[serde(default)]
    pub practice_location: String,
    #[serde(default)]
    pub shift: String,
    #[serde(default)]
    pub instructor: String,
    #[serde(default)]
    pub is_complete_for_diploma: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observations: Option<String>,
}

fn default_belt() -> String {
    DEFAULT_BELT.to_string()
}

impl Student {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            dni: String::new(),
            name: name.into(),
            email: String::new(),
            phone: String::new(),
            emergency_contact: String::new(),
            birth_date: String::new(),
            join_date: String::new(),
            belt: default_belt(),
            monthly_fee: 0.0,
            status: StudentStatus::Active,
            practice_location: String::new(),
            shift: String::new(),
            instructor: String::new(),
            is_complete_for_diploma: false,
            observations: None,
        }
    }

    /// The grade named by `belt`, if it is a known gup code or label.
    pub fn gup(&self) -> Option<Gup> {
        Gup::from_str(&self.belt)
    }
}
