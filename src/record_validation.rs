use crate::classes::ClassSchedule;
use crate::payments::PaymentPlan;
use crate::student::Student;
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub struct RecordValidationError {
    message: String,
}

impl RecordValidationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for RecordValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for RecordValidationError {}

pub fn validate_student(student: &Student) -> Result<(), RecordValidationError> {
    if student.id.trim().is_empty() {
        return Err(RecordValidationError::new(format!(
            "student '{}' requires a non-empty id",
            student.name
        )));
    }
    if student.name.trim().is_empty() {
        return Err(RecordValidationError::new(format!(
            "student {} requires a non-empty name",
            student.id
        )));
    }
    if !student.monthly_fee.is_finite() || student.monthly_fee < 0.0 {
        return Err(RecordValidationError::new(format!(
            "student {} has invalid monthly fee {}",
            student.id, student.monthly_fee
        )));
    }
    Ok(())
}

pub fn validate_schedule(schedule: &ClassSchedule) -> Result<(), RecordValidationError> {
    if schedule.days.is_empty() {
        return Err(RecordValidationError::new(format!(
            "schedule {} requires at least one class day",
            schedule.id
        )));
    }
    if schedule.max_capacity == Some(0) {
        return Err(RecordValidationError::new(format!(
            "schedule {} has zero capacity",
            schedule.id
        )));
    }
    Ok(())
}

pub fn validate_plan(plan: &PaymentPlan) -> Result<(), RecordValidationError> {
    if !plan.monthly_amount.is_finite() || plan.monthly_amount < 0.0 {
        return Err(RecordValidationError::new(format!(
            "plan {} has invalid monthly amount {}",
            plan.id, plan.monthly_amount
        )));
    }
    if !(1..=31).contains(&plan.due_day) {
        return Err(RecordValidationError::new(format!(
            "plan {} has due day {} outside 1..=31",
            plan.id, plan.due_day
        )));
    }
    if !plan.discount.is_finite() || !(0.0..=100.0).contains(&plan.discount) {
        return Err(RecordValidationError::new(format!(
            "plan {} has discount {} outside 0..=100 percent",
            plan.id, plan.discount
        )));
    }
    Ok(())
}
