use crate::record_validation::{self, RecordValidationError};
use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

const OVERDUE_PENALTY_RATE: f64 = 0.05;
const OVERDUE_PENALTY_GRACE_DAYS: i64 = 7;
const MIN_PERIOD_YEAR: i32 = 0;
const MAX_PERIOD_YEAR: i32 = 9999;

/// A billing cycle, written `YYYY-MM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BillingPeriod {
    year: i32,
    month: u32,
}

impl BillingPeriod {
    /// `None` unless the year fits the four-digit `YYYY-MM` form.
    pub fn new(year: i32, month: u32) -> Option<Self> {
        if !(MIN_PERIOD_YEAR..=MAX_PERIOD_YEAR).contains(&year) {
            return None;
        }
        NaiveDate::from_ymd_opt(year, month, 1).map(|_| Self { year, month })
    }

    /// The period `date` falls in, or `None` for years outside `0000..=9999`.
    pub fn containing(date: NaiveDate) -> Option<Self> {
        Self::new(date.year(), date.month())
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    pub fn first_day(&self) -> NaiveDate {
        NaiveDate::from_ymd_opt(self.year, self.month, 1).unwrap_or(NaiveDate::MIN)
    }

    pub fn last_day(&self) -> NaiveDate {
        let (year, month) = if self.month == 12 {
            (self.year + 1, 1)
        } else {
            (self.year, self.month + 1)
        };
        NaiveDate::from_ymd_opt(year, month, 1)
            .and_then(|d| d.pred_opt())
            .unwrap_or(NaiveDate::MAX)
    }

    /// The given day within this period, clamped to the month's last day.
    pub fn day(&self, day: u32) -> NaiveDate {
        let last = self.last_day();
        if day >= last.day() {
            return last;
        }
        NaiveDate::from_ymd_opt(self.year, self.month, day.max(1)).unwrap_or(last)
    }
}

impl fmt::Display for BillingPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsePeriodError(String);

impl fmt::Display for ParsePeriodError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid billing period '{}' (expected YYYY-MM)", self.0)
    }
}

impl std::error::Error for ParsePeriodError {}

impl FromStr for BillingPeriod {
    type Err = ParsePeriodError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParsePeriodError(s.to_string());
        let (year, month) = s.trim().split_once('-').ok_or_else(err)?;
        if year.len() != 4 || month.len() != 2 {
            return Err(err());
        }
        let year = year.parse::<i32>().map_err(|_| err())?;
        let month = month.parse::<u32>().map_err(|_| err())?;
        Self::new(year, month).ok_or_else(err)
    }
}

impl TryFrom<String> for BillingPeriod {
    type Error = ParsePeriodError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<BillingPeriod> for String {
    fn from(value: BillingPeriod) -> Self {
        value.to_string()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PaymentMethod {
    #[serde(rename = "efectivo")]
    Cash,
    #[serde(rename = "transferencia")]
    Transfer,
    #[serde(rename = "tarjeta")]
    Card,
    #[serde(rename = "cheque")]
    Cheque,
    #[serde(rename = "otro")]
    Other,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "efectivo",
            PaymentMethod::Transfer => "transferencia",
            PaymentMethod::Card => "tarjeta",
            PaymentMethod::Cheque => "cheque",
            PaymentMethod::Other => "otro",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    #[default]
    Pending,
    Paid,
    Overdue,
    Partial,
    Cancelled,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Paid => "paid",
            PaymentStatus::Overdue => "overdue",
            PaymentStatus::Partial => "partial",
            PaymentStatus::Cancelled => "cancelled",
        }
    }
}

/// One billing-period charge for a student.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    pub id: String,
    pub student_id: String,
    pub amount: f64,
    pub due_date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paid_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<PaymentMethod>,
    #[serde(default)]
    pub status: PaymentStatus,
    pub period: BillingPeriod,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    /// Absolute discount already subtracted from `amount`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discount: Option<f64>,
    /// Late surcharge on top of `amount`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub penalty: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receipt_number: Option<String>,
    pub created_date: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paid_by: Option<String>,
}

/// Recurring monthly billing template for one student.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentPlan {
    pub id: String,
    pub student_id: String,
    pub monthly_amount: f64,
    /// Day of month the charge falls due.
    pub due_day: u32,
    pub start_date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
    pub is_active: bool,
    /// Permanent discount in percent.
    #[serde(default)]
    pub discount: f64,
    pub created_date: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl PaymentPlan {
    pub fn discount_amount(&self) -> f64 {
        self.monthly_amount * self.discount / 100.0
    }

    pub fn payment_for(&self, period: BillingPeriod, now: DateTime<Utc>) -> Payment {
        let discount = self.discount_amount();
        Payment {
            id: format!("payment-{}-{}", period, self.student_id),
            student_id: self.student_id.clone(),
            amount: self.monthly_amount - discount,
            due_date: period.day(self.due_day),
            paid_date: None,
            method: None,
            status: PaymentStatus::Pending,
            period,
            notes: self.notes.clone(),
            discount: Some(discount),
            penalty: None,
            receipt_number: None,
            created_date: now,
            paid_by: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReminderKind {
    PreDue,
    Overdue,
    Custom,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentReminder {
    pub id: String,
    pub student_id: String,
    pub payment_id: String,
    #[serde(rename = "type")]
    pub kind: ReminderKind,
    pub message: String,
    pub sent_date: DateTime<Utc>,
    pub is_read: bool,
}

/// Details recorded when a payment is settled.
#[derive(Debug, Clone)]
pub struct PaymentReceipt {
    pub paid_date: NaiveDate,
    pub method: PaymentMethod,
    pub receipt_number: Option<String>,
    pub paid_by: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct PaymentFilter {
    pub period: Option<BillingPeriod>,
    pub status: Option<PaymentStatus>,
    pub student_id: Option<String>,
    pub overdue_only: bool,
}

/// In-memory payment state: charges, plans, and reminders.
#[derive(Debug, Clone, Default)]
pub struct Ledger {
    payments: Vec<Payment>,
    plans: Vec<PaymentPlan>,
    reminders: Vec<PaymentReminder>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn payments(&self) -> &[Payment] {
        &self.payments
    }

    pub fn plans(&self) -> &[PaymentPlan] {
        &self.plans
    }

    pub fn reminders(&self) -> &[PaymentReminder] {
        &self.reminders
    }

    pub fn set_payments(&mut self, payments: Vec<Payment>) {
        self.payments = payments;
    }

    pub fn add_payment(&mut self, payment: Payment) {
        self.payments.push(payment);
    }

    pub fn update_payment(&mut self, payment: Payment) -> bool {
        match self.payments.iter_mut().find(|p| p.id == payment.id) {
            Some(slot) => {
                *slot = payment;
                true
            }
            None => false,
        }
    }

    pub fn delete_payment(&mut self, id: &str) -> bool {
        let before = self.payments.len();
        self.payments.retain(|p| p.id != id);
        self.payments.len() != before
    }

    pub fn payment(&self, id: &str) -> Option<&Payment> {
        self.payments.iter().find(|p| p.id == id)
    }

    pub fn mark_paid(&mut self, payment_id: &str, receipt: PaymentReceipt) -> bool {
        let Some(payment) = self.payments.iter_mut().find(|p| p.id == payment_id) else {
            return false;
        };
        payment.status = PaymentStatus::Paid;
        payment.paid_date = Some(receipt.paid_date);
        payment.method = Some(receipt.method);
        payment.receipt_number = receipt.receipt_number;
        payment.paid_by = receipt.paid_by;
        if receipt.notes.is_some() {
            payment.notes = receipt.notes;
        }
        true
    }

    pub fn add_plan(&mut self, plan: PaymentPlan) -> Result<(), RecordValidationError> {
        record_validation::validate_plan(&plan)?;
        self.plans.push(plan);
        Ok(())
    }

    pub fn update_plan(&mut self, plan: PaymentPlan) -> Result<bool, RecordValidationError> {
        record_validation::validate_plan(&plan)?;
        match self.plans.iter_mut().find(|p| p.id == plan.id) {
            Some(slot) => {
                *slot = plan;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub fn delete_plan(&mut self, id: &str) -> bool {
        let before = self.plans.len();
        self.plans.retain(|p| p.id != id);
        self.plans.len() != before
    }

    pub fn add_reminder(&mut self, reminder: PaymentReminder) {
        self.reminders.push(reminder);
    }

    pub fn mark_reminder_read(&mut self, id: &str) -> bool {
        match self.reminders.iter_mut().find(|r| r.id == id) {
            Some(reminder) => {
                reminder.is_read = true;
                true
            }
            None => false,
        }
    }

    pub fn delete_reminder(&mut self, id: &str) -> bool {
        let before = self.reminders.len();
        self.reminders.retain(|r| r.id != id);
        self.reminders.len() != before
    }

    pub fn has_payment_for(&self, student_id: &str, period: BillingPeriod) -> bool {
        self.payments
            .iter()
            .any(|p| p.student_id == student_id && p.period == period)
    }

    /// Creates a pending payment for every active plan whose student has no
    /// payment in `period` yet. Running it again for the same period adds
    /// nothing. Returns the number of payments created.
    pub fn generate_monthly_payments(&mut self, period: BillingPeriod, now: DateTime<Utc>) -> usize {
        let mut created = 0;
        for plan in self.plans.iter().filter(|p| p.is_active) {
            let exists = self
                .payments
                .iter()
                .any(|p| p.student_id == plan.student_id && p.period == period);
            if exists {
                continue;
            }
            self.payments.push(plan.payment_for(period, now));
            created += 1;
        }
        created
    }

    /// Marks pending payments past their due date as overdue, adding a
    /// floored 5% penalty once they are more than a week late. Returns the
    /// number of payments that changed status.
    pub fn update_payment_statuses(&mut self, today: NaiveDate) -> usize {
        let mut changed = 0;
        for payment in self
            .payments
            .iter_mut()
            .filter(|p| p.status == PaymentStatus::Pending && p.due_date < today)
        {
            payment.status = PaymentStatus::Overdue;
            let days_overdue = (today - payment.due_date).num_days();
            if days_overdue > OVERDUE_PENALTY_GRACE_DAYS {
                payment.penalty = Some((payment.amount * OVERDUE_PENALTY_RATE).floor());
            }
            changed += 1;
        }
        changed
    }

    pub fn filter(&self, filter: &PaymentFilter) -> Vec<&Payment> {
        self.payments
            .iter()
            .filter(|p| filter.period.is_none_or(|period| p.period == period))
            .filter(|p| filter.status.is_none_or(|status| p.status == status))
            .filter(|p| {
                filter
                    .student_id
                    .as_deref()
                    .is_none_or(|id| p.student_id == id)
            })
            .filter(|p| !filter.overdue_only || p.status == PaymentStatus::Overdue)
            .collect()
    }
}
