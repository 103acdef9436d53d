use crate::record_validation::{self, RecordValidationError};
use chrono::{DateTime, Datelike, Days, NaiveDate, Utc, Weekday};
use serde::{Deserialize, Serialize};

/// Class days, serialized with the school's Spanish day names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DayOfWeek {
    #[serde(rename = "lunes")]
    Monday,
    #[serde(rename = "martes")]
    Tuesday,
    #[serde(rename = "miércoles")]
    Wednesday,
    #[serde(rename = "jueves")]
    Thursday,
    #[serde(rename = "viernes")]
    Friday,
    #[serde(rename = "sábado")]
    Saturday,
    #[serde(rename = "domingo")]
    Sunday,
}

impl DayOfWeek {
    pub fn as_str(&self) -> &'static str {
        match self {
            DayOfWeek::Monday => "lunes",
            DayOfWeek::Tuesday => "martes",
            DayOfWeek::Wednesday => "miércoles",
            DayOfWeek::Thursday => "jueves",
            DayOfWeek::Friday => "viernes",
            DayOfWeek::Saturday => "sábado",
            DayOfWeek::Sunday => "domingo",
        }
    }
}

impl From<Weekday> for DayOfWeek {
    fn from(value: Weekday) -> Self {
        match value {
            Weekday::Mon => DayOfWeek::Monday,
            Weekday::Tue => DayOfWeek::Tuesday,
            Weekday::Wed => DayOfWeek::Wednesday,
            Weekday::Thu => DayOfWeek::Thursday,
            Weekday::Fri => DayOfWeek::Friday,
            Weekday::Sat => DayOfWeek::Saturday,
            Weekday::Sun => DayOfWeek::Sunday,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AgeGroup {
    Infantiles,
    Juveniles,
    Adultos,
    JuvenilesAdultos,
}

impl AgeGroup {
    pub fn as_str(&self) -> &'static str {
        match self {
            AgeGroup::Infantiles => "infantiles",
            AgeGroup::Juveniles => "juveniles",
            AgeGroup::Adultos => "adultos",
            AgeGroup::JuvenilesAdultos => "juveniles-adultos",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum SessionStatus {
    #[default]
    Scheduled,
    Completed,
    Cancelled,
    InProgress,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttendanceStatus {
    Present,
    Absent,
    Late,
    Excused,
}

/// A recurring weekly class slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassSchedule {
    pub id: String,
    pub location: String,
    pub days: Vec<DayOfWeek>,
    /// Start time as `HH:MM`.
    pub time: String,
    pub age_group: AgeGroup,
    pub instructor: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_capacity: Option<u32>,
    pub is_active: bool,
    pub created_date: DateTime<Utc>,
}

/// One dated occurrence of a schedule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassSession {
    pub id: String,
    pub schedule_id: String,
    pub date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actual_time: Option<String>,
    pub instructor: String,
    #[serde(default)]
    pub status: SessionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    /// Number of `present` attendance records for this session.
    #[serde(default)]
    pub attendance_count: u32,
    pub created_date: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceRecord {
    pub id: String,
    pub session_id: String,
    pub student_id: String,
    pub status: AttendanceStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arrival_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub created_date: DateTime<Utc>,
}

impl ClassSession {
    pub fn session_id(schedule_id: &str, date: NaiveDate) -> String {
        format!("session-{}-{}", schedule_id, date.format("%Y-%m-%d"))
    }

    pub fn scheduled(schedule: &ClassSchedule, date: NaiveDate, now: DateTime<Utc>) -> Self {
        Self {
            id: Self::session_id(&schedule.id, date),
            schedule_id: schedule.id.clone(),
            date,
            actual_time: None,
            instructor: schedule.instructor.clone(),
            status: SessionStatus::Scheduled,
            notes: None,
            attendance_count: 0,
            created_date: now,
        }
    }
}

/// In-memory class state: schedules, their sessions, and attendance.
#[derive(Debug, Clone, Default)]
pub struct ClassBook {
    schedules: Vec<ClassSchedule>,
    sessions: Vec<ClassSession>,
    attendance: Vec<AttendanceRecord>,
}

impl ClassBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedules(&self) -> &[ClassSchedule] {
        &self.schedules
    }

    pub fn sessions(&self) -> &[ClassSession] {
        &self.sessions
    }

    pub fn attendance(&self) -> &[AttendanceRecord] {
        &self.attendance
    }

    pub fn set_schedules(&mut self, schedules: Vec<ClassSchedule>) {
        self.schedules = schedules;
    }

    pub fn add_schedule(&mut self, schedule: ClassSchedule) -> Result<(), RecordValidationError> {
        record_validation::validate_schedule(&schedule)?;
        self.schedules.push(schedule);
        Ok(())
    }

    pub fn update_schedule(
        &mut self,
        schedule: ClassSchedule,
    ) -> Result<bool, RecordValidationError> {
        record_validation::validate_schedule(&schedule)?;
        match self.schedules.iter_mut().find(|s| s.id == schedule.id) {
            Some(slot) => {
                *slot = schedule;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Removes the schedule and every session generated from it.
    pub fn delete_schedule(&mut self, id: &str) -> bool {
        let before = self.schedules.len();
        self.schedules.retain(|s| s.id != id);
        self.sessions.retain(|s| s.schedule_id != id);
        self.schedules.len() != before
    }

    pub fn add_session(&mut self, session: ClassSession) {
        self.sessions.push(session);
    }

    pub fn update_session(&mut self, session: ClassSession) -> bool {
        match self.sessions.iter_mut().find(|s| s.id == session.id) {
            Some(slot) => {
                *slot = session;
                true
            }
            None => false,
        }
    }

    /// Removes the session and its attendance records.
    pub fn delete_session(&mut self, id: &str) -> bool {
        let before = self.sessions.len();
        self.sessions.retain(|s| s.id != id);
        self.attendance.retain(|r| r.session_id != id);
        self.sessions.len() != before
    }

    pub fn session(&self, id: &str) -> Option<&ClassSession> {
        self.sessions.iter().find(|s| s.id == id)
    }

    pub fn sessions_on(&self, date: NaiveDate) -> Vec<&ClassSession> {
        self.sessions.iter().filter(|s| s.date == date).collect()
    }

    pub fn attendance_for_session(&self, session_id: &str) -> Vec<&AttendanceRecord> {
        self.attendance
            .iter()
            .filter(|r| r.session_id == session_id)
            .collect()
    }

    pub fn present_count(&self, session_id: &str) -> u32 {
        self.attendance
            .iter()
            .filter(|r| r.session_id == session_id && r.status == AttendanceStatus::Present)
            .count() as u32
    }

    /// Stores the record, replacing any earlier one for the same
    /// (session, student) pair, and refreshes the session's present count.
    pub fn record_attendance(&mut self, record: AttendanceRecord) {
        self.attendance.retain(|r| {
            !(r.session_id == record.session_id && r.student_id == record.student_id)
        });
        let session_id = record.session_id.clone();
        self.attendance.push(record);
        self.refresh_attendance_count(&session_id);
    }

    pub fn update_attendance(&mut self, record: AttendanceRecord) -> bool {
        let Some(slot) = self.attendance.iter_mut().find(|r| r.id == record.id) else {
            return false;
        };
        let previous_session = slot.session_id.clone();
        let session_id = record.session_id.clone();
        *slot = record;
        self.refresh_attendance_count(&session_id);
        if previous_session != session_id {
            self.refresh_attendance_count(&previous_session);
        }
        true
    }

    pub fn delete_attendance(&mut self, id: &str) -> bool {
        let Some(pos) = self.attendance.iter().position(|r| r.id == id) else {
            return false;
        };
        let record = self.attendance.remove(pos);
        self.refresh_attendance_count(&record.session_id);
        true
    }

    fn refresh_attendance_count(&mut self, session_id: &str) {
        let count = self.present_count(session_id);
        if let Some(session) = self.sessions.iter_mut().find(|s| s.id == session_id) {
            session.attendance_count = count;
        }
    }

    /// Creates a `scheduled` session for every active schedule on each
    /// matching day in `start..=end`. Existing session ids are left alone.
    /// Returns the number of sessions created.
    pub fn generate_sessions(
        &mut self,
        start: NaiveDate,
        end: NaiveDate,
        now: DateTime<Utc>,
    ) -> usize {
        let mut created = Vec::new();
        let mut date = start;
        while date <= end {
            let day = DayOfWeek::from(date.weekday());
            for schedule in self
                .schedules
                .iter()
                .filter(|s| s.is_active && s.days.contains(&day))
            {
                let id = ClassSession::session_id(&schedule.id, date);
                let exists = self.sessions.iter().any(|s| s.id == id)
                    || created.iter().any(|s: &ClassSession| s.id == id);
                if !exists {
                    created.push(ClassSession::scheduled(schedule, date, now));
                }
            }
            date = match date.checked_add_days(Days::new(1)) {
                Some(next) => next,
                None => break,
            };
        }
        let count = created.len();
        self.sessions.extend(created);
        count
    }
}
