use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use rocket::form::{self, FromFormField, ValueField};
use serde::{Deserialize, Serialize};

pub type GoalID = i64;
pub type TaskID = i64;
pub type TimeLogID = i64;

/// Life domain a task belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, FromFormField)]
pub enum Pillar {
    #[field(value = "HARD_WORK")]
    #[serde(rename = "HARD_WORK")]
    HardWork,
    #[field(value = "CALMNESS")]
    #[serde(rename = "CALMNESS")]
    Calmness,
    #[field(value = "FAMILY")]
    #[serde(rename = "FAMILY")]
    Family,
}

impl Pillar {
    pub const ALL: [Pillar; 3] = [Pillar::HardWork, Pillar::Calmness, Pillar::Family];

    pub fn as_str(self) -> &'static str {
        match self {
            Pillar::HardWork => "HARD_WORK",
            Pillar::Calmness => "CALMNESS",
            Pillar::Family => "FAMILY",
        }
    }

    pub fn parse(value: &str) -> Option<Pillar> {
        Pillar::ALL.iter().copied().find(|p| p.as_str() == value)
    }
}

impl fmt::Display for Pillar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How often a task is expected to recur.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, FromFormField)]
pub enum Frequency {
    #[field(value = "one_time")]
    #[serde(rename = "one_time")]
    OneTime,
    #[field(value = "daily")]
    #[serde(rename = "daily")]
    Daily,
    #[field(value = "weekly")]
    #[serde(rename = "weekly")]
    Weekly,
    #[field(value = "monthly")]
    #[serde(rename = "monthly")]
    Monthly,
    #[field(value = "quarterly")]
    #[serde(rename = "quarterly")]
    Quarterly,
    #[field(value = "yearly")]
    #[serde(rename = "yearly")]
    Yearly,
    #[field(value = "today")]
    #[serde(rename = "today")]
    Today,
}

impl Frequency {
    pub const ALL: [Frequency; 7] = [
        Frequency::OneTime,
        Frequency::Daily,
        Frequency::Weekly,
        Frequency::Monthly,
        Frequency::Quarterly,
        Frequency::Yearly,
        Frequency::Today,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Frequency::OneTime => "one_time",
            Frequency::Daily => "daily",
            Frequency::Weekly => "weekly",
            Frequency::Monthly => "monthly",
            Frequency::Quarterly => "quarterly",
            Frequency::Yearly => "yearly",
            Frequency::Today => "today",
        }
    }

    pub fn parse(value: &str) -> Option<Frequency> {
        Frequency::ALL.iter().copied().find(|f| f.as_str() == value)
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Period a goal's time budget covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, FromFormField)]
pub enum GoalType {
    #[field(value = "week")]
    #[serde(rename = "week")]
    Week,
    #[field(value = "month")]
    #[serde(rename = "month")]
    Month,
    #[field(value = "quarter")]
    #[serde(rename = "quarter")]
    Quarter,
    #[field(value = "year")]
    #[serde(rename = "year")]
    Year,
}

impl GoalType {
    pub const ALL: [GoalType; 4] = [
        GoalType::Week,
        GoalType::Month,
        GoalType::Quarter,
        GoalType::Year,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            GoalType::Week => "week",
            GoalType::Month => "month",
            GoalType::Quarter => "quarter",
            GoalType::Year => "year",
        }
    }

    pub fn parse(value: &str) -> Option<GoalType> {
        GoalType::ALL.iter().copied().find(|g| g.as_str() == value)
    }
}

impl fmt::Display for GoalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A milestone with a time budget over a period.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Goal {
    pub id: GoalID,
    pub name: String,
    pub goal_type: GoalType,
    pub description: Option<String>,
    pub target_minutes: i64,
    pub used_minutes: i64,
    pub due_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Goal {
    /// Share of the target already used, capped at 100 and rounded to one
    /// decimal. A goal without a positive target reports 0.
    pub fn progress_percent(&self) -> f64 {
        if self.target_minutes <= 0 {
            return 0.0;
        }
        let percent = self.used_minutes as f64 / self.target_minutes as f64 * 100.0;
        ((percent * 10.0).round() / 10.0).min(100.0)
    }

    /// Minutes still available before the target is exhausted, never negative.
    pub fn remaining_minutes(&self) -> i64 {
        (self.target_minutes - self.used_minutes).max(0)
    }
}

/// An actionable habit or activity, optionally linked to a goal and to a
/// parent task. Tasks form a tree through `parent_task_id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskID,
    pub name: String,
    pub pillar: Pillar,
    pub frequency: Frequency,
    pub success_target_percent: i64,
    pub ideal_gap_days: Option<i64>,
    pub goal_id: Option<GoalID>,
    pub parent_task_id: Option<TaskID>,
    pub is_daily_followup: bool,
    pub is_separately_monitored: bool,
    pub archived: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A dated record of minutes spent on a task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeLog {
    pub id: TimeLogID,
    pub task_id: TaskID,
    pub day: NaiveDate,
    pub slot_start: Option<NaiveTime>,
    pub slot_end: Option<NaiveTime>,
    pub minutes: i64,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewGoal {
    pub name: String,
    pub goal_type: GoalType,
    pub description: Option<String>,
    pub target_minutes: i64,
    pub due_date: Option<NaiveDate>,
}

#[derive(Debug, Clone)]
pub struct NewTask {
    pub name: String,
    pub pillar: Pillar,
    pub frequency: Frequency,
    pub success_target_percent: i64,
    pub ideal_gap_days: Option<i64>,
    pub goal_id: Option<GoalID>,
    pub parent_task_id: Option<TaskID>,
    pub is_daily_followup: bool,
    pub is_separately_monitored: bool,
}

/// The editable subset of a task: name, pillar, and the two monitoring flags.
#[derive(Debug, Clone)]
pub struct TaskUpdate {
    pub name: String,
    pub pillar: Pillar,
    pub is_daily_followup: bool,
    pub is_separately_monitored: bool,
}

#[derive(Debug, Clone)]
pub struct NewTimeLog {
    pub task_id: TaskID,
    pub day: NaiveDate,
    pub slot_start: Option<NaiveTime>,
    pub slot_end: Option<NaiveTime>,
    pub minutes: i64,
    pub note: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct Welcome {
    pub message: String,
}

/// `YYYY-MM-DD` form field.
#[derive(Debug, Clone, Copy)]
pub struct DayField(pub NaiveDate);

impl<'v> FromFormField<'v> for DayField {
    fn from_value(field: ValueField<'v>) -> form::Result<'v, Self> {
        NaiveDate::parse_from_str(field.value, "%Y-%m-%d")
            .map(DayField)
            .map_err(|_| form::Error::validation("expected a date formatted YYYY-MM-DD").into())
    }
}

/// `HH:MM` or `HH:MM:SS` form field.
#[derive(Debug, Clone, Copy)]
pub struct TimeField(pub NaiveTime);

impl<'v> FromFormField<'v> for TimeField {
    fn from_value(field: ValueField<'v>) -> form::Result<'v, Self> {
        NaiveTime::parse_from_str(field.value, "%H:%M:%S")
            .or_else(|_| NaiveTime::parse_from_str(field.value, "%H:%M"))
            .map(TimeField)
            .map_err(|_| {
                form::Error::validation("expected a time formatted HH:MM or HH:MM:SS").into()
            })
    }
}

#[derive(Debug, FromForm)]
pub struct TaskForm {
    pub name: String,
    pub pillar: Pillar,
    pub allocated_time: i64, // accepted but not persisted
    pub frequency: Frequency,
    #[field(default = 90)]
    pub success_target_percent: i64,
    pub ideal_gap_days: Option<i64>,
    pub is_daily_followup: bool,
    pub is_separately_monitored: bool,
}

#[derive(Debug, FromForm)]
pub struct EditTaskForm {
    pub name: String,
    pub pillar: Pillar,
    pub is_daily_followup: bool,
    pub is_separately_monitored: bool,
}

#[derive(Debug, FromForm)]
pub struct TimeLogForm {
    pub minutes: i64,
    pub day: Option<DayField>,
    pub slot_start: Option<TimeField>,
    pub slot_end: Option<TimeField>,
    pub note: Option<String>,
}

#[derive(Debug, FromForm)]
pub struct GoalForm {
    pub name: String,
    pub goal_type: GoalType,
    pub description: Option<String>,
    #[field(default = 0)]
    pub target_minutes: i64,
    pub due_date: Option<DayField>,
}
