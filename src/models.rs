use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssignmentType {
    Single,
    Weekly,
    Monthly,
}

impl AssignmentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssignmentType::Single => "single",
            AssignmentType::Weekly => "weekly",
            AssignmentType::Monthly => "monthly",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "single" => Some(AssignmentType::Single),
            "weekly" => Some(AssignmentType::Weekly),
            "monthly" => Some(AssignmentType::Monthly),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssignmentStatus {
    Assigned,
    InProgress,
    Completed,
    Overdue,
}

impl AssignmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssignmentStatus::Assigned => "assigned",
            AssignmentStatus::InProgress => "in_progress",
            AssignmentStatus::Completed => "completed",
            AssignmentStatus::Overdue => "overdue",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "assigned" => Some(AssignmentStatus::Assigned),
            "in_progress" => Some(AssignmentStatus::InProgress),
            "completed" => Some(AssignmentStatus::Completed),
            "overdue" => Some(AssignmentStatus::Overdue),
            _ => None,
        }
    }
}

/// Embedded progress document, stored as JSON in the `progress` column.
///
/// Cursors start at `(0, 1, 1)`: exercise indices are zero-based, set and
/// rep counters are one-based.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssignmentProgress {
    #[serde(default)]
    pub current_exercise_index: u32,
    #[serde(default = "default_one")]
    pub current_set: u32,
    #[serde(default = "default_one")]
    pub current_rep: u32,
    #[serde(default)]
    pub completed_exercises: Vec<u32>,
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_activity_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub total_exercises: u32,
    #[serde(default)]
    pub completion_percentage: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_time_seconds: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exercise_times: Option<Value>,
}

fn default_one() -> u32 {
    1
}

impl Default for AssignmentProgress {
    fn default() -> Self {
        Self {
            current_exercise_index: 0,
            current_set: 1,
            current_rep: 1,
            completed_exercises: Vec::new(),
            started_at: None,
            completed_at: None,
            last_activity_at: None,
            total_exercises: 0,
            completion_percentage: 0,
            total_time_seconds: None,
            exercise_times: None,
        }
    }
}

/// Partial progress update. Fields left as `None` are untouched by the merge.
///
/// `completed_exercise_index` marks that exercise as done and advances the
/// cursor past it; `workout_completed` forces the whole assignment into the
/// completed state.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProgressDelta {
    #[serde(default)]
    pub current_exercise_index: Option<u32>,
    #[serde(default)]
    pub current_set: Option<u32>,
    #[serde(default)]
    pub current_rep: Option<u32>,
    #[serde(default)]
    pub completed_exercise_index: Option<u32>,
    #[serde(default)]
    pub workout_completed: Option<bool>,
    #[serde(default)]
    pub completion_percentage: Option<u8>,
    #[serde(default)]
    pub total_time_seconds: Option<u64>,
    #[serde(default)]
    pub exercise_times: Option<Value>,
}

#[derive(Debug, Clone, Serialize)]
pub struct WorkoutAssignment {
    pub id: i64,
    pub athlete_id: i64,
    pub assignment_type: AssignmentType,
    pub exercise_block: Value,
    pub progress: AssignmentProgress,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub status: AssignmentStatus,
    pub assigned_by: i64,
    pub assigned_at: DateTime<Utc>,
    pub meta: Option<Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow, Clone)]
pub struct DbWorkoutAssignment {
    pub id: Option<i64>,
    pub athlete_id: Option<i64>,
    pub assignment_type: Option<String>,
    pub exercise_block: Option<String>,
    pub progress: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub status: Option<String>,
    pub assigned_by: Option<i64>,
    pub assigned_at: Option<NaiveDateTime>,
    pub meta: Option<String>,
    pub created_at: Option<NaiveDateTime>,
    pub updated_at: Option<NaiveDateTime>,
}

impl From<DbWorkoutAssignment> for WorkoutAssignment {
    fn from(db: DbWorkoutAssignment) -> Self {
        Self {
            id: db.id.unwrap_or_default(),
            athlete_id: db.athlete_id.unwrap_or_default(),
            assignment_type: db
                .assignment_type
                .as_deref()
                .and_then(AssignmentType::from_str)
                .unwrap_or(AssignmentType::Single),
            exercise_block: db
                .exercise_block
                .as_deref()
                .and_then(|s| serde_json::from_str(s).ok())
                .unwrap_or(Value::Null),
            progress: db
                .progress
                .as_deref()
                .and_then(|s| serde_json::from_str(s).ok())
                .unwrap_or_default(),
            start_date: db.start_date,
            end_date: db.end_date,
            status: db
                .status
                .as_deref()
                .and_then(AssignmentStatus::from_str)
                .unwrap_or(AssignmentStatus::Assigned),
            assigned_by: db.assigned_by.unwrap_or_default(),
            assigned_at: utc_or_now(db.assigned_at),
            meta: db.meta.as_deref().and_then(|s| serde_json::from_str(s).ok()),
            created_at: utc_or_now(db.created_at),
            updated_at: utc_or_now(db.updated_at),
        }
    }
}

fn utc_or_now(dt: Option<NaiveDateTime>) -> DateTime<Utc> {
    dt.map(|dt| DateTime::<Utc>::from_naive_utc_and_offset(dt, Utc))
        .unwrap_or_else(Utc::now)
}

/// Everything needed to create an assignment except the generated fields
/// (`id`, timestamps) and the fully populated progress document.
#[derive(Debug, Clone)]
pub struct NewWorkoutAssignment {
    pub athlete_id: i64,
    pub assignment_type: AssignmentType,
    pub exercise_block: Value,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub assigned_by: i64,
    pub meta: Option<Value>,
    pub progress_overrides: Option<ProgressDelta>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Workout {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub coach_id: i64,
    pub exercise_block: Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow, Clone)]
pub struct DbWorkout {
    pub id: Option<i64>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub coach_id: Option<i64>,
    pub exercise_block: Option<String>,
    pub created_at: Option<NaiveDateTime>,
    pub updated_at: Option<NaiveDateTime>,
}

impl From<DbWorkout> for Workout {
    fn from(db: DbWorkout) -> Self {
        Self {
            id: db.id.unwrap_or_default(),
            name: db.name.unwrap_or_default(),
            description: db.description.unwrap_or_default(),
            coach_id: db.coach_id.unwrap_or_default(),
            exercise_block: db
                .exercise_block
                .as_deref()
                .and_then(|s| serde_json::from_str(s).ok())
                .unwrap_or(Value::Null),
            created_at: utc_or_now(db.created_at),
            updated_at: utc_or_now(db.updated_at),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Notification {
    pub id: i64,
    pub user_id: i64,
    pub title: String,
    pub body: String,
    pub notification_type: String,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow, Clone)]
pub struct DbNotification {
    pub id: Option<i64>,
    pub user_id: Option<i64>,
    pub title: Option<String>,
    pub body: Option<String>,
    pub notification_type: Option<String>,
    pub read: Option<bool>,
    pub created_at: Option<NaiveDateTime>,
}

impl From<DbNotification> for Notification {
    fn from(db: DbNotification) -> Self {
        Self {
            id: db.id.unwrap_or_default(),
            user_id: db.user_id.unwrap_or_default(),
            title: db.title.unwrap_or_default(),
            body: db.body.unwrap_or_default(),
            notification_type: db.notification_type.unwrap_or_default(),
            read: db.read.unwrap_or_default(),
            created_at: utc_or_now(db.created_at),
        }
    }
}
