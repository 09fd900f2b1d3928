use std::collections::HashMap;

use chrono::{Datelike, NaiveDate, Weekday};
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::models::AssignmentType;

/// One exercise entry inside a block. Payloads in the wild carry `sets` and
/// `reps` as either JSON numbers or numeric strings; anything unparseable is
/// treated as absent.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Exercise {
    #[serde(default)]
    pub name: String,
    #[serde(default, deserialize_with = "lenient_count")]
    pub sets: Option<u32>,
    #[serde(default, deserialize_with = "lenient_count")]
    pub reps: Option<u32>,
}

impl Exercise {
    pub fn sets_or_default(&self) -> u32 {
        self.sets.unwrap_or(1)
    }

    pub fn reps_or_default(&self) -> u32 {
        self.reps.unwrap_or(1)
    }
}

fn lenient_count<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| match v {
        Value::Number(n) => n.as_u64().map(|n| n as u32),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }))
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExerciseGroup {
    #[serde(default)]
    pub exercises: Vec<Exercise>,
}

/// A single day's work: either a flat exercise list or a list of block
/// groups. Block-structured payloads win when both are present.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DayPlan {
    #[serde(default)]
    pub exercises: Vec<Exercise>,
    #[serde(default)]
    pub blocks: Vec<ExerciseGroup>,
}

impl DayPlan {
    pub fn flattened(&self) -> Vec<&Exercise> {
        if !self.blocks.is_empty() {
            self.blocks
                .iter()
                .flat_map(|b| b.exercises.iter())
                .collect()
        } else {
            self.exercises.iter().collect()
        }
    }

    pub fn exercise_count(&self) -> u32 {
        self.flattened().len() as u32
    }

    pub fn is_rest(&self) -> bool {
        self.flattened().is_empty()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WeeklySchedule {
    #[serde(default)]
    pub daily_workouts: HashMap<String, DayPlan>,
}

impl WeeklySchedule {
    /// Day selection is a pure function of the schedule and a reference
    /// date, so callers can test it without touching the wall clock.
    pub fn day_for(&self, reference: NaiveDate) -> Option<&DayPlan> {
        let key = weekday_key(reference.weekday());
        self.daily_workouts
            .iter()
            .find(|(day, _)| day.eq_ignore_ascii_case(key))
            .map(|(_, plan)| plan)
    }

    pub fn total_exercises(&self) -> u32 {
        self.daily_workouts
            .iter()
            .map(|(_, plan)| plan.exercise_count())
            .sum()
    }
}

pub fn weekday_key(weekday: Weekday) -> &'static str {
    match weekday {
        Weekday::Mon => "monday",
        Weekday::Tue => "tuesday",
        Weekday::Wed => "wednesday",
        Weekday::Thu => "thursday",
        Weekday::Fri => "friday",
        Weekday::Sat => "saturday",
        Weekday::Sun => "sunday",
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MonthlyWeek {
    #[serde(default)]
    pub week_number: Option<u32>,
    #[serde(default)]
    pub workout_id: Option<i64>,
    #[serde(default)]
    pub is_rest_week: bool,
}

impl MonthlyWeek {
    pub fn is_trackable(&self) -> bool {
        !self.is_rest_week && self.workout_id.is_some()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MonthlyStructure {
    #[serde(default)]
    pub weekly_structure: Vec<MonthlyWeek>,
}

impl MonthlyStructure {
    pub fn week(&self, week_number: u32) -> Option<&MonthlyWeek> {
        self.weekly_structure
            .iter()
            .find(|w| w.week_number == Some(week_number))
    }
}

/// Typed view of the otherwise opaque `exercise_block` payload, dispatched
/// on `assignment_type`. All shape-sniffing lives here; the rest of the
/// crate never inspects the raw JSON.
#[derive(Debug, Clone)]
pub enum ExercisePlan {
    Single(DayPlan),
    Weekly(WeeklySchedule),
    Monthly(MonthlyStructure),
}

impl ExercisePlan {
    /// Malformed payloads parse to an empty plan: counting then yields zero,
    /// which is what an unknown shape is worth.
    pub fn from_value(assignment_type: AssignmentType, block: &Value) -> Self {
        match assignment_type {
            // A single workout arrives either as a bare exercise array or as
            // an object with `exercises` / `blocks`.
            AssignmentType::Single => ExercisePlan::Single(match block {
                Value::Array(_) => DayPlan {
                    exercises: serde_json::from_value(block.clone()).unwrap_or_default(),
                    blocks: Vec::new(),
                },
                _ => serde_json::from_value(block.clone()).unwrap_or_default(),
            }),
            AssignmentType::Weekly => ExercisePlan::Weekly(
                serde_json::from_value(block.clone()).unwrap_or_default(),
            ),
            AssignmentType::Monthly => ExercisePlan::Monthly(
                serde_json::from_value(block.clone()).unwrap_or_default(),
            ),
        }
    }

    /// Denominator for `progress.total_exercises`.
    ///
    /// Single counts every exercise (summed across block groups), weekly
    /// sums across all scheduled days (rest days contribute zero), monthly
    /// counts at week granularity: only non-rest weeks that reference a
    /// concrete sub-workout.
    pub fn total_exercises(&self) -> u32 {
        match self {
            ExercisePlan::Single(day) => day.exercise_count(),
            ExercisePlan::Weekly(week) => week.total_exercises(),
            ExercisePlan::Monthly(month) => month
                .weekly_structure
                .iter()
                .filter(|w| w.is_trackable())
                .count() as u32,
        }
    }
}

/// One-based week number of `reference` relative to `start_date`, or `None`
/// before the window opens.
pub fn current_week(start_date: NaiveDate, reference: NaiveDate) -> Option<u32> {
    let days = (reference - start_date).num_days();
    if days < 0 {
        return None;
    }
    Some((days / 7) as u32 + 1)
}
