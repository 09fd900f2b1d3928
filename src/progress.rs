use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{AssignmentProgress, AssignmentStatus, ProgressDelta, WorkoutAssignment};
use crate::plan::{current_week, DayPlan, Exercise, ExercisePlan};

/// Fresh progress document for a newly created or reset assignment: cursors
/// at their start position, nothing completed, 0%.
pub fn initial_progress(total_exercises: u32) -> AssignmentProgress {
    AssignmentProgress {
        total_exercises,
        ..AssignmentProgress::default()
    }
}

/// Initial document with caller-supplied partial overrides layered on top.
/// Only cursor, percentage, and instrumentation fields are honored here;
/// completion flags are meaningless before the first real update.
pub fn initial_progress_with_overrides(
    total_exercises: u32,
    overrides: Option<&ProgressDelta>,
) -> AssignmentProgress {
    let mut progress = initial_progress(total_exercises);
    if let Some(delta) = overrides {
        merge_cursor_fields(&mut progress, delta);
        if let Some(pct) = delta.completion_percentage {
            progress.completion_percentage = pct.min(100);
        }
    }
    progress
}

fn merge_cursor_fields(progress: &mut AssignmentProgress, delta: &ProgressDelta) {
    if let Some(index) = delta.current_exercise_index {
        progress.current_exercise_index = index;
    }
    if let Some(set) = delta.current_set {
        progress.current_set = set;
    }
    if let Some(rep) = delta.current_rep {
        progress.current_rep = rep;
    }
    if let Some(seconds) = delta.total_time_seconds {
        progress.total_time_seconds = Some(seconds);
    }
    if let Some(times) = &delta.exercise_times {
        progress.exercise_times = Some(times.clone());
    }
}

pub fn status_for_percentage(percentage: u8) -> AssignmentStatus {
    match percentage {
        0 => AssignmentStatus::Assigned,
        100 => AssignmentStatus::Completed,
        _ => AssignmentStatus::InProgress,
    }
}

fn derived_percentage(completed: usize, total: u32) -> u8 {
    if total == 0 {
        return 0;
    }
    let pct = (completed as f64 / f64::from(total) * 100.0).round();
    pct.clamp(0.0, 100.0) as u8
}

/// Apply a partial update to a progress document and re-derive the status.
///
/// The merge is shallow: absent delta fields leave the stored value alone.
/// Marking the same exercise index complete twice is a no-op for both the
/// completed set and the cursor, so repeated client sends cannot
/// double-advance.
pub fn apply_delta(
    mut progress: AssignmentProgress,
    delta: &ProgressDelta,
    now: DateTime<Utc>,
) -> (AssignmentProgress, AssignmentStatus) {
    merge_cursor_fields(&mut progress, delta);
    progress.last_activity_at = Some(now);

    if let Some(done) = delta.completed_exercise_index {
        if !progress.completed_exercises.contains(&done) {
            progress.completed_exercises.push(done);
        }
        progress.current_exercise_index = progress.current_exercise_index.max(done + 1);
        progress.current_set = 1;
        progress.current_rep = 1;
    }

    progress.completion_percentage = match delta.completion_percentage {
        Some(pct) => pct.min(100),
        None => derived_percentage(
            progress.completed_exercises.len(),
            progress.total_exercises,
        ),
    };

    if delta.workout_completed.unwrap_or(false) {
        progress.completion_percentage = 100;
    }

    let status = status_for_percentage(progress.completion_percentage);

    if progress.completion_percentage > 0 && progress.started_at.is_none() {
        progress.started_at = Some(now);
    }
    if status == AssignmentStatus::Completed && progress.completed_at.is_none() {
        progress.completed_at = Some(now);
    }

    (progress, status)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CounterPair {
    pub current: u32,
    pub total: u32,
}

impl CounterPair {
    pub const ZERO: CounterPair = CounterPair { current: 0, total: 0 };

    fn ratio(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            f64::from(self.current) / f64::from(self.total)
        }
    }
}

/// Read-side detail for progress bars and gauges. Never persisted.
#[derive(Debug, Clone, Serialize)]
pub struct ProgressBreakdown {
    pub exercises: CounterPair,
    pub sets: CounterPair,
    pub reps: CounterPair,
    pub completion_percentage: u8,
}

/// How the card-level gauge percentage is computed when no authoritative
/// persisted percentage exists. Blended is the canonical choice; RepsOnly
/// is offered for single workouts where the rep count is the most granular
/// signal. A presentation preference, not a tracker invariant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PercentagePolicy {
    #[default]
    Blended,
    RepsOnly,
}

impl PercentagePolicy {
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "blended" => Some(PercentagePolicy::Blended),
            "reps" | "reps_only" => Some(PercentagePolicy::RepsOnly),
            _ => None,
        }
    }
}

/// Walk a day's exercise list against the stored cursors.
///
/// Exercises before the cursor count in full; the exercise at the cursor
/// contributes its finished sets plus the reps already done in the current
/// set; exercises past the cursor contribute nothing. Missing sets/reps
/// default to 1.
fn walk_exercises(
    exercises: &[&Exercise],
    cursor_index: u32,
    current_set: u32,
    current_rep: u32,
) -> (CounterPair, CounterPair, CounterPair) {
    let mut done_sets = 0u32;
    let mut done_reps = 0u32;
    let mut total_sets = 0u32;
    let mut total_reps = 0u32;

    for (i, exercise) in exercises.iter().enumerate() {
        let sets = exercise.sets_or_default();
        let reps = exercise.reps_or_default();
        total_sets += sets;
        total_reps += sets * reps;

        let index = i as u32;
        if index < cursor_index {
            done_sets += sets;
            done_reps += sets * reps;
        } else if index == cursor_index {
            let finished_sets = current_set.saturating_sub(1).min(sets);
            done_sets += finished_sets;
            done_reps += finished_sets * reps + current_rep.saturating_sub(1).min(reps);
        }
    }

    let done_exercises = cursor_index.min(exercises.len() as u32);

    (
        CounterPair {
            current: done_exercises,
            total: exercises.len() as u32,
        },
        CounterPair {
            current: done_sets,
            total: total_sets,
        },
        CounterPair {
            current: done_reps,
            total: total_reps,
        },
    )
}

fn day_breakdown(
    day: &DayPlan,
    progress: &AssignmentProgress,
) -> (CounterPair, CounterPair, CounterPair) {
    walk_exercises(
        &day.flattened(),
        progress.current_exercise_index,
        progress.current_set,
        progress.current_rep,
    )
}

/// Detailed exercise/set/rep breakdown for an assignment as of
/// `reference_date`.
///
/// `monthly_sub_plan` is the already-resolved plan of the sub-workout linked
/// by the current monthly week, when one exists; callers that cannot resolve
/// it pass `None` and the monthly counters degrade to zero.
pub fn breakdown(
    assignment: &WorkoutAssignment,
    plan: &ExercisePlan,
    monthly_sub_plan: Option<&ExercisePlan>,
    reference_date: NaiveDate,
    policy: PercentagePolicy,
) -> ProgressBreakdown {
    let progress = &assignment.progress;

    let (exercises, sets, reps) = match plan {
        ExercisePlan::Single(day) => day_breakdown(day, progress),
        ExercisePlan::Weekly(schedule) => match schedule.day_for(reference_date) {
            Some(day) if !day.is_rest() => day_breakdown(day, progress),
            _ => (CounterPair::ZERO, CounterPair::ZERO, CounterPair::ZERO),
        },
        ExercisePlan::Monthly(structure) => {
            let week = assignment
                .start_date
                .and_then(|start| current_week(start, reference_date))
                .and_then(|n| structure.week(n));

            match (week, monthly_sub_plan) {
                (Some(week), Some(ExercisePlan::Weekly(schedule))) if week.is_trackable() => {
                    match schedule.day_for(reference_date) {
                        Some(day) if !day.is_rest() => day_breakdown(day, progress),
                        _ => (CounterPair::ZERO, CounterPair::ZERO, CounterPair::ZERO),
                    }
                }
                _ => (CounterPair::ZERO, CounterPair::ZERO, CounterPair::ZERO),
            }
        }
    };

    // The persisted percentage is authoritative when the tracker has written
    // one; the policy blend only fills the gap.
    let completion_percentage = if progress.completion_percentage > 0 {
        progress.completion_percentage
    } else {
        gauge_percentage(exercises, sets, reps, policy)
    };

    ProgressBreakdown {
        exercises,
        sets,
        reps,
        completion_percentage,
    }
}

fn gauge_percentage(
    exercises: CounterPair,
    sets: CounterPair,
    reps: CounterPair,
    policy: PercentagePolicy,
) -> u8 {
    let fraction = match policy {
        PercentagePolicy::Blended => {
            exercises.ratio() * 0.5 + sets.ratio() * 0.3 + reps.ratio() * 0.2
        }
        PercentagePolicy::RepsOnly => reps.ratio(),
    };
    (fraction * 100.0).round().clamp(0.0, 100.0) as u8
}
