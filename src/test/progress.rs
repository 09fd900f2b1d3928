use chrono::{NaiveDate, TimeZone, Utc};
use serde_json::{Value, json};

use crate::models::{
    AssignmentProgress, AssignmentStatus, AssignmentType, ProgressDelta, WorkoutAssignment,
};
use crate::plan::ExercisePlan;
use crate::progress::{
    PercentagePolicy, apply_delta, breakdown, initial_progress, initial_progress_with_overrides,
    status_for_percentage,
};

fn fixed_now() -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 2, 10, 0, 0).unwrap()
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn assignment_with(
    assignment_type: AssignmentType,
    block: Value,
    progress: AssignmentProgress,
    start_date: Option<NaiveDate>,
) -> WorkoutAssignment {
    WorkoutAssignment {
        id: 1,
        athlete_id: 2,
        assignment_type,
        exercise_block: block,
        progress,
        start_date,
        end_date: None,
        status: AssignmentStatus::Assigned,
        assigned_by: 3,
        assigned_at: fixed_now(),
        meta: None,
        created_at: fixed_now(),
        updated_at: fixed_now(),
    }
}

fn three_by_three_by_ten() -> Value {
    json!([
        {"name": "Squat", "sets": 3, "reps": 10},
        {"name": "Bench Press", "sets": 3, "reps": 10},
        {"name": "Deadlift", "sets": 3, "reps": 10}
    ])
}

#[test]
fn initial_progress_starts_at_origin() {
    let progress = initial_progress(5);

    assert_eq!(progress.current_exercise_index, 0);
    assert_eq!(progress.current_set, 1);
    assert_eq!(progress.current_rep, 1);
    assert_eq!(progress.total_exercises, 5);
    assert_eq!(progress.completion_percentage, 0);
    assert!(progress.completed_exercises.is_empty());
    assert!(progress.started_at.is_none());
    assert!(progress.completed_at.is_none());
}

#[test]
fn initial_progress_overrides_position_cursors() {
    let overrides = ProgressDelta {
        current_exercise_index: Some(2),
        current_set: Some(3),
        completion_percentage: Some(150),
        ..ProgressDelta::default()
    };

    let progress = initial_progress_with_overrides(5, Some(&overrides));

    assert_eq!(progress.current_exercise_index, 2);
    assert_eq!(progress.current_set, 3);
    assert_eq!(progress.current_rep, 1);
    assert_eq!(progress.completion_percentage, 100);
}

#[test]
fn apply_delta_merges_only_present_fields() {
    let mut progress = initial_progress(3);
    progress.current_set = 2;

    let delta = ProgressDelta {
        current_rep: Some(7),
        ..ProgressDelta::default()
    };

    let (updated, _) = apply_delta(progress, &delta, fixed_now());

    assert_eq!(updated.current_set, 2);
    assert_eq!(updated.current_rep, 7);
    assert_eq!(updated.last_activity_at, Some(fixed_now()));
}

#[test]
fn empty_delta_only_refreshes_activity() {
    let progress = initial_progress(3);
    let delta = ProgressDelta::default();

    let (updated, status) = apply_delta(progress, &delta, fixed_now());

    assert_eq!(updated.current_exercise_index, 0);
    assert_eq!(updated.current_set, 1);
    assert_eq!(updated.current_rep, 1);
    assert_eq!(updated.completion_percentage, 0);
    assert_eq!(updated.last_activity_at, Some(fixed_now()));
    assert_eq!(status, AssignmentStatus::Assigned);
}

#[test]
fn completing_an_exercise_advances_the_cursor() {
    let progress = initial_progress(3);
    let delta = ProgressDelta {
        completed_exercise_index: Some(0),
        ..ProgressDelta::default()
    };

    let (updated, status) = apply_delta(progress, &delta, fixed_now());

    assert_eq!(updated.completed_exercises, vec![0]);
    assert_eq!(updated.current_exercise_index, 1);
    assert_eq!(updated.current_set, 1);
    assert_eq!(updated.current_rep, 1);
    assert_eq!(updated.completion_percentage, 33);
    assert_eq!(status, AssignmentStatus::InProgress);
}

#[test]
fn completing_the_same_exercise_twice_does_not_double_count() {
    let progress = initial_progress(3);
    let delta = ProgressDelta {
        completed_exercise_index: Some(0),
        ..ProgressDelta::default()
    };

    let (progress, _) = apply_delta(progress, &delta, fixed_now());
    let (progress, _) = apply_delta(progress, &delta, fixed_now());

    assert_eq!(progress.completed_exercises, vec![0]);
    assert_eq!(progress.current_exercise_index, 1);
    assert_eq!(progress.completion_percentage, 33);
}

#[test]
fn completing_an_earlier_exercise_never_moves_the_cursor_backwards() {
    let mut progress = initial_progress(4);
    progress.current_exercise_index = 3;

    let delta = ProgressDelta {
        completed_exercise_index: Some(0),
        ..ProgressDelta::default()
    };

    let (updated, _) = apply_delta(progress, &delta, fixed_now());

    assert_eq!(updated.current_exercise_index, 3);
}

#[test]
fn explicit_percentage_overrides_the_derived_value() {
    let progress = initial_progress(4);
    let delta = ProgressDelta {
        completed_exercise_index: Some(0),
        completion_percentage: Some(90),
        ..ProgressDelta::default()
    };

    let (updated, status) = apply_delta(progress, &delta, fixed_now());

    assert_eq!(updated.completion_percentage, 90);
    assert_eq!(status, AssignmentStatus::InProgress);
}

#[test]
fn percentage_only_delta_leaves_cursors_alone() {
    let mut progress = initial_progress(4);
    progress.current_exercise_index = 2;
    progress.current_set = 3;
    progress.current_rep = 6;
    progress.completed_exercises = vec![0, 1];

    let delta = ProgressDelta {
        completion_percentage: Some(47),
        ..ProgressDelta::default()
    };

    let (updated, status) = apply_delta(progress, &delta, fixed_now());

    assert_eq!(updated.current_exercise_index, 2);
    assert_eq!(updated.current_set, 3);
    assert_eq!(updated.current_rep, 6);
    assert_eq!(updated.completed_exercises, vec![0, 1]);
    assert_eq!(updated.completion_percentage, 47);
    assert_eq!(status, AssignmentStatus::InProgress);
}

#[test]
fn explicit_percentage_is_clamped_to_100() {
    let progress = initial_progress(4);
    let delta = ProgressDelta {
        completion_percentage: Some(250),
        ..ProgressDelta::default()
    };

    let (updated, status) = apply_delta(progress, &delta, fixed_now());

    assert_eq!(updated.completion_percentage, 100);
    assert_eq!(status, AssignmentStatus::Completed);
}

#[test]
fn workout_completed_forces_full_completion() {
    let progress = initial_progress(10);
    let delta = ProgressDelta {
        workout_completed: Some(true),
        ..ProgressDelta::default()
    };

    let (updated, status) = apply_delta(progress, &delta, fixed_now());

    assert_eq!(updated.completion_percentage, 100);
    assert_eq!(status, AssignmentStatus::Completed);
    assert_eq!(updated.completed_at, Some(fixed_now()));
}

#[test]
fn zero_total_exercises_stays_at_zero_percent() {
    let progress = initial_progress(0);
    let delta = ProgressDelta {
        completed_exercise_index: Some(0),
        ..ProgressDelta::default()
    };

    let (updated, status) = apply_delta(progress, &delta, fixed_now());

    assert_eq!(updated.completion_percentage, 0);
    assert_eq!(status, AssignmentStatus::Assigned);
}

#[test]
fn started_at_is_stamped_once_and_preserved() {
    let first_now = fixed_now();
    let later_now = Utc.with_ymd_and_hms(2025, 6, 3, 10, 0, 0).unwrap();

    let progress = initial_progress(3);
    let delta = ProgressDelta {
        completed_exercise_index: Some(0),
        ..ProgressDelta::default()
    };

    let (progress, _) = apply_delta(progress, &delta, first_now);
    assert_eq!(progress.started_at, Some(first_now));

    let second = ProgressDelta {
        completed_exercise_index: Some(1),
        ..ProgressDelta::default()
    };
    let (progress, _) = apply_delta(progress, &second, later_now);

    assert_eq!(progress.started_at, Some(first_now));
    assert_eq!(progress.last_activity_at, Some(later_now));
}

#[test]
fn completed_at_survives_further_updates() {
    let first_now = fixed_now();
    let later_now = Utc.with_ymd_and_hms(2025, 6, 3, 10, 0, 0).unwrap();

    let progress = initial_progress(1);
    let delta = ProgressDelta {
        completed_exercise_index: Some(0),
        ..ProgressDelta::default()
    };

    let (progress, status) = apply_delta(progress, &delta, first_now);
    assert_eq!(status, AssignmentStatus::Completed);
    assert_eq!(progress.completed_at, Some(first_now));

    let touch = ProgressDelta {
        total_time_seconds: Some(1800),
        ..ProgressDelta::default()
    };
    let (progress, _) = apply_delta(progress, &touch, later_now);

    assert_eq!(progress.completed_at, Some(first_now));
    assert_eq!(progress.total_time_seconds, Some(1800));
}

#[test]
fn status_follows_percentage_boundaries() {
    assert_eq!(status_for_percentage(0), AssignmentStatus::Assigned);
    assert_eq!(status_for_percentage(1), AssignmentStatus::InProgress);
    assert_eq!(status_for_percentage(99), AssignmentStatus::InProgress);
    assert_eq!(status_for_percentage(100), AssignmentStatus::Completed);
}

#[test]
fn single_breakdown_counts_partial_work_at_the_cursor() {
    let mut progress = initial_progress(3);
    progress.current_exercise_index = 1;
    progress.current_set = 2;
    progress.current_rep = 5;

    let block = three_by_three_by_ten();
    let plan = ExercisePlan::from_value(AssignmentType::Single, &block);
    let assignment = assignment_with(AssignmentType::Single, block, progress, None);

    let result = breakdown(
        &assignment,
        &plan,
        None,
        date(2025, 6, 2),
        PercentagePolicy::Blended,
    );

    assert_eq!((result.exercises.current, result.exercises.total), (1, 3));
    assert_eq!((result.sets.current, result.sets.total), (4, 9));
    assert_eq!((result.reps.current, result.reps.total), (44, 90));
    assert_eq!(result.completion_percentage, 40);
}

#[test]
fn reps_only_policy_tracks_the_rep_ratio() {
    let mut progress = initial_progress(3);
    progress.current_exercise_index = 1;
    progress.current_set = 2;
    progress.current_rep = 5;

    let block = three_by_three_by_ten();
    let plan = ExercisePlan::from_value(AssignmentType::Single, &block);
    let assignment = assignment_with(AssignmentType::Single, block, progress, None);

    let result = breakdown(
        &assignment,
        &plan,
        None,
        date(2025, 6, 2),
        PercentagePolicy::RepsOnly,
    );

    assert_eq!(result.completion_percentage, 49);
}

#[test]
fn persisted_percentage_beats_the_gauge() {
    let mut progress = initial_progress(3);
    progress.completion_percentage = 75;

    let block = three_by_three_by_ten();
    let plan = ExercisePlan::from_value(AssignmentType::Single, &block);
    let assignment = assignment_with(AssignmentType::Single, block, progress, None);

    let result = breakdown(
        &assignment,
        &plan,
        None,
        date(2025, 6, 2),
        PercentagePolicy::Blended,
    );

    assert_eq!(result.completion_percentage, 75);
}

#[test]
fn fresh_assignment_breaks_down_to_zero() {
    let block = three_by_three_by_ten();
    let plan = ExercisePlan::from_value(AssignmentType::Single, &block);
    let assignment = assignment_with(AssignmentType::Single, block, initial_progress(3), None);

    let result = breakdown(
        &assignment,
        &plan,
        None,
        date(2025, 6, 2),
        PercentagePolicy::Blended,
    );

    assert_eq!(result.exercises.current, 0);
    assert_eq!(result.sets.current, 0);
    assert_eq!(result.reps.current, 0);
    assert_eq!(result.completion_percentage, 0);
}

#[test]
fn missing_sets_and_reps_count_as_one() {
    let block = json!([
        {"name": "Plank"},
        {"name": "Stretch"}
    ]);
    let plan = ExercisePlan::from_value(AssignmentType::Single, &block);

    let mut progress = initial_progress(2);
    progress.current_exercise_index = 1;
    let assignment = assignment_with(AssignmentType::Single, block, progress, None);

    let result = breakdown(
        &assignment,
        &plan,
        None,
        date(2025, 6, 2),
        PercentagePolicy::Blended,
    );

    assert_eq!((result.sets.current, result.sets.total), (1, 2));
    assert_eq!((result.reps.current, result.reps.total), (1, 2));
}

#[test]
fn weekly_breakdown_picks_the_reference_day() {
    let block = json!({
        "daily_workouts": {
            "monday": {"exercises": [{"name": "Row", "sets": 2, "reps": 8}]},
            "wednesday": {"exercises": [{"name": "Run", "sets": 1, "reps": 1}]}
        }
    });
    let plan = ExercisePlan::from_value(AssignmentType::Weekly, &block);

    let mut progress = initial_progress(2);
    progress.current_set = 2;
    progress.current_rep = 3;
    let assignment = assignment_with(AssignmentType::Weekly, block, progress, None);

    // 2025-06-02 is a Monday.
    let result = breakdown(
        &assignment,
        &plan,
        None,
        date(2025, 6, 2),
        PercentagePolicy::Blended,
    );

    assert_eq!((result.sets.current, result.sets.total), (1, 2));
    assert_eq!((result.reps.current, result.reps.total), (10, 16));
}

#[test]
fn weekly_rest_day_yields_zero_counters() {
    let block = json!({
        "daily_workouts": {
            "monday": {"exercises": [{"name": "Row", "sets": 2, "reps": 8}]}
        }
    });
    let plan = ExercisePlan::from_value(AssignmentType::Weekly, &block);
    let assignment = assignment_with(AssignmentType::Weekly, block, initial_progress(1), None);

    // 2025-06-03 is a Tuesday with nothing scheduled.
    let result = breakdown(
        &assignment,
        &plan,
        None,
        date(2025, 6, 3),
        PercentagePolicy::Blended,
    );

    assert_eq!(result.exercises.total, 0);
    assert_eq!(result.sets.total, 0);
    assert_eq!(result.reps.total, 0);
    assert_eq!(result.completion_percentage, 0);
}

#[test]
fn monthly_breakdown_walks_the_resolved_sub_workout() {
    let block = json!({
        "weekly_structure": [
            {"week_number": 1, "workout_id": 7, "is_rest_week": false}
        ]
    });
    let plan = ExercisePlan::from_value(AssignmentType::Monthly, &block);

    let sub_block = json!({
        "daily_workouts": {
            "wednesday": {"exercises": [{"name": "Swim", "sets": 2, "reps": 4}]}
        }
    });
    let sub_plan = ExercisePlan::from_value(AssignmentType::Weekly, &sub_block);

    let mut progress = initial_progress(1);
    progress.current_set = 2;
    let assignment = assignment_with(
        AssignmentType::Monthly,
        block,
        progress,
        Some(date(2025, 6, 2)),
    );

    // 2025-06-04 is the Wednesday of week one.
    let result = breakdown(
        &assignment,
        &plan,
        Some(&sub_plan),
        date(2025, 6, 4),
        PercentagePolicy::Blended,
    );

    assert_eq!((result.sets.current, result.sets.total), (1, 2));
    assert_eq!((result.reps.current, result.reps.total), (4, 8));
}

#[test]
fn monthly_breakdown_without_sub_plan_yields_zero() {
    let block = json!({
        "weekly_structure": [
            {"week_number": 1, "is_rest_week": true}
        ]
    });
    let plan = ExercisePlan::from_value(AssignmentType::Monthly, &block);
    let assignment = assignment_with(
        AssignmentType::Monthly,
        block,
        initial_progress(0),
        Some(date(2025, 6, 2)),
    );

    let result = breakdown(
        &assignment,
        &plan,
        None,
        date(2025, 6, 4),
        PercentagePolicy::Blended,
    );

    assert_eq!(result.exercises.total, 0);
    assert_eq!(result.sets.total, 0);
    assert_eq!(result.reps.total, 0);
}
