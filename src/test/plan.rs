use chrono::NaiveDate;
use serde_json::json;

use crate::models::AssignmentType;
use crate::plan::{ExercisePlan, current_week};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

#[test]
fn single_plan_parses_a_bare_exercise_array() {
    let block = json!([
        {"name": "Squat", "sets": 3, "reps": 10},
        {"name": "Bench Press", "sets": 3, "reps": 10}
    ]);

    let plan = ExercisePlan::from_value(AssignmentType::Single, &block);

    assert_eq!(plan.total_exercises(), 2);
}

#[test]
fn single_plan_parses_an_exercises_object() {
    let block = json!({
        "exercises": [
            {"name": "Squat", "sets": 3, "reps": 10}
        ]
    });

    let plan = ExercisePlan::from_value(AssignmentType::Single, &block);

    assert_eq!(plan.total_exercises(), 1);
}

#[test]
fn block_groups_take_precedence_over_the_flat_list() {
    let block = json!({
        "exercises": [{"name": "Ignored"}],
        "blocks": [
            {"exercises": [{"name": "Warmup"}, {"name": "Main"}]},
            {"exercises": [{"name": "Cooldown"}]}
        ]
    });

    let plan = ExercisePlan::from_value(AssignmentType::Single, &block);

    assert_eq!(plan.total_exercises(), 3);
}

#[test]
fn numeric_strings_parse_as_counts() {
    let block = json!([
        {"name": "Squat", "sets": "3", "reps": " 12 "}
    ]);

    let plan = ExercisePlan::from_value(AssignmentType::Single, &block);

    match plan {
        ExercisePlan::Single(day) => {
            let exercises = day.flattened();
            assert_eq!(exercises[0].sets, Some(3));
            assert_eq!(exercises[0].reps, Some(12));
        }
        _ => panic!("expected a single-day plan"),
    }
}

#[test]
fn unparseable_counts_fall_back_to_one() {
    let block = json!([
        {"name": "Squat", "sets": "lots", "reps": null}
    ]);

    let plan = ExercisePlan::from_value(AssignmentType::Single, &block);

    match plan {
        ExercisePlan::Single(day) => {
            let exercises = day.flattened();
            assert_eq!(exercises[0].sets, None);
            assert_eq!(exercises[0].sets_or_default(), 1);
            assert_eq!(exercises[0].reps_or_default(), 1);
        }
        _ => panic!("expected a single-day plan"),
    }
}

#[test]
fn malformed_payload_parses_to_an_empty_plan() {
    let block = json!("not a plan at all");

    let single = ExercisePlan::from_value(AssignmentType::Single, &block);
    let weekly = ExercisePlan::from_value(AssignmentType::Weekly, &block);
    let monthly = ExercisePlan::from_value(AssignmentType::Monthly, &block);

    assert_eq!(single.total_exercises(), 0);
    assert_eq!(weekly.total_exercises(), 0);
    assert_eq!(monthly.total_exercises(), 0);
}

#[test]
fn weekly_totals_sum_across_scheduled_days() {
    let block = json!({
        "daily_workouts": {
            "monday": {"exercises": [{"name": "Row"}, {"name": "Squat"}]},
            "wednesday": {"exercises": [{"name": "Run"}]},
            "sunday": {"exercises": []}
        }
    });

    let plan = ExercisePlan::from_value(AssignmentType::Weekly, &block);

    assert_eq!(plan.total_exercises(), 3);
}

#[test]
fn weekly_day_lookup_ignores_key_casing() {
    let block = json!({
        "daily_workouts": {
            "Monday": {"exercises": [{"name": "Row"}]}
        }
    });

    let plan = ExercisePlan::from_value(AssignmentType::Weekly, &block);

    match plan {
        ExercisePlan::Weekly(schedule) => {
            // 2025-06-02 is a Monday.
            let day = schedule.day_for(date(2025, 6, 2));
            assert!(day.is_some());
            assert!(schedule.day_for(date(2025, 6, 3)).is_none());
        }
        _ => panic!("expected a weekly plan"),
    }
}

#[test]
fn monthly_totals_count_only_trackable_weeks() {
    let block = json!({
        "weekly_structure": [
            {"week_number": 1, "workout_id": 10, "is_rest_week": false},
            {"week_number": 2, "is_rest_week": true},
            {"week_number": 3, "is_rest_week": false},
            {"week_number": 4, "workout_id": 11, "is_rest_week": false}
        ]
    });

    let plan = ExercisePlan::from_value(AssignmentType::Monthly, &block);

    // Week 2 is rest and week 3 has no linked workout.
    assert_eq!(plan.total_exercises(), 2);
}

#[test]
fn monthly_week_lookup_matches_the_week_number() {
    let block = json!({
        "weekly_structure": [
            {"week_number": 1, "workout_id": 10},
            {"week_number": 2, "workout_id": 20}
        ]
    });

    let plan = ExercisePlan::from_value(AssignmentType::Monthly, &block);

    match plan {
        ExercisePlan::Monthly(structure) => {
            assert_eq!(structure.week(2).and_then(|w| w.workout_id), Some(20));
            assert!(structure.week(5).is_none());
        }
        _ => panic!("expected a monthly plan"),
    }
}

#[test]
fn current_week_is_one_based_and_none_before_the_start() {
    let start = date(2025, 6, 2);

    assert_eq!(current_week(start, date(2025, 6, 1)), None);
    assert_eq!(current_week(start, start), Some(1));
    assert_eq!(current_week(start, date(2025, 6, 8)), Some(1));
    assert_eq!(current_week(start, date(2025, 6, 9)), Some(2));
    assert_eq!(current_week(start, date(2025, 6, 30)), Some(5));
}
