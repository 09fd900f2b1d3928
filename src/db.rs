use crate::{
    auth::{DbUser, DbUserSession, User, UserSession},
    error::AppError,
};
use chrono::{NaiveDate, NaiveDateTime, Utc};
use sqlx::{Pool, Sqlite};
use tracing::{info, instrument};

use crate::models::{
    AssignmentStatus, DbNotification, DbWorkout, DbWorkoutAssignment, NewWorkoutAssignment,
    Notification, Workout, WorkoutAssignment,
};
use crate::plan::{current_week, ExercisePlan};
use crate::progress::{self, PercentagePolicy, ProgressBreakdown};

const ASSIGNMENT_COLUMNS: &str = "id, athlete_id, assignment_type, exercise_block, progress, \
     start_date, end_date, status, assigned_by, assigned_at, meta, created_at, updated_at";

#[instrument(skip(new))]
pub async fn create_assignment(
    pool: &Pool<Sqlite>,
    new: NewWorkoutAssignment,
) -> Result<WorkoutAssignment, AppError> {
    info!(athlete_id = %new.athlete_id, assignment_type = %new.assignment_type.as_str(), "Creating workout assignment");

    let plan = ExercisePlan::from_value(new.assignment_type, &new.exercise_block);
    let initial = progress::initial_progress_with_overrides(
        plan.total_exercises(),
        new.progress_overrides.as_ref(),
    );

    let exercise_block = serde_json::to_string(&new.exercise_block)?;
    let progress_json = serde_json::to_string(&initial)?;
    let meta = match &new.meta {
        Some(meta) => Some(serde_json::to_string(meta)?),
        None => None,
    };
    let now = Utc::now().naive_utc();

    let res = sqlx::query(
        "INSERT INTO workout_assignments
         (athlete_id, assignment_type, exercise_block, progress, start_date, end_date,
          status, assigned_by, assigned_at, meta, created_at, updated_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(new.athlete_id)
    .bind(new.assignment_type.as_str())
    .bind(&exercise_block)
    .bind(&progress_json)
    .bind(new.start_date)
    .bind(new.end_date)
    .bind(AssignmentStatus::Assigned.as_str())
    .bind(new.assigned_by)
    .bind(now)
    .bind(meta)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await?;

    let assignment = get_assignment(pool, res.last_insert_rowid()).await?;

    create_notification(
        pool,
        assignment.athlete_id,
        "New workout assigned",
        &format!(
            "A {} workout was assigned to you",
            assignment.assignment_type.as_str()
        ),
        "assignment_created",
    )
    .await?;

    Ok(assignment)
}

#[instrument]
pub async fn get_assignment(pool: &Pool<Sqlite>, id: i64) -> Result<WorkoutAssignment, AppError> {
    info!("Fetching workout assignment");
    let row = sqlx::query_as::<_, DbWorkoutAssignment>(&format!(
        "SELECT {} FROM workout_assignments WHERE id = ?",
        ASSIGNMENT_COLUMNS
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;

    match row {
        Some(assignment) => Ok(WorkoutAssignment::from(assignment)),
        _ => Err(AppError::NotFound(format!(
            "Workout assignment with id {} not found in database",
            id
        ))),
    }
}

/// Optional listing filters. `from`/`to` bound the `start_date` window.
#[derive(Debug, Default, Clone)]
pub struct AssignmentFilters {
    pub status: Option<String>,
    pub assignment_type: Option<String>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

#[instrument]
pub async fn get_athlete_assignments(
    pool: &Pool<Sqlite>,
    athlete_id: i64,
    filters: &AssignmentFilters,
) -> Result<Vec<WorkoutAssignment>, AppError> {
    info!("Fetching athlete assignments");

    let mut sql = format!(
        "SELECT {} FROM workout_assignments WHERE athlete_id = ?",
        ASSIGNMENT_COLUMNS
    );
    if filters.status.is_some() {
        sql.push_str(" AND status = ?");
    }
    if filters.assignment_type.is_some() {
        sql.push_str(" AND assignment_type = ?");
    }
    if filters.from.is_some() {
        sql.push_str(" AND start_date >= ?");
    }
    if filters.to.is_some() {
        sql.push_str(" AND start_date <= ?");
    }
    sql.push_str(" ORDER BY assigned_at DESC");

    let mut query = sqlx::query_as::<_, DbWorkoutAssignment>(&sql).bind(athlete_id);
    if let Some(status) = &filters.status {
        query = query.bind(status);
    }
    if let Some(assignment_type) = &filters.assignment_type {
        query = query.bind(assignment_type);
    }
    if let Some(from) = filters.from {
        query = query.bind(from);
    }
    if let Some(to) = filters.to {
        query = query.bind(to);
    }

    let rows = query.fetch_all(pool).await?;

    Ok(rows.into_iter().map(WorkoutAssignment::from).collect())
}

#[instrument(skip(delta))]
pub async fn update_assignment_progress(
    pool: &Pool<Sqlite>,
    id: i64,
    delta: &crate::models::ProgressDelta,
) -> Result<WorkoutAssignment, AppError> {
    info!("Updating assignment progress");

    let assignment = get_assignment(pool, id).await?;
    let (updated, status) = progress::apply_delta(assignment.progress, delta, Utc::now());

    let progress_json = serde_json::to_string(&updated)?;
    let now = Utc::now().naive_utc();

    sqlx::query(
        "UPDATE workout_assignments
         SET progress = ?, status = ?, updated_at = ?
         WHERE id = ?",
    )
    .bind(&progress_json)
    .bind(status.as_str())
    .bind(now)
    .bind(id)
    .execute(pool)
    .await?;

    get_assignment(pool, id).await
}

#[instrument]
pub async fn reset_assignment_progress(
    pool: &Pool<Sqlite>,
    id: i64,
) -> Result<WorkoutAssignment, AppError> {
    info!("Resetting assignment progress");

    let assignment = get_assignment(pool, id).await?;
    let plan = ExercisePlan::from_value(assignment.assignment_type, &assignment.exercise_block);
    let fresh = progress::initial_progress(plan.total_exercises());

    let progress_json = serde_json::to_string(&fresh)?;
    let now = Utc::now().naive_utc();

    sqlx::query(
        "UPDATE workout_assignments
         SET progress = ?, status = ?, updated_at = ?
         WHERE id = ?",
    )
    .bind(&progress_json)
    .bind(AssignmentStatus::Assigned.as_str())
    .bind(now)
    .bind(id)
    .execute(pool)
    .await?;

    get_assignment(pool, id).await
}

#[instrument]
pub async fn delete_assignment(pool: &Pool<Sqlite>, id: i64) -> Result<(), AppError> {
    info!("Deleting workout assignment");

    let res = sqlx::query("DELETE FROM workout_assignments WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;

    if res.rows_affected() == 0 {
        return Err(AppError::NotFound(format!(
            "Workout assignment with id {} not found in database",
            id
        )));
    }

    Ok(())
}

/// Detailed exercise/set/rep breakdown for an assignment.
///
/// Monthly assignments reference a library workout per week, so the current
/// week's sub-workout is resolved here before handing off to the pure
/// breakdown walk.
#[instrument]
pub async fn assignment_breakdown(
    pool: &Pool<Sqlite>,
    id: i64,
    reference_date: NaiveDate,
    policy: PercentagePolicy,
) -> Result<ProgressBreakdown, AppError> {
    info!("Computing assignment breakdown");

    let assignment = get_assignment(pool, id).await?;
    let plan = ExercisePlan::from_value(assignment.assignment_type, &assignment.exercise_block);

    let monthly_sub_plan = match &plan {
        ExercisePlan::Monthly(structure) => {
            let workout_id = assignment
                .start_date
                .and_then(|start| current_week(start, reference_date))
                .and_then(|n| structure.week(n))
                .filter(|week| week.is_trackable())
                .and_then(|week| week.workout_id);

            match workout_id {
                Some(workout_id) => {
                    let workout = get_workout(pool, workout_id).await?;
                    Some(ExercisePlan::from_value(
                        crate::models::AssignmentType::Weekly,
                        &workout.exercise_block,
                    ))
                }
                None => None,
            }
        }
        _ => None,
    };

    Ok(progress::breakdown(
        &assignment,
        &plan,
        monthly_sub_plan.as_ref(),
        reference_date,
        policy,
    ))
}

#[instrument]
pub async fn mark_overdue_assignments(
    pool: &Pool<Sqlite>,
    today: NaiveDate,
) -> Result<u64, AppError> {
    info!("Marking overdue assignments");

    let res = sqlx::query(
        "UPDATE workout_assignments
         SET status = ?, updated_at = ?
         WHERE end_date IS NOT NULL AND end_date < ? AND status IN (?, ?)",
    )
    .bind(AssignmentStatus::Overdue.as_str())
    .bind(Utc::now().naive_utc())
    .bind(today)
    .bind(AssignmentStatus::Assigned.as_str())
    .bind(AssignmentStatus::InProgress.as_str())
    .execute(pool)
    .await?;

    Ok(res.rows_affected())
}

#[instrument(skip(exercise_block))]
pub async fn create_workout(
    pool: &Pool<Sqlite>,
    name: &str,
    description: &str,
    coach_id: i64,
    exercise_block: &serde_json::Value,
) -> Result<i64, AppError> {
    info!("Creating workout");

    let block = serde_json::to_string(exercise_block)?;
    let res = sqlx::query(
        "INSERT INTO workouts (name, description, coach_id, exercise_block)
         VALUES (?, ?, ?, ?)",
    )
    .bind(name)
    .bind(description)
    .bind(coach_id)
    .bind(&block)
    .execute(pool)
    .await?;

    Ok(res.last_insert_rowid())
}

#[instrument]
pub async fn get_workout(pool: &Pool<Sqlite>, id: i64) -> Result<Workout, AppError> {
    info!("Fetching workout");

    let row = sqlx::query_as::<_, DbWorkout>("SELECT * FROM workouts WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?;

    match row {
        Some(workout) => Ok(Workout::from(workout)),
        _ => Err(AppError::NotFound(format!(
            "Workout with id {} not found in database",
            id
        ))),
    }
}

#[instrument]
pub async fn get_all_workouts(pool: &Pool<Sqlite>) -> Result<Vec<Workout>, AppError> {
    info!("Fetching all workouts");

    let rows = sqlx::query_as::<_, DbWorkout>("SELECT * FROM workouts ORDER BY name")
        .fetch_all(pool)
        .await?;

    Ok(rows.into_iter().map(Workout::from).collect())
}

#[instrument(skip(exercise_block))]
pub async fn update_workout(
    pool: &Pool<Sqlite>,
    id: i64,
    name: &str,
    description: &str,
    exercise_block: &serde_json::Value,
) -> Result<(), AppError> {
    info!("Updating workout");

    let block = serde_json::to_string(exercise_block)?;
    let now = Utc::now().naive_utc();
    sqlx::query(
        "UPDATE workouts
         SET name = ?, description = ?, exercise_block = ?, updated_at = ?
         WHERE id = ?",
    )
    .bind(name)
    .bind(description)
    .bind(&block)
    .bind(now)
    .bind(id)
    .execute(pool)
    .await?;

    Ok(())
}

#[instrument(skip(title, body))]
pub async fn create_notification(
    pool: &Pool<Sqlite>,
    user_id: i64,
    title: &str,
    body: &str,
    notification_type: &str,
) -> Result<i64, AppError> {
    info!("Creating notification");

    let res = sqlx::query(
        "INSERT INTO notifications (user_id, title, body, notification_type)
         VALUES (?, ?, ?, ?)",
    )
    .bind(user_id)
    .bind(title)
    .bind(body)
    .bind(notification_type)
    .execute(pool)
    .await?;

    Ok(res.last_insert_rowid())
}

#[instrument]
pub async fn get_user_notifications(
    pool: &Pool<Sqlite>,
    user_id: i64,
    unread_only: bool,
) -> Result<Vec<Notification>, AppError> {
    info!("Fetching user notifications");

    let query = if unread_only {
        "SELECT * FROM notifications WHERE user_id = ? AND read IS 0 ORDER BY created_at DESC"
    } else {
        "SELECT * FROM notifications WHERE user_id = ? ORDER BY created_at DESC"
    };

    let rows = sqlx::query_as::<_, DbNotification>(query)
        .bind(user_id)
        .fetch_all(pool)
        .await?;

    Ok(rows.into_iter().map(Notification::from).collect())
}

#[instrument]
pub async fn mark_notification_read(pool: &Pool<Sqlite>, id: i64) -> Result<(), AppError> {
    info!("Marking notification read");

    sqlx::query("UPDATE notifications SET read = TRUE WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;

    Ok(())
}

#[instrument]
pub async fn mark_all_notifications_read(
    pool: &Pool<Sqlite>,
    user_id: i64,
) -> Result<u64, AppError> {
    info!("Marking all notifications read");

    let res = sqlx::query("UPDATE notifications SET read = TRUE WHERE user_id = ? AND read IS 0")
        .bind(user_id)
        .execute(pool)
        .await?;

    Ok(res.rows_affected())
}

#[instrument]
pub async fn get_user(pool: &Pool<Sqlite>, id: i64) -> Result<User, AppError> {
    info!("Fetching user by ID");
    let row = sqlx::query_as::<_, DbUser>(
        "SELECT id, username, role, display_name, archived FROM users WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    match row {
        Some(user) => Ok(User::from(user)),
        _ => Err(AppError::NotFound(format!(
            "User with id {} not found in database",
            id
        ))),
    }
}

#[instrument]
pub async fn update_user_display_name(
    pool: &Pool<Sqlite>,
    user_id: i64,
    display_name: &str,
) -> Result<(), AppError> {
    info!("Updating user display name");
    sqlx::query("UPDATE users SET display_name = ? WHERE id = ?")
        .bind(display_name)
        .bind(user_id)
        .execute(pool)
        .await?;

    Ok(())
}

#[instrument(skip_all, fields(user_id))]
pub async fn update_user_password(
    pool: &Pool<Sqlite>,
    user_id: i64,
    new_password: &str,
) -> Result<(), AppError> {
    info!("Updating user password");
    let hashed_password = bcrypt::hash(new_password, bcrypt::DEFAULT_COST)?;

    sqlx::query("UPDATE users SET password = ? WHERE id = ?")
        .bind(hashed_password)
        .bind(user_id)
        .execute(pool)
        .await?;

    Ok(())
}

#[instrument]
pub async fn update_username(
    pool: &Pool<Sqlite>,
    user_id: i64,
    new_username: &str,
) -> Result<(), AppError> {
    info!("Updating user username");
    let existing = sqlx::query_scalar::<_, i64>("SELECT id FROM users WHERE username = ? AND id != ?")
        .bind(new_username)
        .bind(user_id)
        .fetch_optional(pool)
        .await?;

    if existing.is_some() {
        return Err(AppError::Validation("Username already exists".to_string()));
    }

    sqlx::query("UPDATE users SET username = ? WHERE id = ?")
        .bind(new_username)
        .bind(user_id)
        .execute(pool)
        .await?;

    Ok(())
}

#[instrument(skip_all, fields(username))]
pub async fn authenticate_user(
    pool: &Pool<Sqlite>,
    username: &str,
    password: &str,
) -> Result<Option<User>, AppError> {
    info!("Authenticating user");
    let stored: Option<(i64, String)> =
        sqlx::query_as("SELECT id, password FROM users WHERE username = ?")
            .bind(username)
            .fetch_optional(pool)
            .await?;

    match stored {
        Some((id, hash)) if bcrypt::verify(password, &hash).unwrap_or(false) => {
            Ok(Some(get_user(pool, id).await?))
        }
        _ => Ok(None),
    }
}

#[instrument(skip_all, fields(username, role))]
pub async fn create_user(
    pool: &Pool<Sqlite>,
    username: &str,
    password: &str,
    role: &str,
    display_name: Option<&str>,
) -> Result<i64, AppError> {
    info!("Creating new user");

    let existing_user = sqlx::query_scalar::<_, i64>("SELECT id FROM users WHERE username = ?")
        .bind(username)
        .fetch_optional(pool)
        .await?;

    if existing_user.is_some() {
        return Err(AppError::Validation(format!(
            "Username '{}' already exists",
            username
        )));
    }

    let hashed_password = bcrypt::hash(password, bcrypt::DEFAULT_COST)?;

    let res = sqlx::query(
        "INSERT INTO users (username, password, role, display_name) VALUES (?, ?, ?, ?)",
    )
    .bind(username)
    .bind(hashed_password)
    .bind(role)
    .bind(display_name)
    .execute(pool)
    .await?;

    Ok(res.last_insert_rowid())
}

#[instrument]
pub async fn find_user_by_username(
    pool: &Pool<Sqlite>,
    username: &str,
) -> Result<Option<User>, AppError> {
    info!("Finding user by username");
    let row = sqlx::query_as::<_, DbUser>(
        "SELECT id, username, role, display_name, archived FROM users WHERE username = ?",
    )
    .bind(username)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(User::from))
}

#[instrument]
pub async fn get_users_by_role(
    pool: &Pool<Sqlite>,
    role: &str,
    show_archived: bool,
) -> Result<Vec<User>, AppError> {
    info!(role = %role, show_archived = %show_archived, "Getting users by role");

    let query = if show_archived {
        "SELECT id, username, role, display_name, archived FROM users WHERE role = ?"
    } else {
        "SELECT id, username, role, display_name, archived FROM users WHERE role = ? AND archived IS 0"
    };

    let rows = sqlx::query_as::<_, DbUser>(query)
        .bind(role)
        .fetch_all(pool)
        .await?;

    let users: Vec<User> = rows.into_iter().map(User::from).collect();

    Ok(users)
}

#[instrument]
pub async fn get_all_users(pool: &Pool<Sqlite>) -> Result<Vec<User>, AppError> {
    let rows = sqlx::query_as::<_, DbUser>(
        "SELECT id, username, role, display_name, archived FROM users",
    )
    .fetch_all(pool)
    .await?;

    let users: Vec<User> = rows.into_iter().map(User::from).collect();

    if users.is_empty() {
        return Err(AppError::NotFound("No users found".to_string()));
    }

    Ok(users)
}

#[instrument]
pub async fn update_user_role(
    pool: &Pool<Sqlite>,
    user_id: i64,
    role: &str,
) -> Result<(), AppError> {
    info!("Updating user role");

    sqlx::query("UPDATE users SET role = ? WHERE id = ?")
        .bind(role)
        .bind(user_id)
        .execute(pool)
        .await?;

    Ok(())
}

#[instrument]
pub async fn delete_user(pool: &Pool<Sqlite>, user_id: i64) -> Result<(), AppError> {
    info!("Deleting user");

    sqlx::query("DELETE FROM user_sessions WHERE user_id = ?")
        .bind(user_id)
        .execute(pool)
        .await?;

    let res = sqlx::query("DELETE FROM users WHERE id = ?")
        .bind(user_id)
        .execute(pool)
        .await?;

    if res.rows_affected() == 0 {
        return Err(AppError::NotFound(format!(
            "User with id {} not found in database",
            user_id
        )));
    }

    Ok(())
}

#[instrument]
pub async fn set_user_archived(
    pool: &Pool<Sqlite>,
    user_id: i64,
    archive: bool,
) -> Result<bool, AppError> {
    info!("Toggling user archived status");

    sqlx::query("UPDATE users SET archived = ? WHERE id = ?")
        .bind(archive)
        .bind(user_id)
        .execute(pool)
        .await?;

    Ok(archive)
}

#[instrument(skip(pool, token))]
pub async fn create_user_session(
    pool: &Pool<Sqlite>,
    user_id: i64,
    token: &str,
    expires_at: NaiveDateTime,
) -> Result<i64, AppError> {
    info!("Creating user session");

    let res = sqlx::query("INSERT INTO user_sessions (user_id, token, expires_at) VALUES (?, ?, ?)")
        .bind(user_id)
        .bind(token)
        .bind(expires_at)
        .execute(pool)
        .await?;

    Ok(res.last_insert_rowid())
}

#[instrument(skip(pool, token))]
pub async fn get_session_by_token(
    pool: &Pool<Sqlite>,
    token: &str,
) -> Result<UserSession, AppError> {
    info!("Getting session by token");

    let session = sqlx::query_as::<_, DbUserSession>(
        "SELECT id, user_id, token, created_at, expires_at FROM user_sessions WHERE token = ?",
    )
    .bind(token)
    .fetch_optional(pool)
    .await?;

    match session {
        Some(session) => Ok(UserSession::from(session)),
        _ => Err(AppError::Authentication(
            "Invalid session token".to_string(),
        )),
    }
}

#[instrument(skip(pool, token))]
pub async fn invalidate_session(pool: &Pool<Sqlite>, token: &str) -> Result<(), AppError> {
    info!("Invalidating session");

    sqlx::query("DELETE FROM user_sessions WHERE token = ?")
        .bind(token)
        .execute(pool)
        .await?;

    Ok(())
}

#[instrument(skip(pool))]
pub async fn clean_expired_sessions(pool: &Pool<Sqlite>) -> Result<u64, AppError> {
    info!("Cleaning expired sessions");

    let now = Utc::now().naive_utc();

    let result = sqlx::query("DELETE FROM user_sessions WHERE expires_at < ?")
        .bind(now)
        .execute(pool)
        .await?;

    Ok(result.rows_affected())
}
