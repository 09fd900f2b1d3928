use chrono::{NaiveDate, Utc};
use rocket::FromForm;
use rocket::State;
use rocket::http::Status;
use rocket::response::Redirect;
use rocket::response::status::Custom;
use rocket::serde::{Deserialize, Serialize, json::Json};
use serde_json::Value;
use sqlx::{Pool, Sqlite};
use validator::Validate;

use crate::auth::UserSession;
use crate::auth::{Permission, User};
use crate::db::create_user;
use crate::db::find_user_by_username;
use crate::db::get_all_users;
use crate::db::set_user_archived;
use crate::db::update_user_display_name;
use crate::db::update_user_password;
use crate::db::update_user_role;
use crate::db::update_username;
use crate::db::{
    AssignmentFilters, assignment_breakdown, authenticate_user, create_assignment,
    create_notification, create_user_session, create_workout, delete_assignment, delete_user,
    get_assignment,
    get_athlete_assignments, get_all_workouts, get_user, get_user_notifications,
    get_users_by_role, get_workout, invalidate_session, mark_all_notifications_read,
    mark_notification_read, reset_assignment_progress, update_assignment_progress, update_workout,
};
use crate::models::{
    AssignmentType, NewWorkoutAssignment, Notification, ProgressDelta, Workout, WorkoutAssignment,
};
use crate::progress::{PercentagePolicy, ProgressBreakdown};
use crate::validation::AppErrorExt;
use crate::validation::JsonValidateExt;
use crate::validation::PermissionCheckExt;
use crate::validation::ValidationResponse;

#[derive(Deserialize, Validate)]
pub struct LoginRequest {
    username: String,
    password: String,
}

#[derive(Serialize, Deserialize)]
pub struct LoginResponse {
    pub success: bool,
    pub user: Option<UserData>,
    pub error: Option<String>,
    pub redirect_url: Option<String>,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct UserData {
    pub id: i64,
    pub username: String,
    pub display_name: String,
    pub role: String,
    pub archived: bool,
}

impl From<User> for UserData {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            display_name: user.display_name.clone(),
            role: user.role.to_string(),
            archived: user.archived,
        }
    }
}

#[derive(Serialize, Deserialize)]
pub struct AssignmentResponse {
    pub id: i64,
    pub athlete_id: i64,
    pub assignment_type: String,
    pub exercise_block: Value,
    pub progress: Value,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub status: String,
    pub assigned_by: i64,
    pub assigned_at: String,
    pub meta: Option<Value>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<WorkoutAssignment> for AssignmentResponse {
    fn from(assignment: WorkoutAssignment) -> Self {
        Self {
            id: assignment.id,
            athlete_id: assignment.athlete_id,
            assignment_type: assignment.assignment_type.as_str().to_string(),
            exercise_block: assignment.exercise_block,
            progress: serde_json::to_value(&assignment.progress).unwrap_or(Value::Null),
            start_date: assignment.start_date.map(|d| d.to_string()),
            end_date: assignment.end_date.map(|d| d.to_string()),
            status: assignment.status.as_str().to_string(),
            assigned_by: assignment.assigned_by,
            assigned_at: assignment.assigned_at.to_rfc3339(),
            meta: assignment.meta,
            created_at: assignment.created_at.to_rfc3339(),
            updated_at: assignment.updated_at.to_rfc3339(),
        }
    }
}

#[post("/login", data = "<login>")]
pub async fn api_login(
    login: Json<LoginRequest>,
    cookies: &rocket::http::CookieJar<'_>,
    db: &State<Pool<Sqlite>>,
) -> Result<Json<LoginResponse>, Custom<Json<ValidationResponse>>> {
    use rocket::http::{Cookie, SameSite};

    let validated = login.validate_custom()?;

    match authenticate_user(db, &validated.username, &validated.password)
        .await
        .validate_custom()?
    {
        Some(user) => {
            let token = UserSession::generate_token();
            let expires_at = Utc::now() + chrono::Duration::hours(1);

            create_user_session(db, user.id, &token, expires_at.naive_utc())
                .await
                .validate_custom()?;

            let cookie = Cookie::build(("session_token", token))
                .same_site(SameSite::Lax)
                .http_only(true)
                .max_age(rocket::time::Duration::hours(1));
            cookies.add_private(cookie);

            cookies.add_private(
                Cookie::build(("user_id", user.id.to_string()))
                    .same_site(SameSite::Lax)
                    .http_only(true)
                    .max_age(rocket::time::Duration::hours(1)),
            );

            cookies.add_private(
                Cookie::build(("logged_in", validated.username))
                    .same_site(SameSite::Lax)
                    .max_age(rocket::time::Duration::hours(1)),
            );

            cookies.add_private(
                Cookie::build(("user_role", user.role.to_string()))
                    .same_site(SameSite::Lax)
                    .max_age(rocket::time::Duration::hours(1)),
            );

            let redirect_url = match user.role.as_str() {
                "athlete" => format!("/ui/athlete/{}", user.id),
                _ => "/ui/dashboard".to_string(),
            };

            Ok(Json(LoginResponse {
                success: true,
                user: Some(UserData::from(user)),
                error: None,
                redirect_url: Some(redirect_url),
            }))
        }
        None => Ok(Json(LoginResponse {
            success: false,
            user: None,
            error: Some("Invalid username or password".to_string()),
            redirect_url: None,
        })),
    }
}

#[derive(Deserialize, Validate)]
pub struct CreateAssignmentRequest {
    athlete_id: i64,
    assignment_type: String,
    exercise_block: Value,
    start_date: Option<NaiveDate>,
    end_date: Option<NaiveDate>,
    meta: Option<Value>,
    progress: Option<ProgressDelta>,
}

#[post("/assignments", data = "<request>")]
pub async fn api_create_assignment(
    request: Json<CreateAssignmentRequest>,
    user: User,
    db: &State<Pool<Sqlite>>,
) -> Result<Custom<Json<AssignmentResponse>>, Custom<Json<ValidationResponse>>> {
    user.require_permission(Permission::AssignWorkouts)
        .validate_custom()?;

    let validated = request.validate_custom()?;

    let assignment_type = match AssignmentType::from_str(&validated.assignment_type) {
        Some(kind) => kind,
        None => {
            return Err(Custom(
                Status::UnprocessableEntity,
                Json(ValidationResponse::with_error(
                    "assignment_type",
                    "Must be one of: single, weekly, monthly",
                )),
            ));
        }
    };

    let assignment = create_assignment(
        db,
        NewWorkoutAssignment {
            athlete_id: validated.athlete_id,
            assignment_type,
            exercise_block: validated.exercise_block,
            start_date: validated.start_date,
            end_date: validated.end_date,
            assigned_by: user.id,
            meta: validated.meta,
            progress_overrides: validated.progress,
        },
    )
    .await
    .validate_custom()?;

    Ok(Custom(
        Status::Created,
        Json(AssignmentResponse::from(assignment)),
    ))
}

#[get("/assignments/<id>")]
pub async fn api_get_assignment(
    id: i64,
    user: User,
    db: &State<Pool<Sqlite>>,
) -> Result<Json<AssignmentResponse>, Status> {
    let assignment = get_assignment(db, id).await?;

    if user.id != assignment.athlete_id && !user.has_permission(Permission::ViewAllAthletes) {
        return Err(Status::Forbidden);
    }

    Ok(Json(AssignmentResponse::from(assignment)))
}

#[derive(FromForm)]
pub struct AssignmentQueryParams {
    status: Option<String>,
    assignment_type: Option<String>,
    from: Option<String>,
    to: Option<String>,
}

fn parse_date_param(raw: Option<&str>) -> Result<Option<NaiveDate>, Status> {
    match raw {
        Some(raw) => match NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
            Ok(date) => Ok(Some(date)),
            Err(_) => Err(Status::BadRequest),
        },
        None => Ok(None),
    }
}

#[get("/athlete/<id>/assignments?<params..>")]
pub async fn api_get_athlete_assignments(
    id: i64,
    params: AssignmentQueryParams,
    user: User,
    db: &State<Pool<Sqlite>>,
) -> Result<Json<Vec<AssignmentResponse>>, Status> {
    if user.id != id && !user.has_permission(Permission::ViewAllAthletes) {
        return Err(Status::Forbidden);
    }

    let filters = AssignmentFilters {
        status: params.status,
        assignment_type: params.assignment_type,
        from: parse_date_param(params.from.as_deref())?,
        to: parse_date_param(params.to.as_deref())?,
    };

    let assignments = get_athlete_assignments(db, id, &filters).await?;

    Ok(Json(
        assignments.into_iter().map(AssignmentResponse::from).collect(),
    ))
}

#[put("/assignments/<id>/progress", data = "<delta>")]
pub async fn api_update_assignment_progress(
    id: i64,
    delta: Json<ProgressDelta>,
    user: User,
    db: &State<Pool<Sqlite>>,
) -> Result<Json<AssignmentResponse>, Status> {
    let assignment = get_assignment(db, id).await?;

    if user.id == assignment.athlete_id {
        user.require_permission(Permission::LogOwnProgress)?;
    } else {
        user.require_permission(Permission::ManageAssignments)?;
    }

    let updated = update_assignment_progress(db, id, &delta).await?;

    Ok(Json(AssignmentResponse::from(updated)))
}

#[post("/assignments/<id>/reset")]
pub async fn api_reset_assignment_progress(
    id: i64,
    user: User,
    db: &State<Pool<Sqlite>>,
) -> Result<Json<AssignmentResponse>, Status> {
    user.require_permission(Permission::ManageAssignments)?;

    let assignment = reset_assignment_progress(db, id).await?;

    Ok(Json(AssignmentResponse::from(assignment)))
}

#[delete("/assignments/<id>")]
pub async fn api_delete_assignment(
    id: i64,
    user: User,
    db: &State<Pool<Sqlite>>,
) -> Result<Status, Status> {
    user.require_permission(Permission::ManageAssignments)?;

    delete_assignment(db, id).await?;

    Ok(Status::NoContent)
}

#[derive(FromForm)]
pub struct BreakdownQueryParams {
    date: Option<String>,
    policy: Option<String>,
}

#[get("/assignments/<id>/breakdown?<params..>")]
pub async fn api_get_assignment_breakdown(
    id: i64,
    params: BreakdownQueryParams,
    user: User,
    db: &State<Pool<Sqlite>>,
) -> Result<Json<ProgressBreakdown>, Status> {
    let assignment = get_assignment(db, id).await?;

    if user.id != assignment.athlete_id && !user.has_permission(Permission::ViewAllAthletes) {
        return Err(Status::Forbidden);
    }

    let reference_date =
        parse_date_param(params.date.as_deref())?.unwrap_or_else(|| Utc::now().date_naive());

    let policy = params
        .policy
        .as_deref()
        .and_then(PercentagePolicy::from_str)
        .unwrap_or_default();

    let breakdown = assignment_breakdown(db, id, reference_date, policy).await?;

    Ok(Json(breakdown))
}

#[derive(Deserialize, Validate)]
pub struct WorkoutRequest {
    #[validate(length(min = 1, message = "Name is required"))]
    name: String,
    #[serde(default)]
    description: String,
    exercise_block: Value,
}

#[post("/workouts", data = "<request>")]
pub async fn api_create_workout(
    request: Json<WorkoutRequest>,
    user: User,
    db: &State<Pool<Sqlite>>,
) -> Result<Custom<Json<Workout>>, Custom<Json<ValidationResponse>>> {
    user.require_permission(Permission::CreateWorkouts)
        .validate_custom()?;

    let validated = request.validate_custom()?;

    let id = create_workout(
        db,
        &validated.name,
        &validated.description,
        user.id,
        &validated.exercise_block,
    )
    .await
    .validate_custom()?;

    let workout = get_workout(db, id).await.validate_custom()?;

    Ok(Custom(Status::Created, Json(workout)))
}

#[get("/workouts")]
pub async fn api_get_all_workouts(
    _user: User,
    db: &State<Pool<Sqlite>>,
) -> Result<Json<Vec<Workout>>, Status> {
    let workouts = get_all_workouts(db).await?;
    Ok(Json(workouts))
}

#[get("/workouts/<id>")]
pub async fn api_get_workout(
    id: i64,
    _user: User,
    db: &State<Pool<Sqlite>>,
) -> Result<Json<Workout>, Status> {
    let workout = get_workout(db, id).await?;
    Ok(Json(workout))
}

#[put("/workouts/<id>", data = "<request>")]
pub async fn api_update_workout(
    id: i64,
    request: Json<WorkoutRequest>,
    user: User,
    db: &State<Pool<Sqlite>>,
) -> Result<Status, Custom<Json<ValidationResponse>>> {
    user.require_permission(Permission::CreateWorkouts)
        .validate_custom()?;

    let validated = request.validate_custom()?;

    get_workout(db, id).await.validate_custom()?;

    update_workout(
        db,
        id,
        &validated.name,
        &validated.description,
        &validated.exercise_block,
    )
    .await
    .validate_custom()?;

    Ok(Status::Ok)
}

#[derive(FromForm)]
pub struct NotificationQueryParams {
    unread_only: Option<bool>,
}

#[get("/notifications?<params..>")]
pub async fn api_get_notifications(
    params: NotificationQueryParams,
    user: User,
    db: &State<Pool<Sqlite>>,
) -> Result<Json<Vec<Notification>>, Status> {
    let notifications =
        get_user_notifications(db, user.id, params.unread_only.unwrap_or(false)).await?;

    Ok(Json(notifications))
}

#[put("/notifications/<id>/read")]
pub async fn api_mark_notification_read(
    id: i64,
    user: User,
    db: &State<Pool<Sqlite>>,
) -> Result<Status, Status> {
    let notifications = get_user_notifications(db, user.id, false).await?;
    if !notifications.iter().any(|n| n.id == id) {
        return Err(Status::NotFound);
    }

    mark_notification_read(db, id).await?;

    Ok(Status::Ok)
}

#[put("/notifications/read_all")]
pub async fn api_mark_all_notifications_read(
    user: User,
    db: &State<Pool<Sqlite>>,
) -> Result<Status, Status> {
    mark_all_notifications_read(db, user.id).await?;

    Ok(Status::Ok)
}

#[derive(Deserialize)]
pub struct NotifyRequest {
    user_id: i64,
    title: String,
    body: String,
    notification_type: String,
}

#[post("/notifications", data = "<request>")]
pub async fn api_create_notification(
    request: Json<NotifyRequest>,
    user: User,
    db: &State<Pool<Sqlite>>,
) -> Result<Status, Status> {
    user.require_permission(Permission::ManageAssignments)?;

    create_notification(
        db,
        request.user_id,
        &request.title,
        &request.body,
        &request.notification_type,
    )
    .await?;

    Ok(Status::Created)
}

#[derive(FromForm)]
pub struct AthletesQueryParams {
    include_archived: Option<bool>,
}

#[get("/athletes?<params..>")]
pub async fn api_get_athletes(
    params: AthletesQueryParams,
    user: User,
    db: &State<Pool<Sqlite>>,
) -> Result<Json<Vec<UserData>>, Status> {
    user.require_permission(Permission::ViewAllAthletes)?;

    let include_archived = params.include_archived.unwrap_or(false);

    let athletes = get_users_by_role(db, "athlete", include_archived).await?;

    let athlete_responses: Vec<UserData> = athletes.into_iter().map(UserData::from).collect();

    Ok(Json(athlete_responses))
}

#[get("/athlete/<id>")]
pub async fn api_get_athlete(
    id: i64,
    user: User,
    db: &State<Pool<Sqlite>>,
) -> Result<Json<UserData>, Status> {
    if user.id != id && !user.has_permission(Permission::ViewAllAthletes) {
        return Err(Status::Forbidden);
    }

    let athlete = get_user(db, id).await?;

    Ok(Json(UserData::from(athlete)))
}

#[get("/me")]
pub async fn api_me(user: User) -> Json<UserData> {
    Json(UserData::from(user))
}

#[get("/me", rank = 2)]
pub async fn api_me_unauthorized() -> Status {
    Status::Unauthorized
}

#[post("/logout")]
pub async fn api_logout(
    cookies: &rocket::http::CookieJar<'_>,
    db: &State<Pool<Sqlite>>,
) -> Redirect {
    let token = cookies
        .get_private("session_token")
        .map(|cookie| cookie.value().to_string());

    if let Some(token) = token {
        let _ = invalidate_session(db, &token).await;
    }

    cookies.remove_private(rocket::http::Cookie::build("session_token"));
    cookies.remove_private(rocket::http::Cookie::build("user_id"));
    cookies.remove_private(rocket::http::Cookie::build("logged_in"));
    cookies.remove_private(rocket::http::Cookie::build("user_role"));

    Redirect::to("/ui/")
}

#[derive(Deserialize, Validate, Clone)]
pub struct ProfileUpdateRequest {
    #[validate(length(min = 1, message = "Display name is required"))]
    display_name: String,
}

#[put("/profile", data = "<profile>")]
pub async fn api_update_profile(
    profile: Json<ProfileUpdateRequest>,
    user: User,
    db: &State<Pool<Sqlite>>,
) -> Result<Status, Custom<Json<ValidationResponse>>> {
    let validated = profile.validate_custom()?;

    update_user_display_name(db, user.id, &validated.display_name)
        .await
        .validate_custom()?;

    Ok(Status::Ok)
}

#[derive(Deserialize, Validate)]
pub struct PasswordChangeRequest {
    current_password: String,
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    new_password: String,
}

#[post("/change-password", data = "<password>")]
pub async fn api_change_password(
    password: Json<PasswordChangeRequest>,
    user: User,
    db: &State<Pool<Sqlite>>,
) -> Result<Status, Custom<Json<ValidationResponse>>> {
    let validated = password.validate_custom()?;

    let is_valid = authenticate_user(db, &user.username, &validated.current_password)
        .await
        .validate_custom()?;

    match is_valid {
        Some(_) => {
            update_user_password(db, user.id, &validated.new_password)
                .await
                .validate_custom()?;

            Ok(Status::Ok)
        }
        _ => Err(Custom(
            Status::Unauthorized,
            Json(ValidationResponse::with_error(
                "current_password",
                "Current password is incorrect",
            )),
        )),
    }
}

#[derive(Deserialize, Validate, Clone)]
pub struct UserRegistrationRequest {
    #[validate(length(min = 3, message = "Username must be at least 3 characters"))]
    username: String,
    display_name: String,
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    password: String,
    role: String,
}

#[post("/register", data = "<registration>")]
pub async fn api_register_user(
    registration: Json<UserRegistrationRequest>,
    user: User,
    db: &State<Pool<Sqlite>>,
) -> Result<Status, Custom<Json<ValidationResponse>>> {
    let validated = registration.validate_custom()?;

    let existing_user = find_user_by_username(db, &validated.username)
        .await
        .validate_custom()?;

    if existing_user.is_some() {
        return Err(Custom(
            Status::Conflict,
            Json(ValidationResponse::with_error(
                "username",
                "Username already exists",
            )),
        ));
    }

    match validated.role.as_str() {
        "admin" => user
            .require_all_permissions(&[Permission::EditUserRoles, Permission::RegisterUsers])
            .validate_custom()?,
        _ => user
            .require_permission(Permission::RegisterUsers)
            .validate_custom()?,
    };

    create_user(
        db,
        &validated.username,
        &validated.password,
        &validated.role,
        Some(&validated.display_name),
    )
    .await
    .validate_custom()?;

    Ok(Status::Created)
}

#[derive(Deserialize)]
pub struct UserUpdateRequest {
    username: Option<String>,
    display_name: Option<String>,
    password: Option<String>,
    archived: Option<bool>,
    role: Option<String>,
}

#[put("/admin/users/<id>", data = "<update>")]
pub async fn api_update_user(
    id: i64,
    update: Json<UserUpdateRequest>,
    user: User,
    db: &State<Pool<Sqlite>>,
) -> Result<Status, Status> {
    user.require_permission(Permission::EditUserCredentials)?;

    if update.role.is_some() {
        user.require_permission(Permission::EditUserRoles)?;
    }

    if let Some(username) = &update.username {
        update_username(db, id, username).await?;
    }

    if let Some(display_name) = &update.display_name {
        update_user_display_name(db, id, display_name).await?;
    }

    if let Some(password) = &update.password {
        update_user_password(db, id, password).await?;
    }

    if let Some(archived) = update.archived {
        set_user_archived(db, id, archived).await?;
    }

    if let Some(role) = &update.role {
        update_user_role(db, id, role).await?;
    }

    Ok(Status::Ok)
}

#[delete("/admin/users/<id>")]
pub async fn api_delete_user(
    id: i64,
    user: User,
    db: &State<Pool<Sqlite>>,
) -> Result<Status, Status> {
    user.require_permission(Permission::DeleteUsers)?;

    delete_user(db, id).await?;

    Ok(Status::NoContent)
}

#[get("/admin/users")]
pub async fn api_get_all_users(
    user: User,
    db: &State<Pool<Sqlite>>,
) -> Result<Json<Vec<UserData>>, Status> {
    user.require_permission(Permission::EditUserRoles)?;

    let users = get_all_users(db).await?;

    let user_responses: Vec<UserData> = users.into_iter().map(UserData::from).collect();

    Ok(Json(user_responses))
}

#[get("/health")]
pub fn health() -> &'static str {
    "OK"
}
