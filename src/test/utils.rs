use std::collections::HashMap;
use std::sync::Once;

use chrono::NaiveDate;
use rocket::http::{ContentType, Cookie};
use rocket::local::asynchronous::Client;
use serde_json::{Value, json};
use sqlx::SqlitePool;

use crate::db;
use crate::models::{AssignmentType, NewWorkoutAssignment};

static INIT: Once = Once::new();

pub const STANDARD_PASSWORD: &str = "password123";

struct TestUser {
    username: String,
    password: String,
    role: String,
}

struct TestWorkout {
    key: String,
    coach: String,
    block: Value,
}

struct TestAssignment {
    key: String,
    athlete: String,
    coach: String,
    assignment_type: AssignmentType,
    block: Value,
    start_date: Option<NaiveDate>,
    end_date: Option<NaiveDate>,
}

/// Declarative fixture builder. Usernames double as lookup keys so tests
/// never hard-code row ids.
pub struct TestDbBuilder {
    users: Vec<TestUser>,
    workouts: Vec<TestWorkout>,
    assignments: Vec<TestAssignment>,
}

impl TestDbBuilder {
    pub fn new() -> Self {
        INIT.call_once(|| {
            let _ = env_logger::builder().is_test(true).try_init();
        });

        Self {
            users: Vec::new(),
            workouts: Vec::new(),
            assignments: Vec::new(),
        }
    }

    pub fn athlete(self, username: &str) -> Self {
        self.user_with_password(username, STANDARD_PASSWORD, "athlete")
    }

    pub fn coach(self, username: &str) -> Self {
        self.user_with_password(username, STANDARD_PASSWORD, "coach")
    }

    pub fn admin(self, username: &str) -> Self {
        self.user_with_password(username, STANDARD_PASSWORD, "admin")
    }

    pub fn user_with_password(mut self, username: &str, password: &str, role: &str) -> Self {
        self.users.push(TestUser {
            username: username.to_string(),
            password: password.to_string(),
            role: role.to_string(),
        });
        self
    }

    pub fn workout(mut self, key: &str, coach: &str, block: Value) -> Self {
        self.workouts.push(TestWorkout {
            key: key.to_string(),
            coach: coach.to_string(),
            block,
        });
        self
    }

    pub fn assignment(
        self,
        key: &str,
        athlete: &str,
        coach: &str,
        assignment_type: AssignmentType,
        block: Value,
    ) -> Self {
        self.assignment_with_window(key, athlete, coach, assignment_type, block, None, None)
    }

    pub fn assignment_with_window(
        mut self,
        key: &str,
        athlete: &str,
        coach: &str,
        assignment_type: AssignmentType,
        block: Value,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> Self {
        self.assignments.push(TestAssignment {
            key: key.to_string(),
            athlete: athlete.to_string(),
            coach: coach.to_string(),
            assignment_type,
            block,
            start_date,
            end_date,
        });
        self
    }

    pub async fn build(self) -> TestDb {
        let pool = SqlitePool::connect("sqlite::memory:")
            .await
            .expect("Failed to connect to in-memory database");

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .expect("Failed to run migrations");

        let mut user_ids = HashMap::new();
        for user in &self.users {
            let id = db::create_user(
                &pool,
                &user.username,
                &user.password,
                &user.role,
                Some(&user.username),
            )
            .await
            .expect("Failed to create test user");
            user_ids.insert(user.username.clone(), id);
        }

        let mut workout_ids = HashMap::new();
        for workout in &self.workouts {
            let coach_id = user_ids[&workout.coach];
            let id = db::create_workout(&pool, &workout.key, "", coach_id, &workout.block)
                .await
                .expect("Failed to create test workout");
            workout_ids.insert(workout.key.clone(), id);
        }

        let mut assignment_ids = HashMap::new();
        for assignment in self.assignments {
            let created = db::create_assignment(
                &pool,
                NewWorkoutAssignment {
                    athlete_id: user_ids[&assignment.athlete],
                    assignment_type: assignment.assignment_type,
                    exercise_block: assignment.block,
                    start_date: assignment.start_date,
                    end_date: assignment.end_date,
                    assigned_by: user_ids[&assignment.coach],
                    meta: None,
                    progress_overrides: None,
                },
            )
            .await
            .expect("Failed to create test assignment");
            assignment_ids.insert(assignment.key, created.id);
        }

        TestDb {
            pool,
            user_ids,
            workout_ids,
            assignment_ids,
        }
    }
}

pub struct TestDb {
    pub pool: SqlitePool,
    user_ids: HashMap<String, i64>,
    workout_ids: HashMap<String, i64>,
    assignment_ids: HashMap<String, i64>,
}

impl TestDb {
    pub fn user_id(&self, username: &str) -> i64 {
        *self
            .user_ids
            .get(username)
            .unwrap_or_else(|| panic!("No test user named {}", username))
    }

    pub fn workout_id(&self, key: &str) -> i64 {
        *self
            .workout_ids
            .get(key)
            .unwrap_or_else(|| panic!("No test workout named {}", key))
    }

    pub fn assignment_id(&self, key: &str) -> i64 {
        *self
            .assignment_ids
            .get(key)
            .unwrap_or_else(|| panic!("No test assignment named {}", key))
    }
}

/// Three exercises of 3x10 each, the shape most breakdown tests expect.
pub fn sample_single_block() -> Value {
    json!([
        {"name": "Squat", "sets": 3, "reps": 10},
        {"name": "Bench Press", "sets": 3, "reps": 10},
        {"name": "Deadlift", "sets": 3, "reps": 10}
    ])
}

pub async fn create_standard_test_db() -> TestDb {
    TestDbBuilder::new()
        .coach("test_coach")
        .athlete("test_athlete")
        .admin("test_admin")
        .build()
        .await
}

pub async fn setup_test_client(test_db: TestDb) -> (Client, TestDb) {
    let rocket = crate::init_rocket(test_db.pool.clone()).await;
    let client = Client::tracked(rocket)
        .await
        .expect("Failed to build test client");
    (client, test_db)
}

/// Logs in through the real endpoint; the tracked client keeps the session
/// cookies for subsequent requests. Returns them for tests that need to
/// inspect or replay them.
pub async fn login_test_user(client: &Client, username: &str) -> Vec<Cookie<'static>> {
    let response = client
        .post("/api/login")
        .header(ContentType::JSON)
        .body(
            json!({
                "username": username,
                "password": STANDARD_PASSWORD,
            })
            .to_string(),
        )
        .dispatch()
        .await;

    assert_eq!(response.status(), rocket::http::Status::Ok);

    response
        .cookies()
        .iter()
        .map(|cookie| cookie.clone().into_owned())
        .collect()
}
