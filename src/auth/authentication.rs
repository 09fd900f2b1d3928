use rocket::Request;
use rocket::http::Status;
use rocket::request::{FromRequest, Outcome};
use rocket::response::status::Custom;
use rocket::serde::json::Json;
use serde_json::{Value, json};
use sqlx::SqlitePool;

use crate::db::{get_session_by_token, get_user};

use super::User;

#[rocket::async_trait]
impl<'r> FromRequest<'r> for User {
    type Error = ();

    async fn from_request(request: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        let auth_span = tracing::info_span!("user_auth_guard");
        let _guard = auth_span.enter();

        let token = match request.cookies().get_private("session_token") {
            Some(cookie) => cookie.value().to_string(),
            None => return Outcome::Error((Status::Unauthorized, ())),
        };

        let db = match request.rocket().state::<SqlitePool>() {
            Some(pool) => pool,
            None => {
                tracing::error!("Database pool not found in managed state");
                return Outcome::Error((Status::InternalServerError, ()));
            }
        };

        let session = match get_session_by_token(db, &token).await {
            Ok(session) => session,
            Err(err) => {
                tracing::warn!(error = ?err, "Session token not recognised");
                return Outcome::Forward(Status::Unauthorized);
            }
        };

        if !session.is_valid() {
            tracing::warn!(user_id = %session.user_id, "Session token expired");
            return Outcome::Forward(Status::Unauthorized);
        }

        match get_user(db, session.user_id).await {
            Ok(user) => {
                tracing::info!(username = %user.username, role = %user.role, "User authenticated");
                Outcome::Success(user)
            }
            Err(err) => {
                tracing::error!(user_id = %session.user_id, error = ?err, "Failed to fetch user for valid session");
                Outcome::Error((Status::InternalServerError, ()))
            }
        }
    }
}

#[catch(401)]
pub fn unauthorized_api(_req: &Request) -> Custom<Json<Value>> {
    let error_json = json!({
        "error": "Unauthorized",
        "message": "Authentication required"
    });

    Custom(Status::Unauthorized, Json(error_json))
}
