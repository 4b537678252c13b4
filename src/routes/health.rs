use axum::{extract::State, Json};
use serde::Serialize;
use time::{format_description::well_known::Rfc3339, OffsetDateTime};
use tracing::instrument;

use crate::users::services::UserService;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub message: &'static str,
    pub timestamp: String,
    pub database: &'static str,
}

#[instrument(skip(users))]
pub async fn health(State(users): State<UserService>) -> Json<HealthResponse> {
    let database = if users.ping().await {
        "Connected"
    } else {
        "Disconnected"
    };
    Json(HealthResponse {
        status: "OK",
        message: "User records API is running",
        timestamp: OffsetDateTime::now_utc()
            .format(&Rfc3339)
            .unwrap_or_default(),
        database,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::AppState;
    use axum::extract::FromRef;

    #[tokio::test]
    async fn reports_connected_store() {
        let state = AppState::fake();
        let Json(res) = health(State(UserService::from_ref(&state))).await;
        assert_eq!(res.status, "OK");
        assert_eq!(res.database, "Connected");
        assert!(OffsetDateTime::parse(&res.timestamp, &Rfc3339).is_ok());
    }
}
