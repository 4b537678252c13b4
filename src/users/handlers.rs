use axum::{
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
    routing::{get, patch},
    Json, Router,
};
use tracing::instrument;

use crate::{
    error::AppResult,
    response::{ApiResponse, PageInfo},
    state::AppState,
    users::{
        dto::{CreateUserRequest, ListUsersQuery, UpdateUserRequest, UserView},
        extractors::{ApiJson, ApiQuery, UserId},
        services::UserService,
    },
};

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/users", get(list_users).post(create_user))
        .route(
            "/users/:id",
            get(get_user).put(update_user).delete(delete_user),
        )
        .route("/users/:id/deactivate", patch(deactivate_user))
}

#[instrument(skip(users, payload))]
pub async fn create_user(
    State(users): State<UserService>,
    ApiJson(payload): ApiJson<CreateUserRequest>,
) -> AppResult<impl IntoResponse> {
    let user = users.create(payload).await?;
    let location = format!("/api/users/{}", user.id);
    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, location)],
        Json(ApiResponse::ok("User created successfully", user)),
    ))
}

#[instrument(skip(users))]
pub async fn list_users(
    State(users): State<UserService>,
    ApiQuery(query): ApiQuery<ListUsersQuery>,
) -> AppResult<Json<ApiResponse<Vec<UserView>>>> {
    let page = users.list(query).await?;
    let info = PageInfo {
        page: page.page,
        total_pages: page.total_pages,
        total: page.total,
        limit: page.limit,
    };
    Ok(Json(ApiResponse::paged(
        "Users retrieved successfully",
        page.users,
        info,
    )))
}

#[instrument(skip(users, id), fields(user_id = %id.0))]
pub async fn get_user(
    State(users): State<UserService>,
    id: UserId,
) -> AppResult<Json<ApiResponse<UserView>>> {
    let user = users.get(id.0).await?;
    Ok(Json(ApiResponse::ok("User retrieved successfully", user)))
}

#[instrument(skip(users, id, payload), fields(user_id = %id.0))]
pub async fn update_user(
    State(users): State<UserService>,
    id: UserId,
    ApiJson(payload): ApiJson<UpdateUserRequest>,
) -> AppResult<Json<ApiResponse<UserView>>> {
    let user = users.update(id.0, payload).await?;
    Ok(Json(ApiResponse::ok("User updated successfully", user)))
}

#[instrument(skip(users, id), fields(user_id = %id.0))]
pub async fn delete_user(
    State(users): State<UserService>,
    id: UserId,
) -> AppResult<Json<ApiResponse<()>>> {
    users.delete(id.0).await?;
    Ok(Json(ApiResponse::done("User deleted successfully")))
}

#[instrument(skip(users, id), fields(user_id = %id.0))]
pub async fn deactivate_user(
    State(users): State<UserService>,
    id: UserId,
) -> AppResult<Json<ApiResponse<()>>> {
    users.deactivate(id.0).await?;
    Ok(Json(ApiResponse::done("User deactivated successfully")))
}

#[cfg(test)]
mod tests {
    use axum::{
        body::Body,
        http::{Method, Request, StatusCode},
        Router,
    };
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::{app::build_app, state::AppState};

    fn app() -> Router {
        build_app(AppState::fake())
    }

    async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let mut req = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(v) => {
                req = req.header("content-type", "application/json");
                Body::from(v.to_string())
            }
            None => Body::empty(),
        };
        let res = app.clone().oneshot(req.body(body).unwrap()).await.unwrap();
        let status = res.status();
        let bytes = res.into_body().collect().await.unwrap().to_bytes();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }

    fn ann() -> Value {
        json!({
            "firstName": "Ann",
            "lastName": "Lee",
            "email": "ann@x.com",
            "password": "secret1"
        })
    }

    #[tokio::test]
    async fn ann_lee_scenario_over_http() {
        let app = app();

        let (status, body) = send(&app, Method::POST, "/api/users", Some(ann())).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["success"], true);
        assert_eq!(body["data"]["role"], "user");
        assert_eq!(body["data"]["isActive"], true);
        assert!(body["data"].get("password").is_none());
        assert!(body["data"].get("passwordHash").is_none());
        let id = body["data"]["id"].as_str().unwrap().to_string();

        let (status, body) = send(&app, Method::POST, "/api/users", Some(ann())).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["success"], false);
        assert_eq!(body["message"], "User with this email already exists");

        let uri = format!("/api/users/{id}");
        let (status, body) =
            send(&app, Method::PUT, &uri, Some(json!({ "isActive": false }))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["isActive"], false);

        let (status, body) = send(&app, Method::GET, &uri, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["isActive"], false);

        let (status, body) = send(&app, Method::DELETE, &uri, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "success": true, "message": "User deleted successfully" }));

        let (status, body) = send(&app, Method::GET, &uri, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, json!({ "success": false, "message": "User not found" }));
    }

    #[tokio::test]
    async fn validation_failures_are_400_with_joined_message() {
        let app = app();
        let mut bad = ann();
        bad["age"] = json!(151);
        bad["firstName"] = json!("A");
        let (status, body) = send(&app, Method::POST, "/api/users", Some(bad)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            body["message"],
            "Validation error: \"firstName\" length must be at least 2 characters long, \"age\" must be less than or equal to 150"
        );
    }

    #[tokio::test]
    async fn malformed_inputs_use_the_envelope() {
        let app = app();

        let (status, body) = send(&app, Method::GET, "/api/users/not-a-uuid", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Validation error: \"id\" must be a valid GUID");

        let (status, body) = send(&app, Method::GET, "/api/users?page=abc", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);

        let (status, body) = send(&app, Method::GET, "/api/users?limit=101", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);

        let uri = format!("/api/users/{}", uuid::Uuid::new_v4());
        let (status, _) =
            send(&app, Method::PUT, &uri, Some(json!({ "password": "changed1" }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn list_returns_pagination_block() {
        let app = app();
        for i in 0..3 {
            let mut user = ann();
            user["email"] = json!(format!("ann{i}@x.com"));
            let (status, _) = send(&app, Method::POST, "/api/users", Some(user)).await;
            assert_eq!(status, StatusCode::CREATED);
        }

        let (status, body) =
            send(&app, Method::GET, "/api/users?limit=2&page=2&isActive=true", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"].as_array().unwrap().len(), 1);
        assert_eq!(
            body["pagination"],
            json!({ "page": 2, "totalPages": 2, "total": 3, "limit": 2 })
        );
    }

    #[tokio::test]
    async fn deactivate_endpoint() {
        let app = app();
        let (_, body) = send(&app, Method::POST, "/api/users", Some(ann())).await;
        let id = body["data"]["id"].as_str().unwrap().to_string();

        let (status, body) =
            send(&app, Method::PATCH, &format!("/api/users/{id}/deactivate"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "success": true, "message": "User deactivated successfully" }));

        let (_, body) = send(&app, Method::GET, "/api/users?isActive=false", None).await;
        assert_eq!(body["pagination"]["total"], 1);

        let missing = format!("/api/users/{}/deactivate", uuid::Uuid::new_v4());
        let (status, _) = send(&app, Method::PATCH, &missing, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
