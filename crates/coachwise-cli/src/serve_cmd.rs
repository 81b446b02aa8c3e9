//! HTTP adapter for the exercise service (`coachwise serve`).
//!
//! Caller identity comes from the `x-user-id` header set by the upstream
//! authenticating gateway.

use std::net::SocketAddr;

use anyhow::Result;
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{FromRequestParts, Path, Query, State};
use axum::http::StatusCode;
use axum::http::request::Parts;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use sqlx::PgPool;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::warn;
use uuid::Uuid;

use coachwise_core::access;
use coachwise_core::exercise::{ExerciseError, ExerciseSpec};
use coachwise_db::models::ExerciseWithSets;

/// Header carrying the authenticated caller's user id.
pub const USER_ID_HEADER: &str = "x-user-id";

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct AppError {
    status: StatusCode,
    message: String,
}

impl AppError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: msg.into(),
        }
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self {
            status: StatusCode::UNAUTHORIZED,
            message: msg.into(),
        }
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self {
            status: StatusCode::FORBIDDEN,
            message: msg.into(),
        }
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: msg.into(),
        }
    }

    pub fn internal(err: anyhow::Error) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: format!("{err:#}"),
        }
    }
}

impl From<ExerciseError> for AppError {
    fn from(err: ExerciseError) -> Self {
        let constraint = err.is_constraint_violation();
        match err {
            ExerciseError::Validation(e) => Self::bad_request(e.to_string()),
            ExerciseError::NotFound(id) => Self::not_found(format!("exercise {id} not found")),
            ExerciseError::Forbidden(id) => {
                Self::forbidden(format!("exercise {id} belongs to another user"))
            }
            ExerciseError::Persistence(e) if constraint => Self::bad_request(format!("{e:#}")),
            ExerciseError::Persistence(e) => {
                tracing::error!(error = %format!("{e:#}"), "exercise persistence failed");
                Self::internal(e)
            }
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        if self.status.is_client_error() {
            warn!(status = %self.status, message = %self.message, "request rejected");
        }
        let body = serde_json::json!({ "error": self.message });
        (self.status, Json(body)).into_response()
    }
}

// ---------------------------------------------------------------------------
// Caller identity
// ---------------------------------------------------------------------------

/// The user on whose behalf a request runs.
#[derive(Debug, Clone, Copy)]
pub struct AuthenticatedUser(pub Uuid);

impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let value = parts
            .headers
            .get(USER_ID_HEADER)
            .ok_or_else(|| AppError::unauthorized(format!("missing {USER_ID_HEADER} header")))?;
        value
            .to_str()
            .ok()
            .and_then(|raw| Uuid::parse_str(raw.trim()).ok())
            .map(Self)
            .ok_or_else(|| AppError::unauthorized(format!("malformed {USER_ID_HEADER} header")))
    }
}

// ---------------------------------------------------------------------------
// Request types
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    pub public: Option<bool>,
    pub name: Option<String>,
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

pub fn build_router(pool: PgPool) -> Router {
    Router::new()
        .route("/exercises", get(list_exercises).post(create_exercise))
        .route(
            "/exercises/{id}",
            get(get_exercise).put(update_exercise).delete(delete_exercise),
        )
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(pool)
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

pub async fn run_serve(pool: PgPool, bind: &str, port: u16) -> Result<()> {
    let app = build_router(pool);
    let addr: SocketAddr = format!("{bind}:{port}").parse()?;
    tracing::info!("coachwise serve listening on http://{addr}");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    tracing::info!("coachwise serve shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for Ctrl+C: {e}");
        std::future::pending::<()>().await;
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn create_exercise(
    State(pool): State<PgPool>,
    AuthenticatedUser(user_id): AuthenticatedUser,
    body: Result<Json<ExerciseSpec>, JsonRejection>,
) -> Result<(StatusCode, Json<ExerciseWithSets>), AppError> {
    let Json(spec) = body?;
    let created = access::create_exercise_as(&pool, user_id, &spec).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

async fn get_exercise(
    State(pool): State<PgPool>,
    AuthenticatedUser(user_id): AuthenticatedUser,
    id: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<ExerciseWithSets>, AppError> {
    let Path(id) = id?;
    let aggregate = access::get_exercise_as(&pool, user_id, id).await?;
    Ok(Json(aggregate))
}

async fn update_exercise(
    State(pool): State<PgPool>,
    AuthenticatedUser(user_id): AuthenticatedUser,
    id: Result<Path<Uuid>, PathRejection>,
    body: Result<Json<ExerciseSpec>, JsonRejection>,
) -> Result<Json<ExerciseWithSets>, AppError> {
    let Path(id) = id?;
    let Json(spec) = body?;
    let updated = access::update_exercise_as(&pool, user_id, id, &spec).await?;
    Ok(Json(updated))
}

async fn delete_exercise(
    State(pool): State<PgPool>,
    AuthenticatedUser(user_id): AuthenticatedUser,
    id: Result<Path<Uuid>, PathRejection>,
) -> Result<StatusCode, AppError> {
    let Path(id) = id?;
    access::delete_exercise_as(&pool, user_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn list_exercises(
    State(pool): State<PgPool>,
    AuthenticatedUser(user_id): AuthenticatedUser,
    params: Result<Query<ListParams>, QueryRejection>,
) -> Result<Json<Vec<ExerciseWithSets>>, AppError> {
    let Query(params) = params?;
    let exercises = access::list_exercises_as(&pool, user_id, params.public, params.name).await?;
    Ok(Json(exercises))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{Method, Request, StatusCode};
    use serde_json::{Value, json};
    use sqlx::PgPool;
    use tower::ServiceExt;
    use uuid::Uuid;

    use coachwise_test_utils::{create_test_db, drop_test_db};

    // -----------------------------------------------------------------------
    // HTTP helpers
    // -----------------------------------------------------------------------

    async fn send(
        pool: &PgPool,
        method: Method,
        uri: &str,
        user: Option<Uuid>,
        body: Option<String>,
    ) -> axum::response::Response {
        let app = super::build_router(pool.clone());
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(user) = user {
            builder = builder.header(super::USER_ID_HEADER, user.to_string());
        }
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        app.oneshot(request).await.unwrap()
    }

    async fn send_json(
        pool: &PgPool,
        method: Method,
        uri: &str,
        user: Uuid,
        body: Value,
    ) -> axum::response::Response {
        send(pool, method, uri, Some(user), Some(body.to_string())).await
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), 1_048_576)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    async fn count(pool: &PgPool, table: &str) -> i64 {
        sqlx::query_scalar::<_, i64>(&format!("SELECT count(*) FROM {table}"))
            .fetch_one(pool)
            .await
            .unwrap()
    }

    fn two_set_body() -> Value {
        json!({
            "name": "test",
            "description": "desc",
            "public": false,
            "sets": [
                {"name": "Set 1", "rest_time": 30_000_000_000_i64, "rep_count": 6},
                {"name": "Set 2", "rest_time": 40_000_000_000_i64, "duration": 3_000_000_000_i64}
            ]
        })
    }

    async fn create(pool: &PgPool, user: Uuid, body: Value) -> Value {
        let resp = send_json(pool, Method::POST, "/exercises", user, body).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        body_json(resp).await
    }

    // -----------------------------------------------------------------------
    // Create
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn create_returns_numbered_aggregate() {
        let (pool, db_name) = create_test_db().await;
        let user = Uuid::new_v4();

        let json = create(&pool, user, two_set_body()).await;
        assert_eq!(json["name"], "test");
        assert_eq!(json["description"], "desc");
        assert_eq!(json["public"], false);
        assert_eq!(json["owner_id"], user.to_string());
        assert!(json["id"].as_str().is_some());

        let sets = json["sets"].as_array().expect("sets should be an array");
        assert_eq!(sets.len(), 2);
        assert_eq!(sets[0]["set_number"], 1);
        assert_eq!(sets[0]["name"], "Set 1");
        assert_eq!(sets[0]["rest_time"], 30_000_000_000_i64);
        assert_eq!(sets[0]["rep_count"], 6);
        assert!(sets[0].get("duration").is_none());
        assert_eq!(sets[1]["set_number"], 2);
        assert_eq!(sets[1]["duration"], 3_000_000_000_i64);
        assert!(sets[1].get("rep_count").is_none());

        pool.close().await;
        drop_test_db(&db_name).await;
    }

    #[tokio::test]
    async fn create_ignores_client_set_numbers() {
        let (pool, db_name) = create_test_db().await;

        let json = create(
            &pool,
            Uuid::new_v4(),
            json!({
                "name": "Ordering",
                "sets": [
                    {"name": "a", "set_number": 7, "rep_count": 1},
                    {"name": "b", "set_number": 3, "rep_count": 2}
                ]
            }),
        )
        .await;
        let sets = json["sets"].as_array().unwrap();
        assert_eq!(sets[0]["name"], "a");
        assert_eq!(sets[0]["set_number"], 1);
        assert_eq!(sets[1]["name"], "b");
        assert_eq!(sets[1]["set_number"], 2);

        pool.close().await;
        drop_test_db(&db_name).await;
    }

    #[tokio::test]
    async fn create_with_both_measures_is_rejected() {
        let (pool, db_name) = create_test_db().await;

        let resp = send_json(
            &pool,
            Method::POST,
            "/exercises",
            Uuid::new_v4(),
            json!({
                "name": "Both",
                "sets": [{"rest_time": 0, "rep_count": 5, "duration": 1_000_000_000_i64}]
            }),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let json = body_json(resp).await;
        let msg = json["error"].as_str().unwrap();
        assert!(msg.contains("mutually exclusive"), "unexpected error: {msg}");
        assert_eq!(count(&pool, "exercises").await, 0);

        pool.close().await;
        drop_test_db(&db_name).await;
    }

    #[tokio::test]
    async fn create_without_name_is_rejected() {
        let (pool, db_name) = create_test_db().await;

        let resp = send_json(
            &pool,
            Method::POST,
            "/exercises",
            Uuid::new_v4(),
            json!({"name": "   ", "sets": []}),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(resp).await["error"], "name is required");

        pool.close().await;
        drop_test_db(&db_name).await;
    }

    #[tokio::test]
    async fn malformed_json_is_bad_request() {
        let (pool, db_name) = create_test_db().await;
        let user = Some(Uuid::new_v4());

        let resp = send(&pool, Method::POST, "/exercises", user, Some("{not json".into())).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert!(body_json(resp).await["error"].is_string());

        let wrong_type = json!({"name": "x", "sets": [{"rep_count": "six"}]}).to_string();
        let resp = send(&pool, Method::POST, "/exercises", user, Some(wrong_type)).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        pool.close().await;
        drop_test_db(&db_name).await;
    }

    // -----------------------------------------------------------------------
    // Identity
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn missing_or_malformed_user_header_is_unauthorized() {
        let (pool, db_name) = create_test_db().await;

        let resp = send(&pool, Method::GET, "/exercises", None, None).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

        let app = super::build_router(pool.clone());
        let resp = app
            .oneshot(
                Request::builder()
                    .uri("/exercises")
                    .header(super::USER_ID_HEADER, "not-a-uuid")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        let json = body_json(resp).await;
        assert!(json["error"].as_str().unwrap().contains("malformed"));

        pool.close().await;
        drop_test_db(&db_name).await;
    }

    // -----------------------------------------------------------------------
    // Read
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn get_round_trips_created_exercise() {
        let (pool, db_name) = create_test_db().await;
        let user = Uuid::new_v4();

        let created = create(&pool, user, two_set_body()).await;
        let id = created["id"].as_str().unwrap();

        let resp = send(&pool, Method::GET, &format!("/exercises/{id}"), Some(user), None).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_json(resp).await, created);

        pool.close().await;
        drop_test_db(&db_name).await;
    }

    #[tokio::test]
    async fn get_missing_is_not_found() {
        let (pool, db_name) = create_test_db().await;

        let uri = format!("/exercises/{}", Uuid::new_v4());
        let resp = send(&pool, Method::GET, &uri, Some(Uuid::new_v4()), None).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        assert!(body_json(resp).await["error"].is_string());

        let uri = format!("/exercises/{}", Uuid::nil());
        let resp = send(&pool, Method::GET, &uri, Some(Uuid::new_v4()), None).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        pool.close().await;
        drop_test_db(&db_name).await;
    }

    #[tokio::test]
    async fn get_with_invalid_uuid_is_bad_request() {
        let (pool, db_name) = create_test_db().await;

        let resp = send(&pool, Method::GET, "/exercises/123", Some(Uuid::new_v4()), None).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert!(body_json(resp).await["error"].is_string());

        pool.close().await;
        drop_test_db(&db_name).await;
    }

    // -----------------------------------------------------------------------
    // Update
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn update_replaces_sets_and_renumbers() {
        let (pool, db_name) = create_test_db().await;
        let user = Uuid::new_v4();

        let created = create(&pool, user, two_set_body()).await;
        let id = created["id"].as_str().unwrap();
        let kept_id = created["sets"][1]["id"].clone();

        let resp = send_json(
            &pool,
            Method::PUT,
            &format!("/exercises/{id}"),
            user,
            json!({
                "name": "updated",
                "description": "new desc",
                "public": true,
                "sets": [
                    {"id": kept_id, "name": "Kept", "rest_time": 1, "rep_count": 1},
                    {"name": "New A", "rest_time": 2, "duration": 20},
                    {"name": "New B", "rest_time": 3}
                ]
            }),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);
        let json = body_json(resp).await;
        assert_eq!(json["name"], "updated");
        assert_eq!(json["public"], true);

        let sets = json["sets"].as_array().unwrap();
        assert_eq!(sets.len(), 3);
        for (i, set) in sets.iter().enumerate() {
            assert_eq!(set["set_number"], i + 1);
        }
        assert_eq!(sets[0]["id"], kept_id);
        assert_eq!(sets[0]["name"], "Kept");
        assert_eq!(sets[1]["duration"], 20);
        assert!(sets[2].get("rep_count").is_none());
        assert!(sets[2].get("duration").is_none());
        assert_eq!(count(&pool, "exercise_sets").await, 3);

        pool.close().await;
        drop_test_db(&db_name).await;
    }

    #[tokio::test]
    async fn update_with_empty_sets_clears_children() {
        let (pool, db_name) = create_test_db().await;
        let user = Uuid::new_v4();

        let created = create(&pool, user, two_set_body()).await;
        let id = created["id"].as_str().unwrap();

        let resp = send_json(
            &pool,
            Method::PUT,
            &format!("/exercises/{id}"),
            user,
            json!({"name": "bare", "sets": []}),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);
        let json = body_json(resp).await;
        assert_eq!(json["sets"], json!([]));
        assert_eq!(count(&pool, "exercise_sets").await, 0);

        pool.close().await;
        drop_test_db(&db_name).await;
    }

    #[tokio::test]
    async fn update_unknown_exercise_is_not_found() {
        let (pool, db_name) = create_test_db().await;

        let resp = send_json(
            &pool,
            Method::PUT,
            &format!("/exercises/{}", Uuid::new_v4()),
            Uuid::new_v4(),
            json!({"name": "ghost"}),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        pool.close().await;
        drop_test_db(&db_name).await;
    }

    // -----------------------------------------------------------------------
    // Access
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn other_users_see_only_what_they_may() {
        let (pool, db_name) = create_test_db().await;
        let owner = Uuid::new_v4();
        let stranger = Uuid::new_v4();

        let private = create(&pool, owner, json!({"name": "Private"})).await;
        let public = create(&pool, owner, json!({"name": "Public", "public": true})).await;
        let private_uri = format!("/exercises/{}", private["id"].as_str().unwrap());
        let public_uri = format!("/exercises/{}", public["id"].as_str().unwrap());

        let resp = send(&pool, Method::GET, &private_uri, Some(stranger), None).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let resp = send(&pool, Method::GET, &public_uri, Some(stranger), None).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let resp = send_json(&pool, Method::PUT, &public_uri, stranger, json!({"name": "x"})).await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);

        let resp = send(&pool, Method::DELETE, &public_uri, Some(stranger), None).await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);

        let resp = send(&pool, Method::GET, "/exercises", Some(stranger), None).await;
        let json = body_json(resp).await;
        let names: Vec<&str> = json
            .as_array()
            .unwrap()
            .iter()
            .map(|e| e["name"].as_str().unwrap())
            .collect();
        assert_eq!(names, vec!["Public"]);

        pool.close().await;
        drop_test_db(&db_name).await;
    }

    // -----------------------------------------------------------------------
    // Delete / list
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn delete_removes_exercise() {
        let (pool, db_name) = create_test_db().await;
        let user = Uuid::new_v4();

        let created = create(&pool, user, two_set_body()).await;
        let uri = format!("/exercises/{}", created["id"].as_str().unwrap());

        let resp = send(&pool, Method::DELETE, &uri, Some(user), None).await;
        assert_eq!(resp.status(), StatusCode::NO_CONTENT);

        let resp = send(&pool, Method::GET, &uri, Some(user), None).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let resp = send(&pool, Method::DELETE, &uri, Some(user), None).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        assert_eq!(count(&pool, "exercise_sets").await, 0);

        pool.close().await;
        drop_test_db(&db_name).await;
    }

    #[tokio::test]
    async fn list_applies_query_filters() {
        let (pool, db_name) = create_test_db().await;
        let user = Uuid::new_v4();

        create(&pool, user, json!({"name": "Bench Press", "public": true})).await;
        create(&pool, user, json!({"name": "Back Squat"})).await;

        let resp = send(&pool, Method::GET, "/exercises", Some(user), None).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_json(resp).await.as_array().unwrap().len(), 2);

        let resp = send(&pool, Method::GET, "/exercises?public=true", Some(user), None).await;
        let json = body_json(resp).await;
        assert_eq!(json.as_array().unwrap().len(), 1);
        assert_eq!(json[0]["name"], "Bench Press");

        let resp = send(&pool, Method::GET, "/exercises?name=squat", Some(user), None).await;
        let json = body_json(resp).await;
        assert_eq!(json.as_array().unwrap().len(), 1);
        assert_eq!(json[0]["name"], "Back Squat");

        pool.close().await;
        drop_test_db(&db_name).await;
    }

    #[tokio::test]
    async fn list_with_bad_query_is_json_bad_request() {
        let (pool, db_name) = create_test_db().await;

        let user = Some(Uuid::new_v4());
        let resp = send(&pool, Method::GET, "/exercises?public=maybe", user, None).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let json = body_json(resp).await;
        assert!(json["error"].is_string(), "expected JSON error body, got: {json}");

        pool.close().await;
        drop_test_db(&db_name).await;
    }
}
