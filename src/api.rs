use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::{HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, put},
    Json, Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::sync::Mutex;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tracing::{error, info};

use crate::db::Database;
use crate::error::{GenerationError, PlanError, Stage};
use crate::models::WorkoutPlan;
use crate::parser::validate_plan;
use crate::pipeline::WorkoutPlanGenerator;
use crate::plan_store::PlanStore;

#[derive(Clone)]
pub struct ApiState {
    pub database: Arc<Mutex<Database>>,
    pub generator: WorkoutPlanGenerator,
    pub plans: Arc<dyn PlanStore>,
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
    stage: Option<Stage>,
}

impl ApiError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            stage: None,
        }
    }

    fn internal(err: impl std::fmt::Display) -> Self {
        error!("Internal error: {}", err);
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
    }
}

fn status_for(stage: Stage, err: &PlanError) -> StatusCode {
    match err {
        PlanError::Validation { .. } if stage == Stage::Translate => StatusCode::UNPROCESSABLE_ENTITY,
        PlanError::Validation { .. } => StatusCode::BAD_GATEWAY,
        PlanError::Config(_) => StatusCode::SERVICE_UNAVAILABLE,
        PlanError::Provider {
            timed_out: true, ..
        } => StatusCode::GATEWAY_TIMEOUT,
        PlanError::Provider { .. } | PlanError::Parse { .. } => StatusCode::BAD_GATEWAY,
    }
}

impl From<GenerationError> for ApiError {
    fn from(err: GenerationError) -> Self {
        Self {
            status: status_for(err.stage, &err.source),
            message: format!("Failed to generate workout plan: {}", err.source),
            stage: Some(err.stage),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = json!({
            "success": false,
            "error": self.message,
            "stage": self.stage.map(|s| s.as_str()),
        });
        (self.status, Json(body)).into_response()
    }
}

type ApiResult = Result<Json<Value>, ApiError>;

pub fn router(state: ApiState, cors_allowed_origins: &str) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/v1/profiles", get(list_profiles))
        .route(
            "/api/v1/profiles/:user_id",
            put(put_profile).get(get_profile).delete(delete_profile),
        )
        .route(
            "/api/v1/ai/workout-plan/:id",
            get(get_plan)
                .post(generate_plan)
                .put(update_plan)
                .delete(delete_plan),
        )
        .route("/api/v1/ai/workout-plans/:user_id", get(list_user_plans))
        .layer(cors_layer(cors_allowed_origins))
        .with_state(state)
}

fn cors_layer(origins: &str) -> CorsLayer {
    let cors = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if origins.trim() == "*" {
        return cors.allow_origin(Any);
    }
    let list: Vec<HeaderValue> = origins
        .split(',')
        .filter_map(|origin| HeaderValue::from_str(origin.trim()).ok())
        .collect();
    cors.allow_origin(AllowOrigin::list(list))
}

pub async fn run_server(
    state: ApiState,
    bind_addr: &str,
    cors_allowed_origins: &str,
) -> anyhow::Result<()> {
    let app = router(state, cors_allowed_origins);

    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    info!("API Server running at http://{}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok", "message": "Fit AI API is running" }))
}

async fn put_profile(
    State(state): State<ApiState>,
    Path(user_id): Path<String>,
    Json(document): Json<Value>,
) -> ApiResult {
    if !document.is_object() {
        return Err(ApiError::new(
            StatusCode::BAD_REQUEST,
            "Profile document must be a JSON object",
        ));
    }
    state
        .database
        .lock()
        .await
        .upsert_profile(&user_id, &document)
        .map_err(ApiError::internal)?;
    Ok(Json(json!({ "success": true, "document_id": user_id })))
}

async fn get_profile(State(state): State<ApiState>, Path(user_id): Path<String>) -> ApiResult {
    let document = state
        .database
        .lock()
        .await
        .get_profile(&user_id)
        .map_err(ApiError::internal)?;
    match document {
        Some(data) => Ok(Json(json!({
            "success": true,
            "collection": "users",
            "document_id": user_id,
            "data": data,
        }))),
        None => Err(ApiError::new(StatusCode::NOT_FOUND, "User not found")),
    }
}

async fn list_profiles(State(state): State<ApiState>) -> ApiResult {
    let ids = state
        .database
        .lock()
        .await
        .list_user_ids()
        .map_err(ApiError::internal)?;
    Ok(Json(json!({ "success": true, "count": ids.len(), "data": ids })))
}

async fn delete_profile(State(state): State<ApiState>, Path(user_id): Path<String>) -> ApiResult {
    let removed = state
        .database
        .lock()
        .await
        .delete_profile(&user_id)
        .map_err(ApiError::internal)?;
    if removed {
        Ok(Json(json!({ "success": true, "message": "Profile deleted" })))
    } else {
        Err(ApiError::new(StatusCode::NOT_FOUND, "User not found"))
    }
}

async fn generate_plan(State(state): State<ApiState>, Path(user_id): Path<String>) -> ApiResult {
    let document = state
        .database
        .lock()
        .await
        .get_profile(&user_id)
        .map_err(ApiError::internal)?;
    let Some(document) = document else {
        return Err(ApiError::new(StatusCode::NOT_FOUND, "User not found"));
    };

    let plan = state.generator.generate_workout_plan(&document).await?;
    let plan = state.plans.save(&user_id, plan).await;
    info!("Stored workout plan {} for user {}", plan.id, user_id);

    Ok(Json(json!({
        "success": true,
        "data": plan,
        "message": "Workout plan generated successfully",
    })))
}

fn plan_id(raw: &str) -> Result<i64, ApiError> {
    raw.parse::<i64>()
        .map_err(|_| ApiError::new(StatusCode::BAD_REQUEST, "Invalid plan ID format"))
}

async fn get_plan(State(state): State<ApiState>, Path(id): Path<String>) -> ApiResult {
    let id = plan_id(&id)?;
    match state.plans.get(id).await {
        Some(plan) => Ok(Json(json!({ "success": true, "data": plan }))),
        None => Err(ApiError::new(StatusCode::NOT_FOUND, "Workout plan not found")),
    }
}

async fn update_plan(
    State(state): State<ApiState>,
    Path(id): Path<String>,
    payload: Result<Json<WorkoutPlan>, JsonRejection>,
) -> ApiResult {
    let id = plan_id(&id)?;
    let Json(plan) =
        payload.map_err(|rejection| ApiError::new(rejection.status(), rejection.body_text()))?;
    validate_plan(&plan)
        .map_err(|e| ApiError::new(StatusCode::UNPROCESSABLE_ENTITY, e.to_string()))?;
    match state.plans.update(id, plan).await {
        Some(plan) => Ok(Json(json!({
            "success": true,
            "message": "Workout plan updated successfully",
            "data": plan,
        }))),
        None => Err(ApiError::new(StatusCode::NOT_FOUND, "Workout plan not found")),
    }
}

async fn delete_plan(State(state): State<ApiState>, Path(id): Path<String>) -> ApiResult {
    let id = plan_id(&id)?;
    if state.plans.delete(id).await {
        Ok(Json(json!({
            "success": true,
            "message": "Workout plan deleted successfully",
        })))
    } else {
        Err(ApiError::new(StatusCode::NOT_FOUND, "Workout plan not found"))
    }
}

async fn list_user_plans(State(state): State<ApiState>, Path(user_id): Path<String>) -> ApiResult {
    let plans = state.plans.list_for_user(&user_id).await;
    Ok(Json(json!({
        "success": true,
        "count": plans.len(),
        "data": plans,
    })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai_client::LlmProvider;
    use crate::plan_store::InMemoryPlanStore;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    struct Canned(Result<&'static str, fn() -> PlanError>);

    #[async_trait]
    impl LlmProvider for Canned {
        fn name(&self) -> &'static str {
            "canned"
        }

        async fn generate(&self, _prompt: &str, _system: &str) -> Result<String, PlanError> {
            match &self.0 {
                Ok(text) => Ok(text.to_string()),
                Err(make) => Err(make()),
            }
        }
    }

    const PLAN: &str = r#"{"id":77,"name":"Push Pull Legs","createdAt":"2024-01-15T00:00:00Z","sessions":[{"id":"session_1","name":"Push Day","note":"chest","exercises":[{"id":1,"name":"Bench Press","sets":4,"reps":8,"weight":{"value":185,"unit":"LB"},"type":"weight"}]}]}"#;

    fn app(reply: Result<&'static str, fn() -> PlanError>) -> Router {
        let database = Database::open(":memory:").unwrap();
        database
            .upsert_profile("u1", &json!({"fullName": "Ana", "fitnessLevel": "advanced"}))
            .unwrap();
        database
            .upsert_profile("bad", &json!({"fullName": "Bo", "fitnessLevel": "expert"}))
            .unwrap();
        let state = ApiState {
            database: Arc::new(Mutex::new(database)),
            generator: WorkoutPlanGenerator::new(Arc::new(Canned(reply))),
            plans: Arc::new(InMemoryPlanStore::new()),
        };
        router(state, "*")
    }

    async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json");
        let request = match body {
            Some(body) => request.body(Body::from(body.to_string())).unwrap(),
            None => request.body(Body::empty()).unwrap(),
        };
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    #[tokio::test]
    async fn generate_then_fetch_list_and_delete() {
        let app = app(Ok(PLAN));

        let (status, body) = send(&app, "POST", "/api/v1/ai/workout-plan/u1", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["data"]["id"], 1);
        assert_eq!(body["data"]["sessions"][0]["exercises"][0]["name"], "Bench Press");

        let (status, body) = send(&app, "GET", "/api/v1/ai/workout-plan/1", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["name"], "Push Pull Legs");

        let (_, body) = send(&app, "GET", "/api/v1/ai/workout-plans/u1", None).await;
        assert_eq!(body["count"], 1);

        let (status, _) = send(&app, "DELETE", "/api/v1/ai/workout-plan/1", None).await;
        assert_eq!(status, StatusCode::OK);
        let (status, _) = send(&app, "GET", "/api/v1/ai/workout-plan/1", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn unknown_user_is_404() {
        let app = app(Ok(PLAN));
        let (status, _) = send(&app, "POST", "/api/v1/ai/workout-plan/ghost", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn pipeline_errors_map_to_status_and_stage() {
        let app_bad_profile = app(Ok(PLAN));
        let (status, body) = send(&app_bad_profile, "POST", "/api/v1/ai/workout-plan/bad", None).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["stage"], "translate");

        let no_key = app(Err(|| PlanError::Config("OPEN_AI_API_KEY environment variable is not set".into())));
        let (status, body) = send(&no_key, "POST", "/api/v1/ai/workout-plan/u1", None).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["stage"], "generate");

        let slow = app(Err(|| PlanError::timeout("canned", "no response within 90s")));
        let (status, _) = send(&slow, "POST", "/api/v1/ai/workout-plan/u1", None).await;
        assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);

        let chatty = app(Ok("Sure! Here is your plan: {...}"));
        let (status, body) = send(&chatty, "POST", "/api/v1/ai/workout-plan/u1", None).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["stage"], "parse");
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn update_validates_the_plan() {
        let app = app(Ok(PLAN));
        send(&app, "POST", "/api/v1/ai/workout-plan/u1", None).await;

        let mut edited: Value = serde_json::from_str(PLAN).unwrap();
        edited["name"] = json!("Edited");
        let (status, body) = send(&app, "PUT", "/api/v1/ai/workout-plan/1", Some(edited.clone())).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["name"], "Edited");
        assert_eq!(body["data"]["id"], 1);

        assert_eq!(body["data"]["createdAt"], "2024-01-15T00:00:00Z");

        edited["sessions"][0]["exercises"][0]["reps"] = json!(0);
        let (status, _) = send(&app, "PUT", "/api/v1/ai/workout-plan/1", Some(edited)).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

        let (status, _) = send(&app, "GET", "/api/v1/ai/workout-plan/abc", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn update_without_timestamps_keeps_the_stored_ones() {
        let app = app(Ok(PLAN));
        let (_, created) = send(&app, "POST", "/api/v1/ai/workout-plan/u1", None).await;
        let start_date = created["data"]["planStartDate"].clone();
        assert_ne!(start_date, "1970-01-01T00:00:00Z");

        let edited = json!({
            "name": "Edited",
            "sessions": [{"id": "s1", "name": "Day 1", "exercises": []}]
        });
        let (status, body) = send(&app, "PUT", "/api/v1/ai/workout-plan/1", Some(edited)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["createdAt"], "2024-01-15T00:00:00Z");
        assert_eq!(body["data"]["planStartDate"], start_date);
    }

    #[tokio::test]
    async fn malformed_update_body_gets_a_json_error() {
        let app = app(Ok(PLAN));
        send(&app, "POST", "/api/v1/ai/workout-plan/u1", None).await;

        let (status, body) =
            send(&app, "PUT", "/api/v1/ai/workout-plan/1", Some(json!({"sessions": "x"}))).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["success"], false);
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn profiles_can_be_stored_and_read_back() {
        let app = app(Ok(PLAN));
        let doc = json!({"fullName": "Cy", "fitnessLevel": "beginner"});
        let (status, _) = send(&app, "PUT", "/api/v1/profiles/u9", Some(doc.clone())).await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = send(&app, "GET", "/api/v1/profiles/u9", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"], doc);

        let (status, _) = send(&app, "PUT", "/api/v1/profiles/u9", Some(json!([1, 2]))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (_, body) = send(&app, "GET", "/api/v1/profiles", None).await;
        assert_eq!(body["data"], json!(["bad", "u1", "u9"]));

        let (status, _) = send(&app, "DELETE", "/api/v1/profiles/u9", None).await;
        assert_eq!(status, StatusCode::OK);
        let (status, _) = send(&app, "DELETE", "/api/v1/profiles/u9", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
