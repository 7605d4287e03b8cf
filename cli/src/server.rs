use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use axum::{
    Json, Router,
    extract::{Path, Query, Request, State},
    http::{HeaderValue, StatusCode, header},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post, put},
};
use chrono::{Duration, Local, NaiveDate};
use serde::{Deserialize, Serialize};
use tower_http::limit::RequestBodyLimitLayer;
use tracing::{error, info};

use nutritrack_core::models::{
    CategorySummary, Food, MealEntry, MealPlan, MealSlot, NewIngredient, NutritionFacts,
    RecipeIngredient, UpdateMealEntry, UpdateMealPlan, parse_date,
};
use nutritrack_core::nutrition::{Analytics, DaySummary, RecipeDetail, WeekSummary};
use nutritrack_core::planner::{CopyOutcome, ExpandOutcome};
use nutritrack_core::service::{NutritionService, WEEK_DAYS};
use nutritrack_core::units::Unit;

const BODY_LIMIT: usize = 1024 * 1024; // 1 MB
const DEFAULT_ANALYTICS_DAYS: u32 = 7;

#[derive(Clone)]
struct AppState {
    svc: Arc<Mutex<NutritionService>>,
    api_key: Option<String>,
}

impl AppState {
    fn svc(&self) -> MutexGuard<'_, NutritionService> {
        self.svc.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

// --- Request / Response types ---

#[derive(Deserialize)]
struct UpdatePlanRequest {
    goal_calories: Option<i64>,
    notes: Option<String>,
}

#[derive(Deserialize)]
struct CreateEntryRequest {
    food_id: i64,
    meal_slot: String,
    quantity: f64,
    unit: Option<String>,
}

#[derive(Deserialize)]
struct UpdateEntryRequest {
    quantity: Option<f64>,
    unit: Option<String>,
    meal_slot: Option<String>,
}

#[derive(Deserialize)]
struct CopyRequest {
    source_date: String,
}

#[derive(Deserialize)]
struct WeekQuery {
    start: Option<String>,
}

#[derive(Deserialize)]
struct AnalyticsQuery {
    days: Option<u32>,
    end: Option<String>,
}

#[derive(Deserialize)]
struct FoodQuery {
    q: Option<String>,
    category: Option<String>,
}

#[derive(Deserialize)]
struct CreateFoodRequest {
    name: String,
    category: Option<String>,
    #[serde(flatten)]
    nutrition: NutritionFacts,
}

#[derive(Deserialize)]
struct IngredientRequest {
    food_id: i64,
    quantity: f64,
    unit: Option<String>,
    note: Option<String>,
}

#[derive(Deserialize)]
struct CreateRecipeRequest {
    name: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    ingredients: Vec<IngredientRequest>,
}

#[derive(Deserialize)]
struct ExpandRequest {
    date: String,
    meal_slot: String,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

// --- Error handling ---

enum ApiError {
    NotFound(String),
    BadRequest(String),
    Internal(anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            Self::Internal(err) => {
                error!("internal server error: {err:#}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };
        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

impl From<nutritrack_core::Error> for ApiError {
    fn from(err: nutritrack_core::Error) -> Self {
        match err {
            nutritrack_core::Error::Validation { .. } => Self::BadRequest(err.to_string()),
            nutritrack_core::Error::NotFound(_) => Self::NotFound(err.to_string()),
            other => Self::Internal(other.into()),
        }
    }
}

fn parse_unit(unit: Option<&str>) -> Result<Unit, ApiError> {
    Ok(unit
        .map(str::parse::<Unit>)
        .transpose()?
        .unwrap_or(Unit::G))
}

fn parse_slot(slot: &str) -> Result<MealSlot, ApiError> {
    Ok(slot.parse::<MealSlot>()?)
}

fn date_or_today(date: Option<&str>) -> Result<NaiveDate, ApiError> {
    match date {
        Some(d) => Ok(parse_date(d)?),
        None => Ok(Local::now().date_naive()),
    }
}

// --- Middleware ---

async fn require_auth(State(state): State<AppState>, request: Request, next: Next) -> Response {
    if let Some(ref expected_key) = state.api_key {
        let authorized = request
            .headers()
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .is_some_and(|token| token == expected_key);

        if !authorized {
            return (
                StatusCode::UNAUTHORIZED,
                Json(ErrorResponse {
                    error: "Invalid or missing API key".to_string(),
                }),
            )
                .into_response();
        }
    }
    next.run(request).await
}

async fn security_headers(request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;
    let headers = response.headers_mut();
    headers.insert(
        "x-content-type-options",
        HeaderValue::from_static("nosniff"),
    );
    headers.insert("x-frame-options", HeaderValue::from_static("DENY"));
    headers.insert(
        "content-security-policy",
        HeaderValue::from_static("default-src 'none'"),
    );
    response
}

// --- Plan Handlers ---

async fn get_plan(
    State(state): State<AppState>,
    Path(date): Path<String>,
) -> Result<Json<DaySummary>, ApiError> {
    let date = parse_date(&date)?;
    Ok(Json(state.svc().day_summary(date)?))
}

async fn update_plan(
    State(state): State<AppState>,
    Path(date): Path<String>,
    Json(req): Json<UpdatePlanRequest>,
) -> Result<Json<MealPlan>, ApiError> {
    let date = parse_date(&date)?;
    if req.goal_calories.is_none() && req.notes.is_none() {
        return Err(ApiError::BadRequest(
            "At least one of goal_calories or notes must be provided".to_string(),
        ));
    }
    let update = UpdateMealPlan {
        goal_calories: req.goal_calories,
        notes: req.notes,
    };
    Ok(Json(state.svc().update_plan(date, &update)?))
}

async fn create_entry(
    State(state): State<AppState>,
    Path(date): Path<String>,
    Json(req): Json<CreateEntryRequest>,
) -> Result<(StatusCode, Json<MealEntry>), ApiError> {
    let date = parse_date(&date)?;
    let meal_slot = parse_slot(&req.meal_slot)?;
    let unit = parse_unit(req.unit.as_deref())?;

    let entry = state
        .svc()
        .log_entry(date, req.food_id, meal_slot, req.quantity, unit)?;
    Ok((StatusCode::CREATED, Json(entry)))
}

async fn copy_into_plan(
    State(state): State<AppState>,
    Path(date): Path<String>,
    Json(req): Json<CopyRequest>,
) -> Result<Json<CopyOutcome>, ApiError> {
    let dest = parse_date(&date)?;
    let source = parse_date(&req.source_date)?;
    Ok(Json(state.svc().copy_day(source, dest)?))
}

// --- Entry Handlers ---

async fn update_entry(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(req): Json<UpdateEntryRequest>,
) -> Result<Json<MealEntry>, ApiError> {
    let update = UpdateMealEntry {
        quantity: req.quantity,
        unit: req.unit.as_deref().map(str::parse::<Unit>).transpose()?,
        meal_slot: req.meal_slot.as_deref().map(parse_slot).transpose()?,
    };
    if update.is_empty() {
        return Err(ApiError::BadRequest(
            "At least one field must be provided".to_string(),
        ));
    }
    Ok(Json(state.svc().edit_entry(id, &update)?))
}

async fn delete_entry(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    if state.svc().delete_entry(id)? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound(format!("Entry {id} not found")))
    }
}

// --- Rollup Handlers ---

async fn get_week(
    State(state): State<AppState>,
    Query(params): Query<WeekQuery>,
) -> Result<Json<WeekSummary>, ApiError> {
    let start = match params.start.as_deref() {
        Some(s) => parse_date(s)?,
        None => Local::now().date_naive() - Duration::days(i64::from(WEEK_DAYS) - 1),
    };
    Ok(Json(state.svc().week(start)?))
}

async fn get_analytics(
    State(state): State<AppState>,
    Query(params): Query<AnalyticsQuery>,
) -> Result<Json<Analytics>, ApiError> {
    let end = date_or_today(params.end.as_deref())?;
    let days = params.days.unwrap_or(DEFAULT_ANALYTICS_DAYS);
    Ok(Json(state.svc().analytics(end, days)?))
}

// --- Food Handlers ---

async fn search_foods(
    State(state): State<AppState>,
    Query(params): Query<FoodQuery>,
) -> Result<Json<Vec<Food>>, ApiError> {
    let foods = state
        .svc()
        .search_foods(params.q.as_deref(), params.category.as_deref())?;
    Ok(Json(foods))
}

async fn create_food(
    State(state): State<AppState>,
    Json(req): Json<CreateFoodRequest>,
) -> Result<(StatusCode, Json<Food>), ApiError> {
    let food = state
        .svc()
        .add_custom_food(&req.name, req.category.as_deref(), req.nutrition)?;
    Ok((StatusCode::CREATED, Json(food)))
}

async fn get_food(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Food>, ApiError> {
    Ok(Json(state.svc().food(id)?))
}

async fn list_categories(
    State(state): State<AppState>,
) -> Result<Json<Vec<CategorySummary>>, ApiError> {
    Ok(Json(state.svc().categories()?))
}

// --- Recipe Handlers ---

async fn create_recipe(
    State(state): State<AppState>,
    Json(req): Json<CreateRecipeRequest>,
) -> Result<(StatusCode, Json<RecipeDetail>), ApiError> {
    let ingredients = req
        .ingredients
        .into_iter()
        .map(|ing| {
            Ok(NewIngredient {
                food_id: ing.food_id,
                quantity: ing.quantity,
                unit: parse_unit(ing.unit.as_deref())?,
                note: ing.note,
            })
        })
        .collect::<Result<Vec<_>, ApiError>>()?;

    let detail = state
        .svc()
        .create_recipe_with_ingredients(&req.name, &req.description, &ingredients)?;
    Ok((StatusCode::CREATED, Json(detail)))
}

async fn list_recipes(State(state): State<AppState>) -> Result<Json<Vec<RecipeDetail>>, ApiError> {
    Ok(Json(state.svc().list_recipes()?))
}

async fn get_recipe(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<RecipeDetail>, ApiError> {
    Ok(Json(state.svc().recipe_detail(id)?))
}

async fn delete_recipe(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    if state.svc().delete_recipe(id)? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound(format!("Recipe {id} not found")))
    }
}

async fn add_recipe_ingredient(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(req): Json<IngredientRequest>,
) -> Result<Json<RecipeIngredient>, ApiError> {
    let unit = parse_unit(req.unit.as_deref())?;
    let ingredient = state
        .svc()
        .add_ingredient(id, req.food_id, req.quantity, unit, req.note)?;
    Ok(Json(ingredient))
}

async fn expand_recipe(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(req): Json<ExpandRequest>,
) -> Result<(StatusCode, Json<ExpandOutcome>), ApiError> {
    let date = parse_date(&req.date)?;
    let meal_slot = parse_slot(&req.meal_slot)?;
    let outcome = state.svc().expand_recipe(id, date, meal_slot)?;
    Ok((StatusCode::CREATED, Json(outcome)))
}

fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/api/plans/{date}", get(get_plan).put(update_plan))
        .route("/api/plans/{date}/entries", post(create_entry))
        .route("/api/plans/{date}/copy", post(copy_into_plan))
        .route("/api/entries/{id}", put(update_entry).delete(delete_entry))
        .route("/api/week", get(get_week))
        .route("/api/analytics", get(get_analytics))
        .route("/api/foods", get(search_foods).post(create_food))
        .route("/api/foods/{id}", get(get_food))
        .route("/api/categories", get(list_categories))
        .route("/api/recipes", get(list_recipes).post(create_recipe))
        .route("/api/recipes/{id}", get(get_recipe).delete(delete_recipe))
        .route("/api/recipes/{id}/ingredients", post(add_recipe_ingredient))
        .route("/api/recipes/{id}/expand", post(expand_recipe))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth))
        .layer(RequestBodyLimitLayer::new(BODY_LIMIT))
        .layer(middleware::from_fn(security_headers))
        .with_state(state)
}

// --- Server startup ---

/// First and last four characters of a key. Keys too short to mask are hidden.
fn mask_key(key: &str) -> String {
    let head = key.get(..4);
    let tail = key.len().checked_sub(4).and_then(|start| key.get(start..));
    match (head, tail) {
        (Some(head), Some(tail)) if key.len() > 8 => format!("{head}...{tail}"),
        _ => "****".to_string(),
    }
}

pub async fn start_server(
    svc: NutritionService,
    port: u16,
    bind: &str,
    api_key: Option<String>,
    new_api_key: bool,
) -> anyhow::Result<()> {
    let user = svc.user().username.clone();
    let state = AppState {
        svc: Arc::new(Mutex::new(svc)),
        api_key: api_key.clone(),
    };

    let app = build_router(state);

    if let Some(ref key) = api_key {
        if !new_api_key {
            eprintln!(
                "API key: {} (see api_key file in data directory)",
                mask_key(key)
            );
        }
    } else {
        eprintln!("Warning: Authentication disabled (--no-auth). API is open to anyone.");
    }

    if bind != "127.0.0.1" && bind != "localhost" && api_key.is_none() {
        eprintln!(
            "Warning: Listening on {bind} with no authentication. Any device on your network can access this API."
        );
    }

    let listener = tokio::net::TcpListener::bind(format!("{bind}:{port}")).await?;
    info!(%bind, port, %user, "server started");
    eprintln!("Listening on http://{bind}:{port} as {user}");
    axum::serve(listener, app).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    fn test_state(api_key: Option<String>) -> AppState {
        AppState {
            svc: Arc::new(Mutex::new(
                NutritionService::open_in_memory("tester").unwrap(),
            )),
            api_key,
        }
    }

    fn test_app(api_key: Option<String>) -> Router {
        build_router(test_state(api_key))
    }

    fn add_food(state: &AppState, name: &str, calories: i64, protein: f64) -> i64 {
        state
            .svc()
            .add_custom_food(
                name,
                None,
                NutritionFacts {
                    calories,
                    protein: Some(protein),
                    ..Default::default()
                },
            )
            .unwrap()
            .id
    }

    async fn send(
        app: Router,
        method: &str,
        uri: &str,
        body: Option<serde_json::Value>,
    ) -> (StatusCode, serde_json::Value) {
        let builder = axum::http::Request::builder().method(method).uri(uri);
        let request = match body {
            Some(json) => builder
                .header("content-type", "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json = if bytes.is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }

    #[tokio::test]
    async fn auth_missing_key_returns_401() {
        let app = test_app(Some("test-key-abc123".to_string()));

        let response = app
            .oneshot(
                axum::http::Request::get("/api/categories")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["error"], "Invalid or missing API key");
    }

    #[tokio::test]
    async fn auth_wrong_key_returns_401() {
        let app = test_app(Some("test-key-abc123".to_string()));

        let response = app
            .oneshot(
                axum::http::Request::get("/api/categories")
                    .header("Authorization", "Bearer wrong-key")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn auth_correct_key_succeeds() {
        let app = test_app(Some("test-key-abc123".to_string()));

        let response = app
            .oneshot(
                axum::http::Request::get("/api/categories")
                    .header("Authorization", "Bearer test-key-abc123")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn security_headers_on_auth_failure() {
        let app = test_app(Some("secret".to_string()));

        let response = app
            .oneshot(
                axum::http::Request::get("/api/categories")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            response.headers().get("x-content-type-options").unwrap(),
            "nosniff"
        );
        assert_eq!(response.headers().get("x-frame-options").unwrap(), "DENY");
        assert_eq!(
            response.headers().get("content-security-policy").unwrap(),
            "default-src 'none'"
        );
    }

    #[tokio::test]
    async fn body_size_limit_rejects_oversized() {
        let app = test_app(None);

        let big_body = vec![0u8; BODY_LIMIT + 1];
        let response = app
            .oneshot(
                axum::http::Request::post("/api/foods")
                    .header("content-type", "application/json")
                    .body(Body::from(big_body))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[tokio::test]
    async fn internal_error_does_not_leak_details() {
        let error = ApiError::Internal(anyhow::anyhow!("secret database path /home/user/db"));
        let response = error.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["error"], "Internal server error");
    }

    #[tokio::test]
    async fn get_plan_creates_default_day() {
        let (status, json) = send(test_app(None), "GET", "/api/plans/2024-06-15", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["plan"]["date"], "2024-06-15");
        assert_eq!(json["plan"]["goal_calories"], 2000);
        assert_eq!(json["total_calories"], 0);
        assert_eq!(json["progress_band"], "low");
    }

    #[tokio::test]
    async fn get_plan_invalid_date_returns_400() {
        let (status, _) = send(test_app(None), "GET", "/api/plans/not-a-date", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn log_entry_and_summarize() {
        let state = test_state(None);
        let chicken = add_food(&state, "Chicken", 165, 31.0);
        let app = build_router(state);

        let (status, entry) = send(
            app.clone(),
            "POST",
            "/api/plans/2024-06-15/entries",
            Some(serde_json::json!({
                "food_id": chicken,
                "meal_slot": "lunch",
                "quantity": 150,
                "unit": "g",
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(entry["meal_slot"], "lunch");

        let (_, summary) = send(app, "GET", "/api/plans/2024-06-15", None).await;
        assert_eq!(summary["total_calories"], 248);
        assert_eq!(summary["total_protein"], 46.5);
        assert_eq!(summary["calories_remaining"], 1752);
        assert_eq!(summary["meals"][0]["meal_slot"], "lunch");
    }

    #[tokio::test]
    async fn log_entry_validation_errors() {
        let state = test_state(None);
        let food = add_food(&state, "Rice", 130, 2.7);
        let app = build_router(state);

        let (status, json) = send(
            app.clone(),
            "POST",
            "/api/plans/2024-06-15/entries",
            Some(serde_json::json!({ "food_id": food, "meal_slot": "lunch", "quantity": 0 })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(json["error"].as_str().unwrap().contains("quantity"));

        let (status, _) = send(
            app.clone(),
            "POST",
            "/api/plans/2024-06-15/entries",
            Some(serde_json::json!({ "food_id": food, "meal_slot": "brunch", "quantity": 10 })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = send(
            app,
            "POST",
            "/api/plans/2024-06-15/entries",
            Some(serde_json::json!({ "food_id": 999, "meal_slot": "lunch", "quantity": 10 })),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn update_plan_goal_and_notes() {
        let app = test_app(None);
        let (status, plan) = send(
            app.clone(),
            "PUT",
            "/api/plans/2024-06-15",
            Some(serde_json::json!({ "goal_calories": 2500, "notes": "Rest day" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(plan["goal_calories"], 2500);
        assert_eq!(plan["notes"], "Rest day");

        let (status, _) = send(
            app.clone(),
            "PUT",
            "/api/plans/2024-06-15",
            Some(serde_json::json!({ "goal_calories": 500 })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = send(
            app,
            "PUT",
            "/api/plans/2024-06-15",
            Some(serde_json::json!({})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn edit_and_delete_entry() {
        let state = test_state(None);
        let food = add_food(&state, "Oats", 389, 16.9);
        let id = state
            .svc()
            .log_entry(
                NaiveDate::from_ymd_opt(2024, 6, 15).unwrap(),
                food,
                MealSlot::Breakfast,
                50.0,
                Unit::G,
            )
            .unwrap()
            .id;
        let app = build_router(state);

        let (status, entry) = send(
            app.clone(),
            "PUT",
            &format!("/api/entries/{id}"),
            Some(serde_json::json!({ "quantity": 80, "meal_slot": "snack" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(entry["quantity"], 80.0);
        assert_eq!(entry["meal_slot"], "snack");

        let (status, _) = send(
            app.clone(),
            "PUT",
            &format!("/api/entries/{id}"),
            Some(serde_json::json!({})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = send(app.clone(), "DELETE", &format!("/api/entries/{id}"), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, _) = send(app, "DELETE", &format!("/api/entries/{id}"), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn copy_day_is_idempotent() {
        let state = test_state(None);
        let food = add_food(&state, "Eggs", 155, 13.0);
        state
            .svc()
            .log_entry(
                NaiveDate::from_ymd_opt(2024, 6, 14).unwrap(),
                food,
                MealSlot::Breakfast,
                2.0,
                Unit::Piece,
            )
            .unwrap();
        let app = build_router(state);
        let body = serde_json::json!({ "source_date": "2024-06-14" });

        let (status, first) = send(
            app.clone(),
            "POST",
            "/api/plans/2024-06-15/copy",
            Some(body.clone()),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(first["entries_copied"], 1);
        assert_eq!(first["plan_created"], true);

        let (_, second) = send(
            app.clone(),
            "POST",
            "/api/plans/2024-06-15/copy",
            Some(body),
        )
        .await;
        assert_eq!(second["entries_copied"], 0);

        let (status, _) = send(
            app,
            "POST",
            "/api/plans/2024-06-15/copy",
            Some(serde_json::json!({ "source_date": "2024-01-01" })),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn food_catalog_endpoints() {
        let state = test_state(None);
        state.svc().load_sample_data().unwrap();
        let app = build_router(state);

        let (status, foods) = send(app.clone(), "GET", "/api/foods?q=banana", None).await;
        assert_eq!(status, StatusCode::OK);
        let id = foods[0]["id"].as_i64().unwrap();
        assert_eq!(foods[0]["name"], "Banana");

        let (status, food) = send(app.clone(), "GET", &format!("/api/foods/{id}"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(food["category_name"], "Fruits");

        let (status, _) = send(app.clone(), "GET", "/api/foods?category=Candy", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, categories) = send(app.clone(), "GET", "/api/categories", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(categories.as_array().unwrap().len(), 8);

        let (status, created) = send(
            app.clone(),
            "POST",
            "/api/foods",
            Some(serde_json::json!({
                "name": "Protein Bar",
                "category": "Snacks",
                "calories": 350,
                "protein": 30.0,
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created["is_custom"], true);

        let (status, _) = send(
            app,
            "POST",
            "/api/foods",
            Some(serde_json::json!({ "name": "Bad", "calories": -5 })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[test]
    fn mask_key_handles_short_and_multibyte_keys() {
        let key = "a".repeat(60) + "wxyz";
        assert_eq!(mask_key(&("abcd".to_string() + &key)), "abcd...wxyz");
        assert_eq!(mask_key("ab"), "****");
        assert_eq!(mask_key("abcdefgh"), "****");
        assert_eq!(mask_key("aéééééé"), "****");
    }

    #[tokio::test]
    async fn failed_recipe_create_stores_nothing() {
        let state = test_state(None);
        let rice = add_food(&state, "Rice", 100, 2.0);
        let app = build_router(state);

        let (status, _) = send(
            app.clone(),
            "POST",
            "/api/recipes",
            Some(serde_json::json!({
                "name": "Fried Rice",
                "ingredients": [
                    { "food_id": rice, "quantity": 2, "unit": "cup" },
                    { "food_id": 999, "quantity": 1 },
                ],
            })),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = send(
            app.clone(),
            "POST",
            "/api/recipes",
            Some(serde_json::json!({
                "name": "Fried Rice",
                "ingredients": [{ "food_id": rice, "quantity": 1, "unit": "handful" }],
            })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, list) = send(app.clone(), "GET", "/api/recipes", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(list, serde_json::json!([]));

        let (status, _) = send(
            app,
            "POST",
            "/api/recipes",
            Some(serde_json::json!({
                "name": "Fried Rice",
                "ingredients": [{ "food_id": rice, "quantity": 2, "unit": "cup" }],
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    #[tokio::test]
    async fn recipe_lifecycle() {
        let state = test_state(None);
        let rice = add_food(&state, "Rice", 100, 2.0);
        let oil = add_food(&state, "Oil", 884, 0.0);
        let app = build_router(state);

        let (status, detail) = send(
            app.clone(),
            "POST",
            "/api/recipes",
            Some(serde_json::json!({
                "name": "Fried Rice",
                "ingredients": [{ "food_id": rice, "quantity": 2, "unit": "cup" }],
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(detail["total_calories"], 480);
        let id = detail["recipe"]["id"].as_i64().unwrap();

        let (status, _) = send(
            app.clone(),
            "POST",
            &format!("/api/recipes/{id}/ingredients"),
            Some(serde_json::json!({ "food_id": oil, "quantity": 1, "unit": "tbsp" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (_, detail) = send(app.clone(), "GET", &format!("/api/recipes/{id}"), None).await;
        assert_eq!(detail["ingredient_count"], 2);
        assert_eq!(detail["total_calories"], 613);

        let expand = serde_json::json!({ "date": "2024-06-15", "meal_slot": "dinner" });
        for _ in 0..2 {
            let (status, outcome) = send(
                app.clone(),
                "POST",
                &format!("/api/recipes/{id}/expand"),
                Some(expand.clone()),
            )
            .await;
            assert_eq!(status, StatusCode::CREATED);
            assert_eq!(outcome["entries_added"], 2);
        }
        let (_, summary) = send(app.clone(), "GET", "/api/plans/2024-06-15", None).await;
        assert_eq!(summary["total_calories"], 1226);

        let (status, list) = send(app.clone(), "GET", "/api/recipes", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(list.as_array().unwrap().len(), 1);

        let (status, _) = send(app.clone(), "DELETE", &format!("/api/recipes/{id}"), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, _) = send(app, "GET", &format!("/api/recipes/{id}"), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn week_and_analytics_endpoints() {
        let state = test_state(None);
        let meal = add_food(&state, "Meal", 100, 5.0);
        state
            .svc()
            .log_entry(
                NaiveDate::from_ymd_opt(2024, 6, 10).unwrap(),
                meal,
                MealSlot::Lunch,
                19.0,
                Unit::Serving,
            )
            .unwrap();
        let app = build_router(state);

        let (status, week) = send(app.clone(), "GET", "/api/week?start=2024-06-10", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(week["days"].as_array().unwrap().len(), 7);
        assert_eq!(week["days"][0]["total_calories"], 1900);
        assert!(week["days"][1]["goal_calories"].is_null());

        let (status, stats) = send(
            app.clone(),
            "GET",
            "/api/analytics?days=7&end=2024-06-16",
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(stats["days_logged"], 1);
        assert_eq!(stats["days_on_target"], 1);
        assert_eq!(stats["top_meal_slot"], "lunch");

        let (status, _) = send(app, "GET", "/api/analytics?days=0", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
