use std::sync::{Arc, Mutex, MutexGuard};

use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, Query, State},
    http::{Method, StatusCode},
    routing::{get, post},
    Json, Router,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use larder_store::{
    Database, Label, LabelKind, NewRecipe, Recipe, RecipeFilter, RecipeUpdate, User,
};

use crate::auth::CurrentUser;
use crate::config::ServerConfig;
use crate::error::ServerError;
use crate::image_store::ImageStore;

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Mutex<Database>>,
    pub image_store: Arc<ImageStore>,
    pub config: Arc<ServerConfig>,
}

impl AppState {
    /// Lock the database handle.  Poisoning means a panic mid-write, which
    /// is unrecoverable state; it surfaces as an internal error.
    pub(crate) fn db(&self) -> Result<MutexGuard<'_, Database>, ServerError> {
        self.db
            .lock()
            .map_err(|_| ServerError::Internal("database lock poisoned".to_string()))
    }
}

pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers(Any);

    let body_limit = state.config.max_image_size;

    Router::new()
        .route("/health", get(health_check))
        .route("/api/user/create", post(user_create))
        .route("/api/user/token", post(user_token))
        .route("/api/user/me", get(me_get).patch(me_update).put(me_update))
        .route("/api/recipe/recipes", get(recipe_list).post(recipe_create))
        .route(
            "/api/recipe/recipes/{id}",
            get(recipe_detail)
                .patch(recipe_patch)
                .put(recipe_put)
                .delete(recipe_delete),
        )
        .route(
            "/api/recipe/recipes/{id}/upload-image",
            post(recipe_upload_image),
        )
        .route("/api/recipe/tags", get(tag_list).post(tag_create))
        .route(
            "/api/recipe/tags/{id}",
            get(tag_detail).patch(tag_update).put(tag_update).delete(tag_delete),
        )
        .route(
            "/api/recipe/ingredients",
            get(ingredient_list).post(ingredient_create),
        )
        .route(
            "/api/recipe/ingredients/{id}",
            get(ingredient_detail)
                .patch(ingredient_update)
                .put(ingredient_update)
                .delete(ingredient_delete),
        )
        .route("/media/{*reference}", get(media_get))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ─── Response / request types ───

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

#[derive(Deserialize)]
struct CreateUserRequest {
    email: String,
    password: String,
    #[serde(default)]
    name: String,
}

#[derive(Serialize)]
struct UserResponse {
    email: String,
    name: String,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            email: user.email,
            name: user.name,
        }
    }
}

#[derive(Deserialize)]
struct TokenRequest {
    email: String,
    password: String,
}

#[derive(Serialize)]
struct TokenResponse {
    token: String,
}

#[derive(Deserialize)]
struct UpdateMeRequest {
    name: Option<String>,
    password: Option<String>,
}

/// A name-only label entry, used both for label CRUD payloads and for the
/// nested `tags`/`ingredients` lists on recipe writes.
#[derive(Deserialize)]
struct LabelPayload {
    name: String,
}

#[derive(Serialize)]
struct LabelResponse {
    id: i64,
    name: String,
}

impl From<Label> for LabelResponse {
    fn from(label: Label) -> Self {
        Self {
            id: label.id,
            name: label.name,
        }
    }
}

#[derive(Serialize)]
struct RecipeListItem {
    id: i64,
    title: String,
    price: Decimal,
    time_minutes: u32,
    link: Option<String>,
    tags: Vec<LabelResponse>,
    ingredients: Vec<LabelResponse>,
}

impl From<Recipe> for RecipeListItem {
    fn from(recipe: Recipe) -> Self {
        Self {
            id: recipe.id,
            title: recipe.title,
            price: recipe.price,
            time_minutes: recipe.time_minutes,
            link: recipe.link,
            tags: recipe.tags.into_iter().map(LabelResponse::from).collect(),
            ingredients: recipe
                .ingredients
                .into_iter()
                .map(LabelResponse::from)
                .collect(),
        }
    }
}

/// Detail body: the list fields plus `description` and `image`.
#[derive(Serialize)]
struct RecipeDetailResponse {
    id: i64,
    title: String,
    price: Decimal,
    time_minutes: u32,
    link: Option<String>,
    description: String,
    image: Option<String>,
    tags: Vec<LabelResponse>,
    ingredients: Vec<LabelResponse>,
}

impl From<Recipe> for RecipeDetailResponse {
    fn from(recipe: Recipe) -> Self {
        Self {
            id: recipe.id,
            title: recipe.title,
            price: recipe.price,
            time_minutes: recipe.time_minutes,
            link: recipe.link,
            description: recipe.description,
            image: recipe.image,
            tags: recipe.tags.into_iter().map(LabelResponse::from).collect(),
            ingredients: recipe
                .ingredients
                .into_iter()
                .map(LabelResponse::from)
                .collect(),
        }
    }
}

#[derive(Deserialize)]
struct CreateRecipeRequest {
    title: String,
    time_minutes: u32,
    price: Decimal,
    #[serde(default)]
    description: String,
    #[serde(default)]
    link: Option<String>,
    #[serde(default)]
    tags: Vec<LabelPayload>,
    #[serde(default)]
    ingredients: Vec<LabelPayload>,
}

/// Partial recipe payload.  An absent `tags`/`ingredients` key deserializes
/// as `None` and preserves the stored set; a present key (even `[]`) clears
/// and rebuilds it.  Unknown keys — `user` in particular — are ignored.
#[derive(Deserialize, Default)]
struct UpdateRecipeRequest {
    title: Option<String>,
    time_minutes: Option<u32>,
    price: Option<Decimal>,
    description: Option<String>,
    link: Option<String>,
    tags: Option<Vec<LabelPayload>>,
    ingredients: Option<Vec<LabelPayload>>,
}

impl UpdateRecipeRequest {
    fn into_update(self) -> RecipeUpdate {
        RecipeUpdate {
            title: self.title,
            time_minutes: self.time_minutes,
            price: self.price,
            description: self.description,
            link: self.link,
            tags: self.tags.map(label_names),
            ingredients: self.ingredients.map(label_names),
        }
    }
}

fn label_names(labels: Vec<LabelPayload>) -> Vec<String> {
    labels.into_iter().map(|l| l.name).collect()
}

#[derive(Deserialize, Default)]
struct RecipeListQuery {
    tags: Option<String>,
    ingredients: Option<String>,
}

#[derive(Deserialize, Default)]
struct LabelListQuery {
    assigned_only: Option<String>,
}

/// Parse a comma-separated id list.  Absent and empty both mean "no
/// filtering on this dimension"; a non-integer entry is a validation error.
fn parse_id_list(raw: Option<&str>, dimension: &str) -> Result<Option<Vec<i64>>, ServerError> {
    let Some(raw) = raw else { return Ok(None) };
    if raw.is_empty() {
        return Ok(None);
    }

    let mut ids = Vec::new();
    for token in raw.split(',') {
        let id = token.trim().parse::<i64>().map_err(|_| {
            ServerError::Validation(format!("Invalid {dimension} id: {token:?}"))
        })?;
        ids.push(id);
    }
    Ok(Some(ids))
}

/// `assigned_only` accepts `0`/`1`; absent means `0`.
fn parse_assigned_only(raw: Option<&str>) -> Result<bool, ServerError> {
    match raw {
        None | Some("") | Some("0") => Ok(false),
        Some("1") => Ok(true),
        Some(other) => Err(ServerError::Validation(format!(
            "Invalid assigned_only value: {other:?}"
        ))),
    }
}

// ─── Health ───

async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

// ─── User endpoints ───

async fn user_create(
    State(state): State<AppState>,
    Json(req): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<UserResponse>), ServerError> {
    let user = state.db()?.create_user(&req.email, &req.password, &req.name)?;
    Ok((StatusCode::CREATED, Json(user.into())))
}

async fn user_token(
    State(state): State<AppState>,
    Json(req): Json<TokenRequest>,
) -> Result<Json<TokenResponse>, ServerError> {
    let token = state.db()?.authenticate(&req.email, &req.password)?;
    Ok(Json(TokenResponse { token }))
}

async fn me_get(CurrentUser(user): CurrentUser) -> Json<UserResponse> {
    Json(user.into())
}

async fn me_update(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(req): Json<UpdateMeRequest>,
) -> Result<Json<UserResponse>, ServerError> {
    let updated =
        state
            .db()?
            .update_profile(user.id, req.name.as_deref(), req.password.as_deref())?;
    Ok(Json(updated.into()))
}

// ─── Recipe endpoints ───

async fn recipe_list(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<RecipeListQuery>,
) -> Result<Json<Vec<RecipeListItem>>, ServerError> {
    let filter = RecipeFilter {
        tag_ids: parse_id_list(query.tags.as_deref(), "tag")?,
        ingredient_ids: parse_id_list(query.ingredients.as_deref(), "ingredient")?,
    };
    let recipes = state.db()?.list_recipes(user.id, &filter)?;
    Ok(Json(recipes.into_iter().map(RecipeListItem::from).collect()))
}

async fn recipe_create(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(req): Json<CreateRecipeRequest>,
) -> Result<(StatusCode, Json<RecipeDetailResponse>), ServerError> {
    let new = NewRecipe {
        title: req.title,
        time_minutes: req.time_minutes,
        price: req.price,
        description: req.description,
        link: req.link,
        tags: label_names(req.tags),
        ingredients: label_names(req.ingredients),
    };
    let recipe = state.db()?.create_recipe(user.id, &new)?;
    info!(recipe = recipe.id, user = user.id, "recipe created");
    Ok((StatusCode::CREATED, Json(recipe.into())))
}

async fn recipe_detail(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
) -> Result<Json<RecipeDetailResponse>, ServerError> {
    let recipe = state.db()?.get_recipe(user.id, id)?;
    Ok(Json(recipe.into()))
}

async fn recipe_patch(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
    Json(req): Json<UpdateRecipeRequest>,
) -> Result<Json<RecipeDetailResponse>, ServerError> {
    let recipe = state.db()?.update_recipe(user.id, id, &req.into_update())?;
    Ok(Json(recipe.into()))
}

/// Full update: same mechanics as PATCH, but the identifying fields are
/// mandatory.
async fn recipe_put(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
    Json(req): Json<UpdateRecipeRequest>,
) -> Result<Json<RecipeDetailResponse>, ServerError> {
    if req.title.is_none() || req.time_minutes.is_none() || req.price.is_none() {
        return Err(ServerError::Validation(
            "title, time_minutes and price are required".to_string(),
        ));
    }
    let recipe = state.db()?.update_recipe(user.id, id, &req.into_update())?;
    Ok(Json(recipe.into()))
}

async fn recipe_delete(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, ServerError> {
    state.db()?.delete_recipe(user.id, id)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn recipe_upload_image(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
    mut multipart: Multipart,
) -> Result<Json<RecipeDetailResponse>, ServerError> {
    // Scoped existence check before touching the filesystem.
    state.db()?.get_recipe(user.id, id)?;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ServerError::Validation(format!("Multipart error: {e}")))?
    {
        if field.name() == Some("image") {
            let data = field
                .bytes()
                .await
                .map_err(|e| ServerError::Validation(format!("Failed to read field: {e}")))?;

            let reference = state.image_store.store_image(id, &data).await?;
            let recipe = state.db()?.set_recipe_image(user.id, id, &reference)?;

            info!(recipe = id, size = data.len(), "image uploaded");
            return Ok(Json(recipe.into()));
        }
    }

    Err(ServerError::Validation(
        "Missing 'image' field in multipart form".to_string(),
    ))
}

async fn media_get(
    State(state): State<AppState>,
    Path(reference): Path<String>,
) -> Result<Vec<u8>, ServerError> {
    state.image_store.get_image(&reference).await
}

// ─── Label endpoints (tags and ingredients share all behavior) ───

async fn label_list(
    state: &AppState,
    user: &User,
    query: &LabelListQuery,
    kind: LabelKind,
) -> Result<Json<Vec<LabelResponse>>, ServerError> {
    let assigned_only = parse_assigned_only(query.assigned_only.as_deref())?;
    let labels = state.db()?.list_labels(user.id, kind, assigned_only)?;
    Ok(Json(labels.into_iter().map(LabelResponse::from).collect()))
}

async fn label_create(
    state: &AppState,
    user: &User,
    req: LabelPayload,
    kind: LabelKind,
) -> Result<(StatusCode, Json<LabelResponse>), ServerError> {
    let label = state.db()?.create_label(user.id, kind, &req.name)?;
    Ok((StatusCode::CREATED, Json(label.into())))
}

async fn label_detail(
    state: &AppState,
    user: &User,
    id: i64,
    kind: LabelKind,
) -> Result<Json<LabelResponse>, ServerError> {
    let label = state.db()?.get_label(user.id, kind, id)?;
    Ok(Json(label.into()))
}

async fn label_update(
    state: &AppState,
    user: &User,
    id: i64,
    req: LabelPayload,
    kind: LabelKind,
) -> Result<Json<LabelResponse>, ServerError> {
    let label = state.db()?.update_label(user.id, kind, id, &req.name)?;
    Ok(Json(label.into()))
}

async fn label_delete(
    state: &AppState,
    user: &User,
    id: i64,
    kind: LabelKind,
) -> Result<StatusCode, ServerError> {
    state.db()?.delete_label(user.id, kind, id)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn tag_list(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<LabelListQuery>,
) -> Result<Json<Vec<LabelResponse>>, ServerError> {
    label_list(&state, &user, &query, LabelKind::Tag).await
}

async fn tag_create(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(req): Json<LabelPayload>,
) -> Result<(StatusCode, Json<LabelResponse>), ServerError> {
    label_create(&state, &user, req, LabelKind::Tag).await
}

async fn tag_detail(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
) -> Result<Json<LabelResponse>, ServerError> {
    label_detail(&state, &user, id, LabelKind::Tag).await
}

async fn tag_update(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
    Json(req): Json<LabelPayload>,
) -> Result<Json<LabelResponse>, ServerError> {
    label_update(&state, &user, id, req, LabelKind::Tag).await
}

async fn tag_delete(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, ServerError> {
    label_delete(&state, &user, id, LabelKind::Tag).await
}

async fn ingredient_list(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<LabelListQuery>,
) -> Result<Json<Vec<LabelResponse>>, ServerError> {
    label_list(&state, &user, &query, LabelKind::Ingredient).await
}

async fn ingredient_create(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(req): Json<LabelPayload>,
) -> Result<(StatusCode, Json<LabelResponse>), ServerError> {
    label_create(&state, &user, req, LabelKind::Ingredient).await
}

async fn ingredient_detail(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
) -> Result<Json<LabelResponse>, ServerError> {
    label_detail(&state, &user, id, LabelKind::Ingredient).await
}

async fn ingredient_update(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
    Json(req): Json<LabelPayload>,
) -> Result<Json<LabelResponse>, ServerError> {
    label_update(&state, &user, id, req, LabelKind::Ingredient).await
}

async fn ingredient_delete(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, ServerError> {
    label_delete(&state, &user, id, LabelKind::Ingredient).await
}

pub async fn serve(state: AppState, addr: std::net::SocketAddr) -> anyhow::Result<()> {
    let app = build_router(state);

    info!(addr = %addr, "Starting HTTP API server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
