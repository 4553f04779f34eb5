use crate::auth::{self, ACCESS_TOKEN, REFRESH_TOKEN};
use crate::database::{Database, ItemFilter};
use crate::media::MediaStore;
use crate::model::{Item, ItemDraft, ItemImage, Swap, SwapMessage, SwapStatus, User};
use crate::view::{ItemView, MessageView, SwapListEnvelope, SwapView, UserSummary};
use crate::{ItemId, Result, RewearError, SwapId, TokenService};
use axum::async_trait;
use axum::extract::multipart::MultipartError;
use axum::extract::{FromRequest, FromRequestParts, Multipart, Path, Query, Request, State};
use axum::http::request::Parts;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{delete, get, patch, post};
use axum::{Json, Router};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::HashMap;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub tokens: TokenService,
    pub media: MediaStore,
    /// Base URL used when turning stored image names into absolute URLs.
    pub public_base: String,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/register/", post(register))
        .route("/api/login/", post(login))
        .route("/api/user/", get(user_detail))
        .route("/api/token/refresh/", post(refresh_token))
        .route("/api/items/", get(browse_items).post(create_item))
        .route("/api/items/:id/", get(public_item_detail))
        .route("/api/my-items/", get(my_items))
        .route("/api/my-items/:id/", get(my_item_detail))
        .route("/api/available-items/", get(available_items))
        .route("/api/swaps/", get(list_swaps).post(create_swap))
        .route("/api/swaps/:id/", patch(update_swap).put(update_swap))
        .route("/api/swaps/:id/delete/", delete(delete_swap))
        .route(
            "/api/swaps/:id/messages/",
            get(list_messages).post(create_message),
        )
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// The authenticated caller, resolved from the `Authorization: Bearer`
/// header. Any failure along the way is a 401.
pub struct AuthUser(pub User);

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = RewearError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self> {
        let header = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| RewearError::Auth("Missing bearer token".to_string()))?;
        let token = header
            .strip_prefix("Bearer ")
            .ok_or_else(|| RewearError::Auth("Missing bearer token".to_string()))?;

        let claims = state.tokens.validate(token, ACCESS_TOKEN)?;
        let user_id = claims
            .user_id()
            .map_err(|_| RewearError::Auth("Malformed token subject".to_string()))?;
        let user = state
            .db
            .get_user(user_id)
            .await?
            .ok_or_else(|| RewearError::Auth("Unknown user".to_string()))?;

        Ok(AuthUser(user))
    }
}

/// `Json` that reports body deserialization failures as validation errors
/// instead of axum's plain-text 422.
struct AppJson<T>(T);

#[async_trait]
impl<S, T> FromRequest<S> for AppJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = RewearError;

    async fn from_request(req: Request, state: &S) -> Result<Self> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(AppJson(value)),
            Err(rejection) => Err(RewearError::Validation(rejection.body_text())),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RegisterRequest {
    full_name: Option<String>,
    email: Option<String>,
    password: Option<String>,
    confirm_password: Option<String>,
    terms: Option<bool>,
}

async fn register(
    State(state): State<AppState>,
    AppJson(req): AppJson<RegisterRequest>,
) -> Result<impl IntoResponse> {
    let full_name = req.full_name.unwrap_or_default();
    let email = req.email.unwrap_or_default();
    let password = req.password.unwrap_or_default();
    let confirm_password = req.confirm_password.unwrap_or_default();
    let terms = req.terms.unwrap_or(false);

    if full_name.is_empty()
        || email.is_empty()
        || password.is_empty()
        || confirm_password.is_empty()
        || !terms
    {
        return Err(RewearError::Validation(
            "All fields are required.".to_string(),
        ));
    }
    if password != confirm_password {
        return Err(RewearError::Validation(
            "Passwords do not match.".to_string(),
        ));
    }
    if state.db.email_taken(&email).await? {
        return Err(RewearError::Validation(
            "Email already registered.".to_string(),
        ));
    }

    let user = User::new(email, full_name, auth::hash_password(&password)?);
    state.db.create_user(&user).await?;
    let (access, refresh) = state.tokens.issue_pair(&user)?;

    tracing::info!(user_id = %user.id, "registered new user");

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({
            "refresh": refresh,
            "access": access,
            "user": UserSummary::from(&user),
        })),
    ))
}

#[derive(Debug, Deserialize)]
struct LoginRequest {
    email: String,
    password: String,
}

async fn login(
    State(state): State<AppState>,
    AppJson(req): AppJson<LoginRequest>,
) -> Result<Json<serde_json::Value>> {
    let user = state
        .db
        .get_user_by_email(&req.email)
        .await?
        .ok_or_else(|| RewearError::Auth("Invalid email or password.".to_string()))?;

    if !auth::verify_password(&req.password, &user.password_hash)? {
        return Err(RewearError::Auth("Invalid email or password.".to_string()));
    }

    let (access, refresh) = state.tokens.issue_pair(&user)?;

    Ok(Json(serde_json::json!({
        "refresh": refresh,
        "access": access,
        "user": UserSummary::from(&user),
    })))
}

async fn user_detail(AuthUser(user): AuthUser) -> Json<UserSummary> {
    Json(UserSummary::from(&user))
}

#[derive(Debug, Deserialize)]
struct RefreshRequest {
    refresh: String,
}

async fn refresh_token(
    State(state): State<AppState>,
    AppJson(req): AppJson<RefreshRequest>,
) -> Result<Json<serde_json::Value>> {
    let claims = state.tokens.validate(&req.refresh, REFRESH_TOKEN)?;
    let user_id = claims
        .user_id()
        .map_err(|_| RewearError::Auth("Malformed token subject".to_string()))?;
    let user = state
        .db
        .get_user(user_id)
        .await?
        .ok_or_else(|| RewearError::Auth("Unknown user".to_string()))?;

    let access = state.tokens.issue_access(&user)?;
    Ok(Json(serde_json::json!({ "access": access })))
}

#[derive(Debug, Default, Deserialize)]
struct BrowseParams {
    search: Option<String>,
    category: Option<String>,
    size: Option<String>,
    condition: Option<String>,
    brand: Option<String>,
}

impl BrowseParams {
    /// Query-string conventions of the storefront: empty values and the
    /// "All ..." placeholders mean no constraint; size and condition are
    /// comma-separated lists.
    fn into_filter(self) -> ItemFilter {
        let mut filter = ItemFilter::default();
        if let Some(search) = self.search {
            if !search.is_empty() {
                filter.search = Some(search);
            }
        }
        if let Some(category) = self.category {
            if !category.is_empty() && category != "All Categories" {
                filter.category = Some(category);
            }
        }
        if let Some(size) = self.size {
            filter.sizes = split_csv(&size);
        }
        if let Some(condition) = self.condition {
            filter.conditions = split_csv(&condition);
        }
        if let Some(brand) = self.brand {
            if !brand.is_empty() && brand != "All Brands" {
                filter.brand = Some(brand);
            }
        }
        filter
    }
}

fn split_csv(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(str::to_string)
        .collect()
}

async fn browse_items(
    State(state): State<AppState>,
    Query(params): Query<BrowseParams>,
) -> Result<Json<Vec<ItemView>>> {
    let items = state.db.list_items(&params.into_filter()).await?;
    Ok(Json(assemble_items(&state, items).await?))
}

async fn create_item(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    mut multipart: Multipart,
) -> Result<impl IntoResponse> {
    let mut fields: HashMap<String, String> = HashMap::new();
    let mut uploads: Vec<(String, Vec<u8>)> = Vec::new();

    while let Some(field) = multipart.next_field().await.map_err(bad_multipart)? {
        let name = field.name().unwrap_or_default().to_string();
        if name == "images" {
            let file_name = field.file_name().unwrap_or("upload").to_string();
            let bytes = field.bytes().await.map_err(bad_multipart)?;
            uploads.push((file_name, bytes.to_vec()));
        } else {
            let value = field.text().await.map_err(bad_multipart)?;
            fields.insert(name, value);
        }
    }

    let draft = ItemDraft {
        title: fields.remove("title").unwrap_or_default(),
        description: fields.remove("description").unwrap_or_default(),
        category: fields.remove("category").unwrap_or_default().parse()?,
        brand: fields.remove("brand").unwrap_or_default(),
        size: fields.remove("size").unwrap_or_default(),
        color: fields.remove("color").unwrap_or_default(),
        condition: fields.remove("condition").unwrap_or_default().parse()?,
        tags: fields.remove("tags").unwrap_or_default(),
    };
    draft.validate()?;

    // Image bytes land on disk first; the item row and its image rows then
    // commit together or not at all.
    let item = Item::new(user.id, draft);
    let mut images = Vec::new();
    for (file_name, bytes) in &uploads {
        let stored = state.media.save(file_name, bytes).await?;
        images.push(ItemImage::new(item.id, stored));
    }
    state.db.create_item_with_images(&item, &images).await?;

    tracing::info!(item_id = %item.id, owner = %item.owner_id, "listed new item");

    let view = ItemView::assemble(item, images, &state.media, &state.public_base);
    Ok((StatusCode::CREATED, Json(view)))
}

fn bad_multipart(err: MultipartError) -> RewearError {
    RewearError::Validation(format!("Malformed multipart body: {}", err))
}

async fn public_item_detail(
    State(state): State<AppState>,
    Path(id): Path<ItemId>,
) -> Result<Json<ItemView>> {
    let item = state
        .db
        .get_item(id)
        .await?
        .ok_or(RewearError::NotFound("Item"))?;
    let images = state.db.get_images_for_item(item.id).await?;
    Ok(Json(ItemView::assemble(
        item,
        images,
        &state.media,
        &state.public_base,
    )))
}

async fn my_items(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> Result<Json<Vec<ItemView>>> {
    let items = state.db.list_items_by_owner(user.id).await?;
    Ok(Json(assemble_items(&state, items).await?))
}

async fn my_item_detail(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<ItemId>,
) -> Result<Json<ItemView>> {
    let item = state
        .db
        .get_item_owned_by(id, user.id)
        .await?
        .ok_or(RewearError::NotFound("Item"))?;
    let images = state.db.get_images_for_item(item.id).await?;
    Ok(Json(ItemView::assemble(
        item,
        images,
        &state.media,
        &state.public_base,
    )))
}

async fn available_items(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> Result<Json<Vec<ItemView>>> {
    let items = state.db.list_available_items(user.id).await?;
    Ok(Json(assemble_items(&state, items).await?))
}

async fn list_swaps(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> Result<Json<SwapListEnvelope>> {
    let swaps = state.db.list_swaps_for_user(user.id).await?;
    let unread_count = state.db.unread_count_for(user.id).await?;
    let swaps = assemble_swaps(&state, swaps).await?;
    Ok(Json(SwapListEnvelope { swaps, unread_count }))
}

#[derive(Debug, Deserialize)]
struct CreateSwapRequest {
    proposer_item: ItemId,
    receiver_item: ItemId,
}

async fn create_swap(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    AppJson(req): AppJson<CreateSwapRequest>,
) -> Result<impl IntoResponse> {
    let proposer_item = state
        .db
        .get_item(req.proposer_item)
        .await?
        .ok_or(RewearError::NotFound("Item"))?;
    let receiver_item = state
        .db
        .get_item(req.receiver_item)
        .await?
        .ok_or(RewearError::NotFound("Item"))?;

    if proposer_item.owner_id != user.id {
        return Err(RewearError::Validation(
            "You can only offer an item you own.".to_string(),
        ));
    }
    if receiver_item.owner_id == user.id {
        return Err(RewearError::Validation(
            "You cannot propose a swap with yourself.".to_string(),
        ));
    }

    let swap = Swap::new(
        user.id,
        receiver_item.owner_id,
        proposer_item.id,
        receiver_item.id,
    );
    state.db.create_swap(&swap).await?;

    tracing::info!(
        swap_id = %swap.id,
        proposer = %swap.proposer_id,
        receiver = %swap.receiver_id,
        "created swap proposal"
    );

    let proposer_images = state.db.get_images_for_item(proposer_item.id).await?;
    let receiver_images = state.db.get_images_for_item(receiver_item.id).await?;
    let view = SwapView::assemble(
        swap,
        ItemView::assemble(proposer_item, proposer_images, &state.media, &state.public_base),
        ItemView::assemble(receiver_item, receiver_images, &state.media, &state.public_base),
    );
    Ok((StatusCode::CREATED, Json(view)))
}

#[derive(Debug, Deserialize)]
struct UpdateSwapRequest {
    status: Option<String>,
    is_read: Option<bool>,
}

async fn update_swap(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<SwapId>,
    AppJson(req): AppJson<UpdateSwapRequest>,
) -> Result<Json<SwapView>> {
    let mut swap = state
        .db
        .get_swap_for_user(id, user.id)
        .await?
        .ok_or(RewearError::NotFound("Swap"))?;
    let role = swap
        .role_of(user.id)
        .ok_or(RewearError::NotFound("Swap"))?;

    if let Some(raw) = &req.status {
        let target: SwapStatus = raw.parse()?;
        swap.transition(target, role)?;
        tracing::info!(swap_id = %swap.id, status = %target, "swap status changed");
    }
    if let Some(read) = req.is_read {
        swap.set_read(read, role)?;
    }
    state.db.update_swap(&swap).await?;

    let mut views = assemble_swaps(&state, vec![swap]).await?;
    views.pop().map(Json).ok_or(RewearError::NotFound("Swap"))
}

async fn delete_swap(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<SwapId>,
) -> Result<StatusCode> {
    if state.db.delete_swap(id, user.id).await? {
        tracing::info!(swap_id = %id, "swap deleted");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(RewearError::NotFound("Swap"))
    }
}

async fn list_messages(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<SwapId>,
) -> Result<Json<Vec<MessageView>>> {
    let swap = state
        .db
        .get_swap_for_user(id, user.id)
        .await?
        .ok_or(RewearError::NotFound("Swap"))?;

    let messages = state.db.list_messages_for_swap(swap.id).await?;
    Ok(Json(
        messages
            .into_iter()
            .map(|(message, sender_name)| MessageView::assemble(message, sender_name))
            .collect(),
    ))
}

#[derive(Debug, Deserialize)]
struct CreateMessageRequest {
    content: String,
}

async fn create_message(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<SwapId>,
    AppJson(req): AppJson<CreateMessageRequest>,
) -> Result<impl IntoResponse> {
    let swap = state
        .db
        .get_swap_for_user(id, user.id)
        .await?
        .ok_or(RewearError::NotFound("Swap"))?;

    // Sender and swap come from the token and the path, never the body.
    let message = SwapMessage::new(swap.id, user.id, req.content);
    message.validate()?;
    state.db.create_swap_message(&message).await?;

    Ok((
        StatusCode::CREATED,
        Json(MessageView::assemble(message, user.full_name)),
    ))
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "healthy", "service": "rewear" }))
}

async fn assemble_items(state: &AppState, items: Vec<Item>) -> Result<Vec<ItemView>> {
    let ids: Vec<ItemId> = items.iter().map(|item| item.id).collect();
    let mut images = state.db.get_images_for_items(&ids).await?;

    Ok(items
        .into_iter()
        .map(|item| {
            let item_images = images.remove(&item.id).unwrap_or_default();
            ItemView::assemble(item, item_images, &state.media, &state.public_base)
        })
        .collect())
}

async fn assemble_swaps(state: &AppState, swaps: Vec<Swap>) -> Result<Vec<SwapView>> {
    let mut item_ids = Vec::new();
    for swap in &swaps {
        item_ids.push(swap.proposer_item_id);
        item_ids.push(swap.receiver_item_id);
    }
    item_ids.sort_unstable();
    item_ids.dedup();

    let items = state.db.get_items_by_ids(&item_ids).await?;
    let images = state.db.get_images_for_items(&item_ids).await?;

    let mut views = Vec::with_capacity(swaps.len());
    for swap in swaps {
        let proposer_item = embedded_item(state, swap.proposer_item_id, &items, &images)?;
        let receiver_item = embedded_item(state, swap.receiver_item_id, &items, &images)?;
        views.push(SwapView::assemble(swap, proposer_item, receiver_item));
    }
    Ok(views)
}

fn embedded_item(
    state: &AppState,
    item_id: ItemId,
    items: &HashMap<ItemId, Item>,
    images: &HashMap<ItemId, Vec<ItemImage>>,
) -> Result<ItemView> {
    let item = items
        .get(&item_id)
        .cloned()
        .ok_or(RewearError::NotFound("Item"))?;
    let item_images = images.get(&item_id).cloned().unwrap_or_default();
    Ok(ItemView::assemble(
        item,
        item_images,
        &state.media,
        &state.public_base,
    ))
}
