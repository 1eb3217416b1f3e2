//! Storefront HTTP routes

use axum::{
    Json, Router,
    body::Bytes,
    extract::{Path, Query, State},
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::{delete, get, patch, post},
};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Bearer},
};
use serde::Deserialize;
use serde_json::json;
use tracing::{error, info};

use crate::{
    catalog::{CatalogFilter, CatalogQuery},
    checkout::CheckoutRequest,
    error::{ShopError, ShopResult},
    middleware::{load_session, public_only, require_admin, require_user},
    models::{
        LoginCredentials, NewProduct, OrderStatus, RegisterRequest, UpdateProduct,
        string_or_number,
    },
    session::Session,
    state::AppState,
};

/// Body of the add-to-cart and add-to-wishlist calls
#[derive(Debug, Deserialize)]
pub struct ProductRef {
    #[serde(deserialize_with = "string_or_number")]
    pub product_id: String,
}

#[derive(Debug, Deserialize)]
pub struct QuantityUpdate {
    pub quantity: i64,
}

/// Omitting `blocked` flips the current flag
#[derive(Debug, Default, Deserialize)]
pub struct BlockUpdate {
    #[serde(default)]
    pub blocked: Option<bool>,
}

impl BlockUpdate {
    /// An empty body is a plain toggle; anything else must be valid JSON
    pub fn from_body(body: &[u8]) -> ShopResult<Self> {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self::default());
        }
        serde_json::from_slice(body)
            .map_err(|e| ShopError::Validation(format!("Invalid block update: {}", e)))
    }
}

#[derive(Debug, Deserialize)]
pub struct StatusUpdate {
    pub status: OrderStatus,
}

/// `?confirm=true` on destructive admin calls
#[derive(Debug, Default, Deserialize)]
pub struct Confirmation {
    #[serde(default)]
    pub confirm: bool,
}

/// Create the router for the storefront service
pub fn create_router(state: AppState) -> Router {
    let public_only_routes = Router::new()
        .route("/auth/login", post(login))
        .route("/auth/register", post(register))
        .route_layer(middleware::from_fn(public_only));

    let protected_routes = Router::new()
        .route("/me", get(me))
        .route("/cart", get(get_cart).delete(clear_cart))
        .route("/cart/items", post(add_to_cart))
        .route(
            "/cart/items/:product_id",
            patch(update_cart_quantity).delete(remove_from_cart),
        )
        .route("/wishlist", get(get_wishlist))
        .route("/wishlist/items", post(add_to_wishlist))
        .route("/wishlist/items/:product_id", delete(remove_from_wishlist))
        .route("/checkout", post(checkout))
        .route("/orders", get(order_history))
        .route_layer(middleware::from_fn(require_user));

    let admin_routes = Router::new()
        .route("/admin/dashboard", get(dashboard))
        .route("/admin/reports", get(reports))
        .route("/admin/users", get(list_users))
        .route("/admin/users/:id", get(user_details).delete(delete_user))
        .route("/admin/users/:id/block", patch(set_blocked))
        .route(
            "/admin/users/:id/orders/:order_id/status",
            patch(update_order_status),
        )
        .route(
            "/admin/products",
            get(admin_list_products).post(create_product),
        )
        .route(
            "/admin/products/:id",
            patch(update_product).delete(delete_product),
        )
        .route("/admin/orders", get(all_orders))
        .route_layer(middleware::from_fn(require_admin));

    Router::new()
        .route("/health", get(health_check))
        .route("/products", get(list_products))
        .route("/products/featured", get(featured_products))
        .route("/products/new-arrivals", get(new_arrivals))
        .route("/products/:id", get(get_product))
        .route("/auth/logout", post(logout))
        .merge(public_only_routes)
        .merge(protected_routes)
        .merge(admin_routes)
        .layer(middleware::from_fn_with_state(state.clone(), load_session))
        .with_state(state)
}

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let cache = match state.cache.health_check().await {
        Ok(true) => "ok",
        Ok(false) => "degraded",
        Err(e) => {
            error!("Session cache health check failed: {}", e);
            "unavailable"
        }
    };

    Json(json!({
        "status": "ok",
        "service": "storefront",
        "session_cache": cache,
    }))
}

// Catalog

pub async fn list_products(
    State(state): State<AppState>,
    Query(query): Query<CatalogQuery>,
) -> ShopResult<impl IntoResponse> {
    let filter = CatalogFilter::try_from(query)?;
    Ok(Json(state.catalog.search(&filter).await?))
}

pub async fn featured_products(State(state): State<AppState>) -> ShopResult<impl IntoResponse> {
    Ok(Json(state.catalog.featured().await?))
}

pub async fn new_arrivals(State(state): State<AppState>) -> ShopResult<impl IntoResponse> {
    Ok(Json(state.catalog.new_arrivals().await?))
}

pub async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ShopResult<impl IntoResponse> {
    Ok(Json(state.catalog.product(&id).await?))
}

// Authentication

pub async fn login(
    State(state): State<AppState>,
    Json(credentials): Json<LoginCredentials>,
) -> ShopResult<impl IntoResponse> {
    let session = state.sessions.login(&credentials).await?;
    Ok(Json(session))
}

pub async fn register(
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> ShopResult<impl IntoResponse> {
    let profile = state.sessions.register(&request).await?;
    Ok((StatusCode::CREATED, Json(profile)))
}

/// Drop the session behind the presented token
pub async fn logout(
    State(state): State<AppState>,
    TypedHeader(Authorization(bearer)): TypedHeader<Authorization<Bearer>>,
) -> ShopResult<impl IntoResponse> {
    state.sessions.logout(bearer.token()).await?;
    info!("Session closed");
    Ok(StatusCode::NO_CONTENT)
}

pub async fn me(session: Session) -> impl IntoResponse {
    Json(session.user)
}

// Cart and wishlist

pub async fn get_cart(
    State(state): State<AppState>,
    session: Session,
) -> ShopResult<impl IntoResponse> {
    Ok(Json(state.carts.cart(&session.user.id).await?))
}

pub async fn add_to_cart(
    State(state): State<AppState>,
    session: Session,
    Json(body): Json<ProductRef>,
) -> ShopResult<impl IntoResponse> {
    Ok(Json(
        state
            .carts
            .add_to_cart(&session.user.id, &body.product_id)
            .await?,
    ))
}

pub async fn update_cart_quantity(
    State(state): State<AppState>,
    session: Session,
    Path(product_id): Path<String>,
    Json(body): Json<QuantityUpdate>,
) -> ShopResult<impl IntoResponse> {
    Ok(Json(
        state
            .carts
            .update_quantity(&session.user.id, &product_id, body.quantity)
            .await?,
    ))
}

pub async fn remove_from_cart(
    State(state): State<AppState>,
    session: Session,
    Path(product_id): Path<String>,
) -> ShopResult<impl IntoResponse> {
    Ok(Json(
        state
            .carts
            .remove_from_cart(&session.user.id, &product_id)
            .await?,
    ))
}

pub async fn clear_cart(
    State(state): State<AppState>,
    session: Session,
) -> ShopResult<impl IntoResponse> {
    Ok(Json(state.carts.clear_cart(&session.user.id).await?))
}

pub async fn get_wishlist(
    State(state): State<AppState>,
    session: Session,
) -> ShopResult<impl IntoResponse> {
    Ok(Json(state.carts.wishlist(&session.user.id).await?))
}

pub async fn add_to_wishlist(
    State(state): State<AppState>,
    session: Session,
    Json(body): Json<ProductRef>,
) -> ShopResult<impl IntoResponse> {
    Ok(Json(
        state
            .carts
            .add_to_wishlist(&session.user.id, &body.product_id)
            .await?,
    ))
}

pub async fn remove_from_wishlist(
    State(state): State<AppState>,
    session: Session,
    Path(product_id): Path<String>,
) -> ShopResult<impl IntoResponse> {
    Ok(Json(
        state
            .carts
            .remove_from_wishlist(&session.user.id, &product_id)
            .await?,
    ))
}

// Checkout and orders

pub async fn checkout(
    State(state): State<AppState>,
    session: Session,
    Json(request): Json<CheckoutRequest>,
) -> ShopResult<impl IntoResponse> {
    let order = state
        .checkout
        .place_order(&session.user.id, &request)
        .await?;
    Ok((StatusCode::CREATED, Json(order)))
}

pub async fn order_history(
    State(state): State<AppState>,
    session: Session,
) -> ShopResult<impl IntoResponse> {
    Ok(Json(state.checkout.orders(&session.user.id).await?))
}

// Admin

pub async fn dashboard(State(state): State<AppState>) -> ShopResult<impl IntoResponse> {
    Ok(Json(state.admin.dashboard().await?))
}

pub async fn reports(State(state): State<AppState>) -> ShopResult<impl IntoResponse> {
    Ok(Json(state.admin.reports().await?))
}

pub async fn list_users(State(state): State<AppState>) -> ShopResult<impl IntoResponse> {
    Ok(Json(state.admin.list_users().await?))
}

pub async fn user_details(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ShopResult<impl IntoResponse> {
    Ok(Json(state.admin.user_details(&id).await?))
}

pub async fn set_blocked(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<String>,
    body: Bytes,
) -> ShopResult<impl IntoResponse> {
    let update = BlockUpdate::from_body(&body)?;
    let profile = state.admin.set_blocked(&id, update.blocked).await?;
    info!(
        "Admin {} set block flag of user {} to {}",
        session.user.id, id, profile.is_blocked
    );
    Ok(Json(profile))
}

pub async fn delete_user(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<String>,
    Query(confirmation): Query<Confirmation>,
) -> ShopResult<impl IntoResponse> {
    state.admin.delete_user(&id, confirmation.confirm).await?;
    info!("Admin {} deleted user {}", session.user.id, id);
    Ok(StatusCode::NO_CONTENT)
}

pub async fn admin_list_products(State(state): State<AppState>) -> ShopResult<impl IntoResponse> {
    Ok(Json(state.admin.list_products().await?))
}

pub async fn create_product(
    State(state): State<AppState>,
    Json(product): Json<NewProduct>,
) -> ShopResult<impl IntoResponse> {
    let created = state.admin.create_product(&product).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn update_product(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(changes): Json<UpdateProduct>,
) -> ShopResult<impl IntoResponse> {
    Ok(Json(state.admin.update_product(&id, &changes).await?))
}

pub async fn delete_product(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(confirmation): Query<Confirmation>,
) -> ShopResult<impl IntoResponse> {
    state.admin.delete_product(&id, confirmation.confirm).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn all_orders(State(state): State<AppState>) -> ShopResult<impl IntoResponse> {
    Ok(Json(state.admin.all_orders().await?))
}

pub async fn update_order_status(
    State(state): State<AppState>,
    Path((user_id, order_id)): Path<(String, String)>,
    Json(body): Json<StatusUpdate>,
) -> ShopResult<impl IntoResponse> {
    Ok(Json(
        state
            .admin
            .update_order_status(&user_id, &order_id, body.status)
            .await?,
    ))
}
