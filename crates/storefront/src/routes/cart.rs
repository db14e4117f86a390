//! Cart route handlers.
//!
//! The cart lives in the visitor's session. Mutations use HTMX-style
//! fragments and send `HX-Trigger: cart-updated` so the badge refreshes.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Query, State},
    response::{AppendHeaders, IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use celesta_core::ProductId;
use celesta_core::cart::{Cart, CartLine};

use crate::error::{AppError, Result};
use crate::filters;
use crate::middleware::{CspNonce, RequireAuth};
use crate::models::{load, session_keys};
use crate::routes::{Nav, bearer_or_sign_in, with_notice};
use crate::state::AppState;

/// One cart line for templates.
#[derive(Clone)]
pub struct CartItemView {
    pub product_id: String,
    pub name: String,
    pub image: Option<String>,
    pub quantity: u32,
    pub price: String,
    pub line_price: String,
}

impl From<&CartLine> for CartItemView {
    fn from(line: &CartLine) -> Self {
        Self {
            product_id: line.product_id.to_string(),
            name: line.name.clone(),
            image: line.image.clone(),
            quantity: line.quantity,
            price: line.unit_cost.to_string(),
            line_price: line.line_total().to_string(),
        }
    }
}

/// Cart display data for templates.
#[derive(Clone)]
pub struct CartView {
    pub items: Vec<CartItemView>,
    pub total: String,
    pub item_count: u32,
}

impl From<&Cart> for CartView {
    fn from(cart: &Cart) -> Self {
        Self {
            items: cart.lines().iter().map(CartItemView::from).collect(),
            total: cart.total().to_string(),
            item_count: cart.count(),
        }
    }
}

// =============================================================================
// Session Helpers
// =============================================================================

async fn get_cart(session: &Session) -> Cart {
    load(session, session_keys::CART).await
}

async fn save_cart(session: &Session, cart: &Cart) -> Result<()> {
    session.insert(session_keys::CART, cart).await?;
    Ok(())
}

/// Form naming one product.
#[derive(Debug, Deserialize)]
pub struct ProductForm {
    pub product_id: String,
}

/// Set-quantity form. Zero or negative removes the line.
#[derive(Debug, Deserialize)]
pub struct UpdateCartForm {
    pub product_id: String,
    pub quantity: i64,
}

/// Query parameters for cart page notices.
#[derive(Debug, Deserialize)]
pub struct CartQuery {
    pub error: Option<String>,
}

/// Cart page template.
#[derive(Template, WebTemplate)]
#[template(path = "cart/show.html")]
pub struct CartShowTemplate {
    pub nav: Nav,
    pub cart: CartView,
    pub error: Option<String>,
    pub nonce: String,
}

/// Cart items fragment template (for HTMX).
#[derive(Template, WebTemplate)]
#[template(path = "partials/cart_items.html")]
pub struct CartItemsTemplate {
    pub cart: CartView,
}

/// Cart count badge fragment template (for HTMX).
#[derive(Template, WebTemplate)]
#[template(path = "partials/cart_count.html")]
pub struct CartCountTemplate {
    pub count: u32,
}

/// Quantity stepper for one store product (for HTMX).
#[derive(Template, WebTemplate)]
#[template(path = "partials/quantity_control.html")]
pub struct QuantityControlTemplate {
    pub product_id: String,
    pub quantity: u32,
}

/// Display cart page.
#[instrument(skip(session, nonce))]
pub async fn show(
    session: Session,
    Query(query): Query<CartQuery>,
    CspNonce(nonce): CspNonce,
) -> impl IntoResponse {
    let cart = get_cart(&session).await;

    CartShowTemplate {
        nav: Nav::load(&session).await,
        cart: CartView::from(&cart),
        error: query.error,
        nonce,
    }
}

/// Add one unit of a product (HTMX).
///
/// Unknown products are rejected; the cart copies the catalog's name, cost
/// and image at the time of the first add.
#[instrument(skip(state, session))]
pub async fn add(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<ProductForm>,
) -> Result<Response> {
    let id = ProductId::new(form.product_id);
    let product = state
        .catalog()
        .find(&id)
        .ok_or_else(|| AppError::NotFound(format!("Product {id}")))?;

    let mut cart = get_cart(&session).await;
    cart.add(&product);
    save_cart(&session, &cart).await?;

    Ok((
        AppendHeaders([("HX-Trigger", "cart-updated")]),
        QuantityControlTemplate {
            product_id: id.to_string(),
            quantity: cart.quantity_of(&id),
        },
    )
        .into_response())
}

/// Remove one unit of a product (HTMX). Absent products are a no-op.
#[instrument(skip(session))]
pub async fn remove(session: Session, Form(form): Form<ProductForm>) -> Result<Response> {
    let id = ProductId::new(form.product_id);

    let mut cart = get_cart(&session).await;
    cart.remove(&id);
    save_cart(&session, &cart).await?;

    Ok((
        AppendHeaders([("HX-Trigger", "cart-updated")]),
        QuantityControlTemplate {
            product_id: id.to_string(),
            quantity: cart.quantity_of(&id),
        },
    )
        .into_response())
}

/// Set a line's quantity from the cart page (HTMX).
#[instrument(skip(session))]
pub async fn update(session: Session, Form(form): Form<UpdateCartForm>) -> Result<Response> {
    let id = ProductId::new(form.product_id);

    let mut cart = get_cart(&session).await;
    cart.set_quantity(&id, form.quantity);
    save_cart(&session, &cart).await?;

    Ok((
        AppendHeaders([("HX-Trigger", "cart-updated")]),
        CartItemsTemplate {
            cart: CartView::from(&cart),
        },
    )
        .into_response())
}

/// Get cart count badge (HTMX).
#[instrument(skip(session))]
pub async fn count(session: Session) -> impl IntoResponse {
    CartCountTemplate {
        count: get_cart(&session).await.count(),
    }
}

/// Place the order and redirect to the payment page.
///
/// The cart is emptied only once the backend returned a payment link.
#[instrument(skip_all, fields(user = %user.user))]
pub async fn checkout(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
) -> Result<Response> {
    let mut cart = get_cart(&session).await;
    if cart.is_empty() {
        return Ok(Redirect::to("/cart").into_response());
    }

    let token = match bearer_or_sign_in(&state, &session, &user).await {
        Ok(token) => token,
        Err(response) => return Ok(response),
    };

    match state.backend().checkout(&token, cart.lines().to_vec()).await {
        Ok(url) => {
            cart.clear();
            save_cart(&session, &cart).await?;
            tracing::info!(user = %user.user, "Checkout started");
            Ok(Redirect::to(&url).into_response())
        }
        Err(e) => {
            tracing::error!(error = %e, "Checkout failed");
            Ok(Redirect::to(&with_notice(
                "/cart",
                "error",
                "Checkout failed. Please try again.",
            ))
            .into_response())
        }
    }
}
