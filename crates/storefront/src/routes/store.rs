//! Merchandise store page.

use askama::Template;
use askama_web::WebTemplate;
use axum::{extract::State, response::IntoResponse};
use tower_sessions::Session;
use tracing::instrument;

use celesta_core::cart::Cart;
use celesta_core::catalog::Product;

use crate::filters;
use crate::middleware::{CspNonce, RequireAuth};
use crate::models::{load, session_keys};
use crate::routes::Nav;
use crate::state::AppState;

/// Product card data for templates.
#[derive(Clone)]
pub struct ProductView {
    pub id: String,
    pub name: String,
    pub price: String,
    pub image: Option<String>,
    /// Units of this product already in the cart.
    pub quantity: u32,
}

impl ProductView {
    fn new(product: &Product, cart: &Cart) -> Self {
        Self {
            id: product.id.to_string(),
            name: product.name.clone(),
            price: product.cost.to_string(),
            image: product.img_src.clone(),
            quantity: cart.quantity_of(&product.id),
        }
    }
}

/// Store page template.
#[derive(Template, WebTemplate)]
#[template(path = "store.html")]
pub struct StoreTemplate {
    pub nav: Nav,
    /// False until the first catalog snapshot arrives.
    pub ready: bool,
    pub products: Vec<ProductView>,
    pub nonce: String,
}

/// Display the latest catalog with the visitor's quantities.
#[instrument(skip_all, fields(user = %user.user))]
pub async fn index(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
    CspNonce(nonce): CspNonce,
) -> impl IntoResponse {
    let cart: Cart = load(&session, session_keys::CART).await;
    let products = state
        .catalog()
        .products()
        .iter()
        .map(|p| ProductView::new(p, &cart))
        .collect();

    StoreTemplate {
        nav: Nav::load(&session).await,
        ready: state.catalog().is_ready(),
        products,
        nonce,
    }
}
