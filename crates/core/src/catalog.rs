//! Store products.

use serde::{Deserialize, Serialize};

use crate::types::{Price, ProductId};

/// A merchandise item offered in the store.
///
/// Field names follow the catalog documents served by the backend
/// (`img_src` in particular), so the record deserializes without renames.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub cost: Price,
    #[serde(default)]
    pub img_src: Option<String>,
}

/// A full catalog snapshot, in the order the backend returned it.
pub type CatalogSnapshot = Vec<Product>;
