//! Shopping cart.
//!
//! A [`Cart`] is an ordered list of [`CartLine`]s, at most one per product.
//! Count and total are never stored; they are folds over the current lines,
//! so they can't drift from the line set.
//!
//! The cart serializes to JSON so the storefront can keep it in the visitor's
//! session between requests.

use serde::{Deserialize, Serialize};

use crate::catalog::Product;
use crate::types::{Price, ProductId};

/// One product in the cart with its quantity.
///
/// `quantity` is at least 1 for as long as the line exists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    pub product_id: ProductId,
    pub name: String,
    pub unit_cost: Price,
    pub image: Option<String>,
    pub quantity: u32,
}

impl CartLine {
    /// Unit cost times quantity.
    #[must_use]
    pub fn line_total(&self) -> Price {
        self.unit_cost * self.quantity
    }
}

/// The visitor's cart.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    lines: Vec<CartLine>,
}

impl Cart {
    /// An empty cart.
    #[must_use]
    pub const fn new() -> Self {
        Self { lines: Vec::new() }
    }

    /// Add one unit of `product`.
    ///
    /// Increments the existing line, or appends a new line with quantity 1.
    /// The display fields of an existing line are left as they were when the
    /// product was first added.
    pub fn add(&mut self, product: &Product) {
        if let Some(line) = self.line_mut(&product.id) {
            line.quantity = line.quantity.saturating_add(1);
            return;
        }

        self.lines.push(CartLine {
            product_id: product.id.clone(),
            name: product.name.clone(),
            unit_cost: product.cost,
            image: product.img_src.clone(),
            quantity: 1,
        });
    }

    /// Remove one unit of `product_id`.
    ///
    /// A line with quantity 1 is deleted. Removing an absent product is a no-op.
    pub fn remove(&mut self, product_id: &ProductId) {
        let Some(pos) = self.position(product_id) else {
            return;
        };

        match self.lines.get_mut(pos) {
            Some(line) if line.quantity > 1 => line.quantity -= 1,
            Some(_) => {
                self.lines.remove(pos);
            }
            None => {}
        }
    }

    /// Set the quantity of an existing line.
    ///
    /// `quantity <= 0` deletes the line. Lines are only ever created through
    /// [`Cart::add`], so setting a quantity for an absent product does nothing.
    pub fn set_quantity(&mut self, product_id: &ProductId, quantity: i64) {
        if quantity <= 0 {
            self.lines.retain(|line| &line.product_id != product_id);
            return;
        }

        if let Some(line) = self.line_mut(product_id) {
            line.quantity = u32::try_from(quantity).unwrap_or(u32::MAX);
        }
    }

    /// Empty the cart. Called once checkout has resolved.
    pub fn clear(&mut self) {
        self.lines.clear();
    }

    /// Quantity of `product_id`, or 0 when it isn't in the cart.
    #[must_use]
    pub fn quantity_of(&self, product_id: &ProductId) -> u32 {
        self.lines
            .iter()
            .find(|line| &line.product_id == product_id)
            .map_or(0, |line| line.quantity)
    }

    /// Sum of all quantities.
    #[must_use]
    pub fn count(&self) -> u32 {
        self.lines
            .iter()
            .fold(0_u32, |acc, line| acc.saturating_add(line.quantity))
    }

    /// Sum of unit cost times quantity over all lines.
    #[must_use]
    pub fn total(&self) -> Price {
        self.lines.iter().map(CartLine::line_total).sum()
    }

    /// Lines in insertion order.
    #[must_use]
    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    fn position(&self, product_id: &ProductId) -> Option<usize> {
        self.lines
            .iter()
            .position(|line| &line.product_id == product_id)
    }

    fn line_mut(&mut self, product_id: &ProductId) -> Option<&mut CartLine> {
        self.lines
            .iter_mut()
            .find(|line| &line.product_id == product_id)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn product(id: &str, cost: u32) -> Product {
        Product {
            id: ProductId::new(id),
            name: format!("Product {id}"),
            cost: Price::from_rupees(cost),
            img_src: None,
        }
    }

    fn assert_derived_consistent(cart: &Cart) {
        let count: u32 = cart.lines().iter().map(|l| l.quantity).sum();
        let total: Price = cart
            .lines()
            .iter()
            .map(|l| l.unit_cost * l.quantity)
            .sum();
        assert_eq!(cart.count(), count);
        assert_eq!(cart.total(), total);
        assert!(cart.lines().iter().all(|l| l.quantity >= 1));
    }

    #[test]
    fn test_add_three_remove_one() {
        let mut cart = Cart::new();
        let p1 = product("p1", 50);

        cart.add(&p1);
        cart.add(&p1);
        cart.add(&p1);
        cart.remove(&p1.id);

        assert_eq!(cart.quantity_of(&p1.id), 2);
        assert_eq!(cart.total(), Price::from_rupees(100));
        assert_eq!(cart.count(), 2);
        assert_eq!(cart.lines().len(), 1);
    }

    #[test]
    fn test_remove_last_unit_deletes_line() {
        let mut cart = Cart::new();
        let p = product("p", 10);
        cart.add(&p);
        cart.remove(&p.id);

        assert!(cart.is_empty());
        assert_eq!(cart.quantity_of(&p.id), 0);
    }

    #[test]
    fn test_remove_absent_is_noop() {
        let mut cart = Cart::new();
        cart.add(&product("a", 10));
        let before = cart.clone();

        cart.remove(&ProductId::new("missing"));

        assert_eq!(cart, before);
    }

    #[test]
    fn test_set_quantity() {
        let mut cart = Cart::new();
        let a = product("a", 20);
        cart.add(&a);

        cart.set_quantity(&a.id, 5);
        assert_eq!(cart.quantity_of(&a.id), 5);
        assert_eq!(cart.total(), Price::from_rupees(100));

        cart.set_quantity(&a.id, 0);
        assert!(cart.is_empty());
    }

    #[test]
    fn test_set_quantity_negative_deletes() {
        let mut cart = Cart::new();
        let a = product("a", 20);
        cart.add(&a);
        cart.set_quantity(&a.id, -3);
        assert!(cart.is_empty());
    }

    #[test]
    fn test_set_quantity_does_not_create_lines() {
        let mut cart = Cart::new();
        cart.set_quantity(&ProductId::new("ghost"), 4);
        assert!(cart.is_empty());
    }

    #[test]
    fn test_lines_keep_insertion_order() {
        let mut cart = Cart::new();
        cart.add(&product("b", 1));
        cart.add(&product("a", 1));
        cart.add(&product("b", 1));

        let ids: Vec<&str> = cart.lines().iter().map(|l| l.product_id.as_str()).collect();
        assert_eq!(ids, ["b", "a"]);
    }

    #[test]
    fn test_derived_values_after_every_step() {
        let a = product("a", 35);
        let b = product("b", 120);
        let c = product("c", 0);
        let mut cart = Cart::new();

        let steps: [(bool, &Product); 9] = [
            (true, &a),
            (true, &b),
            (true, &a),
            (false, &c),
            (true, &c),
            (false, &a),
            (false, &b),
            (true, &b),
            (false, &a),
        ];

        for (is_add, p) in steps {
            if is_add {
                cart.add(p);
            } else {
                cart.remove(&p.id);
            }
            assert_derived_consistent(&cart);
        }

        assert_eq!(cart.total(), Price::from_rupees(120));
        assert_eq!(cart.count(), 2);
    }

    #[test]
    fn test_clear() {
        let mut cart = Cart::new();
        cart.add(&product("a", 10));
        cart.add(&product("b", 10));
        cart.clear();
        assert!(cart.is_empty());
        assert_eq!(cart.total(), Price::ZERO);
    }

    #[test]
    fn test_session_roundtrip() {
        let mut cart = Cart::new();
        cart.add(&product("a", 10));
        let value = serde_json::to_value(&cart).unwrap();
        let restored: Cart = serde_json::from_value(value).unwrap();
        assert_eq!(restored, cart);
    }
}
