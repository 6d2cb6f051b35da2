//! Target tables mutated by bulk jobs.

use serde::{Deserialize, Serialize};

/// A catalog product; the inventory and pricing handlers mutate this.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    /// Natural key.
    pub sku: String,
    pub name: String,
    pub stock: i64,
    /// Unit price in minor currency units.
    pub price_cents: i64,
}

/// An order; the order-status handler updates it by invoice number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    /// Natural key.
    pub invoice: String,
    pub status: String,
}
