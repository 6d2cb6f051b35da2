//! Per-row handlers, selected by a job's operation type.
//!
//! Each handler performs a targeted, idempotent-by-natural-key mutation:
//! inventory upserts by SKU (insert allowed for unknown SKUs), pricing
//! updates by SKU only, order status updates by invoice number. Rows that
//! change nothing succeed without producing a diff.

use async_trait::async_trait;
use courier_common::{audit::RowDiff, catalog::Product, job::OperationType};
use courier_store::{Store, StoreError};
use thiserror::Error;

use crate::PayloadRecord;

/// A handler failure, split by blast radius.
#[derive(Debug, Error)]
pub enum HandlerError {
    /// This row is bad; the job continues.
    #[error("{0}")]
    Row(String),

    /// The store failed; the whole job run must stop.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<String> for HandlerError {
    fn from(message: String) -> Self {
        Self::Row(message)
    }
}

/// The change a row applied, for the audit trail.
#[derive(Debug, Clone)]
pub struct RowChange {
    /// Natural key of the changed row.
    pub id: String,
    pub diffs: Vec<RowDiff>,
}

/// A type-specific row mutation.
#[async_trait]
pub trait RowHandler: Send + Sync {
    /// Table name recorded in the operation audit.
    fn table(&self) -> &'static str;

    /// Apply one row. `Ok(None)` means the row was valid but changed
    /// nothing.
    ///
    /// # Errors
    /// [`HandlerError::Row`] for bad rows, [`HandlerError::Store`] for
    /// store failures.
    async fn apply(
        &self,
        store: &dyn Store,
        record: &PayloadRecord,
    ) -> Result<Option<RowChange>, HandlerError>;
}

/// Select the handler for an operation type.
#[must_use]
pub fn handler_for(operation_type: OperationType) -> Box<dyn RowHandler> {
    match operation_type {
        OperationType::Inventory => Box::new(InventoryHandler),
        OperationType::Pricing => Box::new(PricingHandler),
        OperationType::OrderStatus => Box::new(OrderStatusHandler),
    }
}

/// Stock-level upserts: `sku, stock[, name]`.
struct InventoryHandler;

#[async_trait]
impl RowHandler for InventoryHandler {
    fn table(&self) -> &'static str {
        "products"
    }

    async fn apply(
        &self,
        store: &dyn Store,
        record: &PayloadRecord,
    ) -> Result<Option<RowChange>, HandlerError> {
        let sku = record.require("sku")?;
        let raw_stock = record.require("stock")?;
        let stock: i64 = raw_stock
            .parse()
            .map_err(|_| format!("invalid stock '{raw_stock}'"))?;

        match store.product(sku).await? {
            Some(mut product) => {
                let mut diffs = Vec::new();
                if product.stock != stock {
                    diffs.push(RowDiff::new(
                        sku,
                        "stock",
                        Some(product.stock.to_string()),
                        stock.to_string(),
                    ));
                    product.stock = stock;
                }
                if let Some(name) = record.get("name")
                    && product.name != name
                {
                    diffs.push(RowDiff::new(
                        sku,
                        "name",
                        Some(product.name.clone()),
                        name,
                    ));
                    product.name = name.to_string();
                }

                if diffs.is_empty() {
                    return Ok(None);
                }
                store.upsert_product(product).await?;
                Ok(Some(RowChange {
                    id: sku.to_string(),
                    diffs,
                }))
            }
            None => {
                // Unknown SKU: the inventory handler is the one place an
                // insert fallback is allowed.
                let name = record.get("name").unwrap_or(sku).to_string();
                store
                    .upsert_product(Product {
                        sku: sku.to_string(),
                        name: name.clone(),
                        stock,
                        price_cents: 0,
                    })
                    .await?;
                Ok(Some(RowChange {
                    id: sku.to_string(),
                    diffs: vec![
                        RowDiff::new(sku, "stock", None, stock.to_string()),
                        RowDiff::new(sku, "name", None, name),
                    ],
                }))
            }
        }
    }
}

/// Price updates: `sku, price` (decimal major units).
struct PricingHandler;

/// Parse a decimal price into minor units without floating point.
fn parse_price_cents(raw: &str) -> Result<i64, String> {
    let (major, minor) = raw.split_once('.').unwrap_or((raw, ""));
    if minor.len() > 2 || (major.is_empty() && minor.is_empty()) {
        return Err(format!("invalid price '{raw}'"));
    }

    let major: i64 = major.parse().map_err(|_| format!("invalid price '{raw}'"))?;
    let minor: i64 = if minor.is_empty() {
        0
    } else {
        let padded = format!("{minor:0<2}");
        padded.parse().map_err(|_| format!("invalid price '{raw}'"))?
    };
    if major < 0 {
        return Err(format!("negative price '{raw}'"));
    }

    Ok(major * 100 + minor)
}

#[async_trait]
impl RowHandler for PricingHandler {
    fn table(&self) -> &'static str {
        "products"
    }

    async fn apply(
        &self,
        store: &dyn Store,
        record: &PayloadRecord,
    ) -> Result<Option<RowChange>, HandlerError> {
        let sku = record.require("sku")?;
        let price_cents = parse_price_cents(record.require("price")?)?;

        let Some(mut product) = store.product(sku).await? else {
            return Err(HandlerError::Row(format!("unknown sku '{sku}'")));
        };

        if product.price_cents == price_cents {
            return Ok(None);
        }

        let diff = RowDiff::new(
            sku,
            "price_cents",
            Some(product.price_cents.to_string()),
            price_cents.to_string(),
        );
        product.price_cents = price_cents;
        store.upsert_product(product).await?;

        Ok(Some(RowChange {
            id: sku.to_string(),
            diffs: vec![diff],
        }))
    }
}

/// Order status updates: `invoice, status`.
struct OrderStatusHandler;

#[async_trait]
impl RowHandler for OrderStatusHandler {
    fn table(&self) -> &'static str {
        "orders"
    }

    async fn apply(
        &self,
        store: &dyn Store,
        record: &PayloadRecord,
    ) -> Result<Option<RowChange>, HandlerError> {
        let invoice = record.require("invoice")?;
        let status = record.require("status")?;

        let Some(order) = store.order(invoice).await? else {
            return Err(HandlerError::Row(format!("unknown invoice '{invoice}'")));
        };

        if order.status == status {
            return Ok(None);
        }

        if !store.update_order_status(invoice, status).await? {
            return Err(HandlerError::Row(format!("unknown invoice '{invoice}'")));
        }

        Ok(Some(RowChange {
            id: invoice.to_string(),
            diffs: vec![RowDiff::new(
                invoice,
                "status",
                Some(order.status),
                status,
            )],
        }))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn price_parsing() {
        assert_eq!(parse_price_cents("19.99").unwrap(), 1999);
        assert_eq!(parse_price_cents("5").unwrap(), 500);
        assert_eq!(parse_price_cents("5.5").unwrap(), 550);
        assert_eq!(parse_price_cents("0.09").unwrap(), 9);

        assert!(parse_price_cents("1.999").is_err());
        assert!(parse_price_cents("-3").is_err());
        assert!(parse_price_cents("abc").is_err());
        assert!(parse_price_cents(".").is_err());
    }
}
