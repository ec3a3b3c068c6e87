use std::sync::Arc;

use metrics::counter;
use rust_decimal::Decimal;
use sea_orm::{DatabaseConnection, Set, TransactionTrait};
use tracing::{info, instrument, warn};

use crate::{
    dto::{TransactionRequest, TransactionResponse},
    entities::{
        product, supplier,
        transaction::{self, TransactionStatus, TransactionType},
        user,
    },
    errors::ServiceError,
    services::ledger::{LedgerStore, SeaOrmLedgerStore},
};

/// A requested stock movement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StockMovement {
    pub product_id: i32,
    pub supplier_id: Option<i32>,
    pub quantity: i32,
    pub description: Option<String>,
}

impl From<TransactionRequest> for StockMovement {
    fn from(request: TransactionRequest) -> Self {
        Self {
            product_id: request.product_id,
            supplier_id: request.supplier_id,
            quantity: request.quantity,
            description: request.description,
        }
    }
}

/// Everything a committed movement touched.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedTransaction {
    pub transaction: transaction::Model,
    /// Product after the stock change
    pub product: product::Model,
    pub supplier: Option<supplier::Model>,
    pub user: user::Model,
}

impl From<RecordedTransaction> for TransactionResponse {
    fn from(recorded: RecordedTransaction) -> Self {
        TransactionResponse::with_related(
            recorded.transaction,
            Some(recorded.product),
            recorded.supplier,
            Some(recorded.user),
        )
    }
}

/// Validates stock movements, applies them and appends the matching ledger
/// row inside one database transaction.
#[derive(Clone)]
pub struct TransactionService {
    db: Arc<DatabaseConnection>,
    store: Arc<dyn LedgerStore>,
}

impl TransactionService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self::with_store(db, Arc::new(SeaOrmLedgerStore))
    }

    pub fn with_store(db: Arc<DatabaseConnection>, store: Arc<dyn LedgerStore>) -> Self {
        Self { db, store }
    }

    /// Receives stock from a supplier: stock rises by `quantity` and a
    /// completed PURCHASE priced at `price * quantity` is recorded.
    #[instrument(skip(self))]
    pub async fn restock(
        &self,
        actor_id: i32,
        movement: StockMovement,
    ) -> Result<RecordedTransaction, ServiceError> {
        self.record(TransactionType::Purchase, actor_id, movement)
            .await
    }

    /// Sells stock: stock falls by `quantity` and a completed SALE priced at
    /// `price * quantity` is recorded. Overselling is allowed.
    #[instrument(skip(self))]
    pub async fn sell(
        &self,
        actor_id: i32,
        movement: StockMovement,
    ) -> Result<RecordedTransaction, ServiceError> {
        self.record(TransactionType::Sale, actor_id, movement).await
    }

    /// Sends stock back to a supplier: stock falls by `quantity` and a
    /// RETURN_TO_SUPPLIER row with zero value starts out PROCESSING.
    #[instrument(skip(self))]
    pub async fn return_to_supplier(
        &self,
        actor_id: i32,
        movement: StockMovement,
    ) -> Result<RecordedTransaction, ServiceError> {
        self.record(TransactionType::ReturnToSupplier, actor_id, movement)
            .await
    }

    /// Overwrites the status of an existing row. Stock is never touched,
    /// including on cancellation.
    #[instrument(skip(self))]
    pub async fn update_transaction_status(
        &self,
        transaction_id: i32,
        status: TransactionStatus,
    ) -> Result<transaction::Model, ServiceError> {
        let store = self.store.clone();
        let updated = self
            .db
            .transaction::<_, transaction::Model, ServiceError>(move |txn| {
                Box::pin(async move {
                    let current = store
                        .get_transaction(txn, transaction_id)
                        .await?
                        .ok_or_else(|| ServiceError::not_found("Transaction", transaction_id))?;
                    store.save_transaction_status(txn, current, status).await
                })
            })
            .await?;

        info!(
            transaction_id,
            status = ?updated.status,
            "Transaction status updated"
        );
        Ok(updated)
    }

    async fn record(
        &self,
        kind: TransactionType,
        actor_id: i32,
        movement: StockMovement,
    ) -> Result<RecordedTransaction, ServiceError> {
        if movement.quantity <= 0 {
            return Err(ServiceError::ValidationError(format!(
                "Quantity must be greater than zero (got {})",
                movement.quantity
            )));
        }
        let supplier_id = if kind.requires_supplier() {
            Some(movement.supplier_id.ok_or_else(|| {
                ServiceError::ValidationError(format!(
                    "Supplier id is required for {}",
                    kind.as_str()
                ))
            })?)
        } else {
            None
        };

        let store = self.store.clone();
        let recorded = self
            .db
            .transaction::<_, RecordedTransaction, ServiceError>(move |txn| {
                Box::pin(async move {
                    // Stock moves first so SQLite takes the write lock before any read.
                    let product = store
                        .adjust_stock(txn, movement.product_id, kind.stock_delta(movement.quantity))
                        .await?;

                    let user = store
                        .get_user(txn, actor_id)
                        .await?
                        .ok_or_else(|| ServiceError::not_found("User", actor_id))?;

                    let supplier = match supplier_id {
                        Some(id) => Some(
                            store
                                .get_supplier(txn, id)
                                .await?
                                .ok_or_else(|| ServiceError::not_found("Supplier", id))?,
                        ),
                        None => None,
                    };

                    let total_price = match kind {
                        TransactionType::ReturnToSupplier => Decimal::ZERO,
                        TransactionType::Purchase | TransactionType::Sale => {
                            line_total(product.price, movement.quantity)?
                        }
                    };

                    if product.stock_quantity < 0 {
                        warn!(
                            product_id = product.id,
                            stock_quantity = product.stock_quantity,
                            "Stock is negative after {}",
                            kind.as_str()
                        );
                    }

                    let transaction = store
                        .append_transaction(
                            txn,
                            transaction::ActiveModel {
                                transaction_type: Set(kind),
                                status: Set(kind.initial_status()),
                                product_id: Set(product.id),
                                supplier_id: Set(supplier.as_ref().map(|s| s.id)),
                                user_id: Set(user.id),
                                total_products: Set(movement.quantity),
                                total_price: Set(total_price),
                                description: Set(movement.description),
                                ..Default::default()
                            },
                        )
                        .await?;

                    Ok(RecordedTransaction {
                        transaction,
                        product,
                        supplier,
                        user,
                    })
                })
            })
            .await?;

        counter!("inventory_ledger.transactions_recorded", 1, "type" => kind.as_str());
        info!(
            transaction_id = recorded.transaction.id,
            product_id = recorded.product.id,
            stock_quantity = recorded.product.stock_quantity,
            "{} recorded",
            kind.as_str()
        );
        Ok(recorded)
    }
}

/// `price * quantity`, refused when it does not fit a money column.
fn line_total(price: Decimal, quantity: i32) -> Result<Decimal, ServiceError> {
    price
        .checked_mul(Decimal::from(quantity))
        .filter(|total| *total <= product::MAX_AMOUNT)
        .ok_or_else(|| {
            ServiceError::ValidationError(format!(
                "Total of {} x {} exceeds the largest storable amount",
                quantity, price
            ))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn line_total_multiplies_price_by_quantity() {
        assert_eq!(line_total(dec!(5.00), 4).unwrap(), dec!(20.00));
    }

    #[test]
    fn line_total_refuses_unstorable_amounts() {
        assert!(matches!(
            line_total(Decimal::MAX, 2),
            Err(ServiceError::ValidationError(_))
        ));
        assert!(matches!(
            line_total(product::MAX_AMOUNT, 2),
            Err(ServiceError::ValidationError(_))
        ));
        assert_eq!(line_total(product::MAX_AMOUNT, 1).unwrap(), product::MAX_AMOUNT);
    }
}
