mod common;

use std::sync::atomic::{AtomicUsize, Ordering};

use common::TestApp;
use inventory_api::services::transactions::StockMovement;
use proptest::prelude::*;
use proptest::test_runner::{Config, TestCaseError, TestRunner};
use rust_decimal_macros::dec;

#[derive(Debug, Clone, Copy)]
enum Move {
    Purchase(i32),
    Sale(i32),
    Return(i32),
}

impl Move {
    fn signed(&self) -> i32 {
        match *self {
            Move::Purchase(q) => q,
            Move::Sale(q) | Move::Return(q) => -q,
        }
    }
}

fn move_strategy() -> impl Strategy<Value = Move> {
    prop_oneof![
        (1..20i32).prop_map(Move::Purchase),
        (1..20i32).prop_map(Move::Sale),
        (1..20i32).prop_map(Move::Return),
    ]
}

/// Stock always equals the initial quantity plus the signed sum of every
/// recorded movement, and the ledger grows by exactly one row per movement.
#[test]
fn stock_tracks_the_signed_sum_of_movements() {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("tokio runtime");
    let app = runtime.block_on(TestApp::new());
    let (category, supplier) = runtime.block_on(async {
        (
            app.seed_category("Bulk").await,
            app.seed_supplier("Bulk Supplier").await,
        )
    });
    let sku_counter = AtomicUsize::new(0);

    let mut runner = TestRunner::new(Config::with_cases(48));
    let result = runner.run(
        &(0..100i32, prop::collection::vec(move_strategy(), 0..12)),
        |(initial, moves)| {
            runtime.block_on(async {
                let sku = format!("PROP-{}", sku_counter.fetch_add(1, Ordering::SeqCst));
                let product = app
                    .seed_product(category.id, &sku, dec!(3.25), initial)
                    .await;
                let ledger_before = app.ledger_len().await;
                let transactions = &app.state.services.transactions;

                for mv in &moves {
                    let movement = |quantity| StockMovement {
                        product_id: product.id,
                        supplier_id: Some(supplier.id),
                        quantity,
                        description: None,
                    };
                    let recorded = match *mv {
                        Move::Purchase(q) => transactions.restock(app.admin.id, movement(q)).await,
                        Move::Sale(q) => transactions.sell(app.admin.id, movement(q)).await,
                        Move::Return(q) => {
                            transactions
                                .return_to_supplier(app.admin.id, movement(q))
                                .await
                        }
                    }
                    .map_err(|e| TestCaseError::fail(e.to_string()))?;
                    prop_assert_eq!(recorded.transaction.product_id, product.id);
                }

                let expected = initial + moves.iter().map(Move::signed).sum::<i32>();
                prop_assert_eq!(app.stock_of(product.id).await, expected);
                prop_assert_eq!(app.ledger_len().await, ledger_before + moves.len());
                Ok::<(), TestCaseError>(())
            })
        },
    );

    if let Err(failure) = result {
        panic!("{}", failure);
    }
}
