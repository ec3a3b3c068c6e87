pub mod categories;
pub mod ledger;
pub mod products;
pub mod suppliers;
pub mod transaction_queries;
pub mod transactions;
pub mod users;
