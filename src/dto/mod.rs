//! Wire types for the REST surface.
//!
//! Entity models never leave the service layer directly; every response is
//! built through one of the explicit conversions in these modules so that
//! secrets (password hashes) and back-references (a user's transactions
//! inside a transaction's user) are dropped in one visible place.

pub mod catalog;
pub mod transaction;
pub mod user;

pub use catalog::*;
pub use transaction::*;
pub use user::*;
