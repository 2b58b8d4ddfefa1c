//! Database query functions organized by domain.

pub mod accounts;
pub mod ledger;
pub mod purchases;
pub mod shops;
