pub mod asset;
pub mod claim;
pub mod error;
pub mod ledger;
pub mod party;
