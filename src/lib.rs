//! # split-ledger
//!
//! Shared-ledger engine for group expenses with weighted cost splitting.
//!
//! A fixed set of participants record expenses paid on behalf of the
//! group. Each expense is split by integer share weights into signed
//! per-participant balances, which are later cleared by settlement
//! transfers between debtors and creditors. For every asset, balances
//! always sum to zero.
//!
//! ## Architecture
//!
//! - **core**: Identities, assets, claims, errors and the ledger itself
//! - **engine**: Expense recording, settlement processing, events and the
//!   lock-owning group
//! - **transfer**: The asset-transfer capability and an in-memory custody
//! - **session**: Scripted operation replay
//! - **simulation**: Random activity generation

pub mod config;
pub mod core;
pub mod engine;
pub mod session;
pub mod simulation;
pub mod transfer;

/// Convenience re-exports for common usage.
pub mod prelude {
    pub use crate::config::EngineConfig;
    pub use crate::core::asset::AssetId;
    pub use crate::core::claim::{ExpenseClaim, SettlementRequest};
    pub use crate::core::error::{ClaimDefect, SplitError};
    pub use crate::core::ledger::Ledger;
    pub use crate::core::party::{ParticipantId, ParticipantSet};
    pub use crate::engine::events::{EventLog, EventSink, LedgerEvent};
    pub use crate::engine::group::SplitGroup;
    pub use crate::transfer::custody::InMemoryCustody;
    pub use crate::transfer::{TransferCapability, TransferError};
}
