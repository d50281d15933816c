use crate::core::asset::AssetId;
use crate::core::claim::amount_str;
use crate::core::party::ParticipantId;
use chrono::{DateTime, Utc};
use log::info;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

/// Published once for every committed expense.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpenseRecorded {
    pub id: Uuid,
    pub recorded_at: DateTime<Utc>,
    pub payer: ParticipantId,
    #[serde(with = "amount_str")]
    pub total_amount: u128,
    pub asset: AssetId,
    pub involved: Vec<ParticipantId>,
    /// Computed share of each involved participant, in `involved` order.
    #[serde(with = "shares_str")]
    pub shares: Vec<u128>,
}

/// Published once for every committed settlement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpenseSettled {
    pub id: Uuid,
    pub settled_at: DateTime<Utc>,
    pub debtor: ParticipantId,
    pub creditor: ParticipantId,
    pub asset: AssetId,
    #[serde(with = "amount_str")]
    pub amount: u128,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum LedgerEvent {
    ExpenseRecorded(ExpenseRecorded),
    ExpenseSettled(ExpenseSettled),
}

mod shares_str {
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(shares: &[u128], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(shares.iter().map(|s| s.to_string()))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u128>, D::Error> {
        Vec::<String>::deserialize(deserializer)?
            .into_iter()
            .map(|s| s.parse().map_err(de::Error::custom))
            .collect()
    }
}

/// Receives notifications about committed operations.
///
/// Advisory only: the ledger is correct whether or not anything listens.
pub trait EventSink: Send + Sync {
    fn publish(&self, event: LedgerEvent);
}

impl<T: EventSink + ?Sized> EventSink for Arc<T> {
    fn publish(&self, event: LedgerEvent) {
        (**self).publish(event)
    }
}

/// Keeps every published event in memory.
#[derive(Debug, Default)]
pub struct EventLog {
    events: Mutex<Vec<LedgerEvent>>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<LedgerEvent> {
        self.events.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }
}

impl EventSink for EventLog {
    fn publish(&self, event: LedgerEvent) {
        self.events.lock().push(event);
    }
}

/// Writes each event through the `log` facade.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingSink;

impl EventSink for LoggingSink {
    fn publish(&self, event: LedgerEvent) {
        match event {
            LedgerEvent::ExpenseRecorded(e) => info!(
                "expense {}: {} paid {} {} split across {} participants",
                e.id,
                e.payer,
                e.total_amount,
                e.asset,
                e.involved.len()
            ),
            LedgerEvent::ExpenseSettled(e) => info!(
                "settlement {}: {} paid {} {} to {}",
                e.id, e.debtor, e.amount, e.asset, e.creditor
            ),
        }
    }
}
