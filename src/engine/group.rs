use crate::config::EngineConfig;
use crate::core::asset::AssetId;
use crate::core::claim::{ExpenseClaim, SettlementRequest};
use crate::core::error::{Result, SplitError};
use crate::core::ledger::Ledger;
use crate::core::party::{ParticipantId, ParticipantSet};
use crate::engine::events::{EventSink, ExpenseRecorded, ExpenseSettled, LedgerEvent, LoggingSink};
use crate::engine::expense::ExpenseRecorder;
use crate::engine::settlement::{suggest_settlements, SettlementProcessor};
use crate::transfer::TransferCapability;
use log::warn;
use parking_lot::{Mutex, RwLock};

/// A group of participants sharing one ledger.
///
/// Owns the ledger, the transfer capability and the event sink. Each
/// `record_expense` or `settle` call holds the ledger's write lock from
/// validation through transfer to commit, so no caller ever sees a
/// half-applied operation. Queries take the read lock.
///
/// # Examples
///
/// ```
/// use split_ledger::prelude::*;
///
/// let members = ParticipantSet::new(["alice", "bob"]).unwrap();
/// let mut custody = InMemoryCustody::new();
/// custody.deposit(ParticipantId::new("alice"), AssetId::Native, 1_000);
///
/// let group = SplitGroup::new(members, custody, EventLog::new(), &EngineConfig::default());
/// let claim = ExpenseClaim::new(ParticipantId::new("alice"), 100, AssetId::Native)
///     .with_share(ParticipantId::new("alice"), 1)
///     .with_share(ParticipantId::new("bob"), 1);
/// group.record_expense(&claim, 100).unwrap();
///
/// assert_eq!(group.net_balance(&ParticipantId::new("bob"), &AssetId::Native).unwrap(), -50);
/// ```
pub struct SplitGroup<T, S> {
    ledger: RwLock<Ledger>,
    transfers: Mutex<T>,
    events: S,
    recorder: ExpenseRecorder,
    settlement: SettlementProcessor,
    log_events: bool,
}

/// Forwards to the group's sink and, when enabled, to the log.
struct Fanout<'a> {
    sink: &'a dyn EventSink,
    log: bool,
}

impl EventSink for Fanout<'_> {
    fn publish(&self, event: LedgerEvent) {
        if self.log {
            LoggingSink.publish(event.clone());
        }
        self.sink.publish(event);
    }
}

impl<T: TransferCapability + Send, S: EventSink> SplitGroup<T, S> {
    pub fn new(participants: ParticipantSet, transfers: T, events: S, config: &EngineConfig) -> Self {
        Self {
            ledger: RwLock::new(Ledger::new(participants)),
            transfers: Mutex::new(transfers),
            events,
            recorder: ExpenseRecorder::new(config),
            settlement: SettlementProcessor::new(),
            log_events: config.log_events,
        }
    }

    /// Record a shared expense paid by `claim.payer`.
    pub fn record_expense(&self, claim: &ExpenseClaim, attached: u128) -> Result<ExpenseRecorded> {
        let mut ledger = self.ledger.write();
        let mut transfers = self.transfers.lock();
        let sink = Fanout {
            sink: &self.events,
            log: self.log_events,
        };
        self.recorder
            .record(&mut ledger, &mut *transfers, &sink, claim, attached)
            .map_err(|e| {
                warn!("rejected expense by {}: {}", claim.payer, e);
                e
            })
    }

    /// Pay down `request.debtor`'s debt by paying `request.creditor`.
    pub fn settle(&self, request: &SettlementRequest, attached: u128) -> Result<ExpenseSettled> {
        let mut ledger = self.ledger.write();
        let mut transfers = self.transfers.lock();
        let sink = Fanout {
            sink: &self.events,
            log: self.log_events,
        };
        self.settlement
            .settle(&mut ledger, &mut *transfers, &sink, request, attached)
            .map_err(|e| {
                warn!(
                    "rejected settlement {} -> {}: {}",
                    request.debtor, request.creditor, e
                );
                e
            })
    }

    /// Net balance of `participant` in `asset`.
    pub fn net_balance(&self, participant: &ParticipantId, asset: &AssetId) -> Result<i128> {
        self.ledger.read().balance_of(participant, asset)
    }

    /// A copy of the ledger as of now.
    pub fn snapshot(&self) -> Ledger {
        self.ledger.read().clone()
    }

    pub fn participants(&self) -> ParticipantSet {
        self.ledger.read().participants().clone()
    }

    /// Transfers that would bring every balance in `asset` back to zero.
    pub fn suggest_settlements(&self, asset: &AssetId) -> Vec<SettlementRequest> {
        suggest_settlements(&self.ledger.read(), asset)
    }

    /// Run `f` with exclusive access to the transfer capability, e.g. to
    /// fund wallets between operations.
    ///
    /// Locks are taken in the same order as `record_expense` and `settle`
    /// (ledger, then transfers). `f` must not call back into the group.
    pub fn with_transfers<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        let _ledger = self.ledger.read();
        let mut transfers = self.transfers.lock();
        f(&mut *transfers)
    }

    pub fn events(&self) -> &S {
        &self.events
    }

    /// Check the zero-sum invariant for every asset.
    pub fn verify(&self) -> Result<()> {
        let ledger = self.ledger.read();
        for asset in ledger.assets() {
            match ledger.asset_total(&asset) {
                Some(0) => {}
                Some(net) => return Err(SplitError::Unbalanced { asset, net }),
                None => return Err(SplitError::ArithmeticOverflow("summing ledger balances")),
            }
        }
        Ok(())
    }
}
