//! Scripted sessions: a participant list plus an ordered list of
//! operations, replayed against a fresh group over in-memory custody.
//!
//! ```json
//! {
//!   "participants": ["alice", "bob"],
//!   "operations": [
//!     { "type": "deposit", "participant": "alice", "amount": "1000" },
//!     { "type": "expense", "payer": "alice", "total_amount": "100",
//!       "involved": ["alice", "bob"], "share_weights": [1, 1], "total_share_weight": 2 },
//!     { "type": "settle", "debtor": "bob", "creditor": "alice", "amount": "50" }
//!   ]
//! }
//! ```

use crate::config::EngineConfig;
use crate::core::asset::AssetId;
use crate::core::claim::{amount_str, ExpenseClaim, SettlementRequest};
use crate::core::ledger::Ledger;
use crate::core::party::{ParticipantId, ParticipantSet};
use crate::engine::events::{EventLog, LedgerEvent};
use crate::engine::group::SplitGroup;
use crate::transfer::custody::InMemoryCustody;
use log::info;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("cannot read session file '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot parse session: {0}")]
    Parse(#[from] serde_json::Error),
}

/// One scripted step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Operation {
    /// Credit a participant's wallet outside the ledger.
    Deposit {
        participant: ParticipantId,
        #[serde(default)]
        asset: AssetId,
        #[serde(with = "amount_str")]
        amount: u128,
    },
    /// Authorize the group to pull up to `amount` of a token.
    Approve {
        participant: ParticipantId,
        asset: AssetId,
        #[serde(with = "amount_str")]
        amount: u128,
    },
    Expense {
        #[serde(flatten)]
        claim: ExpenseClaim,
        /// Native value sent with the call. Defaults to the exact amount
        /// for the native asset and zero for tokens.
        #[serde(default, with = "amount_str::option", skip_serializing_if = "Option::is_none")]
        attached: Option<u128>,
    },
    Settle {
        #[serde(flatten)]
        request: SettlementRequest,
        #[serde(default, with = "amount_str::option", skip_serializing_if = "Option::is_none")]
        attached: Option<u128>,
    },
}

impl Operation {
    pub fn kind(&self) -> &'static str {
        match self {
            Operation::Deposit { .. } => "deposit",
            Operation::Approve { .. } => "approve",
            Operation::Expense { .. } => "expense",
            Operation::Settle { .. } => "settle",
        }
    }
}

fn exact_attachment(asset: &AssetId, amount: u128) -> u128 {
    if asset.is_native() {
        amount
    } else {
        0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub participants: ParticipantSet,
    #[serde(default)]
    pub operations: Vec<Operation>,
}

/// What happened to one operation during replay.
#[derive(Debug, Clone, Serialize)]
pub struct OperationOutcome {
    pub index: usize,
    pub kind: &'static str,
    pub accepted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReplayReport {
    pub outcomes: Vec<OperationOutcome>,
    pub ledger: Ledger,
    pub events: Vec<LedgerEvent>,
    pub balanced: bool,
}

impl ReplayReport {
    pub fn accepted(&self) -> usize {
        self.outcomes.iter().filter(|o| o.accepted).count()
    }

    pub fn rejected(&self) -> usize {
        self.outcomes.len() - self.accepted()
    }
}

impl Session {
    pub fn new(participants: ParticipantSet) -> Self {
        Self {
            participants,
            operations: Vec::new(),
        }
    }

    pub fn push(&mut self, operation: Operation) {
        self.operations.push(operation);
    }

    pub fn from_json_str(json: &str) -> Result<Self, SessionError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, SessionError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| SessionError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&content)
    }

    /// Run every operation in order. Rejected operations are recorded in
    /// the report and replay continues with the next one.
    pub fn replay(&self, config: &EngineConfig) -> ReplayReport {
        let group = SplitGroup::new(
            self.participants.clone(),
            InMemoryCustody::new(),
            EventLog::new(),
            config,
        );

        let mut outcomes = Vec::with_capacity(self.operations.len());
        for (index, operation) in self.operations.iter().enumerate() {
            let result = match operation {
                Operation::Deposit {
                    participant,
                    asset,
                    amount,
                } => group
                    .participants()
                    .ensure_member(participant)
                    .map(|_| {
                        group.with_transfers(|c| c.deposit(participant.clone(), asset.clone(), *amount))
                    }),
                Operation::Approve {
                    participant,
                    asset,
                    amount,
                } => group
                    .participants()
                    .ensure_member(participant)
                    .map(|_| {
                        group.with_transfers(|c| c.approve(participant.clone(), asset.clone(), *amount))
                    }),
                Operation::Expense { claim, attached } => group
                    .record_expense(
                        claim,
                        attached.unwrap_or_else(|| exact_attachment(&claim.asset, claim.total_amount)),
                    )
                    .map(|_| ()),
                Operation::Settle { request, attached } => group
                    .settle(
                        request,
                        attached.unwrap_or_else(|| exact_attachment(&request.asset, request.amount)),
                    )
                    .map(|_| ()),
            };

            outcomes.push(OperationOutcome {
                index,
                kind: operation.kind(),
                accepted: result.is_ok(),
                error: result.err().map(|e| e.to_string()),
            });
        }

        let report = ReplayReport {
            outcomes,
            ledger: group.snapshot(),
            events: group.events().events(),
            balanced: group.verify().is_ok(),
        };
        info!(
            "replayed {} operations: {} accepted, {} rejected",
            report.outcomes.len(),
            report.accepted(),
            report.rejected()
        );
        report
    }
}

impl fmt::Display for ReplayReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Replay Result ===")?;
        writeln!(f, "Operations:  {}", self.outcomes.len())?;
        writeln!(f, "Accepted:    {}", self.accepted())?;
        writeln!(f, "Rejected:    {}", self.rejected())?;
        writeln!(f, "Balanced:    {}", self.balanced)?;

        for outcome in self.outcomes.iter().filter(|o| !o.accepted) {
            writeln!(
                f,
                "  #{} {}: {}",
                outcome.index,
                outcome.kind,
                outcome.error.as_deref().unwrap_or("rejected")
            )?;
        }

        for asset in self.ledger.assets() {
            writeln!(f, "\n--- {} ---", asset)?;
            for (participant, balance) in self.ledger.balances_for_asset(&asset) {
                let status = match balance {
                    b if b > 0 => "OWED",
                    b if b < 0 => "OWES",
                    _ => "SETTLED",
                };
                writeln!(f, "  {:<16} {:>24}  {}", participant.as_str(), balance, status)?;
            }
        }
        Ok(())
    }
}
