use crate::core::asset::AssetId;
use crate::core::party::ParticipantId;
use crate::transfer::TransferError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, SplitError>;

/// Errors reported by ledger, recorder and settlement operations.
///
/// Every variant is returned synchronously to the caller of the operation
/// that detected it. Nothing is retried and no balance is changed when an
/// operation fails.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SplitError {
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("unknown participant '{0}'")]
    UnknownParticipant(ParticipantId),

    #[error("malformed expense claim: {0}")]
    MalformedClaim(#[from] ClaimDefect),

    #[error("transfer failed: {0}")]
    Transfer(#[from] TransferError),

    #[error(
        "{debtor} cannot settle {amount} {asset} with {creditor}: \
         debtor balance {debtor_balance}, creditor balance {creditor_balance}"
    )]
    InsufficientDebtOrCredit {
        debtor: ParticipantId,
        creditor: ParticipantId,
        asset: AssetId,
        amount: u128,
        debtor_balance: i128,
        creditor_balance: i128,
    },

    #[error("arithmetic overflow while {0}")]
    ArithmeticOverflow(&'static str),

    #[error("deltas for {asset} do not sum to zero (net {net})")]
    Unbalanced { asset: AssetId, net: i128 },
}

/// The specific reason an expense claim was rejected.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ClaimDefect {
    #[error("claim involves no participants")]
    NoParticipants,

    #[error("{involved} participants but {weights} share weights")]
    LengthMismatch { involved: usize, weights: usize },

    #[error("{count} participants exceeds the limit of {max}")]
    TooManyParticipants { count: usize, max: usize },

    #[error("total share weight must be positive")]
    ZeroTotalWeight,

    #[error("share weights sum to {actual}, declared total is {declared}")]
    WeightSumMismatch { declared: u64, actual: u128 },

    #[error("participant '{0}' is listed more than once")]
    DuplicateParticipant(ParticipantId),

    #[error("payer '{0}' is not among the involved participants")]
    PayerNotInvolved(ParticipantId),
}

impl SplitError {
    /// True for failures raised by the transfer capability.
    pub fn is_transfer_failure(&self) -> bool {
        matches!(self, SplitError::Transfer(_))
    }
}
