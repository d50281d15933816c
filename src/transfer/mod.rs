//! The asset-transfer capability consumed by the engine.
//!
//! The engine never moves funds itself. It describes the movement as a
//! [`TransferRequest`] and hands it to a [`TransferCapability`], which must
//! either move exactly the requested amount or fail without side effects.

pub mod custody;

use crate::core::asset::AssetId;
use crate::core::party::ParticipantId;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// One side of a transfer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Endpoint {
    Participant(ParticipantId),
    /// Funds held by the group itself.
    Custody,
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Endpoint::Participant(p) => write!(f, "{}", p),
            Endpoint::Custody => write!(f, "<custody>"),
        }
    }
}

/// A single movement of funds.
///
/// `attached` is the native value the caller sent along with the
/// operation. For the native asset it must equal `amount`; for a token it
/// must be zero, since tokens are pulled through a prior authorization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferRequest {
    pub asset: AssetId,
    pub from: Endpoint,
    pub to: Endpoint,
    pub amount: u128,
    pub attached: u128,
}

impl TransferRequest {
    /// Check the attached-value rule shared by every capability.
    pub fn check_attachment(&self) -> Result<(), TransferError> {
        let expected = if self.asset.is_native() { self.amount } else { 0 };
        if self.attached != expected {
            return Err(TransferError::AttachedValueMismatch {
                asset: self.asset.clone(),
                expected,
                attached: self.attached,
            });
        }
        Ok(())
    }
}

/// Why a transfer did not happen.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransferError {
    #[error("{holder} holds {available} {asset}, needs {needed}")]
    InsufficientFunds {
        holder: Endpoint,
        asset: AssetId,
        needed: u128,
        available: u128,
    },

    #[error("{holder} authorized {authorized} {asset} for pull, needs {needed}")]
    InsufficientAllowance {
        holder: ParticipantId,
        asset: AssetId,
        needed: u128,
        authorized: u128,
    },

    #[error("expected {expected} native value attached for {asset} transfer, got {attached}")]
    AttachedValueMismatch {
        asset: AssetId,
        expected: u128,
        attached: u128,
    },

    #[error("transfer rejected: {0}")]
    Rejected(String),
}

/// Moves `amount` of an asset between endpoints, atomically.
///
/// Implementations must return `Err` on any failure (never silently do
/// nothing) and must leave every holding unchanged when they do.
pub trait TransferCapability {
    fn transfer(&mut self, request: &TransferRequest) -> Result<(), TransferError>;
}

impl<T: TransferCapability + ?Sized> TransferCapability for Box<T> {
    fn transfer(&mut self, request: &TransferRequest) -> Result<(), TransferError> {
        (**self).transfer(request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(asset: AssetId, amount: u128, attached: u128) -> TransferRequest {
        TransferRequest {
            asset,
            from: Endpoint::Participant(ParticipantId::new("A")),
            to: Endpoint::Custody,
            amount,
            attached,
        }
    }

    #[test]
    fn test_native_requires_exact_attachment() {
        assert!(request(AssetId::Native, 100, 100).check_attachment().is_ok());
        assert_eq!(
            request(AssetId::Native, 100, 99).check_attachment(),
            Err(TransferError::AttachedValueMismatch {
                asset: AssetId::Native,
                expected: 100,
                attached: 99,
            })
        );
    }

    #[test]
    fn test_token_rejects_attached_value() {
        let usdc = AssetId::token("USDC");
        assert!(request(usdc.clone(), 100, 0).check_attachment().is_ok());
        assert!(request(usdc, 100, 100).check_attachment().is_err());
    }

    #[test]
    fn test_endpoint_display() {
        assert_eq!(Endpoint::Custody.to_string(), "<custody>");
        assert_eq!(
            Endpoint::Participant(ParticipantId::new("bob")).to_string(),
            "bob"
        );
    }
}
