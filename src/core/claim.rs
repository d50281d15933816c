use crate::core::asset::AssetId;
use crate::core::party::ParticipantId;
use serde::{Deserialize, Serialize};

/// A request to record a shared expense.
///
/// `involved` and `share_weights` are parallel lists: participant
/// `involved[i]` carries `share_weights[i]` parts of the cost out of
/// `total_share_weight`. The claim is only a request; the recorder
/// validates it before anything moves.
///
/// # Examples
///
/// ```
/// use split_ledger::core::asset::AssetId;
/// use split_ledger::core::claim::ExpenseClaim;
/// use split_ledger::core::party::ParticipantId;
///
/// let claim = ExpenseClaim::new(ParticipantId::new("alice"), 90, AssetId::Native)
///     .with_share(ParticipantId::new("alice"), 1)
///     .with_share(ParticipantId::new("bob"), 2);
///
/// assert_eq!(claim.total_share_weight, 3);
/// assert_eq!(claim.involved.len(), 2);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpenseClaim {
    /// The participant who paid and is credited.
    pub payer: ParticipantId,
    /// Amount paid, in the asset's smallest unit.
    #[serde(with = "amount_str")]
    pub total_amount: u128,
    #[serde(default)]
    pub asset: AssetId,
    pub involved: Vec<ParticipantId>,
    pub share_weights: Vec<u64>,
    /// Declared sum of `share_weights`; must match exactly.
    pub total_share_weight: u64,
}

impl ExpenseClaim {
    /// Start a claim with no involved participants.
    pub fn new(payer: ParticipantId, total_amount: u128, asset: AssetId) -> Self {
        Self {
            payer,
            total_amount,
            asset,
            involved: Vec::new(),
            share_weights: Vec::new(),
            total_share_weight: 0,
        }
    }

    /// Add a participant and its weight, keeping the declared total in step.
    pub fn with_share(mut self, participant: ParticipantId, weight: u64) -> Self {
        self.involved.push(participant);
        self.share_weights.push(weight);
        self.total_share_weight = self.total_share_weight.saturating_add(weight);
        self
    }

    /// Override the declared total share weight.
    pub fn with_total_share_weight(mut self, total: u64) -> Self {
        self.total_share_weight = total;
        self
    }
}

/// A request from `debtor` to pay down what it owes by paying `creditor`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementRequest {
    pub debtor: ParticipantId,
    pub creditor: ParticipantId,
    #[serde(with = "amount_str")]
    pub amount: u128,
    #[serde(default)]
    pub asset: AssetId,
}

impl SettlementRequest {
    pub fn new(debtor: ParticipantId, creditor: ParticipantId, amount: u128, asset: AssetId) -> Self {
        Self {
            debtor,
            creditor,
            amount,
            asset,
        }
    }
}

/// Serde helpers for `u128` amounts carried as decimal strings.
pub(crate) mod amount_str {
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(amount: &u128, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&amount.to_string())
    }

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Number(u64),
    }

    impl Raw {
        fn into_amount<E: de::Error>(self) -> Result<u128, E> {
            match self {
                Raw::Text(s) => s
                    .trim()
                    .parse()
                    .map_err(|e| E::custom(format!("invalid amount '{s}': {e}"))),
                Raw::Number(n) => Ok(u128::from(n)),
            }
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u128, D::Error> {
        Raw::deserialize(deserializer)?.into_amount()
    }

    /// Same encoding for optional amounts.
    pub mod option {
        use super::Raw;
        use serde::{Deserialize, Deserializer, Serializer};

        pub fn serialize<S: Serializer>(amount: &Option<u128>, serializer: S) -> Result<S::Ok, S::Error> {
            match amount {
                Some(amount) => serializer.serialize_some(&amount.to_string()),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u128>, D::Error> {
            Option::<Raw>::deserialize(deserializer)?
                .map(Raw::into_amount)
                .transpose()
        }
    }
}
