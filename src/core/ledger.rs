use crate::core::asset::AssetId;
use crate::core::error::{Result, SplitError};
use crate::core::party::{ParticipantId, ParticipantSet};
use serde::Serialize;
use std::collections::HashMap;

/// A signed change to one participant's balance in one asset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BalanceDelta {
    pub participant: ParticipantId,
    pub asset: AssetId,
    pub amount: i128,
}

/// The deltas of one logical operation. Applied all together or not at all.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeltaBatch {
    deltas: Vec<BalanceDelta>,
}

impl DeltaBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, participant: ParticipantId, asset: AssetId, amount: i128) {
        self.deltas.push(BalanceDelta {
            participant,
            asset,
            amount,
        });
    }

    pub fn iter(&self) -> impl Iterator<Item = &BalanceDelta> {
        self.deltas.iter()
    }

    pub fn len(&self) -> usize {
        self.deltas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.deltas.is_empty()
    }

    /// Net of all deltas for `asset`, or `None` on overflow.
    pub fn net(&self, asset: &AssetId) -> Option<i128> {
        self.deltas
            .iter()
            .filter(|d| &d.asset == asset)
            .try_fold(0i128, |acc, d| acc.checked_add(d.amount))
    }
}

/// Balances computed from a `DeltaBatch` against a specific ledger state.
///
/// Holds the final value of every touched entry, so committing is a plain
/// write that cannot fail.
#[derive(Debug, Clone)]
pub struct PreparedBatch {
    entries: HashMap<(ParticipantId, AssetId), i128>,
    generation: u64,
}

impl PreparedBatch {
    /// Balance the entry will hold once committed.
    pub fn resulting_balance(&self, participant: &ParticipantId, asset: &AssetId) -> Option<i128> {
        self.entries
            .get(&(participant.clone(), asset.clone()))
            .copied()
    }
}

/// Net balance of every participant in every asset.
///
/// A positive balance means the group owes the participant.
/// A negative balance means the participant owes the group.
///
/// The participant set is fixed when the ledger is created. Native-asset
/// entries start at zero for everyone; token entries appear on first use.
/// Every mutation goes through a `DeltaBatch` whose deltas sum to zero per
/// asset, so the sum of balances for each asset is always zero.
#[derive(Debug, Clone, Serialize)]
pub struct Ledger {
    participants: ParticipantSet,
    /// participant -> asset -> balance
    #[serde(serialize_with = "balances_serde::serialize")]
    balances: HashMap<(ParticipantId, AssetId), i128>,
    #[serde(skip)]
    generation: u64,
}

mod balances_serde {
    use super::*;
    use serde::ser::SerializeMap;
    use std::collections::BTreeMap;

    // Nested map with string values: JSON numbers cannot carry i128 portably.
    pub fn serialize<S: serde::Serializer>(
        balances: &HashMap<(ParticipantId, AssetId), i128>,
        serializer: S,
    ) -> std::result::Result<S::Ok, S::Error> {
        let mut nested: BTreeMap<&str, BTreeMap<&str, String>> = BTreeMap::new();
        for ((participant, asset), amount) in balances {
            nested
                .entry(participant.as_str())
                .or_default()
                .insert(asset.as_str(), amount.to_string());
        }
        let mut map = serializer.serialize_map(Some(nested.len()))?;
        for (participant, assets) in &nested {
            map.serialize_entry(participant, assets)?;
        }
        map.end()
    }
}

impl Ledger {
    pub fn new(participants: ParticipantSet) -> Self {
        let balances = participants
            .iter()
            .map(|p| ((p.clone(), AssetId::Native), 0i128))
            .collect();
        Self {
            participants,
            balances,
            generation: 0,
        }
    }

    pub fn participants(&self) -> &ParticipantSet {
        &self.participants
    }

    /// Current balance of `participant` in `asset`.
    pub fn balance_of(&self, participant: &ParticipantId, asset: &AssetId) -> Result<i128> {
        self.participants.ensure_member(participant)?;
        Ok(self.entry(participant, asset))
    }

    fn entry(&self, participant: &ParticipantId, asset: &AssetId) -> i128 {
        self.balances
            .get(&(participant.clone(), asset.clone()))
            .copied()
            .unwrap_or(0)
    }

    /// Validate a batch and compute the resulting balances without writing.
    ///
    /// Fails if any participant is unknown, if any asset's deltas do not
    /// net to zero, or if any resulting balance would overflow `i128`.
    pub fn prepare(&self, batch: &DeltaBatch) -> Result<PreparedBatch> {
        let mut entries: HashMap<(ParticipantId, AssetId), i128> = HashMap::new();
        let mut nets: HashMap<&AssetId, i128> = HashMap::new();

        for delta in batch.iter() {
            self.participants.ensure_member(&delta.participant)?;

            let key = (delta.participant.clone(), delta.asset.clone());
            let current = match entries.get(&key) {
                Some(staged) => *staged,
                None => self.entry(&delta.participant, &delta.asset),
            };
            let next = current
                .checked_add(delta.amount)
                .ok_or(SplitError::ArithmeticOverflow("applying a balance delta"))?;
            entries.insert(key, next);

            let net = nets.entry(&delta.asset).or_insert(0);
            *net = net
                .checked_add(delta.amount)
                .ok_or(SplitError::ArithmeticOverflow("netting a delta batch"))?;
        }

        if let Some((asset, net)) = nets.into_iter().find(|(_, net)| *net != 0) {
            return Err(SplitError::Unbalanced {
                asset: asset.clone(),
                net,
            });
        }

        Ok(PreparedBatch {
            entries,
            generation: self.generation,
        })
    }

    /// Write a prepared batch. Callers must not mutate the ledger between
    /// `prepare` and `commit`.
    pub(crate) fn commit(&mut self, prepared: PreparedBatch) {
        debug_assert_eq!(
            prepared.generation, self.generation,
            "prepared batch is stale"
        );
        self.balances.extend(prepared.entries);
        self.generation += 1;
    }

    /// Apply a batch atomically: either every delta lands or none does.
    pub fn apply(&mut self, batch: &DeltaBatch) -> Result<()> {
        let prepared = self.prepare(batch)?;
        self.commit(prepared);
        Ok(())
    }

    /// Balances of every participant for `asset`, in membership order.
    pub fn balances_for_asset(&self, asset: &AssetId) -> Vec<(ParticipantId, i128)> {
        self.participants
            .iter()
            .map(|p| (p.clone(), self.entry(p, asset)))
            .collect()
    }

    /// Every asset that has an entry in the ledger, sorted.
    pub fn assets(&self) -> Vec<AssetId> {
        let mut assets: Vec<AssetId> = self.balances.keys().map(|(_, a)| a.clone()).collect();
        assets.sort();
        assets.dedup();
        assets
    }

    /// Sum of all balances for `asset`, or `None` on overflow.
    pub fn asset_total(&self, asset: &AssetId) -> Option<i128> {
        self.balances
            .iter()
            .filter(|((_, a), _)| a == asset)
            .try_fold(0i128, |acc, (_, v)| acc.checked_add(*v))
    }

    /// Verify that the ledger is balanced: sum of all balances per asset = 0.
    pub fn is_balanced(&self) -> bool {
        self.assets()
            .iter()
            .all(|asset| self.asset_total(asset) == Some(0))
    }

    /// Total amount the group owes its creditors in `asset`
    /// (equivalently, the total its debtors owe).
    pub fn outstanding(&self, asset: &AssetId) -> u128 {
        self.balances
            .iter()
            .filter(|((_, a), v)| a == asset && **v > 0)
            .fold(0u128, |acc, (_, v)| acc.saturating_add(v.unsigned_abs()))
    }
}

/// Convert an unsigned amount into a signed delta magnitude.
pub(crate) fn to_signed(amount: u128) -> Result<i128> {
    i128::try_from(amount).map_err(|_| SplitError::ArithmeticOverflow("converting an amount"))
}
