use crate::core::asset::AssetId;
use crate::core::party::ParticipantId;
use crate::transfer::{Endpoint, TransferCapability, TransferError, TransferRequest};
use log::debug;
use std::collections::HashMap;

/// In-memory holdings of participants and of the group.
///
/// Native transfers draw on the sender's wallet and require the exact
/// amount attached. Token transfers out of a participant additionally
/// consume a pull allowance the participant granted beforehand.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCustody {
    wallets: HashMap<(ParticipantId, AssetId), u128>,
    allowances: HashMap<(ParticipantId, AssetId), u128>,
    custody: HashMap<AssetId, u128>,
}

impl InMemoryCustody {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add funds to a participant's wallet.
    pub fn deposit(&mut self, participant: ParticipantId, asset: AssetId, amount: u128) {
        let balance = self.wallets.entry((participant, asset)).or_insert(0);
        *balance = balance.saturating_add(amount);
    }

    /// Authorize the group to pull up to `amount` of a token.
    pub fn approve(&mut self, participant: ParticipantId, asset: AssetId, amount: u128) {
        self.allowances.insert((participant, asset), amount);
    }

    pub fn wallet(&self, participant: &ParticipantId, asset: &AssetId) -> u128 {
        self.wallets
            .get(&(participant.clone(), asset.clone()))
            .copied()
            .unwrap_or(0)
    }

    pub fn allowance(&self, participant: &ParticipantId, asset: &AssetId) -> u128 {
        self.allowances
            .get(&(participant.clone(), asset.clone()))
            .copied()
            .unwrap_or(0)
    }

    /// Funds held by the group in `asset`.
    pub fn held(&self, asset: &AssetId) -> u128 {
        self.custody.get(asset).copied().unwrap_or(0)
    }

    fn available(&self, endpoint: &Endpoint, asset: &AssetId) -> u128 {
        match endpoint {
            Endpoint::Participant(p) => self.wallet(p, asset),
            Endpoint::Custody => self.held(asset),
        }
    }

    fn slot(&mut self, endpoint: &Endpoint, asset: &AssetId) -> &mut u128 {
        match endpoint {
            Endpoint::Participant(p) => self
                .wallets
                .entry((p.clone(), asset.clone()))
                .or_insert(0),
            Endpoint::Custody => self.custody.entry(asset.clone()).or_insert(0),
        }
    }
}

impl TransferCapability for InMemoryCustody {
    fn transfer(&mut self, request: &TransferRequest) -> Result<(), TransferError> {
        request.check_attachment()?;

        let asset = &request.asset;
        let available = self.available(&request.from, asset);
        if available < request.amount {
            return Err(TransferError::InsufficientFunds {
                holder: request.from.clone(),
                asset: asset.clone(),
                needed: request.amount,
                available,
            });
        }

        let pulls_token = !asset.is_native() && matches!(request.from, Endpoint::Participant(_));
        if let Endpoint::Participant(holder) = &request.from {
            if pulls_token {
                let authorized = self.allowance(holder, asset);
                if authorized < request.amount {
                    return Err(TransferError::InsufficientAllowance {
                        holder: holder.clone(),
                        asset: asset.clone(),
                        needed: request.amount,
                        authorized,
                    });
                }
            }
        }

        if request.from == request.to {
            return Ok(());
        }

        let credited = self
            .available(&request.to, asset)
            .checked_add(request.amount)
            .ok_or_else(|| {
                TransferError::Rejected(format!("{} {} balance would overflow", request.to, asset))
            })?;

        // All checks passed; nothing below can fail.
        if pulls_token {
            if let Endpoint::Participant(holder) = &request.from {
                let key = (holder.clone(), asset.clone());
                if let Some(allowance) = self.allowances.get_mut(&key) {
                    *allowance -= request.amount;
                }
            }
        }
        *self.slot(&request.from, asset) = available - request.amount;
        *self.slot(&request.to, asset) = credited;

        debug!(
            "moved {} {} from {} to {}",
            request.amount, asset, request.from, request.to
        );
        Ok(())
    }
}
