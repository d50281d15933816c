use crate::core::asset::AssetId;
use crate::core::claim::SettlementRequest;
use crate::core::error::{Result, SplitError};
use crate::core::ledger::{DeltaBatch, Ledger};
use crate::engine::events::{EventSink, ExpenseSettled, LedgerEvent};
use crate::transfer::{Endpoint, TransferCapability, TransferRequest};
use chrono::Utc;
use log::debug;
use uuid::Uuid;

/// Validates and applies debt settlements between participants.
#[derive(Debug, Clone, Copy, Default)]
pub struct SettlementProcessor;

impl SettlementProcessor {
    pub fn new() -> Self {
        Self
    }

    /// Check that the debtor owes at least `amount` and the creditor is
    /// owed at least `amount`, then build the correcting deltas.
    pub fn plan(&self, ledger: &Ledger, request: &SettlementRequest) -> Result<DeltaBatch> {
        let debtor_balance = ledger.balance_of(&request.debtor, &request.asset)?;
        let creditor_balance = ledger.balance_of(&request.creditor, &request.asset)?;
        let insufficient = || SplitError::InsufficientDebtOrCredit {
            debtor: request.debtor.clone(),
            creditor: request.creditor.clone(),
            asset: request.asset.clone(),
            amount: request.amount,
            debtor_balance,
            creditor_balance,
        };

        // No i128 balance can cover an amount beyond i128::MAX.
        let amount = i128::try_from(request.amount).map_err(|_| insufficient())?;
        // -amount cannot overflow for any non-negative i128.
        if debtor_balance > -amount || creditor_balance < amount {
            return Err(insufficient());
        }

        debug!(
            "planned settlement {} -> {}: {} {} (balances {} / {})",
            request.debtor,
            request.creditor,
            request.amount,
            request.asset,
            debtor_balance,
            creditor_balance
        );

        let mut batch = DeltaBatch::new();
        batch.push(request.debtor.clone(), request.asset.clone(), amount);
        batch.push(request.creditor.clone(), request.asset.clone(), -amount);
        Ok(batch)
    }

    /// Settle: validate, pay the creditor directly, then apply the
    /// balance correction. `attached` is the native value sent with the call.
    pub fn settle<T: TransferCapability + ?Sized>(
        &self,
        ledger: &mut Ledger,
        transfers: &mut T,
        events: &dyn EventSink,
        request: &SettlementRequest,
        attached: u128,
    ) -> Result<ExpenseSettled> {
        let batch = self.plan(ledger, request)?;
        let prepared = ledger.prepare(&batch)?;

        transfers.transfer(&TransferRequest {
            asset: request.asset.clone(),
            from: Endpoint::Participant(request.debtor.clone()),
            to: Endpoint::Participant(request.creditor.clone()),
            amount: request.amount,
            attached,
        })?;

        ledger.commit(prepared);

        let event = ExpenseSettled {
            id: Uuid::new_v4(),
            settled_at: Utc::now(),
            debtor: request.debtor.clone(),
            creditor: request.creditor.clone(),
            asset: request.asset.clone(),
            amount: request.amount,
        };
        debug!(
            "settled {}: {} paid {} {} to {}",
            event.id, event.debtor, event.amount, event.asset, event.creditor
        );
        events.publish(LedgerEvent::ExpenseSettled(event.clone()));
        Ok(event)
    }
}

/// Pair the largest debtor with the largest creditor until every balance
/// in `asset` is zero.
///
/// Executing the returned requests in order is always valid: each one is
/// sized from what both sides still owe or are owed at that point.
pub fn suggest_settlements(ledger: &Ledger, asset: &AssetId) -> Vec<SettlementRequest> {
    let balances = ledger.balances_for_asset(asset);
    let mut debtors: Vec<_> = balances
        .iter()
        .filter(|(_, b)| *b < 0)
        .map(|(p, b)| (p.clone(), b.unsigned_abs()))
        .collect();
    let mut creditors: Vec<_> = balances
        .iter()
        .filter(|(_, b)| *b > 0)
        .map(|(p, b)| (p.clone(), b.unsigned_abs()))
        .collect();
    debtors.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    creditors.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

    let mut suggestions = Vec::new();
    let (mut d, mut c) = (0, 0);
    while d < debtors.len() && c < creditors.len() {
        let amount = debtors[d].1.min(creditors[c].1);
        suggestions.push(SettlementRequest::new(
            debtors[d].0.clone(),
            creditors[c].0.clone(),
            amount,
            asset.clone(),
        ));
        debtors[d].1 -= amount;
        creditors[c].1 -= amount;
        if debtors[d].1 == 0 {
            d += 1;
        }
        if creditors[c].1 == 0 {
            c += 1;
        }
    }
    suggestions
}
