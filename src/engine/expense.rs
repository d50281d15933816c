use crate::config::EngineConfig;
use crate::core::claim::ExpenseClaim;
use crate::core::error::{ClaimDefect, Result, SplitError};
use crate::core::ledger::{to_signed, DeltaBatch, Ledger};
use crate::engine::events::{EventSink, ExpenseRecorded, LedgerEvent};
use crate::transfer::{Endpoint, TransferCapability, TransferRequest};
use chrono::Utc;
use log::debug;
use std::collections::HashSet;
use uuid::Uuid;

/// The outcome of splitting a claim, before anything is applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpensePlan {
    /// Share of each involved participant, in claim order.
    pub shares: Vec<u128>,
    /// Position of the payer within `involved`.
    pub payer_index: usize,
    pub total_amount: u128,
    pub batch: DeltaBatch,
}

impl ExpensePlan {
    /// Units left over by truncation. Borne by the payer.
    pub fn remainder(&self) -> u128 {
        // Shares are truncated from the total, so their sum never exceeds it.
        self.total_amount
            .saturating_sub(self.shares.iter().sum::<u128>())
    }
}

/// Compute `floor(total_amount * w / total_weight)` for every weight.
///
/// Never overflows while `w <= total_weight`: the product is split into
/// `(total / tw) * w + (total % tw) * w / tw`.
///
/// # Examples
///
/// ```
/// use split_ledger::engine::expense::split_shares;
///
/// assert_eq!(split_shares(100, &[1, 1, 1], 3).unwrap(), vec![33, 33, 33]);
/// assert_eq!(split_shares(100, &[1, 3], 4).unwrap(), vec![25, 75]);
/// ```
pub fn split_shares(total_amount: u128, weights: &[u64], total_weight: u64) -> Result<Vec<u128>> {
    if total_weight == 0 {
        return Err(ClaimDefect::ZeroTotalWeight.into());
    }
    let tw = u128::from(total_weight);
    let quotient = total_amount / tw;
    let rest = total_amount % tw;

    weights
        .iter()
        .map(|&w| {
            let w = u128::from(w);
            let whole = quotient
                .checked_mul(w)
                .ok_or(SplitError::ArithmeticOverflow("computing a share"))?;
            let partial = rest
                .checked_mul(w)
                .ok_or(SplitError::ArithmeticOverflow("computing a share"))?
                / tw;
            whole
                .checked_add(partial)
                .ok_or(SplitError::ArithmeticOverflow("computing a share"))
        })
        .collect()
}

/// Turns expense claims into balance deltas.
///
/// Holds no balance state of its own; every call works against the ledger
/// it is given.
#[derive(Debug, Clone)]
pub struct ExpenseRecorder {
    max_involved: usize,
}

impl ExpenseRecorder {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            max_involved: config.max_involved,
        }
    }

    /// Check a claim against the ledger's membership. Returns the payer's
    /// position in `involved`.
    pub fn validate(&self, ledger: &Ledger, claim: &ExpenseClaim) -> Result<usize> {
        let involved = claim.involved.len();
        let weights = claim.share_weights.len();
        if involved != weights {
            return Err(ClaimDefect::LengthMismatch { involved, weights }.into());
        }
        if involved == 0 {
            return Err(ClaimDefect::NoParticipants.into());
        }
        if involved > self.max_involved {
            return Err(ClaimDefect::TooManyParticipants {
                count: involved,
                max: self.max_involved,
            }
            .into());
        }
        if claim.total_share_weight == 0 {
            return Err(ClaimDefect::ZeroTotalWeight.into());
        }

        let members = ledger.participants();
        members.ensure_member(&claim.payer)?;
        let mut seen = HashSet::with_capacity(involved);
        for participant in &claim.involved {
            members.ensure_member(participant)?;
            if !seen.insert(participant) {
                return Err(ClaimDefect::DuplicateParticipant(participant.clone()).into());
            }
        }

        let actual: u128 = claim.share_weights.iter().map(|&w| u128::from(w)).sum();
        if actual != u128::from(claim.total_share_weight) {
            return Err(ClaimDefect::WeightSumMismatch {
                declared: claim.total_share_weight,
                actual,
            }
            .into());
        }

        claim
            .involved
            .iter()
            .position(|p| p == &claim.payer)
            .ok_or_else(|| ClaimDefect::PayerNotInvolved(claim.payer.clone()).into())
    }

    /// Validate a claim and compute its shares and deltas.
    ///
    /// Every non-payer is debited its share. The payer is credited the sum
    /// of those debits, so the truncation remainder stays on the payer's
    /// side and the batch always nets to zero.
    pub fn plan(&self, ledger: &Ledger, claim: &ExpenseClaim) -> Result<ExpensePlan> {
        let payer_index = self.validate(ledger, claim)?;
        to_signed(claim.total_amount)?;

        let shares = split_shares(
            claim.total_amount,
            &claim.share_weights,
            claim.total_share_weight,
        )?;

        let mut batch = DeltaBatch::new();
        let mut owed_to_payer: i128 = 0;
        for (i, (participant, share)) in claim.involved.iter().zip(&shares).enumerate() {
            if i == payer_index {
                continue;
            }
            let share = to_signed(*share)?;
            owed_to_payer = owed_to_payer
                .checked_add(share)
                .ok_or(SplitError::ArithmeticOverflow("summing shares"))?;
            batch.push(participant.clone(), claim.asset.clone(), -share);
        }
        batch.push(claim.payer.clone(), claim.asset.clone(), owed_to_payer);

        debug!(
            "planned expense by {}: {} {} over {} participants, shares {:?}",
            claim.payer,
            claim.total_amount,
            claim.asset,
            claim.involved.len(),
            shares
        );

        Ok(ExpensePlan {
            shares,
            payer_index,
            total_amount: claim.total_amount,
            batch,
        })
    }

    /// Record an expense: validate, pull the funds into custody, then apply
    /// the deltas. `attached` is the native value sent with the call.
    ///
    /// Nothing is moved if validation fails, and the ledger is untouched if
    /// the transfer fails.
    pub fn record<T: TransferCapability + ?Sized>(
        &self,
        ledger: &mut Ledger,
        transfers: &mut T,
        events: &dyn EventSink,
        claim: &ExpenseClaim,
        attached: u128,
    ) -> Result<ExpenseRecorded> {
        let plan = self.plan(ledger, claim)?;
        let prepared = ledger.prepare(&plan.batch)?;

        transfers.transfer(&TransferRequest {
            asset: claim.asset.clone(),
            from: Endpoint::Participant(claim.payer.clone()),
            to: Endpoint::Custody,
            amount: claim.total_amount,
            attached,
        })?;

        ledger.commit(prepared);

        let event = ExpenseRecorded {
            id: Uuid::new_v4(),
            recorded_at: Utc::now(),
            payer: claim.payer.clone(),
            total_amount: claim.total_amount,
            asset: claim.asset.clone(),
            involved: claim.involved.clone(),
            shares: plan.shares,
        };
        debug!(
            "recorded expense {}: {} paid {} {}",
            event.id, event.payer, event.total_amount, event.asset
        );
        events.publish(LedgerEvent::ExpenseRecorded(event.clone()));
        Ok(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::asset::AssetId;
    use crate::core::party::{ParticipantId, ParticipantSet};
    use crate::engine::events::EventLog;
    use crate::transfer::custody::InMemoryCustody;

    fn p(name: &str) -> ParticipantId {
        ParticipantId::new(name)
    }

    fn setup(names: &[&str]) -> (Ledger, ExpenseRecorder) {
        let set = ParticipantSet::new(names.iter().copied()).unwrap();
        (Ledger::new(set), ExpenseRecorder::new(&EngineConfig::default()))
    }

    fn funded(names: &[&str]) -> InMemoryCustody {
        let mut custody = InMemoryCustody::new();
        for name in names {
            custody.deposit(p(name), AssetId::Native, 1_000_000);
        }
        custody
    }

    #[test]
    fn test_split_shares_truncates() {
        assert_eq!(split_shares(10, &[1, 1, 1], 3).unwrap(), vec![3, 3, 3]);
        assert_eq!(split_shares(0, &[5, 5], 10).unwrap(), vec![0, 0]);
        assert_eq!(split_shares(7, &[0, 7], 7).unwrap(), vec![0, 7]);
    }

    #[test]
    fn test_split_shares_huge_amount_does_not_overflow() {
        let total = u128::MAX;
        let shares = split_shares(total, &[u64::MAX - 1, 1], u64::MAX).unwrap();
        assert!(shares.iter().sum::<u128>() <= total);
    }

    #[test]
    fn test_split_shares_zero_weight_total() {
        assert_eq!(
            split_shares(10, &[], 0),
            Err(SplitError::MalformedClaim(ClaimDefect::ZeroTotalWeight))
        );
    }

    #[test]
    fn test_plan_even_split() {
        let (ledger, recorder) = setup(&["A", "B"]);
        let claim = ExpenseClaim::new(p("A"), 100, AssetId::Native)
            .with_share(p("A"), 1)
            .with_share(p("B"), 1);

        let plan = recorder.plan(&ledger, &claim).unwrap();
        assert_eq!(plan.shares, vec![50, 50]);
        assert_eq!(plan.payer_index, 0);
        assert_eq!(plan.batch.net(&AssetId::Native), Some(0));
    }

    #[test]
    fn test_plan_remainder_stays_with_payer() {
        let (mut ledger, recorder) = setup(&["A", "B", "C"]);
        let claim = ExpenseClaim::new(p("B"), 100, AssetId::Native)
            .with_share(p("A"), 1)
            .with_share(p("B"), 1)
            .with_share(p("C"), 1);

        let plan = recorder.plan(&ledger, &claim).unwrap();
        assert_eq!(plan.shares, vec![33, 33, 33]);
        assert_eq!(plan.remainder(), 1);

        ledger.apply(&plan.batch).unwrap();
        assert_eq!(ledger.balance_of(&p("A"), &AssetId::Native).unwrap(), -33);
        assert_eq!(ledger.balance_of(&p("B"), &AssetId::Native).unwrap(), 66);
        assert_eq!(ledger.balance_of(&p("C"), &AssetId::Native).unwrap(), -33);
        assert!(ledger.is_balanced());
    }

    #[test]
    fn test_plan_remembers_its_total() {
        let (ledger, recorder) = setup(&["A", "B"]);
        let claim = ExpenseClaim::new(p("A"), 7, AssetId::Native)
            .with_share(p("A"), 1)
            .with_share(p("B"), 1);

        let plan = recorder.plan(&ledger, &claim).unwrap();
        assert_eq!(plan.total_amount, 7);
        assert_eq!(plan.shares, vec![3, 3]);
        assert_eq!(plan.remainder(), 1);
    }

    #[test]
    fn test_plan_payer_with_zero_weight() {
        let (mut ledger, recorder) = setup(&["A", "B", "C"]);
        let claim = ExpenseClaim::new(p("A"), 10, AssetId::Native)
            .with_share(p("A"), 0)
            .with_share(p("B"), 1)
            .with_share(p("C"), 2);

        let plan = recorder.plan(&ledger, &claim).unwrap();
        assert_eq!(plan.shares, vec![0, 3, 6]);

        ledger.apply(&plan.batch).unwrap();
        assert_eq!(ledger.balance_of(&p("A"), &AssetId::Native).unwrap(), 9);
        assert!(ledger.is_balanced());
    }

    #[test]
    fn test_validation_defects() {
        let (ledger, recorder) = setup(&["A", "B"]);
        let base = ExpenseClaim::new(p("A"), 100, AssetId::Native);

        let mismatched = ExpenseClaim {
            involved: vec![p("A"), p("B")],
            share_weights: vec![1],
            total_share_weight: 1,
            ..base.clone()
        };
        assert_eq!(
            recorder.validate(&ledger, &mismatched),
            Err(ClaimDefect::LengthMismatch {
                involved: 2,
                weights: 1
            }
            .into())
        );

        assert_eq!(
            recorder.validate(&ledger, &base),
            Err(ClaimDefect::NoParticipants.into())
        );

        let zero_total = base.clone().with_share(p("A"), 0);
        assert_eq!(
            recorder.validate(&ledger, &zero_total),
            Err(ClaimDefect::ZeroTotalWeight.into())
        );

        let bad_sum = base
            .clone()
            .with_share(p("A"), 1)
            .with_share(p("B"), 2)
            .with_total_share_weight(4);
        assert_eq!(
            recorder.validate(&ledger, &bad_sum),
            Err(ClaimDefect::WeightSumMismatch {
                declared: 4,
                actual: 3
            }
            .into())
        );

        let payer_absent = base.clone().with_share(p("B"), 1);
        assert_eq!(
            recorder.validate(&ledger, &payer_absent),
            Err(ClaimDefect::PayerNotInvolved(p("A")).into())
        );

        let duplicated = base
            .clone()
            .with_share(p("A"), 1)
            .with_share(p("A"), 1);
        assert_eq!(
            recorder.validate(&ledger, &duplicated),
            Err(ClaimDefect::DuplicateParticipant(p("A")).into())
        );

        let stranger = base.with_share(p("A"), 1).with_share(p("Z"), 1);
        assert_eq!(
            recorder.validate(&ledger, &stranger),
            Err(SplitError::UnknownParticipant(p("Z")))
        );
    }

    #[test]
    fn test_too_many_participants() {
        let names: Vec<String> = (0..5).map(|i| format!("P{i}")).collect();
        let set = ParticipantSet::new(names.iter().map(String::as_str)).unwrap();
        let ledger = Ledger::new(set);
        let recorder = ExpenseRecorder::new(&EngineConfig {
            max_involved: 4,
            ..EngineConfig::default()
        });

        let claim = names.iter().fold(
            ExpenseClaim::new(p("P0"), 50, AssetId::Native),
            |claim, name| claim.with_share(p(name), 1),
        );
        assert_eq!(
            recorder.validate(&ledger, &claim),
            Err(ClaimDefect::TooManyParticipants { count: 5, max: 4 }.into())
        );
    }

    #[test]
    fn test_record_moves_funds_and_publishes() {
        let (mut ledger, recorder) = setup(&["A", "B"]);
        let mut custody = funded(&["A", "B"]);
        let events = EventLog::new();
        let claim = ExpenseClaim::new(p("A"), 100, AssetId::Native)
            .with_share(p("A"), 1)
            .with_share(p("B"), 1);

        let event = recorder
            .record(&mut ledger, &mut custody, &events, &claim, 100)
            .unwrap();

        assert_eq!(event.shares, vec![50, 50]);
        assert_eq!(custody.held(&AssetId::Native), 100);
        assert_eq!(custody.wallet(&p("A"), &AssetId::Native), 999_900);
        assert_eq!(ledger.balance_of(&p("A"), &AssetId::Native).unwrap(), 50);
        assert_eq!(events.len(), 1);
    }

    #[test]
    fn test_record_transfer_failure_leaves_ledger_untouched() {
        let (mut ledger, recorder) = setup(&["A", "B"]);
        let mut custody = funded(&["A", "B"]);
        let events = EventLog::new();
        let claim = ExpenseClaim::new(p("A"), 100, AssetId::Native)
            .with_share(p("A"), 1)
            .with_share(p("B"), 1);

        let result = recorder.record(&mut ledger, &mut custody, &events, &claim, 99);

        assert!(result.unwrap_err().is_transfer_failure());
        assert_eq!(ledger.balance_of(&p("A"), &AssetId::Native).unwrap(), 0);
        assert_eq!(ledger.balance_of(&p("B"), &AssetId::Native).unwrap(), 0);
        assert_eq!(custody.held(&AssetId::Native), 0);
        assert!(events.is_empty());
    }

    #[test]
    fn test_record_amount_beyond_signed_range_rejected_before_transfer() {
        let (mut ledger, recorder) = setup(&["A", "B"]);
        let mut custody = InMemoryCustody::new();
        custody.deposit(p("A"), AssetId::Native, u128::MAX);
        let events = EventLog::new();
        let claim = ExpenseClaim::new(p("A"), u128::MAX, AssetId::Native)
            .with_share(p("A"), 1)
            .with_share(p("B"), 1);

        let result = recorder.record(&mut ledger, &mut custody, &events, &claim, u128::MAX);

        assert!(matches!(result, Err(SplitError::ArithmeticOverflow(_))));
        assert_eq!(custody.wallet(&p("A"), &AssetId::Native), u128::MAX);
    }
}
