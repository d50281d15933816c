use proptest::prelude::*;
use split_ledger::config::EngineConfig;
use split_ledger::core::asset::AssetId;
use split_ledger::core::claim::{ExpenseClaim, SettlementRequest};
use split_ledger::core::ledger::Ledger;
use split_ledger::core::party::{ParticipantId, ParticipantSet};
use split_ledger::engine::events::EventLog;
use split_ledger::engine::expense::{split_shares, ExpenseRecorder};
use split_ledger::engine::group::SplitGroup;
use split_ledger::transfer::custody::InMemoryCustody;

const NAMES: [&str; 5] = ["A", "B", "C", "D", "E"];

fn participants() -> Vec<ParticipantId> {
    NAMES.iter().map(|n| ParticipantId::new(*n)).collect()
}

/// Generate an asset from a small pool.
fn arb_asset() -> impl Strategy<Value = AssetId> {
    prop::sample::select(vec![
        AssetId::Native,
        AssetId::token("USDC"),
        AssetId::token("DAI"),
    ])
}

/// Generate a well-formed claim: a random subset of participants with
/// weights (payer's may be zero), payer drawn from that subset.
fn arb_claim() -> impl Strategy<Value = ExpenseClaim> {
    (
        prop::sample::subsequence(participants(), 1..=NAMES.len()),
        any::<prop::sample::Index>(),
        0u128..1_000_000u128,
        arb_asset(),
    )
        .prop_flat_map(|(involved, payer_pick, amount, asset)| {
            let n = involved.len();
            (
                Just(involved),
                Just(payer_pick),
                Just(amount),
                Just(asset),
                prop::collection::vec(0u64..20, n),
            )
        })
        .prop_filter_map(
            "total weight must be positive",
            |(involved, payer_pick, amount, asset, weights)| {
                if weights.iter().sum::<u64>() == 0 {
                    return None;
                }
                let payer = payer_pick.get(&involved).clone();
                let claim = involved
                    .into_iter()
                    .zip(weights)
                    .fold(ExpenseClaim::new(payer, amount, asset), |c, (p, w)| {
                        c.with_share(p, w)
                    });
                Some(claim)
            },
        )
}

#[derive(Debug, Clone)]
enum Step {
    Expense(ExpenseClaim),
    Settle(SettlementRequest),
}

fn arb_settle() -> impl Strategy<Value = SettlementRequest> {
    (
        prop::sample::select(participants()),
        prop::sample::select(participants()),
        0u128..500_000u128,
        arb_asset(),
    )
        .prop_map(|(debtor, creditor, amount, asset)| {
            SettlementRequest::new(debtor, creditor, amount, asset)
        })
}

fn arb_steps() -> impl Strategy<Value = Vec<Step>> {
    prop::collection::vec(
        prop_oneof![
            3 => arb_claim().prop_map(Step::Expense),
            2 => arb_settle().prop_map(Step::Settle),
        ],
        1..40,
    )
}

fn rich_group() -> SplitGroup<InMemoryCustody, EventLog> {
    let mut custody = InMemoryCustody::new();
    for p in participants() {
        for asset in [AssetId::Native, AssetId::token("USDC"), AssetId::token("DAI")] {
            custody.deposit(p.clone(), asset.clone(), u64::MAX as u128);
            if !asset.is_native() {
                custody.approve(p.clone(), asset, u64::MAX as u128);
            }
        }
    }
    SplitGroup::new(
        ParticipantSet::new(NAMES).unwrap(),
        custody,
        EventLog::new(),
        &EngineConfig {
            log_events: false,
            ..EngineConfig::default()
        },
    )
}

fn attachment(asset: &AssetId, amount: u128) -> u128 {
    if asset.is_native() {
        amount
    } else {
        0
    }
}

fn all_balances(group: &SplitGroup<InMemoryCustody, EventLog>) -> Vec<(ParticipantId, AssetId, i128)> {
    let mut out = Vec::new();
    for asset in [AssetId::Native, AssetId::token("USDC"), AssetId::token("DAI")] {
        for p in participants() {
            out.push((p.clone(), asset.clone(), group.net_balance(&p, &asset).unwrap()));
        }
    }
    out
}

proptest! {
    // ===================================================================
    // INVARIANT 1: Balances sum to zero per asset after every operation.
    // ===================================================================
    #[test]
    fn ledger_stays_zero_sum(steps in arb_steps()) {
        let group = rich_group();
        for step in &steps {
            let _ = match step {
                Step::Expense(claim) => group
                    .record_expense(claim, attachment(&claim.asset, claim.total_amount))
                    .map(|_| ()),
                Step::Settle(request) => group
                    .settle(request, attachment(&request.asset, request.amount))
                    .map(|_| ()),
            };
            for asset in [AssetId::Native, AssetId::token("USDC"), AssetId::token("DAI")] {
                let sum: i128 = participants()
                    .iter()
                    .map(|p| group.net_balance(p, &asset).unwrap())
                    .sum();
                prop_assert_eq!(sum, 0, "asset {} out of balance", asset);
            }
        }
    }

    // ===================================================================
    // INVARIANT 2: Truncation never creates units.
    //
    // Shares sum to at most the total, and the remainder is less than
    // one unit per involved participant.
    // ===================================================================
    #[test]
    fn shares_never_exceed_total(
        total in 0u128..u64::MAX as u128,
        weights in prop::collection::vec(0u64..1_000, 1..20),
    ) {
        let total_weight: u64 = weights.iter().sum();
        prop_assume!(total_weight > 0);
        let shares = split_shares(total, &weights, total_weight).unwrap();
        let sum: u128 = shares.iter().sum();
        prop_assert!(sum <= total);
        prop_assert!(total - sum < weights.len() as u128);
    }

    // ===================================================================
    // INVARIANT 3: The payer's credit equals everyone else's debit.
    // ===================================================================
    #[test]
    fn payer_credit_matches_other_debits(claim in arb_claim()) {
        let mut ledger = Ledger::new(ParticipantSet::new(NAMES).unwrap());
        let recorder = ExpenseRecorder::new(&EngineConfig::default());
        let plan = recorder.plan(&ledger, &claim).unwrap();
        ledger.apply(&plan.batch).unwrap();

        let payer_balance = ledger.balance_of(&claim.payer, &claim.asset).unwrap();
        let others: i128 = claim
            .involved
            .iter()
            .filter(|p| **p != claim.payer)
            .map(|p| ledger.balance_of(p, &claim.asset).unwrap())
            .sum();
        prop_assert_eq!(payer_balance + others, 0);
        prop_assert_eq!(
            payer_balance as u128 + plan.shares[plan.payer_index] + plan.remainder(),
            claim.total_amount
        );
    }

    // ===================================================================
    // INVARIANT 4: Rejected operations leave no trace.
    // ===================================================================
    #[test]
    fn rejections_have_no_side_effects(steps in arb_steps(), extra in arb_settle()) {
        let group = rich_group();
        for step in &steps {
            let _ = match step {
                Step::Expense(claim) => group
                    .record_expense(claim, attachment(&claim.asset, claim.total_amount))
                    .map(|_| ()),
                Step::Settle(request) => group
                    .settle(request, attachment(&request.asset, request.amount))
                    .map(|_| ()),
            };
        }

        let before = all_balances(&group);
        let events_before = group.events().len();

        // Wrong attachment always fails for the native asset with amount > 0.
        let bad_attachment = if extra.asset.is_native() { extra.amount + 1 } else { 1 };
        prop_assert!(group.settle(&extra, bad_attachment).is_err());

        prop_assert_eq!(all_balances(&group), before);
        prop_assert_eq!(group.events().len(), events_before);
    }

    // ===================================================================
    // INVARIANT 5: Reads are idempotent.
    // ===================================================================
    #[test]
    fn reads_are_idempotent(claim in arb_claim()) {
        let group = rich_group();
        let _ = group.record_expense(&claim, attachment(&claim.asset, claim.total_amount));
        for p in participants() {
            let first = group.net_balance(&p, &claim.asset).unwrap();
            let second = group.net_balance(&p, &claim.asset).unwrap();
            prop_assert_eq!(first, second);
        }
    }

    // ===================================================================
    // INVARIANT 6: Following the suggested settlements clears the asset.
    // ===================================================================
    #[test]
    fn suggestions_clear_balances(claims in prop::collection::vec(arb_claim(), 1..10)) {
        let group = rich_group();
        for claim in &claims {
            group
                .record_expense(claim, attachment(&claim.asset, claim.total_amount))
                .unwrap();
        }
        for asset in [AssetId::Native, AssetId::token("USDC"), AssetId::token("DAI")] {
            for request in group.suggest_settlements(&asset) {
                group
                    .settle(&request, attachment(&asset, request.amount))
                    .unwrap();
            }
            for p in participants() {
                prop_assert_eq!(group.net_balance(&p, &asset).unwrap(), 0);
            }
        }
    }
}
