//! Random group activity for stress testing and benchmarks.
//!
//! Generates a [`Session`] with funded wallets followed by a random mix of
//! expenses and settlement attempts. Settlement attempts are drawn blindly,
//! so a share of them is expected to be rejected.

use crate::config::EngineConfig;
use crate::core::asset::AssetId;
use crate::core::claim::{ExpenseClaim, SettlementRequest};
use crate::core::party::{ParticipantId, ParticipantSet};
use crate::session::{Operation, Session};
use rand::seq::SliceRandom;
use rand::Rng;

/// Configuration for generating random group activity.
#[derive(Debug, Clone)]
pub struct ActivityConfig {
    /// Number of participants in the group.
    pub participant_count: usize,
    /// Assets to use.
    pub assets: Vec<AssetId>,
    /// Number of expense/settle operations after funding.
    pub operation_count: usize,
    /// Largest single expense or settlement amount.
    pub max_amount: u128,
    /// Largest share weight given to one participant.
    pub max_weight: u64,
    /// Fraction of operations that are settlement attempts.
    pub settle_ratio: f64,
    /// Most participants one expense may involve. Match the engine's
    /// `max_involved` so generated expenses are accepted.
    pub max_involved: usize,
}

impl Default for ActivityConfig {
    fn default() -> Self {
        Self {
            participant_count: 5,
            assets: vec![AssetId::Native],
            operation_count: 50,
            max_amount: 100_000,
            max_weight: 5,
            settle_ratio: 0.3,
            max_involved: EngineConfig::default().max_involved,
        }
    }
}

/// Participant names used by generated sessions.
pub fn participant_names(count: usize) -> Vec<ParticipantId> {
    (0..count)
        .map(|i| ParticipantId::new(format!("P-{:03}", i)))
        .collect()
}

/// Generate a random session. Returns `None` when the config cannot form a
/// valid group (no participants or no assets).
pub fn generate_session(config: &ActivityConfig) -> Option<Session> {
    if config.assets.is_empty() || config.max_amount == 0 {
        return None;
    }
    let participants = participant_names(config.participant_count);
    let set = ParticipantSet::new(participants.clone()).ok()?;
    let mut rng = rand::thread_rng();
    let mut session = Session::new(set);

    let float = config
        .max_amount
        .saturating_mul(config.operation_count.max(1) as u128);
    for participant in &participants {
        for asset in &config.assets {
            session.push(Operation::Deposit {
                participant: participant.clone(),
                asset: asset.clone(),
                amount: float,
            });
            if !asset.is_native() {
                session.push(Operation::Approve {
                    participant: participant.clone(),
                    asset: asset.clone(),
                    amount: float,
                });
            }
        }
    }

    for _ in 0..config.operation_count {
        let asset = config.assets[rng.gen_range(0..config.assets.len())].clone();
        let amount = rng.gen_range(1..=config.max_amount);

        if participants.len() > 1 && rng.gen_bool(config.settle_ratio.clamp(0.0, 1.0)) {
            let pair: Vec<&ParticipantId> = participants.choose_multiple(&mut rng, 2).collect();
            session.push(Operation::Settle {
                request: SettlementRequest::new(pair[0].clone(), pair[1].clone(), amount, asset),
                attached: None,
            });
            continue;
        }

        let count = rng.gen_range(1..=participants.len().min(config.max_involved.max(1)));
        let involved: Vec<&ParticipantId> = participants.choose_multiple(&mut rng, count).collect();
        let payer = involved[rng.gen_range(0..involved.len())].clone();

        let mut claim = ExpenseClaim::new(payer, amount, asset);
        for participant in involved {
            claim = claim.with_share(participant.clone(), rng.gen_range(0..=config.max_weight));
        }
        if claim.total_share_weight == 0 {
            // Every weight came out zero; give the payer the whole share.
            let payer_slot = claim
                .involved
                .iter()
                .position(|p| p == &claim.payer)
                .unwrap_or(0);
            claim.share_weights[payer_slot] = 1;
            claim.total_share_weight = 1;
        }
        session.push(Operation::Expense {
            claim,
            attached: None,
        });
    }

    Some(session)
}
