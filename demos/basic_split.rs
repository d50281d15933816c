//! Basic expense splitting and settlement example.
//!
//! Three flatmates share groceries and rent, then settle up using the
//! suggested transfers.

use split_ledger::prelude::*;

fn print_balances(group: &SplitGroup<InMemoryCustody, EventLog>, asset: &AssetId) {
    for participant in group.participants().iter() {
        let balance = group.net_balance(participant, asset).unwrap_or_default();
        println!("  {:<8} {:>8}", participant.as_str(), balance);
    }
    println!();
}

fn main() {
    println!("╔══════════════════════════════════════════╗");
    println!("║  split-ledger: Basic Splitting Example   ║");
    println!("╚══════════════════════════════════════════╝\n");

    let ana = ParticipantId::new("ana");
    let ben = ParticipantId::new("ben");
    let cleo = ParticipantId::new("cleo");
    let native = AssetId::Native;

    let mut custody = InMemoryCustody::new();
    for p in [&ana, &ben, &cleo] {
        custody.deposit(p.clone(), native.clone(), 10_000);
    }

    let group = SplitGroup::new(
        ParticipantSet::new([ana.clone(), ben.clone(), cleo.clone()]).expect("distinct names"),
        custody,
        EventLog::new(),
        &EngineConfig::default(),
    );

    // --- Scenario 1: even split with a remainder ---
    println!("━━━ Scenario 1: Groceries, 100 split three ways ━━━\n");
    let groceries = ExpenseClaim::new(ana.clone(), 100, native.clone())
        .with_share(ana.clone(), 1)
        .with_share(ben.clone(), 1)
        .with_share(cleo.clone(), 1);
    match group.record_expense(&groceries, 100) {
        Ok(event) => println!("Shares: {:?} (1 unit stays with ana)\n", event.shares),
        Err(e) => println!("Rejected: {}\n", e),
    }
    print_balances(&group, &native);

    // --- Scenario 2: weighted split ---
    println!("━━━ Scenario 2: Rent, 3000 weighted 2:1:1 ━━━\n");
    let rent = ExpenseClaim::new(ben.clone(), 3_000, native.clone())
        .with_share(ana.clone(), 2)
        .with_share(ben.clone(), 1)
        .with_share(cleo.clone(), 1);
    if let Err(e) = group.record_expense(&rent, 3_000) {
        println!("Rejected: {}", e);
    }
    print_balances(&group, &native);

    // --- Scenario 3: a claim that fails validation ---
    println!("━━━ Scenario 3: Declared weight total is wrong ━━━\n");
    let sloppy = ExpenseClaim::new(cleo.clone(), 60, native.clone())
        .with_share(cleo.clone(), 1)
        .with_share(ana.clone(), 2)
        .with_total_share_weight(4);
    match group.record_expense(&sloppy, 60) {
        Ok(_) => println!("Unexpectedly accepted"),
        Err(e) => println!("Rejected: {}\n", e),
    }

    // --- Scenario 4: settle up ---
    println!("━━━ Scenario 4: Settling up ━━━\n");
    for request in group.suggest_settlements(&native) {
        let amount = request.amount;
        match group.settle(&request, amount) {
            Ok(s) => println!("  {} pays {} {} to {}", s.debtor, s.amount, s.asset, s.creditor),
            Err(e) => println!("  failed: {}", e),
        }
    }
    println!();
    print_balances(&group, &native);

    println!("Events published: {}", group.events().len());
}
