//! A weekend trip, start to finish.
//!
//! Four friends share groceries, a cabin and fuel, fix a mistake with
//! undo, and settle up with as few transfers as possible.

use rust_decimal_macros::dec;
use splitter::core::currency::CurrencyCode;
use splitter::core::member::{GroupName, MemberName};
use splitter::core::money::Money;
use splitter::engine::allocation::{ShareSpec, SplitRequest};
use splitter::error::Error;
use splitter::ledger::book::Ledger;
use splitter::ledger::memory::MemoryStore;

fn main() -> Result<(), Error> {
    println!("╔══════════════════════════════════════════╗");
    println!("║    splitter: Weekend Trip Example        ║");
    println!("╚══════════════════════════════════════════╝\n");

    let mut ledger = Ledger::new(MemoryStore::new());
    let trip = GroupName::new("cabin");
    let eur = CurrencyCode::new("EUR");
    let names = ["alice", "bob", "charly", "django"];
    ledger.create_group(
        trip.clone(),
        names.iter().map(|n| MemberName::new(*n)).collect(),
        eur.clone(),
    )?;

    // --- Expenses ---
    println!("━━━ Expenses ━━━\n");

    // Alice books the cabin; everybody shares equally.
    let cabin = SplitRequest::new(Money::from_cents(32_000)).paid_by(ShareSpec::rest("alice"));
    ledger.split(&trip, &cabin, "cabin")?;

    // Groceries: Bob pays 40%, Charly the rest; Django skipped breakfast.
    let groceries = SplitRequest::new(Money::from_cents(8_745))
        .paid_by(ShareSpec::percent("bob", dec!(40)))
        .paid_by(ShareSpec::rest("charly"))
        .taken_by(ShareSpec::amount("django", Money::from_cents(1_200)))
        .balance_rest(true);
    let recorded = ledger.split(&trip, &groceries, "groceries")?;
    for warning in &recorded.warnings {
        println!("warning: {}", warning);
    }

    // A fuel receipt typed in twice; the second one gets undone.
    let fuel = SplitRequest::new(Money::from_cents(6_390)).paid_by(ShareSpec::rest("django"));
    ledger.split(&trip, &fuel, "fuel")?;
    ledger.split(&trip, &fuel, "fuel (again)")?;
    let undone = ledger.undo(&trip, None)?;
    println!("Undid {} {:?}", undone.id(), undone.memo().unwrap_or(""));

    // Bob hands Alice some cash.
    ledger.pay(&trip, MemberName::new("bob"), MemberName::new("alice"), Money::from_cents(5_000))?;

    for tx in ledger.transactions(&trip, true)? {
        let state = if tx.is_active() { "" } else { " (reversed)" };
        println!(
            "  {} {:<6} {:>10} {}{}",
            tx.id(),
            tx.kind(),
            eur.format(tx.total()),
            tx.memo().unwrap_or(""),
            state
        );
    }
    println!();

    // --- Balances ---
    println!("━━━ Balances ━━━\n");
    let balances = ledger.balances_of(&trip)?;
    for (member, balance) in balances.iter() {
        let status = if balance.is_positive() {
            "is owed"
        } else if balance.is_negative() {
            "owes"
        } else {
            "is even"
        };
        println!("  {:<8} {:>10}  {}", member, eur.format(balance), status);
    }
    println!();

    // --- Settlement ---
    let plan = ledger.settle_up(&trip)?;
    println!("{}", plan);

    assert!(ledger.balances_of(&trip)?.is_settled());
    println!("Everyone is even again.");
    Ok(())
}
