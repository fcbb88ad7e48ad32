use proptest::prelude::*;
use rust_decimal::Decimal;
use splitter::core::balance::Balances;
use splitter::core::currency::CurrencyCode;
use splitter::core::member::{GroupName, MemberName};
use splitter::core::money::Money;
use splitter::core::transaction::Leg;
use splitter::engine::allocation::{allocate, AllocationError, ShareSpec, SplitRequest};
use splitter::engine::settlement::SettlementEngine;
use splitter::ledger::book::Ledger;
use splitter::ledger::memory::MemoryStore;

const NAMES: [&str; 6] = ["A", "B", "C", "D", "E", "F"];

fn roster(size: usize) -> Vec<MemberName> {
    NAMES[..size].iter().map(|n| MemberName::new(*n)).collect()
}

/// Generate a random member from the full pool.
fn arb_member() -> impl Strategy<Value = MemberName> {
    prop::sample::select(NAMES.to_vec()).prop_map(MemberName::new)
}

/// Generate a positive total (0.01 to 100,000.00).
fn arb_total() -> impl Strategy<Value = Money> {
    (1i64..10_000_000i64).prop_map(Money::from_cents)
}

/// Generate payer entries whose percentages stay within 100%.
fn arb_payers() -> impl Strategy<Value = Vec<ShareSpec>> {
    (
        prop::collection::vec((arb_member(), 0u32..=25u32), 0..4),
        arb_member(),
    )
        .prop_map(|(percent_payers, rest_payer)| {
            let mut specs: Vec<ShareSpec> = percent_payers
                .into_iter()
                .map(|(member, pct)| ShareSpec::percent(member, Decimal::from(pct)))
                .collect();
            specs.push(ShareSpec::rest(rest_payer));
            specs
        })
}

/// Generate receiver entries as fractions of the total, in basis points.
fn arb_receivers() -> impl Strategy<Value = Vec<(MemberName, u32)>> {
    prop::collection::vec((arb_member(), 0u32..=2_500u32), 0..4)
}

/// Generate zero-sum balances over the full pool.
fn arb_balances() -> impl Strategy<Value = Balances> {
    prop::collection::vec(-1_000_000i64..1_000_000i64, NAMES.len() - 1).prop_map(|cents| {
        let last = -cents.iter().sum::<i64>();
        NAMES
            .iter()
            .zip(cents.into_iter().chain(std::iter::once(last)))
            .map(|(name, c)| (MemberName::new(*name), Money::from_cents(c)))
            .collect()
    })
}

fn request(total: Money, payers: Vec<ShareSpec>, receivers: &[(MemberName, u32)], rest: bool) -> SplitRequest {
    let mut request = SplitRequest::new(total).balance_rest(rest);
    request.from = payers;
    for (member, bps) in receivers {
        let cents = total.cents() as i64 * *bps as i64 / 10_000;
        request = request.taken_by(ShareSpec::amount(member.clone(), Money::from_cents(cents)));
    }
    request
}

proptest! {
    // ===================================================================
    // Conservation: both sides of a split equal the total, to the cent.
    // ===================================================================
    #[test]
    fn allocation_conserves_money(
        total in arb_total(),
        payers in arb_payers(),
        receivers in arb_receivers(),
        rest in any::<bool>(),
    ) {
        let roster = roster(NAMES.len());
        let set = allocate(&request(total, payers, &receivers, rest), &roster).unwrap();
        prop_assert_eq!(set.sum_of(Leg::From), total);
        prop_assert_eq!(set.sum_of(Leg::To), total);
        prop_assert!(set.allocations().iter().all(|a| a.amount.is_positive()));
    }

    // ===================================================================
    // An even split never differs by more than one cent between members.
    // ===================================================================
    #[test]
    fn even_split_is_fair(total in arb_total(), size in 1usize..=6) {
        let roster = roster(size);
        let request = SplitRequest::new(total).paid_by(ShareSpec::rest(roster[0].clone()));
        let set = allocate(&request, &roster).unwrap();
        let shares: Vec<i128> = roster.iter().map(|m| set.amount_for(m, Leg::To).cents()).collect();
        let max = *shares.iter().max().unwrap();
        let min = *shares.iter().min().unwrap();
        prop_assert!(max - min <= 1);
    }

    // ===================================================================
    // Payer percentages over 100% always fail, naming the entry that
    // crossed the line.
    // ===================================================================
    #[test]
    fn over_allocation_always_rejected(total in arb_total(), extra in 1u32..200u32) {
        let roster = roster(3);
        let request = SplitRequest::new(total)
            .paid_by(ShareSpec::percent("A", Decimal::from(50)))
            .paid_by(ShareSpec::percent("B", Decimal::from(50 + extra)));
        let err = allocate(&request, &roster).unwrap_err();
        let is_position_two = matches!(err, AllocationError::OverAllocation { position: 2, .. });
        prop_assert!(is_position_two);
    }

    // ===================================================================
    // Settlement zeroes every balance, only debtors pay, only creditors
    // receive, and no more than n-1 payments are needed.
    // ===================================================================
    #[test]
    fn settlement_zeroes_balances(balances in arb_balances()) {
        let plan = SettlementEngine::settle(&balances).unwrap();
        prop_assert!(plan.apply_to(&balances).is_settled());
        prop_assert_eq!(plan.total(), balances.total_outstanding());
        for payment in plan.payments() {
            prop_assert!(payment.amount.is_positive());
            prop_assert!(balances.get(&payment.from).unwrap().is_negative());
            prop_assert!(balances.get(&payment.to).unwrap().is_positive());
        }
        let open = balances.iter().filter(|(_, b)| !b.is_zero()).count();
        prop_assert!(plan.len() <= open.saturating_sub(1));
    }

    // ===================================================================
    // Undo right after a split restores the previous balances exactly.
    // ===================================================================
    #[test]
    fn undo_restores_balances(
        first in arb_total(),
        second in arb_total(),
        payers in arb_payers(),
        receivers in arb_receivers(),
    ) {
        let group = GroupName::new("prop");
        let mut ledger = Ledger::new(MemoryStore::new());
        ledger.create_group(group.clone(), roster(NAMES.len()), CurrencyCode::default()).unwrap();
        let warmup = SplitRequest::new(first).paid_by(ShareSpec::rest("A"));
        ledger.split(&group, &warmup, "warmup").unwrap();

        let before = ledger.balances_of(&group).unwrap();
        ledger.split(&group, &request(second, payers, &receivers, false), "under test").unwrap();
        ledger.undo(&group, None).unwrap();
        prop_assert_eq!(ledger.balances_of(&group).unwrap(), before);
        prop_assert_eq!(ledger.transactions(&group, true).unwrap().len(), 3);
    }
}
