//! Random scenario generation.
//!
//! Produces rosters, split requests and zero-sum balance sets so the
//! allocation and settlement engines can be exercised at sizes no
//! hand-written fixture reaches.

use crate::core::balance::Balances;
use crate::core::currency::CurrencyCode;
use crate::core::member::{GroupName, MemberName};
use crate::core::money::Money;
use crate::engine::allocation::{ShareSpec, SplitRequest};
use crate::error::Result;
use crate::ledger::book::Ledger;
use crate::ledger::store::Store;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rust_decimal::Decimal;

/// Configuration for a random group.
#[derive(Debug, Clone)]
pub struct ScenarioConfig {
    /// Number of members in the group.
    pub member_count: usize,
    /// Number of splits to generate.
    pub split_count: usize,
    /// Smallest split total, in cents.
    pub min_cents: i64,
    /// Largest split total, in cents.
    pub max_cents: i64,
    /// Fixed seed for reproducible runs.
    pub seed: Option<u64>,
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self {
            member_count: 6,
            split_count: 20,
            min_cents: 100,
            max_cents: 50_000,
            seed: None,
        }
    }
}

/// A roster and the expenses shared within it.
#[derive(Debug, Clone)]
pub struct Scenario {
    pub roster: Vec<MemberName>,
    pub splits: Vec<SplitRequest>,
}

fn rng_for(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

pub fn roster(member_count: usize) -> Vec<MemberName> {
    (0..member_count)
        .map(|i| MemberName::new(format!("member-{:03}", i)))
        .collect()
}

/// Generate a scenario whose every split is valid for its roster.
pub fn generate_scenario(config: &ScenarioConfig) -> Scenario {
    let mut rng = rng_for(config.seed);
    let roster = roster(config.member_count.max(1));
    let splits = (0..config.split_count)
        .map(|_| random_split(&mut rng, &roster, config))
        .collect();
    Scenario { roster, splits }
}

fn random_split(rng: &mut StdRng, roster: &[MemberName], config: &ScenarioConfig) -> SplitRequest {
    let low = config.min_cents.max(1);
    let cents = rng.gen_range(low..=config.max_cents.max(low));
    let total = Money::from_cents(cents);
    let mut request = SplitRequest::new(total);

    // up to three payers: some with a percentage, the last covers the rest
    let payers = rng.gen_range(1..=roster.len().min(3));
    let mut remaining_percent = 100u32;
    for i in 0..payers {
        let member = roster[rng.gen_range(0..roster.len())].clone();
        if i + 1 == payers {
            request = request.paid_by(ShareSpec::rest(member));
        } else {
            let percent = rng.gen_range(0..=remaining_percent / 2);
            remaining_percent -= percent;
            request = request.paid_by(ShareSpec::percent(member, Decimal::from(percent)));
        }
    }

    if rng.gen_bool(0.3) {
        let member = roster[rng.gen_range(0..roster.len())].clone();
        let share = Money::from_cents(rng.gen_range(0..=cents / 2));
        request = request
            .taken_by(ShareSpec::amount(member, share))
            .balance_rest(rng.gen_bool(0.5));
    }
    request
}

/// Random balances over `member_count` members that sum to exactly zero.
pub fn random_balances(member_count: usize, max_cents: i64, seed: Option<u64>) -> Balances {
    let mut rng = rng_for(seed);
    let roster = roster(member_count);
    let mut entries: Vec<(MemberName, Money)> = Vec::with_capacity(roster.len());
    let mut sum = 0i64;
    for (i, member) in roster.into_iter().enumerate() {
        let cents = if i + 1 == member_count {
            -sum
        } else {
            rng.gen_range(-max_cents..=max_cents)
        };
        sum += cents;
        entries.push((member, Money::from_cents(cents)));
    }
    entries.into_iter().collect()
}

/// Create `group` in `ledger` and record every split of a fresh scenario.
pub fn populate<S: Store>(
    ledger: &mut Ledger<S>,
    group: &GroupName,
    config: &ScenarioConfig,
) -> Result<Scenario> {
    let scenario = generate_scenario(config);
    ledger.create_group(group.clone(), scenario.roster.clone(), CurrencyCode::default())?;
    for (i, split) in scenario.splits.iter().enumerate() {
        ledger.split(group, split, format!("expense-{}", i))?;
    }
    Ok(scenario)
}
