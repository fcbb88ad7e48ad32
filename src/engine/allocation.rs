//! Allocation engine: resolves a split request into per-member legs.
//!
//! A split names who funded the pot (`from` entries) and, optionally, who
//! took which part of it (`to` entries). Entries are absolute amounts or
//! percentages of the total; payers may also be given without an amount
//! and then share whatever the other payers did not cover.
//!
//! # Algorithm
//!
//! 1. Payers are resolved in the order given. After each entry the exact
//!    cumulative contribution is compared against the total; passing 100%
//!    fails with [`AllocationError::OverAllocation`] naming that entry.
//! 2. The uncovered part of the pot is shared by the amount-less payers, or
//!    fronted by the first payer when every payer named an amount.
//! 3. Explicit receivers are resolved the same way. Whatever is left of the
//!    pot is divided evenly across the whole roster, on top of the explicit
//!    shares. Leftover cents go to members in roster order.
//!
//! Both sides of the resulting [`AllocationSet`] sum exactly to the total.

use crate::core::member::MemberName;
use crate::core::money::Money;
use crate::core::transaction::{Allocation, Leg};
use log::{debug, warn};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// How much of the pot a single entry stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Share {
    /// A literal amount.
    Amount(Money),
    /// A percentage of the total, e.g. `30` for 30%.
    Percent(Decimal),
    /// No amount given. Only meaningful for payers.
    Rest,
}

/// One `--from` or `--to` entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShareSpec {
    pub member: MemberName,
    pub share: Share,
}

impl ShareSpec {
    pub fn amount(member: impl Into<MemberName>, amount: Money) -> Self {
        Self {
            member: member.into(),
            share: Share::Amount(amount),
        }
    }

    pub fn percent(member: impl Into<MemberName>, percent: Decimal) -> Self {
        Self {
            member: member.into(),
            share: Share::Percent(percent),
        }
    }

    pub fn rest(member: impl Into<MemberName>) -> Self {
        Self {
            member: member.into(),
            share: Share::Rest,
        }
    }
}

impl fmt::Display for ShareSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.share {
            Share::Amount(amount) => write!(f, "{}:{}", self.member, amount),
            Share::Percent(percent) => write!(f, "{}:{}%", self.member, percent),
            Share::Rest => write!(f, "{}", self.member),
        }
    }
}

/// A validated `split` command, ready for allocation.
///
/// Entry order is significant: over-allocation is attributed to the entry
/// that crossed 100%.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SplitRequest {
    pub total: Money,
    pub from: Vec<ShareSpec>,
    pub to: Vec<ShareSpec>,
    pub balance_rest: bool,
}

impl SplitRequest {
    pub fn new(total: Money) -> Self {
        Self {
            total,
            from: Vec::new(),
            to: Vec::new(),
            balance_rest: false,
        }
    }

    pub fn paid_by(mut self, spec: ShareSpec) -> Self {
        self.from.push(spec);
        self
    }

    pub fn taken_by(mut self, spec: ShareSpec) -> Self {
        self.to.push(spec);
        self
    }

    pub fn balance_rest(mut self, balance_rest: bool) -> Self {
        self.balance_rest = balance_rest;
        self
    }
}

/// Non-fatal findings while allocating.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AllocationWarning {
    /// Explicit receivers did not take the whole pot and `balance_rest`
    /// was not requested; the leftover was split across all members.
    LeftoverDistributed { leftover: Money, members: usize },
}

impl fmt::Display for AllocationWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AllocationWarning::LeftoverDistributed { leftover, members } => write!(
                f,
                "--to entries leave {} of the pot unassigned; splitting it evenly across all {} members",
                leftover, members
            ),
        }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum AllocationError {
    #[error("at least one --from entry is required")]
    MissingPayer,
    #[error("--from entry #{position} ({member}) brings the payers to {percent}% of the total")]
    OverAllocation {
        position: usize,
        member: MemberName,
        percent: Decimal,
    },
    #[error("`{0}` is not a member of this group")]
    UnknownMember(MemberName),
    #[error("invalid amount: {0}")]
    InvalidAmount(String),
    #[error("cannot split among a group without members")]
    EmptyGroup,
}

/// Fully-determined legs of a split.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllocationSet {
    total: Money,
    allocations: Vec<Allocation>,
    warnings: Vec<AllocationWarning>,
}

impl AllocationSet {
    pub fn total(&self) -> Money {
        self.total
    }

    pub fn allocations(&self) -> &[Allocation] {
        &self.allocations
    }

    pub fn into_allocations(self) -> Vec<Allocation> {
        self.allocations
    }

    pub fn warnings(&self) -> &[AllocationWarning] {
        &self.warnings
    }

    pub fn sum_of(&self, leg: Leg) -> Money {
        self.allocations
            .iter()
            .filter(|a| a.leg == leg)
            .map(|a| a.amount)
            .sum()
    }

    /// Amount `member` carries on `leg`, zero if absent.
    pub fn amount_for(&self, member: &MemberName, leg: Leg) -> Money {
        self.allocations
            .iter()
            .filter(|a| a.leg == leg && &a.member == member)
            .map(|a| a.amount)
            .sum()
    }
}

/// Resolve `request` against `roster`.
///
/// Nothing is recorded here; the caller hands the result to the ledger.
pub fn allocate(
    request: &SplitRequest,
    roster: &[MemberName],
) -> Result<AllocationSet, AllocationError> {
    let total = request.total;
    if !total.is_positive() {
        return Err(AllocationError::InvalidAmount(format!(
            "the total must be positive, got {}",
            total
        )));
    }
    if !total.is_within_limit() {
        return Err(AllocationError::InvalidAmount(format!(
            "the total {} exceeds the largest supported amount {}",
            total,
            Money::MAX
        )));
    }
    if roster.is_empty() {
        return Err(AllocationError::EmptyGroup);
    }
    if request.from.is_empty() {
        return Err(AllocationError::MissingPayer);
    }
    for spec in request.from.iter().chain(&request.to) {
        if !roster.contains(&spec.member) {
            return Err(AllocationError::UnknownMember(spec.member.clone()));
        }
        validate_share(spec)?;
    }

    let mut allocations = resolve_payers(total, &request.from)?;
    let (receivers, warnings) = resolve_receivers(request, roster)?;
    allocations.extend(receivers);

    let set = AllocationSet {
        total,
        allocations,
        warnings,
    };
    debug_assert_eq!(set.sum_of(Leg::From), total);
    debug_assert_eq!(set.sum_of(Leg::To), total);
    debug!(
        "allocated {} across {} legs ({} warnings)",
        total,
        set.allocations.len(),
        set.warnings.len()
    );
    Ok(set)
}

fn validate_share(spec: &ShareSpec) -> Result<(), AllocationError> {
    match spec.share {
        Share::Amount(amount) if amount.is_negative() => Err(AllocationError::InvalidAmount(
            format!("{} has a negative amount {}", spec.member, amount),
        )),
        Share::Amount(amount) if !amount.is_within_limit() => Err(AllocationError::InvalidAmount(
            format!("{} has an amount {} beyond {}", spec.member, amount, Money::MAX),
        )),
        Share::Percent(percent) if percent < Decimal::ZERO => Err(AllocationError::InvalidAmount(
            format!("{} has a negative percentage {}%", spec.member, percent),
        )),
        _ => Ok(()),
    }
}

fn percent_of(total: Money, percent: Decimal, member: &MemberName) -> Result<Money, AllocationError> {
    total.percent(percent).ok_or_else(|| {
        AllocationError::InvalidAmount(format!("{}% for {} is out of range", percent, member))
    })
}

/// Add `amount` to `member`'s entry, creating it at the end if needed.
fn credit(entries: &mut Vec<(MemberName, Money)>, member: &MemberName, amount: Money) {
    match entries.iter_mut().find(|(name, _)| name == member) {
        Some((_, sum)) => *sum += amount,
        None => entries.push((member.clone(), amount)),
    }
}

fn resolve_payers(total: Money, specs: &[ShareSpec]) -> Result<Vec<Allocation>, AllocationError> {
    let pot = total.as_decimal();
    let mut exact = Decimal::ZERO;
    let mut covered = Money::ZERO;
    let mut payers: Vec<(MemberName, Money)> = Vec::with_capacity(specs.len());
    let mut wildcards: Vec<&MemberName> = Vec::new();

    for (index, spec) in specs.iter().enumerate() {
        let (contribution, amount) = match spec.share {
            Share::Amount(amount) => (amount.as_decimal(), amount),
            Share::Percent(percent) => {
                let amount = percent_of(total, percent, &spec.member)?;
                let contribution = pot
                    .checked_mul(percent)
                    .map(|v| v / Decimal::ONE_HUNDRED)
                    .ok_or_else(|| {
                        AllocationError::InvalidAmount(format!(
                            "{}% for {} is out of range",
                            percent, spec.member
                        ))
                    })?;
                (contribution, amount)
            }
            Share::Rest => {
                wildcards.push(&spec.member);
                credit(&mut payers, &spec.member, Money::ZERO);
                continue;
            }
        };

        exact = exact.checked_add(contribution).ok_or_else(|| {
            AllocationError::InvalidAmount(format!("{} takes the payers out of range", spec.member))
        })?;
        if exact > pot {
            return Err(AllocationError::OverAllocation {
                position: index + 1,
                member: spec.member.clone(),
                percent: (exact * Decimal::ONE_HUNDRED / pot).round_dp(2),
            });
        }
        covered += amount;
        credit(&mut payers, &spec.member, amount);
    }

    let uncovered = total - covered;
    if uncovered.is_positive() {
        if wildcards.is_empty() {
            // every payer named an amount: the first one fronted the rest
            credit(&mut payers, &specs[0].member, uncovered);
        } else {
            for (member, share) in wildcards.iter().zip(uncovered.split_evenly(wildcards.len())) {
                credit(&mut payers, member, share);
            }
        }
    }

    Ok(payers
        .into_iter()
        .filter(|(_, amount)| !amount.is_zero())
        .map(|(member, amount)| Allocation::from(member, amount))
        .collect())
}

fn resolve_receivers(
    request: &SplitRequest,
    roster: &[MemberName],
) -> Result<(Vec<Allocation>, Vec<AllocationWarning>), AllocationError> {
    let total = request.total;
    let mut shares = vec![Money::ZERO; roster.len()];
    let mut explicit = Money::ZERO;

    for spec in &request.to {
        let amount = match spec.share {
            Share::Amount(amount) => amount,
            Share::Percent(percent) => percent_of(total, percent, &spec.member)?,
            Share::Rest => {
                return Err(AllocationError::InvalidAmount(format!(
                    "--to {} needs an explicit amount",
                    spec.member
                )))
            }
        };
        let slot = roster
            .iter()
            .position(|m| m == &spec.member)
            .ok_or_else(|| AllocationError::UnknownMember(spec.member.clone()))?;
        shares[slot] += amount;
        explicit += amount;
    }

    if explicit > total {
        return Err(AllocationError::InvalidAmount(format!(
            "--to entries take {}, more than the total {}",
            explicit, total
        )));
    }

    let mut warnings = Vec::new();
    let remaining = total - explicit;
    if remaining.is_positive() {
        if !request.to.is_empty() && !request.balance_rest {
            let warning = AllocationWarning::LeftoverDistributed {
                leftover: remaining,
                members: roster.len(),
            };
            warn!("{}", warning);
            warnings.push(warning);
        }
        for (share, even) in shares.iter_mut().zip(remaining.split_evenly(roster.len())) {
            *share += even;
        }
    }

    let allocations = roster
        .iter()
        .zip(shares)
        .filter(|(_, amount)| !amount.is_zero())
        .map(|(member, amount)| Allocation::to(member.clone(), amount))
        .collect();
    Ok((allocations, warnings))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn roster(names: &[&str]) -> Vec<MemberName> {
        names.iter().map(|n| MemberName::new(*n)).collect()
    }

    fn money(value: Decimal) -> Money {
        Money::from_decimal(value)
    }

    #[test]
    fn test_equal_split_without_receivers() {
        let members = roster(&["alice", "bob"]);
        let request = SplitRequest::new(money(dec!(5))).paid_by(ShareSpec::rest("alice"));

        let set = allocate(&request, &members).unwrap();
        assert_eq!(set.amount_for(&"alice".into(), Leg::From), money(dec!(5)));
        assert_eq!(set.amount_for(&"alice".into(), Leg::To), money(dec!(2.50)));
        assert_eq!(set.amount_for(&"bob".into(), Leg::To), money(dec!(2.50)));
        assert!(set.warnings().is_empty());
    }

    #[test]
    fn test_total_above_limit_rejected() {
        let members = roster(&["alice", "bob"]);
        let huge = Money::from_decimal(dec!(1000000000000000000000000000));
        let request = SplitRequest::new(huge).paid_by(ShareSpec::rest("alice"));
        assert!(matches!(
            allocate(&request, &members),
            Err(AllocationError::InvalidAmount(_))
        ));

        let request = SplitRequest::new(money(dec!(10)))
            .paid_by(ShareSpec::amount("alice", huge))
            .paid_by(ShareSpec::rest("bob"));
        assert!(matches!(
            allocate(&request, &members),
            Err(AllocationError::InvalidAmount(_))
        ));
    }

    #[test]
    fn test_split_at_limit_conserves() {
        let members = roster(&["alice", "bob", "charly"]);
        let request = SplitRequest::new(Money::MAX).paid_by(ShareSpec::rest("alice"));
        let set = allocate(&request, &members).unwrap();
        assert_eq!(set.sum_of(Leg::From), Money::MAX);
        assert_eq!(set.sum_of(Leg::To), Money::MAX);
    }

    #[test]
    fn test_over_allocation_names_offending_entry() {
        let members = roster(&["a", "b", "c"]);
        let request = SplitRequest::new(money(dec!(42)))
            .paid_by(ShareSpec::percent("a", dec!(10)))
            .paid_by(ShareSpec::percent("b", dec!(20)))
            .paid_by(ShareSpec::percent("c", dec!(80)));

        let err = allocate(&request, &members).unwrap_err();
        assert_eq!(
            err,
            AllocationError::OverAllocation {
                position: 3,
                member: "c".into(),
                percent: dec!(110),
            }
        );
    }

    #[test]
    fn test_over_allocation_mixed_absolute_and_percent() {
        let members = roster(&["alice", "bob", "charly"]);
        let request = SplitRequest::new(money(dec!(100)))
            .paid_by(ShareSpec::amount("alice", money(dec!(90))))
            .paid_by(ShareSpec::amount("bob", money(dec!(20))))
            .paid_by(ShareSpec::percent("charly", dec!(10)));

        match allocate(&request, &members) {
            Err(AllocationError::OverAllocation { position, member, .. }) => {
                assert_eq!(position, 2);
                assert_eq!(member.as_str(), "bob");
            }
            other => panic!("expected over-allocation, got {:?}", other),
        }
    }

    #[test]
    fn test_exactly_hundred_percent_is_fine() {
        let members = roster(&["a", "b"]);
        let request = SplitRequest::new(money(dec!(10)))
            .paid_by(ShareSpec::percent("a", dec!(60)))
            .paid_by(ShareSpec::percent("b", dec!(40)));
        let set = allocate(&request, &members).unwrap();
        assert_eq!(set.amount_for(&"a".into(), Leg::From), money(dec!(6)));
        assert_eq!(set.amount_for(&"b".into(), Leg::From), money(dec!(4)));
    }

    #[test]
    fn test_balance_rest_adds_on_top_of_explicit_share() {
        let members = roster(&["fred", "george", "jenny"]);
        let request = SplitRequest::new(money(dec!(20)))
            .paid_by(ShareSpec::rest("george"))
            .taken_by(ShareSpec::amount("fred", money(dec!(3.60))))
            .balance_rest(true);

        let set = allocate(&request, &members).unwrap();
        // 16.40 / 3 = 5.47, 5.47, 5.46 in roster order
        assert_eq!(set.amount_for(&"fred".into(), Leg::To), money(dec!(9.07)));
        assert_eq!(set.amount_for(&"george".into(), Leg::To), money(dec!(5.47)));
        assert_eq!(set.amount_for(&"jenny".into(), Leg::To), money(dec!(5.46)));
        assert_eq!(set.sum_of(Leg::To), money(dec!(20)));
        assert!(set.warnings().is_empty());
    }

    #[test]
    fn test_partial_receivers_without_balance_rest_warn() {
        let members = roster(&["fred", "george", "jenny"]);
        let request = SplitRequest::new(money(dec!(20)))
            .paid_by(ShareSpec::rest("george"))
            .taken_by(ShareSpec::amount("fred", money(dec!(3.60))));

        let set = allocate(&request, &members).unwrap();
        assert_eq!(
            set.warnings(),
            &[AllocationWarning::LeftoverDistributed {
                leftover: money(dec!(16.40)),
                members: 3,
            }]
        );
        assert_eq!(set.sum_of(Leg::To), money(dec!(20)));
    }

    #[test]
    fn test_first_payer_fronts_uncovered_part() {
        let members = roster(&["fred", "jenny", "george"]);
        let request = SplitRequest::new(money(dec!(20)))
            .paid_by(ShareSpec::amount("fred", money(dec!(3.5))))
            .paid_by(ShareSpec::percent("jenny", dec!(30)));

        let set = allocate(&request, &members).unwrap();
        assert_eq!(set.amount_for(&"fred".into(), Leg::From), money(dec!(14)));
        assert_eq!(set.amount_for(&"jenny".into(), Leg::From), money(dec!(6)));
        assert_eq!(set.amount_for(&"fred".into(), Leg::To), money(dec!(6.67)));
        assert_eq!(set.amount_for(&"jenny".into(), Leg::To), money(dec!(6.67)));
        assert_eq!(set.amount_for(&"george".into(), Leg::To), money(dec!(6.66)));
    }

    #[test]
    fn test_wildcard_payers_share_remainder() {
        let members = roster(&["alice", "bob", "charly"]);
        let request = SplitRequest::new(money(dec!(100)))
            .paid_by(ShareSpec::amount("alice", money(dec!(12))))
            .paid_by(ShareSpec::rest("bob"))
            .paid_by(ShareSpec::rest("charly"));

        let set = allocate(&request, &members).unwrap();
        assert_eq!(set.amount_for(&"bob".into(), Leg::From), money(dec!(44)));
        assert_eq!(set.amount_for(&"charly".into(), Leg::From), money(dec!(44)));
        assert_eq!(set.sum_of(Leg::From), money(dec!(100)));
    }

    #[test]
    fn test_missing_payer() {
        let members = roster(&["a"]);
        let request = SplitRequest::new(money(dec!(1)));
        assert_eq!(allocate(&request, &members), Err(AllocationError::MissingPayer));
    }

    #[test]
    fn test_unknown_member() {
        let members = roster(&["a"]);
        let request = SplitRequest::new(money(dec!(1)))
            .paid_by(ShareSpec::rest("a"))
            .taken_by(ShareSpec::amount("zed", money(dec!(1))));
        assert_eq!(
            allocate(&request, &members),
            Err(AllocationError::UnknownMember("zed".into()))
        );
    }

    #[test]
    fn test_negative_amounts_rejected() {
        let members = roster(&["a", "b"]);
        let request = SplitRequest::new(money(dec!(10)))
            .paid_by(ShareSpec::amount("a", money(dec!(-1))));
        assert!(matches!(
            allocate(&request, &members),
            Err(AllocationError::InvalidAmount(_))
        ));

        let request = SplitRequest::new(money(dec!(10)))
            .paid_by(ShareSpec::percent("a", dec!(-5)));
        assert!(matches!(
            allocate(&request, &members),
            Err(AllocationError::InvalidAmount(_))
        ));

        let request = SplitRequest::new(money(dec!(0))).paid_by(ShareSpec::rest("a"));
        assert!(matches!(
            allocate(&request, &members),
            Err(AllocationError::InvalidAmount(_))
        ));
    }

    #[test]
    fn test_receivers_exceeding_total_rejected() {
        let members = roster(&["a", "b"]);
        let request = SplitRequest::new(money(dec!(10)))
            .paid_by(ShareSpec::rest("a"))
            .taken_by(ShareSpec::amount("a", money(dec!(6))))
            .taken_by(ShareSpec::percent("b", dec!(50)));
        assert!(matches!(
            allocate(&request, &members),
            Err(AllocationError::InvalidAmount(_))
        ));
    }

    #[test]
    fn test_receiver_without_amount_rejected() {
        let members = roster(&["a", "b"]);
        let request = SplitRequest::new(money(dec!(10)))
            .paid_by(ShareSpec::rest("a"))
            .taken_by(ShareSpec::rest("b"));
        assert!(matches!(
            allocate(&request, &members),
            Err(AllocationError::InvalidAmount(_))
        ));
    }

    #[test]
    fn test_fully_assigned_receivers_need_no_rest() {
        let members = roster(&["a", "b", "c"]);
        let request = SplitRequest::new(money(dec!(10)))
            .paid_by(ShareSpec::rest("a"))
            .taken_by(ShareSpec::amount("b", money(dec!(4))))
            .taken_by(ShareSpec::percent("c", dec!(60)));
        let set = allocate(&request, &members).unwrap();
        assert_eq!(set.amount_for(&"a".into(), Leg::To), Money::ZERO);
        assert_eq!(set.amount_for(&"c".into(), Leg::To), money(dec!(6)));
        assert!(set.warnings().is_empty());
    }

    #[test]
    fn test_empty_group() {
        let request = SplitRequest::new(money(dec!(1))).paid_by(ShareSpec::rest("a"));
        assert_eq!(allocate(&request, &[]), Err(AllocationError::EmptyGroup));
    }

    #[test]
    fn test_share_spec_display() {
        assert_eq!(ShareSpec::amount("a", money(dec!(3.5))).to_string(), "a:3.50");
        assert_eq!(ShareSpec::percent("b", dec!(30)).to_string(), "b:30%");
        assert_eq!(ShareSpec::rest("c").to_string(), "c");
    }
}
