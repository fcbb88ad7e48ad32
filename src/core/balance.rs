use crate::core::member::MemberName;
use crate::core::money::Money;
use crate::core::transaction::{Transaction, TransactionId};
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};

/// Running balance of each member of a group, in roster order.
///
/// A positive balance means the group owes the member (net creditor).
/// A negative balance means the member owes the group (net debtor).
///
/// Balances are derived, never stored: they are folded from the active
/// transactions of a group every time they are needed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Balances {
    entries: Vec<(MemberName, Money)>,
}

impl Balances {
    /// All members of `roster` at zero.
    pub fn new(roster: &[MemberName]) -> Self {
        Self {
            entries: roster.iter().map(|m| (m.clone(), Money::ZERO)).collect(),
        }
    }

    /// Fold the active transactions over `roster`.
    ///
    /// Reversed transactions contribute nothing. Allocations of members that
    /// are no longer on the roster are dropped.
    pub fn from_transactions<'a>(
        roster: &[MemberName],
        transactions: impl IntoIterator<Item = &'a Transaction>,
    ) -> Self {
        Self::from_history(roster, transactions, &[])
    }

    /// Like [`Balances::from_transactions`], but a member with a
    /// [`Departure`] only counts legs of transactions recorded after it.
    /// From-legs gain, to-legs lose.
    pub fn from_history<'a>(
        roster: &[MemberName],
        transactions: impl IntoIterator<Item = &'a Transaction>,
        departures: &[Departure],
    ) -> Self {
        let mut balances = Self::new(roster);
        for tx in transactions.into_iter().filter(|tx| tx.is_active()) {
            for allocation in tx.allocations() {
                let forgotten = departures
                    .iter()
                    .any(|d| d.member == allocation.member && tx.id() < d.since);
                if !forgotten {
                    balances.adjust(&allocation.member, allocation.signed_amount());
                }
            }
        }
        balances
    }

    /// Shift `member`'s balance by `delta`. Returns `false` if the member is
    /// not on the roster.
    pub fn adjust(&mut self, member: &MemberName, delta: Money) -> bool {
        match self.entries.iter_mut().find(|(name, _)| name == member) {
            Some((_, balance)) => {
                *balance += delta;
                true
            }
            None => false,
        }
    }

    /// Balance of `member`, or `None` if not on the roster.
    pub fn get(&self, member: &MemberName) -> Option<Money> {
        self.entries
            .iter()
            .find(|(name, _)| name == member)
            .map(|(_, balance)| *balance)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&MemberName, Money)> {
        self.entries.iter().map(|(name, balance)| (name, *balance))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sum of all balances. Zero for any group whose roster never lost a
    /// member with an open balance.
    pub fn residual(&self) -> Money {
        self.entries.iter().map(|(_, b)| *b).sum()
    }

    /// Verify that credits and debits cancel out.
    pub fn is_balanced(&self) -> bool {
        self.residual().is_zero()
    }

    /// True when every balance is exactly zero.
    pub fn is_settled(&self) -> bool {
        self.entries.iter().all(|(_, b)| b.is_zero())
    }

    /// Total owed to creditors (equals total owed by debtors when balanced).
    pub fn total_outstanding(&self) -> Money {
        self.entries
            .iter()
            .map(|(_, b)| *b)
            .filter(|b| b.is_positive())
            .sum()
    }
}

/// Serialized as a JSON object in roster order: `{"fred": "7.33", ...}`.
impl Serialize for Balances {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (name, balance) in &self.entries {
            map.serialize_entry(name, balance)?;
        }
        map.end()
    }
}

/// A member taken off a roster. Their legs in transactions with an id below
/// `since` no longer count toward their balance, even after rejoining.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Departure {
    pub member: MemberName,
    pub since: TransactionId,
}

impl FromIterator<(MemberName, Money)> for Balances {
    fn from_iter<T: IntoIterator<Item = (MemberName, Money)>>(iter: T) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::member::GroupName;
    use crate::core::transaction::{Allocation, TransactionId, TransactionKind};
    use chrono::Utc;

    fn roster() -> Vec<MemberName> {
        vec![MemberName::new("A"), MemberName::new("B"), MemberName::new("C")]
    }

    fn pay(id: u64, from: &str, to: &str, cents: i64) -> Transaction {
        Transaction::new(
            TransactionId::new(id),
            GroupName::new("g"),
            TransactionKind::Pay,
            Utc::now(),
            vec![
                Allocation::from(MemberName::new(from), Money::from_cents(cents)),
                Allocation::to(MemberName::new(to), Money::from_cents(cents)),
            ],
        )
    }

    #[test]
    fn test_balances_basic() {
        let txs = vec![pay(1, "A", "B", 10000)];
        let balances = Balances::from_transactions(&roster(), &txs);

        assert_eq!(balances.get(&MemberName::new("A")), Some(Money::from_cents(10000)));
        assert_eq!(balances.get(&MemberName::new("B")), Some(Money::from_cents(-10000)));
        assert_eq!(balances.get(&MemberName::new("C")), Some(Money::ZERO));
        assert!(balances.is_balanced());
    }

    #[test]
    fn test_balances_circular_cancels() {
        let txs = vec![
            pay(1, "A", "B", 100),
            pay(2, "B", "C", 100),
            pay(3, "C", "A", 100),
        ];
        let balances = Balances::from_transactions(&roster(), &txs);
        assert!(balances.is_settled());
        assert_eq!(balances.total_outstanding(), Money::ZERO);
    }

    #[test]
    fn test_reversed_transactions_excluded() {
        let mut reversed = pay(2, "B", "A", 500);
        reversed.mark_reversed(Utc::now());
        let txs = vec![pay(1, "A", "B", 100), reversed];
        let balances = Balances::from_transactions(&roster(), &txs);
        assert_eq!(balances.get(&MemberName::new("A")), Some(Money::from_cents(100)));
    }

    #[test]
    fn test_off_roster_members_dropped() {
        let txs = vec![pay(1, "A", "Z", 100)];
        let balances = Balances::from_transactions(&roster(), &txs);
        assert_eq!(balances.get(&MemberName::new("Z")), None);
        assert_eq!(balances.residual(), Money::from_cents(100));
        assert!(!balances.is_balanced());
    }

    #[test]
    fn test_departed_member_history_forgotten() {
        let txs = vec![pay(1, "A", "B", 500), pay(3, "A", "C", 200)];
        let departures = vec![Departure {
            member: MemberName::new("A"),
            since: TransactionId::new(2),
        }];
        let balances = Balances::from_history(&roster(), &txs, &departures);
        assert_eq!(balances.get(&MemberName::new("A")), Some(Money::from_cents(200)));
        assert_eq!(balances.get(&MemberName::new("B")), Some(Money::from_cents(-500)));
    }

    #[test]
    fn test_serializes_as_ordered_object() {
        let balances: Balances = vec![
            (MemberName::new("fred"), Money::from_cents(733)),
            (MemberName::new("alice"), Money::from_cents(-733)),
        ]
        .into_iter()
        .collect();
        assert_eq!(
            serde_json::to_string(&balances).unwrap(),
            r#"{"fred":"7.33","alice":"-7.33"}"#
        );
    }

    #[test]
    fn test_roster_order_kept() {
        let balances = Balances::new(&roster());
        let names: Vec<&str> = balances.iter().map(|(m, _)| m.as_str()).collect();
        assert_eq!(names, vec!["A", "B", "C"]);
    }
}
