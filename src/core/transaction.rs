use crate::core::member::{GroupName, MemberName};
use crate::core::money::Money;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Store-wide, strictly increasing transaction identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransactionId(u64);

impl TransactionId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn value(self) -> u64 {
        self.0
    }

    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    /// Group creation. Carries no allocations.
    Create,
    /// A shared expense resolved by the allocation engine.
    Split,
    /// A direct payment between two members.
    Pay,
    /// A payment emitted by the settlement engine.
    Settle,
}

impl TransactionKind {
    /// Kinds that `undo` may reverse.
    pub fn is_undoable(self) -> bool {
        !matches!(self, TransactionKind::Settle)
    }
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TransactionKind::Create => "create",
            TransactionKind::Split => "split",
            TransactionKind::Pay => "pay",
            TransactionKind::Settle => "settle",
        };
        f.write_str(name)
    }
}

/// Which side of a transaction an allocation sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Leg {
    /// Money the member put in (fronted, paid).
    From,
    /// Money the member took out (consumed, received).
    To,
}

/// One member's share of a transaction. `amount` is never negative.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Allocation {
    pub member: MemberName,
    pub leg: Leg,
    pub amount: Money,
}

impl Allocation {
    pub fn from(member: MemberName, amount: Money) -> Self {
        Self {
            member,
            leg: Leg::From,
            amount,
        }
    }

    pub fn to(member: MemberName, amount: Money) -> Self {
        Self {
            member,
            leg: Leg::To,
            amount,
        }
    }

    /// Effect on the member's balance: positive for a from-leg.
    pub fn signed_amount(&self) -> Money {
        match self.leg {
            Leg::From => self.amount,
            Leg::To => -self.amount,
        }
    }
}

/// Soft-delete marker. Reversed transactions stay in the log for audit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum Status {
    Active,
    Reversed { at: DateTime<Utc> },
}

/// An atomic, append-only ledger entry.
///
/// For every kind except [`TransactionKind::Create`] the from-legs and
/// the to-legs each sum to `total`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    id: TransactionId,
    group: GroupName,
    kind: TransactionKind,
    recorded_at: DateTime<Utc>,
    total: Money,
    memo: Option<String>,
    allocations: Vec<Allocation>,
    status: Status,
}

impl Transaction {
    pub fn new(
        id: TransactionId,
        group: GroupName,
        kind: TransactionKind,
        recorded_at: DateTime<Utc>,
        allocations: Vec<Allocation>,
    ) -> Self {
        let total = allocations
            .iter()
            .filter(|a| a.leg == Leg::From)
            .map(|a| a.amount)
            .sum();
        Self {
            id,
            group,
            kind,
            recorded_at,
            total,
            memo: None,
            allocations,
            status: Status::Active,
        }
    }

    /// Attach a memo, e.g. the name of the expense.
    pub fn with_memo(mut self, memo: impl Into<String>) -> Self {
        self.memo = Some(memo.into());
        self
    }

    // --- Accessors ---

    pub fn id(&self) -> TransactionId {
        self.id
    }

    pub fn group(&self) -> &GroupName {
        &self.group
    }

    pub fn kind(&self) -> TransactionKind {
        self.kind
    }

    pub fn recorded_at(&self) -> DateTime<Utc> {
        self.recorded_at
    }

    pub fn total(&self) -> Money {
        self.total
    }

    pub fn memo(&self) -> Option<&str> {
        self.memo.as_deref()
    }

    pub fn allocations(&self) -> &[Allocation] {
        &self.allocations
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn is_active(&self) -> bool {
        self.status == Status::Active
    }

    pub fn mark_reversed(&mut self, at: DateTime<Utc>) {
        self.status = Status::Reversed { at };
    }

    pub fn sum_of(&self, leg: Leg) -> Money {
        self.allocations
            .iter()
            .filter(|a| a.leg == leg)
            .map(|a| a.amount)
            .sum()
    }

    /// Conservation check: money in equals money out.
    pub fn is_conserved(&self) -> bool {
        self.sum_of(Leg::From) == self.sum_of(Leg::To)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pay(amount: i64) -> Transaction {
        Transaction::new(
            TransactionId::new(7),
            GroupName::new("spezi"),
            TransactionKind::Pay,
            Utc::now(),
            vec![
                Allocation::from(MemberName::new("fred"), Money::from_cents(amount)),
                Allocation::to(MemberName::new("jenny"), Money::from_cents(amount)),
            ],
        )
    }

    #[test]
    fn test_total_is_sum_of_from_legs() {
        let tx = pay(1250);
        assert_eq!(tx.total(), Money::from_cents(1250));
        assert!(tx.is_conserved());
        assert!(tx.is_active());
    }

    #[test]
    fn test_signed_amounts() {
        let tx = pay(300);
        let signed: Vec<Money> = tx.allocations().iter().map(|a| a.signed_amount()).collect();
        assert_eq!(signed, vec![Money::from_cents(300), Money::from_cents(-300)]);
    }

    #[test]
    fn test_mark_reversed_keeps_record() {
        let mut tx = pay(100).with_memo("beer");
        let at = Utc::now();
        tx.mark_reversed(at);
        assert_eq!(tx.status(), Status::Reversed { at });
        assert_eq!(tx.memo(), Some("beer"));
        assert_eq!(tx.allocations().len(), 2);
    }

    #[test]
    fn test_only_settle_is_not_undoable() {
        assert!(TransactionKind::Create.is_undoable());
        assert!(TransactionKind::Split.is_undoable());
        assert!(TransactionKind::Pay.is_undoable());
        assert!(!TransactionKind::Settle.is_undoable());
    }

    #[test]
    fn test_id_display_and_next() {
        let id = TransactionId::new(41);
        assert_eq!(id.next(), TransactionId::new(42));
        assert_eq!(id.to_string(), "#41");
    }
}
