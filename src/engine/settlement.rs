use crate::core::balance::Balances;
use crate::core::member::MemberName;
use crate::core::money::Money;
use log::debug;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// A concrete instruction: `from` pays `to` the given amount.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payment {
    pub from: MemberName,
    pub to: MemberName,
    pub amount: Money,
}

impl Payment {
    pub fn new(from: MemberName, to: MemberName, amount: Money) -> Self {
        Self { from, to, amount }
    }
}

impl fmt::Display for Payment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} pays {} {}", self.from, self.to, self.amount)
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum SettlementError {
    #[error("balances do not cancel out (residual {residual}); was a member with an open balance removed?")]
    Unbalanced { residual: Money },
}

/// Ordered payments that bring every balance of a group to zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SettlementPlan {
    payments: Vec<Payment>,
    /// How many leading payments came from the exact-match phase.
    exact_matches: usize,
}

impl SettlementPlan {
    pub fn payments(&self) -> &[Payment] {
        &self.payments
    }

    pub fn into_payments(self) -> Vec<Payment> {
        self.payments
    }

    pub fn exact_matches(&self) -> usize {
        self.exact_matches
    }

    pub fn len(&self) -> usize {
        self.payments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.payments.is_empty()
    }

    /// Total money moved by the plan.
    pub fn total(&self) -> Money {
        self.payments.iter().map(|p| p.amount).sum()
    }

    /// Balances after every payment has been made.
    pub fn apply_to(&self, balances: &Balances) -> Balances {
        let mut after = balances.clone();
        for payment in &self.payments {
            after.adjust(&payment.from, payment.amount);
            after.adjust(&payment.to, -payment.amount);
        }
        after
    }
}

impl fmt::Display for SettlementPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.payments.is_empty() {
            return writeln!(f, "Nothing to settle.");
        }
        writeln!(f, "=== Settlement Plan ===")?;
        for payment in &self.payments {
            writeln!(f, "  {}", payment)?;
        }
        writeln!(f, "Payments:       {}", self.payments.len())?;
        writeln!(f, "Exact matches:  {}", self.exact_matches)?;
        writeln!(f, "Total moved:    {}", self.total())
    }
}

/// An open position during settlement. `open` is always a magnitude.
struct Position {
    member: MemberName,
    open: Money,
}

/// Computes settling payments from net balances.
pub struct SettlementEngine;

impl SettlementEngine {
    /// Produce the payments that zero out `balances`.
    ///
    /// # Algorithm
    ///
    /// 1. Split members into creditors (balance > 0) and debtors
    ///    (balance < 0); zero balances take no part.
    /// 2. Sort both sides ascending by magnitude. Sorting is stable, so
    ///    ties keep roster order.
    /// 3. Exact-match phase: each debtor, smallest first, is paired with the
    ///    first open creditor of exactly the same magnitude.
    /// 4. Greedy phase: the smallest open debtor pays the smallest open
    ///    creditor `min(debt, credit)`; whichever side is exhausted advances.
    ///
    /// Payments are emitted in generation order and are always positive.
    /// This does not touch any ledger; recording the payments is up to the
    /// caller.
    pub fn settle(balances: &Balances) -> Result<SettlementPlan, SettlementError> {
        if !balances.is_balanced() {
            return Err(SettlementError::Unbalanced {
                residual: balances.residual(),
            });
        }

        let mut creditors: Vec<Position> = balances
            .iter()
            .filter(|(_, b)| b.is_positive())
            .map(|(m, b)| Position {
                member: m.clone(),
                open: b,
            })
            .collect();
        let mut debtors: Vec<Position> = balances
            .iter()
            .filter(|(_, b)| b.is_negative())
            .map(|(m, b)| Position {
                member: m.clone(),
                open: b.abs(),
            })
            .collect();
        creditors.sort_by_key(|p| p.open);
        debtors.sort_by_key(|p| p.open);

        let mut payments = Vec::new();

        // exact-match phase
        for debtor in debtors.iter_mut() {
            for creditor in creditors.iter_mut() {
                if creditor.open.is_zero() {
                    continue;
                }
                if creditor.open > debtor.open {
                    break;
                }
                if creditor.open == debtor.open {
                    payments.push(Payment::new(
                        debtor.member.clone(),
                        creditor.member.clone(),
                        debtor.open,
                    ));
                    debtor.open = Money::ZERO;
                    creditor.open = Money::ZERO;
                    break;
                }
            }
        }
        let exact_matches = payments.len();

        creditors.retain(|p| !p.open.is_zero());
        debtors.retain(|p| !p.open.is_zero());

        // greedy phase
        let (mut c, mut d) = (0, 0);
        while c < creditors.len() && d < debtors.len() {
            let amount = debtors[d].open.min(creditors[c].open);
            payments.push(Payment::new(
                debtors[d].member.clone(),
                creditors[c].member.clone(),
                amount,
            ));
            creditors[c].open -= amount;
            debtors[d].open -= amount;
            if creditors[c].open.is_zero() {
                c += 1;
            }
            if debtors[d].open.is_zero() {
                d += 1;
            }
        }

        debug!(
            "settlement: {} payments ({} exact matches)",
            payments.len(),
            exact_matches
        );
        Ok(SettlementPlan {
            payments,
            exact_matches,
        })
    }
}
