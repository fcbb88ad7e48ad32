use crate::core::balance::Balances;
use crate::core::currency::CurrencyCode;
use crate::core::member::{is_valid_name, GroupName, MemberName};
use crate::core::money::Money;
use crate::core::transaction::{Allocation, Leg, Transaction, TransactionId, TransactionKind};
use crate::engine::allocation::{allocate, AllocationWarning, SplitRequest};
use crate::engine::settlement::{SettlementEngine, SettlementPlan};
use crate::error::{Error, Result};
use crate::ledger::store::{Change, GroupRecord, Store};
use chrono::Utc;
use log::{debug, info};

/// Outcome of a recorded split.
#[derive(Debug, Clone, PartialEq)]
pub struct Recorded {
    pub transaction: Transaction,
    pub warnings: Vec<AllocationWarning>,
}

/// The ledger: every mutation of groups, rosters and transaction logs goes
/// through here, and each public operation is a single store commit.
///
/// Balances are never stored. They are folded from the active transactions
/// whenever asked for, so an undo is visible immediately.
pub struct Ledger<S: Store> {
    store: S,
}

impl<S: Store> Ledger<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    // --- Context ---

    /// The group a command operates on: `explicit` if given, otherwise the
    /// selected one. The group must exist.
    pub fn resolve_group(&self, explicit: Option<&GroupName>) -> Result<GroupRecord> {
        let name = match explicit {
            Some(name) => name.clone(),
            None => self.store.selected_group()?.ok_or(Error::NoGroupSelected)?,
        };
        self.group(&name)
    }

    pub fn select(&mut self, group: &GroupName) -> Result<()> {
        if self.store.selected_group()?.as_ref() == Some(group) {
            return Ok(());
        }
        self.group(group)?;
        self.store.commit(vec![Change::SelectGroup(Some(group.clone()))])?;
        debug!("selected group {}", group);
        Ok(())
    }

    pub fn selected(&self) -> Result<Option<GroupName>> {
        Ok(self.store.selected_group()?)
    }

    // --- Groups and members ---

    pub fn group(&self, name: &GroupName) -> Result<GroupRecord> {
        self.store
            .group(name)?
            .ok_or_else(|| Error::GroupNotFound(name.clone()))
    }

    pub fn groups(&self) -> Result<Vec<GroupRecord>> {
        Ok(self.store.groups()?)
    }

    /// Create a group and select it. Records a `create` transaction so the
    /// creation itself can be undone.
    pub fn create_group(
        &mut self,
        name: GroupName,
        members: Vec<MemberName>,
        currency: CurrencyCode,
    ) -> Result<TransactionId> {
        check_name(name.as_str())?;
        if self.store.group(&name)?.is_some() {
            return Err(Error::GroupExists(name));
        }
        if members.is_empty() {
            return Err(Error::EmptyGroup(name));
        }
        check_new_members(&name, &[], &members)?;

        let now = Utc::now();
        let id = self.store.next_transaction_id()?;
        let create = Transaction::new(id, name.clone(), TransactionKind::Create, now, Vec::new());
        let record = GroupRecord::new(name.clone(), currency, members, now);
        self.store.commit(vec![
            Change::CreateGroup(record),
            Change::AppendTransaction(create),
            Change::SelectGroup(Some(name.clone())),
        ])?;
        info!("created group {} ({})", name, id);
        Ok(id)
    }

    /// Add members, all or nothing.
    pub fn add_members(&mut self, group: &GroupName, members: Vec<MemberName>) -> Result<()> {
        let record = self.group(group)?;
        check_new_members(group, &record.members, &members)?;
        let changes = members
            .into_iter()
            .map(|member| Change::AddMember {
                group: group.clone(),
                member,
            })
            .collect();
        self.store.commit(changes)?;
        debug!("added members to {}", group);
        Ok(())
    }

    /// Remove members, all or nothing. A member with an open balance is
    /// only removed with `force`; the balance then drops out of the group
    /// and stays out if the name is added again.
    pub fn remove_members(
        &mut self,
        group: &GroupName,
        members: &[MemberName],
        force: bool,
    ) -> Result<()> {
        let record = self.group(group)?;
        let balances = self.balances_of(group)?;
        for member in members {
            let balance = balances.get(member).ok_or_else(|| Error::UnknownMember {
                member: member.clone(),
                group: group.clone(),
            })?;
            if !balance.is_zero() && !force {
                return Err(Error::NonZeroBalance {
                    member: member.clone(),
                    balance,
                });
            }
        }
        if record.members.iter().all(|m| members.contains(m)) {
            return Err(Error::EmptyGroup(group.clone()));
        }

        let mut removed: Vec<&MemberName> = Vec::new();
        for member in members {
            if !removed.contains(&member) {
                removed.push(member);
            }
        }
        let changes = removed
            .into_iter()
            .map(|member| Change::RemoveMember {
                group: group.clone(),
                member: member.clone(),
            })
            .collect();
        self.store.commit(changes)?;
        debug!("removed {} members from {} (force: {})", members.len(), group, force);
        Ok(())
    }

    /// Delete a group with its roster and log.
    pub fn delete_group(&mut self, group: &GroupName) -> Result<()> {
        self.group(group)?;
        self.store.commit(vec![Change::DeleteGroup(group.clone())])?;
        info!("deleted group {}", group);
        Ok(())
    }

    // --- Recording ---

    /// Append a transaction. This is the single path every recorded
    /// activity goes through.
    ///
    /// All members must be on the roster, and money in must equal money out
    /// for every kind but `create`.
    pub fn record(
        &mut self,
        group: &GroupName,
        kind: TransactionKind,
        allocations: Vec<Allocation>,
        memo: Option<String>,
    ) -> Result<Transaction> {
        let id = self.store.next_transaction_id()?;
        let transaction = self.prepare(group, kind, allocations, memo, id)?;
        self.store
            .commit(vec![Change::AppendTransaction(transaction.clone())])?;
        info!(
            "recorded {} {} of {} in {}",
            transaction.kind(),
            transaction.id(),
            transaction.total(),
            group
        );
        Ok(transaction)
    }

    /// Resolve a split and record it.
    pub fn split(
        &mut self,
        group: &GroupName,
        request: &SplitRequest,
        memo: impl Into<String>,
    ) -> Result<Recorded> {
        let record = self.group(group)?;
        let set = allocate(request, &record.members)?;
        let warnings = set.warnings().to_vec();
        let transaction = self.record(
            group,
            TransactionKind::Split,
            set.into_allocations(),
            Some(memo.into()),
        )?;
        Ok(Recorded {
            transaction,
            warnings,
        })
    }

    /// `from` pays `to` directly.
    pub fn pay(
        &mut self,
        group: &GroupName,
        from: MemberName,
        to: MemberName,
        amount: Money,
    ) -> Result<Transaction> {
        if !amount.is_positive() {
            return Err(Error::InvalidAmount(format!(
                "a payment must be positive, got {}",
                amount
            )));
        }
        if !amount.is_within_limit() {
            return Err(Error::InvalidAmount(format!(
                "a payment of {} exceeds the largest supported amount {}",
                amount,
                Money::MAX
            )));
        }
        if from == to {
            return Err(Error::SelfPayment);
        }
        self.record(
            group,
            TransactionKind::Pay,
            vec![Allocation::from(from, amount), Allocation::to(to, amount)],
            None,
        )
    }

    fn prepare(
        &self,
        group: &GroupName,
        kind: TransactionKind,
        allocations: Vec<Allocation>,
        memo: Option<String>,
        id: TransactionId,
    ) -> Result<Transaction> {
        let record = self.group(group)?;
        for allocation in &allocations {
            if !record.has_member(&allocation.member) {
                return Err(Error::UnknownMember {
                    member: allocation.member.clone(),
                    group: group.clone(),
                });
            }
            if allocation.amount.is_negative() {
                return Err(Error::InvalidAmount(format!(
                    "{} has a negative allocation {}",
                    allocation.member, allocation.amount
                )));
            }
        }
        let mut transaction = Transaction::new(id, group.clone(), kind, Utc::now(), allocations);
        if kind != TransactionKind::Create && !transaction.is_conserved() {
            return Err(Error::InvalidAmount(format!(
                "money in ({}) does not equal money out ({})",
                transaction.sum_of(Leg::From),
                transaction.sum_of(Leg::To)
            )));
        }
        if let Some(memo) = memo {
            transaction = transaction.with_memo(memo);
        }
        Ok(transaction)
    }

    // --- Queries ---

    /// Current balance of every member on the roster.
    pub fn balances_of(&self, group: &GroupName) -> Result<Balances> {
        let record = self.group(group)?;
        let log = self.store.active_transactions(group)?;
        Ok(Balances::from_history(&record.members, &log, &record.departures))
    }

    /// The group's log ordered by id; reversed entries only with `all`.
    pub fn transactions(&self, group: &GroupName, all: bool) -> Result<Vec<Transaction>> {
        self.group(group)?;
        if all {
            Ok(self.store.transactions(group)?)
        } else {
            Ok(self.store.active_transactions(group)?)
        }
    }

    // --- Undo ---

    /// Reverse one transaction and return it as reversed.
    ///
    /// Without an id the most recent active `create`, `split` or `pay` is
    /// taken. Undoing the `create` deletes the group, which is only allowed
    /// while nothing else in it is active. Reversal never cascades.
    pub fn undo(&mut self, group: &GroupName, id: Option<TransactionId>) -> Result<Transaction> {
        let log = self.transactions(group, true)?;
        let mut target = match id {
            None => log
                .iter()
                .rev()
                .find(|tx| tx.is_active() && tx.kind().is_undoable())
                .cloned()
                .ok_or_else(|| Error::NothingToUndo(group.clone()))?,
            Some(id) => {
                let tx = log
                    .iter()
                    .find(|tx| tx.id() == id && tx.is_active())
                    .cloned()
                    .ok_or_else(|| Error::NotFound {
                        group: group.clone(),
                        id,
                    })?;
                if !tx.kind().is_undoable() {
                    return Err(Error::NotUndoable {
                        id,
                        kind: tx.kind(),
                    });
                }
                tx
            }
        };

        let now = Utc::now();
        if target.kind() == TransactionKind::Create {
            let busy = log
                .iter()
                .any(|tx| tx.is_active() && tx.id() != target.id());
            if busy {
                return Err(Error::GroupHasActivity(group.clone()));
            }
            self.store.commit(vec![Change::DeleteGroup(group.clone())])?;
            info!("undid creation of {}; group deleted", group);
        } else {
            self.store.commit(vec![Change::MarkReversed {
                group: group.clone(),
                id: target.id(),
                at: now,
            }])?;
            info!("reversed {} {} in {}", target.kind(), target.id(), group);
        }
        target.mark_reversed(now);
        Ok(target)
    }

    // --- Settlement ---

    /// Payments that would settle the group. Nothing is recorded.
    pub fn settlement_plan(&self, group: &GroupName) -> Result<SettlementPlan> {
        let balances = self.balances_of(group)?;
        Ok(SettlementEngine::settle(&balances)?)
    }

    /// Compute the plan and record every payment as a `settle` transaction,
    /// in one commit.
    pub fn settle_up(&mut self, group: &GroupName) -> Result<SettlementPlan> {
        let plan = self.settlement_plan(group)?;
        if plan.is_empty() {
            return Ok(plan);
        }
        let mut id = self.store.next_transaction_id()?;
        let mut changes = Vec::with_capacity(plan.len());
        for payment in plan.payments() {
            let tx = self.prepare(
                group,
                TransactionKind::Settle,
                vec![
                    Allocation::from(payment.from.clone(), payment.amount),
                    Allocation::to(payment.to.clone(), payment.amount),
                ],
                None,
                id,
            )?;
            changes.push(Change::AppendTransaction(tx));
            id = id.next();
        }
        self.store.commit(changes)?;
        info!("settled {} with {} payments", group, plan.len());
        Ok(plan)
    }
}

fn check_name(name: &str) -> Result<()> {
    if is_valid_name(name) {
        Ok(())
    } else {
        Err(Error::InvalidName(name.to_string()))
    }
}

fn check_new_members(group: &GroupName, existing: &[MemberName], new: &[MemberName]) -> Result<()> {
    for (i, member) in new.iter().enumerate() {
        check_name(member.as_str())?;
        if existing.contains(member) || new[..i].contains(member) {
            return Err(Error::DuplicateMember {
                member: member.clone(),
                group: group.clone(),
            });
        }
    }
    Ok(())
}
