use crate::core::balance::Departure;
use crate::core::currency::CurrencyCode;
use crate::core::member::{GroupName, MemberName};
use crate::core::transaction::{Transaction, TransactionId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Snapshot format written by the file store.
pub const BOOK_VERSION: &str = "1";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("constraint violation: {0}")]
    Constraint(String),
}

/// A group and its ordered roster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupRecord {
    pub name: GroupName,
    pub currency: CurrencyCode,
    pub members: Vec<MemberName>,
    pub created_at: DateTime<Utc>,
    /// Latest removal of each member that ever left the roster.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub departures: Vec<Departure>,
}

impl GroupRecord {
    pub fn new(
        name: GroupName,
        currency: CurrencyCode,
        members: Vec<MemberName>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            name,
            currency,
            members,
            created_at,
            departures: Vec::new(),
        }
    }

    pub fn has_member(&self, member: &MemberName) -> bool {
        self.members.contains(member)
    }
}

/// One mutation inside a [`Store::commit`] batch.
#[derive(Debug, Clone, PartialEq)]
pub enum Change {
    CreateGroup(GroupRecord),
    /// Cascades to the roster and the transaction log.
    DeleteGroup(GroupName),
    AddMember {
        group: GroupName,
        member: MemberName,
    },
    RemoveMember {
        group: GroupName,
        member: MemberName,
    },
    /// The id must be the store's next id.
    AppendTransaction(Transaction),
    MarkReversed {
        group: GroupName,
        id: TransactionId,
        at: DateTime<Utc>,
    },
    SelectGroup(Option<GroupName>),
}

/// Persistence the ledger depends on.
///
/// Reads never fail on a missing group; they return `None` or an empty
/// list. `commit` applies a whole batch or nothing.
pub trait Store {
    fn group(&self, name: &GroupName) -> Result<Option<GroupRecord>, StoreError>;

    /// All groups, in creation order.
    fn groups(&self) -> Result<Vec<GroupRecord>, StoreError>;

    /// Every transaction of `group` ordered by id, reversed ones included.
    fn transactions(&self, group: &GroupName) -> Result<Vec<Transaction>, StoreError>;

    fn active_transactions(&self, group: &GroupName) -> Result<Vec<Transaction>, StoreError> {
        Ok(self
            .transactions(group)?
            .into_iter()
            .filter(|tx| tx.is_active())
            .collect())
    }

    /// Id the next appended transaction must carry.
    fn next_transaction_id(&self) -> Result<TransactionId, StoreError>;

    fn selected_group(&self) -> Result<Option<GroupName>, StoreError>;

    fn commit(&mut self, changes: Vec<Change>) -> Result<(), StoreError>;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct GroupEntry {
    record: GroupRecord,
    log: Vec<Transaction>,
}

/// Complete store state: every group with its log, the id counter and the
/// selected group. Backends keep one of these and swap it on commit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Book {
    version: String,
    next_id: TransactionId,
    groups: Vec<GroupEntry>,
    selected: Option<GroupName>,
}

impl Default for Book {
    fn default() -> Self {
        Self {
            version: BOOK_VERSION.to_string(),
            next_id: TransactionId::new(1),
            groups: Vec::new(),
            selected: None,
        }
    }
}

impl Book {
    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn next_id(&self) -> TransactionId {
        self.next_id
    }

    pub fn selected(&self) -> Option<&GroupName> {
        self.selected.as_ref()
    }

    pub fn group(&self, name: &GroupName) -> Option<&GroupRecord> {
        self.entry(name).map(|e| &e.record)
    }

    pub fn groups(&self) -> impl Iterator<Item = &GroupRecord> {
        self.groups.iter().map(|e| &e.record)
    }

    pub fn log(&self, name: &GroupName) -> &[Transaction] {
        self.entry(name).map(|e| e.log.as_slice()).unwrap_or(&[])
    }

    /// Apply every change in order. On error `self` may be half-updated,
    /// so callers apply batches to a copy.
    pub fn apply_all(&mut self, changes: Vec<Change>) -> Result<(), StoreError> {
        for change in changes {
            self.apply(change)?;
        }
        Ok(())
    }

    pub fn apply(&mut self, change: Change) -> Result<(), StoreError> {
        match change {
            Change::CreateGroup(record) => {
                if self.entry(&record.name).is_some() {
                    return Err(constraint(format!("group {} already exists", record.name)));
                }
                self.groups.push(GroupEntry {
                    record,
                    log: Vec::new(),
                });
            }
            Change::DeleteGroup(name) => {
                let before = self.groups.len();
                self.groups.retain(|e| e.record.name != name);
                if self.groups.len() == before {
                    return Err(constraint(format!("group {} does not exist", name)));
                }
                if self.selected.as_ref() == Some(&name) {
                    self.selected = None;
                }
            }
            Change::AddMember { group, member } => {
                let entry = self.entry_mut(&group)?;
                if entry.record.has_member(&member) {
                    return Err(constraint(format!("{} is already in {}", member, group)));
                }
                entry.record.members.push(member);
            }
            Change::RemoveMember { group, member } => {
                let entry = self.entry_mut(&group)?;
                let before = entry.record.members.len();
                entry.record.members.retain(|m| m != &member);
                if entry.record.members.len() == before {
                    return Err(constraint(format!("{} is not in {}", member, group)));
                }
                let since = self.next_id;
                let departures = &mut self.entry_mut(&group)?.record.departures;
                departures.retain(|d| d.member != member);
                departures.push(Departure { member, since });
            }
            Change::AppendTransaction(tx) => {
                if tx.id() != self.next_id {
                    return Err(constraint(format!(
                        "transaction {} is out of sequence, expected {}",
                        tx.id(),
                        self.next_id
                    )));
                }
                let next = self.next_id.next();
                self.entry_mut(tx.group())?.log.push(tx);
                self.next_id = next;
            }
            Change::MarkReversed { group, id, at } => {
                let tx = self
                    .entry_mut(&group)?
                    .log
                    .iter_mut()
                    .find(|tx| tx.id() == id)
                    .ok_or_else(|| constraint(format!("transaction {} not in {}", id, group)))?;
                if !tx.is_active() {
                    return Err(constraint(format!("transaction {} is already reversed", id)));
                }
                tx.mark_reversed(at);
            }
            Change::SelectGroup(selected) => {
                if let Some(name) = &selected {
                    self.entry_mut(name)?;
                }
                self.selected = selected;
            }
        }
        Ok(())
    }

    fn entry(&self, name: &GroupName) -> Option<&GroupEntry> {
        self.groups.iter().find(|e| &e.record.name == name)
    }

    fn entry_mut(&mut self, name: &GroupName) -> Result<&mut GroupEntry, StoreError> {
        self.groups
            .iter_mut()
            .find(|e| &e.record.name == name)
            .ok_or_else(|| constraint(format!("group {} does not exist", name)))
    }
}

fn constraint(message: String) -> StoreError {
    StoreError::Constraint(message)
}
