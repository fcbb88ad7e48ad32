use crate::core::member::{GroupName, MemberName};
use crate::core::money::Money;
use crate::core::transaction::{TransactionId, TransactionKind};
use crate::engine::allocation::AllocationError;
use crate::engine::settlement::SettlementError;
use crate::ledger::store::StoreError;
use thiserror::Error;

/// Everything a ledger operation can fail with.
///
/// Business and validation failures are detected before the store is
/// touched. [`Error::StoreFailure`] is the only variant raised by
/// persistence itself.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Allocation(#[from] AllocationError),

    #[error(transparent)]
    Settlement(#[from] SettlementError),

    #[error("{member} is not a member of {group}")]
    UnknownMember { member: MemberName, group: GroupName },

    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    #[error("a member cannot pay themselves")]
    SelfPayment,

    #[error("nothing to undo in {0}")]
    NothingToUndo(GroupName),

    #[error("no active transaction {id} in {group}")]
    NotFound { group: GroupName, id: TransactionId },

    #[error("transaction {id} ({kind}) cannot be undone")]
    NotUndoable { id: TransactionId, kind: TransactionKind },

    #[error("{0} has later activity; undo that first or delete the group")]
    GroupHasActivity(GroupName),

    #[error("{member} still has a balance of {balance}; use --force to remove anyway")]
    NonZeroBalance { member: MemberName, balance: Money },

    #[error("group {0} does not exist")]
    GroupNotFound(GroupName),

    #[error("no group selected; pass --group or create one first")]
    NoGroupSelected,

    #[error("group {0} already exists")]
    GroupExists(GroupName),

    #[error("invalid name {0:?}: use letters, digits, '_', '-', '(' or ')'")]
    InvalidName(String),

    #[error("{member} appears more than once in {group}")]
    DuplicateMember { member: MemberName, group: GroupName },

    #[error("group {0} needs at least one member")]
    EmptyGroup(GroupName),

    #[error("store failure: {0}")]
    StoreFailure(#[from] StoreError),
}

impl Error {
    /// Persistence failures, as opposed to business rule violations.
    pub fn is_store_failure(&self) -> bool {
        matches!(self, Error::StoreFailure(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
