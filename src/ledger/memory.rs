use crate::core::member::GroupName;
use crate::core::transaction::{Transaction, TransactionId};
use crate::ledger::store::{Book, Change, GroupRecord, Store, StoreError};

/// Volatile store for tests and dry runs.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    book: Book,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_book(book: Book) -> Self {
        Self { book }
    }

    pub fn book(&self) -> &Book {
        &self.book
    }
}

impl Store for MemoryStore {
    fn group(&self, name: &GroupName) -> Result<Option<GroupRecord>, StoreError> {
        Ok(self.book.group(name).cloned())
    }

    fn groups(&self) -> Result<Vec<GroupRecord>, StoreError> {
        Ok(self.book.groups().cloned().collect())
    }

    fn transactions(&self, group: &GroupName) -> Result<Vec<Transaction>, StoreError> {
        Ok(self.book.log(group).to_vec())
    }

    fn next_transaction_id(&self) -> Result<TransactionId, StoreError> {
        Ok(self.book.next_id())
    }

    fn selected_group(&self) -> Result<Option<GroupName>, StoreError> {
        Ok(self.book.selected().cloned())
    }

    fn commit(&mut self, changes: Vec<Change>) -> Result<(), StoreError> {
        let mut staged = self.book.clone();
        staged.apply_all(changes)?;
        self.book = staged;
        Ok(())
    }
}
