use crate::core::member::GroupName;
use crate::core::transaction::{Transaction, TransactionId};
use crate::ledger::store::{Book, Change, GroupRecord, Store, StoreError, BOOK_VERSION};
use log::info;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Store persisted as one JSON document.
///
/// Every commit writes the new snapshot to a sibling temp file, syncs it
/// and renames it over the target, so a crash leaves either the old or the
/// new book on disk.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    book: Book,
}

impl JsonFileStore {
    /// Open `path`, starting from an empty book if it does not exist yet.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let book = match fs::read_to_string(&path) {
            Ok(content) => {
                let book: Book = serde_json::from_str(&content)?;
                if book.version() != BOOK_VERSION {
                    return Err(StoreError::Constraint(format!(
                        "{} has format version {}, expected {}",
                        path.display(),
                        book.version(),
                        BOOK_VERSION
                    )));
                }
                book
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Book::default(),
            Err(e) => return Err(e.into()),
        };
        Ok(Self { path, book })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    fn persist(&self, book: &Book) -> Result<(), StoreError> {
        let json = serde_json::to_vec_pretty(book)?;
        let temp = self.temp_path();
        let mut file = fs::File::create(&temp)?;
        file.write_all(&json)?;
        file.sync_all()?;
        drop(file);
        if let Err(e) = fs::rename(&temp, &self.path) {
            let _ = fs::remove_file(&temp);
            return Err(e.into());
        }
        Ok(())
    }
}

impl Store for JsonFileStore {
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
        let count = changes.len();
        let mut staged = self.book.clone();
        staged.apply_all(changes)?;
        self.persist(&staged)?;
        self.book = staged;
        info!("committed {} changes to {}", count, self.path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::currency::CurrencyCode;
    use crate::core::member::MemberName;
    use crate::core::transaction::TransactionKind;
    use chrono::Utc;

    fn create(name: &str, id: u64) -> Vec<Change> {
        let group = GroupName::new(name);
        vec![
            Change::CreateGroup(GroupRecord::new(
                group.clone(),
                CurrencyCode::new("USD"),
                vec![MemberName::new("fred"), MemberName::new("jenny")],
                Utc::now(),
            )),
            Change::AppendTransaction(Transaction::new(
                TransactionId::new(id),
                group,
                TransactionKind::Create,
                Utc::now(),
                Vec::new(),
            )),
        ]
    }

    #[test]
    fn test_missing_file_opens_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::open(dir.path().join("book.json")).unwrap();
        assert!(store.groups().unwrap().is_empty());
        assert_eq!(store.next_transaction_id().unwrap(), TransactionId::new(1));
    }

    #[test]
    fn test_commit_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("book.json");

        let mut store = JsonFileStore::open(&path).unwrap();
        store.commit(create("spezi", 1)).unwrap();
        drop(store);

        let reopened = JsonFileStore::open(&path).unwrap();
        let group = reopened.group(&GroupName::new("spezi")).unwrap().unwrap();
        assert_eq!(group.currency, CurrencyCode::new("USD"));
        assert_eq!(group.members.len(), 2);
        assert_eq!(reopened.transactions(&group.name).unwrap().len(), 1);
        assert_eq!(reopened.next_transaction_id().unwrap(), TransactionId::new(2));
        assert!(!dir.path().join("book.json.tmp").exists());
    }

    #[test]
    fn test_rejected_batch_keeps_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("book.json");
        let mut store = JsonFileStore::open(&path).unwrap();
        store.commit(create("spezi", 1)).unwrap();
        let on_disk = fs::read_to_string(&path).unwrap();

        assert!(store.commit(create("spezi", 2)).is_err());
        assert_eq!(fs::read_to_string(&path).unwrap(), on_disk);
        assert_eq!(store.next_transaction_id().unwrap(), TransactionId::new(2));
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("book.json");
        fs::write(&path, "{ not json").unwrap();
        assert!(matches!(
            JsonFileStore::open(&path),
            Err(StoreError::Serialization(_))
        ));
    }

    #[test]
    fn test_unwritable_target_reports_io() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = JsonFileStore::open(dir.path().join("missing").join("book.json")).unwrap();
        let err = store.commit(create("spezi", 1)).unwrap_err();
        assert!(matches!(err, StoreError::Io(_)));
        assert!(store.groups().unwrap().is_empty());
    }
}
