use crate::aggregate::Aggregate;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::mem;
use std::rc::Rc;
use thiserror::Error;

/// Handle under which aggregates are shared between the caller and the
/// repository's identity maps. Single-threaded by design.
pub type Shared<T> = Rc<RefCell<T>>;

pub fn shared<T>(value: T) -> Shared<T> {
    Rc::new(RefCell::new(value))
}

/// Persistence capability supplied by the external storage collaborator.
///
/// `store` must be idempotent: commit re-stores every aggregate committed in
/// earlier cycles of the same transaction. `restore` mutates the aggregate in
/// place back to its last stored state.
pub trait Store<T: Aggregate> {
    fn store(&mut self, aggregate: &T) -> anyhow::Result<()>;
    fn restore(&mut self, aggregate: &mut T) -> anyhow::Result<()>;
}

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("no transaction in progress; call begin() first")]
    NotBegun,
    #[error("failed to store aggregate `{id}`: {source}")]
    Store { id: String, source: anyhow::Error },
    #[error("failed to restore aggregate `{id}`: {source}")]
    Restore { id: String, source: anyhow::Error },
}

struct Transaction<T: Aggregate> {
    committed: BTreeMap<T::Id, Shared<T>>,
    uncommitted: BTreeMap<T::Id, Shared<T>>,
}

impl<T: Aggregate> Transaction<T> {
    fn empty() -> Self {
        Self {
            committed: BTreeMap::new(),
            uncommitted: BTreeMap::new(),
        }
    }
}

/// Identity-map transaction manager batching `put` operations and flushing
/// them through the storage backend on commit.
///
/// An id appears in at most one of the two maps at a time: `put` removes any
/// prior committed entry under the same id before pending the aggregate.
pub struct Repository<T: Aggregate, S: Store<T>> {
    backend: S,
    transaction: Option<Transaction<T>>,
}

impl<T: Aggregate, S: Store<T>> Repository<T, S> {
    pub fn new(backend: S) -> Self {
        Self {
            backend,
            transaction: None,
        }
    }

    pub fn backend(&self) -> &S {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut S {
        &mut self.backend
    }

    pub fn in_transaction(&self) -> bool {
        self.transaction.is_some()
    }

    /// Begins a transaction with two empty identity maps.
    pub fn begin(&mut self) {
        self.transaction = Some(Transaction::empty());
    }

    /// Pends an aggregate under its id. A later `put` with the same id
    /// overwrites the pending entry.
    pub fn put(&mut self, aggregate: &Shared<T>) -> Result<(), RepositoryError> {
        let id = aggregate.borrow().id();
        let transaction = self.transaction.as_mut().ok_or(RepositoryError::NotBegun)?;
        transaction.committed.remove(&id);
        transaction.uncommitted.insert(id, Rc::clone(aggregate));
        Ok(())
    }

    /// Merges pending aggregates into the committed map, then stores every
    /// committed aggregate, including those committed in earlier cycles.
    pub fn commit(&mut self) -> Result<(), RepositoryError> {
        let transaction = self.transaction.as_mut().ok_or(RepositoryError::NotBegun)?;
        let pending = mem::take(&mut transaction.uncommitted);
        transaction.committed.extend(pending);
        for (id, aggregate) in transaction.committed.iter() {
            self.backend
                .store(&aggregate.borrow())
                .map_err(|source| RepositoryError::Store {
                    id: format!("{id:?}"),
                    source,
                })?;
        }
        Ok(())
    }

    /// Restores every pending aggregate in place and discards the pending
    /// map without storing anything.
    pub fn rollback(&mut self) -> Result<(), RepositoryError> {
        let transaction = self.transaction.as_mut().ok_or(RepositoryError::NotBegun)?;
        let pending = mem::take(&mut transaction.uncommitted);
        for (id, aggregate) in pending.iter() {
            self.backend
                .restore(&mut aggregate.borrow_mut())
                .map_err(|source| RepositoryError::Restore {
                    id: format!("{id:?}"),
                    source,
                })?;
        }
        Ok(())
    }

    /// Ends the transaction, clearing both identity maps.
    pub fn close(&mut self) {
        self.transaction = None;
    }
}
