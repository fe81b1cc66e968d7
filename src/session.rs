use crate::aggregate::Aggregate;
use crate::repository::{Repository, RepositoryError, Store};
use std::ops::{Deref, DerefMut};

/// Transaction guard over a [`Repository`].
///
/// `begin` opens the transaction; [`commit`](Session::commit) flushes and
/// closes it. Dropping an uncommitted session rolls back and closes; the
/// drop path cannot commit because committing is fallible, so the happy path
/// must call `commit` explicitly.
pub struct Session<'a, T: Aggregate, S: Store<T>> {
    repository: &'a mut Repository<T, S>,
    open: bool,
}

impl<'a, T: Aggregate, S: Store<T>> Session<'a, T, S> {
    pub fn begin(repository: &'a mut Repository<T, S>) -> Self {
        repository.begin();
        Self {
            repository,
            open: true,
        }
    }

    /// Restores pending aggregates mid-session. The transaction stays open;
    /// a subsequent commit re-stores previously committed aggregates only.
    pub fn rollback(&mut self) -> Result<(), RepositoryError> {
        self.repository.rollback()
    }

    /// Commits the transaction and closes the repository.
    pub fn commit(mut self) -> Result<(), RepositoryError> {
        self.open = false;
        let result = self.repository.commit();
        self.repository.close();
        result
    }
}

impl<T: Aggregate, S: Store<T>> Deref for Session<'_, T, S> {
    type Target = Repository<T, S>;

    fn deref(&self) -> &Self::Target {
        self.repository
    }
}

impl<T: Aggregate, S: Store<T>> DerefMut for Session<'_, T, S> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.repository
    }
}

impl<T: Aggregate, S: Store<T>> Drop for Session<'_, T, S> {
    fn drop(&mut self) {
        if self.open {
            let _ = self.repository.rollback();
            self.repository.close();
        }
    }
}
