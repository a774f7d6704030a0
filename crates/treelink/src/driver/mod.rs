//! The sync driver: snapshots in, remote writes out.
//!
//! The driver's only state is the previous snapshot, initialized to the
//! empty mapping. Every incoming snapshot is diffed against it and the
//! resulting patches are applied one by one: a patch at the reserved
//! `$user` location is translated into an auth invocation, everything else
//! is a direct subtree overwrite. Writes are fire-and-forget; the driver
//! never waits for acknowledgment and never rolls back.

use std::rc::Rc;

use thiserror::Error;
use treelink_path::PathAddress;

use crate::auth::{translate, AuthError};
use crate::diff::{diff, DiffError, Patch};
use crate::source::{SourceError, SourceHandle, IDENTITY_PATH};
use crate::store::{RemoteStore, StoreError};
use crate::tree::Tree;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error(transparent)]
    Diff(#[from] DiffError),
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error(transparent)]
    Source(#[from] SourceError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Applies the patch stream between consecutive snapshots to a remote
/// store.
pub struct SyncDriver {
    store: Rc<dyn RemoteStore>,
    previous: Tree,
}

impl SyncDriver {
    pub fn new(store: Rc<dyn RemoteStore>) -> Self {
        Self {
            store,
            previous: Tree::empty_map(),
        }
    }

    /// The last snapshot accepted by [`push`](Self::push).
    pub fn previous(&self) -> &Tree {
        &self.previous
    }

    /// Accept the next snapshot: diff it against the previous one, apply
    /// every patch, and advance. Returns the applied patches.
    ///
    /// On any error the previous snapshot is left in place and the
    /// remaining patches are skipped; writes already issued stand, which is
    /// safe because a re-push re-diffs and overwrite patches are
    /// idempotent.
    pub fn push(&mut self, next: Tree) -> Result<Vec<Patch>, SyncError> {
        let patches = diff(&self.previous, &next)?;
        for patch in &patches {
            self.apply(patch)?;
        }
        self.previous = next;
        Ok(patches)
    }

    /// Drain a whole snapshot sequence, stopping at the first error.
    pub fn run(&mut self, snapshots: impl IntoIterator<Item = Tree>) -> Result<(), SyncError> {
        for snapshot in snapshots {
            self.push(snapshot)?;
        }
        Ok(())
    }

    fn apply(&self, patch: &Patch) -> Result<(), SyncError> {
        if patch.location.is_virtual() {
            // Only the whole-descriptor auth-control location is writable
            // among the reserved paths.
            if patch.location == PathAddress::parse(IDENTITY_PATH) {
                let invocation = translate(&patch.value)?;
                self.store.invoke_auth(&invocation)?;
                return Ok(());
            }
            return Err(SourceError::UnknownVirtualPath(patch.location.clone()).into());
        }
        self.store.set_value(&patch.location, &patch.value)?;
        Ok(())
    }
}

/// The full application surface: a sink driver plus a root source handle
/// over the same store.
pub struct Connection {
    pub driver: SyncDriver,
    pub source: SourceHandle,
}

/// Wire a driver and a root source handle to one remote store.
pub fn connect(store: Rc<dyn RemoteStore>) -> Connection {
    Connection {
        driver: SyncDriver::new(Rc::clone(&store)),
        source: SourceHandle::new(store),
    }
}
