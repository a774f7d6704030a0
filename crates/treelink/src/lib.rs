//! Bidirectional synchronization between an in-process snapshot stream and
//! a remote hierarchical key/value store.
//!
//! The write side diffs consecutive full-tree snapshots into minimal
//! location/value patches and applies each as an independent subtree
//! overwrite ([`diff`], [`driver`]). The read side wraps the store's
//! listener-registration API into cancellable push streams, including the
//! reserved virtual paths for identity and auth control ([`source`]).
//! Auth descriptors written to the control path translate into remote
//! invocations ([`auth`]).
//!
//! The store itself is abstract: collaborators provide the transport by
//! implementing [`store::RemoteStore`].

pub mod auth;
pub mod diff;
pub mod driver;
pub mod push_id;
pub mod source;
pub mod store;
pub mod tree;

pub use treelink_path::{PathAddress, PathError};

pub use auth::{translate, AuthError, AuthIntent, AuthMethod, InvocationDescriptor};
pub use diff::{diff, DiffError, Patch};
pub use driver::{connect, Connection, SyncDriver, SyncError};
pub use push_id::{PushIdGenerator, PUSH_ID_LEN};
pub use source::{PushStream, SourceError, SourceHandle, StreamEvent, Subscription, IDENTITY_PATH};
pub use store::{AuthUser, ListenerId, RemoteEvent, RemoteStore, StoreError, VALUE_EVENT};
pub use tree::{Node, Tree, OVERWRITE_KEY};
