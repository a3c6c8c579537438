//! Client-side mutation layer for the vellum content tree.
//!
//! A UI action builds a [`MutationRequest`] and hands it to a
//! [`MutationCoordinator`]. The coordinator runs the write through its
//! executor, invalidates the affected cache scope on success before any
//! caller hook runs, and reports failures either to the caller's `on_error`
//! or, failing that, to the [`NotificationSink`].

pub mod config;
pub mod content;
pub mod coordinator;
pub mod error;
pub mod mutation;
pub mod notifications;
pub mod telemetry;
pub mod transport;

pub use config::{ClientConfig, ConfigError};
pub use content::{
    ContentMutations, CreateFolder, CreateFolderInput, DeleteFolders, DeleteFoldersInput, Folder,
    UpdateFolder, UpdateFolderInput,
};
pub use coordinator::{MutationCallbacks, MutationCoordinator, RunConfig};
pub use error::{ClientError, ClientResult};
pub use mutation::{MutationError, MutationExecutor, MutationOutcome, MutationRequest};
pub use notifications::{Notification, NotificationLevel, NotificationQueue, NotificationSink};
pub use transport::{
    ApiErrorBody, HttpMethod, RestTransport, Transport, TransportFailure, TransportRequest,
};

pub use tokio_util::sync::CancellationToken;
