//! Mutation executor contract.
//!
//! An executor performs exactly one network write for a typed input and turns
//! the result into a [`MutationOutcome`]. It never touches the cache and never
//! notifies anyone; both belong to the coordinator.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;
use vellum_cache::ResourceScope;

use crate::transport::{Transport, TransportFailure, TransportRequest};

/// Error code attached to success bodies that do not decode.
pub const INVALID_RESPONSE_CODE: &str = "invalid_response";

/// Immutable input for one mutation run, with an optional cancellation token.
#[derive(Debug, Clone)]
pub struct MutationRequest<I> {
    input: I,
    cancel: Option<CancellationToken>,
}

impl<I> MutationRequest<I> {
    pub fn new(input: I) -> Self {
        Self {
            input,
            cancel: None,
        }
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn input(&self) -> &I {
        &self.input
    }

    pub fn cancellation(&self) -> Option<&CancellationToken> {
        self.cancel.as_ref()
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(CancellationToken::is_cancelled)
    }
}

/// Typed failure of a write.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MutationError {
    /// The network call could not complete.
    #[error("{message}")]
    Transport { message: String },
    /// The backend responded with a structured error.
    #[error("{message}")]
    Protocol {
        message: String,
        code: Option<String>,
    },
}

impl MutationError {
    pub fn message(&self) -> &str {
        match self {
            MutationError::Transport { message } | MutationError::Protocol { message, .. } => {
                message
            }
        }
    }

    /// Machine-readable code, when the backend supplied one.
    pub fn code(&self) -> Option<&str> {
        match self {
            MutationError::Transport { .. } => None,
            MutationError::Protocol { code, .. } => code.as_deref(),
        }
    }
}

impl From<TransportFailure> for MutationError {
    fn from(failure: TransportFailure) -> Self {
        match failure {
            TransportFailure::Connectivity { message } => MutationError::Transport { message },
            TransportFailure::Api(body) => MutationError::Protocol {
                message: body.message,
                code: body.code,
            },
        }
    }
}

/// Final status of one mutation run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MutationOutcome<T> {
    Success(T),
    Failed(MutationError),
    /// The caller's token fired before a response arrived.
    Cancelled,
}

impl<T> MutationOutcome<T> {
    pub fn is_success(&self) -> bool {
        matches!(self, MutationOutcome::Success(_))
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, MutationOutcome::Failed(_))
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, MutationOutcome::Cancelled)
    }

    pub fn success(&self) -> Option<&T> {
        match self {
            MutationOutcome::Success(value) => Some(value),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&MutationError> {
        match self {
            MutationOutcome::Failed(err) => Some(err),
            _ => None,
        }
    }

    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> MutationOutcome<U> {
        match self {
            MutationOutcome::Success(value) => MutationOutcome::Success(f(value)),
            MutationOutcome::Failed(err) => MutationOutcome::Failed(err),
            MutationOutcome::Cancelled => MutationOutcome::Cancelled,
        }
    }

    /// Convert into a `Result`, with cancellation as `Ok(None)`.
    pub fn into_result(self) -> Result<Option<T>, MutationError> {
        match self {
            MutationOutcome::Success(value) => Ok(Some(value)),
            MutationOutcome::Failed(err) => Err(err),
            MutationOutcome::Cancelled => Ok(None),
        }
    }
}

impl MutationOutcome<serde_json::Value> {
    /// Decode a raw success payload into the executor's output type.
    pub fn decode<T: DeserializeOwned>(self) -> MutationOutcome<T> {
        match self {
            MutationOutcome::Success(value) => match serde_json::from_value(value) {
                Ok(decoded) => MutationOutcome::Success(decoded),
                Err(e) => MutationOutcome::Failed(MutationError::Protocol {
                    message: format!("Unexpected response: {}", e),
                    code: Some(INVALID_RESPONSE_CODE.to_string()),
                }),
            },
            MutationOutcome::Failed(err) => MutationOutcome::Failed(err),
            MutationOutcome::Cancelled => MutationOutcome::Cancelled,
        }
    }
}

/// Performs one kind of write.
#[async_trait]
pub trait MutationExecutor: Send + Sync {
    type Input: Clone + Send + Sync + 'static;
    type Output: Clone + Send + Sync + 'static;

    /// Short name used in log events.
    fn name(&self) -> &'static str;

    /// Fixed prefix of the fallback failure notification.
    fn failure_prefix(&self) -> &'static str;

    /// The scope that goes stale when this write succeeds.
    fn invalidation_scope(&self, input: &Self::Input) -> ResourceScope;

    /// Issue the write. Resolves when the transport answers or the token fires.
    async fn execute(
        &self,
        request: &MutationRequest<Self::Input>,
    ) -> MutationOutcome<Self::Output>;
}

/// Send one transport request, racing it against the cancellation token.
///
/// An already-fired token short-circuits without touching the transport.
/// Dropping the in-flight send aborts the underlying call.
pub async fn dispatch(
    transport: &dyn Transport,
    request: TransportRequest,
    cancel: Option<&CancellationToken>,
) -> MutationOutcome<serde_json::Value> {
    let response = match cancel {
        Some(token) => {
            if token.is_cancelled() {
                return MutationOutcome::Cancelled;
            }
            tokio::select! {
                biased;
                _ = token.cancelled() => return MutationOutcome::Cancelled,
                response = transport.send(request) => response,
            }
        }
        None => transport.send(request).await,
    };

    match response {
        Ok(value) => MutationOutcome::Success(value),
        Err(failure) => MutationOutcome::Failed(failure.into()),
    }
}
