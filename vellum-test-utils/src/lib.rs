//! vellum Test Utilities
//!
//! Shared test infrastructure for the vellum workspace:
//! - A scripted transport with controllable latency
//! - Recording notification sink and cache invalidator
//! - Fixtures for folders and backend errors
//! - Proptest generators

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

pub use vellum_cache::{CacheInvalidator, ContentKeys, QueryCache, ResourceScope};
pub use vellum_client::{
    ApiErrorBody, Folder, MutationError, NotificationSink, Transport, TransportFailure,
    TransportRequest,
};

// ============================================================================
// SCRIPTED TRANSPORT
// ============================================================================

/// One scripted reply.
#[derive(Debug, Clone)]
pub enum ScriptedResponse {
    /// Answer immediately.
    Reply(Result<Value, TransportFailure>),
    /// Answer after sleeping.
    Delayed(Duration, Result<Value, TransportFailure>),
    /// Never answer; only cancellation ends the call.
    Pending,
}

/// Transport that replays a script and records every request.
#[derive(Debug, Default)]
pub struct ScriptedTransport {
    script: Mutex<VecDeque<ScriptedResponse>>,
    requests: Mutex<Vec<TransportRequest>>,
    completed: AtomicUsize,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(response: ScriptedResponse) -> Self {
        let transport = Self::new();
        transport.push(response);
        transport
    }

    pub fn replying(value: Value) -> Self {
        Self::with(ScriptedResponse::Reply(Ok(value)))
    }

    pub fn failing(failure: TransportFailure) -> Self {
        Self::with(ScriptedResponse::Reply(Err(failure)))
    }

    pub fn push(&self, response: ScriptedResponse) {
        self.script.lock().unwrap().push_back(response);
    }

    /// Requests received so far, in order.
    pub fn requests(&self) -> Vec<TransportRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    /// Calls that ran to completion (not dropped by cancellation).
    pub fn completed_count(&self) -> usize {
        self.completed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, request: TransportRequest) -> Result<Value, TransportFailure> {
        self.requests.lock().unwrap().push(request);
        let next = self.script.lock().unwrap().pop_front();
        let result = match next {
            Some(ScriptedResponse::Reply(result)) => result,
            Some(ScriptedResponse::Delayed(delay, result)) => {
                tokio::time::sleep(delay).await;
                result
            }
            Some(ScriptedResponse::Pending) => std::future::pending().await,
            None => Err(TransportFailure::Connectivity {
                message: "no scripted response".to_string(),
            }),
        };
        self.completed.fetch_add(1, Ordering::SeqCst);
        result
    }
}

// ============================================================================
// RECORDING SINKS
// ============================================================================

/// Notification sink that keeps every failure message.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    failures: Mutex<Vec<String>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failures(&self) -> Vec<String> {
        self.failures.lock().unwrap().clone()
    }

    pub fn failure_count(&self) -> usize {
        self.failures.lock().unwrap().len()
    }
}

impl NotificationSink for RecordingNotifier {
    fn report_failure(&self, message: &str) {
        self.failures.lock().unwrap().push(message.to_string());
    }
}

/// Invalidator that records scopes and optionally forwards to a real cache.
#[derive(Default)]
pub struct RecordingInvalidator {
    scopes: Mutex<Vec<ResourceScope>>,
    inner: Option<QueryCache>,
}

impl RecordingInvalidator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn forwarding_to(cache: QueryCache) -> Self {
        Self {
            scopes: Mutex::new(Vec::new()),
            inner: Some(cache),
        }
    }

    pub fn scopes(&self) -> Vec<ResourceScope> {
        self.scopes.lock().unwrap().clone()
    }

    pub fn count(&self) -> usize {
        self.scopes.lock().unwrap().len()
    }
}

#[async_trait]
impl CacheInvalidator for RecordingInvalidator {
    async fn invalidate(&self, scope: &ResourceScope) -> u64 {
        self.scopes.lock().unwrap().push(scope.clone());
        match &self.inner {
            Some(cache) => cache.invalidate(scope).await,
            None => 0,
        }
    }
}

// ============================================================================
// FIXTURES
// ============================================================================

/// Wire JSON for a folder.
pub fn folder_json(id: &str, name: &str) -> Value {
    json!({ "id": id, "name": name, "parentId": null })
}

pub fn folder(id: &str, name: &str) -> Folder {
    Folder {
        id: id.to_string(),
        name: name.to_string(),
        parent_id: None,
        project_id: None,
        owner_id: None,
    }
}

/// A structured backend error.
pub fn api_error(message: &str) -> TransportFailure {
    TransportFailure::Api(ApiErrorBody::new(message))
}

pub fn connectivity_error(message: &str) -> TransportFailure {
    TransportFailure::Connectivity {
        message: message.to_string(),
    }
}

// ============================================================================
// GENERATORS
// ============================================================================

pub mod generators {
    use super::*;
    use proptest::prelude::*;

    pub fn project_ref() -> impl Strategy<Value = String> {
        "[a-z]{4,20}"
    }

    pub fn folder_name() -> impl Strategy<Value = String> {
        "[A-Za-z0-9 _-]{0,24}"
    }

    pub fn optional_parent() -> impl Strategy<Value = Option<String>> {
        proptest::option::of("[a-z0-9]{1,8}")
    }

    /// Any failure the transport can report.
    pub fn transport_failure() -> impl Strategy<Value = TransportFailure> {
        prop_oneof![
            "[a-z ]{1,30}".prop_map(|m| connectivity_error(&m)),
            ("[a-z ]{1,30}", proptest::option::of("[a-z_]{1,12}")).prop_map(|(m, code)| {
                let body = ApiErrorBody::new(m);
                TransportFailure::Api(match code {
                    Some(code) => body.with_code(code),
                    None => body,
                })
            }),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vellum_client::HttpMethod;

    #[tokio::test]
    async fn test_scripted_transport_replays_in_order() {
        let transport = ScriptedTransport::replying(json!(1));
        transport.push(ScriptedResponse::Reply(Err(api_error("nope"))));

        let request = TransportRequest::new(HttpMethod::Post, "/a");
        assert_eq!(transport.send(request.clone()).await, Ok(json!(1)));
        assert_eq!(transport.send(request.clone()).await, Err(api_error("nope")));
        assert!(transport.send(request).await.is_err());
        assert_eq!(transport.call_count(), 3);
        assert_eq!(transport.completed_count(), 3);
    }

    #[tokio::test]
    async fn test_recording_invalidator_forwards() {
        let cache = QueryCache::default();
        let scope = ContentKeys::folders("proj1");
        cache.put(&scope, &1u8).await.unwrap();

        let invalidator = RecordingInvalidator::forwarding_to(cache.clone());
        assert_eq!(invalidator.invalidate(&scope).await, 1);
        assert_eq!(invalidator.scopes(), vec![scope.clone()]);
        assert!(!cache.contains(&scope).await);
    }
}
