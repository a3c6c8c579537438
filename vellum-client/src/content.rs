//! Content-tree folder mutations.
//!
//! Folders live in a project's content tree. Every write here invalidates the
//! project-wide folders scope, never a parent-specific one, so any view that
//! lists folders for the project observes the change.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use vellum_cache::{CacheInvalidator, ContentKeys, ResourceScope};

use crate::config::ClientConfig;
use crate::coordinator::{MutationCoordinator, RunConfig};
use crate::error::ClientResult;
use crate::mutation::{dispatch, MutationExecutor, MutationOutcome, MutationRequest};
use crate::notifications::NotificationSink;
use crate::transport::{project_path, HttpMethod, RestTransport, Transport, TransportRequest};

const FOLDERS_PATH: &str = "/platform/projects/{ref}/content/folders";

/// A folder as returned by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Folder {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub parent_id: Option<String>,
    #[serde(default)]
    pub project_id: Option<i64>,
    #[serde(default)]
    pub owner_id: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateFolderInput {
    pub project_ref: String,
    pub name: String,
    /// Existence is checked server-side.
    pub parent_id: Option<String>,
}

impl CreateFolderInput {
    pub fn new(project_ref: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            project_ref: project_ref.into(),
            name: name.into(),
            parent_id: None,
        }
    }

    pub fn with_parent(mut self, parent_id: impl Into<String>) -> Self {
        self.parent_id = Some(parent_id.into());
        self
    }
}

/// Wire body for folder create and update. Absent fields are omitted.
fn folder_body(name: Option<&str>, parent_id: Option<&str>) -> serde_json::Value {
    let mut body = serde_json::Map::new();
    if let Some(name) = name {
        body.insert("name".to_string(), json!(name));
    }
    if let Some(parent_id) = parent_id {
        body.insert("parentId".to_string(), json!(parent_id));
    }
    serde_json::Value::Object(body)
}

pub struct CreateFolder {
    transport: Arc<dyn Transport>,
}

impl CreateFolder {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    pub fn transport_request(input: &CreateFolderInput) -> TransportRequest {
        let body = folder_body(
            Some(&input.name),
            input.parent_id.as_deref().filter(|id| !id.is_empty()),
        );
        TransportRequest::new(HttpMethod::Post, project_path(FOLDERS_PATH, &input.project_ref))
            .with_body(body)
    }
}

#[async_trait]
impl MutationExecutor for CreateFolder {
    type Input = CreateFolderInput;
    type Output = Folder;

    fn name(&self) -> &'static str {
        "create_folder"
    }

    fn failure_prefix(&self) -> &'static str {
        "Failed to create folder"
    }

    fn invalidation_scope(&self, input: &CreateFolderInput) -> ResourceScope {
        ContentKeys::folders(&input.project_ref)
    }

    #[tracing::instrument(skip_all, fields(project = %request.input().project_ref))]
    async fn execute(
        &self,
        request: &MutationRequest<CreateFolderInput>,
    ) -> MutationOutcome<Folder> {
        let call = Self::transport_request(request.input());
        dispatch(self.transport.as_ref(), call, request.cancellation())
            .await
            .decode()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateFolderInput {
    pub project_ref: String,
    pub id: String,
    pub name: Option<String>,
    pub parent_id: Option<String>,
}

impl UpdateFolderInput {
    pub fn rename(
        project_ref: impl Into<String>,
        id: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            project_ref: project_ref.into(),
            id: id.into(),
            name: Some(name.into()),
            parent_id: None,
        }
    }

    pub fn move_to(
        project_ref: impl Into<String>,
        id: impl Into<String>,
        parent_id: impl Into<String>,
    ) -> Self {
        Self {
            project_ref: project_ref.into(),
            id: id.into(),
            name: None,
            parent_id: Some(parent_id.into()),
        }
    }
}

pub struct UpdateFolder {
    transport: Arc<dyn Transport>,
}

impl UpdateFolder {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    pub fn transport_request(input: &UpdateFolderInput) -> TransportRequest {
        let body = folder_body(input.name.as_deref(), input.parent_id.as_deref());
        let path = format!(
            "{}/{}",
            project_path(FOLDERS_PATH, &input.project_ref),
            urlencoding::encode(&input.id)
        );
        TransportRequest::new(HttpMethod::Patch, path).with_body(body)
    }
}

#[async_trait]
impl MutationExecutor for UpdateFolder {
    type Input = UpdateFolderInput;
    type Output = Folder;

    fn name(&self) -> &'static str {
        "update_folder"
    }

    fn failure_prefix(&self) -> &'static str {
        "Failed to update folder"
    }

    fn invalidation_scope(&self, input: &UpdateFolderInput) -> ResourceScope {
        ContentKeys::folders(&input.project_ref)
    }

    #[tracing::instrument(
        skip_all,
        fields(project = %request.input().project_ref, folder = %request.input().id)
    )]
    async fn execute(
        &self,
        request: &MutationRequest<UpdateFolderInput>,
    ) -> MutationOutcome<Folder> {
        let call = Self::transport_request(request.input());
        dispatch(self.transport.as_ref(), call, request.cancellation())
            .await
            .decode()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteFoldersInput {
    pub project_ref: String,
    pub ids: Vec<String>,
}

pub struct DeleteFolders {
    transport: Arc<dyn Transport>,
}

impl DeleteFolders {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    pub fn transport_request(input: &DeleteFoldersInput) -> TransportRequest {
        TransportRequest::new(HttpMethod::Delete, project_path(FOLDERS_PATH, &input.project_ref))
            .with_query("ids", input.ids.join(","))
    }
}

#[async_trait]
impl MutationExecutor for DeleteFolders {
    type Input = DeleteFoldersInput;
    /// Ids that were deleted.
    type Output = Vec<String>;

    fn name(&self) -> &'static str {
        "delete_folders"
    }

    fn failure_prefix(&self) -> &'static str {
        "Failed to delete folders"
    }

    fn invalidation_scope(&self, input: &DeleteFoldersInput) -> ResourceScope {
        ContentKeys::folders(&input.project_ref)
    }

    #[tracing::instrument(
        skip_all,
        fields(project = %request.input().project_ref, count = request.input().ids.len())
    )]
    async fn execute(
        &self,
        request: &MutationRequest<DeleteFoldersInput>,
    ) -> MutationOutcome<Vec<String>> {
        let call = Self::transport_request(request.input());
        let ids = request.input().ids.clone();
        dispatch(self.transport.as_ref(), call, request.cancellation())
            .await
            .map(|_| ids)
    }
}

/// Hands out coordinators for each content mutation, sharing one transport,
/// one cache and one notification sink.
#[derive(Clone)]
pub struct ContentMutations {
    transport: Arc<dyn Transport>,
    cache: Arc<dyn CacheInvalidator>,
    notifier: Arc<dyn NotificationSink>,
    defaults: RunConfig,
}

impl ContentMutations {
    pub fn new(
        transport: Arc<dyn Transport>,
        cache: Arc<dyn CacheInvalidator>,
        notifier: Arc<dyn NotificationSink>,
    ) -> Self {
        Self {
            transport,
            cache,
            notifier,
            defaults: RunConfig::default(),
        }
    }

    /// Build against the REST API described by `config`.
    pub fn from_config(
        config: &ClientConfig,
        cache: Arc<dyn CacheInvalidator>,
        notifier: Arc<dyn NotificationSink>,
    ) -> ClientResult<Self> {
        let transport: Arc<dyn Transport> = Arc::new(RestTransport::new(config)?);
        Ok(Self::new(transport, cache, notifier)
            .with_defaults(RunConfig::from(&config.coordinator)))
    }

    pub fn with_defaults(mut self, defaults: RunConfig) -> Self {
        self.defaults = defaults;
        self
    }

    /// Run configuration callers should start from.
    pub fn defaults(&self) -> RunConfig {
        self.defaults
    }

    pub fn create_folder(&self) -> MutationCoordinator<CreateFolder> {
        self.coordinator(CreateFolder::new(Arc::clone(&self.transport)))
    }

    pub fn update_folder(&self) -> MutationCoordinator<UpdateFolder> {
        self.coordinator(UpdateFolder::new(Arc::clone(&self.transport)))
    }

    pub fn delete_folders(&self) -> MutationCoordinator<DeleteFolders> {
        self.coordinator(DeleteFolders::new(Arc::clone(&self.transport)))
    }

    fn coordinator<E: MutationExecutor>(&self, executor: E) -> MutationCoordinator<E> {
        MutationCoordinator::new(executor, Arc::clone(&self.cache), Arc::clone(&self.notifier))
            .with_defaults(self.defaults)
    }
}
