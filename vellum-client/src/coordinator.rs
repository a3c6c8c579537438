//! Mutation coordinator.
//!
//! Wraps one executor with the lifecycle every content write shares:
//!
//! 1. delegate to the executor (one network call);
//! 2. on success, invalidate the executor's scope (unless opted out) and
//!    await it, then await the caller's `on_success`;
//! 3. on failure, await the caller's `on_error` if there is one, otherwise
//!    send one notification through the sink;
//! 4. after either of those, await the caller's `on_settled`;
//! 5. on cancellation, do nothing else.
//!
//! `run` always resolves with the outcome. There are no retries and
//! concurrent runs are not deduplicated.

use std::future::Future;
use std::sync::Arc;

use futures_util::future::{BoxFuture, FutureExt};
use tracing::Instrument;
use uuid::Uuid;
use vellum_cache::CacheInvalidator;

use crate::config::CoordinatorSettings;
use crate::mutation::{MutationError, MutationExecutor, MutationOutcome, MutationRequest};
use crate::notifications::{failure_message, NotificationSink};

pub type SuccessHook<I, O, C> = Box<dyn FnOnce(O, I, Option<C>) -> BoxFuture<'static, ()> + Send>;
pub type ErrorHook<I, C> =
    Box<dyn FnOnce(MutationError, I, Option<C>) -> BoxFuture<'static, ()> + Send>;
pub type SettledHook<I, O, C> = Box<
    dyn FnOnce(Option<O>, Option<MutationError>, I, Option<C>) -> BoxFuture<'static, ()> + Send,
>;

/// Per-run options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunConfig {
    pub invalidate_caches_on_success: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            invalidate_caches_on_success: true,
        }
    }
}

impl RunConfig {
    pub fn without_invalidation() -> Self {
        Self {
            invalidate_caches_on_success: false,
        }
    }
}

impl From<&CoordinatorSettings> for RunConfig {
    fn from(settings: &CoordinatorSettings) -> Self {
        Self {
            invalidate_caches_on_success: settings.invalidate_caches_on_success,
        }
    }
}

/// Optional caller hooks plus an opaque context value handed to whichever fires.
pub struct MutationCallbacks<I, O, C = ()> {
    on_success: Option<SuccessHook<I, O, C>>,
    on_error: Option<ErrorHook<I, C>>,
    on_settled: Option<SettledHook<I, O, C>>,
    context: Option<C>,
}

impl<I, O, C> Default for MutationCallbacks<I, O, C> {
    fn default() -> Self {
        Self {
            on_success: None,
            on_error: None,
            on_settled: None,
            context: None,
        }
    }
}

impl<I, O, C> MutationCallbacks<I, O, C>
where
    I: Send + 'static,
    O: Send + 'static,
    C: Send + 'static,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Called with the payload after invalidation has completed.
    pub fn on_success<F, Fut>(mut self, hook: F) -> Self
    where
        F: FnOnce(O, I, Option<C>) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.on_success = Some(Box::new(move |output, input, context| {
            hook(output, input, context).boxed()
        }));
        self
    }

    /// Replaces the default failure notification.
    pub fn on_error<F, Fut>(mut self, hook: F) -> Self
    where
        F: FnOnce(MutationError, I, Option<C>) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.on_error = Some(Box::new(move |error, input, context| {
            hook(error, input, context).boxed()
        }));
        self
    }

    /// Called last on success or failure, with whichever of output or error
    /// the run produced. Never called on cancellation.
    pub fn on_settled<F, Fut>(mut self, hook: F) -> Self
    where
        F: FnOnce(Option<O>, Option<MutationError>, I, Option<C>) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.on_settled = Some(Box::new(move |output, error, input, context| {
            hook(output, error, input, context).boxed()
        }));
        self
    }

    pub fn with_context(mut self, context: C) -> Self {
        self.context = Some(context);
        self
    }

    pub fn has_error_handler(&self) -> bool {
        self.on_error.is_some()
    }
}

pub struct MutationCoordinator<E: MutationExecutor> {
    executor: E,
    cache: Arc<dyn CacheInvalidator>,
    notifier: Arc<dyn NotificationSink>,
    defaults: RunConfig,
}

impl<E: MutationExecutor> MutationCoordinator<E> {
    pub fn new(
        executor: E,
        cache: Arc<dyn CacheInvalidator>,
        notifier: Arc<dyn NotificationSink>,
    ) -> Self {
        Self {
            executor,
            cache,
            notifier,
            defaults: RunConfig::default(),
        }
    }

    /// Configuration used by [`Self::mutate`].
    pub fn with_defaults(mut self, defaults: RunConfig) -> Self {
        self.defaults = defaults;
        self
    }

    pub fn executor(&self) -> &E {
        &self.executor
    }

    pub fn defaults(&self) -> RunConfig {
        self.defaults
    }

    /// Run with no callbacks and this coordinator's default configuration.
    pub async fn mutate(&self, request: MutationRequest<E::Input>) -> MutationOutcome<E::Output> {
        self.run(request, MutationCallbacks::<_, _, ()>::new(), self.defaults)
            .await
    }

    pub async fn run<C: Clone + Send + 'static>(
        &self,
        request: MutationRequest<E::Input>,
        callbacks: MutationCallbacks<E::Input, E::Output, C>,
        config: RunConfig,
    ) -> MutationOutcome<E::Output> {
        let span = tracing::info_span!(
            "mutation",
            name = self.executor.name(),
            run_id = %Uuid::now_v7(),
        );
        self.run_inner(request, callbacks, config)
            .instrument(span)
            .await
    }

    async fn run_inner<C: Clone + Send + 'static>(
        &self,
        request: MutationRequest<E::Input>,
        callbacks: MutationCallbacks<E::Input, E::Output, C>,
        config: RunConfig,
    ) -> MutationOutcome<E::Output> {
        let MutationCallbacks {
            on_success,
            on_error,
            on_settled,
            context,
        } = callbacks;
        let settled_context = if on_settled.is_some() {
            context.clone()
        } else {
            None
        };

        let outcome = self.executor.execute(&request).await;

        match &outcome {
            MutationOutcome::Success(output) => {
                if config.invalidate_caches_on_success {
                    let scope = self.executor.invalidation_scope(request.input());
                    let removed = self.cache.invalidate(&scope).await;
                    tracing::debug!(scope = %scope, removed, "invalidated after success");
                }
                tracing::info!("mutation succeeded");
                if let Some(hook) = on_success {
                    hook(output.clone(), request.input().clone(), context).await;
                }
                if let Some(hook) = on_settled {
                    let input = request.input().clone();
                    hook(Some(output.clone()), None, input, settled_context).await;
                }
            }
            MutationOutcome::Failed(error) => {
                tracing::warn!(error = %error, code = ?error.code(), "mutation failed");
                match on_error {
                    Some(hook) => hook(error.clone(), request.input().clone(), context).await,
                    None => self.notifier.report_failure(&failure_message(
                        self.executor.failure_prefix(),
                        error.message(),
                    )),
                }
                if let Some(hook) = on_settled {
                    let input = request.input().clone();
                    hook(None, Some(error.clone()), input, settled_context).await;
                }
            }
            MutationOutcome::Cancelled => {
                tracing::debug!("mutation cancelled");
            }
        }

        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use vellum_cache::{ContentKeys, ResourceScope};

    #[derive(Default)]
    struct Log(Mutex<Vec<String>>);

    impl Log {
        fn push(&self, entry: impl Into<String>) {
            self.0.lock().unwrap().push(entry.into());
        }

        fn entries(&self) -> Vec<String> {
            self.0.lock().unwrap().clone()
        }
    }

    struct LoggingCache(Arc<Log>);

    #[async_trait]
    impl CacheInvalidator for LoggingCache {
        async fn invalidate(&self, scope: &ResourceScope) -> u64 {
            self.0.push(format!("invalidate {}", scope));
            1
        }
    }

    struct LoggingNotifier(Arc<Log>);

    impl NotificationSink for LoggingNotifier {
        fn report_failure(&self, message: &str) {
            self.0.push(format!("notify {}", message));
        }
    }

    struct StubExecutor {
        outcome: MutationOutcome<String>,
    }

    #[async_trait]
    impl MutationExecutor for StubExecutor {
        type Input = String;
        type Output = String;

        fn name(&self) -> &'static str {
            "stub"
        }

        fn failure_prefix(&self) -> &'static str {
            "Failed to stub"
        }

        fn invalidation_scope(&self, input: &String) -> ResourceScope {
            ContentKeys::folders(input)
        }

        async fn execute(&self, _request: &MutationRequest<String>) -> MutationOutcome<String> {
            self.outcome.clone()
        }
    }

    fn coordinator(
        outcome: MutationOutcome<String>,
    ) -> (MutationCoordinator<StubExecutor>, Arc<Log>) {
        let log = Arc::new(Log::default());
        let coordinator = MutationCoordinator::new(
            StubExecutor { outcome },
            Arc::new(LoggingCache(Arc::clone(&log))),
            Arc::new(LoggingNotifier(Arc::clone(&log))),
        );
        (coordinator, log)
    }

    #[tokio::test]
    async fn test_success_invalidates_before_callback() {
        let (coordinator, log) = coordinator(MutationOutcome::Success("f1".to_string()));
        let hook_log = Arc::clone(&log);
        let callbacks = MutationCallbacks::new()
            .with_context(7u32)
            .on_success(move |output: String, input: String, context: Option<u32>| async move {
                hook_log.push(format!("success {} {} {:?}", output, input, context));
            });

        let outcome = coordinator
            .run(MutationRequest::new("proj1".to_string()), callbacks, RunConfig::default())
            .await;

        assert!(outcome.is_success());
        assert_eq!(
            log.entries(),
            vec!["invalidate folders/proj1", "success f1 proj1 Some(7)"]
        );
    }

    #[tokio::test]
    async fn test_success_without_invalidation() {
        let (coordinator, log) = coordinator(MutationOutcome::Success("f1".to_string()));
        let outcome = coordinator
            .run(
                MutationRequest::new("proj1".to_string()),
                MutationCallbacks::<_, _, ()>::new(),
                RunConfig::without_invalidation(),
            )
            .await;
        assert!(outcome.is_success());
        assert!(log.entries().is_empty());
    }

    #[tokio::test]
    async fn test_failure_without_handler_notifies_once() {
        let (coordinator, log) = coordinator(MutationOutcome::Failed(MutationError::Protocol {
            message: "name is required".to_string(),
            code: None,
        }));
        let outcome = coordinator.mutate(MutationRequest::new("proj1".to_string())).await;
        assert!(outcome.is_failed());
        assert_eq!(log.entries(), vec!["notify Failed to stub: name is required"]);
    }

    #[tokio::test]
    async fn test_failure_with_handler_skips_notification() {
        let (coordinator, log) = coordinator(MutationOutcome::Failed(MutationError::Transport {
            message: "offline".to_string(),
        }));
        let hook_log = Arc::clone(&log);
        let callbacks = MutationCallbacks::<String, String, ()>::new().on_error(
            move |error, input, _context| async move {
                hook_log.push(format!("error {} {}", error, input));
            },
        );
        coordinator
            .run(MutationRequest::new("proj1".to_string()), callbacks, RunConfig::default())
            .await;
        assert_eq!(log.entries(), vec!["error offline proj1"]);
    }

    #[tokio::test]
    async fn test_settled_runs_after_error_path_with_context() {
        let (coordinator, log) = coordinator(MutationOutcome::Failed(MutationError::Transport {
            message: "offline".to_string(),
        }));
        let hook_log = Arc::clone(&log);
        let callbacks = MutationCallbacks::<String, String, u32>::new()
            .with_context(3)
            .on_settled(move |output, error, input, context| async move {
                hook_log.push(format!(
                    "settled {:?} {:?} {} {:?}",
                    output,
                    error.map(|e| e.to_string()),
                    input,
                    context
                ));
            });
        coordinator
            .run(MutationRequest::new("proj1".to_string()), callbacks, RunConfig::default())
            .await;
        assert_eq!(
            log.entries(),
            vec![
                "notify Failed to stub: offline",
                "settled None Some(\"offline\") proj1 Some(3)",
            ]
        );
    }

    #[tokio::test]
    async fn test_cancelled_is_silent() {
        let (coordinator, log) = coordinator(MutationOutcome::Cancelled);
        let hook_log = Arc::clone(&log);
        let error_log = Arc::clone(&log);
        let settled_log = Arc::clone(&log);
        let callbacks = MutationCallbacks::<String, String, ()>::new()
            .on_success(move |_, _, _| async move { hook_log.push("success") })
            .on_error(move |_, _, _| async move { error_log.push("error") })
            .on_settled(move |_, _, _, _| async move { settled_log.push("settled") });
        let outcome = coordinator
            .run(MutationRequest::new("proj1".to_string()), callbacks, RunConfig::default())
            .await;
        assert!(outcome.is_cancelled());
        assert!(log.entries().is_empty());
    }

    #[test]
    fn test_run_config_from_settings() {
        let config = RunConfig::from(&CoordinatorSettings {
            invalidate_caches_on_success: false,
        });
        assert_eq!(config, RunConfig::without_invalidation());
        assert!(RunConfig::default().invalidate_caches_on_success);
    }
}
