//! Root endpoint bound to one LUIS authoring subscription.

use std::path::Path;
use std::sync::Arc;

use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;

use crate::application::Application;
use crate::config::SubscriptionConfig;
use crate::document::DocumentExt;
use crate::error::{ensure_success, LuisError, Result};
use crate::gate::ConcurrencyGate;
use crate::http_client::{HttpAuth, HttpClient, HttpMethod, HttpRequest, HttpResponse, ReqwestHttpClient};
use crate::paging::PagedSequence;
use crate::retry::RetryPolicy;

/// Tracing target for endpoint operations.
pub const TRACING_TARGET: &str = "luis_core::subscription";

struct SubscriptionInner {
    config: SubscriptionConfig,
    http: Arc<dyn HttpClient>,
    gate: ConcurrencyGate,
    retry: RetryPolicy,
}

/// Client for one remote subscription.
///
/// Owns the concurrency gate and retry policy; every [`Application`] created
/// from it shares both. Cloning is cheap and yields a handle to the same
/// endpoint.
#[derive(Clone)]
pub struct Subscription {
    inner: Arc<SubscriptionInner>,
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("config", &self.inner.config)
            .field("gate", &self.inner.gate)
            .field("retry", &self.inner.retry)
            .finish_non_exhaustive()
    }
}

/// Progress of [`Subscription::replace_application`] after the import.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReplaceStage {
    Imported,
    SpellingAdded,
    Trained,
    Published,
}

impl Subscription {
    /// Creates an endpoint backed by the reqwest transport.
    pub fn new(config: SubscriptionConfig) -> Result<Self> {
        Self::with_http_client(config, Arc::new(ReqwestHttpClient::new()))
    }

    pub fn with_http_client(config: SubscriptionConfig, http: Arc<dyn HttpClient>) -> Result<Self> {
        Self::from_parts(config, http, RetryPolicy::default())
    }

    pub fn from_parts(
        config: SubscriptionConfig,
        http: Arc<dyn HttpClient>,
        retry: RetryPolicy,
    ) -> Result<Self> {
        config.validate()?;

        let gate = ConcurrencyGate::new(config.max_requests);
        tracing::debug!(
            target: TRACING_TARGET,
            domain = %config.domain,
            max_requests = gate.permits(),
            basic_auth = config.basic_auth.is_some(),
            "Creating subscription endpoint"
        );

        Ok(Self {
            inner: Arc::new(SubscriptionInner {
                config,
                http,
                gate,
                retry,
            }),
        })
    }

    pub fn domain(&self) -> &str {
        &self.inner.config.domain
    }

    pub fn key(&self) -> &str {
        &self.inner.config.subscription_key
    }

    pub fn config(&self) -> &SubscriptionConfig {
        &self.inner.config
    }

    pub fn gate(&self) -> &ConcurrencyGate {
        &self.inner.gate
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.inner.retry
    }

    pub fn uses_basic_auth(&self) -> bool {
        self.inner.config.basic_auth.is_some()
    }

    /// Absolute authoring URI for `api`.
    ///
    /// Credential-bearing clients talk to `/api/v2.0/`, subscription-key
    /// clients to `/luis/api/v2.0/`.
    pub fn base_uri(&self, api: &str) -> String {
        if self.uses_basic_auth() {
            format!("https://{}/api/v2.0/{api}", self.domain())
        } else {
            format!("https://{}/luis/api/v2.0/{api}", self.domain())
        }
    }

    /// GET against an absolute URI, bypassing the authoring base path.
    pub async fn raw_get(&self, uri: &str, cancel: &CancellationToken) -> Result<HttpResponse> {
        self.send(HttpMethod::Get, uri, None, cancel).await
    }

    pub async fn get(&self, api: &str, cancel: &CancellationToken) -> Result<HttpResponse> {
        self.raw_get(&self.base_uri(api), cancel).await
    }

    pub async fn post(
        &self,
        api: &str,
        body: &Value,
        cancel: &CancellationToken,
    ) -> Result<HttpResponse> {
        let body = serde_json::to_string(body)?;
        self.send(HttpMethod::Post, &self.base_uri(api), Some(body), cancel)
            .await
    }

    pub async fn put(
        &self,
        api: &str,
        body: &Value,
        cancel: &CancellationToken,
    ) -> Result<HttpResponse> {
        let body = serde_json::to_string(body)?;
        self.send(HttpMethod::Put, &self.base_uri(api), Some(body), cancel)
            .await
    }

    pub async fn delete(&self, api: &str, cancel: &CancellationToken) -> Result<HttpResponse> {
        self.send(HttpMethod::Delete, &self.base_uri(api), None, cancel)
            .await
    }

    async fn send(
        &self,
        method: HttpMethod,
        url: &str,
        body: Option<String>,
        cancel: &CancellationToken,
    ) -> Result<HttpResponse> {
        self.inner
            .retry
            .execute(move || self.send_once(method, url, body.clone(), cancel))
            .await
    }

    /// One physical call, holding a gate permit for its whole duration.
    async fn send_once(
        &self,
        method: HttpMethod,
        url: &str,
        body: Option<String>,
        cancel: &CancellationToken,
    ) -> Result<HttpResponse> {
        let permit = self.inner.gate.acquire(cancel).await?;

        let config = &self.inner.config;
        let mut request = HttpRequest::new(method, url)
            .with_auth(&HttpAuth::SubscriptionKey(config.subscription_key.clone()))
            .with_timeout_ms(config.effective_timeout().as_millis() as u64);
        if let Some(credential) = &config.basic_auth {
            request = request.with_auth(&HttpAuth::Basic(credential.clone()));
        }
        if let Some(body) = body {
            request = request.with_json_body(body);
        }

        tracing::trace!(target: TRACING_TARGET, %method, url, "Sending request");

        let outcome = tokio::select! {
            response = self.inner.http.execute(request) => response.map_err(LuisError::from),
            () = cancel.cancelled() => Err(LuisError::Cancelled),
        };
        permit.release();

        if let Ok(response) = &outcome {
            tracing::trace!(
                target: TRACING_TARGET,
                %method,
                url,
                status = response.status,
                "Received response"
            );
        }
        outcome
    }

    /// Paged sequence over the JSON array served at `api`.
    pub(crate) fn paged(
        &self,
        api: String,
        take: Option<u32>,
        cancel: &CancellationToken,
    ) -> PagedSequence<Value> {
        let subscription = self.clone();
        PagedSequence::new(
            move |skip: usize, cancel: CancellationToken| {
                let subscription = subscription.clone();
                let uri = page_uri(&api, skip, take);
                async move { subscription.fetch_page(&uri, &cancel).await }
            },
            cancel.clone(),
        )
    }

    async fn fetch_page(&self, api: &str, cancel: &CancellationToken) -> Result<Option<Vec<Value>>> {
        let response = self.get(api, cancel).await?;
        ensure_success(&response)?;

        match serde_json::from_str::<Value>(&response.body)? {
            Value::Array(items) if items.is_empty() => Ok(None),
            Value::Array(items) => Ok(Some(items)),
            _ => Err(LuisError::MalformedResponse(format!(
                "expected a JSON array from '{api}'"
            ))),
        }
    }

    /// Every application in the subscription.
    pub fn applications(&self, take: Option<u32>, cancel: &CancellationToken) -> PagedSequence<Value> {
        self.paged(String::from("apps"), take, cancel)
    }

    /// Fetches one application by id; `None` when the remote does not report success.
    pub async fn application(
        &self,
        app_id: &str,
        cancel: &CancellationToken,
    ) -> Result<Option<Application>> {
        let response = self.get(&format!("apps/{app_id}"), cancel).await?;
        if !response.is_success() {
            return Ok(None);
        }

        let descriptor: Value = serde_json::from_str(&response.body)?;
        Application::from_descriptor(self.clone(), descriptor).map(Some)
    }

    /// Looks an application up by name, ignoring case.
    pub async fn application_by_name(
        &self,
        app_name: &str,
        cancel: &CancellationToken,
    ) -> Result<Option<Application>> {
        let wanted = app_name.to_lowercase();
        let descriptor = self
            .applications(None, cancel)
            .find_first(|app| app.name().is_some_and(|name| name.to_lowercase() == wanted))
            .await?;

        descriptor
            .map(|descriptor| Application::from_descriptor(self.clone(), descriptor))
            .transpose()
    }

    /// Deletes the application named `app_name`; `false` when none exists.
    pub async fn delete_application_by_name(
        &self,
        app_name: &str,
        cancel: &CancellationToken,
    ) -> Result<bool> {
        match self.application_by_name(app_name, cancel).await? {
            Some(app) => app.delete(cancel).await,
            None => Ok(false),
        }
    }

    /// Imports an exported model document as a new application named `app_name`.
    pub async fn import_application(
        &self,
        app_name: &str,
        model: &Value,
        cancel: &CancellationToken,
    ) -> Result<Option<Application>> {
        let app_id = self.post_import(app_name, model, cancel).await?;
        self.application(&app_id, cancel).await
    }

    /// POSTs the import and returns the id of the created application.
    async fn post_import(
        &self,
        app_name: &str,
        model: &Value,
        cancel: &CancellationToken,
    ) -> Result<String> {
        let api = format!("apps/import?appName={}", urlencoding::encode(app_name));
        let response = self.post(&api, model, cancel).await?;
        ensure_success(&response)?;

        let app_id = response.unquoted_body();
        tracing::info!(target: TRACING_TARGET, app_name, %app_id, "Imported application");
        Ok(app_id)
    }

    /// Deletes the application with id `app_id`; `true` when the remote reports success.
    pub async fn delete_application_id(
        &self,
        app_id: &str,
        cancel: &CancellationToken,
    ) -> Result<bool> {
        let response = self.delete(&format!("apps/{app_id}"), cancel).await?;

        tracing::debug!(
            target: TRACING_TARGET,
            app_id,
            status = response.status,
            "Deleted application"
        );
        Ok(response.is_success())
    }

    /// Replaces any application with the document's name by a freshly
    /// imported, trained and published one.
    ///
    /// When a step after the import fails, the new unpublished application
    /// is deleted before the original error is returned.
    pub async fn replace_application(
        &self,
        model: &Value,
        spelling_key: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<Application> {
        let app_name = model
            .name()
            .ok_or_else(|| LuisError::InvalidDocument(String::from("model has no 'name' field")))?;

        if let Some(old) = self.application_by_name(app_name, cancel).await? {
            tracing::info!(
                target: TRACING_TARGET,
                app_name,
                app_id = old.id(),
                "Deleting existing application before import"
            );
            old.delete(cancel).await?;
        }

        let app_id = self.post_import(app_name, model, cancel).await?;
        let mut stage = ReplaceStage::Imported;

        let outcome = async {
            let app = self.application(&app_id, cancel).await?.ok_or_else(|| {
                LuisError::MalformedResponse(format!(
                    "imported application '{app_name}' could not be fetched"
                ))
            })?;
            Self::finish_replacement(&app, spelling_key, &mut stage, cancel).await?;
            Ok::<_, LuisError>(app)
        }
        .await;

        match outcome {
            Ok(app) => Ok(app),
            Err(error) => {
                tracing::warn!(
                    target: TRACING_TARGET,
                    %app_id,
                    ?stage,
                    %error,
                    "Replacement failed, deleting unpublished application"
                );
                // The caller's token may be the reason we failed; clean up regardless.
                if let Err(cleanup) = self
                    .delete_application_id(&app_id, &CancellationToken::new())
                    .await
                {
                    tracing::warn!(
                        target: TRACING_TARGET,
                        %app_id,
                        error = %cleanup,
                        "Compensating delete failed"
                    );
                }
                Err(error)
            }
        }
    }

    async fn finish_replacement(
        app: &Application,
        spelling_key: Option<&str>,
        stage: &mut ReplaceStage,
        cancel: &CancellationToken,
    ) -> Result<()> {
        if let Some(key) = spelling_key {
            app.add_spelling(key, cancel).await?;
            *stage = ReplaceStage::SpellingAdded;
        }

        if !app.train(cancel).await? {
            return Err(LuisError::StepRejected {
                step: "training",
                app_id: app.id().to_owned(),
            });
        }
        *stage = ReplaceStage::Trained;

        if !app.publish(false, cancel).await? {
            return Err(LuisError::StepRejected {
                step: "publish",
                app_id: app.id().to_owned(),
            });
        }
        *stage = ReplaceStage::Published;

        tracing::info!(
            target: TRACING_TARGET,
            app_id = app.id(),
            ?stage,
            "Application replaced"
        );
        Ok(())
    }

    /// Registers a subscription-wide external key.
    pub async fn add_external_key(&self, key: &Value, cancel: &CancellationToken) -> Result<bool> {
        let response = self.post("externalKeys", key, cancel).await?;
        ensure_success(&response)?;
        Ok(true)
    }

    /// Returns the application named in the document at `model_path`,
    /// importing it through [`Self::replace_application`] when absent.
    pub async fn get_or_import_application(
        &self,
        model_path: impl AsRef<Path>,
        spelling_key: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<Application> {
        let raw = tokio::fs::read_to_string(model_path.as_ref()).await?;
        let model: Value = serde_json::from_str(&raw)?;
        let app_name = model
            .name()
            .ok_or_else(|| LuisError::InvalidDocument(String::from("model has no 'name' field")))?;

        if let Some(app) = self.application_by_name(app_name, cancel).await? {
            return Ok(app);
        }
        self.replace_application(&model, spelling_key, cancel).await
    }

    /// Returns the application named `name`, creating an empty one when absent.
    pub async fn get_or_create_application(
        &self,
        name: &str,
        culture: &str,
        cancel: &CancellationToken,
    ) -> Result<Option<Application>> {
        if let Some(app) = self.application_by_name(name, cancel).await? {
            return Ok(Some(app));
        }

        let response = self
            .post("apps", &json!({ "name": name, "culture": culture }), cancel)
            .await?;
        ensure_success(&response)?;

        let app_id = response.unquoted_body();
        tracing::info!(target: TRACING_TARGET, name, %app_id, "Created application");
        self.application(&app_id, cancel).await
    }
}

fn page_uri(api: &str, skip: usize, take: Option<u32>) -> String {
    match take {
        Some(take) => format!("{api}?skip={skip}&take={take}"),
        None => format!("{api}?skip={skip}"),
    }
}

#[cfg(test)]
mod tests {
    use std::future::Future;
    use std::pin::Pin;
    use std::sync::Mutex;

    use super::*;
    use crate::http_client::{HttpError, SUBSCRIPTION_KEY_HEADER};

    struct RecordingHttpClient {
        requests: Mutex<Vec<HttpRequest>>,
    }

    impl RecordingHttpClient {
        fn new() -> Self {
            Self {
                requests: Mutex::new(Vec::new()),
            }
        }

        fn recorded_requests(&self) -> Vec<HttpRequest> {
            self.requests
                .lock()
                .expect("request store should not be poisoned")
                .clone()
        }
    }

    impl HttpClient for RecordingHttpClient {
        fn execute<'a>(
            &'a self,
            request: HttpRequest,
        ) -> Pin<Box<dyn Future<Output = std::result::Result<HttpResponse, HttpError>> + Send + 'a>>
        {
            self.requests
                .lock()
                .expect("request store should not be poisoned")
                .push(request);
            Box::pin(async { Ok(HttpResponse::ok_json("[]")) })
        }
    }

    fn subscription(config: SubscriptionConfig) -> (Subscription, Arc<RecordingHttpClient>) {
        let client = Arc::new(RecordingHttpClient::new());
        let subscription =
            Subscription::with_http_client(config, client.clone()).expect("valid config");
        (subscription, client)
    }

    #[test]
    fn key_only_clients_use_luis_prefixed_base_path() {
        let (subscription, _) = subscription(SubscriptionConfig::new("fake.test", "key"));
        assert_eq!(
            subscription.base_uri("apps"),
            "https://fake.test/luis/api/v2.0/apps"
        );
    }

    #[test]
    fn credential_bearing_clients_use_bare_base_path() {
        let (subscription, _) =
            subscription(SubscriptionConfig::new("fake.test", "key").with_basic_auth("u:p"));
        assert_eq!(subscription.base_uri("apps"), "https://fake.test/api/v2.0/apps");
    }

    #[test]
    fn page_uri_appends_take_only_when_configured() {
        assert_eq!(page_uri("apps", 0, None), "apps?skip=0");
        assert_eq!(page_uri("intents", 500, Some(500)), "intents?skip=500&take=500");
    }

    #[tokio::test]
    async fn requests_carry_subscription_key_and_basic_auth() {
        let (subscription, client) =
            subscription(SubscriptionConfig::new("fake.test", "key-1").with_basic_auth("u:p"));

        subscription
            .post("apps", &json!({"name": "x"}), &CancellationToken::new())
            .await
            .expect("response");

        let requests = client.recorded_requests();
        assert_eq!(requests.len(), 1);
        let request = &requests[0];
        assert_eq!(request.method, HttpMethod::Post);
        assert_eq!(request.url, "https://fake.test/api/v2.0/apps");
        assert_eq!(
            request.headers.get(SUBSCRIPTION_KEY_HEADER).map(String::as_str),
            Some("key-1")
        );
        assert_eq!(
            request.headers.get("authorization").map(String::as_str),
            Some("Basic dTpw")
        );
        assert_eq!(
            request.headers.get("content-type").map(String::as_str),
            Some("application/json")
        );
        assert_eq!(request.body.as_deref(), Some(r#"{"name":"x"}"#));
        assert_eq!(request.timeout_ms, 120_000);
    }

    #[tokio::test]
    async fn cancelled_token_stops_before_any_call() {
        let (subscription, client) = subscription(SubscriptionConfig::new("fake.test", "key"));
        let cancel = CancellationToken::new();
        cancel.cancel();

        let outcome = subscription.get("apps", &cancel).await;
        assert!(matches!(outcome, Err(LuisError::Cancelled)));
        assert!(client.recorded_requests().is_empty());
        assert_eq!(subscription.gate().available(), 30);
    }
}
