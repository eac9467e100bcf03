//! Resource scope for one application version.

use std::collections::HashSet;
use std::time::Duration;

use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;

use crate::config::DEFAULT_TRAINING_POLL_INTERVAL;
use crate::document::{DocumentExt, ModelTrainingStatus, TrainingStatus};
use crate::error::{ensure_success, LuisError, Result};
use crate::http_client::HttpResponse;
use crate::paging::PagedSequence;
use crate::subscription::Subscription;

/// Tracing target for application operations.
pub const TRACING_TARGET: &str = "luis_core::application";

/// Version every application is authored under.
pub const APP_VERSION: &str = "0.1";

/// Polling behaviour of [`Application::train_with`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrainOptions {
    pub poll_interval: Duration,
    /// Upper bound on the polling phase; `None` polls until a terminal state.
    pub deadline: Option<Duration>,
}

impl Default for TrainOptions {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_TRAINING_POLL_INTERVAL,
            deadline: None,
        }
    }
}

impl TrainOptions {
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }
}

/// Flags of a prediction query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryOptions {
    pub log: bool,
    pub spell_check: bool,
    pub verbose: bool,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            log: true,
            spell_check: false,
            verbose: false,
        }
    }
}

/// Handle to one application, scoped to `apps/{id}/versions/{version}/`.
///
/// Calls go through the parent [`Subscription`], sharing its gate and
/// retry policy.
#[derive(Debug, Clone)]
pub struct Application {
    subscription: Subscription,
    id: String,
    version: String,
    descriptor: Value,
    take: Option<u32>,
}

impl Application {
    pub(crate) fn from_descriptor(subscription: Subscription, descriptor: Value) -> Result<Self> {
        let id = descriptor.id().ok_or_else(|| {
            LuisError::MalformedResponse(String::from("application descriptor has no 'id'"))
        })?;
        let take = subscription.config().page_size;

        Ok(Self {
            subscription,
            id,
            version: String::from(APP_VERSION),
            descriptor,
            take,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn name(&self) -> Option<&str> {
        self.descriptor.name()
    }

    /// Descriptor snapshot as fetched from the remote.
    pub fn descriptor(&self) -> &Value {
        &self.descriptor
    }

    pub fn subscription(&self) -> &Subscription {
        &self.subscription
    }

    /// Authoring path of `api` within this application version.
    pub fn app_api(&self, api: &str) -> String {
        format!("apps/{}/versions/{}/{api}", self.id, self.version)
    }

    pub async fn get(&self, api: &str, cancel: &CancellationToken) -> Result<HttpResponse> {
        self.subscription.get(&self.app_api(api), cancel).await
    }

    pub async fn post(
        &self,
        api: &str,
        body: &Value,
        cancel: &CancellationToken,
    ) -> Result<HttpResponse> {
        self.subscription.post(&self.app_api(api), body, cancel).await
    }

    pub async fn put(
        &self,
        api: &str,
        body: &Value,
        cancel: &CancellationToken,
    ) -> Result<HttpResponse> {
        self.subscription.put(&self.app_api(api), body, cancel).await
    }

    /// DELETE a sub-resource of this application version.
    pub async fn delete_path(&self, api: &str, cancel: &CancellationToken) -> Result<HttpResponse> {
        self.subscription.delete(&self.app_api(api), cancel).await
    }

    /// Deletes the whole application; `true` when the remote reports success.
    pub async fn delete(&self, cancel: &CancellationToken) -> Result<bool> {
        self.subscription.delete_application_id(&self.id, cancel).await
    }

    fn paged(&self, api: &str, take: Option<u32>, cancel: &CancellationToken) -> PagedSequence<Value> {
        self.subscription
            .paged(self.app_api(api), take.or(self.take), cancel)
    }

    pub fn models(&self, take: Option<u32>, cancel: &CancellationToken) -> PagedSequence<Value> {
        self.paged("models", take, cancel)
    }

    /// Name of the model with id `model_id`.
    pub async fn model_name(
        &self,
        model_id: &str,
        cancel: &CancellationToken,
    ) -> Result<Option<String>> {
        let model = self
            .models(None, cancel)
            .find_first(|model| model.id().as_deref() == Some(model_id))
            .await?;
        Ok(model.and_then(|model| model.name().map(String::from)))
    }

    /// Current per-model training state.
    pub async fn training_status(
        &self,
        cancel: &CancellationToken,
    ) -> Result<Vec<ModelTrainingStatus>> {
        let response = self.get("train", cancel).await?;
        ensure_success(&response)?;
        Ok(serde_json::from_str(&response.body)?)
    }

    /// Starts training and polls until every model is done.
    ///
    /// Polls without a deadline at the endpoint's configured interval; use
    /// [`Self::train_with`] to bound it.
    pub async fn train(&self, cancel: &CancellationToken) -> Result<bool> {
        let options = TrainOptions {
            poll_interval: self.subscription.config().training_poll_interval,
            deadline: None,
        };
        self.train_with(options, cancel).await
    }

    /// Starts training and polls until every model reaches a terminal state.
    ///
    /// Returns `false` when the remote did not accept the training request.
    /// A model reporting failure ends polling with [`LuisError::TrainingFailed`].
    pub async fn train_with(
        &self,
        options: TrainOptions,
        cancel: &CancellationToken,
    ) -> Result<bool> {
        let response = self.post("train", &json!({}), cancel).await?;
        if !response.is_success() {
            return Ok(false);
        }

        let started = tokio::time::Instant::now();
        loop {
            tokio::select! {
                () = tokio::time::sleep(options.poll_interval) => {}
                () = cancel.cancelled() => return Err(LuisError::Cancelled),
            }

            let statuses = self.training_status(cancel).await?;
            if let Some(failed) = statuses
                .iter()
                .find(|model| model.status() == TrainingStatus::Fail)
            {
                let model = self
                    .model_name(&failed.model_id, cancel)
                    .await?
                    .unwrap_or_else(|| failed.model_id.clone());
                return Err(LuisError::TrainingFailed {
                    model,
                    reason: failed.details.failure_reason.clone().unwrap_or_default(),
                });
            }

            let pending = statuses
                .iter()
                .filter(|model| model.status().is_pending())
                .count();
            if pending == 0 {
                break;
            }

            if let Some(deadline) = options.deadline {
                if started.elapsed() >= deadline {
                    return Err(LuisError::TrainingTimedOut(deadline));
                }
            }

            tracing::debug!(
                target: TRACING_TARGET,
                app_id = %self.id,
                pending,
                "Waiting for training"
            );
        }

        tracing::info!(target: TRACING_TARGET, app_id = %self.id, "Training complete");
        Ok(true)
    }

    /// Publishes this version to the staging or production slot.
    pub async fn publish(&self, is_staging: bool, cancel: &CancellationToken) -> Result<bool> {
        let body = json!({ "versionId": self.version, "isStaging": is_staging });
        let response = self
            .subscription
            .post(&format!("apps/{}/publish", self.id), &body, cancel)
            .await?;
        Ok(response.is_success())
    }

    /// Registers a Bing spell-check key.
    pub async fn add_spelling(&self, key: &str, cancel: &CancellationToken) -> Result<bool> {
        self.add_external_key(&json!({ "type": "BingSpellCheck", "value": key }), cancel)
            .await
    }

    pub async fn add_external_key(&self, key: &Value, cancel: &CancellationToken) -> Result<bool> {
        let response = self.put("externalKeys", key, cancel).await?;
        ensure_success(&response)?;
        Ok(true)
    }

    /// Full export of this version, or `None` when the remote refuses.
    pub async fn download(&self, cancel: &CancellationToken) -> Result<Option<Value>> {
        let response = self.get("export", cancel).await?;
        if !response.is_success() {
            return Ok(None);
        }
        Ok(Some(serde_json::from_str(&response.body)?))
    }

    pub async fn upload_utterance(
        &self,
        utterance: &Value,
        cancel: &CancellationToken,
    ) -> Result<bool> {
        let response = self.post("example", utterance, cancel).await?;
        Ok(response.is_success())
    }

    /// Uploads a batch of labelled utterances, returning the per-item results.
    pub async fn upload_utterances(
        &self,
        utterances: &Value,
        cancel: &CancellationToken,
    ) -> Result<Option<Vec<Value>>> {
        let response = self.post("examples", utterances, cancel).await?;
        if !response.is_success() {
            return Ok(None);
        }
        Ok(Some(serde_json::from_str(&response.body)?))
    }

    pub fn intents(&self, take: Option<u32>, cancel: &CancellationToken) -> PagedSequence<Value> {
        self.paged("intents", take, cancel)
    }

    /// Id of the intent named exactly `name` (case-sensitive).
    pub async fn intent_id(&self, name: &str, cancel: &CancellationToken) -> Result<Option<String>> {
        let intent = self
            .intents(None, cancel)
            .find_first(|intent| intent.name() == Some(name))
            .await?;
        Ok(intent.and_then(|intent| intent.id()))
    }

    /// Deletes the intent named `name`; a missing intent counts as success.
    pub async fn delete_intent(&self, name: &str, cancel: &CancellationToken) -> Result<bool> {
        match self.intent_id(name, cancel).await? {
            Some(id) => Ok(self
                .delete_path(&format!("intents/{id}"), cancel)
                .await?
                .is_success()),
            None => Ok(true),
        }
    }

    pub async fn create_intent(&self, name: &str, cancel: &CancellationToken) -> Result<bool> {
        let response = self.post("intents", &json!({ "name": name }), cancel).await?;
        Ok(response.is_success())
    }

    pub async fn create_phrase_list(
        &self,
        phrase_list: &Value,
        cancel: &CancellationToken,
    ) -> Result<bool> {
        let response = self.post("phraselists", phrase_list, cancel).await?;
        Ok(response.is_success())
    }

    pub fn phrase_lists(&self, take: Option<u32>, cancel: &CancellationToken) -> PagedSequence<Value> {
        self.paged("phraselists", take, cancel)
    }

    /// Id of the phrase list named exactly `name` (case-sensitive).
    pub async fn phrase_list_id(
        &self,
        name: &str,
        cancel: &CancellationToken,
    ) -> Result<Option<String>> {
        let phrase_list = self
            .phrase_lists(None, cancel)
            .find_first(|phrase_list| phrase_list.name() == Some(name))
            .await?;
        Ok(phrase_list.and_then(|phrase_list| phrase_list.id()))
    }

    /// Deletes the phrase list named `name`; a missing list counts as success.
    pub async fn delete_phrase_list(&self, name: &str, cancel: &CancellationToken) -> Result<bool> {
        match self.phrase_list_id(name, cancel).await? {
            Some(id) => Ok(self
                .delete_path(&format!("phraselists/{id}"), cancel)
                .await?
                .is_success()),
            None => Ok(true),
        }
    }

    /// Creates a closed list entity and returns its id.
    pub async fn create_closed_list(
        &self,
        closed_list: &Value,
        cancel: &CancellationToken,
    ) -> Result<Option<String>> {
        let response = self.post("closedlists", closed_list, cancel).await?;
        Ok(response.is_success().then(|| response.unquoted_body()))
    }

    /// Prediction endpoint URI for `query`.
    pub fn query_uri(&self, query: &str, options: QueryOptions) -> String {
        format!(
            "https://{}/luis/v2.0/apps/{}?subscription-key={}&q={}&log={}&spellCheck={}&verbose={}",
            self.subscription.domain(),
            self.id,
            urlencoding::encode(self.subscription.key()),
            urlencoding::encode(query),
            options.log,
            options.spell_check,
            options.verbose,
        )
    }

    /// Runs `query` against the published prediction endpoint.
    pub async fn query(
        &self,
        query: &str,
        options: QueryOptions,
        cancel: &CancellationToken,
    ) -> Result<Option<Value>> {
        let uri = self.query_uri(query, options);
        let response = self.subscription.raw_get(&uri, cancel).await?;
        if !response.is_success() {
            return Ok(None);
        }
        Ok(Some(serde_json::from_str(&response.body)?))
    }

    pub fn utterances(&self, take: Option<u32>, cancel: &CancellationToken) -> PagedSequence<Value> {
        self.paged("examples", take, cancel)
    }

    /// Every utterance labelled with one of `intent_names`.
    pub async fn utterances_for_intents<I, S>(
        &self,
        intent_names: I,
        cancel: &CancellationToken,
    ) -> Result<Vec<Value>>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names: HashSet<String> = intent_names.into_iter().map(Into::into).collect();
        self.utterances(None, cancel)
            .collect_matching(|utterance| {
                utterance
                    .str_field("intentLabel")
                    .is_some_and(|label| names.contains(label))
            })
            .await
    }

    pub async fn delete_utterance(&self, utterance_id: &str, cancel: &CancellationToken) -> Result<bool> {
        let response = self
            .delete_path(&format!("examples/{utterance_id}"), cancel)
            .await?;
        Ok(response.is_success())
    }
}
