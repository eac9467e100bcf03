//! # LUIS Core
//!
//! Rate-limited, paginated client for the LUIS authoring and prediction APIs.
//!
//! ## Overview
//!
//! - **Subscription endpoint** owning one concurrency gate and retry policy
//! - **Application scope** for per-version resources (intents, utterances, phrase lists)
//! - **Paged sequences** that fetch remote collections lazily and restart from offset 0
//! - **Immediate retry** of throttled (`429`) responses with a fixed attempt ceiling
//! - **Cooperative cancellation** through [`CancellationToken`](tokio_util::sync::CancellationToken)
//!
//! ## Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`application`] | Resource scope for one application version |
//! | [`config`] | Subscription configuration and environment loading |
//! | [`document`] | Optional accessors over remote JSON documents |
//! | [`error`] | Client error type |
//! | [`gate`] | Counting gate bounding in-flight requests |
//! | [`http_client`] | HTTP client abstraction |
//! | [`paging`] | Lazily fetched paged sequences |
//! | [`retry`] | Retry policy for throttled responses |
//! | [`subscription`] | Root endpoint and application lifecycle |
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use luis_core::{Subscription, SubscriptionConfig};
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> luis_core::Result<()> {
//!     let subscription = Subscription::new(SubscriptionConfig::from_env()?)?;
//!     let cancel = CancellationToken::new();
//!
//!     let app = subscription
//!         .get_or_create_application("Demo", "en-us", &cancel)
//!         .await?;
//!     if let Some(app) = app {
//!         let intents = app.intents(None, &cancel).collect_all().await?;
//!         println!("{} intents", intents.len());
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Concurrency
//!
//! Every physical request holds a gate permit for the duration of the call.
//! A logical call retried after a `429` acquires a fresh permit per attempt,
//! so retries never exceed the configured `max_requests`.

pub mod application;
pub mod config;
pub mod document;
pub mod error;
pub mod gate;
pub mod http_client;
pub mod paging;
pub mod retry;
pub mod subscription;

pub use application::{Application, QueryOptions, TrainOptions, APP_VERSION};
pub use config::{
    SubscriptionConfig, DEFAULT_PAGE_SIZE, DEFAULT_REQUEST_TIMEOUT, DEFAULT_TRAINING_POLL_INTERVAL,
};
pub use document::{DocumentExt, ModelTrainingStatus, TrainingDetails, TrainingStatus};
pub use error::{ensure_success, LuisError, Result};
pub use gate::{ConcurrencyGate, GatePermit, DEFAULT_MAX_REQUESTS};
pub use http_client::{
    HttpAuth, HttpClient, HttpError, HttpMethod, HttpRequest, HttpResponse, ReqwestHttpClient,
    SUBSCRIPTION_KEY_HEADER,
};
pub use paging::{PageCursor, PageFuture, PageSource, PagedSequence};
pub use retry::{RetryPolicy, MAX_RETRY, TOO_MANY_REQUESTS};
pub use subscription::Subscription;
