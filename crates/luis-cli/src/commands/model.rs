use luis_core::Subscription;
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;

use crate::cli::{AppArgs, ModelArgs};
use crate::error::CliError;

use super::require_app;

pub async fn import(
    args: &ModelArgs,
    subscription: &Subscription,
    cancel: &CancellationToken,
) -> Result<Value, CliError> {
    let app = subscription
        .get_or_import_application(&args.model, args.spelling_key.as_deref(), cancel)
        .await?;
    Ok(json!({ "id": app.id(), "name": app.name() }))
}

pub async fn replace(
    args: &ModelArgs,
    subscription: &Subscription,
    cancel: &CancellationToken,
) -> Result<Value, CliError> {
    let raw = tokio::fs::read_to_string(&args.model).await?;
    let model: Value = serde_json::from_str(&raw)?;

    let app = subscription
        .replace_application(&model, args.spelling_key.as_deref(), cancel)
        .await?;
    Ok(json!({ "id": app.id(), "name": app.name(), "published": true }))
}

pub async fn export(
    args: &AppArgs,
    subscription: &Subscription,
    cancel: &CancellationToken,
) -> Result<Value, CliError> {
    let app = require_app(subscription, &args.app, cancel).await?;
    Ok(app.download(cancel).await?.unwrap_or(Value::Null))
}
