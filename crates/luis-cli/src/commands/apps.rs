use luis_core::Subscription;
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;

use crate::cli::{AppArgs, CreateArgs, ListArgs};
use crate::error::CliError;

use super::require_app;

pub async fn list(
    args: &ListArgs,
    subscription: &Subscription,
    cancel: &CancellationToken,
) -> Result<Value, CliError> {
    let apps = subscription
        .applications(args.take, cancel)
        .collect_all()
        .await?;
    Ok(Value::Array(apps))
}

pub async fn show(
    args: &AppArgs,
    subscription: &Subscription,
    cancel: &CancellationToken,
) -> Result<Value, CliError> {
    let app = require_app(subscription, &args.app, cancel).await?;
    Ok(app.descriptor().clone())
}

pub async fn create(
    args: &CreateArgs,
    subscription: &Subscription,
    cancel: &CancellationToken,
) -> Result<Value, CliError> {
    let app = subscription
        .get_or_create_application(&args.name, &args.culture, cancel)
        .await?
        .ok_or_else(|| CliError::AppNotFound(args.name.clone()))?;
    Ok(app.descriptor().clone())
}

pub async fn delete(
    args: &AppArgs,
    subscription: &Subscription,
    cancel: &CancellationToken,
) -> Result<Value, CliError> {
    let deleted = subscription
        .delete_application_by_name(&args.app, cancel)
        .await?;
    Ok(json!({ "app": args.app, "deleted": deleted }))
}
