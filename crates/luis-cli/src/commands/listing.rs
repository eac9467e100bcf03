use luis_core::Subscription;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::cli::{AppListArgs, UtterancesArgs};
use crate::error::CliError;

use super::require_app;

pub async fn intents(
    args: &AppListArgs,
    subscription: &Subscription,
    cancel: &CancellationToken,
) -> Result<Value, CliError> {
    let app = require_app(subscription, &args.app, cancel).await?;
    let intents = app.intents(args.take, cancel).collect_all().await?;
    Ok(Value::Array(intents))
}

pub async fn utterances(
    args: &UtterancesArgs,
    subscription: &Subscription,
    cancel: &CancellationToken,
) -> Result<Value, CliError> {
    let app = require_app(subscription, &args.app, cancel).await?;

    let utterances = if args.intents.is_empty() {
        app.utterances(None, cancel).collect_all().await?
    } else {
        app.utterances_for_intents(args.intents.iter().cloned(), cancel)
            .await?
    };
    Ok(Value::Array(utterances))
}
