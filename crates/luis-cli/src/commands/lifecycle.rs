use std::time::Duration;

use luis_core::{Subscription, TrainOptions};
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;

use crate::cli::{PublishArgs, TrainArgs};
use crate::error::CliError;

use super::require_app;

pub async fn train(
    args: &TrainArgs,
    subscription: &Subscription,
    cancel: &CancellationToken,
) -> Result<Value, CliError> {
    let app = require_app(subscription, &args.app, cancel).await?;

    let options = TrainOptions {
        poll_interval: Duration::from_millis(args.poll_ms),
        deadline: args.deadline_secs.map(Duration::from_secs),
    };
    let trained = app.train_with(options, cancel).await?;
    let statuses = app.training_status(cancel).await?;

    let models: Vec<Value> = statuses
        .iter()
        .map(|model| {
            json!({
                "modelId": model.model_id,
                "status": format!("{:?}", model.status()),
            })
        })
        .collect();
    Ok(json!({ "id": app.id(), "trained": trained, "models": models }))
}

pub async fn publish(
    args: &PublishArgs,
    subscription: &Subscription,
    cancel: &CancellationToken,
) -> Result<Value, CliError> {
    let app = require_app(subscription, &args.app, cancel).await?;
    let published = app.publish(args.staging, cancel).await?;
    Ok(json!({ "id": app.id(), "staging": args.staging, "published": published }))
}
