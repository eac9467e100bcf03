mod apps;
mod lifecycle;
mod listing;
mod model;
mod query;

use luis_core::{Application, Subscription, SubscriptionConfig};
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::cli::{Cli, Command};
use crate::error::CliError;

pub async fn run(cli: &Cli, cancel: &CancellationToken) -> Result<Value, CliError> {
    let subscription = Subscription::new(config_from(cli)?)?;

    match &cli.command {
        Command::Apps(args) => apps::list(args, &subscription, cancel).await,
        Command::Show(args) => apps::show(args, &subscription, cancel).await,
        Command::Create(args) => apps::create(args, &subscription, cancel).await,
        Command::Delete(args) => apps::delete(args, &subscription, cancel).await,
        Command::Import(args) => model::import(args, &subscription, cancel).await,
        Command::Replace(args) => model::replace(args, &subscription, cancel).await,
        Command::Export(args) => model::export(args, &subscription, cancel).await,
        Command::Train(args) => lifecycle::train(args, &subscription, cancel).await,
        Command::Publish(args) => lifecycle::publish(args, &subscription, cancel).await,
        Command::Intents(args) => listing::intents(args, &subscription, cancel).await,
        Command::Utterances(args) => listing::utterances(args, &subscription, cancel).await,
        Command::Query(args) => query::run(args, &subscription, cancel).await,
    }
}

fn config_from(cli: &Cli) -> Result<SubscriptionConfig, CliError> {
    let domain = cli.domain.clone().ok_or(CliError::MissingSetting {
        flag: "domain",
        env: "LUIS_DOMAIN",
    })?;
    let key = cli.key.clone().ok_or(CliError::MissingSetting {
        flag: "key",
        env: "LUIS_SUBSCRIPTION_KEY",
    })?;

    let mut config = SubscriptionConfig::new(domain, key).with_max_requests(cli.max_requests);
    if let Some(credential) = &cli.basic_auth {
        config = config.with_basic_auth(credential.clone());
    }
    Ok(config)
}

/// Resolves an application by name or fails with [`CliError::AppNotFound`].
async fn require_app(
    subscription: &Subscription,
    name: &str,
    cancel: &CancellationToken,
) -> Result<Application, CliError> {
    subscription
        .application_by_name(name, cancel)
        .await?
        .ok_or_else(|| CliError::AppNotFound(name.to_owned()))
}
