use luis_core::{QueryOptions, Subscription};
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::cli::QueryArgs;
use crate::error::CliError;

use super::require_app;

pub async fn run(
    args: &QueryArgs,
    subscription: &Subscription,
    cancel: &CancellationToken,
) -> Result<Value, CliError> {
    let app = require_app(subscription, &args.app, cancel).await?;

    let options = QueryOptions {
        log: !args.no_log,
        spell_check: args.spell_check,
        verbose: args.verbose,
    };
    Ok(app.query(&args.text, options, cancel).await?.unwrap_or(Value::Null))
}
