//! CLI argument definitions for luis.
//!
//! # Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `apps` | List applications in the subscription |
//! | `show` | Show one application by name |
//! | `create` | Get or create an application |
//! | `import` | Import a model file unless already present |
//! | `replace` | Replace an application from a model file |
//! | `delete` | Delete an application by name |
//! | `train` | Train an application and wait for completion |
//! | `publish` | Publish an application |
//! | `export` | Export an application's model document |
//! | `intents` | List intents |
//! | `utterances` | List labelled utterances |
//! | `query` | Run a prediction query |
//!
//! # Global Options
//!
//! | Option | Env | Description |
//! |--------|-----|-------------|
//! | `--domain` | `LUIS_DOMAIN` | Authoring host |
//! | `--key` | `LUIS_SUBSCRIPTION_KEY` | Subscription key |
//! | `--basic-auth` | `LUIS_BASIC_AUTH` | Optional `user:password` credential |
//! | `--max-requests` | `LUIS_MAX_REQUESTS` | Simultaneous calls (default 30) |
//! | `--pretty` | | Pretty-print JSON output |

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Provision and query LUIS applications.
#[derive(Debug, Parser)]
#[command(name = "luis", author, version, about = "Provision and query LUIS applications")]
pub struct Cli {
    /// Authoring host, e.g. westus.api.cognitive.microsoft.com.
    #[arg(long, global = true, env = "LUIS_DOMAIN")]
    pub domain: Option<String>,

    /// Subscription key sent with every request.
    #[arg(long, global = true, env = "LUIS_SUBSCRIPTION_KEY", hide_env_values = true)]
    pub key: Option<String>,

    /// `user:password` credential; switches to the bare `/api/v2.0/` base path.
    #[arg(long, global = true, env = "LUIS_BASIC_AUTH", hide_env_values = true)]
    pub basic_auth: Option<String>,

    /// Maximum number of simultaneous calls.
    #[arg(long, global = true, env = "LUIS_MAX_REQUESTS", default_value_t = 30)]
    pub max_requests: usize,

    /// Pretty-print JSON output with indentation.
    #[arg(long, global = true, default_value_t = false)]
    pub pretty: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// List applications in the subscription.
    Apps(ListArgs),

    /// Show one application's descriptor.
    Show(AppArgs),

    /// Return the named application, creating it when absent.
    Create(CreateArgs),

    /// Import a model file unless an application with its name exists.
    Import(ModelArgs),

    /// Delete, re-import, train and publish from a model file.
    Replace(ModelArgs),

    /// Delete an application by name.
    Delete(AppArgs),

    /// Train an application and wait until every model settles.
    Train(TrainArgs),

    /// Publish an application to production or staging.
    Publish(PublishArgs),

    /// Export an application's model document.
    Export(AppArgs),

    /// List an application's intents.
    Intents(AppListArgs),

    /// List labelled utterances, optionally filtered by intent.
    Utterances(UtterancesArgs),

    /// Run a prediction query against a published application.
    Query(QueryArgs),
}

#[derive(Debug, Args)]
pub struct ListArgs {
    /// Page size sent as `take`.
    #[arg(long)]
    pub take: Option<u32>,
}

#[derive(Debug, Args)]
pub struct AppArgs {
    /// Application name (case-insensitive).
    pub app: String,
}

#[derive(Debug, Args)]
pub struct AppListArgs {
    /// Application name (case-insensitive).
    pub app: String,

    /// Page size sent as `take`.
    #[arg(long)]
    pub take: Option<u32>,
}

#[derive(Debug, Args)]
pub struct CreateArgs {
    pub name: String,

    #[arg(long, default_value = "en-us")]
    pub culture: String,
}

#[derive(Debug, Args)]
pub struct ModelArgs {
    /// Path to an exported model document.
    pub model: PathBuf,

    /// Bing spell-check key to register before training.
    #[arg(long, env = "LUIS_SPELLING_KEY", hide_env_values = true)]
    pub spelling_key: Option<String>,
}

#[derive(Debug, Args)]
pub struct TrainArgs {
    /// Application name (case-insensitive).
    pub app: String,

    /// Seconds to wait for training before giving up.
    #[arg(long)]
    pub deadline_secs: Option<u64>,

    /// Milliseconds between status polls.
    #[arg(long, default_value_t = 1000)]
    pub poll_ms: u64,
}

#[derive(Debug, Args)]
pub struct PublishArgs {
    /// Application name (case-insensitive).
    pub app: String,

    /// Publish to the staging slot instead of production.
    #[arg(long, default_value_t = false)]
    pub staging: bool,
}

#[derive(Debug, Args)]
pub struct UtterancesArgs {
    /// Application name (case-insensitive).
    pub app: String,

    /// Only utterances labelled with one of these intents.
    #[arg(long = "intent")]
    pub intents: Vec<String>,
}

#[derive(Debug, Args)]
pub struct QueryArgs {
    /// Application name (case-insensitive).
    pub app: String,

    /// Text to predict.
    pub text: String,

    /// Do not log the query on the service.
    #[arg(long, default_value_t = false)]
    pub no_log: bool,

    #[arg(long, default_value_t = false)]
    pub spell_check: bool,

    /// Return scores for every intent.
    #[arg(long, default_value_t = false)]
    pub verbose: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn train_accepts_deadline_and_poll_interval() {
        let cli = Cli::try_parse_from([
            "luis",
            "--domain",
            "westus.api.cognitive.microsoft.com",
            "--key",
            "k",
            "train",
            "Demo",
            "--deadline-secs",
            "60",
            "--poll-ms",
            "250",
        ])
        .expect("arguments should parse");

        assert_eq!(cli.domain.as_deref(), Some("westus.api.cognitive.microsoft.com"));
        match cli.command {
            Command::Train(args) => {
                assert_eq!(args.app, "Demo");
                assert_eq!(args.deadline_secs, Some(60));
                assert_eq!(args.poll_ms, 250);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn utterances_collects_repeated_intent_filters() {
        let cli = Cli::try_parse_from([
            "luis",
            "utterances",
            "Demo",
            "--intent",
            "Greet",
            "--intent",
            "BookFlight",
        ])
        .expect("arguments should parse");

        match cli.command {
            Command::Utterances(args) => assert_eq!(args.intents, vec!["Greet", "BookFlight"]),
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
