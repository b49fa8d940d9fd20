//! CLI binary for checking feature files and debugging evaluations.
//!
//! # Commands
//!
//! - `eval`: Evaluate one feature from a feature file for a user
//! - `list`: Show every feature in a feature file
//! - `rules`: List the built-in rule kinds

use clap::{Parser, Subcommand};
use colored::Colorize;
use flagwise::model::FeatureContext;
use flagwise::storage::{FeatureStore, JsonFileFeatureStore};
use flagwise::{FeatureEngine, FeatureManager};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing_subscriber::EnvFilter;

/// CLI for checking and debugging flagwise feature files
#[derive(Parser)]
#[command(name = "flagwise-eval")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Log store and engine activity to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate one feature for a user
    Eval {
        /// Feature file (`{ "Features": [...] }`)
        #[arg(short, long)]
        file: PathBuf,

        /// Feature key to evaluate
        #[arg(short, long)]
        key: String,

        /// User id; omitted means anonymous
        #[arg(short, long)]
        user: Option<String>,

        /// Group the user belongs to (repeatable)
        #[arg(short, long = "group")]
        groups: Vec<String>,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },

    /// List every feature in a feature file
    List {
        /// Feature file (`{ "Features": [...] }`)
        #[arg(short, long)]
        file: PathBuf,
    },

    /// List the built-in rule kinds
    Rules,
}

fn init_logging(verbose: bool) {
    if !verbose {
        return;
    }
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("flagwise=debug"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn open_store(file: PathBuf) -> Result<JsonFileFeatureStore, String> {
    JsonFileFeatureStore::new(file).map_err(|e| e.message)
}

/// Run the eval command.
async fn run_eval(
    file: PathBuf,
    key: &str,
    user: Option<String>,
    groups: Vec<String>,
    json: bool,
) -> Result<(), String> {
    let store = open_store(file)?;
    let manager = FeatureManager::new(
        Arc::new(store),
        Arc::new(FeatureEngine::with_builtin_evaluators()),
    );

    let mut ctx = FeatureContext::new().with_groups(groups);
    if let Some(user) = user {
        ctx = ctx.with_user_id(user);
    }

    let start = Instant::now();
    let result = manager.evaluate(key, &ctx).await.map_err(|e| e.message)?;
    let duration = start.elapsed();

    if json {
        println!("{}", result.to_json_string());
        return Ok(());
    }

    if result.enabled {
        println!("{} {} is {}", "✓".green(), result.feature_key.bold(), "enabled".green());
    } else {
        println!("{} {} is {}", "✗".red(), result.feature_key.bold(), "disabled".red());
    }
    println!("User: {}", ctx.discriminator());
    if !ctx.groups.is_empty() {
        println!("Groups: {}", ctx.groups.join(", "));
    }
    println!("Time: {:?}", duration);
    Ok(())
}

/// Run the list command.
async fn run_list(file: PathBuf) -> Result<(), String> {
    let store = open_store(file)?;
    let set = store.get_all().await.map_err(|e| e.message)?;

    println!("{} ({})", "Features:".bold(), set.etag.dimmed());
    println!();
    if set.is_empty() {
        println!("  {}", "(none)".dimmed());
        return Ok(());
    }

    for feature in &set.features {
        let switch = if feature.enabled {
            "on".green()
        } else {
            "off".red()
        };
        println!("• {} [{}]", feature.key.cyan(), switch);
        if !feature.rules.is_empty() {
            let names: Vec<&str> = feature.rules.iter().map(|r| r.rule_name.as_str()).collect();
            println!("  Rules: {}", names.join(" → "));
        }
        if let Some(expires_at) = feature.expires_at {
            println!("  Expires: {}", expires_at.to_rfc3339());
        }
    }
    Ok(())
}

/// Run the rules command.
fn run_rules() {
    println!("{}", "Built-in Rule Kinds:".bold());
    println!();

    println!("• {}", "Percentage".cyan());
    println!("  Stable rollout to a share of users");
    println!("  {}", r#"{"ruleName": "Percentage", "parameters": {"value": 25}}"#.dimmed());
    println!();
    println!("  Parameters:");
    println!("  - value: 0-100; <= 0 is off for everyone, >= 100 is on for everyone");
    println!("  - Buckets are SHA-256 of \"<feature key>:<user id>\" modulo 100");
    println!();

    println!("• {}", "Schedule".cyan());
    println!("  Active between two UTC instants, both inclusive");
    println!(
        "  {}",
        r#"{"ruleName": "Schedule", "parameters": {"from": "2025-01-01T00:00:00Z"}}"#.dimmed()
    );
    println!();
    println!("  Parameters:");
    println!("  - from: ISO 8601 timestamp; omitted means no lower bound");
    println!("  - to: ISO 8601 timestamp; omitted means no upper bound");
    println!();

    println!("• {}", "Targeting".cyan());
    println!("  Listed users and groups, with an optional rollout for everyone else");
    println!(
        "  {}",
        r#"{"ruleName": "Targeting", "parameters": {"users": ["alice"], "groups": ["beta"]}}"#
            .dimmed()
    );
    println!();
    println!("  Parameters:");
    println!("  - users: user ids, matched ignoring case");
    println!("  - groups: group names, matched ignoring case");
    println!("  - defaultRolloutPercentage: percentage applied when nothing matched");
    println!();

    println!("  Unknown rule kinds are skipped.");
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Eval {
            file,
            key,
            user,
            groups,
            json,
        } => run_eval(file, &key, user, groups, json).await,
        Commands::List { file } => run_list(file).await,
        Commands::Rules => {
            run_rules();
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("{}: {}", "Error".red().bold(), e);
        std::process::exit(1);
    }
}
