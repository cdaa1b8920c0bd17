//! Command-line front end for the classifier
//!
//! # Usage
//!
//! ```bash
//! # Learn every matching file as one document
//! b8 learn --category improbable 'corpus/spam/*.txt'
//! b8 learn --category probable 'corpus/ham/*.txt'
//!
//! # Classify files
//! b8 classify --explain 'inbox/*.txt'
//!
//! # Show what has been learned
//! b8 stats
//! b8 --context news stats
//! ```

use anyhow::{bail, Context as _};
use b8_rs::classifier::{Category, Classification, B8, DEFAULT_CONTEXT};
use b8_rs::config::{B8Config, LoggingConfig};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "b8")]
#[command(about = "Learn and classify text with a statistical filter", long_about = None)]
struct Cli {
    /// Configuration file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Database URL (e.g., sqlite://b8.db)
    #[arg(long)]
    db: Option<String>,

    /// Override a configuration option, e.g. --set min_dev=0.2
    #[arg(long = "set", value_name = "KEY=VALUE")]
    overrides: Vec<String>,

    /// Context to operate on
    #[arg(long, default_value = DEFAULT_CONTEXT)]
    context: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Learn text files
    Learn {
        /// Category (probable or improbable)
        #[arg(short, long)]
        category: Category,
        /// Glob patterns of files to learn
        #[arg(required = true)]
        patterns: Vec<String>,
    },
    /// Unlearn previously learned text files
    Unlearn {
        /// Category the files were learned as
        #[arg(short, long)]
        category: Category,
        /// Glob patterns of files to unlearn
        #[arg(required = true)]
        patterns: Vec<String>,
    },
    /// Classify text files
    Classify {
        /// Show the tokens that decided each result
        #[arg(long)]
        explain: bool,
        /// Print results as JSON
        #[arg(long)]
        json: bool,
        /// Glob patterns of files to classify
        #[arg(required = true)]
        patterns: Vec<String>,
    },
    /// Show context statistics
    Stats {
        /// Print statistics as JSON
        #[arg(long)]
        json: bool,
    },
    /// List contexts
    Contexts,
}

#[derive(Serialize)]
struct FileClassification {
    file: String,
    #[serde(flatten)]
    classification: Classification,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => B8Config::from_file(path)?,
        None => B8Config::default(),
    };
    if let Some(db) = &cli.db {
        config.storage.database_url = db.clone();
    }
    for assignment in &cli.overrides {
        config.apply_override(assignment)?;
    }
    config.validate()?;

    init_logging(&config.logging);

    let b8 = B8::open(config).await?;
    let context = cli.context.as_str();

    match cli.command {
        Commands::Learn { category, patterns } => {
            train(&b8, &patterns, category, context, false).await?;
        }
        Commands::Unlearn { category, patterns } => {
            train(&b8, &patterns, category, context, true).await?;
        }
        Commands::Classify {
            explain,
            json,
            patterns,
        } => {
            let mut results = Vec::new();

            for file in expand(&patterns)? {
                let text = tokio::fs::read_to_string(&file)
                    .await
                    .with_context(|| format!("Failed to read {}", file.display()))?;
                let classification = b8.classify_detailed(&text, context).await?;

                if !json {
                    println!("{}\t{:.6}", file.display(), classification.probability);
                    if explain {
                        for token in &classification.relevant {
                            let variant = token
                                .variant
                                .as_deref()
                                .map(|v| format!(" (via {})", v))
                                .unwrap_or_default();
                            println!(
                                "    {:<30} {:.6} x{}{}",
                                token.token, token.score, token.occurrences, variant
                            );
                        }
                    }
                }

                results.push(FileClassification {
                    file: file.display().to_string(),
                    classification,
                });
            }

            if json {
                println!("{}", serde_json::to_string_pretty(&results)?);
            }
        }
        Commands::Stats { json } => {
            let stats = b8.stats(context).await?;

            if json {
                println!("{}", serde_json::to_string_pretty(&stats)?);
            } else {
                println!("Context:          {}", stats.context);
                println!("Probable texts:   {}", stats.aggregate.positive_count);
                println!("Improbable texts: {}", stats.aggregate.negative_count);
                println!("Texts learned:    {}", stats.aggregate.texts_learned);
                println!("Texts unlearned:  {}", stats.aggregate.texts_unlearned);
                println!("Tokens:           {}", stats.tokens);
            }
        }
        Commands::Contexts => {
            for name in b8.contexts().await? {
                println!("{}", name);
            }
        }
    }

    Ok(())
}

async fn train(
    b8: &B8,
    patterns: &[String],
    category: Category,
    context: &str,
    unlearn: bool,
) -> anyhow::Result<()> {
    let files = expand(patterns)?;
    let mut failures = 0;

    for file in &files {
        let text = match tokio::fs::read_to_string(file).await {
            Ok(text) => text,
            Err(e) => {
                error!("Failed to read {}: {}", file.display(), e);
                failures += 1;
                continue;
            }
        };

        let result = if unlearn {
            b8.unlearn(&text, category, context).await
        } else {
            b8.learn(&text, category, context).await
        };

        match result {
            Ok(report) if report.is_complete() => {}
            Ok(report) => {
                warn!(
                    "{}: {} token updates failed",
                    file.display(),
                    report.failed.len()
                );
                failures += 1;
            }
            Err(e) => {
                error!("{}: {}", file.display(), e);
                failures += 1;
            }
        }
    }

    let verb = if unlearn { "Unlearned" } else { "Learned" };
    info!(
        "{} {} of {} files as {} in context {}",
        verb,
        files.len() - failures,
        files.len(),
        category,
        context
    );
    println!("{} {} file(s) as {}", verb, files.len() - failures, category);

    if failures > 0 {
        bail!("{} file(s) failed", failures);
    }
    Ok(())
}

fn expand(patterns: &[String]) -> anyhow::Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    for pattern in patterns {
        let mut matched = false;
        for entry in glob::glob(pattern).with_context(|| format!("Invalid pattern {}", pattern))? {
            let path = entry?;
            if path.is_file() {
                files.push(path);
                matched = true;
            }
        }

        if !matched {
            warn!("No files match {}", pattern);
        }
    }

    Ok(files)
}

fn init_logging(config: &LoggingConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("b8_rs={level},b8={level}", level = config.level).into());

    let registry = tracing_subscriber::registry().with(filter);
    if config.format == "json" {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}
