use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use secrecy::SecretString;
use std::path::{Path, PathBuf};

use digest_sync::config::Config;
use digest_sync::feed::HttpFeedClient;
use digest_sync::mail::{self, MailFile};
use digest_sync::notify::WebhookNotifier;
use digest_sync::runner::Runner;
use digest_sync::storage::{Database, DatabaseError};
use digest_sync::sync::SyncEngine;

/// Startup connection attempts before giving up on the database.
const DB_OPEN_ATTEMPTS: u32 = 5;

/// Get the config directory path (~/.config/digest-sync/)
fn get_config_dir() -> Result<PathBuf> {
    let home = std::env::var("HOME").context("HOME environment variable not set")?;
    Ok(PathBuf::from(home).join(".config").join("digest-sync"))
}

#[derive(Parser, Debug)]
#[command(
    name = "digest-sync",
    about = "Weekly update newsletter parser and What's New feed sync"
)]
struct Args {
    /// Config file (default: ~/.config/digest-sync/config.toml)
    #[arg(long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// SQLite database file, overrides `database_path`
    #[arg(long, value_name = "FILE", global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run a cycle now and then on every interval until Ctrl-C
    Run,
    /// Run a single sync pass
    Sync,
    /// Parse a `.mime` file or a directory of them and print the result
    Parse {
        path: PathBuf,
        /// Print JSON instead of the text summary
        #[arg(long)]
        json: bool,
    },
    /// List the most recent stored news
    Recent {
        #[arg(long, default_value_t = 20)]
        limit: i64,
    },
    /// List tags with their news counts
    Tags,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();

    // Parsing needs neither config nor database.
    if let Command::Parse { path, json } = &args.command {
        return parse_command(path, *json);
    }

    let config_dir = get_config_dir()?;
    if !config_dir.exists() {
        std::fs::create_dir_all(&config_dir).context("Failed to create config directory")?;
        println!("Created config directory: {}", config_dir.display());
    }

    // User-only access: the config file may hold the webhook URL
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        if let Err(e) =
            std::fs::set_permissions(&config_dir, std::fs::Permissions::from_mode(0o700))
        {
            tracing::warn!(
                path = %config_dir.display(),
                error = %e,
                "Failed to set config directory permissions to 0700"
            );
        }
    }

    let config_path = args
        .config
        .clone()
        .unwrap_or_else(|| config_dir.join("config.toml"));
    let mut config = Config::load(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;
    config.apply_env();
    config.validate().context("Invalid configuration")?;
    tracing::debug!(config = ?config, "Effective configuration");

    let db_path = args
        .db
        .clone()
        .or_else(|| config.database_path.clone())
        .unwrap_or_else(|| config_dir.join("digest.db"));
    let db_path_str = db_path
        .to_str()
        .ok_or_else(|| anyhow::anyhow!("Invalid UTF-8 in database path"))?;
    let db = match Database::open_with_retry(db_path_str, DB_OPEN_ATTEMPTS).await {
        Ok(db) => db,
        Err(DatabaseError::InstanceLocked) => {
            eprintln!("Error: The database is locked by another process. Please try again later.");
            std::process::exit(1);
        }
        Err(e) => return Err(anyhow::anyhow!("Failed to open database: {}", e)),
    };

    match args.command {
        Command::Run => run_command(&config, db).await,
        Command::Sync => sync_command(&config, db).await,
        Command::Recent { limit } => recent_command(&db, limit).await,
        Command::Tags => tags_command(&db).await,
        Command::Parse { .. } => Ok(()),
    }
}

fn http_client(config: &Config) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(concat!("digest-sync/", env!("CARGO_PKG_VERSION")))
        .timeout(config.request_timeout()?)
        .build()
        .context("Failed to build HTTP client")
}

fn build_engine(config: &Config, db: Database) -> Result<SyncEngine<HttpFeedClient, Database>> {
    let client = HttpFeedClient::new(
        http_client(config)?,
        config.feed_endpoint()?,
        config.feed_directory_id.clone(),
        config.feed_locale.clone(),
    )
    .with_timeout(config.request_timeout()?);
    Ok(SyncEngine::new(client, db))
}

async fn run_command(config: &Config, db: Database) -> Result<()> {
    let mut runner = Runner::new(build_engine(config, db)?, config.page_size()?);
    if let Some(dir) = &config.mail_dir {
        runner = runner.with_mail_dir(dir.clone());
    }
    if let Some(filter) = &config.mail_subject_filter {
        runner = runner.with_subject_filter(filter.clone());
    }
    if let Some(url) = &config.webhook_url {
        let notifier = WebhookNotifier::new(http_client(config)?, SecretString::from(url.clone()))
            .with_timeout(config.request_timeout()?);
        runner = runner.with_notifier(notifier);
    } else {
        tracing::info!("No webhook configured, update notifications disabled");
    }

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };
    runner.run_forever(config.sync_interval()?, shutdown).await;
    println!("Goodbye!");
    Ok(())
}

async fn sync_command(config: &Config, db: Database) -> Result<()> {
    let engine = build_engine(config, db)?;
    let report = engine
        .sync_until_known(config.page_size()?)
        .await
        .context("Sync pass failed")?;
    println!(
        "Inserted {} records from {} page(s), stopped: {:?}",
        report.inserted, report.pages_fetched, report.stop
    );
    if report.order_violations > 0 {
        eprintln!(
            "Warning: {} record(s) were out of newest-first order",
            report.order_violations
        );
    }
    Ok(())
}

fn parse_command(path: &Path, json: bool) -> Result<()> {
    let files: Vec<MailFile> = if path.is_dir() {
        mail::load_dir(path)?
    } else {
        vec![mail::load_file(path)
            .with_context(|| format!("Failed to read {}", path.display()))?]
    };
    if files.is_empty() {
        eprintln!("No .mime files found in {}", path.display());
        return Ok(());
    }

    for file in files {
        let Some(parsed) = mail::parse_message(&file.raw) else {
            eprintln!("Skipping {}: not a parseable message", file.path.display());
            continue;
        };
        if json {
            println!("{}", serde_json::to_string_pretty(&parsed)?);
        } else {
            println!("# {}", file.path.display());
            println!("{}", mail::render_summary(&parsed));
        }
    }
    Ok(())
}

async fn recent_command(db: &Database, limit: i64) -> Result<()> {
    let total = db.count_news().await?;
    for news in db.recent_news(limit).await? {
        let date = news
            .source_created_at
            .map(|ts| ts.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| "----------".to_string());
        println!("{}  {}  {}", date, news.title, news.url);
    }
    println!("({} stored)", total);
    Ok(())
}

async fn tags_command(db: &Database) -> Result<()> {
    for tag in db.tag_counts().await? {
        println!("{:>6}  {}", tag.news_count, tag.name);
    }
    Ok(())
}
