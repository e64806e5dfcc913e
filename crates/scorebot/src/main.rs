//! Scorebot CLI - answers mentions with a score for the tweet they reply to.

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use scorebot::auth::Session;
use scorebot::config::{
    BackoffConfig, BotConfig, ComputeConfig, FallbackConfig, DEFAULT_AO_CU_URL, DEFAULT_AO_MU_URL,
    DEFAULT_FALLBACK_MODEL, DEFAULT_OPENAI_URL, DEFAULT_TWITTER_API_BASE,
};
use scorebot::pipeline::{MentionOutcome, Pipeline};
use scorebot::storage::{DedupStore, ProcessedRecord, SqliteStore};
use scorebot::twitter::MentionEvent;

/// Scorebot CLI - score the tweets our mentions reply to.
#[derive(Parser)]
#[command(name = "scorebot")]
#[command(about = "Mention-driven tweet scoring bot")]
#[command(version)]
pub struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    log_json: bool,

    /// Sqlite database of processed tweets
    #[arg(long, global = true, env = "SCOREBOT_DB", default_value = "state.sqlite")]
    db: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Watch mentions and reply until stopped (Ctrl-C)
    Run {
        #[command(flatten)]
        bot: BotArgs,
    },

    /// Process a single mention
    Process {
        /// Tweet the mention replies to
        tweet_id: String,

        /// The mention to reply under
        #[arg(long)]
        mention: String,

        /// Process even if the tweet was already handled
        #[arg(long)]
        force: bool,

        #[command(flatten)]
        bot: BotArgs,
    },

    /// List processed tweets, newest first
    List {
        /// Records to skip
        #[arg(long, default_value = "0")]
        start: u32,

        /// Limit results
        #[arg(long, default_value = "20")]
        limit: u32,
    },

    /// Print one processed tweet as JSON
    Show {
        /// Tweet ID
        tweet_id: String,
    },
}

/// Credentials and tunables for commands that talk to the network.
#[derive(Args)]
pub struct BotArgs {
    /// Web client bearer token
    #[arg(long, env = "TWITTER_BEARER_TOKEN", hide_env_values = true)]
    bearer_token: String,

    /// Session auth_token cookie
    #[arg(long, env = "TWITTER_AUTH_TOKEN", hide_env_values = true)]
    auth_token: String,

    /// CSRF token (ct0 cookie)
    #[arg(long, env = "TWITTER_CT0", hide_env_values = true)]
    ct0: String,

    /// Platform GraphQL API base URL
    #[arg(long, env = "TWITTER_API_BASE", default_value = DEFAULT_TWITTER_API_BASE)]
    twitter_api_base: String,

    /// Our own account id; its threads are never scored
    #[arg(long, env = "SCOREBOT_SELF_USER_ID")]
    self_user_id: Option<String>,

    /// Scoring process id
    #[arg(long, env = "AO_PROCESS_ID")]
    process_id: String,

    /// Arweave JWK keyfile that signs messages to the scoring process
    #[arg(long, env = "AO_WALLET")]
    wallet: PathBuf,

    /// Message unit URL
    #[arg(long, env = "AO_MU_URL", default_value = DEFAULT_AO_MU_URL)]
    mu_url: String,

    /// Compute unit URL
    #[arg(long, env = "AO_CU_URL", default_value = DEFAULT_AO_CU_URL)]
    cu_url: String,

    /// Fallback scorer API key
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    openai_api_key: String,

    /// Fallback scorer endpoint
    #[arg(long, env = "OPENAI_BASE_URL", default_value = DEFAULT_OPENAI_URL)]
    openai_url: String,

    /// Fallback scorer model
    #[arg(long, env = "SCOREBOT_FALLBACK_MODEL", default_value = DEFAULT_FALLBACK_MODEL)]
    fallback_model: String,

    /// Seconds to wait before the first task poll (doubles each retry)
    #[arg(long, env = "SCOREBOT_POLL_WAIT_SECS", default_value = "60")]
    poll_wait_secs: u64,

    /// Polls before falling back
    #[arg(long, env = "SCOREBOT_POLL_RETRIES", default_value = "3")]
    poll_retries: u32,

    /// Delay before every platform and scorer request, in seconds
    #[arg(long, env = "SCOREBOT_REQUEST_DELAY_SECS", default_value = "10")]
    request_delay_secs: u64,
}

impl BotArgs {
    fn into_config(self, db_path: PathBuf) -> scorebot::Result<BotConfig> {
        let config = BotConfig {
            session: Session::new(self.bearer_token, self.auth_token, self.ct0),
            twitter_api_base: self.twitter_api_base,
            request_delay: Duration::from_secs(self.request_delay_secs),
            self_user_id: self.self_user_id,
            compute: ComputeConfig {
                process_id: self.process_id,
                wallet_path: self.wallet,
                mu_url: self.mu_url,
                cu_url: self.cu_url,
            },
            fallback: FallbackConfig {
                api_key: self.openai_api_key,
                url: self.openai_url,
                model: self.fallback_model,
            },
            backoff: BackoffConfig {
                initial_wait: Duration::from_secs(self.poll_wait_secs),
                retries: self.poll_retries,
            },
            db_path,
        };
        config.validate()?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose {
        EnvFilter::new("scorebot=debug,info")
    } else {
        EnvFilter::new("scorebot=info,warn")
    };

    if cli.log_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(fmt::layer())
            .with(filter)
            .init();
    }

    match cli.command {
        Commands::Run { bot } => {
            let config = bot.into_config(cli.db)?;
            run_loop(config).await
        }
        Commands::Process {
            tweet_id,
            mention,
            force,
            bot,
        } => {
            tracing::info!(tweet_id, mention, force, "Processing single mention");
            let config = bot.into_config(cli.db)?;
            run_process(config, tweet_id, mention, force).await
        }
        Commands::List { start, limit } => run_list(cli.db, start, limit).await,
        Commands::Show { tweet_id } => run_show(cli.db, &tweet_id).await,
    }
}

async fn open_store(path: &std::path::Path) -> Result<Arc<dyn DedupStore>> {
    Ok(Arc::new(SqliteStore::open(path).await?))
}

async fn open_store_read_only(path: &std::path::Path) -> Result<Arc<dyn DedupStore>> {
    Ok(Arc::new(SqliteStore::open_read_only(path).await?))
}

async fn run_loop(config: BotConfig) -> Result<()> {
    let store = open_store(&config.db_path).await?;
    let pipeline = Pipeline::from_config(&config, store)?;

    let stop = CancellationToken::new();
    let signal_stop = stop.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Ctrl-C received, finishing current mention");
            signal_stop.cancel();
        }
    });

    tracing::info!(
        self_user_id = config.self_user_id.as_deref().unwrap_or("-"),
        poll_wait_secs = config.backoff.initial_wait.as_secs(),
        poll_retries = config.backoff.retries,
        "Starting mention loop"
    );
    let summary = pipeline.run(pipeline.mention_source(), stop).await?;

    println!("\n📊 Run Summary");
    println!("   Seen: {}", summary.seen);
    println!("   Processed: {}", summary.processed);
    println!("   Fell back: {}", summary.fell_back);
    println!(
        "   Skipped: {} duplicate, {} own thread, {} not a reply",
        summary.skipped_duplicate, summary.skipped_self, summary.skipped_not_reply
    );
    Ok(())
}

async fn run_process(
    config: BotConfig,
    tweet_id: String,
    mention: String,
    force: bool,
) -> Result<()> {
    let store = open_store(&config.db_path).await?;
    let pipeline = Pipeline::from_config(&config, store)?;
    let event = MentionEvent::reply(tweet_id, mention);

    let outcome = if force {
        pipeline.reprocess_mention(&event).await?
    } else {
        pipeline.process_mention(&event).await?
    };

    match outcome {
        MentionOutcome::Replied(record) => print_record(&record),
        MentionOutcome::Duplicate { tweet_id } => {
            println!("⏭️  {tweet_id} already processed (use --force to redo)");
        }
        MentionOutcome::OwnThread { tweet_id } => {
            println!("⏭️  {tweet_id} is from our own account");
        }
        MentionOutcome::NotAReply => println!("⏭️  Not a reply"),
    }
    Ok(())
}

async fn run_list(db: PathBuf, start: u32, limit: u32) -> Result<()> {
    let store = open_store_read_only(&db).await?;
    let page = store.page(start, limit).await?;

    println!("📋 Processed tweets in {}\n", db.display());

    if page.records.is_empty() {
        println!("No entries found.");
        return Ok(());
    }

    for record in &page.records {
        print_record(record);
    }

    println!(
        "Showing {}-{} of {}{}",
        page.start + 1,
        page.start + page.count,
        page.total,
        if page.has_more { " (more with --start)" } else { "" }
    );
    Ok(())
}

async fn run_show(db: PathBuf, tweet_id: &str) -> Result<()> {
    let store = open_store_read_only(&db).await?;
    match store.get(tweet_id).await? {
        Some(record) => println!("{}", serde_json::to_string_pretty(&record)?),
        None => anyhow::bail!("No record for tweet {tweet_id}"),
    }
    Ok(())
}

fn print_record(record: &ProcessedRecord) {
    let score = record
        .score
        .score
        .map_or_else(|| "-".to_string(), |s| s.to_string());
    println!(
        "🔖 {} @{} ({})",
        record.tweet.tweet_id,
        record.tweet.user_name,
        record.score.source
    );
    println!("   {}", preview(&record.tweet.text));
    println!(
        "   Score: {} | {} | {}\n",
        score.bold(),
        record.score.reasoning,
        record.processed_at.format("%Y-%m-%d %H:%M")
    );
}

/// Truncate text for preview, respecting UTF-8 character boundaries.
fn preview(text: &str) -> String {
    const MAX_CHARS: usize = 100;

    let char_count = text.chars().count();
    if char_count <= MAX_CHARS {
        text.to_string()
    } else {
        let truncated: String = text.chars().take(MAX_CHARS).collect();
        format!("{truncated}...")
    }
}
