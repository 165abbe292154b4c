use alloy::primitives::Address;
use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::str::FromStr;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;
use txnscope_indexer::config::StoreBackend;
use txnscope_indexer::notify::{LogNotifier, Publisher, RedisNotifier};
use txnscope_indexer::rpc::RpcChainClient;
use txnscope_indexer::store::TokenStore;
use txnscope_indexer::{
    BlockWalker, CheckpointStore, Classifier, IndexerConfig, LedgerStore, MemoryStore, Notifier, RedisStore,
    ScreenKind, SniperAnalytics,
};

#[derive(Parser)]
#[command(name = "txnscope-indexer", version, about = "TxnScope token lifecycle indexer")]
struct Cli {
    /// TOML config file; TXNSCOPE__SECTION__KEY variables override it
    #[arg(short, long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Backfill from the checkpoint and follow the chain
    Run,
    /// Sniper summary for one token
    Summary {
        #[arg(long)]
        token: String,
    },
    /// Run a sniper screen over every indexed token
    Screen {
        #[arg(value_enum)]
        kind: ScreenArg,
    },
    /// Annotate a token record
    SetLevel {
        #[arg(long)]
        token: String,
        #[arg(long, allow_negative_numbers = true)]
        level: i64,
    },
    /// Print the resolved configuration as JSON
    PrintConfig,
}

#[derive(Clone, Copy, ValueEnum)]
enum ScreenArg {
    Nonce,
    Routers,
    Mev,
    Wallets,
}

impl From<ScreenArg> for ScreenKind {
    fn from(arg: ScreenArg) -> Self {
        match arg {
            ScreenArg::Nonce => ScreenKind::Nonce,
            ScreenArg::Routers => ScreenKind::Routers,
            ScreenArg::Mev => ScreenKind::Mev,
            ScreenArg::Wallets => ScreenKind::Wallets,
        }
    }
}

struct Backend {
    store: Arc<dyn LedgerStore>,
    checkpoints: Arc<dyn CheckpointStore>,
    notifier: Arc<dyn Notifier>,
}

async fn open_backend(cfg: &IndexerConfig) -> Result<Backend> {
    match cfg.store.backend {
        StoreBackend::Redis => {
            let store = Arc::new(RedisStore::connect(&cfg.redis.url, cfg.redis.key_prefix.clone()).await?);
            let client = redis::Client::open(cfg.redis.url.as_str())?;
            let connection = client.get_multiplexed_async_connection().await?;
            let publisher = Publisher::new(connection, cfg.redis.channel.clone());
            info!(url = %cfg.redis.url, channel = publisher.channel(), "connected to redis");
            let notifier = RedisNotifier::spawn(publisher, cfg.redis.queue_capacity);
            Ok(Backend {
                store: store.clone(),
                checkpoints: store,
                notifier: Arc::new(notifier),
            })
        }
        StoreBackend::Memory => {
            let store = Arc::new(MemoryStore::new());
            Ok(Backend {
                store: store.clone(),
                checkpoints: store,
                notifier: Arc::new(LogNotifier),
            })
        }
    }
}

fn parse_token(raw: &str) -> Result<Address> {
    Address::from_str(raw).map_err(|_| anyhow!("invalid token address: {raw}"))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let cfg = IndexerConfig::load(cli.config.as_deref())?;
    init_tracing(&cfg.log_level);

    match cli.command {
        Commands::Run => {
            let backend = open_backend(&cfg).await?;
            let chain = Arc::new(RpcChainClient::connect(cfg.chain.clone()).await?);
            let classifier = Classifier::new(chain.clone(), cfg.dex.clone());
            let mut walker = BlockWalker::new(
                chain,
                classifier,
                backend.store,
                backend.checkpoints,
                backend.notifier,
                cfg.walker.clone(),
            );
            walker.run().await?;
        }
        Commands::Summary { token } => {
            let token = parse_token(&token)?;
            let backend = open_backend(&cfg).await?;
            let analytics = SniperAnalytics::new(backend.store, cfg.sniper.clone());
            let summary = analytics.summary(token).await?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        Commands::Screen { kind } => {
            let backend = open_backend(&cfg).await?;
            let analytics = SniperAnalytics::new(backend.store, cfg.sniper.clone());
            let passed = analytics.screen(kind.into()).await?;
            println!("{}", serde_json::to_string_pretty(&passed)?);
        }
        Commands::SetLevel { token, level } => {
            let token = parse_token(&token)?;
            let backend = open_backend(&cfg).await?;
            backend.store.set_level(token, level).await?;
            println!("{token:#x} level set to {level}");
        }
        Commands::PrintConfig => {
            println!("{}", serde_json::to_string_pretty(&cfg)?);
        }
    }

    info!("done");
    Ok(())
}

fn init_tracing(log_level: &str) {
    let filter = match std::env::var("RUST_LOG") {
        Ok(value) => EnvFilter::try_new(value).unwrap_or_else(|_| EnvFilter::new("info")),
        Err(_) => EnvFilter::try_new(log_level).unwrap_or_else(|_| EnvFilter::new("info")),
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
