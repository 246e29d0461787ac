use std::sync::Arc;

use anyhow::Context;
use dotenvy::dotenv;
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_sdk::commitment_config::CommitmentConfig;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use enrichment::adapters::dexscreener::DexScreenerClient;
use enrichment::adapters::helius::HeliusDasClient;
use enrichment::adapters::jupiter::JupiterClient;
use enrichment::adapters::metaplex::MetaplexProvider;
use enrichment::adapters::mint_supply::MintSupplyProvider;
use enrichment::adapters::moralis::MoralisClient;
use enrichment::adapters::token_list::TokenListProvider;
use enrichment::ports::{IdentityProvider, PriceProvider, SupplyProvider, ValuationProvider};
use enrichment::{EnrichmentResolver, HolderResolver, IdentityResolver, MarketCapResolver, MarketResolver};
use migration_core::SourceConfig;

mod alerts;
mod classifier;
mod config;
mod dedup;
mod launchpads;
mod pipeline;
mod queue;
mod router;
mod subscriber;
mod telemetry;

use crate::alerts::{AlertDispatch, DiscordDispatcher};
use crate::classifier::{RpcTransactionSource, TransactionClassifier};
use crate::config::BotConfig;
use crate::dedup::DedupGuard;
use crate::pipeline::MigrationProcessor;
use crate::queue::WorkQueue;
use crate::router::Router;
use crate::subscriber::LogSubscriber;

#[tokio::main]
async fn main() {
    dotenv().ok();

    // 1. Logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("🚀 Migration Engine Bootstrapping...");

    // 2. Configuration (Fail Fast)
    let sources = launchpads::all();
    let target_keys: Vec<&str> = sources.iter().map(|s| s.notify_target_key.as_str()).collect();
    let config = match BotConfig::new(&target_keys) {
        Ok(cfg) => cfg,
        Err(e) => {
            error!("❌ CRITICAL: Failed to load config: {}", e);
            std::process::exit(1);
        }
    };
    info!("✅ Config Loaded & Validated: RPC={}, WS={}", config.rpc_url, config.ws_url);

    if let Err(e) = run(config, sources).await {
        error!("❌ Engine stopped: {:#}", e);
        std::process::exit(1);
    }
}

fn build_resolver(config: &BotConfig, http: reqwest::Client, rpc: Arc<RpcClient>) -> EnrichmentResolver {
    let token_list = Arc::new(TokenListProvider::new(http.clone(), config.token_list_url.clone()));
    let metaplex = Arc::new(MetaplexProvider::new(rpc.clone(), http.clone()));
    let helius = Arc::new(HeliusDasClient::new(http.clone(), config.rpc_url.clone()));
    let moralis = Arc::new(MoralisClient::new(http.clone(), config.moralis_api_key.clone()));
    let jupiter = Arc::new(JupiterClient::new(http.clone()));
    let dexscreener = Arc::new(DexScreenerClient::new(http));
    let mint_supply = Arc::new(MintSupplyProvider::new(rpc));

    let identity: Vec<Arc<dyn IdentityProvider>> =
        vec![token_list, metaplex, helius.clone(), moralis.clone(), jupiter.clone()];
    let prices: Vec<Arc<dyn PriceProvider>> = vec![jupiter, moralis.clone()];
    let supplies: Vec<Arc<dyn SupplyProvider>> = vec![mint_supply, moralis.clone()];
    let valuations: Vec<Arc<dyn ValuationProvider>> = vec![moralis];

    EnrichmentResolver::new(
        IdentityResolver::new(identity),
        MarketResolver::new(dexscreener, config.pair_retry()),
        MarketCapResolver::new(prices, supplies, valuations),
        HolderResolver::new(helius),
    )
}

async fn run(config: BotConfig, sources: Vec<SourceConfig>) -> anyhow::Result<()> {
    // 3. Metrics
    migration_core::telemetry::init_metrics().context("registering metrics")?;
    if let Some(port) = config.metrics_port {
        let listener = TcpListener::bind(("0.0.0.0", port))
            .await
            .with_context(|| format!("binding metrics port {}", port))?;
        tokio::spawn(async move {
            if let Err(e) = telemetry::serve_metrics(listener).await {
                error!("❌ Metrics server stopped: {:#}", e);
            }
        });
    }

    // 4. Shared clients (every HTTP call carries the configured timeout)
    let http = reqwest::Client::builder()
        .timeout(config.http_timeout())
        .user_agent("migration-engine/0.1")
        .build()
        .context("building HTTP client")?;
    let rpc = Arc::new(RpcClient::new_with_timeout_and_commitment(
        config.rpc_url.clone(),
        config.http_timeout(),
        CommitmentConfig::confirmed(),
    ));

    let resolver = Arc::new(build_resolver(&config, http.clone(), rpc.clone()));
    let classifier = Arc::new(TransactionClassifier::new(Arc::new(RpcTransactionSource::new(rpc))));
    let dedup = Arc::new(DedupGuard::new());
    let dispatcher: Arc<dyn AlertDispatch> = Arc::new(DiscordDispatcher::new(http, config.discord_bot_token.clone()));

    // 5. One queue per source with a destination
    let mut router = Router::new();
    let mut program_ids = Vec::new();
    let mut queue_handles = Vec::new();
    for source in sources {
        let Some(destination) = config.destination_for(&source.notify_target_key) else {
            warn!("⚠️ {} not set, {} migrations will not be tracked", source.notify_target_key, source.launch_pad);
            continue;
        };

        let processor = Arc::new(MigrationProcessor::new(
            source.clone(),
            destination.to_string(),
            classifier.clone(),
            dedup.clone(),
            resolver.clone(),
            dispatcher.clone(),
        ));
        let (queue, handle) = WorkQueue::spawn(&source.launch_pad, processor, config.queue_delay());
        let program_id = source.program_id.to_string();
        program_ids.push(program_id.clone());
        router.add_route(program_id, queue);
        queue_handles.push(handle);
        info!("🧭 {} ({}) -> channel {}", source.launch_pad, source.program_id, destination);
    }
    if router.is_empty() {
        anyhow::bail!("no launch-pad has a notification destination configured");
    }

    // 6. Subscriber -> Router -> Queues
    let (event_tx, event_rx) = mpsc::unbounded_channel();
    let subscriber = LogSubscriber::new(config.ws_url.clone(), program_ids)
        .with_heartbeat(config.heartbeat_interval(), config.heartbeat_timeout());
    let subscriber_handle = tokio::spawn(subscriber.run(event_tx));
    let router_handle = tokio::spawn(router.run(event_rx));

    info!("👂 Migration Engine ONLINE. Watching {} launch-pads.", queue_handles.len());

    tokio::signal::ctrl_c().await.context("listening for ctrl-c")?;
    info!("🛑 Shutdown requested. {} mints alerted this session.", dedup.len());

    subscriber_handle.abort();
    router_handle.abort();
    for handle in queue_handles {
        handle.abort();
    }
    Ok(())
}
