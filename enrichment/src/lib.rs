//! Token enrichment: ordered provider chains behind small ports, combined into a
//! single [`TokenProfile`] per migrated mint.

pub mod adapters;
pub mod age;
pub mod error;
pub mod holders;
pub mod identity;
pub mod market;
pub mod ports;
pub mod retry;

use std::time::Instant;

use async_trait::async_trait;
use migration_core::constants::DEXSCREENER_PAIR_URL;
use migration_core::telemetry::ENRICHMENT_LATENCY;
use migration_core::{SourceConfig, TokenProfile};
use solana_sdk::pubkey::Pubkey;
use tracing::info;

pub use error::ProviderError;
pub use holders::HolderResolver;
pub use identity::IdentityResolver;
pub use market::{MarketCapResolver, MarketResolver};
pub use ports::ProfileResolver;
pub use retry::RetryPolicy;

pub struct EnrichmentResolver {
    identity: IdentityResolver,
    market: MarketResolver,
    market_cap: MarketCapResolver,
    holders: HolderResolver,
}

impl EnrichmentResolver {
    pub fn new(
        identity: IdentityResolver,
        market: MarketResolver,
        market_cap: MarketCapResolver,
        holders: HolderResolver,
    ) -> Self {
        Self { identity, market, market_cap, holders }
    }

    /// Runs every sub-resolver concurrently. Never fails; missing data degrades to
    /// defaults (mint as name, zero metrics, "N/A" age, empty link).
    pub async fn resolve_profile(&self, mint: &Pubkey, source: &SourceConfig) -> TokenProfile {
        let started = Instant::now();

        let (identity, (pair, market), market_cap, holders) = tokio::join!(
            self.identity.resolve(mint),
            self.market.resolve(mint),
            self.market_cap.resolve(mint),
            self.holders.resolve(mint),
        );

        let age = match &pair {
            Some(_) => age::age_since(market.pair_created_at, chrono::Utc::now().timestamp_millis()),
            None => age::AGE_UNKNOWN.to_string(),
        };
        let link = pair
            .as_ref()
            .map(|p| format!("{}/{}", DEXSCREENER_PAIR_URL, p.pair_address))
            .unwrap_or_default();

        let elapsed = started.elapsed();
        ENRICHMENT_LATENCY.observe(elapsed.as_secs_f64());
        info!("🧩 Profile for {} ({}) resolved in {:.1}s", identity.symbol, mint, elapsed.as_secs_f64());

        TokenProfile {
            title: source.title.clone(),
            launch_pad: source.launch_pad.clone(),
            mint: *mint,
            name: identity.name,
            symbol: identity.symbol,
            image: identity.image,
            description: identity.description,
            market_cap,
            market,
            holders,
            age,
            pair,
            link,
            socials: identity.socials,
        }
    }
}

#[async_trait]
impl ProfileResolver for EnrichmentResolver {
    async fn resolve(&self, mint: &Pubkey, source: &SourceConfig) -> anyhow::Result<TokenProfile> {
        Ok(self.resolve_profile(mint, source).await)
    }
}
