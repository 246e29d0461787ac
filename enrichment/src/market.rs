use std::sync::Arc;

use migration_core::telemetry::{PAIR_RETRY_EXHAUSTED, PROVIDER_FAILURES};
use migration_core::{MarketMetrics, PairInfo};
use solana_sdk::pubkey::Pubkey;
use tracing::{debug, info, warn};

use crate::ports::{MarketDataProvider, PriceProvider, SupplyProvider, ValuationProvider};
use crate::retry::RetryPolicy;

/// Finds the most liquid pair of a freshly migrated mint and loads its metrics.
/// New pools take a while to show up on aggregators, hence the retry.
pub struct MarketResolver {
    provider: Arc<dyn MarketDataProvider>,
    retry: RetryPolicy,
}

impl MarketResolver {
    pub fn new(provider: Arc<dyn MarketDataProvider>, retry: RetryPolicy) -> Self {
        Self { provider, retry }
    }

    async fn best_pair_once(&self, mint: &Pubkey) -> Option<PairInfo> {
        match self.provider.token_pairs(mint).await {
            Ok(mut pairs) => {
                pairs.sort_by(|a, b| b.liquidity_usd.total_cmp(&a.liquidity_usd));
                pairs.into_iter().next().map(|p| p.pair)
            }
            Err(e) => {
                PROVIDER_FAILURES.with_label_values(&[self.provider.name()]).inc();
                warn!("⚠️ {} pair lookup failed for {}: {}", self.provider.name(), mint, e);
                None
            }
        }
    }

    pub async fn best_pair(&self, mint: &Pubkey) -> Option<PairInfo> {
        let label = format!("pair for {}", mint);
        let found = self.retry.run(&label, move |_| self.best_pair_once(mint)).await;
        match &found {
            Some(pair) => info!("📈 Pair {} found for {}", pair.pair_address, mint),
            None => {
                PAIR_RETRY_EXHAUSTED.inc();
                warn!("⚠️ No pair found for {} after {} attempts", mint, self.retry.max_attempts);
            }
        }
        found
    }

    pub async fn metrics(&self, pair: &PairInfo) -> MarketMetrics {
        match self.provider.pair_metrics(pair).await {
            Ok(Some(metrics)) => metrics,
            Ok(None) => {
                debug!("No metrics listed for pair {}", pair.pair_address);
                MarketMetrics::default()
            }
            Err(e) => {
                PROVIDER_FAILURES.with_label_values(&[self.provider.name()]).inc();
                warn!("⚠️ Metrics for pair {} failed: {}", pair.pair_address, e);
                MarketMetrics::default()
            }
        }
    }

    /// Pair (if any) and its metrics; zeroed metrics without a pair.
    pub async fn resolve(&self, mint: &Pubkey) -> (Option<PairInfo>, MarketMetrics) {
        match self.best_pair(mint).await {
            Some(pair) => {
                let metrics = self.metrics(&pair).await;
                (Some(pair), metrics)
            }
            None => (None, MarketMetrics::default()),
        }
    }
}

/// price x supply, each from its own fallback chain, else a provider FDV, else 0.
pub struct MarketCapResolver {
    prices: Vec<Arc<dyn PriceProvider>>,
    supplies: Vec<Arc<dyn SupplyProvider>>,
    valuations: Vec<Arc<dyn ValuationProvider>>,
}

fn positive(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite() && *v > 0.0)
}

impl MarketCapResolver {
    pub fn new(
        prices: Vec<Arc<dyn PriceProvider>>,
        supplies: Vec<Arc<dyn SupplyProvider>>,
        valuations: Vec<Arc<dyn ValuationProvider>>,
    ) -> Self {
        Self { prices, supplies, valuations }
    }

    async fn price(&self, mint: &Pubkey) -> Option<f64> {
        for provider in &self.prices {
            match provider.price_usd(mint).await {
                Ok(value) => {
                    if let Some(price) = positive(value) {
                        return Some(price);
                    }
                }
                Err(e) => {
                    PROVIDER_FAILURES.with_label_values(&[provider.name()]).inc();
                    warn!("⚠️ {} price failed for {}: {}", provider.name(), mint, e);
                }
            }
        }
        None
    }

    async fn supply(&self, mint: &Pubkey) -> Option<f64> {
        for provider in &self.supplies {
            match provider.circulating_supply(mint).await {
                Ok(value) => {
                    if let Some(supply) = positive(value) {
                        return Some(supply);
                    }
                }
                Err(e) => {
                    PROVIDER_FAILURES.with_label_values(&[provider.name()]).inc();
                    warn!("⚠️ {} supply failed for {}: {}", provider.name(), mint, e);
                }
            }
        }
        None
    }

    async fn valuation(&self, mint: &Pubkey) -> Option<f64> {
        for provider in &self.valuations {
            match provider.fully_diluted_value(mint).await {
                Ok(value) => {
                    if let Some(fdv) = positive(value) {
                        return Some(fdv);
                    }
                }
                Err(e) => {
                    PROVIDER_FAILURES.with_label_values(&[provider.name()]).inc();
                    warn!("⚠️ {} valuation failed for {}: {}", provider.name(), mint, e);
                }
            }
        }
        None
    }

    pub async fn resolve(&self, mint: &Pubkey) -> f64 {
        let (price, supply) = tokio::join!(self.price(mint), self.supply(mint));
        if let (Some(price), Some(supply)) = (price, supply) {
            return price * supply;
        }
        self.valuation(mint).await.unwrap_or(0.0)
    }
}
