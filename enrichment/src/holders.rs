use std::collections::HashMap;
use std::sync::Arc;

use migration_core::telemetry::PROVIDER_FAILURES;
use migration_core::HolderDistribution;
use solana_sdk::pubkey::Pubkey;
use tracing::{debug, warn};

use crate::ports::{HolderProvider, TokenAccountBalance};

pub const DEFAULT_PAGE_SIZE: u32 = 1000;
pub const DEFAULT_TOP_HOLDERS: usize = 5;

pub struct HolderResolver {
    provider: Arc<dyn HolderProvider>,
    page_size: u32,
    top_k: usize,
}

impl HolderResolver {
    pub fn new(provider: Arc<dyn HolderProvider>) -> Self {
        Self { provider, page_size: DEFAULT_PAGE_SIZE, top_k: DEFAULT_TOP_HOLDERS }
    }

    pub fn with_limits(mut self, page_size: u32, top_k: usize) -> Self {
        self.page_size = page_size.max(1);
        self.top_k = top_k;
        self
    }

    /// Pages through every token account of the mint until an empty page.
    /// A failed page ends pagination; whatever was collected so far is summarised.
    pub async fn resolve(&self, mint: &Pubkey) -> HolderDistribution {
        let mut accounts: Vec<TokenAccountBalance> = Vec::new();
        let mut page = 1u32;

        loop {
            match self.provider.token_accounts(mint, page, self.page_size).await {
                Ok(batch) if batch.is_empty() => break,
                Ok(batch) => {
                    accounts.extend(batch);
                    page += 1;
                }
                Err(e) => {
                    PROVIDER_FAILURES.with_label_values(&[self.provider.name()]).inc();
                    warn!("⚠️ Holder page {} failed for {}: {}", page, mint, e);
                    break;
                }
            }
        }

        let distribution = summarize(&accounts, self.top_k);
        debug!("👥 {} holders for {} (top {} hold {:.2}%)", distribution.holder_count, mint, self.top_k, distribution.top_total_percentage);
        distribution
    }
}

/// Aggregates balances per owner and reports the share of the `top_k` largest.
/// A zero total supply yields zero percentages.
pub fn summarize(accounts: &[TokenAccountBalance], top_k: usize) -> HolderDistribution {
    let mut per_owner: HashMap<&str, u128> = HashMap::new();
    for account in accounts {
        *per_owner.entry(account.owner.as_str()).or_default() += account.amount as u128;
    }

    let total: u128 = per_owner.values().sum();
    let mut ranked: Vec<(&str, u128)> = per_owner.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));

    let holder_count = ranked.len();
    let top_percentages: Vec<f64> = ranked
        .iter()
        .take(top_k)
        .map(|(_, amount)| if total > 0 { *amount as f64 / total as f64 * 100.0 } else { 0.0 })
        .collect();
    let top_total_percentage = top_percentages.iter().sum();

    HolderDistribution { holder_count, top_percentages, top_total_percentage }
}
