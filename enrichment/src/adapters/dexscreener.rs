use async_trait::async_trait;
use migration_core::{MarketMetrics, PairInfo, Windowed};
use reqwest::Client;
use serde::Deserialize;
use solana_sdk::pubkey::Pubkey;

use super::get_json;
use crate::ports::{MarketDataProvider, PairSummary, ProviderResult};

pub const DEXSCREENER_BASE_URL: &str = "https://api.dexscreener.com";

#[derive(Debug, Default, Deserialize)]
struct DexWindows<T> {
    #[serde(default)]
    h24: Option<T>,
    #[serde(default)]
    h6: Option<T>,
    #[serde(default)]
    h1: Option<T>,
    #[serde(default)]
    m5: Option<T>,
}

impl<T: Copy + Default> DexWindows<T> {
    fn windowed(&self) -> Windowed<T> {
        Windowed {
            h24: self.h24.unwrap_or_default(),
            h6: self.h6.unwrap_or_default(),
            h1: self.h1.unwrap_or_default(),
            m5: self.m5.unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
struct DexTxns {
    #[serde(default)]
    buys: u64,
    #[serde(default)]
    sells: u64,
}

#[derive(Debug, Default, Deserialize)]
struct DexLiquidity {
    #[serde(default)]
    usd: Option<f64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DexPair {
    #[serde(default)]
    chain_id: Option<String>,
    #[serde(default)]
    pair_address: Option<String>,
    #[serde(default)]
    price_usd: Option<String>,
    #[serde(default)]
    fdv: Option<f64>,
    #[serde(default)]
    liquidity: Option<DexLiquidity>,
    #[serde(default)]
    volume: Option<DexWindows<f64>>,
    #[serde(default)]
    price_change: Option<DexWindows<f64>>,
    #[serde(default)]
    txns: Option<DexWindows<DexTxns>>,
    #[serde(default)]
    pair_created_at: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
struct PairsReply {
    #[serde(default)]
    pairs: Option<Vec<DexPair>>,
    #[serde(default)]
    pair: Option<DexPair>,
}

impl DexPair {
    fn liquidity_usd(&self) -> f64 {
        self.liquidity.as_ref().and_then(|l| l.usd).unwrap_or(0.0)
    }

    /// `None` for venues missing their chain or address.
    fn summary(&self) -> Option<PairSummary> {
        let chain_id = self.chain_id.as_deref().filter(|c| !c.is_empty())?;
        let pair_address = self.pair_address.as_deref().filter(|a| !a.is_empty())?;
        Some(PairSummary {
            pair: PairInfo { pair_address: pair_address.to_string(), chain_id: chain_id.to_string() },
            liquidity_usd: self.liquidity_usd(),
        })
    }

    fn metrics(&self) -> MarketMetrics {
        let txns = self.txns.as_ref().map(DexWindows::windowed).unwrap_or_default();
        MarketMetrics {
            price_usd: self.price_usd.as_deref().and_then(|p| p.parse().ok()).unwrap_or(0.0),
            fdv: self.fdv.unwrap_or(0.0),
            liquidity_usd: self.liquidity_usd(),
            volume: self.volume.as_ref().map(DexWindows::windowed).unwrap_or_default(),
            price_change: self.price_change.as_ref().map(DexWindows::windowed).unwrap_or_default(),
            buys: Windowed { h24: txns.h24.buys, h6: txns.h6.buys, h1: txns.h1.buys, m5: txns.m5.buys },
            sells: Windowed { h24: txns.h24.sells, h6: txns.h6.sells, h1: txns.h1.sells, m5: txns.m5.sells },
            pair_created_at: self.pair_created_at,
        }
    }
}

fn parse_reply(reply: Option<serde_json::Value>) -> ProviderResult<PairsReply> {
    match reply {
        Some(value) => Ok(serde_json::from_value(value)?),
        None => Ok(PairsReply::default()),
    }
}

pub struct DexScreenerClient {
    client: Client,
    base_url: String,
}

impl DexScreenerClient {
    pub fn new(client: Client) -> Self {
        Self::with_base_url(client, DEXSCREENER_BASE_URL)
    }

    pub fn with_base_url(client: Client, base_url: impl Into<String>) -> Self {
        Self { client, base_url: base_url.into() }
    }
}

#[async_trait]
impl MarketDataProvider for DexScreenerClient {
    fn name(&self) -> &'static str {
        "dexscreener"
    }

    async fn token_pairs(&self, mint: &Pubkey) -> ProviderResult<Vec<PairSummary>> {
        let url = format!("{}/latest/dex/tokens/{}", self.base_url, mint);
        let reply = parse_reply(get_json("dexscreener", &self.client, &url).await?)?;
        Ok(reply.pairs.unwrap_or_default().iter().filter_map(DexPair::summary).collect())
    }

    async fn pair_metrics(&self, pair: &PairInfo) -> ProviderResult<Option<MarketMetrics>> {
        let url = format!("{}/latest/dex/pairs/{}/{}", self.base_url, pair.chain_id, pair.pair_address);
        let reply = parse_reply(get_json("dexscreener", &self.client, &url).await?)?;
        let found = reply.pair.or_else(|| reply.pairs.and_then(|p| p.into_iter().next()));
        Ok(found.map(|p| p.metrics()))
    }
}
