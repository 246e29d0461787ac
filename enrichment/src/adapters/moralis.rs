use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use lru::LruCache;
use migration_core::TokenIdentity;
use reqwest::Client;
use serde_json::Value;
use solana_sdk::pubkey::Pubkey;
use tracing::debug;

use super::{number, send_json, socials_from, text};
use crate::ports::{IdentityProvider, PriceProvider, ProviderResult, SupplyProvider, ValuationProvider};

pub const MORALIS_BASE_URL: &str = "https://solana-gateway.moralis.io";
const CACHE_SIZE: usize = 512;

/// Moralis token metadata. One document answers identity, supply and FDV, so
/// responses are cached per mint and shared by every port implemented here.
/// Only found documents are cached; a 404 is asked again next time.
pub struct MoralisClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    cache: Mutex<LruCache<Pubkey, Arc<Value>>>,
}

impl MoralisClient {
    pub fn new(client: Client, api_key: Option<String>) -> Self {
        Self::with_base_url(client, api_key, MORALIS_BASE_URL)
    }

    pub fn with_base_url(client: Client, api_key: Option<String>, base_url: impl Into<String>) -> Self {
        let size = NonZeroUsize::new(CACHE_SIZE).unwrap_or(NonZeroUsize::MIN);
        Self {
            client,
            base_url: base_url.into(),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            cache: Mutex::new(LruCache::new(size)),
        }
    }

    fn cached(&self, mint: &Pubkey) -> Option<Arc<Value>> {
        self.cache.lock().ok()?.get(mint).cloned()
    }

    fn remember(&self, mint: Pubkey, doc: Arc<Value>) {
        if let Ok(mut cache) = self.cache.lock() {
            cache.put(mint, doc);
        }
    }

    async fn metadata(&self, mint: &Pubkey) -> ProviderResult<Option<Arc<Value>>> {
        let Some(api_key) = &self.api_key else {
            debug!("Moralis disabled, no API key");
            return Ok(None);
        };
        if let Some(hit) = self.cached(mint) {
            return Ok(Some(hit));
        }

        let url = format!("{}/token/mainnet/{}/metadata", self.base_url, mint);
        let request = self.client.get(&url).header("X-API-Key", api_key).header("accept", "application/json");
        let doc = send_json("moralis", request).await?.map(Arc::new);
        if let Some(doc) = &doc {
            self.remember(*mint, doc.clone());
        }
        Ok(doc)
    }
}

pub(crate) fn identity_from_metadata(doc: &Value) -> TokenIdentity {
    let mut socials = doc.get("links").map(socials_from).unwrap_or_default();
    socials.fill_missing(&socials_from(doc));
    TokenIdentity {
        name: text(doc, "name").unwrap_or_default(),
        symbol: text(doc, "symbol").unwrap_or_default(),
        image: text(doc, "logo"),
        description: text(doc, "description"),
        socials,
    }
}

pub(crate) fn fdv_of(doc: &Value) -> Option<f64> {
    doc.get("fullyDilutedValue").and_then(number)
}

pub(crate) fn supply_of(doc: &Value) -> Option<f64> {
    doc.get("totalSupplyFormatted").and_then(number)
}

/// Price implied by FDV over total supply.
pub(crate) fn implied_price(doc: &Value) -> Option<f64> {
    match (fdv_of(doc), supply_of(doc)) {
        (Some(fdv), Some(supply)) if supply > 0.0 => Some(fdv / supply),
        _ => None,
    }
}

#[async_trait]
impl IdentityProvider for MoralisClient {
    fn name(&self) -> &'static str {
        "moralis"
    }

    async fn fetch_identity(&self, mint: &Pubkey) -> ProviderResult<Option<TokenIdentity>> {
        Ok(self.metadata(mint).await?.map(|doc| identity_from_metadata(&doc)))
    }
}

#[async_trait]
impl PriceProvider for MoralisClient {
    fn name(&self) -> &'static str {
        "moralis"
    }

    async fn price_usd(&self, mint: &Pubkey) -> ProviderResult<Option<f64>> {
        Ok(self.metadata(mint).await?.and_then(|doc| implied_price(&doc)))
    }
}

#[async_trait]
impl SupplyProvider for MoralisClient {
    fn name(&self) -> &'static str {
        "moralis"
    }

    async fn circulating_supply(&self, mint: &Pubkey) -> ProviderResult<Option<f64>> {
        Ok(self.metadata(mint).await?.and_then(|doc| supply_of(&doc)))
    }
}

#[async_trait]
impl ValuationProvider for MoralisClient {
    fn name(&self) -> &'static str {
        "moralis"
    }

    async fn fully_diluted_value(&self, mint: &Pubkey) -> ProviderResult<Option<f64>> {
        Ok(self.metadata(mint).await?.and_then(|doc| fdv_of(&doc)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Value {
        json!({
            "mint": "x",
            "name": "Moon",
            "symbol": "MOON",
            "logo": "https://img/moon.png",
            "fullyDilutedValue": "50000.00",
            "totalSupplyFormatted": "1000000000",
            "links": { "twitter": "https://x.com/moon", "website": "https://moon.io" }
        })
    }

    #[test]
    fn test_metadata_parsing() {
        let doc = sample();
        let identity = identity_from_metadata(&doc);
        assert_eq!(identity.symbol, "MOON");
        assert_eq!(identity.socials.twitter.as_deref(), Some("https://x.com/moon"));
        assert_eq!(fdv_of(&doc), Some(50_000.0));
        assert_eq!(supply_of(&doc), Some(1_000_000_000.0));
        assert!((implied_price(&doc).unwrap() - 0.00005).abs() < 1e-12);
        assert!(implied_price(&json!({ "fullyDilutedValue": "10" })).is_none());
    }

    #[tokio::test]
    async fn test_without_api_key_answers_nothing() {
        let client = MoralisClient::new(Client::new(), Some("  ".into()));
        let mint = Pubkey::new_unique();
        assert!(client.fetch_identity(&mint).await.unwrap().is_none());
        assert!(client.fully_diluted_value(&mint).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_cached_document_is_served_without_network() {
        // unroutable base url: any request would fail
        let client = MoralisClient::with_base_url(Client::new(), Some("key".into()), "http://127.0.0.1:9");
        let mint = Pubkey::new_unique();
        client.remember(mint, Arc::new(sample()));
        assert_eq!(client.circulating_supply(&mint).await.unwrap(), Some(1_000_000_000.0));
    }

    /// Serves the given (status line, body) pairs in order, one per connection.
    async fn spawn_http_stub(replies: Vec<(&'static str, String)>) -> String {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());
        tokio::spawn(async move {
            for (status, body) in replies {
                let Ok((mut stream, _)) = listener.accept().await else { return };
                let mut request = Vec::new();
                let mut buf = [0u8; 1024];
                while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                    match stream.read(&mut buf).await {
                        Ok(0) | Err(_) => break,
                        Ok(n) => request.extend_from_slice(&buf[..n]),
                    }
                }
                let response = format!(
                    "HTTP/1.1 {}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                    status,
                    body.len(),
                    body
                );
                let _ = stream.write_all(response.as_bytes()).await;
                let _ = stream.shutdown().await;
            }
        });
        url
    }

    #[tokio::test]
    async fn test_not_found_is_not_cached() {
        let url = spawn_http_stub(vec![("404 Not Found", String::new()), ("200 OK", sample().to_string())]).await;
        let client = MoralisClient::with_base_url(Client::new(), Some("key".into()), url);
        let mint = Pubkey::new_unique();

        assert!(client.fetch_identity(&mint).await.unwrap().is_none());
        assert!(client.cached(&mint).is_none());

        // indexed later: the next lookup reaches the network again
        let identity = client.fetch_identity(&mint).await.unwrap().unwrap();
        assert_eq!(identity.symbol, "MOON");
        assert!(client.cached(&mint).is_some());
    }
}
