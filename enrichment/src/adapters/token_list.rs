use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use migration_core::{Socials, TokenIdentity};
use reqwest::Client;
use serde::Deserialize;
use solana_sdk::pubkey::Pubkey;
use tokio::sync::RwLock;
use tracing::info;

use crate::error::ProviderError;
use crate::ports::{IdentityProvider, ProviderResult};

pub const SOLANA_TOKEN_LIST_URL: &str =
    "https://raw.githubusercontent.com/solana-labs/token-list/main/src/tokens/solana.tokenlist.json";

#[derive(Debug, Deserialize)]
struct TokenListFile {
    #[serde(default)]
    tokens: Vec<TokenListEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TokenListEntry {
    address: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    symbol: String,
    #[serde(rename = "logoURI", default)]
    logo_uri: Option<String>,
    #[serde(default)]
    extensions: Option<Socials>,
}

impl From<TokenListEntry> for TokenIdentity {
    fn from(entry: TokenListEntry) -> Self {
        TokenIdentity {
            name: entry.name,
            symbol: entry.symbol,
            image: entry.logo_uri.filter(|s| !s.is_empty()),
            description: None,
            socials: entry.extensions.unwrap_or_default(),
        }
    }
}

/// Static community token list, downloaded once and kept in memory.
/// A failed download is not cached, the next lookup tries again.
pub struct TokenListProvider {
    client: Client,
    url: String,
    entries: RwLock<Option<Arc<HashMap<String, TokenIdentity>>>>,
}

impl TokenListProvider {
    pub fn new(client: Client, url: impl Into<String>) -> Self {
        Self { client, url: url.into(), entries: RwLock::new(None) }
    }

    /// Pre-loaded list; never touches the network.
    pub fn from_identities(entries: impl IntoIterator<Item = (Pubkey, TokenIdentity)>) -> Self {
        let map = entries.into_iter().map(|(k, v)| (k.to_string(), v)).collect();
        Self {
            client: Client::new(),
            url: String::new(),
            entries: RwLock::new(Some(Arc::new(map))),
        }
    }

    async fn load(&self) -> ProviderResult<Arc<HashMap<String, TokenIdentity>>> {
        if let Some(cached) = self.entries.read().await.as_ref() {
            return Ok(cached.clone());
        }

        let mut guard = self.entries.write().await;
        if let Some(cached) = guard.as_ref() {
            return Ok(cached.clone());
        }

        let response = self.client.get(&self.url).send().await?;
        if !response.status().is_success() {
            return Err(ProviderError::Status { provider: "token-list", status: response.status().as_u16() });
        }
        let file: TokenListFile = response.json().await?;
        let map: HashMap<String, TokenIdentity> = file
            .tokens
            .into_iter()
            .map(|entry| (entry.address.clone(), TokenIdentity::from(entry)))
            .collect();
        info!("📜 Token list loaded: {} entries", map.len());

        let map = Arc::new(map);
        *guard = Some(map.clone());
        Ok(map)
    }
}

#[async_trait]
impl IdentityProvider for TokenListProvider {
    fn name(&self) -> &'static str {
        "token-list"
    }

    async fn fetch_identity(&self, mint: &Pubkey) -> ProviderResult<Option<TokenIdentity>> {
        let entries = self.load().await?;
        Ok(entries.get(&mint.to_string()).cloned())
    }
}
