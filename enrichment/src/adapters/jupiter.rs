use async_trait::async_trait;
use migration_core::{Socials, TokenIdentity};
use reqwest::Client;
use serde_json::Value;
use solana_sdk::pubkey::Pubkey;

use super::{get_json, number, text};
use crate::ports::{IdentityProvider, PriceProvider, ProviderResult};

pub const JUPITER_BASE_URL: &str = "https://lite-api.jup.ag";

pub struct JupiterClient {
    client: Client,
    base_url: String,
}

impl JupiterClient {
    pub fn new(client: Client) -> Self {
        Self::with_base_url(client, JUPITER_BASE_URL)
    }

    pub fn with_base_url(client: Client, base_url: impl Into<String>) -> Self {
        Self { client, base_url: base_url.into() }
    }
}

/// `{ "<mint>": { "usdPrice": 0.0012, ... } }`
pub(crate) fn price_from_reply(reply: &Value, mint: &Pubkey) -> Option<f64> {
    reply.get(mint.to_string())?.get("usdPrice").and_then(number)
}

/// Search returns an array of tokens; prefer the exact mint, else the top hit.
pub(crate) fn identity_from_search(reply: &Value, mint: &Pubkey) -> Option<TokenIdentity> {
    let hits = reply.as_array()?;
    let addr = mint.to_string();
    let hit = hits
        .iter()
        .find(|t| t.get("id").and_then(Value::as_str) == Some(addr.as_str()))
        .or_else(|| hits.first())?;

    Some(TokenIdentity {
        name: text(hit, "name").unwrap_or_default(),
        symbol: text(hit, "symbol").unwrap_or_default(),
        image: text(hit, "icon"),
        description: None,
        socials: Socials {
            website: text(hit, "website"),
            twitter: text(hit, "twitter"),
            telegram: text(hit, "telegram"),
            discord: text(hit, "discord"),
        },
    })
}

#[async_trait]
impl PriceProvider for JupiterClient {
    fn name(&self) -> &'static str {
        "jupiter-price"
    }

    async fn price_usd(&self, mint: &Pubkey) -> ProviderResult<Option<f64>> {
        let url = format!("{}/price/v3?ids={}", self.base_url, mint);
        let reply = get_json("jupiter-price", &self.client, &url).await?;
        Ok(reply.and_then(|r| price_from_reply(&r, mint)))
    }
}

#[async_trait]
impl IdentityProvider for JupiterClient {
    fn name(&self) -> &'static str {
        "jupiter-search"
    }

    async fn fetch_identity(&self, mint: &Pubkey) -> ProviderResult<Option<TokenIdentity>> {
        let url = format!("{}/tokens/v2/search?query={}", self.base_url, mint);
        let reply = get_json("jupiter-search", &self.client, &url).await?;
        Ok(reply.and_then(|r| identity_from_search(&r, mint)))
    }
}
