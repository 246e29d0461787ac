use async_trait::async_trait;
use migration_core::TokenIdentity;
use reqwest::Client;
use serde_json::{json, Value};
use solana_sdk::pubkey::Pubkey;

use super::{number, send_json, socials_from, text};
use crate::error::ProviderError;
use crate::ports::{HolderProvider, IdentityProvider, ProviderResult, TokenAccountBalance};

/// Helius DAS methods served on the same URL as regular JSON-RPC.
pub struct HeliusDasClient {
    client: Client,
    rpc_url: String,
}

impl HeliusDasClient {
    pub fn new(client: Client, rpc_url: impl Into<String>) -> Self {
        Self { client, rpc_url: rpc_url.into() }
    }

    async fn call(&self, method: &str, params: Value) -> ProviderResult<Option<Value>> {
        let body = json!({
            "jsonrpc": "2.0",
            "id": "migration-engine",
            "method": method,
            "params": params,
        });
        let Some(reply) = send_json("helius", self.client.post(&self.rpc_url).json(&body)).await? else {
            return Ok(None);
        };
        if let Some(error) = reply.get("error") {
            return Err(ProviderError::Rpc(format!("{}: {}", method, error)));
        }
        Ok(reply.get("result").cloned().filter(|r| !r.is_null()))
    }
}

pub(crate) fn identity_from_asset(asset: &Value) -> Option<TokenIdentity> {
    let content = asset.get("content")?;
    let metadata = content.get("metadata")?;
    let links = content.get("links").cloned().unwrap_or(Value::Null);

    let mut socials = socials_from(&links);
    socials.fill_missing(&socials_from(metadata));

    Some(TokenIdentity {
        name: text(metadata, "name").unwrap_or_default(),
        symbol: text(metadata, "symbol").unwrap_or_default(),
        image: text(&links, "image"),
        description: text(metadata, "description"),
        socials,
    })
}

pub(crate) fn balances_from_page(result: &Value) -> Vec<TokenAccountBalance> {
    result
        .get("token_accounts")
        .and_then(Value::as_array)
        .map(|accounts| {
            accounts
                .iter()
                .filter_map(|acc| {
                    let owner = text(acc, "owner")?;
                    let amount = acc
                        .get("amount")
                        .and_then(|v| v.as_u64().or_else(|| number(v).map(|f| f.max(0.0) as u64)))
                        .unwrap_or(0);
                    Some(TokenAccountBalance { owner, amount })
                })
                .collect()
        })
        .unwrap_or_default()
}

#[async_trait]
impl IdentityProvider for HeliusDasClient {
    fn name(&self) -> &'static str {
        "helius-asset"
    }

    async fn fetch_identity(&self, mint: &Pubkey) -> ProviderResult<Option<TokenIdentity>> {
        let result = self.call("getAsset", json!({ "id": mint.to_string() })).await?;
        Ok(result.as_ref().and_then(identity_from_asset))
    }
}

#[async_trait]
impl HolderProvider for HeliusDasClient {
    fn name(&self) -> &'static str {
        "helius-holders"
    }

    async fn token_accounts(&self, mint: &Pubkey, page: u32, limit: u32) -> ProviderResult<Vec<TokenAccountBalance>> {
        let params = json!({
            "mint": mint.to_string(),
            "page": page,
            "limit": limit,
            "displayOptions": { "showZeroBalance": false },
        });
        let result = self.call("getTokenAccounts", params).await?;
        Ok(result.as_ref().map(balances_from_page).unwrap_or_default())
    }
}
