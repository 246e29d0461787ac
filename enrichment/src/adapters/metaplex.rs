use std::sync::Arc;

use async_trait::async_trait;
use borsh::BorshDeserialize;
use migration_core::constants::METAPLEX_METADATA_PROGRAM;
use migration_core::TokenIdentity;
use reqwest::Client;
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_sdk::commitment_config::CommitmentConfig;
use solana_sdk::pubkey::Pubkey;
use tracing::debug;

use super::{get_json, socials_from, text};
use crate::error::ProviderError;
use crate::ports::{IdentityProvider, ProviderResult};

/// Leading fields of a Metaplex metadata account. Borsh stops reading after `uri`,
/// the creators/collection tail is not needed.
#[derive(Debug, BorshDeserialize)]
struct MetadataPrefix {
    _key: u8,
    _update_authority: [u8; 32],
    _mint: [u8; 32],
    name: String,
    symbol: String,
    uri: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OnChainMetadata {
    pub name: String,
    pub symbol: String,
    pub uri: String,
}

/// Fixed-size on-chain strings are right-padded with NULs.
fn clean(raw: String) -> String {
    raw.trim_end_matches('\0').trim().to_string()
}

pub fn metadata_address(mint: &Pubkey) -> Pubkey {
    Pubkey::find_program_address(
        &[b"metadata", METAPLEX_METADATA_PROGRAM.as_ref(), mint.as_ref()],
        &METAPLEX_METADATA_PROGRAM,
    )
    .0
}

pub fn decode_metadata(data: &[u8]) -> ProviderResult<OnChainMetadata> {
    let prefix = MetadataPrefix::deserialize(&mut &data[..])
        .map_err(|e| ProviderError::Decode(format!("metaplex metadata: {}", e)))?;
    Ok(OnChainMetadata {
        name: clean(prefix.name),
        symbol: clean(prefix.symbol),
        uri: clean(prefix.uri),
    })
}

/// On-chain Metaplex metadata, enriched with the off-chain JSON its URI points to.
pub struct MetaplexProvider {
    rpc: Arc<RpcClient>,
    client: Client,
}

impl MetaplexProvider {
    pub fn new(rpc: Arc<RpcClient>, client: Client) -> Self {
        Self { rpc, client }
    }
}

#[async_trait]
impl IdentityProvider for MetaplexProvider {
    fn name(&self) -> &'static str {
        "metaplex"
    }

    async fn fetch_identity(&self, mint: &Pubkey) -> ProviderResult<Option<TokenIdentity>> {
        let address = metadata_address(mint);
        let account = self
            .rpc
            .get_account_with_commitment(&address, CommitmentConfig::confirmed())
            .await?
            .value;
        let Some(account) = account else {
            return Ok(None);
        };

        let on_chain = decode_metadata(&account.data)?;
        let mut identity = TokenIdentity {
            name: on_chain.name,
            symbol: on_chain.symbol,
            ..Default::default()
        };

        if on_chain.uri.is_empty() {
            return Ok(Some(identity));
        }

        // The off-chain document is best effort; a dead URI still leaves the on-chain names.
        match get_json("metaplex-uri", &self.client, &on_chain.uri).await {
            Ok(Some(json)) => {
                if let Some(name) = text(&json, "name") {
                    identity.name = name;
                }
                if let Some(symbol) = text(&json, "symbol") {
                    identity.symbol = symbol;
                }
                identity.image = text(&json, "image");
                identity.description = text(&json, "description");
                identity.socials = socials_from(&json);
                if let Some(extensions) = json.get("extensions") {
                    identity.socials.fill_missing(&socials_from(extensions));
                }
            }
            Ok(None) => debug!("Metadata URI {} not found", on_chain.uri),
            Err(e) => debug!("Metadata URI {} unreadable: {}", on_chain.uri, e),
        }

        Ok(Some(identity))
    }
}
