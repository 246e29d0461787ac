use std::sync::Arc;

use async_trait::async_trait;
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_sdk::commitment_config::CommitmentConfig;
use solana_sdk::program_pack::Pack;
use solana_sdk::pubkey::Pubkey;
use spl_token::state::Mint;

use crate::error::ProviderError;
use crate::ports::{ProviderResult, SupplyProvider};

/// Supply in UI units from a raw SPL mint account.
pub fn ui_supply(data: &[u8]) -> ProviderResult<f64> {
    if data.len() < Mint::LEN {
        return Err(ProviderError::Decode(format!("mint account is {} bytes", data.len())));
    }
    let mint = Mint::unpack_from_slice(&data[..Mint::LEN])
        .map_err(|e| ProviderError::Decode(format!("mint account: {}", e)))?;
    Ok(mint.supply as f64 / 10f64.powi(mint.decimals as i32))
}

/// Reads supply straight from the mint account. Works for Token-2022 mints too,
/// their base layout matches.
pub struct MintSupplyProvider {
    rpc: Arc<RpcClient>,
}

impl MintSupplyProvider {
    pub fn new(rpc: Arc<RpcClient>) -> Self {
        Self { rpc }
    }
}

#[async_trait]
impl SupplyProvider for MintSupplyProvider {
    fn name(&self) -> &'static str {
        "rpc-mint"
    }

    async fn circulating_supply(&self, mint: &Pubkey) -> ProviderResult<Option<f64>> {
        let account = self
            .rpc
            .get_account_with_commitment(mint, CommitmentConfig::confirmed())
            .await?
            .value;
        match account {
            Some(account) => Ok(Some(ui_supply(&account.data)?)),
            None => Ok(None),
        }
    }
}
