use std::str::FromStr;
use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use migration_core::{InnerInstructionSet, ParsedInstruction, ParsedTransaction, SourceConfig};
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_client::rpc_config::RpcTransactionConfig;
use solana_sdk::commitment_config::CommitmentConfig;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Signature;
use solana_transaction_status::option_serializer::OptionSerializer;
use solana_transaction_status::{
    EncodedTransaction, UiInstruction, UiMessage, UiParsedInstruction, UiTransactionEncoding,
};
use tracing::{debug, info, warn};

/// Where confirmed transactions come from. `Ok(None)` means the node does not have it (yet).
#[async_trait]
pub trait TransactionSource: Send + Sync {
    async fn fetch(&self, signature: &str) -> anyhow::Result<Option<ParsedTransaction>>;
}

pub struct RpcTransactionSource {
    rpc: Arc<RpcClient>,
}

impl RpcTransactionSource {
    pub fn new(rpc: Arc<RpcClient>) -> Self {
        Self { rpc }
    }
}

fn convert_instruction(ix: UiInstruction) -> Option<ParsedInstruction> {
    match ix {
        UiInstruction::Parsed(UiParsedInstruction::Parsed(p)) => Some(ParsedInstruction {
            program: Some(p.program),
            program_id: p.program_id,
            parsed: Some(p.parsed),
        }),
        UiInstruction::Parsed(UiParsedInstruction::PartiallyDecoded(p)) => Some(ParsedInstruction {
            program: None,
            program_id: p.program_id,
            parsed: None,
        }),
        // jsonParsed never yields compiled instructions; without a program id there is nothing to match
        UiInstruction::Compiled(_) => None,
    }
}

#[async_trait]
impl TransactionSource for RpcTransactionSource {
    async fn fetch(&self, signature: &str) -> anyhow::Result<Option<ParsedTransaction>> {
        let sig = Signature::from_str(signature).with_context(|| format!("invalid signature '{}'", signature))?;

        let tx = self
            .rpc
            .get_transaction_with_config(
                &sig,
                RpcTransactionConfig {
                    encoding: Some(UiTransactionEncoding::JsonParsed),
                    commitment: Some(CommitmentConfig::confirmed()),
                    max_supported_transaction_version: Some(0),
                },
            )
            .await?;

        let instructions = match tx.transaction.transaction {
            EncodedTransaction::Json(ui_tx) => match ui_tx.message {
                UiMessage::Parsed(message) => message.instructions.into_iter().filter_map(convert_instruction).collect(),
                UiMessage::Raw(_) => return Ok(None),
            },
            _ => return Ok(None),
        };

        let inner_instructions = match tx.transaction.meta.map(|meta| meta.inner_instructions) {
            Some(OptionSerializer::Some(sets)) => sets
                .into_iter()
                .map(|set| InnerInstructionSet {
                    index: set.index,
                    instructions: set.instructions.into_iter().filter_map(convert_instruction).collect(),
                })
                .collect(),
            _ => Vec::new(),
        };

        Ok(Some(ParsedTransaction {
            signature: signature.to_string(),
            instructions,
            inner_instructions,
        }))
    }
}

/// The migrated mint of `tx` for `source`, if any.
/// The transaction must invoke the source program at top level; the first inner
/// instruction accepted by the source predicate names the mint.
pub fn find_migrated_mint(tx: &ParsedTransaction, source: &SourceConfig) -> Option<Pubkey> {
    let program = source.program_id.to_string();
    if !tx.instructions.iter().any(|ix| ix.program_id == program) {
        return None;
    }

    let hit = tx
        .inner_instructions
        .iter()
        .flat_map(|set| set.instructions.iter())
        .find(|ix| (source.match_predicate)(ix))?;

    let mint = hit.mint()?;
    match Pubkey::from_str(mint) {
        Ok(key) => Some(key),
        Err(e) => {
            warn!("⚠️ Matched instruction in {} carries an invalid mint '{}': {}", tx.signature, mint, e);
            None
        }
    }
}

pub struct TransactionClassifier {
    source: Arc<dyn TransactionSource>,
}

impl TransactionClassifier {
    pub fn new(source: Arc<dyn TransactionSource>) -> Self {
        Self { source }
    }

    /// Never errors: fetch failures and absent transactions both classify as "no mint".
    pub async fn classify(&self, signature: &str, config: &SourceConfig) -> Option<Pubkey> {
        let tx = match self.source.fetch(signature).await {
            Ok(Some(tx)) => tx,
            Ok(None) => {
                debug!("Transaction {} not available", signature);
                return None;
            }
            Err(e) => {
                warn!("⚠️ [{}] Failed to fetch {}: {:#}", config.launch_pad, signature, e);
                return None;
            }
        };

        let mint = find_migrated_mint(&tx, config);
        if let Some(mint) = &mint {
            info!("🎯 [{}] Migration detected: mint {} (sig {})", config.launch_pad, mint, signature);
        }
        mint
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::launchpads;
    use migration_core::constants::{LETSBONK_MIGRATION_OWNER, PUMP_FUN_PROGRAM};
    use serde_json::json;
    use std::collections::HashMap;

    pub(crate) const PUMP_MINT: &str = "9xQeWvG816bUx9EPjHmaT23yvVM2ZWbrrpZb9PusVFpump";

    fn top(program_id: &str) -> ParsedInstruction {
        ParsedInstruction { program: None, program_id: program_id.into(), parsed: None }
    }

    fn spl(kind: &str, info: serde_json::Value) -> ParsedInstruction {
        ParsedInstruction {
            program: Some("spl-token".into()),
            program_id: "TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA".into(),
            parsed: Some(json!({ "type": kind, "info": info })),
        }
    }

    pub(crate) fn pump_migration_tx(signature: &str) -> ParsedTransaction {
        ParsedTransaction {
            signature: signature.into(),
            instructions: vec![top("ComputeBudget111111111111111111111111111111"), top(&PUMP_FUN_PROGRAM.to_string())],
            inner_instructions: vec![InnerInstructionSet {
                index: 1,
                instructions: vec![
                    spl("transfer", json!({ "amount": "10" })),
                    spl("getAccountDataSize", json!({ "mint": PUMP_MINT })),
                    spl("getAccountDataSize", json!({ "mint": "Second111111111111111111111111111111111pump" })),
                ],
            }],
        }
    }

    #[test]
    fn test_finds_first_matching_inner_instruction() {
        let tx = pump_migration_tx("sig1");
        let mint = find_migrated_mint(&tx, &launchpads::pumpfun());
        assert_eq!(mint, Some(Pubkey::from_str(PUMP_MINT).unwrap()));
    }

    #[test]
    fn test_requires_source_program_at_top_level() {
        let mut tx = pump_migration_tx("sig1");
        tx.instructions.retain(|ix| ix.program_id != PUMP_FUN_PROGRAM.to_string());
        assert!(find_migrated_mint(&tx, &launchpads::pumpfun()).is_none());
    }

    #[test]
    fn test_same_transaction_evaluated_per_source() {
        let tx = pump_migration_tx("sig1");
        // LetsBonk program is absent, so the bonk source sees nothing
        assert!(find_migrated_mint(&tx, &launchpads::letsbonk()).is_none());

        let bonk_mint = Pubkey::new_unique();
        let bonk_tx = ParsedTransaction {
            signature: "sig2".into(),
            instructions: vec![top(&launchpads::letsbonk().program_id.to_string())],
            inner_instructions: vec![InnerInstructionSet {
                index: 0,
                instructions: vec![spl(
                    "initializeAccount3",
                    json!({ "owner": LETSBONK_MIGRATION_OWNER.to_string(), "mint": bonk_mint.to_string() }),
                )],
            }],
        };
        assert_eq!(find_migrated_mint(&bonk_tx, &launchpads::letsbonk()), Some(bonk_mint));
        assert!(find_migrated_mint(&bonk_tx, &launchpads::pumpfun()).is_none());
    }

    pub(crate) struct FakeTransactions {
        pub txs: HashMap<String, ParsedTransaction>,
        pub fail: bool,
    }

    #[async_trait]
    impl TransactionSource for FakeTransactions {
        async fn fetch(&self, signature: &str) -> anyhow::Result<Option<ParsedTransaction>> {
            if self.fail {
                anyhow::bail!("rpc unavailable");
            }
            Ok(self.txs.get(signature).cloned())
        }
    }

    #[tokio::test]
    async fn test_classify_absent_or_failing_fetch_is_none() {
        let absent = TransactionClassifier::new(Arc::new(FakeTransactions { txs: HashMap::new(), fail: false }));
        assert!(absent.classify("missing", &launchpads::pumpfun()).await.is_none());

        let failing = TransactionClassifier::new(Arc::new(FakeTransactions { txs: HashMap::new(), fail: true }));
        assert!(failing.classify("any", &launchpads::pumpfun()).await.is_none());
    }

    #[test]
    fn test_convert_partially_decoded_keeps_program_id() {
        let ix = UiInstruction::Parsed(UiParsedInstruction::PartiallyDecoded(
            solana_transaction_status::UiPartiallyDecodedInstruction {
                program_id: PUMP_FUN_PROGRAM.to_string(),
                accounts: vec![],
                data: String::new(),
                stack_height: None,
            },
        ));
        let converted = convert_instruction(ix).unwrap();
        assert_eq!(converted.program_id, PUMP_FUN_PROGRAM.to_string());
        assert!(converted.parsed.is_none());
    }
}
