pub mod telemetry;

use serde::{Serialize, Deserialize};
use serde_json::Value;
use solana_sdk::pubkey::Pubkey;

/// Program id reported for notifications whose subscription could not be attributed.
pub const UNKNOWN_PROGRAM: &str = "unknown";

/// One streamed log notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEvent {
    pub program_id: String,
    pub signature: String,
    pub logs: Vec<String>,
}

/// A single instruction as returned by `jsonParsed` transaction encoding.
/// `parsed` is only present when the node knows the program's layout (spl-token, system, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedInstruction {
    pub program: Option<String>,
    pub program_id: String,
    pub parsed: Option<Value>,
}

impl ParsedInstruction {
    pub fn instruction_type(&self) -> Option<&str> {
        self.parsed.as_ref()?.get("type")?.as_str()
    }

    pub fn info_str(&self, key: &str) -> Option<&str> {
        self.parsed.as_ref()?.get("info")?.get(key)?.as_str()
    }

    pub fn mint(&self) -> Option<&str> {
        self.info_str("mint")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InnerInstructionSet {
    /// Index of the top-level instruction these were invoked from
    pub index: u8,
    pub instructions: Vec<ParsedInstruction>,
}

/// The parts of a confirmed transaction the classifier looks at.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParsedTransaction {
    pub signature: String,
    pub instructions: Vec<ParsedInstruction>,
    pub inner_instructions: Vec<InnerInstructionSet>,
}

pub type InstructionPredicate = fn(&ParsedInstruction) -> bool;

/// Static description of one monitored launch-pad.
#[derive(Debug, Clone)]
pub struct SourceConfig {
    pub title: String,
    /// Name of the config key holding the notification destination
    pub notify_target_key: String,
    pub match_predicate: InstructionPredicate,
    pub launch_pad: String,
    pub program_id: Pubkey,
}

/// The most liquid trading venue of a token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PairInfo {
    pub pair_address: String,
    pub chain_id: String,
}

/// A value sampled over the four aggregator windows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Windowed<T> {
    pub h24: T,
    pub h6: T,
    pub h1: T,
    pub m5: T,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MarketMetrics {
    pub price_usd: f64,
    pub fdv: f64,
    pub liquidity_usd: f64,
    pub volume: Windowed<f64>,
    pub price_change: Windowed<f64>,
    pub buys: Windowed<u64>,
    pub sells: Windowed<u64>,
    /// Unix millis
    pub pair_created_at: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HolderDistribution {
    pub holder_count: usize,
    pub top_percentages: Vec<f64>,
    pub top_total_percentage: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Socials {
    pub website: Option<String>,
    pub twitter: Option<String>,
    pub telegram: Option<String>,
    pub discord: Option<String>,
}

impl Socials {
    /// Fills every empty slot from `other`, keeping what is already set.
    pub fn fill_missing(&mut self, other: &Socials) {
        fn pick(slot: &mut Option<String>, candidate: &Option<String>) {
            if slot.is_none() {
                *slot = candidate.clone();
            }
        }
        pick(&mut self.website, &other.website);
        pick(&mut self.twitter, &other.twitter);
        pick(&mut self.telegram, &other.telegram);
        pick(&mut self.discord, &other.discord);
    }

    pub fn is_empty(&self) -> bool {
        self.website.is_none() && self.twitter.is_none() && self.telegram.is_none() && self.discord.is_none()
    }
}

/// Name, symbol and presentation data for a mint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenIdentity {
    pub name: String,
    pub symbol: String,
    pub image: Option<String>,
    pub description: Option<String>,
    pub socials: Socials,
}

impl TokenIdentity {
    /// Degraded identity: the mint address stands in for name and symbol.
    pub fn fallback(mint: &Pubkey) -> Self {
        let addr = mint.to_string();
        Self {
            name: addr.clone(),
            symbol: addr,
            ..Default::default()
        }
    }

    pub fn is_usable(&self, mint: &Pubkey) -> bool {
        let addr = mint.to_string();
        let name = self.name.trim();
        let symbol = self.symbol.trim();
        !name.is_empty() && !symbol.is_empty() && name != addr && symbol != addr
    }
}

/// Fully enriched token, built once per alert and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenProfile {
    pub title: String,
    pub launch_pad: String,
    pub mint: Pubkey,
    pub name: String,
    pub symbol: String,
    pub image: Option<String>,
    pub description: Option<String>,
    pub market_cap: f64,
    pub market: MarketMetrics,
    pub holders: HolderDistribution,
    pub age: String,
    pub pair: Option<PairInfo>,
    /// DexScreener page of the pair, empty without one
    pub link: String,
    pub socials: Socials,
}

pub mod constants {
    use solana_sdk::pubkey;
    use solana_sdk::pubkey::Pubkey;

    pub const PUMP_FUN_PROGRAM: Pubkey = pubkey!("6EF8rrecthR5Dkzon8Nwu78hRvfCKubJ14M5uBEwF6P");
    pub const LETSBONK_PROGRAM: Pubkey = pubkey!("LanMV9sAd7wArD4vJFi2qDdfnVhFxYSUg6eADduJ3uj");
    /// Account owner of the token accounts created when a LetsBonk pool migrates
    pub const LETSBONK_MIGRATION_OWNER: Pubkey = pubkey!("GpMZbSM2GgvTKHJirzeGfMFoaZ8UR2X7F4v8vHTvxFbL");
    pub const METAPLEX_METADATA_PROGRAM: Pubkey = pubkey!("metaqbxxUerdq28cj1RbAWkYQm3ybzjb6a8bt518x1s");
    pub const SOL_MINT: Pubkey = pubkey!("So11111111111111111111111111111111111111112");

    pub const DEXSCREENER_PAIR_URL: &str = "https://dexscreener.com/solana";
}
