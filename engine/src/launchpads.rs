use migration_core::constants::{LETSBONK_MIGRATION_OWNER, LETSBONK_PROGRAM, PUMP_FUN_PROGRAM, SOL_MINT};
use migration_core::{ParsedInstruction, SourceConfig};

/// Pump.fun migrations create the Raydium vault for the token, which shows up as an
/// spl-token `getAccountDataSize` on a vanity `...pump` mint.
pub fn is_pumpfun_migration(ix: &ParsedInstruction) -> bool {
    ix.program.as_deref() == Some("spl-token")
        && ix.instruction_type() == Some("getAccountDataSize")
        && ix.mint().map_or(false, |mint| mint.ends_with("pump"))
}

/// LetsBonk migrations initialise a token account owned by the migration authority.
pub fn is_letsbonk_migration(ix: &ParsedInstruction) -> bool {
    let sol = SOL_MINT.to_string();
    let owner = LETSBONK_MIGRATION_OWNER.to_string();
    ix.instruction_type() == Some("initializeAccount3")
        && ix.info_str("owner") == Some(owner.as_str())
        && ix.mint().map_or(false, |mint| mint != sol)
}

pub fn pumpfun() -> SourceConfig {
    SourceConfig {
        title: "🚀 PumpFun Migration".to_string(),
        notify_target_key: "DISCORD_CHANNEL_ID_PUMPFUN_MIGRATION".to_string(),
        match_predicate: is_pumpfun_migration,
        launch_pad: "PumpFun".to_string(),
        program_id: PUMP_FUN_PROGRAM,
    }
}

pub fn letsbonk() -> SourceConfig {
    SourceConfig {
        title: "🐕 LetsBonk Migration".to_string(),
        notify_target_key: "DISCORD_CHANNEL_ID_BONK_MIGRATION".to_string(),
        match_predicate: is_letsbonk_migration,
        launch_pad: "LetsBonk".to_string(),
        program_id: LETSBONK_PROGRAM,
    }
}

pub fn all() -> Vec<SourceConfig> {
    vec![pumpfun(), letsbonk()]
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn spl(kind: &str, info: serde_json::Value) -> ParsedInstruction {
        ParsedInstruction {
            program: Some("spl-token".into()),
            program_id: "TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA".into(),
            parsed: Some(json!({ "type": kind, "info": info })),
        }
    }

    #[test]
    fn test_pumpfun_predicate() {
        assert!(is_pumpfun_migration(&spl("getAccountDataSize", json!({ "mint": "9xQeWvG816bUx9EPjHmaT23yvVM2ZWbrrpZb9PusVFpump" }))));
        assert!(!is_pumpfun_migration(&spl("getAccountDataSize", json!({ "mint": "So11111111111111111111111111111111111111112" }))));
        assert!(!is_pumpfun_migration(&spl("initializeAccount3", json!({ "mint": "abcpump" }))));

        let mut other_program = spl("getAccountDataSize", json!({ "mint": "abcpump" }));
        other_program.program = Some("spl-token-2022".into());
        assert!(!is_pumpfun_migration(&other_program));
    }

    #[test]
    fn test_letsbonk_predicate() {
        let owner = LETSBONK_MIGRATION_OWNER.to_string();
        assert!(is_letsbonk_migration(&spl("initializeAccount3", json!({ "owner": owner, "mint": "BonkMint1111" }))));
        assert!(!is_letsbonk_migration(&spl("initializeAccount3", json!({ "owner": owner, "mint": SOL_MINT.to_string() }))));
        assert!(!is_letsbonk_migration(&spl("initializeAccount3", json!({ "owner": "someone", "mint": "BonkMint1111" }))));
        assert!(!is_letsbonk_migration(&spl("initializeAccount", json!({ "owner": owner, "mint": "BonkMint1111" }))));
    }

    #[test]
    fn test_sources_have_distinct_programs_and_targets() {
        let sources = all();
        assert_eq!(sources.len(), 2);
        assert_ne!(sources[0].program_id, sources[1].program_id);
        assert_ne!(sources[0].notify_target_key, sources[1].notify_target_key);
    }
}
