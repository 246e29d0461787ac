use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use enrichment::ProfileResolver;
use migration_core::telemetry::{ALERTS_SENT, DEDUP_SKIPS, DISPATCH_FAILURES, MIGRATIONS_MATCHED};
use migration_core::SourceConfig;
use solana_sdk::pubkey::Pubkey;
use tracing::{debug, error, info};

use crate::alerts::AlertDispatch;
use crate::classifier::TransactionClassifier;
use crate::dedup::DedupGuard;
use crate::queue::SignatureProcessor;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    NoMatch,
    Duplicate(Pubkey),
    Alerted(Pubkey),
}

/// classify -> dedup -> enrich -> dispatch -> mark, for one source.
pub struct MigrationProcessor {
    source: SourceConfig,
    destination: String,
    classifier: Arc<TransactionClassifier>,
    dedup: Arc<DedupGuard>,
    resolver: Arc<dyn ProfileResolver>,
    dispatcher: Arc<dyn AlertDispatch>,
}

impl MigrationProcessor {
    pub fn new(
        source: SourceConfig,
        destination: String,
        classifier: Arc<TransactionClassifier>,
        dedup: Arc<DedupGuard>,
        resolver: Arc<dyn ProfileResolver>,
        dispatcher: Arc<dyn AlertDispatch>,
    ) -> Self {
        Self { source, destination, classifier, dedup, resolver, dispatcher }
    }

    fn duplicate(&self, mint: Pubkey) -> Outcome {
        DEDUP_SKIPS.inc();
        if let Some(at) = self.dedup.alerted_at(&mint) {
            debug!("[{}] {} already alerted {:?} ago", self.source.launch_pad, mint, at.elapsed());
        }
        Outcome::Duplicate(mint)
    }

    pub async fn handle(&self, signature: &str) -> anyhow::Result<Outcome> {
        let pad = self.source.launch_pad.as_str();

        // 1. Classify
        let Some(mint) = self.classifier.classify(signature, &self.source).await else {
            return Ok(Outcome::NoMatch);
        };
        MIGRATIONS_MATCHED.with_label_values(&[pad]).inc();

        // 2. Dedup
        if !self.dedup.should_process(&mint) {
            return Ok(self.duplicate(mint));
        }

        // 3. Enrich
        let profile = self
            .resolver
            .resolve(&mint, &self.source)
            .await
            .with_context(|| format!("enrichment failed for {}", mint))?;

        // Enrichment can take minutes; another source may have alerted meanwhile
        if !self.dedup.should_process(&mint) {
            return Ok(self.duplicate(mint));
        }

        // 4. Dispatch, then mark
        if let Err(e) = self.dispatcher.dispatch(&self.destination, &profile).await {
            DISPATCH_FAILURES.inc();
            error!("❌ [{}] Dispatch failed for {}: {}", pad, mint, e);
            return Err(anyhow::Error::new(e).context(format!("dispatch failed for {}", mint)));
        }
        self.dedup.mark_processed(mint);
        ALERTS_SENT.with_label_values(&[pad]).inc();
        info!("✅ [{}] Alerted {} ({})", pad, profile.symbol, mint);

        Ok(Outcome::Alerted(mint))
    }
}

#[async_trait]
impl SignatureProcessor for MigrationProcessor {
    async fn process(&self, signature: String) -> anyhow::Result<()> {
        let outcome = self.handle(&signature).await?;
        debug!("[{}] {} -> {:?}", self.source.launch_pad, signature, outcome);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alerts::DispatchError;
    use crate::classifier::tests::{pump_migration_tx, FakeTransactions, PUMP_MINT};
    use crate::launchpads;
    use migration_core::{TokenIdentity, TokenProfile};
    use std::collections::HashMap;
    use std::str::FromStr;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct StubResolver {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl ProfileResolver for StubResolver {
        async fn resolve(&self, mint: &Pubkey, source: &SourceConfig) -> anyhow::Result<TokenProfile> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let identity = TokenIdentity::fallback(mint);
            Ok(TokenProfile {
                title: source.title.clone(),
                launch_pad: source.launch_pad.clone(),
                mint: *mint,
                name: identity.name,
                symbol: identity.symbol,
                image: None,
                description: None,
                market_cap: 0.0,
                market: Default::default(),
                holders: Default::default(),
                age: "N/A".into(),
                pair: None,
                link: String::new(),
                socials: Default::default(),
            })
        }
    }

    #[derive(Default)]
    struct RecordingDispatcher {
        sent: Mutex<Vec<(String, Pubkey)>>,
        fail_next: AtomicBool,
    }

    #[async_trait]
    impl AlertDispatch for RecordingDispatcher {
        async fn dispatch(&self, destination: &str, profile: &TokenProfile) -> Result<(), DispatchError> {
            if self.fail_next.swap(false, Ordering::SeqCst) {
                return Err(DispatchError::Rejected { status: 429, body: "rate limited".into() });
            }
            self.sent.lock().unwrap().push((destination.to_string(), profile.mint));
            Ok(())
        }
    }

    struct Harness {
        processor: MigrationProcessor,
        resolver: Arc<StubResolver>,
        dispatcher: Arc<RecordingDispatcher>,
        dedup: Arc<DedupGuard>,
    }

    fn harness(txs: HashMap<String, migration_core::ParsedTransaction>) -> Harness {
        let resolver = Arc::new(StubResolver { calls: AtomicUsize::new(0) });
        let dispatcher = Arc::new(RecordingDispatcher::default());
        let dedup = Arc::new(DedupGuard::new());
        let classifier = Arc::new(TransactionClassifier::new(Arc::new(FakeTransactions { txs, fail: false })));
        let processor = MigrationProcessor::new(
            launchpads::pumpfun(),
            "channel-1".into(),
            classifier,
            dedup.clone(),
            resolver.clone(),
            dispatcher.clone(),
        );
        Harness { processor, resolver, dispatcher, dedup }
    }

    fn pump_mint() -> Pubkey {
        Pubkey::from_str(PUMP_MINT).unwrap()
    }

    #[tokio::test]
    async fn test_matching_signature_alerts_once() {
        let mut txs = HashMap::new();
        txs.insert("sigA".to_string(), pump_migration_tx("sigA"));
        let h = harness(txs);

        let outcome = h.processor.handle("sigA").await.unwrap();

        assert_eq!(outcome, Outcome::Alerted(pump_mint()));
        assert_eq!(*h.dispatcher.sent.lock().unwrap(), vec![("channel-1".to_string(), pump_mint())]);
        assert!(!h.dedup.should_process(&pump_mint()));
    }

    #[tokio::test]
    async fn test_repeated_signature_is_duplicate() {
        let mut txs = HashMap::new();
        txs.insert("sigA".to_string(), pump_migration_tx("sigA"));
        txs.insert("sigB".to_string(), pump_migration_tx("sigB"));
        let h = harness(txs);

        assert_eq!(h.processor.handle("sigA").await.unwrap(), Outcome::Alerted(pump_mint()));
        assert_eq!(h.processor.handle("sigA").await.unwrap(), Outcome::Duplicate(pump_mint()));
        assert_eq!(h.processor.handle("sigB").await.unwrap(), Outcome::Duplicate(pump_mint()));

        assert_eq!(h.dispatcher.sent.lock().unwrap().len(), 1);
        // duplicates never reach enrichment
        assert_eq!(h.resolver.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_absent_transaction_is_no_match() {
        let h = harness(HashMap::new());
        assert_eq!(h.processor.handle("missing").await.unwrap(), Outcome::NoMatch);
        assert!(h.dispatcher.sent.lock().unwrap().is_empty());
        assert_eq!(h.resolver.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_failed_dispatch_leaves_mint_unmarked() {
        let mut txs = HashMap::new();
        txs.insert("sigA".to_string(), pump_migration_tx("sigA"));
        let h = harness(txs);
        h.dispatcher.fail_next.store(true, Ordering::SeqCst);

        assert!(h.processor.handle("sigA").await.is_err());
        assert!(h.dedup.should_process(&pump_mint()));

        // a later sighting retries and succeeds
        assert_eq!(h.processor.handle("sigA").await.unwrap(), Outcome::Alerted(pump_mint()));
        assert_eq!(h.dispatcher.sent.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_process_propagates_errors_to_queue() {
        let mut txs = HashMap::new();
        txs.insert("sigA".to_string(), pump_migration_tx("sigA"));
        let h = harness(txs);
        h.dispatcher.fail_next.store(true, Ordering::SeqCst);
        assert!(h.processor.process("sigA".to_string()).await.is_err());
        assert!(h.processor.process("unknown".to_string()).await.is_ok());
    }
}
