use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use migration_core::telemetry::{PROCESSOR_ERRORS, SIGNATURES_PROCESSED};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

/// Work run for every queued signature.
#[async_trait]
pub trait SignatureProcessor: Send + Sync + 'static {
    async fn process(&self, signature: String) -> anyhow::Result<()>;
}

/// Handle to a serialized FIFO of signatures. Cloning shares the same queue.
/// The loop stops once every handle is dropped and the backlog is drained.
#[derive(Clone)]
pub struct WorkQueue {
    name: Arc<str>,
    tx: mpsc::UnboundedSender<String>,
}

impl WorkQueue {
    pub fn spawn(name: &str, processor: Arc<dyn SignatureProcessor>, delay: Duration) -> (Self, JoinHandle<()>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let name: Arc<str> = Arc::from(name);
        let handle = tokio::spawn(run_loop(name.clone(), rx, processor, delay));
        (Self { name, tx }, handle)
    }

    /// Non-blocking append. Returns false if the loop is gone.
    pub fn add(&self, signature: String) -> bool {
        match self.tx.send(signature) {
            Ok(()) => true,
            Err(mpsc::error::SendError(sig)) => {
                error!("❌ [{}] Queue loop stopped, dropping {}", self.name, sig);
                false
            }
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

async fn run_loop(
    name: Arc<str>,
    mut rx: mpsc::UnboundedReceiver<String>,
    processor: Arc<dyn SignatureProcessor>,
    delay: Duration,
) {
    info!("📥 [{}] Work queue started (delay {:?})", name, delay);

    while let Some(signature) = rx.recv().await {
        debug!("[{}] Processing {}", name, signature);

        // 1. Run in its own task so a panic is contained to this item
        let worker = processor.clone();
        let sig = signature.clone();
        let result = tokio::spawn(async move { worker.process(sig).await }).await;

        // 2. Log failures, never stop the loop
        match result {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                PROCESSOR_ERRORS.inc();
                error!("❌ [{}] Processing {} failed: {:#}", name, signature, e);
            }
            Err(join_err) => {
                PROCESSOR_ERRORS.inc();
                error!("💥 [{}] Processor panicked on {}: {}", name, signature, join_err);
            }
        }
        SIGNATURES_PROCESSED.with_label_values(&[&*name]).inc();

        // 3. Pace RPC usage even when more items are waiting
        tokio::time::sleep(delay).await;
    }

    info!("📭 [{}] Work queue closed", name);
}
