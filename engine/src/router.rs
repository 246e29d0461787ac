use migration_core::{LogEvent, UNKNOWN_PROGRAM};
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::queue::WorkQueue;

/// Fans log events out to the queues of the sources whose program emitted them.
/// Unattributed events go to every queue; classification drops the irrelevant ones.
#[derive(Default)]
pub struct Router {
    routes: Vec<(String, WorkQueue)>,
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_route(&mut self, program_id: String, queue: WorkQueue) {
        self.routes.push((program_id, queue));
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Number of queues the event was handed to.
    pub fn route(&self, event: &LogEvent) -> usize {
        let unattributed = event.program_id == UNKNOWN_PROGRAM;
        let mut delivered = 0;
        for (program_id, queue) in &self.routes {
            if (unattributed || *program_id == event.program_id) && queue.add(event.signature.clone()) {
                debug!("➡️ {} -> {}", event.signature, queue.name());
                delivered += 1;
            }
        }
        delivered
    }

    pub async fn run(self, mut events: mpsc::UnboundedReceiver<LogEvent>) {
        info!("🔀 Router online with {} routes", self.routes.len());
        while let Some(event) = events.recv().await {
            if self.route(&event) == 0 {
                debug!("No queue for program {} (sig {})", event.program_id, event.signature);
            }
        }
        info!("🔀 Event stream closed, router stopping");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::SignatureProcessor;
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    #[derive(Default)]
    struct Collect(Mutex<Vec<String>>);

    #[async_trait]
    impl SignatureProcessor for Collect {
        async fn process(&self, signature: String) -> anyhow::Result<()> {
            self.0.lock().unwrap().push(signature);
            Ok(())
        }
    }

    fn event(program_id: &str, signature: &str) -> LogEvent {
        LogEvent { program_id: program_id.into(), signature: signature.into(), logs: vec![] }
    }

    #[tokio::test]
    async fn test_routes_by_program_and_broadcasts_unknown() {
        let a = Arc::new(Collect::default());
        let b = Arc::new(Collect::default());
        let (qa, ha) = WorkQueue::spawn("a", a.clone(), Duration::ZERO);
        let (qb, hb) = WorkQueue::spawn("b", b.clone(), Duration::ZERO);

        let mut router = Router::new();
        router.add_route("ProgA".into(), qa);
        router.add_route("ProgB".into(), qb);

        assert_eq!(router.route(&event("ProgA", "s1")), 1);
        assert_eq!(router.route(&event("ProgB", "s2")), 1);
        assert_eq!(router.route(&event(UNKNOWN_PROGRAM, "s3")), 2);
        assert_eq!(router.route(&event("Other", "s4")), 0);

        drop(router);
        ha.await.unwrap();
        hb.await.unwrap();
        assert_eq!(*a.0.lock().unwrap(), vec!["s1", "s3"]);
        assert_eq!(*b.0.lock().unwrap(), vec!["s2", "s3"]);
    }

    #[tokio::test]
    async fn test_run_stops_when_stream_closes() {
        let (tx, rx) = mpsc::unbounded_channel();
        let router = Router::new();
        assert!(router.is_empty());
        let handle = tokio::spawn(router.run(rx));
        tx.send(event("ProgA", "s1")).unwrap();
        drop(tx);
        handle.await.unwrap();
    }
}
