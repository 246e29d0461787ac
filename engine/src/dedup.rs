use std::time::Instant;

use dashmap::DashMap;
use solana_sdk::pubkey::Pubkey;

/// Mints already alerted in this process, with the instant of the alert.
/// Shared by every queue; grows for the lifetime of the process.
#[derive(Debug, Default)]
pub struct DedupGuard {
    alerted: DashMap<Pubkey, Instant>,
}

impl DedupGuard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn should_process(&self, mint: &Pubkey) -> bool {
        !self.alerted.contains_key(mint)
    }

    /// Only call after a successful dispatch.
    pub fn mark_processed(&self, mint: Pubkey) {
        self.alerted.entry(mint).or_insert_with(Instant::now);
    }

    pub fn alerted_at(&self, mint: &Pubkey) -> Option<Instant> {
        self.alerted.get(mint).map(|entry| *entry.value())
    }

    pub fn len(&self) -> usize {
        self.alerted.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_mark_then_skip() {
        let guard = DedupGuard::new();
        let mint = Pubkey::new_unique();
        assert!(guard.should_process(&mint));
        assert!(guard.alerted_at(&mint).is_none());

        guard.mark_processed(mint);
        assert!(!guard.should_process(&mint));
        assert!(guard.should_process(&Pubkey::new_unique()));
    }

    #[test]
    fn test_remark_keeps_first_instant() {
        let guard = DedupGuard::new();
        let mint = Pubkey::new_unique();
        guard.mark_processed(mint);
        let first = guard.alerted_at(&mint).unwrap();
        guard.mark_processed(mint);
        assert_eq!(guard.alerted_at(&mint), Some(first));
        assert_eq!(guard.len(), 1);
    }

    #[tokio::test]
    async fn test_shared_across_tasks() {
        let guard = Arc::new(DedupGuard::new());
        let mint = Pubkey::new_unique();
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let guard = guard.clone();
                tokio::spawn(async move { guard.mark_processed(mint) })
            })
            .collect();
        for h in handles {
            h.await.unwrap();
        }
        assert_eq!(guard.len(), 1);
        assert!(!guard.should_process(&mint));
    }
}
