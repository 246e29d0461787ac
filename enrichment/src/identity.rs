use std::sync::Arc;

use migration_core::telemetry::PROVIDER_FAILURES;
use migration_core::{Socials, TokenIdentity};
use solana_sdk::pubkey::Pubkey;
use tracing::{debug, warn};

use crate::ports::IdentityProvider;

/// Walks identity providers in priority order; the first usable answer wins.
pub struct IdentityResolver {
    providers: Vec<Arc<dyn IdentityProvider>>,
}

impl IdentityResolver {
    pub fn new(providers: Vec<Arc<dyn IdentityProvider>>) -> Self {
        Self { providers }
    }

    /// Never fails: without a usable answer the mint address stands in for name and symbol.
    /// Socials from providers that answered without a usable name still fill the gaps.
    pub async fn resolve(&self, mint: &Pubkey) -> TokenIdentity {
        let mut leftover = Socials::default();

        for provider in &self.providers {
            match provider.fetch_identity(mint).await {
                Ok(Some(mut identity)) if identity.is_usable(mint) => {
                    debug!("🪪 Identity for {} from {}: {} ({})", mint, provider.name(), identity.name, identity.symbol);
                    identity.socials.fill_missing(&leftover);
                    return identity;
                }
                Ok(Some(partial)) => {
                    leftover.fill_missing(&partial.socials);
                    debug!("{} had no usable name for {}", provider.name(), mint);
                }
                Ok(None) => debug!("{} has no identity for {}", provider.name(), mint),
                Err(e) => {
                    PROVIDER_FAILURES.with_label_values(&[provider.name()]).inc();
                    warn!("⚠️ {} identity lookup failed for {}: {}", provider.name(), mint, e);
                }
            }
        }

        warn!("⚠️ No identity resolved for {}, falling back to the mint address", mint);
        let mut fallback = TokenIdentity::fallback(mint);
        fallback.socials = leftover;
        fallback
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProviderError;
    use crate::ports::ProviderResult;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct Canned {
        name: &'static str,
        answer: fn(&Pubkey) -> ProviderResult<Option<TokenIdentity>>,
        calls: AtomicU32,
    }

    impl Canned {
        fn new(name: &'static str, answer: fn(&Pubkey) -> ProviderResult<Option<TokenIdentity>>) -> Arc<Self> {
            Arc::new(Self { name, answer, calls: AtomicU32::new(0) })
        }
    }

    #[async_trait]
    impl IdentityProvider for Canned {
        fn name(&self) -> &'static str { self.name }
        async fn fetch_identity(&self, mint: &Pubkey) -> ProviderResult<Option<TokenIdentity>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            (self.answer)(mint)
        }
    }

    #[tokio::test]
    async fn test_first_usable_answer_wins_and_later_providers_are_skipped() {
        let broken = Canned::new("broken", |_| Err(ProviderError::Decode("bad json".into())));
        let echo = Canned::new("echo", |mint| Ok(Some(TokenIdentity {
            socials: Socials { telegram: Some("https://t.me/echo".into()), ..Default::default() },
            ..TokenIdentity::fallback(mint)
        })));
        let good = Canned::new("good", |_| Ok(Some(TokenIdentity {
            name: "Moon".into(),
            symbol: "MOON".into(),
            socials: Socials { twitter: Some("https://x.com/moon".into()), ..Default::default() },
            ..Default::default()
        })));
        let never = Canned::new("never", |_| Ok(None));

        let providers: Vec<Arc<dyn IdentityProvider>> = vec![broken, echo, good, never.clone()];
        let resolver = IdentityResolver::new(providers);
        let identity = resolver.resolve(&Pubkey::new_unique()).await;

        assert_eq!(identity.name, "Moon");
        assert_eq!(identity.socials.twitter.as_deref(), Some("https://x.com/moon"));
        assert_eq!(identity.socials.telegram.as_deref(), Some("https://t.me/echo"));
        assert_eq!(never.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_falls_back_to_mint_address() {
        let resolver = IdentityResolver::new(vec![Canned::new("empty", |_| Ok(None))]);
        let mint = Pubkey::new_unique();
        let identity = resolver.resolve(&mint).await;
        assert_eq!(identity.name, mint.to_string());
        assert_eq!(identity.symbol, mint.to_string());
    }
}
