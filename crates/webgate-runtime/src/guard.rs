//! Resolution guard.
//!
//! Tracks every decision a component has issued and drives the restrictive
//! default for the ones the host leaves unanswered: immediately for
//! unregistered or unhandled events, on deadline under the timeout policy,
//! and in bulk on navigation and teardown.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing::{debug, warn};

use webgate_core::config::HandshakeConfig;
use webgate_core::{Category, Decision, GrantPolicy};

use crate::token::{DecisionToken, DefaultReason, PendingDecision, TokenId};

/// Guard configuration.
#[derive(Debug, Clone)]
pub struct GuardConfig {
    /// Deadline for host answers; `None` keeps decisions pending until
    /// navigation or teardown.
    pub pending_timeout: Option<Duration>,
    /// Treatment of grants outside the offered set.
    pub grant_policy: GrantPolicy,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            pending_timeout: None,
            grant_policy: GrantPolicy::Clamp,
        }
    }
}

impl From<&HandshakeConfig> for GuardConfig {
    fn from(config: &HandshakeConfig) -> Self {
        Self {
            pending_timeout: config.pending_timeout(),
            grant_policy: config.grant_policy,
        }
    }
}

struct GuardEntry {
    token: Arc<dyn PendingDecision>,
    expires_at: Option<Instant>,
}

impl GuardEntry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|deadline| now >= deadline)
    }
}

type Entries = Arc<Mutex<HashMap<TokenId, GuardEntry>>>;

/// Enforces single resolution and supplies defaults for unanswered decisions.
///
/// An entry lives only while its decision is pending: settling a token, by
/// the host or by a default, removes it.
pub struct ResolutionGuard {
    entries: Entries,
    config: GuardConfig,
}

impl ResolutionGuard {
    pub fn new(config: GuardConfig) -> Self {
        Self {
            entries: Entries::default(),
            config,
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(GuardConfig::default())
    }

    pub const fn config(&self) -> &GuardConfig {
        &self.config
    }

    /// Start tracking a freshly issued token.
    pub(crate) fn track<D: Decision>(&self, token: &DecisionToken<D>) {
        let entry = GuardEntry {
            token: token.erased(),
            expires_at: self
                .config
                .pending_timeout
                .map(|timeout| token.created_at() + timeout),
        };
        self.entries.lock().insert(token.id(), entry);
        let entries = Arc::downgrade(&self.entries);
        token.on_settled(move |id| {
            if let Some(entries) = entries.upgrade() {
                entries.lock().remove(&id);
            }
        });
        debug!(token_id = %token.id(), category = %D::CATEGORY, "Tracking pending decision");
    }

    /// Settle one token with its default right away.
    pub(crate) fn apply_default<D: Decision>(
        &self,
        token: &DecisionToken<D>,
        reason: DefaultReason,
    ) -> bool {
        self.entries.lock().remove(&token.id());
        let settled = token.settle_default(reason);
        if settled {
            debug!(
                token_id = %token.id(),
                category = %D::CATEGORY,
                ?reason,
                "Applied default outcome"
            );
        }
        settled
    }

    /// Settle every token whose deadline has passed. Returns the ids this
    /// call settled.
    pub fn expire_overdue(&self) -> Vec<TokenId> {
        let now = Instant::now();
        let overdue: Vec<GuardEntry> = {
            let mut entries = self.entries.lock();
            let ids: Vec<TokenId> = entries
                .iter()
                .filter(|(_, e)| e.is_expired(now))
                .map(|(id, _)| *id)
                .collect();
            ids.iter().filter_map(|id| entries.remove(id)).collect()
        };

        let mut expired = Vec::new();
        for entry in overdue {
            if entry.token.settle_default(DefaultReason::Timeout) {
                warn!(
                    token_id = %entry.token.id(),
                    category = %entry.token.category(),
                    waited_ms = u64::try_from(entry.token.created_at().elapsed().as_millis())
                        .unwrap_or(u64::MAX),
                    "Decision expired without a host answer"
                );
                expired.push(entry.token.id());
            }
        }
        expired
    }

    /// Settle every tracked token with the given reason and stop tracking
    /// them. Returns the ids this call settled.
    pub(crate) fn settle_all(&self, reason: DefaultReason) -> Vec<TokenId> {
        let drained: Vec<GuardEntry> = self.entries.lock().drain().map(|(_, e)| e).collect();
        drained
            .into_iter()
            .filter(|entry| entry.token.settle_default(reason))
            .map(|entry| entry.token.id())
            .collect()
    }

    /// Number of entries the guard holds.
    pub fn tracked_count(&self) -> usize {
        self.entries.lock().len()
    }

    /// Number of tracked decisions still waiting for an answer.
    pub fn pending_count(&self) -> usize {
        self.entries
            .lock()
            .values()
            .filter(|e| !e.token.is_resolved())
            .count()
    }

    /// Ids of unanswered decisions in one category.
    pub fn pending_in(&self, category: Category) -> Vec<TokenId> {
        self.entries
            .lock()
            .values()
            .filter(|e| e.token.category() == category && !e.token.is_resolved())
            .map(|e| e.token.id())
            .collect()
    }
}

impl Default for ResolutionGuard {
    fn default() -> Self {
        Self::with_defaults()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::token::SettleSource;
    use webgate_core::decision::{PermissionDecision, SslErrorDecision};

    #[tokio::test]
    async fn expired_decisions_get_timeout_default() {
        let guard = ResolutionGuard::new(GuardConfig {
            pending_timeout: Some(Duration::from_millis(1)),
            ..Default::default()
        });
        let (token, resolution) = DecisionToken::<PermissionDecision>::create();
        guard.track(&token);

        tokio::time::sleep(Duration::from_millis(10)).await;

        let expired = guard.expire_overdue();
        assert_eq!(expired, vec![token.id()]);
        assert_eq!(guard.pending_count(), 0);

        let settled = resolution.await;
        assert_eq!(settled.outcome, PermissionDecision::Deny);
        assert_eq!(
            settled.source,
            SettleSource::Default(DefaultReason::Timeout)
        );
    }

    #[test]
    fn no_deadline_means_nothing_expires() {
        let guard = ResolutionGuard::with_defaults();
        let (token, _resolution) = DecisionToken::<SslErrorDecision>::create();
        guard.track(&token);

        assert!(guard.expire_overdue().is_empty());
        assert_eq!(guard.pending_count(), 1);
        assert_eq!(guard.pending_in(Category::SslError), vec![token.id()]);
        assert!(guard.pending_in(Category::HttpAuth).is_empty());
    }

    #[test]
    fn answered_decisions_leave_the_guard() {
        let guard = ResolutionGuard::new(GuardConfig {
            pending_timeout: Some(Duration::ZERO),
            ..Default::default()
        });
        let (token, _resolution) = DecisionToken::<SslErrorDecision>::create();
        guard.track(&token);
        assert_eq!(guard.tracked_count(), 1);
        token.resolve(SslErrorDecision::Confirm).unwrap();

        assert_eq!(guard.tracked_count(), 0);
        assert!(guard.expire_overdue().is_empty());
        assert_eq!(
            token.settled().map(|s| s.outcome),
            Some(SslErrorDecision::Confirm)
        );
    }

    #[test]
    fn settle_all_reports_only_unanswered() {
        let guard = ResolutionGuard::with_defaults();
        let (answered, _r1) = DecisionToken::<SslErrorDecision>::create();
        let (open, _r2) = DecisionToken::<SslErrorDecision>::create();
        guard.track(&answered);
        guard.track(&open);
        answered.resolve(SslErrorDecision::Confirm).unwrap();

        let settled = guard.settle_all(DefaultReason::Teardown);
        assert_eq!(settled, vec![open.id()]);
        assert_eq!(guard.pending_count(), 0);
        assert_eq!(guard.tracked_count(), 0);
    }

    #[test]
    fn apply_default_settles_and_forgets() {
        let guard = ResolutionGuard::with_defaults();
        let (token, _resolution) = DecisionToken::<SslErrorDecision>::create();
        guard.track(&token);

        assert!(guard.apply_default(&token, DefaultReason::Unregistered));
        assert!(!guard.apply_default(&token, DefaultReason::Unregistered));
        assert_eq!(guard.pending_count(), 0);
    }
}
