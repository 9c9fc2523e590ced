//! Decision tokens.
//!
//! A token is the single-use resolution state behind one handler. The engine
//! keeps the matching [`Resolution`] and awaits it; the token delivers at most
//! one [`Settled`] value, produced by the first successful settle call.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Instant;

use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::oneshot;
use tracing::{debug, info};
use uuid::Uuid;

use webgate_core::{Category, Decision};

/// Opaque identity of one pending request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct TokenId(Uuid);

impl TokenId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for TokenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Why the guard, not the host, settled a decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DefaultReason {
    /// No callback was registered for the event.
    Unregistered,
    /// The callback reported the event as not handled.
    NotHandled,
    /// The pending deadline elapsed.
    Timeout,
    /// The page navigated away.
    Navigation,
    /// The component was torn down.
    Teardown,
    /// An earlier host answer already covers this request.
    Suppressed,
    /// Every handle to the token was dropped unresolved.
    Abandoned,
}

/// Who produced a settled outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "by", content = "reason", rename_all = "snake_case")]
pub enum SettleSource {
    Host,
    /// A host answer remembered for an earlier request of the same origin.
    Retained,
    Default(DefaultReason),
}

/// Outcome delivered to the engine.
#[derive(Debug, Clone, PartialEq)]
pub struct Settled<D> {
    pub outcome: D,
    pub source: SettleSource,
}

impl<D> Settled<D> {
    pub const fn by_host(&self) -> bool {
        matches!(self.source, SettleSource::Host)
    }
}

/// Token errors.
#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("Decision already resolved: {token_id}")]
    AlreadyResolved { token_id: TokenId },
}

enum TokenState<D> {
    Pending(oneshot::Sender<Settled<D>>),
    Resolved(Settled<D>),
}

type ReleaseHook = Box<dyn FnOnce(TokenId) + Send>;

pub(crate) struct TokenCell<D> {
    id: TokenId,
    created_at: Instant,
    state: Mutex<Option<TokenState<D>>>,
    /// Runs once, after the first settle.
    release: Mutex<Option<ReleaseHook>>,
}

impl<D: Decision> TokenCell<D> {
    fn settle(&self, outcome: D, source: SettleSource) -> Result<(), TokenError> {
        let mut state = self.state.lock();
        let tx = match state.take() {
            Some(TokenState::Pending(tx)) => tx,
            resolved => {
                *state = resolved;
                return Err(TokenError::AlreadyResolved { token_id: self.id });
            }
        };
        let settled = Settled { outcome, source };
        *state = Some(TokenState::Resolved(settled.clone()));
        let release = self.release.lock().take();
        drop(state);

        info!(
            token_id = %self.id,
            category = %D::CATEGORY,
            outcome = ?settled.outcome,
            source = ?settled.source,
            "Decision settled"
        );
        if tx.send(settled).is_err() {
            debug!(token_id = %self.id, "Engine stopped waiting for decision");
        }
        if let Some(release) = release {
            release(self.id);
        }
        Ok(())
    }
}

/// Type-erased view of a token used by the guard.
pub(crate) trait PendingDecision: Send + Sync {
    fn id(&self) -> TokenId;
    fn category(&self) -> Category;
    fn created_at(&self) -> Instant;
    fn is_resolved(&self) -> bool;
    /// Settle with the category's restrictive default. Returns whether this
    /// call was the one that resolved the token.
    fn settle_default(&self, reason: DefaultReason) -> bool;
}

impl<D: Decision> PendingDecision for TokenCell<D> {
    fn id(&self) -> TokenId {
        self.id
    }

    fn category(&self) -> Category {
        D::CATEGORY
    }

    fn created_at(&self) -> Instant {
        self.created_at
    }

    fn is_resolved(&self) -> bool {
        matches!(*self.state.lock(), Some(TokenState::Resolved(_)))
    }

    fn settle_default(&self, reason: DefaultReason) -> bool {
        self.settle(D::restrictive_default(), SettleSource::Default(reason))
            .is_ok()
    }
}

/// Resolution state shared by a handler and the guard.
pub struct DecisionToken<D> {
    cell: Arc<TokenCell<D>>,
}

impl<D> Clone for DecisionToken<D> {
    fn clone(&self) -> Self {
        Self {
            cell: Arc::clone(&self.cell),
        }
    }
}

impl<D: Decision> fmt::Debug for DecisionToken<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DecisionToken")
            .field("id", &self.cell.id)
            .field("category", &D::CATEGORY)
            .field("resolved", &self.is_resolved())
            .finish()
    }
}

impl<D: Decision> DecisionToken<D> {
    /// Create a pending token and the engine-side continuation awaiting it.
    pub(crate) fn create() -> (Self, Resolution<D>) {
        let (tx, rx) = oneshot::channel();
        let id = TokenId::new();
        let cell = Arc::new(TokenCell {
            id,
            created_at: Instant::now(),
            state: Mutex::new(Some(TokenState::Pending(tx))),
            release: Mutex::new(None),
        });
        debug!(token_id = %id, category = %D::CATEGORY, "Decision token created");
        (Self { cell }, Resolution { id, rx })
    }

    pub fn id(&self) -> TokenId {
        self.cell.id
    }

    pub const fn category(&self) -> Category {
        D::CATEGORY
    }

    pub fn created_at(&self) -> Instant {
        self.cell.created_at
    }

    pub fn is_resolved(&self) -> bool {
        PendingDecision::is_resolved(&*self.cell)
    }

    /// The settled outcome, once there is one.
    pub fn settled(&self) -> Option<Settled<D>> {
        match &*self.cell.state.lock() {
            Some(TokenState::Resolved(settled)) => Some(settled.clone()),
            _ => None,
        }
    }

    /// Resolve on behalf of the host. Only the first call succeeds.
    pub(crate) fn resolve(&self, outcome: D) -> Result<(), TokenError> {
        self.cell.settle(outcome, SettleSource::Host)
    }

    pub(crate) fn settle_default(&self, reason: DefaultReason) -> bool {
        self.cell.settle_default(reason)
    }

    /// Settle with an answer the host asked to keep from an earlier request.
    pub(crate) fn settle_retained(&self, outcome: D) -> bool {
        self.cell.settle(outcome, SettleSource::Retained).is_ok()
    }

    /// Run `hook` once the token is settled, or right away if it already is.
    pub(crate) fn on_settled(&self, hook: impl FnOnce(TokenId) + Send + 'static) {
        let state = self.cell.state.lock();
        if matches!(*state, Some(TokenState::Resolved(_))) {
            drop(state);
            hook(self.cell.id);
            return;
        }
        *self.cell.release.lock() = Some(Box::new(hook));
    }

    pub(crate) fn erased(&self) -> Arc<dyn PendingDecision> {
        self.cell.clone()
    }
}

/// Engine-side continuation for one decision.
///
/// Completes no earlier than the first successful settle. If every handle to
/// the token is dropped unresolved it completes with the restrictive default.
#[derive(Debug)]
#[must_use = "the engine operation stays suspended until the resolution is awaited"]
pub struct Resolution<D> {
    id: TokenId,
    rx: oneshot::Receiver<Settled<D>>,
}

impl<D: Decision> Resolution<D> {
    pub const fn token_id(&self) -> TokenId {
        self.id
    }

    /// Non-blocking check, `None` while the decision is still pending.
    pub fn try_settled(&mut self) -> Option<Settled<D>> {
        match self.rx.try_recv() {
            Ok(settled) => Some(settled),
            Err(oneshot::error::TryRecvError::Empty) => None,
            Err(oneshot::error::TryRecvError::Closed) => Some(abandoned()),
        }
    }
}

fn abandoned<D: Decision>() -> Settled<D> {
    Settled {
        outcome: D::restrictive_default(),
        source: SettleSource::Default(DefaultReason::Abandoned),
    }
}

impl<D: Decision> Future for Resolution<D> {
    type Output = Settled<D>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match Pin::new(&mut self.rx).poll(cx) {
            Poll::Ready(Ok(settled)) => Poll::Ready(settled),
            Poll::Ready(Err(_)) => Poll::Ready(abandoned()),
            Poll::Pending => Poll::Pending,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use webgate_core::decision::{HttpAuthDecision, SslErrorDecision};

    #[tokio::test]
    async fn first_resolve_wins() {
        let (token, resolution) = DecisionToken::<SslErrorDecision>::create();

        assert!(token.resolve(SslErrorDecision::Confirm).is_ok());
        let err = token.resolve(SslErrorDecision::Cancel).unwrap_err();
        assert!(matches!(err, TokenError::AlreadyResolved { token_id } if token_id == token.id()));

        let settled = resolution.await;
        assert_eq!(settled.outcome, SslErrorDecision::Confirm);
        assert!(settled.by_host());
    }

    #[tokio::test]
    async fn default_does_not_override_host_answer() {
        let (token, resolution) = DecisionToken::<HttpAuthDecision>::create();

        token.resolve(HttpAuthDecision::Cancel).unwrap();
        assert!(!token.settle_default(DefaultReason::Teardown));

        let settled = resolution.await;
        assert_eq!(settled.source, SettleSource::Host);
    }

    #[test]
    fn try_settled_is_empty_while_pending() {
        let (token, mut resolution) = DecisionToken::<SslErrorDecision>::create();
        assert!(resolution.try_settled().is_none());
        assert!(!token.is_resolved());
        assert!(token.settled().is_none());

        assert!(token.settle_default(DefaultReason::Timeout));
        let settled = resolution.try_settled().unwrap();
        assert_eq!(settled.outcome, SslErrorDecision::Cancel);
        assert_eq!(settled.source, SettleSource::Default(DefaultReason::Timeout));
        assert_eq!(token.settled(), Some(settled));
    }

    #[tokio::test]
    async fn dropped_token_yields_abandoned_default() {
        let (token, resolution) = DecisionToken::<SslErrorDecision>::create();
        drop(token);

        let settled = resolution.await;
        assert_eq!(settled.outcome, SslErrorDecision::Cancel);
        assert_eq!(
            settled.source,
            SettleSource::Default(DefaultReason::Abandoned)
        );
    }

    #[test]
    fn settle_hook_runs_once() {
        let (token, _resolution) = DecisionToken::<SslErrorDecision>::create();
        let released = Arc::new(Mutex::new(Vec::new()));
        let seen = Arc::clone(&released);
        token.on_settled(move |id| seen.lock().push(id));

        token.resolve(SslErrorDecision::Confirm).unwrap();
        assert!(!token.settle_default(DefaultReason::Teardown));
        assert_eq!(*released.lock(), vec![token.id()]);

        // Installed after settling: runs immediately.
        let late = Arc::new(Mutex::new(None));
        let seen = Arc::clone(&late);
        token.on_settled(move |id| *seen.lock() = Some(id));
        assert_eq!(*late.lock(), Some(token.id()));
    }

    #[tokio::test]
    async fn engine_dropping_resolution_does_not_fail_resolve() {
        let (token, resolution) = DecisionToken::<SslErrorDecision>::create();
        drop(resolution);
        assert!(token.resolve(SslErrorDecision::Confirm).is_ok());
        assert!(token.is_resolved());
    }

    #[test]
    fn retained_answer_is_not_a_host_answer() {
        let (token, mut resolution) = DecisionToken::<SslErrorDecision>::create();
        assert!(token.settle_retained(SslErrorDecision::Confirm));
        assert!(!token.settle_retained(SslErrorDecision::Cancel));

        let settled = resolution.try_settled().unwrap();
        assert_eq!(settled.outcome, SslErrorDecision::Confirm);
        assert_eq!(settled.source, SettleSource::Retained);
        assert!(!settled.by_host());
    }

    #[test]
    fn racing_terminal_calls_settle_exactly_once() {
        for _ in 0..64 {
            let (token, mut resolution) = DecisionToken::<SslErrorDecision>::create();
            let barrier = Arc::new(std::sync::Barrier::new(2));
            let racers: Vec<_> = [SslErrorDecision::Confirm, SslErrorDecision::Cancel]
                .into_iter()
                .map(|decision| {
                    let token = token.clone();
                    let barrier = Arc::clone(&barrier);
                    std::thread::spawn(move || {
                        barrier.wait();
                        token.resolve(decision.clone()).is_ok().then_some(decision)
                    })
                })
                .collect();
            let winners: Vec<_> = racers
                .into_iter()
                .filter_map(|racer| racer.join().unwrap())
                .collect();

            assert_eq!(winners.len(), 1);
            assert_eq!(resolution.try_settled().unwrap().outcome, winners[0]);
        }
    }
}
