//! Grant handlers: protected resources, screen capture and geolocation.
//!
//! A grant may only cover what the engine offered. Anything outside that set
//! is handled per [`GrantPolicy`]: `Clamp` keeps the offered part, `Reject`
//! denies outright. A grant that ends up empty is a denial.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{info, warn};

use webgate_core::{Decision, GrantPolicy};
use webgate_core::context::{CaptureMode, ScreenCaptureConfig};
use webgate_core::decision::{GeolocationDecision, PermissionDecision, ScreenCaptureDecision};

use super::settle;
use crate::token::{DecisionToken, TokenId};

/// Answers a page's request for protected resources.
#[derive(Debug, Clone)]
pub struct PermissionRequest {
    token: DecisionToken<PermissionDecision>,
    origin: String,
    accessible: Vec<String>,
    policy: GrantPolicy,
}

impl PermissionRequest {
    pub(crate) const fn new(
        token: DecisionToken<PermissionDecision>,
        origin: String,
        accessible: Vec<String>,
        policy: GrantPolicy,
    ) -> Self {
        Self {
            token,
            origin,
            accessible,
            policy,
        }
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }

    /// Resource ids the page asked for.
    pub fn accessible_resources(&self) -> &[String] {
        &self.accessible
    }

    pub fn deny(&self) {
        settle(&self.token, PermissionDecision::Deny);
    }

    /// Grant a subset of [`accessible_resources`](Self::accessible_resources).
    /// Resources not granted stay denied.
    pub fn grant<S: AsRef<str>>(&self, resources: &[S]) {
        settle(&self.token, self.clamp(resources));
    }

    fn clamp<S: AsRef<str>>(&self, resources: &[S]) -> PermissionDecision {
        let mut granted: Vec<String> = Vec::new();
        let mut out_of_range: Vec<&str> = Vec::new();
        for resource in resources.iter().map(AsRef::as_ref) {
            if !self.accessible.iter().any(|r| r == resource) {
                out_of_range.push(resource);
            } else if !granted.iter().any(|r| r == resource) {
                granted.push(resource.to_string());
            }
        }

        if !out_of_range.is_empty() {
            warn!(
                token_id = %self.token.id(),
                origin = %self.origin,
                ?out_of_range,
                policy = %self.policy,
                "Grant includes resources that were not requested"
            );
            if self.policy == GrantPolicy::Reject {
                return PermissionDecision::Deny;
            }
        }

        if granted.is_empty() {
            PermissionDecision::Deny
        } else {
            PermissionDecision::Grant { resources: granted }
        }
    }

    pub fn token_id(&self) -> TokenId {
        self.token.id()
    }

    pub fn is_resolved(&self) -> bool {
        self.token.is_resolved()
    }
}

/// Answers a page's request to capture the screen.
#[derive(Debug, Clone)]
pub struct ScreenCaptureHandler {
    token: DecisionToken<ScreenCaptureDecision>,
    origin: String,
    offered_modes: Vec<CaptureMode>,
}

impl ScreenCaptureHandler {
    pub(crate) const fn new(
        token: DecisionToken<ScreenCaptureDecision>,
        origin: String,
        offered_modes: Vec<CaptureMode>,
    ) -> Self {
        Self {
            token,
            origin,
            offered_modes,
        }
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }

    /// Grant capture with the given configuration. A mode the engine did not
    /// offer has nothing to clamp to, so it denies under either policy.
    pub fn grant(&self, config: ScreenCaptureConfig) {
        let decision = if self.offered_modes.contains(&config.capture_mode) {
            ScreenCaptureDecision::Grant { config }
        } else {
            warn!(
                token_id = %self.token.id(),
                origin = %self.origin,
                mode = ?config.capture_mode,
                "Screen capture granted with a mode that was not offered"
            );
            ScreenCaptureDecision::Deny
        };
        settle(&self.token, decision);
    }

    pub fn deny(&self) {
        settle(&self.token, ScreenCaptureDecision::Deny);
    }

    pub fn token_id(&self) -> TokenId {
        self.token.id()
    }

    pub fn is_resolved(&self) -> bool {
        self.token.is_resolved()
    }
}

/// Geolocation answers the host asked to keep, by origin, for the current
/// navigation.
pub(crate) type RetainedGeolocation = Arc<Mutex<HashMap<String, GeolocationDecision>>>;

/// Answers a page's request for the device location.
#[derive(Debug, Clone)]
pub struct JsGeolocation {
    token: DecisionToken<GeolocationDecision>,
    origin: String,
    retained: RetainedGeolocation,
}

impl JsGeolocation {
    pub(crate) const fn new(
        token: DecisionToken<GeolocationDecision>,
        origin: String,
        retained: RetainedGeolocation,
    ) -> Self {
        Self {
            token,
            origin,
            retained,
        }
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }

    /// Report the user's choice for `origin`. With `retain`, later requests
    /// from the same origin get this answer without a callback until the
    /// page navigates. An answer for any other origin is a denial.
    pub fn invoke(&self, origin: &str, allow: bool, retain: bool) {
        if origin != self.origin {
            warn!(
                token_id = %self.token.id(),
                requested = %self.origin,
                answered = %origin,
                "Geolocation answered for a different origin"
            );
            settle(&self.token, GeolocationDecision::restrictive_default());
            return;
        }
        let decision = GeolocationDecision::from_invoke(allow, retain);
        if settle(&self.token, decision) && retain {
            self.retained.lock().insert(self.origin.clone(), decision);
            info!(origin = %self.origin, allow, "Geolocation answer retained for this navigation");
        }
    }

    pub fn token_id(&self) -> TokenId {
        self.token.id()
    }

    pub fn is_resolved(&self) -> bool {
        self.token.is_resolved()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use webgate_core::context::resource;

    type PendingRequest = (PermissionRequest, crate::token::Resolution<PermissionDecision>);

    fn request(policy: GrantPolicy) -> PendingRequest {
        let (token, resolution) = DecisionToken::create();
        let request = PermissionRequest::new(
            token,
            "https://meet.example".into(),
            vec![
                resource::AUDIO_CAPTURE.to_string(),
                resource::VIDEO_CAPTURE.to_string(),
            ],
            policy,
        );
        (request, resolution)
    }

    #[tokio::test]
    async fn grant_subset_leaves_rest_denied() {
        let (request, resolution) = request(GrantPolicy::Clamp);
        request.grant(&[resource::AUDIO_CAPTURE]);

        let settled = resolution.await;
        assert!(settled.outcome.is_granted(resource::AUDIO_CAPTURE));
        assert!(!settled.outcome.is_granted(resource::VIDEO_CAPTURE));
    }

    #[tokio::test]
    async fn clamp_drops_unoffered_resources() {
        let (request, resolution) = request(GrantPolicy::Clamp);
        request.grant(&[resource::VIDEO_CAPTURE, resource::SENSOR, resource::VIDEO_CAPTURE]);

        let settled = resolution.await;
        assert_eq!(
            settled.outcome,
            PermissionDecision::Grant {
                resources: vec![resource::VIDEO_CAPTURE.to_string()]
            }
        );
    }

    #[tokio::test]
    async fn reject_denies_superset_grant() {
        let (request, resolution) = request(GrantPolicy::Reject);
        request.grant(&[resource::AUDIO_CAPTURE, resource::SENSOR]);

        assert_eq!(resolution.await.outcome, PermissionDecision::Deny);
    }

    #[tokio::test]
    async fn empty_grant_is_a_denial() {
        let (request, resolution) = request(GrantPolicy::Clamp);
        request.grant::<&str>(&[]);

        assert_eq!(resolution.await.outcome, PermissionDecision::Deny);
    }

    #[tokio::test]
    async fn screen_capture_mode_must_be_offered() {
        let (token, resolution) = DecisionToken::create();
        let handler = ScreenCaptureHandler::new(token, "https://cast.example".into(), Vec::new());
        handler.grant(ScreenCaptureConfig::default());

        assert_eq!(resolution.await.outcome, ScreenCaptureDecision::Deny);
    }

    #[tokio::test]
    async fn screen_capture_grant_then_deny_keeps_grant() {
        let (token, resolution) = DecisionToken::create();
        let handler = ScreenCaptureHandler::new(
            token,
            "https://cast.example".into(),
            vec![CaptureMode::HomeScreen],
        );
        handler.grant(ScreenCaptureConfig::default());
        handler.deny();

        assert_eq!(
            resolution.await.outcome,
            ScreenCaptureDecision::Grant {
                config: ScreenCaptureConfig::default()
            }
        );
    }

    #[tokio::test]
    async fn permission_grant_then_deny_keeps_grant() {
        let (request, resolution) = request(GrantPolicy::Clamp);
        request.grant(&[resource::AUDIO_CAPTURE]);
        request.deny();
        request.grant(&[resource::VIDEO_CAPTURE]);

        assert_eq!(
            resolution.await.outcome,
            PermissionDecision::Grant {
                resources: vec![resource::AUDIO_CAPTURE.to_string()]
            }
        );
    }

    fn geolocation(
        retained: &RetainedGeolocation,
    ) -> (JsGeolocation, crate::token::Resolution<GeolocationDecision>) {
        let (token, resolution) = DecisionToken::create();
        let handler = JsGeolocation::new(token, "https://maps.example".into(), retained.clone());
        (handler, resolution)
    }

    #[tokio::test]
    async fn geolocation_retain_is_remembered_for_the_origin() {
        let retained = RetainedGeolocation::default();
        let (handler, resolution) = geolocation(&retained);
        handler.invoke("https://maps.example", true, true);
        handler.invoke("https://maps.example", false, false);

        assert_eq!(
            resolution.await.outcome,
            GeolocationDecision::Allow { retain: true }
        );
        assert_eq!(
            retained.lock().get("https://maps.example"),
            Some(&GeolocationDecision::Allow { retain: true })
        );
    }

    #[tokio::test]
    async fn geolocation_without_retain_is_not_remembered() {
        let retained = RetainedGeolocation::default();
        let (handler, resolution) = geolocation(&retained);
        handler.invoke("https://maps.example", true, false);

        assert!(resolution.await.outcome.is_allowed());
        assert!(retained.lock().is_empty());
    }

    #[tokio::test]
    async fn geolocation_answer_for_other_origin_denies() {
        let retained = RetainedGeolocation::default();
        let (handler, resolution) = geolocation(&retained);
        handler.invoke("https://tracker.example", true, true);

        let settled = resolution.await;
        assert_eq!(settled.outcome, GeolocationDecision::Deny { retain: false });
        assert!(retained.lock().is_empty());
    }
}
