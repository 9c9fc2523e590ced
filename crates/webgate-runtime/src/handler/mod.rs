//! Handler variants.
//!
//! One single-use handler per request category. Each exposes only the
//! terminal operations legal for its category; the first terminal call
//! resolves the underlying token and every later one is a silent no-op.
//! Handlers are cheap clones, so host code may keep one past the callback
//! and answer after user interaction.

mod auth;
mod grant;
mod keyboard;
mod page;

use tracing::debug;

use webgate_core::Decision;

use crate::token::DecisionToken;

pub use auth::{ClientAuthenticationHandler, HostPort, HttpAuthHandler, SslErrorHandler};
pub use grant::{JsGeolocation, PermissionRequest, ScreenCaptureHandler};
pub(crate) use grant::RetainedGeolocation;
pub use keyboard::{KeyboardEdit, WebKeyboardController};
pub use page::{
    ControllerHandler, DataResubmissionHandler, FileSelectorResult, JsResult,
    WebContextMenuResult,
};

/// Resolve on behalf of the host, swallowing repeat calls.
fn settle<D: Decision>(token: &DecisionToken<D>, outcome: D) -> bool {
    match token.resolve(outcome) {
        Ok(()) => true,
        Err(e) => {
            debug!(
                token_id = %token.id(),
                category = %D::CATEGORY,
                error = %e,
                "Ignoring terminal call on settled handler"
            );
            false
        }
    }
}
