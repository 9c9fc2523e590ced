//! Authentication handlers: HTTP auth, SSL errors and client certificates.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, info};

use webgate_core::decision::{ClientAuthDecision, HttpAuthDecision, SslErrorDecision};

use super::settle;
use crate::token::{DecisionToken, TokenId};

/// Answers an HTTP authentication challenge.
#[derive(Debug, Clone)]
pub struct HttpAuthHandler {
    token: DecisionToken<HttpAuthDecision>,
    credentials_saved: bool,
}

impl HttpAuthHandler {
    pub(crate) const fn new(
        token: DecisionToken<HttpAuthDecision>,
        credentials_saved: bool,
    ) -> Self {
        Self {
            token,
            credentials_saved,
        }
    }

    /// Authenticate with the given credentials. Returns `true` when this call
    /// answered the challenge, `false` when it had already been answered.
    pub fn confirm(&self, user_name: impl Into<String>, password: impl Into<String>) -> bool {
        settle(
            &self.token,
            HttpAuthDecision::Confirm {
                user_name: user_name.into(),
                password: password.into(),
            },
        )
    }

    pub fn cancel(&self) {
        settle(&self.token, HttpAuthDecision::Cancel);
    }

    /// Whether the engine holds saved credentials for this challenge.
    ///
    /// Query only; the challenge stays pending.
    pub fn is_http_auth_info_saved(&self) -> bool {
        debug!(
            token_id = %self.token.id(),
            saved = self.credentials_saved,
            "Saved HTTP auth info queried"
        );
        self.credentials_saved
    }

    pub fn token_id(&self) -> TokenId {
        self.token.id()
    }

    pub fn is_resolved(&self) -> bool {
        self.token.is_resolved()
    }
}

/// Answers a certificate error raised during a load.
#[derive(Debug, Clone)]
pub struct SslErrorHandler {
    token: DecisionToken<SslErrorDecision>,
}

impl SslErrorHandler {
    pub(crate) const fn new(token: DecisionToken<SslErrorDecision>) -> Self {
        Self { token }
    }

    /// Proceed despite the error.
    pub fn handle_confirm(&self) {
        settle(&self.token, SslErrorDecision::Confirm);
    }

    pub fn handle_cancel(&self) {
        settle(&self.token, SslErrorDecision::Cancel);
    }

    pub fn token_id(&self) -> TokenId {
        self.token.id()
    }

    pub fn is_resolved(&self) -> bool {
        self.token.is_resolved()
    }
}

/// Server endpoint a client certificate was requested for.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HostPort {
    pub host: String,
    pub port: u16,
}

impl fmt::Display for HostPort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Endpoints whose client certificate request the host cancelled during the
/// current navigation.
pub(crate) type DeclinedEndpoints = Arc<Mutex<HashSet<HostPort>>>;

/// Answers a client certificate request.
#[derive(Clone)]
pub struct ClientAuthenticationHandler {
    token: DecisionToken<ClientAuthDecision>,
    endpoint: HostPort,
    declined: DeclinedEndpoints,
}

impl fmt::Debug for ClientAuthenticationHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientAuthenticationHandler")
            .field("token", &self.token)
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}

impl ClientAuthenticationHandler {
    pub(crate) const fn new(
        token: DecisionToken<ClientAuthDecision>,
        endpoint: HostPort,
        declined: DeclinedEndpoints,
    ) -> Self {
        Self {
            token,
            endpoint,
            declined,
        }
    }

    /// Answer with a private key file and certificate chain file.
    pub fn confirm_key_file(
        &self,
        private_key_file: impl Into<String>,
        cert_chain_file: impl Into<String>,
    ) {
        settle(
            &self.token,
            ClientAuthDecision::ConfirmKeyFile {
                private_key_file: private_key_file.into(),
                cert_chain_file: cert_chain_file.into(),
            },
        );
    }

    /// Answer with a credential URI from the platform certificate store.
    pub fn confirm_auth_uri(&self, uri: impl Into<String>) {
        settle(&self.token, ClientAuthDecision::ConfirmAuthUri { uri: uri.into() });
    }

    /// Refuse; the endpoint is not asked again until the next navigation.
    pub fn cancel(&self) {
        if settle(&self.token, ClientAuthDecision::Cancel) {
            self.declined.lock().insert(self.endpoint.clone());
            info!(endpoint = %self.endpoint, "Client certificate declined for this navigation");
        }
    }

    /// Defer without a permanent answer; a later request may prompt again.
    pub fn ignore(&self) {
        settle(&self.token, ClientAuthDecision::Ignore);
    }

    pub const fn endpoint(&self) -> &HostPort {
        &self.endpoint
    }

    pub fn token_id(&self) -> TokenId {
        self.token.id()
    }

    pub fn is_resolved(&self) -> bool {
        self.token.is_resolved()
    }
}
