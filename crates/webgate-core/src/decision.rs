//! Terminal decisions per category.
//!
//! Each category has its own closed set of outcomes. Within a category the
//! outcomes are mutually exclusive and exhaustive; [`Outcome`] tags any of
//! them with its category for logging and reports.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::category::Category;
use crate::context::ScreenCaptureConfig;

/// A category's set of terminal outcomes.
pub trait Decision: Clone + fmt::Debug + PartialEq + Send + Sync + 'static {
    /// Category this decision answers.
    const CATEGORY: Category;

    /// The most restrictive legal outcome (deny over grant, cancel over
    /// confirm). Applied whenever the host does not answer.
    fn restrictive_default() -> Self;

    /// Tag the decision with its category.
    fn into_outcome(self) -> Outcome;

    fn is_restrictive_default(&self) -> bool {
        *self == Self::restrictive_default()
    }
}

/// Answer to an HTTP authentication challenge.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum HttpAuthDecision {
    Confirm {
        user_name: String,
        #[serde(skip_serializing, default)]
        password: String,
    },
    Cancel,
}

// Credentials never reach log output.
impl fmt::Debug for HttpAuthDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Confirm { user_name, .. } => f
                .debug_struct("Confirm")
                .field("user_name", user_name)
                .field("password", &"<redacted>")
                .finish(),
            Self::Cancel => f.write_str("Cancel"),
        }
    }
}

/// Answer to a certificate error on a page load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum SslErrorDecision {
    Confirm,
    Cancel,
}

/// Answer to a client certificate request.
///
/// `Cancel` is a permanent negative for the current navigation, `Ignore`
/// only defers so the request can be raised again.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ClientAuthDecision {
    ConfirmKeyFile {
        private_key_file: String,
        cert_chain_file: String,
    },
    ConfirmAuthUri {
        uri: String,
    },
    Cancel,
    Ignore,
}

/// Answer to a protected resource request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum PermissionDecision {
    /// Granted resources; never empty, always a subset of what was offered.
    Grant { resources: Vec<String> },
    Deny,
}

impl PermissionDecision {
    pub fn is_granted(&self, resource: &str) -> bool {
        match self {
            Self::Grant { resources } => resources.iter().any(|r| r == resource),
            Self::Deny => false,
        }
    }
}

/// Answer to a screen capture request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ScreenCaptureDecision {
    Grant { config: ScreenCaptureConfig },
    Deny,
}

/// Answer to a form resubmission prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum DataResubmissionDecision {
    Resend,
    Cancel,
}

/// Answer to a request for a new window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum WindowNewDecision {
    /// Host attached the controller of the web component that hosts the window.
    Attach { controller: String },
    Decline,
}

/// Answer to a file picker request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum FileSelectorDecision {
    Select { files: Vec<String> },
    Dismiss,
}

/// Action taken from a custom context menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ContextMenuDecision {
    Copy,
    Cut,
    Paste,
    SelectAll,
    CopyImage,
    Close,
}

/// End of a custom keyboard session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum KeyboardDecision {
    Close,
}

/// Answer to a page dialog (`alert`, `confirm`, `prompt`, `beforeunload`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum JsDialogDecision {
    Confirm,
    PromptConfirm { text: String },
    Cancel,
}

/// Answer to a page's request for the device location.
///
/// `retain` asks the component to remember the answer for the origin until
/// the next navigation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum GeolocationDecision {
    Allow {
        #[serde(default)]
        retain: bool,
    },
    Deny {
        #[serde(default)]
        retain: bool,
    },
}

impl GeolocationDecision {
    pub const fn from_invoke(allow: bool, retain: bool) -> Self {
        if allow {
            Self::Allow { retain }
        } else {
            Self::Deny { retain }
        }
    }

    pub const fn is_allowed(self) -> bool {
        matches!(self, Self::Allow { .. })
    }

    pub const fn retain(self) -> bool {
        match self {
            Self::Allow { retain } | Self::Deny { retain } => retain,
        }
    }
}

/// A terminal outcome tagged with its category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "category", content = "decision", rename_all = "snake_case")]
pub enum Outcome {
    HttpAuth(HttpAuthDecision),
    SslError(SslErrorDecision),
    ClientAuthentication(ClientAuthDecision),
    Permission(PermissionDecision),
    ScreenCapture(ScreenCaptureDecision),
    DataResubmission(DataResubmissionDecision),
    WindowNew(WindowNewDecision),
    FileSelector(FileSelectorDecision),
    ContextMenu(ContextMenuDecision),
    KeyboardAttach(KeyboardDecision),
    JsDialog(JsDialogDecision),
    Geolocation(GeolocationDecision),
}

impl Outcome {
    pub const fn category(&self) -> Category {
        match self {
            Self::HttpAuth(_) => Category::HttpAuth,
            Self::SslError(_) => Category::SslError,
            Self::ClientAuthentication(_) => Category::ClientAuthentication,
            Self::Permission(_) => Category::Permission,
            Self::ScreenCapture(_) => Category::ScreenCapture,
            Self::DataResubmission(_) => Category::DataResubmission,
            Self::WindowNew(_) => Category::WindowNew,
            Self::FileSelector(_) => Category::FileSelector,
            Self::ContextMenu(_) => Category::ContextMenu,
            Self::KeyboardAttach(_) => Category::KeyboardAttach,
            Self::JsDialog(_) => Category::JsDialog,
            Self::Geolocation(_) => Category::Geolocation,
        }
    }

    /// Restrictive default for any category.
    pub fn restrictive_default(category: Category) -> Self {
        match category {
            Category::HttpAuth => HttpAuthDecision::restrictive_default().into_outcome(),
            Category::SslError => SslErrorDecision::restrictive_default().into_outcome(),
            Category::ClientAuthentication => {
                ClientAuthDecision::restrictive_default().into_outcome()
            }
            Category::Permission => PermissionDecision::restrictive_default().into_outcome(),
            Category::ScreenCapture => ScreenCaptureDecision::restrictive_default().into_outcome(),
            Category::DataResubmission => {
                DataResubmissionDecision::restrictive_default().into_outcome()
            }
            Category::WindowNew => WindowNewDecision::restrictive_default().into_outcome(),
            Category::FileSelector => FileSelectorDecision::restrictive_default().into_outcome(),
            Category::ContextMenu => ContextMenuDecision::restrictive_default().into_outcome(),
            Category::KeyboardAttach => KeyboardDecision::restrictive_default().into_outcome(),
            Category::JsDialog => JsDialogDecision::restrictive_default().into_outcome(),
            Category::Geolocation => GeolocationDecision::restrictive_default().into_outcome(),
        }
    }
}

macro_rules! impl_decision {
    ($ty:ty, $category:ident, $default:expr) => {
        impl Decision for $ty {
            const CATEGORY: Category = Category::$category;

            fn restrictive_default() -> Self {
                $default
            }

            fn into_outcome(self) -> Outcome {
                Outcome::$category(self)
            }
        }
    };
}

impl_decision!(HttpAuthDecision, HttpAuth, Self::Cancel);
impl_decision!(SslErrorDecision, SslError, Self::Cancel);
impl_decision!(ClientAuthDecision, ClientAuthentication, Self::Cancel);
impl_decision!(PermissionDecision, Permission, Self::Deny);
impl_decision!(ScreenCaptureDecision, ScreenCapture, Self::Deny);
impl_decision!(DataResubmissionDecision, DataResubmission, Self::Cancel);
impl_decision!(WindowNewDecision, WindowNew, Self::Decline);
impl_decision!(FileSelectorDecision, FileSelector, Self::Dismiss);
impl_decision!(ContextMenuDecision, ContextMenu, Self::Close);
impl_decision!(KeyboardDecision, KeyboardAttach, Self::Close);
impl_decision!(JsDialogDecision, JsDialog, Self::Cancel);
impl_decision!(GeolocationDecision, Geolocation, Self::Deny { retain: false });
