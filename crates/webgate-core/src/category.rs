//! Request categories and component event names.
//!
//! A [`Category`] is one kind of pending host decision. Each category is
//! raised under one or more [`EventName`]s; the JS dialog category is shared
//! by the four dialog events. `onAttach` and `onDetach` are lifecycle events
//! with no decision attached.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// One kind of pending host decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    HttpAuth,
    SslError,
    ClientAuthentication,
    Permission,
    ScreenCapture,
    DataResubmission,
    WindowNew,
    FileSelector,
    ContextMenu,
    KeyboardAttach,
    JsDialog,
    Geolocation,
}

impl Category {
    /// Every category, in declaration order.
    pub const ALL: [Self; 12] = [
        Self::HttpAuth,
        Self::SslError,
        Self::ClientAuthentication,
        Self::Permission,
        Self::ScreenCapture,
        Self::DataResubmission,
        Self::WindowNew,
        Self::FileSelector,
        Self::ContextMenu,
        Self::KeyboardAttach,
        Self::JsDialog,
        Self::Geolocation,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::HttpAuth => "http_auth",
            Self::SslError => "ssl_error",
            Self::ClientAuthentication => "client_authentication",
            Self::Permission => "permission",
            Self::ScreenCapture => "screen_capture",
            Self::DataResubmission => "data_resubmission",
            Self::WindowNew => "window_new",
            Self::FileSelector => "file_selector",
            Self::ContextMenu => "context_menu",
            Self::KeyboardAttach => "keyboard_attach",
            Self::JsDialog => "js_dialog",
            Self::Geolocation => "geolocation",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Event name a host callback is registered under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventName {
    #[serde(rename = "onHttpAuthRequest")]
    HttpAuthRequest,
    #[serde(rename = "onSslErrorEventReceive")]
    SslErrorEventReceive,
    #[serde(rename = "onClientAuthenticationRequest")]
    ClientAuthenticationRequest,
    #[serde(rename = "onPermissionRequest")]
    PermissionRequest,
    #[serde(rename = "onScreenCaptureRequest")]
    ScreenCaptureRequest,
    #[serde(rename = "onDataResubmitted")]
    DataResubmitted,
    #[serde(rename = "onWindowNew")]
    WindowNew,
    #[serde(rename = "onShowFileSelector")]
    ShowFileSelector,
    #[serde(rename = "onContextMenuShow")]
    ContextMenuShow,
    #[serde(rename = "onInterceptKeyboardAttach")]
    InterceptKeyboardAttach,
    #[serde(rename = "onAlert")]
    Alert,
    #[serde(rename = "onConfirm")]
    Confirm,
    #[serde(rename = "onPrompt")]
    Prompt,
    #[serde(rename = "onBeforeUnload")]
    BeforeUnload,
    #[serde(rename = "onGeolocationShow")]
    GeolocationShow,
    #[serde(rename = "onAttach")]
    Attach,
    #[serde(rename = "onDetach")]
    Detach,
}

impl EventName {
    pub const ALL: [Self; 17] = [
        Self::HttpAuthRequest,
        Self::SslErrorEventReceive,
        Self::ClientAuthenticationRequest,
        Self::PermissionRequest,
        Self::ScreenCaptureRequest,
        Self::DataResubmitted,
        Self::WindowNew,
        Self::ShowFileSelector,
        Self::ContextMenuShow,
        Self::InterceptKeyboardAttach,
        Self::Alert,
        Self::Confirm,
        Self::Prompt,
        Self::BeforeUnload,
        Self::GeolocationShow,
        Self::Attach,
        Self::Detach,
    ];

    /// The literal name used by host code, e.g. `"onHttpAuthRequest"`.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::HttpAuthRequest => "onHttpAuthRequest",
            Self::SslErrorEventReceive => "onSslErrorEventReceive",
            Self::ClientAuthenticationRequest => "onClientAuthenticationRequest",
            Self::PermissionRequest => "onPermissionRequest",
            Self::ScreenCaptureRequest => "onScreenCaptureRequest",
            Self::DataResubmitted => "onDataResubmitted",
            Self::WindowNew => "onWindowNew",
            Self::ShowFileSelector => "onShowFileSelector",
            Self::ContextMenuShow => "onContextMenuShow",
            Self::InterceptKeyboardAttach => "onInterceptKeyboardAttach",
            Self::Alert => "onAlert",
            Self::Confirm => "onConfirm",
            Self::Prompt => "onPrompt",
            Self::BeforeUnload => "onBeforeUnload",
            Self::GeolocationShow => "onGeolocationShow",
            Self::Attach => "onAttach",
            Self::Detach => "onDetach",
        }
    }

    /// Decision category raised under this event, `None` for lifecycle events.
    pub const fn category(self) -> Option<Category> {
        match self {
            Self::HttpAuthRequest => Some(Category::HttpAuth),
            Self::SslErrorEventReceive => Some(Category::SslError),
            Self::ClientAuthenticationRequest => Some(Category::ClientAuthentication),
            Self::PermissionRequest => Some(Category::Permission),
            Self::ScreenCaptureRequest => Some(Category::ScreenCapture),
            Self::DataResubmitted => Some(Category::DataResubmission),
            Self::WindowNew => Some(Category::WindowNew),
            Self::ShowFileSelector => Some(Category::FileSelector),
            Self::ContextMenuShow => Some(Category::ContextMenu),
            Self::InterceptKeyboardAttach => Some(Category::KeyboardAttach),
            Self::Alert | Self::Confirm | Self::Prompt | Self::BeforeUnload => {
                Some(Category::JsDialog)
            }
            Self::GeolocationShow => Some(Category::Geolocation),
            Self::Attach | Self::Detach => None,
        }
    }

    /// Whether the host callback returns a "handled" flag.
    ///
    /// Returning `false` from such a callback while the decision is still
    /// pending hands the request back to the default behavior.
    pub const fn returns_handled(self) -> bool {
        matches!(
            self,
            Self::HttpAuthRequest
                | Self::ShowFileSelector
                | Self::ContextMenuShow
                | Self::Alert
                | Self::Confirm
                | Self::Prompt
                | Self::BeforeUnload
        )
    }
}

impl fmt::Display for EventName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventName {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|name| name.as_str() == s)
            .ok_or_else(|| Error::UnknownEvent(s.to_string()))
    }
}
