//! Read-only request context passed from the engine to host callbacks.
//!
//! The engine fills these in when it raises a request; host code can only
//! read them. They deserialize from scenario files with lenient defaults.

use std::collections::HashMap;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

/// Protected resource identifiers offered by permission requests.
pub mod resource {
    pub const MIDI_SYSEX: &str = "TYPE_MIDI_SYSEX";
    pub const VIDEO_CAPTURE: &str = "TYPE_VIDEO_CAPTURE";
    pub const AUDIO_CAPTURE: &str = "TYPE_AUDIO_CAPTURE";
    pub const SENSOR: &str = "TYPE_SENSOR";
}

/// Context for `onHttpAuthRequest`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpAuthContext {
    pub host: String,
    pub realm: String,
    /// Whether the engine holds saved credentials for this host and realm.
    #[serde(default)]
    pub credentials_saved: bool,
}

/// Certificate failure reported with an SSL error request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SslErrorKind {
    #[default]
    Invalid,
    HostMismatch,
    DateInvalid,
    Untrusted,
}

/// Context for `onSslErrorEventReceive`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SslErrorContext {
    pub error: SslErrorKind,
    pub url: String,
    pub original_url: String,
    pub referrer: String,
    pub is_fatal_error: bool,
    pub is_main_frame: bool,
}

/// Context for `onClientAuthenticationRequest`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientAuthContext {
    pub host: String,
    pub port: u16,
    #[serde(default)]
    pub key_types: Vec<String>,
    #[serde(default)]
    pub issuers: Vec<String>,
}

/// Context for `onPermissionRequest`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionContext {
    pub origin: String,
    /// Resource ids the page asked for, see [`resource`].
    pub accessible_resources: Vec<String>,
}

/// Screen capture mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaptureMode {
    #[default]
    HomeScreen,
}

/// Configuration granted with a screen capture request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScreenCaptureConfig {
    pub capture_mode: CaptureMode,
}

/// Context for `onScreenCaptureRequest`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScreenCaptureContext {
    pub origin: String,
    /// Capture modes the engine is able to honour for this request.
    #[serde(default = "default_capture_modes")]
    pub offered_modes: Vec<CaptureMode>,
}

fn default_capture_modes() -> Vec<CaptureMode> {
    vec![CaptureMode::HomeScreen]
}

impl Default for ScreenCaptureContext {
    fn default() -> Self {
        Self {
            origin: String::new(),
            offered_modes: default_capture_modes(),
        }
    }
}

/// Context for `onDataResubmitted`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataResubmissionContext {
    /// URL of the form being posted again.
    pub url: String,
}

/// Context for `onWindowNew`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowNewContext {
    pub is_alert: bool,
    pub is_user_trigger: bool,
    pub target_url: String,
}

/// How the file picker should behave.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileSelectorMode {
    #[default]
    Open,
    OpenMultiple,
    OpenFolder,
    Save,
}

impl FileSelectorMode {
    pub const fn allows_multiple(self) -> bool {
        matches!(self, Self::OpenMultiple)
    }
}

/// Context for `onShowFileSelector`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileSelectorParams {
    pub title: String,
    pub mode: FileSelectorMode,
    pub accept_types: Vec<String>,
    pub capture: bool,
}

bitflags! {
    /// Editing actions the focused element currently supports.
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct EditStateFlags: u32 {
        const CAN_CUT        = 1 << 0;
        const CAN_COPY       = 1 << 1;
        const CAN_PASTE      = 1 << 2;
        const CAN_SELECT_ALL = 1 << 3;
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContextMenuSourceType {
    #[default]
    None,
    Mouse,
    LongPress,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContextMenuMediaType {
    #[default]
    None,
    Image,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContextMenuInputFieldType {
    #[default]
    None,
    PlainText,
    Password,
    Number,
    Telephone,
    Other,
}

/// Context for `onContextMenuShow`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContextMenuParams {
    pub x: i32,
    pub y: i32,
    pub link_url: String,
    pub unfiltered_link_url: String,
    pub source_url: String,
    pub has_image_contents: bool,
    pub media_type: ContextMenuMediaType,
    pub selection_text: String,
    pub source_type: ContextMenuSourceType,
    pub input_field_type: ContextMenuInputFieldType,
    pub is_editable: bool,
    pub edit_state_flags: EditStateFlags,
}

/// Context for `onInterceptKeyboardAttach`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyboardAttachContext {
    /// Attributes of the focused editable element.
    pub attributes: HashMap<String, String>,
}

/// Options the host returns from `onInterceptKeyboardAttach`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebKeyboardOptions {
    pub use_system_keyboard: bool,
    #[serde(default)]
    pub enter_key_type: Option<i32>,
}

impl Default for WebKeyboardOptions {
    fn default() -> Self {
        Self {
            use_system_keyboard: true,
            enter_key_type: None,
        }
    }
}

/// Which page dialog a `JsResult` answers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JsDialogKind {
    #[default]
    Alert,
    Confirm,
    Prompt,
    BeforeUnload,
}

/// Context for `onAlert`, `onConfirm`, `onPrompt` and `onBeforeUnload`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct JsDialogContext {
    pub kind: JsDialogKind,
    pub url: String,
    pub message: String,
    /// Default text of a prompt dialog.
    pub value: Option<String>,
}

/// Context for `onGeolocationShow`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeolocationContext {
    /// Origin of the page asking for the device location.
    pub origin: String,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn screen_capture_context_offers_home_screen_by_default() {
        let ctx: ScreenCaptureContext =
            serde_json::from_str(r#"{"origin":"https://example.com"}"#).unwrap();
        assert_eq!(ctx.offered_modes, vec![CaptureMode::HomeScreen]);
    }

    #[test]
    fn edit_state_flags_match_engine_bits() {
        assert_eq!(EditStateFlags::CAN_CUT.bits(), 1);
        assert_eq!(EditStateFlags::CAN_COPY.bits(), 2);
        assert_eq!(EditStateFlags::CAN_PASTE.bits(), 4);
        assert_eq!(EditStateFlags::CAN_SELECT_ALL.bits(), 8);
    }

    #[test]
    fn keyboard_options_default_to_system_keyboard() {
        assert!(WebKeyboardOptions::default().use_system_keyboard);
    }

    #[test]
    fn only_open_multiple_allows_several_files() {
        assert!(FileSelectorMode::OpenMultiple.allows_multiple());
        assert!(!FileSelectorMode::Open.allows_multiple());
        assert!(!FileSelectorMode::Save.allows_multiple());
    }
}
