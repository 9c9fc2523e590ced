//! Event payloads handed to host callbacks.
//!
//! Each payload pairs the category's handler with the read-only context the
//! engine supplied.

use std::collections::HashMap;

use webgate_core::context::{
    ClientAuthContext, ContextMenuParams, DataResubmissionContext, FileSelectorParams,
    GeolocationContext, HttpAuthContext, JsDialogContext, SslErrorContext, WindowNewContext,
};

use crate::handler::{
    ClientAuthenticationHandler, ControllerHandler, DataResubmissionHandler, FileSelectorResult,
    HttpAuthHandler, JsGeolocation, JsResult, PermissionRequest, ScreenCaptureHandler,
    SslErrorHandler, WebContextMenuResult, WebKeyboardController,
};

/// Payload of `onHttpAuthRequest`.
#[derive(Debug, Clone)]
pub struct HttpAuthEvent {
    pub handler: HttpAuthHandler,
    pub context: HttpAuthContext,
}

/// Payload of `onSslErrorEventReceive`.
#[derive(Debug, Clone)]
pub struct SslErrorEvent {
    pub handler: SslErrorHandler,
    pub context: SslErrorContext,
}

/// Payload of `onClientAuthenticationRequest`.
#[derive(Debug, Clone)]
pub struct ClientAuthenticationEvent {
    pub handler: ClientAuthenticationHandler,
    pub context: ClientAuthContext,
}

/// Payload of `onPermissionRequest`. The request carries its own context.
#[derive(Debug, Clone)]
pub struct PermissionRequestEvent {
    pub request: PermissionRequest,
}

/// Payload of `onScreenCaptureRequest`.
#[derive(Debug, Clone)]
pub struct ScreenCaptureRequestEvent {
    pub handler: ScreenCaptureHandler,
}

/// Payload of `onDataResubmitted`.
#[derive(Debug, Clone)]
pub struct DataResubmittedEvent {
    pub handler: DataResubmissionHandler,
    pub context: DataResubmissionContext,
}

/// Payload of `onWindowNew`.
#[derive(Debug, Clone)]
pub struct WindowNewEvent {
    pub handler: ControllerHandler,
    pub context: WindowNewContext,
}

/// Payload of `onShowFileSelector`.
#[derive(Debug, Clone)]
pub struct ShowFileSelectorEvent {
    pub result: FileSelectorResult,
    pub file_selector: FileSelectorParams,
}

/// Payload of `onContextMenuShow`.
#[derive(Debug, Clone)]
pub struct ContextMenuShowEvent {
    pub param: ContextMenuParams,
    pub result: WebContextMenuResult,
}

/// Payload of `onInterceptKeyboardAttach`.
#[derive(Debug, Clone)]
pub struct KeyboardAttachEvent {
    pub controller: WebKeyboardController,
    pub attributes: HashMap<String, String>,
}

/// Payload of `onAlert`, `onConfirm`, `onPrompt` and `onBeforeUnload`.
#[derive(Debug, Clone)]
pub struct JsDialogEvent {
    pub result: JsResult,
    pub context: JsDialogContext,
}

/// Payload of `onGeolocationShow`.
#[derive(Debug, Clone)]
pub struct GeolocationShowEvent {
    pub geolocation: JsGeolocation,
    pub context: GeolocationContext,
}
