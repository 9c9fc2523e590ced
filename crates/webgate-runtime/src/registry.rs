//! Per-component dispatch registry.
//!
//! Maps each event name to at most one active callback. `register` replaces
//! whatever was there; `unregister` with a callback only clears the slot when
//! that exact callback is the one registered.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tracing::debug;

use webgate_core::EventName;
use webgate_core::context::WebKeyboardOptions;

use crate::event::{
    ClientAuthenticationEvent, ContextMenuShowEvent, DataResubmittedEvent, GeolocationShowEvent,
    HttpAuthEvent, JsDialogEvent, KeyboardAttachEvent, PermissionRequestEvent,
    ScreenCaptureRequestEvent, ShowFileSelectorEvent, SslErrorEvent, WindowNewEvent,
};

/// Shared host callback. Clones compare equal under [`Callback::same_as`].
pub struct Callback<E, R = ()> {
    f: Arc<dyn Fn(&E) -> R + Send + Sync>,
}

impl<E, R> Callback<E, R> {
    pub fn new(f: impl Fn(&E) -> R + Send + Sync + 'static) -> Self {
        Self { f: Arc::new(f) }
    }

    pub(crate) fn call(&self, event: &E) -> R {
        (self.f)(event)
    }

    /// Whether both handles point at the same registered closure.
    pub fn same_as(&self, other: &Self) -> bool {
        std::ptr::addr_eq(Arc::as_ptr(&self.f), Arc::as_ptr(&other.f))
    }
}

impl<E, R> Clone for Callback<E, R> {
    fn clone(&self) -> Self {
        Self {
            f: Arc::clone(&self.f),
        }
    }
}

impl<E, R> fmt::Debug for Callback<E, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Callback({:p})", Arc::as_ptr(&self.f).cast::<()>())
    }
}

/// A callback bound to the event it listens for.
#[derive(Debug, Clone)]
pub enum Listener {
    HttpAuthRequest(Callback<HttpAuthEvent, bool>),
    SslErrorEventReceive(Callback<SslErrorEvent>),
    ClientAuthenticationRequest(Callback<ClientAuthenticationEvent>),
    PermissionRequest(Callback<PermissionRequestEvent>),
    ScreenCaptureRequest(Callback<ScreenCaptureRequestEvent>),
    DataResubmitted(Callback<DataResubmittedEvent>),
    WindowNew(Callback<WindowNewEvent>),
    ShowFileSelector(Callback<ShowFileSelectorEvent, bool>),
    ContextMenuShow(Callback<ContextMenuShowEvent, bool>),
    InterceptKeyboardAttach(Callback<KeyboardAttachEvent, WebKeyboardOptions>),
    Alert(Callback<JsDialogEvent, bool>),
    Confirm(Callback<JsDialogEvent, bool>),
    Prompt(Callback<JsDialogEvent, bool>),
    BeforeUnload(Callback<JsDialogEvent, bool>),
    GeolocationShow(Callback<GeolocationShowEvent>),
    Attach(Callback<()>),
    Detach(Callback<()>),
}

impl Listener {
    pub const fn event_name(&self) -> EventName {
        match self {
            Self::HttpAuthRequest(_) => EventName::HttpAuthRequest,
            Self::SslErrorEventReceive(_) => EventName::SslErrorEventReceive,
            Self::ClientAuthenticationRequest(_) => EventName::ClientAuthenticationRequest,
            Self::PermissionRequest(_) => EventName::PermissionRequest,
            Self::ScreenCaptureRequest(_) => EventName::ScreenCaptureRequest,
            Self::DataResubmitted(_) => EventName::DataResubmitted,
            Self::WindowNew(_) => EventName::WindowNew,
            Self::ShowFileSelector(_) => EventName::ShowFileSelector,
            Self::ContextMenuShow(_) => EventName::ContextMenuShow,
            Self::InterceptKeyboardAttach(_) => EventName::InterceptKeyboardAttach,
            Self::Alert(_) => EventName::Alert,
            Self::Confirm(_) => EventName::Confirm,
            Self::Prompt(_) => EventName::Prompt,
            Self::BeforeUnload(_) => EventName::BeforeUnload,
            Self::GeolocationShow(_) => EventName::GeolocationShow,
            Self::Attach(_) => EventName::Attach,
            Self::Detach(_) => EventName::Detach,
        }
    }

    /// Whether both listeners wrap the same callback for the same event.
    pub fn same_as(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::HttpAuthRequest(a), Self::HttpAuthRequest(b)) => a.same_as(b),
            (Self::SslErrorEventReceive(a), Self::SslErrorEventReceive(b)) => a.same_as(b),
            (Self::ClientAuthenticationRequest(a), Self::ClientAuthenticationRequest(b)) => {
                a.same_as(b)
            }
            (Self::PermissionRequest(a), Self::PermissionRequest(b)) => a.same_as(b),
            (Self::ScreenCaptureRequest(a), Self::ScreenCaptureRequest(b)) => a.same_as(b),
            (Self::DataResubmitted(a), Self::DataResubmitted(b)) => a.same_as(b),
            (Self::WindowNew(a), Self::WindowNew(b)) => a.same_as(b),
            (Self::ShowFileSelector(a), Self::ShowFileSelector(b)) => a.same_as(b),
            (Self::ContextMenuShow(a), Self::ContextMenuShow(b)) => a.same_as(b),
            (Self::InterceptKeyboardAttach(a), Self::InterceptKeyboardAttach(b)) => {
                a.same_as(b)
            }
            (Self::Alert(a), Self::Alert(b))
            | (Self::Confirm(a), Self::Confirm(b))
            | (Self::Prompt(a), Self::Prompt(b))
            | (Self::BeforeUnload(a), Self::BeforeUnload(b)) => a.same_as(b),
            (Self::Attach(a), Self::Attach(b)) | (Self::Detach(a), Self::Detach(b)) => {
                a.same_as(b)
            }
            (Self::GeolocationShow(a), Self::GeolocationShow(b)) => a.same_as(b),
            _ => false,
        }
    }
}

/// Event name to at most one active callback.
#[derive(Debug, Default)]
pub struct DispatchRegistry {
    slots: HashMap<EventName, Listener>,
}

impl DispatchRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener under its event name. Returns the listener it
    /// replaced, if any.
    pub fn register(&mut self, listener: Listener) -> Option<Listener> {
        let name = listener.event_name();
        let replaced = self.slots.insert(name, listener);
        debug!(event = %name, replaced = replaced.is_some(), "Callback registered");
        replaced
    }

    /// Clear the slot for `name`. With `listener`, only clears it when that
    /// listener is the one registered. Returns whether anything was removed.
    pub fn unregister(&mut self, name: EventName, listener: Option<&Listener>) -> bool {
        let matches = match (self.slots.get(&name), listener) {
            (Some(_), None) => true,
            (Some(current), Some(expected)) => current.same_as(expected),
            (None, _) => false,
        };
        if matches {
            self.slots.remove(&name);
            debug!(event = %name, "Callback unregistered");
        }
        matches
    }

    pub fn get(&self, name: EventName) -> Option<&Listener> {
        self.slots.get(&name)
    }

    pub fn is_registered(&self, name: EventName) -> bool {
        self.slots.contains_key(&name)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub(crate) fn clear(&mut self) {
        self.slots.clear();
    }
}
