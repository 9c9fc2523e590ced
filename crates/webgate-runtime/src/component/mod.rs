//! The web component instance that owns the handshake.
//!
//! Host code registers callbacks through the `on_*` helpers (or [`on`] /
//! [`off`] directly). The engine raises requests through the `raise_*`
//! methods, each of which invokes the registered callback synchronously and
//! hands back a [`Resolution`] to await for the answer.
//!
//! [`on`]: WebComponent::on
//! [`off`]: WebComponent::off

mod sweeper;

use std::collections::HashSet;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tokio::sync::mpsc;
use tracing::{debug, info};

use webgate_core::context::{
    ClientAuthContext, ContextMenuParams, DataResubmissionContext, FileSelectorParams,
    GeolocationContext, HttpAuthContext, JsDialogContext, JsDialogKind, KeyboardAttachContext,
    PermissionContext, ScreenCaptureContext, SslErrorContext, WebKeyboardOptions,
    WindowNewContext,
};
use webgate_core::decision::{
    ClientAuthDecision, ContextMenuDecision, DataResubmissionDecision, FileSelectorDecision,
    GeolocationDecision, HttpAuthDecision, JsDialogDecision, KeyboardDecision,
    PermissionDecision, ScreenCaptureDecision, SslErrorDecision, WindowNewDecision,
};
use webgate_core::{Decision, EventName};

use crate::event::{
    ClientAuthenticationEvent, ContextMenuShowEvent, DataResubmittedEvent, GeolocationShowEvent,
    HttpAuthEvent, JsDialogEvent, KeyboardAttachEvent, PermissionRequestEvent,
    ScreenCaptureRequestEvent, ShowFileSelectorEvent, SslErrorEvent, WindowNewEvent,
};
use crate::guard::{GuardConfig, ResolutionGuard};
use crate::handler::{
    ClientAuthenticationHandler, ControllerHandler, DataResubmissionHandler, FileSelectorResult,
    HostPort, HttpAuthHandler, JsGeolocation, JsResult, KeyboardEdit, PermissionRequest,
    RetainedGeolocation, ScreenCaptureHandler, SslErrorHandler, WebContextMenuResult,
    WebKeyboardController,
};
use crate::registry::{Callback, DispatchRegistry, Listener};
use crate::token::{DecisionToken, DefaultReason, Resolution, TokenId};

pub use sweeper::spawn_expiry_sweeper;

/// Lifecycle of a component instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    Created,
    Attached,
    TornDown,
}

/// Engine-side view of a custom keyboard session.
#[derive(Debug)]
pub struct KeyboardSession {
    /// Options the host returned (system keyboard when nobody listened).
    pub options: WebKeyboardOptions,
    /// Edits sent by the host's keyboard until it closes.
    pub edits: mpsc::UnboundedReceiver<KeyboardEdit>,
    /// Completes when the session closes.
    pub resolution: Resolution<KeyboardDecision>,
}

pub(crate) struct ComponentInner {
    id: String,
    registry: RwLock<DispatchRegistry>,
    guard: ResolutionGuard,
    lifecycle: Mutex<Lifecycle>,
    declined_client_auth: Arc<Mutex<HashSet<HostPort>>>,
    retained_geolocation: RetainedGeolocation,
}

impl ComponentInner {
    fn is_torn_down(&self) -> bool {
        *self.lifecycle.lock() == Lifecycle::TornDown
    }

    /// Answers remembered for the current navigation.
    fn forget_answers(&self) {
        self.declined_client_auth.lock().clear();
        self.retained_geolocation.lock().clear();
    }
}

impl Drop for ComponentInner {
    fn drop(&mut self) {
        // Handlers kept by host code would otherwise hold the engine forever.
        let settled = self.guard.settle_all(DefaultReason::Teardown);
        if !settled.is_empty() {
            debug!(
                component = %self.id,
                count = settled.len(),
                "Dropped component settled pending decisions"
            );
        }
    }
}

/// One web component instance. Clones share the same instance.
#[derive(Clone)]
pub struct WebComponent {
    inner: Arc<ComponentInner>,
}

impl std::fmt::Debug for WebComponent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebComponent")
            .field("id", &self.inner.id)
            .field("lifecycle", &self.lifecycle())
            .field("pending", &self.pending_count())
            .finish()
    }
}

/// Result of starting a request: a live token, or a resolution that is
/// already settled and needs no callback.
enum Issued<D> {
    Live(DecisionToken<D>, Resolution<D>),
    Settled(Resolution<D>),
}

impl WebComponent {
    /// Create a component instance.
    pub fn new(id: impl Into<String>, config: GuardConfig) -> Self {
        let id = id.into();
        info!(component = %id, ?config, "Web component created");
        Self {
            inner: Arc::new(ComponentInner {
                id,
                registry: RwLock::new(DispatchRegistry::new()),
                guard: ResolutionGuard::new(config),
                lifecycle: Mutex::new(Lifecycle::Created),
                declined_client_auth: Arc::default(),
                retained_geolocation: Arc::default(),
            }),
        }
    }

    /// Create with default guard configuration.
    pub fn with_defaults(id: impl Into<String>) -> Self {
        Self::new(id, GuardConfig::default())
    }

    pub fn id(&self) -> &str {
        &self.inner.id
    }

    pub fn lifecycle(&self) -> Lifecycle {
        *self.inner.lifecycle.lock()
    }

    pub fn guard(&self) -> &ResolutionGuard {
        &self.inner.guard
    }

    pub fn pending_count(&self) -> usize {
        self.inner.guard.pending_count()
    }

    /// Settle overdue decisions now instead of waiting for the sweeper.
    pub fn expire_overdue(&self) -> Vec<TokenId> {
        self.inner.guard.expire_overdue()
    }

    pub(crate) fn downgrade(&self) -> std::sync::Weak<ComponentInner> {
        Arc::downgrade(&self.inner)
    }

    // --- registration -----------------------------------------------------

    /// Register a listener, replacing any callback for the same event.
    /// Ignored once the component is torn down.
    pub fn on(&self, listener: Listener) -> Listener {
        if self.inner.is_torn_down() {
            debug!(
                component = %self.inner.id,
                event = %listener.event_name(),
                "Registration on torn down component ignored"
            );
            return listener;
        }
        self.inner.registry.write().register(listener.clone());
        listener
    }

    /// Unregister the callback for `name`; with `listener`, only if it is the
    /// one currently registered.
    pub fn off(&self, name: EventName, listener: Option<&Listener>) -> bool {
        self.inner.registry.write().unregister(name, listener)
    }

    pub fn is_registered(&self, name: EventName) -> bool {
        self.inner.registry.read().is_registered(name)
    }

    pub fn on_http_auth_request(
        &self,
        f: impl Fn(&HttpAuthEvent) -> bool + Send + Sync + 'static,
    ) -> Listener {
        self.on(Listener::HttpAuthRequest(Callback::new(f)))
    }

    pub fn on_ssl_error_event_receive(
        &self,
        f: impl Fn(&SslErrorEvent) + Send + Sync + 'static,
    ) -> Listener {
        self.on(Listener::SslErrorEventReceive(Callback::new(f)))
    }

    pub fn on_client_authentication_request(
        &self,
        f: impl Fn(&ClientAuthenticationEvent) + Send + Sync + 'static,
    ) -> Listener {
        self.on(Listener::ClientAuthenticationRequest(Callback::new(f)))
    }

    pub fn on_permission_request(
        &self,
        f: impl Fn(&PermissionRequestEvent) + Send + Sync + 'static,
    ) -> Listener {
        self.on(Listener::PermissionRequest(Callback::new(f)))
    }

    pub fn on_screen_capture_request(
        &self,
        f: impl Fn(&ScreenCaptureRequestEvent) + Send + Sync + 'static,
    ) -> Listener {
        self.on(Listener::ScreenCaptureRequest(Callback::new(f)))
    }

    pub fn on_data_resubmitted(
        &self,
        f: impl Fn(&DataResubmittedEvent) + Send + Sync + 'static,
    ) -> Listener {
        self.on(Listener::DataResubmitted(Callback::new(f)))
    }

    pub fn on_window_new(&self, f: impl Fn(&WindowNewEvent) + Send + Sync + 'static) -> Listener {
        self.on(Listener::WindowNew(Callback::new(f)))
    }

    pub fn on_show_file_selector(
        &self,
        f: impl Fn(&ShowFileSelectorEvent) -> bool + Send + Sync + 'static,
    ) -> Listener {
        self.on(Listener::ShowFileSelector(Callback::new(f)))
    }

    pub fn on_context_menu_show(
        &self,
        f: impl Fn(&ContextMenuShowEvent) -> bool + Send + Sync + 'static,
    ) -> Listener {
        self.on(Listener::ContextMenuShow(Callback::new(f)))
    }

    pub fn on_intercept_keyboard_attach(
        &self,
        f: impl Fn(&KeyboardAttachEvent) -> WebKeyboardOptions + Send + Sync + 'static,
    ) -> Listener {
        self.on(Listener::InterceptKeyboardAttach(Callback::new(f)))
    }

    pub fn on_geolocation_show(
        &self,
        f: impl Fn(&GeolocationShowEvent) + Send + Sync + 'static,
    ) -> Listener {
        self.on(Listener::GeolocationShow(Callback::new(f)))
    }

    /// Register a page dialog callback under the event for `kind`.
    pub fn on_js_dialog(
        &self,
        kind: JsDialogKind,
        f: impl Fn(&JsDialogEvent) -> bool + Send + Sync + 'static,
    ) -> Listener {
        let callback = Callback::new(f);
        self.on(match kind {
            JsDialogKind::Alert => Listener::Alert(callback),
            JsDialogKind::Confirm => Listener::Confirm(callback),
            JsDialogKind::Prompt => Listener::Prompt(callback),
            JsDialogKind::BeforeUnload => Listener::BeforeUnload(callback),
        })
    }

    pub fn on_attach(&self, f: impl Fn() + Send + Sync + 'static) -> Listener {
        self.on(Listener::Attach(Callback::new(move |_: &()| f())))
    }

    pub fn on_detach(&self, f: impl Fn() + Send + Sync + 'static) -> Listener {
        self.on(Listener::Detach(Callback::new(move |_: &()| f())))
    }

    // --- lifecycle --------------------------------------------------------

    /// Attach the component to the view tree and fire `onAttach`.
    pub fn attach(&self) {
        {
            let mut lifecycle = self.inner.lifecycle.lock();
            if *lifecycle != Lifecycle::Created {
                return;
            }
            *lifecycle = Lifecycle::Attached;
        }
        info!(component = %self.inner.id, "Web component attached");
        if let Some(Listener::Attach(callback)) = self.listener(EventName::Attach) {
            callback.call(&());
        }
    }

    /// The page navigated away: every pending decision ends with its default.
    /// Client certificate refusals and retained geolocation answers are
    /// forgotten.
    pub fn navigate(&self, url: &str) {
        if self.inner.is_torn_down() {
            return;
        }
        let settled = self.inner.guard.settle_all(DefaultReason::Navigation);
        self.inner.forget_answers();
        info!(
            component = %self.inner.id,
            url,
            settled = settled.len(),
            "Navigation ended pending decisions"
        );
    }

    /// Tear the component down. Pending decisions are settled with their
    /// defaults before `onDetach` fires; afterwards no callback runs and
    /// every raised request resolves to its default immediately.
    pub fn teardown(&self) {
        {
            let mut lifecycle = self.inner.lifecycle.lock();
            if *lifecycle == Lifecycle::TornDown {
                return;
            }
            *lifecycle = Lifecycle::TornDown;
        }

        let settled = self.inner.guard.settle_all(DefaultReason::Teardown);
        self.inner.forget_answers();
        let detach = {
            let mut registry = self.inner.registry.write();
            let detach = registry.get(EventName::Detach).cloned();
            registry.clear();
            detach
        };
        info!(component = %self.inner.id, settled = settled.len(), "Web component torn down");

        if let Some(Listener::Detach(callback)) = detach {
            callback.call(&());
        }
    }

    // --- engine side ------------------------------------------------------

    fn listener(&self, name: EventName) -> Option<Listener> {
        self.inner.registry.read().get(name).cloned()
    }

    fn issue<D: Decision>(&self, event: EventName) -> Issued<D> {
        let (token, resolution) = DecisionToken::<D>::create();
        if self.inner.is_torn_down() {
            debug!(component = %self.inner.id, %event, "Request raised on torn down component");
            token.settle_default(DefaultReason::Teardown);
            return Issued::Settled(resolution);
        }
        self.inner.guard.track(&token);
        if self.inner.is_torn_down() {
            // Teardown ran between the check above and tracking.
            self.inner.guard.apply_default(&token, DefaultReason::Teardown);
            return Issued::Settled(resolution);
        }
        info!(
            component = %self.inner.id,
            token_id = %token.id(),
            %event,
            "Host decision requested"
        );
        Issued::Live(token, resolution)
    }

    fn unregistered<D: Decision>(&self, token: &DecisionToken<D>, event: EventName) {
        debug!(component = %self.inner.id, %event, "No callback registered");
        self.inner.guard.apply_default(token, DefaultReason::Unregistered);
    }

    fn finish_handled<D: Decision>(
        &self,
        token: &DecisionToken<D>,
        event: EventName,
        handled: bool,
    ) {
        if !handled && !token.is_resolved() {
            debug!(
                component = %self.inner.id,
                %event,
                "Callback left request to default behavior"
            );
            self.inner.guard.apply_default(token, DefaultReason::NotHandled);
        }
    }

    pub fn raise_http_auth(&self, context: HttpAuthContext) -> Resolution<HttpAuthDecision> {
        let event = EventName::HttpAuthRequest;
        let (token, resolution) = match self.issue(event) {
            Issued::Live(token, resolution) => (token, resolution),
            Issued::Settled(resolution) => return resolution,
        };
        let Some(Listener::HttpAuthRequest(callback)) = self.listener(event) else {
            self.unregistered(&token, event);
            return resolution;
        };
        let payload = HttpAuthEvent {
            handler: HttpAuthHandler::new(token.clone(), context.credentials_saved),
            context,
        };
        let handled = callback.call(&payload);
        self.finish_handled(&token, event, handled);
        resolution
    }

    pub fn raise_ssl_error(&self, context: SslErrorContext) -> Resolution<SslErrorDecision> {
        let event = EventName::SslErrorEventReceive;
        let (token, resolution) = match self.issue(event) {
            Issued::Live(token, resolution) => (token, resolution),
            Issued::Settled(resolution) => return resolution,
        };
        let Some(Listener::SslErrorEventReceive(callback)) = self.listener(event) else {
            self.unregistered(&token, event);
            return resolution;
        };
        callback.call(&SslErrorEvent {
            handler: SslErrorHandler::new(token),
            context,
        });
        resolution
    }

    /// Raise a client certificate request. An endpoint the host refused
    /// earlier in this navigation is refused again without a callback.
    pub fn raise_client_authentication(
        &self,
        context: ClientAuthContext,
    ) -> Resolution<ClientAuthDecision> {
        let event = EventName::ClientAuthenticationRequest;
        let (token, resolution) = match self.issue(event) {
            Issued::Live(token, resolution) => (token, resolution),
            Issued::Settled(resolution) => return resolution,
        };
        let endpoint = HostPort {
            host: context.host.clone(),
            port: context.port,
        };
        if self.inner.declined_client_auth.lock().contains(&endpoint) {
            info!(component = %self.inner.id, %endpoint, "Client certificate already declined");
            self.inner.guard.apply_default(&token, DefaultReason::Suppressed);
            return resolution;
        }
        let Some(Listener::ClientAuthenticationRequest(callback)) = self.listener(event) else {
            self.unregistered(&token, event);
            return resolution;
        };
        callback.call(&ClientAuthenticationEvent {
            handler: ClientAuthenticationHandler::new(
                token,
                endpoint,
                Arc::clone(&self.inner.declined_client_auth),
            ),
            context,
        });
        resolution
    }

    pub fn raise_permission_request(
        &self,
        context: PermissionContext,
    ) -> Resolution<PermissionDecision> {
        let event = EventName::PermissionRequest;
        let (token, resolution) = match self.issue(event) {
            Issued::Live(token, resolution) => (token, resolution),
            Issued::Settled(resolution) => return resolution,
        };
        let Some(Listener::PermissionRequest(callback)) = self.listener(event) else {
            self.unregistered(&token, event);
            return resolution;
        };
        callback.call(&PermissionRequestEvent {
            request: PermissionRequest::new(
                token,
                context.origin,
                context.accessible_resources,
                self.inner.guard.config().grant_policy,
            ),
        });
        resolution
    }

    pub fn raise_screen_capture(
        &self,
        context: ScreenCaptureContext,
    ) -> Resolution<ScreenCaptureDecision> {
        let event = EventName::ScreenCaptureRequest;
        let (token, resolution) = match self.issue(event) {
            Issued::Live(token, resolution) => (token, resolution),
            Issued::Settled(resolution) => return resolution,
        };
        let Some(Listener::ScreenCaptureRequest(callback)) = self.listener(event) else {
            self.unregistered(&token, event);
            return resolution;
        };
        callback.call(&ScreenCaptureRequestEvent {
            handler: ScreenCaptureHandler::new(token, context.origin, context.offered_modes),
        });
        resolution
    }

    pub fn raise_data_resubmission(
        &self,
        context: DataResubmissionContext,
    ) -> Resolution<DataResubmissionDecision> {
        let event = EventName::DataResubmitted;
        let (token, resolution) = match self.issue(event) {
            Issued::Live(token, resolution) => (token, resolution),
            Issued::Settled(resolution) => return resolution,
        };
        let Some(Listener::DataResubmitted(callback)) = self.listener(event) else {
            self.unregistered(&token, event);
            return resolution;
        };
        callback.call(&DataResubmittedEvent {
            handler: DataResubmissionHandler::new(token),
            context,
        });
        resolution
    }

    pub fn raise_window_new(&self, context: WindowNewContext) -> Resolution<WindowNewDecision> {
        let event = EventName::WindowNew;
        let (token, resolution) = match self.issue(event) {
            Issued::Live(token, resolution) => (token, resolution),
            Issued::Settled(resolution) => return resolution,
        };
        let Some(Listener::WindowNew(callback)) = self.listener(event) else {
            self.unregistered(&token, event);
            return resolution;
        };
        callback.call(&WindowNewEvent {
            handler: ControllerHandler::new(token),
            context,
        });
        resolution
    }

    pub fn raise_file_selector(
        &self,
        params: FileSelectorParams,
    ) -> Resolution<FileSelectorDecision> {
        let event = EventName::ShowFileSelector;
        let (token, resolution) = match self.issue(event) {
            Issued::Live(token, resolution) => (token, resolution),
            Issued::Settled(resolution) => return resolution,
        };
        let Some(Listener::ShowFileSelector(callback)) = self.listener(event) else {
            self.unregistered(&token, event);
            return resolution;
        };
        let payload = ShowFileSelectorEvent {
            result: FileSelectorResult::new(token.clone(), params.mode),
            file_selector: params,
        };
        let handled = callback.call(&payload);
        self.finish_handled(&token, event, handled);
        resolution
    }

    pub fn raise_context_menu(&self, params: ContextMenuParams) -> Resolution<ContextMenuDecision> {
        let event = EventName::ContextMenuShow;
        let (token, resolution) = match self.issue(event) {
            Issued::Live(token, resolution) => (token, resolution),
            Issued::Settled(resolution) => return resolution,
        };
        let Some(Listener::ContextMenuShow(callback)) = self.listener(event) else {
            self.unregistered(&token, event);
            return resolution;
        };
        let payload = ContextMenuShowEvent {
            result: WebContextMenuResult::new(token.clone(), &params),
            param: params,
        };
        let handled = callback.call(&payload);
        self.finish_handled(&token, event, handled);
        resolution
    }

    /// Raise a geolocation request. An origin whose answer the host asked to
    /// retain gets that answer again without a callback.
    pub fn raise_geolocation(
        &self,
        context: GeolocationContext,
    ) -> Resolution<GeolocationDecision> {
        let event = EventName::GeolocationShow;
        let (token, resolution) = match self.issue(event) {
            Issued::Live(token, resolution) => (token, resolution),
            Issued::Settled(resolution) => return resolution,
        };
        let retained = self.inner.retained_geolocation.lock().get(&context.origin).copied();
        if let Some(decision) = retained {
            info!(
                component = %self.inner.id,
                origin = %context.origin,
                allowed = decision.is_allowed(),
                "Geolocation answered from retained decision"
            );
            token.settle_retained(decision);
            return resolution;
        }
        let Some(Listener::GeolocationShow(callback)) = self.listener(event) else {
            self.unregistered(&token, event);
            return resolution;
        };
        callback.call(&GeolocationShowEvent {
            geolocation: JsGeolocation::new(
                token,
                context.origin.clone(),
                Arc::clone(&self.inner.retained_geolocation),
            ),
            context,
        });
        resolution
    }

    /// Raise a page dialog under the event matching its kind.
    pub fn raise_js_dialog(&self, context: JsDialogContext) -> Resolution<JsDialogDecision> {
        let event = match context.kind {
            JsDialogKind::Alert => EventName::Alert,
            JsDialogKind::Confirm => EventName::Confirm,
            JsDialogKind::Prompt => EventName::Prompt,
            JsDialogKind::BeforeUnload => EventName::BeforeUnload,
        };
        let (token, resolution) = match self.issue(event) {
            Issued::Live(token, resolution) => (token, resolution),
            Issued::Settled(resolution) => return resolution,
        };
        let callback = match self.listener(event) {
            Some(
                Listener::Alert(callback)
                | Listener::Confirm(callback)
                | Listener::Prompt(callback)
                | Listener::BeforeUnload(callback),
            ) => callback,
            _ => {
                self.unregistered(&token, event);
                return resolution;
            }
        };
        let payload = JsDialogEvent {
            result: JsResult::new(token.clone(), context.kind),
            context,
        };
        let handled = callback.call(&payload);
        self.finish_handled(&token, event, handled);
        resolution
    }

    /// Raise a custom keyboard request for a focused editable element.
    ///
    /// Choosing the system keyboard, or having no callback, closes the custom
    /// session straight away.
    pub fn raise_keyboard_attach(&self, context: KeyboardAttachContext) -> KeyboardSession {
        let event = EventName::InterceptKeyboardAttach;
        let (edits_tx, edits) = mpsc::unbounded_channel();
        let (token, resolution) = match self.issue(event) {
            Issued::Live(token, resolution) => (token, resolution),
            Issued::Settled(resolution) => {
                return KeyboardSession {
                    options: WebKeyboardOptions::default(),
                    edits,
                    resolution,
                };
            }
        };
        let Some(Listener::InterceptKeyboardAttach(callback)) = self.listener(event) else {
            self.unregistered(&token, event);
            return KeyboardSession {
                options: WebKeyboardOptions::default(),
                edits,
                resolution,
            };
        };
        let options = callback.call(&KeyboardAttachEvent {
            controller: WebKeyboardController::new(token.clone(), edits_tx),
            attributes: context.attributes,
        });
        self.finish_handled(&token, event, !options.use_system_keyboard);
        KeyboardSession {
            options,
            edits,
            resolution,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use crate::token::SettleSource;

    #[tokio::test]
    async fn unregistered_event_resolves_to_default() {
        let component = WebComponent::with_defaults("web-1");
        let settled = component.raise_ssl_error(SslErrorContext::default()).await;

        assert_eq!(settled.outcome, SslErrorDecision::Cancel);
        assert_eq!(
            settled.source,
            SettleSource::Default(DefaultReason::Unregistered)
        );
        assert_eq!(component.pending_count(), 0);
    }

    #[tokio::test]
    async fn unhandled_dialog_falls_back_to_default() {
        let component = WebComponent::with_defaults("web-1");
        component.on_js_dialog(JsDialogKind::Confirm, |_| false);

        let settled = component
            .raise_js_dialog(JsDialogContext {
                kind: JsDialogKind::Confirm,
                message: "Leave?".into(),
                ..Default::default()
            })
            .await;
        assert_eq!(settled.outcome, JsDialogDecision::Cancel);
        assert_eq!(
            settled.source,
            SettleSource::Default(DefaultReason::NotHandled)
        );
    }

    #[tokio::test]
    async fn handled_callback_may_answer_later() {
        let component = WebComponent::with_defaults("web-1");
        let kept = Arc::new(Mutex::new(None));
        let slot = Arc::clone(&kept);
        component.on_http_auth_request(move |event| {
            *slot.lock() = Some(event.handler.clone());
            true
        });

        let mut resolution = component.raise_http_auth(HttpAuthContext {
            host: "example.com".into(),
            realm: "Realm".into(),
            credentials_saved: false,
        });
        assert!(resolution.try_settled().is_none());
        assert_eq!(component.pending_count(), 1);

        let handler = kept.lock().take().unwrap();
        assert!(handler.confirm("alice", "secret"));

        let settled = resolution.await;
        assert!(settled.by_host());
    }

    #[tokio::test]
    async fn dialog_callbacks_are_per_event() {
        let component = WebComponent::with_defaults("web-1");
        component.on_js_dialog(JsDialogKind::Alert, |event| {
            event.result.handle_confirm();
            true
        });

        let alert = component
            .raise_js_dialog(JsDialogContext {
                kind: JsDialogKind::Alert,
                ..Default::default()
            })
            .await;
        assert_eq!(alert.outcome, JsDialogDecision::Confirm);

        let prompt = component
            .raise_js_dialog(JsDialogContext {
                kind: JsDialogKind::Prompt,
                ..Default::default()
            })
            .await;
        assert_eq!(
            prompt.source,
            SettleSource::Default(DefaultReason::Unregistered)
        );
    }

    #[test]
    fn attach_fires_once() {
        let component = WebComponent::with_defaults("web-1");
        let count = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&count);
        component.on_attach(move || {
            seen.fetch_add(1, Ordering::SeqCst);
        });

        component.attach();
        component.attach();
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(component.lifecycle(), Lifecycle::Attached);
    }

    #[tokio::test]
    async fn callback_may_reregister_while_running() {
        let component = WebComponent::with_defaults("web-1");
        let inner = component.clone();
        component.on_data_resubmitted(move |event| {
            event.handler.resend();
            inner.on_data_resubmitted(|event| event.handler.cancel());
        });

        let first = component
            .raise_data_resubmission(DataResubmissionContext::default())
            .await;
        let second = component
            .raise_data_resubmission(DataResubmissionContext::default())
            .await;
        assert_eq!(first.outcome, DataResubmissionDecision::Resend);
        assert_eq!(second.outcome, DataResubmissionDecision::Cancel);
    }

    #[tokio::test]
    async fn navigation_settles_pending_decisions() {
        let component = WebComponent::with_defaults("web-1");
        component.on_window_new(|_| {});

        let resolution = component.raise_window_new(WindowNewContext {
            target_url: "https://popup.example".into(),
            ..Default::default()
        });
        component.navigate("https://next.example");

        let settled = resolution.await;
        assert_eq!(settled.outcome, WindowNewDecision::Decline);
        assert_eq!(
            settled.source,
            SettleSource::Default(DefaultReason::Navigation)
        );
        assert!(component.is_registered(EventName::WindowNew));
    }

    #[tokio::test]
    async fn dropping_component_settles_kept_handlers() {
        let component = WebComponent::with_defaults("web-1");
        let kept = Arc::new(Mutex::new(None));
        let slot = Arc::clone(&kept);
        component.on_ssl_error_event_receive(move |event| {
            *slot.lock() = Some(event.handler.clone());
        });

        let resolution = component.raise_ssl_error(SslErrorContext::default());
        drop(component);

        let settled = resolution.await;
        assert_eq!(
            settled.source,
            SettleSource::Default(DefaultReason::Teardown)
        );
        assert!(kept.lock().as_ref().unwrap().is_resolved());
    }

    #[tokio::test]
    async fn keyboard_session_streams_edits() {
        let component = WebComponent::with_defaults("web-1");
        component.on_intercept_keyboard_attach(|event| {
            event.controller.insert_text("42");
            event.controller.send_function_key(66);
            event.controller.close();
            WebKeyboardOptions {
                use_system_keyboard: false,
                enter_key_type: None,
            }
        });

        let mut session = component.raise_keyboard_attach(KeyboardAttachContext::default());
        assert!(!session.options.use_system_keyboard);
        assert_eq!(session.edits.recv().await, Some(KeyboardEdit::InsertText("42".into())));
        assert_eq!(session.edits.recv().await, Some(KeyboardEdit::FunctionKey(66)));
        assert_eq!(session.resolution.await.outcome, KeyboardDecision::Close);
    }

    #[tokio::test]
    async fn system_keyboard_closes_custom_session() {
        let component = WebComponent::with_defaults("web-1");
        component.on_intercept_keyboard_attach(|_| WebKeyboardOptions::default());

        let session = component.raise_keyboard_attach(KeyboardAttachContext::default());
        assert!(session.options.use_system_keyboard);
        assert_eq!(
            session.resolution.await.source,
            SettleSource::Default(DefaultReason::NotHandled)
        );
    }
}
