use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use tracing::{debug, info};

use webgate_core::config::HandshakeConfig;
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
use webgate_core::{Decision, Error, EventName, Result};
use webgate_runtime::{GuardConfig, Resolution, WebComponent, spawn_expiry_sweeper};

use super::{Report, ReportEntry, Request, Scenario, Step};

type DeferredReplies = Arc<Mutex<Vec<Box<dyn FnOnce() + Send>>>>;
type PendingEntry = Pin<Box<dyn Future<Output = ReportEntry> + Send>>;

/// Replay a scenario against a fresh component.
///
/// The component is torn down after the last step, so every raised request
/// ends up in the report.
pub async fn replay(scenario: Scenario, config: &HandshakeConfig) -> Result<Report> {
    let Scenario {
        component: component_id,
        steps,
    } = scenario;
    let component = WebComponent::new(component_id.clone(), GuardConfig::from(config));
    let sweeper = config
        .pending_timeout()
        .map(|_| spawn_expiry_sweeper(&component, config.sweep_interval()));
    let deferred = DeferredReplies::default();
    let mut pending = Vec::new();

    info!(component = %component_id, steps = steps.len(), "Replaying scenario");
    for (index, step) in steps.into_iter().enumerate() {
        debug!(step = index, ?step, "Replaying step");
        match step {
            Step::Attach => component.attach(),
            Step::Raise(request) => pending.push(raise(&component, &deferred, index, request)?),
            Step::AnswerDeferred => {
                let replies = std::mem::take(&mut *deferred.lock());
                debug!(count = replies.len(), "Answering deferred replies");
                for reply in replies {
                    reply();
                }
            }
            Step::Wait { ms } => {
                tokio::time::sleep(Duration::from_millis(ms)).await;
                let expired = component.expire_overdue();
                debug!(count = expired.len(), "Wait step expired decisions");
            }
            Step::Navigate { url } => component.navigate(&url),
            Step::Teardown => component.teardown(),
        }
    }
    component.teardown();
    if let Some(sweeper) = sweeper {
        sweeper.abort();
    }

    let mut entries = Vec::with_capacity(pending.len());
    for entry in pending {
        entries.push(entry.await);
    }
    Ok(Report {
        component: component_id,
        entries,
    })
}

/// The host's scripted behaviour for one request.
struct Script<D> {
    reply: Option<D>,
    defer: bool,
    handled: bool,
    deferred: DeferredReplies,
}

impl<D: Decision> Script<D> {
    /// Apply the reply now, or queue it for the next `answer_deferred`.
    fn answer(&self, apply: impl FnOnce(D) + Send + 'static) {
        let Some(reply) = self.reply.clone() else {
            return;
        };
        if self.defer {
            self.deferred.lock().push(Box::new(move || apply(reply)));
        } else {
            apply(reply);
        }
    }
}

fn script<D: Decision + DeserializeOwned>(
    step: usize,
    request: &Request,
    deferred: &DeferredReplies,
) -> Result<Script<D>> {
    let reply = request
        .reply
        .clone()
        .map(serde_json::from_value)
        .transpose()
        .map_err(|e| {
            Error::Scenario(format!("Step {step}: invalid reply for {}: {e}", request.event))
        })?;
    Ok(Script {
        reply,
        defer: request.defer,
        handled: request.handled,
        deferred: Arc::clone(deferred),
    })
}

fn context<T: DeserializeOwned + Default>(step: usize, request: &Request) -> Result<T> {
    if request.context.is_null() {
        return Ok(T::default());
    }
    serde_json::from_value(request.context.clone()).map_err(|e| {
        Error::Scenario(format!("Step {step}: invalid context for {}: {e}", request.event))
    })
}

fn entry<D: Decision>(step: usize, event: EventName, resolution: Resolution<D>) -> PendingEntry {
    let token_id = resolution.token_id();
    Box::pin(async move {
        let settled = resolution.await;
        ReportEntry {
            step,
            event,
            token_id,
            outcome: settled.outcome.into_outcome(),
            settled: settled.source,
        }
    })
}

const fn dialog_kind(event: EventName) -> Option<JsDialogKind> {
    match event {
        EventName::Alert => Some(JsDialogKind::Alert),
        EventName::Confirm => Some(JsDialogKind::Confirm),
        EventName::Prompt => Some(JsDialogKind::Prompt),
        EventName::BeforeUnload => Some(JsDialogKind::BeforeUnload),
        _ => None,
    }
}

#[allow(clippy::too_many_lines)]
fn raise(
    component: &WebComponent,
    deferred: &DeferredReplies,
    step: usize,
    request: Request,
) -> Result<PendingEntry> {
    let event = request.event;
    if !request.register {
        component.off(event, None);
    }

    let pending = match event {
        EventName::HttpAuthRequest => {
            let ctx: HttpAuthContext = context(step, &request)?;
            if request.register {
                let s = script::<HttpAuthDecision>(step, &request, deferred)?;
                component.on_http_auth_request(move |e| {
                    let handler = e.handler.clone();
                    s.answer(move |reply| match reply {
                        HttpAuthDecision::Confirm {
                            user_name,
                            password,
                        } => {
                            handler.confirm(user_name, password);
                        }
                        HttpAuthDecision::Cancel => handler.cancel(),
                    });
                    s.handled
                });
            }
            entry(step, event, component.raise_http_auth(ctx))
        }
        EventName::SslErrorEventReceive => {
            let ctx: SslErrorContext = context(step, &request)?;
            if request.register {
                let s = script::<SslErrorDecision>(step, &request, deferred)?;
                component.on_ssl_error_event_receive(move |e| {
                    let handler = e.handler.clone();
                    s.answer(move |reply| match reply {
                        SslErrorDecision::Confirm => handler.handle_confirm(),
                        SslErrorDecision::Cancel => handler.handle_cancel(),
                    });
                });
            }
            entry(step, event, component.raise_ssl_error(ctx))
        }
        EventName::ClientAuthenticationRequest => {
            let ctx: ClientAuthContext = context(step, &request)?;
            if request.register {
                let s = script::<ClientAuthDecision>(step, &request, deferred)?;
                component.on_client_authentication_request(move |e| {
                    let handler = e.handler.clone();
                    s.answer(move |reply| match reply {
                        ClientAuthDecision::ConfirmKeyFile {
                            private_key_file,
                            cert_chain_file,
                        } => handler.confirm_key_file(private_key_file, cert_chain_file),
                        ClientAuthDecision::ConfirmAuthUri { uri } => {
                            handler.confirm_auth_uri(uri);
                        }
                        ClientAuthDecision::Cancel => handler.cancel(),
                        ClientAuthDecision::Ignore => handler.ignore(),
                    });
                });
            }
            entry(step, event, component.raise_client_authentication(ctx))
        }
        EventName::PermissionRequest => {
            let ctx: PermissionContext = context(step, &request)?;
            if request.register {
                let s = script::<PermissionDecision>(step, &request, deferred)?;
                component.on_permission_request(move |e| {
                    let permission = e.request.clone();
                    s.answer(move |reply| match reply {
                        PermissionDecision::Grant { resources } => {
                            permission.grant(resources.as_slice());
                        }
                        PermissionDecision::Deny => permission.deny(),
                    });
                });
            }
            entry(step, event, component.raise_permission_request(ctx))
        }
        EventName::ScreenCaptureRequest => {
            let ctx: ScreenCaptureContext = context(step, &request)?;
            if request.register {
                let s = script::<ScreenCaptureDecision>(step, &request, deferred)?;
                component.on_screen_capture_request(move |e| {
                    let handler = e.handler.clone();
                    s.answer(move |reply| match reply {
                        ScreenCaptureDecision::Grant { config } => handler.grant(config),
                        ScreenCaptureDecision::Deny => handler.deny(),
                    });
                });
            }
            entry(step, event, component.raise_screen_capture(ctx))
        }
        EventName::DataResubmitted => {
            let ctx: DataResubmissionContext = context(step, &request)?;
            if request.register {
                let s = script::<DataResubmissionDecision>(step, &request, deferred)?;
                component.on_data_resubmitted(move |e| {
                    let handler = e.handler.clone();
                    s.answer(move |reply| match reply {
                        DataResubmissionDecision::Resend => handler.resend(),
                        DataResubmissionDecision::Cancel => handler.cancel(),
                    });
                });
            }
            entry(step, event, component.raise_data_resubmission(ctx))
        }
        EventName::WindowNew => {
            let ctx: WindowNewContext = context(step, &request)?;
            if request.register {
                let s = script::<WindowNewDecision>(step, &request, deferred)?;
                component.on_window_new(move |e| {
                    let handler = e.handler.clone();
                    s.answer(move |reply| match reply {
                        WindowNewDecision::Attach { controller } => {
                            handler.set_web_controller(controller);
                        }
                        WindowNewDecision::Decline => handler.decline(),
                    });
                });
            }
            entry(step, event, component.raise_window_new(ctx))
        }
        EventName::ShowFileSelector => {
            let params: FileSelectorParams = context(step, &request)?;
            if request.register {
                let s = script::<FileSelectorDecision>(step, &request, deferred)?;
                component.on_show_file_selector(move |e| {
                    let result = e.result.clone();
                    s.answer(move |reply| match reply {
                        FileSelectorDecision::Select { files } => result.handle_file_list(files),
                        FileSelectorDecision::Dismiss => result.handle_file_list(Vec::new()),
                    });
                    s.handled
                });
            }
            entry(step, event, component.raise_file_selector(params))
        }
        EventName::ContextMenuShow => {
            let params: ContextMenuParams = context(step, &request)?;
            if request.register {
                let s = script::<ContextMenuDecision>(step, &request, deferred)?;
                component.on_context_menu_show(move |e| {
                    let result = e.result.clone();
                    s.answer(move |reply| match reply {
                        ContextMenuDecision::Copy => result.copy(),
                        ContextMenuDecision::Cut => result.cut(),
                        ContextMenuDecision::Paste => result.paste(),
                        ContextMenuDecision::SelectAll => result.select_all(),
                        ContextMenuDecision::CopyImage => result.copy_image(),
                        ContextMenuDecision::Close => result.close_context_menu(),
                    });
                    s.handled
                });
            }
            entry(step, event, component.raise_context_menu(params))
        }
        EventName::InterceptKeyboardAttach => {
            let ctx: KeyboardAttachContext = context(step, &request)?;
            if request.register {
                let s = script::<KeyboardDecision>(step, &request, deferred)?;
                component.on_intercept_keyboard_attach(move |e| {
                    let controller = e.controller.clone();
                    s.answer(move |_: KeyboardDecision| controller.close());
                    WebKeyboardOptions {
                        use_system_keyboard: !s.handled,
                        enter_key_type: None,
                    }
                });
            }
            let session = component.raise_keyboard_attach(ctx);
            entry(step, event, session.resolution)
        }
        EventName::Alert | EventName::Confirm | EventName::Prompt | EventName::BeforeUnload => {
            let mut ctx: JsDialogContext = context(step, &request)?;
            let kind = dialog_kind(event).unwrap_or(ctx.kind);
            ctx.kind = kind;
            if request.register {
                let s = script::<JsDialogDecision>(step, &request, deferred)?;
                component.on_js_dialog(kind, move |e| {
                    let result = e.result.clone();
                    s.answer(move |reply| match reply {
                        JsDialogDecision::Confirm => result.handle_confirm(),
                        JsDialogDecision::PromptConfirm { text } => {
                            result.handle_prompt_confirm(text);
                        }
                        JsDialogDecision::Cancel => result.handle_cancel(),
                    });
                    s.handled
                });
            }
            entry(step, event, component.raise_js_dialog(ctx))
        }
        EventName::GeolocationShow => {
            let ctx: GeolocationContext = context(step, &request)?;
            if request.register {
                let s = script::<GeolocationDecision>(step, &request, deferred)?;
                component.on_geolocation_show(move |e| {
                    let geolocation = e.geolocation.clone();
                    let origin = e.context.origin.clone();
                    s.answer(move |reply| {
                        geolocation.invoke(&origin, reply.is_allowed(), reply.retain());
                    });
                });
            }
            entry(step, event, component.raise_geolocation(ctx))
        }
        EventName::Attach | EventName::Detach => {
            return Err(Error::Scenario(format!(
                "Step {step}: {event} is a lifecycle event, not a request"
            )));
        }
    };
    Ok(pending)
}
