//! Page-level handlers: dialogs, resubmission, new windows, file pickers and
//! context menus.

use tracing::{debug, warn};

use webgate_core::context::{ContextMenuParams, EditStateFlags, FileSelectorMode, JsDialogKind};
use webgate_core::decision::{
    ContextMenuDecision, DataResubmissionDecision, FileSelectorDecision, JsDialogDecision,
    WindowNewDecision,
};

use super::settle;
use crate::token::{DecisionToken, TokenId};

/// Answers a page dialog (`alert`, `confirm`, `prompt`, `beforeunload`).
#[derive(Debug, Clone)]
pub struct JsResult {
    token: DecisionToken<JsDialogDecision>,
    kind: JsDialogKind,
}

impl JsResult {
    pub(crate) const fn new(token: DecisionToken<JsDialogDecision>, kind: JsDialogKind) -> Self {
        Self { token, kind }
    }

    pub fn handle_confirm(&self) {
        settle(&self.token, JsDialogDecision::Confirm);
    }

    pub fn handle_cancel(&self) {
        settle(&self.token, JsDialogDecision::Cancel);
    }

    /// Confirm a prompt dialog with the entered text. Other dialogs have no
    /// text field and are plainly confirmed.
    pub fn handle_prompt_confirm(&self, result: impl Into<String>) {
        let decision = if self.kind == JsDialogKind::Prompt {
            JsDialogDecision::PromptConfirm {
                text: result.into(),
            }
        } else {
            debug!(kind = ?self.kind, "Prompt text supplied for a non-prompt dialog");
            JsDialogDecision::Confirm
        };
        settle(&self.token, decision);
    }

    pub const fn kind(&self) -> JsDialogKind {
        self.kind
    }

    pub fn token_id(&self) -> TokenId {
        self.token.id()
    }

    pub fn is_resolved(&self) -> bool {
        self.token.is_resolved()
    }
}

/// Answers whether a form should be posted again.
#[derive(Debug, Clone)]
pub struct DataResubmissionHandler {
    token: DecisionToken<DataResubmissionDecision>,
}

impl DataResubmissionHandler {
    pub(crate) const fn new(token: DecisionToken<DataResubmissionDecision>) -> Self {
        Self { token }
    }

    pub fn resend(&self) {
        settle(&self.token, DataResubmissionDecision::Resend);
    }

    pub fn cancel(&self) {
        settle(&self.token, DataResubmissionDecision::Cancel);
    }

    pub fn token_id(&self) -> TokenId {
        self.token.id()
    }

    pub fn is_resolved(&self) -> bool {
        self.token.is_resolved()
    }
}

/// Answers a request to open a new window by attaching a web controller.
#[derive(Debug, Clone)]
pub struct ControllerHandler {
    token: DecisionToken<WindowNewDecision>,
}

impl ControllerHandler {
    pub(crate) const fn new(token: DecisionToken<WindowNewDecision>) -> Self {
        Self { token }
    }

    /// Host the new window in the component driven by `controller`.
    pub fn set_web_controller(&self, controller: impl Into<String>) {
        settle(
            &self.token,
            WindowNewDecision::Attach {
                controller: controller.into(),
            },
        );
    }

    /// Refuse to open the window.
    pub fn decline(&self) {
        settle(&self.token, WindowNewDecision::Decline);
    }

    pub fn token_id(&self) -> TokenId {
        self.token.id()
    }

    pub fn is_resolved(&self) -> bool {
        self.token.is_resolved()
    }
}

/// Answers a file picker request.
#[derive(Debug, Clone)]
pub struct FileSelectorResult {
    token: DecisionToken<FileSelectorDecision>,
    mode: FileSelectorMode,
}

impl FileSelectorResult {
    pub(crate) const fn new(
        token: DecisionToken<FileSelectorDecision>,
        mode: FileSelectorMode,
    ) -> Self {
        Self { token, mode }
    }

    /// Hand the chosen files to the page. An empty list dismisses the
    /// picker; single-file modes keep only the first entry.
    pub fn handle_file_list(&self, mut files: Vec<String>) {
        if files.is_empty() {
            settle(&self.token, FileSelectorDecision::Dismiss);
            return;
        }
        if !self.mode.allows_multiple() && files.len() > 1 {
            warn!(
                token_id = %self.token.id(),
                mode = ?self.mode,
                count = files.len(),
                "Several files selected in single-file mode, keeping the first"
            );
            files.truncate(1);
        }
        settle(&self.token, FileSelectorDecision::Select { files });
    }

    pub fn token_id(&self) -> TokenId {
        self.token.id()
    }

    pub fn is_resolved(&self) -> bool {
        self.token.is_resolved()
    }
}

/// Carries out the action picked from a custom context menu.
///
/// Closing is the default; each editing action also closes the menu. An
/// action the focused element does not support degrades to a plain close.
#[derive(Debug, Clone)]
pub struct WebContextMenuResult {
    token: DecisionToken<ContextMenuDecision>,
    edit_state: EditStateFlags,
    has_image: bool,
}

impl WebContextMenuResult {
    pub(crate) const fn new(
        token: DecisionToken<ContextMenuDecision>,
        params: &ContextMenuParams,
    ) -> Self {
        Self {
            token,
            edit_state: params.edit_state_flags,
            has_image: params.has_image_contents,
        }
    }

    pub fn close_context_menu(&self) {
        settle(&self.token, ContextMenuDecision::Close);
    }

    pub fn copy(&self) {
        self.edit(ContextMenuDecision::Copy);
    }

    pub fn cut(&self) {
        self.edit(ContextMenuDecision::Cut);
    }

    pub fn paste(&self) {
        self.edit(ContextMenuDecision::Paste);
    }

    pub fn select_all(&self) {
        self.edit(ContextMenuDecision::SelectAll);
    }

    pub fn copy_image(&self) {
        self.edit(ContextMenuDecision::CopyImage);
    }

    fn allows(&self, action: ContextMenuDecision) -> bool {
        match action {
            ContextMenuDecision::Copy => self.edit_state.contains(EditStateFlags::CAN_COPY),
            ContextMenuDecision::Cut => self.edit_state.contains(EditStateFlags::CAN_CUT),
            ContextMenuDecision::Paste => self.edit_state.contains(EditStateFlags::CAN_PASTE),
            ContextMenuDecision::SelectAll => {
                self.edit_state.contains(EditStateFlags::CAN_SELECT_ALL)
            }
            ContextMenuDecision::CopyImage => self.has_image,
            ContextMenuDecision::Close => true,
        }
    }

    fn edit(&self, action: ContextMenuDecision) {
        let decision = if self.allows(action) {
            action
        } else {
            debug!(
                token_id = %self.token.id(),
                ?action,
                edit_state = ?self.edit_state,
                "Context menu action not available, closing instead"
            );
            ContextMenuDecision::Close
        };
        settle(&self.token, decision);
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

    #[tokio::test]
    async fn prompt_confirm_carries_text_only_for_prompts() {
        let (token, resolution) = DecisionToken::create();
        JsResult::new(token, JsDialogKind::Prompt).handle_prompt_confirm("42");
        assert_eq!(
            resolution.await.outcome,
            JsDialogDecision::PromptConfirm { text: "42".into() }
        );

        let (token, resolution) = DecisionToken::create();
        JsResult::new(token, JsDialogKind::Confirm).handle_prompt_confirm("42");
        assert_eq!(resolution.await.outcome, JsDialogDecision::Confirm);
    }

    #[tokio::test]
    async fn resubmission_resend_then_cancel_keeps_resend() {
        let (token, resolution) = DecisionToken::create();
        let handler = DataResubmissionHandler::new(token);
        handler.resend();
        handler.cancel();
        assert_eq!(resolution.await.outcome, DataResubmissionDecision::Resend);
    }

    #[tokio::test]
    async fn single_file_mode_keeps_first_file() {
        let (token, resolution) = DecisionToken::create();
        FileSelectorResult::new(token, FileSelectorMode::Open)
            .handle_file_list(vec!["/a.txt".into(), "/b.txt".into()]);
        assert_eq!(
            resolution.await.outcome,
            FileSelectorDecision::Select {
                files: vec!["/a.txt".into()]
            }
        );
    }

    #[tokio::test]
    async fn empty_file_list_dismisses() {
        let (token, resolution) = DecisionToken::create();
        FileSelectorResult::new(token, FileSelectorMode::OpenMultiple).handle_file_list(Vec::new());
        assert_eq!(resolution.await.outcome, FileSelectorDecision::Dismiss);
    }

    #[tokio::test]
    async fn context_menu_action_requires_edit_state() {
        let params = ContextMenuParams {
            edit_state_flags: EditStateFlags::CAN_COPY | EditStateFlags::CAN_SELECT_ALL,
            ..Default::default()
        };

        let (token, resolution) = DecisionToken::create();
        WebContextMenuResult::new(token, &params).copy();
        assert_eq!(resolution.await.outcome, ContextMenuDecision::Copy);

        let (token, resolution) = DecisionToken::create();
        WebContextMenuResult::new(token, &params).paste();
        assert_eq!(resolution.await.outcome, ContextMenuDecision::Close);

        let (token, resolution) = DecisionToken::create();
        WebContextMenuResult::new(token, &params).copy_image();
        assert_eq!(resolution.await.outcome, ContextMenuDecision::Close);
    }

    #[tokio::test]
    async fn window_controller_attaches_once() {
        let (token, resolution) = DecisionToken::create();
        let handler = ControllerHandler::new(token);
        handler.set_web_controller("popup-1");
        handler.set_web_controller("popup-2");
        handler.decline();
        assert_eq!(
            resolution.await.outcome,
            WindowNewDecision::Attach {
                controller: "popup-1".into()
            }
        );
    }

    #[tokio::test]
    async fn js_confirm_then_cancel_keeps_confirm() {
        let (token, resolution) = DecisionToken::create();
        let result = JsResult::new(token, JsDialogKind::Confirm);
        result.handle_confirm();
        result.handle_cancel();
        result.handle_prompt_confirm("late");

        let settled = resolution.await;
        assert_eq!(settled.outcome, JsDialogDecision::Confirm);
        assert!(settled.by_host());
    }

    #[tokio::test]
    async fn second_file_list_is_ignored() {
        let (token, resolution) = DecisionToken::create();
        let result = FileSelectorResult::new(token, FileSelectorMode::OpenMultiple);
        result.handle_file_list(vec!["/a.txt".into(), "/b.txt".into()]);
        result.handle_file_list(vec!["/c.txt".into()]);
        result.handle_file_list(Vec::new());

        assert_eq!(
            resolution.await.outcome,
            FileSelectorDecision::Select {
                files: vec!["/a.txt".into(), "/b.txt".into()]
            }
        );
    }

    #[tokio::test]
    async fn context_menu_copy_then_close_keeps_copy() {
        let params = ContextMenuParams {
            edit_state_flags: EditStateFlags::CAN_COPY,
            ..Default::default()
        };
        let (token, resolution) = DecisionToken::create();
        let result = WebContextMenuResult::new(token, &params);
        result.copy();
        result.close_context_menu();

        assert_eq!(resolution.await.outcome, ContextMenuDecision::Copy);
        assert!(result.is_resolved());
    }
}
