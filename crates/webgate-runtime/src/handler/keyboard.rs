//! Custom keyboard controller.
//!
//! Unlike the other handlers the keyboard controller has non-terminal
//! operations: text edits stream to the engine until `close()` ends the
//! session. Edits issued after the session ended are dropped.

use tokio::sync::mpsc;
use tracing::debug;

use webgate_core::decision::KeyboardDecision;

use super::settle;
use crate::token::{DecisionToken, TokenId};

/// One edit sent from a custom keyboard to the focused element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyboardEdit {
    InsertText(String),
    /// Delete `n` characters after the caret.
    DeleteForward(u32),
    /// Delete `n` characters before the caret.
    DeleteBackward(u32),
    /// Function key such as enter, by key code.
    FunctionKey(i32),
}

/// Drives the focused editable element from a host-provided keyboard.
#[derive(Debug, Clone)]
pub struct WebKeyboardController {
    token: DecisionToken<KeyboardDecision>,
    edits: mpsc::UnboundedSender<KeyboardEdit>,
}

impl WebKeyboardController {
    pub(crate) const fn new(
        token: DecisionToken<KeyboardDecision>,
        edits: mpsc::UnboundedSender<KeyboardEdit>,
    ) -> Self {
        Self { token, edits }
    }

    pub fn insert_text(&self, text: impl Into<String>) {
        self.send(KeyboardEdit::InsertText(text.into()));
    }

    pub fn delete_forward(&self, length: u32) {
        self.send(KeyboardEdit::DeleteForward(length));
    }

    pub fn delete_backward(&self, length: u32) {
        self.send(KeyboardEdit::DeleteBackward(length));
    }

    pub fn send_function_key(&self, key: i32) {
        self.send(KeyboardEdit::FunctionKey(key));
    }

    /// End the custom keyboard session.
    pub fn close(&self) {
        settle(&self.token, KeyboardDecision::Close);
    }

    fn send(&self, edit: KeyboardEdit) {
        if self.token.is_resolved() {
            debug!(token_id = %self.token.id(), ?edit, "Dropping edit from closed keyboard");
            return;
        }
        if self.edits.send(edit).is_err() {
            debug!(token_id = %self.token.id(), "Engine stopped reading keyboard edits");
        }
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
    async fn edits_stream_until_close() {
        let (token, resolution) = DecisionToken::create();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let controller = WebKeyboardController::new(token, tx);

        controller.insert_text("hi");
        controller.delete_backward(1);
        controller.close();
        controller.insert_text("late");

        assert_eq!(rx.recv().await, Some(KeyboardEdit::InsertText("hi".into())));
        assert_eq!(rx.recv().await, Some(KeyboardEdit::DeleteBackward(1)));
        assert!(rx.try_recv().is_err());
        assert_eq!(resolution.await.outcome, KeyboardDecision::Close);
    }
}
