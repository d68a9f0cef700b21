//! Side-channel for user-facing conditions.
//!
//! Store actions never throw across the UI boundary; anything the user must
//! see (blocked action, failed write, rejected input) is pushed here and
//! drained by the consuming context.

use tokio::sync::mpsc;

use crate::error::CoreError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    /// Action attempted without an authenticated principal.
    AuthRequired,
    /// A gateway call failed; the action may be retried by the user.
    Transient(String),
    /// Input rejected before any gateway call.
    Validation(String),
}

impl Notice {
    /// User-facing rendition of a boundary error. Gateway failures show the
    /// action-specific message; their details stay in the logs.
    pub(crate) fn from_error(err: &CoreError, transient_message: &str) -> Notice {
        match err {
            CoreError::Gateway(_) => Notice::Transient(transient_message.to_string()),
            CoreError::AuthRequired => Notice::AuthRequired,
            CoreError::Validation(message) => Notice::Validation(message.clone()),
        }
    }
}

#[derive(Clone)]
pub struct NoticeSender {
    tx: mpsc::UnboundedSender<Notice>,
}

impl NoticeSender {
    pub(crate) fn channel() -> (Self, mpsc::UnboundedReceiver<Notice>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Deliver a notice. Dropped silently if no consumer is listening.
    pub fn push(&self, notice: Notice) {
        let _ = self.tx.send(notice);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GatewayError;

    #[test]
    fn test_error_mapping() {
        let offline = CoreError::Gateway(GatewayError::Transport("offline".into()));
        assert_eq!(
            Notice::from_error(&offline, "Tente novamente"),
            Notice::Transient("Tente novamente".into())
        );
        assert_eq!(
            Notice::from_error(&CoreError::AuthRequired, "ignored"),
            Notice::AuthRequired
        );
        assert_eq!(
            Notice::from_error(&CoreError::Validation("Escreva uma mensagem".into()), "ignored"),
            Notice::Validation("Escreva uma mensagem".into())
        );
    }
}
