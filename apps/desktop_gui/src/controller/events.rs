//! UI/backend events and error modeling for the desktop GUI controller.

use client_core::{
    flows::DetailsState, forms::LanguageForm, ClientError, ValidationErrors, ViewState,
};
use shared::domain::{LanguageId, ProgrammingLanguage};

pub enum UiEvent {
    Info(String),
    LoggedIn {
        username: String,
    },
    LoggedOut,
    /// Fresh list snapshot after any controller mutation.
    ListChanged(ViewState),
    DetailsLoaded {
        id: LanguageId,
        state: DetailsState,
    },
    EditorReady {
        id: Option<LanguageId>,
        form: LanguageForm,
    },
    FormSaved(ProgrammingLanguage),
    FormRejected(ValidationErrors),
    Error(UiError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiErrorCategory {
    Auth,
    Transport,
    Validation,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiErrorContext {
    BackendStartup,
    Login,
    List,
    Details,
    Form,
    General,
}

#[derive(Debug, Clone)]
pub struct UiError {
    category: UiErrorCategory,
    context: UiErrorContext,
    message: String,
}

impl UiError {
    pub fn from_client(context: UiErrorContext, err: &ClientError) -> Self {
        let category = match err {
            ClientError::Auth(_) => UiErrorCategory::Auth,
            ClientError::Network(_) => UiErrorCategory::Transport,
            ClientError::Validation(_) => UiErrorCategory::Validation,
            ClientError::NotFound | ClientError::Session(_) | ClientError::Config(_) => {
                UiErrorCategory::Unknown
            }
        };
        let message = match err {
            ClientError::Auth(message) => message.clone(),
            other => other.to_string(),
        };
        Self {
            category,
            context,
            message,
        }
    }

    /// For failures that never passed through the client library.
    pub fn from_message(context: UiErrorContext, message: impl Into<String>) -> Self {
        let message = message.into();
        let lower = message.to_ascii_lowercase();
        let category = if lower.contains("401")
            || lower.contains("unauthorized")
            || lower.contains("invalid token")
            || lower.contains("invalid credential")
        {
            UiErrorCategory::Auth
        } else if lower.contains("timeout")
            || lower.contains("timed out")
            || lower.contains("connection")
            || lower.contains("disconnect")
            || lower.contains("unavailable")
        {
            UiErrorCategory::Transport
        } else if lower.contains("invalid") || lower.contains("malformed") {
            UiErrorCategory::Validation
        } else {
            UiErrorCategory::Unknown
        };

        Self {
            category,
            context,
            message,
        }
    }

    pub fn requires_reauth(&self) -> bool {
        self.category == UiErrorCategory::Auth
    }

    pub fn category(&self) -> UiErrorCategory {
        self.category
    }

    pub fn context(&self) -> UiErrorContext {
        self.context
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

pub fn err_label(category: UiErrorCategory) -> &'static str {
    match category {
        UiErrorCategory::Auth => "Auth",
        UiErrorCategory::Transport => "Network",
        UiErrorCategory::Validation => "Validation",
        UiErrorCategory::Unknown => "Error",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_errors_map_to_categories() {
        let auth = UiError::from_client(
            UiErrorContext::Login,
            &ClientError::Auth("Invalid credentials".into()),
        );
        assert_eq!(auth.category(), UiErrorCategory::Auth);
        assert_eq!(auth.message(), "Invalid credentials");
        assert!(auth.requires_reauth());

        let network = UiError::from_client(
            UiErrorContext::Details,
            &ClientError::Network("connection refused".into()),
        );
        assert_eq!(network.category(), UiErrorCategory::Transport);
        assert_eq!(network.context(), UiErrorContext::Details);
        assert!(!network.requires_reauth());
    }

    #[test]
    fn classifies_disconnected_worker_as_transport_error() {
        let err = UiError::from_message(
            UiErrorContext::General,
            "Backend command processor disconnected",
        );
        assert_eq!(err.category(), UiErrorCategory::Transport);
        assert!(!err.requires_reauth());
    }
}
