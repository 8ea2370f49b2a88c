use std::fmt;

use async_trait::async_trait;
use shared::{
    domain::{LanguageDraft, LanguageId, ProgrammingLanguage},
    protocol::{LoginResponse, SearchSortRequest},
};

pub mod config;
pub mod error;
pub mod flows;
pub mod forms;
mod http;
pub mod list_view;
pub mod session;

pub use error::{ClientError, FieldError, ValidationErrors};
pub use http::HttpLanguagesApi;
pub use list_view::{
    DeleteOutcome, ListViewController, LoadState, PendingDelete, PendingQuery, RequestOutcome,
    ViewState,
};
pub use session::{
    FileSessionStore, MemorySessionStore, Session, SessionEvent, SessionManager, SessionStore,
    StoredSession,
};

/// Bearer token handed out by `POST /login`.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken(String);

impl AccessToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessToken(<redacted>)")
    }
}

/// The remote catalogue API. Every call except `login` carries the caller's token.
#[async_trait]
pub trait LanguagesApi: Send + Sync {
    async fn login(&self, username: &str, password: &str) -> Result<LoginResponse, ClientError>;
    async fn logout(&self, token: &AccessToken) -> Result<(), ClientError>;
    async fn list_languages(
        &self,
        token: &AccessToken,
    ) -> Result<Vec<ProgrammingLanguage>, ClientError>;
    async fn get_language(
        &self,
        token: &AccessToken,
        id: LanguageId,
    ) -> Result<ProgrammingLanguage, ClientError>;
    /// An empty result set is `Ok(vec![])`, including when the server answers 404.
    async fn search_languages(
        &self,
        token: &AccessToken,
        request: &SearchSortRequest,
    ) -> Result<Vec<ProgrammingLanguage>, ClientError>;
    async fn create_language(
        &self,
        token: &AccessToken,
        draft: &LanguageDraft,
    ) -> Result<ProgrammingLanguage, ClientError>;
    async fn update_language(
        &self,
        token: &AccessToken,
        id: LanguageId,
        draft: &LanguageDraft,
    ) -> Result<ProgrammingLanguage, ClientError>;
    async fn delete_language(&self, token: &AccessToken, id: LanguageId)
        -> Result<(), ClientError>;
    async fn delete_languages(
        &self,
        token: &AccessToken,
        ids: &[LanguageId],
    ) -> Result<(), ClientError>;
}

#[cfg(test)]
#[path = "tests/fake_api.rs"]
mod fake_api;
