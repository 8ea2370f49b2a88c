//! Single-request screens that sit around the list: login, logout, details
//! and the add/edit form.

use shared::domain::{LanguageId, ProgrammingLanguage};
use tracing::{info, warn};

use crate::{
    forms::{LanguageForm, LoginForm},
    AccessToken, ClientError, LanguagesApi, Session, SessionManager,
};

pub const DETAILS_FAILED_MESSAGE: &str = "Failed to fetch programming language details.";
pub const DETAILS_NOT_FOUND_MESSAGE: &str = "Programming language not found.";

pub async fn login(
    api: &dyn LanguagesApi,
    sessions: &SessionManager,
    form: &LoginForm,
) -> Result<Session, ClientError> {
    form.validate()?;
    let response = api.login(&form.username, &form.password).await?;
    info!(username = %response.username, "login accepted");
    sessions
        .establish(AccessToken::new(response.token), response.username)
        .await
}

/// Ends the session locally whether or not the server acknowledged it.
pub async fn logout(api: &dyn LanguagesApi, sessions: &SessionManager) -> Result<(), ClientError> {
    if let Some(session) = sessions.current().await {
        if let Err(err) = api.logout(&session.token).await {
            warn!(username = %session.username, "server logout failed: {err}");
        }
    }
    sessions.teardown().await
}

#[derive(Debug, Clone, PartialEq)]
pub enum DetailsState {
    Loaded(ProgrammingLanguage),
    NotFound,
    Failed(String),
}

impl DetailsState {
    pub fn message(&self) -> Option<&str> {
        match self {
            Self::Loaded(_) => None,
            Self::NotFound => Some(DETAILS_NOT_FOUND_MESSAGE),
            Self::Failed(message) => Some(message),
        }
    }
}

pub async fn load_details(
    api: &dyn LanguagesApi,
    token: &AccessToken,
    id: LanguageId,
) -> DetailsState {
    match api.get_language(token, id).await {
        Ok(language) => DetailsState::Loaded(language),
        Err(ClientError::NotFound) => DetailsState::NotFound,
        Err(err) => {
            warn!(language_id = id.0, "details request failed: {err}");
            DetailsState::Failed(DETAILS_FAILED_MESSAGE.to_string())
        }
    }
}

pub async fn load_for_edit(
    api: &dyn LanguagesApi,
    token: &AccessToken,
    id: LanguageId,
) -> Result<LanguageForm, ClientError> {
    let language = api.get_language(token, id).await?;
    Ok(LanguageForm::from_language(&language))
}

/// Nothing is sent unless the form validates.
pub async fn submit_new(
    api: &dyn LanguagesApi,
    token: &AccessToken,
    form: &LanguageForm,
) -> Result<ProgrammingLanguage, ClientError> {
    let draft = form.validate()?;
    let created = api.create_language(token, &draft).await?;
    info!(language_id = created.id.0, name = %created.name, "created programming language");
    Ok(created)
}

pub async fn submit_edit(
    api: &dyn LanguagesApi,
    token: &AccessToken,
    id: LanguageId,
    form: &LanguageForm,
) -> Result<ProgrammingLanguage, ClientError> {
    let draft = form.validate()?;
    let updated = api.update_language(token, id, &draft).await?;
    info!(language_id = id.0, "updated programming language");
    Ok(updated)
}

#[cfg(test)]
#[path = "tests/flows_tests.rs"]
mod tests;
