use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use shared::{
    domain::{LanguageDraft, LanguageId, ProgrammingLanguage},
    error::ApiError,
    protocol::{BulkDeleteRequest, LoginRequest, LoginResponse, SearchSortRequest},
};
use tracing::{debug, warn};
use url::Url;

use crate::{AccessToken, ClientError, LanguagesApi};

const LANGUAGES_PATH: &str = "programming-languages";

/// `reqwest` implementation of [`LanguagesApi`].
pub struct HttpLanguagesApi {
    http: Client,
    base_url: Url,
}

impl HttpLanguagesApi {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ClientError> {
        let mut base_url = Url::parse(base_url.trim())
            .map_err(|err| ClientError::Config(format!("invalid api base url '{base_url}': {err}")))?;
        // Url::join drops the last segment unless the path ends with a slash.
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self { http, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url, ClientError> {
        self.base_url
            .join(path)
            .map_err(|err| ClientError::Config(format!("invalid endpoint path '{path}': {err}")))
    }

    fn language_endpoint(&self, id: LanguageId) -> Result<Url, ClientError> {
        self.endpoint(&format!("{LANGUAGES_PATH}/{}", id.0))
    }

    async fn send(request: RequestBuilder) -> Result<Response, ClientError> {
        let response = request.send().await?;
        Self::check(response).await
    }

    async fn check(response: Response) -> Result<Response, ClientError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ApiError>(&body)
            .map(|error| error.message)
            .unwrap_or_else(|_| status.to_string());
        debug!(status = status.as_u16(), %message, "api request rejected");

        Err(match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ClientError::Auth(message),
            StatusCode::NOT_FOUND => ClientError::NotFound,
            _ => ClientError::Network(format!("server responded {status}: {message}")),
        })
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ClientError> {
        response
            .json::<T>()
            .await
            .map_err(|err| ClientError::Network(format!("malformed response body: {err}")))
    }

    async fn send_json<T: DeserializeOwned>(request: RequestBuilder) -> Result<T, ClientError> {
        let response = Self::send(request).await?;
        Self::decode(response).await
    }
}

#[async_trait]
impl LanguagesApi for HttpLanguagesApi {
    async fn login(&self, username: &str, password: &str) -> Result<LoginResponse, ClientError> {
        let request = self.http.post(self.endpoint("login")?).json(&LoginRequest {
            username: username.to_string(),
            password: password.to_string(),
        });
        let response = request.send().await?;
        // Any 4xx from the login route means the credentials were not accepted.
        if response.status().is_client_error() {
            debug!(status = response.status().as_u16(), "login rejected");
            return Err(ClientError::Auth("Invalid credentials".into()));
        }
        let response = Self::check(response).await?;
        Self::decode(response).await
    }

    async fn logout(&self, token: &AccessToken) -> Result<(), ClientError> {
        let request = self
            .http
            .post(self.endpoint("logout")?)
            .bearer_auth(token.as_str())
            .json(&serde_json::json!({}));
        Self::send(request).await?;
        Ok(())
    }

    async fn list_languages(
        &self,
        token: &AccessToken,
    ) -> Result<Vec<ProgrammingLanguage>, ClientError> {
        let request = self
            .http
            .get(self.endpoint(LANGUAGES_PATH)?)
            .bearer_auth(token.as_str());
        Self::send_json(request).await
    }

    async fn get_language(
        &self,
        token: &AccessToken,
        id: LanguageId,
    ) -> Result<ProgrammingLanguage, ClientError> {
        let request = self
            .http
            .get(self.language_endpoint(id)?)
            .bearer_auth(token.as_str());
        Self::send_json(request).await
    }

    async fn search_languages(
        &self,
        token: &AccessToken,
        request: &SearchSortRequest,
    ) -> Result<Vec<ProgrammingLanguage>, ClientError> {
        let http_request = self
            .http
            .post(self.endpoint(&format!("{LANGUAGES_PATH}/search-sort"))?)
            .bearer_auth(token.as_str())
            .json(request);
        match Self::send_json(http_request).await {
            Err(ClientError::NotFound) => Ok(Vec::new()),
            other => other,
        }
    }

    async fn create_language(
        &self,
        token: &AccessToken,
        draft: &LanguageDraft,
    ) -> Result<ProgrammingLanguage, ClientError> {
        let request = self
            .http
            .post(self.endpoint(LANGUAGES_PATH)?)
            .bearer_auth(token.as_str())
            .json(draft);
        Self::send_json(request).await
    }

    async fn update_language(
        &self,
        token: &AccessToken,
        id: LanguageId,
        draft: &LanguageDraft,
    ) -> Result<ProgrammingLanguage, ClientError> {
        let request = self
            .http
            .put(self.language_endpoint(id)?)
            .bearer_auth(token.as_str())
            .json(draft);
        Self::send_json(request).await
    }

    async fn delete_language(
        &self,
        token: &AccessToken,
        id: LanguageId,
    ) -> Result<(), ClientError> {
        let request = self
            .http
            .delete(self.language_endpoint(id)?)
            .bearer_auth(token.as_str());
        Self::send(request).await?;
        Ok(())
    }

    async fn delete_languages(
        &self,
        token: &AccessToken,
        ids: &[LanguageId],
    ) -> Result<(), ClientError> {
        if ids.is_empty() {
            warn!("bulk delete called without ids; skipping request");
            return Ok(());
        }
        let request = self
            .http
            .delete(self.endpoint(LANGUAGES_PATH)?)
            .bearer_auth(token.as_str())
            .json(&BulkDeleteRequest { ids: ids.to_vec() });
        Self::send(request).await?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "tests/http_tests.rs"]
mod tests;
