//! Hosted search index adapter speaking the Algolia REST API.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method, StatusCode, Url};

use crate::application::mirror::{SearchIndex, SearchIndexError};
use crate::config::{SearchCredentials, SearchSettings};
use crate::domain::search::SearchIndexEntry;

use super::error::InfraError;

const APP_ID_HEADER: &str = "X-Algolia-Application-Id";
const API_KEY_HEADER: &str = "X-Algolia-API-Key";
const MAX_ERROR_BODY: usize = 512;

#[derive(Clone)]
pub struct AlgoliaIndex {
    client: Client,
    base: Url,
    index_name: String,
    credentials: SearchCredentials,
}

impl AlgoliaIndex {
    pub fn new(
        base: Url,
        index_name: impl Into<String>,
        credentials: SearchCredentials,
        timeout: Duration,
    ) -> Result<Self, InfraError> {
        let client = Client::builder()
            .user_agent(concat!("topzonal/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .map_err(|err| InfraError::search(format!("failed to build HTTP client: {err}")))?;

        Ok(Self {
            client,
            base,
            index_name: index_name.into(),
            credentials,
        })
    }

    /// Build the adapter from settings; `None` when search is not configured.
    pub fn from_settings(settings: &SearchSettings) -> Result<Option<Self>, InfraError> {
        let Some(credentials) = settings.credentials.clone() else {
            return Ok(None);
        };

        let base = match settings.base_url.clone() {
            Some(base) => base,
            None => Url::parse(&format!("https://{}.algolia.net", credentials.app_id))
                .map_err(|err| InfraError::configuration(format!("search.app_id: {err}")))?,
        };

        Self::new(base, &settings.index_name, credentials, settings.timeout).map(Some)
    }

    fn object_url(&self, object_id: &str) -> Result<Url, SearchIndexError> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| SearchIndexError::Transport("search base URL cannot carry a path".into()))?
            .pop_if_empty()
            .extend(["1", "indexes", self.index_name.as_str(), object_id]);
        Ok(url)
    }

    async fn send(
        &self,
        method: Method,
        object_id: &str,
        body: Option<&SearchIndexEntry>,
    ) -> Result<StatusCode, SearchIndexError> {
        let url = self.object_url(object_id)?;
        let mut request = self
            .client
            .request(method, url)
            .header(APP_ID_HEADER, &self.credentials.app_id)
            .header(API_KEY_HEADER, &self.credentials.api_key);
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request
            .send()
            .await
            .map_err(|err| SearchIndexError::Transport(err.to_string()))?;
        let status = response.status();
        if status.is_success() || status == StatusCode::NOT_FOUND {
            return Ok(status);
        }

        let mut body = response.text().await.unwrap_or_default();
        if body.len() > MAX_ERROR_BODY {
            let cut = (0..=MAX_ERROR_BODY)
                .rev()
                .find(|index| body.is_char_boundary(*index))
                .unwrap_or(0);
            body.truncate(cut);
        }
        Err(SearchIndexError::Status {
            status: status.as_u16(),
            body,
        })
    }
}

#[async_trait]
impl SearchIndex for AlgoliaIndex {
    async fn save_object(&self, entry: &SearchIndexEntry) -> Result<(), SearchIndexError> {
        match self.send(Method::PUT, &entry.object_id, Some(entry)).await? {
            StatusCode::NOT_FOUND => Err(SearchIndexError::Status {
                status: StatusCode::NOT_FOUND.as_u16(),
                body: format!("index `{}` not found", self.index_name),
            }),
            _ => Ok(()),
        }
    }

    async fn delete_object(&self, object_id: &str) -> Result<(), SearchIndexError> {
        match self.send(Method::DELETE, object_id, None).await? {
            StatusCode::NOT_FOUND => Err(SearchIndexError::NotFound),
            _ => Ok(()),
        }
    }
}
