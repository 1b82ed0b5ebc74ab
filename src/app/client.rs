use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, instrument};
use url::Url;

use super::error::TransportError;
use super::types::{Filter, LabelSubmission, QueueItem, QueuePage};

const QUEUE_PATH: [&str; 2] = ["review", "image-queries"];

#[async_trait]
pub trait ReviewApi: Send + Sync {
    async fn list_queue(&self, filter: &Filter) -> Result<QueuePage, TransportError>;

    async fn get_item(&self, id: &str) -> Result<QueueItem, TransportError>;

    async fn submit_label(
        &self,
        id: &str,
        submission: &LabelSubmission,
    ) -> Result<QueueItem, TransportError>;
}

#[derive(Debug, Clone)]
pub struct QueryClient {
    http: reqwest::Client,
    base: Url,
}

impl QueryClient {
    pub fn new(api_base: &str, timeout: Option<Duration>) -> anyhow::Result<Self> {
        let base = Url::parse(api_base.trim())
            .with_context(|| format!("invalid API base URL {api_base:?}"))?;
        if base.cannot_be_a_base() {
            anyhow::bail!("API base URL {api_base:?} cannot carry a path");
        }

        let mut builder =
            reqwest::Client::builder().user_agent(concat!("reviewq/", env!("CARGO_PKG_VERSION")));
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build().context("failed to build HTTP client")?;

        Ok(Self { http, base })
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    pub fn endpoint(&self, segments: &[&str], query: &[(&str, String)]) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        if !query.is_empty() {
            url.query_pairs_mut()
                .extend_pairs(query.iter().map(|(key, value)| (*key, value.as_str())));
        }
        url
    }

    pub async fn request(
        &self,
        method: Method,
        segments: &[&str],
        query: &[(&str, String)],
        body: Option<&Value>,
    ) -> Result<Value, TransportError> {
        let url = self.endpoint(segments, query);
        debug!(%method, %url, has_body = body.is_some(), "sending request");

        let mut request = self
            .http
            .request(method, url)
            .header(ACCEPT, "application/json");
        if let Some(body) = body {
            let bytes =
                serde_json::to_vec(body).map_err(|err| TransportError::Decode(err.to_string()))?;
            request = request.header(CONTENT_TYPE, "application/json").body(bytes);
        }

        let response = request
            .send()
            .await
            .map_err(|err| TransportError::Network(err.to_string()))?;
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|err| TransportError::Network(err.to_string()))?;

        if !status.is_success() {
            return Err(TransportError::from_status(
                status.as_u16(),
                status.canonical_reason(),
                text,
            ));
        }
        if status == StatusCode::NO_CONTENT || text.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&text)
            .map_err(|err| TransportError::Decode(format!("invalid JSON body: {err}")))
    }
}

pub(crate) fn decode<T: DeserializeOwned>(value: Value) -> Result<T, TransportError> {
    serde_json::from_value(value).map_err(|err| TransportError::Decode(err.to_string()))
}

#[async_trait]
impl ReviewApi for QueryClient {
    #[instrument(skip(self), fields(offset = filter.offset, limit = filter.limit))]
    async fn list_queue(&self, filter: &Filter) -> Result<QueuePage, TransportError> {
        let value = self
            .request(Method::GET, &QUEUE_PATH, &filter.query_pairs(), None)
            .await?;
        decode(value)
    }

    #[instrument(skip(self))]
    async fn get_item(&self, id: &str) -> Result<QueueItem, TransportError> {
        let value = self
            .request(Method::GET, &[QUEUE_PATH[0], QUEUE_PATH[1], id], &[], None)
            .await?;
        decode(value)
    }

    #[instrument(skip(self, submission), fields(label = %submission.label))]
    async fn submit_label(
        &self,
        id: &str,
        submission: &LabelSubmission,
    ) -> Result<QueueItem, TransportError> {
        let body = serde_json::to_value(submission)
            .map_err(|err| TransportError::Decode(err.to_string()))?;
        let value = self
            .request(
                Method::POST,
                &[QUEUE_PATH[0], QUEUE_PATH[1], id, "label"],
                &[],
                Some(&body),
            )
            .await?;
        decode(value)
    }
}
