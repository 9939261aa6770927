//! `people` rows behind a hosted PostgREST endpoint (e.g. Supabase).
//!
//! Unlike the SQLite store there is no transaction spanning requests: a
//! cascading delete reads every row and then issues one batch delete.

use std::time::Duration;

use async_trait::async_trait;
use backon::{ExponentialBuilder, Retryable};
use db::{
    models::person::{Person, PersonDraft},
    store::{PersonStore, StoreError},
};
use forest::BuildPolicy;
use reqwest::{Client, Method, RequestBuilder, Response};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};
use url::Url;
use uuid::Uuid;

const PEOPLE_PATH: &str = "rest/v1/people";

pub struct HostedStore {
    http: Client,
    people_url: Url,
    key: SecretString,
    policy: BuildPolicy,
}

impl HostedStore {
    const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

    pub fn new(base_url: &Url, key: SecretString, policy: BuildPolicy) -> Result<Self, StoreError> {
        let http = Client::builder()
            .timeout(Self::REQUEST_TIMEOUT)
            .user_agent(concat!("family-tree/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| StoreError::Transport(e.to_string()))?;
        Ok(Self {
            http,
            people_url: people_url(base_url)?,
            key,
            policy,
        })
    }

    fn request(&self, method: Method, filter: Option<(&str, String)>) -> RequestBuilder {
        let mut url = self.people_url.clone();
        if let Some((column, condition)) = filter {
            url.query_pairs_mut().append_pair(column, &condition);
        }
        let key = self.key.expose_secret();
        self.http
            .request(method, url)
            .header("apikey", key)
            .header("Authorization", format!("Bearer {key}"))
    }

    async fn send_for_rows<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
    ) -> Result<Vec<T>, StoreError> {
        let response = request.send().await.map_err(map_reqwest_error)?;
        let response = check_status(response).await?;
        response
            .json::<Vec<T>>()
            .await
            .map_err(|e| StoreError::Serde(e.to_string()))
    }

    /// Reads are idempotent, so transient failures are retried.
    async fn fetch_rows(&self, filter: Option<(&str, String)>) -> Result<Vec<Person>, StoreError> {
        (|| async {
            let request = self
                .request(Method::GET, filter.clone())
                .query(&[("select", "*")]);
            self.send_for_rows(request).await
        })
        .retry(
            &ExponentialBuilder::default()
                .with_min_delay(Duration::from_millis(200))
                .with_max_delay(Duration::from_secs(5))
                .with_max_times(3)
                .with_jitter(),
        )
        .when(is_transient)
        .notify(|e, dur| {
            warn!(
                "Hosted store read failed, retrying after {:.2}s: {}",
                dur.as_secs_f64(),
                e
            )
        })
        .await
    }
}

#[async_trait]
impl PersonStore for HostedStore {
    fn backend(&self) -> &'static str {
        "hosted"
    }

    fn build_policy(&self) -> BuildPolicy {
        self.policy
    }

    async fn list(&self) -> Result<Vec<Person>, StoreError> {
        self.fetch_rows(None).await
    }

    async fn get(&self, id: Uuid) -> Result<Option<Person>, StoreError> {
        let rows = self.fetch_rows(Some(("id", eq_filter(id)))).await?;
        Ok(rows.into_iter().next())
    }

    async fn insert(&self, data: &PersonDraft) -> Result<Person, StoreError> {
        let request = self
            .request(Method::POST, None)
            .header("Prefer", "return=representation")
            .json(&[data]);
        let rows: Vec<Person> = self.send_for_rows(request).await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| StoreError::Serde("insert returned no rows".to_string()))
    }

    async fn update(&self, id: Uuid, data: &PersonDraft) -> Result<Option<Person>, StoreError> {
        let request = self
            .request(Method::PATCH, Some(("id", eq_filter(id))))
            .header("Prefer", "return=representation")
            .json(data);
        let rows: Vec<Person> = self.send_for_rows(request).await?;
        Ok(rows.into_iter().next())
    }

    async fn delete_many(&self, ids: &[Uuid]) -> Result<u64, StoreError> {
        if ids.is_empty() {
            return Ok(0);
        }
        let request = self
            .request(Method::DELETE, Some(("id", in_filter(ids))))
            .header("Prefer", "return=representation");
        let rows: Vec<serde_json::Value> = self.send_for_rows(request).await?;
        debug!(requested = ids.len(), deleted = rows.len(), "Hosted batch delete");
        Ok(rows.len() as u64)
    }
}

fn people_url(base_url: &Url) -> Result<Url, StoreError> {
    let mut base = base_url.clone();
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    base.join(PEOPLE_PATH)
        .map_err(|e| StoreError::Transport(format!("invalid store url: {e}")))
}

fn eq_filter(id: Uuid) -> String {
    format!("eq.{id}")
}

fn in_filter(ids: &[Uuid]) -> String {
    let joined = ids
        .iter()
        .map(Uuid::to_string)
        .collect::<Vec<_>>()
        .join(",");
    format!("in.({joined})")
}

async fn check_status(response: Response) -> Result<Response, StoreError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(StoreError::Http {
        status: status.as_u16(),
        body,
    })
}

fn map_reqwest_error(e: reqwest::Error) -> StoreError {
    StoreError::Transport(e.to_string())
}

fn is_transient(e: &StoreError) -> bool {
    match e {
        StoreError::Transport(_) => true,
        StoreError::Http { status, .. } => *status == 429 || (500..=599).contains(status),
        _ => false,
    }
}
