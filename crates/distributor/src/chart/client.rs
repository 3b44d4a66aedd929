use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};

use super::ChartError;
use crate::target::ChartTarget;

/// A chart release to create or upgrade.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChartRelease {
    pub name: String,
    pub chart_name: String,
    pub chart_version: String,
    /// Rendered `values.yaml`.
    pub values: String,
}

/// Result of an ensure-release call.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EnsureOutcome {
    pub found: bool,
    #[serde(default)]
    pub detail: String,
}

/// Chart repository and deployment service of dedicated instances.
#[async_trait]
pub trait ChartClient: Send + Sync {
    async fn push_chart(
        &self,
        target: &ChartTarget,
        archive_name: &str,
        archive: Vec<u8>,
    ) -> Result<(), ChartError>;

    /// Install or upgrade a release. Returns once the service answered;
    /// rollout health is not awaited.
    async fn ensure_release(
        &self,
        target: &ChartTarget,
        release: &ChartRelease,
    ) -> Result<EnsureOutcome, ChartError>;

    /// Uninstall a release. Deleting a missing release succeeds.
    async fn delete_release(
        &self,
        target: &ChartTarget,
        release_name: &str,
    ) -> Result<(), ChartError>;
}

/// [`ChartClient`] speaking the deployment service's HTTP API.
#[derive(Debug, Clone)]
pub struct HttpChartClient {
    base_url: String,
    token: Option<String>,
    client: Client,
}

impl HttpChartClient {
    pub fn new(
        base_url: impl Into<String>,
        token: Option<String>,
        connect_timeout: Duration,
        request_timeout: Duration,
    ) -> Result<Self, ChartError> {
        let client = Client::builder()
            .connect_timeout(connect_timeout)
            .timeout(request_timeout)
            .build()
            .map_err(|e| ChartError::Unavailable(e.to_string()))?;
        let base_url = base_url.into().trim_end_matches('/').to_owned();
        Ok(Self {
            base_url,
            token,
            client,
        })
    }

    fn release_url(&self, target: &ChartTarget, name: &str) -> String {
        format!(
            "{}/api/v1/projects/{}/clusters/{}/namespaces/{}/releases/{name}",
            self.base_url, target.project, target.cluster, target.namespace
        )
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, ChartError> {
        self.authorize(request)
            .send()
            .await
            .map_err(|e| ChartError::Unavailable(e.to_string()))
    }
}

async fn rejected(response: Response) -> ChartError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
        ChartError::Unavailable(format!("status {status}: {body}"))
    } else {
        ChartError::Rejected {
            status: status.as_u16(),
            body,
        }
    }
}

#[async_trait]
impl ChartClient for HttpChartClient {
    async fn push_chart(
        &self,
        target: &ChartTarget,
        archive_name: &str,
        archive: Vec<u8>,
    ) -> Result<(), ChartError> {
        let url = format!("{}/api/v1/projects/{}/charts", self.base_url, target.project);
        let part = Part::bytes(archive).file_name(archive_name.to_owned());
        let form = Form::new().part("chart", part);
        let response = self.send(self.client.post(url).multipart(form)).await?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(rejected(response).await)
        }
    }

    async fn ensure_release(
        &self,
        target: &ChartTarget,
        release: &ChartRelease,
    ) -> Result<EnsureOutcome, ChartError> {
        let url = self.release_url(target, &release.name);
        let response = self.send(self.client.put(url).json(release)).await?;
        match response.status() {
            status if status.is_success() => response
                .json()
                .await
                .map_err(|e| ChartError::Unavailable(format!("undecodable response: {e}"))),
            StatusCode::NOT_FOUND => Ok(EnsureOutcome {
                found: false,
                detail: response.text().await.unwrap_or_default(),
            }),
            _ => Err(rejected(response).await),
        }
    }

    async fn delete_release(
        &self,
        target: &ChartTarget,
        release_name: &str,
    ) -> Result<(), ChartError> {
        let url = self.release_url(target, release_name);
        let response = self.send(self.client.delete(url)).await?;
        match response.status() {
            status if status.is_success() || status == StatusCode::NOT_FOUND => Ok(()),
            _ => Err(rejected(response).await),
        }
    }
}
