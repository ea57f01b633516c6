//! HTTP transport for [`SettlementBackend`].
//!
//! All calls are JSON `POST`s against a single backend host. Responses are
//! decoded into an [`Envelope`] first and the payload second, so a malformed
//! body surfaces as [`BackendError::Decode`] rather than a panic.

use async_trait::async_trait;
use reqwest::header::CONTENT_DISPOSITION;
use serde::Serialize;
use std::time::Duration;

use super::SettlementBackend;
use super::wire::{ArtifactRequest, Envelope, JobRequest, decode_jobs};
use crate::artifact::{Artifact, filename_from_disposition};
use crate::errors::BackendError;
use crate::job::{JobCode, SettlementDate, WorkflowJob};

const INIT_PATH: &str = "/settleTask/init";
const RUN_PATH: &str = "/settleTask/run";
const TASKS_PATH: &str = "/settleTask/tasks";
const DOWNLOAD_PATH: &str = "/file/downloadMultiple";

/// reqwest-backed client for the settlement backend.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: reqwest::Client,
    base_url: String,
}

impl HttpBackend {
    /// Build a client for `base_url`. With `timeout` unset the transport
    /// default applies.
    pub fn new(base_url: &str, timeout: Option<Duration>) -> Result<Self, BackendError> {
        let mut builder = reqwest::Client::builder().user_agent(concat!(
            "settle/",
            env!("CARGO_PKG_VERSION")
        ));
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(|source| BackendError::Transport {
            operation: "client",
            source,
        })?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn post_envelope<B: Serialize + ?Sized>(
        &self,
        operation: &'static str,
        path: &str,
        body: &B,
    ) -> Result<Envelope, BackendError> {
        let transport = |source| BackendError::Transport { operation, source };

        let resp = self
            .client
            .post(self.url(path))
            .json(body)
            .send()
            .await
            .map_err(transport)?;

        let status = resp.status();
        let bytes = resp.bytes().await.map_err(transport)?;

        serde_json::from_slice::<Envelope>(&bytes).map_err(|e| {
            if status.is_success() {
                BackendError::Decode {
                    operation,
                    message: e.to_string(),
                }
            } else {
                BackendError::Http {
                    operation,
                    status: status.as_u16(),
                }
            }
        })
    }
}

#[async_trait]
impl SettlementBackend for HttpBackend {
    async fn initiate_batch(&self, date: SettlementDate) -> Result<Vec<WorkflowJob>, BackendError> {
        let envelope = self
            .post_envelope("init", INIT_PATH, &JobRequest::all(date))
            .await?;
        decode_jobs("init", envelope.into_data("init")?)
    }

    async fn run_job(&self, date: SettlementDate, code: JobCode) -> Result<(), BackendError> {
        let envelope = self
            .post_envelope("run", RUN_PATH, &JobRequest::single(date, code))
            .await?;
        envelope.into_data("run").map(|_| ())
    }

    async fn list_jobs(&self, date: SettlementDate) -> Result<Vec<WorkflowJob>, BackendError> {
        let envelope = self
            .post_envelope("tasks", TASKS_PATH, &JobRequest::all(date))
            .await?;
        decode_jobs("tasks", envelope.into_data("tasks")?)
    }

    async fn fetch_artifact(&self, location: &str) -> Result<Artifact, BackendError> {
        let operation = "download";
        let transport = |source| BackendError::Transport { operation, source };

        let resp = self
            .client
            .post(self.url(DOWNLOAD_PATH))
            .json(&ArtifactRequest { location })
            .send()
            .await
            .map_err(transport)?;

        if !resp.status().is_success() {
            return Err(BackendError::Http {
                operation,
                status: resp.status().as_u16(),
            });
        }

        let file_name = resp
            .headers()
            .get(CONTENT_DISPOSITION)
            .and_then(|v| v.to_str().ok())
            .and_then(filename_from_disposition);
        let bytes = resp.bytes().await.map_err(transport)?;

        Ok(Artifact {
            file_name,
            bytes: bytes.to_vec(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_trailing_slash_is_trimmed() {
        let backend = HttpBackend::new("http://127.0.0.1:8088/", None).unwrap();
        assert_eq!(backend.base_url(), "http://127.0.0.1:8088");
        assert_eq!(backend.url(RUN_PATH), "http://127.0.0.1:8088/settleTask/run");
    }

    #[tokio::test]
    async fn test_unreachable_host_is_transport_error() {
        // Port 9 (discard) on localhost is closed on CI hosts.
        let backend =
            HttpBackend::new("http://127.0.0.1:9", Some(Duration::from_secs(2))).unwrap();
        let date: SettlementDate = "20251211".parse().unwrap();
        let err = backend.run_job(date, JobCode(0)).await.unwrap_err();
        assert!(err.is_transport());
        assert_eq!(err.operation(), "run");
    }
}
