use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;

use super::{ApiError, BackupApi};
use crate::backup::{
    AttachRequest, BackupStatus, Checkpoint, RestoreRequest, ScheduleRequest, SubmitResponse,
};
use crate::config::ApiConfig;
use crate::task::TaskStatusReport;

/// REST client for the stack management API.
pub struct HttpBackupApi {
    base_url: String,
    token: Option<String>,
    submit_timeout: Duration,
    request_timeout: Duration,
    poll_timeout: Duration,
    client: Client,
}

impl HttpBackupApi {
    /// Creates a client for the given base URL with default timeouts.
    ///
    /// # Arguments
    /// * `base_url` - The API base URL (e.g., "https://ops.example.com/api/v1")
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::from_config(&ApiConfig {
            base_url: base_url.into(),
            ..ApiConfig::default()
        })
    }

    /// Creates a client from the `[api]` config section.
    pub fn from_config(config: &ApiConfig) -> Self {
        Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            token: config.token.clone().filter(|t| !t.is_empty()),
            submit_timeout: config.submit_timeout(),
            request_timeout: config.request_timeout(),
            poll_timeout: config.poll_timeout(),
            client: Client::new(),
        }
    }

    /// Sets the bearer token sent with every request.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Overrides the timeout used for task polls.
    pub fn with_poll_timeout(mut self, timeout: Duration) -> Self {
        self.poll_timeout = timeout;
        self
    }

    fn stack_url(&self, stack_id: &str, path: &str) -> String {
        format!("{}/stacks/{}/backup/{}", self.base_url, stack_id, path)
    }

    fn authorize(&self, req: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }

    async fn send(&self, req: RequestBuilder, timeout: Duration) -> Result<Response, ApiError> {
        let response = self.authorize(req).timeout(timeout).send().await?;
        let status = response.status();

        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ApiError::Status {
                status: status.as_u16(),
                message,
            });
        }

        Ok(response)
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        req: RequestBuilder,
        timeout: Duration,
    ) -> Result<T, ApiError> {
        let response = self.send(req, timeout).await?;
        Ok(response.json().await?)
    }

    async fn submit(&self, req: RequestBuilder) -> Result<String, ApiError> {
        let body: SubmitResponse = self.send_json(req, self.submit_timeout).await?;
        if body.task_id.is_empty() {
            return Err(ApiError::ParseError("submit response has an empty task_id".into()));
        }
        Ok(body.task_id)
    }
}

#[async_trait]
impl BackupApi for HttpBackupApi {
    async fn backup_status(&self, stack_id: &str) -> Result<BackupStatus, ApiError> {
        let req = self.client.get(self.stack_url(stack_id, "status"));
        self.send_json(req, self.request_timeout).await
    }

    async fn list_checkpoints(
        &self,
        stack_id: &str,
        limit: usize,
    ) -> Result<Vec<Checkpoint>, ApiError> {
        let req = self
            .client
            .get(self.stack_url(stack_id, "checkpoints"))
            .query(&[("limit", limit)]);
        self.send_json(req, self.request_timeout).await
    }

    async fn create_snapshot(&self, stack_id: &str) -> Result<String, ApiError> {
        let req = self
            .client
            .post(self.stack_url(stack_id, "snapshot"))
            .json(&serde_json::json!({}));
        self.submit(req).await
    }

    async fn restore(&self, stack_id: &str, request: &RestoreRequest) -> Result<String, ApiError> {
        let req = self.client.post(self.stack_url(stack_id, "restore")).json(request);
        self.submit(req).await
    }

    async fn configure_schedule(
        &self,
        stack_id: &str,
        request: &ScheduleRequest,
    ) -> Result<(), ApiError> {
        let req = self.client.post(self.stack_url(stack_id, "configure")).json(request);
        self.send(req, self.submit_timeout).await?;
        Ok(())
    }

    async fn attach(&self, stack_id: &str, request: &AttachRequest) -> Result<String, ApiError> {
        let req = self.client.post(self.stack_url(stack_id, "attach")).json(request);
        self.submit(req).await
    }

    async fn export_pv_pvc(&self, stack_id: &str) -> Result<Vec<u8>, ApiError> {
        let req = self.client.post(self.stack_url(stack_id, "pv-pvc/export"));
        let response = self.send(req, self.submit_timeout).await?;
        Ok(response.bytes().await?.to_vec())
    }

    async fn task_status(&self, task_id: &str) -> Result<TaskStatusReport, ApiError> {
        let req = self.client.get(format!("{}/tasks/{}", self.base_url, task_id));
        self.send_json(req, self.poll_timeout).await
    }
}
