use std::time::Duration;

use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use tracing::debug;

use opalview_api::*;
use opalview_core::{decode_response, DatasetTable, RawResponse};

use crate::ClientError;

type Result<T> = std::result::Result<T, ClientError>;

/// Typed HTTP client for one or more tenants.
///
/// Every call takes the [`Credentials`] it acts for; the client itself holds
/// no login state. Tenant URLs are `https://{tenant_id}.{tenant_site}`, unless
/// an endpoint override is set (proxies, tests).
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: reqwest::Client,
    endpoint_override: Option<String>,
}

impl ApiClient {
    /// Create a new client with the given request timeout.
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(client))
    }

    /// Create from an existing `reqwest::Client`.
    pub fn with_client(client: reqwest::Client) -> Self {
        Self {
            client,
            endpoint_override: None,
        }
    }

    /// Send every request to `base_url` instead of the tenant's own host.
    pub fn with_endpoint_override(mut self, base_url: &str) -> Self {
        self.endpoint_override = Some(base_url.trim_end_matches('/').to_string());
        self
    }

    pub fn endpoint_override(&self) -> Option<&str> {
        self.endpoint_override.as_deref()
    }

    fn url(&self, creds: &Credentials, path: &str) -> String {
        match &self.endpoint_override {
            Some(base) => format!("{base}{path}"),
            None => creds.url(path),
        }
    }

    // ── Delegated login ───────────────────────────────────────────────────

    /// Start a delegated login. The response is returned as-is; callers
    /// decide what a missing `url` means.
    pub async fn start_delegated_login(
        &self,
        creds: &Credentials,
        req: &DelegatedLoginRequest,
    ) -> Result<DelegatedLoginResponse> {
        let url = self.url(creds, DELEGATED_LOGIN_PATH);
        debug!(%url, "starting delegated login");
        let resp = self.client.post(&url).json(req).send().await?;
        read_json(resp, DELEGATED_LOGIN_PATH).await
    }

    /// Check whether a delegated login has settled. The server long-polls a
    /// little, so this may take a moment to return.
    pub async fn delegated_login_status(
        &self,
        creds: &Credentials,
        server_token: &str,
    ) -> Result<DelegatedLoginStatus> {
        let path = delegated_login_status_path(server_token);
        let resp = self.client.get(self.url(creds, &path)).send().await?;
        read_json(resp, DELEGATED_LOGIN_PATH).await
    }

    // ── Identity ──────────────────────────────────────────────────────────

    /// Resolve the user behind `creds.token`. `Ok(None)` means the token was
    /// not accepted.
    pub async fn current_user(&self, creds: &Credentials) -> Result<Option<UserIdentity>> {
        let resp = self
            .client
            .post(self.url(creds, META_PATH))
            .header(AUTHORIZATION, creds.authorization())
            .json(&GraphQlRequest::current_user())
            .send()
            .await?;
        if matches!(resp.status(), StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) {
            debug!(status = %resp.status(), "token rejected");
            return Ok(None);
        }
        let body: CurrentUserResponse = read_json(resp, META_PATH).await?;
        Ok(body.into_user().filter(|u| !u.id.is_empty()))
    }

    // ── Datasets ──────────────────────────────────────────────────────────

    /// All datasets visible to the user, sorted by name (case-insensitive).
    pub async fn list_datasets(&self, creds: &Credentials) -> Result<Vec<DatasetInfo>> {
        let resp = self
            .client
            .get(self.url(creds, DATASET_PATH))
            .header(ACCEPT, "application/json")
            .header(AUTHORIZATION, creds.authorization())
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ClientError::Status {
                status: status.as_u16(),
                body,
            });
        }
        let list: DatasetListResponse = read_json(resp, DATASET_PATH).await?;
        let datasets = list.into_datasets();
        debug!(count = datasets.len(), "listed datasets");
        Ok(datasets)
    }

    // ── Queries ───────────────────────────────────────────────────────────

    /// Run an export query. HTTP-level failures are folded into
    /// [`DatasetTable::Error`]; only transport failures are `Err`.
    pub async fn export_query(
        &self,
        creds: &Credentials,
        req: &ExportQueryRequest,
        window: &QueryWindow,
    ) -> Result<DatasetTable> {
        let resp = self
            .client
            .post(self.url(creds, EXPORT_QUERY_PATH))
            .query(&window.query_pairs())
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, NDJSON_CONTENT_TYPE)
            .header(AUTHORIZATION, creds.authorization())
            .json(req)
            .send()
            .await?;

        let status = resp.status();
        let content_type = resp
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);
        let body = resp.text().await?;
        debug!(%status, bytes = body.len(), "export response");

        Ok(decode_response(RawResponse {
            status: status.as_u16(),
            reason: status.canonical_reason().unwrap_or(""),
            content_type: content_type.as_deref(),
            body: &body,
        }))
    }
}

/// Parse a JSON body regardless of status. A non-JSON body on a failed status
/// becomes [`ClientError::Status`].
async fn read_json<T: DeserializeOwned>(resp: reqwest::Response, path: &str) -> Result<T> {
    let status = resp.status();
    let body = resp.text().await?;
    match serde_json::from_str(&body) {
        Ok(value) => Ok(value),
        Err(_) if !status.is_success() => Err(ClientError::Status {
            status: status.as_u16(),
            body,
        }),
        Err(source) => Err(ClientError::Decode {
            path: path.to_string(),
            source,
        }),
    }
}
