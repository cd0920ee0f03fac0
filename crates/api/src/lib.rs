//! Request/response types for the tenant HTTP API.
//!
//! This crate is the single place where wire shapes are declared. It performs
//! no I/O; `opalview-api-client` sends these over HTTP.

use serde::{Deserialize, Serialize};

pub mod query;

pub use opalview_core::{Credentials, DatasetInfo, UserIdentity};
pub use query::{ExportQueryRequest, Presentation, QueryWindow, Stage, StageInput, StageSpec};

// ─── Paths ───────────────────────────────────────────────────────────────────

pub const DELEGATED_LOGIN_PATH: &str = "/v1/login/delegated";
pub const META_PATH: &str = "/v1/meta";
pub const DATASET_PATH: &str = "/v1/dataset";
pub const EXPORT_QUERY_PATH: &str = "/v1/meta/export/query";

pub const NDJSON_CONTENT_TYPE: &str = "application/x-ndjson";

/// Path polled for the outcome of a delegated login.
pub fn delegated_login_status_path(server_token: &str) -> String {
    format!(
        "{DELEGATED_LOGIN_PATH}/{}",
        urlencoding::encode(server_token)
    )
}

// ─── Delegated login ─────────────────────────────────────────────────────────

/// Body of `POST /v1/login/delegated`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DelegatedLoginRequest {
    pub user_email: String,
    /// Client-chosen nonce separating parallel login attempts.
    pub client_token: String,
    pub integration: String,
}

/// Response of `POST /v1/login/delegated`. On success `url` and
/// `server_token` are set; on failure only `message`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DelegatedLoginResponse {
    #[serde(default)]
    pub ok: Option<bool>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub server_token: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Response of `GET /v1/login/delegated/{serverToken}`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DelegatedLoginStatus {
    #[serde(default)]
    pub settled: bool,
    #[serde(default)]
    pub access_key: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Outcome of one poll, with the "settled" flag and key folded together.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    Unsettled,
    Rejected(Option<String>),
    Accepted(String),
}

impl DelegatedLoginStatus {
    pub fn outcome(self) -> PollOutcome {
        if !self.settled {
            return PollOutcome::Unsettled;
        }
        match self.access_key.filter(|k| !k.is_empty()) {
            Some(key) => PollOutcome::Accepted(key),
            None => PollOutcome::Rejected(self.message.filter(|m| !m.is_empty())),
        }
    }
}

// ─── GraphQL (identity) ──────────────────────────────────────────────────────

/// Resolves the user behind the bearer token.
pub const CURRENT_USER_QUERY: &str = "query { currentUser { id name:label } }";

/// Body of `POST /v1/meta`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphQlRequest {
    pub query: String,
    #[serde(default)]
    pub variables: Option<serde_json::Value>,
}

impl GraphQlRequest {
    pub fn current_user() -> Self {
        Self {
            query: CURRENT_USER_QUERY.to_string(),
            variables: None,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CurrentUserResponse {
    #[serde(default)]
    pub data: Option<CurrentUserData>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentUserData {
    #[serde(default)]
    pub current_user: Option<UserIdentity>,
}

impl CurrentUserResponse {
    pub fn into_user(self) -> Option<UserIdentity> {
        self.data.and_then(|d| d.current_user)
    }
}

// ─── Datasets ────────────────────────────────────────────────────────────────

/// Response of `GET /v1/dataset`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DatasetListResponse {
    #[serde(default)]
    pub data: Option<Vec<DatasetEntry>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatasetEntry {
    pub meta: DatasetMeta,
    pub config: DatasetConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatasetMeta {
    pub id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatasetConfig {
    pub name: String,
}

impl DatasetListResponse {
    /// Flatten into descriptors sorted case-insensitively by name.
    pub fn into_datasets(self) -> Vec<DatasetInfo> {
        let mut list: Vec<DatasetInfo> = self
            .data
            .unwrap_or_default()
            .into_iter()
            .map(|e| DatasetInfo::new(e.meta.id, e.config.name))
            .collect();
        opalview_core::sort_datasets(&mut list);
        list
    }
}

// ─── Errors ──────────────────────────────────────────────────────────────────

/// JSON error shape `{ "message": "..." }` used by error responses.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub message: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delegated_request_is_camel_case() {
        let body = serde_json::to_value(DelegatedLoginRequest {
            user_email: "a@b.c".into(),
            client_token: "nonce".into(),
            integration: "observe-tool-abdaf0".into(),
        })
        .unwrap();
        assert_eq!(
            body,
            serde_json::json!({
                "userEmail": "a@b.c",
                "clientToken": "nonce",
                "integration": "observe-tool-abdaf0",
            })
        );
    }

    #[test]
    fn poll_outcomes() {
        let status: DelegatedLoginStatus = serde_json::from_str(r#"{"settled":false}"#).unwrap();
        assert_eq!(status.outcome(), PollOutcome::Unsettled);

        let status: DelegatedLoginStatus =
            serde_json::from_str(r#"{"settled":true,"message":"denied"}"#).unwrap();
        assert_eq!(status.outcome(), PollOutcome::Rejected(Some("denied".into())));

        let status: DelegatedLoginStatus =
            serde_json::from_str(r#"{"settled":true,"accessKey":""}"#).unwrap();
        assert_eq!(status.outcome(), PollOutcome::Rejected(None));

        let status: DelegatedLoginStatus =
            serde_json::from_str(r#"{"settled":true,"accessKey":"k"}"#).unwrap();
        assert_eq!(status.outcome(), PollOutcome::Accepted("k".into()));
    }

    #[test]
    fn status_path_escapes_token() {
        assert_eq!(
            delegated_login_status_path("a/b c"),
            "/v1/login/delegated/a%2Fb%20c"
        );
    }

    #[test]
    fn current_user_extraction() {
        let resp: CurrentUserResponse =
            serde_json::from_str(r#"{"data":{"currentUser":{"id":"7","name":"Ann"}}}"#).unwrap();
        assert_eq!(resp.into_user().unwrap().name, "Ann");

        let resp: CurrentUserResponse =
            serde_json::from_str(r#"{"errors":[{"message":"unauthorized"}]}"#).unwrap();
        assert!(resp.into_user().is_none());
    }

    #[test]
    fn dataset_list_is_sorted() {
        let resp: DatasetListResponse = serde_json::from_str(
            r#"{"data":[
                {"meta":{"id":"3"},"config":{"name":"zeta"}},
                {"meta":{"id":"1"},"config":{"name":"Alpha"}},
                {"meta":{"id":"2"},"config":{"name":"beta"}}
            ]}"#,
        )
        .unwrap();
        let names: Vec<_> = resp.into_datasets().into_iter().map(|d| d.name).collect();
        assert_eq!(names, ["Alpha", "beta", "zeta"]);

        let empty: DatasetListResponse = serde_json::from_str("{}").unwrap();
        assert!(empty.into_datasets().is_empty());
    }
}
