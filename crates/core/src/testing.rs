use crate::{Credentials, DatasetInfo, UserIdentity};

/// Addressable credentials for tenant `101` on `observe.test` (no token).
pub fn credentials() -> Credentials {
    Credentials::new("101", "observe.test", "analyst@example.com")
}

/// Addressable credentials carrying `token`.
pub fn credentials_with_token(token: &str) -> Credentials {
    Credentials {
        token: token.to_string(),
        ..credentials()
    }
}

pub fn user() -> UserIdentity {
    UserIdentity {
        id: "2001".to_string(),
        name: "Ada Analyst".to_string(),
    }
}

pub fn dataset(id: &str, name: &str) -> DatasetInfo {
    DatasetInfo::new(id, name)
}

/// Three-row NDJSON export body with a trailing newline.
pub fn export_body() -> String {
    [
        r#"{"timestamp":"1700000000000000000","host":"web-1","status":200,"latency":0.25}"#,
        r#"{"timestamp":"1700000001000000000","host":"web-2","status":500,"latency":1.5}"#,
        r#"{"timestamp":"1700000002000000000","host":"web-1","status":404}"#,
    ]
    .join("\n")
        + "\n"
}
