//! Tenant credentials and the readiness predicates derived from them.
//!
//! A [`Credentials`] record is everything the client needs to talk to a
//! tenant: where it lives (`tenant_id` + `tenant_site`), who is logging in
//! (`email`), the bearer token once issued, and the resolved user identity.
//!
//! The readiness predicates are strictly ordered:
//! `is_authenticated() ⇒ has_token() ⇒ is_addressable()`.

use serde::{Deserialize, Serialize};

/// Identity of the logged-in user, as reported by the identity endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserIdentity {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
}

/// Login information for one tenant. Persisted as JSON in the credential slot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Credentials {
    /// Customer id of the tenant, e.g. `137646103412`.
    #[serde(default, alias = "customer")]
    pub tenant_id: String,
    /// Base domain of the tenant / region, e.g. `observeinc.com` or
    /// `eu-1.observeinc.com`.
    #[serde(default, alias = "site")]
    pub tenant_site: String,
    #[serde(default)]
    pub email: String,
    /// Bearer token; empty means not authenticated.
    #[serde(default)]
    pub token: String,
    #[serde(default)]
    pub user: Option<UserIdentity>,
}

/// Partial update for [`Credentials`]. `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CredentialsPatch {
    pub tenant_id: Option<String>,
    pub tenant_site: Option<String>,
    pub email: Option<String>,
    pub token: Option<String>,
    pub user: Option<Option<UserIdentity>>,
}

impl CredentialsPatch {
    pub fn token(token: impl Into<String>) -> Self {
        Self {
            token: Some(token.into()),
            ..Self::default()
        }
    }

    pub fn user(user: UserIdentity) -> Self {
        Self {
            user: Some(Some(user)),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

impl Credentials {
    pub fn new(
        tenant_id: impl Into<String>,
        tenant_site: impl Into<String>,
        email: impl Into<String>,
    ) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            tenant_site: tenant_site.into(),
            email: email.into(),
            ..Self::default()
        }
    }

    /// Restore a record from persisted JSON text.
    ///
    /// Best-effort: anything unparsable yields an empty record.
    pub fn restore(text: &str) -> Self {
        match serde_json::from_str(text) {
            Ok(creds) => creds,
            Err(e) => {
                tracing::warn!("Ignoring unreadable persisted credentials: {e}");
                Self::default()
            }
        }
    }

    /// Serialize for the credential slot.
    pub fn to_json(&self) -> String {
        // Plain strings and options only; serialization cannot fail.
        serde_json::to_string(self).unwrap_or_default()
    }

    /// Enough is filled in to attempt login requests.
    pub fn is_addressable(&self) -> bool {
        !self.tenant_id.is_empty() && !self.tenant_site.is_empty() && !self.email.is_empty()
    }

    /// Enough is filled in to make authenticated requests.
    pub fn has_token(&self) -> bool {
        self.is_addressable() && !self.token.is_empty()
    }

    /// The token has been used successfully to resolve a user.
    pub fn is_authenticated(&self) -> bool {
        self.has_token() && self.user.as_ref().is_some_and(|u| !u.id.is_empty())
    }

    /// Base URL of the tenant, e.g. `https://137646103412.observeinc.com`.
    pub fn base_url(&self) -> String {
        format!("https://{}.{}", self.tenant_id, self.tenant_site)
    }

    /// Full URL for an API path on this tenant.
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url(), path)
    }

    /// Value for the `Authorization` header.
    pub fn authorization(&self) -> String {
        format!("Bearer {} {}", self.tenant_id, self.token)
    }

    pub fn apply(&mut self, patch: CredentialsPatch) {
        let CredentialsPatch {
            tenant_id,
            tenant_site,
            email,
            token,
            user,
        } = patch;
        if let Some(v) = tenant_id {
            self.tenant_id = v;
        }
        if let Some(v) = tenant_site {
            self.tenant_site = v;
        }
        if let Some(v) = email {
            self.email = v;
        }
        if let Some(v) = token {
            self.token = v;
        }
        if let Some(v) = user {
            self.user = v;
        }
    }
}
