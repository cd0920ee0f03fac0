use std::path::{Path, PathBuf};

use anyhow::{bail, Context as _, Result};
use opalview_api_client::ApiClient;
use opalview_core::{Credentials, CredentialsPatch};
use opalview_runtime_config::{
    config_path, credentials_path, OpalviewConfig, TenantSettings, CREDENTIALS_FILE_NAME,
};
use opalview_session::{FileSlot, LoginOptions, LoginSession, SessionPhase};

use crate::browser::BrowserOpener;

/// Everything a command needs: config, HTTP client, and the login session.
pub struct AppContext {
    pub config: OpalviewConfig,
    pub config_path: PathBuf,
    pub credentials_path: PathBuf,
    pub api: ApiClient,
    pub session: LoginSession,
}

impl AppContext {
    pub fn load(config_override: Option<&Path>) -> Result<Self> {
        let (config_path, credentials_path) = match config_override {
            Some(p) => {
                let slot = p
                    .parent()
                    .map(|dir| dir.join(CREDENTIALS_FILE_NAME))
                    .unwrap_or_else(|| PathBuf::from(CREDENTIALS_FILE_NAME));
                (p.to_path_buf(), slot)
            }
            None => (config_path()?, credentials_path()?),
        };
        let config = OpalviewConfig::load(&config_path)?;

        let mut api = ApiClient::new(config.http.timeout()).context("build HTTP client")?;
        if let Some(base) = config.http.endpoint_override.as_deref() {
            api = api.with_endpoint_override(base);
        }

        let session = LoginSession::restore(
            api.clone(),
            FileSlot::new(credentials_path.clone()),
            BrowserOpener,
            LoginOptions::from(&config.login),
        );
        session.set_credentials(seed_patch(&session.credentials(), &config.tenant));

        Ok(Self {
            config,
            config_path,
            credentials_path,
            api,
            session,
        })
    }

    /// Verify the stored token and fail unless it works. Never opens a
    /// browser; that is left to `opalview login`.
    pub async fn require_login(&self) -> Result<Credentials> {
        match self.session.verify().await {
            SessionPhase::Authenticated => Ok(self.session.credentials()),
            phase => {
                let reason = self
                    .session
                    .error()
                    .unwrap_or_else(|| phase.to_string());
                bail!("{reason} (run `opalview login`)")
            }
        }
    }
}

/// Fill fields the stored record lacks from the `[tenant]` config section.
pub fn seed_patch(creds: &Credentials, tenant: &TenantSettings) -> CredentialsPatch {
    fn pick(current: &str, seed: &str) -> Option<String> {
        (current.is_empty() && !seed.is_empty()).then(|| seed.to_string())
    }
    CredentialsPatch {
        tenant_id: pick(&creds.tenant_id, &tenant.id),
        tenant_site: pick(&creds.tenant_site, &tenant.site),
        email: pick(&creds.email, &tenant.email),
        ..CredentialsPatch::default()
    }
}
