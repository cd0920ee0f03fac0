use std::sync::{Mutex, MutexGuard, PoisonError};

use opalview_api_client::{ApiClient, ClientError};
use opalview_core::{filter_datasets, Credentials, DatasetInfo};

use crate::login::{LoginSession, SessionPhase};
use crate::observers::{Observers, SubscriptionId};

/// Dataset list of the logged-in user.
///
/// Replaced wholesale on every refresh, never patched.
pub struct DatasetCatalog {
    api: ApiClient,
    datasets: Mutex<Vec<DatasetInfo>>,
    observers: Observers<Vec<DatasetInfo>>,
}

impl DatasetCatalog {
    pub fn new(api: ApiClient) -> Self {
        Self {
            api,
            datasets: Mutex::new(Vec::new()),
            observers: Observers::default(),
        }
    }

    pub fn datasets(&self) -> Vec<DatasetInfo> {
        self.lock().clone()
    }

    pub fn subscribe(
        &self,
        observer: impl Fn(&Vec<DatasetInfo>) + Send + Sync + 'static,
    ) -> SubscriptionId {
        self.observers.subscribe(observer)
    }

    /// Reload for `phase`: fetch when authenticated, empty otherwise. A failed
    /// fetch also leaves the list empty.
    ///
    /// The catalog does not watch the session. Call this (or
    /// [`refresh_from`](Self::refresh_from)) on every
    /// [`SessionEvent::PhaseChanged`](crate::SessionEvent::PhaseChanged).
    pub async fn refresh(
        &self,
        creds: &Credentials,
        phase: SessionPhase,
    ) -> Result<usize, ClientError> {
        if phase != SessionPhase::Authenticated {
            self.replace(Vec::new());
            return Ok(0);
        }
        match self.api.list_datasets(creds).await {
            Ok(list) => {
                let count = list.len();
                self.replace(list);
                Ok(count)
            }
            Err(e) => {
                self.replace(Vec::new());
                Err(e)
            }
        }
    }

    /// [`refresh`](Self::refresh) with the session's current phase and
    /// credentials.
    pub async fn refresh_from(&self, session: &LoginSession) -> Result<usize, ClientError> {
        self.refresh(&session.credentials(), session.phase()).await
    }

    /// Match on exact id first, then on case-insensitive name.
    pub fn find(&self, id_or_name: &str) -> Option<DatasetInfo> {
        let datasets = self.lock();
        datasets
            .iter()
            .find(|d| d.id == id_or_name)
            .or_else(|| {
                datasets
                    .iter()
                    .find(|d| d.name.eq_ignore_ascii_case(id_or_name))
            })
            .cloned()
    }

    pub fn filter(&self, needle: &str) -> Vec<DatasetInfo> {
        let datasets = self.lock();
        filter_datasets(&datasets, needle)
            .into_iter()
            .cloned()
            .collect()
    }

    fn replace(&self, list: Vec<DatasetInfo>) {
        *self.lock() = list.clone();
        self.observers.notify(&list);
    }

    fn lock(&self) -> MutexGuard<'_, Vec<DatasetInfo>> {
        self.datasets.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
