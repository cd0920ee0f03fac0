//! Running export queries with at most one in flight.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use opalview_api::{ExportQueryRequest, QueryWindow, Stage};
use opalview_api_client::ApiClient;
use opalview_core::{Credentials, DatasetInfo, DatasetTable};
use tokio::sync::watch;
use tracing::debug;

use crate::observers::{Observers, SubscriptionId};

/// Everything needed to run one query.
#[derive(Debug, Clone, Default)]
pub struct QueryParams {
    /// Input name → dataset, visible to every stage.
    pub datasets: BTreeMap<String, DatasetInfo>,
    pub stages: Vec<Stage>,
    pub window: QueryWindow,
    pub row_limit: Option<u32>,
}

impl QueryParams {
    /// One stage named `query` over a single dataset bound as `input`.
    pub fn single(input: &str, dataset: DatasetInfo, pipeline: &str) -> Self {
        Self {
            datasets: BTreeMap::from([(input.to_string(), dataset)]),
            stages: vec![Stage::new("query", pipeline)],
            ..Self::default()
        }
    }
}

struct InFlight {
    generation: u64,
    cancel: watch::Sender<bool>,
}

/// In-flight handle and published result, under one lock. A superseded query
/// never overwrites a newer one's result.
#[derive(Default)]
struct RunnerState {
    in_flight: Option<InFlight>,
    result: Option<DatasetTable>,
}

/// Issues export queries and holds the latest result.
///
/// Starting a query cancels the one in flight, so results always match the
/// most recent request. A cancelled query publishes nothing.
pub struct QueryRunner {
    api: ApiClient,
    generation: AtomicU64,
    state: Mutex<RunnerState>,
    observers: Observers<Option<DatasetTable>>,
}

impl QueryRunner {
    pub fn new(api: ApiClient) -> Self {
        Self {
            api,
            generation: AtomicU64::new(0),
            state: Mutex::new(RunnerState::default()),
            observers: Observers::default(),
        }
    }

    /// Latest published result; `None` before the first query or after
    /// [`clear`](Self::clear).
    pub fn result(&self) -> Option<DatasetTable> {
        lock(&self.state).result.clone()
    }

    pub fn subscribe(
        &self,
        observer: impl Fn(&Option<DatasetTable>) + Send + Sync + 'static,
    ) -> SubscriptionId {
        self.observers.subscribe(observer)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.observers.unsubscribe(id)
    }

    /// Run a query. Returns `None` if a newer query (or [`clear`](Self::clear))
    /// superseded this one before it finished.
    pub async fn run(&self, creds: &Credentials, params: &QueryParams) -> Option<DatasetTable> {
        let (generation, mut cancelled) = self.begin();

        let req = ExportQueryRequest::new(&params.datasets, &params.stages, params.row_limit);
        let outcome = tokio::select! {
            res = self.api.export_query(creds, &req, &params.window) => Some(res),
            _ = cancelled.changed() => None,
        };
        let Some(res) = outcome else {
            debug!(generation, "query cancelled");
            return None;
        };

        let table = res.unwrap_or_else(|e| DatasetTable::Error(e.to_string()));
        if !self.finish(generation, &table) {
            debug!(generation, "query superseded");
            return None;
        }
        self.observers.notify(&Some(table.clone()));
        Some(table)
    }

    /// Cancel any in-flight query and drop the current result.
    pub fn clear(&self) {
        {
            let mut state = lock(&self.state);
            if let Some(prev) = state.in_flight.take() {
                let _ = prev.cancel.send(true);
            }
            state.result = None;
        }
        self.observers.notify(&None);
    }

    /// Register a new query as current and publish `Running`.
    fn begin(&self) -> (u64, watch::Receiver<bool>) {
        let generation = self.generation.fetch_add(1, Ordering::Relaxed) + 1;
        let (cancel, rx) = watch::channel(false);
        {
            let mut state = lock(&self.state);
            if let Some(prev) = state.in_flight.replace(InFlight { generation, cancel }) {
                debug!(generation = prev.generation, "cancelling previous query");
                let _ = prev.cancel.send(true);
            }
            state.result = Some(DatasetTable::Running);
        }
        self.observers.notify(&Some(DatasetTable::Running));
        (generation, rx)
    }

    /// Store `table` if `generation` is still the current query.
    fn finish(&self, generation: u64, table: &DatasetTable) -> bool {
        let mut state = lock(&self.state);
        match state.in_flight.as_ref() {
            Some(cur) if cur.generation == generation => {
                state.in_flight = None;
                state.result = Some(table.clone());
                true
            }
            _ => false,
        }
    }
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}
