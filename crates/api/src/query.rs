//! Export query payloads.
//!
//! A query is a list of OPAL stages. Each stage can read every bound dataset
//! plus the output of every stage listed before it:
//!
//! ```text
//! stages [A, B, C], datasets {x: ds1}
//!   A <- x
//!   B <- x, A
//!   C <- x, A, B
//! ```
//!
//! Visibility is purely positional, so the graph is acyclic by construction.

use chrono::{DateTime, SecondsFormat, Utc};
use opalview_core::DatasetInfo;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const DEFAULT_ROW_LIMIT: u32 = 1000;

/// One OPAL transform step as written by the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stage {
    pub id: String,
    pub pipeline: String,
}

impl Stage {
    pub fn new(id: impl Into<String>, pipeline: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            pipeline: pipeline.into(),
        }
    }
}

/// A named input of a wire stage: either a dataset or an earlier stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StageInput {
    #[serde(rename_all = "camelCase")]
    Dataset {
        input_name: String,
        dataset_id: String,
    },
    #[serde(rename_all = "camelCase")]
    Stage { input_name: String, stage_id: String },
}

impl StageInput {
    pub fn input_name(&self) -> &str {
        match self {
            Self::Dataset { input_name, .. } | Self::Stage { input_name, .. } => input_name,
        }
    }
}

/// A stage as sent to the export endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageSpec {
    #[serde(rename = "stageID")]
    pub stage_id: String,
    pub pipeline: String,
    pub input: Vec<StageInput>,
}

/// Chain `stages` over the dataset bindings.
pub fn build_stages(datasets: &BTreeMap<String, DatasetInfo>, stages: &[Stage]) -> Vec<StageSpec> {
    let mut visible: Vec<StageInput> = datasets
        .iter()
        .map(|(name, ds)| StageInput::Dataset {
            input_name: name.clone(),
            dataset_id: ds.id.clone(),
        })
        .collect();

    let mut specs = Vec::with_capacity(stages.len());
    for stage in stages {
        specs.push(StageSpec {
            stage_id: stage.id.clone(),
            pipeline: stage.pipeline.clone(),
            input: visible.clone(),
        });
        visible.push(StageInput::Stage {
            input_name: stage.id.clone(),
            stage_id: stage.id.clone(),
        });
    }
    specs
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryBody {
    pub stages: Vec<StageSpec>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Presentation {
    /// Row limit, sent as a decimal string.
    pub limit: String,
    pub linkify: bool,
}

impl Presentation {
    pub fn with_limit(limit: u32) -> Self {
        Self {
            limit: limit.to_string(),
            linkify: true,
        }
    }
}

impl Default for Presentation {
    fn default() -> Self {
        Self::with_limit(DEFAULT_ROW_LIMIT)
    }
}

/// Body of `POST /v1/meta/export/query`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportQueryRequest {
    pub query: QueryBody,
    pub presentation: Presentation,
}

impl ExportQueryRequest {
    pub fn new(
        datasets: &BTreeMap<String, DatasetInfo>,
        stages: &[Stage],
        row_limit: Option<u32>,
    ) -> Self {
        Self {
            query: QueryBody {
                stages: build_stages(datasets, stages),
            },
            presentation: Presentation::with_limit(row_limit.unwrap_or(DEFAULT_ROW_LIMIT)),
        }
    }
}

/// Time window of an export, sent as query-string parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryWindow {
    /// Relative window such as `20m` or `1h`.
    pub interval: Option<String>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
}

impl QueryWindow {
    pub fn interval(interval: impl Into<String>) -> Self {
        Self {
            interval: Some(interval.into()),
            ..Self::default()
        }
    }

    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(start) = self.start_time {
            pairs.push(("startTime", start.to_rfc3339_opts(SecondsFormat::Secs, true)));
        }
        if let Some(end) = self.end_time {
            pairs.push(("endTime", end.to_rfc3339_opts(SecondsFormat::Secs, true)));
        }
        if let Some(interval) = self.interval.as_deref().filter(|s| !s.is_empty()) {
            pairs.push(("interval", interval.to_string()));
        }
        pairs
    }
}
