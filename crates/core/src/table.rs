//! Tabular query results.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Inferred type of a result column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnType {
    Bool,
    Int64,
    Float64,
    String,
    Timestamp,
    Object,
    Array,
}

impl ColumnType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::Int64 => "int64",
            Self::Float64 => "float64",
            Self::String => "string",
            Self::Timestamp => "timestamp",
            Self::Object => "object",
            Self::Array => "array",
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Self::Int64 | Self::Float64)
    }
}

impl std::fmt::Display for ColumnType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    #[serde(rename = "type")]
    pub column_type: ColumnType,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetSchema {
    pub columns: Vec<Column>,
}

impl DatasetSchema {
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }
}

/// Result of running a query. Exactly one state is meaningful at a time.
#[derive(Debug, Clone, PartialEq)]
pub enum DatasetTable {
    /// Query in flight, no data yet.
    Running,
    Error(String),
    Ready {
        schema: DatasetSchema,
        /// Each row has one value per schema column, in schema order.
        rows: Vec<Vec<Value>>,
    },
}

impl DatasetTable {
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error(message.into())
    }

    pub fn is_running(&self) -> bool {
        matches!(self, Self::Running)
    }

    pub fn error_message(&self) -> Option<&str> {
        match self {
            Self::Error(msg) => Some(msg),
            _ => None,
        }
    }

    pub fn schema(&self) -> Option<&DatasetSchema> {
        match self {
            Self::Ready { schema, .. } => Some(schema),
            _ => None,
        }
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        match self {
            Self::Ready { rows, .. } => rows,
            _ => &[],
        }
    }
}
