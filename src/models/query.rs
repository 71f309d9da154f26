use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Tabular result of a bounded query execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResult {
    pub columns: Vec<String>,
    /// Row-major scalar values; absent driver values become JSON null.
    pub rows: Vec<Vec<Value>>,
    /// Count of rows actually returned (after the cap).
    pub row_count: usize,
    /// True when at least one more row existed beyond the cap.
    pub truncated: bool,
    /// Measured around statement execution and the capped read loop only;
    /// connection-open latency is excluded.
    pub execution_time_ms: u64,
}

#[derive(Debug, Deserialize)]
pub struct QueryRequest {
    pub query: String,
    #[serde(default)]
    pub max_rows: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct SampleParams {
    #[serde(default)]
    pub schema: Option<String>,
    #[serde(default)]
    pub max_rows: Option<usize>,
}
