use serde::{Deserialize, Serialize};

/// Outcome of reconciling one unit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitSyncResult {
    pub unit_id: String,
    pub created: usize,
    pub updated: usize,
    pub cancelled: usize,
    /// Individual changes the store refused.
    pub errors: usize,
    /// Set when the unit could not be processed at all (feed or store unreachable).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl UnitSyncResult {
    pub fn new(unit_id: &str) -> Self {
        UnitSyncResult {
            unit_id: unit_id.to_string(),
            ..Default::default()
        }
    }

    pub fn failed(unit_id: &str, error: impl ToString) -> Self {
        UnitSyncResult {
            unit_id: unit_id.to_string(),
            error: Some(error.to_string()),
            ..Default::default()
        }
    }

    pub fn is_failure(&self) -> bool {
        self.error.is_some()
    }

    pub fn changes(&self) -> usize {
        self.created + self.updated + self.cancelled
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncSummary {
    pub units_processed: usize,
    pub units_failed: usize,
    pub total_created: usize,
    pub total_updated: usize,
    pub total_cancelled: usize,
    pub total_errors: usize,
    pub results: Vec<UnitSyncResult>,
}

impl SyncSummary {
    pub fn from_results(results: Vec<UnitSyncResult>) -> Self {
        SyncSummary {
            units_processed: results.len(),
            units_failed: results.iter().filter(|r| r.is_failure()).count(),
            total_created: results.iter().map(|r| r.created).sum(),
            total_updated: results.iter().map(|r| r.updated).sum(),
            total_cancelled: results.iter().map(|r| r.cancelled).sum(),
            total_errors: results.iter().map(|r| r.errors).sum(),
            results,
        }
    }
}
