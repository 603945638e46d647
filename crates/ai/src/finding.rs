use serde::{Deserialize, Serialize};

use designdiff_core::{
    Coordinates, DiscrepancyPriority, DiscrepancyStatus, DiscrepancyType,
};

/// One finding returned by a vision provider (or the fallback library).
///
/// This is the pre-persistence shape: it has no id and no comparison
/// reference yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisualDiscrepancy {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "type")]
    pub kind: DiscrepancyType,
    pub priority: DiscrepancyPriority,
    #[serde(default = "open_status")]
    pub status: DiscrepancyStatus,
    #[serde(default)]
    pub coordinates: Coordinates,
}

fn open_status() -> DiscrepancyStatus {
    DiscrepancyStatus::Open
}

impl VisualDiscrepancy {
    pub fn new(
        title: impl Into<String>,
        description: impl Into<String>,
        kind: DiscrepancyType,
        priority: DiscrepancyPriority,
        coordinates: Coordinates,
    ) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            kind,
            priority,
            status: DiscrepancyStatus::Open,
            coordinates,
        }
    }
}
