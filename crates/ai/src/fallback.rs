//! Static, non-AI discrepancy library used when no provider can answer.
//!
//! The list is versioned data (`data/fallback_v1.json`), not code. Its size is
//! not part of any contract: deployments can replace it with their own file,
//! including an empty one.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use designdiff_core::DiscrepancyStatus;

use crate::finding::VisualDiscrepancy;

const BUILTIN: &str = include_str!("../data/fallback_v1.json");

#[derive(Debug, Error)]
pub enum FallbackError {
    #[error("failed to read fallback library {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid fallback library: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FallbackLibrary {
    pub version: u32,
    discrepancies: Vec<VisualDiscrepancy>,
}

impl FallbackLibrary {
    /// The library shipped with the crate.
    pub fn builtin() -> Self {
        Self::from_json(BUILTIN).expect("embedded fallback library is valid JSON")
    }

    pub fn from_json(json: &str) -> Result<Self, FallbackError> {
        let mut library: FallbackLibrary = serde_json::from_str(json)?;
        for d in &mut library.discrepancies {
            d.status = DiscrepancyStatus::Open;
        }
        Ok(library)
    }

    pub fn from_path(path: &Path) -> Result<Self, FallbackError> {
        let json = std::fs::read_to_string(path).map_err(|source| FallbackError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&json)
    }

    pub fn from_items(version: u32, discrepancies: Vec<VisualDiscrepancy>) -> Self {
        Self {
            version,
            discrepancies,
        }
    }

    /// A fresh copy of the findings for one comparison run.
    pub fn discrepancies(&self) -> Vec<VisualDiscrepancy> {
        self.discrepancies.clone()
    }

    pub fn len(&self) -> usize {
        self.discrepancies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.discrepancies.is_empty()
    }
}

impl Default for FallbackLibrary {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use designdiff_core::{DiscrepancyPriority, DiscrepancyType};
    use std::io::Write;

    #[test]
    fn builtin_library_is_canonical_five_items() {
        let lib = FallbackLibrary::builtin();
        assert_eq!(lib.version, 1);
        assert_eq!(lib.len(), 5);
        assert!(lib.discrepancies().iter().all(|d| d.status == DiscrepancyStatus::Open));
        assert!(lib.discrepancies().iter().any(|d| d.priority == DiscrepancyPriority::High));
    }

    #[test]
    fn custom_library_may_have_any_size() {
        let lib = FallbackLibrary::from_json(r#"{"version": 2, "discrepancies": []}"#).unwrap();
        assert!(lib.is_empty());

        let lib = FallbackLibrary::from_json(
            r#"{"version": 3, "discrepancies": [
                {"title": "Check spacing", "type": "layout", "priority": "low"}
            ]}"#,
        )
        .unwrap();
        assert_eq!(lib.len(), 1);
        let d = &lib.discrepancies()[0];
        assert_eq!(d.kind, DiscrepancyType::Layout);
        assert_eq!(d.coordinates.width, 10.0);
        assert_eq!(d.status, DiscrepancyStatus::Open);
    }

    #[test]
    fn library_loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"version": 7, "discrepancies": [{{"title": "a", "type": "color", "priority": "high"}}]}}"#
        )
        .unwrap();

        let lib = FallbackLibrary::from_path(file.path()).unwrap();
        assert_eq!(lib.version, 7);
        assert_eq!(lib.len(), 1);
    }

    #[test]
    fn invalid_enum_in_library_is_rejected() {
        let err = FallbackLibrary::from_json(
            r#"{"version": 1, "discrepancies": [{"title": "a", "type": "spacing", "priority": "high"}]}"#,
        )
        .unwrap_err();
        assert!(matches!(err, FallbackError::Parse(_)));
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = FallbackLibrary::from_path(Path::new("/definitely/not/here.json")).unwrap_err();
        assert!(matches!(err, FallbackError::Io { .. }));
    }
}
