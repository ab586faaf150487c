//! # Path Resolution Module
//!
//! Centralizza il calcolo delle sottocartelle di output a partire dalla data di scatto
//! (mai dalla data di elaborazione).
//!
//! - `none`  → flat nella root di output
//! - `year`  → `YYYY/`
//! - `month` → `YYYY/MM/`
//! - `day`   → `YYYY/MM/DD/`

use crate::naming::NamePlan;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Date-based output layout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Subfolders {
    #[serde(rename = "none")]
    #[value(name = "none")]
    Flat,
    Day,
    Month,
    Year,
}

/// Utility per calcolare i path di output in modo centralizzato
pub struct PathResolver;

impl PathResolver {
    /// Relative directory for a capture timestamp
    pub fn subdirectory(timestamp: NaiveDateTime, subfolders: Subfolders) -> PathBuf {
        let year = timestamp.format("%Y").to_string();
        let month = timestamp.format("%m").to_string();
        let day = timestamp.format("%d").to_string();

        match subfolders {
            Subfolders::Flat => PathBuf::new(),
            Subfolders::Year => PathBuf::from(year),
            Subfolders::Month => [year, month].iter().collect(),
            Subfolders::Day => [year, month, day].iter().collect(),
        }
    }

    /// Absolute destination of a name plan under `output_root`
    pub fn destination(output_root: &Path, plan: &NamePlan) -> PathBuf {
        output_root.join(plan.relative_path())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts() -> NaiveDateTime {
        NaiveDateTime::parse_from_str("2024-01-05 14:30:45", "%Y-%m-%d %H:%M:%S").unwrap()
    }

    #[test]
    fn test_subdirectory_layouts() {
        assert_eq!(PathResolver::subdirectory(ts(), Subfolders::Flat), PathBuf::new());
        assert_eq!(PathResolver::subdirectory(ts(), Subfolders::Year), PathBuf::from("2024"));
        assert_eq!(
            PathResolver::subdirectory(ts(), Subfolders::Month),
            Path::new("2024").join("01")
        );
        assert_eq!(
            PathResolver::subdirectory(ts(), Subfolders::Day),
            Path::new("2024").join("01").join("05")
        );
    }

    #[test]
    fn test_destination_joins_plan() {
        let plan = NamePlan {
            base_name: "2024-01-05_14-30-45_0001".to_string(),
            sequence: 1,
            collision_suffix: Some(2),
            extension: "jpg",
            subdirectory: PathBuf::from("2024"),
        };
        assert_eq!(
            PathResolver::destination(Path::new("/out"), &plan),
            Path::new("/out/2024/2024-01-05_14-30-45_0001__2.jpg")
        );
    }

    #[test]
    fn test_subfolders_serde_names() {
        assert_eq!(serde_json::to_string(&Subfolders::Flat).unwrap(), "\"none\"");
        let parsed: Subfolders = serde_json::from_str("\"month\"").unwrap();
        assert_eq!(parsed, Subfolders::Month);
    }
}
