//! SSB CPU profile dumps, one text file per query.

use super::LoadError;
use crate::analysis::parse_profile;
use indexmap::IndexMap;
use std::path::{Path, PathBuf};

/// Directory holding the profiles of one configuration.
pub fn profile_dir(data_dir: &Path, hardware: &str, config: &str) -> PathBuf {
    data_dir
        .join("ssb")
        .join(hardware)
        .join("profiles")
        .join(config)
}

/// Read `<query>.txt` for every query and sum ticks per symbol.
pub fn load_profiles(
    dir: &Path,
    queries: &[String],
) -> Result<Vec<(String, IndexMap<String, u64>)>, LoadError> {
    queries
        .iter()
        .map(|query| {
            let path = dir.join(format!("{}.txt", query));
            if !path.is_file() {
                return Err(LoadError::NotFound(path));
            }
            let content = std::fs::read_to_string(&path)
                .map_err(|source| LoadError::Io { path, source })?;
            Ok((query.clone(), parse_profile(&content)))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workload::testing::fixture;

    #[test]
    fn test_profile_dir() {
        assert_eq!(
            profile_dir(Path::new("data"), "c220g5", "bloom"),
            PathBuf::from("data/ssb/c220g5/profiles/bloom")
        );
    }

    #[test]
    fn test_load_profiles() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("Q1.1.txt"),
            "50.0% 700 ssb_sqlite3 libsqlite3.so sqlite3VdbeExec\n",
        )
        .unwrap();

        let queries = vec!["Q1.1".to_string()];
        let profiles = load_profiles(dir.path(), &queries).unwrap();
        assert_eq!(profiles.len(), 1);
        assert_eq!(profiles[0].1.get("sqlite3VdbeExec"), Some(&700));

        let missing = vec!["Q1.1".to_string(), "Q9.9".to_string()];
        let err = load_profiles(dir.path(), &missing).unwrap_err();
        assert!(err.to_string().contains("Q9.9.txt"));
    }

    #[test]
    fn test_load_profiles_fixture() {
        let dir = fixture("data/ssb/testbox/profiles/vanilla");
        let queries = vec!["Q1.1".to_string(), "Q1.2".to_string()];
        let profiles = load_profiles(&dir, &queries).unwrap();
        assert!(profiles.iter().all(|(_, ticks)| !ticks.is_empty()));
    }
}
