//! CPU profile reduction.
//!
//! Profiles are plain-text sample dumps, one symbol per line. Token 1
//! holds the tick count and token 4 the symbol name.

use crate::models::ProfileTable;
use indexmap::IndexMap;
use tracing::warn;

/// Column holding the ticks of every symbol below the threshold.
pub const OTHER_COLUMN: &str = "other";

/// Sum ticks per symbol for one profile dump.
///
/// Lines that are too short or carry a non-integer count are skipped.
pub fn parse_profile(content: &str) -> IndexMap<String, u64> {
    let mut ticks: IndexMap<String, u64> = IndexMap::new();

    for (line_no, line) in content.lines().enumerate() {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        if tokens.is_empty() {
            continue;
        }

        if tokens.len() < 5 {
            warn!("Skipping short profile line {}: {:?}", line_no + 1, line);
            continue;
        }

        let Ok(count) = tokens[1].parse::<u64>() else {
            warn!(
                "Skipping profile line {} with non-integer count {:?}",
                line_no + 1,
                tokens[1]
            );
            continue;
        };

        *ticks.entry(tokens[4].to_string()).or_default() += count;
    }

    ticks
}

/// Combine per-query tick maps into one table.
///
/// Symbols whose largest per-query count reaches `threshold` keep their
/// own column; the rest are summed into a trailing `other` column. A
/// symbol literally named `other` always lands in that column.
pub fn reduce_profiles(profiles: &[(String, IndexMap<String, u64>)], threshold: f64) -> ProfileTable {
    let mut peaks: IndexMap<&str, u64> = IndexMap::new();
    for (_, ticks) in profiles {
        for (symbol, &count) in ticks {
            let peak = peaks.entry(symbol.as_str()).or_default();
            *peak = (*peak).max(count);
        }
    }

    let major: Vec<&str> = peaks
        .iter()
        .filter(|(symbol, peak)| **symbol != OTHER_COLUMN && **peak as f64 >= threshold)
        .map(|(symbol, _)| *symbol)
        .collect();

    let ticks = profiles
        .iter()
        .map(|(_, row)| {
            let mut cells: Vec<u64> = major
                .iter()
                .map(|symbol| row.get(*symbol).copied().unwrap_or(0))
                .collect();
            let other = row
                .iter()
                .filter(|(symbol, _)| !major.contains(&symbol.as_str()))
                .map(|(_, count)| count)
                .sum();
            cells.push(other);
            cells
        })
        .collect();

    let mut symbols: Vec<String> = major.iter().map(|s| s.to_string()).collect();
    symbols.push(OTHER_COLUMN.to_string());

    ProfileTable {
        queries: profiles.iter().map(|(q, _)| q.clone()).collect(),
        symbols,
        ticks,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
  41.20%  900000000  ssb_sqlite3  libsqlite3.so  sqlite3VdbeExec
  20.10%  400000000  ssb_sqlite3  libsqlite3.so  sqlite3BtreeNext
  10.00%  100000000  ssb_sqlite3  libsqlite3.so  sqlite3VdbeExec

  broken line
   1.00%  notanumber  ssb_sqlite3  libc.so  memcpy
";

    #[test]
    fn test_parse_profile_sums_per_symbol() {
        let ticks = parse_profile(SAMPLE);
        assert_eq!(ticks.len(), 2);
        assert_eq!(ticks.get("sqlite3VdbeExec"), Some(&1_000_000_000));
        assert_eq!(ticks.get("sqlite3BtreeNext"), Some(&400_000_000));
        assert!(ticks.get("memcpy").is_none());
    }

    #[test]
    fn test_reduce_folds_minor_symbols() {
        let q1: IndexMap<String, u64> = [
            ("exec".to_string(), 900),
            ("next".to_string(), 40),
            ("memcpy".to_string(), 5),
        ]
        .into_iter()
        .collect();
        let q2: IndexMap<String, u64> = [
            ("next".to_string(), 600),
            ("bloom".to_string(), 10),
        ]
        .into_iter()
        .collect();

        let table = reduce_profiles(&[("Q1.1".to_string(), q1), ("Q1.2".to_string(), q2)], 500.0);

        assert_eq!(table.queries, vec!["Q1.1", "Q1.2"]);
        assert_eq!(table.symbols, vec!["exec", "next", "other"]);
        assert_eq!(table.ticks[0], vec![900, 40, 5]);
        assert_eq!(table.ticks[1], vec![0, 600, 10]);
        assert_eq!(table.row_total(0), 945);
    }

    #[test]
    fn test_reduce_all_minor() {
        let q1: IndexMap<String, u64> = [("a".to_string(), 1), ("b".to_string(), 2)]
            .into_iter()
            .collect();

        let table = reduce_profiles(&[("Q1.1".to_string(), q1)], 5e8);
        assert_eq!(table.symbols, vec![OTHER_COLUMN]);
        assert_eq!(table.ticks, vec![vec![3]]);
    }

    #[test]
    fn test_symbol_named_other_is_folded() {
        let q1: IndexMap<String, u64> = [
            ("exec".to_string(), 900),
            (OTHER_COLUMN.to_string(), 700),
            ("memcpy".to_string(), 5),
        ]
        .into_iter()
        .collect();

        let table = reduce_profiles(&[("Q1.1".to_string(), q1)], 500.0);
        assert_eq!(table.symbols, vec!["exec", OTHER_COLUMN]);
        assert_eq!(table.ticks[0], vec![900, 705]);
    }
}
