//! Persisted ledger of processed publication ids.
//!
//! A single CSV file with an `id` header and one identifier per row. It is
//! read once at run start and overwritten once at run end; the overwrite goes
//! through a temporary file in the same directory followed by a rename.
//! Loading is lenient: a file without the header is read as a bare id list,
//! and short or unparsable rows are skipped with a warning.
//! There is no locking: two concurrent runs race on the same file.

use std::path::{Path, PathBuf};

use pubwatch_common::{PublicationId, PubwatchError, Result};
use tempfile::NamedTempFile;
use tracing::{info, warn};

use crate::dedup::KnownIdSet;

pub const ID_COLUMN: &str = "id";

/// Durable storage for the known-id set.
pub trait LedgerStore: Send + Sync {
    fn load(&self) -> Result<KnownIdSet>;
    fn save(&self, known: &KnownIdSet) -> Result<()>;
}

#[derive(Debug, Clone)]
pub struct CsvLedger {
    path: PathBuf,
}

impl CsvLedger {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl LedgerStore for CsvLedger {
    fn load(&self) -> Result<KnownIdSet> {
        if !self.path.exists() {
            info!(path = %self.path.display(), "No ledger yet; starting with an empty set");
            return Ok(KnownIdSet::new());
        }

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_path(&self.path)?;

        let mut known = KnownIdSet::new();
        let mut column = None;
        for (index, row) in reader.records().enumerate() {
            let row = row?;
            let line = index + 1;

            // The first row is a header only when one of its cells names the
            // id column; a bare list of ids starts with data.
            let col = match column {
                Some(c) => c,
                None => {
                    let header = row.iter().position(|h| h.trim().eq_ignore_ascii_case(ID_COLUMN));
                    column = Some(header.unwrap_or(0));
                    if header.is_some() {
                        continue;
                    }
                    0
                }
            };

            let raw = row.get(col).unwrap_or("");
            if raw.trim().is_empty() {
                continue;
            }
            match raw.parse::<PublicationId>() {
                Ok(id) => {
                    known.insert(id);
                }
                Err(e) => warn!(line, error = %e, "Ignoring unreadable ledger row"),
            }
        }

        info!(path = %self.path.display(), count = known.len(), "Ledger loaded");
        Ok(known)
    }

    fn save(&self, known: &KnownIdSet) -> Result<()> {
        let dir = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };

        let mut tmp = NamedTempFile::new_in(dir)?;
        {
            let mut writer = csv::Writer::from_writer(tmp.as_file_mut());
            writer.write_record([ID_COLUMN])?;
            for id in known.iter() {
                writer.write_record([id.to_string()])?;
            }
            writer.flush()?;
        }
        tmp.as_file_mut().sync_all()?;
        tmp.persist(&self.path).map_err(|e| PubwatchError::Io(e.error))?;

        info!(path = %self.path.display(), count = known.len(), "Ledger saved");
        Ok(())
    }
}

/// Append `ids` to `known` and write the whole set back. Returns how many ids
/// were newly added.
pub fn commit_ids<I>(store: &dyn LedgerStore, known: &mut KnownIdSet, ids: I) -> Result<usize>
where
    I: IntoIterator<Item = PublicationId>,
{
    let added = known.append(ids);
    store.save(known)?;
    Ok(added)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ledger_in(dir: &tempfile::TempDir) -> CsvLedger {
        CsvLedger::new(dir.path().join("previous_publications.csv"))
    }

    #[test]
    fn test_missing_file_is_empty_set() {
        let dir = tempfile::tempdir().unwrap();
        let known = ledger_in(&dir).load().unwrap();
        assert!(known.is_empty());
    }

    #[test]
    fn test_save_then_load_keeps_order() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = ledger_in(&dir);
        let known: KnownIdSet = [101u64, 102, 103].into_iter().map(PublicationId::new).collect();

        ledger.save(&known).unwrap();
        let text = std::fs::read_to_string(ledger.path()).unwrap();
        assert_eq!(text, "id\n101\n102\n103\n");
        assert_eq!(ledger.load().unwrap(), known);
    }

    #[test]
    fn test_load_tolerates_spreadsheet_exports() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = ledger_in(&dir);
        std::fs::write(ledger.path(), "Unnamed: 0,id\n0,101\n1,102.0\n2,\n3,oops\n").unwrap();

        let known = ledger.load().unwrap();
        let ids: Vec<u64> = known.iter().map(|id| id.get()).collect();
        assert_eq!(ids, vec![101, 102]);
    }

    #[test]
    fn test_headerless_file_keeps_first_id() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = ledger_in(&dir);
        std::fs::write(ledger.path(), "101\n102\n").unwrap();

        let ids: Vec<u64> = ledger.load().unwrap().iter().map(|id| id.get()).collect();
        assert_eq!(ids, vec![101, 102]);
    }

    #[test]
    fn test_ragged_rows_do_not_fail_the_load() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = ledger_in(&dir);
        std::fs::write(ledger.path(), "Unnamed: 0,id\n0,101\n102\n1,103,extra\n").unwrap();

        let ids: Vec<u64> = ledger.load().unwrap().iter().map(|id| id.get()).collect();
        // the short row has no id column and is skipped
        assert_eq!(ids, vec![101, 103]);
    }

    #[test]
    fn test_commit_appends_and_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = ledger_in(&dir);
        let mut known: KnownIdSet = [101u64, 102].into_iter().map(PublicationId::new).collect();
        ledger.save(&known).unwrap();

        let added = commit_ids(&ledger, &mut known, [PublicationId::new(103)]).unwrap();
        assert_eq!(added, 1);

        let reloaded = ledger.load().unwrap();
        assert!(reloaded.contains(PublicationId::new(103)));
        assert_eq!(reloaded.len(), 3);
    }
}
