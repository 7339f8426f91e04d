// 📒 Ledger - ordered transactions and flat-file persistence
// Order is file order. Ids are expected to be unique; reconciliation
// assumes at most one transaction per id.

use crate::error::{LedgerError, Result};
use crate::raw::RawRecord;
use crate::schema::{self, save_headers};
use crate::transaction::{ProcessedUpdate, Transaction};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Ledger {
    transactions: Vec<Transaction>,
}

impl Ledger {
    pub fn new(transactions: Vec<Transaction>) -> Self {
        Ledger { transactions }
    }

    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Transaction> {
        self.transactions.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, Transaction> {
        self.transactions.iter_mut()
    }

    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    pub fn into_inner(self) -> Vec<Transaction> {
        self.transactions
    }

    pub fn push(&mut self, transaction: Transaction) {
        self.transactions.push(transaction);
    }

    pub fn position(&self, id: &str) -> Option<usize> {
        self.transactions.iter().position(|t| t.id() == id)
    }

    pub fn get(&self, id: &str) -> Option<&Transaction> {
        self.transactions.iter().find(|t| t.id() == id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut Transaction> {
        self.transactions.iter_mut().find(|t| t.id() == id)
    }

    /// Like [`Ledger::get`], but an unknown id is an error.
    pub fn require(&self, id: &str) -> Result<&Transaction> {
        self.get(id)
            .ok_or_else(|| LedgerError::UnknownId(id.to_string()))
    }

    pub fn require_mut(&mut self, id: &str) -> Result<&mut Transaction> {
        self.get_mut(id)
            .ok_or_else(|| LedgerError::UnknownId(id.to_string()))
    }

    /// Ids that appear more than once, in first-seen order.
    pub fn duplicate_ids(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut reported = HashSet::new();
        let mut dups = Vec::new();

        for tx in &self.transactions {
            if !seen.insert(tx.id()) && reported.insert(tx.id()) {
                dups.push(tx.id().to_string());
            }
        }
        dups
    }

    /// Distinct non-empty categories, sorted.
    pub fn categories(&self) -> Vec<String> {
        self.transactions
            .iter()
            .map(|t| t.category())
            .filter(|c| !c.is_empty())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .map(str::to_string)
            .collect()
    }
}

impl FromIterator<Transaction> for Ledger {
    fn from_iter<I: IntoIterator<Item = Transaction>>(iter: I) -> Self {
        Ledger::new(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a Ledger {
    type Item = &'a Transaction;
    type IntoIter = std::slice::Iter<'a, Transaction>;

    fn into_iter(self) -> Self::IntoIter {
        self.transactions.iter()
    }
}

// ============================================================================
// LOAD
// ============================================================================

/// Read a ledger from any CSV source.
///
/// The header must contain every raw column; extra columns are ignored and
/// missing `bt_` columns leave their attribute at its default. Every row is
/// validated (amount and date must parse), and the first bad row aborts the
/// whole read.
pub fn read_ledger<R: Read>(reader: R) -> Result<Ledger> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(reader);

    let headers = rdr.headers()?.clone();
    schema::validate_columns(headers.iter())?;

    let mut transactions = Vec::new();

    for (i, result) in rdr.records().enumerate() {
        let record = result?;
        let row_number = i + 1;

        let row: HashMap<String, String> = headers
            .iter()
            .zip(record.iter())
            .map(|(h, v)| (h.to_string(), v.to_string()))
            .collect();

        let raw = RawRecord::from_map(&row).map_err(|source| LedgerError::Row {
            row: row_number,
            source,
        })?;

        // Parse now so a bad value fails the import instead of a later summary.
        raw.amount()
            .and(raw.date())
            .map_err(|source| LedgerError::Row {
                row: row_number,
                source,
            })?;

        transactions.push(Transaction::from_raw(
            raw,
            ProcessedUpdate::from_prefixed_map(&row),
        ));
    }

    let ledger = Ledger::new(transactions);

    let dups = ledger.duplicate_ids();
    if !dups.is_empty() {
        warn!(count = dups.len(), ids = ?dups, "duplicate transaction ids; links may be ambiguous");
    }

    Ok(ledger)
}

pub fn load_csv(path: &Path) -> Result<Ledger> {
    let file = File::open(path).map_err(|e| LedgerError::io(path, e))?;
    let ledger = read_ledger(BufReader::new(file))?;

    info!(path = %path.display(), transactions = ledger.len(), "loaded ledger");
    Ok(ledger)
}

// ============================================================================
// SAVE
// ============================================================================

/// Write the full ledger: raw columns, then `bt_` columns, fixed order.
pub fn write_ledger<W: Write>(writer: W, ledger: &Ledger) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);

    wtr.write_record(save_headers())?;
    for tx in ledger {
        wtr.write_record(tx.to_record())?;
    }
    wtr.flush().map_err(csv::Error::from)?;

    Ok(())
}

/// Save to `path` via a sibling temp file, so a failed write never leaves a
/// truncated ledger behind.
pub fn save_csv(path: &Path, ledger: &Ledger) -> Result<()> {
    let tmp = tmp_path(path);

    let written = File::create(&tmp)
        .map_err(|e| LedgerError::io(&tmp, e))
        .and_then(|file| {
            let mut out = BufWriter::new(file);
            write_ledger(&mut out, ledger)?;
            out.flush().map_err(|e| LedgerError::io(&tmp, e))
        })
        .and_then(|()| fs::rename(&tmp, path).map_err(|e| LedgerError::io(path, e)));

    if let Err(e) = written {
        let _ = fs::remove_file(&tmp);
        return Err(e);
    }

    info!(path = %path.display(), transactions = ledger.len(), "saved ledger");
    Ok(())
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ValidationError;
    use crate::raw::test_support::mock_row;
    use crate::schema::raw_headers;
    use crate::transaction::{test_support::tx, Link};
    use tempfile::tempdir;

    /// CSV text with the given header and rows (values looked up by header).
    fn csv_text(headers: &[&str], rows: &[HashMap<String, String>]) -> String {
        let mut wtr = csv::Writer::from_writer(Vec::new());
        wtr.write_record(headers).unwrap();
        for row in rows {
            let rec: Vec<&str> = headers
                .iter()
                .map(|h| row.get(*h).map(String::as_str).unwrap_or(""))
                .collect();
            wtr.write_record(rec).unwrap();
        }
        String::from_utf8(wtr.into_inner().unwrap()).unwrap()
    }

    #[test]
    fn test_can_load_raw_data() {
        let row = mock_row(&[]);
        let headers: Vec<&str> = raw_headers().collect();
        let text = csv_text(&headers, &[row.clone()]);

        let ledger = read_ledger(text.as_bytes()).unwrap();

        assert_eq!(ledger.len(), 1);
        let expected = Transaction::new(RawRecord::from_map(&row).unwrap());
        assert_eq!(ledger.transactions()[0], expected);
    }

    #[test]
    fn test_missing_column_loads_nothing() {
        let headers: Vec<&str> = raw_headers().filter(|h| *h != "Transaction ID").collect();
        let text = csv_text(&headers, &[mock_row(&[])]);

        let err = read_ledger(text.as_bytes()).unwrap_err();
        match err {
            LedgerError::Validation(ValidationError::MissingFields(names)) => {
                assert_eq!(names, vec!["Transaction ID".to_string()]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_missing_column_with_no_rows_still_fails() {
        let headers: Vec<&str> = raw_headers().filter(|h| *h != "Transaction ID").collect();
        let text = csv_text(&headers, &[]);
        let err = read_ledger(text.as_bytes()).unwrap_err();
        assert!(err.to_string().contains("Missing fields: Transaction ID"));
    }

    #[test]
    fn test_extra_fields_ok() {
        let mut row = mock_row(&[]);
        row.insert("Extra Field".to_string(), "extra".to_string());
        let mut headers: Vec<&str> = raw_headers().collect();
        headers.push("Extra Field");

        let ledger = read_ledger(csv_text(&headers, &[row]).as_bytes()).unwrap();

        let expected = Transaction::new(RawRecord::from_map(&mock_row(&[])).unwrap());
        assert_eq!(ledger.transactions()[0], expected);
    }

    #[test]
    fn test_load_with_prefixes() {
        let mut row = mock_row(&[]);
        row.insert("bt_category".to_string(), "Food".to_string());
        row.insert("bt_status".to_string(), "Reviewed".to_string());
        row.insert("bt_excluded".to_string(), "True".to_string());
        let mut headers: Vec<&str> = raw_headers().collect();
        headers.extend(["bt_category", "bt_status", "bt_excluded"]);

        let ledger = read_ledger(csv_text(&headers, &[row]).as_bytes()).unwrap();
        let trx = &ledger.transactions()[0];

        assert_eq!(trx.raw(), &RawRecord::from_map(&mock_row(&[])).unwrap());
        assert_eq!(trx.category(), "Food");
        assert_eq!(trx.status(), "Reviewed");
        assert!(trx.excluded());
        assert!(!trx.income());
        assert!(trx.link().is_none());
    }

    #[test]
    fn test_bad_amount_aborts_import() {
        let good = mock_row(&[("Transaction ID", "a")]);
        let bad = mock_row(&[("Transaction ID", "b"), ("Amount", "lots")]);
        let headers: Vec<&str> = raw_headers().collect();

        let err = read_ledger(csv_text(&headers, &[good, bad]).as_bytes()).unwrap_err();
        match err {
            LedgerError::Row { row, source } => {
                assert_eq!(row, 2);
                assert_eq!(source, ValidationError::InvalidAmount("lots".to_string()));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_save_writes_fixed_columns() {
        let mut trx = tx("1", -3.5, "card");
        trx.set_category("Some Category");
        trx.set_status("Some Status");
        let ledger = Ledger::new(vec![trx]);

        let mut out = Vec::new();
        write_ledger(&mut out, &ledger).unwrap();

        let mut rdr = csv::Reader::from_reader(out.as_slice());
        let headers = rdr.headers().unwrap().clone();
        assert_eq!(headers.iter().collect::<Vec<_>>(), save_headers());

        let record = rdr.records().next().unwrap().unwrap();
        assert_eq!(&record[0], "1");
        assert_eq!(&record[18], "Some Category");
        assert_eq!(&record[20], "Some Status");
        assert_eq!(&record[21], "False");
    }

    #[test]
    fn test_round_trip_through_file() {
        let mut a = tx("1", -15.0, "Payment");
        a.set_category("Pot");
        a.set_pot_category("Holidays");
        a.set_status("Done");
        a.set_excluded(true);
        a.set_link(Link::Counterpart("2".to_string()));
        let mut b = tx("2", 15.0, "Pot transfer");
        b.set_link(Link::Manual);
        b.set_income(true);
        let ledger = Ledger::new(vec![a, b]);

        let dir = tempdir().unwrap();
        let path = dir.path().join("round_trip.csv");
        save_csv(&path, &ledger).unwrap();
        let loaded = load_csv(&path).unwrap();

        assert_eq!(loaded, ledger);
        assert!(!tmp_path(&path).exists());
    }

    #[test]
    fn test_failed_rename_leaves_no_temp_file() {
        let dir = tempdir().unwrap();
        // a directory in the way makes the final rename fail
        let path = dir.path().join("taken.csv");
        fs::create_dir(&path).unwrap();
        fs::write(path.join("keep"), "x").unwrap();

        let err = save_csv(&path, &Ledger::new(vec![tx("1", -1.0, "card")])).unwrap_err();

        assert!(matches!(err, LedgerError::Io { .. }));
        assert!(!tmp_path(&path).exists());
        assert!(path.is_dir());
    }

    #[test]
    fn test_load_missing_file_is_io_error() {
        let dir = tempdir().unwrap();
        let err = load_csv(&dir.path().join("nope.csv")).unwrap_err();
        assert!(matches!(err, LedgerError::Io { .. }));
    }

    #[test]
    fn test_duplicate_ids_and_categories() {
        let mut a = tx("1", 1.0, "card");
        a.set_category("Transport");
        let mut b = tx("1", 2.0, "card");
        b.set_category("Groceries");
        let mut c = tx("2", 3.0, "card");
        c.set_category("Groceries");
        let ledger = Ledger::new(vec![a, b, c, tx("1", 4.0, "card")]);

        assert_eq!(ledger.duplicate_ids(), vec!["1".to_string()]);
        assert_eq!(ledger.categories(), vec!["Groceries", "Transport"]);
    }
}
