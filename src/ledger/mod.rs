pub mod types;

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use serde_json::{Map, Number, Value};
use tracing::{debug, info, warn};

use crate::error::{ReconError, ReconResult};
use types::{EvidenceBundle, Ledger, LedgerRecord, TXN_ID_COLUMN};

/// One ledger's rows indexed by transaction id. First row wins.
#[derive(Debug, Default)]
pub struct LedgerTable {
    rows: HashMap<String, LedgerRecord>,
    row_count: usize,
    duplicates: usize,
}

impl LedgerTable {
    /// Read a CSV table. The header row must contain `txn_id`.
    pub fn from_reader<R: Read>(ledger: Ledger, reader: R) -> ReconResult<Self> {
        let mut csv = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers = csv
            .headers()
            .map_err(|e| ReconError::init(format!("ledger '{}'", ledger), e))?
            .clone();
        if !headers.iter().any(|h| h == TXN_ID_COLUMN) {
            return Err(ReconError::init(
                format!("ledger '{}'", ledger),
                format!("no '{}' column in header", TXN_ID_COLUMN),
            ));
        }

        let mut table = LedgerTable::default();
        for (line, row) in csv.records().enumerate() {
            let row = row.map_err(|e| {
                ReconError::init(format!("ledger '{}'", ledger), format!("row {}: {}", line + 1, e))
            })?;

            let mut fields = Map::new();
            let mut txn_id = String::new();
            for (name, cell) in headers.iter().zip(row.iter()) {
                if name == TXN_ID_COLUMN {
                    txn_id = cell.to_string();
                    fields.insert(name.to_string(), Value::String(txn_id.clone()));
                } else {
                    fields.insert(name.to_string(), parse_cell(cell));
                }
            }

            table.row_count += 1;
            if table.rows.contains_key(&txn_id) {
                table.duplicates += 1;
                continue;
            }
            table.rows.insert(txn_id, LedgerRecord(fields));
        }

        if table.duplicates > 0 {
            warn!(
                %ledger,
                duplicates = table.duplicates,
                "duplicate txn_id rows ignored, first row kept"
            );
        }
        Ok(table)
    }

    pub fn get(&self, txn_id: &str) -> Option<&LedgerRecord> {
        self.rows.get(txn_id)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }
}

/// Row counts for one loaded ledger.
#[derive(Debug, Clone)]
pub struct LedgerStats {
    pub ledger: Ledger,
    pub rows: usize,
    pub unique_ids: usize,
    pub duplicates: usize,
}

/// The four ledgers, loaded once and never mutated.
#[derive(Debug)]
pub struct RecordStore {
    tables: HashMap<Ledger, LedgerTable>,
}

impl RecordStore {
    /// Load every ledger file from `data_dir`. Any missing or malformed table
    /// aborts the load.
    pub fn load(data_dir: &Path) -> ReconResult<Self> {
        let mut tables = HashMap::new();
        for ledger in Ledger::ALL {
            let path = data_dir.join(ledger.file_name());
            let file = File::open(&path).map_err(|e| {
                ReconError::init(format!("ledger '{}' ({})", ledger, path.display()), e)
            })?;
            let table = LedgerTable::from_reader(ledger, file)?;
            info!(
                %ledger,
                path = %path.display(),
                rows = table.row_count,
                "ledger loaded"
            );
            tables.insert(ledger, table);
        }
        Ok(Self { tables })
    }

    /// Build a store from already-parsed tables. Ledgers not supplied are empty.
    #[cfg(test)]
    pub fn from_tables(tables: impl IntoIterator<Item = (Ledger, LedgerTable)>) -> Self {
        let mut tables: HashMap<_, _> = tables.into_iter().collect();
        for ledger in Ledger::ALL {
            tables.entry(ledger).or_default();
        }
        Self { tables }
    }

    pub fn lookup(&self, ledger: Ledger, txn_id: &str) -> Option<&LedgerRecord> {
        let hit = self.tables.get(&ledger).and_then(|t| t.get(txn_id));
        debug!(%ledger, txn_id, found = hit.is_some(), "ledger lookup");
        hit
    }

    /// Gather the evidence bundle, or `None` when core banking has no row.
    pub fn evidence(&self, txn_id: &str) -> Option<EvidenceBundle> {
        let core_banking = self.lookup(Ledger::CoreBanking, txn_id)?.clone();
        Some(EvidenceBundle {
            core_banking,
            mobile_money: self.lookup(Ledger::MobileMoney, txn_id).cloned(),
            switch: self.lookup(Ledger::Switch, txn_id).cloned(),
            disbursement: self.lookup(Ledger::Disbursement, txn_id).cloned(),
        })
    }

    pub fn stats(&self) -> Vec<LedgerStats> {
        Ledger::ALL
            .into_iter()
            .map(|ledger| {
                let table = self.tables.get(&ledger);
                LedgerStats {
                    ledger,
                    rows: table.map(|t| t.row_count).unwrap_or(0),
                    unique_ids: table.map(|t| t.len()).unwrap_or(0),
                    duplicates: table.map(|t| t.duplicates).unwrap_or(0),
                }
            })
            .collect()
    }
}

/// Type a raw CSV cell. Empty and `nan` cells become null. Zero-padded codes
/// such as response code `00` or account numbers stay text.
fn parse_cell(raw: &str) -> Value {
    if raw.is_empty() {
        return Value::Null;
    }
    if has_leading_zero(raw) {
        return Value::String(raw.to_string());
    }
    if let Ok(i) = raw.parse::<i64>() {
        return Value::Number(i.into());
    }
    if let Ok(f) = raw.parse::<f64>() {
        // NaN and infinities have no JSON form
        return Number::from_f64(f).map(Value::Number).unwrap_or(Value::Null);
    }
    match raw.to_ascii_lowercase().as_str() {
        "true" => Value::Bool(true),
        "false" => Value::Bool(false),
        _ => Value::String(raw.to_string()),
    }
}

fn has_leading_zero(raw: &str) -> bool {
    let digits = raw.strip_prefix(['-', '+']).unwrap_or(raw);
    let mut chars = digits.chars();
    chars.next() == Some('0') && chars.next().is_some_and(|c| c.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const CBS: &str = "txn_id,amount,currency,status\n\
                       TXN1,100,KES,posted\n\
                       TXN2,250.5,KES,\n\
                       TXN1,999,KES,reversed\n";

    fn write_ledgers(dir: &Path, skip: Option<Ledger>) {
        for ledger in Ledger::ALL {
            if Some(ledger) == skip {
                continue;
            }
            let body = match ledger {
                Ledger::CoreBanking => CBS,
                Ledger::Switch => "txn_id,status\nTXN1,ok\n",
                _ => "txn_id,note\n",
            };
            std::fs::write(dir.join(ledger.file_name()), body).unwrap();
        }
    }

    #[test]
    fn test_parse_cell_types() {
        assert_eq!(parse_cell(""), Value::Null);
        assert_eq!(parse_cell("nan"), Value::Null);
        assert_eq!(parse_cell("NaN"), Value::Null);
        assert_eq!(parse_cell("42"), json!(42));
        assert_eq!(parse_cell("-3.5"), json!(-3.5));
        assert_eq!(parse_cell("True"), json!(true));
        assert_eq!(parse_cell("posted"), json!("posted"));
    }

    #[test]
    fn test_zero_padded_cells_stay_text() {
        assert_eq!(parse_cell("00"), json!("00"));
        assert_eq!(parse_cell("0123456789"), json!("0123456789"));
        assert_eq!(parse_cell("0"), json!(0));
        assert_eq!(parse_cell("0.75"), json!(0.75));
        assert_eq!(parse_cell("-0.5"), json!(-0.5));
        assert_eq!(parse_cell("100"), json!(100));
    }

    #[test]
    fn test_table_first_row_wins() {
        let table = LedgerTable::from_reader(Ledger::CoreBanking, CBS.as_bytes()).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.duplicates, 1);
        let rec = table.get("TXN1").unwrap();
        assert_eq!(rec.get("amount"), Some(&json!(100)));
        assert_eq!(rec.get("status"), Some(&json!("posted")));
        assert_eq!(table.get("TXN2").unwrap().get("status"), Some(&Value::Null));
    }

    #[test]
    fn test_txn_id_kept_as_string() {
        let table =
            LedgerTable::from_reader(Ledger::Switch, "txn_id,status\n00123,ok\n".as_bytes())
                .unwrap();
        let rec = table.get("00123").unwrap();
        assert_eq!(rec.get("txn_id"), Some(&json!("00123")));
    }

    #[test]
    fn test_table_without_txn_id_column_is_rejected() {
        let err = LedgerTable::from_reader(Ledger::MobileMoney, "id,amount\nA,1\n".as_bytes())
            .unwrap_err();
        assert_eq!(err.kind(), crate::error::FailureKind::Initialization);
        assert!(err.to_string().contains("txn_id"));
    }

    #[test]
    fn test_load_from_directory() {
        let dir = tempfile::tempdir().unwrap();
        write_ledgers(dir.path(), None);
        let store = RecordStore::load(dir.path()).unwrap();

        assert!(store.lookup(Ledger::CoreBanking, "TXN1").is_some());
        assert!(store.lookup(Ledger::CoreBanking, "txn1").is_none());
        assert!(store.lookup(Ledger::MobileMoney, "TXN1").is_none());

        let bundle = store.evidence("TXN1").unwrap();
        assert!(bundle.switch.is_some());
        assert!(bundle.disbursement.is_none());
        assert!(store.evidence("TXN404").is_none());

        let stats = store.stats();
        assert_eq!(stats[0].rows, 3);
        assert_eq!(stats[0].unique_ids, 2);
    }

    #[test]
    fn test_load_fails_fast_on_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        write_ledgers(dir.path(), Some(Ledger::Disbursement));
        let err = RecordStore::load(dir.path()).unwrap_err();
        assert_eq!(err.kind(), crate::error::FailureKind::Initialization);
        assert!(err.to_string().contains("disbursement"));
    }
}
