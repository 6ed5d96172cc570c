use crate::error::{ReconError, ReconResult};
use crate::ledger::types::TXN_ID_COLUMN;

/// Read transaction ids, in file order, from an uploaded CSV.
///
/// The upload must have a `txn_id` header column. Blank cells are kept so they
/// show up as not-found results instead of vanishing from the batch.
pub fn read_txn_ids(bytes: &[u8]) -> ReconResult<Vec<String>> {
    let mut csv = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(bytes);

    let headers = csv
        .headers()
        .map_err(|e| ReconError::Input(format!("unreadable CSV header: {}", e)))?;
    let Some(column) = headers.iter().position(|h| h == TXN_ID_COLUMN) else {
        return Err(ReconError::Input(format!(
            "CSV must contain a column named '{}'",
            TXN_ID_COLUMN
        )));
    };

    let mut ids = Vec::new();
    for (line, row) in csv.records().enumerate() {
        let row =
            row.map_err(|e| ReconError::Input(format!("row {} is unreadable: {}", line + 1, e)))?;
        ids.push(row.get(column).unwrap_or_default().to_string());
    }
    Ok(ids)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FailureKind;

    #[test]
    fn test_reads_ids_in_order() {
        let ids = read_txn_ids(b"note,txn_id\nfirst,TXN3\nsecond, TXN1 \nthird,TXN2\n").unwrap();
        assert_eq!(ids, vec!["TXN3", "TXN1", "TXN2"]);
    }

    #[test]
    fn test_missing_column_is_input_failure() {
        let err = read_txn_ids(b"id\nTXN1\n").unwrap_err();
        assert_eq!(err.kind(), FailureKind::Input);
        assert!(err.to_string().contains("txn_id"));
    }

    #[test]
    fn test_empty_upload_is_input_failure() {
        assert_eq!(read_txn_ids(b"").unwrap_err().kind(), FailureKind::Input);
    }

    #[test]
    fn test_blank_and_short_rows_are_kept() {
        let ids = read_txn_ids(b"txn_id,amount\nTXN1,5\n,7\n").unwrap();
        assert_eq!(ids, vec!["TXN1", ""]);
        let ids = read_txn_ids(b"amount,txn_id\n5\n6,TXN2\n").unwrap();
        assert_eq!(ids, vec!["", "TXN2"]);
    }
}
