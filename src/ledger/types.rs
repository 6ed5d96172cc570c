use std::fmt;

use serde_json::{Map, Value};

/// Marker substituted for a ledger that has no row for the transaction.
pub const NOT_AVAILABLE: &str = "N/A";

/// Column every ledger table and batch upload must carry.
pub const TXN_ID_COLUMN: &str = "txn_id";

/// One upstream system of record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Ledger {
    CoreBanking,
    MobileMoney,
    Switch,
    Disbursement,
}

impl Ledger {
    pub const ALL: [Ledger; 4] = [
        Ledger::CoreBanking,
        Ledger::MobileMoney,
        Ledger::Switch,
        Ledger::Disbursement,
    ];

    /// Key used when the model echoes evidence back under `records`.
    pub fn key(self) -> &'static str {
        match self {
            Ledger::CoreBanking => "core_banking",
            Ledger::MobileMoney => "mobile_money",
            Ledger::Switch => "switch",
            Ledger::Disbursement => "disbursement",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Ledger::CoreBanking => "Core Banking",
            Ledger::MobileMoney => "Mobile Money",
            Ledger::Switch => "Switch Logs",
            Ledger::Disbursement => "Disbursement API",
        }
    }

    /// File name of the ledger's table inside the data directory.
    pub fn file_name(self) -> &'static str {
        match self {
            Ledger::CoreBanking => "cbs.csv",
            Ledger::MobileMoney => "mpesa.csv",
            Ledger::Switch => "switch_logs.csv",
            Ledger::Disbursement => "disbursement_api.csv",
        }
    }
}

impl fmt::Display for Ledger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// A single ledger row: field name to scalar value, in column order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LedgerRecord(pub Map<String, Value>);

impl LedgerRecord {
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }
}

impl fmt::Display for LedgerRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Map<String, Value> always serializes
        let text = serde_json::to_string(&self.0).map_err(|_| fmt::Error)?;
        f.write_str(&text)
    }
}

/// Everything the ledgers hold about one transaction.
#[derive(Debug, Clone)]
pub struct EvidenceBundle {
    pub core_banking: LedgerRecord,
    pub mobile_money: Option<LedgerRecord>,
    pub switch: Option<LedgerRecord>,
    pub disbursement: Option<LedgerRecord>,
}

impl EvidenceBundle {
    pub fn get(&self, ledger: Ledger) -> Option<&LedgerRecord> {
        match ledger {
            Ledger::CoreBanking => Some(&self.core_banking),
            Ledger::MobileMoney => self.mobile_money.as_ref(),
            Ledger::Switch => self.switch.as_ref(),
            Ledger::Disbursement => self.disbursement.as_ref(),
        }
    }

    /// Prompt-ready text for one ledger, `N/A` when the ledger had no row.
    pub fn render(&self, ledger: Ledger) -> String {
        self.get(ledger)
            .map(|r| r.to_string())
            .unwrap_or_else(|| NOT_AVAILABLE.to_string())
    }

    pub fn missing(&self) -> Vec<Ledger> {
        Ledger::ALL
            .into_iter()
            .filter(|l| self.get(*l).is_none())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> LedgerRecord {
        match value {
            Value::Object(map) => LedgerRecord(map),
            _ => panic!("not an object"),
        }
    }

    #[test]
    fn test_record_display_keeps_column_order() {
        let mut map = Map::new();
        map.insert("txn_id".into(), json!("TXN1"));
        map.insert("amount".into(), json!(100));
        map.insert("channel".into(), Value::Null);
        let rec = LedgerRecord(map);
        assert_eq!(
            rec.to_string(),
            r#"{"txn_id":"TXN1","amount":100,"channel":null}"#
        );
    }

    #[test]
    fn test_bundle_render_marks_missing() {
        let bundle = EvidenceBundle {
            core_banking: record(json!({"txn_id": "TXN1"})),
            mobile_money: None,
            switch: Some(record(json!({"txn_id": "TXN1", "status": "ok"}))),
            disbursement: None,
        };
        assert_eq!(bundle.render(Ledger::MobileMoney), NOT_AVAILABLE);
        assert!(bundle.render(Ledger::Switch).contains("ok"));
        assert_eq!(
            bundle.missing(),
            vec![Ledger::MobileMoney, Ledger::Disbursement]
        );
    }
}
