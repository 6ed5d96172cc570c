use crate::ledger::types::{EvidenceBundle, Ledger};

/// Section labels the model must answer under, in order.
pub const SECTION_LABELS: [&str; 5] = [
    "root_cause",
    "confidence_score",
    "next_steps",
    "summary_report",
    "records",
];

/// Render the investigation prompt for one transaction.
///
/// Ledgers without a row are rendered as `N/A` so every prompt has the same
/// shape. No other `N/A` appears in the template.
pub fn build(txn_id: &str, bundle: &EvidenceBundle) -> String {
    format!(
        r#"You are a banking operations assistant. A transaction failed to reconcile and needs investigation.

Transaction ID: {txn_id}

{cbs_name}:
{cbs}

{mm_name}:
{mm}

{sw_name}:
{sw}

{db_name}:
{db}

{cbs_name} is the system of record where the reconciliation break was discovered; treat its record as ground truth.
Cross-examine the other systems ({mm_name}, {sw_name} and {db_name}) against it, then
answer very briefly, with each of the following labels starting its own line:
root_cause: the most likely root cause of the unmatched transaction
confidence_score: how confident you are in that conclusion, as a percentage
next_steps: the recommended steps to complete or correct the transaction
summary_report: a short summary of how the transaction moved through the systems and what contributed most to your conclusion
records: every record you were given, as one JSON object wrapped in {{}} and keyed by {keys}

Do not output code or code blocks. Reply in plain text only.
"#,
        txn_id = txn_id,
        cbs_name = Ledger::CoreBanking.display_name(),
        mm_name = Ledger::MobileMoney.display_name(),
        sw_name = Ledger::Switch.display_name(),
        db_name = Ledger::Disbursement.display_name(),
        cbs = bundle.render(Ledger::CoreBanking),
        mm = bundle.render(Ledger::MobileMoney),
        sw = bundle.render(Ledger::Switch),
        db = bundle.render(Ledger::Disbursement),
        keys = Ledger::ALL
            .iter()
            .map(|l| format!("\"{}\"", l.key()))
            .collect::<Vec<_>>()
            .join(", "),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::types::LedgerRecord;
    use serde_json::{json, Value};

    fn record(value: Value) -> LedgerRecord {
        match value {
            Value::Object(map) => LedgerRecord(map),
            _ => panic!("not an object"),
        }
    }

    fn partial_bundle() -> EvidenceBundle {
        EvidenceBundle {
            core_banking: record(json!({"txn_id": "TXN1", "amount": 100})),
            mobile_money: None,
            switch: Some(record(json!({"txn_id": "TXN1", "status": "ok"}))),
            disbursement: None,
        }
    }

    #[test]
    fn test_missing_ledgers_render_as_marker_twice() {
        let prompt = build("TXN1", &partial_bundle());
        assert_eq!(prompt.matches("N/A").count(), 2);
    }

    #[test]
    fn test_full_bundle_has_no_marker() {
        let mut bundle = partial_bundle();
        bundle.mobile_money = Some(record(json!({"txn_id": "TXN1"})));
        bundle.disbursement = Some(record(json!({"txn_id": "TXN1"})));
        assert_eq!(build("TXN1", &bundle).matches("N/A").count(), 0);
    }

    #[test]
    fn test_prompt_embeds_evidence_and_labels() {
        let prompt = build("TXN1", &partial_bundle());
        assert!(prompt.contains("Transaction ID: TXN1"));
        assert!(prompt.contains(r#"{"txn_id":"TXN1","amount":100}"#));
        assert!(prompt.contains(r#"{"txn_id":"TXN1","status":"ok"}"#));
        for label in SECTION_LABELS {
            assert!(
                prompt.lines().any(|l| l.starts_with(&format!("{}:", label))),
                "missing label line {}",
                label
            );
        }
        assert!(prompt.contains("Do not output code"));
        assert!(prompt.contains("\"core_banking\", \"mobile_money\""));
    }

    #[test]
    fn test_build_is_deterministic() {
        let bundle = partial_bundle();
        assert_eq!(build("TXN1", &bundle), build("TXN1", &bundle));
    }
}
