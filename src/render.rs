//! Discord-markdown rendering of investigation reports.

use serde_json::{Map, Value};
use tabled::builder::Builder;
use tabled::settings::Style;

use crate::investigate::{InvestigationResult, TxnReport};
use crate::ledger::LedgerStats;

/// Widest cell in the batch summary table before truncation.
const SUMMARY_CELL_WIDTH: usize = 40;

fn cell_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn truncate(text: &str, width: usize) -> String {
    let flat = text.replace('\n', " ");
    if flat.chars().count() <= width {
        flat
    } else {
        let cut: String = flat.chars().take(width.saturating_sub(3)).collect();
        format!("{}...", cut)
    }
}

/// Plain-text grid table with a ruled line under every row.
pub fn grid(headers: &[String], rows: &[Vec<String>]) -> String {
    let mut builder = Builder::default();
    builder.push_record(headers.iter().cloned());
    for row in rows {
        builder.push_record(row.iter().cloned());
    }
    let mut table = builder.build();
    table.with(Style::ascii());

    let mut out = table.to_string();
    out.push('\n');
    out
}

/// One grid table per echoed system record.
pub fn evidence_tables(records: &Map<String, Value>) -> String {
    let mut out = String::new();
    for (system, record) in records {
        let (headers, row) = match record {
            Value::Object(fields) => (
                fields.keys().cloned().collect::<Vec<_>>(),
                fields.values().map(cell_text).collect::<Vec<_>>(),
            ),
            other => (vec!["value".to_string()], vec![cell_text(other)]),
        };
        out.push_str(system);
        out.push('\n');
        out.push_str(&grid(&headers, &[row]));
    }
    out
}

/// Full write-up for one investigated transaction.
pub fn detailed_report(result: &InvestigationResult) -> String {
    let mut out = format!(
        "**Details for {}**\n\
         **Root Cause:** {}\n\
         **Confidence Level:** {}\n\
         **Next Steps:** {}\n\
         **Summary Report:** {}\n",
        result.txn_id,
        result.root_cause,
        result.confidence_score,
        result.next_steps,
        result.summary_report
    );
    if !result.records.is_empty() {
        out.push_str("**System Evidence**\n```\n");
        out.push_str(&evidence_tables(&result.records));
        out.push_str("```\n");
    }
    out
}

/// One line naming the failure kind and cause.
pub fn failure_line(report: &TxnReport) -> Option<String> {
    report
        .error()
        .map(|e| format!("❌ **{}** ({}): {}", e.kind(), report.txn_id, e))
}

/// Everything to say about one transaction: failure line, then any result.
pub fn transaction_report(report: &TxnReport) -> String {
    let mut out = String::new();
    if let Some(line) = failure_line(report) {
        out.push_str(&line);
        out.push('\n');
    }
    if let Some(result) = report.result() {
        out.push_str(&detailed_report(result));
    }
    out
}

/// Summary table over a batch: id, root cause, confidence, next steps.
pub fn batch_summary(reports: &[TxnReport]) -> String {
    let headers = ["Transaction ID", "Root Cause", "Confidence Level", "Next Steps"]
        .map(String::from)
        .to_vec();
    let rows: Vec<Vec<String>> = reports
        .iter()
        .map(|r| match r.result() {
            Some(res) => vec![
                r.txn_id.clone(),
                truncate(&res.root_cause, SUMMARY_CELL_WIDTH),
                truncate(&res.confidence_score, SUMMARY_CELL_WIDTH),
                truncate(&res.next_steps, SUMMARY_CELL_WIDTH),
            ],
            None => vec![
                r.txn_id.clone(),
                r.stage.to_string(),
                "-".to_string(),
                "-".to_string(),
            ],
        })
        .collect();

    let succeeded = reports.iter().filter(|r| r.is_success()).count();
    format!(
        "**Transaction Investigation Summary** ({} of {} investigated cleanly)\n```\n{}```\n",
        succeeded,
        reports.len(),
        grid(&headers, &rows)
    )
}

pub fn ledger_stats(stats: &[LedgerStats]) -> String {
    let headers = ["Ledger", "Rows", "Unique ids", "Duplicates"]
        .map(String::from)
        .to_vec();
    let rows: Vec<Vec<String>> = stats
        .iter()
        .map(|s| {
            vec![
                s.ledger.display_name().to_string(),
                s.rows.to_string(),
                s.unique_ids.to_string(),
                s.duplicates.to_string(),
            ]
        })
        .collect();
    format!("**Loaded ledgers**\n```\n{}```", grid(&headers, &rows))
}
