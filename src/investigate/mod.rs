pub mod batch;
pub mod literal;
pub mod prompts;
pub mod sections;

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use futures::{Stream, StreamExt};
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::error::ReconError;
use crate::ledger::RecordStore;
use crate::llm::NarrativeGenerator;
use sections::ReplySections;

/// Where a transaction is in its investigation. The last four are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxnStage {
    Pending,
    LookedUp,
    EvidenceBuilt,
    Generated,
    NotFound,
    Parsed,
    GenerationFailed,
    ParseFailed,
}

impl fmt::Display for TxnStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TxnStage::Pending => "PENDING",
            TxnStage::LookedUp => "LOOKED_UP",
            TxnStage::EvidenceBuilt => "EVIDENCE_BUILT",
            TxnStage::Generated => "GENERATED",
            TxnStage::NotFound => "NOT_FOUND",
            TxnStage::Parsed => "PARSED",
            TxnStage::GenerationFailed => "GENERATION_FAILED",
            TxnStage::ParseFailed => "PARSE_FAILED",
        };
        f.write_str(name)
    }
}

/// Structured answer for one transaction.
#[derive(Debug, Clone)]
pub struct InvestigationResult {
    pub txn_id: String,
    pub root_cause: String,
    pub confidence_score: String,
    pub next_steps: String,
    pub summary_report: String,
    /// Ledger name → echoed record, in the order the model listed them.
    pub records: Map<String, Value>,
}

#[derive(Debug)]
pub enum TxnOutcome {
    Investigated(InvestigationResult),
    /// The reply came back but not every part of it could be read.
    Degraded {
        result: InvestigationResult,
        error: ReconError,
    },
    Failed(ReconError),
}

#[derive(Debug)]
pub struct TxnReport {
    pub txn_id: String,
    pub stage: TxnStage,
    pub outcome: TxnOutcome,
}

impl TxnReport {
    pub fn result(&self) -> Option<&InvestigationResult> {
        match &self.outcome {
            TxnOutcome::Investigated(result) | TxnOutcome::Degraded { result, .. } => Some(result),
            TxnOutcome::Failed(_) => None,
        }
    }

    pub fn error(&self) -> Option<&ReconError> {
        match &self.outcome {
            TxnOutcome::Investigated(_) => None,
            TxnOutcome::Degraded { error, .. } | TxnOutcome::Failed(error) => Some(error),
        }
    }

    pub fn is_success(&self) -> bool {
        self.stage == TxnStage::Parsed
    }
}

/// Knobs for one run.
#[derive(Debug, Clone, Copy)]
pub struct RunSettings {
    /// Maximum generation calls in flight during a batch.
    pub concurrency: usize,
    pub timeout: Duration,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            concurrency: 1,
            timeout: Duration::from_secs(120),
        }
    }
}

pub struct Investigator {
    store: Arc<RecordStore>,
    generator: Arc<dyn NarrativeGenerator>,
}

impl Investigator {
    pub fn new(store: Arc<RecordStore>, generator: Arc<dyn NarrativeGenerator>) -> Self {
        Self { store, generator }
    }

    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    /// Investigate one transaction. Never fails; failures are reported in the
    /// returned outcome.
    pub async fn investigate(&self, txn_id: &str, timeout: Duration) -> TxnReport {
        let mut stage = TxnStage::Pending;
        debug!(txn_id, %stage, "investigation queued");

        let evidence = self.store.evidence(txn_id);
        stage = TxnStage::LookedUp;
        debug!(txn_id, %stage, found = evidence.is_some(), "core banking lookup");

        let Some(bundle) = evidence else {
            let error = ReconError::NotFound {
                txn_id: txn_id.to_string(),
            };
            warn!(txn_id, "{}", error);
            return report(txn_id, TxnStage::NotFound, TxnOutcome::Failed(error));
        };

        let prompt = prompts::build(txn_id, &bundle);
        stage = TxnStage::EvidenceBuilt;
        debug!(
            txn_id,
            %stage,
            missing = ?bundle.missing(),
            prompt_len = prompt.len(),
            "evidence assembled"
        );

        let reply = match tokio::time::timeout(timeout, self.generator.generate(&prompt)).await {
            Ok(Ok(reply)) => reply,
            Ok(Err(e)) => {
                return generation_failed(txn_id, format!("{:#}", e));
            }
            Err(_) => {
                return generation_failed(
                    txn_id,
                    format!("no reply within {}s", timeout.as_secs_f32()),
                );
            }
        };
        stage = TxnStage::Generated;
        debug!(txn_id, %stage, reply_len = reply.len(), "reply received");

        match assemble(txn_id, &reply) {
            Ok(result) => {
                info!(txn_id, confidence = %result.confidence_score, "investigation complete");
                report(txn_id, TxnStage::Parsed, TxnOutcome::Investigated(result))
            }
            Err((result, error)) => {
                warn!(txn_id, "{}", error);
                report(
                    txn_id,
                    TxnStage::ParseFailed,
                    TxnOutcome::Degraded { result, error },
                )
            }
        }
    }

    /// Investigate every id independently, yielding each report as soon as
    /// it and every report before it are done. Output order matches input order.
    pub fn investigate_stream<'a>(
        &'a self,
        txn_ids: &'a [String],
        settings: RunSettings,
    ) -> impl Stream<Item = TxnReport> + Send + 'a {
        let workers = settings.concurrency.max(1);
        info!(count = txn_ids.len(), workers, "batch started");

        futures::stream::iter(txn_ids.iter().cloned())
            .map(move |id| async move { self.investigate(&id, settings.timeout).await })
            .buffered(workers)
    }
}

pub fn log_batch_finished(reports: &[TxnReport]) {
    let succeeded = reports.iter().filter(|r| r.is_success()).count();
    info!(
        count = reports.len(),
        succeeded,
        failed = reports.len() - succeeded,
        "batch finished"
    );
}

fn report(txn_id: &str, stage: TxnStage, outcome: TxnOutcome) -> TxnReport {
    TxnReport {
        txn_id: txn_id.to_string(),
        stage,
        outcome,
    }
}

fn generation_failed(txn_id: &str, reason: String) -> TxnReport {
    let error = ReconError::Generation {
        txn_id: txn_id.to_string(),
        reason,
    };
    warn!(txn_id, "{}", error);
    report(txn_id, TxnStage::GenerationFailed, TxnOutcome::Failed(error))
}

/// Turn a reply into a result. On failure the partially filled result comes
/// back alongside the error.
fn assemble(
    txn_id: &str,
    reply: &str,
) -> Result<InvestigationResult, (InvestigationResult, ReconError)> {
    let sections = ReplySections::parse(reply);
    let missing = sections.missing();

    let mut result = InvestigationResult {
        txn_id: txn_id.to_string(),
        root_cause: sections.root_cause,
        confidence_score: sections.confidence_score,
        next_steps: sections.next_steps,
        summary_report: sections.summary_report,
        records: Map::new(),
    };

    if missing.len() == prompts::SECTION_LABELS.len() {
        let error = ReconError::Parse {
            txn_id: txn_id.to_string(),
            reason: "reply contained none of the expected sections".to_string(),
        };
        return Err((result, error));
    }
    if !missing.is_empty() {
        debug!(txn_id, ?missing, "reply is missing sections");
    }

    match literal::parse_records(&sections.records) {
        Ok(records) => {
            result.records = records;
            Ok(result)
        }
        Err(e) => {
            let error = ReconError::Parse {
                txn_id: txn_id.to_string(),
                reason: format!("records section: {}", e),
            };
            Err((result, error))
        }
    }
}
