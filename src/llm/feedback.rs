//! Self-review loop: the model critiques its own extraction against the source
//! text and rewrites it until the critique is satisfied or the round budget runs out.
//!
//! Each round runs CRITIQUING, then DECIDING, then (unless the loop stops) REFINING.
//! The loop never fails: every error inside a round is folded into the round's
//! result and the best batch seen so far is returned.

use std::sync::Arc;

use log::{info, warn};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::Sender;

use crate::config::FeedbackConfig;
use crate::error::{FnolError, Result};
use crate::llm::extractor::send_event;
use crate::llm::generator::Generator;
use crate::llm::prompts::{critique_prompt, refinement_prompt};
use crate::llm::types::PipelineEvent;
use crate::llm::utils::{decode_claim_batch, decode_quality_report};
use crate::schema::{ClaimBatch, QualityReport};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Converge,
    Exhaust,
    Refine,
}

/// Convergence needs both a score at or above target and `json_valid`.
/// The budget check only applies once convergence has been ruled out.
pub fn decide(report: &QualityReport, round: u32, config: &FeedbackConfig) -> Decision {
    if report.meets(config.target_score) {
        Decision::Converge
    } else if round >= config.max_rounds {
        Decision::Exhaust
    } else {
        Decision::Refine
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Termination {
    Converged { round: u32 },
    Exhausted { rounds: u32 },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RefinementOutcome {
    /// The batch was replaced by the refined one.
    Applied,
    /// The refinement came back unusable; the previous batch was kept.
    Rejected { reason: String },
    /// Not attempted because the critique call itself failed.
    Skipped { reason: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundSummary {
    pub round: u32,
    pub score: u8,
    pub json_valid: bool,
    pub issues: usize,
    pub critique_error: Option<String>,
    /// `None` when the round ended the loop.
    pub refinement: Option<RefinementOutcome>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackOutcome {
    pub batch: ClaimBatch,
    pub termination: Termination,
    pub rounds: Vec<RoundSummary>,
    pub critique_calls: u32,
    pub refinement_calls: u32,
}

impl FeedbackOutcome {
    pub fn converged(&self) -> bool {
        matches!(self.termination, Termination::Converged { .. })
    }

    pub fn generator_calls(&self) -> u32 {
        self.critique_calls + self.refinement_calls
    }

    pub fn final_score(&self) -> Option<u8> {
        self.rounds.last().map(|r| r.score)
    }
}

enum Critique {
    Report(QualityReport),
    /// The response (or its deadline) was unusable; scored as 0 / not valid.
    Unusable(String),
    /// The generator itself failed; the round ends without a refinement.
    Failed(String),
}

pub struct FeedbackLoop {
    generator: Arc<dyn Generator>,
    config: FeedbackConfig,
}

impl FeedbackLoop {
    pub fn new(generator: Arc<dyn Generator>, config: FeedbackConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { generator, config })
    }

    pub fn config(&self) -> &FeedbackConfig {
        &self.config
    }

    pub async fn run(
        &self,
        source_text: &str,
        initial: ClaimBatch,
        progress: Option<&Sender<PipelineEvent>>,
    ) -> FeedbackOutcome {
        let mut batch = initial;
        let mut rounds = Vec::new();
        let mut critique_calls = 0;
        let mut refinement_calls = 0;

        for round in 1..=self.config.max_rounds {
            critique_calls += 1;
            let (report, critique_error, critique_failed) =
                match self.critique(source_text, &batch).await {
                    Critique::Report(report) => (report, None, false),
                    Critique::Unusable(reason) => {
                        warn!("Feedback round {}: critique unusable: {}", round, reason);
                        (QualityReport::unusable(), Some(reason), false)
                    }
                    Critique::Failed(reason) => {
                        warn!("Feedback round {}: critique call failed: {}", round, reason);
                        (QualityReport::unusable(), Some(reason), true)
                    }
                };

            info!(
                "Feedback round {}/{}: score {}/10, json_valid: {}, {} issue(s)",
                round,
                self.config.max_rounds,
                report.overall_quality_score,
                report.json_valid,
                report.issues.len()
            );
            send_event(
                progress,
                PipelineEvent::CritiqueReceived {
                    round,
                    score: report.overall_quality_score,
                    json_valid: report.json_valid,
                    issues: report.issues.len(),
                },
            )
            .await;

            let mut summary = RoundSummary {
                round,
                score: report.overall_quality_score,
                json_valid: report.json_valid,
                issues: report.issues.len(),
                critique_error,
                refinement: None,
            };

            match decide(&report, round, &self.config) {
                Decision::Converge => {
                    info!("Feedback loop converged after {} round(s)", round);
                    rounds.push(summary);
                    send_event(progress, PipelineEvent::Converged { round }).await;
                    return FeedbackOutcome {
                        batch,
                        termination: Termination::Converged { round },
                        rounds,
                        critique_calls,
                        refinement_calls,
                    };
                }
                Decision::Exhaust => {
                    rounds.push(summary);
                    break;
                }
                Decision::Refine if critique_failed => {
                    summary.refinement = Some(RefinementOutcome::Skipped {
                        reason: summary.critique_error.clone().unwrap_or_default(),
                    });
                }
                Decision::Refine => {
                    refinement_calls += 1;
                    match self.refine(source_text, &batch, &report).await {
                        Ok(refined) => {
                            if refined.len() != batch.len() {
                                warn!(
                                    "Feedback round {}: refinement changed claim count from {} to {}",
                                    round,
                                    batch.len(),
                                    refined.len()
                                );
                            }
                            send_event(
                                progress,
                                PipelineEvent::Refined {
                                    round,
                                    claims: refined.len(),
                                },
                            )
                            .await;
                            batch = refined;
                            summary.refinement = Some(RefinementOutcome::Applied);
                        }
                        Err(e) => {
                            warn!(
                                "Feedback round {}: keeping previous claims, refinement rejected: {}",
                                round, e
                            );
                            let reason = e.to_string();
                            send_event(
                                progress,
                                PipelineEvent::RefinementRejected {
                                    round,
                                    reason: reason.clone(),
                                },
                            )
                            .await;
                            summary.refinement = Some(RefinementOutcome::Rejected { reason });
                        }
                    }
                }
            }

            rounds.push(summary);
        }

        let spent = self.config.max_rounds;
        info!(
            "Feedback loop exhausted {} round(s) without reaching score {}",
            spent, self.config.target_score
        );
        send_event(progress, PipelineEvent::Exhausted { rounds: spent }).await;

        FeedbackOutcome {
            batch,
            termination: Termination::Exhausted { rounds: spent },
            rounds,
            critique_calls,
            refinement_calls,
        }
    }

    async fn call(&self, prompt: &str) -> Result<String> {
        match tokio::time::timeout(self.config.call_timeout, self.generator.generate(prompt)).await
        {
            Ok(result) => result,
            Err(_) => Err(FnolError::Timeout(self.config.call_timeout)),
        }
    }

    async fn critique(&self, source_text: &str, batch: &ClaimBatch) -> Critique {
        let batch_json = match batch.to_canonical_json() {
            Ok(json) => json,
            Err(e) => return Critique::Failed(e.to_string()),
        };

        match self.call(&critique_prompt(source_text, &batch_json)).await {
            Ok(response) => match decode_quality_report(&response) {
                Ok(report) => Critique::Report(report),
                Err(e) => Critique::Unusable(e.to_string()),
            },
            Err(e) if e.is_decode_failure() => Critique::Unusable(e.to_string()),
            Err(e) => Critique::Failed(e.to_string()),
        }
    }

    async fn refine(
        &self,
        source_text: &str,
        batch: &ClaimBatch,
        report: &QualityReport,
    ) -> Result<ClaimBatch> {
        let batch_json = batch.to_canonical_json()?;
        let report_json = serde_json::to_string_pretty(report)?;

        let response = self
            .call(&refinement_prompt(source_text, &batch_json, &report_json))
            .await?;
        decode_claim_batch(&response)
    }
}
