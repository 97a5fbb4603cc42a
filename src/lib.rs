//! # FNOL Triage
//!
//! Turns free-text First-Notice-of-Loss narratives into structured claim records,
//! severity estimates and work-queue routing decisions, delegating the reasoning
//! for each stage to an LLM.
//!
//! ## Stages
//!
//! - **Extraction**: narrative text to a [`ClaimBatch`]
//! - **Self-review** (optional): the model critiques and rewrites its own extraction
//!   until a [`QualityReport`] reaches the target score or the round budget runs out
//! - **Severity**: Minor / Moderate / Major with an estimated repair cost
//! - **Routing**: glass, fast_track, material_damage or total_loss with a 1-5 priority
//!
//! Every model response goes through [`sanitize_response`] and a typed decoder, so a
//! malformed reply surfaces as [`FnolError::Decode`] or [`FnolError::Schema`] rather
//! than a half-filled record.
//!
//! ## Example
//!
//! ```rust,ignore
//! use fnol_triage::*;
//!
//! let config = PipelineConfig::from_env()?.with_feedback(true);
//! let pipeline = FnolPipeline::from_config(&config)?;
//!
//! let text = read_fnol_text(std::path::Path::new("inputs/sample_fnol.txt"))?;
//! let run = pipeline.run(&text).await?;
//! println!("{}", format_run_report(&text, &run));
//! ```

pub mod config;
pub mod error;
pub mod ingestion;
pub mod llm;
pub mod pipeline;
pub mod report;
pub mod schema;
pub mod stats;
pub mod utils;
pub mod validation;

pub use config::{FeedbackConfig, GeminiSettings, PipelineConfig};
pub use error::{FnolError, Result};
pub use ingestion::{read_fnol_text, DEFAULT_INPUT_PATH};
#[cfg(feature = "gemini")]
pub use llm::GeminiClient;
pub use llm::{
    decide, decode_claim_batch, decode_quality_report, decode_routing_batch,
    decode_severity_batch, sanitize_response, ClaimExtractor, Decision, FeedbackLoop,
    FeedbackOutcome, Generator, PipelineEvent, QueueRouter, RefinementOutcome, RoundSummary,
    SeverityAssessor, Termination,
};
pub use pipeline::{FeedbackTrace, FnolPipeline, PipelineRun};
pub use report::format_run_report;
pub use schema::*;
pub use stats::{QueueBreakdown, SeverityBreakdown};
pub use validation::{validate_required_fields, InvalidClaim, ValidationSummary};
