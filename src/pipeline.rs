use std::sync::Arc;

use chrono::{DateTime, Utc};
use log::info;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::Sender;

use crate::config::FeedbackConfig;
#[cfg(feature = "gemini")]
use crate::config::PipelineConfig;
use crate::error::Result;
use crate::llm::extractor::send_event;
use crate::llm::{
    ClaimExtractor, FeedbackLoop, Generator, PipelineEvent, QueueRouter, RoundSummary,
    SeverityAssessor, Termination,
};
use crate::schema::{ClaimBatch, RoutingBatch, SeverityBatch};
use crate::validation::ValidationSummary;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackTrace {
    pub termination: Termination,
    pub rounds: Vec<RoundSummary>,
    pub generator_calls: u32,
}

/// Everything one run of the pipeline produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineRun {
    pub processed_at: DateTime<Utc>,
    pub claims: ClaimBatch,
    pub validation: ValidationSummary,
    pub feedback: Option<FeedbackTrace>,
    pub severity: SeverityBatch,
    pub routing: RoutingBatch,
}

/// Extraction, optional self-review, severity assessment, then queue routing.
pub struct FnolPipeline {
    generator: Arc<dyn Generator>,
    extractor: ClaimExtractor,
    feedback: Option<FeedbackLoop>,
    assessor: SeverityAssessor,
    router: QueueRouter,
    progress: Option<Sender<PipelineEvent>>,
}

impl FnolPipeline {
    pub fn new(generator: Arc<dyn Generator>) -> Self {
        Self {
            extractor: ClaimExtractor::new(generator.clone()),
            feedback: None,
            assessor: SeverityAssessor::new(generator.clone()),
            router: QueueRouter::new(generator.clone()),
            progress: None,
            generator,
        }
    }

    /// Builds a Gemini-backed pipeline. Fails before any network activity if the
    /// configuration is incomplete.
    #[cfg(feature = "gemini")]
    pub fn from_config(config: &PipelineConfig) -> Result<Self> {
        config.validate()?;
        let client = crate::llm::GeminiClient::new(config.gemini.clone())?;
        let pipeline = Self::new(Arc::new(client));

        if config.enable_feedback {
            pipeline.with_feedback(config.feedback.clone())
        } else {
            Ok(pipeline)
        }
    }

    /// Enables the critique/refine loop between extraction and assessment.
    pub fn with_feedback(mut self, config: FeedbackConfig) -> Result<Self> {
        self.feedback = Some(FeedbackLoop::new(self.generator.clone(), config)?);
        Ok(self)
    }

    pub fn with_progress(mut self, sender: Sender<PipelineEvent>) -> Self {
        self.progress = Some(sender);
        self
    }

    pub fn feedback_enabled(&self) -> bool {
        self.feedback.is_some()
    }

    pub async fn run(&self, raw_text: &str) -> Result<PipelineRun> {
        let progress = self.progress.as_ref();
        send_event(progress, PipelineEvent::Starting).await;

        match self.run_stages(raw_text, progress).await {
            Ok(run) => {
                send_event(progress, PipelineEvent::Success).await;
                Ok(run)
            }
            Err(e) => {
                send_event(
                    progress,
                    PipelineEvent::Failed {
                        reason: e.to_string(),
                    },
                )
                .await;
                Err(e)
            }
        }
    }

    async fn run_stages(
        &self,
        raw_text: &str,
        progress: Option<&Sender<PipelineEvent>>,
    ) -> Result<PipelineRun> {
        let mut claims = self.extractor.extract(raw_text, progress).await?;

        let mut feedback = None;
        if let Some(controller) = &self.feedback {
            let outcome = controller.run(raw_text, claims, progress).await;
            feedback = Some(FeedbackTrace {
                termination: outcome.termination.clone(),
                generator_calls: outcome.generator_calls(),
                rounds: outcome.rounds,
            });
            claims = outcome.batch;
        }

        let validation = claims.validate_all();
        info!(
            "Validation: {} of {} claim(s) complete",
            validation.valid_claims, validation.total_claims
        );

        let (severity, routing) = if claims.is_empty() {
            info!("No claims extracted; skipping severity assessment and routing");
            (SeverityBatch::default(), RoutingBatch::default())
        } else {
            let severity = self.assessor.assess(&claims, progress).await?;
            let routing = self.router.route(&claims, &severity, progress).await?;
            (severity, routing)
        };

        Ok(PipelineRun {
            processed_at: Utc::now(),
            claims,
            validation,
            feedback,
            severity,
            routing,
        })
    }
}
