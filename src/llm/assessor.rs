use std::sync::Arc;

use log::{info, warn};
use serde::Serialize;
use tokio::sync::mpsc::Sender;

use crate::error::Result;
use crate::llm::extractor::send_event;
use crate::llm::generator::Generator;
use crate::llm::prompts::severity_prompt;
use crate::llm::types::PipelineEvent;
use crate::llm::utils::decode_severity_batch;
use crate::schema::{ClaimBatch, ClaimRecord, SeverityBatch};

#[derive(Debug, Clone, Serialize)]
struct SeverityInput {
    claim_id: String,
    loss_desc: String,
    damage_area: String,
    incident_description: String,
}

impl SeverityInput {
    fn from_claim(index: usize, claim: &ClaimRecord) -> Self {
        Self {
            claim_id: claim.display_id(index),
            loss_desc: claim
                .damage
                .as_ref()
                .map(|d| d.description.clone())
                .unwrap_or_else(|| "No damage description provided".to_string()),
            damage_area: claim
                .damage
                .as_ref()
                .and_then(|d| d.location.clone())
                .unwrap_or_else(|| "Unknown".to_string()),
            incident_description: claim
                .incident_description
                .clone()
                .unwrap_or_else(|| "No incident description".to_string()),
        }
    }
}

/// Stage II: classifies each claim as Minor/Moderate/Major with a cost estimate.
pub struct SeverityAssessor {
    generator: Arc<dyn Generator>,
}

impl SeverityAssessor {
    pub fn new(generator: Arc<dyn Generator>) -> Self {
        Self { generator }
    }

    pub async fn assess(
        &self,
        batch: &ClaimBatch,
        progress: Option<&Sender<PipelineEvent>>,
    ) -> Result<SeverityBatch> {
        send_event(progress, PipelineEvent::AssessingSeverity).await;

        let inputs: Vec<SeverityInput> = batch
            .claims
            .iter()
            .enumerate()
            .map(|(idx, claim)| SeverityInput::from_claim(idx, claim))
            .collect();
        let claims_json = serde_json::to_string_pretty(&inputs)?;

        let response = self.generator.generate(&severity_prompt(&claims_json)).await?;
        let assessments = decode_severity_batch(&response)?;

        if assessments.assessments.len() != batch.len() {
            warn!(
                "Severity assessment returned {} result(s) for {} claim(s)",
                assessments.assessments.len(),
                batch.len()
            );
        }
        info!(
            "Assessed {} claim(s), total estimated cost ${:.2}",
            assessments.assessments.len(),
            assessments.total_estimated_cost()
        );
        send_event(
            progress,
            PipelineEvent::SeverityAssessed {
                assessments: assessments.assessments.len(),
            },
        )
        .await;

        Ok(assessments)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::generator::mock::ScriptedGenerator;
    use crate::schema::DamageInfo;

    #[tokio::test]
    async fn test_assess_claims() {
        let batch = ClaimBatch::new(vec![
            ClaimRecord {
                claim_id: Some("C001".to_string()),
                damage: Some(DamageInfo {
                    location: Some("windshield".to_string()),
                    ..DamageInfo::new("Small windshield chip")
                }),
                ..Default::default()
            },
            ClaimRecord {
                damage: Some(DamageInfo::new("Severe collision damage with airbag deployment")),
                ..Default::default()
            },
        ]);
        let response = r#"{
          "assessments": [
            {"claim_id": "C001", "severity": "Minor", "estimated_cost": 250.0, "reasoning": "Small cosmetic damage to windshield"},
            {"claim_id": "CLAIM-2", "severity": "Major", "estimated_cost": 15000.0, "reasoning": "Airbag deployment"}
          ]
        }"#;
        let generator = Arc::new(ScriptedGenerator::texts([response]));

        let result = SeverityAssessor::new(generator.clone())
            .assess(&batch, None)
            .await
            .unwrap();

        assert_eq!(result.assessments.len(), 2);
        assert_eq!(result.assessments[0].severity, "Minor");
        assert_eq!(result.assessments[1].severity, "Major");
        assert_eq!(result.total_estimated_cost(), 15250.0);

        let prompt = &generator.prompts()[0];
        assert!(prompt.contains("\"claim_id\": \"CLAIM-2\""));
        assert!(prompt.contains("\"damage_area\": \"windshield\""));
        assert!(prompt.contains("\"damage_area\": \"Unknown\""));
        assert!(prompt.contains("No incident description"));
    }

    #[test]
    fn test_input_defaults_without_damage() {
        let input = SeverityInput::from_claim(0, &ClaimRecord::default());
        assert_eq!(input.claim_id, "CLAIM-1");
        assert_eq!(input.loss_desc, "No damage description provided");
        assert_eq!(input.damage_area, "Unknown");
    }

    #[tokio::test]
    async fn test_negative_cost_is_schema_error() {
        let generator = Arc::new(ScriptedGenerator::texts([
            r#"{"assessments": [{"severity": "Minor", "estimated_cost": -100}]}"#,
        ]));
        let err = SeverityAssessor::new(generator)
            .assess(&ClaimBatch::default(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, crate::error::FnolError::Schema { .. }));
    }
}
