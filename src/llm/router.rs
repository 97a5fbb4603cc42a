use std::sync::Arc;

use log::{info, warn};
use serde::Serialize;
use tokio::sync::mpsc::Sender;

use crate::error::Result;
use crate::llm::extractor::send_event;
use crate::llm::generator::Generator;
use crate::llm::prompts::routing_prompt;
use crate::llm::types::PipelineEvent;
use crate::llm::utils::decode_routing_batch;
use crate::schema::{ClaimBatch, RoutingBatch, SeverityBatch};

#[derive(Debug, Clone, Serialize)]
struct RoutingInput {
    claim_id: String,
    severity: String,
    estimated_cost: f64,
    damage_location: String,
    damage_description: String,
    incident_description: String,
}

/// Pairs claims with their assessments by position; extra entries on either
/// side are dropped.
fn routing_inputs(batch: &ClaimBatch, severity: &SeverityBatch) -> Vec<RoutingInput> {
    batch
        .claims
        .iter()
        .zip(&severity.assessments)
        .enumerate()
        .map(|(idx, (claim, assessment))| RoutingInput {
            claim_id: claim.display_id(idx),
            severity: assessment.severity.clone(),
            estimated_cost: assessment.estimated_cost,
            damage_location: claim
                .damage
                .as_ref()
                .and_then(|d| d.location.clone())
                .unwrap_or_else(|| "Unknown".to_string()),
            damage_description: claim
                .damage
                .as_ref()
                .map(|d| d.description.clone())
                .unwrap_or_else(|| "No description".to_string()),
            incident_description: claim
                .incident_description
                .clone()
                .unwrap_or_else(|| "No incident description".to_string()),
        })
        .collect()
}

/// Stage III: assigns each claim a work queue and a 1-5 priority.
pub struct QueueRouter {
    generator: Arc<dyn Generator>,
}

impl QueueRouter {
    pub fn new(generator: Arc<dyn Generator>) -> Self {
        Self { generator }
    }

    pub async fn route(
        &self,
        batch: &ClaimBatch,
        severity: &SeverityBatch,
        progress: Option<&Sender<PipelineEvent>>,
    ) -> Result<RoutingBatch> {
        send_event(progress, PipelineEvent::Routing).await;

        if batch.len() != severity.assessments.len() {
            warn!(
                "Routing {} claim(s) against {} assessment(s); unmatched entries are skipped",
                batch.len(),
                severity.assessments.len()
            );
        }
        let inputs = routing_inputs(batch, severity);
        let claims_json = serde_json::to_string_pretty(&inputs)?;

        let response = self.generator.generate(&routing_prompt(&claims_json)).await?;
        let routing = decode_routing_batch(&response)?;

        info!("Routed {} claim(s)", routing.routings.len());
        send_event(
            progress,
            PipelineEvent::Routed {
                routings: routing.routings.len(),
            },
        )
        .await;

        Ok(routing)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::generator::mock::ScriptedGenerator;
    use crate::schema::{ClaimRecord, DamageInfo, SeverityAssessment};

    fn assessment(severity: &str, cost: f64) -> SeverityAssessment {
        SeverityAssessment {
            claim_id: None,
            severity: severity.to_string(),
            estimated_cost: cost,
            reasoning: None,
        }
    }

    #[test]
    fn test_inputs_truncate_to_shorter_side() {
        let batch = ClaimBatch::new(vec![
            ClaimRecord {
                claim_id: Some("C001".to_string()),
                damage: Some(DamageInfo::new("Cracked windshield")),
                ..Default::default()
            },
            ClaimRecord::default(),
        ]);
        let severity = SeverityBatch {
            assessments: vec![assessment("Minor", 300.0)],
        };

        let inputs = routing_inputs(&batch, &severity);
        assert_eq!(inputs.len(), 1);
        assert_eq!(inputs[0].claim_id, "C001");
        assert_eq!(inputs[0].damage_location, "Unknown");
        assert_eq!(inputs[0].damage_description, "Cracked windshield");
    }

    #[tokio::test]
    async fn test_route_claims() {
        let batch = ClaimBatch::new(vec![
            ClaimRecord {
                claim_id: Some("C001".to_string()),
                damage: Some(DamageInfo::new("Windshield chip")),
                ..Default::default()
            },
            ClaimRecord {
                claim_id: Some("C002".to_string()),
                damage: Some(DamageInfo::new("Frame bent, airbags deployed")),
                ..Default::default()
            },
        ]);
        let severity = SeverityBatch {
            assessments: vec![assessment("Minor", 250.0), assessment("Major", 18000.0)],
        };
        let response = r#"```json
{"routings": [
  {"claim_id": "C001", "queue": "glass", "priority": 4, "reasoning": "Glass only"},
  {"claim_id": "C002", "queue": "total_loss", "priority": 1, "reasoning": "Not drivable"}
]}
```"#;
        let generator = Arc::new(ScriptedGenerator::texts([response]));

        let routing = QueueRouter::new(generator.clone())
            .route(&batch, &severity, None)
            .await
            .unwrap();

        assert_eq!(routing.routings.len(), 2);
        assert_eq!(routing.routings[0].queue, "glass");
        assert_eq!(routing.routings[1].priority, 1);
        assert!(generator.prompts()[0].contains("\"severity\": \"Major\""));
    }
}
