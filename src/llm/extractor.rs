use std::sync::Arc;

use log::info;
use tokio::sync::mpsc::Sender;

use crate::error::Result;
use crate::llm::generator::Generator;
use crate::llm::prompts::extraction_prompt;
use crate::llm::types::PipelineEvent;
use crate::llm::utils::decode_claim_batch;
use crate::schema::ClaimBatch;

/// Stage I: pulls every claim out of a free-text FNOL narrative.
pub struct ClaimExtractor {
    generator: Arc<dyn Generator>,
}

impl ClaimExtractor {
    pub fn new(generator: Arc<dyn Generator>) -> Self {
        Self { generator }
    }

    /// One generator call, no retries at this level: there is no earlier batch
    /// to fall back on, so any decode or schema failure is returned to the caller.
    pub async fn extract(
        &self,
        raw_text: &str,
        progress: Option<&Sender<PipelineEvent>>,
    ) -> Result<ClaimBatch> {
        send_event(progress, PipelineEvent::Extracting).await;

        let response = self.generator.generate(&extraction_prompt(raw_text)).await?;
        let batch = decode_claim_batch(&response)?;

        info!("Extracted {} claim(s) from FNOL text", batch.len());
        send_event(progress, PipelineEvent::Extracted { claims: batch.len() }).await;

        Ok(batch)
    }
}

pub(crate) async fn send_event(sender: Option<&Sender<PipelineEvent>>, event: PipelineEvent) {
    if let Some(tx) = sender {
        let _ = tx.send(event).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FnolError;
    use crate::llm::generator::mock::ScriptedGenerator;

    #[tokio::test]
    async fn test_extract_multiple_claims() {
        let response = r#"{
          "claims": [
            {"claim_id": "C001", "incident_date": "2024-12-15", "incident_location": "Highway",
             "policyholder_name": "John Smith",
             "vehicle": {"make": "Toyota", "model": "Camry", "year": 2018},
             "damage": {"description": "Small chip in windshield", "location": "windshield"},
             "other_parties_involved": false, "police_report_filed": false},
            {"claim_id": "C002", "incident_date": "2024-12-16",
             "incident_location": "Grocery store parking lot", "policyholder_name": "Sarah Johnson",
             "vehicle": {"make": "Honda", "model": "Civic", "year": 2020},
             "damage": {"description": "Dented rear bumper and broken taillight"},
             "other_parties_involved": true}
          ]
        }"#;
        let generator = Arc::new(ScriptedGenerator::texts([response]));
        let extractor = ClaimExtractor::new(generator.clone());

        let batch = extractor.extract("Multiple claims text", None).await.unwrap();

        assert_eq!(batch.len(), 2);
        assert_eq!(batch.claims[0].claim_id.as_deref(), Some("C001"));
        assert_eq!(batch.claims[1].claim_id.as_deref(), Some("C002"));
        assert_eq!(batch.claims[0].vehicle.make.as_deref(), Some("Toyota"));
        assert_eq!(batch.claims[1].vehicle.make.as_deref(), Some("Honda"));
        assert_eq!(generator.call_count(), 1);
        assert!(generator.prompts()[0].contains("Multiple claims text"));
    }

    #[tokio::test]
    async fn test_extract_malformed_response_is_fatal() {
        let generator = Arc::new(ScriptedGenerator::texts(["I could not find any claims."]));
        let extractor = ClaimExtractor::new(generator);

        let err = extractor.extract("text", None).await.unwrap_err();
        assert!(matches!(err, FnolError::Decode { .. }));
    }

    #[tokio::test]
    async fn test_extract_reports_progress() {
        let generator = Arc::new(ScriptedGenerator::texts([r#"{"claims": []}"#]));
        let extractor = ClaimExtractor::new(generator);
        let (tx, mut rx) = tokio::sync::mpsc::channel(8);

        extractor.extract("text", Some(&tx)).await.unwrap();
        drop(tx);

        assert!(matches!(rx.recv().await, Some(PipelineEvent::Extracting)));
        assert!(matches!(
            rx.recv().await,
            Some(PipelineEvent::Extracted { claims: 0 })
        ));
    }
}
