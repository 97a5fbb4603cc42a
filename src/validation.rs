use serde::{Deserialize, Serialize};

use crate::schema::{ClaimBatch, ClaimRecord};

fn is_missing(value: &Option<String>) -> bool {
    value.as_deref().map_or(true, |v| v.trim().is_empty())
}

/// Checks the fields a claim cannot be processed without.
///
/// Returns whether the claim is complete and, in a fixed order, the dotted
/// names of the fields that are absent or blank.
pub fn validate_required_fields(claim: &ClaimRecord) -> (bool, Vec<String>) {
    let mut missing_fields = Vec::new();

    if is_missing(&claim.incident_date) {
        missing_fields.push("incident_date".to_string());
    }
    if is_missing(&claim.incident_location) {
        missing_fields.push("incident_location".to_string());
    }
    if is_missing(&claim.policyholder_name) {
        missing_fields.push("policyholder_name".to_string());
    }
    let has_description = claim
        .damage
        .as_ref()
        .is_some_and(|d| !d.description.trim().is_empty());
    if !has_description {
        missing_fields.push("damage.description".to_string());
    }

    (missing_fields.is_empty(), missing_fields)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvalidClaim {
    pub index: usize,
    pub claim_id: Option<String>,
    pub missing_fields: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationSummary {
    pub total_claims: usize,
    pub valid_claims: usize,
    pub invalid_claims: usize,
    pub invalid_details: Vec<InvalidClaim>,
}

impl ClaimBatch {
    pub fn validate_all(&self) -> ValidationSummary {
        let mut summary = ValidationSummary {
            total_claims: self.claims.len(),
            ..Default::default()
        };

        for (index, claim) in self.claims.iter().enumerate() {
            let (is_valid, missing_fields) = validate_required_fields(claim);
            if is_valid {
                summary.valid_claims += 1;
            } else {
                summary.invalid_details.push(InvalidClaim {
                    index,
                    claim_id: claim.claim_id.clone(),
                    missing_fields,
                });
            }
        }

        summary.invalid_claims = summary.invalid_details.len();
        summary
    }
}
