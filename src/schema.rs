use std::fmt;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::utils::{
    default_true, lenient_flag, null_as_default, opt_bool, opt_f64, opt_i32, opt_string,
    quality_score, req_f64, routing_priority, text,
};

/// Bounds checks applied after a payload has been deserialized.
pub trait Validate {
    fn validate(&self) -> std::result::Result<(), String>;
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct VehicleInfo {
    #[serde(default)]
    #[schemars(description = "Vehicle manufacturer (e.g., Toyota, Honda)")]
    pub make: Option<String>,

    #[serde(default)]
    #[schemars(description = "Vehicle model (e.g., Camry, Civic)")]
    pub model: Option<String>,

    #[serde(default, deserialize_with = "opt_i32")]
    #[schemars(description = "Vehicle model year, between 1900 and 2100")]
    pub year: Option<i32>,

    #[serde(default)]
    #[schemars(description = "Vehicle Identification Number")]
    pub vin: Option<String>,

    #[serde(default)]
    #[schemars(description = "License plate number")]
    pub license_plate: Option<String>,

    #[serde(default)]
    #[schemars(description = "Vehicle color")]
    pub color: Option<String>,
}

impl VehicleInfo {
    /// "2018 Toyota Camry" style label, `None` when nothing identifying is known.
    pub fn summary(&self) -> Option<String> {
        if self.year.is_none() && self.make.is_none() && self.model.is_none() {
            return None;
        }
        let parts = [
            self.year.map(|y| y.to_string()),
            self.make.clone(),
            self.model.clone(),
        ];
        Some(
            parts
                .into_iter()
                .flatten()
                .collect::<Vec<_>>()
                .join(" "),
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct DamageInfo {
    #[schemars(description = "Detailed description of the damage")]
    pub description: String,

    #[serde(default)]
    #[schemars(
        description = "Location on the vehicle where damage occurred (e.g., front bumper, driver side door)"
    )]
    pub location: Option<String>,

    #[serde(default)]
    #[schemars(description = "Severity of damage (minor, moderate, severe)")]
    pub severity: Option<String>,

    #[serde(default, deserialize_with = "opt_f64")]
    #[schemars(description = "Estimated cost to repair, numeric value only, never negative")]
    pub estimated_repair_cost: Option<f64>,
}

impl DamageInfo {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            location: None,
            severity: None,
            estimated_repair_cost: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ClaimRecord {
    #[serde(default, deserialize_with = "opt_string")]
    #[schemars(description = "Unique claim identifier, if mentioned")]
    pub claim_id: Option<String>,

    #[serde(default)]
    #[schemars(description = "Date and time of the incident")]
    pub incident_date: Option<String>,

    #[serde(default)]
    #[schemars(description = "Location where the incident occurred")]
    pub incident_location: Option<String>,

    #[serde(default)]
    #[schemars(description = "Name of the policyholder")]
    pub policyholder_name: Option<String>,

    #[serde(default)]
    pub contact_phone: Option<String>,

    #[serde(default)]
    pub contact_email: Option<String>,

    #[serde(default, deserialize_with = "null_as_default")]
    pub vehicle: VehicleInfo,

    #[serde(default)]
    pub damage: Option<DamageInfo>,

    #[serde(default)]
    #[schemars(description = "Description of how the incident occurred")]
    pub incident_description: Option<String>,

    #[serde(default, deserialize_with = "opt_bool")]
    pub other_parties_involved: Option<bool>,

    #[serde(default, deserialize_with = "opt_bool")]
    pub police_report_filed: Option<bool>,
}

impl ClaimRecord {
    /// The claim id, or the positional placeholder `CLAIM-{n}` when the text had none.
    pub fn display_id(&self, index: usize) -> String {
        self.claim_id
            .clone()
            .unwrap_or_else(|| format!("CLAIM-{}", index + 1))
    }
}

/// Claims in the order they were found in the source text.
///
/// `claims` is required: a reply without it is some other object, not an empty batch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ClaimBatch {
    pub claims: Vec<ClaimRecord>,
}

impl ClaimBatch {
    pub fn new(claims: Vec<ClaimRecord>) -> Self {
        Self { claims }
    }

    pub fn len(&self) -> usize {
        self.claims.len()
    }

    pub fn is_empty(&self) -> bool {
        self.claims.is_empty()
    }

    /// The serialization embedded in critique and refinement requests.
    pub fn to_canonical_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

impl Validate for ClaimBatch {
    fn validate(&self) -> std::result::Result<(), String> {
        for (idx, claim) in self.claims.iter().enumerate() {
            let id = claim.display_id(idx);
            if let Some(year) = claim.vehicle.year {
                if !(1900..=2100).contains(&year) {
                    return Err(format!(
                        "Claim {}: vehicle.year {} is outside 1900-2100",
                        id, year
                    ));
                }
            }
            if let Some(cost) = claim.damage.as_ref().and_then(|d| d.estimated_repair_cost) {
                if !cost.is_finite() || cost < 0.0 {
                    return Err(format!(
                        "Claim {}: damage.estimated_repair_cost {} must be >= 0",
                        id, cost
                    ));
                }
            }
        }
        Ok(())
    }
}

/// One discrepancy between the source text and a single field of a single claim.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Issue {
    #[serde(default, deserialize_with = "opt_string")]
    pub claim_id: Option<String>,

    #[serde(default, deserialize_with = "text")]
    pub field: String,

    #[serde(default, deserialize_with = "text")]
    pub issue: String,

    #[serde(default, deserialize_with = "text")]
    pub suggestion: String,
}

/// One critique round's verdict on the current batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct QualityReport {
    #[serde(default, deserialize_with = "text")]
    pub feedback: String,

    #[serde(default, deserialize_with = "null_as_default")]
    pub issues: Vec<Issue>,

    #[serde(default = "default_true", deserialize_with = "lenient_flag")]
    pub json_valid: bool,

    #[serde(default, deserialize_with = "quality_score")]
    #[schemars(range(min = 1, max = 10))]
    pub overall_quality_score: u8,
}

impl QualityReport {
    /// Stand-in for a critique whose response could not be used.
    pub fn unusable() -> Self {
        Self {
            feedback: String::new(),
            issues: Vec::new(),
            json_valid: false,
            overall_quality_score: 0,
        }
    }

    pub fn meets(&self, target_score: u8) -> bool {
        self.json_valid && self.overall_quality_score >= target_score
    }
}

impl Validate for QualityReport {
    fn validate(&self) -> std::result::Result<(), String> {
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SeverityAssessment {
    #[serde(default, deserialize_with = "opt_string")]
    pub claim_id: Option<String>,

    #[schemars(description = "Damage severity: Minor, Moderate, or Major")]
    pub severity: String,

    #[serde(deserialize_with = "req_f64")]
    #[schemars(description = "Estimated repair cost in dollars")]
    pub estimated_cost: f64,

    #[serde(default)]
    pub reasoning: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SeverityBatch {
    #[serde(default, deserialize_with = "null_as_default")]
    pub assessments: Vec<SeverityAssessment>,
}

impl SeverityBatch {
    pub fn total_estimated_cost(&self) -> f64 {
        self.assessments.iter().map(|a| a.estimated_cost).sum()
    }
}

impl Validate for SeverityBatch {
    fn validate(&self) -> std::result::Result<(), String> {
        for (idx, assessment) in self.assessments.iter().enumerate() {
            if !assessment.estimated_cost.is_finite() || assessment.estimated_cost < 0.0 {
                return Err(format!(
                    "Assessment #{}: estimated_cost {} must be >= 0",
                    idx, assessment.estimated_cost
                ));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct QueueRouting {
    #[serde(default, deserialize_with = "opt_string")]
    pub claim_id: Option<String>,

    #[schemars(description = "Assigned queue: glass, fast_track, material_damage, or total_loss")]
    pub queue: String,

    #[serde(deserialize_with = "routing_priority")]
    #[schemars(range(min = 1, max = 5))]
    pub priority: u8,

    #[serde(default)]
    pub reasoning: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RoutingBatch {
    #[serde(default, deserialize_with = "null_as_default")]
    pub routings: Vec<QueueRouting>,
}

impl Validate for RoutingBatch {
    fn validate(&self) -> std::result::Result<(), String> {
        for (idx, routing) in self.routings.iter().enumerate() {
            if routing.queue.trim().is_empty() {
                return Err(format!("Routing #{}: queue is empty", idx));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SeverityLevel {
    Minor,
    Moderate,
    Major,
}

impl SeverityLevel {
    pub fn parse(label: &str) -> Option<Self> {
        match label.trim().to_lowercase().as_str() {
            "minor" => Some(Self::Minor),
            "moderate" => Some(Self::Moderate),
            "major" => Some(Self::Major),
            _ => None,
        }
    }
}

impl fmt::Display for SeverityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Minor => "Minor",
            Self::Moderate => "Moderate",
            Self::Major => "Major",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Queue {
    Glass,
    FastTrack,
    MaterialDamage,
    TotalLoss,
}

impl Queue {
    pub const ALL: [Queue; 4] = [
        Queue::Glass,
        Queue::FastTrack,
        Queue::MaterialDamage,
        Queue::TotalLoss,
    ];

    pub fn parse(label: &str) -> Option<Self> {
        match label.trim().to_lowercase().as_str() {
            "glass" => Some(Self::Glass),
            "fast_track" => Some(Self::FastTrack),
            "material_damage" => Some(Self::MaterialDamage),
            "total_loss" => Some(Self::TotalLoss),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Glass => "glass",
            Self::FastTrack => "fast_track",
            Self::MaterialDamage => "material_damage",
            Self::TotalLoss => "total_loss",
        }
    }
}

impl fmt::Display for Queue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::utils::decode_claim_batch;

    fn sample_claim() -> ClaimRecord {
        ClaimRecord {
            claim_id: Some("C001".to_string()),
            incident_date: Some("2024-12-15".to_string()),
            incident_location: Some("Highway 101".to_string()),
            policyholder_name: Some("John Smith".to_string()),
            vehicle: VehicleInfo {
                make: Some("Toyota".to_string()),
                model: Some("Camry".to_string()),
                year: Some(2018),
                ..Default::default()
            },
            damage: Some(DamageInfo {
                description: "Small chip in windshield".to_string(),
                location: Some("windshield".to_string()),
                severity: Some("minor".to_string()),
                estimated_repair_cost: Some(250.0),
            }),
            other_parties_involved: Some(false),
            ..Default::default()
        }
    }

    fn full_claim(index: u32, cost: f64) -> ClaimRecord {
        ClaimRecord {
            claim_id: Some(format!("C{:03}", index)),
            incident_date: Some("2024-12-10T14:30:00".to_string()),
            incident_location: Some("I-5 North near Mercer St, Seattle".to_string()),
            policyholder_name: Some("Sarah Johnson".to_string()),
            contact_phone: Some("206-555-0142".to_string()),
            contact_email: Some("sarah.johnson@example.com".to_string()),
            vehicle: VehicleInfo {
                make: Some("Toyota".to_string()),
                model: Some("Camry".to_string()),
                year: Some(1990 + (index % 35) as i32),
                vin: Some("4T1B11HK5JU123456".to_string()),
                license_plate: Some("ABC-1234".to_string()),
                color: Some("silver".to_string()),
            },
            damage: Some(DamageInfo {
                description: "Rear bumper crushed, trunk lid \"won't\" close".to_string(),
                location: Some("rear".to_string()),
                severity: Some("moderate".to_string()),
                estimated_repair_cost: Some(cost),
            }),
            incident_description: Some("Rear-ended in stop-and-go traffic {lane 2}".to_string()),
            other_parties_involved: Some(true),
            police_report_filed: Some(false),
        }
    }

    #[test]
    fn test_canonical_json_round_trip() {
        let costs = [
            12442.073270958987,
            3499.99,
            0.1 + 0.2,
            1.0 / 3.0,
            98765.4321012345,
            250.0,
            0.0,
            5e-7,
        ];
        let mut claims: Vec<ClaimRecord> = costs
            .iter()
            .enumerate()
            .map(|(i, cost)| full_claim(i as u32 + 1, *cost))
            .collect();
        claims.push(ClaimRecord::default());
        let batch = ClaimBatch::new(claims);

        let json = batch.to_canonical_json().unwrap();
        let decoded = decode_claim_batch(&json).unwrap();
        assert_eq!(decoded, batch);

        // A second pass is what every critique/refine round does.
        let again = decode_claim_batch(&decoded.to_canonical_json().unwrap()).unwrap();
        assert_eq!(again, batch);
    }

    #[test]
    fn test_null_vehicle_and_damage() {
        let claim: ClaimRecord =
            serde_json::from_str(r#"{"claim_id": "C9", "vehicle": null, "damage": null}"#).unwrap();
        assert_eq!(claim.vehicle, VehicleInfo::default());
        assert!(claim.damage.is_none());
    }

    #[test]
    fn test_claims_key_is_required() {
        assert!(serde_json::from_str::<ClaimBatch>("{}").is_err());
        assert!(serde_json::from_str::<ClaimBatch>(r#"{"claims": null}"#).is_err());

        let batch: ClaimBatch = serde_json::from_str(r#"{"claims": []}"#).unwrap();
        assert!(batch.is_empty());
    }

    #[test]
    fn test_damage_requires_description() {
        let result: std::result::Result<ClaimRecord, _> =
            serde_json::from_str(r#"{"damage": {"location": "rear bumper"}}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_batch_bounds() {
        let mut claim = sample_claim();
        claim.damage.as_mut().unwrap().estimated_repair_cost = Some(-10.0);
        let err = ClaimBatch::new(vec![claim]).validate().unwrap_err();
        assert!(err.contains("C001"));

        let mut claim = sample_claim();
        claim.vehicle.year = Some(1850);
        assert!(ClaimBatch::new(vec![claim]).validate().is_err());

        assert!(ClaimBatch::new(vec![sample_claim()]).validate().is_ok());
    }

    #[test]
    fn test_display_id_placeholder() {
        let claim = ClaimRecord::default();
        assert_eq!(claim.display_id(2), "CLAIM-3");
        assert_eq!(sample_claim().display_id(0), "C001");
    }

    #[test]
    fn test_vehicle_summary() {
        assert_eq!(
            sample_claim().vehicle.summary().as_deref(),
            Some("2018 Toyota Camry")
        );
        assert_eq!(VehicleInfo::default().summary(), None);
    }

    #[test]
    fn test_quality_report_convergence_requires_both_signals() {
        let mut report = QualityReport {
            feedback: "Looks right".to_string(),
            issues: vec![],
            json_valid: false,
            overall_quality_score: 10,
        };
        assert!(!report.meets(10));
        report.json_valid = true;
        assert!(report.meets(10));
        report.overall_quality_score = 9;
        assert!(!report.meets(10));
    }

    #[test]
    fn test_quality_report_lenient_defaults() {
        let report: QualityReport = serde_json::from_str(r#"{"feedback": null}"#).unwrap();
        assert_eq!(report.overall_quality_score, 0);
        assert!(report.json_valid);
        assert!(report.issues.is_empty());
        assert_eq!(report.feedback, "");
    }

    #[test]
    fn test_routing_priority_bounds() {
        let ok: QueueRouting =
            serde_json::from_str(r#"{"queue": "glass", "priority": "4"}"#).unwrap();
        assert_eq!(ok.priority, 4);
        assert!(serde_json::from_str::<QueueRouting>(r#"{"queue": "glass", "priority": 7}"#).is_err());
        assert!(serde_json::from_str::<QueueRouting>(r#"{"queue": "glass", "priority": 0}"#).is_err());
    }

    #[test]
    fn test_severity_and_queue_labels() {
        assert_eq!(SeverityLevel::parse(" major "), Some(SeverityLevel::Major));
        assert_eq!(SeverityLevel::parse("catastrophic"), None);
        assert_eq!(Queue::parse("FAST_TRACK"), Some(Queue::FastTrack));
        assert_eq!(Queue::TotalLoss.to_string(), "total_loss");
    }
}
