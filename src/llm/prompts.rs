// Prompt builders for the three pipeline stages and the self-review loop.

use schemars::schema_for;

use crate::schema::ClaimBatch;

pub const EXTRACTION_ROLE: &str = "You are an insurance claims processing assistant.";
pub const CRITIQUE_ROLE: &str = "You are an insurance claims quality reviewer.";
pub const REFINEMENT_ROLE: &str = "You are an insurance claims data correction specialist.";
pub const SEVERITY_ROLE: &str = "You are an insurance claims severity assessment specialist.";
pub const ROUTING_ROLE: &str = "You are an AI claim routing system.";

const RAW_JSON_ONLY: &str =
    "Do not include any explanation or markdown formatting, just the raw JSON.";

const CLAIM_FIELDS: &str = r#"1. claim_id: Unique claim identifier (if mentioned)
2. incident_date: Date and time of incident
3. incident_location: Location where incident occurred
4. policyholder_name: Name of the policyholder/customer
5. contact_phone: Contact phone number
6. contact_email: Contact email address
7. vehicle: Object containing:
   - make: Vehicle manufacturer
   - model: Vehicle model
   - year: Vehicle year
   - vin: Vehicle Identification Number
   - license_plate: License plate number
   - color: Vehicle color
8. damage: Object containing:
   - description: Detailed description of the damage
   - location: Location on vehicle where damage occurred
   - severity: Severity (minor, moderate, severe)
   - estimated_repair_cost: Estimated cost (numeric value only)
9. incident_description: Description of how the incident occurred
10. other_parties_involved: Boolean - were other parties involved?
11. police_report_filed: Boolean - was a police report filed?"#;

fn claim_batch_schema() -> String {
    serde_json::to_string_pretty(&schema_for!(ClaimBatch)).unwrap_or_default()
}

pub fn extraction_prompt(raw_text: &str) -> String {
    format!(
        r#"{role} Extract structured information from the following text that contains one or more First Notice of Loss (FNOL) claims.

For EACH claim found in the text, extract the following information:

{fields}

Return a JSON object with a "claims" array containing one object per claim, in the order the claims appear in the text. Use null for any information not found in the text.

JSON Schema of the expected output:
{schema}

FNOL Text:
{raw_text}

{raw_only}"#,
        role = EXTRACTION_ROLE,
        fields = CLAIM_FIELDS,
        schema = claim_batch_schema(),
        raw_text = raw_text,
        raw_only = RAW_JSON_ONLY,
    )
}

pub fn critique_prompt(source_text: &str, batch_json: &str) -> String {
    format!(
        r#"{role} Compare the extracted claims below against the original FNOL text and judge how faithfully and completely they were extracted.

For every discrepancy (a wrong, missing or invented value), report one issue naming the claim_id, the field, the problem and a suggested fix. Do not report fields that are correctly null because the text does not mention them.

ORIGINAL FNOL TEXT:
{source}

EXTRACTED CLAIMS (JSON):
{batch}

Return a JSON object in exactly this format:
{{
  "feedback": "Overall summary of the extraction quality",
  "issues": [
    {{"claim_id": "claim identifier", "field": "field name", "issue": "what is wrong", "suggestion": "how to fix it"}}
  ],
  "json_valid": true,
  "overall_quality_score": 1-10
}}

Set "json_valid" to false if the extracted claims do not follow the claims schema. Give 10 only when the extraction is complete and fully accurate.

{raw_only}"#,
        role = CRITIQUE_ROLE,
        source = source_text,
        batch = batch_json,
        raw_only = RAW_JSON_ONLY,
    )
}

pub fn refinement_prompt(source_text: &str, batch_json: &str, report_json: &str) -> String {
    format!(
        r#"{role} A reviewer found problems in the claims extracted from the FNOL text below. Produce a corrected version of the COMPLETE claims list.

Rules:
- Keep every claim, in the same order, with the same claim_id.
- Fix every issue the reviewer raised, using only information from the original text.
- Leave correct values unchanged. Use null for information not present in the text.

ORIGINAL FNOL TEXT:
{source}

CURRENT EXTRACTED CLAIMS (JSON):
{batch}

REVIEWER FEEDBACK (JSON):
{report}

Each claim has these fields:
{fields}

Return ONLY a JSON object of the form {{"claims": [ ... ]}}.

{raw_only}"#,
        role = REFINEMENT_ROLE,
        source = source_text,
        batch = batch_json,
        report = report_json,
        fields = CLAIM_FIELDS,
        raw_only = RAW_JSON_ONLY,
    )
}

pub fn severity_prompt(claims_json: &str) -> String {
    format!(
        r#"{role} Based on the claim information provided, classify the damage severity and estimate repair costs.

For each claim, analyze the loss_desc (damage description) and damage_area to classify the damage as 'Minor', 'Moderate', or 'Major'. Also provide an estimated repair cost (estimated_cost) as a float.

Use the following guidelines:
- Minor: $100-$1,000 - Small cosmetic damage, minor scratches, small chips
- Moderate: $1,000-$5,000 - Significant body damage, broken parts, multiple areas affected
- Major: $5,000-$50,000 - Severe structural damage, airbag deployment, vehicle not drivable, extensive damage

Claims to assess:
{claims}

Return a JSON object with an "assessments" array containing one assessment per claim, in the same order:
{{
  "assessments": [
    {{
      "claim_id": "claim identifier",
      "severity": "Minor|Moderate|Major",
      "estimated_cost": float_value,
      "reasoning": "Brief explanation of severity classification"
    }}
  ]
}}

{raw_only}"#,
        role = SEVERITY_ROLE,
        claims = claims_json,
        raw_only = RAW_JSON_ONLY,
    )
}

pub fn routing_prompt(claims_json: &str) -> String {
    format!(
        r#"{role} Based on the claim information and severity assessment, assign each claim to one of the following queues: 'glass', 'fast_track', 'material_damage', or 'total_loss'.

Use these rules:
- Minor damage involving ONLY glass goes to 'glass'
- Other Minor damage goes to 'fast_track'
- Moderate damage goes to 'material_damage'
- Major damage goes to 'total_loss'

Also assign a priority from 1 (highest) to 5 (lowest) based on the overall situation described.

Priority guidelines:
- Priority 1: Critical/urgent (major damage, vehicle not drivable, safety concerns)
- Priority 2: High priority (significant damage, multiple areas affected)
- Priority 3: Medium priority (moderate damage, standard processing)
- Priority 4: Low priority (minor damage, cosmetic issues)
- Priority 5: Lowest priority (very minor, no safety concerns)

Claims to route:
{claims}

Return a JSON object with a "routings" array containing one routing per claim, in the same order:
{{
  "routings": [
    {{
      "claim_id": "claim identifier",
      "queue": "glass|fast_track|material_damage|total_loss",
      "priority": 1-5,
      "reasoning": "Brief explanation of queue and priority assignment"
    }}
  ]
}}

{raw_only}"#,
        role = ROUTING_ROLE,
        claims = claims_json,
        raw_only = RAW_JSON_ONLY,
    )
}
