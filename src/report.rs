use std::fmt::Write;

use crate::pipeline::PipelineRun;
use crate::schema::{ClaimRecord, Queue};

const RULE_WIDTH: usize = 80;
const DAMAGE_PREVIEW_CHARS: usize = 100;

fn heading(out: &mut String, title: &str) {
    let rule = "=".repeat(RULE_WIDTH);
    let _ = writeln!(out, "\n{}\n{}\n{}", rule, title, rule);
}

fn preview(text: &str, limit: usize) -> String {
    if text.chars().count() <= limit {
        text.to_string()
    } else {
        let head: String = text.chars().take(limit).collect();
        format!("{}...", head)
    }
}

/// `1234567.5` -> `$1,234,567.50`
pub fn format_currency(amount: f64) -> String {
    let fixed = format!("{:.2}", amount.abs());
    let (whole, cents) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (idx, digit) in whole.chars().enumerate() {
        if idx > 0 && (whole.len() - idx) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    let sign = if amount < 0.0 { "-" } else { "" };
    format!("{}${}.{}", sign, grouped, cents)
}

fn write_claim(out: &mut String, index: usize, claim: &ClaimRecord) {
    let _ = writeln!(out, "\n--- CLAIM {} ---", index + 1);
    let _ = writeln!(out, "Claim ID: {}", claim.display_id(index));
    let _ = writeln!(
        out,
        "Customer: {}",
        claim.policyholder_name.as_deref().unwrap_or("N/A")
    );
    if let Some(date) = &claim.incident_date {
        let _ = writeln!(out, "Incident Date: {}", date);
    }
    if let Some(location) = &claim.incident_location {
        let _ = writeln!(out, "Location: {}", location);
    }
    if let Some(vehicle) = claim.vehicle.summary() {
        let _ = writeln!(out, "Vehicle: {}", vehicle);
    }
    if let Some(damage) = &claim.damage {
        let _ = writeln!(
            out,
            "Damage: {}",
            preview(&damage.description, DAMAGE_PREVIEW_CHARS)
        );
    }
}

/// Renders a finished run the way the CLI prints it.
pub fn format_run_report(raw_text: &str, run: &PipelineRun) -> String {
    let mut out = String::new();

    heading(&mut out, "STAGE I: INFORMATION EXTRACTION FROM FNOL");
    let _ = writeln!(out, "Processed at: {}", run.processed_at.to_rfc3339());
    let _ = writeln!(out, "\nRaw FNOL Text:\n{}", "-".repeat(RULE_WIDTH));
    let _ = writeln!(out, "{}", raw_text.trim());
    let _ = writeln!(out, "{}", "-".repeat(RULE_WIDTH));

    heading(
        &mut out,
        &format!(
            "STAGE I: EXTRACTED INFORMATION - {} CLAIMS FOUND",
            run.claims.len()
        ),
    );
    for (index, claim) in run.claims.claims.iter().enumerate() {
        write_claim(&mut out, index, claim);
    }

    if let Some(trace) = &run.feedback {
        heading(&mut out, "STAGE I: SELF-REVIEW");
        for round in &trace.rounds {
            let _ = writeln!(
                out,
                "Round {}: score {}/10, json_valid {}, {} issue(s)",
                round.round, round.score, round.json_valid, round.issues
            );
        }
        let _ = writeln!(
            out,
            "Result: {:?} after {} generator call(s)",
            trace.termination, trace.generator_calls
        );
    }

    heading(&mut out, "STAGE I: VALIDATION SUMMARY");
    let summary = &run.validation;
    let _ = writeln!(out, "Total Claims: {}", summary.total_claims);
    let _ = writeln!(out, "Valid Claims: {}", summary.valid_claims);
    let _ = writeln!(out, "Invalid Claims: {}", summary.invalid_claims);
    if !summary.invalid_details.is_empty() {
        let _ = writeln!(out, "\nInvalid Claim Details:");
        for detail in &summary.invalid_details {
            let id = detail
                .claim_id
                .clone()
                .unwrap_or_else(|| format!("CLAIM-{}", detail.index + 1));
            let _ = writeln!(
                out,
                "  Claim {}: Missing fields: {}",
                id,
                detail.missing_fields.join(", ")
            );
        }
    }

    heading(&mut out, "STAGE II: ASSESSMENT RESULTS");
    for (index, assessment) in run.severity.assessments.iter().enumerate() {
        let _ = writeln!(out, "\n--- CLAIM {} ASSESSMENT ---", index + 1);
        let _ = writeln!(
            out,
            "Claim ID: {}",
            assessment.claim_id.as_deref().unwrap_or("N/A")
        );
        let _ = writeln!(out, "Severity: {}", assessment.severity);
        let _ = writeln!(
            out,
            "Estimated Cost: {}",
            format_currency(assessment.estimated_cost)
        );
        if let Some(reasoning) = &assessment.reasoning {
            let _ = writeln!(out, "Reasoning: {}", reasoning);
        }
    }

    heading(&mut out, "STAGE II: SUMMARY STATISTICS");
    let severity = run.severity.severity_breakdown();
    let _ = writeln!(out, "Minor Claims: {}", severity.minor);
    let _ = writeln!(out, "Moderate Claims: {}", severity.moderate);
    let _ = writeln!(out, "Major Claims: {}", severity.major);
    let _ = writeln!(
        out,
        "Total Estimated Cost: {}",
        format_currency(run.severity.total_estimated_cost())
    );

    heading(&mut out, "STAGE III: ROUTING RESULTS");
    for (index, routing) in run.routing.routings.iter().enumerate() {
        let _ = writeln!(out, "\n--- CLAIM {} ROUTING ---", index + 1);
        let _ = writeln!(
            out,
            "Claim ID: {}",
            routing.claim_id.as_deref().unwrap_or("N/A")
        );
        let _ = writeln!(out, "Queue: {}", routing.queue);
        let _ = writeln!(out, "Priority: {}", routing.priority);
        if let Some(reasoning) = &routing.reasoning {
            let _ = writeln!(out, "Reasoning: {}", reasoning);
        }
    }

    heading(&mut out, "STAGE III: ROUTING STATISTICS");
    let queues = run.routing.queue_breakdown();
    let _ = writeln!(out, "Queue Assignments:");
    for queue in Queue::ALL {
        let _ = writeln!(out, "  {}: {} claim(s)", queue, queues.count(queue));
    }
    let _ = writeln!(out, "\nPriority Distribution:");
    for (priority, count) in run.routing.priority_breakdown() {
        let _ = writeln!(out, "  Priority {}: {} claim(s)", priority, count);
    }
    let _ = writeln!(out, "{}", "=".repeat(RULE_WIDTH));

    out
}
