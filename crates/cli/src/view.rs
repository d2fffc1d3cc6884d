//! Text rendering of store state for the terminal.

use chrono::{DateTime, NaiveDate, Utc};
use patients_core::{status_counts, FieldError, Patient};

/// `1990-01-01` as `January 1, 1990`; anything unparseable is shown as given.
pub fn format_date(value: &str) -> String {
    match NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        Ok(date) => date.format("%B %-d, %Y").to_string(),
        Err(_) => value.to_string(),
    }
}

fn format_timestamp(value: Option<DateTime<Utc>>) -> String {
    value
        .map(|ts| ts.format("%B %-d, %Y").to_string())
        .unwrap_or_else(|| "N/A".to_string())
}

/// One line per patient, as on a list card.
pub fn render_card(patient: &Patient) -> String {
    format!(
        "{:<26} {:<30} [{}]  born {}  {}  Added: {}",
        patient.id().unwrap_or("-"),
        patient.full_name(),
        patient.status,
        format_date(&patient.date_of_birth),
        patient.address(),
        format_timestamp(patient.created_at),
    )
}

/// Status summary, then the filtered cards or an empty-state message.
pub fn render_list(all: &[Patient], shown: &[&Patient]) -> String {
    let counts = status_counts(all)
        .iter()
        .map(|(status, count)| format!("{status}: {count}"))
        .collect::<Vec<_>>()
        .join("  ");

    let mut lines = vec![format!("Patients: {}  ({counts})", all.len())];

    if shown.is_empty() {
        lines.push(if all.is_empty() {
            "No patients added yet".to_string()
        } else {
            "No patients match your search criteria".to_string()
        });
    } else {
        lines.extend(shown.iter().map(|p| render_card(p)));
    }

    lines.join("\n")
}

/// The detail view of one patient.
pub fn render_detail(patient: &Patient) -> String {
    [
        patient.full_name(),
        format!("  Status:        {}", patient.status),
        format!("  ID:            {}", patient.id().unwrap_or("N/A")),
        format!("  Date of birth: {}", format_date(&patient.date_of_birth)),
        format!("  Address:       {}", patient.address()),
        format!("  Created:       {}", format_timestamp(patient.created_at)),
        format!("  Updated:       {}", format_timestamp(patient.updated_at)),
    ]
    .join("\n")
}

/// Field errors, one per line, keyed by field.
pub fn render_field_errors<'a>(errors: impl IntoIterator<Item = &'a FieldError>) -> String {
    errors
        .into_iter()
        .map(|e| format!("  {}: {}", e.field, e.message))
        .collect::<Vec<_>>()
        .join("\n")
}
