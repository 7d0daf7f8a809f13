//! Semicolon-delimited history export.
//!
//! One row per case. Fields containing the delimiter, quotes or line breaks
//! are quoted with doubled inner quotes. The suggestion list is flattened
//! with `" | "` and splits back into the same ordered list.

use std::io::Write;

use chrono::NaiveDate;

use crate::adapters::StorageError;
use crate::domain::suggestion::{join_suggestions, split_suggestions};
use crate::domain::{AlertStatus, CaseRecord, GravityTier, RiskTier, Suggestion};

pub const DELIMITER: char = ';';

pub const HEADER: [&str; 11] = [
    "id",
    "dni",
    "name",
    "hemoglobin_initial",
    "age_months",
    "risk",
    "gravity",
    "alert_date",
    "status",
    "suggestions",
    "region",
];

/// One exported row, as read back from a file.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportRow {
    pub id: Option<i64>,
    pub dni: String,
    pub name: String,
    pub hemoglobin_initial: f64,
    pub age_months: u32,
    pub risk: RiskTier,
    pub gravity: GravityTier,
    pub alert_date: NaiveDate,
    pub status: AlertStatus,
    pub suggestions: Vec<Suggestion>,
    pub region: String,
}

impl From<&CaseRecord> for ExportRow {
    fn from(case: &CaseRecord) -> Self {
        Self {
            id: case.id,
            dni: case.key.dni.clone(),
            name: case.snapshot.name.clone(),
            hemoglobin_initial: case.snapshot.hemoglobin_g_dl,
            age_months: case.snapshot.age_months,
            risk: case.snapshot.verdict,
            gravity: case.snapshot.gravity,
            alert_date: case.key.date,
            status: case.status,
            suggestions: case.snapshot.suggestions.clone(),
            region: case.snapshot.location.clone(),
        }
    }
}

/// Write `cases` with a header line. Returns the number of data rows.
///
/// # Errors
/// Returns error if the writer fails.
pub fn write_cases<W: Write>(cases: &[CaseRecord], mut out: W) -> Result<usize, StorageError> {
    writeln!(out, "{}", HEADER.join(";"))?;
    for case in cases {
        let row = ExportRow::from(case);
        let fields = [
            row.id.map(|id| id.to_string()).unwrap_or_default(),
            row.dni,
            row.name,
            row.hemoglobin_initial.to_string(),
            row.age_months.to_string(),
            row.risk.as_str().to_string(),
            row.gravity.as_str().to_string(),
            row.alert_date.format("%Y-%m-%d").to_string(),
            row.status.as_str().to_string(),
            join_suggestions(&row.suggestions),
            row.region,
        ];
        let line: Vec<String> = fields.iter().map(|f| quote(f)).collect();
        writeln!(out, "{}", line.join(";"))?;
    }
    out.flush()?;
    Ok(cases.len())
}

/// Parse an export produced by [`write_cases`].
///
/// # Errors
/// Returns [`StorageError::Corrupt`] for a missing header, a wrong column
/// count, or a value outside its domain.
pub fn read_cases(text: &str) -> Result<Vec<ExportRow>, StorageError> {
    let mut records = split_records(text)?.into_iter();
    match records.next() {
        Some(header) if header == HEADER => {}
        _ => return Err(StorageError::Corrupt("missing export header".to_string())),
    }
    records.enumerate().map(|(n, fields)| parse_row(n + 1, &fields)).collect()
}

fn parse_row(line: usize, fields: &[String]) -> Result<ExportRow, StorageError> {
    let [id, dni, name, hb, age, risk, gravity, date, status, suggestions, region] = fields else {
        return Err(StorageError::Corrupt(format!(
            "row {line}: expected {} columns, found {}",
            HEADER.len(),
            fields.len()
        )));
    };

    Ok(ExportRow {
        id: if id.is_empty() {
            None
        } else {
            Some(id.parse().map_err(|_| corrupt(line, "id", id))?)
        },
        dni: dni.clone(),
        name: name.clone(),
        hemoglobin_initial: hb.parse().map_err(|_| corrupt(line, "hemoglobin_initial", hb))?,
        age_months: age.parse().map_err(|_| corrupt(line, "age_months", age))?,
        risk: parse_risk(risk).ok_or_else(|| corrupt(line, "risk", risk))?,
        gravity: parse_gravity(gravity).ok_or_else(|| corrupt(line, "gravity", gravity))?,
        alert_date: NaiveDate::parse_from_str(date, "%Y-%m-%d").map_err(|_| corrupt(line, "alert_date", date))?,
        status: status.parse().map_err(|_| corrupt(line, "status", status))?,
        suggestions: split_suggestions(suggestions).map_err(|e| corrupt(line, "suggestions", &e))?,
        region: region.clone(),
    })
}

fn corrupt(line: usize, what: &str, value: &str) -> StorageError {
    StorageError::Corrupt(format!("row {line}: {what} {value:?}"))
}

fn parse_risk(text: &str) -> Option<RiskTier> {
    [RiskTier::Low, RiskTier::Medium, RiskTier::High]
        .into_iter()
        .find(|tier| tier.as_str() == text)
}

fn parse_gravity(text: &str) -> Option<GravityTier> {
    [
        GravityTier::Severe,
        GravityTier::Moderate,
        GravityTier::Mild,
        GravityTier::Normal,
        GravityTier::OutOfRange,
    ]
    .into_iter()
    .find(|tier| tier.as_str() == text)
}

fn quote(field: &str) -> String {
    if field.contains([DELIMITER, '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

/// Split text into records of fields, honoring quoted fields.
fn split_records(text: &str) -> Result<Vec<Vec<String>>, StorageError> {
    let mut records = Vec::new();
    let mut record = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        match (c, in_quotes) {
            ('"', true) if chars.peek() == Some(&'"') => {
                chars.next();
                field.push('"');
            }
            ('"', true) => in_quotes = false,
            ('"', false) if field.is_empty() => in_quotes = true,
            (DELIMITER, false) => record.push(std::mem::take(&mut field)),
            ('\r', false) => {}
            ('\n', false) => {
                record.push(std::mem::take(&mut field));
                records.push(std::mem::take(&mut record));
            }
            (c, _) => field.push(c),
        }
    }
    if in_quotes {
        return Err(StorageError::Corrupt("unterminated quoted field".to_string()));
    }
    if !field.is_empty() || !record.is_empty() {
        record.push(field);
        records.push(record);
    }
    Ok(records)
}
