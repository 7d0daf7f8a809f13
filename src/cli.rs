//! Command-line front end.
//!
//! ```text
//! hemoguard assess <input.json|-> [--date YYYY-MM-DD]
//! hemoguard cases [--all | --status S1,S2,...]
//! hemoguard set-status <dni> <YYYY-MM-DD> <STATUS>
//! hemoguard summary
//! hemoguard export [path]
//! hemoguard policy
//! ```

use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::adapters::StorageError;
use crate::application::{AssessmentOutcome, AssessmentService, MonitoringService};
use crate::domain::{AlertStatus, CaseKey, CaseRecord, PatientInput, PolicyConfig};
use crate::ports::CaseRepository;
use crate::{HemoguardError, Result};

const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaseFilter {
    Active,
    All,
    Statuses(Vec<AlertStatus>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Assess one record or a JSON array of records. `-` reads stdin.
    Assess { input: PathBuf, date: Option<NaiveDate> },
    Cases(CaseFilter),
    SetStatus { key: CaseKey, status: AlertStatus },
    Summary,
    /// Export history as CSV, to stdout when no path is given.
    Export { path: Option<PathBuf> },
    Policy,
    Help,
}

/// Intake file: a single record or a batch.
#[derive(Deserialize)]
#[serde(untagged)]
enum IntakeFile {
    One(PatientInput),
    Many(Vec<PatientInput>),
}

/// Result for one record of a batch, keyed by its array index.
#[derive(Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
enum BatchEntry {
    Assessed {
        index: usize,
        outcome: AssessmentOutcome,
    },
    Rejected {
        index: usize,
        #[serde(skip_serializing_if = "Option::is_none")]
        field: Option<&'static str>,
        error: String,
    },
}

#[must_use]
pub fn usage() -> String {
    [
        "Usage: hemoguard <command> [args]",
        "",
        "Commands:",
        "  assess <input.json|-> [--date YYYY-MM-DD]   assess patients and register cases",
        "  cases [--all | --status S1,S2,...]           list cases (active by default)",
        "  set-status <dni> <YYYY-MM-DD> <STATUS>       change a case status",
        "  summary                                      counts by risk, status, region, month",
        "  export [path]                                history as ';'-delimited CSV",
        "  policy                                       print the effective policy as JSON",
        "",
        "Statuses: REGISTERED, PENDING_CLINICAL, PENDING_VULNERABILITY, IN_FOLLOWUP,",
        "          RESOLVED, CLOSED_NOT_APPLICABLE",
    ]
    .join("\n")
}

fn usage_error(message: impl Into<String>) -> HemoguardError {
    HemoguardError::Usage(format!("{}\n\n{}", message.into(), usage()))
}

fn parse_date(text: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(text.trim(), DATE_FORMAT)
        .map_err(|_| usage_error(format!("invalid date {text:?}, expected YYYY-MM-DD")))
}

fn parse_status(text: &str) -> Result<AlertStatus> {
    text.trim()
        .to_uppercase()
        .parse()
        .map_err(|e| usage_error(format!("{e}")))
}

/// Parse arguments (without the program name).
///
/// # Errors
/// Returns [`HemoguardError::Usage`] for unknown commands or malformed flags.
pub fn parse_args<I>(args: I) -> Result<Command>
where
    I: IntoIterator<Item = String>,
{
    let mut args = args.into_iter();
    let Some(command) = args.next() else {
        return Ok(Command::Help);
    };

    match command.as_str() {
        "assess" => {
            let mut input: Option<PathBuf> = None;
            let mut date: Option<NaiveDate> = None;
            while let Some(arg) = args.next() {
                match arg.as_str() {
                    "--date" => {
                        let v = args.next().ok_or_else(|| usage_error("--date needs a value"))?;
                        date = Some(parse_date(&v)?);
                    }
                    _ if input.is_none() => input = Some(PathBuf::from(arg)),
                    _ => return Err(usage_error(format!("unexpected argument {arg:?}"))),
                }
            }
            let input = input.ok_or_else(|| usage_error("assess needs an input file"))?;
            Ok(Command::Assess { input, date })
        }
        "cases" => {
            let mut filter = CaseFilter::Active;
            while let Some(arg) = args.next() {
                match arg.as_str() {
                    "--all" => filter = CaseFilter::All,
                    "--active" => filter = CaseFilter::Active,
                    "--status" => {
                        let v = args.next().ok_or_else(|| usage_error("--status needs a value"))?;
                        let statuses = v
                            .split(',')
                            .filter(|s| !s.trim().is_empty())
                            .map(parse_status)
                            .collect::<Result<Vec<_>>>()?;
                        filter = CaseFilter::Statuses(statuses);
                    }
                    _ => return Err(usage_error(format!("unexpected argument {arg:?}"))),
                }
            }
            Ok(Command::Cases(filter))
        }
        "set-status" => {
            let (Some(dni), Some(date), Some(status), None) =
                (args.next(), args.next(), args.next(), args.next())
            else {
                return Err(usage_error("set-status needs <dni> <date> <status>"));
            };
            Ok(Command::SetStatus {
                key: CaseKey::new(dni, parse_date(&date)?),
                status: parse_status(&status)?,
            })
        }
        "summary" => Ok(Command::Summary),
        "export" => {
            let path = args.next().map(PathBuf::from);
            if let Some(extra) = args.next() {
                return Err(usage_error(format!("unexpected argument {extra:?}")));
            }
            Ok(Command::Export { path })
        }
        "policy" => Ok(Command::Policy),
        "-h" | "--help" | "help" => Ok(Command::Help),
        other => Err(usage_error(format!("unknown command {other:?}"))),
    }
}

fn read_intake(input: &Path) -> Result<IntakeFile> {
    let raw = if input.as_os_str() == "-" {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf)?;
        buf
    } else {
        fs::read_to_string(input)?
    };
    Ok(serde_json::from_str(&raw)?)
}

fn write_case_table<W: Write>(out: &mut W, cases: &[CaseRecord]) -> Result<()> {
    if cases.is_empty() {
        writeln!(out, "No cases.")?;
        return Ok(());
    }
    writeln!(
        out,
        "{:<5} {:<20} {:<22} {:<7} {:<12} {:>6} {:<18} NAME",
        "ID", "CASE", "STATUS", "RISK", "GRAVITY", "HB", "LOCATION"
    )?;
    for case in cases {
        writeln!(
            out,
            "{:<5} {:<20} {:<22} {:<7} {:<12} {:>6.1} {:<18} {}",
            case.id.map(|id| id.to_string()).unwrap_or_default(),
            case.key.to_string(),
            case.status.as_str(),
            case.snapshot.verdict.as_str(),
            case.snapshot.gravity.as_str(),
            case.snapshot.hemoglobin_g_dl,
            case.snapshot.location,
            case.snapshot.name,
        )?;
    }
    Ok(())
}

/// Execute a parsed command, writing human or JSON output to `out`.
///
/// # Errors
/// Returns error for invalid input, unreadable files, or storage failures
/// outside the assessment path.
pub fn run<R, W>(command: Command, policy: Arc<PolicyConfig>, repository: Arc<R>, out: &mut W) -> Result<()>
where
    R: CaseRepository,
    R::Error: Into<StorageError>,
    W: Write,
{
    match command {
        Command::Help => writeln!(out, "{}", usage())?,
        Command::Policy => writeln!(out, "{}", serde_json::to_string_pretty(policy.as_ref())?)?,
        Command::Assess { input, date } => {
            let service = AssessmentService::new(repository, policy);
            let assess = |record: &PatientInput| match date {
                Some(date) => service.assess(record, date),
                None => service.assess_today(record),
            };
            match read_intake(&input)? {
                IntakeFile::One(record) => {
                    let outcome = assess(&record)?;
                    writeln!(out, "{}", serde_json::to_string_pretty(&outcome)?)?;
                }
                IntakeFile::Many(records) => {
                    let entries: Vec<BatchEntry> = records
                        .iter()
                        .enumerate()
                        .map(|(index, record)| match assess(record) {
                            Ok(outcome) => BatchEntry::Assessed { index, outcome },
                            Err(err) => {
                                tracing::warn!(index, error = %err, "Intake record rejected");
                                let field = match &err {
                                    HemoguardError::Validation(e) => Some(e.field()),
                                    _ => None,
                                };
                                BatchEntry::Rejected {
                                    index,
                                    field,
                                    error: err.to_string(),
                                }
                            }
                        })
                        .collect();
                    writeln!(out, "{}", serde_json::to_string_pretty(&entries)?)?;

                    let rejected = entries
                        .iter()
                        .filter(|entry| matches!(entry, BatchEntry::Rejected { .. }))
                        .count();
                    if rejected > 0 {
                        out.flush()?;
                        return Err(HemoguardError::BatchRejected {
                            rejected,
                            total: entries.len(),
                        });
                    }
                }
            }
        }
        Command::Cases(filter) => {
            let monitoring = MonitoringService::new(repository);
            let cases = match filter {
                CaseFilter::Active => monitoring.active_cases()?,
                CaseFilter::All => monitoring.history()?,
                CaseFilter::Statuses(statuses) => monitoring.cases_with_status(&statuses)?,
            };
            write_case_table(out, &cases)?;
        }
        Command::SetStatus { key, status } => {
            let monitoring = MonitoringService::new(repository);
            if monitoring.update_status(&key, status)? {
                writeln!(out, "{key} -> {status}")?;
            } else {
                return Err(HemoguardError::Usage(format!("no case for {key}")));
            }
        }
        Command::Summary => {
            let summary = MonitoringService::new(repository).summary()?;
            writeln!(out, "{}", serde_json::to_string_pretty(&summary)?)?;
        }
        Command::Export { path } => {
            let monitoring = MonitoringService::new(repository);
            match path {
                Some(path) => {
                    let file = fs::File::create(&path)?;
                    let rows = monitoring.export_csv(std::io::BufWriter::new(file))?;
                    writeln!(out, "Exported {rows} cases to {}", path.display())?;
                }
                None => {
                    monitoring.export_csv(&mut *out)?;
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{export, MemoryCaseRepository};

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| (*s).to_string()).collect()
    }

    fn date(text: &str) -> NaiveDate {
        NaiveDate::parse_from_str(text, DATE_FORMAT).expect("valid date")
    }

    const INTAKE: &str = r#"{
        "dni": "45678912", "name": "Ana Torres", "sex": "female",
        "hemoglobin_g_dl": 6.5, "age_months": 36,
        "location": { "region": "Lima" },
        "context": {
            "area": "urban", "household_income": 1800.0, "children": 2,
            "mother_education": "secondary", "iron_supplement": "receiving",
            "programs": { "conditional_transfer": true }
        }
    }"#;

    #[test]
    fn test_parse_commands() {
        assert_eq!(parse_args(args(&[])).expect("parse"), Command::Help);
        assert_eq!(
            parse_args(args(&["assess", "in.json", "--date", "2024-06-01"])).expect("parse"),
            Command::Assess {
                input: PathBuf::from("in.json"),
                date: Some(date("2024-06-01")),
            }
        );
        assert_eq!(
            parse_args(args(&["cases", "--status", "resolved,IN_FOLLOWUP"])).expect("parse"),
            Command::Cases(CaseFilter::Statuses(vec![
                AlertStatus::Resolved,
                AlertStatus::InFollowup
            ]))
        );
        assert_eq!(
            parse_args(args(&["set-status", "45678912", "2024-06-01", "RESOLVED"])).expect("parse"),
            Command::SetStatus {
                key: CaseKey::new("45678912", date("2024-06-01")),
                status: AlertStatus::Resolved,
            }
        );
        assert_eq!(parse_args(args(&["export"])).expect("parse"), Command::Export { path: None });
    }

    #[test]
    fn test_parse_errors() {
        for bad in [
            args(&["frobnicate"]),
            args(&["assess"]),
            args(&["assess", "in.json", "--date", "01/06/2024"]),
            args(&["cases", "--status", "ARCHIVED"]),
            args(&["set-status", "45678912", "2024-06-01"]),
        ] {
            assert!(matches!(parse_args(bad), Err(HemoguardError::Usage(_))));
        }
    }

    #[test]
    fn test_assess_then_follow_up() {
        let dir = tempfile::tempdir().expect("Should create temp dir");
        let input = dir.path().join("patient.json");
        fs::write(&input, INTAKE).expect("Should write intake");

        let repo = Arc::new(MemoryCaseRepository::new());
        let policy = Arc::new(PolicyConfig::default());

        let mut out = Vec::new();
        run(
            Command::Assess {
                input,
                date: Some(date("2024-06-01")),
            },
            Arc::clone(&policy),
            Arc::clone(&repo),
            &mut out,
        )
        .expect("Should assess");
        let json: serde_json::Value = serde_json::from_slice(&out).expect("Should be JSON");
        assert_eq!(json["report"]["verdict"]["tier"], "HIGH");
        assert_eq!(json["persistence"]["outcome"], "recorded");

        let mut out = Vec::new();
        run(Command::Cases(CaseFilter::Active), Arc::clone(&policy), Arc::clone(&repo), &mut out)
            .expect("Should list");
        let table = String::from_utf8(out).expect("utf8");
        assert!(table.contains("45678912_2024-06-01"));
        assert!(table.contains("PENDING_CLINICAL"));

        let mut out = Vec::new();
        run(
            Command::SetStatus {
                key: CaseKey::new("45678912", date("2024-06-01")),
                status: AlertStatus::Resolved,
            },
            Arc::clone(&policy),
            Arc::clone(&repo),
            &mut out,
        )
        .expect("Should update");

        let export_path = dir.path().join("history.csv");
        let mut out = Vec::new();
        run(
            Command::Export {
                path: Some(export_path.clone()),
            },
            policy,
            repo,
            &mut out,
        )
        .expect("Should export");
        let rows = export::read_cases(&fs::read_to_string(export_path).expect("Should read"))
            .expect("Should parse");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].status, AlertStatus::Resolved);
        assert_eq!(rows[0].region, "LIMA (Metropolitana y Provincia)");
    }

    fn batch_record(dni: &str, hb: f64) -> serde_json::Value {
        let mut record: serde_json::Value = serde_json::from_str(INTAKE).expect("Should parse intake");
        record["dni"] = dni.into();
        record["hemoglobin_g_dl"] = hb.into();
        record
    }

    fn run_batch(records: &[serde_json::Value], repo: Arc<MemoryCaseRepository>) -> (Result<()>, serde_json::Value) {
        let dir = tempfile::tempdir().expect("Should create temp dir");
        let input = dir.path().join("batch.json");
        fs::write(&input, serde_json::to_string(records).expect("Should encode")).expect("Should write intake");

        let mut out = Vec::new();
        let result = run(
            Command::Assess {
                input,
                date: Some(date("2024-06-01")),
            },
            Arc::new(PolicyConfig::default()),
            repo,
            &mut out,
        );
        (result, serde_json::from_slice(&out).expect("Should be JSON"))
    }

    #[test]
    fn test_batch_reports_every_record() {
        let repo = Arc::new(MemoryCaseRepository::new());
        let records = [
            batch_record("10000001", 6.5),
            batch_record("10000002", 30.0),
            batch_record("10000003", 8.0),
        ];
        let (result, json) = run_batch(&records, Arc::clone(&repo));

        assert!(matches!(
            result,
            Err(HemoguardError::BatchRejected { rejected: 1, total: 3 })
        ));
        let entries = json.as_array().expect("Should be an array");
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0]["result"], "assessed");
        assert_eq!(entries[0]["outcome"]["persistence"]["outcome"], "recorded");
        assert_eq!(entries[1]["result"], "rejected");
        assert_eq!(entries[1]["index"], 1);
        assert_eq!(entries[1]["field"], "hemoglobin_g_dl");
        assert_eq!(entries[2]["result"], "assessed");
        assert_eq!(entries[2]["index"], 2);
        assert_eq!(repo.count_cases().expect("Should count"), 2);
    }

    #[test]
    fn test_single_element_batch_prints_array() {
        let repo = Arc::new(MemoryCaseRepository::new());
        let (result, json) = run_batch(&[batch_record("10000001", 12.5)], repo);

        assert!(result.is_ok());
        let entries = json.as_array().expect("Should be an array");
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0]["result"], "assessed");
    }

    #[test]
    fn test_set_status_unknown_case() {
        let err = run(
            Command::SetStatus {
                key: CaseKey::new("11111111", date("2024-06-01")),
                status: AlertStatus::Resolved,
            },
            Arc::new(PolicyConfig::default()),
            Arc::new(MemoryCaseRepository::new()),
            &mut Vec::new(),
        )
        .expect_err("Should fail");
        assert!(matches!(err, HemoguardError::Usage(_)));
    }

    #[test]
    fn test_policy_prints_json() {
        let mut out = Vec::new();
        run(
            Command::Policy,
            Arc::new(PolicyConfig::default()),
            Arc::new(MemoryCaseRepository::new()),
            &mut out,
        )
        .expect("Should print");
        let parsed: PolicyConfig = serde_json::from_slice(&out).expect("Should parse back");
        assert_eq!(parsed, PolicyConfig::default());
    }
}
