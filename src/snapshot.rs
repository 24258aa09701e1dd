//! Saved reports.

use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};
use crate::report::{ReportData, ReportScope, TeamReportData};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SnapshotKind {
    Personal,
    Team,
    Department,
}

impl SnapshotKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SnapshotKind::Personal => "personal",
            SnapshotKind::Team => "team",
            SnapshotKind::Department => "department",
        }
    }
}

impl FromStr for SnapshotKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "personal" => Ok(SnapshotKind::Personal),
            "team" => Ok(SnapshotKind::Team),
            "department" | "dept" => Ok(SnapshotKind::Department),
            other => Err(Error::Validation(format!(
                "unknown report kind '{other}' (expected personal, team or department)"
            ))),
        }
    }
}

impl std::fmt::Display for SnapshotKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A report frozen as JSON, with enough metadata to list it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportSnapshot {
    pub kind: SnapshotKind,
    pub subject_id: String,
    pub subject_name: String,
    pub report_date: NaiveDate,
    pub payload: Value,
}

impl ReportSnapshot {
    pub fn personal(report: &ReportData) -> Result<Self> {
        Ok(Self {
            kind: SnapshotKind::Personal,
            subject_id: report.user_id.clone(),
            subject_name: report.user_name.clone(),
            report_date: report.report_date,
            payload: report.to_dict()?,
        })
    }

    /// Team and department roll-ups carry no date of their own.
    pub fn team(report: &TeamReportData, report_date: NaiveDate) -> Result<Self> {
        let kind = match report.scope {
            ReportScope::Team { .. } => SnapshotKind::Team,
            ReportScope::Department { .. } => SnapshotKind::Department,
        };
        Ok(Self {
            kind,
            subject_id: report.scope.id().to_string(),
            subject_name: report.scope.name().to_string(),
            report_date,
            payload: report.to_dict()?,
        })
    }

    pub fn personal_report(&self) -> Result<ReportData> {
        match self.kind {
            SnapshotKind::Personal => ReportData::from_dict(self.payload.clone()),
            other => Err(Error::Validation(format!(
                "snapshot holds a {other} report, not a personal one"
            ))),
        }
    }

    pub fn team_report(&self) -> Result<TeamReportData> {
        match self.kind {
            SnapshotKind::Team | SnapshotKind::Department => {
                TeamReportData::from_dict(self.payload.clone())
            }
            SnapshotKind::Personal => Err(Error::Validation(
                "snapshot holds a personal report, not a team one".to_string(),
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotSummary {
    pub id: i64,
    pub kind: SnapshotKind,
    pub subject_id: String,
    pub subject_name: String,
    pub report_date: NaiveDate,
    pub created_at: String,
}

/// Where saved reports live.
pub trait ReportStore {
    fn save_snapshot(&self, snapshot: &ReportSnapshot) -> Result<i64>;

    fn load_snapshot(&self, id: i64) -> Result<Option<ReportSnapshot>>;

    /// Newest first, optionally of one kind only.
    fn list_snapshots(&self, kind: Option<SnapshotKind>) -> Result<Vec<SnapshotSummary>>;
}
