use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use crate::error::Result;
use crate::model::{Priority, Role, TaskStatus};

/// Estimated finish date of a project's remaining work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Projection {
    Date(NaiveDate),
    /// Every task is done.
    Completed,
    /// No duration history to extrapolate from.
    #[default]
    Unknown,
}

impl Projection {
    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            Projection::Date(d) => Some(*d),
            _ => None,
        }
    }
}

impl Serialize for Projection {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Projection::Date(d) => serializer.serialize_str(&d.format("%Y-%m-%d").to_string()),
            Projection::Completed => serializer.serialize_str("Completed"),
            Projection::Unknown => serializer.serialize_none(),
        }
    }
}

impl<'de> Deserialize<'de> for Projection {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        match Option::<String>::deserialize(deserializer)? {
            None => Ok(Projection::Unknown),
            Some(s) if s == "Completed" => Ok(Projection::Completed),
            Some(s) => NaiveDate::parse_from_str(&s, "%Y-%m-%d")
                .map(Projection::Date)
                .map_err(|_| de::Error::custom(format!("invalid projected completion date: {s}"))),
        }
    }
}

/// One task as it appears in a report, with derived flags.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskDetail {
    pub task_id: String,
    pub name: String,
    pub status: TaskStatus,
    pub priority: Priority,
    pub project_id: Option<String>,
    pub project_name: Option<String>,
    pub owner_id: Option<String>,
    pub owner_name: Option<String>,
    #[serde(default)]
    pub collaborator_ids: Vec<String>,
    #[serde(default)]
    pub collaborator_names: Vec<String>,
    pub created_at: Option<String>,
    pub due_date: Option<String>,
    pub completed_at: Option<String>,
    pub is_overdue: bool,
    pub is_late: bool,
    /// Whole days from creation to completion, for completed tasks only.
    pub duration_days: Option<i64>,
}

impl TaskDetail {
    pub fn involves(&self, user_id: &str) -> bool {
        self.owner_id.as_deref() == Some(user_id)
            || self.collaborator_ids.iter().any(|c| c == user_id)
    }
}

/// Statistics over every task of one project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectBreakdown {
    pub project_id: String,
    pub project_name: String,
    pub total_tasks: u64,
    pub completed_tasks: u64,
    pub overdue_tasks: u64,
    pub late_completions: u64,
    pub completion_percentage: f64,
    pub overdue_percentage: f64,
    pub average_task_duration: Option<f64>,
    #[serde(default)]
    pub projected_completion_date: Projection,
    pub tasks: Vec<TaskDetail>,
}

/// A user's own slice of a project: the tasks they own or collaborate on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectStat {
    pub project_id: String,
    pub project_name: String,
    pub total_tasks: u64,
    pub completed_tasks: u64,
    pub overdue_tasks: u64,
    pub late_completions: u64,
    pub completion_percentage: f64,
    pub overdue_percentage: f64,
    pub involved_tasks: Vec<String>,
    pub tasks: Vec<TaskDetail>,
}

/// Per-user report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportData {
    pub user_id: String,
    pub user_name: String,
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team_name: Option<String>,
    pub report_date: NaiveDate,
    pub projects_breakdown: Vec<ProjectBreakdown>,
    pub task_details: Vec<TaskDetail>,
    pub project_stats: Vec<ProjectStat>,
    pub task_stats: BTreeMap<String, u64>,
    #[serde(default)]
    pub total_tasks: u64,
    #[serde(default)]
    pub completed_tasks: u64,
    #[serde(default)]
    pub overdue_tasks: u64,
    #[serde(default)]
    pub late_completions: u64,
    #[serde(default)]
    pub total_projects: u64,
    pub average_task_duration: Option<f64>,
    pub completion_percentage: f64,
    pub overdue_percentage: f64,
}

impl ReportData {
    /// Attach the team a member was reported under.
    pub fn with_team(mut self, team_id: &str, team_name: &str) -> Self {
        self.team_id = Some(team_id.to_string());
        self.team_name = Some(team_name.to_string());
        self
    }

    pub fn to_dict(&self) -> Result<Value> {
        Ok(serde_json::to_value(self)?)
    }

    pub fn from_dict(value: Value) -> Result<Self> {
        Ok(serde_json::from_value(value)?)
    }
}

/// A task in a team report, tagged with the member whose report it came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamTaskDetail {
    pub member_id: String,
    pub member_name: String,
    #[serde(flatten)]
    pub task: TaskDetail,
}

/// One project merged across all members that touched it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamProjectStat {
    pub project_id: String,
    pub project_name: String,
    pub total_tasks: u64,
    pub completed_tasks: u64,
    pub overdue_tasks: u64,
    pub late_completions: u64,
    pub completion_percentage: f64,
    pub overdue_percentage: f64,
    /// Member id -> ids of the tasks that member owns or collaborates on.
    pub member_involvement: BTreeMap<String, Vec<String>>,
    /// Task id -> ids of the members involved in it.
    pub task_assignees: BTreeMap<String, Vec<String>>,
    pub all_tasks: Vec<TaskDetail>,
}

/// Members of one team inside a department report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamGroup {
    pub team_id: String,
    pub team_name: String,
    pub member_ids: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "scope", rename_all = "snake_case")]
pub enum ReportScope {
    Team {
        team_id: String,
        team_name: String,
    },
    Department {
        dept_id: String,
        dept_name: String,
        #[serde(default)]
        teams: Vec<TeamGroup>,
    },
}

impl ReportScope {
    pub fn id(&self) -> &str {
        match self {
            ReportScope::Team { team_id, .. } => team_id,
            ReportScope::Department { dept_id, .. } => dept_id,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            ReportScope::Team { team_name, .. } => team_name,
            ReportScope::Department { dept_name, .. } => dept_name,
        }
    }
}

/// Roll-up of several member reports for a team or a department.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamReportData {
    #[serde(flatten)]
    pub scope: ReportScope,
    pub member_reports: Vec<ReportData>,
    pub total_team_tasks: u64,
    pub completed_team_tasks: u64,
    pub overdue_team_tasks: u64,
    pub total_team_projects: u64,
    pub team_completion_percentage: f64,
    pub team_overdue_percentage: f64,
    pub team_average_task_duration: Option<f64>,
    pub team_task_stats: BTreeMap<String, u64>,
    pub team_task_details: Vec<TeamTaskDetail>,
    pub team_project_stats: Vec<TeamProjectStat>,
}

/// Members sharing a team tag, in order of first appearance.
#[derive(Debug, Clone)]
pub struct MemberGroup<'a> {
    pub team_id: Option<String>,
    pub team_name: String,
    pub members: Vec<&'a ReportData>,
}

impl TeamReportData {
    pub fn to_dict(&self) -> Result<Value> {
        Ok(serde_json::to_value(self)?)
    }

    pub fn from_dict(value: Value) -> Result<Self> {
        Ok(serde_json::from_value(value)?)
    }

    pub fn project_stat(&self, project_id: &str) -> Option<&TeamProjectStat> {
        self.team_project_stats
            .iter()
            .find(|p| p.project_id == project_id)
    }

    /// Re-bucket member reports by their team tag. Untagged members land in
    /// a trailing "No team" group.
    pub fn members_by_team(&self) -> Vec<MemberGroup<'_>> {
        let mut groups: Vec<MemberGroup<'_>> = Vec::new();
        let mut untagged: Vec<&ReportData> = Vec::new();
        for report in &self.member_reports {
            let Some(team_id) = report.team_id.as_deref() else {
                untagged.push(report);
                continue;
            };
            match groups
                .iter_mut()
                .find(|g| g.team_id.as_deref() == Some(team_id))
            {
                Some(group) => group.members.push(report),
                None => groups.push(MemberGroup {
                    team_id: Some(team_id.to_string()),
                    team_name: report
                        .team_name
                        .clone()
                        .unwrap_or_else(|| format!("Team {team_id}")),
                    members: vec![report],
                }),
            }
        }
        if !untagged.is_empty() {
            groups.push(MemberGroup {
                team_id: None,
                team_name: "No team".to_string(),
                members: untagged,
            });
        }
        groups
    }
}
