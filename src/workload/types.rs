use serde::{Deserialize, Serialize};

use crate::model::Role;

/// Availability bucket derived from the workload score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Availability {
    Overloaded,
    Busy,
    Moderate,
    Available,
}

impl Availability {
    pub fn from_score(score: f64) -> Self {
        if score >= 90.0 {
            Availability::Overloaded
        } else if score >= 70.0 {
            Availability::Busy
        } else if score >= 40.0 {
            Availability::Moderate
        } else {
            Availability::Available
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Availability::Overloaded => "Overloaded",
            Availability::Busy => "Busy",
            Availability::Moderate => "Moderate",
            Availability::Available => "Available",
        }
    }
}

impl std::fmt::Display for Availability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Open work a member carries in one project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectLoad {
    pub project_id: String,
    pub project_name: String,
    pub open_tasks: u64,
    pub high_priority_open: u64,
    pub estimated_hours: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemberWorkload {
    pub member_id: String,
    pub member_name: String,
    pub role: Role,
    pub team_id: Option<String>,
    pub projects: Vec<ProjectLoad>,
    pub open_tasks: u64,
    pub high_priority_open: u64,
    pub overdue_tasks: u64,
    pub estimated_weekly_hours: f64,
    /// `min(100, hours / capacity * 100)`, one decimal.
    pub workload_score: f64,
    pub availability_status: Availability,
    /// Advisory scheduling notes.
    pub conflicts: Vec<String>,
}

/// A project that only one member is working on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BottleneckProject {
    pub project_id: String,
    pub project_name: String,
    pub member_id: String,
    pub member_name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkloadInsights {
    pub overloaded_members: u64,
    pub busy_members: u64,
    pub moderate_members: u64,
    pub available_members: u64,
    pub bottleneck_projects: Vec<BottleneckProject>,
    pub bottleneck_count: u64,
    pub notes: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkloadAnalysis {
    pub members: Vec<MemberWorkload>,
    pub insights: WorkloadInsights,
}
