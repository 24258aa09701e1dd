//! Workload estimation over member reports: hours of open work per member,
//! a capacity score, and team-level staffing insights.

pub mod types;

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

pub use types::*;

use crate::date_util::round1;
use crate::error::{Error, Result};
use crate::model::{Priority, TaskStatus};
use crate::report::{ReportData, TaskDetail};

pub const KEY_CAPACITY_HOURS: &str = "workload.capacity_hours";
pub const KEY_HIGH_HOURS: &str = "workload.high_hours";
pub const KEY_MEDIUM_HOURS: &str = "workload.medium_hours";
pub const KEY_NORMAL_HOURS: &str = "workload.normal_hours";
pub const KEY_HIGH_CONFLICT_THRESHOLD: &str = "workload.high_conflict_threshold";

/// Tunables for the workload estimate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkloadPolicy {
    pub weekly_capacity_hours: f64,
    pub high_priority_hours: f64,
    pub medium_priority_hours: f64,
    pub normal_priority_hours: f64,
    /// More open High tasks than this is flagged as a scheduling conflict.
    pub high_priority_conflict_threshold: u64,
}

impl Default for WorkloadPolicy {
    fn default() -> Self {
        Self {
            weekly_capacity_hours: 40.0,
            high_priority_hours: 8.0,
            medium_priority_hours: 4.0,
            normal_priority_hours: 2.0,
            high_priority_conflict_threshold: 2,
        }
    }
}

impl WorkloadPolicy {
    /// Defaults overridden by any `workload.*` entries. Other keys are ignored.
    pub fn from_config(entries: &[(String, String)]) -> Result<Self> {
        let mut policy = Self::default();
        for (key, value) in entries {
            policy.apply(key, value)?;
        }
        Ok(policy)
    }

    /// Check a single setting without building a policy.
    pub fn validate_setting(key: &str, value: &str) -> Result<()> {
        Self::default().apply(key, value)
    }

    fn apply(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            KEY_CAPACITY_HOURS => {
                let hours = parse_hours(key, value)?;
                if hours == 0.0 {
                    return Err(Error::Config(format!("{key} must be greater than zero")));
                }
                self.weekly_capacity_hours = hours;
            }
            KEY_HIGH_HOURS => self.high_priority_hours = parse_hours(key, value)?,
            KEY_MEDIUM_HOURS => self.medium_priority_hours = parse_hours(key, value)?,
            KEY_NORMAL_HOURS => self.normal_priority_hours = parse_hours(key, value)?,
            KEY_HIGH_CONFLICT_THRESHOLD => {
                self.high_priority_conflict_threshold = value.trim().parse().map_err(|_| {
                    Error::Config(format!("{key} must be a non-negative integer, got '{value}'"))
                })?;
            }
            _ => {}
        }
        Ok(())
    }

    pub fn hours_for(&self, priority: Priority) -> f64 {
        match priority {
            Priority::High => self.high_priority_hours,
            Priority::Medium => self.medium_priority_hours,
            Priority::Normal => self.normal_priority_hours,
        }
    }
}

fn parse_hours(key: &str, value: &str) -> Result<f64> {
    match value.trim().parse::<f64>() {
        Ok(h) if h.is_finite() && h >= 0.0 => Ok(h),
        _ => Err(Error::Config(format!(
            "{key} must be a non-negative number of hours, got '{value}'"
        ))),
    }
}

pub struct WorkloadAnalyzer {
    policy: WorkloadPolicy,
}

impl WorkloadAnalyzer {
    pub fn new(policy: WorkloadPolicy) -> Self {
        Self { policy }
    }

    pub fn analyze(&self, member_reports: &[ReportData]) -> WorkloadAnalysis {
        let members: Vec<MemberWorkload> =
            member_reports.iter().map(|r| self.member(r)).collect();
        let insights = self.insights(member_reports, &members);
        WorkloadAnalysis { members, insights }
    }

    fn member(&self, report: &ReportData) -> MemberWorkload {
        let mut projects = Vec::new();
        let mut overdue = 0;
        for stat in &report.project_stats {
            let open: Vec<&TaskDetail> = stat
                .tasks
                .iter()
                .filter(|t| t.status != TaskStatus::Completed)
                .collect();
            overdue += open.iter().filter(|t| t.is_overdue).count() as u64;
            if open.is_empty() {
                continue;
            }
            projects.push(ProjectLoad {
                project_id: stat.project_id.clone(),
                project_name: stat.project_name.clone(),
                open_tasks: open.len() as u64,
                high_priority_open: open.iter().filter(|t| t.priority == Priority::High).count()
                    as u64,
                estimated_hours: open.iter().map(|t| self.policy.hours_for(t.priority)).sum(),
            });
        }

        let hours: f64 = projects.iter().map(|p| p.estimated_hours).sum();
        let high: u64 = projects.iter().map(|p| p.high_priority_open).sum();
        let score = round1((hours / self.policy.weekly_capacity_hours * 100.0).min(100.0));

        let mut conflicts = Vec::new();
        if high > self.policy.high_priority_conflict_threshold {
            conflicts.push(format!(
                "{high} high-priority tasks open at once; consider rescheduling"
            ));
        }
        if overdue > 0 {
            conflicts.push(format!("{overdue} overdue task(s) need attention"));
        }

        MemberWorkload {
            member_id: report.user_id.clone(),
            member_name: report.user_name.clone(),
            role: report.role,
            team_id: report.team_id.clone(),
            open_tasks: projects.iter().map(|p| p.open_tasks).sum(),
            projects,
            high_priority_open: high,
            overdue_tasks: overdue,
            estimated_weekly_hours: hours,
            workload_score: score,
            availability_status: Availability::from_score(score),
            conflicts,
        }
    }

    fn insights(&self, reports: &[ReportData], members: &[MemberWorkload]) -> WorkloadInsights {
        let count = |a: Availability| {
            members
                .iter()
                .filter(|m| m.availability_status == a)
                .count() as u64
        };

        // project id -> (name, involved members), in first-appearance order
        let mut order: Vec<&str> = Vec::new();
        let mut involved: HashMap<&str, (&str, Vec<&ReportData>)> = HashMap::new();
        for report in reports {
            for stat in report.project_stats.iter().filter(|s| !s.involved_tasks.is_empty()) {
                let entry = involved.entry(stat.project_id.as_str()).or_insert_with(|| {
                    order.push(stat.project_id.as_str());
                    (stat.project_name.as_str(), Vec::new())
                });
                if !entry.1.iter().any(|r| r.user_id == report.user_id) {
                    entry.1.push(report);
                }
            }
        }
        let bottleneck_projects: Vec<BottleneckProject> = order
            .iter()
            .filter_map(|pid| {
                let (name, members) = involved.get(pid)?;
                match members.as_slice() {
                    [only] => Some(BottleneckProject {
                        project_id: pid.to_string(),
                        project_name: name.to_string(),
                        member_id: only.user_id.clone(),
                        member_name: only.user_name.clone(),
                    }),
                    _ => None,
                }
            })
            .collect();

        let mut insights = WorkloadInsights {
            overloaded_members: count(Availability::Overloaded),
            busy_members: count(Availability::Busy),
            moderate_members: count(Availability::Moderate),
            available_members: count(Availability::Available),
            bottleneck_count: bottleneck_projects.len() as u64,
            bottleneck_projects,
            notes: Vec::new(),
        };
        if insights.overloaded_members > 0 {
            insights.notes.push(format!(
                "{} member(s) are overloaded; rebalance before assigning new work",
                insights.overloaded_members
            ));
        }
        if insights.available_members > 0 {
            insights.notes.push(format!(
                "{} member(s) have capacity for new work",
                insights.available_members
            ));
        }
        if insights.bottleneck_count > 0 {
            insights.notes.push(format!(
                "{} project(s) depend on a single member",
                insights.bottleneck_count
            ));
        }
        insights
    }
}
