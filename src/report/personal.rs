use std::collections::{HashMap, HashSet};

use chrono::{Duration, NaiveDate};

use super::types::{ProjectBreakdown, ProjectStat, Projection, ReportData, TaskDetail};
use super::{empty_status_counts, Tally};
use crate::date_util::{parse_date, parse_instant, percentage};
use crate::model::{ProjectInfo, TaskRecord, UserInfo};
use crate::query::DateRange;
use crate::source::{Degrading, NameCache};

/// Builds one user's report from the projects they belong to and their own
/// tasks. All date logic is relative to `today`, so output is deterministic
/// for a fixed day.
#[derive(Debug, Clone)]
pub struct PersonalReportBuilder {
    today: NaiveDate,
    range: DateRange,
}

impl PersonalReportBuilder {
    pub fn new(today: NaiveDate) -> Self {
        Self {
            today,
            range: DateRange::unbounded(),
        }
    }

    /// Only count tasks created inside `range`.
    pub fn with_range(mut self, range: DateRange) -> Self {
        self.range = range;
        self
    }

    pub fn build(
        &self,
        user: &UserInfo,
        projects: &[ProjectInfo],
        fetch: &Degrading<'_>,
        cache: &mut NameCache,
    ) -> ReportData {
        cache.remember_user(user);
        for project in projects {
            cache.remember_project(project);
        }

        let mut seen_projects = HashSet::new();
        let mut breakdowns = Vec::with_capacity(projects.len());
        for project in projects {
            if !seen_projects.insert(project.id.as_str()) {
                continue;
            }
            let tasks: Vec<TaskRecord> = fetch
                .project_tasks(&project.id)
                .into_iter()
                .filter(|t| self.range.admits(t.created_at.as_deref()))
                .collect();
            log::debug!(
                "Project {} has {} tasks in range for user {}",
                project.id,
                tasks.len(),
                user.id
            );
            let details: Vec<TaskDetail> = tasks
                .iter()
                .map(|t| self.detail(t, Some(project.name.as_str()), fetch, cache))
                .collect();
            breakdowns.push(self.breakdown(&project.id, &project.name, details));
        }

        // Own tasks only count inside the projects reported above, so the
        // status counts and project stats agree with the totals.
        let names: HashMap<&str, &str> = projects
            .iter()
            .map(|p| (p.id.as_str(), p.name.as_str()))
            .collect();
        let own_tasks: Vec<TaskRecord> = dedup_by_id(fetch.user_tasks(&user.id, &self.range))
            .into_iter()
            .filter(|t| t.project_id.as_deref().is_some_and(|p| names.contains_key(p)))
            .collect();
        let mut task_stats = empty_status_counts();
        for task in &own_tasks {
            *task_stats.entry(task.status.as_str().to_string()).or_insert(0) += 1;
        }
        let project_stats = self.project_stats(&own_tasks, &names, fetch, cache);

        let task_details: Vec<TaskDetail> = breakdowns
            .iter()
            .flat_map(|b| b.tasks.iter().cloned())
            .collect();
        // Pooled over every sample rather than averaging project averages.
        let pooled = Tally::of(&task_details);
        let total_tasks: u64 = breakdowns.iter().map(|b| b.total_tasks).sum();
        let completed_tasks: u64 = breakdowns.iter().map(|b| b.completed_tasks).sum();
        let overdue_tasks: u64 = breakdowns.iter().map(|b| b.overdue_tasks).sum();
        let late_completions: u64 = breakdowns.iter().map(|b| b.late_completions).sum();

        ReportData {
            user_id: user.id.clone(),
            user_name: user.name.clone(),
            role: user.role,
            team_id: None,
            team_name: None,
            report_date: self.today,
            total_projects: breakdowns.len() as u64,
            projects_breakdown: breakdowns,
            task_details,
            project_stats,
            task_stats,
            total_tasks,
            completed_tasks,
            overdue_tasks,
            late_completions,
            average_task_duration: pooled.average_duration(),
            completion_percentage: percentage(completed_tasks, total_tasks),
            overdue_percentage: percentage(overdue_tasks, total_tasks),
        }
    }

    /// Derive the per-task flags and resolve display names.
    pub fn detail(
        &self,
        task: &TaskRecord,
        project_name: Option<&str>,
        fetch: &Degrading<'_>,
        cache: &mut NameCache,
    ) -> TaskDetail {
        let owner_name = match (&task.owner_id, non_blank(task.owner_name.as_deref())) {
            (_, Some(name)) => Some(name.to_string()),
            (Some(owner_id), None) => Some(cache.user_name(fetch, owner_id)),
            (None, None) => None,
        };
        let collaborator_names = task
            .collaborator_ids
            .iter()
            .enumerate()
            .map(|(i, id)| {
                match non_blank(task.collaborator_names.get(i).map(String::as_str)) {
                    Some(name) => name.to_string(),
                    None => cache.user_name(fetch, id),
                }
            })
            .collect();

        let completed = task.status.is_completed();
        let due = parse_date(task.due_date.as_deref());
        let is_overdue = !completed && due.is_some_and(|d| self.today > d);
        let is_late = completed
            && due
                .zip(parse_date(task.completed_at.as_deref()))
                .is_some_and(|(due, done)| done > due);

        TaskDetail {
            task_id: task.id.clone(),
            name: task.name.clone(),
            status: task.status,
            priority: task.priority,
            project_id: task.project_id.clone(),
            project_name: project_name
                .map(str::to_string)
                .or_else(|| task.project_id.as_deref().map(|p| cache.project_name(p))),
            owner_id: task.owner_id.clone(),
            owner_name,
            collaborator_ids: task.collaborator_ids.clone(),
            collaborator_names,
            created_at: task.created_at.clone(),
            due_date: task.due_date.clone(),
            completed_at: task.completed_at.clone(),
            is_overdue,
            is_late,
            duration_days: if completed { completion_days(task) } else { None },
        }
    }

    fn breakdown(&self, project_id: &str, project_name: &str, tasks: Vec<TaskDetail>) -> ProjectBreakdown {
        let tally = Tally::of(&tasks);
        let average = tally.average_duration();
        ProjectBreakdown {
            project_id: project_id.to_string(),
            project_name: project_name.to_string(),
            total_tasks: tally.total,
            completed_tasks: tally.completed,
            overdue_tasks: tally.overdue,
            late_completions: tally.late,
            completion_percentage: tally.completion_percentage(),
            overdue_percentage: tally.overdue_percentage(),
            average_task_duration: average,
            projected_completion_date: self.project(tally.total, tally.completed, average),
            tasks,
        }
    }

    /// `today + ceil(remaining * average)` days when there is history to go on.
    pub fn project(&self, total: u64, completed: u64, average: Option<f64>) -> Projection {
        if total > 0 && total == completed {
            return Projection::Completed;
        }
        match average {
            Some(avg) if total > completed => {
                let days = ((total - completed) as f64 * avg).ceil();
                if !days.is_finite() || days > i32::MAX as f64 {
                    return Projection::Unknown;
                }
                self.today
                    .checked_add_signed(Duration::days(days as i64))
                    .map(Projection::Date)
                    .unwrap_or(Projection::Unknown)
            }
            _ => Projection::Unknown,
        }
    }

    /// Group the user's own tasks by project, in order of first appearance.
    fn project_stats(
        &self,
        own_tasks: &[TaskRecord],
        names: &HashMap<&str, &str>,
        fetch: &Degrading<'_>,
        cache: &mut NameCache,
    ) -> Vec<ProjectStat> {
        let mut order: Vec<&str> = Vec::new();
        for task in own_tasks {
            if let Some(pid) = task.project_id.as_deref() {
                if !order.contains(&pid) {
                    order.push(pid);
                }
            }
        }

        order
            .into_iter()
            .map(|pid| {
                let project_name = match names.get(pid) {
                    Some(name) => name.to_string(),
                    None => cache.project_name(pid),
                };
                let tasks: Vec<TaskDetail> = own_tasks
                    .iter()
                    .filter(|t| t.project_id.as_deref() == Some(pid))
                    .map(|t| self.detail(t, Some(project_name.as_str()), fetch, cache))
                    .collect();
                let tally = Tally::of(&tasks);
                ProjectStat {
                    project_id: pid.to_string(),
                    project_name,
                    total_tasks: tally.total,
                    completed_tasks: tally.completed,
                    overdue_tasks: tally.overdue,
                    late_completions: tally.late,
                    completion_percentage: tally.completion_percentage(),
                    overdue_percentage: tally.overdue_percentage(),
                    involved_tasks: tasks.iter().map(|t| t.task_id.clone()).collect(),
                    tasks,
                }
            })
            .collect()
    }
}

/// Whole days from creation to completion. Negative spans are clock skew
/// and dropped; same-day completions count as one day.
fn completion_days(task: &TaskRecord) -> Option<i64> {
    let created = parse_instant(task.created_at.as_deref()?)?;
    let completed = parse_instant(task.completed_at.as_deref()?)?;
    let span = completed - created;
    if span < Duration::zero() {
        return None;
    }
    Some(span.num_days().max(1))
}

fn non_blank(s: Option<&str>) -> Option<&str> {
    s.filter(|v| !v.trim().is_empty())
}

fn dedup_by_id(tasks: Vec<TaskRecord>) -> Vec<TaskRecord> {
    let mut seen = HashSet::new();
    tasks
        .into_iter()
        .filter(|t| seen.insert(t.id.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Role, TaskStatus};
    use crate::source::{Dataset, MemorySource, ProjectEntry};

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 10).unwrap()
    }

    fn user(id: &str, name: &str) -> UserInfo {
        UserInfo {
            id: id.into(),
            name: name.into(),
            role: Role::Staff,
            email: None,
            team_id: None,
            department_id: None,
        }
    }

    fn project(id: &str, name: &str) -> ProjectEntry {
        ProjectEntry {
            info: ProjectInfo {
                id: id.into(),
                name: name.into(),
                created_at: Some("2025-01-01".into()),
            },
            member_ids: vec!["u1".into()],
        }
    }

    fn build(source: &MemorySource, user_id: &str) -> ReportData {
        let fetch = Degrading::new(source);
        let user = fetch.user(user_id).unwrap();
        let projects = fetch.user_projects(user_id, &DateRange::unbounded());
        let mut cache = NameCache::new();
        PersonalReportBuilder::new(today()).build(&user, &projects, &fetch, &mut cache)
    }

    fn scenario_source() -> MemorySource {
        let done = |id: &str, created: &str, completed: &str| {
            TaskRecord::new(id, id, TaskStatus::Completed)
                .project("p1")
                .owner("u1")
                .created(created)
                .completed(completed)
        };
        MemorySource::new(Dataset {
            users: vec![user("u1", "Ada")],
            projects: vec![project("p1", "Billing")],
            tasks: vec![
                done("t1", "2025-05-01", "2025-05-03"),
                done("t2", "2025-05-01", "2025-05-05"),
                done("t3", "2025-05-01T08:00:00", "2025-05-07T09:00:00"),
                TaskRecord::new("t4", "t4", TaskStatus::Ongoing)
                    .project("p1")
                    .owner("u1")
                    .created("2025-05-01")
                    .due("2025-06-09"),
            ],
            ..Dataset::default()
        })
    }

    #[test]
    fn test_projection_scenario() {
        let report = build(&scenario_source(), "u1");
        let p = &report.projects_breakdown[0];
        assert_eq!(p.total_tasks, 4);
        assert_eq!(p.completed_tasks, 3);
        assert_eq!(p.completion_percentage, 75.0);
        assert_eq!(p.overdue_tasks, 1);
        assert_eq!(p.overdue_percentage, 25.0);
        assert_eq!(p.average_task_duration, Some(4.0));
        assert_eq!(
            p.projected_completion_date,
            Projection::Date(today() + Duration::days(4))
        );
        assert_eq!(report.average_task_duration, Some(4.0));
        assert_eq!(report.overdue_tasks, 1);
    }

    #[test]
    fn test_totals_match_breakdowns() {
        let mut source = scenario_source();
        let mut data = source.dataset().clone();
        data.projects.push(project("p2", "Search"));
        data.tasks.push(
            TaskRecord::new("t5", "t5", TaskStatus::UnderReview)
                .project("p2")
                .owner("u2"),
        );
        source = MemorySource::new(data);
        let report = build(&source, "u1");
        assert_eq!(report.total_projects, 2);
        let sum = |f: fn(&ProjectBreakdown) -> u64| report.projects_breakdown.iter().map(f).sum::<u64>();
        assert_eq!(report.total_tasks, sum(|p| p.total_tasks));
        assert_eq!(report.completed_tasks, sum(|p| p.completed_tasks));
        assert_eq!(report.overdue_tasks, sum(|p| p.overdue_tasks));
        assert_eq!(report.task_details.len() as u64, report.total_tasks);
    }

    #[test]
    fn test_empty_project() {
        let source = MemorySource::new(Dataset {
            users: vec![user("u1", "Ada")],
            projects: vec![project("p1", "Empty")],
            ..Dataset::default()
        });
        let report = build(&source, "u1");
        let p = &report.projects_breakdown[0];
        assert_eq!(p.total_tasks, 0);
        assert_eq!(p.completion_percentage, 0.0);
        assert_eq!(p.overdue_percentage, 0.0);
        assert_eq!(p.projected_completion_date, Projection::Unknown);
        assert_eq!(report.completion_percentage, 0.0);
        assert_eq!(report.average_task_duration, None);
    }

    #[test]
    fn test_all_completed_projects_say_completed() {
        let source = MemorySource::new(Dataset {
            users: vec![user("u1", "Ada")],
            projects: vec![project("p1", "Done")],
            tasks: vec![TaskRecord::new("t1", "t1", TaskStatus::Completed).project("p1")],
            ..Dataset::default()
        });
        let report = build(&source, "u1");
        let p = &report.projects_breakdown[0];
        assert_eq!(p.projected_completion_date, Projection::Completed);
        assert_eq!(p.average_task_duration, None);
    }

    #[test]
    fn test_open_work_without_history_is_unknown() {
        let builder = PersonalReportBuilder::new(today());
        assert_eq!(builder.project(3, 1, None), Projection::Unknown);
        assert_eq!(builder.project(0, 0, Some(2.0)), Projection::Unknown);
        assert_eq!(
            builder.project(3, 1, Some(1.5)),
            Projection::Date(today() + Duration::days(3))
        );
    }

    #[test]
    fn test_duration_rules() {
        let base = TaskRecord::new("t", "t", TaskStatus::Completed);
        let same_day = base.clone().created("2025-05-01T09:00:00").completed("2025-05-01T17:00:00");
        assert_eq!(completion_days(&same_day), Some(1));
        let skewed = base.clone().created("2025-05-03").completed("2025-05-01");
        assert_eq!(completion_days(&skewed), None);
        let garbage = base.clone().created("yesterday").completed("2025-05-01");
        assert_eq!(completion_days(&garbage), None);
        let partial_day = base.clone().created("2025-05-01T10:00:00").completed("2025-05-03T09:00:00");
        assert_eq!(completion_days(&partial_day), Some(1));
        // 18:00Z to 20:00Z two days later; the wall-clock reading is under two days.
        let mixed_offsets = base
            .created("2025-05-01T23:00:00+05:00")
            .completed("2025-05-03T20:00:00Z");
        assert_eq!(completion_days(&mixed_offsets), Some(2));
    }

    #[test]
    fn test_overdue_is_date_only_and_tolerates_garbage() {
        let source = MemorySource::new(Dataset::default());
        let fetch = Degrading::new(&source);
        let mut cache = NameCache::new();
        let builder = PersonalReportBuilder::new(today());

        let due_today = TaskRecord::new("a", "a", TaskStatus::Ongoing).due("2025-06-10T23:00:00");
        assert!(!builder.detail(&due_today, None, &fetch, &mut cache).is_overdue);

        let bad_due = TaskRecord::new("b", "b", TaskStatus::Ongoing).due("someday");
        assert!(!builder.detail(&bad_due, None, &fetch, &mut cache).is_overdue);

        let done_late = TaskRecord::new("c", "c", TaskStatus::Completed)
            .due("2025-01-01")
            .completed("2025-01-02T08:00:00");
        let detail = builder.detail(&done_late, None, &fetch, &mut cache);
        assert!(!detail.is_overdue);
        assert!(detail.is_late);
    }

    #[test]
    fn test_names_fall_back_when_directory_fails() {
        let source = MemorySource::new(Dataset {
            users: vec![user("u1", "Ada"), user("u2", "Grace")],
            ..Dataset::default()
        })
        .failing("get_user", "u3");
        let fetch = Degrading::new(&source);
        let mut cache = NameCache::new();
        let task = TaskRecord::new("t", "t", TaskStatus::Ongoing)
            .owner("u3")
            .collaborator("u2");
        let detail = PersonalReportBuilder::new(today()).detail(&task, None, &fetch, &mut cache);
        assert_eq!(detail.owner_name.as_deref(), Some("User u3"));
        assert_eq!(detail.collaborator_names, vec!["Grace".to_string()]);
    }

    #[test]
    fn test_failed_project_fetch_counts_as_empty() {
        let mut data = scenario_source().dataset().clone();
        data.projects.push(project("p2", "Flaky"));
        data.tasks
            .push(TaskRecord::new("t9", "t9", TaskStatus::Ongoing).project("p2").owner("u1"));
        let source = MemorySource::new(data).failing("get_project_tasks", "p2");
        let report = build(&source, "u1");
        assert_eq!(report.projects_breakdown.len(), 2);
        assert_eq!(report.projects_breakdown[1].total_tasks, 0);
        assert_eq!(report.total_tasks, 4);
    }

    #[test]
    fn test_project_stats_are_the_users_slice() {
        let mut data = scenario_source().dataset().clone();
        data.users.push(user("u2", "Grace"));
        data.tasks.push(
            TaskRecord::new("t5", "t5", TaskStatus::Ongoing)
                .project("p1")
                .owner("u2")
                .collaborator("u1"),
        );
        data.tasks
            .push(TaskRecord::new("t6", "t6", TaskStatus::Ongoing).project("p1").owner("u2"));
        let report = build(&MemorySource::new(data), "u1");

        assert_eq!(report.projects_breakdown[0].total_tasks, 6);
        let stat = &report.project_stats[0];
        assert_eq!(stat.total_tasks, 5);
        assert_eq!(stat.involved_tasks, vec!["t1", "t2", "t3", "t4", "t5"]);
        assert_eq!(report.task_stats["Completed"], 3);
        assert_eq!(report.task_stats["Ongoing"], 2);
        assert_eq!(report.task_stats["Under Review"], 0);
    }

    #[test]
    fn test_range_filters_project_tasks() {
        let mut data = scenario_source().dataset().clone();
        data.tasks.push(
            TaskRecord::new("old", "old", TaskStatus::Ongoing)
                .project("p1")
                .owner("u1")
                .created("2024-01-01"),
        );
        let source = MemorySource::new(data);
        let fetch = Degrading::new(&source);
        let user = fetch.user("u1").unwrap();
        let range = DateRange::parse(Some("2025-01-01"), None).unwrap();
        let projects = fetch.user_projects("u1", &range);
        let mut cache = NameCache::new();
        let report = PersonalReportBuilder::new(today())
            .with_range(range)
            .build(&user, &projects, &fetch, &mut cache);
        assert_eq!(report.total_tasks, 4);
    }

    #[test]
    fn test_range_keeps_older_project_with_recent_work() {
        let april = |id: &str, day: &str, status: TaskStatus| {
            TaskRecord::new(id, id, status)
                .project("P")
                .owner("u1")
                .created(&format!("2025-04-{day}"))
        };
        let source = MemorySource::new(Dataset {
            users: vec![user("u1", "Ann")],
            projects: vec![ProjectEntry {
                info: ProjectInfo {
                    id: "P".into(),
                    name: "Billing".into(),
                    created_at: Some("2025-01-01".into()),
                },
                member_ids: vec![],
            }],
            tasks: vec![
                april("a1", "03", TaskStatus::Ongoing),
                april("a2", "10", TaskStatus::Completed).completed("2025-04-12"),
                TaskRecord::new("loose", "loose", TaskStatus::Ongoing)
                    .owner("u1")
                    .created("2025-04-05"),
            ],
            ..Dataset::default()
        });
        let fetch = Degrading::new(&source);
        let user = fetch.user("u1").unwrap();
        let range = DateRange::parse(Some("2025-04-01"), Some("2025-04-30")).unwrap();
        let projects = fetch.user_projects("u1", &range);
        let mut cache = NameCache::new();
        let report = PersonalReportBuilder::new(today())
            .with_range(range)
            .build(&user, &projects, &fetch, &mut cache);

        assert_eq!(report.total_projects, 1);
        assert_eq!(report.total_tasks, 2);
        assert_eq!(report.completed_tasks, 1);
        let counted: u64 = report.task_stats.values().sum();
        assert_eq!(counted, report.total_tasks);
        assert_eq!(report.project_stats.len(), 1);
        assert_eq!(report.project_stats[0].project_name, "Billing");
        assert_eq!(report.project_stats[0].total_tasks, 2);
        assert_eq!(report.task_details[0].project_name.as_deref(), Some("Billing"));
    }

    #[test]
    fn test_builder_is_deterministic() {
        let source = scenario_source();
        let a = serde_json::to_string(&build(&source, "u1")).unwrap();
        let b = serde_json::to_string(&build(&source, "u1")).unwrap();
        assert_eq!(a, b);
    }
}
