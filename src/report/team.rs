use std::collections::{BTreeMap, HashMap, HashSet};

use super::types::{
    ProjectStat, ReportData, ReportScope, TaskDetail, TeamGroup, TeamProjectStat, TeamReportData,
    TeamTaskDetail,
};
use super::{empty_status_counts, Tally};
use crate::date_util::{mean, percentage};

/// Roll member reports up into one team or department report.
pub fn aggregate(scope: ReportScope, member_reports: Vec<ReportData>) -> TeamReportData {
    let total: u64 = member_reports.iter().map(|r| r.total_tasks).sum();
    let completed: u64 = member_reports.iter().map(|r| r.completed_tasks).sum();
    let overdue: u64 = member_reports.iter().map(|r| r.overdue_tasks).sum();
    let projects: u64 = member_reports.iter().map(|r| r.total_projects).sum();

    let averages: Vec<f64> = member_reports
        .iter()
        .filter_map(|r| r.average_task_duration)
        .collect();

    let mut task_stats = empty_status_counts();
    for report in &member_reports {
        for (status, count) in &report.task_stats {
            *task_stats.entry(status.clone()).or_insert(0) += count;
        }
    }

    // Each member is tagged on the tasks they own or collaborate on, not on
    // every task of the projects they belong to.
    let task_details = member_reports
        .iter()
        .flat_map(|r| {
            r.project_stats
                .iter()
                .flat_map(|p| p.tasks.iter())
                .map(move |task| TeamTaskDetail {
                    member_id: r.user_id.clone(),
                    member_name: r.user_name.clone(),
                    task: task.clone(),
                })
        })
        .collect();

    let mut merger = ProjectMerger::default();
    for report in &member_reports {
        for stat in &report.project_stats {
            merger.fold(&report.user_id, stat);
        }
    }

    log::debug!(
        "Aggregated {} member reports for {} into {} projects",
        member_reports.len(),
        scope.id(),
        merger.order.len()
    );

    TeamReportData {
        scope,
        member_reports,
        total_team_tasks: total,
        completed_team_tasks: completed,
        overdue_team_tasks: overdue,
        total_team_projects: projects,
        team_completion_percentage: percentage(completed, total),
        team_overdue_percentage: percentage(overdue, total),
        team_average_task_duration: mean(&averages),
        team_task_stats: task_stats,
        team_task_details: task_details,
        team_project_stats: merger.finish(),
    }
}

impl TeamReportData {
    /// Combine two roll-ups of the same scope. Members already present in
    /// `self` win over `other`'s copy.
    pub fn merge(&self, other: &TeamReportData) -> TeamReportData {
        let mut seen: HashSet<&str> = HashSet::new();
        let members: Vec<ReportData> = self
            .member_reports
            .iter()
            .chain(&other.member_reports)
            .filter(|r| seen.insert(r.user_id.as_str()))
            .cloned()
            .collect();

        let scope = match (&self.scope, &other.scope) {
            (
                ReportScope::Department {
                    dept_id,
                    dept_name,
                    teams,
                },
                ReportScope::Department { teams: more, .. },
            ) => ReportScope::Department {
                dept_id: dept_id.clone(),
                dept_name: dept_name.clone(),
                teams: merge_groups(teams, more),
            },
            (scope, _) => scope.clone(),
        };
        aggregate(scope, members)
    }
}

fn merge_groups(a: &[TeamGroup], b: &[TeamGroup]) -> Vec<TeamGroup> {
    let mut merged: Vec<TeamGroup> = a.to_vec();
    for group in b {
        match merged.iter_mut().find(|g| g.team_id == group.team_id) {
            Some(existing) => {
                for id in &group.member_ids {
                    if !existing.member_ids.contains(id) {
                        existing.member_ids.push(id.clone());
                    }
                }
            }
            None => merged.push(group.clone()),
        }
    }
    merged
}

struct MergeEntry {
    project_id: String,
    project_name: String,
    member_involvement: BTreeMap<String, Vec<String>>,
    task_assignees: BTreeMap<String, Vec<String>>,
    tasks: Vec<TaskDetail>,
    task_ids: HashSet<String>,
}

/// Merge-by-project-id accumulator. Numbers are only computed in `finish`,
/// from the distinct task union.
#[derive(Default)]
struct ProjectMerger {
    order: Vec<String>,
    entries: HashMap<String, MergeEntry>,
}

impl ProjectMerger {
    fn fold(&mut self, member_id: &str, stat: &ProjectStat) {
        if !self.entries.contains_key(&stat.project_id) {
            self.order.push(stat.project_id.clone());
        }
        let entry = self
            .entries
            .entry(stat.project_id.clone())
            .or_insert_with(|| MergeEntry {
                project_id: stat.project_id.clone(),
                project_name: stat.project_name.clone(),
                member_involvement: BTreeMap::new(),
                task_assignees: BTreeMap::new(),
                tasks: Vec::new(),
                task_ids: HashSet::new(),
            });

        let involvement = entry
            .member_involvement
            .entry(member_id.to_string())
            .or_default();
        for task_id in &stat.involved_tasks {
            push_unique(involvement, task_id);
            push_unique(
                entry.task_assignees.entry(task_id.clone()).or_default(),
                member_id,
            );
        }

        for task in &stat.tasks {
            if entry.task_ids.insert(task.task_id.clone()) {
                entry.tasks.push(task.clone());
            }
        }
    }

    fn finish(mut self) -> Vec<TeamProjectStat> {
        self.order
            .iter()
            .filter_map(|id| self.entries.remove(id))
            .map(|entry| {
                let tally = Tally::of(&entry.tasks);
                TeamProjectStat {
                    project_id: entry.project_id,
                    project_name: entry.project_name,
                    total_tasks: tally.total,
                    completed_tasks: tally.completed,
                    overdue_tasks: tally.overdue,
                    late_completions: tally.late,
                    completion_percentage: percentage(tally.completed, tally.total),
                    overdue_percentage: percentage(tally.overdue, tally.total),
                    member_involvement: entry.member_involvement,
                    task_assignees: entry.task_assignees,
                    all_tasks: entry.tasks,
                }
            })
            .collect()
    }
}

fn push_unique(list: &mut Vec<String>, value: &str) {
    if !list.iter().any(|v| v == value) {
        list.push(value.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Priority, Role, TaskStatus};
    use crate::report::Projection;
    use chrono::NaiveDate;

    fn task(id: &str, project: &str, owner: &str, status: TaskStatus) -> TaskDetail {
        TaskDetail {
            task_id: id.into(),
            name: format!("Task {id}"),
            status,
            priority: Priority::Normal,
            project_id: Some(project.into()),
            project_name: Some(format!("Project {project}")),
            owner_id: Some(owner.into()),
            owner_name: Some(owner.to_uppercase()),
            collaborator_ids: vec![],
            collaborator_names: vec![],
            created_at: Some("2025-05-01".into()),
            due_date: None,
            completed_at: None,
            is_overdue: false,
            is_late: false,
            duration_days: status.is_completed().then_some(2),
        }
    }

    fn member(id: &str, tasks: Vec<TaskDetail>) -> ReportData {
        let tally = Tally::of(&tasks);
        let mut projects: Vec<String> = Vec::new();
        for t in &tasks {
            let pid = t.project_id.clone().unwrap();
            if !projects.contains(&pid) {
                projects.push(pid);
            }
        }
        let project_stats = projects
            .iter()
            .map(|pid| {
                let mine: Vec<TaskDetail> = tasks
                    .iter()
                    .filter(|t| t.project_id.as_deref() == Some(pid))
                    .cloned()
                    .collect();
                let t = Tally::of(&mine);
                ProjectStat {
                    project_id: pid.clone(),
                    project_name: format!("Project {pid}"),
                    total_tasks: t.total,
                    completed_tasks: t.completed,
                    overdue_tasks: t.overdue,
                    late_completions: t.late,
                    completion_percentage: t.completion_percentage(),
                    overdue_percentage: t.overdue_percentage(),
                    involved_tasks: mine.iter().map(|t| t.task_id.clone()).collect(),
                    tasks: mine,
                }
            })
            .collect();
        let mut task_stats = empty_status_counts();
        for t in &tasks {
            *task_stats.get_mut(t.status.as_str()).unwrap() += 1;
        }
        ReportData {
            user_id: id.into(),
            user_name: id.to_uppercase(),
            role: Role::Staff,
            team_id: None,
            team_name: None,
            report_date: NaiveDate::from_ymd_opt(2025, 6, 10).unwrap(),
            projects_breakdown: vec![],
            task_details: tasks.clone(),
            project_stats,
            task_stats,
            total_tasks: tally.total,
            completed_tasks: tally.completed,
            overdue_tasks: tally.overdue,
            late_completions: tally.late,
            total_projects: projects.len() as u64,
            average_task_duration: tally.average_duration(),
            completion_percentage: tally.completion_percentage(),
            overdue_percentage: tally.overdue_percentage(),
        }
    }

    fn team() -> ReportScope {
        ReportScope::Team {
            team_id: "t1".into(),
            team_name: "Platform".into(),
        }
    }

    fn shared_members() -> (ReportData, ReportData) {
        let shared = task("s", "P", "a", TaskStatus::Completed);
        let a = member("a", vec![task("a1", "P", "a", TaskStatus::Ongoing), shared.clone()]);
        let b = member(
            "b",
            vec![
                task("b1", "P", "b", TaskStatus::Ongoing),
                task("b2", "P", "b", TaskStatus::Completed),
                shared,
            ],
        );
        (a, b)
    }

    #[test]
    fn test_shared_project_counts_tasks_once() {
        let (a, b) = shared_members();
        let report = aggregate(team(), vec![a, b]);
        assert_eq!(report.team_project_stats.len(), 1);
        let p = report.project_stat("P").unwrap();
        assert_eq!(p.total_tasks, 4);
        assert_eq!(p.completed_tasks, 2);
        assert_eq!(p.completion_percentage, 50.0);
        assert_eq!(p.member_involvement["a"], vec!["a1", "s"]);
        assert_eq!(p.member_involvement["b"], vec!["b1", "b2", "s"]);
        assert_eq!(p.task_assignees["s"], vec!["a", "b"]);
        assert_eq!(p.all_tasks.len(), 4);
    }

    #[test]
    fn test_totals_and_stats_are_sums() {
        let (a, b) = shared_members();
        let report = aggregate(team(), vec![a, b]);
        assert_eq!(report.total_team_tasks, 5);
        assert_eq!(report.completed_team_tasks, 3);
        assert_eq!(report.total_team_projects, 2);
        assert_eq!(report.team_completion_percentage, 60.0);
        assert_eq!(report.team_task_stats["Completed"], 3);
        assert_eq!(report.team_task_stats["Unassigned"], 0);
        assert_eq!(report.team_task_details.len(), 5);
        assert_eq!(report.team_task_details[0].member_id, "a");
        assert_eq!(report.team_average_task_duration, Some(2.0));
    }

    #[test]
    fn test_task_details_tag_contributing_members_only() {
        let (a, b) = shared_members();
        let mut bystander = member("m", vec![]);
        // A project member with no tasks of their own still sees the
        // project's tasks in their personal detail list.
        bystander.task_details = a.task_details.clone();
        let report = aggregate(team(), vec![a, b, bystander]);

        assert!(report.team_task_details.iter().all(|d| d.member_id != "m"));
        let tagged: Vec<(&str, &str)> = report
            .team_task_details
            .iter()
            .map(|d| (d.member_id.as_str(), d.task.task_id.as_str()))
            .collect();
        assert_eq!(
            tagged,
            vec![("a", "a1"), ("a", "s"), ("b", "b1"), ("b", "b2"), ("b", "s")]
        );
    }

    #[test]
    fn test_empty_team() {
        let report = aggregate(team(), vec![]);
        assert_eq!(report.total_team_tasks, 0);
        assert_eq!(report.team_completion_percentage, 0.0);
        assert_eq!(report.team_average_task_duration, None);
        assert!(report.team_project_stats.is_empty());
        assert_eq!(report.team_task_stats.len(), 4);
    }

    #[test]
    fn test_merge_matches_single_aggregation() {
        let (a, b) = shared_members();
        let c = member(
            "c",
            vec![
                task("s", "P", "a", TaskStatus::Completed),
                task("c1", "Q", "c", TaskStatus::UnderReview),
            ],
        );
        let all = aggregate(team(), vec![a.clone(), b.clone(), c.clone()]);
        let merged = aggregate(team(), vec![a.clone(), b.clone()]).merge(&aggregate(team(), vec![c.clone()]));
        let reversed = aggregate(team(), vec![c]).merge(&aggregate(team(), vec![a, b]));

        let totals = |r: &TeamReportData| {
            r.team_project_stats
                .iter()
                .map(|p| {
                    (
                        p.project_id.clone(),
                        (p.total_tasks, p.completed_tasks, p.overdue_tasks),
                    )
                })
                .collect::<BTreeMap<_, _>>()
        };
        assert_eq!(totals(&merged), totals(&all));
        assert_eq!(totals(&reversed), totals(&all));
        assert_eq!(merged.total_team_tasks, all.total_team_tasks);
    }

    #[test]
    fn test_merge_is_idempotent() {
        let (a, b) = shared_members();
        let report = aggregate(team(), vec![a, b]);
        let again = report.merge(&report);
        assert_eq!(again, report);
    }

    #[test]
    fn test_department_groups_merge() {
        let scope = |teams: Vec<TeamGroup>| ReportScope::Department {
            dept_id: "d1".into(),
            dept_name: "Engineering".into(),
            teams,
        };
        let group = |id: &str, members: &[&str]| TeamGroup {
            team_id: id.into(),
            team_name: format!("Team {id}"),
            member_ids: members.iter().map(|m| m.to_string()).collect(),
        };
        let (a, b) = shared_members();
        let left = aggregate(scope(vec![group("t1", &["a"])]), vec![a]);
        let right = aggregate(scope(vec![group("t1", &["b"]), group("t2", &[])]), vec![b]);
        let merged = left.merge(&right);
        match &merged.scope {
            ReportScope::Department { teams, .. } => {
                assert_eq!(teams.len(), 2);
                assert_eq!(teams[0].member_ids, vec!["a", "b"]);
            }
            other => panic!("unexpected scope {other:?}"),
        }
    }

    #[test]
    fn test_round_trip_keeps_team_tags() {
        let (a, b) = shared_members();
        let report = aggregate(
            ReportScope::Department {
                dept_id: "d1".into(),
                dept_name: "Engineering".into(),
                teams: vec![],
            },
            vec![a.with_team("t1", "Platform"), b],
        );
        let back = TeamReportData::from_dict(report.to_dict().unwrap()).unwrap();
        assert_eq!(back, report);
        assert_eq!(back.member_reports[0].team_name.as_deref(), Some("Platform"));

        let groups = back.members_by_team();
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].team_name, "Platform");
        assert_eq!(groups[1].team_id, None);
    }

    #[test]
    fn test_personal_round_trip() {
        let (a, _) = shared_members();
        let mut a = a;
        a.projects_breakdown.push(crate::report::ProjectBreakdown {
            project_id: "P".into(),
            project_name: "Project P".into(),
            total_tasks: 2,
            completed_tasks: 1,
            overdue_tasks: 0,
            late_completions: 0,
            completion_percentage: 50.0,
            overdue_percentage: 0.0,
            average_task_duration: Some(2.0 / 3.0),
            projected_completion_date: Projection::Completed,
            tasks: a.task_details.clone(),
        });
        let back = ReportData::from_dict(a.to_dict().unwrap()).unwrap();
        assert_eq!(back, a);
    }
}
