//! Report entry points: look up who is asking, check they may ask, then
//! build and aggregate.

use chrono::NaiveDate;

use crate::error::{Error, Result};
use crate::model::{Role, UserInfo};
use crate::query::DateRange;
use crate::report::{aggregate, PersonalReportBuilder, ReportData, ReportScope, TeamGroup, TeamReportData};
use crate::source::{DataSource, Degrading, NameCache};

pub fn generate_personal_report(
    source: &dyn DataSource,
    user_id: &str,
    range: &DateRange,
    today: NaiveDate,
) -> Result<ReportData> {
    let fetch = Degrading::new(source);
    let user = fetch
        .user(user_id)
        .ok_or_else(|| Error::NotFound(format!("User {user_id} not found")))?;
    log::info!("Generating personal report for {} ({})", user.name, user.id);
    let mut cache = NameCache::new();
    Ok(member_report(&fetch, &user, range, today, &mut cache))
}

pub fn generate_team_report(
    source: &dyn DataSource,
    manager_id: &str,
    range: &DateRange,
    today: NaiveDate,
) -> Result<TeamReportData> {
    let fetch = Degrading::new(source);
    let manager = fetch
        .user(manager_id)
        .ok_or_else(|| Error::NotFound(format!("Manager {manager_id} not found")))?;
    if manager.role != Role::Manager {
        return Err(Error::Forbidden(
            "Only managers can generate team reports".to_string(),
        ));
    }
    let team_id = manager.team_id.as_deref().ok_or_else(|| {
        Error::PreconditionFailed(format!("Manager {} is not assigned to a team", manager.name))
    })?;

    let mut cache = NameCache::new();
    let team_name = cache.team_name(&fetch, team_id);
    let members = fetch.team_members(team_id);
    log::info!(
        "Generating team report for {team_name} ({team_id}), {} members",
        members.len()
    );

    let reports = members
        .iter()
        .map(|m| member_report(&fetch, m, range, today, &mut cache).with_team(team_id, &team_name))
        .collect();
    Ok(aggregate(
        ReportScope::Team {
            team_id: team_id.to_string(),
            team_name,
        },
        reports,
    ))
}

pub fn generate_department_report(
    source: &dyn DataSource,
    director_id: &str,
    range: &DateRange,
    today: NaiveDate,
) -> Result<TeamReportData> {
    let fetch = Degrading::new(source);
    let director = fetch
        .user(director_id)
        .ok_or_else(|| Error::NotFound(format!("Director {director_id} not found")))?;
    if director.role != Role::Director {
        return Err(Error::Forbidden(
            "Only directors can generate department reports".to_string(),
        ));
    }
    let dept_id = director.department_id.as_deref().ok_or_else(|| {
        Error::PreconditionFailed(format!(
            "Director {} is not assigned to a department",
            director.name
        ))
    })?;

    let dept_name = fetch
        .department_info(dept_id)
        .map(|d| d.name)
        .unwrap_or_else(|| format!("Department {dept_id}"));
    let members = fetch.department_members(dept_id);
    log::info!(
        "Generating department report for {dept_name} ({dept_id}), {} members",
        members.len()
    );

    let mut cache = NameCache::new();
    let mut teams: Vec<TeamGroup> = Vec::new();
    let mut reports = Vec::with_capacity(members.len());
    for member in &members {
        let report = member_report(&fetch, member, range, today, &mut cache);
        let Some(team_id) = member.team_id.as_deref() else {
            reports.push(report);
            continue;
        };
        let team_name = cache.team_name(&fetch, team_id);
        match teams.iter_mut().find(|g| g.team_id == team_id) {
            Some(group) => group.member_ids.push(member.id.clone()),
            None => teams.push(TeamGroup {
                team_id: team_id.to_string(),
                team_name: team_name.clone(),
                member_ids: vec![member.id.clone()],
            }),
        }
        reports.push(report.with_team(team_id, &team_name));
    }

    Ok(aggregate(
        ReportScope::Department {
            dept_id: dept_id.to_string(),
            dept_name,
            teams,
        },
        reports,
    ))
}

fn member_report(
    fetch: &Degrading<'_>,
    user: &UserInfo,
    range: &DateRange,
    today: NaiveDate,
    cache: &mut NameCache,
) -> ReportData {
    let projects = fetch.user_projects(&user.id, range);
    log::debug!("{} has {} projects in range", user.id, projects.len());
    PersonalReportBuilder::new(today)
        .with_range(*range)
        .build(user, &projects, fetch, cache)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{Dataset, MemorySource};

    const ORG: &str = r#"{
        "departments": [{"id": "d1", "name": "Engineering", "director_id": "dir"}],
        "teams": [
            {"id": "t1", "name": "Platform", "manager_id": "mgr", "department_id": "d1"},
            {"id": "t2", "name": "Data", "department_id": "d1"}
        ],
        "users": [
            {"id": "dir", "name": "Dana", "role": 3, "department_id": "d1"},
            {"id": "mgr", "name": "Mo", "role": 2, "team_id": "t1"},
            {"id": "lost", "name": "Lee", "role": "manager"},
            {"id": "a", "name": "Ann", "role": 1, "team_id": "t1"},
            {"id": "b", "name": "Ben", "role": "staff", "team_id": "t1"},
            {"id": "c", "name": "Cid", "role": 1, "team_id": "t2"}
        ],
        "projects": [
            {"id": "P", "name": "Billing", "created_at": "2025-01-01"},
            {"id": "Q", "name": "Search", "created_at": "2025-02-01"}
        ],
        "tasks": [
            {"id": "1", "name": "a only", "status": "Ongoing", "owner_id": "a", "project_id": "P",
             "created_at": "2025-03-01", "due_date": "2025-06-01", "priority": 3},
            {"id": "2", "name": "shared", "status": "Completed", "owner_id": "a",
             "collaborator_ids": ["b"], "project_id": "P",
             "created_at": "2025-03-01", "completed_at": "2025-03-04"},
            {"id": "3", "name": "b one", "status": 3, "owner_id": "b", "project_id": "P",
             "created_at": "2025-04-01"},
            {"id": "4", "name": "b two", "status": "Completed", "owner_id": "b", "project_id": "P",
             "created_at": "2025-04-01", "completed_at": "2025-04-03"},
            {"id": "5", "name": "c", "status": "Ongoing", "owner_id": "c", "project_id": "Q",
             "created_at": "2025-05-01"}
        ]
    }"#;

    fn source() -> MemorySource {
        MemorySource::new(Dataset::from_json(ORG).unwrap())
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 10).unwrap()
    }

    #[test]
    fn test_personal_report() {
        let report = generate_personal_report(&source(), "a", &DateRange::unbounded(), today()).unwrap();
        assert_eq!(report.user_name, "Ann");
        assert_eq!(report.total_projects, 1);
        assert_eq!(report.total_tasks, 4);
        assert_eq!(report.overdue_tasks, 1);
        assert_eq!(report.project_stats[0].involved_tasks, vec!["1", "2"]);
        assert_eq!(report.report_date, today());
        assert!(report.team_id.is_none());
    }

    #[test]
    fn test_unknown_user() {
        let err = generate_personal_report(&source(), "nobody", &DateRange::unbounded(), today())
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[test]
    fn test_team_report_requires_manager() {
        let err = generate_team_report(&source(), "a", &DateRange::unbounded(), today()).unwrap_err();
        assert!(matches!(err, Error::Forbidden(_)));
        assert!(err.to_string().ends_with("Only managers can generate team reports"));

        let err = generate_team_report(&source(), "lost", &DateRange::unbounded(), today()).unwrap_err();
        assert!(matches!(err, Error::PreconditionFailed(_)));

        let err = generate_team_report(&source(), "ghost", &DateRange::unbounded(), today()).unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[test]
    fn test_team_report_merges_shared_project() {
        let report = generate_team_report(&source(), "mgr", &DateRange::unbounded(), today()).unwrap();
        assert_eq!(report.scope.name(), "Platform");
        assert_eq!(report.member_reports.len(), 3);
        assert!(report
            .member_reports
            .iter()
            .all(|m| m.team_id.as_deref() == Some("t1")));

        let p = report.project_stat("P").unwrap();
        assert_eq!(p.total_tasks, 4);
        assert_eq!(p.member_involvement["a"], vec!["1", "2"]);
        assert_eq!(p.member_involvement["b"], vec!["2", "3", "4"]);
        assert_eq!(p.task_assignees["2"], vec!["a", "b"]);
        let shared = p.all_tasks.iter().find(|t| t.task_id == "2").unwrap();
        assert_eq!(shared.owner_name.as_deref(), Some("Ann"));
        assert_eq!(shared.collaborator_names, vec!["Ben".to_string()]);
    }

    #[test]
    fn test_department_report_groups_by_team() {
        let report =
            generate_department_report(&source(), "dir", &DateRange::unbounded(), today()).unwrap();
        let ReportScope::Department { dept_name, teams, .. } = &report.scope else {
            panic!("expected a department scope");
        };
        assert_eq!(dept_name, "Engineering");
        let ids: Vec<&str> = teams.iter().map(|t| t.team_id.as_str()).collect();
        assert_eq!(ids, vec!["t1", "t2"]);
        assert_eq!(teams[0].member_ids, vec!["mgr", "a", "b"]);
        assert_eq!(teams[1].team_name, "Data");

        let groups = report.members_by_team();
        assert_eq!(groups.last().unwrap().team_name, "No team");
        assert_eq!(report.team_project_stats.len(), 2);

        let err = generate_department_report(&source(), "mgr", &DateRange::unbounded(), today())
            .unwrap_err();
        assert!(matches!(err, Error::Forbidden(_)));
    }

    #[test]
    fn test_range_limits_tasks() {
        let april = DateRange::parse(Some("2025-04-01"), Some("2025-04-30")).unwrap();
        let report = generate_team_report(&source(), "mgr", &april, today()).unwrap();
        let p = report.project_stat("P").unwrap();
        assert_eq!(p.total_tasks, 2);
        assert!(p.member_involvement.get("a").is_none());

        // P predates the range but Ben's April work keeps it in his report.
        let b = report.member_reports.iter().find(|m| m.user_id == "b").unwrap();
        assert_eq!(b.total_tasks, 2);
        assert_eq!(b.projects_breakdown[0].project_name, "Billing");
        assert_eq!(b.task_stats.values().sum::<u64>(), b.total_tasks);
    }

    #[test]
    fn test_degraded_member_fetch_still_reports() {
        let source = source().failing("get_user_tasks", "b").failing("get_user_projects", "b");
        let report = generate_team_report(&source, "mgr", &DateRange::unbounded(), today()).unwrap();
        let b = report.member_reports.iter().find(|m| m.user_id == "b").unwrap();
        assert_eq!(b.total_tasks, 0);
        assert!(b.project_stats.is_empty());
    }
}
