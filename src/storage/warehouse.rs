//! The warehouse as a `DataSource` and a `ReportStore`.

use rusqlite::Connection;

use crate::error::Result;
use crate::model::{DepartmentInfo, ProjectInfo, TaskRecord, TeamInfo, UserInfo};
use crate::query::{DateRange, TaskQuery};
use crate::snapshot::{ReportSnapshot, ReportStore, SnapshotKind, SnapshotSummary};
use crate::source::{DataSource, FetchError, FetchResult};
use crate::storage::repository;

fn fetch_err<'a>(
    operation: &'static str,
    key: &'a str,
) -> impl FnOnce(rusqlite::Error) -> FetchError + 'a {
    move |e| FetchError::new(operation, key, e.to_string())
}

/// Reads report inputs from an open warehouse connection.
pub struct WarehouseSource<'c> {
    conn: &'c Connection,
}

impl<'c> WarehouseSource<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }
}

impl DataSource for WarehouseSource<'_> {
    fn get_user(&self, user_id: &str) -> FetchResult<Option<UserInfo>> {
        repository::get_user(self.conn, user_id).map_err(fetch_err("get_user", user_id))
    }

    fn get_user_tasks(&self, user_id: &str, range: &DateRange) -> FetchResult<Vec<TaskRecord>> {
        TaskQuery::new()
            .involving(user_id)
            .created_within(range)
            .fetch(self.conn)
            .map_err(fetch_err("get_user_tasks", user_id))
    }

    fn get_user_projects(&self, user_id: &str, range: &DateRange) -> FetchResult<Vec<ProjectInfo>> {
        repository::user_projects(self.conn, user_id, range)
            .map_err(fetch_err("get_user_projects", user_id))
    }

    fn get_project_tasks(&self, project_id: &str) -> FetchResult<Vec<TaskRecord>> {
        TaskQuery::new()
            .project(project_id)
            .fetch(self.conn)
            .map_err(fetch_err("get_project_tasks", project_id))
    }

    fn get_team_members(&self, team_id: &str) -> FetchResult<Vec<UserInfo>> {
        repository::team_members(self.conn, team_id).map_err(fetch_err("get_team_members", team_id))
    }

    fn get_department_members(&self, dept_id: &str) -> FetchResult<Vec<UserInfo>> {
        repository::department_members(self.conn, dept_id)
            .map_err(fetch_err("get_department_members", dept_id))
    }

    fn get_team_info(&self, team_id: &str) -> FetchResult<Option<TeamInfo>> {
        repository::get_team(self.conn, team_id).map_err(fetch_err("get_team_info", team_id))
    }

    fn get_department_info(&self, dept_id: &str) -> FetchResult<Option<DepartmentInfo>> {
        repository::get_department(self.conn, dept_id)
            .map_err(fetch_err("get_department_info", dept_id))
    }
}

/// Snapshots in the `report_snapshots` table.
pub struct SqliteReportStore<'c> {
    conn: &'c Connection,
}

impl<'c> SqliteReportStore<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }
}

impl ReportStore for SqliteReportStore<'_> {
    fn save_snapshot(&self, snapshot: &ReportSnapshot) -> Result<i64> {
        Ok(repository::insert_snapshot(self.conn, snapshot)?)
    }

    fn load_snapshot(&self, id: i64) -> Result<Option<ReportSnapshot>> {
        Ok(repository::get_snapshot(self.conn, id)?)
    }

    fn list_snapshots(&self, kind: Option<SnapshotKind>) -> Result<Vec<SnapshotSummary>> {
        Ok(repository::list_snapshots(self.conn, kind)?)
    }
}
