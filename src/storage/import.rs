use rusqlite::Connection;
use serde::Serialize;

use crate::source::Dataset;
use crate::storage::repository;

/// Row counts written by one import.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportReport {
    pub departments: u64,
    pub teams: u64,
    pub users: u64,
    pub projects: u64,
    pub tasks: u64,
}

/// Load a dataset into the warehouse in one transaction. Records already
/// present are updated in place and keep their original ordering.
pub fn import_dataset(conn: &mut Connection, data: &Dataset) -> Result<ImportReport, rusqlite::Error> {
    let tx = conn.transaction()?;
    let mut report = ImportReport::default();

    for dept in &data.departments {
        repository::upsert_department(&tx, dept)?;
        report.departments += 1;
    }
    for team in &data.teams {
        repository::upsert_team(&tx, team)?;
        report.teams += 1;
    }
    for user in &data.users {
        repository::upsert_user(&tx, user)?;
        report.users += 1;
    }
    for project in &data.projects {
        repository::upsert_project(&tx, &project.info)?;
        repository::replace_project_members(&tx, &project.info.id, &project.member_ids)?;
        report.projects += 1;
    }
    for task in &data.tasks {
        repository::upsert_task(&tx, task)?;
        report.tasks += 1;
    }

    tx.commit()?;
    log::debug!("Imported {report:?}");
    Ok(report)
}
