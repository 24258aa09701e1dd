pub mod date_util;
pub mod error;
pub mod model;
pub mod query;
pub mod report;
pub mod service;
pub mod snapshot;
pub mod source;
pub mod storage;
pub mod workload;

use chrono::NaiveDate;

pub use error::{Error, Result};
pub use model::{DepartmentInfo, Priority, ProjectInfo, Role, TaskRecord, TaskStatus, TeamInfo, UserInfo};
pub use query::{DateRange, Period};
pub use report::{
    MemberGroup, ProjectBreakdown, ProjectStat, Projection, ReportData, ReportScope, TaskDetail,
    TeamProjectStat, TeamReportData,
};
pub use snapshot::{ReportSnapshot, ReportStore, SnapshotKind, SnapshotSummary};
pub use source::{DataSource, Dataset, MemorySource};
pub use storage::{Database, ImportReport};
pub use workload::{Availability, WorkloadAnalysis, WorkloadAnalyzer, WorkloadPolicy};

use storage::{repository, SqliteReportStore, WarehouseSource};

/// Main entry point: reports over the local warehouse.
///
/// Every report runs synchronously inside a single reader call, so a
/// request sees one consistent view of the data.
pub struct ReportEngine {
    db: Database,
    today: Option<NaiveDate>,
}

impl ReportEngine {
    pub fn new(db: Database) -> Self {
        Self { db, today: None }
    }

    /// Pin "today" instead of reading the local clock.
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = Some(today);
        self
    }

    /// Access the database (for direct queries in the CLI).
    pub fn db(&self) -> &Database {
        &self.db
    }

    pub fn today(&self) -> NaiveDate {
        self.today
            .unwrap_or_else(|| chrono::Local::now().date_naive())
    }

    // ── Import ─────────────────────────────────────────────────────

    pub async fn import(&self, data: Dataset) -> Result<ImportReport> {
        let report = self
            .db
            .writer()
            .call(move |conn| storage::import_dataset(conn, &data))
            .await?;
        log::info!(
            "Imported {} users, {} projects, {} tasks",
            report.users,
            report.projects,
            report.tasks
        );
        Ok(report)
    }

    // ── Reports ────────────────────────────────────────────────────

    pub async fn personal_report(&self, user_id: &str, range: DateRange) -> Result<ReportData> {
        let user_id = user_id.to_string();
        let today = self.today();
        let report = self
            .db
            .reader()
            .call(move |conn| {
                service::generate_personal_report(&WarehouseSource::new(conn), &user_id, &range, today)
            })
            .await?;
        Ok(report)
    }

    pub async fn team_report(&self, manager_id: &str, range: DateRange) -> Result<TeamReportData> {
        let manager_id = manager_id.to_string();
        let today = self.today();
        let report = self
            .db
            .reader()
            .call(move |conn| {
                service::generate_team_report(&WarehouseSource::new(conn), &manager_id, &range, today)
            })
            .await?;
        Ok(report)
    }

    pub async fn department_report(
        &self,
        director_id: &str,
        range: DateRange,
    ) -> Result<TeamReportData> {
        let director_id = director_id.to_string();
        let today = self.today();
        let report = self
            .db
            .reader()
            .call(move |conn| {
                service::generate_department_report(
                    &WarehouseSource::new(conn),
                    &director_id,
                    &range,
                    today,
                )
            })
            .await?;
        Ok(report)
    }

    /// Team report plus a workload analysis of its members, using the
    /// configured `workload.*` policy.
    pub async fn team_workload(
        &self,
        manager_id: &str,
        range: DateRange,
    ) -> Result<(TeamReportData, WorkloadAnalysis)> {
        let policy = self.workload_policy().await?;
        let report = self.team_report(manager_id, range).await?;
        let analysis = WorkloadAnalyzer::new(policy).analyze(&report.member_reports);
        Ok((report, analysis))
    }

    // ── Snapshots ──────────────────────────────────────────────────

    pub async fn save_snapshot(&self, snapshot: ReportSnapshot) -> Result<i64> {
        let id = self
            .db
            .writer()
            .call(move |conn| SqliteReportStore::new(conn).save_snapshot(&snapshot))
            .await?;
        log::info!("Saved report snapshot {id}");
        Ok(id)
    }

    pub async fn load_snapshot(&self, id: i64) -> Result<Option<ReportSnapshot>> {
        Ok(self
            .db
            .reader()
            .call(move |conn| SqliteReportStore::new(conn).load_snapshot(id))
            .await?)
    }

    pub async fn list_snapshots(&self, kind: Option<SnapshotKind>) -> Result<Vec<SnapshotSummary>> {
        Ok(self
            .db
            .reader()
            .call(move |conn| SqliteReportStore::new(conn).list_snapshots(kind))
            .await?)
    }

    // ── Config ─────────────────────────────────────────────────────

    pub async fn config_get(&self, key: &str) -> Result<Option<String>> {
        let key = key.to_string();
        Ok(self
            .db
            .reader()
            .call(move |conn| repository::get_config(conn, &key))
            .await?)
    }

    /// Store a setting. `workload.*` values are validated first.
    pub async fn config_set(&self, key: &str, value: &str) -> Result<()> {
        WorkloadPolicy::validate_setting(key, value)?;
        let (key, value) = (key.to_string(), value.to_string());
        self.db
            .writer()
            .call(move |conn| repository::set_config(conn, &key, &value))
            .await?;
        Ok(())
    }

    pub async fn config_list(&self) -> Result<Vec<(String, String)>> {
        Ok(self
            .db
            .reader()
            .call(|conn| repository::list_config(conn))
            .await?)
    }

    pub async fn workload_policy(&self) -> Result<WorkloadPolicy> {
        let entries = self.config_list().await?;
        WorkloadPolicy::from_config(&entries)
    }
}
