use chrono::NaiveDate;
use rusqlite::types::ToSql;
use rusqlite::Connection;

use crate::model::{Priority, RawCode, TaskRecord, TaskStatus};
use crate::query::range::DateRange;

/// Builder for task queries against the warehouse `fact_tasks` table.
/// Rows come back in import order (`seq`), which is the upstream source order.
#[derive(Debug, Clone, Default)]
pub struct TaskQuery {
    project_id: Option<String>,
    involving: Option<String>,
    created_after: Option<NaiveDate>,
    created_before: Option<NaiveDate>,
}

impl TaskQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn project(mut self, project_id: &str) -> Self {
        self.project_id = Some(project_id.to_string());
        self
    }

    /// Tasks the user owns or collaborates on.
    pub fn involving(mut self, user_id: &str) -> Self {
        self.involving = Some(user_id.to_string());
        self
    }

    pub fn created_within(mut self, range: &DateRange) -> Self {
        self.created_after = range.start;
        self.created_before = range.end;
        self
    }

    /// Run the query and hydrate collaborators for every row.
    pub fn fetch(&self, conn: &Connection) -> Result<Vec<TaskRecord>, rusqlite::Error> {
        let (sql, params) = self.build_sql();
        let param_refs: Vec<&dyn ToSql> = params.iter().map(|p| p.as_ref()).collect();
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(param_refs.as_slice(), |row| {
            Ok(TaskRecord {
                id: row.get(0)?,
                name: row.get(1)?,
                status: TaskStatus::normalize(&RawCode::Text(row.get(2)?)),
                priority: Priority::normalize(&RawCode::Text(row.get(3)?)),
                owner_id: row.get(4)?,
                owner_name: row.get(5)?,
                collaborator_ids: Vec::new(),
                collaborator_names: Vec::new(),
                project_id: row.get(6)?,
                created_at: row.get(7)?,
                due_date: row.get(8)?,
                completed_at: row.get(9)?,
            })
        })?;
        let mut tasks: Vec<TaskRecord> = rows.collect::<Result<_, _>>()?;

        let mut collab_stmt = conn.prepare(
            "SELECT c.user_id, COALESCE(c.user_name, u.name, '')
             FROM bridge_task_collaborators c
             LEFT JOIN dim_users u ON u.user_id = c.user_id
             WHERE c.task_id = ?1
             ORDER BY c.position",
        )?;
        for task in &mut tasks {
            let collaborators = collab_stmt
                .query_map([&task.id], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?
                .collect::<Result<Vec<_>, _>>()?;
            for (id, name) in collaborators {
                task.collaborator_ids.push(id);
                task.collaborator_names.push(name);
            }
        }
        Ok(tasks)
    }

    fn build_sql(&self) -> (String, Vec<Box<dyn ToSql>>) {
        let mut params: Vec<Box<dyn ToSql>> = Vec::new();
        let mut wheres = Vec::new();
        let mut param_idx = 1;

        let select = "SELECT t.task_id, t.name, t.status, t.priority, t.owner_id,
                COALESCE(t.owner_name, u.name) AS owner_name,
                t.project_id, t.created_at, t.due_date, t.completed_at
            FROM fact_tasks t
            LEFT JOIN dim_users u ON u.user_id = t.owner_id";

        if let Some(ref pid) = self.project_id {
            wheres.push(format!("t.project_id = ?{param_idx}"));
            params.push(Box::new(pid.clone()));
            param_idx += 1;
        }

        // Owner or collaborator; the same parameter is referenced twice.
        if let Some(ref uid) = self.involving {
            wheres.push(format!(
                "(t.owner_id = ?{param_idx} OR EXISTS (
                    SELECT 1 FROM bridge_task_collaborators c
                    WHERE c.task_id = t.task_id AND c.user_id = ?{param_idx}))"
            ));
            params.push(Box::new(uid.clone()));
            param_idx += 1;
        }

        // created_date_key is NULL for unparseable timestamps, so bounded
        // queries drop those rows.
        if let Some(date) = self.created_after {
            wheres.push(format!("t.created_date_key >= ?{param_idx}"));
            params.push(Box::new(date.format("%Y-%m-%d").to_string()));
            param_idx += 1;
        }
        if let Some(date) = self.created_before {
            wheres.push(format!("t.created_date_key <= ?{param_idx}"));
            params.push(Box::new(date.format("%Y-%m-%d").to_string()));
        }

        let mut sql = select.to_string();
        if !wheres.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&wheres.join(" AND "));
        }
        sql.push_str(" ORDER BY t.seq ASC");

        (sql, params)
    }
}
