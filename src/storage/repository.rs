use chrono::NaiveDate;
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::date_util::{format_date, parse_date};
use crate::model::{DepartmentInfo, ProjectInfo, RawCode, Role, TaskRecord, TeamInfo, UserInfo};
use crate::query::DateRange;
use crate::snapshot::{ReportSnapshot, SnapshotKind, SnapshotSummary};

fn date_key(iso: Option<&str>) -> Option<String> {
    parse_date(iso).map(format_date)
}

fn range_bounds(range: &DateRange) -> (Option<String>, Option<String>) {
    (range.start.map(format_date), range.end.map(format_date))
}

// ── Departments & Teams ────────────────────────────────────────────

pub fn upsert_department(conn: &Connection, dept: &DepartmentInfo) -> Result<(), rusqlite::Error> {
    conn.execute(
        "INSERT OR REPLACE INTO dim_departments (dept_id, name, director_id, cached_at)
         VALUES (?1, ?2, ?3, datetime('now'))",
        params![dept.id, dept.name, dept.director_id],
    )?;
    Ok(())
}

pub fn get_department(conn: &Connection, dept_id: &str) -> Result<Option<DepartmentInfo>, rusqlite::Error> {
    conn.query_row(
        "SELECT dept_id, name, director_id FROM dim_departments WHERE dept_id = ?1",
        params![dept_id],
        |row| {
            Ok(DepartmentInfo {
                id: row.get(0)?,
                name: row.get(1)?,
                director_id: row.get(2)?,
            })
        },
    )
    .optional()
}

pub fn upsert_team(conn: &Connection, team: &TeamInfo) -> Result<(), rusqlite::Error> {
    conn.execute(
        "INSERT OR REPLACE INTO dim_teams (team_id, name, manager_id, department_id, cached_at)
         VALUES (?1, ?2, ?3, ?4, datetime('now'))",
        params![team.id, team.name, team.manager_id, team.department_id],
    )?;
    Ok(())
}

pub fn get_team(conn: &Connection, team_id: &str) -> Result<Option<TeamInfo>, rusqlite::Error> {
    conn.query_row(
        "SELECT team_id, name, manager_id, department_id FROM dim_teams WHERE team_id = ?1",
        params![team_id],
        |row| {
            Ok(TeamInfo {
                id: row.get(0)?,
                name: row.get(1)?,
                manager_id: row.get(2)?,
                department_id: row.get(3)?,
            })
        },
    )
    .optional()
}

// ── Users ──────────────────────────────────────────────────────────

const USER_COLUMNS: &str = "u.user_id, u.name, u.role, u.email, u.team_id, u.department_id";

fn user_from_row(row: &Row<'_>) -> Result<UserInfo, rusqlite::Error> {
    Ok(UserInfo {
        id: row.get(0)?,
        name: row.get(1)?,
        role: Role::normalize(&RawCode::Text(row.get(2)?)),
        email: row.get(3)?,
        team_id: row.get(4)?,
        department_id: row.get(5)?,
    })
}

/// Insert or update a user. New users are appended to the import order;
/// existing users keep their position.
pub fn upsert_user(conn: &Connection, user: &UserInfo) -> Result<(), rusqlite::Error> {
    conn.execute(
        "INSERT INTO dim_users (user_id, name, role, email, team_id, department_id, seq, cached_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6,
                 (SELECT COALESCE(MAX(seq), 0) + 1 FROM dim_users), datetime('now'))
         ON CONFLICT(user_id) DO UPDATE SET
            name=excluded.name, role=excluded.role, email=excluded.email,
            team_id=excluded.team_id, department_id=excluded.department_id,
            cached_at=excluded.cached_at",
        params![
            user.id,
            user.name,
            user.role.as_str(),
            user.email,
            user.team_id,
            user.department_id,
        ],
    )?;
    Ok(())
}

pub fn get_user(conn: &Connection, user_id: &str) -> Result<Option<UserInfo>, rusqlite::Error> {
    conn.query_row(
        &format!("SELECT {USER_COLUMNS} FROM dim_users u WHERE u.user_id = ?1"),
        params![user_id],
        user_from_row,
    )
    .optional()
}

pub fn team_members(conn: &Connection, team_id: &str) -> Result<Vec<UserInfo>, rusqlite::Error> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {USER_COLUMNS} FROM dim_users u WHERE u.team_id = ?1 ORDER BY u.seq"
    ))?;
    let rows = stmt.query_map(params![team_id], user_from_row)?;
    rows.collect()
}

/// Users assigned to the department directly or through one of its teams.
pub fn department_members(conn: &Connection, dept_id: &str) -> Result<Vec<UserInfo>, rusqlite::Error> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {USER_COLUMNS} FROM dim_users u
         WHERE u.department_id = ?1
            OR u.team_id IN (SELECT team_id FROM dim_teams WHERE department_id = ?1)
         ORDER BY u.seq"
    ))?;
    let rows = stmt.query_map(params![dept_id], user_from_row)?;
    rows.collect()
}

// ── Projects ───────────────────────────────────────────────────────

pub fn upsert_project(conn: &Connection, project: &ProjectInfo) -> Result<(), rusqlite::Error> {
    conn.execute(
        "INSERT INTO dim_projects (project_id, name, created_at, created_date_key, seq, cached_at)
         VALUES (?1, ?2, ?3, ?4,
                 (SELECT COALESCE(MAX(seq), 0) + 1 FROM dim_projects), datetime('now'))
         ON CONFLICT(project_id) DO UPDATE SET
            name=excluded.name, created_at=excluded.created_at,
            created_date_key=excluded.created_date_key, cached_at=excluded.cached_at",
        params![
            project.id,
            project.name,
            project.created_at,
            date_key(project.created_at.as_deref()),
        ],
    )?;
    Ok(())
}

pub fn replace_project_members(
    conn: &Connection,
    project_id: &str,
    member_ids: &[String],
) -> Result<(), rusqlite::Error> {
    conn.execute(
        "DELETE FROM bridge_project_members WHERE project_id = ?1",
        params![project_id],
    )?;
    let mut stmt = conn.prepare(
        "INSERT OR IGNORE INTO bridge_project_members (project_id, user_id) VALUES (?1, ?2)",
    )?;
    for user_id in member_ids {
        stmt.execute(params![project_id, user_id])?;
    }
    Ok(())
}

/// Projects the user is a member of or has tasks in, in import order. With a
/// bounded `range` a project qualifies when it was created inside it or holds
/// a task of the user's created inside it.
pub fn user_projects(
    conn: &Connection,
    user_id: &str,
    range: &DateRange,
) -> Result<Vec<ProjectInfo>, rusqlite::Error> {
    let (start, end) = range_bounds(range);
    let mut stmt = conn.prepare(
        "SELECT p.project_id, p.name, p.created_at FROM dim_projects p
         WHERE (
             EXISTS (SELECT 1 FROM bridge_project_members m
                     WHERE m.project_id = p.project_id AND m.user_id = ?1)
             OR EXISTS (SELECT 1 FROM fact_tasks t
                        WHERE t.project_id = p.project_id
                          AND (t.owner_id = ?1 OR EXISTS (
                              SELECT 1 FROM bridge_task_collaborators c
                              WHERE c.task_id = t.task_id AND c.user_id = ?1)))
         )
           AND (
             ((?2 IS NULL OR p.created_date_key >= ?2)
              AND (?3 IS NULL OR p.created_date_key <= ?3))
             OR EXISTS (SELECT 1 FROM fact_tasks t
                        WHERE t.project_id = p.project_id
                          AND (t.owner_id = ?1 OR EXISTS (
                              SELECT 1 FROM bridge_task_collaborators c
                              WHERE c.task_id = t.task_id AND c.user_id = ?1))
                          AND (?2 IS NULL OR t.created_date_key >= ?2)
                          AND (?3 IS NULL OR t.created_date_key <= ?3))
           )
         ORDER BY p.seq",
    )?;
    let rows = stmt.query_map(params![user_id, start, end], |row| {
        Ok(ProjectInfo {
            id: row.get(0)?,
            name: row.get(1)?,
            created_at: row.get(2)?,
        })
    })?;
    rows.collect()
}

// ── Tasks ──────────────────────────────────────────────────────────

pub fn upsert_task(conn: &Connection, task: &TaskRecord) -> Result<(), rusqlite::Error> {
    let owner_name = task.owner_name.as_deref().filter(|n| !n.trim().is_empty());
    conn.execute(
        "INSERT INTO fact_tasks (
            task_id, seq, name, status, priority, owner_id, owner_name, project_id,
            created_at, created_date_key, due_date, completed_at, cached_at
        ) VALUES (?1, (SELECT COALESCE(MAX(seq), 0) + 1 FROM fact_tasks),
                  ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, datetime('now'))
        ON CONFLICT(task_id) DO UPDATE SET
            name=excluded.name, status=excluded.status, priority=excluded.priority,
            owner_id=excluded.owner_id, owner_name=excluded.owner_name,
            project_id=excluded.project_id, created_at=excluded.created_at,
            created_date_key=excluded.created_date_key, due_date=excluded.due_date,
            completed_at=excluded.completed_at, cached_at=excluded.cached_at",
        params![
            task.id,
            task.name,
            task.status.as_str(),
            task.priority.as_str(),
            task.owner_id,
            owner_name,
            task.project_id,
            task.created_at,
            date_key(task.created_at.as_deref()),
            task.due_date,
            task.completed_at,
        ],
    )?;
    replace_task_collaborators(conn, task)
}

fn replace_task_collaborators(conn: &Connection, task: &TaskRecord) -> Result<(), rusqlite::Error> {
    conn.execute(
        "DELETE FROM bridge_task_collaborators WHERE task_id = ?1",
        params![task.id],
    )?;
    let mut stmt = conn.prepare(
        "INSERT OR IGNORE INTO bridge_task_collaborators (task_id, user_id, user_name, position)
         VALUES (?1, ?2, ?3, ?4)",
    )?;
    for (position, user_id) in task.collaborator_ids.iter().enumerate() {
        let name = task
            .collaborator_names
            .get(position)
            .map(String::as_str)
            .filter(|n| !n.trim().is_empty());
        stmt.execute(params![task.id, user_id, name, position as i64])?;
    }
    Ok(())
}

// ── Config ─────────────────────────────────────────────────────────

pub fn get_config(conn: &Connection, key: &str) -> Result<Option<String>, rusqlite::Error> {
    conn.query_row(
        "SELECT value FROM app_config WHERE key = ?1",
        params![key],
        |row| row.get(0),
    )
    .optional()
}

pub fn set_config(conn: &Connection, key: &str, value: &str) -> Result<(), rusqlite::Error> {
    conn.execute(
        "INSERT OR REPLACE INTO app_config (key, value, updated_at)
         VALUES (?1, ?2, datetime('now'))",
        params![key, value],
    )?;
    Ok(())
}

pub fn list_config(conn: &Connection) -> Result<Vec<(String, String)>, rusqlite::Error> {
    let mut stmt = conn.prepare("SELECT key, value FROM app_config ORDER BY key")?;
    let rows = stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?;
    rows.collect()
}

// ── Snapshots ──────────────────────────────────────────────────────

fn conversion_error(
    idx: usize,
    e: impl std::error::Error + Send + Sync + 'static,
) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e))
}

fn kind_at(row: &Row<'_>, idx: usize) -> Result<SnapshotKind, rusqlite::Error> {
    row.get::<_, String>(idx)?
        .parse()
        .map_err(|e| conversion_error(idx, e))
}

fn date_at(row: &Row<'_>, idx: usize) -> Result<NaiveDate, rusqlite::Error> {
    NaiveDate::parse_from_str(&row.get::<_, String>(idx)?, "%Y-%m-%d")
        .map_err(|e| conversion_error(idx, e))
}

pub fn insert_snapshot(conn: &Connection, snapshot: &ReportSnapshot) -> Result<i64, rusqlite::Error> {
    let payload = serde_json::to_string(&snapshot.payload)
        .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))?;
    conn.execute(
        "INSERT INTO report_snapshots (kind, subject_id, subject_name, report_date, payload, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, datetime('now'))",
        params![
            snapshot.kind.as_str(),
            snapshot.subject_id,
            snapshot.subject_name,
            format_date(snapshot.report_date),
            payload,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn get_snapshot(conn: &Connection, id: i64) -> Result<Option<ReportSnapshot>, rusqlite::Error> {
    conn.query_row(
        "SELECT kind, subject_id, subject_name, report_date, payload
         FROM report_snapshots WHERE snapshot_id = ?1",
        params![id],
        |row| {
            let payload: String = row.get(4)?;
            Ok(ReportSnapshot {
                kind: kind_at(row, 0)?,
                subject_id: row.get(1)?,
                subject_name: row.get(2)?,
                report_date: date_at(row, 3)?,
                payload: serde_json::from_str(&payload).map_err(|e| conversion_error(4, e))?,
            })
        },
    )
    .optional()
}

pub fn list_snapshots(
    conn: &Connection,
    kind: Option<SnapshotKind>,
) -> Result<Vec<SnapshotSummary>, rusqlite::Error> {
    let mut stmt = conn.prepare(
        "SELECT snapshot_id, kind, subject_id, subject_name, report_date, created_at
         FROM report_snapshots
         WHERE ?1 IS NULL OR kind = ?1
         ORDER BY snapshot_id DESC",
    )?;
    let rows = stmt.query_map(params![kind.map(|k| k.as_str())], |row| {
        Ok(SnapshotSummary {
            id: row.get(0)?,
            kind: kind_at(row, 1)?,
            subject_id: row.get(2)?,
            subject_name: row.get(3)?,
            report_date: date_at(row, 4)?,
            created_at: row.get(5)?,
        })
    })?;
    rows.collect()
}
