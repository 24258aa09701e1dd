//! The data the engine reads, and the single place where failed reads are
//! turned into empty data.

pub mod memory;

use std::collections::HashMap;

use thiserror::Error;

use crate::model::{DepartmentInfo, ProjectInfo, TaskRecord, TeamInfo, UserInfo};
use crate::query::DateRange;

pub use memory::{Dataset, MemorySource, ProjectEntry};

/// An upstream read that did not produce data.
#[derive(Debug, Clone, Error)]
#[error("{operation}({key}) failed: {message}")]
pub struct FetchError {
    pub operation: &'static str,
    pub key: String,
    pub message: String,
}

impl FetchError {
    pub fn new(operation: &'static str, key: &str, message: impl Into<String>) -> Self {
        Self {
            operation,
            key: key.to_string(),
            message: message.into(),
        }
    }
}

pub type FetchResult<T> = std::result::Result<T, FetchError>;

/// Read access to users, tasks, projects and org structure.
///
/// Implementations report transport or lookup failures as `FetchError`;
/// they never decide what the engine does about them.
pub trait DataSource {
    fn get_user(&self, user_id: &str) -> FetchResult<Option<UserInfo>>;

    /// Tasks the user owns or collaborates on, created within `range`.
    fn get_user_tasks(&self, user_id: &str, range: &DateRange) -> FetchResult<Vec<TaskRecord>>;

    /// Projects the user belongs to, created within `range`.
    fn get_user_projects(&self, user_id: &str, range: &DateRange) -> FetchResult<Vec<ProjectInfo>>;

    /// Every task of the project, in source order.
    fn get_project_tasks(&self, project_id: &str) -> FetchResult<Vec<TaskRecord>>;

    fn get_team_members(&self, team_id: &str) -> FetchResult<Vec<UserInfo>>;

    fn get_department_members(&self, dept_id: &str) -> FetchResult<Vec<UserInfo>>;

    fn get_team_info(&self, team_id: &str) -> FetchResult<Option<TeamInfo>>;

    fn get_department_info(&self, dept_id: &str) -> FetchResult<Option<DepartmentInfo>>;
}

/// Applies the engine's one degradation policy to a `DataSource`: a failed
/// fetch is logged and replaced by "no data for that unit".
#[derive(Clone, Copy)]
pub struct Degrading<'a> {
    source: &'a dyn DataSource,
}

impl<'a> Degrading<'a> {
    pub fn new(source: &'a dyn DataSource) -> Self {
        Self { source }
    }

    fn absorb<T: Default>(result: FetchResult<T>) -> T {
        match result {
            Ok(value) => value,
            Err(e) => {
                log::warn!("Degraded fetch, continuing with empty data: {e}");
                T::default()
            }
        }
    }

    pub fn user(&self, user_id: &str) -> Option<UserInfo> {
        Self::absorb(self.source.get_user(user_id))
    }

    pub fn user_tasks(&self, user_id: &str, range: &DateRange) -> Vec<TaskRecord> {
        Self::absorb(self.source.get_user_tasks(user_id, range))
    }

    pub fn user_projects(&self, user_id: &str, range: &DateRange) -> Vec<ProjectInfo> {
        Self::absorb(self.source.get_user_projects(user_id, range))
    }

    pub fn project_tasks(&self, project_id: &str) -> Vec<TaskRecord> {
        Self::absorb(self.source.get_project_tasks(project_id))
    }

    pub fn team_members(&self, team_id: &str) -> Vec<UserInfo> {
        Self::absorb(self.source.get_team_members(team_id))
    }

    pub fn department_members(&self, dept_id: &str) -> Vec<UserInfo> {
        Self::absorb(self.source.get_department_members(dept_id))
    }

    pub fn team_info(&self, team_id: &str) -> Option<TeamInfo> {
        Self::absorb(self.source.get_team_info(team_id))
    }

    pub fn department_info(&self, dept_id: &str) -> Option<DepartmentInfo> {
        Self::absorb(self.source.get_department_info(dept_id))
    }
}

/// Display-name lookups memoized for the lifetime of one report request.
#[derive(Debug, Default)]
pub struct NameCache {
    users: HashMap<String, String>,
    projects: HashMap<String, String>,
    teams: HashMap<String, String>,
}

impl NameCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn remember_user(&mut self, user: &UserInfo) {
        if !user.name.trim().is_empty() {
            self.users.insert(user.id.clone(), user.name.clone());
        }
    }

    pub fn remember_project(&mut self, project: &ProjectInfo) {
        self.projects.insert(project.id.clone(), project.name.clone());
    }

    /// Directory name for a user, or `User {id}` when the lookup fails.
    /// Misses are cached too, so a broken directory is asked once per id.
    pub fn user_name(&mut self, fetch: &Degrading<'_>, user_id: &str) -> String {
        if let Some(name) = self.users.get(user_id) {
            return name.clone();
        }
        let name = fetch
            .user(user_id)
            .map(|u| u.name)
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| format!("User {user_id}"));
        self.users.insert(user_id.to_string(), name.clone());
        name
    }

    pub fn project_name(&self, project_id: &str) -> String {
        self.projects
            .get(project_id)
            .cloned()
            .unwrap_or_else(|| format!("Project {project_id}"))
    }

    pub fn team_name(&mut self, fetch: &Degrading<'_>, team_id: &str) -> String {
        if let Some(name) = self.teams.get(team_id) {
            return name.clone();
        }
        let name = fetch
            .team_info(team_id)
            .map(|t| t.name)
            .unwrap_or_else(|| format!("Team {team_id}"));
        self.teams.insert(team_id.to_string(), name.clone());
        name
    }
}
