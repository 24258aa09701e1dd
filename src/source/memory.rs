use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use super::{DataSource, FetchError, FetchResult};
use crate::model::{DepartmentInfo, ProjectInfo, TaskRecord, TeamInfo, UserInfo};
use crate::query::DateRange;

/// A project together with its explicit member list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectEntry {
    #[serde(flatten)]
    pub info: ProjectInfo,
    #[serde(default)]
    pub member_ids: Vec<String>,
}

/// A self-contained snapshot of upstream data. This is also the JSON
/// format accepted by `taskreport import`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    #[serde(default)]
    pub departments: Vec<DepartmentInfo>,
    #[serde(default)]
    pub teams: Vec<TeamInfo>,
    #[serde(default)]
    pub users: Vec<UserInfo>,
    #[serde(default)]
    pub projects: Vec<ProjectEntry>,
    #[serde(default)]
    pub tasks: Vec<TaskRecord>,
}

impl Dataset {
    pub fn from_json(json: &str) -> crate::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// In-memory `DataSource` over a `Dataset`. Individual operations can be set
/// to fail for a given key to exercise degraded fetches.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    data: Dataset,
    failures: HashSet<(String, String)>,
}

impl MemorySource {
    pub fn new(data: Dataset) -> Self {
        Self {
            data,
            failures: HashSet::new(),
        }
    }

    /// Make `operation` (a `DataSource` method name) fail for `key`.
    pub fn failing(mut self, operation: &str, key: &str) -> Self {
        self.failures.insert((operation.to_string(), key.to_string()));
        self
    }

    pub fn dataset(&self) -> &Dataset {
        &self.data
    }

    fn check(&self, operation: &'static str, key: &str) -> FetchResult<()> {
        if self.failures.contains(&(operation.to_string(), key.to_string())) {
            Err(FetchError::new(operation, key, "upstream unavailable"))
        } else {
            Ok(())
        }
    }

    fn team_ids_in_department(&self, dept_id: &str) -> HashSet<&str> {
        self.data
            .teams
            .iter()
            .filter(|t| t.department_id.as_deref() == Some(dept_id))
            .map(|t| t.id.as_str())
            .collect()
    }
}

impl DataSource for MemorySource {
    fn get_user(&self, user_id: &str) -> FetchResult<Option<UserInfo>> {
        self.check("get_user", user_id)?;
        Ok(self.data.users.iter().find(|u| u.id == user_id).cloned())
    }

    fn get_user_tasks(&self, user_id: &str, range: &DateRange) -> FetchResult<Vec<TaskRecord>> {
        self.check("get_user_tasks", user_id)?;
        Ok(self
            .data
            .tasks
            .iter()
            .filter(|t| t.involves(user_id) && range.admits(t.created_at.as_deref()))
            .cloned()
            .collect())
    }

    fn get_user_projects(&self, user_id: &str, range: &DateRange) -> FetchResult<Vec<ProjectInfo>> {
        self.check("get_user_projects", user_id)?;
        let mut via_tasks: HashSet<&str> = HashSet::new();
        let mut active: HashSet<&str> = HashSet::new();
        for task in self.data.tasks.iter().filter(|t| t.involves(user_id)) {
            if let Some(pid) = task.project_id.as_deref() {
                via_tasks.insert(pid);
                if range.admits(task.created_at.as_deref()) {
                    active.insert(pid);
                }
            }
        }
        Ok(self
            .data
            .projects
            .iter()
            .filter(|p| {
                p.member_ids.iter().any(|m| m == user_id) || via_tasks.contains(p.info.id.as_str())
            })
            // Older projects still count while the user has work created in range.
            .filter(|p| {
                range.admits(p.info.created_at.as_deref()) || active.contains(p.info.id.as_str())
            })
            .map(|p| p.info.clone())
            .collect())
    }

    fn get_project_tasks(&self, project_id: &str) -> FetchResult<Vec<TaskRecord>> {
        self.check("get_project_tasks", project_id)?;
        Ok(self
            .data
            .tasks
            .iter()
            .filter(|t| t.project_id.as_deref() == Some(project_id))
            .cloned()
            .collect())
    }

    fn get_team_members(&self, team_id: &str) -> FetchResult<Vec<UserInfo>> {
        self.check("get_team_members", team_id)?;
        Ok(self
            .data
            .users
            .iter()
            .filter(|u| u.team_id.as_deref() == Some(team_id))
            .cloned()
            .collect())
    }

    fn get_department_members(&self, dept_id: &str) -> FetchResult<Vec<UserInfo>> {
        self.check("get_department_members", dept_id)?;
        let teams = self.team_ids_in_department(dept_id);
        Ok(self
            .data
            .users
            .iter()
            .filter(|u| {
                u.department_id.as_deref() == Some(dept_id)
                    || u.team_id.as_deref().is_some_and(|t| teams.contains(t))
            })
            .cloned()
            .collect())
    }

    fn get_team_info(&self, team_id: &str) -> FetchResult<Option<TeamInfo>> {
        self.check("get_team_info", team_id)?;
        Ok(self.data.teams.iter().find(|t| t.id == team_id).cloned())
    }

    fn get_department_info(&self, dept_id: &str) -> FetchResult<Option<DepartmentInfo>> {
        self.check("get_department_info", dept_id)?;
        Ok(self.data.departments.iter().find(|d| d.id == dept_id).cloned())
    }
}
