//! Input records as delivered by the upstream task, project and directory
//! services. Status, priority and role arrive either as display strings or
//! as small integers; both encodings normalize to the closed enums here.

use serde::{Deserialize, Serialize, Serializer};

/// A status/priority/role value in whatever encoding the upstream used.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawCode {
    Int(i64),
    Float(f64),
    Text(String),
    Missing,
}

fn normalize_label(s: &str) -> String {
    s.trim()
        .to_lowercase()
        .replace(['_', '-'], " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Deserialize)]
#[serde(from = "RawCode")]
pub enum TaskStatus {
    #[default]
    Unassigned,
    Ongoing,
    UnderReview,
    Completed,
}

impl TaskStatus {
    pub const ALL: [TaskStatus; 4] = [
        TaskStatus::Unassigned,
        TaskStatus::Ongoing,
        TaskStatus::UnderReview,
        TaskStatus::Completed,
    ];

    /// Normalize a string or integer status code. Unrecognized values map to
    /// `Unassigned`.
    pub fn normalize(raw: &RawCode) -> Self {
        match raw {
            RawCode::Int(n) => Self::from_code(*n),
            RawCode::Float(f) if f.fract() == 0.0 => Self::from_code(*f as i64),
            RawCode::Text(s) => match normalize_label(s).as_str() {
                "ongoing" | "in progress" => TaskStatus::Ongoing,
                "under review" | "review" => TaskStatus::UnderReview,
                "completed" | "complete" | "done" => TaskStatus::Completed,
                other => match other.parse::<i64>() {
                    Ok(n) => Self::from_code(n),
                    Err(_) => TaskStatus::Unassigned,
                },
            },
            _ => TaskStatus::Unassigned,
        }
    }

    fn from_code(n: i64) -> Self {
        match n {
            2 => TaskStatus::Ongoing,
            3 => TaskStatus::UnderReview,
            4 => TaskStatus::Completed,
            _ => TaskStatus::Unassigned,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Unassigned => "Unassigned",
            TaskStatus::Ongoing => "Ongoing",
            TaskStatus::UnderReview => "Under Review",
            TaskStatus::Completed => "Completed",
        }
    }

    pub fn is_completed(&self) -> bool {
        *self == TaskStatus::Completed
    }
}

impl From<RawCode> for TaskStatus {
    fn from(raw: RawCode) -> Self {
        TaskStatus::normalize(&raw)
    }
}

impl Serialize for TaskStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Deserialize)]
#[serde(from = "RawCode")]
pub enum Priority {
    #[default]
    Normal,
    Medium,
    High,
}

impl Priority {
    /// Integer codes are ascending (1 = Normal, 2 = Medium, 3 = High).
    /// Missing or unknown values, including "Low", map to `Normal`.
    pub fn normalize(raw: &RawCode) -> Self {
        match raw {
            RawCode::Int(n) => Self::from_code(*n),
            RawCode::Float(f) if f.fract() == 0.0 => Self::from_code(*f as i64),
            RawCode::Text(s) => match normalize_label(s).as_str() {
                "high" | "urgent" => Priority::High,
                "medium" => Priority::Medium,
                other => match other.parse::<i64>() {
                    Ok(n) => Self::from_code(n),
                    Err(_) => Priority::Normal,
                },
            },
            _ => Priority::Normal,
        }
    }

    fn from_code(n: i64) -> Self {
        match n {
            3 => Priority::High,
            2 => Priority::Medium,
            _ => Priority::Normal,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::High => "High",
            Priority::Medium => "Medium",
            Priority::Normal => "Normal",
        }
    }
}

impl From<RawCode> for Priority {
    fn from(raw: RawCode) -> Self {
        Priority::normalize(&raw)
    }
}

impl Serialize for Priority {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Organisational role of a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(from = "RawCode")]
pub enum Role {
    Staff,
    Manager,
    Director,
    #[default]
    Unknown,
}

impl Role {
    /// 1 = staff, 2 = manager, 3 = director, or the role name in any case.
    pub fn normalize(raw: &RawCode) -> Self {
        match raw {
            RawCode::Int(n) => Self::from_code(*n),
            RawCode::Float(f) if f.fract() == 0.0 => Self::from_code(*f as i64),
            RawCode::Text(s) => match normalize_label(s).as_str() {
                "staff" => Role::Staff,
                "manager" => Role::Manager,
                "director" => Role::Director,
                other => match other.parse::<i64>() {
                    Ok(n) => Self::from_code(n),
                    Err(_) => Role::Unknown,
                },
            },
            _ => Role::Unknown,
        }
    }

    fn from_code(n: i64) -> Self {
        match n {
            1 => Role::Staff,
            2 => Role::Manager,
            3 => Role::Director,
            _ => Role::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Staff => "staff",
            Role::Manager => "manager",
            Role::Director => "director",
            Role::Unknown => "Unknown",
        }
    }
}

impl From<RawCode> for Role {
    fn from(raw: RawCode) -> Self {
        Role::normalize(&raw)
    }
}

impl Serialize for Role {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A task as returned by the task service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskRecord {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub status: TaskStatus,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub owner_id: Option<String>,
    #[serde(default)]
    pub owner_name: Option<String>,
    #[serde(default)]
    pub collaborator_ids: Vec<String>,
    #[serde(default)]
    pub collaborator_names: Vec<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub due_date: Option<String>,
    #[serde(default)]
    pub completed_at: Option<String>,
    #[serde(default)]
    pub project_id: Option<String>,
}

impl TaskRecord {
    pub fn new(id: &str, name: &str, status: TaskStatus) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            status,
            priority: Priority::Normal,
            owner_id: None,
            owner_name: None,
            collaborator_ids: Vec::new(),
            collaborator_names: Vec::new(),
            created_at: None,
            due_date: None,
            completed_at: None,
            project_id: None,
        }
    }

    pub fn project(mut self, project_id: &str) -> Self {
        self.project_id = Some(project_id.to_string());
        self
    }

    pub fn owner(mut self, user_id: &str) -> Self {
        self.owner_id = Some(user_id.to_string());
        self
    }

    pub fn collaborator(mut self, user_id: &str) -> Self {
        self.collaborator_ids.push(user_id.to_string());
        self
    }

    pub fn priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn created(mut self, ts: &str) -> Self {
        self.created_at = Some(ts.to_string());
        self
    }

    pub fn due(mut self, ts: &str) -> Self {
        self.due_date = Some(ts.to_string());
        self
    }

    pub fn completed(mut self, ts: &str) -> Self {
        self.completed_at = Some(ts.to_string());
        self
    }

    /// True if `user_id` owns or collaborates on this task.
    pub fn involves(&self, user_id: &str) -> bool {
        self.owner_id.as_deref() == Some(user_id)
            || self.collaborator_ids.iter().any(|c| c == user_id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserInfo {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub role: Role,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub team_id: Option<String>,
    #[serde(default)]
    pub department_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectInfo {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamInfo {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub manager_id: Option<String>,
    #[serde(default)]
    pub department_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DepartmentInfo {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub director_id: Option<String>,
}
