use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Identity shared by every user record, whatever role it carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UserId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CompanyId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PositionId(pub u64);

/// Identifier wrapper for submitted applications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ApplicationId(pub u64);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Company {
    pub id: CompanyId,
    pub name: String,
    pub description: String,
}

/// Student-only profile fields. None of them take part in access decisions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StudentProfile {
    pub email: Option<String>,
    pub degree: Option<String>,
    pub gpa: Option<f32>,
    pub resume: Option<String>,
}

/// Role-specific half of a user record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum UserRole {
    Student(StudentProfile),
    Staff { company_id: CompanyId },
    Employer { company_id: CompanyId },
}

/// Passive identity record as exposed by the user directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    #[serde(flatten)]
    pub role: UserRole,
}

impl User {
    pub fn role_label(&self) -> &'static str {
        match self.role {
            UserRole::Student(_) => "student",
            UserRole::Staff { .. } => "staff",
            UserRole::Employer { .. } => "employer",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PositionStatus {
    Open,
    Closed,
}

impl PositionStatus {
    pub const fn label(self) -> &'static str {
        match self {
            PositionStatus::Open => "open",
            PositionStatus::Closed => "closed",
        }
    }
}

/// A job opening owned by the employer that created it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub id: PositionId,
    pub title: String,
    pub description: Option<String>,
    pub remaining_count: u32,
    pub status: PositionStatus,
    pub company_id: CompanyId,
    pub created_by: UserId,
}

impl Position {
    pub fn is_open(&self) -> bool {
        self.status == PositionStatus::Open
    }

    pub fn view(&self) -> PositionView {
        PositionView {
            id: self.id,
            title: self.title.clone(),
            description: self.description.clone(),
            remaining_count: self.remaining_count,
            status: self.status.label(),
            company_id: self.company_id,
            created_by: self.created_by,
        }
    }
}

/// Employer-supplied fields for a new opening.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionDraft {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub capacity: u32,
}

/// Partial update applied by the owning employer. Absent fields are left alone.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionEdit {
    #[serde(default)]
    pub title: Option<String>,
    /// `Some(None)` clears the description; an explicit JSON `null` maps to it.
    #[serde(
        default,
        deserialize_with = "present_or_null",
        skip_serializing_if = "Option::is_none"
    )]
    pub description: Option<Option<String>>,
    #[serde(default)]
    pub remaining_count: Option<u32>,
}

fn present_or_null<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Status tracked throughout the application lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationStatus {
    Pending,
    Shortlisted,
    Accepted,
    Rejected,
    Withdrawn,
}

impl ApplicationStatus {
    pub const ALL: [ApplicationStatus; 5] = [
        ApplicationStatus::Pending,
        ApplicationStatus::Shortlisted,
        ApplicationStatus::Accepted,
        ApplicationStatus::Rejected,
        ApplicationStatus::Withdrawn,
    ];

    pub const fn label(self) -> &'static str {
        match self {
            ApplicationStatus::Pending => "pending",
            ApplicationStatus::Shortlisted => "shortlisted",
            ApplicationStatus::Accepted => "accepted",
            ApplicationStatus::Rejected => "rejected",
            ApplicationStatus::Withdrawn => "withdrawn",
        }
    }
}

/// A student's application against a single position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Application {
    pub id: ApplicationId,
    pub student_id: UserId,
    pub position_id: PositionId,
    pub last_modified_by: Option<UserId>,
    pub status: ApplicationStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Application {
    pub fn view(&self) -> ApplicationView {
        ApplicationView {
            id: self.id,
            student_id: self.student_id,
            position_id: self.position_id,
            last_modified_by: self.last_modified_by,
            status: self.status.label(),
            available_actions: super::lifecycle::available_actions(self.status)
                .iter()
                .map(|action| action.label())
                .collect(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// Fields for an application that has not been assigned an id yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewApplication {
    pub student_id: UserId,
    pub position_id: PositionId,
    pub last_modified_by: Option<UserId>,
    pub created_at: DateTime<Utc>,
}

/// Fields for a position that has not been assigned an id yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPosition {
    pub title: String,
    pub description: Option<String>,
    pub capacity: u32,
    pub company_id: CompanyId,
    pub created_by: UserId,
}

/// Serialized application payload. `available_actions` is derived on every read.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApplicationView {
    pub id: ApplicationId,
    pub student_id: UserId,
    pub position_id: PositionId,
    pub last_modified_by: Option<UserId>,
    pub status: &'static str,
    pub available_actions: Vec<&'static str>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PositionView {
    pub id: PositionId,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub remaining_count: u32,
    pub status: &'static str,
    pub company_id: CompanyId,
    pub created_by: UserId,
}
