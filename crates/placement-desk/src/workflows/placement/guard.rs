use serde::Serialize;

use super::domain::{Application, CompanyId, Position, User, UserId, UserRole};
use super::lifecycle::ApplicationAction;

/// Authenticated caller, reduced to the fields access decisions need.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum Actor {
    Student { id: UserId },
    Staff { id: UserId, company_id: CompanyId },
    Employer { id: UserId, company_id: CompanyId },
}

impl Actor {
    pub fn id(&self) -> UserId {
        match *self {
            Actor::Student { id } | Actor::Staff { id, .. } | Actor::Employer { id, .. } => id,
        }
    }

    pub fn role_label(&self) -> &'static str {
        match self {
            Actor::Student { .. } => "student",
            Actor::Staff { .. } => "staff",
            Actor::Employer { .. } => "employer",
        }
    }

    /// Staff id to stamp on an application mutated by this actor.
    pub fn staff_id(&self) -> Option<UserId> {
        match *self {
            Actor::Staff { id, .. } => Some(id),
            _ => None,
        }
    }
}

impl From<&User> for Actor {
    fn from(user: &User) -> Self {
        match user.role {
            UserRole::Student(_) => Actor::Student { id: user.id },
            UserRole::Staff { company_id } => Actor::Staff {
                id: user.id,
                company_id,
            },
            UserRole::Employer { company_id } => Actor::Employer {
                id: user.id,
                company_id,
            },
        }
    }
}

/// Reason an actor was refused.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AccessDenied {
    #[error("{role} accounts cannot {operation}")]
    WrongRole {
        role: &'static str,
        operation: &'static str,
    },
    #[error("application belongs to another student")]
    NotOwnApplication,
    #[error("position belongs to another company")]
    OtherCompany,
    #[error("position was created by another employer")]
    NotPositionCreator,
    #[error("position is not open for applications")]
    PositionClosed,
}

/// Stateless access rules. The guard never touches storage.
#[derive(Debug, Clone, Copy, Default)]
pub struct AccessGuard;

impl AccessGuard {
    pub fn new() -> Self {
        Self
    }

    pub fn can_view_application(
        &self,
        actor: &Actor,
        application: &Application,
        position: &Position,
    ) -> Result<(), AccessDenied> {
        match *actor {
            Actor::Student { id } => owns(id, application),
            Actor::Staff { company_id, .. } => same_company(company_id, position),
            Actor::Employer { .. } => Err(AccessDenied::WrongRole {
                role: actor.role_label(),
                operation: "view applications",
            }),
        }
    }

    pub fn can_transition(
        &self,
        actor: &Actor,
        action: ApplicationAction,
        application: &Application,
        position: &Position,
    ) -> Result<(), AccessDenied> {
        match (action, *actor) {
            (ApplicationAction::Withdraw, Actor::Student { id }) => owns(id, application),
            (ApplicationAction::Withdraw, _) => Err(AccessDenied::WrongRole {
                role: actor.role_label(),
                operation: "withdraw applications",
            }),
            (_, Actor::Staff { company_id, .. }) => same_company(company_id, position),
            (_, _) => Err(AccessDenied::WrongRole {
                role: actor.role_label(),
                operation: action_operation(action),
            }),
        }
    }

    pub fn can_apply(&self, actor: &Actor, position: &Position) -> Result<(), AccessDenied> {
        if !matches!(actor, Actor::Student { .. }) {
            return Err(AccessDenied::WrongRole {
                role: actor.role_label(),
                operation: "apply to positions",
            });
        }
        if !position.is_open() {
            return Err(AccessDenied::PositionClosed);
        }
        Ok(())
    }

    /// Staff may put a student forward for a position of their own company.
    pub fn can_nominate(&self, actor: &Actor, position: &Position) -> Result<(), AccessDenied> {
        match *actor {
            Actor::Staff { company_id, .. } => same_company(company_id, position),
            _ => Err(AccessDenied::WrongRole {
                role: actor.role_label(),
                operation: "shortlist students",
            }),
        }
    }

    pub fn can_review_position(&self, actor: &Actor, position: &Position) -> Result<(), AccessDenied> {
        match *actor {
            Actor::Staff { company_id, .. } => same_company(company_id, position),
            _ => Err(AccessDenied::WrongRole {
                role: actor.role_label(),
                operation: "review position applications",
            }),
        }
    }

    pub fn can_create_position(&self, actor: &Actor) -> Result<CompanyId, AccessDenied> {
        match *actor {
            Actor::Employer { company_id, .. } => Ok(company_id),
            _ => Err(AccessDenied::WrongRole {
                role: actor.role_label(),
                operation: "create positions",
            }),
        }
    }

    pub fn can_list_own_positions(&self, actor: &Actor) -> Result<UserId, AccessDenied> {
        match *actor {
            Actor::Employer { id, .. } => Ok(id),
            _ => Err(AccessDenied::WrongRole {
                role: actor.role_label(),
                operation: "list employer positions",
            }),
        }
    }

    /// Edits and closures are limited to the exact creator, not the whole company.
    pub fn can_manage_position(&self, actor: &Actor, position: &Position) -> Result<(), AccessDenied> {
        match *actor {
            Actor::Employer { id, .. } if id == position.created_by => Ok(()),
            Actor::Employer { .. } => Err(AccessDenied::NotPositionCreator),
            _ => Err(AccessDenied::WrongRole {
                role: actor.role_label(),
                operation: "manage positions",
            }),
        }
    }
}

fn owns(student: UserId, application: &Application) -> Result<(), AccessDenied> {
    if application.student_id == student {
        Ok(())
    } else {
        Err(AccessDenied::NotOwnApplication)
    }
}

fn same_company(company_id: CompanyId, position: &Position) -> Result<(), AccessDenied> {
    if position.company_id == company_id {
        Ok(())
    } else {
        Err(AccessDenied::OtherCompany)
    }
}

fn action_operation(action: ApplicationAction) -> &'static str {
    match action {
        ApplicationAction::Shortlist => "shortlist applications",
        ApplicationAction::Accept => "accept applications",
        ApplicationAction::Reject => "reject applications",
        ApplicationAction::Withdraw => "withdraw applications",
    }
}
