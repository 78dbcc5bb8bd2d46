use std::fmt;
use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tracing::{debug, info, warn};

use super::domain::{
    Application, ApplicationId, NewApplication, NewPosition, Position, PositionDraft,
    PositionEdit, PositionId, PositionStatus, User, UserId, UserRole,
};
use super::guard::{AccessDenied, AccessGuard, Actor};
use super::lifecycle::{self, ApplicationAction};
use super::policy::{CapacityPolicy, PlacementPolicy};
use super::repository::{
    ApplicationFilter, CapacityClaim, PlacementRepository, PlacementTransaction, PositionFilter,
    RepositoryError,
};

/// Service composing the access guard, lifecycle table, and repository.
///
/// Every mutating operation runs inside one repository transaction: the application and its
/// position are read, checked, written, and committed together. Any early return drops the
/// transaction, which discards whatever was staged.
pub struct PlacementService<R> {
    guard: AccessGuard,
    repository: Arc<R>,
    policy: PlacementPolicy,
}

impl<R> PlacementService<R>
where
    R: PlacementRepository + 'static,
{
    pub fn new(repository: Arc<R>, policy: PlacementPolicy) -> Self {
        Self {
            guard: AccessGuard::new(),
            repository,
            policy,
        }
    }

    pub fn policy(&self) -> PlacementPolicy {
        self.policy
    }

    /// Resolve a user id into the actor used for access decisions.
    pub fn identify(&self, user_id: UserId) -> Result<Actor, PlacementError> {
        let user = self
            .repository
            .find_user(user_id)?
            .ok_or_else(|| PlacementError::not_found(Entity::User, user_id.0))?;
        Ok(Actor::from(&user))
    }

    /// Student applies to an open position. No capacity is consumed until accept.
    pub fn apply(
        &self,
        actor: &Actor,
        position_id: PositionId,
    ) -> Result<Application, PlacementError> {
        let mut tx = self.repository.begin()?;
        resolve_user(&mut tx, actor.id())?;
        let position = tx
            .position(position_id)?
            .ok_or_else(|| PlacementError::not_found(Entity::Position, position_id.0))?;

        match self.guard.can_apply(actor, &position) {
            Ok(()) => {}
            Err(AccessDenied::PositionClosed) => {
                return Err(PlacementError::InvalidState {
                    position: position.id,
                    status: position.status,
                })
            }
            Err(denied) => return Err(self.forbidden(actor, denied)),
        }

        self.create_application(tx, actor.id(), &position, None)
    }

    /// Staff put a student forward for one of their company's positions.
    pub fn shortlist_student(
        &self,
        actor: &Actor,
        student_id: UserId,
        position_id: PositionId,
    ) -> Result<Application, PlacementError> {
        let mut tx = self.repository.begin()?;
        resolve_user(&mut tx, actor.id())?;
        let student = resolve_user(&mut tx, student_id)?;
        if !matches!(student.role, UserRole::Student(_)) {
            return Err(PlacementError::InvalidInput(format!(
                "user {} is a {}, not a student",
                student.id.0,
                student.role_label()
            )));
        }

        let position = tx
            .position(position_id)?
            .ok_or_else(|| PlacementError::not_found(Entity::Position, position_id.0))?;
        self.guard
            .can_nominate(actor, &position)
            .map_err(|denied| self.forbidden(actor, denied))?;
        if !position.is_open() {
            return Err(PlacementError::InvalidState {
                position: position.id,
                status: position.status,
            });
        }

        self.create_application(tx, student.id, &position, actor.staff_id())
    }

    fn create_application(
        &self,
        mut tx: R::Transaction<'_>,
        student_id: UserId,
        position: &Position,
        staff_id: Option<UserId>,
    ) -> Result<Application, PlacementError> {
        let conflict = PlacementError::Conflict {
            student: student_id,
            position: position.id,
        };
        if tx.application_for(student_id, position.id)?.is_some() {
            return Err(conflict);
        }

        let application = tx
            .insert_application(NewApplication {
                student_id,
                position_id: position.id,
                last_modified_by: staff_id,
                created_at: Utc::now(),
            })
            .map_err(|err| match err {
                RepositoryError::Conflict => conflict,
                RepositoryError::NotFound => PlacementError::not_found(Entity::User, student_id.0),
                other => PlacementError::Repository(other),
            })?;
        tx.commit()?;

        info!(
            application = application.id.0,
            student = student_id.0,
            position = position.id.0,
            "application created"
        );
        Ok(application)
    }

    pub fn shortlist(
        &self,
        actor: &Actor,
        application_id: ApplicationId,
    ) -> Result<Application, PlacementError> {
        self.perform(actor, application_id, ApplicationAction::Shortlist)
    }

    /// Accept an application, consuming one unit of the position's capacity.
    pub fn accept(
        &self,
        actor: &Actor,
        application_id: ApplicationId,
    ) -> Result<Application, PlacementError> {
        self.perform(actor, application_id, ApplicationAction::Accept)
    }

    pub fn reject(
        &self,
        actor: &Actor,
        application_id: ApplicationId,
    ) -> Result<Application, PlacementError> {
        self.perform(actor, application_id, ApplicationAction::Reject)
    }

    pub fn withdraw(
        &self,
        actor: &Actor,
        application_id: ApplicationId,
    ) -> Result<Application, PlacementError> {
        self.perform(actor, application_id, ApplicationAction::Withdraw)
    }

    /// Apply a lifecycle action after access, legality, and capacity checks.
    pub fn perform(
        &self,
        actor: &Actor,
        application_id: ApplicationId,
        action: ApplicationAction,
    ) -> Result<Application, PlacementError> {
        let mut tx = self.repository.begin()?;
        resolve_user(&mut tx, actor.id())?;
        let mut application = tx
            .application(application_id)?
            .ok_or_else(|| PlacementError::not_found(Entity::Application, application_id.0))?;
        let position_id = application.position_id;
        let position = tx
            .position(position_id)?
            .ok_or_else(|| PlacementError::not_found(Entity::Position, position_id.0))?;

        self.guard
            .can_transition(actor, action, &application, &position)
            .map_err(|denied| self.forbidden(actor, denied))?;

        if !lifecycle::is_available(application.status, action) {
            debug!(
                application = application.id.0,
                status = application.status.label(),
                %action,
                "transition not available"
            );
            return Err(PlacementError::InvalidTransition {
                action,
                current: Box::new(application),
            });
        }

        if action == ApplicationAction::Accept {
            self.claim_capacity(&mut tx, &position, &application)?;
        }

        let previous = application.status;
        application.status = lifecycle::transition(previous, action);
        application.updated_at = Utc::now();
        if let Some(staff_id) = actor.staff_id() {
            application.last_modified_by = Some(staff_id);
        }

        tx.update_application(&application)?;
        tx.commit()?;

        info!(
            application = application.id.0,
            actor = actor.id().0,
            from = previous.label(),
            to = application.status.label(),
            "application transitioned"
        );
        Ok(application)
    }

    fn claim_capacity(
        &self,
        tx: &mut R::Transaction<'_>,
        position: &Position,
        application: &Application,
    ) -> Result<(), PlacementError> {
        match tx.take_capacity(position.id)? {
            CapacityClaim::Taken { remaining } => {
                if remaining == 0 && self.policy.close_when_filled {
                    let mut filled = tx.position(position.id)?.ok_or_else(|| {
                        PlacementError::not_found(Entity::Position, position.id.0)
                    })?;
                    filled.status = PositionStatus::Closed;
                    tx.update_position(&filled)?;
                    info!(position = position.id.0, "position filled and closed");
                }
                Ok(())
            }
            CapacityClaim::Exhausted => match self.policy.capacity {
                CapacityPolicy::Strict => {
                    warn!(
                        application = application.id.0,
                        position = position.id.0,
                        "accept refused: no remaining capacity"
                    );
                    Err(PlacementError::CapacityExhausted {
                        position: position.id,
                        current: Box::new(application.clone()),
                    })
                }
                CapacityPolicy::Lenient => {
                    warn!(
                        application = application.id.0,
                        position = position.id.0,
                        "accepting without remaining capacity"
                    );
                    Ok(())
                }
            },
        }
    }

    pub fn get_application(
        &self,
        actor: &Actor,
        application_id: ApplicationId,
    ) -> Result<Application, PlacementError> {
        let application = self
            .repository
            .find_application(application_id)?
            .ok_or_else(|| PlacementError::not_found(Entity::Application, application_id.0))?;
        let position = self
            .repository
            .find_position(application.position_id)?
            .ok_or_else(|| {
                PlacementError::not_found(Entity::Position, application.position_id.0)
            })?;

        self.guard
            .can_view_application(actor, &application, &position)
            .map_err(|denied| self.forbidden(actor, denied))?;
        Ok(application)
    }

    /// Students see their own applications, staff see their company's.
    pub fn list_applications(&self, actor: &Actor) -> Result<Vec<Application>, PlacementError> {
        let filter = match *actor {
            Actor::Student { id } => ApplicationFilter::Student(id),
            Actor::Staff { company_id, .. } => ApplicationFilter::Company(company_id),
            Actor::Employer { .. } => {
                return Err(self.forbidden(
                    actor,
                    AccessDenied::WrongRole {
                        role: actor.role_label(),
                        operation: "list applications",
                    },
                ))
            }
        };
        Ok(self.repository.applications(filter)?)
    }

    pub fn list_applications_for_position(
        &self,
        actor: &Actor,
        position_id: PositionId,
    ) -> Result<Vec<Application>, PlacementError> {
        let position = self
            .repository
            .find_position(position_id)?
            .ok_or_else(|| PlacementError::not_found(Entity::Position, position_id.0))?;
        self.guard
            .can_review_position(actor, &position)
            .map_err(|denied| self.forbidden(actor, denied))?;
        Ok(self
            .repository
            .applications(ApplicationFilter::Position(position.id))?)
    }

    pub fn list_open_positions(&self) -> Result<Vec<Position>, PlacementError> {
        Ok(self.repository.positions(PositionFilter::Open)?)
    }

    pub fn list_positions_for_employer(
        &self,
        actor: &Actor,
    ) -> Result<Vec<Position>, PlacementError> {
        let employer = self
            .guard
            .can_list_own_positions(actor)
            .map_err(|denied| self.forbidden(actor, denied))?;
        Ok(self
            .repository
            .positions(PositionFilter::CreatedBy(employer))?)
    }

    pub fn create_position(
        &self,
        actor: &Actor,
        draft: PositionDraft,
    ) -> Result<Position, PlacementError> {
        let company_id = self
            .guard
            .can_create_position(actor)
            .map_err(|denied| self.forbidden(actor, denied))?;
        let title = required_title(&draft.title)?;

        let mut tx = self.repository.begin()?;
        let position = tx.insert_position(NewPosition {
            title,
            description: draft.description,
            capacity: draft.capacity,
            company_id,
            created_by: actor.id(),
        })?;
        tx.commit()?;

        info!(
            position = position.id.0,
            employer = actor.id().0,
            capacity = position.remaining_count,
            "position opened"
        );
        Ok(position)
    }

    /// Capacity edits share the transaction discipline of `accept`, so they cannot interleave.
    pub fn edit_position(
        &self,
        actor: &Actor,
        position_id: PositionId,
        edit: PositionEdit,
    ) -> Result<Position, PlacementError> {
        self.update_position(actor, position_id, |position| {
            if let Some(title) = edit.title {
                position.title = required_title(&title)?;
            }
            if let Some(description) = edit.description {
                position.description = description;
            }
            if let Some(remaining) = edit.remaining_count {
                position.remaining_count = remaining;
            }
            Ok(())
        })
    }

    pub fn close_position(
        &self,
        actor: &Actor,
        position_id: PositionId,
    ) -> Result<Position, PlacementError> {
        self.update_position(actor, position_id, |position| {
            position.status = PositionStatus::Closed;
            Ok(())
        })
    }

    pub fn reopen_position(
        &self,
        actor: &Actor,
        position_id: PositionId,
    ) -> Result<Position, PlacementError> {
        self.update_position(actor, position_id, |position| {
            position.status = PositionStatus::Open;
            Ok(())
        })
    }

    fn update_position<F>(
        &self,
        actor: &Actor,
        position_id: PositionId,
        change: F,
    ) -> Result<Position, PlacementError>
    where
        F: FnOnce(&mut Position) -> Result<(), PlacementError>,
    {
        let mut tx = self.repository.begin()?;
        let mut position = tx
            .position(position_id)?
            .ok_or_else(|| PlacementError::not_found(Entity::Position, position_id.0))?;
        self.guard
            .can_manage_position(actor, &position)
            .map_err(|denied| self.forbidden(actor, denied))?;

        change(&mut position)?;
        tx.update_position(&position)?;
        tx.commit()?;

        info!(
            position = position.id.0,
            status = position.status.label(),
            remaining = position.remaining_count,
            "position updated"
        );
        Ok(position)
    }

    fn forbidden(&self, actor: &Actor, denied: AccessDenied) -> PlacementError {
        warn!(actor = actor.id().0, role = actor.role_label(), reason = %denied, "access denied");
        PlacementError::Forbidden(denied)
    }
}

/// The acting or target user must still exist when the transaction runs, so a removed staff
/// member is never written into `last_modified_by`.
fn resolve_user<T>(tx: &mut T, id: UserId) -> Result<User, PlacementError>
where
    T: PlacementTransaction,
{
    tx.user(id)?.ok_or_else(|| PlacementError::not_found(Entity::User, id.0))
}

fn required_title(raw: &str) -> Result<String, PlacementError> {
    let title = raw.trim();
    if title.is_empty() {
        return Err(PlacementError::InvalidInput(
            "position title must not be empty".to_string(),
        ));
    }
    Ok(title.to_string())
}

/// Kind of record a `NotFound` refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Entity {
    User,
    Position,
    Application,
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Entity::User => write!(f, "user"),
            Entity::Position => write!(f, "position"),
            Entity::Application => write!(f, "application"),
        }
    }
}

/// Tag identifying the failure class, independent of the payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    NotFound,
    Forbidden,
    InvalidTransition,
    Conflict,
    CapacityExhausted,
    InvalidState,
    InvalidInput,
    Unavailable,
}

impl FailureKind {
    pub const fn label(self) -> &'static str {
        match self {
            FailureKind::NotFound => "not_found",
            FailureKind::Forbidden => "forbidden",
            FailureKind::InvalidTransition => "invalid_transition",
            FailureKind::Conflict => "conflict",
            FailureKind::CapacityExhausted => "capacity_exhausted",
            FailureKind::InvalidState => "invalid_state",
            FailureKind::InvalidInput => "invalid_input",
            FailureKind::Unavailable => "unavailable",
        }
    }
}

/// Error raised by the placement service.
#[derive(Debug, thiserror::Error)]
pub enum PlacementError {
    #[error("{entity} {id} not found")]
    NotFound { entity: Entity, id: u64 },
    #[error("forbidden: {0}")]
    Forbidden(AccessDenied),
    #[error("cannot {action} application in {} state", .current.status.label())]
    InvalidTransition {
        action: ApplicationAction,
        current: Box<Application>,
    },
    #[error("student {} already applied to position {}", .student.0, .position.0)]
    Conflict { student: UserId, position: PositionId },
    #[error("position {} has no remaining capacity", .position.0)]
    CapacityExhausted {
        position: PositionId,
        current: Box<Application>,
    },
    #[error("position {} is {}", .position.0, .status.label())]
    InvalidState {
        position: PositionId,
        status: PositionStatus,
    },
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl PlacementError {
    fn not_found(entity: Entity, id: u64) -> Self {
        Self::NotFound { entity, id }
    }

    pub fn kind(&self) -> FailureKind {
        match self {
            PlacementError::NotFound { .. } => FailureKind::NotFound,
            PlacementError::Forbidden(_) => FailureKind::Forbidden,
            PlacementError::InvalidTransition { .. } => FailureKind::InvalidTransition,
            PlacementError::Conflict { .. } => FailureKind::Conflict,
            PlacementError::CapacityExhausted { .. } => FailureKind::CapacityExhausted,
            PlacementError::InvalidState { .. } => FailureKind::InvalidState,
            PlacementError::InvalidInput(_) => FailureKind::InvalidInput,
            PlacementError::Repository(_) => FailureKind::Unavailable,
        }
    }

    /// Application as it stands after the failed request, when the failure carries one.
    pub fn current_application(&self) -> Option<&Application> {
        match self {
            PlacementError::InvalidTransition { current, .. }
            | PlacementError::CapacityExhausted { current, .. } => Some(current),
            _ => None,
        }
    }
}
