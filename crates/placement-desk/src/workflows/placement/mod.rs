//! Placement desk workflow: students apply to positions opened by employers, and staff of the
//! employer's company shortlist, accept, or reject those applications.
//!
//! The lifecycle table is pure and total; the service is the single place that decides whether
//! a requested action is legal, who may ask for it, and how it affects position capacity.

pub mod domain;
pub mod guard;
pub mod lifecycle;
pub mod memory;
pub mod policy;
pub mod repository;
pub mod router;
pub mod service;

#[cfg(test)]
mod tests;

pub use domain::{
    Application, ApplicationId, ApplicationStatus, ApplicationView, Company, CompanyId,
    Position, PositionDraft, PositionEdit, PositionId, PositionStatus, PositionView,
    StudentProfile, User, UserId, UserRole,
};
pub use guard::{AccessDenied, AccessGuard, Actor};
pub use lifecycle::{available_actions, transition, ApplicationAction};
pub use memory::InMemoryPlacementStore;
pub use policy::{CapacityPolicy, PlacementPolicy};
pub use repository::{
    ApplicationFilter, CapacityClaim, PlacementRepository, PlacementTransaction, PositionFilter,
    RepositoryError,
};
pub use router::{placement_router, USER_HEADER};
pub use service::{Entity, FailureKind, PlacementError, PlacementService};
