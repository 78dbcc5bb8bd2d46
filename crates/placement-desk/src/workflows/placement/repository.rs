use super::domain::{
    Application, ApplicationId, CompanyId, NewApplication, NewPosition, Position, PositionId,
    User, UserId,
};

/// Role-scoped selection of applications.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplicationFilter {
    Student(UserId),
    Company(CompanyId),
    Position(PositionId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PositionFilter {
    Open,
    CreatedBy(UserId),
}

/// Outcome of a conditional capacity decrement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CapacityClaim {
    Taken { remaining: u32 },
    Exhausted,
}

/// Storage abstraction so the service module can be exercised in isolation.
///
/// Reads on the repository itself see committed state only. Mutations go through a
/// [`PlacementTransaction`] obtained from [`PlacementRepository::begin`].
pub trait PlacementRepository: Send + Sync {
    type Transaction<'a>: PlacementTransaction
    where
        Self: 'a;

    fn begin(&self) -> Result<Self::Transaction<'_>, RepositoryError>;

    fn find_user(&self, id: UserId) -> Result<Option<User>, RepositoryError>;
    fn find_position(&self, id: PositionId) -> Result<Option<Position>, RepositoryError>;
    fn find_application(&self, id: ApplicationId) -> Result<Option<Application>, RepositoryError>;
    fn applications(&self, filter: ApplicationFilter) -> Result<Vec<Application>, RepositoryError>;
    fn positions(&self, filter: PositionFilter) -> Result<Vec<Position>, RepositoryError>;
}

/// Unit of work over applications and positions.
///
/// Nothing written through a transaction is visible until `commit` succeeds; dropping the
/// transaction discards every staged write. Implementations must serialise transactions that
/// touch the same position, either by locking it for the transaction's lifetime or by making
/// `take_capacity` an atomic conditional update.
pub trait PlacementTransaction {
    fn application(&mut self, id: ApplicationId) -> Result<Option<Application>, RepositoryError>;
    fn application_for(
        &mut self,
        student: UserId,
        position: PositionId,
    ) -> Result<Option<Application>, RepositoryError>;
    fn position(&mut self, id: PositionId) -> Result<Option<Position>, RepositoryError>;
    fn user(&mut self, id: UserId) -> Result<Option<User>, RepositoryError>;

    /// Fails with [`RepositoryError::Conflict`] when the (student, position) pair exists.
    fn insert_application(&mut self, draft: NewApplication) -> Result<Application, RepositoryError>;
    fn update_application(&mut self, application: &Application) -> Result<(), RepositoryError>;

    fn insert_position(&mut self, draft: NewPosition) -> Result<Position, RepositoryError>;
    fn update_position(&mut self, position: &Position) -> Result<(), RepositoryError>;

    /// Decrement `remaining_count` only when it is above zero.
    fn take_capacity(&mut self, id: PositionId) -> Result<CapacityClaim, RepositoryError>;

    fn commit(self) -> Result<(), RepositoryError>
    where
        Self: Sized;
}

/// Error enumeration for repository failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}
