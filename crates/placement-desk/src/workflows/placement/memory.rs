use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use chrono::Utc;

use super::domain::{
    Application, ApplicationId, ApplicationStatus, Company, CompanyId, NewApplication,
    NewPosition, Position, PositionId, PositionStatus, StudentProfile, User, UserId, UserRole,
};
use super::repository::{
    ApplicationFilter, CapacityClaim, PlacementRepository, PlacementTransaction, PositionFilter,
    RepositoryError,
};

#[derive(Debug, Default)]
struct Tables {
    companies: BTreeMap<CompanyId, Company>,
    users: BTreeMap<UserId, User>,
    positions: BTreeMap<PositionId, Position>,
    applications: BTreeMap<ApplicationId, Application>,
    last_company_id: u64,
    last_user_id: u64,
    last_position_id: u64,
    last_application_id: u64,
}

impl Tables {
    fn company_of(&self, position: PositionId) -> Option<CompanyId> {
        self.positions.get(&position).map(|p| p.company_id)
    }
}

/// Process-local store. A transaction holds the table lock until it is committed or dropped,
/// so concurrent accepts against the same position are applied one after the other.
#[derive(Debug, Default)]
pub struct InMemoryPlacementStore {
    tables: Mutex<Tables>,
}

impl InMemoryPlacementStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Tables>, RepositoryError> {
        self.tables
            .lock()
            .map_err(|_| RepositoryError::Unavailable("store mutex poisoned".to_string()))
    }

    pub fn add_company(
        &self,
        name: impl Into<String>,
        description: impl Into<String>,
    ) -> Result<Company, RepositoryError> {
        let mut tables = self.lock()?;
        tables.last_company_id += 1;
        let company = Company {
            id: CompanyId(tables.last_company_id),
            name: name.into(),
            description: description.into(),
        };
        tables.companies.insert(company.id, company.clone());
        Ok(company)
    }

    pub fn add_student(
        &self,
        username: impl Into<String>,
        profile: StudentProfile,
    ) -> Result<User, RepositoryError> {
        self.add_user(username.into(), UserRole::Student(profile))
    }

    pub fn add_staff(
        &self,
        username: impl Into<String>,
        company_id: CompanyId,
    ) -> Result<User, RepositoryError> {
        self.add_user(username.into(), UserRole::Staff { company_id })
    }

    pub fn add_employer(
        &self,
        username: impl Into<String>,
        company_id: CompanyId,
    ) -> Result<User, RepositoryError> {
        self.add_user(username.into(), UserRole::Employer { company_id })
    }

    fn add_user(&self, username: String, role: UserRole) -> Result<User, RepositoryError> {
        let mut tables = self.lock()?;
        if let UserRole::Staff { company_id } | UserRole::Employer { company_id } = role {
            if !tables.companies.contains_key(&company_id) {
                return Err(RepositoryError::NotFound);
            }
        }
        if tables.users.values().any(|user| user.username == username) {
            return Err(RepositoryError::Conflict);
        }

        tables.last_user_id += 1;
        let user = User {
            id: UserId(tables.last_user_id),
            username,
            role,
        };
        tables.users.insert(user.id, user.clone());
        Ok(user)
    }

    /// Remove a user record. Applications they last modified keep existing with the
    /// reference cleared.
    pub fn remove_user(&self, id: UserId) -> Result<User, RepositoryError> {
        let mut tables = self.lock()?;
        let removed = tables.users.remove(&id).ok_or(RepositoryError::NotFound)?;
        let now = Utc::now();
        for application in tables.applications.values_mut() {
            if application.last_modified_by == Some(id) {
                application.last_modified_by = None;
                application.updated_at = now;
            }
        }
        Ok(removed)
    }

    pub fn application_count(&self) -> Result<usize, RepositoryError> {
        Ok(self.lock()?.applications.len())
    }
}

impl PlacementRepository for InMemoryPlacementStore {
    type Transaction<'a> = MemoryTransaction<'a>;

    fn begin(&self) -> Result<Self::Transaction<'_>, RepositoryError> {
        let tables = self.lock()?;
        Ok(MemoryTransaction {
            last_position_id: tables.last_position_id,
            last_application_id: tables.last_application_id,
            tables,
            applications: BTreeMap::new(),
            positions: BTreeMap::new(),
        })
    }

    fn find_user(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        Ok(self.lock()?.users.get(&id).cloned())
    }

    fn find_position(&self, id: PositionId) -> Result<Option<Position>, RepositoryError> {
        Ok(self.lock()?.positions.get(&id).cloned())
    }

    fn find_application(&self, id: ApplicationId) -> Result<Option<Application>, RepositoryError> {
        Ok(self.lock()?.applications.get(&id).cloned())
    }

    fn applications(&self, filter: ApplicationFilter) -> Result<Vec<Application>, RepositoryError> {
        let tables = self.lock()?;
        Ok(tables
            .applications
            .values()
            .filter(|application| match filter {
                ApplicationFilter::Student(student) => application.student_id == student,
                ApplicationFilter::Position(position) => application.position_id == position,
                ApplicationFilter::Company(company) => {
                    tables.company_of(application.position_id) == Some(company)
                }
            })
            .cloned()
            .collect())
    }

    fn positions(&self, filter: PositionFilter) -> Result<Vec<Position>, RepositoryError> {
        let tables = self.lock()?;
        Ok(tables
            .positions
            .values()
            .filter(|position| match filter {
                PositionFilter::Open => position.status == PositionStatus::Open,
                PositionFilter::CreatedBy(employer) => position.created_by == employer,
            })
            .cloned()
            .collect())
    }
}

/// Staged writes layered over the locked tables.
pub struct MemoryTransaction<'a> {
    tables: MutexGuard<'a, Tables>,
    applications: BTreeMap<ApplicationId, Application>,
    positions: BTreeMap<PositionId, Position>,
    last_position_id: u64,
    last_application_id: u64,
}

impl PlacementTransaction for MemoryTransaction<'_> {
    fn application(&mut self, id: ApplicationId) -> Result<Option<Application>, RepositoryError> {
        Ok(self
            .applications
            .get(&id)
            .or_else(|| self.tables.applications.get(&id))
            .cloned())
    }

    fn application_for(
        &mut self,
        student: UserId,
        position: PositionId,
    ) -> Result<Option<Application>, RepositoryError> {
        let matches = |application: &&Application| {
            application.student_id == student && application.position_id == position
        };
        Ok(self
            .applications
            .values()
            .find(matches)
            .or_else(|| self.tables.applications.values().find(matches))
            .cloned())
    }

    fn position(&mut self, id: PositionId) -> Result<Option<Position>, RepositoryError> {
        Ok(self
            .positions
            .get(&id)
            .or_else(|| self.tables.positions.get(&id))
            .cloned())
    }

    fn user(&mut self, id: UserId) -> Result<Option<User>, RepositoryError> {
        Ok(self.tables.users.get(&id).cloned())
    }

    fn insert_application(&mut self, draft: NewApplication) -> Result<Application, RepositoryError> {
        if self
            .application_for(draft.student_id, draft.position_id)?
            .is_some()
        {
            return Err(RepositoryError::Conflict);
        }
        if !self.tables.users.contains_key(&draft.student_id) {
            return Err(RepositoryError::NotFound);
        }

        self.last_application_id += 1;
        let application = Application {
            id: ApplicationId(self.last_application_id),
            student_id: draft.student_id,
            position_id: draft.position_id,
            last_modified_by: draft.last_modified_by,
            status: ApplicationStatus::Pending,
            created_at: draft.created_at,
            updated_at: draft.created_at,
        };
        self.applications.insert(application.id, application.clone());
        Ok(application)
    }

    fn update_application(&mut self, application: &Application) -> Result<(), RepositoryError> {
        if self.application(application.id)?.is_none() {
            return Err(RepositoryError::NotFound);
        }
        self.applications.insert(application.id, application.clone());
        Ok(())
    }

    fn insert_position(&mut self, draft: NewPosition) -> Result<Position, RepositoryError> {
        self.last_position_id += 1;
        let position = Position {
            id: PositionId(self.last_position_id),
            title: draft.title,
            description: draft.description,
            remaining_count: draft.capacity,
            status: PositionStatus::Open,
            company_id: draft.company_id,
            created_by: draft.created_by,
        };
        self.positions.insert(position.id, position.clone());
        Ok(position)
    }

    fn update_position(&mut self, position: &Position) -> Result<(), RepositoryError> {
        if self.position(position.id)?.is_none() {
            return Err(RepositoryError::NotFound);
        }
        self.positions.insert(position.id, position.clone());
        Ok(())
    }

    fn take_capacity(&mut self, id: PositionId) -> Result<CapacityClaim, RepositoryError> {
        let mut position = self.position(id)?.ok_or(RepositoryError::NotFound)?;
        if position.remaining_count == 0 {
            return Ok(CapacityClaim::Exhausted);
        }
        position.remaining_count -= 1;
        let remaining = position.remaining_count;
        self.positions.insert(id, position);
        Ok(CapacityClaim::Taken { remaining })
    }

    fn commit(self) -> Result<(), RepositoryError> {
        let MemoryTransaction {
            mut tables,
            applications,
            positions,
            last_position_id,
            last_application_id,
        } = self;

        tables.applications.extend(applications);
        tables.positions.extend(positions);
        tables.last_position_id = last_position_id;
        tables.last_application_id = last_application_id;
        Ok(())
    }
}
