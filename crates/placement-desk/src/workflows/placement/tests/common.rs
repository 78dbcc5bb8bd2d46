use std::sync::Arc;

use axum::response::Response;
use serde_json::Value;

use crate::workflows::placement::{
    placement_router, Actor, Application, ApplicationStatus, CapacityPolicy, CompanyId,
    InMemoryPlacementStore, PlacementPolicy, PlacementService, Position, PositionDraft,
    StudentProfile, User,
};

/// Seeded directory: one company with an employer and a staff member, a rival company with its
/// own staff member, and two students.
pub(super) struct Fixture {
    pub(super) store: Arc<InMemoryPlacementStore>,
    pub(super) service: PlacementService<InMemoryPlacementStore>,
    pub(super) company: CompanyId,
    pub(super) employer: Actor,
    pub(super) other_employer: Actor,
    pub(super) staff: Actor,
    pub(super) rival_staff: Actor,
    pub(super) student: Actor,
    pub(super) other_student: Actor,
}

impl Fixture {
    pub(super) fn new() -> Self {
        Self::with_policy(PlacementPolicy::default())
    }

    pub(super) fn lenient() -> Self {
        Self::with_policy(PlacementPolicy {
            capacity: CapacityPolicy::Lenient,
            close_when_filled: false,
        })
    }

    pub(super) fn with_policy(policy: PlacementPolicy) -> Self {
        let store = Arc::new(InMemoryPlacementStore::new());
        let company = store
            .add_company("Default Company", "The default company for testing")
            .expect("company");
        let rival = store.add_company("Rival", "Competing firm").expect("rival");

        let employer = store.add_employer("frank", company.id).expect("employer");
        let other_employer = store.add_employer("erin", company.id).expect("employer");
        let staff = store.add_staff("john", company.id).expect("staff");
        let rival_staff = store.add_staff("rita", rival.id).expect("rival staff");
        let student = store.add_student("bob", profile()).expect("student");
        let other_student = store
            .add_student("alice", StudentProfile::default())
            .expect("student");

        let service = PlacementService::new(store.clone(), policy);

        Self {
            store,
            service,
            company: company.id,
            employer: actor(&employer),
            other_employer: actor(&other_employer),
            staff: actor(&staff),
            rival_staff: actor(&rival_staff),
            student: actor(&student),
            other_student: actor(&other_student),
        }
    }

    pub(super) fn open_position(&self, capacity: u32) -> Position {
        self.service
            .create_position(
                &self.employer,
                PositionDraft {
                    title: "Software Engineer".to_string(),
                    description: Some("Backend internship".to_string()),
                    capacity,
                },
            )
            .expect("employer opens position")
    }

    pub(super) fn pending_application(&self, capacity: u32) -> (Position, Application) {
        let position = self.open_position(capacity);
        let application = self
            .service
            .apply(&self.student, position.id)
            .expect("student applies");
        assert_eq!(application.status, ApplicationStatus::Pending);
        (position, application)
    }

    pub(super) fn remaining(&self, position: &Position) -> u32 {
        use crate::workflows::placement::PlacementRepository;

        self.store
            .find_position(position.id)
            .expect("read position")
            .expect("position present")
            .remaining_count
    }

    pub(super) fn router(self) -> axum::Router {
        placement_router(Arc::new(self.service))
    }
}

fn profile() -> StudentProfile {
    StudentProfile {
        email: Some("bob@example.edu".to_string()),
        degree: Some("BSc Computer Science".to_string()),
        gpa: Some(3.6),
        resume: Some("https://example.edu/bob.pdf".to_string()),
    }
}

fn actor(user: &User) -> Actor {
    Actor::from(user)
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
