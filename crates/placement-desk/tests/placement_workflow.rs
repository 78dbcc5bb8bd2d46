use std::sync::{Arc, Barrier};
use std::thread;

use placement_desk::workflows::placement::{
    Actor, ApplicationStatus, CapacityPolicy, FailureKind, InMemoryPlacementStore,
    PlacementError, PlacementPolicy, PlacementRepository, PlacementService, PositionDraft,
    PositionId, StudentProfile,
};

struct Directory {
    store: Arc<InMemoryPlacementStore>,
    service: Arc<PlacementService<InMemoryPlacementStore>>,
    employer: Actor,
    staff: Actor,
    students: Vec<Actor>,
}

fn directory(policy: PlacementPolicy, students: usize) -> Directory {
    let store = Arc::new(InMemoryPlacementStore::new());
    let company = store
        .add_company("Default Company", "The default company for testing")
        .expect("company");
    let employer = store.add_employer("frank", company.id).expect("employer");
    let staff = store.add_staff("john", company.id).expect("staff");
    let students = (0..students)
        .map(|n| {
            let user = store
                .add_student(format!("student-{n}"), StudentProfile::default())
                .expect("student");
            Actor::from(&user)
        })
        .collect();

    Directory {
        service: Arc::new(PlacementService::new(store.clone(), policy)),
        store,
        employer: Actor::from(&employer),
        staff: Actor::from(&staff),
        students,
    }
}

fn open(directory: &Directory, capacity: u32) -> PositionId {
    directory
        .service
        .create_position(
            &directory.employer,
            PositionDraft {
                title: "Software Engineer".to_string(),
                description: None,
                capacity,
            },
        )
        .expect("position opens")
        .id
}

fn remaining(directory: &Directory, position: PositionId) -> u32 {
    directory
        .store
        .find_position(position)
        .expect("read")
        .expect("present")
        .remaining_count
}

#[test]
fn accepted_application_can_no_longer_be_withdrawn() {
    let directory = directory(PlacementPolicy::default(), 1);
    let student = directory.students[0];
    let position = open(&directory, 2);

    let application = directory
        .service
        .apply(&student, position)
        .expect("student applies");
    assert_eq!(application.status, ApplicationStatus::Pending);

    let application = directory
        .service
        .shortlist(&directory.staff, application.id)
        .expect("shortlist");
    assert_eq!(application.status, ApplicationStatus::Shortlisted);

    let application = directory
        .service
        .accept(&directory.staff, application.id)
        .expect("accept");
    assert_eq!(application.status, ApplicationStatus::Accepted);
    assert_eq!(remaining(&directory, position), 1);

    let err = directory
        .service
        .withdraw(&student, application.id)
        .expect_err("withdraw after accept");
    assert_eq!(err.kind(), FailureKind::InvalidTransition);
    assert_eq!(
        err.current_application().map(|app| app.status),
        Some(ApplicationStatus::Accepted)
    );
    assert_eq!(remaining(&directory, position), 1);
}

#[test]
fn concurrent_accepts_never_oversubscribe_a_position() {
    const CAPACITY: u32 = 3;
    const CONTENDERS: usize = 8;

    let directory = directory(PlacementPolicy::default(), CONTENDERS);
    let position = open(&directory, CAPACITY);
    let applications: Vec<_> = directory
        .students
        .iter()
        .map(|student| {
            directory
                .service
                .apply(student, position)
                .expect("apply")
                .id
        })
        .collect();

    let barrier = Arc::new(Barrier::new(CONTENDERS));
    let handles: Vec<_> = applications
        .into_iter()
        .map(|id| {
            let service = Arc::clone(&directory.service);
            let barrier = Arc::clone(&barrier);
            let staff = directory.staff;
            thread::spawn(move || {
                barrier.wait();
                service.accept(&staff, id)
            })
        })
        .collect();

    let outcomes: Vec<Result<_, PlacementError>> = handles
        .into_iter()
        .map(|handle| handle.join().expect("thread completes"))
        .collect();

    let accepted = outcomes.iter().filter(|outcome| outcome.is_ok()).count();
    let exhausted = outcomes
        .iter()
        .filter(|outcome| {
            matches!(outcome, Err(err) if err.kind() == FailureKind::CapacityExhausted)
        })
        .count();

    assert_eq!(accepted, CAPACITY as usize);
    assert_eq!(exhausted, CONTENDERS - CAPACITY as usize);
    assert_eq!(remaining(&directory, position), 0);

    let still_pending = directory
        .service
        .list_applications_for_position(&directory.staff, position)
        .expect("list")
        .into_iter()
        .filter(|app| app.status == ApplicationStatus::Pending)
        .count();
    assert_eq!(still_pending, CONTENDERS - CAPACITY as usize);
}

#[test]
fn lenient_concurrent_accepts_all_succeed_and_floor_at_zero() {
    const CONTENDERS: usize = 5;

    let policy = PlacementPolicy {
        capacity: CapacityPolicy::Lenient,
        close_when_filled: false,
    };
    let directory = directory(policy, CONTENDERS);
    let position = open(&directory, 2);
    let applications: Vec<_> = directory
        .students
        .iter()
        .map(|student| {
            directory
                .service
                .apply(student, position)
                .expect("apply")
                .id
        })
        .collect();

    let handles: Vec<_> = applications
        .into_iter()
        .map(|id| {
            let service = Arc::clone(&directory.service);
            let staff = directory.staff;
            thread::spawn(move || service.accept(&staff, id))
        })
        .collect();

    for handle in handles {
        let accepted = handle
            .join()
            .expect("thread completes")
            .expect("lenient accept succeeds");
        assert_eq!(accepted.status, ApplicationStatus::Accepted);
    }
    assert_eq!(remaining(&directory, position), 0);
}
