use metrics_exporter_prometheus::PrometheusHandle;
use placement_desk::workflows::placement::{
    Actor, Application, InMemoryPlacementStore, PlacementError, PlacementRepository,
    PlacementService, Position, PositionDraft, StudentProfile,
};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Handles to the records created by [`seed_directory`].
#[derive(Debug, Clone)]
pub(crate) struct SeededDirectory {
    pub(crate) student: Actor,
    pub(crate) employer: Actor,
    pub(crate) staff: Actor,
    pub(crate) positions: Vec<Position>,
    pub(crate) application: Application,
}

/// Populate an empty store with one company, a student, an employer, a staff member, two
/// six-seat positions, and a staff-created application for the first of them.
pub(crate) fn seed_directory<R>(
    store: &InMemoryPlacementStore,
    service: &PlacementService<R>,
) -> Result<SeededDirectory, PlacementError>
where
    R: PlacementRepository + 'static,
{
    let company = store.add_company("Default Company", "The default company for testing")?;
    let student = store.add_student("bob", StudentProfile::default())?;
    let employer = store.add_employer("frank", company.id)?;
    let staff = store.add_staff("john", company.id)?;

    let (student, employer, staff) = (
        Actor::from(&student),
        Actor::from(&employer),
        Actor::from(&staff),
    );

    let positions = ["Software Engineer", "Mechanical Engineer"]
        .into_iter()
        .map(|title| {
            service.create_position(
                &employer,
                PositionDraft {
                    title: title.to_string(),
                    description: None,
                    capacity: 6,
                },
            )
        })
        .collect::<Result<Vec<_>, _>>()?;

    let application = service.shortlist_student(&staff, student.id(), positions[0].id)?;

    Ok(SeededDirectory {
        student,
        employer,
        staff,
        positions,
        application,
    })
}
