use crate::infra::seed_directory;
use clap::Args;
use placement_desk::error::AppError;
use placement_desk::workflows::placement::{
    Application, CapacityPolicy, InMemoryPlacementStore, PlacementError, PlacementPolicy,
    PlacementRepository, PlacementService, Position, PositionDraft, PositionId,
};
use std::sync::Arc;

#[derive(Args, Debug)]
pub(crate) struct DemoArgs {
    /// Number of seats on the demo position.
    #[arg(long, default_value_t = 2)]
    pub(crate) capacity: u32,
    /// Accept even when the position has no seats left.
    #[arg(long)]
    pub(crate) lenient: bool,
    /// Close the position once its last seat is taken.
    #[arg(long)]
    pub(crate) close_when_filled: bool,
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let policy = PlacementPolicy {
        capacity: if args.lenient {
            CapacityPolicy::Lenient
        } else {
            CapacityPolicy::Strict
        },
        close_when_filled: args.close_when_filled,
    };
    let store = Arc::new(InMemoryPlacementStore::new());
    let service = PlacementService::new(store.clone(), policy);
    let seeded = seed_directory(&store, &service)?;

    println!("Placement desk demo");
    println!(
        "  capacity policy: {}, close when filled: {}",
        policy.capacity.label(),
        policy.close_when_filled
    );
    println!("\nSeeded positions");
    for position in &seeded.positions {
        render_position(position);
    }
    render_application("Seeded application (created by staff)", &seeded.application);

    let position = service.create_position(
        &seeded.employer,
        PositionDraft {
            title: "Demo Placement".to_string(),
            description: Some("Created for the CLI walkthrough".to_string()),
            capacity: args.capacity,
        },
    )?;
    println!("\nEmployer opened a new position");
    render_position(&position);

    let application = service.apply(&seeded.student, position.id)?;
    render_application("Student applied", &application);

    let application = service.shortlist(&seeded.staff, application.id)?;
    render_application("Staff shortlisted", &application);

    match service.accept(&seeded.staff, application.id) {
        Ok(accepted) => {
            render_application("Staff accepted", &accepted);
            println!(
                "  remaining seats: {}",
                remaining_seats(&store, position.id)?
            );
        }
        Err(err @ PlacementError::CapacityExhausted { .. }) => {
            println!("\nAccept refused: {err}");
            return Ok(());
        }
        Err(err) => return Err(err.into()),
    }

    match service.withdraw(&seeded.student, application.id) {
        Ok(withdrawn) => render_application("Student withdrew", &withdrawn),
        Err(err) => {
            println!("\nWithdrawal refused: {err}");
            if let Some(current) = err.current_application() {
                println!("  application remains {}", current.status.label());
            }
        }
    }

    let rejected = service.reject(&seeded.staff, application.id)?;
    render_application("Staff rejected the accepted application", &rejected);
    println!(
        "  remaining seats: {} (rejecting does not return a seat)",
        remaining_seats(&store, position.id)?
    );

    Ok(())
}

fn remaining_seats(store: &InMemoryPlacementStore, id: PositionId) -> Result<u32, AppError> {
    Ok(store
        .find_position(id)?
        .map(|position| position.remaining_count)
        .unwrap_or_default())
}

fn render_position(position: &Position) {
    println!(
        "  #{} {} [{}] seats left: {}",
        position.id.0,
        position.title,
        position.status.label(),
        position.remaining_count
    );
}

fn render_application(heading: &str, application: &Application) {
    let view = application.view();
    println!("\n{heading}");
    println!(
        "  application #{} student #{} position #{}",
        view.id.0, view.student_id.0, view.position_id.0
    );
    println!("  status: {}", view.status);
    match view.last_modified_by {
        Some(staff) => println!("  last modified by staff #{}", staff.0),
        None => println!("  last modified by: nobody yet"),
    }
    if view.available_actions.is_empty() {
        println!("  available actions: none");
    } else {
        println!("  available actions: {}", view.available_actions.join(", "));
    }
}
