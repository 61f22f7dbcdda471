//! CLI Command Implementations
//!
//! Demo commands over an in-memory session and the mock engine. They exist
//! to poke the core from a terminal; the real engine and UI live elsewhere.

use std::sync::{Arc, Mutex};

use log::info;

use crate::engine::{MockEngine, RecordingOutcome};
use crate::error::Result;
use crate::schedule::build_schedule;
use crate::session::{RegionSpec, SessionRepository};
use crate::transport::TransportController;

/// Build the demo session used by the CLI: a loop on track 1, a one-shot on
/// track 2, and a placeholder region that the schedule filters out.
fn demo_repository() -> SessionRepository {
    let mut repo = SessionRepository::new();
    let t1 = repo.current_session().tracks[0].id;
    let t2 = repo.current_session().tracks[1].id;

    repo.add_region(
        t1,
        RegionSpec::file("file://loops/drums.wav").spanning(0.0, 8.0),
    );
    repo.add_region(
        t2,
        RegionSpec::file("file://loops/bass.wav").spanning(4.0, 12.0),
    );
    // No file yet: stays out of the schedule
    repo.add_region(t2, RegionSpec::default().spanning(12.0, 20.0));

    repo
}

/// Print the schedule built from the demo session.
pub fn schedule(json: bool) -> Result<()> {
    let repo = demo_repository();
    let schedule = build_schedule(repo.current_session());

    info!("Built schedule with {} instruction(s)", schedule.len());

    if json {
        println!("{}", serde_json::to_string_pretty(&schedule).expect("schedule serializes"));
        return Ok(());
    }

    println!("{:<38} {:>8} {:>8} {:>7} {:>6}", "file", "start", "end", "offset", "vol");
    println!("{:-<70}", "");
    for entry in &schedule {
        println!(
            "{:<38} {:>8.2} {:>8.2} {:>7.2} {:>6.2}",
            entry.file_uri, entry.start_time, entry.end_time, entry.offset, entry.mix.volume
        );
    }
    Ok(())
}

/// Run a record start/stop pass against the mock engine and print the
/// resulting region.
pub async fn record_demo(duration: f64, bpm: f64) -> Result<()> {
    let repository = Arc::new(Mutex::new(demo_repository()));
    {
        let mut repo = repository.lock().unwrap();
        repo.set_bpm(bpm);
        repo.set_playhead(2.0);
    }

    let engine = Arc::new(MockEngine::new());
    engine.set_recording_outcome(RecordingOutcome {
        duration,
        file_uri: Some("file://recordings/take-1.wav".to_owned()),
    });

    let controller = Arc::new(TransportController::new(
        Arc::clone(&repository),
        engine.clone(),
    ));
    let events =
        TransportController::spawn_event_loop(Arc::clone(&controller), engine.events.subscribe());

    let region_id = controller.record_start().await?;
    println!("Recording started: {}", controller.transport_state());

    // The engine would tick the playhead during capture
    for step in 0..4 {
        engine.emit_playhead(2.0 + duration * (step as f64 + 1.0) / 4.0);
    }
    tokio::task::yield_now().await;

    controller.record_stop().await?;
    println!("Recording stopped: {}", controller.transport_state());

    let repo = repository.lock().unwrap();
    match repo.find_region(region_id) {
        Some(region) => println!(
            "Region {region_id}: {} [{:.2}s .. {:.2}s]",
            region.file_uri, region.start_time, region.end_time
        ),
        None => println!("Region {region_id} removed (nothing captured)"),
    }
    drop(repo);

    events.abort();
    Ok(())
}

/// Print the default session as pretty JSON.
pub fn print_session() -> Result<()> {
    let repo = SessionRepository::new();
    let session = repo.current_session();
    println!("{}", serde_json::to_string_pretty(session).expect("session serializes"));
    Ok(())
}
