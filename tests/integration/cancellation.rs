// Cancellation and timeouts against an engine that never finishes

use crate::common::{FFMPEG_CAT, Rig, VSPIPE_ENDLESS, progress_frames, serial, wait_for};
use restorepipe::engine::worker::MemorySink;
use restorepipe::engine::{AssumeAvailable, Orchestrator, RunState, SourceInfo, StaticProbe};
use restorepipe::error::OrchestrationError;
use std::thread;
use std::time::{Duration, Instant};

#[test]
fn test_cancel_mid_run_stops_engines_and_removes_output() {
    let _guard = serial();
    let rig = Rig::new(VSPIPE_ENDLESS, FFMPEG_CAT);
    let probe = StaticProbe(SourceInfo::default());
    let sink = MemorySink::new();
    let orch = Orchestrator::new(&rig.settings, &probe, &AssumeAvailable, &sink);
    let handle = orch.cancel_handle();
    let job = rig.job();

    let (result, settled) = thread::scope(|s| {
        let canceller = s.spawn(|| {
            let started = wait_for(Duration::from_secs(10), || {
                !progress_frames(&sink.messages()).is_empty()
            });
            // Cancel either way so a silent engine cannot hang the test
            (started, handle.cancel())
        });
        let result = orch.run(&job);
        (result, canceller.join().unwrap())
    });
    let (started, settled) = settled;
    assert!(started, "engine never reported progress");

    assert!(matches!(result, Err(OrchestrationError::Cancelled)), "{:?}", result);
    assert_eq!(settled, RunState::Cancelled);
    assert_eq!(orch.state(), RunState::Cancelled);
    assert!(handle.is_cancelled());
    assert!(!rig.output().exists(), "partial output should be removed");
    assert!(rig.leftovers().is_empty());
}

#[test]
fn test_cancel_is_idempotent() {
    let _guard = serial();
    let rig = Rig::new(VSPIPE_ENDLESS, FFMPEG_CAT);
    let probe = StaticProbe(SourceInfo::default());
    let sink = MemorySink::new();
    let orch = Orchestrator::new(&rig.settings, &probe, &AssumeAvailable, &sink);
    let handle = orch.cancel_handle();

    handle.request();
    handle.request();
    assert!(matches!(orch.run(&rig.job()), Err(OrchestrationError::Cancelled)));
    assert_eq!(handle.cancel(), RunState::Cancelled);
    assert_eq!(handle.cancel(), RunState::Cancelled);
    assert!(sink.messages().is_empty());
}

#[test]
fn test_job_timeout() {
    let _guard = serial();
    let mut rig = Rig::new(VSPIPE_ENDLESS, FFMPEG_CAT);
    rig.settings.process.job_timeout_secs = Some(1);
    let probe = StaticProbe(SourceInfo::default());
    let sink = MemorySink::new();
    let orch = Orchestrator::new(&rig.settings, &probe, &AssumeAvailable, &sink);

    let started = Instant::now();
    match orch.run(&rig.job()) {
        Err(OrchestrationError::Timeout(limit)) => assert_eq!(limit, Duration::from_secs(1)),
        other => panic!("expected timeout, got {:?}", other),
    }
    assert!(started.elapsed() >= Duration::from_secs(1));
    assert!(started.elapsed() < Duration::from_secs(10));
    assert_eq!(orch.state(), RunState::Failed);
    assert!(!rig.output().exists());
}
