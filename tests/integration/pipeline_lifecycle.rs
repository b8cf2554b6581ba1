// Full runs against stand-in engines: success, crashes and short streams

use crate::common::{FFMPEG_CAT, Rig, VSPIPE_FOUR_FRAMES, progress_frames, serial};
use restorepipe::engine::worker::MemorySink;
use restorepipe::engine::workspace::RUN_PREFIX;
use restorepipe::engine::{
    AssumeAvailable, AudioPolicy, LogLevel, Orchestrator, RunState, SourceInfo, StaticProbe,
    UnavailableList, WorkerMessage,
};
use restorepipe::error::{Engine, OrchestrationError};
use std::fs;

fn no_source_info() -> StaticProbe {
    StaticProbe(SourceInfo::default())
}

#[test]
fn test_successful_run_writes_output() {
    let _guard = serial();
    let rig = Rig::new(VSPIPE_FOUR_FRAMES, FFMPEG_CAT);
    let probe = no_source_info();
    let sink = MemorySink::new();
    let orch = Orchestrator::new(&rig.settings, &probe, &AssumeAvailable, &sink);

    let info = orch.run(&rig.job()).expect("run should succeed");

    assert_eq!(info.output_path, rig.output());
    assert_eq!(info.frames, Some(4));
    // Default job asks for audio copy into MP4 with an unknown source codec
    assert!(matches!(info.audio, AudioPolicy::Reencode { .. }));
    assert_eq!(orch.state(), RunState::Completed);
    assert_eq!(
        fs::read_to_string(rig.output()).unwrap(),
        "frame 1\nframe 2\nframe 3\nframe 4\n"
    );
    assert!(rig.leftovers().is_empty(), "workspace should be removed");
}

#[test]
fn test_progress_is_ordered_and_reaches_total() {
    let _guard = serial();
    let rig = Rig::new(VSPIPE_FOUR_FRAMES, FFMPEG_CAT);
    let probe = no_source_info();
    let sink = MemorySink::new();
    let orch = Orchestrator::new(&rig.settings, &probe, &AssumeAvailable, &sink);
    orch.run(&rig.job()).unwrap();

    let messages = sink.messages();
    let frames = progress_frames(&messages);
    assert!(!frames.is_empty());
    assert!(frames.windows(2).all(|pair| pair[0] <= pair[1]), "{:?}", frames);
    assert_eq!(frames.last(), Some(&4));

    match messages.iter().rev().find(|m| matches!(m, WorkerMessage::Progress { .. })) {
        Some(WorkerMessage::Progress {
            total_frames, eta, ..
        }) => {
            assert_eq!(*total_frames, Some(4));
            assert_eq!(*eta, 0.0);
        }
        other => panic!("expected progress, got {:?}", other),
    }

    // Pass and audio summary come before any progress
    assert!(matches!(
        &messages[0],
        WorkerMessage::Log { level: LogLevel::Info, message } if message == "Restoration passes: deinterlace"
    ));
    // The orchestrator never writes terminal records itself
    assert!(!messages.iter().any(WorkerMessage::is_terminal));
}

#[test]
fn test_throttled_progress_still_ends_on_last_frame() {
    let _guard = serial();
    let mut rig = Rig::new(VSPIPE_FOUR_FRAMES, FFMPEG_CAT);
    rig.settings.process.progress_interval_ms = 60_000;
    let probe = no_source_info();
    let sink = MemorySink::new();
    let orch = Orchestrator::new(&rig.settings, &probe, &AssumeAvailable, &sink);
    orch.run(&rig.job()).unwrap();

    // First update goes out immediately, the held-back final one is flushed
    assert_eq!(progress_frames(&sink.messages()), vec![1, 4]);
}

#[test]
fn test_frame_engine_crash_reports_tail() {
    let _guard = serial();
    let vspipe = r#"
echo "Frame: 1/4 (5.00 fps)" >&2
echo "Python exception: No module named 'havsfunc'" >&2
echo "Failed to evaluate the script" >&2
exit 1
"#;
    let rig = Rig::new(vspipe, FFMPEG_CAT);
    let probe = no_source_info();
    let sink = MemorySink::new();
    let orch = Orchestrator::new(&rig.settings, &probe, &AssumeAvailable, &sink);

    match orch.run(&rig.job()) {
        Err(OrchestrationError::EngineCrash { engine, tail, .. }) => {
            assert_eq!(engine, Engine::Frame);
            assert_eq!(
                tail,
                vec![
                    "Python exception: No module named 'havsfunc'",
                    "Failed to evaluate the script"
                ]
            );
        }
        other => panic!("expected frame engine crash, got {:?}", other),
    }
    assert_eq!(orch.state(), RunState::Failed);
    assert!(!rig.output().exists(), "partial output should be removed");
    assert!(rig.leftovers().is_empty());

    // Unrecognised lines are forwarded as debug logs
    assert!(sink.messages().iter().any(|m| matches!(
        m,
        WorkerMessage::Log { level: LogLevel::Debug, message } if message.contains("havsfunc")
    )));
}

#[test]
fn test_encoder_failure_is_blamed_on_encoder() {
    let _guard = serial();
    let ffmpeg = r#"
cat > /dev/null
echo "Unknown encoder 'libx264'" >&2
exit 1
"#;
    let rig = Rig::new(VSPIPE_FOUR_FRAMES, ffmpeg);
    let probe = no_source_info();
    let sink = MemorySink::new();
    let orch = Orchestrator::new(&rig.settings, &probe, &AssumeAvailable, &sink);

    match orch.run(&rig.job()) {
        Err(err @ OrchestrationError::EngineCrash { .. }) => {
            let text = err.to_string();
            assert!(text.starts_with("ffmpeg failed with"), "{}", text);
            assert!(text.contains("Unknown encoder 'libx264'"), "{}", text);
        }
        other => panic!("expected encoder crash, got {:?}", other),
    }
}

#[test]
fn test_killed_engine_without_cancel_is_a_crash() {
    use std::os::unix::process::ExitStatusExt;

    let _guard = serial();
    // What the OOM killer does to a QTGMC run
    let vspipe = r#"
printf 'frame 1\n'
echo "Frame: 1/4 (5.00 fps)" >&2
echo "alloc failed" >&2
kill -9 $$
"#;
    let rig = Rig::new(vspipe, FFMPEG_CAT);
    let probe = no_source_info();
    let sink = MemorySink::new();
    let orch = Orchestrator::new(&rig.settings, &probe, &AssumeAvailable, &sink);

    let err = orch.run(&rig.job()).unwrap_err();
    assert_eq!(err.exit_code(), 1);
    match err {
        OrchestrationError::EngineCrash { engine, status, tail } => {
            assert_eq!(engine, Engine::Frame);
            assert_eq!(status.signal(), Some(9));
            assert_eq!(tail, vec!["alloc failed"]);
        }
        other => panic!("expected frame engine crash, got {:?}", other),
    }
    assert_eq!(orch.state(), RunState::Failed);
    assert!(!orch.cancel_handle().is_cancelled());
    assert!(!rig.output().exists());
}

#[test]
fn test_encoder_exit_is_blamed_over_failed_frame_write() {
    let _guard = serial();
    let vspipe = r#"
trap '' PIPE
sleep 0.1
printf 'frame 1\n' 2>/dev/null
echo "Error: fwrite() call failed when writing frame: 0, plane: 0, errno: 32" >&2
exit 1
"#;
    let ffmpeg = r#"
echo "pipe:: Invalid data found when processing input" >&2
exit 1
"#;
    let rig = Rig::new(vspipe, ffmpeg);
    let probe = no_source_info();
    let sink = MemorySink::new();
    let orch = Orchestrator::new(&rig.settings, &probe, &AssumeAvailable, &sink);

    match orch.run(&rig.job()) {
        Err(OrchestrationError::EngineCrash { engine, tail, .. }) => {
            assert_eq!(engine, Engine::Encoder);
            assert_eq!(tail, vec!["pipe:: Invalid data found when processing input"]);
        }
        other => panic!("expected encoder crash, got {:?}", other),
    }
    assert_eq!(orch.state(), RunState::Failed);
}

#[test]
fn test_short_stream_is_pipe_broken() {
    let _guard = serial();
    let vspipe = r#"
printf 'frame 1\nframe 2\n'
echo "Frame: 1/4 (10.00 fps)" >&2
echo "Frame: 2/4 (10.00 fps)" >&2
"#;
    let rig = Rig::new(vspipe, FFMPEG_CAT);
    let probe = no_source_info();
    let sink = MemorySink::new();
    let orch = Orchestrator::new(&rig.settings, &probe, &AssumeAvailable, &sink);

    match orch.run(&rig.job()) {
        Err(OrchestrationError::PipeBroken(message)) => {
            assert_eq!(message, "engine reported 2 of 4 frames");
        }
        other => panic!("expected a broken pipe, got {:?}", other),
    }
    assert!(!rig.output().exists());
}

#[test]
fn test_missing_encoder_binary() {
    let _guard = serial();
    let mut rig = Rig::new(VSPIPE_FOUR_FRAMES, FFMPEG_CAT);
    rig.settings.binaries.ffmpeg = rig.path("no-such-ffmpeg");
    let probe = no_source_info();
    let sink = MemorySink::new();
    let orch = Orchestrator::new(&rig.settings, &probe, &AssumeAvailable, &sink);

    match orch.run(&rig.job()) {
        Err(OrchestrationError::ProcessSpawn { engine, .. }) => {
            assert_eq!(engine, Engine::Encoder);
        }
        other => panic!("expected spawn failure, got {:?}", other),
    }
    assert!(!rig.output().exists());
    assert!(rig.leftovers().is_empty());
}

#[test]
fn test_unavailable_dependency_fails_before_spawn() {
    let _guard = serial();
    let mut rig = Rig::new(VSPIPE_FOUR_FRAMES, FFMPEG_CAT);
    // Would fail the run differently if anything were spawned
    rig.settings.binaries.vspipe = rig.path("no-such-vspipe");
    let (deps, unknown) = UnavailableList::from_names(&["mvtools"]);
    assert!(unknown.is_empty());
    let probe = no_source_info();
    let sink = MemorySink::new();
    let orch = Orchestrator::new(&rig.settings, &probe, &deps, &sink);

    match orch.run(&rig.job()) {
        Err(err @ OrchestrationError::ScriptGeneration(_)) => {
            assert!(err.is_preflight());
            assert!(err.to_string().contains("mvtools"), "{}", err);
        }
        other => panic!("expected script generation error, got {:?}", other),
    }
    assert!(rig.leftovers().is_empty());
    assert!(sink.messages().is_empty());
}

#[test]
fn test_keep_temp_files_leaves_script_and_manifest() {
    let _guard = serial();
    let mut rig = Rig::new(VSPIPE_FOUR_FRAMES, FFMPEG_CAT);
    rig.settings.process.keep_temp_files = true;
    let probe = no_source_info();
    let sink = MemorySink::new();
    let orch = Orchestrator::new(&rig.settings, &probe, &AssumeAvailable, &sink);
    let job = rig.job();
    orch.run(&job).unwrap();

    let workspace = rig.workspace(RUN_PREFIX, &job);
    let script = fs::read_to_string(workspace.join("script.vpy")).unwrap();
    assert!(script.contains("haf.QTGMC("));
    assert!(script.ends_with("clip.set_output()\n"));

    let manifest: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(workspace.join("run.json")).unwrap()).unwrap();
    assert_eq!(manifest["jobId"], job.id.to_string());
    assert_eq!(manifest["passes"], serde_json::json!(["deinterlace"]));
    assert_eq!(
        manifest["frameEngine"][0],
        rig.settings.binaries.vspipe.to_str().unwrap()
    );
}
