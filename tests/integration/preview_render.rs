// Still-frame rendering through the frame engine alone

use crate::common::{
    FFMPEG_CAT, PNG_BYTES, Rig, VSPIPE_STILL, VSPIPE_STREAM_OR_STILL,
    progress_frames, serial, wait_for,
};
use restorepipe::engine::worker::MemorySink;
use restorepipe::engine::workspace::{PREVIEW_PREFIX, RUN_PREFIX};
use restorepipe::engine::{
    AssumeAvailable, ContainerFormat, Orchestrator, PreviewRenderer, RunState, SourceInfo,
    StaticProbe, VideoCodec,
};
use restorepipe::error::{Engine, OrchestrationError};
use std::fs;
use std::thread;
use std::time::Duration;

#[test]
fn test_preview_returns_png_bytes() {
    let _guard = serial();
    let rig = Rig::new(VSPIPE_STILL, FFMPEG_CAT);
    let renderer = PreviewRenderer::new(&rig.settings, &AssumeAvailable);

    let png = renderer.render(&rig.job(), 120).unwrap();
    assert_eq!(png, PNG_BYTES);
    assert_eq!(renderer.state(), RunState::Completed);
    assert!(rig.leftovers().is_empty());
    // Previews never touch the job's output
    assert!(!rig.output().exists());
}

#[test]
fn test_preview_script_selects_scaled_frame() {
    let _guard = serial();
    let mut rig = Rig::new(VSPIPE_STILL, FFMPEG_CAT);
    rig.settings.process.keep_temp_files = true;
    let renderer = PreviewRenderer::new(&rig.settings, &AssumeAvailable);
    let job = rig.job();
    renderer.render(&job, 7).unwrap();

    let workspace = rig.workspace(PREVIEW_PREFIX, &job);
    let script = fs::read_to_string(workspace.join("script.vpy")).unwrap();
    // Default QTGMC doubles the rate, so source frame 7 is output frame 14
    assert!(script.contains("clip = clip[min(14, clip.num_frames - 1)]\n"), "{}", script);
    assert!(script.contains("core.imwri.Write(clip, imgformat=\"PNG\""), "{}", script);
    assert!(script.ends_with("clip.set_output()\n"));
}

#[test]
fn test_preview_engine_failure() {
    let _guard = serial();
    let vspipe = r#"
echo "Script evaluation failed:" >&2
echo "vapoursynth.Error: Index out of range" >&2
exit 1
"#;
    let rig = Rig::new(vspipe, FFMPEG_CAT);
    let renderer = PreviewRenderer::new(&rig.settings, &AssumeAvailable);

    match renderer.render(&rig.job(), 3) {
        Err(OrchestrationError::EngineCrash { engine, tail, .. }) => {
            assert_eq!(engine, Engine::Frame);
            assert_eq!(tail.last().map(String::as_str), Some("vapoursynth.Error: Index out of range"));
        }
        other => panic!("expected engine crash, got {:?}", other.map(|b| b.len())),
    }
    assert_eq!(renderer.state(), RunState::Failed);
}

#[test]
fn test_preview_without_image_is_pipe_broken() {
    let _guard = serial();
    let rig = Rig::new("exit 0\n", FFMPEG_CAT);
    let renderer = PreviewRenderer::new(&rig.settings, &AssumeAvailable);

    match renderer.render(&rig.job(), 0) {
        Err(OrchestrationError::PipeBroken(message)) => {
            assert!(message.contains("still0.png"), "{}", message);
        }
        other => panic!("expected missing image, got {:?}", other.map(|b| b.len())),
    }
}

#[test]
fn test_preview_timeout() {
    let _guard = serial();
    let mut rig = Rig::new("exec sleep 30\n", FFMPEG_CAT);
    rig.settings.process.preview_timeout_secs = 1;
    let renderer = PreviewRenderer::new(&rig.settings, &AssumeAvailable);

    match renderer.render(&rig.job(), 0) {
        Err(OrchestrationError::Timeout(limit)) => assert_eq!(limit.as_secs(), 1),
        other => panic!("expected timeout, got {:?}", other.map(|b| b.len())),
    }
    assert_eq!(renderer.state(), RunState::Failed);
}

#[test]
fn test_cancel_running_preview() {
    let _guard = serial();
    let vspipe = r#"
touch "$(dirname "$1")/started"
exec sleep 30
"#;
    let rig = Rig::new(vspipe, FFMPEG_CAT);
    let renderer = PreviewRenderer::new(&rig.settings, &AssumeAvailable);
    let handle = renderer.cancel_handle();
    let job = rig.job();

    let (result, (started, settled)) = thread::scope(|s| {
        let canceller = s.spawn(|| {
            let started = wait_for(Duration::from_secs(10), || {
                rig.workspaces(PREVIEW_PREFIX, &job)
                    .iter()
                    .any(|dir| dir.join("started").exists())
            });
            // Cancel either way so the sleeping engine cannot hang the test
            (started, handle.cancel())
        });
        let result = renderer.render(&job, 3);
        (result, canceller.join().unwrap())
    });
    assert!(started, "preview engine never started");

    assert!(
        matches!(result, Err(OrchestrationError::Cancelled)),
        "{:?}",
        result.map(|b| b.len())
    );
    assert_eq!(settled, RunState::Cancelled);
    assert_eq!(renderer.state(), RunState::Cancelled);
    assert!(rig.leftovers().is_empty());
}

#[test]
fn test_preview_ignores_encoding_settings() {
    let _guard = serial();
    let mut rig = Rig::new(VSPIPE_STILL, FFMPEG_CAT);
    rig.settings.process.keep_temp_files = true;

    let h264 = rig.job();
    let mut ffv1 = rig.job();
    ffv1.encoding_settings.codec = VideoCodec::Ffv1;
    ffv1.encoding_settings.container = ContainerFormat::Mkv;
    ffv1.encoding_settings.audio_copy = false;
    ffv1.encoding_settings.custom_ffmpeg_args = "-g 1 -level 3".to_string();

    let mut scripts = Vec::new();
    let mut images = Vec::new();
    for job in [&h264, &ffv1] {
        images.push(renderer_for(&rig).render(job, 12).unwrap());
        let workspace = rig.workspace(PREVIEW_PREFIX, job);
        let script = fs::read_to_string(workspace.join("script.vpy")).unwrap();
        // Only the image directory differs between workspaces
        scripts.push(script.replace(workspace.to_str().unwrap(), "<workspace>"));
    }
    assert_eq!(scripts[0], scripts[1]);
    assert_eq!(images[0], images[1]);
}

fn renderer_for(rig: &Rig) -> PreviewRenderer<'_> {
    PreviewRenderer::new(&rig.settings, &AssumeAvailable)
}

#[test]
fn test_preview_alongside_running_job_keeps_its_files() {
    let _guard = serial();
    let rig = Rig::new(VSPIPE_STREAM_OR_STILL, FFMPEG_CAT);
    let probe = StaticProbe(SourceInfo::default());
    let sink = MemorySink::new();
    let orch = Orchestrator::new(&rig.settings, &probe, &AssumeAvailable, &sink);
    let handle = orch.cancel_handle();
    let job = rig.job();

    let (result, checked) = thread::scope(|s| {
        let previewer = s.spawn(|| {
            let started = wait_for(Duration::from_secs(10), || {
                !progress_frames(&sink.messages()).is_empty()
            });
            let checked = started.then(|| {
                let run_dirs = rig.workspaces(RUN_PREFIX, &job);
                let png = renderer_for(&rig).render(&job, 0).map_err(|e| e.to_string());
                let intact = run_dirs
                    .iter()
                    .all(|dir| dir.join("script.vpy").is_file() && dir.join("run.json").is_file());
                (png, run_dirs.len(), intact)
            });
            // Always cancel so the endless run cannot outlive the test
            handle.cancel();
            checked
        });
        let result = orch.run(&job);
        (result, previewer.join().unwrap())
    });

    let (png, run_dirs, intact) = checked.expect("run never reported progress");
    assert_eq!(png.unwrap(), PNG_BYTES);
    assert_eq!(run_dirs, 1);
    assert!(intact, "preview removed the running job's script or manifest");
    assert!(matches!(result, Err(OrchestrationError::Cancelled)), "{:?}", result);
    assert!(rig.leftovers().is_empty());
}
