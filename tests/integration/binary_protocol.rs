// The restorepipe binary end to end: stdout records, exit codes, modes

use crate::common::{
    FFMPEG_CAT, PNG_BYTES, Rig, VSPIPE_FOUR_FRAMES, VSPIPE_STILL, parse_records, serial,
};
use restorepipe::engine::WorkerMessage;
use std::fs;
use std::path::Path;
use std::process::{Command, Output};

fn restorepipe(settings: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_restorepipe"))
        .arg("--settings")
        .arg(settings)
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .expect("failed to run restorepipe")
}

fn terminal_count(records: &[WorkerMessage]) -> usize {
    records.iter().filter(|r| r.is_terminal()).count()
}

#[test]
fn test_run_ends_with_single_complete_record() {
    let _guard = serial();
    let rig = Rig::new(VSPIPE_FOUR_FRAMES, FFMPEG_CAT);
    let (settings, job) = rig.write_files(&rig.job_json());

    let out = restorepipe(&settings, &["--config", job.to_str().unwrap()]);
    assert_eq!(out.status.code(), Some(0), "{}", String::from_utf8_lossy(&out.stderr));

    let records = parse_records(&out.stdout);
    assert_eq!(terminal_count(&records), 1);
    assert_eq!(
        records.last(),
        Some(&WorkerMessage::complete(rig.output().to_string_lossy()))
    );
    assert!(records.iter().any(|r| matches!(r, WorkerMessage::Progress { frame: 4, .. })));
    assert_eq!(fs::read(rig.output()).unwrap().len(), "frame 1\n".len() * 4);
}

#[test]
fn test_engine_failure_ends_with_single_error_record() {
    let _guard = serial();
    let vspipe = r#"
echo "Python exception: boom" >&2
exit 1
"#;
    let rig = Rig::new(vspipe, FFMPEG_CAT);
    let (settings, job) = rig.write_files(&rig.job_json());

    let out = restorepipe(&settings, &["--config", job.to_str().unwrap()]);
    assert_eq!(out.status.code(), Some(1));

    let records = parse_records(&out.stdout);
    assert_eq!(terminal_count(&records), 1);
    match records.last() {
        Some(WorkerMessage::Error { message }) => {
            assert!(message.starts_with("vspipe failed with"), "{}", message);
            assert!(message.contains("Python exception: boom"), "{}", message);
        }
        other => panic!("expected error record, got {:?}", other),
    }
    assert!(!rig.output().exists());
}

#[test]
fn test_invalid_job_reports_error_record() {
    let _guard = serial();
    let rig = Rig::new(VSPIPE_FOUR_FRAMES, FFMPEG_CAT);
    let (settings, job) = rig.write_files(&serde_json::json!({"outputPath": "/x.mp4"}));

    let out = restorepipe(&settings, &["--config", job.to_str().unwrap()]);
    assert_eq!(out.status.code(), Some(1));
    let records = parse_records(&out.stdout);
    assert_eq!(records.len(), 1);
    match &records[0] {
        WorkerMessage::Error { message } => {
            assert!(message.starts_with("invalid job descriptor"), "{}", message);
            assert!(message.contains("inputPath"), "{}", message);
        }
        other => panic!("expected error record, got {:?}", other),
    }
}

#[test]
fn test_oversized_frame_range_is_rejected_before_spawn() {
    let _guard = serial();
    let mut rig = Rig::new(VSPIPE_FOUR_FRAMES, FFMPEG_CAT);
    rig.settings.binaries.vspipe = rig.path("no-such-vspipe");
    let mut job_json = rig.job_json();
    job_json["frameRange"] = serde_json::json!({"start": 0, "end": u64::MAX});
    let (settings, job) = rig.write_files(&job_json);

    let out = restorepipe(&settings, &["--config", job.to_str().unwrap()]);
    assert_eq!(out.status.code(), Some(1));
    let records = parse_records(&out.stdout);
    assert_eq!(records.len(), 1);
    match &records[0] {
        WorkerMessage::Error { message } => {
            assert!(message.starts_with("invalid job descriptor"), "{}", message);
            assert!(message.contains("frameRange end"), "{}", message);
        }
        other => panic!("expected error record, got {:?}", other),
    }
    assert!(rig.leftovers().is_empty());
}

#[test]
fn test_clamped_parameters_are_reported_as_warnings() {
    let _guard = serial();
    let rig = Rig::new(VSPIPE_FOUR_FRAMES, FFMPEG_CAT);
    let mut job_json = rig.job_json();
    job_json["restorationPipeline"] = serde_json::json!({
        "deband": {"enabled": false, "range": 500}
    });
    let (settings, job) = rig.write_files(&job_json);

    let out = restorepipe(&settings, &["--config", job.to_str().unwrap()]);
    assert_eq!(out.status.code(), Some(0), "{}", String::from_utf8_lossy(&out.stderr));
    let records = parse_records(&out.stdout);
    match &records[0] {
        WorkerMessage::Log { message, .. } => {
            assert!(message.contains("range"), "{}", message);
            assert!(message.contains("128"), "{}", message);
        }
        other => panic!("expected clamp warning first, got {:?}", other),
    }
}

#[test]
fn test_preview_writes_png_to_stdout() {
    let _guard = serial();
    let rig = Rig::new(VSPIPE_STILL, FFMPEG_CAT);
    let (settings, job) = rig.write_files(&rig.job_json());

    let out = restorepipe(
        &settings,
        &["--config", job.to_str().unwrap(), "--preview", "--frame", "12"],
    );
    assert_eq!(out.status.code(), Some(0), "{}", String::from_utf8_lossy(&out.stderr));
    assert_eq!(out.stdout, PNG_BYTES);
}

#[test]
fn test_dry_run_spawns_nothing() {
    let _guard = serial();
    let mut rig = Rig::new(VSPIPE_FOUR_FRAMES, FFMPEG_CAT);
    rig.settings.binaries.vspipe = rig.path("no-such-vspipe");
    let (settings, job) = rig.write_files(&rig.job_json());

    let out = restorepipe(&settings, &["--config", job.to_str().unwrap(), "--dry-run"]);
    assert_eq!(out.status.code(), Some(0), "{}", String::from_utf8_lossy(&out.stderr));

    let text = String::from_utf8(out.stdout).unwrap();
    assert!(text.starts_with("# passes: deinterlace\n"), "{}", text);
    assert!(text.contains("# frame engine: "), "{}", text);
    assert!(text.contains("-c y4m -p "), "{}", text);
    assert!(text.contains("clip.set_output()"), "{}", text);
    assert!(!rig.output().exists());
    assert!(rig.leftovers().is_empty());
}

#[test]
fn test_missing_config_is_usage_error() {
    let _guard = serial();
    let rig = Rig::new(VSPIPE_FOUR_FRAMES, FFMPEG_CAT);
    let (settings, _) = rig.write_files(&rig.job_json());

    let out = restorepipe(&settings, &[]);
    assert_eq!(out.status.code(), Some(2));
    assert!(out.stdout.is_empty());
}

#[test]
fn test_init_settings_creates_file_once() {
    let _guard = serial();
    let dir = tempfile::tempdir().unwrap();
    let settings = dir.path().join("conf").join("settings.toml");

    let out = restorepipe(&settings, &["init-settings"]);
    assert_eq!(out.status.code(), Some(0));
    assert!(String::from_utf8_lossy(&out.stdout).starts_with("Created default settings"));
    let written = fs::read_to_string(&settings).unwrap();
    assert!(written.contains("[binaries]"));

    let out = restorepipe(&settings, &["init-settings"]);
    assert_eq!(out.status.code(), Some(0));
    assert!(String::from_utf8_lossy(&out.stdout).starts_with("Settings file:"));
    assert_eq!(fs::read_to_string(&settings).unwrap(), written);
}
