#![allow(dead_code)] // Each test binary uses a different subset

use restorepipe::config::Settings;
use restorepipe::engine::{JobDescriptor, WorkerMessage};
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};
use tempfile::TempDir;

static SERIAL: Mutex<()> = Mutex::new(());

/// Held by every test that writes or spawns stand-ins. Writing an
/// executable while another thread forks can fail the exec with ETXTBSY.
pub fn serial() -> MutexGuard<'static, ()> {
    SERIAL.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// vspipe stand-in: four frames to stdout, vspipe-style progress to stderr
pub const VSPIPE_FOUR_FRAMES: &str = r#"
i=1
while [ $i -le 4 ]; do
  printf 'frame %d\n' "$i"
  echo "Frame: $i/4 (20.00 fps)" >&2
  i=$((i + 1))
done
echo "Output 4 frames in 0.20 seconds (20.00 fps)" >&2
"#;

/// vspipe stand-in that never finishes on its own
pub const VSPIPE_ENDLESS: &str = r#"
i=1
while :; do
  printf 'frame %d\n' "$i"
  echo "Frame: $i/100000 (50.00 fps)" >&2
  i=$((i + 1))
  sleep 0.02
done
"#;

/// vspipe stand-in for stills: writes the PNG next to the script
pub const VSPIPE_STILL: &str = r#"
dir=$(dirname "$1")
printf '\211PNG\r\n\032\nstill' > "$dir/still0.png"
"#;

/// vspipe stand-in that streams endlessly for runs and writes a still for
/// previews (`vspipe script .`)
pub const VSPIPE_STREAM_OR_STILL: &str = r#"
if [ "$1" = "-c" ]; then
  i=1
  while :; do
    printf 'frame %d\n' "$i"
    echo "Frame: $i/100000 (50.00 fps)" >&2
    i=$((i + 1))
    sleep 0.02
  done
fi
dir=$(dirname "$1")
printf '\211PNG\r\n\032\nstill' > "$dir/still0.png"
"#;

pub const PNG_BYTES: &[u8] = b"\x89PNG\r\n\x1a\nstill";

/// ffmpeg stand-in: copies the frame stream into the last argument
pub const FFMPEG_CAT: &str = r#"
for last; do :; done
cat > "$last"
"#;

/// A temp directory holding stand-in engines, a work dir and settings
/// pointing at both.
pub struct Rig {
    pub dir: TempDir,
    pub settings: Settings,
}

impl Rig {
    pub fn new(vspipe: &str, ffmpeg: &str) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let mut settings = Settings::default();
        settings.binaries.vspipe = write_stand_in(dir.path(), "vspipe", vspipe);
        settings.binaries.ffmpeg = write_stand_in(dir.path(), "ffmpeg", ffmpeg);
        settings.binaries.ffprobe = write_stand_in(dir.path(), "ffprobe", "exit 1\n");

        let work = dir.path().join("work");
        fs::create_dir_all(&work).unwrap();
        settings.process.temp_dir = Some(work);
        settings.process.grace_period_ms = 300;
        settings.process.poll_interval_ms = 5;
        settings.process.progress_interval_ms = 0;
        settings.logging.level = "warn".to_string();

        Self { dir, settings }
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    pub fn job(&self) -> JobDescriptor {
        JobDescriptor::new(self.path("tape.avi"), self.path("out.mp4"))
    }

    pub fn output(&self) -> PathBuf {
        self.path("out.mp4")
    }

    /// Entries left in the temp root after a run
    pub fn leftovers(&self) -> Vec<PathBuf> {
        let work = self.settings.process.temp_root();
        fs::read_dir(work)
            .unwrap()
            .map(|entry| entry.unwrap().path())
            .collect()
    }

    /// Workspaces of `job` whose names start with `prefix`
    pub fn workspaces(&self, prefix: &str, job: &JobDescriptor) -> Vec<PathBuf> {
        let start = format!("{}-{}-", prefix, job.id);
        self.leftovers()
            .into_iter()
            .filter(|path| {
                path.file_name()
                    .is_some_and(|name| name.to_string_lossy().starts_with(&start))
            })
            .collect()
    }

    /// The one kept workspace of `job` whose name starts with `prefix`
    pub fn workspace(&self, prefix: &str, job: &JobDescriptor) -> PathBuf {
        let mut found = self.workspaces(prefix, job);
        assert_eq!(found.len(), 1, "workspaces for {}: {:?}", job.id, found);
        found.remove(0)
    }

    /// Settings and job files for driving the binary
    pub fn write_files(&self, job: &serde_json::Value) -> (PathBuf, PathBuf) {
        let settings_path = self.path("settings.toml");
        self.settings.save_to(&settings_path).unwrap();
        let job_path = self.path("job.json");
        fs::write(&job_path, serde_json::to_string_pretty(job).unwrap()).unwrap();
        (settings_path, job_path)
    }

    pub fn job_json(&self) -> serde_json::Value {
        serde_json::json!({
            "inputPath": self.path("tape.avi"),
            "outputPath": self.output(),
            "encodingSettings": {"container": "mp4", "audioCopy": false}
        })
    }
}

pub fn write_stand_in(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, format!("#!/bin/sh\n{}", body)).unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    path
}

/// Poll `check` until it holds or `limit` passes
pub fn wait_for(limit: Duration, mut check: impl FnMut() -> bool) -> bool {
    let started = Instant::now();
    while started.elapsed() < limit {
        if check() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    check()
}

/// Frame numbers of the progress records, in order
pub fn progress_frames(messages: &[WorkerMessage]) -> Vec<u64> {
    messages
        .iter()
        .filter_map(|message| match message {
            WorkerMessage::Progress { frame, .. } => Some(*frame),
            _ => None,
        })
        .collect()
}

/// Parse the binary's stdout as JSON lines
pub fn parse_records(stdout: &[u8]) -> Vec<WorkerMessage> {
    String::from_utf8_lossy(stdout)
        .lines()
        .map(|line| {
            serde_json::from_str(line)
                .unwrap_or_else(|e| panic!("not a protocol record: {:?} ({})", line, e))
        })
        .collect()
}
