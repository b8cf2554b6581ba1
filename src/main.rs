use std::io::Write;
use std::path::Path;
use std::process::ExitCode;

use anyhow::Context;

use restorepipe::cli::{self, Mode};
use restorepipe::config::Settings;
use restorepipe::engine::orchestrator::SCRIPT_FILE;
use restorepipe::engine::workspace::RUN_PREFIX;
use restorepipe::engine::{
    CancelHandle, EventSink, FfprobeProbe, JobDescriptor, JsonLinesReporter, LogLevel,
    Orchestrator, PreviewRenderer, UnavailableList, WorkerMessage, ffmpeg_version,
    ffprobe_version, init_logging, vspipe_version,
};
use restorepipe::error::OrchestrationError;
use restorepipe::signals::{self, SignalFlag};

fn main() -> ExitCode {
    let cli = cli::parse();
    let Some(mode) = cli.mode() else {
        eprintln!("error: --config <JOB_JSON> is required (see --help)");
        return ExitCode::from(2);
    };

    if mode == Mode::InitSettings {
        return init_settings(cli.settings.as_deref());
    }

    let settings = match Settings::load(cli.settings.as_deref()) {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            return ExitCode::from(1);
        }
    };

    let level = if cfg!(feature = "dev-logging") {
        "debug"
    } else {
        settings.logging.level.as_str()
    };
    if let Err(e) = init_logging(level, settings.logging.file.as_deref()) {
        eprintln!("Warning: {:#}", e);
    }

    match mode {
        Mode::Run(job) => run_job(&settings, &job),
        Mode::Preview { job, frame } => run_preview(&settings, &job, frame),
        Mode::DryRun(job) => dry_run(&settings, &job),
        Mode::CheckTools => check_tools(&settings),
        Mode::InitSettings => ExitCode::SUCCESS,
    }
}

fn exit_code(err: &OrchestrationError, signal: Option<&SignalFlag>) -> ExitCode {
    let interrupted = signal.is_some_and(SignalFlag::received);
    let code = if interrupted { 130 } else { err.exit_code() };
    ExitCode::from(u8::try_from(code).unwrap_or(1))
}

fn dependency_probe(settings: &Settings) -> UnavailableList {
    let (deps, unknown) = UnavailableList::from_names(&settings.dependencies.unavailable);
    for name in unknown {
        tracing::warn!("ignoring unknown dependency name in settings: {}", name);
    }
    deps
}

/// Route SIGINT/SIGTERM into `handle` for the rest of the process.
fn watch_signals(handle: CancelHandle) -> SignalFlag {
    signals::install(handle).unwrap_or_else(|e| {
        tracing::warn!("could not install signal handler: {}", e);
        SignalFlag::default()
    })
}

fn run_job(settings: &Settings, path: &Path) -> ExitCode {
    let reporter = JsonLinesReporter::stdout();

    let (job, clamps) = match JobDescriptor::load(path) {
        Ok(loaded) => loaded,
        Err(e) => {
            reporter.emit(WorkerMessage::error(e.to_string()));
            return exit_code(&e, None);
        }
    };
    for clamp in &clamps {
        reporter.log(LogLevel::Warning, &clamp.to_string());
    }
    tracing::info!(
        "job {}: {} -> {}",
        job.id,
        job.input_path.display(),
        job.output_path.display()
    );

    let deps = dependency_probe(settings);
    let probe = FfprobeProbe::new(settings.binaries.ffprobe.clone());
    let orchestrator = Orchestrator::new(settings, &probe, &deps, &reporter);
    let signal = watch_signals(orchestrator.cancel_handle());

    match orchestrator.run(&job) {
        Ok(done) => {
            tracing::info!(
                "finished in {:.1}s ({} frames)",
                done.elapsed.as_secs_f64(),
                done.frames.map_or("unknown".to_string(), |f| f.to_string())
            );
            reporter.emit(WorkerMessage::complete(
                done.output_path.to_string_lossy().to_string(),
            ));
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!("{}", e);
            reporter.emit(WorkerMessage::error(e.to_string()));
            exit_code(&e, Some(&signal))
        }
    }
}

fn run_preview(settings: &Settings, path: &Path, frame: u64) -> ExitCode {
    let (job, _) = match JobDescriptor::load(path) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("Error: {}", e);
            return exit_code(&e, None);
        }
    };

    let deps = dependency_probe(settings);
    let renderer = PreviewRenderer::new(settings, &deps);
    let signal = watch_signals(renderer.cancel_handle());

    match renderer.render(&job, frame) {
        Ok(png) => {
            let mut stdout = std::io::stdout().lock();
            if let Err(e) = stdout.write_all(&png).and_then(|_| stdout.flush()) {
                eprintln!("Error: failed to write image: {}", e);
                return ExitCode::from(1);
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            exit_code(&e, Some(&signal))
        }
    }
}

fn dry_run(settings: &Settings, path: &Path) -> ExitCode {
    let (job, clamps) = match JobDescriptor::load(path) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("Error: {}", e);
            return exit_code(&e, None);
        }
    };
    for clamp in &clamps {
        eprintln!("Warning: {}", clamp);
    }

    let deps = dependency_probe(settings);
    let probe = FfprobeProbe::new(settings.binaries.ffprobe.clone());
    let sink = JsonLinesReporter::new(std::io::sink());
    let orchestrator = Orchestrator::new(settings, &probe, &deps, &sink);
    let script_path = settings
        .process
        .temp_root()
        .join(format!("{}-{}", RUN_PREFIX, job.id))
        .join(SCRIPT_FILE);

    match orchestrator.plan(&job, &script_path) {
        Ok(plan) => {
            println!("{}", plan.describe());
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            exit_code(&e, None)
        }
    }
}

fn check_tools(settings: &Settings) -> ExitCode {
    let bins = &settings.binaries;
    let checks = [
        ("vspipe", vspipe_version(&bins.vspipe)),
        ("ffmpeg", ffmpeg_version(&bins.ffmpeg)),
        ("ffprobe", ffprobe_version(&bins.ffprobe)),
    ];

    let mut all_found = true;
    for (name, result) in checks {
        match result {
            Ok(version) => println!("✓ {}: {}", name, version),
            Err(e) => {
                all_found = false;
                println!("✗ {}: {:#}", name, e);
            }
        }
    }

    if all_found {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(1)
    }
}

fn init_settings(path: Option<&Path>) -> ExitCode {
    let result = (|| -> anyhow::Result<()> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => Settings::settings_path()?,
        };
        if path.exists() {
            println!("Settings file: {}", path.display());
            Settings::load_from(&path).context("Existing settings file is invalid")?;
        } else {
            Settings::default().save_to(&path)?;
            println!("Created default settings at {}", path.display());
        }
        Ok(())
    })();

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::from(1)
        }
    }
}
