// Child process plumbing shared by full runs and previews

use std::collections::VecDeque;
use std::ffi::OsString;
use std::io::{self, Read};
use std::process::{Child, ExitStatus, Stdio};
use std::sync::mpsc::Sender;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use super::core::EngineCommand;
use crate::error::{Engine, OrchestrationError};

/// A spawned engine and what we know about its exit.
#[derive(Debug)]
pub struct Supervised {
    pub engine: Engine,
    child: Child,
    status: Option<ExitStatus>,
}

impl Supervised {
    /// Spawn `cmd` with stderr piped; stdin and stdout as given.
    pub fn spawn(
        cmd: &EngineCommand,
        env: &[(String, OsString)],
        stdin: Stdio,
        stdout: Stdio,
    ) -> Result<Self, OrchestrationError> {
        let mut command = cmd.to_command();
        command
            .envs(env.iter().map(|(k, v)| (k, v)))
            .stdin(stdin)
            .stdout(stdout)
            .stderr(Stdio::piped());

        tracing::debug!("spawning {}", cmd);
        let child = command
            .spawn()
            .map_err(|source| OrchestrationError::ProcessSpawn {
                engine: cmd.engine,
                program: cmd.program.clone(),
                source,
            })?;
        tracing::debug!("{} running as pid {}", cmd.engine, child.id());

        Ok(Self {
            engine: cmd.engine,
            child,
            status: None,
        })
    }

    pub fn child_mut(&mut self) -> &mut Child {
        &mut self.child
    }

    /// Non-blocking exit check; the status is remembered once seen.
    pub fn poll(&mut self) -> io::Result<Option<ExitStatus>> {
        if self.status.is_none() {
            self.status = self.child.try_wait()?;
        }
        Ok(self.status)
    }

    /// Ask the process to exit (SIGTERM on Unix).
    pub fn terminate(&mut self) {
        if self.status.is_some() {
            return;
        }
        send_terminate(&mut self.child);
    }

    /// Force the process down and reap it.
    fn kill_and_reap(&mut self) {
        if self.status.is_some() {
            return;
        }
        if let Err(e) = self.child.kill() {
            tracing::debug!("kill {} failed: {}", self.engine, e);
        }
        match self.child.wait() {
            Ok(status) => self.status = Some(status),
            Err(e) => tracing::warn!("failed to reap {}: {}", self.engine, e),
        }
    }
}

impl Drop for Supervised {
    fn drop(&mut self) {
        // Never leave an engine running behind an early return or a panic
        if self.status.is_none() {
            if let Ok(Some(status)) = self.child.try_wait() {
                self.status = Some(status);
                return;
            }
            tracing::warn!("{} still running on drop, killing", self.engine);
            self.kill_and_reap();
        }
    }
}

#[cfg(unix)]
fn send_terminate(child: &mut Child) {
    let Ok(pid) = libc::pid_t::try_from(child.id()) else {
        let _ = child.kill();
        return;
    };
    // SAFETY: kill(2) on our own unreaped child; the pid cannot have been
    // recycled while the Child handle has not been waited on.
    let rc = unsafe { libc::kill(pid, libc::SIGTERM) };
    if rc != 0 {
        tracing::debug!(
            "SIGTERM to pid {} failed: {}",
            pid,
            io::Error::last_os_error()
        );
    }
}

#[cfg(not(unix))]
fn send_terminate(child: &mut Child) {
    let _ = child.kill();
}

/// Terminate every live process, escalating to a kill after `grace`.
///
/// Returns once all of them have been reaped.
pub fn shutdown(procs: &mut [&mut Supervised], grace: Duration, poll: Duration) {
    for proc in procs.iter_mut() {
        proc.terminate();
    }

    let deadline = Instant::now() + grace;
    loop {
        let mut alive = false;
        for proc in procs.iter_mut() {
            match proc.poll() {
                Ok(Some(_)) => {}
                Ok(None) => alive = true,
                Err(e) => {
                    tracing::warn!("try_wait on {} failed: {}", proc.engine, e);
                    alive = true;
                }
            }
        }
        if !alive {
            return;
        }
        if Instant::now() >= deadline {
            break;
        }
        thread::sleep(poll.min(Duration::from_millis(20)));
    }

    for proc in procs.iter_mut() {
        if proc.status.is_none() {
            tracing::warn!("{} ignored SIGTERM, killing", proc.engine);
            proc.kill_and_reap();
        }
    }
}

/// Split a byte stream into lines on `\n` or `\r`.
///
/// `vspipe -p` redraws its progress line with `\r`, so both count as
/// terminators. Empty lines are dropped.
pub struct LineSplitter {
    pending: Vec<u8>,
}

impl LineSplitter {
    pub fn new() -> Self {
        Self {
            pending: Vec::new(),
        }
    }

    /// Feed a chunk, returning every line it completed
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        let mut lines = Vec::new();
        for &byte in chunk {
            if byte == b'\n' || byte == b'\r' {
                self.take_line(&mut lines);
            } else {
                self.pending.push(byte);
            }
        }
        lines
    }

    /// Whatever is left once the stream ends
    pub fn finish(mut self) -> Option<String> {
        let mut lines = Vec::new();
        self.take_line(&mut lines);
        lines.pop()
    }

    fn take_line(&mut self, lines: &mut Vec<String>) {
        if self.pending.is_empty() {
            return;
        }
        lines.push(String::from_utf8_lossy(&self.pending).into_owned());
        self.pending.clear();
    }
}

impl Default for LineSplitter {
    fn default() -> Self {
        Self::new()
    }
}

/// Forward each line of `stream` over `tx`. The channel disconnects when
/// the stream closes.
pub fn spawn_line_reader<R>(stream: R, tx: Sender<String>) -> JoinHandle<()>
where
    R: Read + Send + 'static,
{
    thread::spawn(move || {
        let mut stream = stream;
        let mut splitter = LineSplitter::new();
        let mut buf = [0u8; 4096];
        loop {
            match stream.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => {
                    for line in splitter.push(&buf[..n]) {
                        if tx.send(line).is_err() {
                            return;
                        }
                    }
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    tracing::debug!("stderr reader stopped: {}", e);
                    break;
                }
            }
        }
        if let Some(line) = splitter.finish() {
            let _ = tx.send(line);
        }
    })
}

/// Drain `stream`, keeping only its last `limit` lines.
pub fn spawn_tail_reader<R>(stream: R, limit: usize) -> JoinHandle<Vec<String>>
where
    R: Read + Send + 'static,
{
    thread::spawn(move || {
        let mut stream = stream;
        let mut splitter = LineSplitter::new();
        let mut tail = VecDeque::with_capacity(limit);
        let keep = |line: String, tail: &mut VecDeque<String>| {
            tracing::debug!(target: "restorepipe::encoder", "{}", line);
            if limit == 0 {
                return;
            }
            if tail.len() == limit {
                tail.pop_front();
            }
            tail.push_back(line);
        };

        let mut buf = [0u8; 4096];
        loop {
            match stream.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => {
                    for line in splitter.push(&buf[..n]) {
                        keep(line, &mut tail);
                    }
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(_) => break,
            }
        }
        if let Some(line) = splitter.finish() {
            keep(line, &mut tail);
        }
        tail.into_iter().collect()
    })
}

/// Join a tail reader, tolerating a panicked thread
pub fn join_tail(handle: Option<JoinHandle<Vec<String>>>) -> Vec<String> {
    handle
        .and_then(|h| h.join().ok())
        .unwrap_or_default()
}
