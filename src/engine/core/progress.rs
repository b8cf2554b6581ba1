use serde::Serialize;
use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Structured progress of a running job.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressEvent {
    pub frame: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_frames: Option<u64>,
    pub fps: f64,
    /// Seconds remaining, 0 when it cannot be estimated
    pub eta: f64,
}

impl ProgressEvent {
    pub fn new(frame: u64, total_frames: Option<u64>, fps: f64) -> Self {
        let eta = match total_frames {
            Some(total) if fps > 0.0 && total > frame => (total - frame) as f64 / fps,
            _ => 0.0,
        };
        Self {
            frame,
            total_frames,
            fps,
            eta,
        }
    }
}

/// One line of frame engine diagnostics, classified.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineLine {
    /// `Frame: N/T (F fps)` from `vspipe -p`
    Progress {
        frame: u64,
        total: Option<u64>,
        fps: Option<f64>,
    },
    /// `INPUT_INFO:frames=…,fps_num=…,fps_den=…` printed by the generated script
    InputInfo {
        frames: u64,
        fps_num: Option<u64>,
        fps_den: Option<u64>,
    },
    /// `Output N frames in S seconds (F fps)`, printed once at the end
    Finished { frames: u64, fps: Option<f64> },
    Other(String),
}

pub fn parse_engine_line(line: &str) -> EngineLine {
    let trimmed = line.trim();
    parse_progress(trimmed)
        .or_else(|| parse_input_info(trimmed))
        .or_else(|| parse_finished(trimmed))
        .unwrap_or_else(|| EngineLine::Other(trimmed.to_string()))
}

fn parse_progress(line: &str) -> Option<EngineLine> {
    let head = line.get(..5)?;
    if !head.eq_ignore_ascii_case("frame") {
        return None;
    }
    let rest = line[5..].trim_start();
    let rest = rest.strip_prefix(':').unwrap_or(rest).trim_start();

    let (counts, tail) = match rest.find('(') {
        Some(idx) => (rest[..idx].trim(), Some(&rest[idx + 1..])),
        None => (rest.trim(), None),
    };
    let (frame, total) = match counts.split_once('/') {
        Some((frame, total)) => (frame.trim().parse().ok()?, Some(total.trim().parse().ok()?)),
        None => (counts.parse().ok()?, None),
    };
    let fps = tail.and_then(parse_fps);

    Some(EngineLine::Progress { frame, total, fps })
}

/// `45.67 fps)` -> 45.67
fn parse_fps(text: &str) -> Option<f64> {
    let text = text.trim_end_matches(')').trim();
    let number = text.split_whitespace().next()?;
    number.parse().ok()
}

fn parse_input_info(line: &str) -> Option<EngineLine> {
    let body = line.strip_prefix("INPUT_INFO:")?;
    let mut frames = None;
    let mut fps_num = None;
    let mut fps_den = None;
    for part in body.split(',') {
        if let Some((key, value)) = part.split_once('=') {
            let value = value.trim().parse::<u64>().ok();
            match key.trim() {
                "frames" => frames = value,
                "fps_num" => fps_num = value,
                "fps_den" => fps_den = value,
                _ => {}
            }
        }
    }
    Some(EngineLine::InputInfo {
        frames: frames?,
        fps_num,
        fps_den,
    })
}

fn parse_finished(line: &str) -> Option<EngineLine> {
    let rest = line.strip_prefix("Output ")?;
    let (count, rest) = rest.split_once(' ')?;
    if !rest.starts_with("frames") {
        return None;
    }
    let frames = count.parse().ok()?;
    let fps = rest.find('(').and_then(|idx| parse_fps(&rest[idx + 1..]));
    Some(EngineLine::Finished { frames, fps })
}

/// What the orchestrator should do with a parsed line
#[derive(Debug, Clone, PartialEq)]
pub enum LineOutcome {
    Progress(ProgressEvent),
    Log(String),
    /// Consumed internally (frame count announcements)
    Silent,
}

/// Tracks frame engine state across its diagnostic stream.
#[derive(Debug, Clone)]
pub struct ProgressParser {
    pub frame: u64,
    pub fps: f64,
    engine_total: Option<u64>,
    script_total: Option<u64>,
    hint_total: Option<u64>,
    pub final_frames: Option<u64>,
    tail: VecDeque<String>,
    tail_limit: usize,
    saw_progress: bool,
}

impl ProgressParser {
    pub fn new(hint_total: Option<u64>, tail_limit: usize) -> Self {
        Self {
            frame: 0,
            fps: 0.0,
            engine_total: None,
            script_total: None,
            hint_total,
            final_frames: None,
            tail: VecDeque::with_capacity(tail_limit),
            tail_limit,
            saw_progress: false,
        }
    }

    /// Total output frames: engine report, then script report, then the caller's hint
    pub fn total_frames(&self) -> Option<u64> {
        self.engine_total.or(self.script_total).or(self.hint_total)
    }

    /// Parse a single line of frame engine diagnostics
    pub fn parse_line(&mut self, line: &str) -> LineOutcome {
        match parse_engine_line(line) {
            EngineLine::Progress { frame, total, fps } => {
                self.frame = frame;
                self.saw_progress = true;
                if total.is_some() {
                    self.engine_total = total;
                }
                if let Some(fps) = fps {
                    self.fps = fps;
                }
                LineOutcome::Progress(self.current())
            }
            EngineLine::InputInfo { frames, .. } => {
                self.script_total = Some(frames);
                LineOutcome::Silent
            }
            EngineLine::Finished { frames, fps } => {
                self.final_frames = Some(frames);
                self.frame = frames;
                self.saw_progress = true;
                if let Some(fps) = fps {
                    self.fps = fps;
                }
                LineOutcome::Progress(self.current())
            }
            EngineLine::Other(text) => {
                if text.is_empty() {
                    return LineOutcome::Silent;
                }
                self.push_tail(&text);
                LineOutcome::Log(text)
            }
        }
    }

    pub fn current(&self) -> ProgressEvent {
        ProgressEvent::new(self.frame, self.total_frames(), self.fps)
    }

    /// Last frame the engine reported, final count preferred
    pub fn last_frame(&self) -> Option<u64> {
        if self.saw_progress {
            Some(self.final_frames.unwrap_or(self.frame))
        } else {
            None
        }
    }

    /// Whether the reported progress accounts for every expected frame.
    ///
    /// With no known total, any clean finish counts as complete.
    pub fn is_complete(&self) -> bool {
        match self.total_frames() {
            None => true,
            Some(total) => self.last_frame() == Some(total),
        }
    }

    fn push_tail(&mut self, line: &str) {
        if self.tail_limit == 0 {
            return;
        }
        if self.tail.len() == self.tail_limit {
            self.tail.pop_front();
        }
        self.tail.push_back(line.to_string());
    }

    /// Most recent diagnostic lines, oldest first
    pub fn tail(&self) -> Vec<String> {
        self.tail.iter().cloned().collect()
    }
}

/// Rate limiter for progress events; the newest held-back event is kept
/// so it can be flushed at the end.
#[derive(Debug)]
pub struct ProgressThrottle {
    interval: Duration,
    last_emit: Option<Instant>,
    pending: Option<ProgressEvent>,
}

impl ProgressThrottle {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_emit: None,
            pending: None,
        }
    }

    /// Returns the event if it may be emitted now
    pub fn offer(&mut self, event: ProgressEvent, now: Instant) -> Option<ProgressEvent> {
        let due = match self.last_emit {
            None => true,
            Some(last) => now.duration_since(last) >= self.interval,
        };
        if due {
            self.last_emit = Some(now);
            self.pending = None;
            Some(event)
        } else {
            self.pending = Some(event);
            None
        }
    }

    /// Held-back event, if any
    pub fn flush(&mut self) -> Option<ProgressEvent> {
        self.pending.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_vspipe_progress_line() {
        assert_eq!(
            parse_engine_line("Frame: 123/1000 (45.67 fps)"),
            EngineLine::Progress {
                frame: 123,
                total: Some(1000),
                fps: Some(45.67)
            }
        );
    }

    #[test]
    fn test_parse_progress_variants() {
        assert_eq!(
            parse_engine_line("frame 5/10 (2 fps)\r"),
            EngineLine::Progress {
                frame: 5,
                total: Some(10),
                fps: Some(2.0)
            }
        );
        assert_eq!(
            parse_engine_line("FRAME:7/9"),
            EngineLine::Progress {
                frame: 7,
                total: Some(9),
                fps: None
            }
        );
        assert!(matches!(
            parse_engine_line("frames are great"),
            EngineLine::Other(_)
        ));
        assert!(matches!(parse_engine_line("Frame: x/10"), EngineLine::Other(_)));
    }

    #[test]
    fn test_parse_input_info() {
        assert_eq!(
            parse_engine_line("INPUT_INFO:frames=1234,fps_num=30000,fps_den=1001"),
            EngineLine::InputInfo {
                frames: 1234,
                fps_num: Some(30000),
                fps_den: Some(1001)
            }
        );
        assert!(matches!(
            parse_engine_line("INPUT_INFO:fps_num=25"),
            EngineLine::Other(_)
        ));
    }

    #[test]
    fn test_parse_finished_line() {
        assert_eq!(
            parse_engine_line("Output 1000 frames in 22.02 seconds (45.41 fps)"),
            EngineLine::Finished {
                frames: 1000,
                fps: Some(45.41)
            }
        );
    }

    #[test]
    fn test_eta_calculation() {
        let event = ProgressEvent::new(100, Some(400), 50.0);
        assert_eq!(event.eta, 6.0);

        assert_eq!(ProgressEvent::new(100, None, 50.0).eta, 0.0);
        assert_eq!(ProgressEvent::new(100, Some(400), 0.0).eta, 0.0);
    }

    #[test]
    fn test_parser_totals_precedence() {
        let mut parser = ProgressParser::new(Some(50), 20);
        assert_eq!(parser.total_frames(), Some(50));

        assert_eq!(
            parser.parse_line("INPUT_INFO:frames=100,fps_num=25,fps_den=1"),
            LineOutcome::Silent
        );
        assert_eq!(parser.total_frames(), Some(100));

        parser.parse_line("Frame: 10/120 (5.0 fps)");
        assert_eq!(parser.total_frames(), Some(120));
    }

    #[test]
    fn test_parser_completion() {
        let mut parser = ProgressParser::new(None, 20);
        assert!(parser.is_complete());
        assert_eq!(parser.last_frame(), None);

        parser.parse_line("Frame: 5/10 (1.0 fps)");
        assert!(!parser.is_complete());

        parser.parse_line("Frame: 10/10 (1.0 fps)");
        assert!(parser.is_complete());
    }

    #[test]
    fn test_final_count_completes() {
        let mut parser = ProgressParser::new(Some(10), 20);
        parser.parse_line("Frame: 9/10 (3.0 fps)");
        let outcome = parser.parse_line("Output 10 frames in 3.3 seconds (3.0 fps)");
        assert!(matches!(outcome, LineOutcome::Progress(e) if e.frame == 10));
        assert!(parser.is_complete());
    }

    #[test]
    fn test_unrecognised_lines_forwarded_and_tailed() {
        let mut parser = ProgressParser::new(None, 2);
        assert_eq!(
            parser.parse_line("Script evaluation failed:"),
            LineOutcome::Log("Script evaluation failed:".into())
        );
        parser.parse_line("Python exception: No attribute with the name ffms2 exists");
        parser.parse_line("Traceback (most recent call last):");
        assert_eq!(parser.parse_line("   "), LineOutcome::Silent);
        assert_eq!(
            parser.tail(),
            vec![
                "Python exception: No attribute with the name ffms2 exists".to_string(),
                "Traceback (most recent call last):".to_string(),
            ]
        );
    }

    #[test]
    fn test_throttle_holds_and_flushes_latest() {
        let start = Instant::now();
        let mut throttle = ProgressThrottle::new(Duration::from_millis(500));
        let e1 = ProgressEvent::new(1, Some(10), 1.0);
        let e2 = ProgressEvent::new(2, Some(10), 1.0);
        let e3 = ProgressEvent::new(3, Some(10), 1.0);

        assert_eq!(throttle.offer(e1, start), Some(e1));
        assert_eq!(throttle.offer(e2, start + Duration::from_millis(100)), None);
        assert_eq!(throttle.offer(e3, start + Duration::from_millis(200)), None);
        assert_eq!(throttle.flush(), Some(e3));
        assert_eq!(throttle.flush(), None);

        let e4 = ProgressEvent::new(4, Some(10), 1.0);
        assert_eq!(
            throttle.offer(e4, start + Duration::from_millis(600)),
            Some(e4)
        );
    }

    #[test]
    fn test_progress_event_json() {
        let json = serde_json::to_string(&ProgressEvent::new(5, Some(10), 5.0)).unwrap();
        assert_eq!(json, r#"{"frame":5,"totalFrames":10,"fps":5.0,"eta":1.0}"#);
    }
}
