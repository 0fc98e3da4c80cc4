//! Render progress events and the terminal plumbing that displays them.
//!
//! Rendering reports through a [`ProgressSink`]; the CLI draws an indicatif
//! bar, the job layer forwards events over a channel. Log lines are routed
//! through the shared `MultiProgress` so bars stay pinned.

use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};
use serde::{Deserialize, Serialize};
use std::io::{self, Write};
use std::sync::OnceLock;
use tokio::sync::mpsc::UnboundedSender;
use tracing_subscriber::fmt::MakeWriter;

/// Checkpoints of a render, in the order they are reached
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProgressStage {
    Fetching,
    Processing,
    Formatting,
    Rendering,
    Complete,
}

impl ProgressStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProgressStage::Fetching => "fetching",
            ProgressStage::Processing => "processing",
            ProgressStage::Formatting => "formatting",
            ProgressStage::Rendering => "rendering",
            ProgressStage::Complete => "complete",
        }
    }
}

impl std::fmt::Display for ProgressStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One progress notification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderProgress {
    pub stage: ProgressStage,
    pub percent: u8,
    pub current_chapter: Option<usize>,
    pub total_chapters: Option<usize>,
}

impl RenderProgress {
    pub fn at(stage: ProgressStage, percent: u8) -> Self {
        Self {
            stage,
            percent,
            current_chapter: None,
            total_chapters: None,
        }
    }

    /// Rendering checkpoint for chapter `index` (0-based) of `total`.
    ///
    /// Interpolates 50..90.
    pub fn rendering(index: usize, total: usize) -> Self {
        let total_nonzero = total.max(1);
        let percent = 50 + (40 * index.min(total_nonzero) / total_nonzero) as u8;
        Self {
            stage: ProgressStage::Rendering,
            percent,
            current_chapter: Some(index + 1),
            total_chapters: Some(total),
        }
    }
}

/// Receiver of progress notifications
pub trait ProgressSink {
    fn report(&mut self, progress: RenderProgress);
}

impl<F> ProgressSink for F
where
    F: FnMut(RenderProgress),
{
    fn report(&mut self, progress: RenderProgress) {
        self(progress)
    }
}

impl ProgressSink for UnboundedSender<RenderProgress> {
    fn report(&mut self, progress: RenderProgress) {
        // Receiver gone means nobody is listening any more
        let _ = self.send(progress);
    }
}

/// Sink that discards everything
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn report(&mut self, _progress: RenderProgress) {}
}

static MULTI_PROGRESS: OnceLock<MultiProgress> = OnceLock::new();

fn multi_progress() -> &'static MultiProgress {
    MULTI_PROGRESS.get_or_init(|| {
        let mp = MultiProgress::new();
        mp.set_draw_target(ProgressDrawTarget::stderr_with_hz(10));
        mp
    })
}

pub fn add_progress_bar(len: u64) -> ProgressBar {
    multi_progress().add(ProgressBar::new(len))
}

/// Percentage bar for a CLI export
pub struct BarProgress {
    bar: ProgressBar,
}

impl BarProgress {
    pub fn new(label: &str) -> Self {
        let bar = add_progress_bar(100);
        if let Ok(style) =
            ProgressStyle::with_template("{prefix} [{bar:40.cyan/blue}] {pos:>3}% {msg}")
        {
            bar.set_style(style.progress_chars("=> "));
        }
        bar.set_prefix(label.to_string());
        Self { bar }
    }

    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl ProgressSink for BarProgress {
    fn report(&mut self, progress: RenderProgress) {
        self.bar.set_position(progress.percent as u64);
        let message = match (progress.current_chapter, progress.total_chapters) {
            (Some(current), Some(total)) => format!("{} {}/{}", progress.stage, current, total),
            _ => progress.stage.to_string(),
        };
        self.bar.set_message(message);
    }
}

#[derive(Default, Clone)]
pub struct LogWriterFactory;

pub struct LogWriter {
    buffer: String,
}

impl LogWriter {
    fn new() -> Self {
        Self {
            buffer: String::new(),
        }
    }

    fn emit(line: &str) {
        let _ = multi_progress().println(line.trim_end_matches('\r').to_string());
    }
}

impl Write for LogWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buffer.push_str(&String::from_utf8_lossy(buf));

        while let Some(idx) = self.buffer.find('\n') {
            Self::emit(&self.buffer[..idx]);
            self.buffer.drain(..idx + 1);
        }

        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        if !self.buffer.is_empty() {
            Self::emit(self.buffer.trim_end_matches('\n'));
            self.buffer.clear();
        }
        Ok(())
    }
}

impl Drop for LogWriter {
    fn drop(&mut self) {
        let _ = self.flush();
    }
}

impl<'a> MakeWriter<'a> for LogWriterFactory {
    type Writer = LogWriter;

    fn make_writer(&'a self) -> Self::Writer {
        LogWriter::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rendering_interpolation() {
        assert_eq!(RenderProgress::rendering(0, 4).percent, 50);
        assert_eq!(RenderProgress::rendering(2, 4).percent, 70);
        assert_eq!(RenderProgress::rendering(4, 4).percent, 90);
        assert_eq!(RenderProgress::rendering(0, 0).percent, 50);

        let p = RenderProgress::rendering(1, 3);
        assert_eq!(p.current_chapter, Some(2));
        assert_eq!(p.total_chapters, Some(3));
    }

    #[test]
    fn test_closure_sink() {
        let mut seen = Vec::new();
        {
            let mut sink = |p: RenderProgress| seen.push(p.stage);
            sink.report(RenderProgress::at(ProgressStage::Fetching, 0));
            sink.report(RenderProgress::at(ProgressStage::Complete, 100));
        }
        assert_eq!(seen, vec![ProgressStage::Fetching, ProgressStage::Complete]);
    }

    #[tokio::test]
    async fn test_channel_sink() {
        let (mut tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        tx.report(RenderProgress::at(ProgressStage::Processing, 20));
        drop(tx);
        let got = rx.recv().await.unwrap();
        assert_eq!(got.percent, 20);
        assert!(rx.recv().await.is_none());
    }

    #[test]
    fn test_stage_order() {
        assert!(ProgressStage::Fetching < ProgressStage::Rendering);
        assert_eq!(
            serde_json::to_string(&ProgressStage::Formatting).unwrap(),
            "\"formatting\""
        );
    }
}
