//! Destinations for report lines and searching status lines

use async_trait::async_trait;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::warn;

use crate::error::Result;

/// Consumer of the acquisition loop's output
#[async_trait]
pub trait ReportSink: Send {
    /// One JSON telemetry report (no trailing newline)
    async fn emit_report(&mut self, line: &str) -> Result<()>;

    /// One `Searching ...` diagnostic line (no trailing newline)
    async fn emit_status(&mut self, line: &str) -> Result<()>;
}

/// Writes both kinds of lines to any async writer (stdout by default)
pub struct LineSink<W = tokio::io::Stdout> {
    writer: W,
}

impl LineSink {
    pub fn stdout() -> Self {
        Self::new(tokio::io::stdout())
    }
}

impl<W: AsyncWrite + Unpin + Send> LineSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    async fn write_line(&mut self, line: &str) -> Result<()> {
        self.writer.write_all(line.as_bytes()).await?;
        self.writer.write_all(b"\n").await?;
        self.writer.flush().await?;
        Ok(())
    }
}

#[async_trait]
impl<W: AsyncWrite + Unpin + Send> ReportSink for LineSink<W> {
    async fn emit_report(&mut self, line: &str) -> Result<()> {
        self.write_line(line).await
    }

    async fn emit_status(&mut self, line: &str) -> Result<()> {
        self.write_line(line).await
    }
}

/// Forwards every line to several sinks
///
/// A failing sink is logged and skipped so the others still get the line.
#[derive(Default)]
pub struct FanoutSink {
    sinks: Vec<Box<dyn ReportSink>>,
}

impl FanoutSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, sink: Box<dyn ReportSink>) {
        self.sinks.push(sink);
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

#[async_trait]
impl ReportSink for FanoutSink {
    async fn emit_report(&mut self, line: &str) -> Result<()> {
        for sink in self.sinks.iter_mut() {
            if let Err(e) = sink.emit_report(line).await {
                warn!("Report sink failed: {}", e);
            }
        }
        Ok(())
    }

    async fn emit_status(&mut self, line: &str) -> Result<()> {
        for sink in self.sinks.iter_mut() {
            if let Err(e) = sink.emit_status(line).await {
                warn!("Status sink failed: {}", e);
            }
        }
        Ok(())
    }
}
