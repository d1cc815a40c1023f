// src/output.rs
use crate::types::{FlexError, Presentation, SearchTarget};
use log::{debug, warn};
use serde::Deserialize;
use std::collections::HashSet;
use std::io::Write;

/// Whether the fetch engine should keep reading the response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkControl {
    Continue,
    Stop,
}

/// Receives the raw response of one query, line by line.
pub trait ResultSink: Send {
    fn accept(&mut self, line: &str) -> Result<SinkControl, FlexError>;

    /// Called once the response is exhausted or the sink asked to stop.
    fn finish(&mut self) -> Result<(), FlexError>;
}

/// One line of the streaming response format.
#[derive(Debug, Deserialize)]
struct StreamLine {
    cond: Option<String>,
    obj: Option<serde_json::Value>,
    msg: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FlexRecord {
    rrname: Option<String>,
    rrtype: Option<String>,
    raw_rdata: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StreamState {
    Open,
    Succeeded,
    Limited,
    Stopped,
}

/// Renders result records to a writer in the selected presentation.
pub struct PresentationSink<W: Write + Send> {
    presentation: Presentation,
    target: SearchTarget,
    limit: Option<u64>,
    written: u64,
    seen: HashSet<String>,
    state: StreamState,
    writer: W,
}

impl<W: Write + Send> PresentationSink<W> {
    /// A limit of zero renders everything.
    pub fn new(presentation: Presentation, target: SearchTarget, limit: Option<u64>, writer: W) -> Self {
        Self {
            presentation,
            target,
            limit: limit.filter(|l| *l > 0),
            written: 0,
            seen: HashSet::new(),
            state: StreamState::Open,
            writer,
        }
    }

    pub fn written(&self) -> u64 {
        self.written
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    fn render(&mut self, obj: &serde_json::Value) -> Result<Option<String>, FlexError> {
        if self.presentation == Presentation::Json {
            return serde_json::to_string(obj)
                .map(Some)
                .map_err(|e| FlexError::OutputError(format!("Failed to serialize JSON: {}", e)));
        }

        let record: FlexRecord = serde_json::from_value(obj.clone())
            .map_err(|e| FlexError::ParseError(format!("{}: {}", e, obj)))?;
        let rrtype = record
            .rrtype
            .ok_or_else(|| FlexError::ParseError(format!("missing rrtype: {}", obj)))?;
        let key = match self.target {
            SearchTarget::Rrnames => record
                .rrname
                .map(|name| format!("rrset/name/{}", name))
                .ok_or_else(|| FlexError::ParseError(format!("missing rrname: {}", obj)))?,
            SearchTarget::Rdata => record
                .raw_rdata
                .map(|raw| format!("rdata/raw/{}", raw))
                .ok_or_else(|| FlexError::ParseError(format!("missing raw_rdata: {}", obj)))?,
        };

        if self.presentation == Presentation::BatchDedup {
            return Ok(self.seen.insert(key.clone()).then_some(key));
        }
        Ok(Some(format!("{}/{}", key, rrtype)))
    }

    fn emit(&mut self, obj: &serde_json::Value) -> Result<SinkControl, FlexError> {
        if let Some(text) = self.render(obj)? {
            writeln!(self.writer, "{}", text)?;
            self.written += 1;
        }
        match self.limit {
            Some(limit) if self.written >= limit => {
                debug!("output limit of {} reached", limit);
                self.state = StreamState::Stopped;
                Ok(SinkControl::Stop)
            }
            _ => Ok(SinkControl::Continue),
        }
    }
}

impl<W: Write + Send> ResultSink for PresentationSink<W> {
    fn accept(&mut self, line: &str) -> Result<SinkControl, FlexError> {
        let line = line.trim();
        if line.is_empty() || self.state != StreamState::Open {
            return Ok(SinkControl::Continue);
        }

        let parsed: StreamLine = serde_json::from_str(line)
            .map_err(|e| FlexError::ParseError(format!("{}: {}", e, line)))?;

        if let Some(obj) = &parsed.obj {
            return self.emit(obj);
        }

        let msg = parsed.msg.as_deref().unwrap_or("");
        match parsed.cond.as_deref() {
            Some("begin") | Some("ongoing") | None => Ok(SinkControl::Continue),
            Some("succeeded") => {
                self.state = StreamState::Succeeded;
                Ok(SinkControl::Continue)
            }
            Some("limited") => {
                warn!("Query limited: {}", msg);
                self.state = StreamState::Limited;
                Ok(SinkControl::Continue)
            }
            Some("failed") => Err(FlexError::NetworkError(format!("Query failed: {}", msg))),
            Some(other) => Err(FlexError::ParseError(format!("unknown stream condition '{}'", other))),
        }
    }

    fn finish(&mut self) -> Result<(), FlexError> {
        self.writer.flush()?;
        match self.state {
            StreamState::Open => Err(FlexError::NetworkError(
                "Data transfer failed -- No stream terminator at end of stream".to_string(),
            )),
            _ => Ok(()),
        }
    }
}
