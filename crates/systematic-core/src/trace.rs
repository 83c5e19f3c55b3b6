use std::fmt;
use std::io::{self, BufRead, Write};

use crate::id::OperationId;
use crate::point::SchedulingPointType;

/// One decision recorded by the scheduler (§3 Schedule trace).
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum TraceEntry {
    Op {
        point: SchedulingPointType,
        op: OperationId,
    },
    Bool(bool),
    Int(u64),
}

impl fmt::Display for TraceEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TraceEntry::Op { point, op } => write!(f, "op {} {}", op.0, point),
            TraceEntry::Bool(value) => write!(f, "bool {}", if *value { 1 } else { 0 }),
            TraceEntry::Int(value) => write!(f, "int {}", value),
        }
    }
}

/// Terminal outcome recorded at the end of a trace file.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum TraceOutcome {
    Ok,
    Bug { kind: String, message: String },
}

impl fmt::Display for TraceOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TraceOutcome::Ok => write!(f, "end ok"),
            TraceOutcome::Bug { kind, message } => write!(f, "end bug:{kind}:{message}"),
        }
    }
}

/// Error produced while parsing a schedule trace file (§6 trace file format).
#[derive(Debug, thiserror::Error)]
pub enum TraceParseError {
    #[error("missing schedule-trace header")]
    MissingHeader,
    #[error("malformed header line: {0:?}")]
    MalformedHeader(String),
    #[error("malformed record line {line}: {text:?}")]
    MalformedRecord { line: usize, text: String },
    #[error("trace is missing a trailing `end` line")]
    MissingTrailer,
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Ordered sequence of scheduling and non-deterministic-choice decisions,
/// bit-exact round-trippable to and from the text format in §6.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ScheduleTrace {
    pub strategy: String,
    pub seed: u64,
    pub entries: Vec<TraceEntry>,
    pub outcome: TraceOutcome,
}

impl ScheduleTrace {
    pub fn new(strategy: impl Into<String>, seed: u64) -> Self {
        ScheduleTrace {
            strategy: strategy.into(),
            seed,
            entries: Vec::new(),
            outcome: TraceOutcome::Ok,
        }
    }

    pub fn push(&mut self, entry: TraceEntry) {
        self.entries.push(entry);
    }

    pub fn steps(&self) -> u64 {
        self.entries.len() as u64
    }

    pub fn write_to<W: Write>(&self, mut out: W) -> io::Result<()> {
        writeln!(
            out,
            "schedule-trace:v1 strategy={} seed={} steps={}",
            self.strategy,
            self.seed,
            self.steps()
        )?;
        for entry in &self.entries {
            writeln!(out, "{entry}")?;
        }
        writeln!(out, "{}", self.outcome)?;
        Ok(())
    }

    pub fn to_text(&self) -> String {
        let mut buf = Vec::new();
        self.write_to(&mut buf).expect("writing to a Vec never fails");
        String::from_utf8(buf).expect("trace text is always UTF-8")
    }

    pub fn read_from<R: BufRead>(reader: R) -> Result<Self, TraceParseError> {
        let mut lines = reader.lines();

        let header = lines
            .next()
            .ok_or(TraceParseError::MissingHeader)??;
        let (strategy, seed) = parse_header(&header)?;

        let mut entries = Vec::new();
        let mut outcome = None;
        for (idx, line) in lines.enumerate() {
            let line = line?;
            if let Some(rest) = line.strip_prefix("end ") {
                outcome = Some(parse_outcome(rest, idx + 2)?);
                break;
            }
            entries.push(parse_record(&line, idx + 2)?);
        }

        let outcome = outcome.ok_or(TraceParseError::MissingTrailer)?;
        Ok(ScheduleTrace {
            strategy,
            seed,
            entries,
            outcome,
        })
    }

    pub fn from_text(text: &str) -> Result<Self, TraceParseError> {
        Self::read_from(io::Cursor::new(text.as_bytes()))
    }
}

fn parse_header(line: &str) -> Result<(String, u64), TraceParseError> {
    let rest = line
        .strip_prefix("schedule-trace:v1 ")
        .ok_or_else(|| TraceParseError::MalformedHeader(line.to_owned()))?;

    let mut strategy = None;
    let mut seed = None;
    for field in rest.split_whitespace() {
        if let Some(value) = field.strip_prefix("strategy=") {
            strategy = Some(value.to_owned());
        } else if let Some(value) = field.strip_prefix("seed=") {
            seed = Some(
                value
                    .parse()
                    .map_err(|_| TraceParseError::MalformedHeader(line.to_owned()))?,
            );
        }
        // `steps=` is informational only; the real count is entries.len().
    }

    match (strategy, seed) {
        (Some(strategy), Some(seed)) => Ok((strategy, seed)),
        _ => Err(TraceParseError::MalformedHeader(line.to_owned())),
    }
}

fn parse_record(line: &str, line_no: usize) -> Result<TraceEntry, TraceParseError> {
    let mut parts = line.splitn(3, ' ');
    let malformed = || TraceParseError::MalformedRecord {
        line: line_no,
        text: line.to_owned(),
    };

    match parts.next() {
        Some("op") => {
            let id = parts.next().ok_or_else(malformed)?;
            let tag = parts.next().ok_or_else(malformed)?;
            let op = OperationId(id.parse().map_err(|_| malformed())?);
            let point = tag.parse().map_err(|_| malformed())?;
            Ok(TraceEntry::Op { point, op })
        }
        Some("bool") => {
            let value = parts.next().ok_or_else(malformed)?;
            match value {
                "0" => Ok(TraceEntry::Bool(false)),
                "1" => Ok(TraceEntry::Bool(true)),
                _ => Err(malformed()),
            }
        }
        Some("int") => {
            let value = parts.next().ok_or_else(malformed)?;
            Ok(TraceEntry::Int(value.parse().map_err(|_| malformed())?))
        }
        _ => Err(malformed()),
    }
}

fn parse_outcome(rest: &str, line_no: usize) -> Result<TraceOutcome, TraceParseError> {
    if rest == "ok" {
        return Ok(TraceOutcome::Ok);
    }
    if let Some(body) = rest.strip_prefix("bug:") {
        let (kind, message) = body.split_once(':').ok_or_else(|| TraceParseError::MalformedRecord {
            line: line_no,
            text: format!("end {rest}"),
        })?;
        return Ok(TraceOutcome::Bug {
            kind: kind.to_owned(),
            message: message.to_owned(),
        });
    }
    Err(TraceParseError::MalformedRecord {
        line: line_no,
        text: format!("end {rest}"),
    })
}
