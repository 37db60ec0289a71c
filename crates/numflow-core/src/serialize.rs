//! Binary snapshots of simulation reports.
//!
//! Reports are encoded with `bitcode` behind a small versioned header so a
//! stored report can be rejected cleanly if the format moves on. Two runs of
//! the same stage must encode to identical bytes; the determinism checks in
//! [`validation`](crate::validation) rely on this.

use crate::report::SimulationReport;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Magic number identifying an encoded simulation report.
pub const REPORT_MAGIC: u32 = 0x4E46_0001;

/// Current format version. Increment when breaking the wire format.
pub const FORMAT_VERSION: u32 = 1;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum SerializeError {
    #[error("bitcode encoding failed: {0}")]
    Encode(String),
}

#[derive(Debug, thiserror::Error)]
pub enum DeserializeError {
    #[error("invalid magic number: expected 0x{:08X}, got 0x{:08X}", REPORT_MAGIC, .0)]
    InvalidMagic(u32),
    #[error("unsupported format version: expected {}, got {}", FORMAT_VERSION, .0)]
    UnsupportedVersion(u32),
    #[error("report from future version {0} (this build supports up to {FORMAT_VERSION})")]
    FutureVersion(u32),
    #[error("bitcode decoding failed: {0}")]
    Decode(String),
}

// ---------------------------------------------------------------------------
// Header
// ---------------------------------------------------------------------------

/// Header prepended to every encoded report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportHeader {
    pub magic: u32,
    pub version: u32,
    /// Steps executed by the run, readable without walking the log.
    pub steps: u32,
}

impl ReportHeader {
    pub fn new(steps: u32) -> Self {
        Self {
            magic: REPORT_MAGIC,
            version: FORMAT_VERSION,
            steps,
        }
    }

    pub fn validate(&self) -> Result<(), DeserializeError> {
        if self.magic != REPORT_MAGIC {
            return Err(DeserializeError::InvalidMagic(self.magic));
        }
        if self.version > FORMAT_VERSION {
            return Err(DeserializeError::FutureVersion(self.version));
        }
        if self.version < FORMAT_VERSION {
            return Err(DeserializeError::UnsupportedVersion(self.version));
        }
        Ok(())
    }
}

#[derive(Serialize)]
struct ReportSnapshotRef<'a> {
    header: ReportHeader,
    report: &'a SimulationReport,
}

#[derive(Deserialize)]
struct ReportSnapshot {
    header: ReportHeader,
    report: SimulationReport,
}

/// Read the header of an encoded report without validating it.
///
/// bitcode has no partial decoding, so this decodes the whole payload.
pub fn read_report_header(data: &[u8]) -> Result<ReportHeader, DeserializeError> {
    let snapshot: ReportSnapshot =
        bitcode::deserialize(data).map_err(|e| DeserializeError::Decode(e.to_string()))?;
    Ok(snapshot.header)
}

// ---------------------------------------------------------------------------
// Report encoding
// ---------------------------------------------------------------------------

impl SimulationReport {
    pub fn encode(&self) -> Result<Vec<u8>, SerializeError> {
        let snapshot = ReportSnapshotRef {
            header: ReportHeader::new(self.steps),
            report: self,
        };
        bitcode::serialize(&snapshot).map_err(|e| SerializeError::Encode(e.to_string()))
    }

    /// Decode a report, rejecting foreign data and other format versions.
    pub fn decode(data: &[u8]) -> Result<Self, DeserializeError> {
        let snapshot: ReportSnapshot =
            bitcode::deserialize(data).map_err(|e| DeserializeError::Decode(e.to_string()))?;
        snapshot.header.validate()?;
        Ok(snapshot.report)
    }
}
