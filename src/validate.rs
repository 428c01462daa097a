//! The GET validation pipeline.
//!
//! Turns the raw tokens of a `GET` command plus catalog/filesystem state
//! into a [`ValidatedRange`] or a categorized rejection. The check order is
//! a contract — clients may depend on the first-applicable message — so the
//! steps below must not be reordered.

use std::fmt;
use std::path::{Path, PathBuf};

use crate::audio::AudioEngine;
use crate::catalog::Catalog;

/// Why a `GET` request was rejected. The Display output is the exact wire
/// error payload.
#[derive(Debug)]
pub enum RequestError {
    FileNotFound(String),
    InvalidTimeFormat,
    NegativeTime,
    FileMissingOnDisk(String),
    AudioReadError(String),
    InvalidRange,
    RangeExceedsDuration { end_sec: f64, duration_sec: f64 },
}

impl fmt::Display for RequestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestError::FileNotFound(name) =>
                write!(f, "file '{}' not found in catalog", name),
            RequestError::InvalidTimeFormat =>
                write!(f, "time parameters must be numbers"),
            RequestError::NegativeTime =>
                write!(f, "time parameters must not be negative"),
            RequestError::FileMissingOnDisk(name) =>
                write!(f, "file '{}' is missing from the audio directory", name),
            RequestError::AudioReadError(reason) =>
                write!(f, "failed to read audio file: {}", reason),
            RequestError::InvalidRange =>
                write!(f, "start time must be less than end time"),
            RequestError::RangeExceedsDuration { end_sec, duration_sec } =>
                write!(f, "end time {} sec exceeds file duration {} sec", end_sec, duration_sec),
        }
    }
}

impl std::error::Error for RequestError {}

/// A fully validated excerpt request. Only [`validate`] constructs one;
/// `start_ms < end_ms <= duration_ms` holds by construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedRange {
    pub path: PathBuf,
    pub start_ms: u64,
    pub end_ms: u64,
}

pub async fn validate(
    filename: &str,
    start: &str,
    end: &str,
    catalog: &Catalog,
    audio_dir: &Path,
    engine: &dyn AudioEngine,
) -> Result<ValidatedRange, RequestError> {
    // 1. Catalog membership, before anything touches the time tokens.
    if catalog.lookup(filename).is_none() {
        return Err(RequestError::FileNotFound(filename.to_string()));
    }

    // 2. Numeric form, then sign.
    let start_sec = parse_seconds(start)?;
    let end_sec = parse_seconds(end)?;
    if start_sec < 0.0 || end_sec < 0.0 {
        return Err(RequestError::NegativeTime);
    }

    // 3. The catalog may be stale; the file has to be there right now.
    let path = audio_dir.join(filename);
    if !path.is_file() {
        return Err(RequestError::FileMissingOnDisk(filename.to_string()));
    }

    // 4. Fresh probe; the rounded catalog duration is never used for bounds.
    let duration_sec = engine
        .probe(&path)
        .await
        .map_err(|err| RequestError::AudioReadError(err.to_string()))?;

    // 5. Range shape against the probed duration.
    if start_sec >= end_sec {
        return Err(RequestError::InvalidRange);
    }
    if end_sec > duration_sec {
        return Err(RequestError::RangeExceedsDuration {
            end_sec,
            duration_sec,
        });
    }

    // 6. Seconds to milliseconds by truncation. A strict seconds ordering
    // can still collapse to the same millisecond.
    let start_ms = (start_sec * 1000.0).floor() as u64;
    let end_ms = (end_sec * 1000.0).floor() as u64;
    if start_ms >= end_ms {
        return Err(RequestError::InvalidRange);
    }

    Ok(ValidatedRange {
        path,
        start_ms,
        end_ms,
    })
}

fn parse_seconds(token: &str) -> Result<f64, RequestError> {
    let value: f64 = token.parse().map_err(|_| RequestError::InvalidTimeFormat)?;
    if !value.is_finite() {
        return Err(RequestError::InvalidTimeFormat);
    }
    Ok(value)
}
