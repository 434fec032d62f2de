//! # Error Types
//!
//! Fatal errors raised before (or while persisting) an ensemble run, and the
//! recoverable per-call failure reported by individual clusterers.

/**
 * File: /src/error.rs
 * Created Date: Tuesday, March 10th 2026
 * Author: Zihan
 * -----
 * HISTORY:
 * Date      		By   	Comments
 * ----------		------	---------------------------------------------------------
 * 2026-03-10		Zihan	Split configuration errors from per-repetition failures
 */
use std::error::Error;
use std::fmt;

/// Errors that abort an ensemble run. Every variant except `Io` and
/// `Serialization` is raised before any clustering work starts.
#[derive(Debug)]
pub enum EnsembleError {
    /// Invalid cluster counts, proportion, repetitions, data shape...
    InvalidConfiguration(String),
    /// Algorithm name that no family knows about
    UnknownAlgorithm(String),
    /// Distance name that is neither built-in nor registered
    UnknownDistance(String),
    /// Partial distance name matching several built-in metrics
    AmbiguousDistance { spec: String, candidates: Vec<String> },
    /// NMF objective that is not implemented
    UnknownNmfMethod(String),
    Io(std::io::Error),
    Serialization(String),
}

impl fmt::Display for EnsembleError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            EnsembleError::InvalidConfiguration(msg) => {
                write!(f, "Invalid configuration: {}", msg)
            }
            EnsembleError::UnknownAlgorithm(name) => {
                write!(f, "Unknown clustering algorithm: '{}'", name)
            }
            EnsembleError::UnknownDistance(name) => {
                write!(f, "Unknown distance: '{}' is neither built-in nor registered", name)
            }
            EnsembleError::AmbiguousDistance { spec, candidates } => write!(
                f,
                "Ambiguous distance '{}': matches {}",
                spec,
                candidates.join(", ")
            ),
            EnsembleError::UnknownNmfMethod(name) => write!(f, "Unknown NMF method: '{}'", name),
            EnsembleError::Io(e) => write!(f, "I/O error: {}", e),
            EnsembleError::Serialization(msg) => write!(f, "Serialization error: {}", msg),
        }
    }
}

impl Error for EnsembleError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            EnsembleError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for EnsembleError {
    fn from(e: std::io::Error) -> Self {
        EnsembleError::Io(e)
    }
}

impl From<serde_json::Error> for EnsembleError {
    fn from(e: serde_json::Error) -> Self {
        EnsembleError::Serialization(e.to_string())
    }
}

/// A single clustering call that did not produce a partition.
///
/// The driver turns this into an all-missing cell and a warning record; it
/// never aborts the run.
#[derive(Debug, Clone, PartialEq)]
pub struct ClusteringFailure {
    pub algorithm: String,
    pub reason: String,
}

impl ClusteringFailure {
    pub fn new(algorithm: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            algorithm: algorithm.into(),
            reason: reason.into(),
        }
    }

    /// Wrap any error coming out of a back-end library
    pub fn from_error(algorithm: impl Into<String>, err: impl fmt::Display) -> Self {
        Self::new(algorithm, err.to_string())
    }
}

impl fmt::Display for ClusteringFailure {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} failed: {}", self.algorithm, self.reason)
    }
}

impl Error for ClusteringFailure {}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let error = EnsembleError::UnknownAlgorithm("foo".to_string());
        assert!(error.to_string().contains("foo"));

        let error = EnsembleError::AmbiguousDistance {
            spec: "m".to_string(),
            candidates: vec!["maximum".to_string(), "manhattan".to_string()],
        };
        assert_eq!(
            error.to_string(),
            "Ambiguous distance 'm': matches maximum, manhattan"
        );
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let error: EnsembleError = io.into();
        match error {
            EnsembleError::Io(_) => assert!(error.source().is_some()),
            _ => panic!("Expected Io variant"),
        }
    }

    #[test]
    fn test_clustering_failure_display() {
        let failure = ClusteringFailure::new("pam", "fewer rows than clusters");
        assert_eq!(failure.to_string(), "pam failed: fewer rows than clusters");
    }
}
