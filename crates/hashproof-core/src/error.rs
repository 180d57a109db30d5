//! Error taxonomy for the proof lifecycle.
//!
//! Errors fall into two [`Severity`] classes:
//! - **fatal** errors (bad descriptor, missing or corrupt artifacts, broken
//!   marshalling contract, failed deployment) abort the whole run;
//! - **request** errors (out-of-range witness values, an unsatisfied relation,
//!   a failed chain call) abort only the request that raised them.
//!
//! A witness that does not satisfy the relation is a legitimate request
//! outcome ("the secret does not hash to the claimed digest"), not a bug.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use crate::artifact::ArtifactKind;
use crate::descriptor::Curve;

/// Boxed codec error returned by artifact (de)serializers.
pub type CodecError = Box<dyn std::error::Error + Send + Sync>;

/// Failures while compiling a descriptor or generating keys.
#[derive(Debug, thiserror::Error)]
pub enum SetupError {
    /// The descriptor cannot be realized as constraints.
    #[error("invalid constraint: {0}")]
    InvalidConstraint(String),
    /// The proving system has no implementation for this curve.
    #[error("curve {0} is not supported by this proving system")]
    UnsupportedCurve(Curve),
    /// Another setup holds the lock for this artifact directory.
    #[error("setup already in progress (lock held at {})", .0.display())]
    InProgress(PathBuf),
    /// Key generation failed inside the proving system.
    #[error("trusted setup failed: {0}")]
    KeyGeneration(String),
    /// The verifier source could not be rendered.
    #[error("verifier export failed: {0}")]
    Export(String),
    /// A setup step was invoked out of order.
    #[error("setup step `{step}` requires phase {required}, current phase is {current}")]
    OutOfOrder {
        /// The step that was attempted.
        step: &'static str,
        /// Phase the step requires.
        required: &'static str,
        /// Phase the orchestrator was in.
        current: &'static str,
    },
}

/// Failures reading or writing persisted artifacts.
#[derive(Debug, thiserror::Error)]
pub enum ArtifactError {
    /// No artifact exists at the given path.
    #[error("artifact missing at {}", path.display())]
    Missing {
        /// Expected location.
        path: PathBuf,
    },
    /// The blob exists but cannot be decoded as the expected artifact.
    #[error("artifact at {} is corrupt: {reason}", path.display())]
    Corrupt {
        /// Location of the blob.
        path: PathBuf,
        /// What failed to decode.
        reason: String,
    },
    /// A setup run holds the lock; the triple may be half rewritten.
    #[error("setup in progress (lock held at {}); retry once it finishes", lock.display())]
    SetupInProgress {
        /// The held lock file.
        lock: PathBuf,
    },
    /// An artifact could not be encoded before writing.
    #[error("failed to encode {kind} artifact: {reason}")]
    Encode {
        /// Kind of artifact being encoded.
        kind: ArtifactKind,
        /// Codec failure.
        reason: String,
    },
    /// Underlying filesystem failure.
    #[error("i/o error on {}: {source}", path.display())]
    Io {
        /// Path involved in the failed operation.
        path: PathBuf,
        /// OS error.
        #[source]
        source: std::io::Error,
    },
}

/// Witness values that cannot be represented as field elements.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WitnessError {
    /// The value is not strictly less than the field modulus.
    #[error("{field} is out of range: value must be strictly less than the field modulus")]
    ValueOutOfRange {
        /// Name of the offending field.
        field: &'static str,
    },
}

/// A chain call that did not produce a verification result.
///
/// Never conflate this with a `false` verification outcome.
#[derive(Debug, thiserror::Error)]
pub enum ChainCallError {
    /// The call reverted.
    #[error("call reverted: {0}")]
    Reverted(String),
    /// The call did not complete in time; its effect is unknown.
    #[error("call timed out after {0:?}")]
    Timeout(Duration),
    /// No contract is deployed at the handle's address.
    #[error("no contract at {0}")]
    UnknownContract(String),
    /// The calldata could not be encoded for the wire.
    #[error("calldata rejected before submission: {0}")]
    InvalidCallData(String),
    /// Transport or backend failure.
    #[error("chain backend failure: {0}")]
    Backend(String),
}

/// A verifier contract could not be deployed.
#[derive(Debug, thiserror::Error)]
pub enum DeploymentError {
    /// The verifier source does not describe a deployable verifier.
    #[error("invalid verifier source: {0}")]
    InvalidSource(String),
    /// The chain refused the deployment.
    #[error("deployment rejected: {0}")]
    Rejected(String),
}

/// Top-level error for every lifecycle stage.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Compilation or key generation failed.
    #[error(transparent)]
    Setup(#[from] SetupError),
    /// Persisted state is missing or corrupt.
    #[error(transparent)]
    Artifact(#[from] ArtifactError),
    /// A witness value is out of the field's range.
    #[error(transparent)]
    Witness(#[from] WitnessError),
    /// The witness does not satisfy the compiled relation.
    #[error("witness does not satisfy the constraint system: {0}")]
    UnsatisfiedConstraint(String),
    /// A value does not fit the target encoding width.
    #[error("{what} needs {bytes} bytes but the encoding width is {width}")]
    EncodingOverflow {
        /// Which value overflowed.
        what: String,
        /// Minimal big-endian length of the value.
        bytes: usize,
        /// Target width in bytes.
        width: usize,
    },
    /// The raw proof stream does not match the declared layout.
    #[error("proof stream is {got} bytes, layout expects {expected}")]
    ProofLengthMismatch {
        /// Byte length implied by the layout.
        expected: usize,
        /// Byte length received.
        got: usize,
    },
    /// The number of public inputs does not match the verifying key.
    #[error("expected {expected} public inputs, got {got}")]
    PublicInputArityMismatch {
        /// Count declared by the verifying key.
        expected: usize,
        /// Count supplied by the caller.
        got: usize,
    },
    /// The chain call failed without a verification result.
    #[error(transparent)]
    ChainCall(#[from] ChainCallError),
    /// The verifier contract could not be deployed.
    #[error(transparent)]
    Deployment(#[from] DeploymentError),
    /// Internal proving-system failure unrelated to the witness.
    #[error("proving system failure: {0}")]
    Backend(String),
}

/// Whether an error ends the run or only the current request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Abort the process; retrying the same request cannot help.
    Fatal,
    /// Reject this request only.
    Request,
}

impl Error {
    /// Classify the error according to the propagation policy.
    #[must_use]
    pub const fn severity(&self) -> Severity {
        match self {
            Self::Witness(_) | Self::UnsatisfiedConstraint(_) | Self::ChainCall(_) => {
                Severity::Request
            }
            Self::Setup(_)
            | Self::Artifact(_)
            | Self::EncodingOverflow { .. }
            | Self::ProofLengthMismatch { .. }
            | Self::PublicInputArityMismatch { .. }
            | Self::Deployment(_)
            | Self::Backend(_) => Severity::Fatal,
        }
    }

    /// Shorthand for `severity() == Severity::Fatal`.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(self.severity(), Severity::Fatal)
    }
}

/// Stage of a single proof request, used to attribute failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Mapping raw values into a witness.
    WitnessBuild,
    /// Proof generation.
    Prove,
    /// Local pre-flight verification.
    LocalVerify,
    /// Proof-to-calldata marshalling.
    Marshal,
    /// Submission to the chain verifier.
    ChainCall,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::WitnessBuild => "witness-build",
            Self::Prove => "prove",
            Self::LocalVerify => "local-verify",
            Self::Marshal => "marshal",
            Self::ChainCall => "chain-call",
        })
    }
}

/// A per-request failure tagged with the stage that raised it.
#[derive(Debug, thiserror::Error)]
#[error("{stage} stage failed: {source}")]
pub struct RequestError {
    /// Stage that failed.
    pub stage: Stage,
    /// Underlying error.
    #[source]
    pub source: Error,
}

impl RequestError {
    /// Attach a stage to an error.
    pub fn at(stage: Stage, source: impl Into<Error>) -> Self {
        Self {
            stage,
            source: source.into(),
        }
    }

    /// Whether the underlying error is fatal for the run.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        self.source.is_fatal()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_level_errors_are_not_fatal() {
        assert!(!Error::UnsatisfiedConstraint("c0".into()).is_fatal());
        assert!(!Error::from(WitnessError::ValueOutOfRange { field: "secret" }).is_fatal());
        assert!(!Error::from(ChainCallError::Timeout(Duration::from_secs(1))).is_fatal());
    }

    #[test]
    fn contract_violations_are_fatal() {
        assert!(Error::PublicInputArityMismatch { expected: 1, got: 2 }.is_fatal());
        assert!(Error::EncodingOverflow {
            what: "a[0]".into(),
            bytes: 33,
            width: 32
        }
        .is_fatal());
        assert!(Error::from(DeploymentError::Rejected("out of gas".into())).is_fatal());
    }

    #[test]
    fn request_error_names_the_stage() {
        let e = RequestError::at(Stage::Prove, Error::UnsatisfiedConstraint("#3".into()));
        let msg = e.to_string();
        assert!(msg.starts_with("prove stage failed"), "{msg}");
        assert!(msg.contains("#3"));
    }
}
