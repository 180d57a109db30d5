//! Artifact store for the constraint-system / proving-key / verifying-key
//! triple and the exported verifier source.
//!
//! Lifecycle state is queried explicitly through [`ArtifactStore::status`]
//! instead of being inferred from a single file's existence. Setup is made
//! single-flight with an advisory lock on `.setup.lock` ([`SetupLock`]). The
//! kernel drops the lock when the holder exits, so a crashed setup never
//! blocks the next one; the file itself stays behind and only records the
//! last holder's pid.

use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::io::{self, ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::artifact::{Artifact, ArtifactKind, Envelope};
use crate::descriptor::Curve;
use crate::error::{ArtifactError, SetupError};
use crate::io::write_atomic;

const LOCK_FILE: &str = ".setup.lock";

/// Fixed locations of the persisted artifacts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    /// Directory holding every artifact (and the setup lock).
    pub dir: PathBuf,
    /// Compiled constraint system.
    pub constraint_system: PathBuf,
    /// Proving key.
    pub proving_key: PathBuf,
    /// Verifying key.
    pub verifying_key: PathBuf,
    /// Exported verifier contract source.
    pub verifier_source: PathBuf,
}

impl ArtifactPaths {
    /// `<dir>/<stem>.r1cs`, `<stem>.pk`, `<stem>.vk`, `<stem>_verifier.sol`.
    #[must_use]
    pub fn in_dir(dir: impl Into<PathBuf>, stem: &str) -> Self {
        let dir = dir.into();
        Self {
            constraint_system: dir.join(format!("{stem}.r1cs")),
            proving_key: dir.join(format!("{stem}.pk")),
            verifying_key: dir.join(format!("{stem}.vk")),
            verifier_source: dir.join(format!("{stem}_verifier.sol")),
            dir,
        }
    }

    /// Path of the triple member of the given kind.
    #[must_use]
    pub fn for_kind(&self, kind: ArtifactKind) -> &Path {
        match kind {
            ArtifactKind::ConstraintSystem => &self.constraint_system,
            ArtifactKind::ProvingKey => &self.proving_key,
            ArtifactKind::VerifyingKey => &self.verifying_key,
        }
    }
}

/// State of the persisted triple.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreStatus {
    /// No artifact has been written yet; setup has to run.
    Absent,
    /// Something is present but unusable (partial triple or bad blob).
    Corrupt {
        /// The first offending path.
        path: PathBuf,
        /// What is wrong with it.
        reason: String,
    },
    /// All three artifacts are present with valid envelopes.
    Ready,
    /// A setup run holds the lock and may be rewriting the triple.
    SetupInProgress {
        /// The held lock file.
        lock: PathBuf,
    },
}

impl StoreStatus {
    /// Whether the triple can be loaded.
    #[must_use]
    pub const fn is_ready(&self) -> bool {
        matches!(self, Self::Ready)
    }
}

/// Reads and writes enveloped artifacts for one curve.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    paths: ArtifactPaths,
    curve: Curve,
}

const TRIPLE: [ArtifactKind; 3] = [
    ArtifactKind::ConstraintSystem,
    ArtifactKind::ProvingKey,
    ArtifactKind::VerifyingKey,
];

impl ArtifactStore {
    /// Store rooted at `paths`, holding artifacts for `curve`.
    #[must_use]
    pub const fn new(paths: ArtifactPaths, curve: Curve) -> Self {
        Self { paths, curve }
    }

    /// Artifact locations.
    #[must_use]
    pub const fn paths(&self) -> &ArtifactPaths {
        &self.paths
    }

    /// Curve this store expects.
    #[must_use]
    pub const fn curve(&self) -> Curve {
        self.curve
    }

    /// Envelope and atomically write `artifact` to `path`.
    pub fn save<A: Artifact>(&self, artifact: &A, path: &Path) -> Result<(), ArtifactError> {
        let encode = |e: crate::error::CodecError| ArtifactError::Encode {
            kind: A::KIND,
            reason: e.to_string(),
        };
        let bytes = Envelope::of(artifact)
            .map_err(encode)?
            .to_bytes()
            .map_err(encode)?;
        write_atomic(path, &bytes).map_err(|source| ArtifactError::Io {
            path: path.to_owned(),
            source,
        })?;
        debug!(kind = %A::KIND, path = %path.display(), bytes = bytes.len(), "artifact saved");
        Ok(())
    }

    /// Load and decode an artifact from `path`.
    pub fn load<A: Artifact>(&self, path: &Path) -> Result<A, ArtifactError> {
        let env = self.open_envelope(A::KIND, path)?;
        env.decode::<A>().map_err(|reason| ArtifactError::Corrupt {
            path: path.to_owned(),
            reason,
        })
    }

    /// Save the triple member `A` at its fixed path.
    pub fn save_artifact<A: Artifact>(&self, artifact: &A) -> Result<(), ArtifactError> {
        self.save(artifact, self.paths.for_kind(A::KIND))
    }

    /// Load the triple member `A` from its fixed path.
    pub fn load_artifact<A: Artifact>(&self) -> Result<A, ArtifactError> {
        self.load(self.paths.for_kind(A::KIND))
    }

    /// Atomically write the exported verifier source.
    pub fn save_verifier_source(&self, source: &str) -> Result<(), ArtifactError> {
        let path = &self.paths.verifier_source;
        write_atomic(path, source.as_bytes()).map_err(|source| ArtifactError::Io {
            path: path.clone(),
            source,
        })
    }

    /// Read the exported verifier source.
    pub fn load_verifier_source(&self) -> Result<String, ArtifactError> {
        let path = &self.paths.verifier_source;
        let bytes = read_existing(path)?;
        String::from_utf8(bytes).map_err(|e| ArtifactError::Corrupt {
            path: path.clone(),
            reason: format!("verifier source is not UTF-8: {e}"),
        })
    }

    /// Inspect the triple without decoding payloads.
    ///
    /// A held setup lock wins over everything else
    /// ([`StoreStatus::SetupInProgress`]). Otherwise all three missing is
    /// [`StoreStatus::Absent`]; a partial triple or any envelope that fails
    /// its checks is [`StoreStatus::Corrupt`].
    #[must_use]
    pub fn status(&self) -> StoreStatus {
        if self.setup_lock_held() {
            return StoreStatus::SetupInProgress {
                lock: self.lock_path(),
            };
        }
        let present: Vec<bool> = TRIPLE
            .iter()
            .map(|&k| self.paths.for_kind(k).exists())
            .collect();
        if present.iter().all(|p| !p) {
            return StoreStatus::Absent;
        }
        for (&kind, &exists) in TRIPLE.iter().zip(&present) {
            let path = self.paths.for_kind(kind);
            if !exists {
                return StoreStatus::Corrupt {
                    path: path.to_owned(),
                    reason: "incomplete artifact set: file missing".into(),
                };
            }
            if let Err(e) = self.open_envelope(kind, path) {
                let reason = match e {
                    ArtifactError::Corrupt { reason, .. } => reason,
                    other => other.to_string(),
                };
                warn!(kind = %kind, path = %path.display(), %reason, "artifact failed envelope check");
                return StoreStatus::Corrupt {
                    path: path.to_owned(),
                    reason,
                };
            }
        }
        StoreStatus::Ready
    }

    /// Take the exclusive setup lock for this store's directory.
    ///
    /// Fails with [`SetupError::InProgress`] while a live holder exists. A
    /// lock file left by a dead process is reused.
    pub fn lock_setup(&self) -> Result<SetupLock, SetupError> {
        let path = self.lock_path();
        let io_err = |e: io::Error| SetupError::KeyGeneration(format!("cannot take setup lock: {e}"));
        fs::create_dir_all(&self.paths.dir).map_err(io_err)?;
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)
            .map_err(io_err)?;
        match FileExt::try_lock_exclusive(&file) {
            Ok(()) => {}
            Err(e) if is_contended(&e) => return Err(SetupError::InProgress(path)),
            Err(e) => return Err(io_err(e)),
        }
        file.set_len(0)
            .and_then(|()| write!(file, "{}", std::process::id()))
            .map_err(io_err)?;
        Ok(SetupLock { path, file })
    }

    fn lock_path(&self) -> PathBuf {
        self.paths.dir.join(LOCK_FILE)
    }

    /// Whether some live handle holds the setup lock. Checks with a shared
    /// lock that is released immediately.
    fn setup_lock_held(&self) -> bool {
        let Ok(file) = File::open(self.lock_path()) else {
            return false;
        };
        match FileExt::try_lock_shared(&file) {
            Ok(()) => {
                let _ = FileExt::unlock(&file);
                false
            }
            Err(e) => is_contended(&e),
        }
    }

    fn open_envelope(&self, kind: ArtifactKind, path: &Path) -> Result<Envelope, ArtifactError> {
        let bytes = read_existing(path)?;
        Envelope::open(&bytes, kind, self.curve).map_err(|reason| ArtifactError::Corrupt {
            path: path.to_owned(),
            reason,
        })
    }
}

fn is_contended(e: &io::Error) -> bool {
    e.kind() == ErrorKind::WouldBlock || e.raw_os_error() == fs2::lock_contended_error().raw_os_error()
}

fn read_existing(path: &Path) -> Result<Vec<u8>, ArtifactError> {
    fs::read(path).map_err(|source| {
        if source.kind() == ErrorKind::NotFound {
            ArtifactError::Missing {
                path: path.to_owned(),
            }
        } else {
            ArtifactError::Io {
                path: path.to_owned(),
                source,
            }
        }
    })
}

/// Exclusive setup lock; released on drop or when the process exits.
#[derive(Debug)]
pub struct SetupLock {
    path: PathBuf,
    file: File,
}

impl SetupLock {
    /// Location of the lock file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for SetupLock {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
    }
}
