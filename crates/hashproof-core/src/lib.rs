//! hashproof-core: lifecycle, persistence and calldata contracts for
//! hash-preimage proofs.
//!
//! This crate owns everything that sits *between* a proving system and an
//! on-chain verifier:
//! - the circuit descriptor and the [`ProvingSystem`] capability
//!   (`compile`, `setup`, `prove`, `verify`),
//! - the versioned, atomically written [`ArtifactStore`],
//! - witness construction with field-range validation,
//! - the layout-driven [`Marshaller`] that turns a raw proof stream into the
//!   EVM calldata tuple `(a, b, c, input)`, and
//! - the [`ChainClient`] capability plus the per-request state machine in
//!   [`lifecycle`].
//!
//! ```no_run
//! use std::sync::Arc;
//! use hashproof_core::prelude::*;
//! # fn demo<P: ProvingSystem, C: ChainClient>(system: Arc<P>, store: ArtifactStore, chain: C)
//! # -> Result<(), Box<dyn std::error::Error>> {
//! let artifacts = load_artifacts(system.as_ref(), &store)?;
//! let session = ProofSession::new(system, artifacts);
//! let handle = chain.deploy(&store.load_verifier_source()?)?;
//!
//! let secret = session.witness_builder().field_element("secret", b"secret")?;
//! let digest = session.digest(&secret)?;
//! let witness = session.witness_builder().assemble(secret, digest)?;
//! let outcome = session.run(&chain, &handle, witness)?;
//! assert_eq!(outcome.verdict, Verdict::Accepted);
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![deny(missing_docs)]
#![warn(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    clippy::unwrap_used,
    clippy::expect_used
)]
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions,
    clippy::doc_markdown
)]

/// Self-describing artifact envelope and the [`Artifact`] codec trait.
pub mod artifact;
/// The proving-system capability.
pub mod backend;
/// EVM calldata tuple and its Solidity ABI encoding.
pub mod calldata;
/// The chain-client capability.
pub mod chain;
/// Circuit descriptor, curves and field visibility.
pub mod descriptor;
/// Error taxonomy.
pub mod error;
/// Field elements as big-endian unsigned integers.
pub mod field;
/// Atomic file writes and small CBOR helpers.
pub mod io;
/// Setup orchestration and the per-request proof state machine.
pub mod lifecycle;
/// Proof stream layout and the calldata marshaller.
pub mod marshal;
/// Persistent store for the constraint system / key triple.
pub mod store;
/// Witness construction and validation.
pub mod witness;

pub use artifact::*;
pub use backend::*;
pub use calldata::*;
pub use chain::*;
pub use descriptor::*;
pub use error::*;
pub use field::*;
pub use lifecycle::*;
pub use marshal::*;
pub use store::*;
pub use witness::*;

/// Commonly-used items for quick imports.
///
/// ```rust
/// use hashproof_core::prelude::*;
/// ```
pub mod prelude {
    pub use crate::{
        backend::ProvingSystem,
        calldata::CallData,
        chain::{ChainClient, ContractHandle},
        descriptor::{CircuitDescriptor, Curve},
        error::{Error, RequestError, Stage},
        lifecycle::{load_artifacts, Artifacts, ProofSession, RequestOutcome, Setup, Verdict},
        marshal::{Marshaller, ProofLayout},
        store::{ArtifactPaths, ArtifactStore, StoreStatus},
        witness::{Witness, WitnessBuilder},
    };
}
