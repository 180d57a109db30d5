//! Setup orchestration and the per-request proof pipeline.
//!
//! Setup walks `Uninitialized → Compiled → KeysGenerated` once per circuit
//! version, under the store's exclusive setup lock, then persists the triple
//! and the exported verifier source.
//!
//! A proof request walks
//! `WitnessReady → ProofGenerated → LocallyVerified → Submitted →
//! {OnChainAccepted | OnChainRejected | ChainCallFailed}`. A local `false`
//! ends the request before submission; no chain resources are spent on a
//! proof already known to fail.
//!
//! Loaded artifacts are immutable and shared through `Arc`, so one
//! [`ProofSession`] can serve any number of concurrent requests without
//! locking.

use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, info_span, warn};

use crate::backend::ProvingSystem;
use crate::calldata::CallData;
use crate::chain::{ChainClient, ContractHandle};
use crate::descriptor::CircuitDescriptor;
use crate::error::{ArtifactError, Error, RequestError, SetupError, Stage};
use crate::field::FieldElement;
use crate::marshal::Marshaller;
use crate::store::{ArtifactPaths, ArtifactStore, SetupLock, StoreStatus};
use crate::witness::{Witness, WitnessBuilder};

/* --------------------------------- setup ---------------------------------- */

/// Progress of a setup run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetupPhase {
    /// Nothing compiled yet.
    Uninitialized,
    /// Constraint system compiled.
    Compiled,
    /// Proving and verifying keys generated.
    KeysGenerated,
}

impl SetupPhase {
    const fn name(self) -> &'static str {
        match self {
            Self::Uninitialized => "uninitialized",
            Self::Compiled => "compiled",
            Self::KeysGenerated => "keys-generated",
        }
    }
}

impl fmt::Display for SetupPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// What a completed setup wrote.
#[derive(Debug, Clone)]
pub struct SetupReport {
    /// Artifact locations.
    pub paths: ArtifactPaths,
    /// Public inputs declared by the verifying key.
    pub public_inputs: usize,
    /// Size of the exported verifier source.
    pub verifier_source_bytes: usize,
}

/// One-shot setup run holding the store's setup lock for its lifetime.
pub struct Setup<'a, P: ProvingSystem> {
    system: &'a P,
    store: &'a ArtifactStore,
    phase: SetupPhase,
    cs: Option<P::ConstraintSystem>,
    keys: Option<(P::ProvingKey, P::VerifyingKey)>,
    _lock: SetupLock,
}

impl<'a, P: ProvingSystem> Setup<'a, P> {
    /// Take the setup lock and start in [`SetupPhase::Uninitialized`].
    ///
    /// # Errors
    /// [`SetupError::InProgress`] if another setup holds the lock.
    pub fn begin(system: &'a P, store: &'a ArtifactStore) -> Result<Self, SetupError> {
        let lock = store.lock_setup()?;
        debug!(lock = %lock.path().display(), "setup lock acquired");
        Ok(Self {
            system,
            store,
            phase: SetupPhase::Uninitialized,
            cs: None,
            keys: None,
            _lock: lock,
        })
    }

    /// Current phase.
    #[must_use]
    pub const fn phase(&self) -> SetupPhase {
        self.phase
    }

    /// Compile `descriptor` for the store's curve.
    pub fn compile(&mut self, descriptor: &CircuitDescriptor) -> Result<(), SetupError> {
        self.require("compile", SetupPhase::Uninitialized)?;
        let curve = self.store.curve();
        info!(circuit = %descriptor.name, %curve, "compiling circuit");
        self.cs = Some(self.system.compile(descriptor, curve)?);
        self.phase = SetupPhase::Compiled;
        Ok(())
    }

    /// Run the trusted setup over the compiled constraint system.
    pub fn generate_keys(&mut self) -> Result<(), SetupError> {
        self.require("generate_keys", SetupPhase::Compiled)?;
        let cs = self.cs.as_ref().ok_or(SetupError::OutOfOrder {
            step: "generate_keys",
            required: SetupPhase::Compiled.name(),
            current: self.phase.name(),
        })?;
        info!("running trusted setup");
        let t0 = Instant::now();
        self.keys = Some(self.system.setup(cs)?);
        debug!(ms = t0.elapsed().as_millis(), "trusted setup finished");
        self.phase = SetupPhase::KeysGenerated;
        Ok(())
    }

    /// Persist the triple and export the verifier source.
    pub fn persist(self) -> Result<SetupReport, Error> {
        self.require("persist", SetupPhase::KeysGenerated)?;
        let out_of_order = || SetupError::OutOfOrder {
            step: "persist",
            required: SetupPhase::KeysGenerated.name(),
            current: self.phase.name(),
        };
        let cs = self.cs.as_ref().ok_or_else(out_of_order)?;
        let (pk, vk) = self.keys.as_ref().ok_or_else(out_of_order)?;
        let paths = self.store.paths();

        info!(path = %paths.constraint_system.display(), "serialize constraint system");
        self.store.save_artifact(cs)?;
        info!(path = %paths.proving_key.display(), "serialize proving key");
        self.store.save_artifact(pk)?;
        info!(path = %paths.verifying_key.display(), "serialize verifying key");
        self.store.save_artifact(vk)?;

        info!(path = %paths.verifier_source.display(), "export verifier source");
        let source = self.system.export_verifier(vk)?;
        self.store.save_verifier_source(&source)?;

        Ok(SetupReport {
            paths: paths.clone(),
            public_inputs: self.system.public_input_count(vk),
            verifier_source_bytes: source.len(),
        })
    }

    /// Lock, compile, generate keys and persist in one call.
    pub fn run(
        system: &'a P,
        store: &'a ArtifactStore,
        descriptor: &CircuitDescriptor,
    ) -> Result<SetupReport, Error> {
        let mut setup = Self::begin(system, store)?;
        setup.compile(descriptor)?;
        setup.generate_keys()?;
        setup.persist()
    }

    fn require(&self, step: &'static str, required: SetupPhase) -> Result<(), SetupError> {
        if self.phase == required {
            Ok(())
        } else {
            Err(SetupError::OutOfOrder {
                step,
                required: required.name(),
                current: self.phase.name(),
            })
        }
    }
}

/* ------------------------------- artifacts -------------------------------- */

/// The loaded, immutable artifact triple.
pub struct Artifacts<P: ProvingSystem> {
    /// Compiled constraint system.
    pub constraint_system: Arc<P::ConstraintSystem>,
    /// Proving key.
    pub proving_key: Arc<P::ProvingKey>,
    /// Verifying key.
    pub verifying_key: Arc<P::VerifyingKey>,
}

impl<P: ProvingSystem> Clone for Artifacts<P> {
    fn clone(&self) -> Self {
        Self {
            constraint_system: Arc::clone(&self.constraint_system),
            proving_key: Arc::clone(&self.proving_key),
            verifying_key: Arc::clone(&self.verifying_key),
        }
    }
}

/// Load the triple, failing fast unless the store reports
/// [`StoreStatus::Ready`].
///
/// # Errors
/// [`ArtifactError::Missing`] when setup never ran, [`ArtifactError::Corrupt`]
/// for a partial or damaged triple or a curve mismatch,
/// [`ArtifactError::SetupInProgress`] while a setup run holds the lock.
pub fn load_artifacts<P: ProvingSystem>(
    system: &P,
    store: &ArtifactStore,
) -> Result<Artifacts<P>, ArtifactError> {
    let paths = store.paths();
    if system.curve() != store.curve() {
        return Err(ArtifactError::Corrupt {
            path: paths.dir.clone(),
            reason: format!(
                "store holds {} artifacts, proving system runs on {}",
                store.curve(),
                system.curve()
            ),
        });
    }
    match store.status() {
        StoreStatus::Ready => {}
        StoreStatus::Absent => {
            return Err(ArtifactError::Missing {
                path: paths.constraint_system.clone(),
            })
        }
        StoreStatus::Corrupt { path, reason } => return Err(ArtifactError::Corrupt { path, reason }),
        StoreStatus::SetupInProgress { lock } => return Err(ArtifactError::SetupInProgress { lock }),
    }
    info!(dir = %paths.dir.display(), "loading constraint system and keys");
    Ok(Artifacts {
        constraint_system: Arc::new(store.load_artifact()?),
        proving_key: Arc::new(store.load_artifact()?),
        verifying_key: Arc::new(store.load_artifact()?),
    })
}

/* -------------------------------- requests -------------------------------- */

/// States of a single proof request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestState {
    /// Witness built and range-checked.
    WitnessReady,
    /// Proof produced.
    ProofGenerated,
    /// Local verification ran (with either result).
    LocallyVerified,
    /// Calldata handed to the chain.
    Submitted,
    /// Chain verifier returned `true`.
    OnChainAccepted,
    /// Chain verifier returned `false`.
    OnChainRejected,
    /// The chain call failed without a result.
    ChainCallFailed,
}

/// Final verdict of a request that ran to completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Valid locally and on chain.
    Accepted,
    /// Local verification returned `false`; nothing was submitted.
    RejectedLocally,
    /// Valid locally but the chain verifier returned `false`.
    RejectedOnChain,
}

/// Result of [`ProofSession::run`].
#[derive(Debug, Clone)]
pub struct RequestOutcome {
    /// Verdict.
    pub verdict: Verdict,
    /// Every state the request passed through, in order.
    pub transitions: Vec<RequestState>,
    /// Calldata that was (or would have been) submitted.
    pub calldata: Option<CallData>,
}

impl RequestOutcome {
    /// Terminal state.
    #[must_use]
    pub fn state(&self) -> Option<RequestState> {
        self.transitions.last().copied()
    }
}

/// A proof together with the public inputs it was produced for.
pub struct GeneratedProof<P: ProvingSystem> {
    /// The proof.
    pub proof: P::Proof,
    /// Public inputs used at proving time.
    pub public_inputs: Vec<FieldElement>,
}

impl<P: ProvingSystem> Clone for GeneratedProof<P> {
    fn clone(&self) -> Self {
        Self {
            proof: self.proof.clone(),
            public_inputs: self.public_inputs.clone(),
        }
    }
}

/// Per-request pipeline over a loaded artifact triple.
pub struct ProofSession<P: ProvingSystem> {
    system: Arc<P>,
    artifacts: Artifacts<P>,
    marshaller: Marshaller,
    builder: WitnessBuilder,
}

impl<P: ProvingSystem> Clone for ProofSession<P> {
    fn clone(&self) -> Self {
        Self {
            system: Arc::clone(&self.system),
            artifacts: self.artifacts.clone(),
            marshaller: self.marshaller,
            builder: self.builder.clone(),
        }
    }
}

impl<P: ProvingSystem> ProofSession<P> {
    /// Session over `artifacts`; the marshaller takes its arity from the
    /// verifying key.
    pub fn new(system: Arc<P>, artifacts: Artifacts<P>) -> Self {
        let marshaller = Marshaller::new(
            system.proof_layout(),
            system.public_input_count(&artifacts.verifying_key),
        );
        let builder = WitnessBuilder::new(system.scalar_modulus());
        Self {
            system,
            artifacts,
            marshaller,
            builder,
        }
    }

    /// The proving system.
    #[must_use]
    pub fn system(&self) -> &P {
        &self.system
    }

    /// The loaded triple.
    #[must_use]
    pub const fn artifacts(&self) -> &Artifacts<P> {
        &self.artifacts
    }

    /// Witness builder for this system's scalar field.
    #[must_use]
    pub const fn witness_builder(&self) -> &WitnessBuilder {
        &self.builder
    }

    /// Marshaller bound to the verifying key.
    #[must_use]
    pub const fn marshaller(&self) -> &Marshaller {
        &self.marshaller
    }

    /// Hash `secret` with the circuit's hash function.
    pub fn digest(&self, secret: &FieldElement) -> Result<FieldElement, Error> {
        self.system
            .digest(&self.artifacts.constraint_system, secret)
    }

    /// Prove `witness`, consuming it.
    pub fn prove(&self, witness: Witness) -> Result<GeneratedProof<P>, RequestError> {
        let t0 = Instant::now();
        let proof = self
            .system
            .prove(
                &self.artifacts.constraint_system,
                &self.artifacts.proving_key,
                &witness,
            )
            .map_err(|e| RequestError::at(Stage::Prove, e))?;
        let public_inputs = witness.public_inputs();
        drop(witness);
        debug!(ms = t0.elapsed().as_millis(), "proof generated");
        Ok(GeneratedProof {
            proof,
            public_inputs,
        })
    }

    /// Verify locally against the session's verifying key.
    ///
    /// # Errors
    /// [`Error::PublicInputArityMismatch`] for the wrong number of inputs.
    pub fn verify_local(
        &self,
        proof: &P::Proof,
        public_inputs: &[FieldElement],
    ) -> Result<bool, RequestError> {
        self.system
            .verify(proof, &self.artifacts.verifying_key, public_inputs)
            .map_err(|e| RequestError::at(Stage::LocalVerify, e))
    }

    /// Marshal a proof and public inputs into calldata.
    pub fn marshal(
        &self,
        proof: &P::Proof,
        public_inputs: &[FieldElement],
    ) -> Result<CallData, RequestError> {
        self.marshaller
            .marshal(&self.system.proof_bytes(proof), public_inputs)
            .map_err(|e| RequestError::at(Stage::Marshal, e))
    }

    /// Submit calldata to the verifier at `handle` without the local gate.
    ///
    /// Used to cross-check the on-chain verdict for inputs already known to
    /// fail locally. No retries.
    pub fn submit<C: ChainClient + ?Sized>(
        &self,
        chain: &C,
        handle: &ContractHandle,
        calldata: &CallData,
    ) -> Result<bool, RequestError> {
        chain
            .call_verify(handle, calldata)
            .map_err(|e| RequestError::at(Stage::ChainCall, e))
    }

    /// Run one full request: prove, verify locally, marshal, call the chain.
    pub fn run<C: ChainClient + ?Sized>(
        &self,
        chain: &C,
        handle: &ContractHandle,
        witness: Witness,
    ) -> Result<RequestOutcome, RequestError> {
        let span = info_span!("proof_request", contract = %handle);
        let _guard = span.enter();

        info!("creating proof");
        let generated = self.prove(witness)?;
        self.verify_and_submit(chain, handle, &generated)
    }

    /// Continue a request from [`RequestState::ProofGenerated`]: verify
    /// locally and, only if that succeeds, marshal and call the chain.
    pub fn verify_and_submit<C: ChainClient + ?Sized>(
        &self,
        chain: &C,
        handle: &ContractHandle,
        generated: &GeneratedProof<P>,
    ) -> Result<RequestOutcome, RequestError> {
        let mut transitions = vec![RequestState::WitnessReady, RequestState::ProofGenerated];

        let ok = self.verify_local(&generated.proof, &generated.public_inputs)?;
        transitions.push(RequestState::LocallyVerified);
        if !ok {
            warn!("local verification failed; not submitting");
            return Ok(RequestOutcome {
                verdict: Verdict::RejectedLocally,
                transitions,
                calldata: None,
            });
        }

        let calldata = self.marshal(&generated.proof, &generated.public_inputs)?;
        transitions.push(RequestState::Submitted);
        info!("submitting proof to verifier contract");
        let on_chain = match self.submit(chain, handle, &calldata) {
            Ok(v) => v,
            Err(e) => {
                warn!(error = %e, state = ?RequestState::ChainCallFailed, "chain call failed");
                return Err(e);
            }
        };

        let (verdict, state) = if on_chain {
            info!("proof verified on chain");
            (Verdict::Accepted, RequestState::OnChainAccepted)
        } else {
            warn!("chain verifier rejected a locally valid proof");
            (Verdict::RejectedOnChain, RequestState::OnChainRejected)
        };
        transitions.push(state);
        Ok(RequestOutcome {
            verdict,
            transitions,
            calldata: Some(calldata),
        })
    }
}
