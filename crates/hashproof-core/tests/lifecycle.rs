#![allow(clippy::unwrap_used)]
//! Lifecycle state machine over a toy proving system.
//!
//! The toy "hash" is `x² + 7 mod p` over a small prime field and a proof is
//! the digest followed by a key tag, so every path of the pipeline (setup,
//! load, prove, local gate, marshal, chain call) can be driven without real
//! pairing cryptography.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use hashproof_core::prelude::*;
use hashproof_core::{
    Artifact, ArtifactError, ArtifactKind, ChainCallError, CodecError, DeploymentError,
    FieldElement, G2Order, RequestState, SetupError, SetupPhase,
};
use num_bigint::BigUint;

const P: u64 = 2_147_483_647;

fn toy_hash(x: &BigUint) -> BigUint {
    (x * x + 7u32) % P
}

struct ToyCs;
struct ToyPk(u64);
struct ToyVk {
    key: u64,
    inputs: usize,
}

impl Artifact for ToyCs {
    const KIND: ArtifactKind = ArtifactKind::ConstraintSystem;
    fn curve(&self) -> Curve {
        Curve::Bn254
    }
    fn to_payload(&self) -> Result<Vec<u8>, CodecError> {
        Ok(b"toy".to_vec())
    }
    fn from_payload(bytes: &[u8]) -> Result<Self, CodecError> {
        if bytes == b"toy" {
            Ok(Self)
        } else {
            Err("not a toy constraint system".into())
        }
    }
}

impl Artifact for ToyPk {
    const KIND: ArtifactKind = ArtifactKind::ProvingKey;
    fn curve(&self) -> Curve {
        Curve::Bn254
    }
    fn to_payload(&self) -> Result<Vec<u8>, CodecError> {
        Ok(self.0.to_be_bytes().to_vec())
    }
    fn from_payload(bytes: &[u8]) -> Result<Self, CodecError> {
        Ok(Self(u64::from_be_bytes(bytes.try_into()?)))
    }
}

impl Artifact for ToyVk {
    const KIND: ArtifactKind = ArtifactKind::VerifyingKey;
    fn curve(&self) -> Curve {
        Curve::Bn254
    }
    fn to_payload(&self) -> Result<Vec<u8>, CodecError> {
        let mut out = self.key.to_be_bytes().to_vec();
        out.push(u8::try_from(self.inputs)?);
        Ok(out)
    }
    fn from_payload(bytes: &[u8]) -> Result<Self, CodecError> {
        let (key, inputs) = bytes.split_at(8);
        Ok(Self {
            key: u64::from_be_bytes(key.try_into()?),
            inputs: usize::from(*inputs.first().ok_or("missing arity")?),
        })
    }
}

#[derive(Clone)]
struct ToyProof([u8; 256]);

#[derive(Default)]
struct Toy {
    setups: AtomicUsize,
}

impl Toy {
    fn key(&self) -> u64 {
        0xC0FF_EE00 + self.setups.load(Ordering::SeqCst) as u64
    }
}

impl ProvingSystem for Toy {
    type ConstraintSystem = ToyCs;
    type ProvingKey = ToyPk;
    type VerifyingKey = ToyVk;
    type Proof = ToyProof;

    fn curve(&self) -> Curve {
        Curve::Bn254
    }
    fn scalar_modulus(&self) -> BigUint {
        BigUint::from(P)
    }
    fn proof_layout(&self) -> ProofLayout {
        ProofLayout::for_curve(Curve::Bn254, G2Order::ImaginaryFirst)
    }
    fn compile(&self, d: &CircuitDescriptor, curve: Curve) -> Result<ToyCs, SetupError> {
        d.validate()?;
        if curve != Curve::Bn254 {
            return Err(SetupError::UnsupportedCurve(curve));
        }
        Ok(ToyCs)
    }
    fn setup(&self, _cs: &ToyCs) -> Result<(ToyPk, ToyVk), SetupError> {
        self.setups.fetch_add(1, Ordering::SeqCst);
        let key = self.key();
        Ok((ToyPk(key), ToyVk { key, inputs: 1 }))
    }
    fn digest(&self, _cs: &ToyCs, secret: &FieldElement) -> Result<FieldElement, Error> {
        Ok(FieldElement::new_checked(toy_hash(secret.as_biguint()), &self.scalar_modulus())
            .unwrap())
    }
    fn prove(&self, _cs: &ToyCs, pk: &ToyPk, w: &Witness) -> Result<ToyProof, Error> {
        if toy_hash(w.secret().as_biguint()) != *w.public().as_biguint() {
            return Err(Error::UnsatisfiedConstraint("constraint #0".into()));
        }
        let mut raw = [0u8; 256];
        raw[..32].copy_from_slice(&w.public().to_padded_be(32)?);
        raw[56..64].copy_from_slice(&pk.0.to_be_bytes());
        Ok(ToyProof(raw))
    }
    fn verify(&self, proof: &ToyProof, vk: &ToyVk, inputs: &[FieldElement]) -> Result<bool, Error> {
        hashproof_core::check_arity(vk.inputs, inputs.len())?;
        Ok(toy_accepts(&proof.0, vk.key, inputs[0].as_biguint()))
    }
    fn public_input_count(&self, vk: &ToyVk) -> usize {
        vk.inputs
    }
    fn proof_bytes(&self, proof: &ToyProof) -> Vec<u8> {
        proof.0.to_vec()
    }
    fn export_verifier(&self, vk: &ToyVk) -> Result<String, SetupError> {
        Ok(format!("contract ToyVerifier {{ // key {}\n}}", vk.key))
    }
}

fn toy_accepts(raw: &[u8], key: u64, input: &BigUint) -> bool {
    BigUint::from_bytes_be(&raw[..32]) == *input && raw[56..64] == key.to_be_bytes()
}

/// Chain that re-runs the toy check from the calldata.
#[derive(Default)]
struct ToyChain {
    key: std::sync::Mutex<Option<u64>>,
    calls: AtomicUsize,
    fail_with_timeout: bool,
}

impl ChainClient for ToyChain {
    fn deploy(&self, source: &str) -> Result<ContractHandle, DeploymentError> {
        let key = source
            .split("// key ")
            .nth(1)
            .and_then(|s| s.split_whitespace().next())
            .and_then(|s| s.parse().ok())
            .ok_or_else(|| DeploymentError::InvalidSource("no key".into()))?;
        *self.key.lock().unwrap() = Some(key);
        Ok(ContractHandle { address: [7; 20] })
    }

    fn call_verify(&self, handle: &ContractHandle, call: &CallData) -> Result<bool, ChainCallError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_with_timeout {
            return Err(ChainCallError::Timeout(Duration::from_millis(5)));
        }
        let key = self
            .key
            .lock()
            .unwrap()
            .ok_or_else(|| ChainCallError::UnknownContract(handle.to_string()))?;
        let layout = ProofLayout::for_curve(Curve::Bn254, G2Order::ImaginaryFirst);
        let raw = call
            .to_proof_bytes(&layout)
            .map_err(|e| ChainCallError::InvalidCallData(e.to_string()))?;
        Ok(toy_accepts(&raw, key, &call.input[0]))
    }
}

fn fresh_store(name: &str) -> ArtifactStore {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    let dir = std::env::temp_dir().join(format!("hashproof_lifecycle_{name}_{nanos}"));
    ArtifactStore::new(ArtifactPaths::in_dir(dir, "mimc"), Curve::Bn254)
}

fn ready(name: &str) -> (Arc<Toy>, ArtifactStore) {
    let system = Arc::new(Toy::default());
    let store = fresh_store(name);
    Setup::run(system.as_ref(), &store, &CircuitDescriptor::mimc_preimage("seed")).unwrap();
    (system, store)
}

#[test]
fn setup_then_valid_request_is_accepted() {
    let (system, store) = ready("accept");
    assert!(store.status().is_ready());

    let session = ProofSession::new(Arc::clone(&system), load_artifacts(system.as_ref(), &store).unwrap());
    let chain = ToyChain::default();
    let handle = chain.deploy(&store.load_verifier_source().unwrap()).unwrap();

    let secret = session.witness_builder().field_element("secret", b"s").unwrap();
    let digest = session.digest(&secret).unwrap();
    let witness = session.witness_builder().assemble(secret, digest).unwrap();

    let outcome = session.run(&chain, &handle, witness).unwrap();
    assert_eq!(outcome.verdict, Verdict::Accepted);
    assert_eq!(
        outcome.transitions,
        vec![
            RequestState::WitnessReady,
            RequestState::ProofGenerated,
            RequestState::LocallyVerified,
            RequestState::Submitted,
            RequestState::OnChainAccepted,
        ]
    );
    assert!(outcome.calldata.is_some());
    let _ = std::fs::remove_dir_all(&store.paths().dir);
}

#[test]
fn loading_before_setup_fails_fast() {
    let system = Toy::default();
    let store = fresh_store("absent");
    let err = load_artifacts(&system, &store).err().unwrap();
    assert!(matches!(err, ArtifactError::Missing { .. }), "{err}");
}

#[test]
fn loading_during_a_rerun_of_setup_is_refused() {
    let (system, store) = ready("busy");
    let setup = Setup::begin(system.as_ref(), &store).unwrap();
    assert!(matches!(store.status(), StoreStatus::SetupInProgress { .. }));
    let err = load_artifacts(system.as_ref(), &store).err().unwrap();
    assert!(matches!(err, ArtifactError::SetupInProgress { .. }), "{err}");

    drop(setup);
    assert!(store.status().is_ready());
    assert!(load_artifacts(system.as_ref(), &store).is_ok());
    let _ = std::fs::remove_dir_all(&store.paths().dir);
}

#[test]
fn setup_steps_must_run_in_order() {
    let system = Toy::default();
    let store = fresh_store("order");
    let mut setup = Setup::begin(&system, &store).unwrap();
    assert_eq!(setup.phase(), SetupPhase::Uninitialized);
    assert!(matches!(
        setup.generate_keys(),
        Err(SetupError::OutOfOrder { step: "generate_keys", .. })
    ));
    setup.compile(&CircuitDescriptor::mimc_preimage("seed")).unwrap();
    assert_eq!(setup.phase(), SetupPhase::Compiled);

    // The lock is held for the whole run.
    assert!(matches!(
        Setup::begin(&system, &store),
        Err(SetupError::InProgress(_))
    ));
    drop(setup);
    assert!(Setup::begin(&system, &store).is_ok());
    let _ = std::fs::remove_dir_all(&store.paths().dir);
}

#[test]
fn wrong_digest_fails_at_prove_without_touching_the_chain() {
    let (system, store) = ready("unsat");
    let session = ProofSession::new(Arc::clone(&system), load_artifacts(system.as_ref(), &store).unwrap());
    let chain = ToyChain::default();
    let handle = chain.deploy(&store.load_verifier_source().unwrap()).unwrap();

    let witness = session.witness_builder().build(b"s", &[1]).unwrap();
    let err = session.run(&chain, &handle, witness).unwrap_err();
    assert_eq!(err.stage, Stage::Prove);
    assert!(matches!(err.source, Error::UnsatisfiedConstraint(_)));
    assert!(!err.is_fatal());
    assert_eq!(chain.calls.load(Ordering::SeqCst), 0);
    let _ = std::fs::remove_dir_all(&store.paths().dir);
}

#[test]
fn wrong_public_input_is_rejected_locally_and_on_chain() {
    let (system, store) = ready("reject");
    let session = ProofSession::new(Arc::clone(&system), load_artifacts(system.as_ref(), &store).unwrap());
    let chain = ToyChain::default();
    let handle = chain.deploy(&store.load_verifier_source().unwrap()).unwrap();

    let builder = session.witness_builder();
    let secret = builder.field_element("secret", b"s").unwrap();
    let digest = session.digest(&secret).unwrap();
    let generated = session.prove(builder.assemble(secret, digest).unwrap()).unwrap();

    let bogus = vec![builder.element_from_u64("digest", 42).unwrap()];
    assert!(!session.verify_local(&generated.proof, &bogus).unwrap());

    let calldata = session.marshal(&generated.proof, &bogus).unwrap();
    assert!(!session.submit(&chain, &handle, &calldata).unwrap());
    let _ = std::fs::remove_dir_all(&store.paths().dir);
}

#[test]
fn wrong_arity_is_an_error_not_false() {
    let (system, store) = ready("arity");
    let session = ProofSession::new(Arc::clone(&system), load_artifacts(system.as_ref(), &store).unwrap());
    let builder = session.witness_builder();
    let secret = builder.field_element("secret", b"s").unwrap();
    let digest = session.digest(&secret).unwrap();
    let generated = session
        .prove(builder.assemble(secret, digest.clone()).unwrap())
        .unwrap();

    let err = session
        .verify_local(&generated.proof, &[digest.clone(), digest])
        .unwrap_err();
    assert_eq!(err.stage, Stage::LocalVerify);
    assert!(matches!(
        err.source,
        Error::PublicInputArityMismatch { expected: 1, got: 2 }
    ));
    let _ = std::fs::remove_dir_all(&store.paths().dir);
}

#[test]
fn chain_timeout_surfaces_as_chain_call_error() {
    let (system, store) = ready("timeout");
    let session = ProofSession::new(Arc::clone(&system), load_artifacts(system.as_ref(), &store).unwrap());
    let chain = ToyChain {
        fail_with_timeout: true,
        ..ToyChain::default()
    };
    let handle = chain.deploy(&store.load_verifier_source().unwrap()).unwrap();

    let secret = session.witness_builder().field_element("secret", b"s").unwrap();
    let digest = session.digest(&secret).unwrap();
    let witness = session.witness_builder().assemble(secret, digest).unwrap();
    let err = session.run(&chain, &handle, witness).unwrap_err();
    assert_eq!(err.stage, Stage::ChainCall);
    assert!(matches!(err.source, Error::ChainCall(ChainCallError::Timeout(_))));
    assert_eq!(chain.calls.load(Ordering::SeqCst), 1);
    let _ = std::fs::remove_dir_all(&store.paths().dir);
}

#[test]
fn rerunning_setup_replaces_keys_and_invalidates_old_proofs() {
    let (system, store) = ready("rerun");
    let first = ProofSession::new(Arc::clone(&system), load_artifacts(system.as_ref(), &store).unwrap());
    let builder = first.witness_builder();
    let secret = builder.field_element("secret", b"s").unwrap();
    let digest = first.digest(&secret).unwrap();
    let old = first
        .prove(builder.assemble(secret, digest.clone()).unwrap())
        .unwrap();

    Setup::run(system.as_ref(), &store, &CircuitDescriptor::mimc_preimage("seed")).unwrap();
    let second = ProofSession::new(Arc::clone(&system), load_artifacts(system.as_ref(), &store).unwrap());
    assert!(!second.verify_local(&old.proof, &[digest]).unwrap());
    let _ = std::fs::remove_dir_all(&store.paths().dir);
}

#[test]
fn concurrent_requests_share_one_session() {
    let (system, store) = ready("concurrent");
    let session = ProofSession::new(Arc::clone(&system), load_artifacts(system.as_ref(), &store).unwrap());
    let chain = ToyChain::default();
    let handle = chain.deploy(&store.load_verifier_source().unwrap()).unwrap();

    std::thread::scope(|s| {
        for i in 0..4u8 {
            let session = &session;
            let chain = &chain;
            let handle = &handle;
            s.spawn(move || {
                let b = session.witness_builder();
                let secret = b.field_element("secret", &[b'a' + i]).unwrap();
                let digest = session.digest(&secret).unwrap();
                let outcome = session
                    .run(chain, handle, b.assemble(secret, digest).unwrap())
                    .unwrap();
                assert_eq!(outcome.verdict, Verdict::Accepted);
            });
        }
    });
    assert_eq!(chain.calls.load(Ordering::SeqCst), 4);
    let _ = std::fs::remove_dir_all(&store.paths().dir);
}

#[test]
fn locally_rejected_proof_is_never_submitted() {
    let (system, store) = ready("local_gate");
    let session = ProofSession::new(Arc::clone(&system), load_artifacts(system.as_ref(), &store).unwrap());
    let chain = ToyChain::default();
    let handle = chain.deploy(&store.load_verifier_source().unwrap()).unwrap();

    let builder = session.witness_builder();
    let secret = builder.field_element("secret", b"s").unwrap();
    let digest = session.digest(&secret).unwrap();
    let mut generated = session.prove(builder.assemble(secret, digest).unwrap()).unwrap();
    generated.public_inputs = vec![builder.element_from_u64("digest", 42).unwrap()];

    let outcome = session.verify_and_submit(&chain, &handle, &generated).unwrap();
    assert_eq!(outcome.verdict, Verdict::RejectedLocally);
    assert_eq!(outcome.state(), Some(RequestState::LocallyVerified));
    assert!(outcome.calldata.is_none());
    assert_eq!(chain.calls.load(Ordering::SeqCst), 0);
    let _ = std::fs::remove_dir_all(&store.paths().dir);
}
