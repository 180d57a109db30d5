// crates/hashproof-cli/src/main.rs

#![forbid(unsafe_code)]
#![deny(
    rust_2018_idioms,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo
)]

mod config;

use anyhow::{anyhow, bail, Context, Result};
use clap::Parser;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use hashproof_chain::SimulatedChain;
use hashproof_core::{
    io::{to_cbor, write_atomic},
    load_artifacts, CallData, ChainClient, CircuitDescriptor, Curve, FieldElement, ProofSession,
    RequestOutcome, Setup, StoreStatus, Verdict,
};
use hashproof_core::{ArtifactPaths, ArtifactStore};
use hashproof_groth16::Groth16Bn254;

use crate::config::Config;

#[derive(Parser, Debug)]
#[command(
    name = "hashproof",
    about = "Prove knowledge of a hash preimage and verify it on a simulated EVM chain",
    long_about = "Prove knowledge of a hash preimage and verify it on a simulated EVM chain.\n\n\
                  Run once with --init to compile the MiMC circuit, generate Groth16 keys and \
                  export the Solidity verifier. Without --init, runs one proof-and-verify cycle \
                  against the persisted artifacts.",
    version = env!("CARGO_PKG_VERSION")
)]
struct Cli {
    /// Compile the circuit, generate keys and export the verifier, then exit.
    #[arg(long, default_value_t = false)]
    init: bool,

    /// TOML configuration file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Artifact directory (overrides the config file).
    #[arg(long)]
    artifacts_dir: Option<PathBuf>,

    /// Preimage to prove knowledge of (overrides the config file).
    #[arg(long)]
    secret: Option<String>,

    /// Write a CBOR report of the proof cycle here.
    #[arg(long)]
    report: Option<PathBuf>,
}

/// Summary of one proof-and-verify cycle, dumped with `--report`.
#[derive(Debug, Serialize)]
struct CycleReport {
    contract: String,
    digest: String,
    verdict: String,
    transitions: Vec<String>,
    calldata: Vec<String>,
    bogus_input: u64,
    bogus_local: bool,
    bogus_on_chain: bool,
}

fn main() -> Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let mut cfg = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    if let Some(dir) = cli.artifacts_dir {
        cfg.artifacts_dir = dir;
    }
    if let Some(secret) = cli.secret {
        cfg.secret = secret;
    }

    let store = ArtifactStore::new(
        ArtifactPaths::in_dir(&cfg.artifacts_dir, &cfg.circuit),
        Curve::Bn254,
    );

    if cli.init {
        init(&cfg, &store)
    } else {
        prove_and_verify(&cfg, &store, cli.report)
    }
}

/// Install a compact `tracing` subscriber. `HASHPROOF_LOG` wins over
/// `RUST_LOG`; the default level is `info`.
fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_env("HASHPROOF_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("info"));
    let fmt_layer = fmt::layer().with_target(false).with_level(true).compact();

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init();
}

fn init(cfg: &Config, store: &ArtifactStore) -> Result<()> {
    let mut descriptor = CircuitDescriptor::mimc_preimage(cfg.seed.clone());
    descriptor.name.clone_from(&cfg.circuit);

    let report = Setup::run(&Groth16Bn254, store, &descriptor).context("setup failed")?;
    info!(
        r1cs = %report.paths.constraint_system.display(),
        pk = %report.paths.proving_key.display(),
        vk = %report.paths.verifying_key.display(),
        verifier = %report.paths.verifier_source.display(),
        public_inputs = report.public_inputs,
        source_bytes = report.verifier_source_bytes,
        "setup complete"
    );
    Ok(())
}

fn prove_and_verify(cfg: &Config, store: &ArtifactStore, report: Option<PathBuf>) -> Result<()> {
    match store.status() {
        StoreStatus::Ready => {}
        StoreStatus::Absent => bail!(
            "no setup artifacts in {}; run with --init first",
            store.paths().dir.display()
        ),
        StoreStatus::Corrupt { path, reason } => bail!(
            "setup artifacts unusable ({}: {reason}); rerun with --init",
            path.display()
        ),
        StoreStatus::SetupInProgress { lock } => bail!(
            "setup is running (lock {}); retry once it finishes",
            lock.display()
        ),
    }

    let system = Arc::new(Groth16Bn254);
    let artifacts = load_artifacts(system.as_ref(), store).context("loading artifacts")?;
    let session = ProofSession::new(system, artifacts);

    let chain = SimulatedChain::new(cfg.chain.clone());
    let source = store
        .load_verifier_source()
        .context("loading verifier source")?;
    let handle = chain.deploy(&source).context("deploying verifier")?;

    let builder = session.witness_builder();
    let secret = builder
        .field_element("secret", cfg.secret.as_bytes())
        .context("secret does not fit the scalar field")?;
    let digest = session.digest(&secret)?;
    info!(digest = %digest, "computed public digest");
    let witness = builder.assemble(secret, digest.clone())?;

    let generated = session.prove(witness)?;
    let outcome = session.verify_and_submit(&chain, &handle, &generated)?;
    info!(verdict = ?outcome.verdict, transitions = ?outcome.transitions, "honest request finished");

    let bogus = builder.element_from_u64("bogus", cfg.bogus_input)?;
    let bogus_inputs = [bogus];
    let bogus_local = session.verify_local(&generated.proof, &bogus_inputs)?;
    let bogus_call = session.marshal(&generated.proof, &bogus_inputs)?;
    let bogus_on_chain = session.submit(&chain, &handle, &bogus_call)?;
    info!(
        input = cfg.bogus_input,
        local = bogus_local,
        on_chain = bogus_on_chain,
        "same proof against a wrong public input"
    );

    if let Some(path) = report {
        let cycle = cycle_report(cfg, &handle.to_string(), &digest, &outcome, bogus_local, bogus_on_chain);
        let bytes = to_cbor(&cycle).map_err(|e| anyhow!(e))?;
        write_atomic(&path, &bytes).with_context(|| format!("writing {}", path.display()))?;
        info!(path = %path.display(), bytes = bytes.len(), "report written");
    }

    if outcome.verdict != Verdict::Accepted {
        bail!("valid proof was not accepted: {:?}", outcome.verdict);
    }
    if bogus_local || bogus_on_chain {
        warn!("proof accepted for a wrong public input");
        bail!("proof verified against public input {}", cfg.bogus_input);
    }
    info!("proof cycle OK");
    Ok(())
}

fn cycle_report(
    cfg: &Config,
    contract: &str,
    digest: &FieldElement,
    outcome: &RequestOutcome,
    bogus_local: bool,
    bogus_on_chain: bool,
) -> CycleReport {
    CycleReport {
        contract: contract.to_owned(),
        digest: hex::encode(digest.to_bytes_be()),
        verdict: format!("{:?}", outcome.verdict),
        transitions: outcome
            .transitions
            .iter()
            .map(|s| format!("{s:?}"))
            .collect(),
        calldata: outcome
            .calldata
            .as_ref()
            .map(calldata_words)
            .unwrap_or_default(),
        bogus_input: cfg.bogus_input,
        bogus_local,
        bogus_on_chain,
    }
}

fn calldata_words(call: &CallData) -> Vec<String> {
    call.proof_words()
        .chain(&call.input)
        .map(|w| format!("0x{}", hex::encode(w.to_bytes_be())))
        .collect()
}
