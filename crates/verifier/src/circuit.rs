//! The verifier circuit: decode, commit to instances, replay the
//! transcript, assemble the multi-open equation and check the pairing.

use ark_bn254::Fr;
use h2v_circuit_builder::{ConstraintSystem, UltraCircuitChecker};
use h2v_stdlib::primitives::field::FieldT;
use h2v_stdlib::primitives::witness::{new_builder, BuilderRef};
use tracing::{debug, info_span};

use crate::codec::decode;
use crate::config::Config;
use crate::error::{Result, VerifierError};
use crate::instance::{check_instance_counts, instance_commitments};
use crate::pairing::{constrain_pairing, PairingPoints};
use crate::proof::Proof;
use crate::shplonk::{assemble, circuit_pairing_points, MultiOpen};
use crate::transcript::{read_protocol, TranscriptChip};

pub struct CompiledCircuit {
    pub builder: BuilderRef<Fr>,
    pub constraint_system: ConstraintSystem<Fr>,
    /// Instance values in group order, then the pairing point limbs.
    pub public_inputs: Vec<Fr>,
    pub pairing_points: PairingPoints,
}

impl CompiledCircuit {
    /// Snapshot a finished builder.
    pub fn from_builder(builder: BuilderRef<Fr>, pairing_points: PairingPoints) -> Self {
        let (constraint_system, public_inputs) = {
            let inner = builder.borrow();
            let public_inputs = inner
                .base
                .public_inputs()
                .iter()
                .map(|&index| inner.base.get_variable(index))
                .collect();
            (ConstraintSystem::from_builder(&inner), public_inputs)
        };
        Self {
            builder,
            constraint_system,
            public_inputs,
            pairing_points,
        }
    }

    pub fn num_gates(&self) -> usize {
        self.constraint_system.num_gates()
    }

    /// Checker verdict on the witness; any violation is `ProofInvalid`.
    pub fn check(&self) -> Result<()> {
        UltraCircuitChecker::check(&self.builder.borrow()).map_err(|msg| {
            debug!(%msg, "verifier circuit is not satisfied");
            VerifierError::ProofInvalid
        })
    }
}

fn gates(builder: &BuilderRef<Fr>) -> usize {
    builder.borrow().num_gates()
}

/// Build the verifier circuit for `proof`.
///
/// Shape errors are returned before any constraint depends on them. A
/// proof that is well shaped but wrong still compiles, into an
/// unsatisfiable circuit.
#[tracing::instrument(skip_all, name = "h2v_verifier::compile")]
pub fn compile(config: &Config, proof: &Proof) -> Result<CompiledCircuit> {
    check_instance_counts(config, &proof.instance)?;
    let queries = config.query_schema(proof.instance.len())?;
    let builder = new_builder::<Fr>();

    let instance: Vec<Vec<FieldT<Fr>>> = proof
        .instance
        .iter()
        .map(|group| {
            group
                .iter()
                .map(|&value| {
                    let wire = FieldT::from_witness(builder.clone(), value);
                    wire.set_public();
                    wire
                })
                .collect()
        })
        .collect();

    let words = info_span!("codec").in_scope(|| {
        let bytes: Vec<FieldT<Fr>> = proof
            .transcript
            .iter()
            .map(|&byte| FieldT::from_witness(builder.clone(), byte))
            .collect();
        let words = decode(&bytes)?;
        debug!(words = words.len(), gates = gates(&builder), "decoded transcript");
        Ok::<_, VerifierError>(words)
    })?;

    let commitments = info_span!("instance_commitment").in_scope(|| {
        let commitments = instance_commitments(&builder, config, &instance)?;
        debug!(groups = commitments.len(), gates = gates(&builder), "committed to instances");
        Ok::<_, VerifierError>(commitments)
    })?;

    let output = info_span!("transcript").in_scope(|| {
        let mut chip = TranscriptChip::new(builder.clone(), config.challenge_init_scalar, words);
        let output = read_protocol(&mut chip, config, &commitments)?;
        debug!(gates = gates(&builder), "replayed transcript");
        Ok::<_, VerifierError>(output)
    })?;

    let (w_x, w_g) = info_span!("shplonk").in_scope(|| {
        let challenges = MultiOpen {
            x: output.challenges.x.clone(),
            y: output.challenges.multiopen_y.clone(),
            v: output.challenges.v.clone(),
            u: output.challenges.u.clone(),
        };
        let assembly = assemble(&queries, &output.evals, config.omega, &challenges);
        let points = circuit_pairing_points(&builder, &assembly, &output.commitments, &output.h1, &output.h2);
        debug!(gates = gates(&builder), "assembled multi-open equation");
        points
    });

    let pairing_points = info_span!("pairing").in_scope(|| {
        let points = constrain_pairing(&builder, &config.verify_circuit_g2, &w_x, &w_g);
        debug!(gates = gates(&builder), "constrained pairing points");
        points
    });

    let compiled = CompiledCircuit::from_builder(builder, pairing_points);
    debug!(
        gates = compiled.num_gates(),
        public_inputs = compiled.public_inputs.len(),
        "compiled verifier circuit"
    );
    Ok(compiled)
}

/// Compile and check the verifier circuit.
#[tracing::instrument(skip_all, name = "h2v_verifier::verify")]
pub fn verify(config: &Config, proof: &Proof) -> Result<()> {
    compile(config, proof)?.check()
}
