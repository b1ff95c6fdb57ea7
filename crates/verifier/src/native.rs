//! Out-of-circuit reference verifier.
//!
//! Runs the same protocol as the circuit on plain field elements and
//! points. The circuit is satisfiable exactly when this accepts.

use ark_bn254::{Fr, G1Affine};
use ark_ec::CurveGroup;

use crate::codec::decode_native;
use crate::config::Config;
use crate::error::{Result, VerifierError};
use crate::instance::{check_instance_counts, native_instance_commitment};
use crate::pairing::pairing_holds;
use crate::proof::Proof;
use crate::shplonk::{assemble, native_pairing_points, MultiOpen};
use crate::transcript::{read_protocol, Challenges, NativeTranscript};

/// Everything the native run derives from a proof.
#[derive(Clone)]
pub struct NativeVerification {
    pub challenges: Challenges<Fr>,
    pub instance_commitments: Vec<G1Affine>,
    pub w_x: G1Affine,
    pub w_g: G1Affine,
}

pub fn native_instance_commitments(config: &Config, instance: &[Vec<Fr>]) -> Result<Vec<G1Affine>> {
    check_instance_counts(config, instance)?;
    instance
        .iter()
        .map(|group| Ok(native_instance_commitment(config, group)?.into_affine()))
        .collect()
}

/// Derive the pairing points without checking the pairing.
pub fn evaluate(config: &Config, proof: &Proof) -> Result<NativeVerification> {
    let instance_commitments = native_instance_commitments(config, &proof.instance)?;
    let queries = config.query_schema(proof.instance.len())?;
    let words = decode_native(&proof.transcript)?;

    let mut transcript = NativeTranscript::new(config.challenge_init_scalar, words);
    let output = read_protocol(&mut transcript, config, &instance_commitments)?;

    let challenges = MultiOpen {
        x: output.challenges.x,
        y: output.challenges.multiopen_y,
        v: output.challenges.v,
        u: output.challenges.u,
    };
    let assembly = assemble(&queries, &output.evals, config.omega, &challenges);
    let (w_x, w_g) = native_pairing_points(&assembly, &output.commitments, &output.h1, &output.h2);

    Ok(NativeVerification {
        challenges: output.challenges,
        instance_commitments,
        w_x,
        w_g,
    })
}

pub fn verify_native(config: &Config, proof: &Proof) -> Result<()> {
    let verification = evaluate(config, proof)?;
    if pairing_holds(&config.verify_circuit_g2, &verification.w_x, &verification.w_g) {
        Ok(())
    } else {
        Err(VerifierError::ProofInvalid)
    }
}
