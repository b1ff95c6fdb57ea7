//! Deterministic proof generator with a known trapdoor.
//!
//! Commitments are `p(s) * G` for the trapdoor `s`, so every opening
//! can be produced from discrete logarithms instead of a real prover.
//! The verifying parameters follow: `g_lagrange[i] = L_i(s) * G` and
//! `verify_circuit_g2 = [s * G2, -G2]`.

use ark_bn254::{Fr, G1Affine, G2Affine};
use ark_ec::{AffineRepr, CurveGroup};
use ark_ff::{Field, One, UniformRand, Zero};
use h2v_numeric::Word256;
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::config::{default_omega, Config, Query};
use crate::error::{Result, VerifierError};
use crate::instance::check_instance_counts;
use crate::proof::Proof;
use crate::shplonk::{assemble, group_queries, interpolate_at, rotation_factor, rotation_points, MultiOpen};
use crate::transcript::{words_to_bytes, NativeTranscript, TranscriptRead};

/// Commitment counts of the proved circuit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Shape {
    pub nb_advices: usize,
    pub nb_lookups_m: usize,
    pub nb_permutation_groups: usize,
    pub nb_lookups_zs: usize,
    pub degree: usize,
    pub nb_evals: usize,
}

/// Degree bound of the random committed polynomials.
const POLY_COEFFS: usize = 4;

enum Committed {
    Coefficients(Vec<Fr>),
    Lagrange(Vec<Fr>),
}

struct Domain {
    size: u64,
    omega: Fr,
}

impl Domain {
    /// `L_i(z) = omega^i (z^n - 1) / (n (z - omega^i))`.
    fn lagrange(&self, i: usize, z: Fr) -> Fr {
        let omega_i = self.omega.pow([i as u64]);
        let denominator = Fr::from(self.size) * (z - omega_i);
        match denominator.inverse() {
            Some(inverse) => omega_i * (z.pow([self.size]) - Fr::one()) * inverse,
            // z is the domain point itself.
            None => Fr::one(),
        }
    }
}

impl Committed {
    fn evaluate(&self, domain: &Domain, z: Fr) -> Fr {
        match self {
            Committed::Coefficients(coeffs) => {
                coeffs.iter().rev().fold(Fr::zero(), |acc, c| acc * z + c)
            }
            Committed::Lagrange(values) => values
                .iter()
                .enumerate()
                .map(|(i, v)| *v * domain.lagrange(i, z))
                .sum(),
        }
    }
}

fn commit(dlog: Fr) -> Result<G1Affine> {
    let point = (G1Affine::generator() * dlog).into_affine();
    if point.infinity {
        return Err(VerifierError::ProofInvalid);
    }
    Ok(point)
}

pub struct TestProver {
    config: Config,
    trapdoor: Fr,
    domain: Domain,
    rng: StdRng,
}

impl TestProver {
    /// Parameters for `shape` with `num_lagrange` Lagrange commitments,
    /// derived from `seed`.
    pub fn new(shape: Shape, num_lagrange: usize, queries: Option<Vec<Query>>, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let trapdoor = Fr::rand(&mut rng);
        let domain = Domain {
            size: num_lagrange.max(1).next_power_of_two() as u64,
            omega: default_omega(num_lagrange),
        };
        let verify_circuit_g_lagrange = (0..num_lagrange)
            .map(|i| (G1Affine::generator() * domain.lagrange(i, trapdoor)).into_affine())
            .collect();
        let g2 = G2Affine::generator();
        let config = Config {
            nb_advices: shape.nb_advices,
            nb_lookups_m: shape.nb_lookups_m,
            nb_permutation_groups: shape.nb_permutation_groups,
            nb_lookups_zs: shape.nb_lookups_zs,
            degree: shape.degree,
            nb_evals: shape.nb_evals,
            challenge_init_scalar: Fr::rand(&mut rng),
            verify_circuit_g2: [(g2 * trapdoor).into_affine(), (-g2.into_group()).into_affine()],
            verify_circuit_g_lagrange,
            queries,
            omega: domain.omega,
        };
        Self {
            config,
            trapdoor,
            domain,
            rng,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    fn random_polynomial(&mut self) -> Committed {
        Committed::Coefficients((0..POLY_COEFFS).map(|_| Fr::rand(&mut self.rng)).collect())
    }

    fn write_point(transcript: &mut NativeTranscript, words: &mut Vec<Word256>, point: &G1Affine) {
        transcript.common_point(point);
        words.push(Word256::from_field(&point.x));
        words.push(Word256::from_field(&point.y));
    }

    fn commit_round(
        &mut self,
        count: usize,
        polys: &mut Vec<Committed>,
        transcript: &mut NativeTranscript,
        words: &mut Vec<Word256>,
    ) -> Result<()> {
        for _ in 0..count {
            let poly = self.random_polynomial();
            let point = commit(poly.evaluate(&self.domain, self.trapdoor))?;
            Self::write_point(transcript, words, &point);
            polys.push(poly);
        }
        Ok(())
    }

    /// A proof for `instance` that the verifier accepts.
    pub fn prove(&mut self, instance: Vec<Vec<Fr>>) -> Result<Proof> {
        check_instance_counts(&self.config, &instance)?;
        let queries = self.config.query_schema(instance.len())?;
        let s = self.trapdoor;

        let mut polys: Vec<Committed> = instance.iter().cloned().map(Committed::Lagrange).collect();
        let mut transcript = NativeTranscript::new(self.config.challenge_init_scalar, Vec::new());
        let mut words = Vec::with_capacity(self.config.expected_words());
        for poly in &polys {
            // A zero instance commits to the identity.
            transcript.common_point(&(G1Affine::generator() * poly.evaluate(&self.domain, s)).into_affine());
        }

        let config = self.config.clone();
        self.commit_round(config.nb_advices, &mut polys, &mut transcript, &mut words)?;
        transcript.squeeze_challenge();
        self.commit_round(config.nb_lookups_m, &mut polys, &mut transcript, &mut words)?;
        transcript.squeeze_challenge();
        transcript.squeeze_challenge();
        let permutation = config.nb_permutation_groups + config.nb_lookups_zs + 1;
        self.commit_round(permutation, &mut polys, &mut transcript, &mut words)?;
        transcript.squeeze_challenge();
        self.commit_round(config.degree, &mut polys, &mut transcript, &mut words)?;
        let x = transcript.squeeze_challenge();

        let evals: Vec<Fr> = queries
            .iter()
            .map(|q| polys[q.commitment].evaluate(&self.domain, x * rotation_factor(config.omega, q.rotation)))
            .collect();
        for eval in &evals {
            transcript.absorb_scalar(eval);
            words.push(Word256::from_field(eval));
        }
        let y = transcript.squeeze_challenge();
        let v = transcript.squeeze_challenge();

        // h(s) = sum over rotation sets of (p(s) - r(s)) / Z_S(s), combined
        // with the same powers of y and v as the verifier's weights.
        let (super_set, groups) = group_queries(&queries);
        let points = rotation_points(&x, config.omega, &super_set);
        let mut h1_dlog = Fr::zero();
        for group in &groups {
            let set_points: Vec<Fr> = group.rotations.iter().map(|r| points[r]).collect();
            let vanishing: Fr = set_points.iter().map(|pt| s - pt).product();
            let vanishing_inverse = vanishing.inverse().ok_or(VerifierError::ProofInvalid)?;
            let mut inner = Fr::zero();
            for opening in &group.openings {
                let opening_evals: Vec<Fr> = opening.evals.iter().map(|&e| evals[e]).collect();
                let remainder = interpolate_at(&set_points, &opening_evals, &s);
                let value = polys[opening.commitment].evaluate(&self.domain, s);
                inner = y * inner + (value - remainder) * vanishing_inverse;
            }
            h1_dlog = v * h1_dlog + inner;
        }
        let h1 = commit(h1_dlog)?;
        Self::write_point(&mut transcript, &mut words, &h1);
        let u = transcript.squeeze_challenge();

        let assembly = assemble(&queries, &evals, config.omega, &MultiOpen { x, y, v, u });
        let combined: Fr = assembly
            .weights
            .iter()
            .map(|(index, weight)| *weight * polys[*index].evaluate(&self.domain, s))
            .sum();
        let shift_inverse = (s - u).inverse().ok_or(VerifierError::ProofInvalid)?;
        let h2 = commit((combined - assembly.r_outer - assembly.z_0 * h1_dlog) * shift_inverse)?;
        words.push(Word256::from_field(&h2.x));
        words.push(Word256::from_field(&h2.y));

        Ok(Proof::from_transcript_bytes(instance, &words_to_bytes(&words)))
    }
}
