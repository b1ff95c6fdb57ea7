//! Protocol parameters of the verified circuit and their JSON form.

use std::collections::BTreeSet;
use std::path::Path;

use ark_bn254::{Fq, Fq2, Fr, G1Affine, G2Affine};
use ark_ff::{FftField, One, PrimeField};
use h2v_numeric::{biguint_to_field, field_to_biguint, modulus_biguint};
use num_bigint::BigUint;
use serde::{Deserialize, Serialize};

use crate::error::{Result, VerifierError};

/// One evaluation claim: a commitment opened at `x * omega^rotation`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Query {
    pub commitment: usize,
    pub rotation: i32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub nb_advices: usize,
    pub nb_lookups_m: usize,
    pub nb_permutation_groups: usize,
    pub nb_lookups_zs: usize,
    pub degree: usize,
    pub nb_evals: usize,
    pub challenge_init_scalar: Fr,
    /// `[g2_0, g2_1]` of the final pairing check.
    pub verify_circuit_g2: [G2Affine; 2],
    pub verify_circuit_g_lagrange: Vec<G1Affine>,
    pub queries: Option<Vec<Query>>,
    pub omega: Fr,
}

#[derive(Debug, Serialize, Deserialize)]
struct RawConfig {
    verify_circuit_g_lagrange: Vec<[String; 2]>,
    verify_circuit_g2: Vec<[String; 4]>,
    challenge_init_scalar: String,
    degree: usize,
    nb_advices: usize,
    nb_lookups_m: usize,
    nb_lookups_zs: usize,
    nb_permutation_groups: usize,
    nb_evals: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    queries: Option<Vec<Query>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    omega: Option<String>,
}

/// Parse a base-10 literal that must lie below the modulus of `F`.
pub(crate) fn parse_field<F: PrimeField>(field: &str, value: &str) -> Result<F> {
    let invalid = || VerifierError::InvalidScalarLiteral {
        field: field.to_string(),
        value: value.to_string(),
    };
    let parsed = BigUint::parse_bytes(value.as_bytes(), 10).ok_or_else(invalid)?;
    if parsed >= modulus_biguint::<F>() {
        return Err(invalid());
    }
    Ok(biguint_to_field(&parsed))
}

pub(crate) fn to_decimal<F: PrimeField>(value: &F) -> String {
    field_to_biguint(value).to_string()
}

fn parse_g1(index: usize, coords: &[String; 2]) -> Result<G1Affine> {
    let x = parse_field::<Fq>(&format!("verify_circuit_g_lagrange[{index}].x"), &coords[0])?;
    let y = parse_field::<Fq>(&format!("verify_circuit_g_lagrange[{index}].y"), &coords[1])?;
    let point = G1Affine::new_unchecked(x, y);
    if !point.is_on_curve() {
        return Err(VerifierError::InvalidG1Point { index });
    }
    Ok(point)
}

fn parse_g2(index: usize, coords: &[String; 4]) -> Result<G2Affine> {
    let names = ["x0", "x1", "y0", "y1"];
    let mut parsed = [Fq::one(); 4];
    for (slot, (name, value)) in parsed.iter_mut().zip(names.iter().zip(coords)) {
        *slot = parse_field::<Fq>(&format!("verify_circuit_g2[{index}].{name}"), value)?;
    }
    let point = G2Affine::new_unchecked(
        Fq2::new(parsed[0], parsed[1]),
        Fq2::new(parsed[2], parsed[3]),
    );
    if !point.is_on_curve() || !point.is_in_correct_subgroup_assuming_on_curve() {
        return Err(VerifierError::InvalidG2Point { index });
    }
    Ok(point)
}

/// Generator of the evaluation domain sized to `num_lagrange` points.
pub fn default_omega(num_lagrange: usize) -> Fr {
    let size = num_lagrange.max(1).next_power_of_two() as u64;
    Fr::get_root_of_unity(size).unwrap_or_else(Fr::one)
}

impl Config {
    /// Commitments read from the transcript before the multi-open round.
    pub fn num_transcript_commitments(&self) -> usize {
        self.nb_advices
            + self.nb_lookups_m
            + self.nb_permutation_groups
            + self.nb_lookups_zs
            + 1
            + self.degree
    }

    /// Transcript words of a well-formed proof: two per point, the
    /// multi-open points `h1` and `h2` included, and one per evaluation.
    pub fn expected_words(&self) -> usize {
        2 * (self.num_transcript_commitments() + 2) + self.nb_evals
    }

    /// The evaluation queries, validated against the commitments available
    /// with `num_instance_commitments` instance commitments in front.
    ///
    /// Without an explicit schema the first `nb_evals` commitments are
    /// opened at rotation 0.
    pub fn query_schema(&self, num_instance_commitments: usize) -> Result<Vec<Query>> {
        let available = num_instance_commitments + self.num_transcript_commitments();
        let queries = match &self.queries {
            Some(queries) => queries.clone(),
            None => (0..self.nb_evals)
                .map(|commitment| Query {
                    commitment,
                    rotation: 0,
                })
                .collect(),
        };
        if queries.len() != self.nb_evals {
            return Err(VerifierError::InvalidQuerySchema {
                reason: format!("{} queries for {} evaluations", queries.len(), self.nb_evals),
            });
        }
        let mut seen = BTreeSet::new();
        for query in &queries {
            if query.commitment >= available {
                return Err(VerifierError::InvalidQuerySchema {
                    reason: format!(
                        "commitment {} out of {} available",
                        query.commitment, available
                    ),
                });
            }
            if !seen.insert(*query) {
                return Err(VerifierError::InvalidQuerySchema {
                    reason: format!(
                        "commitment {} queried twice at rotation {}",
                        query.commitment, query.rotation
                    ),
                });
            }
        }
        Ok(queries)
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let raw: RawConfig = serde_json::from_str(json)?;
        let verify_circuit_g_lagrange = raw
            .verify_circuit_g_lagrange
            .iter()
            .enumerate()
            .map(|(i, coords)| parse_g1(i, coords))
            .collect::<Result<Vec<_>>>()?;
        let g2 = raw
            .verify_circuit_g2
            .iter()
            .enumerate()
            .map(|(i, coords)| parse_g2(i, coords))
            .collect::<Result<Vec<_>>>()?;
        let verify_circuit_g2 = match g2.as_slice() {
            [g2_0, g2_1] => [*g2_0, *g2_1],
            _ => {
                return Err(VerifierError::InvalidG2Point {
                    index: g2.len().min(2),
                })
            }
        };
        let omega = match &raw.omega {
            Some(omega) => parse_field::<Fr>("omega", omega)?,
            None => default_omega(verify_circuit_g_lagrange.len()),
        };
        Ok(Self {
            nb_advices: raw.nb_advices,
            nb_lookups_m: raw.nb_lookups_m,
            nb_permutation_groups: raw.nb_permutation_groups,
            nb_lookups_zs: raw.nb_lookups_zs,
            degree: raw.degree,
            nb_evals: raw.nb_evals,
            challenge_init_scalar: parse_field("challenge_init_scalar", &raw.challenge_init_scalar)?,
            verify_circuit_g2,
            verify_circuit_g_lagrange,
            queries: raw.queries,
            omega,
        })
    }

    pub fn to_json_string(&self) -> Result<String> {
        let raw = RawConfig {
            verify_circuit_g_lagrange: self
                .verify_circuit_g_lagrange
                .iter()
                .map(|p| [to_decimal(&p.x), to_decimal(&p.y)])
                .collect(),
            verify_circuit_g2: self
                .verify_circuit_g2
                .iter()
                .map(|p| {
                    [
                        to_decimal(&p.x.c0),
                        to_decimal(&p.x.c1),
                        to_decimal(&p.y.c0),
                        to_decimal(&p.y.c1),
                    ]
                })
                .collect(),
            challenge_init_scalar: to_decimal(&self.challenge_init_scalar),
            degree: self.degree,
            nb_advices: self.nb_advices,
            nb_lookups_m: self.nb_lookups_m,
            nb_lookups_zs: self.nb_lookups_zs,
            nb_permutation_groups: self.nb_permutation_groups,
            nb_evals: self.nb_evals,
            queries: self.queries.clone(),
            omega: Some(to_decimal(&self.omega)),
        };
        Ok(serde_json::to_string_pretty(&raw)?)
    }
}

pub fn load_config(path: impl AsRef<Path>) -> Result<Config> {
    let json = std::fs::read_to_string(path)?;
    Config::from_json_str(&json)
}
