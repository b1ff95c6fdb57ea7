//! The final pairing check `e(w_x, g2_0) * e(w_g, g2_1) == 1`.
//!
//! The circuit constrains `w_x` and `w_g` completely and exposes their
//! reduced limbs as public inputs. The pairing itself is evaluated on the
//! witness values; a failing equation leaves the builder failed, and an
//! outer verifier re-runs it on the public limbs.

use ark_bn254::{Bn254, Fq, Fr, G1Affine, G2Affine};
use ark_ec::pairing::Pairing;
use ark_ff::One;
use h2v_numeric::{biguint_to_field, field_to_biguint, modulus_biguint};
use h2v_stdlib::primitives::bigfield::{NUM_LIMBS, NUM_LIMB_BITS};
use h2v_stdlib::primitives::witness::BuilderRef;
use num_bigint::BigUint;

use crate::instance::G1;

pub const PAIRING_CHECK_FAILED: &str = "pairing check failed";

/// Public inputs used by the two pairing points: `x` and `y` limbs of each.
pub const PAIRING_POINT_PUBLIC_INPUTS: usize = 2 * 2 * NUM_LIMBS;

pub fn pairing_holds(g2: &[G2Affine; 2], w_x: &G1Affine, w_g: &G1Affine) -> bool {
    if !w_x.is_on_curve() || !w_g.is_on_curve() || w_x.infinity || w_g.infinity {
        return false;
    }
    Bn254::multi_pairing([*w_x, *w_g], [g2[0], g2[1]]).0.is_one()
}

/// Positions of the pairing point limbs among the public inputs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PairingPoints {
    pub public_input_positions: Vec<u32>,
}

fn expose_point(point: &G1, positions: &mut Vec<u32>) {
    for coordinate in [&point.x, &point.y] {
        let reduced = coordinate.reduce();
        reduced.assert_is_in_field("pairing: coordinate is not canonical");
        for limb in reduced.limb_elements() {
            positions.push(limb.set_public());
        }
    }
}

/// Expose `w_x` and `w_g` and evaluate the pairing on their values.
pub fn constrain_pairing(ctx: &BuilderRef<Fr>, g2: &[G2Affine; 2], w_x: &G1, w_g: &G1) -> PairingPoints {
    let mut positions = Vec::with_capacity(PAIRING_POINT_PUBLIC_INPUTS);
    expose_point(w_x, &mut positions);
    expose_point(w_g, &mut positions);

    if !pairing_holds(g2, &w_x.get_value(), &w_g.get_value()) {
        tracing::debug!("pairing equation does not hold");
        ctx.borrow_mut().base.failure(PAIRING_CHECK_FAILED.to_string());
    }
    PairingPoints {
        public_input_positions: positions,
    }
}

fn recompose(limbs: &[Fr]) -> Option<Fq> {
    let value: BigUint = limbs
        .iter()
        .enumerate()
        .map(|(i, limb)| field_to_biguint(limb) << (i * NUM_LIMB_BITS))
        .sum();
    if value >= modulus_biguint::<Fq>() {
        return None;
    }
    Some(biguint_to_field(&value))
}

/// Rebuild `(w_x, w_g)` from the trailing pairing point public inputs.
pub fn points_from_public_inputs(public_inputs: &[Fr]) -> Option<(G1Affine, G1Affine)> {
    let start = public_inputs.len().checked_sub(PAIRING_POINT_PUBLIC_INPUTS)?;
    let coordinates: Vec<Fq> = public_inputs[start..]
        .chunks(NUM_LIMBS)
        .map(recompose)
        .collect::<Option<_>>()?;
    let w_x = G1Affine::new_unchecked(coordinates[0], coordinates[1]);
    let w_g = G1Affine::new_unchecked(coordinates[2], coordinates[3]);
    (w_x.is_on_curve() && w_g.is_on_curve()).then_some((w_x, w_g))
}
