//! Shplonk multi-open verification equation.
//!
//! The scalar side is generic over `Scalar` so the circuit and the native
//! reference share one assembly; each side then applies the weights in its
//! own multi-scalar multiplication.

use std::collections::{BTreeMap, BTreeSet};
use std::ops::{Add, Mul, Sub};

use ark_bn254::{Fr, G1Affine, G1Projective};
use ark_ec::{AffineRepr, CurveGroup, VariableBaseMSM};
use ark_ff::{Field, One, Zero};
use h2v_stdlib::primitives::field::FieldT;
use h2v_stdlib::primitives::witness::BuilderRef;

use crate::config::Query;
use crate::instance::G1;

/// Scalar arithmetic shared by the in-circuit and native assembly.
pub trait Scalar: Clone + Add<Output = Self> + Sub<Output = Self> + Mul<Output = Self> {
    fn from_native(value: Fr) -> Self;
    /// `self / other`. A zero divisor fails the circuit, and yields zero
    /// natively.
    fn divide(&self, other: &Self) -> Self;
}

impl Scalar for Fr {
    fn from_native(value: Fr) -> Self {
        value
    }

    fn divide(&self, other: &Self) -> Self {
        other.inverse().map(|inverse| *self * inverse).unwrap_or_else(Fr::zero)
    }
}

impl Scalar for FieldT<Fr> {
    fn from_native(value: Fr) -> Self {
        FieldT::from_field(value)
    }

    fn divide(&self, other: &Self) -> Self {
        FieldT::divide(self, other)
    }
}

/// `base^exponent` by square-and-multiply.
pub fn scalar_pow<S: Scalar>(base: &S, exponent: u64) -> S {
    let mut result = S::from_native(Fr::one());
    let mut square = base.clone();
    let mut remaining = exponent;
    while remaining != 0 {
        if remaining & 1 == 1 {
            result = result * square.clone();
        }
        remaining >>= 1;
        if remaining != 0 {
            square = square.clone() * square;
        }
    }
    result
}

/// `omega^rotation`, inverted for negative rotations.
pub fn rotation_factor(omega: Fr, rotation: i32) -> Fr {
    let power = scalar_pow(&omega, rotation.unsigned_abs() as u64);
    if rotation < 0 {
        power.inverse().unwrap_or_else(Fr::zero)
    } else {
        power
    }
}

/// A commitment and the indices of its evaluations, by ascending rotation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Opening {
    pub commitment: usize,
    pub evals: Vec<usize>,
}

/// Commitments opened at the same rotation set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RotationGroup {
    pub rotations: Vec<i32>,
    pub openings: Vec<Opening>,
}

/// The super point set and the rotation groups, ordered by rotation set.
/// Openings keep the order in which their commitment is first queried.
pub fn group_queries(queries: &[Query]) -> (Vec<i32>, Vec<RotationGroup>) {
    let super_set: BTreeSet<i32> = queries.iter().map(|q| q.rotation).collect();

    let mut order = Vec::new();
    let mut by_commitment: BTreeMap<usize, BTreeMap<i32, usize>> = BTreeMap::new();
    for (index, query) in queries.iter().enumerate() {
        by_commitment
            .entry(query.commitment)
            .or_insert_with(|| {
                order.push(query.commitment);
                BTreeMap::new()
            })
            .insert(query.rotation, index);
    }

    let mut groups: BTreeMap<BTreeSet<i32>, Vec<Opening>> = BTreeMap::new();
    for commitment in order {
        let rotations = &by_commitment[&commitment];
        groups
            .entry(rotations.keys().copied().collect())
            .or_default()
            .push(Opening {
                commitment,
                evals: rotations.values().copied().collect(),
            });
    }

    let groups = groups
        .into_iter()
        .map(|(rotations, openings)| RotationGroup {
            rotations: rotations.into_iter().collect(),
            openings,
        })
        .collect();
    (super_set.into_iter().collect(), groups)
}

/// Value at `at` of the polynomial through `(points[j], evals[j])`.
pub fn interpolate_at<S: Scalar>(points: &[S], evals: &[S], at: &S) -> S {
    let one = S::from_native(Fr::one());
    let mut result = S::from_native(Fr::zero());
    for (j, (point_j, eval_j)) in points.iter().zip(evals).enumerate() {
        let mut numerator = one.clone();
        let mut denominator = one.clone();
        for (k, point_k) in points.iter().enumerate() {
            if k != j {
                numerator = numerator * (at.clone() - point_k.clone());
                denominator = denominator * (point_j.clone() - point_k.clone());
            }
        }
        result = result + eval_j.clone() * numerator.divide(&denominator);
    }
    result
}

/// The multi-open challenges.
#[derive(Clone)]
pub struct MultiOpen<S> {
    pub x: S,
    pub y: S,
    pub v: S,
    pub u: S,
}

#[derive(Clone)]
pub struct Assembly<S> {
    /// MSM weight of every queried commitment, by commitment index.
    pub weights: Vec<(usize, S)>,
    pub r_outer: S,
    pub z_0: S,
    pub u: S,
}

fn scale_all<S: Scalar>(weights: &mut [(usize, S)], factor: &S) {
    for (_, weight) in weights.iter_mut() {
        *weight = weight.clone() * factor.clone();
    }
}

/// Evaluation point of every rotation in `rotations`.
pub fn rotation_points<S: Scalar>(x: &S, omega: Fr, rotations: &[i32]) -> BTreeMap<i32, S> {
    rotations
        .iter()
        .map(|&rotation| (rotation, x.clone() * S::from_native(rotation_factor(omega, rotation))))
        .collect()
}

/// Scalars of `w_g = sum(weight * C) - r_outer * G - z_0 * h1 + u * h2`.
///
/// `evals` are in query order; `queries` must have passed
/// `Config::query_schema`.
pub fn assemble<S: Scalar>(
    queries: &[Query],
    evals: &[S],
    omega: Fr,
    challenges: &MultiOpen<S>,
) -> Assembly<S> {
    let MultiOpen { x, y, v, u } = challenges;
    let one = S::from_native(Fr::one());
    let zero = S::from_native(Fr::zero());

    let (super_set, groups) = group_queries(queries);
    let points = rotation_points(x, omega, &super_set);

    let mut z_0 = one.clone();
    let mut z_diff_0_inverse = one.clone();
    let mut r_outer = zero.clone();
    let mut weights: Vec<(usize, S)> = Vec::new();

    for (i, group) in groups.iter().enumerate() {
        let mut z_diff = one.clone();
        for (rotation, point) in &points {
            if !group.rotations.contains(rotation) {
                z_diff = z_diff * (u.clone() - point.clone());
            }
        }
        if i == 0 {
            for rotation in &group.rotations {
                z_0 = z_0 * (u.clone() - points[rotation].clone());
            }
            z_diff_0_inverse = one.divide(&z_diff);
            z_diff = one.clone();
        } else {
            z_diff = z_diff * z_diff_0_inverse.clone();
        }

        let group_points: Vec<S> = group.rotations.iter().map(|r| points[r].clone()).collect();
        let mut r_inner = zero.clone();
        let mut inner: Vec<(usize, S)> = Vec::new();
        for opening in &group.openings {
            let opening_evals: Vec<S> = opening.evals.iter().map(|&e| evals[e].clone()).collect();
            r_inner = y.clone() * r_inner + interpolate_at(&group_points, &opening_evals, u);
            scale_all(&mut inner, y);
            inner.push((opening.commitment, one.clone()));
        }

        r_outer = v.clone() * r_outer + z_diff.clone() * r_inner;
        scale_all(&mut weights, v);
        scale_all(&mut inner, &z_diff);
        weights.extend(inner);
    }

    Assembly {
        weights,
        r_outer,
        z_0,
        u: u.clone(),
    }
}

/// `(w_x, w_g)` in the circuit.
pub fn circuit_pairing_points(
    ctx: &BuilderRef<Fr>,
    assembly: &Assembly<FieldT<Fr>>,
    commitments: &[G1],
    h1: &G1,
    h2: &G1,
) -> (G1, G1) {
    let mut points: Vec<G1> = assembly
        .weights
        .iter()
        .map(|(index, _)| commitments[*index].clone())
        .collect();
    let mut scalars: Vec<FieldT<Fr>> = assembly.weights.iter().map(|(_, w)| w.clone()).collect();
    points.push(h1.clone());
    scalars.push(-assembly.z_0.clone());
    points.push(h2.clone());
    scalars.push(assembly.u.clone());

    let variable = G1::batch_mul(&points, &scalars);
    let generator = G1::scalar_mul_constant(ctx, &G1Affine::generator(), &-assembly.r_outer.clone());
    (h2.clone(), variable.add(&generator))
}

/// `(w_x, w_g)` natively.
pub fn native_pairing_points(
    assembly: &Assembly<Fr>,
    commitments: &[G1Affine],
    h1: &G1Affine,
    h2: &G1Affine,
) -> (G1Affine, G1Affine) {
    let mut bases: Vec<G1Affine> = assembly
        .weights
        .iter()
        .map(|(index, _)| commitments[*index])
        .collect();
    let mut scalars: Vec<Fr> = assembly.weights.iter().map(|(_, w)| *w).collect();
    bases.extend([G1Affine::generator(), *h1, *h2]);
    scalars.extend([-assembly.r_outer, -assembly.z_0, assembly.u]);
    let w_g = G1Projective::msm_unchecked(&bases, &scalars);
    (*h2, w_g.into_affine())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ark_ff::UniformRand;
    use h2v_circuit_builder::UltraCircuitChecker;
    use h2v_stdlib::primitives::witness::new_builder;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use crate::config::default_omega;

    fn q(commitment: usize, rotation: i32) -> Query {
        Query { commitment, rotation }
    }

    #[test]
    fn test_scalar_pow() {
        let base = Fr::from(3u64);
        assert_eq!(scalar_pow(&base, 0), Fr::one());
        assert_eq!(scalar_pow(&base, 13), base.pow([13u64]));
        let omega = default_omega(8);
        assert_eq!(rotation_factor(omega, -1) * omega, Fr::one());
        assert_eq!(rotation_factor(omega, 8), Fr::one());
    }

    #[test]
    fn test_grouping_orders_sets_and_members() {
        let queries = [q(4, 0), q(2, 1), q(2, 0), q(7, -1), q(1, 0), q(7, 0)];
        let (super_set, groups) = group_queries(&queries);
        assert_eq!(super_set, vec![-1, 0, 1]);
        assert_eq!(groups.len(), 3);
        assert_eq!(groups[0].rotations, vec![-1, 0]);
        assert_eq!(groups[0].openings, vec![Opening { commitment: 7, evals: vec![3, 5] }]);
        assert_eq!(groups[1].rotations, vec![0]);
        let members: Vec<usize> = groups[1].openings.iter().map(|o| o.commitment).collect();
        assert_eq!(members, vec![4, 1]);
        assert_eq!(groups[2].rotations, vec![0, 1]);
        assert_eq!(groups[2].openings[0].evals, vec![2, 1]);
    }

    #[test]
    fn test_interpolation_recovers_polynomial() {
        let mut rng = StdRng::seed_from_u64(21);
        let coeffs: Vec<Fr> = (0..3).map(|_| Fr::rand(&mut rng)).collect();
        let eval = |z: Fr| coeffs[0] + coeffs[1] * z + coeffs[2] * z * z;
        let points: Vec<Fr> = (0..3).map(|_| Fr::rand(&mut rng)).collect();
        let evals: Vec<Fr> = points.iter().map(|&p| eval(p)).collect();
        let at = Fr::rand(&mut rng);
        assert_eq!(interpolate_at(&points, &evals, &at), eval(at));
    }

    #[test]
    fn test_single_rotation_assembly() {
        // One set {0}: z_0 = u - x and every weight is a power of y.
        let mut rng = StdRng::seed_from_u64(22);
        let challenges = MultiOpen {
            x: Fr::rand(&mut rng),
            y: Fr::rand(&mut rng),
            v: Fr::rand(&mut rng),
            u: Fr::rand(&mut rng),
        };
        let evals: Vec<Fr> = (0..3).map(|_| Fr::rand(&mut rng)).collect();
        let queries = [q(0, 0), q(1, 0), q(2, 0)];
        let assembly = assemble(&queries, &evals, default_omega(4), &challenges);
        let y = challenges.y;
        assert_eq!(assembly.z_0, challenges.u - challenges.x);
        assert_eq!(assembly.weights, vec![(0, y * y), (1, y), (2, Fr::one())]);
        assert_eq!(assembly.r_outer, evals[0] * y * y + evals[1] * y + evals[2]);
    }

    #[test]
    fn test_multi_rotation_identity_holds_at_trapdoor() {
        // With commitments p_j(s) G the assembled point is (s - u) h2 for
        // the honest quotient, whatever h1 is.
        let mut rng = StdRng::seed_from_u64(23);
        let omega = default_omega(8);
        let s = Fr::rand(&mut rng);
        let polys: Vec<Vec<Fr>> = (0..3)
            .map(|_| (0..4).map(|_| Fr::rand(&mut rng)).collect())
            .collect();
        let eval = |p: &[Fr], z: Fr| p.iter().rev().fold(Fr::zero(), |acc, c| acc * z + c);
        let challenges = MultiOpen {
            x: Fr::rand(&mut rng),
            y: Fr::rand(&mut rng),
            v: Fr::rand(&mut rng),
            u: Fr::rand(&mut rng),
        };
        let queries = vec![q(0, 0), q(0, 1), q(1, 0), q(2, -1), q(2, 0)];
        let evals: Vec<Fr> = queries
            .iter()
            .map(|query| {
                eval(&polys[query.commitment], challenges.x * rotation_factor(omega, query.rotation))
            })
            .collect();
        let assembly = assemble(&queries, &evals, omega, &challenges);

        let g = G1Affine::generator();
        let commitments: Vec<G1Affine> = polys.iter().map(|p| (g * eval(p, s)).into_affine()).collect();
        let eta = Fr::rand(&mut rng);
        let h1 = (g * eta).into_affine();
        let combined = assembly
            .weights
            .iter()
            .fold(Fr::zero(), |acc, (i, w)| acc + *w * eval(&polys[*i], s));
        let h2_dlog = (combined - assembly.r_outer - assembly.z_0 * eta)
            * (s - challenges.u).inverse().unwrap();
        let h2 = (g * h2_dlog).into_affine();

        let (w_x, w_g) = native_pairing_points(&assembly, &commitments, &h1, &h2);
        assert_eq!((w_x * s).into_affine(), w_g);
    }

    #[test]
    fn test_circuit_assembly_matches_native() {
        let mut rng = StdRng::seed_from_u64(24);
        let omega = default_omega(8);
        let native = MultiOpen {
            x: Fr::rand(&mut rng),
            y: Fr::rand(&mut rng),
            v: Fr::rand(&mut rng),
            u: Fr::rand(&mut rng),
        };
        let queries = vec![q(0, 0), q(1, 1), q(1, 0)];
        let evals: Vec<Fr> = (0..3).map(|_| Fr::rand(&mut rng)).collect();
        let expected = assemble(&queries, &evals, omega, &native);

        let builder = new_builder::<Fr>();
        let wire = |v: Fr| FieldT::from_witness(builder.clone(), v);
        let challenges = MultiOpen {
            x: wire(native.x),
            y: wire(native.y),
            v: wire(native.v),
            u: wire(native.u),
        };
        let eval_wires: Vec<FieldT<Fr>> = evals.iter().map(|&e| wire(e)).collect();
        let assembly = assemble(&queries, &eval_wires, omega, &challenges);

        assert_eq!(assembly.r_outer.get_value(), expected.r_outer);
        assert_eq!(assembly.z_0.get_value(), expected.z_0);
        let weights: Vec<(usize, Fr)> = assembly.weights.iter().map(|(i, w)| (*i, w.get_value())).collect();
        assert_eq!(weights, expected.weights);
        assert!(UltraCircuitChecker::check(&builder.borrow()).is_ok());
    }
}
