//! Emulated short Weierstrass points.
//!
//! An `ElementT<F, C>` is an affine point of the curve `C` whose
//! coordinates live in `C::BaseField`, emulated with `BigFieldT` over the
//! native field `F`. The point at infinity is carried as a flag with
//! coordinates `(0, 0)`. Addition is incomplete: both operands must be
//! finite with distinct x-coordinates, and the constraints enforce it.

use std::marker::PhantomData;
use std::ops::{Add, Neg, Sub};

use ark_ec::short_weierstrass::{Affine, Projective, SWCurveConfig};
use ark_ec::{AffineRepr, CurveConfig, CurveGroup};
use ark_ff::{One, PrimeField, Zero};
use h2v_numeric::modulus_biguint;

use super::bigfield::BigFieldT;
use super::bool::BoolT;
use super::field::{assert_bits_less_than, FieldT};
use super::witness::{validate_contexts, BuilderRef};

/// Emulated coordinate of a point on `C`.
pub type Coordinate<F, C> = BigFieldT<F, <C as CurveConfig>::BaseField>;

const OFFSET_GENERATOR_SEED: &[u8] = b"h2v_stdlib::biggroup offset generator";

/// Starting point of every accumulator. A fixed multiple of the generator
/// derived from a seed string.
pub fn offset_generator<C: SWCurveConfig>() -> Affine<C> {
    let scalar = C::ScalarField::from_le_bytes_mod_order(OFFSET_GENERATOR_SEED);
    (Affine::<C>::generator() * scalar).into_affine()
}

/// `2^doublings * point`.
fn multiply_by_power_of_two<C: SWCurveConfig>(point: &Affine<C>, doublings: usize) -> Affine<C> {
    let mut acc: Projective<C> = point.into_group();
    for _ in 0..doublings {
        acc = acc + acc;
    }
    acc.into_affine()
}

fn scalar_num_bits<C: SWCurveConfig>() -> usize {
    C::ScalarField::MODULUS_BIT_SIZE as usize
}

/// Canonical little-endian bits of a scalar of `C`.
fn scalar_bits<F: PrimeField, C: SWCurveConfig>(scalar: &FieldT<F>) -> Vec<BoolT<F>> {
    let bits = scalar.to_bits(scalar_num_bits::<C>());
    if !scalar.is_constant() {
        assert_bits_less_than(
            &bits,
            &modulus_biguint::<C::ScalarField>(),
            "biggroup: scalar is not canonical",
        );
    }
    bits
}

pub struct ElementT<F: PrimeField, C: SWCurveConfig>
where
    C::BaseField: PrimeField,
{
    pub x: Coordinate<F, C>,
    pub y: Coordinate<F, C>,
    /// Set for the point at infinity, whose coordinates are then `(0, 0)`.
    pub is_infinity: BoolT<F>,
    _curve: PhantomData<C>,
}

impl<F: PrimeField, C: SWCurveConfig> Clone for ElementT<F, C>
where
    C::BaseField: PrimeField,
{
    fn clone(&self) -> Self {
        Self {
            x: self.x.clone(),
            y: self.y.clone(),
            is_infinity: self.is_infinity.clone(),
            _curve: PhantomData,
        }
    }
}

impl<F: PrimeField, C: SWCurveConfig> ElementT<F, C>
where
    C::BaseField: PrimeField,
{
    // ════════════════════════════════════════════════════════════════════
    //  Constructors
    // ════════════════════════════════════════════════════════════════════

    /// Finite point from coordinates, without any on-curve check.
    pub fn from_coordinates(x: Coordinate<F, C>, y: Coordinate<F, C>) -> Self {
        Self {
            x,
            y,
            is_infinity: BoolT::constant(false),
            _curve: PhantomData,
        }
    }

    pub fn point_at_infinity(ctx: Option<BuilderRef<F>>) -> Self {
        let is_infinity = BoolT {
            context: ctx.clone(),
            ..BoolT::constant(true)
        };
        Self {
            x: BigFieldT::from_field(ctx.clone(), C::BaseField::zero()),
            y: BigFieldT::from_field(ctx, C::BaseField::zero()),
            is_infinity,
            _curve: PhantomData,
        }
    }

    pub fn from_constant(ctx: Option<BuilderRef<F>>, point: &Affine<C>) -> Self {
        if point.infinity {
            return Self::point_at_infinity(ctx);
        }
        Self::from_coordinates(
            BigFieldT::from_field(ctx.clone(), point.x),
            BigFieldT::from_field(ctx, point.y),
        )
    }

    /// Fresh witness coordinates for `point`, constrained to lie on the curve.
    pub fn from_witness(ctx: BuilderRef<F>, point: &Affine<C>) -> Self {
        if point.infinity {
            ctx.borrow_mut()
                .base
                .failure("biggroup: witness is the point at infinity".to_string());
        }
        let element = Self::from_coordinates(
            BigFieldT::from_witness(ctx.clone(), point.x),
            BigFieldT::from_witness(ctx, point.y),
        );
        element.assert_on_curve("biggroup: witness is not on the curve");
        element
    }

    fn from_projective(ctx: Option<BuilderRef<F>>, point: Projective<C>) -> Self {
        Self::from_constant(ctx, &point.into_affine())
    }

    // ════════════════════════════════════════════════════════════════════
    //  Value access
    // ════════════════════════════════════════════════════════════════════

    pub fn get_value(&self) -> Affine<C> {
        if self.is_infinity.get_value() {
            return Affine::identity();
        }
        Affine::new_unchecked(self.x.get_field_value(), self.y.get_field_value())
    }

    pub fn is_constant(&self) -> bool {
        self.x.is_constant() && self.y.is_constant() && self.is_infinity.is_constant()
    }

    pub fn get_context(&self) -> Option<BuilderRef<F>> {
        validate_contexts(&[
            self.x.get_context(),
            self.y.get_context(),
            self.is_infinity.get_context(),
        ])
    }

    // ════════════════════════════════════════════════════════════════════
    //  Assertions
    // ════════════════════════════════════════════════════════════════════

    /// Constrain `y^2 = x^3 + a*x + b`.
    pub fn assert_on_curve(&self, msg: &str) {
        let ctx = self.get_context();
        let mut to_add = vec![BigFieldT::from_field(ctx.clone(), C::COEFF_B)];
        if !C::COEFF_A.is_zero() {
            to_add.push(self.x.mul(&BigFieldT::from_field(ctx, C::COEFF_A)));
        }
        let rhs = self.x.sqr().madd(&self.x, &to_add);
        self.y.sqr().assert_equal(&rhs, msg);
    }

    pub fn assert_equal(&self, other: &Self, msg: &str) {
        self.x.assert_equal(&other.x, msg);
        self.y.assert_equal(&other.y, msg);
        self.is_infinity.assert_equal(&other.is_infinity, msg);
    }

    /// Constrain the point to be finite.
    fn assert_finite(&self, msg: &str) {
        if !self.is_infinity.is_constant() || self.is_infinity.get_value() {
            self.is_infinity.assert_equal(&BoolT::constant(false), msg);
        }
    }

    // ════════════════════════════════════════════════════════════════════
    //  Group operations
    // ════════════════════════════════════════════════════════════════════

    pub fn negate(&self) -> Self {
        Self {
            y: self.y.negate(),
            ..self.clone()
        }
    }

    /// `predicate ? lhs : rhs`.
    pub fn conditional_assign(predicate: &BoolT<F>, lhs: &Self, rhs: &Self) -> Self {
        Self {
            x: BigFieldT::conditional_assign(predicate, &lhs.x, &rhs.x),
            y: BigFieldT::conditional_assign(predicate, &lhs.y, &rhs.y),
            is_infinity: BoolT::conditional_assign(predicate, &lhs.is_infinity, &rhs.is_infinity),
            _curve: PhantomData,
        }
    }

    /// Incomplete addition of finite points with distinct x-coordinates.
    /// The slope is a witness with `lambda * (x2 - x1) = y2 - y1`.
    pub fn add(&self, other: &Self) -> Self {
        let ctx = validate_contexts(&[
            self.x.get_context(),
            self.y.get_context(),
            other.x.get_context(),
            other.y.get_context(),
        ]);
        if self.is_constant() && other.is_constant() {
            return Self::from_projective(ctx, self.get_value() + other.get_value());
        }
        self.assert_finite("biggroup: incomplete addition of the point at infinity");
        other.assert_finite("biggroup: incomplete addition of the point at infinity");
        other
            .x
            .assert_is_not_equal(&self.x, "biggroup: incomplete addition of points sharing an x-coordinate");
        let lambda = other
            .y
            .sub(&self.y)
            .div_without_denominator_check(&other.x.sub(&self.x));
        self.chord(&lambda, &other.x)
    }

    pub fn sub(&self, other: &Self) -> Self {
        self.add(&other.negate())
    }

    /// Doubling. The slope is a witness with `lambda * 2y = 3x^2 + a`.
    pub fn dbl(&self) -> Self {
        let ctx = self.get_context();
        if self.is_constant() {
            let value = self.get_value().into_group();
            return Self::from_projective(ctx, value + value);
        }
        self.assert_finite("biggroup: doubling the point at infinity");
        let x_sq = self.x.sqr();
        let mut numerator = x_sq.add(&x_sq).add(&x_sq);
        if !C::COEFF_A.is_zero() {
            numerator = numerator.add(&BigFieldT::from_field(ctx, C::COEFF_A));
        }
        let lambda = numerator.div(&self.y.add(&self.y));
        self.chord(&lambda, &self.x)
    }

    /// Reflection of the third intersection of the line through `self`
    /// with slope `lambda`, whose second intersection has x-coordinate
    /// `other_x`.
    fn chord(&self, lambda: &Coordinate<F, C>, other_x: &Coordinate<F, C>) -> Self {
        let x3 = lambda.madd(lambda, &[self.x.negate(), other_x.negate()]);
        let y3 = lambda.madd(&self.x.sub(&x3), &[self.y.negate()]);
        Self::from_coordinates(x3, y3)
    }

    /// `bit ? self + point : self`.
    fn conditional_add(&self, point: &Self, bit: &BoolT<F>) -> Self {
        if bit.is_constant() {
            return if bit.get_value() {
                self.add(point)
            } else {
                self.clone()
            };
        }
        let sum = self.add(point);
        Self::conditional_assign(bit, &sum, self)
    }

    /// `self - offset` for a finite constant `offset`, where `self == offset`
    /// gives the point at infinity.
    ///
    /// Equal x-coordinates are constrained to mean equal points, so
    /// `self == -offset` is unsatisfiable.
    fn remove_offset(&self, offset: &Affine<C>) -> Self {
        let ctx = self.get_context();
        let offset = Self::from_constant(ctx.clone(), offset);
        if self.is_constant() {
            return self.sub(&offset);
        }
        self.assert_finite("biggroup: accumulator is the point at infinity");
        let is_infinity = self.x.is_equal(&offset.x);
        BigFieldT::conditional_assign(&is_infinity, &offset.y, &self.y)
            .assert_equal(&self.y, "biggroup: accumulator is the negated offset");

        let one = BigFieldT::from_field(ctx.clone(), C::BaseField::one());
        let denominator = BigFieldT::conditional_assign(&is_infinity, &one, &offset.x.sub(&self.x));
        let lambda = offset.y.negate().sub(&self.y).div(&denominator);
        let difference = self.chord(&lambda, &offset.x);

        let zero = BigFieldT::from_field(ctx, C::BaseField::zero());
        Self {
            x: BigFieldT::conditional_assign(&is_infinity, &zero, &difference.x),
            y: BigFieldT::conditional_assign(&is_infinity, &zero, &difference.y),
            is_infinity,
            _curve: PhantomData,
        }
    }

    // ════════════════════════════════════════════════════════════════════
    //  Scalar multiplication
    // ════════════════════════════════════════════════════════════════════

    /// `scalar * self` for a scalar of `C` held as a native wire.
    pub fn scalar_mul(&self, scalar: &FieldT<F>) -> Self {
        Self::batch_mul(std::slice::from_ref(self), std::slice::from_ref(scalar))
    }

    /// Points flagged at infinity become the generator with a zero scalar.
    /// Constant infinities are dropped.
    fn handle_points_at_infinity(points: &[Self], scalars: &[FieldT<F>]) -> (Vec<Self>, Vec<FieldT<F>>) {
        let generator = Self::from_constant(None, &Affine::<C>::generator());
        points
            .iter()
            .zip(scalars)
            .filter(|(point, _)| !(point.is_infinity.is_constant() && point.is_infinity.get_value()))
            .map(|(point, scalar)| {
                let flag = &point.is_infinity;
                if flag.is_constant() {
                    return (point.clone(), scalar.clone());
                }
                let masked = Self::from_coordinates(
                    BigFieldT::conditional_assign(flag, &generator.x, &point.x),
                    BigFieldT::conditional_assign(flag, &generator.y, &point.y),
                );
                (masked, FieldT::conditional_assign(flag, &FieldT::zero(), scalar))
            })
            .unzip()
    }

    /// `sum(scalars[i] * points[i])` with shared doublings.
    ///
    /// Most significant bit first. The accumulator starts at the offset
    /// generator and `2^n` times it is removed at the end.
    pub fn batch_mul(points: &[Self], scalars: &[FieldT<F>]) -> Self {
        assert_eq!(points.len(), scalars.len(), "one scalar per point");
        assert!(!points.is_empty(), "empty multi-scalar multiplication");
        let mut contexts: Vec<&Option<BuilderRef<F>>> = scalars.iter().map(|s| s.get_context()).collect();
        contexts.extend(points.iter().flat_map(|p| [p.x.get_context(), p.y.get_context()]));
        let ctx = validate_contexts(&contexts);

        let (points, scalars) = Self::handle_points_at_infinity(points, scalars);
        if points.is_empty() {
            return Self::point_at_infinity(ctx);
        }
        let num_bits = scalar_num_bits::<C>();
        let bits: Vec<Vec<BoolT<F>>> = scalars.iter().map(scalar_bits::<F, C>).collect();
        let offset = offset_generator::<C>();

        let mut acc = Self::from_constant(ctx, &offset);
        for i in (0..num_bits).rev() {
            acc = acc.dbl();
            for (point, point_bits) in points.iter().zip(&bits) {
                acc = acc.conditional_add(point, &point_bits[i]);
            }
        }
        acc.remove_offset(&multiply_by_power_of_two(&offset, num_bits))
    }

    /// `scalar * point` for a constant `point`.
    pub fn scalar_mul_constant(ctx: &BuilderRef<F>, point: &Affine<C>, scalar: &FieldT<F>) -> Self {
        Self::fixed_base_batch_mul(ctx, std::slice::from_ref(point), std::slice::from_ref(scalar))
    }

    /// `sum(scalars[i] * points[i])` for constant `points`.
    ///
    /// Only conditional additions of the precomputed multiples
    /// `2^j * points[i]`, starting from the offset generator. A zero sum
    /// is the point at infinity.
    pub fn fixed_base_batch_mul(
        ctx: &BuilderRef<F>,
        points: &[Affine<C>],
        scalars: &[FieldT<F>],
    ) -> Self {
        assert_eq!(points.len(), scalars.len(), "one scalar per point");
        let offset = offset_generator::<C>();
        let mut acc = Self::from_constant(Some(ctx.clone()), &offset);
        for (point, scalar) in points.iter().zip(scalars) {
            let mut multiple: Projective<C> = point.into_group();
            for bit in scalar_bits::<F, C>(scalar) {
                let addend = Self::from_projective(Some(ctx.clone()), multiple);
                acc = acc.conditional_add(&addend, &bit);
                multiple = multiple + multiple;
            }
        }
        acc.remove_offset(&offset)
    }
}

impl<F: PrimeField, C: SWCurveConfig> Add for &ElementT<F, C>
where
    C::BaseField: PrimeField,
{
    type Output = ElementT<F, C>;
    fn add(self, rhs: Self) -> ElementT<F, C> {
        ElementT::add(self, rhs)
    }
}

impl<F: PrimeField, C: SWCurveConfig> Sub for &ElementT<F, C>
where
    C::BaseField: PrimeField,
{
    type Output = ElementT<F, C>;
    fn sub(self, rhs: Self) -> ElementT<F, C> {
        ElementT::sub(self, rhs)
    }
}

impl<F: PrimeField, C: SWCurveConfig> Neg for &ElementT<F, C>
where
    C::BaseField: PrimeField,
{
    type Output = ElementT<F, C>;
    fn neg(self) -> ElementT<F, C> {
        self.negate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitives::witness::new_builder;
    use ark_bn254::{g1, Fq, Fr, G1Affine, G1Projective};
    use ark_ff::{UniformRand, Zero};
    use ark_std::test_rng;
    use h2v_circuit_builder::UltraCircuitChecker;

    type Point = ElementT<Fr, g1::Config>;

    fn check_circuit(builder: &BuilderRef<Fr>) -> Result<(), String> {
        UltraCircuitChecker::check(&builder.borrow())
    }

    fn random_point<R: ark_std::rand::Rng>(rng: &mut R) -> G1Affine {
        G1Projective::rand(rng).into_affine()
    }

    #[test]
    fn test_on_curve_witness() {
        let mut rng = test_rng();
        let builder = new_builder::<Fr>();
        let p = random_point(&mut rng);
        let element = Point::from_witness(builder.clone(), &p);
        assert_eq!(element.get_value(), p);
        assert!(check_circuit(&builder).is_ok());
    }

    #[test]
    fn test_off_curve_witness_fails() {
        let mut rng = test_rng();
        let builder = new_builder::<Fr>();
        let p = random_point(&mut rng);
        let bad = G1Affine::new_unchecked(p.x, p.y + Fq::from(1u64));
        Point::from_witness(builder.clone(), &bad);
        assert!(check_circuit(&builder).is_err());
    }

    #[test]
    fn test_add_sub_dbl() {
        let mut rng = test_rng();
        let builder = new_builder::<Fr>();
        let (p, q) = (random_point(&mut rng), random_point(&mut rng));
        let a = Point::from_witness(builder.clone(), &p);
        let b = Point::from_witness(builder.clone(), &q);

        assert_eq!((&a + &b).get_value(), (p + q).into_affine());
        assert_eq!((&a - &b).get_value(), (p - q).into_affine());
        assert_eq!(a.dbl().get_value(), (p + p).into_affine());
        assert_eq!((-&a).get_value(), -p);
        assert!(check_circuit(&builder).is_ok());
    }

    #[test]
    fn test_mixed_constant_witness_add() {
        let mut rng = test_rng();
        let builder = new_builder::<Fr>();
        let (p, q) = (random_point(&mut rng), random_point(&mut rng));
        let a = Point::from_witness(builder.clone(), &p);
        let b = Point::from_constant(None, &q);
        assert_eq!((&a + &b).get_value(), (p + q).into_affine());
        assert_eq!((&b - &a).get_value(), (q - p).into_affine());
        assert!(check_circuit(&builder).is_ok());
    }

    #[test]
    fn test_constant_ops_emit_no_gates() {
        let mut rng = test_rng();
        let builder = new_builder::<Fr>();
        let (p, q) = (random_point(&mut rng), random_point(&mut rng));
        let before = builder.borrow().num_gates();
        let a = Point::from_constant(Some(builder.clone()), &p);
        let b = Point::from_constant(Some(builder.clone()), &q);
        let sum = (&a + &b).dbl();
        assert!(sum.is_constant());
        assert_eq!(sum.get_value(), ((p + q) + (p + q)).into_affine());
        assert_eq!(builder.borrow().num_gates(), before);
    }

    #[test]
    fn test_add_equal_x_fails() {
        let mut rng = test_rng();
        let builder = new_builder::<Fr>();
        let p = random_point(&mut rng);
        let a = Point::from_witness(builder.clone(), &p);
        let b = Point::from_witness(builder.clone(), &p);
        let _ = &a + &b;
        assert!(builder.borrow().base.failed());

        // The slope of P + P is unconstrained by the chord relation alone.
        builder.borrow_mut().base.clear_failure();
        assert!(check_circuit(&builder).is_err());
    }

    #[test]
    fn test_tampered_sum_fails() {
        let mut rng = test_rng();
        let builder = new_builder::<Fr>();
        let (p, q) = (random_point(&mut rng), random_point(&mut rng));
        let a = Point::from_witness(builder.clone(), &p);
        let b = Point::from_witness(builder.clone(), &q);
        let sum = &a + &b;
        let claimed = Point::from_witness(builder.clone(), &(p + p).into_affine());
        sum.assert_equal(&claimed, "sum mismatch");
        assert!(check_circuit(&builder).is_err());
    }

    #[test]
    fn test_scalar_mul() {
        let mut rng = test_rng();
        let builder = new_builder::<Fr>();
        let p = random_point(&mut rng);
        let k = Fr::rand(&mut rng);
        let a = Point::from_witness(builder.clone(), &p);
        let scalar = FieldT::from_witness(builder.clone(), k);
        let result = a.scalar_mul(&scalar);
        assert_eq!(result.get_value(), (p * k).into_affine());
        assert!(check_circuit(&builder).is_ok());
    }

    #[test]
    fn test_scalar_mul_by_zero_is_infinity() {
        let mut rng = test_rng();
        let builder = new_builder::<Fr>();
        let p = random_point(&mut rng);
        let a = Point::from_witness(builder.clone(), &p);
        let scalar = FieldT::from_witness(builder.clone(), Fr::from(0u64));
        let result = a.scalar_mul(&scalar);
        assert!(result.get_value().infinity);
        assert!(result.x.get_field_value().is_zero() && result.y.get_field_value().is_zero());
        assert!(check_circuit(&builder).is_ok());
    }

    #[test]
    fn test_fixed_base_zero_sum_is_infinity() {
        let mut rng = test_rng();
        let builder = new_builder::<Fr>();
        let points: Vec<G1Affine> = (0..2).map(|_| random_point(&mut rng)).collect();
        let zeros: Vec<FieldT<Fr>> = (0..2)
            .map(|_| FieldT::from_witness(builder.clone(), Fr::from(0u64)))
            .collect();
        let result = Point::fixed_base_batch_mul(&builder, &points, &zeros);
        assert!(result.get_value().infinity);
        assert!(!result.is_infinity.is_constant());
        assert!(check_circuit(&builder).is_ok());

        // Claiming a finite result for a zero sum breaks the flag's constraints.
        builder
            .borrow_mut()
            .base
            .set_variable_unchecked(result.is_infinity.witness_index, Fr::from(0u64));
        assert!(check_circuit(&builder).is_err());
    }

    #[test]
    fn test_batch_mul_skips_points_at_infinity() {
        let mut rng = test_rng();
        let builder = new_builder::<Fr>();
        let base = random_point(&mut rng);
        let p = random_point(&mut rng);
        let zero = FieldT::from_witness(builder.clone(), Fr::from(0u64));
        let infinity = Point::fixed_base_batch_mul(&builder, &[base], &[zero]);
        let finite = Point::from_witness(builder.clone(), &p);
        let (k0, k1) = (Fr::rand(&mut rng), Fr::rand(&mut rng));
        let scalars = [
            FieldT::from_witness(builder.clone(), k0),
            FieldT::from_witness(builder.clone(), k1),
        ];
        let result = Point::batch_mul(&[infinity, finite], &scalars);
        assert_eq!(result.get_value(), (p * k1).into_affine());

        let constant = Point::point_at_infinity(Some(builder.clone()));
        let only = Point::batch_mul(&[constant], &scalars[..1]);
        assert!(only.get_value().infinity);
        assert!(check_circuit(&builder).is_ok());
    }

    #[test]
    fn test_add_rejects_flagged_infinity() {
        let mut rng = test_rng();
        let builder = new_builder::<Fr>();
        let zero = FieldT::from_witness(builder.clone(), Fr::from(0u64));
        let infinity = Point::fixed_base_batch_mul(&builder, &[random_point(&mut rng)], &[zero]);
        let finite = Point::from_witness(builder.clone(), &random_point(&mut rng));
        let _ = &finite + &infinity;
        assert!(check_circuit(&builder).is_err());
    }

    #[test]
    fn test_batch_mul() {
        let mut rng = test_rng();
        let builder = new_builder::<Fr>();
        let points: Vec<G1Affine> = (0..3).map(|_| random_point(&mut rng)).collect();
        let scalars: Vec<Fr> = (0..3).map(|_| Fr::rand(&mut rng)).collect();
        let elements: Vec<Point> = points
            .iter()
            .map(|p| Point::from_witness(builder.clone(), p))
            .collect();
        let wires: Vec<FieldT<Fr>> = scalars
            .iter()
            .map(|k| FieldT::from_witness(builder.clone(), *k))
            .collect();
        let result = Point::batch_mul(&elements, &wires);
        let expected: G1Projective = points.iter().zip(&scalars).map(|(p, k)| *p * k).sum();
        assert_eq!(result.get_value(), expected.into_affine());
        assert!(check_circuit(&builder).is_ok());
    }

    #[test]
    fn test_scalar_mul_constant() {
        let mut rng = test_rng();
        let builder = new_builder::<Fr>();
        let points: Vec<G1Affine> = (0..2).map(|_| random_point(&mut rng)).collect();
        let scalars: Vec<Fr> = (0..2).map(|_| Fr::rand(&mut rng)).collect();
        let wires: Vec<FieldT<Fr>> = scalars
            .iter()
            .map(|k| FieldT::from_witness(builder.clone(), *k))
            .collect();

        let single = Point::scalar_mul_constant(&builder, &points[0], &wires[0]);
        assert_eq!(single.get_value(), (points[0] * scalars[0]).into_affine());

        let msm = Point::fixed_base_batch_mul(&builder, &points, &wires);
        let expected = points[0] * scalars[0] + points[1] * scalars[1];
        assert_eq!(msm.get_value(), expected.into_affine());
        assert!(check_circuit(&builder).is_ok());
    }
}
