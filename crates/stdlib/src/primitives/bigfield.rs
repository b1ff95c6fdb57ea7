//! Non-native field arithmetic.
//!
//! A `BigFieldT<F, T>` holds an element of the target field `T` inside a
//! circuit over the native field `F`. The element is split into four
//! 68-bit binary limbs plus a `prime_basis_limb` carrying the same integer
//! modulo the native modulus. Every multiplicative relation
//!
//! ```text
//! sum(a_i * b_i) + sum(c_j) = q * p + r
//! ```
//!
//! is checked twice: modulo 2^272 through the limbs, and modulo the native
//! modulus through the prime limb. Limb maxima are tracked so that both
//! sides stay below 2^272 * n and the two checks imply integer equality.

use std::marker::PhantomData;
use std::ops::{Add, Mul, Neg, Sub};

use ark_ff::PrimeField;
use h2v_numeric::{biguint_to_field, field_to_biguint, modulus_biguint};
use num_bigint::{BigInt, BigUint};
use num_traits::{One, Zero};

use super::bool::BoolT;
use super::field::{assert_bits_less_than, FieldT};
use super::witness::{validate_contexts, BuilderRef, WitnessT};

pub const NUM_LIMBS: usize = 4;
pub const NUM_LIMB_BITS: usize = 68;

/// Limbs growing past this width force a reduction.
const MAX_UNREDUCED_LIMB_BITS: u64 = NUM_LIMB_BITS as u64 + 10;

/// Binary basis 2^272.
const LOG2_BINARY_MODULUS: usize = NUM_LIMB_BITS * NUM_LIMBS;

fn pow2(bits: usize) -> BigUint {
    BigUint::one() << bits
}

fn mask(bits: usize) -> BigUint {
    pow2(bits) - 1u32
}

/// Four limbs of 68 bits; the top limb keeps every remaining bit.
fn split_limbs(value: &BigUint) -> [BigUint; NUM_LIMBS] {
    let m = mask(NUM_LIMB_BITS);
    [
        value & &m,
        (value >> NUM_LIMB_BITS) & &m,
        (value >> (2 * NUM_LIMB_BITS)) & &m,
        value >> (3 * NUM_LIMB_BITS),
    ]
}

fn constant_field<F: PrimeField>(ctx: &Option<BuilderRef<F>>, value: &BigUint) -> FieldT<F> {
    FieldT {
        context: ctx.clone(),
        ..FieldT::from_field(biguint_to_field(value))
    }
}

fn shift<F: PrimeField>(limb: usize) -> FieldT<F> {
    FieldT::from_field(biguint_to_field(&pow2(limb * NUM_LIMB_BITS)))
}

#[derive(Clone)]
pub struct Limb<F: PrimeField> {
    pub element: FieldT<F>,
    pub maximum_value: BigUint,
}

#[derive(Clone)]
pub struct BigFieldT<F: PrimeField, T: PrimeField> {
    pub(crate) context: Option<BuilderRef<F>>,
    pub(crate) binary_basis_limbs: [Limb<F>; NUM_LIMBS],
    pub(crate) prime_basis_limb: FieldT<F>,
    _target: PhantomData<T>,
}

impl<F: PrimeField, T: PrimeField> BigFieldT<F, T> {
    pub fn modulus() -> BigUint {
        modulus_biguint::<T>()
    }

    fn last_limb_bits() -> usize {
        Self::modulus().bits() as usize - 3 * NUM_LIMB_BITS
    }

    fn default_limb_bits() -> [usize; NUM_LIMBS] {
        [NUM_LIMB_BITS, NUM_LIMB_BITS, NUM_LIMB_BITS, Self::last_limb_bits()]
    }

    // ════════════════════════════════════════════════════════════════════
    //  Constructors
    // ════════════════════════════════════════════════════════════════════

    /// A constant. `value` is taken as an integer below 2^272, not reduced.
    pub fn from_constant(ctx: Option<BuilderRef<F>>, value: &BigUint) -> Self {
        let binary_basis_limbs = split_limbs(value).map(|limb| Limb {
            element: constant_field(&ctx, &limb),
            maximum_value: limb,
        });
        Self {
            prime_basis_limb: constant_field(&ctx, value),
            context: ctx,
            binary_basis_limbs,
            _target: PhantomData,
        }
    }

    pub fn from_field(ctx: Option<BuilderRef<F>>, value: T) -> Self {
        Self::from_constant(ctx, &field_to_biguint(&value))
    }

    pub fn zero() -> Self {
        Self::from_constant(None, &BigUint::zero())
    }

    pub fn one() -> Self {
        Self::from_constant(None, &BigUint::one())
    }

    fn from_limb_elements(
        ctx: Option<BuilderRef<F>>,
        elements: [FieldT<F>; NUM_LIMBS],
        maxima: [BigUint; NUM_LIMBS],
    ) -> Self {
        let scaled: Vec<FieldT<F>> = elements
            .iter()
            .enumerate()
            .map(|(i, e)| e * &shift(i))
            .collect();
        let prime_basis_limb = FieldT::accumulate(&scaled);
        let mut maxima = maxima.into_iter();
        let binary_basis_limbs = elements.map(|element| Limb {
            element,
            maximum_value: maxima.next().unwrap_or_default(),
        });
        Self {
            context: ctx,
            binary_basis_limbs,
            prime_basis_limb,
            _target: PhantomData,
        }
    }

    /// Limb witnesses for `value`, each range constrained to `limb_bits[i]`.
    fn witness_from_value(
        ctx: &BuilderRef<F>,
        value: &BigUint,
        limb_bits: [usize; NUM_LIMBS],
    ) -> Self {
        let parts = split_limbs(value);
        let elements: [FieldT<F>; NUM_LIMBS] = std::array::from_fn(|i| {
            let element = FieldT::from_witness(ctx.clone(), biguint_to_field(&parts[i]));
            element.create_range_constraint(limb_bits[i], "bigfield: limb out of range");
            element
        });
        Self::from_limb_elements(Some(ctx.clone()), elements, limb_bits.map(mask))
    }

    /// A fresh witness for `value` with range-constrained limbs.
    pub fn from_witness(ctx: BuilderRef<F>, value: T) -> Self {
        Self::witness_from_value(&ctx, &field_to_biguint(&value), Self::default_limb_bits())
    }

    /// Element whose little-endian bits are `bits`, which must encode an
    /// integer below the target modulus.
    pub fn from_bits_le(bits: &[BoolT<F>]) -> Self {
        assert!(
            bits.len() > 3 * NUM_LIMB_BITS && bits.len() <= 256,
            "unsupported bit length {}",
            bits.len()
        );
        assert_bits_less_than(bits, &Self::modulus(), "bigfield: value is not in field");
        let ctx = validate_contexts(&bits.iter().map(|b| &b.context).collect::<Vec<_>>());
        let elements: [FieldT<F>; NUM_LIMBS] = std::array::from_fn(|i| {
            let end = if i == NUM_LIMBS - 1 {
                bits.len()
            } else {
                (i + 1) * NUM_LIMB_BITS
            };
            FieldT::from_bits(&bits[i * NUM_LIMB_BITS..end])
        });
        Self::from_limb_elements(ctx, elements, Self::default_limb_bits().map(mask))
    }

    /// Canonical little-endian bits of the reduced value.
    pub fn to_bits_le(&self) -> Vec<BoolT<F>> {
        if self.is_constant() {
            let value = self.get_value() % Self::modulus();
            return (0..Self::modulus().bits())
                .map(|i| BoolT::constant(value.bit(i)))
                .collect();
        }
        let reduced = self.reduce();
        reduced.assert_is_in_field("bigfield: non-canonical value");
        reduced
            .binary_basis_limbs
            .iter()
            .zip(Self::default_limb_bits())
            .flat_map(|(limb, bits)| limb.element.to_bits(bits))
            .collect()
    }

    // ════════════════════════════════════════════════════════════════════
    //  Value access
    // ════════════════════════════════════════════════════════════════════

    /// The represented integer, not reduced modulo the target modulus.
    pub fn get_value(&self) -> BigUint {
        self.binary_basis_limbs
            .iter()
            .enumerate()
            .map(|(i, limb)| field_to_biguint(&limb.element.get_value()) << (i * NUM_LIMB_BITS))
            .sum()
    }

    pub fn get_field_value(&self) -> T {
        biguint_to_field(&self.get_value())
    }

    pub fn get_maximum_value(&self) -> BigUint {
        self.binary_basis_limbs
            .iter()
            .enumerate()
            .map(|(i, limb)| &limb.maximum_value << (i * NUM_LIMB_BITS))
            .sum()
    }

    pub fn is_constant(&self) -> bool {
        self.binary_basis_limbs
            .iter()
            .all(|limb| limb.element.is_constant())
            && self.prime_basis_limb.is_constant()
    }

    pub fn get_context(&self) -> &Option<BuilderRef<F>> {
        &self.context
    }

    fn limb_maxima(&self) -> [BigUint; NUM_LIMBS] {
        std::array::from_fn(|i| self.binary_basis_limbs[i].maximum_value.clone())
    }

    fn limb_values(&self) -> [BigUint; NUM_LIMBS] {
        std::array::from_fn(|i| field_to_biguint(&self.binary_basis_limbs[i].element.get_value()))
    }

    /// Binary basis limb wires, least significant first.
    pub fn limb_elements(&self) -> [FieldT<F>; NUM_LIMBS] {
        std::array::from_fn(|i| self.binary_basis_limbs[i].element.clone())
    }

    pub fn is_default_bounded(&self) -> bool {
        self.limb_maxima()
            .iter()
            .zip(Self::default_limb_bits())
            .all(|(max, bits)| max.bits() as usize <= bits)
    }

    // ════════════════════════════════════════════════════════════════════
    //  Linear operations
    // ════════════════════════════════════════════════════════════════════

    pub fn add(&self, other: &Self) -> Self {
        let ctx = validate_contexts(&[&self.context, &other.context]);
        let binary_basis_limbs = std::array::from_fn(|i| {
            let (a, b) = (&self.binary_basis_limbs[i], &other.binary_basis_limbs[i]);
            Limb {
                element: &a.element + &b.element,
                maximum_value: &a.maximum_value + &b.maximum_value,
            }
        });
        Self {
            context: ctx,
            binary_basis_limbs,
            prime_basis_limb: &self.prime_basis_limb + &other.prime_basis_limb,
            _target: PhantomData,
        }
        .reduction_check()
    }

    /// Limbs of a multiple of the target modulus that dominate `maxima`
    /// limb by limb, together with the multiple itself.
    ///
    /// Each of the lower three limbs borrows a power of two from its
    /// neighbour so every limb difference stays non-negative.
    fn subtraction_constant(maxima: &[BigUint; NUM_LIMBS]) -> ([BigUint; NUM_LIMBS], BigUint) {
        let widths: [usize; 3] =
            std::array::from_fn(|i| (maxima[i].bits() as usize).max(NUM_LIMB_BITS) + 1);
        let top_borrow = pow2(widths[2] - NUM_LIMB_BITS);
        let needed = (&maxima[3] + &top_borrow + 1u32) << (3 * NUM_LIMB_BITS);
        let p = Self::modulus();
        let multiple = &p * ((&needed + &p - 1u32) / &p);
        let c = split_limbs(&multiple);
        let limbs = [
            &c[0] + pow2(widths[0]),
            &c[1] + pow2(widths[1]) - pow2(widths[0] - NUM_LIMB_BITS),
            &c[2] + pow2(widths[2]) - pow2(widths[1] - NUM_LIMB_BITS),
            &c[3] - &top_borrow,
        ];
        (limbs, multiple)
    }

    /// `self - other + k * p` for a `k` keeping every limb non-negative.
    pub fn sub(&self, other: &Self) -> Self {
        let ctx = validate_contexts(&[&self.context, &other.context]);
        if self.is_constant() && other.is_constant() {
            let p = Self::modulus();
            let value = (self.get_value() % &p + &p - other.get_value() % &p) % &p;
            return Self::from_constant(ctx, &value);
        }
        let (offsets, multiple) = Self::subtraction_constant(&other.limb_maxima());
        let binary_basis_limbs = std::array::from_fn(|i| {
            let (a, b) = (&self.binary_basis_limbs[i], &other.binary_basis_limbs[i]);
            Limb {
                element: &(&a.element + &constant_field(&None, &offsets[i])) - &b.element,
                maximum_value: &a.maximum_value + &offsets[i],
            }
        });
        let prime_basis_limb = &(&self.prime_basis_limb + &constant_field(&None, &multiple))
            - &other.prime_basis_limb;
        Self {
            context: ctx,
            binary_basis_limbs,
            prime_basis_limb,
            _target: PhantomData,
        }
        .reduction_check()
    }

    pub fn negate(&self) -> Self {
        Self::zero().sub(self)
    }

    /// `predicate ? lhs : rhs`.
    pub fn conditional_assign(predicate: &BoolT<F>, lhs: &Self, rhs: &Self) -> Self {
        let ctx = validate_contexts(&[&predicate.context, &lhs.context, &rhs.context]);
        let binary_basis_limbs = std::array::from_fn(|i| {
            let (l, r) = (&lhs.binary_basis_limbs[i], &rhs.binary_basis_limbs[i]);
            Limb {
                element: FieldT::conditional_assign(predicate, &l.element, &r.element),
                maximum_value: (&l.maximum_value).max(&r.maximum_value).clone(),
            }
        });
        Self {
            context: ctx,
            binary_basis_limbs,
            prime_basis_limb: FieldT::conditional_assign(
                predicate,
                &lhs.prime_basis_limb,
                &rhs.prime_basis_limb,
            ),
            _target: PhantomData,
        }
    }

    // ════════════════════════════════════════════════════════════════════
    //  Reduction
    // ════════════════════════════════════════════════════════════════════

    /// Reduce when any limb has outgrown the unreduced bound.
    pub fn reduction_check(self) -> Self {
        let overflowing = self
            .binary_basis_limbs
            .iter()
            .any(|limb| limb.maximum_value.bits() > MAX_UNREDUCED_LIMB_BITS);
        if overflowing {
            self.reduce()
        } else {
            self
        }
    }

    /// Congruent element with default-width limbs.
    pub fn reduce(&self) -> Self {
        if self.is_constant() {
            return Self::from_constant(self.context.clone(), &(self.get_value() % Self::modulus()));
        }
        Self::evaluate_multiply_add(
            std::slice::from_ref(self),
            &[Self::one()],
            &[],
            None,
            "bigfield: reduce",
        )
    }

    /// Whether `sum(a_i * b_i) + sum(c_j)` and its quotient stay below the
    /// CRT modulus 2^272 * n with room to spare.
    fn fits_crt_bound(a: &[Self], b: &[Self], c: &[Self]) -> bool {
        let total: BigUint = a
            .iter()
            .zip(b)
            .map(|(x, y)| x.get_maximum_value() * y.get_maximum_value())
            .chain(c.iter().map(|z| z.get_maximum_value()))
            .sum();
        (total << 2) < pow2(LOG2_BINARY_MODULUS) * modulus_biguint::<F>()
    }

    // ════════════════════════════════════════════════════════════════════
    //  Multiplicative operations
    // ════════════════════════════════════════════════════════════════════

    pub fn mul(&self, other: &Self) -> Self {
        if self.is_constant() && other.is_constant() {
            let ctx = validate_contexts(&[&self.context, &other.context]);
            let value = (self.get_value() * other.get_value()) % Self::modulus();
            return Self::from_constant(ctx, &value);
        }
        self.madd(other, &[])
    }

    pub fn sqr(&self) -> Self {
        self.mul(self)
    }

    /// `self * to_mul + sum(to_add)`, reduced.
    pub fn madd(&self, to_mul: &Self, to_add: &[Self]) -> Self {
        let (a, b) = (self.clone(), to_mul.clone());
        let (a, b) = if Self::fits_crt_bound(
            std::slice::from_ref(&a),
            std::slice::from_ref(&b),
            to_add,
        ) {
            (a, b)
        } else {
            (a.reduce(), b.reduce())
        };
        Self::evaluate_multiply_add(&[a], &[b], to_add, None, "bigfield: multiply-add")
    }

    /// `self / denominator`, with the denominator constrained non-zero.
    pub fn div(&self, denominator: &Self) -> Self {
        self.internal_div(denominator, true)
    }

    /// `self / denominator` for a denominator the caller has already
    /// constrained to be non-zero.
    pub(crate) fn div_without_denominator_check(&self, denominator: &Self) -> Self {
        self.internal_div(denominator, false)
    }

    fn internal_div(&self, denominator: &Self, check_for_zero: bool) -> Self {
        let ctx = validate_contexts(&[&self.context, &denominator.context]);
        let inverse = denominator.get_field_value().inverse();
        if inverse.is_none() && denominator.is_constant() {
            match &ctx {
                Some(ctx) => ctx
                    .borrow_mut()
                    .base
                    .failure("bigfield: division by constant zero".to_string()),
                None => panic!("bigfield: division by constant zero"),
            }
        }
        let quotient_value = inverse.map_or(T::zero(), |inverse| self.get_field_value() * inverse);
        let Some(ctx) = ctx else {
            return Self::from_field(None, quotient_value);
        };
        if self.is_constant() && denominator.is_constant() {
            return Self::from_field(Some(ctx), quotient_value);
        }
        if check_for_zero {
            denominator.assert_is_not_zero("bigfield: division by zero");
        }

        let quotient = Self::from_witness(ctx, quotient_value);
        let denominator = if Self::fits_crt_bound(
            std::slice::from_ref(&quotient),
            std::slice::from_ref(denominator),
            &[],
        ) {
            denominator.clone()
        } else {
            denominator.reduce()
        };
        // quotient * denominator - numerator = 0 mod p
        Self::evaluate_multiply_add(
            &[quotient.clone()],
            &[denominator],
            &[self.negate()],
            Some(&Self::zero()),
            "bigfield: division",
        );
        quotient
    }

    // ════════════════════════════════════════════════════════════════════
    //  Assertions
    // ════════════════════════════════════════════════════════════════════

    /// Constrain `self == other` modulo the target modulus.
    pub fn assert_equal(&self, other: &Self, msg: &str) {
        if self.is_constant() && other.is_constant() {
            let p = Self::modulus();
            let equal = self.get_value() % &p == other.get_value() % &p;
            match validate_contexts(&[&self.context, &other.context]) {
                Some(ctx) if !equal => ctx.borrow_mut().base.failure(msg.to_string()),
                None => assert!(equal, "{msg}"),
                _ => {}
            }
            return;
        }
        let diff = self.sub(other);
        Self::evaluate_multiply_add(&[diff], &[Self::one()], &[], Some(&Self::zero()), msg);
    }

    /// Constrain `self != 0` modulo the target modulus.
    ///
    /// An integer below the maximum value is a multiple of `p` only when its
    /// prime basis limb equals `k * p mod n` for one of the multiples `k * p`
    /// in range. The product of the differences is constrained invertible.
    pub fn assert_is_not_zero(&self, msg: &str) {
        let p = Self::modulus();
        if self.is_constant() {
            if (self.get_value() % &p).is_zero() {
                match &self.context {
                    Some(ctx) => ctx.borrow_mut().base.failure(msg.to_string()),
                    None => panic!("{msg}"),
                }
            }
            return;
        }
        let element = if self.get_maximum_value() >= (&p << 2usize) {
            self.reduce()
        } else {
            self.clone()
        };
        let maximum = element.get_maximum_value();
        let limb = &element.prime_basis_limb;
        let mut product = limb.clone();
        let mut multiple = p.clone();
        while multiple <= maximum {
            product = product * (limb - &constant_field(&None, &multiple));
            multiple += &p;
        }
        product.assert_is_not_zero(msg);
    }

    pub fn assert_is_not_equal(&self, other: &Self, msg: &str) {
        self.sub(other).assert_is_not_zero(msg);
    }

    /// `self == other` modulo the target modulus, as a constrained boolean.
    ///
    /// The difference is reduced and pinned below `p`, so it is zero exactly
    /// when its prime basis limb is.
    pub fn is_equal(&self, other: &Self) -> BoolT<F> {
        let diff = self.sub(other);
        if diff.is_constant() {
            return BoolT {
                context: diff.context.clone(),
                ..BoolT::constant((diff.get_value() % Self::modulus()).is_zero())
            };
        }
        let reduced = diff.reduce();
        reduced.assert_is_in_field("bigfield: non-canonical difference");
        reduced.prime_basis_limb.is_zero()
    }

    /// Constrain the integer value to lie below the target modulus.
    ///
    /// Expects default-width limbs, as produced by `reduce`. Computes
    /// `(p - 1) - self` limb by limb with boolean borrows and range
    /// constrains every difference.
    pub fn assert_is_in_field(&self, msg: &str) {
        let p = Self::modulus();
        if self.is_constant() {
            if self.get_value() >= p {
                match &self.context {
                    Some(ctx) => ctx.borrow_mut().base.failure(msg.to_string()),
                    None => panic!("{msg}"),
                }
            }
            return;
        }
        debug_assert!(self.is_default_bounded());
        let ctx = self
            .context
            .clone()
            .expect("witness bigfield elements carry a builder");
        let bound = split_limbs(&(&p - 1u32));
        let values = self.limb_values();
        let limb_bits = Self::default_limb_bits();

        let mut borrow_in: Option<BoolT<F>> = None;
        let mut borrow_in_value = false;
        for i in 0..NUM_LIMBS {
            let subtrahend = &values[i] + u32::from(borrow_in_value);
            let mut diff = constant_field(&None, &bound[i]) - self.binary_basis_limbs[i].element.clone();
            if let Some(borrow) = &borrow_in {
                diff = diff - borrow.to_field();
            }
            if i < NUM_LIMBS - 1 {
                let borrow_out_value = subtrahend > bound[i];
                let borrow_out =
                    BoolT::from_witness(&WitnessT::from_bool(ctx.clone(), borrow_out_value));
                diff = diff + borrow_out.to_field() * shift(1);
                borrow_in = Some(borrow_out);
                borrow_in_value = borrow_out_value;
            }
            diff.create_range_constraint(limb_bits[i], msg);
        }
    }

    // ════════════════════════════════════════════════════════════════════
    //  Core relation
    // ════════════════════════════════════════════════════════════════════

    /// Partial products of `x * y` below 2^272, split at 2^136.
    ///
    /// Returns the terms and maxima at weight 2^0 and at weight 2^136.
    fn partial_products(
        x: &Self,
        y: &Self,
    ) -> ((Vec<FieldT<F>>, BigUint), (Vec<FieldT<F>>, BigUint)) {
        let xe = x.limb_elements();
        let ye = y.limb_elements();
        let xm = x.limb_maxima();
        let ym = y.limb_maxima();
        let s1: FieldT<F> = shift(1);
        let p1 = pow2(NUM_LIMB_BITS);

        let lo = vec![
            &xe[0] * &ye[0],
            &(&xe[1] * &ye[0]) * &s1,
            &(&xe[0] * &ye[1]) * &s1,
        ];
        let lo_max = &xm[0] * &ym[0] + (&xm[1] * &ym[0] + &xm[0] * &ym[1]) * &p1;

        let mut hi = vec![&xe[2] * &ye[0], &xe[1] * &ye[1], &xe[0] * &ye[2]];
        for (i, j) in [(3, 0), (2, 1), (1, 2), (0, 3)] {
            hi.push(&(&xe[i] * &ye[j]) * &s1);
        }
        let hi_max = &xm[2] * &ym[0]
            + &xm[1] * &ym[1]
            + &xm[0] * &ym[2]
            + (&xm[3] * &ym[0] + &xm[2] * &ym[1] + &xm[1] * &ym[2] + &xm[0] * &ym[3]) * &p1;

        ((lo, lo_max), (hi, hi_max))
    }

    /// Constrain `sum(a_i * b_i) + sum(c_j) = q * p + r` and return `r`.
    ///
    /// With `remainder == None` a fresh reduced `r` is created; otherwise the
    /// given element (with default-width limbs) is used.
    fn evaluate_multiply_add(
        a: &[Self],
        b: &[Self],
        c: &[Self],
        remainder: Option<&Self>,
        msg: &str,
    ) -> Self {
        assert_eq!(a.len(), b.len());
        let p = Self::modulus();

        let numerator: BigUint = a
            .iter()
            .zip(b)
            .map(|(x, y)| x.get_value() * y.get_value())
            .chain(c.iter().map(|z| z.get_value()))
            .sum();

        let contexts: Vec<&Option<BuilderRef<F>>> = a
            .iter()
            .chain(b)
            .chain(c)
            .chain(remainder)
            .map(|e| &e.context)
            .collect();
        let Some(ctx) = validate_contexts(&contexts) else {
            let value = &numerator % &p;
            if let Some(r) = remainder {
                assert!(r.get_value() % &p == value, "{msg}");
            }
            return Self::from_constant(None, &value);
        };

        let (quotient_value, remainder_value) = match remainder {
            None => (&numerator / &p, &numerator % &p),
            Some(r) => {
                let r_value = r.get_value();
                if numerator < r_value || (&numerator - &r_value) % &p != BigUint::zero() {
                    ctx.borrow_mut().base.failure(msg.to_string());
                }
                let q = if numerator >= r_value {
                    (&numerator - &r_value) / &p
                } else {
                    BigUint::zero()
                };
                (q, r_value)
            }
        };

        let total_max: BigUint = a
            .iter()
            .zip(b)
            .map(|(x, y)| x.get_maximum_value() * y.get_maximum_value())
            .chain(c.iter().map(|z| z.get_maximum_value()))
            .sum();
        let quotient_bits = ((&total_max / &p).bits() as usize).max(1);
        let quotient_limb_bits: [usize; NUM_LIMBS] = std::array::from_fn(|i| {
            let available = quotient_bits.saturating_sub(i * NUM_LIMB_BITS);
            if i == NUM_LIMBS - 1 {
                available
            } else {
                available.min(NUM_LIMB_BITS)
            }
        });
        let quotient = Self::witness_from_value(&ctx, &quotient_value, quotient_limb_bits);
        let remainder = match remainder {
            Some(r) => r.clone(),
            None => Self::witness_from_value(&ctx, &remainder_value, Self::default_limb_bits()),
        };

        // Binary basis: -q * p = q * (2^272 - p) mod 2^272.
        let neg_modulus = Self::from_constant(None, &(pow2(LOG2_BINARY_MODULUS) - &p));
        let mut lo_terms = Vec::new();
        let mut hi_terms = Vec::new();
        let mut lo_max = BigUint::zero();
        let mut hi_max = BigUint::zero();
        for (x, y) in a.iter().zip(b).chain(std::iter::once((&quotient, &neg_modulus))) {
            let ((lo, lo_m), (hi, hi_m)) = Self::partial_products(x, y);
            lo_terms.extend(lo);
            hi_terms.extend(hi);
            lo_max += lo_m;
            hi_max += hi_m;
        }
        let s1: FieldT<F> = shift(1);
        let p1 = pow2(NUM_LIMB_BITS);
        for z in c {
            let (e, m) = (z.limb_elements(), z.limb_maxima());
            lo_terms.push(e[0].clone());
            lo_terms.push(&e[1] * &s1);
            hi_terms.push(e[2].clone());
            hi_terms.push(&e[3] * &s1);
            lo_max += &m[0] + &m[1] * &p1;
            hi_max += &m[2] + &m[3] * &p1;
        }
        let r = remainder.limb_elements();
        lo_terms.push(-r[0].clone());
        lo_terms.push(-(&r[1] * &s1));
        hi_terms.push(-r[2].clone());
        hi_terms.push(-(&r[3] * &s1));

        // Integer values of both halves, for the carry witnesses.
        let signed = |terms: &[FieldT<F>]| -> BigInt {
            let modulus = BigInt::from(modulus_biguint::<F>());
            let half = &modulus >> 1;
            terms
                .iter()
                .map(|t| {
                    let v = BigInt::from(field_to_biguint(&t.get_value()));
                    if v > half {
                        v - &modulus
                    } else {
                        v
                    }
                })
                .sum()
        };
        let carry_shift = 2 * NUM_LIMB_BITS;
        let carry_shift_field: FieldT<F> = shift(2);

        let lo_value = signed(&lo_terms);
        let carry_lo_value = lo_value.to_biguint().unwrap_or_default() >> carry_shift;
        let carry_lo_max = &lo_max >> carry_shift;
        let carry_lo = FieldT::from_witness(ctx.clone(), biguint_to_field(&carry_lo_value));
        carry_lo.create_range_constraint((carry_lo_max.bits() as usize).max(1), msg);
        lo_terms.push(-(&carry_lo * &carry_shift_field));
        FieldT::accumulate(&lo_terms).assert_is_zero(msg);

        hi_terms.push(carry_lo.clone());
        hi_max += &carry_lo_max;
        let hi_value = signed(&hi_terms);
        let carry_hi_value = hi_value.to_biguint().unwrap_or_default() >> carry_shift;
        let carry_hi_max = &hi_max >> carry_shift;
        let carry_hi = FieldT::from_witness(ctx.clone(), biguint_to_field(&carry_hi_value));
        carry_hi.create_range_constraint((carry_hi_max.bits() as usize).max(1), msg);
        hi_terms.push(-(&carry_hi * &carry_shift_field));
        FieldT::accumulate(&hi_terms).assert_is_zero(msg);

        // Prime basis.
        let p_mod_n = constant_field::<F>(&None, &p);
        let mut prime_terms: Vec<FieldT<F>> = a
            .iter()
            .zip(b)
            .map(|(x, y)| &x.prime_basis_limb * &y.prime_basis_limb)
            .collect();
        prime_terms.extend(c.iter().map(|z| z.prime_basis_limb.clone()));
        prime_terms.push(-(&quotient.prime_basis_limb * &p_mod_n));
        prime_terms.push(-remainder.prime_basis_limb.clone());
        FieldT::accumulate(&prime_terms).assert_is_zero(msg);

        remainder
    }
}

impl<F: PrimeField, T: PrimeField> Add for &BigFieldT<F, T> {
    type Output = BigFieldT<F, T>;
    fn add(self, rhs: Self) -> Self::Output {
        BigFieldT::add(self, rhs)
    }
}

impl<F: PrimeField, T: PrimeField> Sub for &BigFieldT<F, T> {
    type Output = BigFieldT<F, T>;
    fn sub(self, rhs: Self) -> Self::Output {
        BigFieldT::sub(self, rhs)
    }
}

impl<F: PrimeField, T: PrimeField> Mul for &BigFieldT<F, T> {
    type Output = BigFieldT<F, T>;
    fn mul(self, rhs: Self) -> Self::Output {
        BigFieldT::mul(self, rhs)
    }
}

impl<F: PrimeField, T: PrimeField> Neg for &BigFieldT<F, T> {
    type Output = BigFieldT<F, T>;
    fn neg(self) -> Self::Output {
        self.negate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitives::witness::new_builder;
    use ark_bn254::{Fq, Fr};
    use ark_ff::{Field, UniformRand};
    use h2v_circuit_builder::UltraCircuitChecker;

    type BFq = BigFieldT<Fr, Fq>;

    fn check_circuit(builder: &BuilderRef<Fr>) -> Result<(), String> {
        UltraCircuitChecker::check(&builder.borrow())
    }

    #[test]
    fn test_constant_arithmetic() {
        let mut rng = ark_std::test_rng();
        let (x, y) = (Fq::rand(&mut rng), Fq::rand(&mut rng));
        let a = BFq::from_field(None, x);
        let b = BFq::from_field(None, y);
        assert_eq!((&a + &b).get_field_value(), x + y);
        assert_eq!((&a - &b).get_field_value(), x - y);
        assert_eq!((&a * &b).get_field_value(), x * y);
        assert_eq!(a.div(&b).get_field_value(), x / y);
        assert!(a.is_constant());
    }

    #[test]
    fn test_witness_arithmetic() {
        let mut rng = ark_std::test_rng();
        let builder = new_builder::<Fr>();
        for _ in 0..4 {
            let (x, y) = (Fq::rand(&mut rng), Fq::rand(&mut rng));
            let a = BFq::from_witness(builder.clone(), x);
            let b = BFq::from_witness(builder.clone(), y);
            assert_eq!((&a + &b).get_field_value(), x + y);
            assert_eq!((&a - &b).get_field_value(), x - y);
            assert_eq!((-&a).get_field_value(), -x);
            assert_eq!((&a * &b).get_field_value(), x * y);
            assert_eq!(a.sqr().get_field_value(), x.square());
            assert_eq!(a.div(&b).get_field_value(), x / y);
        }
        assert!(check_circuit(&builder).is_ok());
    }

    #[test]
    fn test_mixed_constant_witness() {
        let mut rng = ark_std::test_rng();
        let builder = new_builder::<Fr>();
        let (x, y) = (Fq::rand(&mut rng), Fq::rand(&mut rng));
        let a = BFq::from_witness(builder.clone(), x);
        let b = BFq::from_field(None, y);
        assert_eq!((&a * &b).get_field_value(), x * y);
        assert_eq!((&b - &a).get_field_value(), y - x);
        assert_eq!(b.div(&a).get_field_value(), y / x);
        assert!(check_circuit(&builder).is_ok());
    }

    #[test]
    fn test_madd() {
        let mut rng = ark_std::test_rng();
        let builder = new_builder::<Fr>();
        let values: Vec<Fq> = (0..4).map(|_| Fq::rand(&mut rng)).collect();
        let elements: Vec<BFq> = values
            .iter()
            .map(|v| BFq::from_witness(builder.clone(), *v))
            .collect();
        let result = elements[0].madd(&elements[1], &elements[2..]);
        assert_eq!(
            result.get_field_value(),
            values[0] * values[1] + values[2] + values[3]
        );
        assert!(result.is_default_bounded());
        assert!(check_circuit(&builder).is_ok());
    }

    #[test]
    fn test_long_chains_stay_sound() {
        let mut rng = ark_std::test_rng();
        let builder = new_builder::<Fr>();
        let x = Fq::rand(&mut rng);
        let a = BFq::from_witness(builder.clone(), x);
        let mut acc = a.clone();
        let mut expected = x;
        for _ in 0..2000 {
            acc = &acc - &a;
            acc = &acc + &a;
            acc = &acc + &a;
            expected += x;
        }
        for limb in &acc.binary_basis_limbs {
            assert!(limb.maximum_value.bits() <= MAX_UNREDUCED_LIMB_BITS);
        }
        assert_eq!(acc.get_field_value(), expected);
        let squared = acc.sqr();
        assert_eq!(squared.get_field_value(), expected.square());
        assert!(check_circuit(&builder).is_ok());
    }

    #[test]
    fn test_assert_equal() {
        let mut rng = ark_std::test_rng();
        let builder = new_builder::<Fr>();
        let (x, y) = (Fq::rand(&mut rng), Fq::rand(&mut rng));
        let a = BFq::from_witness(builder.clone(), x);
        let b = BFq::from_witness(builder.clone(), y);
        let sum = &a + &b;
        let expected = BFq::from_witness(builder.clone(), x + y);
        sum.assert_equal(&expected, "sum");
        assert!(check_circuit(&builder).is_ok());

        a.assert_equal(&b, "a != b");
        assert_eq!(check_circuit(&builder), Err("builder failed: a != b".to_string()));
    }

    #[test]
    fn test_tampered_product_fails() {
        let mut rng = ark_std::test_rng();
        let builder = new_builder::<Fr>();
        let a = BFq::from_witness(builder.clone(), Fq::rand(&mut rng));
        let b = BFq::from_witness(builder.clone(), Fq::rand(&mut rng));
        let c = &a * &b;
        assert!(check_circuit(&builder).is_ok());

        let idx = c.binary_basis_limbs[0].element.witness_index;
        let value = builder.borrow().base.get_variable(idx);
        builder
            .borrow_mut()
            .base
            .set_variable_unchecked(idx, value + Fr::from(1u64));
        assert!(check_circuit(&builder).is_err());
    }

    #[test]
    fn test_division_by_zero_fails() {
        let builder = new_builder::<Fr>();
        let a = BFq::from_witness(builder.clone(), Fq::from(5u64));
        let zero = BFq::from_witness(builder.clone(), Fq::from(0u64));
        let _ = a.div(&zero);
        assert!(builder.borrow().base.failed());
    }

    #[test]
    fn test_zero_denominator_is_constrained() {
        // 0 / 0 with quotient 0 satisfies q * d - n = 0 mod p.
        let builder = new_builder::<Fr>();
        let a = BFq::from_witness(builder.clone(), Fq::from(0u64));
        let zero = BFq::from_witness(builder.clone(), Fq::from(0u64));
        let _ = a.div(&zero);
        builder.borrow_mut().base.clear_failure();
        assert!(check_circuit(&builder).is_err());
    }

    #[test]
    fn test_assert_is_not_equal() {
        let mut rng = ark_std::test_rng();
        let builder = new_builder::<Fr>();
        let x = Fq::rand(&mut rng);
        let a = BFq::from_witness(builder.clone(), x);
        let b = BFq::from_witness(builder.clone(), x + Fq::from(1u64));
        a.assert_is_not_equal(&b, "distinct");
        (&a + &a).assert_is_not_zero("nonzero sum");
        assert!(check_circuit(&builder).is_ok());

        // Congruent but not identical integers.
        let c = &(&a + &b) - &b;
        a.assert_is_not_equal(&c, "congruent");
        assert_eq!(check_circuit(&builder), Err("builder failed: congruent".to_string()));
    }

    #[test]
    fn test_is_equal() {
        let mut rng = ark_std::test_rng();
        let builder = new_builder::<Fr>();
        let x = Fq::rand(&mut rng);
        let a = BFq::from_witness(builder.clone(), x);
        let b = BFq::from_witness(builder.clone(), x);
        let c = BFq::from_field(None, x + Fq::from(2u64));
        assert!(a.is_equal(&b).get_value());
        assert!(!a.is_equal(&c).get_value());
        assert!((&a + &c).is_equal(&(&c + &b)).get_value());
        assert!(BFq::one().is_equal(&BFq::one()).is_constant());
        assert!(check_circuit(&builder).is_ok());
    }

    #[test]
    fn test_assert_is_in_field() {
        let builder = new_builder::<Fr>();
        let a = BFq::from_witness(builder.clone(), -Fq::from(1u64));
        a.assert_is_in_field("in field");
        assert!(check_circuit(&builder).is_ok());

        // The modulus itself has default-width limbs but is not canonical.
        let builder = new_builder::<Fr>();
        let p = BFq::witness_from_value(&builder, &BFq::modulus(), BFq::default_limb_bits());
        p.assert_is_in_field("not in field");
        assert_eq!(check_circuit(&builder), Err("builder failed: not in field".to_string()));
    }

    #[test]
    fn test_bits_roundtrip() {
        let mut rng = ark_std::test_rng();
        let builder = new_builder::<Fr>();
        let x = Fq::rand(&mut rng);
        let a = BFq::from_witness(builder.clone(), x);
        let doubled = &a + &a;
        let bits = doubled.to_bits_le();
        assert_eq!(bits.len() as u64, BFq::modulus().bits());
        let expected = field_to_biguint(&(x + x));
        for (i, bit) in bits.iter().enumerate() {
            assert_eq!(bit.get_value(), expected.bit(i as u64));
        }
        let mut padded = bits.clone();
        padded.resize(256, BoolT::constant(false));
        let back = BFq::from_bits_le(&padded);
        assert_eq!(back.get_field_value(), x + x);
        back.assert_equal(&doubled, "roundtrip");
        assert!(check_circuit(&builder).is_ok());
    }

    #[test]
    fn test_conditional_assign() {
        let builder = new_builder::<Fr>();
        let a = BFq::from_witness(builder.clone(), Fq::from(3u64));
        let b = BFq::from_field(None, Fq::from(9u64));
        for value in [true, false] {
            let pred = BoolT::from_witness(&WitnessT::from_bool(builder.clone(), value));
            let chosen = BFq::conditional_assign(&pred, &a, &b);
            let expected = if value { 3u64 } else { 9 };
            assert_eq!(chosen.get_field_value(), Fq::from(expected));
            let _ = chosen.sqr();
        }
        assert!(check_circuit(&builder).is_ok());
    }
}
