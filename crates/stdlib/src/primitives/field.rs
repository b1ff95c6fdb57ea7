//! Native circuit field element.
//!
//! A `FieldT<F>` is either a constant or an affine image of a single witness:
//!
//! ```text
//! value = witness * multiplicative_constant + additive_constant
//! ```
//!
//! Additions and multiplications by constants only touch the two scaling
//! factors. A gate is created when two distinct witnesses meet, or when a
//! consumer needs a normalized witness index.

use std::ops::{Add, AddAssign, Mul, MulAssign, Neg, Sub, SubAssign};

use ark_ff::{BigInteger, PrimeField};
use h2v_circuit_builder::gate_data::{AddQuad, AddTriple, ArithmeticTriple, MulQuad};
use h2v_circuit_builder::ultra_builder::DEFAULT_PLOOKUP_RANGE_BITNUM;
use h2v_numeric::{biguint_to_field, field_to_biguint};
use num_bigint::BigUint;

use super::bool::BoolT;
use super::witness::{validate_contexts, BuilderRef, WitnessT, IS_CONSTANT};

#[derive(Clone)]
pub struct FieldT<F: PrimeField> {
    pub(crate) context: Option<BuilderRef<F>>,
    pub(crate) additive_constant: F,
    pub(crate) multiplicative_constant: F,
    pub(crate) witness_index: u32,
}

impl<F: PrimeField> FieldT<F> {
    // ════════════════════════════════════════════════════════════════════
    //  Constructors
    // ════════════════════════════════════════════════════════════════════

    /// A constant without builder context.
    pub fn from_field(value: F) -> Self {
        Self {
            context: None,
            additive_constant: value,
            multiplicative_constant: F::one(),
            witness_index: IS_CONSTANT,
        }
    }

    pub fn from_u64(value: u64) -> Self {
        Self::from_field(F::from(value))
    }

    pub fn zero() -> Self {
        Self::from_field(F::zero())
    }

    pub fn constant_with_context(ctx: BuilderRef<F>, value: F) -> Self {
        Self {
            context: Some(ctx),
            ..Self::from_field(value)
        }
    }

    pub fn from_witness_t(witness: &WitnessT<F>) -> Self {
        Self {
            context: Some(witness.context.clone()),
            additive_constant: F::zero(),
            multiplicative_constant: F::one(),
            witness_index: witness.witness_index,
        }
    }

    pub fn from_witness_index(ctx: BuilderRef<F>, witness_index: u32) -> Self {
        Self {
            context: Some(ctx),
            additive_constant: F::zero(),
            multiplicative_constant: F::one(),
            witness_index,
        }
    }

    /// A fresh, unconstrained witness holding `value`.
    pub fn from_witness(ctx: BuilderRef<F>, value: F) -> Self {
        Self::from_witness_t(&WitnessT::new(ctx, value))
    }

    // ════════════════════════════════════════════════════════════════════
    //  Value access
    // ════════════════════════════════════════════════════════════════════

    pub fn get_value(&self) -> F {
        match (&self.context, self.is_constant()) {
            (Some(ctx), false) => {
                let witness = ctx.borrow().base.get_variable(self.witness_index);
                self.multiplicative_constant * witness + self.additive_constant
            }
            _ => self.additive_constant,
        }
    }

    pub fn get_context(&self) -> &Option<BuilderRef<F>> {
        &self.context
    }

    pub fn is_constant(&self) -> bool {
        self.witness_index == IS_CONSTANT
    }

    pub fn is_normalized(&self) -> bool {
        self.is_constant()
            || (self.multiplicative_constant.is_one() && self.additive_constant.is_zero())
    }

    fn require_context(&self) -> BuilderRef<F> {
        self.context
            .clone()
            .expect("witness field elements carry a builder")
    }

    /// Wire index for gate construction: the zero variable for constants.
    fn wire(&self, zero_idx: u32) -> u32 {
        if self.is_constant() {
            zero_idx
        } else {
            self.witness_index
        }
    }

    /// Scaling of the wire returned by `wire`.
    fn wire_scaling(&self) -> F {
        if self.is_constant() {
            F::zero()
        } else {
            self.multiplicative_constant
        }
    }

    // ════════════════════════════════════════════════════════════════════
    //  Normalization
    // ════════════════════════════════════════════════════════════════════

    /// Copy with `multiplicative_constant == 1` and `additive_constant == 0`.
    pub fn normalize(&self) -> Self {
        if self.is_normalized() {
            return self.clone();
        }
        let ctx = self.require_context();
        let result_index = {
            let mut builder = ctx.borrow_mut();
            let value = builder.base.get_variable(self.witness_index);
            let result_index = builder
                .base
                .add_variable(value * self.multiplicative_constant + self.additive_constant);
            let zero_idx = builder.base.zero_idx();
            builder.create_add_gate(&AddTriple {
                a: self.witness_index,
                b: zero_idx,
                c: result_index,
                a_scaling: self.multiplicative_constant,
                b_scaling: F::zero(),
                c_scaling: -F::one(),
                const_scaling: self.additive_constant,
            });
            result_index
        };
        Self::from_witness_index(ctx, result_index)
    }

    /// Normalized witness index. Constants are first pinned to a fixed variable.
    pub fn get_witness_index(&self) -> u32 {
        if self.is_constant() {
            let ctx = self.require_context();
            let idx = ctx.borrow_mut().put_constant_variable(self.additive_constant);
            return idx;
        }
        self.normalize().witness_index
    }

    /// Expose the value as a public input. Returns its public input position.
    pub fn set_public(&self) -> u32 {
        let ctx = self.require_context();
        let index = self.get_witness_index();
        let position = ctx.borrow_mut().base.set_public_input(index);
        position
    }

    // ════════════════════════════════════════════════════════════════════
    //  Arithmetic
    // ════════════════════════════════════════════════════════════════════

    fn add_impl(&self, other: &Self) -> Self {
        let ctx = validate_contexts(&[&self.context, &other.context]);
        let additive_constant = self.additive_constant + other.additive_constant;

        match (self.is_constant(), other.is_constant()) {
            (true, true) => Self {
                context: ctx,
                ..Self::from_field(additive_constant)
            },
            (false, true) => Self {
                context: ctx,
                additive_constant,
                ..self.clone()
            },
            (true, false) => Self {
                context: ctx,
                additive_constant,
                ..other.clone()
            },
            (false, false) if self.witness_index == other.witness_index => Self {
                context: ctx,
                additive_constant,
                multiplicative_constant: self.multiplicative_constant
                    + other.multiplicative_constant,
                witness_index: self.witness_index,
            },
            (false, false) => {
                let ctx = ctx.expect("witness field elements carry a builder");
                let result_index = {
                    let mut builder = ctx.borrow_mut();
                    let left = builder.base.get_variable(self.witness_index);
                    let right = builder.base.get_variable(other.witness_index);
                    let result_index = builder.base.add_variable(
                        left * self.multiplicative_constant
                            + right * other.multiplicative_constant
                            + additive_constant,
                    );
                    builder.create_add_gate(&AddTriple {
                        a: self.witness_index,
                        b: other.witness_index,
                        c: result_index,
                        a_scaling: self.multiplicative_constant,
                        b_scaling: other.multiplicative_constant,
                        c_scaling: -F::one(),
                        const_scaling: additive_constant,
                    });
                    result_index
                };
                Self::from_witness_index(ctx, result_index)
            }
        }
    }

    fn scale(&self, factor: F, ctx: Option<BuilderRef<F>>) -> Self {
        if self.is_constant() {
            return Self {
                context: ctx,
                ..Self::from_field(self.additive_constant * factor)
            };
        }
        Self {
            context: ctx,
            additive_constant: self.additive_constant * factor,
            multiplicative_constant: self.multiplicative_constant * factor,
            witness_index: self.witness_index,
        }
    }

    fn mul_impl(&self, other: &Self) -> Self {
        let ctx = validate_contexts(&[&self.context, &other.context]);

        if other.is_constant() {
            return self.scale(other.additive_constant, ctx);
        }
        if self.is_constant() {
            return other.scale(self.additive_constant, ctx);
        }

        // (a*m1 + c1)(b*m2 + c2) = ab*m1m2 + a*m1c2 + b*c1m2 + c1c2
        let q_m = self.multiplicative_constant * other.multiplicative_constant;
        let q_l = self.multiplicative_constant * other.additive_constant;
        let q_r = self.additive_constant * other.multiplicative_constant;
        let q_c = self.additive_constant * other.additive_constant;

        let ctx = ctx.expect("witness field elements carry a builder");
        let result_index = {
            let mut builder = ctx.borrow_mut();
            let left = builder.base.get_variable(self.witness_index);
            let right = builder.base.get_variable(other.witness_index);
            let result_index = builder
                .base
                .add_variable(left * right * q_m + left * q_l + right * q_r + q_c);
            builder.create_arithmetic_gate(&ArithmeticTriple {
                a: self.witness_index,
                b: other.witness_index,
                c: result_index,
                q_m,
                q_l,
                q_r,
                q_o: -F::one(),
                q_c,
            });
            result_index
        };
        Self::from_witness_index(ctx, result_index)
    }

    pub fn sqr(&self) -> Self {
        self.mul_impl(self)
    }

    /// `self^exponent` for a public exponent.
    ///
    /// Square-and-multiply over the bit length of `exponent`; the gate count
    /// depends only on the exponent.
    pub fn pow(&self, exponent: u64) -> Self {
        if self.is_constant() {
            return Self {
                context: self.context.clone(),
                ..Self::from_field(self.additive_constant.pow([exponent]))
            };
        }
        if exponent == 0 {
            return Self::constant_with_context(self.require_context(), F::one());
        }

        let mut accumulator: Option<Self> = None;
        let mut running_power = self.clone();
        let mut shifted = exponent;
        while shifted != 0 {
            if shifted & 1 == 1 {
                accumulator = Some(match accumulator {
                    None => running_power.clone(),
                    Some(acc) => acc.mul_impl(&running_power),
                });
            }
            shifted >>= 1;
            if shifted != 0 {
                running_power = running_power.sqr();
            }
        }
        accumulator.unwrap_or_else(|| Self::from_field(F::one()))
    }

    /// `self / other`, constrained as `q * other - self = 0` with `other`
    /// constrained invertible.
    pub fn divide(&self, other: &Self) -> Self {
        let ctx = validate_contexts(&[&self.context, &other.context]);
        let denominator = other.get_value();

        if other.is_constant() {
            let inverse = denominator.inverse().unwrap_or_else(|| {
                if let Some(ctx) = &ctx {
                    ctx.borrow_mut()
                        .base
                        .failure("field_t::divide by constant zero".to_string());
                }
                F::zero()
            });
            return self.scale(inverse, ctx);
        }

        let ctx = ctx.expect("witness field elements carry a builder");
        other.assert_is_not_zero("field_t::divide denominator is 0");
        let quotient_value = denominator
            .inverse()
            .map_or(F::zero(), |inverse| self.get_value() * inverse);
        let quotient = Self::from_witness(ctx, quotient_value);
        Self::evaluate_polynomial_identity(
            &quotient,
            other,
            &-self.clone(),
            &Self::zero(),
            "field_t::divide",
        );
        quotient
    }

    pub fn invert(&self) -> Self {
        Self::from_field(F::one()).divide(self)
    }

    /// `self * to_mul + to_add` in one gate.
    pub fn madd(&self, to_mul: &Self, to_add: &Self) -> Self {
        if self.is_constant() || to_mul.is_constant() {
            return self.mul_impl(to_mul).add_impl(to_add);
        }
        let ctx = validate_contexts(&[&self.context, &to_mul.context, &to_add.context])
            .expect("witness field elements carry a builder");

        let mul_scaling = self.multiplicative_constant * to_mul.multiplicative_constant;
        let a_scaling = self.multiplicative_constant * to_mul.additive_constant;
        let b_scaling = to_mul.multiplicative_constant * self.additive_constant;
        let c_scaling = to_add.wire_scaling();
        let const_scaling =
            self.additive_constant * to_mul.additive_constant + to_add.additive_constant;

        let result_index = {
            let mut builder = ctx.borrow_mut();
            let zero_idx = builder.base.zero_idx();
            let a = builder.base.get_variable(self.witness_index);
            let b = builder.base.get_variable(to_mul.witness_index);
            let c = builder.base.get_variable(to_add.wire(zero_idx));
            let out =
                a * b * mul_scaling + a * a_scaling + b * b_scaling + c * c_scaling + const_scaling;
            let result_index = builder.base.add_variable(out);
            builder.create_big_mul_add_gate(&MulQuad {
                a: self.witness_index,
                b: to_mul.witness_index,
                c: to_add.wire(zero_idx),
                d: result_index,
                mul_scaling,
                a_scaling,
                b_scaling,
                c_scaling,
                d_scaling: -F::one(),
                const_scaling,
            });
            result_index
        };
        Self::from_witness_index(ctx, result_index)
    }

    /// `self + add_b + add_c` in one gate.
    pub fn add_two(&self, add_b: &Self, add_c: &Self) -> Self {
        if self.is_constant() || add_b.is_constant() || add_c.is_constant() {
            return self.add_impl(add_b).add_impl(add_c);
        }
        let ctx = validate_contexts(&[&self.context, &add_b.context, &add_c.context])
            .expect("witness field elements carry a builder");
        let const_scaling =
            self.additive_constant + add_b.additive_constant + add_c.additive_constant;

        let result_index = {
            let mut builder = ctx.borrow_mut();
            let a = builder.base.get_variable(self.witness_index);
            let b = builder.base.get_variable(add_b.witness_index);
            let c = builder.base.get_variable(add_c.witness_index);
            let out = a * self.multiplicative_constant
                + b * add_b.multiplicative_constant
                + c * add_c.multiplicative_constant
                + const_scaling;
            let result_index = builder.base.add_variable(out);
            builder.create_big_add_gate(&AddQuad {
                a: self.witness_index,
                b: add_b.witness_index,
                c: add_c.witness_index,
                d: result_index,
                a_scaling: self.multiplicative_constant,
                b_scaling: add_b.multiplicative_constant,
                c_scaling: add_c.multiplicative_constant,
                d_scaling: -F::one(),
                const_scaling,
            });
            result_index
        };
        Self::from_witness_index(ctx, result_index)
    }

    // ════════════════════════════════════════════════════════════════════
    //  Assertions
    // ════════════════════════════════════════════════════════════════════

    pub fn assert_is_zero(&self, msg: &str) {
        if self.is_constant() {
            if !self.additive_constant.is_zero() {
                if let Some(ctx) = &self.context {
                    ctx.borrow_mut().base.failure(msg.to_string());
                } else {
                    panic!("{msg}");
                }
            }
            return;
        }
        let ctx = self.require_context();
        if !self.get_value().is_zero() {
            ctx.borrow_mut().base.failure(msg.to_string());
        }
        let mut builder = ctx.borrow_mut();
        let zero_idx = builder.base.zero_idx();
        builder.create_add_gate(&AddTriple {
            a: self.witness_index,
            b: zero_idx,
            c: zero_idx,
            a_scaling: self.multiplicative_constant,
            b_scaling: F::zero(),
            c_scaling: F::zero(),
            const_scaling: self.additive_constant,
        });
    }

    /// Constrain `self != 0` by witnessing its inverse: `self * inv - 1 = 0`.
    pub fn assert_is_not_zero(&self, msg: &str) {
        if self.is_constant() {
            if self.additive_constant.is_zero() {
                match &self.context {
                    Some(ctx) => ctx.borrow_mut().base.failure(msg.to_string()),
                    None => panic!("{msg}"),
                }
            }
            return;
        }
        let ctx = self.require_context();
        let inverse_value = self.get_value().inverse().unwrap_or_else(F::zero);
        let inverse = Self::from_witness(ctx, inverse_value);
        Self::evaluate_polynomial_identity(self, &inverse, &Self::from_field(-F::one()), &Self::zero(), msg);
    }

    /// `self == 0` as a constrained boolean.
    ///
    /// With `z` the result and `inv` a witness: `self * inv + z - 1 = 0` and
    /// `self * z = 0`.
    pub fn is_zero(&self) -> BoolT<F> {
        if self.is_constant() {
            return BoolT {
                context: self.context.clone(),
                ..BoolT::constant(self.additive_constant.is_zero())
            };
        }
        let ctx = self.require_context();
        let value = self.get_value();
        let result = BoolT::from_witness(&WitnessT::from_bool(ctx.clone(), value.is_zero()));
        let inverse = Self::from_witness(ctx, value.inverse().unwrap_or_else(F::zero));
        Self::evaluate_polynomial_identity(
            self,
            &inverse,
            &result.to_field(),
            &Self::from_field(-F::one()),
            "field_t::is_zero inverse",
        );
        Self::evaluate_polynomial_identity(
            self,
            &result.to_field(),
            &Self::zero(),
            &Self::zero(),
            "field_t::is_zero product",
        );
        result
    }

    pub fn assert_equal(&self, rhs: &Self, msg: &str) {
        let ctx = validate_contexts(&[&self.context, &rhs.context]);
        match (self.is_constant(), rhs.is_constant(), ctx) {
            (true, true, None) => {
                assert!(self.get_value() == rhs.get_value(), "{msg}");
            }
            (true, true, Some(ctx)) => {
                if self.get_value() != rhs.get_value() {
                    ctx.borrow_mut().base.failure(msg.to_string());
                }
            }
            (true, false, Some(ctx)) => {
                let idx = rhs.get_witness_index();
                ctx.borrow_mut().assert_equal_constant(idx, self.get_value(), msg);
            }
            (false, true, Some(ctx)) => {
                let idx = self.get_witness_index();
                ctx.borrow_mut().assert_equal_constant(idx, rhs.get_value(), msg);
            }
            (false, false, Some(ctx)) if self.is_normalized() || rhs.is_normalized() => {
                let lhs_idx = self.get_witness_index();
                let rhs_idx = rhs.get_witness_index();
                ctx.borrow_mut().base.assert_equal(lhs_idx, rhs_idx, msg);
            }
            (false, false, Some(_)) => (self.clone() - rhs.clone()).assert_is_zero(msg),
            (_, _, None) => unreachable!("witness field elements carry a builder"),
        }
    }

    /// `predicate ? lhs : rhs`, computed as `(lhs - rhs) * predicate + rhs`.
    pub fn conditional_assign(predicate: &BoolT<F>, lhs: &Self, rhs: &Self) -> Self {
        if predicate.is_constant() {
            return if predicate.get_value() {
                lhs.clone()
            } else {
                rhs.clone()
            };
        }
        let diff = lhs.clone() - rhs.clone();
        diff.madd(&predicate.to_field(), rhs)
    }

    // ════════════════════════════════════════════════════════════════════
    //  Range constraints and bit decomposition
    // ════════════════════════════════════════════════════════════════════

    /// Constrain the value to `[0, 2^num_bits)`.
    pub fn create_range_constraint(&self, num_bits: usize, msg: &str) {
        if num_bits == 0 {
            self.assert_is_zero(msg);
            return;
        }
        if self.is_constant() {
            if self.additive_constant.into_bigint().num_bits() as usize > num_bits {
                match &self.context {
                    Some(ctx) => ctx.borrow_mut().base.failure(msg.to_string()),
                    None => panic!("{msg}"),
                }
            }
            return;
        }
        let ctx = self.require_context();
        let index = self.normalize().witness_index;
        if num_bits as u64 <= DEFAULT_PLOOKUP_RANGE_BITNUM {
            ctx.borrow_mut().create_range_constraint(index, num_bits, msg);
        } else {
            ctx.borrow_mut().decompose_into_default_range(
                index,
                num_bits as u64,
                DEFAULT_PLOOKUP_RANGE_BITNUM,
                msg,
            );
        }
    }

    /// Boolean decomposition, least significant bit first.
    ///
    /// The bits are constrained to recompose to `self`. With `num_bits`
    /// at or above the modulus width the decomposition is not unique; use
    /// `assert_bits_less_than` to pin the canonical one.
    pub fn to_bits(&self, num_bits: usize) -> Vec<BoolT<F>> {
        let value = self.get_value().into_bigint();
        if self.is_constant() {
            return (0..num_bits)
                .map(|i| BoolT::constant(value.get_bit(i)))
                .collect();
        }
        let ctx = self.require_context();
        if value.num_bits() as usize > num_bits {
            ctx.borrow_mut()
                .base
                .failure("field_t::to_bits value does not fit".to_string());
        }
        let bits: Vec<BoolT<F>> = (0..num_bits)
            .map(|i| BoolT::from_witness(&WitnessT::from_bool(ctx.clone(), value.get_bit(i))))
            .collect();
        Self::from_bits(&bits).assert_equal(self, "field_t::to_bits recomposition");
        bits
    }

    /// `sum(bits[i] * 2^i)`.
    pub fn from_bits(bits: &[BoolT<F>]) -> Self {
        let two = F::from(2u64);
        let mut shift = F::one();
        let terms: Vec<Self> = bits
            .iter()
            .map(|bit| {
                let term = bit.to_field() * Self::from_field(shift);
                shift *= two;
                term
            })
            .collect();
        Self::accumulate(&terms)
    }

    // ════════════════════════════════════════════════════════════════════
    //  Identities
    // ════════════════════════════════════════════════════════════════════

    /// Constrain `a + b + c + d = 0` in one gate.
    pub fn evaluate_linear_identity(a: &Self, b: &Self, c: &Self, d: &Self, msg: &str) {
        let Some(ctx) = validate_contexts(&[&a.context, &b.context, &c.context, &d.context])
        else {
            assert!(
                (a.get_value() + b.get_value() + c.get_value() + d.get_value()).is_zero(),
                "{msg}"
            );
            return;
        };
        if !(a.get_value() + b.get_value() + c.get_value() + d.get_value()).is_zero() {
            ctx.borrow_mut().base.failure(msg.to_string());
        }
        let const_scaling =
            a.additive_constant + b.additive_constant + c.additive_constant + d.additive_constant;
        let mut builder = ctx.borrow_mut();
        let zero_idx = builder.base.zero_idx();
        builder.create_big_add_gate(&AddQuad {
            a: a.wire(zero_idx),
            b: b.wire(zero_idx),
            c: c.wire(zero_idx),
            d: d.wire(zero_idx),
            a_scaling: a.wire_scaling(),
            b_scaling: b.wire_scaling(),
            c_scaling: c.wire_scaling(),
            d_scaling: d.wire_scaling(),
            const_scaling,
        });
    }

    /// Constrain `a * b + c + d = 0` in one gate.
    pub fn evaluate_polynomial_identity(a: &Self, b: &Self, c: &Self, d: &Self, msg: &str) {
        let Some(ctx) = validate_contexts(&[&a.context, &b.context, &c.context, &d.context])
        else {
            assert!(
                (a.get_value() * b.get_value() + c.get_value() + d.get_value()).is_zero(),
                "{msg}"
            );
            return;
        };
        if !(a.get_value() * b.get_value() + c.get_value() + d.get_value()).is_zero() {
            ctx.borrow_mut().base.failure(msg.to_string());
        }

        let mul_scaling = a.wire_scaling() * b.wire_scaling();
        let a_scaling = a.wire_scaling() * b.additive_constant;
        let b_scaling = b.wire_scaling() * a.additive_constant;
        let const_scaling =
            a.additive_constant * b.additive_constant + c.additive_constant + d.additive_constant;

        let mut builder = ctx.borrow_mut();
        let zero_idx = builder.base.zero_idx();
        builder.create_big_mul_add_gate(&MulQuad {
            a: a.wire(zero_idx),
            b: b.wire(zero_idx),
            c: c.wire(zero_idx),
            d: d.wire(zero_idx),
            mul_scaling,
            a_scaling,
            b_scaling,
            c_scaling: c.wire_scaling(),
            d_scaling: d.wire_scaling(),
            const_scaling,
        });
    }

    /// Sum of many elements.
    ///
    /// Constants are folded first. The first gate absorbs three witnesses,
    /// every following gate two more plus the running total.
    pub fn accumulate(input: &[Self]) -> Self {
        let mut constant_term = F::zero();
        let mut witnesses: Vec<&Self> = Vec::new();
        for element in input {
            if element.is_constant() {
                constant_term += element.additive_constant;
            } else {
                witnesses.push(element);
            }
        }
        let ctx = validate_contexts(&input.iter().map(|e| &e.context).collect::<Vec<_>>());
        match witnesses.len() {
            0 => {
                return Self {
                    context: ctx,
                    ..Self::from_field(constant_term)
                }
            }
            1 => return witnesses[0].clone() + Self::from_field(constant_term),
            2 => return witnesses[0].add_impl(witnesses[1]) + Self::from_field(constant_term),
            _ => {}
        }
        let ctx = ctx.expect("witness field elements carry a builder");

        let mut builder = ctx.borrow_mut();
        let zero_idx = builder.base.zero_idx();
        let value_of = |builder: &h2v_circuit_builder::UltraCircuitBuilder<F>, e: &Self| {
            builder.base.get_variable(e.witness_index) * e.multiplicative_constant
                + e.additive_constant
        };

        let (first, rest) = witnesses.split_at(3);
        let mut total_value = first.iter().map(|e| value_of(&*builder, e)).sum::<F>();
        let mut total_index = builder.base.add_variable(total_value);
        builder.create_big_add_gate(&AddQuad {
            a: first[0].witness_index,
            b: first[1].witness_index,
            c: first[2].witness_index,
            d: total_index,
            a_scaling: first[0].multiplicative_constant,
            b_scaling: first[1].multiplicative_constant,
            c_scaling: first[2].multiplicative_constant,
            d_scaling: -F::one(),
            const_scaling: first.iter().map(|e| e.additive_constant).sum::<F>(),
        });

        for pair in rest.chunks(2) {
            let (b_idx, b_scaling, b_const) = match pair.get(1) {
                Some(e) => (e.witness_index, e.multiplicative_constant, e.additive_constant),
                None => (zero_idx, F::zero(), F::zero()),
            };
            total_value += pair.iter().map(|e| value_of(&*builder, e)).sum::<F>();
            let next_index = builder.base.add_variable(total_value);
            builder.create_big_add_gate(&AddQuad {
                a: pair[0].witness_index,
                b: b_idx,
                c: total_index,
                d: next_index,
                a_scaling: pair[0].multiplicative_constant,
                b_scaling,
                c_scaling: F::one(),
                d_scaling: -F::one(),
                const_scaling: pair[0].additive_constant + b_const,
            });
            total_index = next_index;
        }
        drop(builder);

        Self::from_witness_index(ctx, total_index) + Self::from_field(constant_term)
    }
}

/// Constrain the little-endian `bits` to encode an integer below `bound`.
///
/// The integer is split at bit 128 and compared limb-wise against
/// `bound - 1` with a single borrow bit; both differences must be
/// non-negative, which the range constraints enforce.
pub fn assert_bits_less_than<F: PrimeField>(bits: &[BoolT<F>], bound: &BigUint, msg: &str) {
    assert!(bits.len() <= 256, "at most 256 bits are supported");
    assert!(
        (F::MODULUS_BIT_SIZE as usize) > 129,
        "field too small for 128-bit limbs"
    );
    let max = bound - 1u32;
    let split = bits.len().min(128);
    let mask = (BigUint::from(1u32) << 128) - 1u32;
    let max_lo = &max & &mask;
    let max_hi = &max >> 128;

    let lo = FieldT::from_bits(&bits[..split]);
    let hi = FieldT::from_bits(&bits[split..]);

    let lo_value = field_to_biguint(&lo.get_value());
    let borrow_value = lo_value > max_lo;
    let ctx = validate_contexts(&bits.iter().map(|b| &b.context).collect::<Vec<_>>());
    let borrow = match &ctx {
        Some(ctx) => BoolT::from_witness(&WitnessT::from_bool(ctx.clone(), borrow_value)),
        None => BoolT::constant(borrow_value),
    };

    let shift: F = biguint_to_field(&(BigUint::from(1u32) << 128));
    // max_lo - lo + borrow * 2^128
    let diff_lo = FieldT::from_field(biguint_to_field::<F>(&max_lo)) - lo
        + borrow.to_field() * FieldT::from_field(shift);
    // max_hi - hi - borrow
    let diff_hi = FieldT::from_field(biguint_to_field::<F>(&max_hi)) - hi - borrow.to_field();

    diff_lo.create_range_constraint(128, msg);
    diff_hi.create_range_constraint(max_hi.bits() as usize, msg);
}

// ════════════════════════════════════════════════════════════════════════
//  Operator implementations
// ════════════════════════════════════════════════════════════════════════

impl<F: PrimeField> Add for FieldT<F> {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        self.add_impl(&rhs)
    }
}

impl<F: PrimeField> Add<&FieldT<F>> for &FieldT<F> {
    type Output = FieldT<F>;
    fn add(self, rhs: &FieldT<F>) -> FieldT<F> {
        self.add_impl(rhs)
    }
}

impl<F: PrimeField> Sub for FieldT<F> {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        self.add_impl(&-rhs)
    }
}

impl<F: PrimeField> Sub<&FieldT<F>> for &FieldT<F> {
    type Output = FieldT<F>;
    fn sub(self, rhs: &FieldT<F>) -> FieldT<F> {
        self.add_impl(&-rhs.clone())
    }
}

impl<F: PrimeField> Mul for FieldT<F> {
    type Output = Self;
    fn mul(self, rhs: Self) -> Self {
        self.mul_impl(&rhs)
    }
}

impl<F: PrimeField> Mul<&FieldT<F>> for &FieldT<F> {
    type Output = FieldT<F>;
    fn mul(self, rhs: &FieldT<F>) -> FieldT<F> {
        self.mul_impl(rhs)
    }
}

impl<F: PrimeField> Neg for FieldT<F> {
    type Output = Self;
    fn neg(mut self) -> Self {
        self.additive_constant = -self.additive_constant;
        if !self.is_constant() {
            self.multiplicative_constant = -self.multiplicative_constant;
        }
        self
    }
}

impl<F: PrimeField> AddAssign for FieldT<F> {
    fn add_assign(&mut self, rhs: Self) {
        *self = self.add_impl(&rhs);
    }
}

impl<F: PrimeField> SubAssign for FieldT<F> {
    fn sub_assign(&mut self, rhs: Self) {
        *self = self.add_impl(&-rhs);
    }
}

impl<F: PrimeField> MulAssign for FieldT<F> {
    fn mul_assign(&mut self, rhs: Self) {
        *self = self.mul_impl(&rhs);
    }
}
