//! Circuit boolean with lazy negation.
//!
//! The represented value is `witness_bool XOR witness_inverted`, so NOT is
//! free. Binary operations between two witnesses cost one arithmetic gate
//! whose selectors absorb the inversion flags of both inputs.

use std::ops::{BitAnd, BitOr, BitXor, Not};

use ark_ff::PrimeField;
use h2v_circuit_builder::gate_data::ArithmeticTriple;

use super::field::FieldT;
use super::witness::{validate_contexts, BuilderRef, WitnessT, IS_CONSTANT};

fn field_from_i64<F: PrimeField>(v: i64) -> F {
    if v >= 0 {
        F::from(v as u64)
    } else {
        -F::from(v.unsigned_abs())
    }
}

/// Selectors `(q_m, q_l, q_r, q_c)` of a binary gate over the raw witnesses,
/// given the inversion flags of the two operands.
type GateShape = fn(i64, i64) -> (i64, i64, i64, i64);

fn and_shape(i_a: i64, i_b: i64) -> (i64, i64, i64, i64) {
    (
        (1 - 2 * i_a) * (1 - 2 * i_b),
        i_b * (1 - 2 * i_a),
        i_a * (1 - 2 * i_b),
        i_a * i_b,
    )
}

fn or_shape(i_a: i64, i_b: i64) -> (i64, i64, i64, i64) {
    (
        -(1 - 2 * i_a) * (1 - 2 * i_b),
        (1 - 2 * i_a) * (1 - i_b),
        (1 - i_a) * (1 - 2 * i_b),
        i_a + i_b - i_a * i_b,
    )
}

fn xor_shape(i_a: i64, i_b: i64) -> (i64, i64, i64, i64) {
    let aux = (1 - 2 * i_a) * (1 - 2 * i_b);
    (-2 * aux, aux, aux, i_a + i_b - 2 * i_a * i_b)
}

#[derive(Clone)]
pub struct BoolT<F: PrimeField> {
    pub(crate) context: Option<BuilderRef<F>>,
    pub(crate) witness_bool: bool,
    pub(crate) witness_inverted: bool,
    pub(crate) witness_index: u32,
}

impl<F: PrimeField> BoolT<F> {
    pub fn constant(value: bool) -> Self {
        Self {
            context: None,
            witness_bool: value,
            witness_inverted: false,
            witness_index: IS_CONSTANT,
        }
    }

    pub fn constant_with_context(ctx: BuilderRef<F>, value: bool) -> Self {
        Self {
            context: Some(ctx),
            ..Self::constant(value)
        }
    }

    /// A boolean witness, constrained by `x^2 - x = 0`.
    pub fn from_witness(value: &WitnessT<F>) -> Self {
        let witness_bool = value.witness.is_one();
        if !witness_bool && !value.witness.is_zero() {
            value
                .context
                .borrow_mut()
                .base
                .failure("bool_t: witness value is not 0 or 1".to_string());
        }
        value
            .context
            .borrow_mut()
            .create_bool_gate(value.witness_index);
        Self {
            context: Some(value.context.clone()),
            witness_bool,
            witness_inverted: false,
            witness_index: value.witness_index,
        }
    }

    /// Wrap a variable already constrained to be boolean. Adds no gate.
    pub fn from_witness_index_unsafe(ctx: BuilderRef<F>, witness_index: u32) -> Self {
        debug_assert_ne!(witness_index, IS_CONSTANT);
        let witness_bool = ctx.borrow().base.get_variable(witness_index).is_one();
        Self {
            context: Some(ctx),
            witness_bool,
            witness_inverted: false,
            witness_index,
        }
    }

    pub fn get_value(&self) -> bool {
        self.witness_bool ^ self.witness_inverted
    }

    pub fn is_constant(&self) -> bool {
        self.witness_index == IS_CONSTANT
    }

    pub fn get_context(&self) -> &Option<BuilderRef<F>> {
        &self.context
    }

    /// Copy whose witness holds the represented value.
    pub fn normalize(&self) -> Self {
        if self.is_constant() || !self.witness_inverted {
            return self.clone();
        }
        let ctx = self.context.clone().expect("witness bools carry a builder");
        let value = self.get_value();
        let new_witness = {
            let mut builder = ctx.borrow_mut();
            let new_witness = builder.base.add_variable(F::from(value as u64));
            let zero_idx = builder.base.zero_idx();
            // 1 - w - out = 0
            builder.create_arithmetic_gate(&ArithmeticTriple {
                a: self.witness_index,
                b: zero_idx,
                c: new_witness,
                q_m: F::zero(),
                q_l: -F::one(),
                q_r: F::zero(),
                q_o: -F::one(),
                q_c: F::one(),
            });
            new_witness
        };
        Self {
            context: Some(ctx),
            witness_bool: value,
            witness_inverted: false,
            witness_index: new_witness,
        }
    }

    /// The value as a native field element, `w + i - 2iw`. Adds no gate.
    pub fn to_field(&self) -> FieldT<F> {
        if self.is_constant() {
            return FieldT {
                context: self.context.clone(),
                ..FieldT::from_u64(self.get_value() as u64)
            };
        }
        let (multiplicative_constant, additive_constant) = if self.witness_inverted {
            (-F::one(), F::one())
        } else {
            (F::one(), F::zero())
        };
        FieldT {
            context: self.context.clone(),
            additive_constant,
            multiplicative_constant,
            witness_index: self.witness_index,
        }
    }

    // ════════════════════════════════════════════════════════════════════
    //  Boolean operations
    // ════════════════════════════════════════════════════════════════════

    fn binary_gate(&self, other: &Self, shape: GateShape, result: bool) -> Self {
        let ctx = validate_contexts(&[&self.context, &other.context])
            .expect("witness bools carry a builder");
        let (q_m, q_l, q_r, q_c) =
            shape(self.witness_inverted as i64, other.witness_inverted as i64);
        let result_index = {
            let mut builder = ctx.borrow_mut();
            let result_index = builder.base.add_variable(F::from(result as u64));
            builder.create_arithmetic_gate(&ArithmeticTriple {
                a: self.witness_index,
                b: other.witness_index,
                c: result_index,
                q_m: field_from_i64(q_m),
                q_l: field_from_i64(q_l),
                q_r: field_from_i64(q_r),
                q_o: -F::one(),
                q_c: field_from_i64(q_c),
            });
            result_index
        };
        Self {
            context: Some(ctx),
            witness_bool: result,
            witness_inverted: false,
            witness_index: result_index,
        }
    }

    fn constant_result(&self, other: &Self, value: bool) -> Self {
        Self {
            context: validate_contexts(&[&self.context, &other.context]),
            ..Self::constant(value)
        }
    }

    pub fn and(&self, other: &Self) -> Self {
        let result = self.get_value() && other.get_value();
        match (self.is_constant(), other.is_constant()) {
            (false, false) => self.binary_gate(other, and_shape, result),
            (false, true) if other.get_value() => self.clone(),
            (true, false) if self.get_value() => other.clone(),
            _ => self.constant_result(other, result),
        }
    }

    pub fn or(&self, other: &Self) -> Self {
        let result = self.get_value() || other.get_value();
        match (self.is_constant(), other.is_constant()) {
            (false, false) => self.binary_gate(other, or_shape, result),
            (false, true) if !other.get_value() => self.clone(),
            (true, false) if !self.get_value() => other.clone(),
            _ => self.constant_result(other, result),
        }
    }

    pub fn xor(&self, other: &Self) -> Self {
        let result = self.get_value() ^ other.get_value();
        match (self.is_constant(), other.is_constant()) {
            (false, false) => self.binary_gate(other, xor_shape, result),
            (false, true) => {
                if other.get_value() {
                    self.negate()
                } else {
                    self.clone()
                }
            }
            (true, false) => {
                if self.get_value() {
                    other.negate()
                } else {
                    other.clone()
                }
            }
            (true, true) => self.constant_result(other, result),
        }
    }

    pub fn negate(&self) -> Self {
        let mut result = self.clone();
        if result.is_constant() {
            result.witness_bool = !result.witness_bool;
        } else {
            result.witness_inverted = !result.witness_inverted;
        }
        result
    }

    pub fn assert_equal(&self, rhs: &Self, msg: &str) {
        self.to_field().assert_equal(&rhs.to_field(), msg);
    }

    /// `predicate ? lhs : rhs`.
    pub fn conditional_assign(predicate: &Self, lhs: &Self, rhs: &Self) -> Self {
        if predicate.is_constant() {
            return if predicate.get_value() {
                lhs.clone()
            } else {
                rhs.clone()
            };
        }
        if lhs.is_constant() && rhs.is_constant() && lhs.get_value() == rhs.get_value() {
            return lhs.clone();
        }
        predicate.and(lhs).or(&predicate.negate().and(rhs))
    }
}

impl<F: PrimeField> BitAnd for &BoolT<F> {
    type Output = BoolT<F>;
    fn bitand(self, rhs: Self) -> BoolT<F> {
        self.and(rhs)
    }
}

impl<F: PrimeField> BitOr for &BoolT<F> {
    type Output = BoolT<F>;
    fn bitor(self, rhs: Self) -> BoolT<F> {
        self.or(rhs)
    }
}

impl<F: PrimeField> BitXor for &BoolT<F> {
    type Output = BoolT<F>;
    fn bitxor(self, rhs: Self) -> BoolT<F> {
        self.xor(rhs)
    }
}

impl<F: PrimeField> Not for BoolT<F> {
    type Output = BoolT<F>;
    fn not(self) -> BoolT<F> {
        self.negate()
    }
}

impl<F: PrimeField> Not for &BoolT<F> {
    type Output = BoolT<F>;
    fn not(self) -> BoolT<F> {
        self.negate()
    }
}
