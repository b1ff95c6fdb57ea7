//! UltraCircuitBuilder: arithmetic gates, constants and range constraints.
//!
//! All constraints are width-4 arithmetic gates. Range constraints are
//! collected into range lists keyed by their target range; wide ranges are
//! first decomposed into `DEFAULT_PLOOKUP_RANGE_BITNUM`-bit limbs tied back
//! to the original variable with accumulation gates.

use std::collections::BTreeMap;

use ark_ff::{BigInteger, Field, One, PrimeField, Zero};
use h2v_numeric::slice_limbs;

use crate::builder_base::CircuitBuilderBase;
use crate::execution_trace::{ArithmeticBlock, GateSelectors};
use crate::gate_data::{AddQuad, AddTriple, ArithmeticTriple, MulQuad};

/// Bit width of a default range limb.
pub const DEFAULT_PLOOKUP_RANGE_BITNUM: u64 = 14;

/// Set of variables constrained to lie in `[0, target_range]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RangeList {
    pub target_range: u64,
    pub variable_indices: Vec<u32>,
}

#[derive(Debug, Clone)]
pub struct UltraCircuitBuilder<F: PrimeField> {
    /// Variable storage, copy constraints and error state.
    pub base: CircuitBuilderBase<F>,
    /// Wires and selectors of every gate.
    pub block: ArithmeticBlock<F>,
    /// Constant value (canonical limbs) to its fixed variable index.
    pub constant_variable_indices: BTreeMap<Vec<u64>, u32>,
    /// Range lists keyed by target range value.
    pub range_lists: BTreeMap<u64, RangeList>,
}

impl<F: PrimeField> UltraCircuitBuilder<F> {
    // ════════════════════════════════════════════════════════════════════
    //  Construction
    // ════════════════════════════════════════════════════════════════════

    /// Create a new builder. The zero constant is always variable 0.
    pub fn new() -> Self {
        let mut builder = Self {
            base: CircuitBuilderBase::new(),
            block: ArithmeticBlock::new(),
            constant_variable_indices: BTreeMap::new(),
            range_lists: BTreeMap::new(),
        };
        let zero_idx = builder.base.add_variable(F::zero());
        builder.base.set_zero_idx(zero_idx);
        builder.fix_witness(zero_idx, F::zero());
        builder
            .constant_variable_indices
            .insert(Self::constant_key(&F::zero()), zero_idx);
        builder
    }

    fn constant_key(value: &F) -> Vec<u64> {
        value.into_bigint().as_ref().to_vec()
    }

    /// Get or create a variable fixed to `variable`.
    pub fn put_constant_variable(&mut self, variable: F) -> u32 {
        let key = Self::constant_key(&variable);
        if let Some(&idx) = self.constant_variable_indices.get(&key) {
            return idx;
        }
        let variable_index = self.base.add_variable(variable);
        self.fix_witness(variable_index, variable);
        self.constant_variable_indices.insert(key, variable_index);
        variable_index
    }

    fn push_gate(&mut self, wires: [u32; 4], selectors: GateSelectors<F>) {
        self.base.assert_valid_variables(&wires);
        self.block.populate_wires(wires[0], wires[1], wires[2], wires[3]);
        self.block.push_selectors(selectors);
        self.base.increment_num_gates(1);
    }

    // ════════════════════════════════════════════════════════════════════
    //  Gate creation: arithmetic
    // ════════════════════════════════════════════════════════════════════

    /// `a*a_scaling + b*b_scaling + c*c_scaling + const_scaling = 0`.
    pub fn create_add_gate(&mut self, gate: &AddTriple<F>) {
        self.create_big_add_gate(&AddQuad {
            a: gate.a,
            b: gate.b,
            c: gate.c,
            d: self.base.zero_idx(),
            a_scaling: gate.a_scaling,
            b_scaling: gate.b_scaling,
            c_scaling: gate.c_scaling,
            d_scaling: F::zero(),
            const_scaling: gate.const_scaling,
        });
    }

    /// `a*a_scaling + b*b_scaling + c*c_scaling + d*d_scaling + const_scaling = 0`.
    pub fn create_big_add_gate(&mut self, gate: &AddQuad<F>) {
        self.push_gate(
            [gate.a, gate.b, gate.c, gate.d],
            GateSelectors {
                q_m: F::zero(),
                q_1: gate.a_scaling,
                q_2: gate.b_scaling,
                q_3: gate.c_scaling,
                q_4: gate.d_scaling,
                q_c: gate.const_scaling,
            },
        );
    }

    /// `a*b*mul_scaling + a*a_scaling + b*b_scaling + c*c_scaling + d*d_scaling + const_scaling = 0`.
    pub fn create_big_mul_add_gate(&mut self, gate: &MulQuad<F>) {
        self.push_gate(
            [gate.a, gate.b, gate.c, gate.d],
            GateSelectors {
                q_m: gate.mul_scaling,
                q_1: gate.a_scaling,
                q_2: gate.b_scaling,
                q_3: gate.c_scaling,
                q_4: gate.d_scaling,
                q_c: gate.const_scaling,
            },
        );
    }

    /// Constrain `variable_index` to be 0 or 1 via `x^2 - x = 0`.
    pub fn create_bool_gate(&mut self, variable_index: u32) {
        let zero = self.base.zero_idx();
        self.push_gate(
            [variable_index, variable_index, zero, zero],
            GateSelectors {
                q_m: F::one(),
                q_1: -F::one(),
                q_2: F::zero(),
                q_3: F::zero(),
                q_4: F::zero(),
                q_c: F::zero(),
            },
        );
    }

    /// `q_m*a*b + q_l*a + q_r*b + q_o*c + q_c = 0`.
    pub fn create_arithmetic_gate(&mut self, gate: &ArithmeticTriple<F>) {
        let zero = self.base.zero_idx();
        self.push_gate(
            [gate.a, gate.b, gate.c, zero],
            GateSelectors {
                q_m: gate.q_m,
                q_1: gate.q_l,
                q_2: gate.q_r,
                q_3: gate.q_o,
                q_4: F::zero(),
                q_c: gate.q_c,
            },
        );
    }

    // ════════════════════════════════════════════════════════════════════
    //  Witness fixing / constant assertion
    // ════════════════════════════════════════════════════════════════════

    /// Fix a witness with the gate `1 * witness - witness_value = 0`.
    pub fn fix_witness(&mut self, witness_index: u32, witness_value: F) {
        let zero = self.base.zero_idx();
        self.push_gate(
            [witness_index, zero, zero, zero],
            GateSelectors {
                q_m: F::zero(),
                q_1: F::one(),
                q_2: F::zero(),
                q_3: F::zero(),
                q_4: F::zero(),
                q_c: -witness_value,
            },
        );
    }

    /// Assert that a variable equals a constant value.
    pub fn assert_equal_constant(&mut self, a_idx: u32, b: F, msg: &str) {
        if self.base.get_variable(a_idx) != b {
            self.base.failure(msg.to_string());
        }
        let b_idx = self.put_constant_variable(b);
        self.base.assert_equal(a_idx, b_idx, msg);
    }

    // ════════════════════════════════════════════════════════════════════
    //  Range constraints
    // ════════════════════════════════════════════════════════════════════

    /// Constrain a variable to `[0, 2^num_bits - 1]`.
    ///
    /// One bit becomes a boolean gate, up to `DEFAULT_PLOOKUP_RANGE_BITNUM`
    /// bits a range-list entry, anything wider a limb decomposition.
    pub fn create_range_constraint(&mut self, variable_index: u32, num_bits: usize, msg: &str) {
        if num_bits == 0 {
            self.assert_equal_constant(variable_index, F::zero(), msg);
        } else if num_bits == 1 {
            self.create_bool_gate(variable_index);
        } else if num_bits <= DEFAULT_PLOOKUP_RANGE_BITNUM as usize {
            self.create_new_range_constraint(variable_index, (1u64 << num_bits) - 1, msg);
        } else {
            self.decompose_into_default_range(
                variable_index,
                num_bits as u64,
                DEFAULT_PLOOKUP_RANGE_BITNUM,
                msg,
            );
        }
    }

    /// Constrain a variable to `[0, target_range]` by adding it to the range
    /// list for `target_range`.
    pub fn create_new_range_constraint(&mut self, variable_index: u32, target_range: u64, msg: &str) {
        let value = self.base.get_variable(variable_index).into_bigint();
        let limbs = value.as_ref();
        let is_out_of_range = limbs[0] > target_range || limbs[1..].iter().any(|&l| l != 0);
        if is_out_of_range {
            self.base.failure(msg.to_string());
        }

        self.range_lists
            .entry(target_range)
            .or_insert_with(|| RangeList {
                target_range,
                variable_indices: Vec::new(),
            })
            .variable_indices
            .push(variable_index);
    }

    /// Split a variable into `target_range_bitnum`-bit limbs, range-check
    /// each limb, and constrain the limbs to recompose the original.
    ///
    /// The first gate packs three limbs into an accumulator; each further gate
    /// adds two limbs to it. The last gate writes the variable itself into the
    /// fourth wire. Returns the limb indices, least significant first.
    pub fn decompose_into_default_range(
        &mut self,
        variable_index: u32,
        num_bits: u64,
        target_range_bitnum: u64,
        msg: &str,
    ) -> Vec<u32> {
        self.base.assert_valid_variables(&[variable_index]);
        assert!(num_bits > 0, "num_bits must be > 0");

        let value = self.base.get_variable(variable_index).into_bigint();
        if value.num_bits() as u64 > num_bits {
            self.base.failure(msg.to_string());
        }

        let sublimb_mask = (1u64 << target_range_bitnum) - 1;
        let num_limbs = num_bits.div_ceil(target_range_bitnum) as usize;
        let last_limb_size = num_bits % target_range_bitnum;
        let last_limb_range = if last_limb_size > 0 {
            (1u64 << last_limb_size) - 1
        } else {
            sublimb_mask
        };

        let mut sublimbs = Vec::with_capacity(num_limbs);
        let mut sublimb_indices = Vec::with_capacity(num_limbs);
        for i in 0..num_limbs {
            let start = i * target_range_bitnum as usize;
            let sublimb = slice_limbs(value.as_ref(), start, target_range_bitnum as usize);
            let limb_idx = self.base.add_variable(F::from(sublimb));
            let range = if i == num_limbs - 1 { last_limb_range } else { sublimb_mask };
            self.create_new_range_constraint(limb_idx, range, msg);
            sublimbs.push(F::from(sublimb));
            sublimb_indices.push(limb_idx);
        }

        let shift = |i: usize| F::from(2u64).pow([i as u64 * target_range_bitnum]);
        let zero = self.base.zero_idx();
        let pick = |j: usize| -> (u32, F, F) {
            if j < num_limbs {
                (sublimb_indices[j], shift(j), sublimbs[j])
            } else {
                (zero, F::zero(), F::zero())
            }
        };

        // First gate: three limbs.
        let (a, a_s, a_v) = pick(0);
        let (b, b_s, b_v) = pick(1);
        let (c, c_s, c_v) = pick(2);
        let mut acc_value = a_v * a_s + b_v * b_s + c_v * c_s;
        let mut consumed = 3;
        let mut acc_idx = if consumed >= num_limbs {
            variable_index
        } else {
            self.base.add_variable(acc_value)
        };
        self.create_big_add_gate(&AddQuad {
            a,
            b,
            c,
            d: acc_idx,
            a_scaling: a_s,
            b_scaling: b_s,
            c_scaling: c_s,
            d_scaling: -F::one(),
            const_scaling: F::zero(),
        });

        // Following gates: two limbs plus the running accumulator.
        while consumed < num_limbs {
            let (a, a_s, a_v) = pick(consumed);
            let (b, b_s, b_v) = pick(consumed + 1);
            consumed += 2;
            acc_value += a_v * a_s + b_v * b_s;
            let next_idx = if consumed >= num_limbs {
                variable_index
            } else {
                self.base.add_variable(acc_value)
            };
            self.create_big_add_gate(&AddQuad {
                a,
                b,
                c: acc_idx,
                d: next_idx,
                a_scaling: a_s,
                b_scaling: b_s,
                c_scaling: F::one(),
                d_scaling: -F::one(),
                const_scaling: F::zero(),
            });
            acc_idx = next_idx;
        }

        sublimb_indices
    }

    /// Number of gates, as reported by the base builder.
    pub fn num_gates(&self) -> usize {
        self.base.num_gates()
    }
}

impl<F: PrimeField> Default for UltraCircuitBuilder<F> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::circuit_checker::UltraCircuitChecker;
    use ark_bn254::Fr;

    #[test]
    fn test_constant_variables_are_cached() {
        let mut builder = UltraCircuitBuilder::<Fr>::new();
        let a = builder.put_constant_variable(Fr::from(11u64));
        let b = builder.put_constant_variable(Fr::from(11u64));
        assert_eq!(a, b);
        assert_eq!(builder.put_constant_variable(Fr::zero()), builder.base.zero_idx());
        assert!(UltraCircuitChecker::check(&builder).is_ok());
    }

    #[test]
    fn test_bool_gate() {
        let mut builder = UltraCircuitBuilder::<Fr>::new();
        let one = builder.base.add_variable(Fr::one());
        builder.create_bool_gate(one);
        assert!(UltraCircuitChecker::check(&builder).is_ok());

        let two = builder.base.add_variable(Fr::from(2u64));
        builder.create_bool_gate(two);
        assert!(UltraCircuitChecker::check(&builder).is_err());
    }

    #[test]
    fn test_range_constraint_small() {
        let mut builder = UltraCircuitBuilder::<Fr>::new();
        let a = builder.base.add_variable(Fr::from(255u64));
        builder.create_range_constraint(a, 8, "range");
        assert!(!builder.base.failed());
        assert!(UltraCircuitChecker::check(&builder).is_ok());

        let b = builder.base.add_variable(Fr::from(256u64));
        builder.create_range_constraint(b, 8, "range");
        assert!(builder.base.failed());
        assert!(UltraCircuitChecker::check(&builder).is_err());
    }

    #[test]
    fn test_decompose_into_default_range() {
        for num_bits in [15u64, 28, 42, 43, 70, 84, 136] {
            let mut builder = UltraCircuitBuilder::<Fr>::new();
            let value = Fr::from(2u64).pow([num_bits]) - Fr::one();
            let a = builder.base.add_variable(value);
            let limbs = builder.decompose_into_default_range(a, num_bits, DEFAULT_PLOOKUP_RANGE_BITNUM, "range");
            assert_eq!(limbs.len() as u64, num_bits.div_ceil(DEFAULT_PLOOKUP_RANGE_BITNUM));
            assert!(!builder.base.failed(), "num_bits = {num_bits}");
            assert!(UltraCircuitChecker::check(&builder).is_ok(), "num_bits = {num_bits}");
        }
    }

    #[test]
    fn test_decompose_rejects_wide_value() {
        let mut builder = UltraCircuitBuilder::<Fr>::new();
        let a = builder.base.add_variable(Fr::from(1u64 << 40));
        builder.create_range_constraint(a, 40, "too wide");
        assert!(builder.base.failed());
        assert_eq!(builder.base.err(), "too wide");
        assert!(UltraCircuitChecker::check(&builder).is_err());
    }

    #[test]
    fn test_assert_equal_constant() {
        let mut builder = UltraCircuitBuilder::<Fr>::new();
        let a = builder.base.add_variable(Fr::from(9u64));
        builder.assert_equal_constant(a, Fr::from(9u64), "const");
        assert!(!builder.base.failed());

        let b = builder.base.add_variable(Fr::from(8u64));
        builder.assert_equal_constant(b, Fr::from(9u64), "const");
        assert!(builder.base.failed());
    }
}
