//! Validates circuit satisfaction.
//!
//! `UltraCircuitChecker::check()` evaluates every arithmetic gate and every
//! range list against the builder's witness. Wire values are resolved through
//! `real_variable_index`, so copy constraints hold by construction; a copy
//! constraint whose values disagreed is recorded as a builder failure and
//! reported here.

use ark_ff::{PrimeField, Zero};

use crate::ultra_builder::UltraCircuitBuilder;

pub struct UltraCircuitChecker;

impl UltraCircuitChecker {
    /// Check that the given builder's witness satisfies all constraints.
    ///
    /// Returns `Err(message)` describing the first violation found.
    pub fn check<F: PrimeField>(builder: &UltraCircuitBuilder<F>) -> Result<(), String> {
        if builder.base.failed() {
            return Err(format!("builder failed: {}", builder.base.err()));
        }
        Self::check_arithmetic_gates(builder)?;
        Self::check_range_lists(builder)
    }

    fn check_arithmetic_gates<F: PrimeField>(builder: &UltraCircuitBuilder<F>) -> Result<(), String> {
        let block = &builder.block;
        for row in 0..block.len() {
            let [w1, w2, w3, w4] = block.wires_at(row).map(|idx| builder.base.get_variable(idx));
            let q = block.selectors_at(row);
            let value = q.q_m * w1 * w2 + q.q_1 * w1 + q.q_2 * w2 + q.q_3 * w3 + q.q_4 * w4 + q.q_c;
            if !value.is_zero() {
                return Err(format!("arithmetic gate {row} is not satisfied"));
            }
        }
        Ok(())
    }

    fn check_range_lists<F: PrimeField>(builder: &UltraCircuitBuilder<F>) -> Result<(), String> {
        for (target_range, list) in &builder.range_lists {
            for &idx in &list.variable_indices {
                let value = builder.base.get_variable(idx).into_bigint();
                let limbs = value.as_ref();
                if limbs[0] > *target_range || limbs[1..].iter().any(|&l| l != 0) {
                    return Err(format!(
                        "variable {idx} is outside the range list [0, {target_range}]"
                    ));
                }
            }
        }
        Ok(())
    }
}
