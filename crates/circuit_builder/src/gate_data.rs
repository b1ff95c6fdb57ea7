//! Gate data structures.
//!
//! These structs describe the wire indices and scaling factors accepted by
//! the gate constructors of `UltraCircuitBuilder`.

use ark_ff::PrimeField;

/// 3-wire addition gate: a*a_scaling + b*b_scaling + c*c_scaling + const_scaling = 0
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddTriple<F: PrimeField> {
    pub a: u32,
    pub b: u32,
    pub c: u32,
    pub a_scaling: F,
    pub b_scaling: F,
    pub c_scaling: F,
    pub const_scaling: F,
}

/// 4-wire addition gate: a*a_scaling + b*b_scaling + c*c_scaling + d*d_scaling + const_scaling = 0
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddQuad<F: PrimeField> {
    pub a: u32,
    pub b: u32,
    pub c: u32,
    pub d: u32,
    pub a_scaling: F,
    pub b_scaling: F,
    pub c_scaling: F,
    pub d_scaling: F,
    pub const_scaling: F,
}

/// 4-wire mul-add gate: a*b*mul_scaling + a*a_scaling + b*b_scaling + c*c_scaling + d*d_scaling + const_scaling = 0
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MulQuad<F: PrimeField> {
    pub a: u32,
    pub b: u32,
    pub c: u32,
    pub d: u32,
    pub mul_scaling: F,
    pub a_scaling: F,
    pub b_scaling: F,
    pub c_scaling: F,
    pub d_scaling: F,
    pub const_scaling: F,
}

/// Arithmetic gate with standard selector naming: q_m*a*b + q_l*a + q_r*b + q_o*c + q_c = 0
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArithmeticTriple<F: PrimeField> {
    pub a: u32,
    pub b: u32,
    pub c: u32,
    pub q_m: F,
    pub q_l: F,
    pub q_r: F,
    pub q_o: F,
    pub q_c: F,
}
