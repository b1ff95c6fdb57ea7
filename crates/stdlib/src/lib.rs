//! In-circuit gadgets: native and emulated field wires, emulated curve
//! points and SHA-256.

pub mod hash;
pub mod primitives;
