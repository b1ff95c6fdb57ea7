//! Circuit builder for the in-circuit verifier.
//!
//! Provides gate data structures, the arithmetic execution trace, the
//! variable store with copy constraints, the Ultra-style builder with range
//! constraints, a satisfiability checker and a deterministic constraint
//! system snapshot.

pub mod builder_base;
pub mod circuit_checker;
pub mod constraint_system;
pub mod execution_trace;
pub mod gate_data;
pub mod ultra_builder;

pub use circuit_checker::UltraCircuitChecker;
pub use constraint_system::ConstraintSystem;
pub use ultra_builder::UltraCircuitBuilder;
