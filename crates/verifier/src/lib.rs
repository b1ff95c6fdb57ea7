//! In-circuit verifier for Halo2 proofs opened with Shplonk over BN254.
//!
//! `compile` turns a verifying configuration and a proof into a circuit
//! that is satisfiable exactly when the proof verifies. `native` runs the
//! same protocol outside the circuit, and `testing` produces proofs for it.

pub mod backend;
pub mod circuit;
pub mod codec;
pub mod config;
pub mod error;
pub mod instance;
pub mod native;
pub mod pairing;
pub mod proof;
pub mod shplonk;
pub mod testing;
pub mod transcript;

pub use circuit::{compile, verify, CompiledCircuit};
pub use config::{load_config, Config, Query};
pub use error::{Result, VerifierError};
pub use native::verify_native;
pub use proof::{load_proof, Proof};
