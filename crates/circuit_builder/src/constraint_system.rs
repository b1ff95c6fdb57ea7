//! Immutable snapshot of a finished circuit.
//!
//! Wires are stored as real variable indices so two builds that made the
//! same copy constraints produce the same snapshot. The fingerprint is a
//! SHA-256 over a canonical little-endian serialization.

use ark_ff::{BigInteger, PrimeField};
use sha2::{Digest, Sha256};

use crate::execution_trace::{GateSelectors, NUM_WIRES};
use crate::ultra_builder::UltraCircuitBuilder;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConstraintSystem<F: PrimeField> {
    pub num_variables: usize,
    pub wires: Vec<[u32; NUM_WIRES]>,
    pub selectors: Vec<GateSelectors<F>>,
    pub public_inputs: Vec<u32>,
    /// `(target_range, real variable indices)`, ordered by target range.
    pub range_lists: Vec<(u64, Vec<u32>)>,
}

impl<F: PrimeField> ConstraintSystem<F> {
    pub fn from_builder(builder: &UltraCircuitBuilder<F>) -> Self {
        let real = |idx: u32| builder.base.real_variable_index[idx as usize];
        let block = &builder.block;
        let wires = (0..block.len())
            .map(|row| block.wires_at(row).map(real))
            .collect();
        let selectors = (0..block.len()).map(|row| block.selectors_at(row)).collect();
        let range_lists = builder
            .range_lists
            .iter()
            .map(|(range, list)| (*range, list.variable_indices.iter().map(|&i| real(i)).collect()))
            .collect();
        Self {
            num_variables: builder.base.get_num_variables(),
            wires,
            selectors,
            public_inputs: builder.base.public_inputs().iter().map(|&i| real(i)).collect(),
            range_lists,
        }
    }

    pub fn num_gates(&self) -> usize {
        self.wires.len()
    }

    /// SHA-256 over the serialized constraint system.
    pub fn fingerprint(&self) -> [u8; 32] {
        let mut hasher = Sha256::new();
        hasher.update((self.num_variables as u64).to_le_bytes());
        hasher.update((self.wires.len() as u64).to_le_bytes());
        for (wires, q) in self.wires.iter().zip(&self.selectors) {
            for w in wires {
                hasher.update(w.to_le_bytes());
            }
            for s in [q.q_m, q.q_1, q.q_2, q.q_3, q.q_4, q.q_c] {
                hasher.update(s.into_bigint().to_bytes_le());
            }
        }
        hasher.update((self.public_inputs.len() as u64).to_le_bytes());
        for pi in &self.public_inputs {
            hasher.update(pi.to_le_bytes());
        }
        for (range, members) in &self.range_lists {
            hasher.update(range.to_le_bytes());
            hasher.update((members.len() as u64).to_le_bytes());
            for m in members {
                hasher.update(m.to_le_bytes());
            }
        }
        hasher.finalize().into()
    }
}
