//! CircuitBuilderBase: variable storage shared by every builder.
//!
//! Provides the witness store, copy-constraint cycle management (via
//! `next_var_index` / `prev_var_index` / `real_variable_index`), public input
//! tracking, and error-state bookkeeping.

use ark_ff::PrimeField;

/// Sentinel: marks the *last* variable in its equivalence class (the "real" variable).
const REAL_VARIABLE: u32 = u32::MAX - 1;

/// Sentinel: marks the *first* variable in its equivalence class.
const FIRST_VARIABLE_IN_CLASS: u32 = u32::MAX - 2;

/// Base data and methods shared by all circuit builders.
#[derive(Debug, Clone)]
pub struct CircuitBuilderBase<F: PrimeField> {
    // ── witness storage ─────────────────────────────────────────────────
    /// All witness values used by the circuit.
    variables: Vec<F>,

    /// Map from witness index to real variable index. Two witnesses with
    /// different indices can share a real variable index and thus a value.
    pub real_variable_index: Vec<u32>,

    // ── copy-constraint cycle ───────────────────────────────────────────
    /// Index of the *next* variable in the equivalence-class cycle.
    next_var_index: Vec<u32>,

    /// Index of the *previous* variable in the equivalence-class cycle.
    prev_var_index: Vec<u32>,

    // ── public inputs ───────────────────────────────────────────────────
    public_inputs: Vec<u32>,

    // ── bookkeeping ─────────────────────────────────────────────────────
    /// Index at which a witness constrained to equal 0 is stored.
    zero_idx: u32,

    num_gates: usize,

    // ── error state ─────────────────────────────────────────────────────
    failed: bool,
    err: String,
}

impl<F: PrimeField> CircuitBuilderBase<F> {
    pub fn new() -> Self {
        Self {
            variables: Vec::new(),
            real_variable_index: Vec::new(),
            next_var_index: Vec::new(),
            prev_var_index: Vec::new(),
            public_inputs: Vec::new(),
            zero_idx: 0,
            num_gates: 0,
            failed: false,
            err: String::new(),
        }
    }

    // ════════════════════════════════════════════════════════════════════
    //  Variable management
    // ════════════════════════════════════════════════════════════════════

    /// Add a variable (witness) to the circuit. Returns its index.
    pub fn add_variable(&mut self, value: F) -> u32 {
        self.variables.push(value);
        let index = self.variables.len() as u32 - 1;
        self.real_variable_index.push(index);
        self.next_var_index.push(REAL_VARIABLE);
        self.prev_var_index.push(FIRST_VARIABLE_IN_CLASS);
        index
    }

    /// Add a variable and register it as a public input.
    pub fn add_public_variable(&mut self, value: F) -> u32 {
        let index = self.add_variable(value);
        self.public_inputs.push(index);
        index
    }

    /// Make an existing witness public. Returns its position in the public
    /// inputs vector.
    pub fn set_public_input(&mut self, witness_index: u32) -> u32 {
        if self.public_inputs.contains(&witness_index) {
            self.failure("Attempted to set a public input that is already public!".into());
            return 0;
        }
        let public_input_index = self.public_inputs.len() as u32;
        self.public_inputs.push(witness_index);
        public_input_index
    }

    /// Get the witness value for a variable, following copy constraints.
    #[inline]
    pub fn get_variable(&self, index: u32) -> F {
        debug_assert!((index as usize) < self.real_variable_index.len());
        let real_idx = self.real_variable_index[index as usize];
        self.variables[real_idx as usize]
    }

    /// Overwrite a witness value after construction.
    ///
    /// Used by soundness tests that tamper with a finished circuit.
    #[inline]
    pub fn set_variable_unchecked(&mut self, index: u32, value: F) {
        let real_idx = self.real_variable_index[index as usize] as usize;
        self.variables[real_idx] = value;
    }

    pub fn get_variables(&self) -> &[F] {
        &self.variables
    }

    pub fn get_num_variables(&self) -> usize {
        self.variables.len()
    }

    // ════════════════════════════════════════════════════════════════════
    //  Copy-constraint / equivalence-class management
    // ════════════════════════════════════════════════════════════════════

    /// Join the equivalence classes of `a_idx` and `b_idx`.
    ///
    /// Afterwards both indices resolve to the same value. Sets `failed` if
    /// the current values disagree.
    pub fn assert_equal(&mut self, a_idx: u32, b_idx: u32, msg: &str) {
        self.assert_valid_variables(&[a_idx, b_idx]);

        if self.get_variable(a_idx) != self.get_variable(b_idx) {
            self.failure(msg.to_string());
        }

        let a_real_idx = self.real_variable_index[a_idx as usize];
        let b_real_idx = self.real_variable_index[b_idx as usize];
        if a_real_idx == b_real_idx {
            return;
        }

        // Point the whole b-chain at a's real index.
        let b_start_idx = self.get_first_variable_in_class(b_idx);
        self.update_real_variable_indices(b_start_idx, a_real_idx);

        // Tie the last (real) element of the b-chain to the first of the a-chain.
        let a_start_idx = self.get_first_variable_in_class(a_idx);
        self.next_var_index[b_real_idx as usize] = a_start_idx;
        self.prev_var_index[a_start_idx as usize] = b_real_idx;
    }

    /// Walk backward to the first variable in the class containing `index`.
    pub fn get_first_variable_in_class(&self, mut index: u32) -> u32 {
        while self.prev_var_index[index as usize] != FIRST_VARIABLE_IN_CLASS {
            index = self.prev_var_index[index as usize];
        }
        index
    }

    fn update_real_variable_indices(&mut self, index: u32, new_real_index: u32) {
        let mut cur = index;
        loop {
            self.real_variable_index[cur as usize] = new_real_index;
            cur = self.next_var_index[cur as usize];
            if cur == REAL_VARIABLE {
                break;
            }
        }
    }

    pub fn assert_valid_variables(&self, variable_indices: &[u32]) {
        if cfg!(debug_assertions) {
            for &idx in variable_indices {
                debug_assert!(
                    (idx as usize) < self.variables.len(),
                    "Variable index {} out of range (variables.len() = {})",
                    idx,
                    self.variables.len()
                );
            }
        }
    }

    // ════════════════════════════════════════════════════════════════════
    //  Public inputs, gates, zero index
    // ════════════════════════════════════════════════════════════════════

    pub fn public_inputs(&self) -> &[u32] {
        &self.public_inputs
    }

    pub fn num_public_inputs(&self) -> usize {
        self.public_inputs.len()
    }

    pub fn num_gates(&self) -> usize {
        self.num_gates
    }

    pub fn increment_num_gates(&mut self, count: usize) {
        self.num_gates += count;
    }

    pub fn zero_idx(&self) -> u32 {
        self.zero_idx
    }

    pub fn set_zero_idx(&mut self, value: u32) {
        self.zero_idx = value;
    }

    // ════════════════════════════════════════════════════════════════════
    //  Error state
    // ════════════════════════════════════════════════════════════════════

    /// Whether the circuit has become unsatisfiable during construction.
    pub fn failed(&self) -> bool {
        self.failed
    }

    /// The first failure message, if any.
    pub fn err(&self) -> &str {
        &self.err
    }

    /// Forget a recorded failure, leaving the gates alone to decide.
    ///
    /// Used by soundness tests.
    pub fn clear_failure(&mut self) {
        self.failed = false;
        self.err.clear();
    }

    /// Record a failure. Only the first message is kept.
    pub fn failure(&mut self, msg: String) {
        if !self.failed {
            self.failed = true;
            self.err = msg;
        }
    }
}

impl<F: PrimeField> Default for CircuitBuilderBase<F> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ark_bn254::Fr;
    use ark_ff::One;

    #[test]
    fn test_base_case() {
        let mut builder = CircuitBuilderBase::<Fr>::new();
        let idx = builder.add_public_variable(Fr::one());
        assert_eq!(idx, 0);
        assert_eq!(builder.get_variable(idx), Fr::one());
        assert_eq!(builder.num_public_inputs(), 1);
        assert_eq!(builder.public_inputs(), &[0]);
        assert!(!builder.failed());
    }

    #[test]
    fn test_assert_equal_merges_classes() {
        let mut builder = CircuitBuilderBase::<Fr>::new();
        let a = builder.add_variable(Fr::from(7u64));
        let b = builder.add_variable(Fr::from(7u64));
        let c = builder.add_variable(Fr::from(7u64));
        assert_ne!(builder.real_variable_index[a as usize], builder.real_variable_index[b as usize]);

        builder.assert_equal(a, b, "test");
        builder.assert_equal(c, b, "test");

        let real = builder.real_variable_index[a as usize];
        assert_eq!(builder.real_variable_index[b as usize], real);
        assert_eq!(builder.real_variable_index[c as usize], real);
        assert!(!builder.failed());
    }

    #[test]
    fn test_assert_equal_different_values() {
        let mut builder = CircuitBuilderBase::<Fr>::new();
        let a = builder.add_variable(Fr::from(5u64));
        let b = builder.add_variable(Fr::from(10u64));

        builder.assert_equal(a, b, "values differ");
        builder.failure("second failure".into());

        assert!(builder.failed());
        assert_eq!(builder.err(), "values differ");
    }

    #[test]
    fn test_set_public_input_twice_fails() {
        let mut builder = CircuitBuilderBase::<Fr>::new();
        let a = builder.add_variable(Fr::from(3u64));
        assert_eq!(builder.set_public_input(a), 0);
        builder.set_public_input(a);
        assert!(builder.failed());
    }
}
