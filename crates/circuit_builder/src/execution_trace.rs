//! Execution trace storage.
//!
//! Every gate of the builder lives in a single arithmetic block: four wire
//! columns plus the six selectors of the width-4 arithmetic relation
//!
//! ```text
//! q_m * w_1 * w_2 + q_1 * w_1 + q_2 * w_2 + q_3 * w_3 + q_4 * w_4 + q_c = 0
//! ```

use ark_ff::PrimeField;

/// Number of wires in the arithmetization.
pub const NUM_WIRES: usize = 4;

/// Selector values of a single gate row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GateSelectors<F: PrimeField> {
    pub q_m: F,
    pub q_1: F,
    pub q_2: F,
    pub q_3: F,
    pub q_4: F,
    pub q_c: F,
}

/// Wire and selector columns for the arithmetic gates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArithmeticBlock<F: PrimeField> {
    pub wires: [Vec<u32>; NUM_WIRES],
    pub q_m: Vec<F>,
    pub q_1: Vec<F>,
    pub q_2: Vec<F>,
    pub q_3: Vec<F>,
    pub q_4: Vec<F>,
    pub q_c: Vec<F>,
}

impl<F: PrimeField> ArithmeticBlock<F> {
    pub fn new() -> Self {
        Self {
            wires: Default::default(),
            q_m: Vec::new(),
            q_1: Vec::new(),
            q_2: Vec::new(),
            q_3: Vec::new(),
            q_4: Vec::new(),
            q_c: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.wires[0].len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn populate_wires(&mut self, idx_1: u32, idx_2: u32, idx_3: u32, idx_4: u32) {
        self.wires[0].push(idx_1);
        self.wires[1].push(idx_2);
        self.wires[2].push(idx_3);
        self.wires[3].push(idx_4);
    }

    pub fn push_selectors(&mut self, selectors: GateSelectors<F>) {
        self.q_m.push(selectors.q_m);
        self.q_1.push(selectors.q_1);
        self.q_2.push(selectors.q_2);
        self.q_3.push(selectors.q_3);
        self.q_4.push(selectors.q_4);
        self.q_c.push(selectors.q_c);
        debug_assert_eq!(self.q_m.len(), self.len(), "selector/wire length mismatch");
    }

    pub fn wires_at(&self, row: usize) -> [u32; NUM_WIRES] {
        [self.wires[0][row], self.wires[1][row], self.wires[2][row], self.wires[3][row]]
    }

    pub fn selectors_at(&self, row: usize) -> GateSelectors<F> {
        GateSelectors {
            q_m: self.q_m[row],
            q_1: self.q_1[row],
            q_2: self.q_2[row],
            q_3: self.q_3[row],
            q_4: self.q_4[row],
            q_c: self.q_c[row],
        }
    }
}
