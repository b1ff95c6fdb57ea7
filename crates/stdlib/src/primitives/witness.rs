//! Circuit witness primitives.

use std::cell::RefCell;
use std::rc::Rc;

use ark_ff::PrimeField;
use h2v_circuit_builder::UltraCircuitBuilder;

/// Builder reference type shared across circuit elements.
pub type BuilderRef<F> = Rc<RefCell<UltraCircuitBuilder<F>>>;

/// Sentinel value indicating a constant (no witness).
pub const IS_CONSTANT: u32 = u32::MAX;

/// Fresh builder behind a shared reference.
pub fn new_builder<F: PrimeField>() -> BuilderRef<F> {
    Rc::new(RefCell::new(UltraCircuitBuilder::new()))
}

/// The shared builder of a set of circuit elements.
///
/// Constants carry no builder; mixing two different builders is a
/// programming error and panics.
pub(crate) fn validate_contexts<F: PrimeField>(
    contexts: &[&Option<BuilderRef<F>>],
) -> Option<BuilderRef<F>> {
    let mut found: Option<&BuilderRef<F>> = None;
    for ctx in contexts.iter().copied().flatten() {
        match found {
            None => found = Some(ctx),
            Some(prev) => assert!(
                Rc::ptr_eq(prev, ctx),
                "circuit elements belong to different builders"
            ),
        }
    }
    found.cloned()
}

/// A witness element in a circuit: a value and its variable index.
#[derive(Clone)]
pub struct WitnessT<F: PrimeField> {
    pub witness: F,
    pub witness_index: u32,
    pub context: BuilderRef<F>,
}

impl<F: PrimeField> WitnessT<F> {
    pub fn new(context: BuilderRef<F>, value: F) -> Self {
        let witness_index = context.borrow_mut().base.add_variable(value);
        Self {
            witness: value,
            witness_index,
            context,
        }
    }

    pub fn from_bool(context: BuilderRef<F>, value: bool) -> Self {
        Self::new(context, F::from(value as u64))
    }

    pub fn from_u64(context: BuilderRef<F>, value: u64) -> Self {
        Self::new(context, F::from(value))
    }

    /// A witness pinned to `value` through the builder's constant table.
    pub fn create_constant_witness(context: BuilderRef<F>, value: F) -> Self {
        let out = Self::new(context.clone(), value);
        context.borrow_mut().assert_equal_constant(
            out.witness_index,
            value,
            "Failed to create constant witness.",
        );
        out
    }

    pub fn is_constant(&self) -> bool {
        self.witness_index == IS_CONSTANT
    }
}

/// Like `WitnessT` but registered as a public input.
#[derive(Clone)]
pub struct PublicWitnessT<F: PrimeField> {
    pub witness: F,
    pub witness_index: u32,
    pub context: BuilderRef<F>,
}

impl<F: PrimeField> PublicWitnessT<F> {
    pub fn new(context: BuilderRef<F>, value: F) -> Self {
        let witness_index = context.borrow_mut().base.add_public_variable(value);
        Self {
            witness: value,
            witness_index,
            context,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ark_bn254::Fr;
    use ark_ff::{One, Zero};
    use h2v_circuit_builder::UltraCircuitChecker;

    #[test]
    fn test_witness_constructor_from_field() {
        let builder = new_builder::<Fr>();
        let value = Fr::from(42u64);
        let w = WitnessT::new(builder.clone(), value);
        assert_eq!(w.witness, value);
        assert!(!w.is_constant());
        assert_eq!(builder.borrow().base.get_variable(w.witness_index), value);
    }

    #[test]
    fn test_witness_constructor_from_bool() {
        let builder = new_builder::<Fr>();
        assert_eq!(WitnessT::from_bool(builder.clone(), true).witness, Fr::one());
        assert_eq!(WitnessT::from_bool(builder, false).witness, Fr::zero());
    }

    #[test]
    fn test_witness_create_constant() {
        let builder = new_builder::<Fr>();
        let w = WitnessT::create_constant_witness(builder.clone(), Fr::from(7u64));
        assert_eq!(w.witness, Fr::from(7u64));
        assert!(UltraCircuitChecker::check(&builder.borrow()).is_ok());
    }

    #[test]
    fn test_public_witness() {
        let builder = new_builder::<Fr>();
        let w = PublicWitnessT::new(builder.clone(), Fr::from(3u64));
        let b = builder.borrow();
        assert_eq!(b.base.num_public_inputs(), 1);
        assert_eq!(b.base.public_inputs(), &[w.witness_index]);
    }
}
