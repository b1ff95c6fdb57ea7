//! Commitments to the public instance columns.
//!
//! Each instance group is committed as `sum(instance[i] * g_lagrange[i])`
//! with the fixed-base multiplication, since the Lagrange commitments are
//! circuit constants. A group of zeros commits to the point at infinity.

use ark_bn254::{g1, Fr, G1Affine, G1Projective};
use ark_ec::VariableBaseMSM;
use h2v_stdlib::primitives::biggroup::ElementT;
use h2v_stdlib::primitives::field::FieldT;
use h2v_stdlib::primitives::witness::BuilderRef;

use crate::config::Config;
use crate::error::{Result, VerifierError};

pub type G1 = ElementT<Fr, g1::Config>;

/// Every group must be non-empty and fit in the Lagrange commitments.
pub fn check_instance_counts(config: &Config, instance: &[Vec<Fr>]) -> Result<()> {
    let available = config.verify_circuit_g_lagrange.len();
    for (group, values) in instance.iter().enumerate() {
        if values.is_empty() || values.len() > available {
            return Err(VerifierError::InstanceCountMismatch {
                group,
                count: values.len(),
                available,
            });
        }
    }
    Ok(())
}

/// In-circuit commitment of every instance group, in group order.
pub fn instance_commitments(
    ctx: &BuilderRef<Fr>,
    config: &Config,
    instance: &[Vec<FieldT<Fr>>],
) -> Result<Vec<G1>> {
    let available = config.verify_circuit_g_lagrange.len();
    instance
        .iter()
        .enumerate()
        .map(|(group, values)| {
            if values.is_empty() || values.len() > available {
                return Err(VerifierError::InstanceCountMismatch {
                    group,
                    count: values.len(),
                    available,
                });
            }
            let bases = &config.verify_circuit_g_lagrange[..values.len()];
            Ok(G1::fixed_base_batch_mul(ctx, bases, values))
        })
        .collect()
}

/// Native commitment of one instance group.
pub fn native_instance_commitment(config: &Config, values: &[Fr]) -> Result<G1Projective> {
    let available = config.verify_circuit_g_lagrange.len();
    if values.is_empty() || values.len() > available {
        return Err(VerifierError::InstanceCountMismatch {
            group: 0,
            count: values.len(),
            available,
        });
    }
    let bases: &[G1Affine] = &config.verify_circuit_g_lagrange[..values.len()];
    Ok(G1Projective::msm_unchecked(bases, values))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::default_omega;
    use ark_bn254::G2Affine;
    use ark_ec::{AffineRepr, CurveGroup};
    use ark_ff::UniformRand;
    use h2v_circuit_builder::UltraCircuitChecker;
    use h2v_stdlib::primitives::witness::new_builder;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn config_with_lagrange(n: usize) -> Config {
        let mut rng = StdRng::seed_from_u64(11);
        Config {
            nb_advices: 1,
            nb_lookups_m: 0,
            nb_permutation_groups: 0,
            nb_lookups_zs: 0,
            degree: 1,
            nb_evals: 1,
            challenge_init_scalar: Fr::from(1u64),
            verify_circuit_g2: [G2Affine::generator(), G2Affine::generator()],
            verify_circuit_g_lagrange: (0..n)
                .map(|_| G1Projective::rand(&mut rng).into_affine())
                .collect(),
            queries: None,
            omega: default_omega(n),
        }
    }

    #[test]
    fn test_commitment_matches_native() {
        let config = config_with_lagrange(4);
        let mut rng = StdRng::seed_from_u64(12);
        let values: Vec<Fr> = (0..2).map(|_| Fr::rand(&mut rng)).collect();
        let builder = new_builder::<Fr>();
        let wires: Vec<FieldT<Fr>> = values
            .iter()
            .map(|v| FieldT::from_witness(builder.clone(), *v))
            .collect();
        let commitments = instance_commitments(&builder, &config, &[wires]).unwrap();
        let expected = native_instance_commitment(&config, &values).unwrap();
        assert_eq!(commitments[0].get_value(), expected.into_affine());
        assert!(UltraCircuitChecker::check(&builder.borrow()).is_ok());
    }

    #[test]
    fn test_zero_group_commits_to_identity() {
        let config = config_with_lagrange(4);
        let values = vec![Fr::from(0u64); 3];
        let builder = new_builder::<Fr>();
        let wires: Vec<FieldT<Fr>> = values
            .iter()
            .map(|v| FieldT::from_witness(builder.clone(), *v))
            .collect();
        let commitments = instance_commitments(&builder, &config, &[wires]).unwrap();
        let native = native_instance_commitment(&config, &values).unwrap().into_affine();
        assert!(native.infinity);
        assert_eq!(commitments[0].get_value(), native);
        assert!(commitments[0].is_infinity.get_value());
        assert!(UltraCircuitChecker::check(&builder.borrow()).is_ok());
    }

    #[test]
    fn test_too_many_instances() {
        let config = config_with_lagrange(2);
        let instance = vec![vec![Fr::from(1u64)], vec![Fr::from(1u64); 3]];
        match check_instance_counts(&config, &instance) {
            Err(VerifierError::InstanceCountMismatch {
                group,
                count,
                available,
            }) => assert_eq!((group, count, available), (1, 3, 2)),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_empty_group_rejected() {
        let config = config_with_lagrange(2);
        assert!(matches!(
            check_instance_counts(&config, &[vec![]]),
            Err(VerifierError::InstanceCountMismatch { count: 0, .. })
        ));
    }
}
