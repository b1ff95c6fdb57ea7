//! The outer proof system seam.
//!
//! An outer backend proves that the verifier circuit is satisfied. Only
//! the checker-backed implementation lives here: it "proves" by running
//! the circuit checker and verifies by re-running the pairing on the
//! public pairing points.

use std::path::{Path, PathBuf};

use ark_bn254::{Fr, G2Affine};
use serde::{Deserialize, Serialize};

use crate::circuit::CompiledCircuit;
use crate::config::{parse_field, to_decimal, Config};
use crate::error::{Result, VerifierError};
use crate::pairing::{pairing_holds, points_from_public_inputs};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    Groth16,
    Plonk,
}

impl BackendKind {
    fn file_stem(self) -> &'static str {
        match self {
            BackendKind::Groth16 => "groth16",
            BackendKind::Plonk => "plonk",
        }
    }
}

pub trait ProvingBackend {
    type ProvingKey;
    type VerifyingKey;
    type Proof;

    fn kind(&self) -> BackendKind;

    fn setup(&self, config: &Config, circuit: &CompiledCircuit) -> Result<(Self::ProvingKey, Self::VerifyingKey)>;

    fn prove(&self, key: &Self::ProvingKey, circuit: &CompiledCircuit) -> Result<Self::Proof>;

    fn verify(&self, key: &Self::VerifyingKey, proof: &Self::Proof, public_inputs: &[Fr]) -> Result<()>;
}

/// Where one backend's artifacts are written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactPaths {
    pub proving_key: PathBuf,
    pub verifying_key: PathBuf,
    pub proof: PathBuf,
    pub public_witness: PathBuf,
    /// Reserved for an on-chain verifier; the checker backend writes none.
    pub contract: PathBuf,
}

impl ArtifactPaths {
    pub fn in_dir(dir: &Path, kind: BackendKind) -> Self {
        let stem = kind.file_stem();
        Self {
            proving_key: dir.join(format!("{stem}.pk")),
            verifying_key: dir.join(format!("{stem}.vk.json")),
            proof: dir.join(format!("{stem}.proof.json")),
            public_witness: dir.join(format!("{stem}.public.json")),
            contract: dir.join(format!("{stem}.sol")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistenceConfig {
    pub backend: BackendKind,
    pub groth16: ArtifactPaths,
    pub plonk: ArtifactPaths,
}

impl PersistenceConfig {
    pub fn in_dir(dir: impl AsRef<Path>, backend: BackendKind) -> Self {
        let dir = dir.as_ref();
        Self {
            backend,
            groth16: ArtifactPaths::in_dir(dir, BackendKind::Groth16),
            plonk: ArtifactPaths::in_dir(dir, BackendKind::Plonk),
        }
    }

    /// Paths of the selected backend.
    pub fn paths(&self) -> &ArtifactPaths {
        match self.backend {
            BackendKind::Groth16 => &self.groth16,
            BackendKind::Plonk => &self.plonk,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckerProvingKey {
    pub fingerprint: [u8; 32],
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckerVerifyingKey {
    pub fingerprint: [u8; 32],
    pub num_public_inputs: usize,
    pub g2: [G2Affine; 2],
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckerProof {
    pub fingerprint: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct PublicWitness {
    public_inputs: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct RawVerifyingKey {
    backend: BackendKind,
    fingerprint: String,
    num_public_inputs: usize,
}

fn hex(bytes: &[u8; 32]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

/// Outer backend that stands in for a real prover.
#[derive(Debug, Clone, Copy)]
pub struct CheckerBackend {
    kind: BackendKind,
}

impl CheckerBackend {
    pub fn new(kind: BackendKind) -> Self {
        Self { kind }
    }

    /// Write the verifying key, proof and public witness as JSON.
    pub fn export(
        &self,
        paths: &ArtifactPaths,
        key: &CheckerVerifyingKey,
        proof: &CheckerProof,
        public_inputs: &[Fr],
    ) -> Result<()> {
        let vk = RawVerifyingKey {
            backend: self.kind,
            fingerprint: hex(&key.fingerprint),
            num_public_inputs: key.num_public_inputs,
        };
        std::fs::write(&paths.verifying_key, serde_json::to_string_pretty(&vk)?)?;
        std::fs::write(&paths.proof, serde_json::to_string_pretty(proof)?)?;
        let witness = PublicWitness {
            public_inputs: public_inputs.iter().map(to_decimal).collect(),
        };
        std::fs::write(&paths.public_witness, serde_json::to_string_pretty(&witness)?)?;
        tracing::debug!(dir = ?paths.proof.parent(), "exported checker artifacts");
        Ok(())
    }

    pub fn load_proof(paths: &ArtifactPaths) -> Result<CheckerProof> {
        Ok(serde_json::from_str(&std::fs::read_to_string(&paths.proof)?)?)
    }

    pub fn load_public_witness(paths: &ArtifactPaths) -> Result<Vec<Fr>> {
        let witness: PublicWitness = serde_json::from_str(&std::fs::read_to_string(&paths.public_witness)?)?;
        witness
            .public_inputs
            .iter()
            .enumerate()
            .map(|(i, value)| parse_field::<Fr>(&format!("public_inputs[{i}]"), value))
            .collect()
    }
}

impl ProvingBackend for CheckerBackend {
    type ProvingKey = CheckerProvingKey;
    type VerifyingKey = CheckerVerifyingKey;
    type Proof = CheckerProof;

    fn kind(&self) -> BackendKind {
        self.kind
    }

    fn setup(&self, config: &Config, circuit: &CompiledCircuit) -> Result<(CheckerProvingKey, CheckerVerifyingKey)> {
        let fingerprint = circuit.constraint_system.fingerprint();
        Ok((
            CheckerProvingKey { fingerprint },
            CheckerVerifyingKey {
                fingerprint,
                num_public_inputs: circuit.public_inputs.len(),
                g2: config.verify_circuit_g2,
            },
        ))
    }

    fn prove(&self, key: &CheckerProvingKey, circuit: &CompiledCircuit) -> Result<CheckerProof> {
        if circuit.constraint_system.fingerprint() != key.fingerprint {
            return Err(VerifierError::ProofInvalid);
        }
        circuit.check()?;
        Ok(CheckerProof {
            fingerprint: hex(&key.fingerprint),
        })
    }

    fn verify(&self, key: &CheckerVerifyingKey, proof: &CheckerProof, public_inputs: &[Fr]) -> Result<()> {
        if proof.fingerprint != hex(&key.fingerprint) || public_inputs.len() != key.num_public_inputs {
            return Err(VerifierError::ProofInvalid);
        }
        let (w_x, w_g) = points_from_public_inputs(public_inputs).ok_or(VerifierError::ProofInvalid)?;
        if !pairing_holds(&key.g2, &w_x, &w_g) {
            return Err(VerifierError::ProofInvalid);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instance::G1;
    use crate::pairing::constrain_pairing;
    use ark_bn254::G1Affine;
    use ark_ec::{AffineRepr, CurveGroup};
    use ark_ff::{One, UniformRand};
    use h2v_stdlib::primitives::witness::new_builder;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use crate::testing::{Shape, TestProver};

    /// A circuit holding only the pairing check.
    fn pairing_circuit(config: &Config, w_x: G1Affine, w_g: G1Affine) -> CompiledCircuit {
        let builder = new_builder::<Fr>();
        let points = constrain_pairing(
            &builder,
            &config.verify_circuit_g2,
            &G1::from_witness(builder.clone(), &w_x),
            &G1::from_witness(builder.clone(), &w_g),
        );
        CompiledCircuit::from_builder(builder, points)
    }

    /// Parameters with the G2 pair `[s * G2, -G2]` and two points passing
    /// the pairing under them.
    fn setup_with_points(seed: u64) -> (Config, G1Affine, G1Affine) {
        let mut rng = StdRng::seed_from_u64(seed);
        let s = Fr::rand(&mut rng);
        let shape = Shape {
            nb_advices: 1,
            nb_lookups_m: 0,
            nb_permutation_groups: 0,
            nb_lookups_zs: 0,
            degree: 1,
            nb_evals: 1,
        };
        let mut config = TestProver::new(shape, 2, None, seed).config().clone();
        let g2 = G2Affine::generator();
        config.verify_circuit_g2 = [(g2 * s).into_affine(), (-g2.into_group()).into_affine()];
        let w_x = (G1Affine::generator() * Fr::rand(&mut rng)).into_affine();
        (config, w_x, (w_x * s).into_affine())
    }

    #[test]
    fn test_persistence_paths_are_explicit() {
        let persistence = PersistenceConfig::in_dir("/tmp/artifacts", BackendKind::Plonk);
        assert_eq!(persistence.paths().proof, PathBuf::from("/tmp/artifacts/plonk.proof.json"));
        assert_eq!(persistence.groth16.verifying_key, PathBuf::from("/tmp/artifacts/groth16.vk.json"));
        let json = serde_json::to_string(&persistence).unwrap();
        assert!(json.contains("\"backend\":\"plonk\""));
    }

    #[test]
    fn test_checker_backend_roundtrip() {
        let (config, w_x, w_g) = setup_with_points(43);
        let circuit = pairing_circuit(&config, w_x, w_g);
        let backend = CheckerBackend::new(BackendKind::Groth16);
        let (pk, vk) = backend.setup(&config, &circuit).unwrap();
        let proof = backend.prove(&pk, &circuit).unwrap();
        backend.verify(&vk, &proof, &circuit.public_inputs).unwrap();

        let mut tampered = circuit.public_inputs.clone();
        tampered[0] += Fr::one();
        assert!(matches!(
            backend.verify(&vk, &proof, &tampered),
            Err(VerifierError::ProofInvalid)
        ));
    }

    #[test]
    fn test_checker_backend_refuses_unsatisfied_circuit() {
        let (config, w_x, _) = setup_with_points(42);
        let circuit = pairing_circuit(&config, w_x, w_x);
        let backend = CheckerBackend::new(BackendKind::Plonk);
        let (pk, _) = backend.setup(&config, &circuit).unwrap();
        assert!(matches!(backend.prove(&pk, &circuit), Err(VerifierError::ProofInvalid)));
    }

    #[test]
    fn test_export_and_reload() {
        let (config, w_x, w_g) = setup_with_points(43);
        let circuit = pairing_circuit(&config, w_x, w_g);
        let backend = CheckerBackend::new(BackendKind::Plonk);
        let (pk, vk) = backend.setup(&config, &circuit).unwrap();
        let proof = backend.prove(&pk, &circuit).unwrap();

        let dir = std::env::temp_dir().join(format!("h2v_backend_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let persistence = PersistenceConfig::in_dir(&dir, BackendKind::Plonk);
        backend
            .export(persistence.paths(), &vk, &proof, &circuit.public_inputs)
            .unwrap();
        let reloaded = CheckerBackend::load_proof(persistence.paths()).unwrap();
        let public_inputs = CheckerBackend::load_public_witness(persistence.paths()).unwrap();
        backend.verify(&vk, &reloaded, &public_inputs).unwrap();
        std::fs::remove_dir_all(&dir).unwrap();
    }
}
