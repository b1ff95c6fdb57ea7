//! Proof inputs: public instance groups and the raw transcript.

use std::path::Path;

use ark_bn254::Fr;
use serde::{Deserialize, Serialize};

use crate::config::{parse_field, to_decimal};
use crate::error::Result;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Proof {
    /// One group of public scalars per aggregated circuit.
    pub instance: Vec<Vec<Fr>>,
    /// Native-field elements, each carrying one byte.
    pub transcript: Vec<Fr>,
}

#[derive(Debug, Serialize, Deserialize)]
struct RawProof {
    instance: Vec<Vec<String>>,
    transcript: Vec<String>,
}

impl Proof {
    pub fn from_transcript_bytes(instance: Vec<Vec<Fr>>, transcript: &[u8]) -> Self {
        Self {
            instance,
            transcript: transcript.iter().map(|&b| Fr::from(b as u64)).collect(),
        }
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let raw: RawProof = serde_json::from_str(json)?;
        let instance = raw
            .instance
            .iter()
            .enumerate()
            .map(|(g, group)| {
                group
                    .iter()
                    .enumerate()
                    .map(|(i, value)| parse_field::<Fr>(&format!("instance[{g}][{i}]"), value))
                    .collect::<Result<Vec<_>>>()
            })
            .collect::<Result<Vec<_>>>()?;
        let transcript = raw
            .transcript
            .iter()
            .enumerate()
            .map(|(i, value)| parse_field::<Fr>(&format!("transcript[{i}]"), value))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            instance,
            transcript,
        })
    }

    pub fn to_json_string(&self) -> Result<String> {
        let raw = RawProof {
            instance: self
                .instance
                .iter()
                .map(|group| group.iter().map(to_decimal).collect())
                .collect(),
            transcript: self.transcript.iter().map(to_decimal).collect(),
        };
        Ok(serde_json::to_string(&raw)?)
    }
}

pub fn load_proof(path: impl AsRef<Path>) -> Result<Proof> {
    let json = std::fs::read_to_string(path)?;
    Proof::from_json_str(&json)
}
