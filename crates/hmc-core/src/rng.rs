//! Deterministic RNG wrapper, state snapshots and seed-derivation helpers.

use rand::{Rng, RngCore, SeedableRng};
use rand_chacha::ChaCha12Rng;
use rand_distr::StandardNormal;
use serde::{Deserialize, Serialize};
use siphasher::sip::SipHasher13;
use std::hash::Hasher;

use crate::errors::{ErrorInfo, HmcError};
use crate::store::Group;

/// Deterministic RNG handle shared by the driver and every evolver call.
///
/// The handle wraps `ChaCha12Rng`, the generator behind `StdRng`, because its
/// full position in the stream can be read back and restored exactly. A master
/// `seed: u64` must be provided by the caller. Substreams are derived by hashing
/// `(master_seed, substream_id)` with SipHash-1-3 configured with fixed zero
/// keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RngHandle {
    rng: ChaCha12Rng,
}

/// Serializable snapshot of an [`RngHandle`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RngState {
    /// Hex encoded 32 byte ChaCha key.
    pub seed: String,
    /// Stream (nonce) selector.
    pub stream: u64,
    /// Word position within the stream, decimal encoded since it is 128 bits wide.
    pub word_pos: String,
}

impl RngHandle {
    /// Creates a new RNG handle from a master seed.
    pub fn from_seed(seed: u64) -> Self {
        Self {
            rng: ChaCha12Rng::seed_from_u64(seed),
        }
    }

    /// Returns a mutable reference to the underlying RNG for advanced usage.
    pub fn inner_mut(&mut self) -> &mut ChaCha12Rng {
        &mut self.rng
    }

    /// Draws a uniform number in `[0, 1)`.
    pub fn uniform(&mut self) -> f64 {
        self.rng.gen::<f64>()
    }

    /// Draws an integer uniformly from the inclusive range `[low, high]`.
    pub fn uniform_int(&mut self, low: i64, high: i64) -> i64 {
        self.rng.gen_range(low..=high)
    }

    /// Draws `len` independent standard normal numbers.
    pub fn normal_vec(&mut self, len: usize) -> Vec<f64> {
        (0..len)
            .map(|_| self.rng.sample::<f64, _>(StandardNormal))
            .collect()
    }

    /// Captures the complete generator state.
    pub fn state(&self) -> RngState {
        RngState {
            seed: hex::encode(self.rng.get_seed()),
            stream: self.rng.get_stream(),
            word_pos: self.rng.get_word_pos().to_string(),
        }
    }

    /// Reconstructs a generator positioned exactly where `state` was taken.
    pub fn from_state(state: &RngState) -> Result<Self, HmcError> {
        let bytes = hex::decode(&state.seed).map_err(|err| {
            HmcError::Rng(
                ErrorInfo::new("rng-seed-decode", err.to_string())
                    .with_context("seed", state.seed.clone()),
            )
        })?;
        let seed: [u8; 32] = bytes.try_into().map_err(|bytes: Vec<u8>| {
            HmcError::Rng(
                ErrorInfo::new("rng-seed-length", "rng seed must be 32 bytes")
                    .with_context("length", bytes.len().to_string()),
            )
        })?;
        let word_pos: u128 = state.word_pos.parse().map_err(|_| {
            HmcError::Rng(
                ErrorInfo::new("rng-word-pos", "invalid rng word position")
                    .with_context("word_pos", state.word_pos.clone()),
            )
        })?;
        let mut rng = ChaCha12Rng::from_seed(seed);
        rng.set_stream(state.stream);
        rng.set_word_pos(word_pos);
        Ok(Self { rng })
    }

    /// Writes the generator state into `group`.
    pub fn write_state(&self, group: &mut Group) -> Result<(), HmcError> {
        let state = self.state();
        group.write("seed", &state.seed)?;
        group.write("stream", &state.stream)?;
        group.write("word_pos", &state.word_pos)
    }

    /// Reads a generator back from a group written by [`RngHandle::write_state`].
    pub fn read_state(group: &Group) -> Result<Self, HmcError> {
        let state = RngState {
            seed: group.read("seed")?,
            stream: group.read("stream")?,
            word_pos: group.read("word_pos")?,
        };
        Self::from_state(&state)
    }
}

impl RngCore for RngHandle {
    fn next_u32(&mut self) -> u32 {
        self.rng.next_u32()
    }

    fn next_u64(&mut self) -> u64 {
        self.rng.next_u64()
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        self.rng.fill_bytes(dest)
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        self.rng.try_fill_bytes(dest)
    }
}

/// Derives the deterministic seed for a specific substream.
pub fn derive_substream_seed(master_seed: u64, substream: u64) -> u64 {
    let mut hasher = SipHasher13::new_with_keys(0, 0);
    hasher.write_u64(master_seed);
    hasher.write_u64(substream);
    hasher.finish()
}
