#![deny(missing_docs)]
//! Core data types and external collaborators for the lattice HMC engine.
//!
//! Everything the evolution engine needs from the outside world lives here:
//! the configuration and trajectory types, the deterministic RNG handle with
//! restorable state, the action/Hamiltonian and lattice collaborators, and the
//! hierarchical store used for trajectories and checkpoints.

pub mod action;
pub mod errors;
pub mod lattice;
pub mod linalg;
pub mod rng;
pub mod store;
mod types;

pub use action::{ensure_finite_action, Action, Hamiltonian, HubbardGaugeAction, SumAction};
pub use errors::{ErrorInfo, HmcError};
pub use lattice::Lattice;
pub use num_complex::Complex64;
pub use rng::{derive_substream_seed, RngHandle, RngState};
pub use store::{Group, Node, Store};
pub use types::{Configuration, TrajectoryRecord};
