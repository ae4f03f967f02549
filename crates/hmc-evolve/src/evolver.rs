use std::fmt;
use std::sync::Arc;

use hmc_core::{Action, Group, Hamiltonian, HmcError, Lattice, RngHandle, TrajectoryRecord};

use crate::manager::EvolverManager;

/// Shared collaborators injected when evolvers and transforms are loaded.
///
/// These are process-wide resources and are never written to the store.
#[derive(Debug, Clone)]
pub struct LoadContext {
    /// Action of the simulation.
    pub action: Arc<dyn Action>,
    /// Lattice the simulation runs on.
    pub lattice: Arc<Lattice>,
}

impl LoadContext {
    /// Bundles the collaborators.
    pub fn new(action: Arc<dyn Action>, lattice: Arc<Lattice>) -> Self {
        Self { action, lattice }
    }

    /// Builds the molecular dynamics Hamiltonian for the action.
    pub fn hamiltonian(&self) -> Hamiltonian {
        Hamiltonian::new(Arc::clone(&self.action))
    }
}

/// Advances the Markov chain by one trajectory.
///
/// `evolve` must depend only on the current record, the evolver's own state and
/// draws from `rng`. It may update its own state but never the input record.
/// Numerical failures of the action are propagated unchanged.
pub trait Evolver: fmt::Debug + Send {
    /// Stable name under which the type is registered with an [`EvolverManager`].
    fn type_name(&self) -> &'static str;

    /// Produces the next trajectory record.
    fn evolve(
        &mut self,
        current: &TrajectoryRecord,
        rng: &mut RngHandle,
    ) -> Result<TrajectoryRecord, HmcError>;

    /// Writes parameters and live state into `group`. Inverse of the registered loader.
    fn save(&self, group: &mut Group, manager: &EvolverManager) -> Result<(), HmcError>;
}
