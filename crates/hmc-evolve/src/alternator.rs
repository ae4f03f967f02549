use hmc_core::errors::ErrorInfo;
use hmc_core::{Group, HmcError, RngHandle, TrajectoryRecord};

use crate::evolver::{Evolver, LoadContext};
use crate::manager::EvolverManager;

/// Cycles through sub-evolvers, running each a fixed number of times in a row.
#[derive(Debug, Default)]
pub struct Alternator {
    schedule: Vec<(Box<dyn Evolver>, usize)>,
    index: usize,
    remaining: usize,
}

impl Alternator {
    /// Registered type name.
    pub const TYPE_NAME: &'static str = "Alternator";

    /// Creates an empty alternator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `evolver` to the schedule, to be run `repeats` times in a row.
    pub fn add(&mut self, evolver: Box<dyn Evolver>, repeats: usize) -> Result<(), HmcError> {
        if repeats == 0 {
            return Err(HmcError::Config(
                ErrorInfo::new("invalid-repeats", "alternator repeats must be at least 1")
                    .with_context("evolver", evolver.type_name()),
            ));
        }
        if self.schedule.is_empty() {
            self.index = 0;
            self.remaining = repeats;
        }
        self.schedule.push((evolver, repeats));
        Ok(())
    }

    /// Builder form of [`Alternator::add`].
    pub fn with(mut self, evolver: Box<dyn Evolver>, repeats: usize) -> Result<Self, HmcError> {
        self.add(evolver, repeats)?;
        Ok(self)
    }

    /// Number of scheduled sub-evolvers.
    pub fn len(&self) -> usize {
        self.schedule.len()
    }

    /// True if nothing is scheduled.
    pub fn is_empty(&self) -> bool {
        self.schedule.is_empty()
    }

    /// `(index, remaining)` of the sub-evolver that runs next.
    pub fn cursor(&self) -> (usize, usize) {
        (self.index, self.remaining)
    }

    /// Loader registered with the [`EvolverManager`].
    pub fn from_store(
        group: &Group,
        manager: &EvolverManager,
        ctx: &LoadContext,
    ) -> Result<Box<dyn Evolver>, HmcError> {
        let repeats: Vec<usize> = group.read("repeats")?;
        let evolvers = group.group("evolvers")?;
        let mut alternator = Self::new();
        for (i, count) in repeats.iter().enumerate() {
            let sub = evolvers.group(&i.to_string())?;
            alternator.add(manager.load(sub, ctx)?, *count)?;
        }

        let index: usize = group.read("index")?;
        let remaining: usize = group.read("remaining")?;
        let valid = repeats
            .get(index)
            .is_some_and(|count| remaining >= 1 && remaining <= *count);
        if !valid {
            return Err(HmcError::Store(
                ErrorInfo::new("invalid-cursor", "alternator cursor is out of range")
                    .with_context("index", index.to_string())
                    .with_context("remaining", remaining.to_string()),
            ));
        }
        alternator.index = index;
        alternator.remaining = remaining;
        Ok(Box::new(alternator))
    }
}

impl Evolver for Alternator {
    fn type_name(&self) -> &'static str {
        Self::TYPE_NAME
    }

    fn evolve(
        &mut self,
        current: &TrajectoryRecord,
        rng: &mut RngHandle,
    ) -> Result<TrajectoryRecord, HmcError> {
        let count = self.schedule.len();
        let Some((evolver, _)) = self.schedule.get_mut(self.index) else {
            return Err(HmcError::Config(ErrorInfo::new(
                "empty-alternator",
                "alternator has no evolvers",
            )));
        };
        let next = evolver.evolve(current, rng)?;

        self.remaining -= 1;
        if self.remaining == 0 {
            self.index = (self.index + 1) % count;
            self.remaining = self.schedule[self.index].1;
        }
        Ok(next)
    }

    fn save(&self, group: &mut Group, manager: &EvolverManager) -> Result<(), HmcError> {
        let repeats: Vec<usize> = self.schedule.iter().map(|(_, count)| *count).collect();
        group.write("repeats", &repeats)?;
        group.write("index", &self.index)?;
        group.write("remaining", &self.remaining)?;
        let evolvers = group.create_group("evolvers")?;
        for (i, (evolver, _)) in self.schedule.iter().enumerate() {
            let sub = evolvers.create_group(&i.to_string())?;
            manager.save(evolver.as_ref(), sub)?;
        }
        Ok(())
    }
}
