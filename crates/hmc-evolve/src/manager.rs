use std::collections::BTreeMap;
use std::fmt;

use hmc_core::errors::ErrorInfo;
use hmc_core::{Group, HmcError};

use crate::alternator::Alternator;
use crate::evolver::{Evolver, LoadContext};
use crate::jumps::{TwoPiJumps, UniformJump};
use crate::leapfrog::{ConstStepLeapfrog, LinearStepLeapfrog};
use crate::transform::{AffineTransform, IdentityTransform, Transform};

/// Reconstructs an evolver from a group written by [`Evolver::save`].
pub type EvolverLoader =
    fn(&Group, &EvolverManager, &LoadContext) -> Result<Box<dyn Evolver>, HmcError>;

/// Reconstructs a transform from a group written by [`Transform::save`].
pub type TransformLoader =
    fn(&Group, &EvolverManager, &LoadContext) -> Result<Box<dyn Transform>, HmcError>;

/// Dataset holding the registered type name of a saved evolver or transform.
pub const TYPE_TAG: &str = "__type";

/// Registry mapping type names to loaders.
///
/// Saving writes [`TYPE_TAG`] and delegates to the object. Loading reads the
/// tag, looks up the loader and fails with
/// [`HmcError::UnknownEvolverType`] / [`HmcError::UnknownTransformType`] for
/// names that were never registered. There is no fallback.
#[derive(Clone)]
pub struct EvolverManager {
    evolvers: BTreeMap<String, EvolverLoader>,
    transforms: BTreeMap<String, TransformLoader>,
}

impl EvolverManager {
    /// Creates a manager with no registered types.
    pub fn new() -> Self {
        Self {
            evolvers: BTreeMap::new(),
            transforms: BTreeMap::new(),
        }
    }

    /// Creates a manager knowing every evolver and transform of this crate.
    pub fn with_builtin_types() -> Self {
        let mut manager = Self::new();
        let evolvers: [(&str, EvolverLoader); 5] = [
            (ConstStepLeapfrog::TYPE_NAME, ConstStepLeapfrog::from_store),
            (LinearStepLeapfrog::TYPE_NAME, LinearStepLeapfrog::from_store),
            (TwoPiJumps::TYPE_NAME, TwoPiJumps::from_store),
            (UniformJump::TYPE_NAME, UniformJump::from_store),
            (Alternator::TYPE_NAME, Alternator::from_store),
        ];
        for (name, loader) in evolvers {
            manager.evolvers.insert(name.to_owned(), loader);
        }
        let transforms: [(&str, TransformLoader); 2] = [
            (IdentityTransform::TYPE_NAME, IdentityTransform::from_store),
            (AffineTransform::TYPE_NAME, AffineTransform::from_store),
        ];
        for (name, loader) in transforms {
            manager.transforms.insert(name.to_owned(), loader);
        }
        manager
    }

    /// Registers an evolver loader under `name`.
    pub fn register_evolver(
        &mut self,
        name: impl Into<String>,
        loader: EvolverLoader,
    ) -> Result<(), HmcError> {
        let name = name.into();
        if self.evolvers.contains_key(&name) || self.transforms.contains_key(&name) {
            return Err(duplicate(&name));
        }
        self.evolvers.insert(name, loader);
        Ok(())
    }

    /// Registers a transform loader under `name`.
    pub fn register_transform(
        &mut self,
        name: impl Into<String>,
        loader: TransformLoader,
    ) -> Result<(), HmcError> {
        let name = name.into();
        if self.evolvers.contains_key(&name) || self.transforms.contains_key(&name) {
            return Err(duplicate(&name));
        }
        self.transforms.insert(name, loader);
        Ok(())
    }

    /// True if `name` is a registered evolver or transform.
    pub fn is_registered(&self, name: &str) -> bool {
        self.evolvers.contains_key(name) || self.transforms.contains_key(name)
    }

    /// Writes the type tag of `evolver` followed by its own state.
    pub fn save(&self, evolver: &dyn Evolver, group: &mut Group) -> Result<(), HmcError> {
        let name = evolver.type_name();
        if !self.evolvers.contains_key(name) {
            return Err(unknown_evolver(name));
        }
        group.write(TYPE_TAG, name)?;
        evolver.save(group, self)
    }

    /// Reconstructs an evolver from `group`.
    pub fn load(&self, group: &Group, ctx: &LoadContext) -> Result<Box<dyn Evolver>, HmcError> {
        let name: String = group.read(TYPE_TAG)?;
        let loader = self
            .evolvers
            .get(&name)
            .ok_or_else(|| unknown_evolver(&name))?;
        loader(group, self, ctx)
    }

    /// Writes the type tag of `transform` followed by its parameters.
    pub fn save_transform(
        &self,
        transform: &dyn Transform,
        group: &mut Group,
    ) -> Result<(), HmcError> {
        let name = transform.type_name();
        if !self.transforms.contains_key(name) {
            return Err(unknown_transform(name));
        }
        group.write(TYPE_TAG, name)?;
        transform.save(group, self)
    }

    /// Reconstructs a transform from `group`.
    pub fn load_transform(
        &self,
        group: &Group,
        ctx: &LoadContext,
    ) -> Result<Box<dyn Transform>, HmcError> {
        let name: String = group.read(TYPE_TAG)?;
        let loader = self
            .transforms
            .get(&name)
            .ok_or_else(|| unknown_transform(&name))?;
        loader(group, self, ctx)
    }
}

impl Default for EvolverManager {
    fn default() -> Self {
        Self::with_builtin_types()
    }
}

impl fmt::Debug for EvolverManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EvolverManager")
            .field("evolvers", &self.evolvers.keys().collect::<Vec<_>>())
            .field("transforms", &self.transforms.keys().collect::<Vec<_>>())
            .finish()
    }
}

fn duplicate(name: &str) -> HmcError {
    HmcError::Config(
        ErrorInfo::new("duplicate-type", "type name is already registered").with_context("type", name),
    )
}

fn unknown_evolver(name: &str) -> HmcError {
    HmcError::UnknownEvolverType(
        ErrorInfo::new("unknown-evolver", "evolver type is not registered")
            .with_context("type", name)
            .with_hint("register the type with EvolverManager::register_evolver before loading"),
    )
}

fn unknown_transform(name: &str) -> HmcError {
    HmcError::UnknownTransformType(
        ErrorInfo::new("unknown-transform", "transform type is not registered")
            .with_context("type", name)
            .with_hint("register the type with EvolverManager::register_transform before loading"),
    )
}
