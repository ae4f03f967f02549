//! Hierarchical key-value store holding trajectories, checkpoints and measurements.
//!
//! A [`Store`] is a tree of [`Group`]s. Groups contain named datasets (arbitrary
//! serde values), sub-groups and soft links. Soft links hold an absolute path and
//! are only resolved when read through [`Store::resolve_group`]. Entries are
//! never overwritten: creating a name twice is a [`HmcError::StoreCollision`].

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use tracing::debug;

use crate::errors::{ErrorInfo, HmcError};

const MAX_LINK_HOPS: usize = 32;

/// A single entry inside a [`Group`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "kebab-case")]
pub enum Node {
    /// Nested group.
    Group(Group),
    /// Serialized dataset.
    Dataset(Value),
    /// Absolute path of another group.
    SoftLink(String),
}

/// Named collection of datasets, sub-groups and soft links.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Group {
    #[serde(default)]
    entries: BTreeMap<String, Node>,
}

fn split_path(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|part| !part.is_empty())
}

fn collision(name: &str) -> HmcError {
    HmcError::StoreCollision(
        ErrorInfo::new("store-collision", "entry already exists").with_context("name", name),
    )
}

fn missing(name: &str) -> HmcError {
    HmcError::Store(ErrorInfo::new("missing-entry", "entry does not exist").with_context("name", name))
}

impl Group {
    /// Creates an empty group.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if an entry with the given name exists directly in this group.
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Returns the entry stored under `name`, if any.
    pub fn get(&self, name: &str) -> Option<&Node> {
        self.entries.get(name)
    }

    /// Iterates over the names of all direct entries in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Creates a new group at the relative `path`, creating intermediate groups.
    ///
    /// Fails with [`HmcError::StoreCollision`] if the final component exists.
    pub fn create_group(&mut self, path: &str) -> Result<&mut Group, HmcError> {
        let parts: Vec<&str> = split_path(path).collect();
        let (last, parents) = parts.split_last().ok_or_else(|| {
            HmcError::Store(ErrorInfo::new("empty-path", "cannot create a group at an empty path"))
        })?;
        let mut current = self;
        for part in parents {
            current = current.require_group(part)?;
        }
        if current.entries.contains_key(*last) {
            return Err(collision(path));
        }
        current.entries.insert((*last).to_string(), Node::Group(Group::new()));
        match current.entries.get_mut(*last) {
            Some(Node::Group(group)) => Ok(group),
            _ => Err(missing(path)),
        }
    }

    /// Returns the group at `path`, creating it (and its parents) if it does not exist.
    pub fn require_group(&mut self, path: &str) -> Result<&mut Group, HmcError> {
        let mut current = self;
        for part in split_path(path) {
            let node = current
                .entries
                .entry(part.to_string())
                .or_insert_with(|| Node::Group(Group::new()));
            current = match node {
                Node::Group(group) => group,
                _ => {
                    return Err(HmcError::StoreCollision(
                        ErrorInfo::new(
                            "store-not-a-group",
                            "another object with the same name already exists",
                        )
                        .with_context("name", part),
                    ))
                }
            };
        }
        Ok(current)
    }

    /// Attaches a fully assembled group at the relative `path` in one step.
    pub fn insert_group(&mut self, path: &str, group: Group) -> Result<(), HmcError> {
        let parts: Vec<&str> = split_path(path).collect();
        let (last, parents) = parts.split_last().ok_or_else(|| {
            HmcError::Store(ErrorInfo::new("empty-path", "cannot insert a group at an empty path"))
        })?;
        let mut current = self;
        for part in parents {
            current = current.require_group(part)?;
        }
        if current.entries.contains_key(*last) {
            return Err(collision(path));
        }
        current.entries.insert((*last).to_string(), Node::Group(group));
        Ok(())
    }

    /// Returns the group at the relative `path` without following soft links.
    pub fn group(&self, path: &str) -> Result<&Group, HmcError> {
        let mut current = self;
        for part in split_path(path) {
            current = match current.entries.get(part) {
                Some(Node::Group(group)) => group,
                Some(_) => {
                    return Err(HmcError::Store(
                        ErrorInfo::new("not-a-group", "entry is not a group")
                            .with_context("name", part),
                    ))
                }
                None => return Err(missing(path)),
            };
        }
        Ok(current)
    }

    /// Mutable variant of [`Group::group`].
    pub fn group_mut(&mut self, path: &str) -> Result<&mut Group, HmcError> {
        let mut current = self;
        for part in split_path(path) {
            current = match current.entries.get_mut(part) {
                Some(Node::Group(group)) => group,
                Some(_) => {
                    return Err(HmcError::Store(
                        ErrorInfo::new("not-a-group", "entry is not a group")
                            .with_context("name", part),
                    ))
                }
                None => return Err(missing(path)),
            };
        }
        Ok(current)
    }

    /// Writes a new dataset. Existing entries are never overwritten.
    pub fn write<T: Serialize + ?Sized>(&mut self, name: &str, value: &T) -> Result<(), HmcError> {
        if self.entries.contains_key(name) {
            return Err(collision(name));
        }
        let value = serde_json::to_value(value).map_err(|err| {
            HmcError::Store(
                ErrorInfo::new("dataset-serialize", err.to_string()).with_context("name", name),
            )
        })?;
        self.entries.insert(name.to_string(), Node::Dataset(value));
        Ok(())
    }

    /// Reads and deserializes a dataset.
    pub fn read<T: DeserializeOwned>(&self, name: &str) -> Result<T, HmcError> {
        match self.entries.get(name) {
            Some(Node::Dataset(value)) => T::deserialize(value).map_err(|err| {
                HmcError::Store(
                    ErrorInfo::new("dataset-parse", err.to_string()).with_context("name", name),
                )
            }),
            Some(_) => Err(HmcError::Store(
                ErrorInfo::new("not-a-dataset", "entry is not a dataset").with_context("name", name),
            )),
            None => Err(missing(name)),
        }
    }

    /// Creates a soft link named `name` pointing at the absolute path `target`.
    pub fn link(&mut self, name: &str, target: impl Into<String>) -> Result<(), HmcError> {
        if self.entries.contains_key(name) {
            return Err(collision(name));
        }
        self.entries
            .insert(name.to_string(), Node::SoftLink(target.into()));
        Ok(())
    }

    /// Returns the target of the soft link `name`, if that entry is a link.
    pub fn link_target(&self, name: &str) -> Option<&str> {
        match self.entries.get(name) {
            Some(Node::SoftLink(target)) => Some(target),
            _ => None,
        }
    }
}

/// Root of a persisted hierarchy.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Store {
    root: Group,
}

impl Store {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the root group.
    pub fn root(&self) -> &Group {
        &self.root
    }

    /// Returns the root group mutably.
    pub fn root_mut(&mut self) -> &mut Group {
        &mut self.root
    }

    /// Returns true if `path` resolves to a group, following soft links.
    pub fn group_exists(&self, path: &str) -> bool {
        self.resolve_group(path).is_ok()
    }

    /// Resolves an absolute group path, following soft links.
    ///
    /// A link whose target is missing yields [`HmcError::BrokenReference`].
    pub fn resolve_group(&self, path: &str) -> Result<&Group, HmcError> {
        let mut pending: Vec<String> = split_path(path).map(str::to_owned).collect();
        let mut current = &self.root;
        let mut via_link: Option<String> = None;
        let mut hops = 0usize;
        let mut idx = 0usize;
        while idx < pending.len() {
            let name = pending[idx].clone();
            match current.entries.get(&name) {
                Some(Node::Group(group)) => {
                    current = group;
                    idx += 1;
                }
                Some(Node::SoftLink(target)) => {
                    hops += 1;
                    if hops > MAX_LINK_HOPS {
                        return Err(HmcError::BrokenReference(
                            ErrorInfo::new("link-cycle", "soft link chain does not terminate")
                                .with_context("path", path),
                        ));
                    }
                    let mut next: Vec<String> = split_path(target).map(str::to_owned).collect();
                    next.extend(pending[idx + 1..].iter().cloned());
                    via_link = Some(target.clone());
                    pending = next;
                    current = &self.root;
                    idx = 0;
                }
                Some(Node::Dataset(_)) => {
                    return Err(HmcError::Store(
                        ErrorInfo::new("not-a-group", "entry is not a group")
                            .with_context("path", path)
                            .with_context("name", name),
                    ))
                }
                None => {
                    return Err(match &via_link {
                        Some(target) => HmcError::BrokenReference(
                            ErrorInfo::new("dangling-link", "soft link target does not exist")
                                .with_context("path", path)
                                .with_context("target", target.clone()),
                        ),
                        None => missing(path),
                    })
                }
            }
        }
        Ok(current)
    }

    /// Restores a store from disk.
    pub fn load(path: &Path) -> Result<Self, HmcError> {
        let contents = fs::read_to_string(path).map_err(|err| {
            HmcError::Store(
                ErrorInfo::new("store-read", err.to_string())
                    .with_context("path", path.display().to_string()),
            )
        })?;
        let store = serde_json::from_str(&contents).map_err(|err| {
            HmcError::Store(
                ErrorInfo::new("store-parse", err.to_string())
                    .with_context("path", path.display().to_string()),
            )
        })?;
        debug!(path = %path.display(), bytes = contents.len(), "loaded store");
        Ok(store)
    }

    /// Writes the store to disk, replacing any previous file in a single rename.
    pub fn save(&self, path: &Path) -> Result<(), HmcError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|err| {
                    HmcError::Store(
                        ErrorInfo::new("store-mkdir", err.to_string())
                            .with_context("path", parent.display().to_string()),
                    )
                })?;
            }
        }
        let json = serde_json::to_string(self).map_err(|err| {
            HmcError::Store(
                ErrorInfo::new("store-serialize", err.to_string())
                    .with_context("path", path.display().to_string()),
            )
        })?;
        let staging = staging_path(path);
        fs::write(&staging, json).map_err(|err| {
            HmcError::Store(
                ErrorInfo::new("store-write", err.to_string())
                    .with_context("path", staging.display().to_string()),
            )
        })?;
        fs::rename(&staging, path).map_err(|err| {
            HmcError::Store(
                ErrorInfo::new("store-rename", err.to_string())
                    .with_context("path", path.display().to_string()),
            )
        })?;
        debug!(path = %path.display(), "saved store");
        Ok(())
    }
}

fn staging_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|name| name.to_os_string())
        .unwrap_or_default();
    name.push(".partial");
    path.with_file_name(name)
}
