//! Spacetime lattice geometry.

use std::collections::BTreeMap;

use crate::errors::{ErrorInfo, HmcError};

/// Spatial lattice repeated over `nt` time slices.
///
/// Holds the number of time slices, the number of spatial sites and a symmetric
/// hopping matrix between spatial sites. The engine passes it through to
/// evolver and transform constructors without interpreting the hopping.
#[derive(Debug, Clone, PartialEq)]
pub struct Lattice {
    nt: usize,
    nx: usize,
    hopping: BTreeMap<(usize, usize), f64>,
}

impl Lattice {
    /// Constructs a lattice without any hopping.
    pub fn new(nt: usize, nx: usize) -> Result<Self, HmcError> {
        if nt == 0 || nx == 0 {
            return Err(HmcError::Config(
                ErrorInfo::new("empty-lattice", "lattice needs at least one site and time slice")
                    .with_context("nt", nt.to_string())
                    .with_context("nx", nx.to_string()),
            ));
        }
        Ok(Self {
            nt,
            nx,
            hopping: BTreeMap::new(),
        })
    }

    /// Builds a ring of `nx` sites with uniform hopping strength.
    pub fn ring(nt: usize, nx: usize, strength: f64) -> Result<Self, HmcError> {
        let mut lattice = Self::new(nt, nx)?;
        if nx > 1 {
            for site in 0..nx {
                lattice.set_neighbor(site, (site + 1) % nx, strength)?;
            }
        }
        Ok(lattice)
    }

    /// Number of time slices.
    pub fn nt(&self) -> usize {
        self.nt
    }

    /// Number of spatial sites.
    pub fn nx(&self) -> usize {
        self.nx
    }

    /// Total number of spacetime points.
    pub fn latt_size(&self) -> usize {
        self.nt * self.nx
    }

    /// Linear index of spatial site `x` on time slice `t`.
    pub fn index(&self, t: usize, x: usize) -> usize {
        t * self.nx + x
    }

    /// Sets the hopping strength between sites `i` and `j`, keeping the matrix
    /// symmetric. A strength of exactly zero removes the connection.
    pub fn set_neighbor(&mut self, i: usize, j: usize, strength: f64) -> Result<(), HmcError> {
        for site in [i, j] {
            if site >= self.nx {
                return Err(HmcError::Config(
                    ErrorInfo::new("site-out-of-range", "site index out of range")
                        .with_context("site", site.to_string())
                        .with_context("nx", self.nx.to_string()),
                ));
            }
        }
        if strength == 0.0 {
            self.hopping.remove(&(i, j));
            self.hopping.remove(&(j, i));
        } else {
            self.hopping.insert((i, j), strength);
            self.hopping.insert((j, i), strength);
        }
        Ok(())
    }

    /// Returns true if sites `i` and `j` are connected.
    pub fn are_neighbors(&self, i: usize, j: usize) -> bool {
        self.hopping.contains_key(&(i, j))
    }

    /// Hopping strength between two sites (zero if unconnected).
    pub fn hopping(&self, i: usize, j: usize) -> f64 {
        self.hopping.get(&(i, j)).copied().unwrap_or(0.0)
    }
}
