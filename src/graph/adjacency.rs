//! Undirected graph over a fixed range of territory ids.
//!
//! Each node slot holds an optional [`BucketedSet`] of neighbour ids; `None`
//! means the vertex has not been added yet. Edges are always stored in both
//! directions, so `is_edge(u, v) == is_edge(v, u)` holds after any sequence
//! of operations. Vertices are never removed.

use crate::board::territory::{Player, TerritoryId, MAX_TERRITORIES};
use crate::collections::{BucketedSet, SetError};

/// Errors raised by graph construction and mutation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GraphError {
    #[error("a graph holds at most {max} nodes, requested {requested}")]
    TooManyNodes { requested: usize, max: usize },

    #[error("node {0} is outside the graph")]
    UnknownNode(TerritoryId),

    #[error("node {0} has not been added")]
    MissingVertex(TerritoryId),

    #[error("node {0} cannot border itself")]
    SelfLoop(TerritoryId),

    #[error("continent {0} is outside the map")]
    UnknownContinent(usize),

    #[error("a map holds at most {max} continents, requested {requested}")]
    TooManyContinents { requested: usize, max: usize },

    #[error("{given} territory records given for {expected} nodes")]
    ShortRecords { given: usize, expected: usize },

    #[error("{0:?} has no territory to give up")]
    CountUnderflow(Player),

    #[error(transparent)]
    Set(#[from] SetError),
}

/// Adjacency-set graph with a fixed number of node slots.
#[derive(Debug, Clone)]
pub struct AdjacencyGraph {
    nbrs: Vec<Option<BucketedSet<TerritoryId>>>,
}

impl AdjacencyGraph {
    /// Creates a graph with `node_count` empty slots.
    pub fn new(node_count: usize) -> Result<Self, GraphError> {
        if node_count > MAX_TERRITORIES {
            return Err(GraphError::TooManyNodes {
                requested: node_count,
                max: MAX_TERRITORIES,
            });
        }
        Ok(AdjacencyGraph {
            nbrs: vec![None; node_count],
        })
    }

    /// Number of node slots, present or not.
    pub fn node_count(&self) -> usize {
        self.nbrs.len()
    }

    fn check(&self, id: TerritoryId) -> Result<usize, GraphError> {
        let idx = id as usize;
        if idx < self.nbrs.len() {
            Ok(idx)
        } else {
            Err(GraphError::UnknownNode(id))
        }
    }

    /// Adds a vertex. Returns true if it was not present before.
    pub fn add_vertex(&mut self, id: TerritoryId) -> Result<bool, GraphError> {
        let idx = self.check(id)?;
        if self.nbrs[idx].is_some() {
            return Ok(false);
        }
        self.nbrs[idx] = Some(BucketedSet::new());
        Ok(true)
    }

    /// Adds the undirected edge `(u, v)`, creating either vertex if needed.
    /// Adding an existing edge changes nothing.
    pub fn add_edge(&mut self, u: TerritoryId, v: TerritoryId) -> Result<(), GraphError> {
        if u == v {
            return Err(GraphError::SelfLoop(u));
        }
        self.add_vertex(u)?;
        self.add_vertex(v)?;
        if let Some(set) = self.nbrs[u as usize].as_mut() {
            set.insert(v);
        }
        if let Some(set) = self.nbrs[v as usize].as_mut() {
            set.insert(u);
        }
        Ok(())
    }

    /// Removes the undirected edge `(u, v)` if it exists. Returns whether an
    /// edge was removed.
    pub fn remove_edge(&mut self, u: TerritoryId, v: TerritoryId) -> Result<bool, GraphError> {
        self.check(u)?;
        self.check(v)?;
        if !self.is_edge(u, v) {
            return Ok(false);
        }
        if let Some(set) = self.nbrs[u as usize].as_mut() {
            set.remove(&v)?;
        }
        if let Some(set) = self.nbrs[v as usize].as_mut() {
            set.remove(&u)?;
        }
        Ok(true)
    }

    pub fn is_vertex(&self, id: TerritoryId) -> bool {
        matches!(self.nbrs.get(id as usize), Some(Some(_)))
    }

    /// Returns true iff `(u, v)` is an edge. False when either id is absent.
    pub fn is_edge(&self, u: TerritoryId, v: TerritoryId) -> bool {
        match self.nbrs.get(u as usize) {
            Some(Some(set)) => set.contains(&v),
            _ => false,
        }
    }

    /// The neighbour set of `id`, for cursor-based enumeration.
    pub fn neighbor_set(&self, id: TerritoryId) -> Option<&BucketedSet<TerritoryId>> {
        self.nbrs.get(id as usize).and_then(|slot| slot.as_ref())
    }

    /// Iterates over the neighbours of `id`. Empty for an absent vertex.
    pub fn neighbors(&self, id: TerritoryId) -> impl Iterator<Item = TerritoryId> + '_ {
        self.neighbor_set(id).into_iter().flat_map(|set| set.keys())
    }

    pub fn degree(&self, id: TerritoryId) -> usize {
        self.neighbor_set(id).map_or(0, |set| set.len())
    }

    /// Iterates over every edge once, as `(u, v)` with `u < v`.
    pub fn edges(&self) -> impl Iterator<Item = (TerritoryId, TerritoryId)> + '_ {
        self.nbrs.iter().enumerate().flat_map(|(u, slot)| {
            let u = u as TerritoryId;
            slot.iter()
                .flat_map(|set| set.keys())
                .filter(move |&v| u < v)
                .map(move |v| (u, v))
        })
    }

    /// Number of undirected edges.
    pub fn edge_count(&self) -> usize {
        self.nbrs.iter().flatten().map(|set| set.len()).sum::<usize>() / 2
    }
}
