//! Scalar independent subentity table of a reference element.

use super::cache;
use crate::{topology::Topology, Codim, Dim, GeometryType};

use indexmap::IndexSet;
use itertools::Itertools;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct SubEntity {
  pub geometry_type: GeometryType,
  /// Element corners of this subentity, in the corner order of its own
  /// reference element.
  pub corners: Vec<usize>,
  /// Indexed by absolute codimension `cc`: the element indices of all
  /// codim `cc` subentities in the closure of this subentity, in its local
  /// numbering.
  pub sub_entities: Vec<Vec<usize>>,
}

#[derive(Debug)]
pub struct SubEntityTable {
  entities: Vec<Vec<SubEntity>>,
}

impl SubEntityTable {
  /// The shared table of `geometry_type`.
  pub fn of(geometry_type: GeometryType, topology: &Topology) -> Arc<Self> {
    cache::get_or_build(geometry_type, || Self::new(topology))
  }

  pub fn new(topology: &Topology) -> Self {
    let dim = topology.dim();

    // sorted corner sets identify subentities of a polytope
    let corner_sets: Vec<IndexSet<Vec<usize>>> = (0..=dim)
      .map(|codim| {
        (0..topology.size(codim))
          .map(|i| topology.sub_corners(codim, i).into_iter().sorted().collect())
          .collect()
      })
      .collect();
    debug_assert!((0..=dim).all(|codim| corner_sets[codim].len() == topology.size(codim)));

    let entities = (0..=dim)
      .map(|codim| {
        (0..topology.size(codim))
          .map(|i| {
            let sub = topology.sub_topology(codim, i);
            let corners = topology.sub_corners(codim, i);
            let sub_entities = (0..=dim)
              .map(|cc| {
                if cc < codim {
                  return Vec::new();
                }
                (0..sub.size(cc - codim))
                  .map(|ii| {
                    let key: Vec<usize> = sub
                      .sub_corners(cc - codim, ii)
                      .into_iter()
                      .map(|local| corners[local])
                      .sorted()
                      .collect();
                    corner_sets[cc]
                      .get_index_of(&key)
                      .expect("faces of a subentity are subentities")
                  })
                  .collect()
              })
              .collect();
            SubEntity {
              geometry_type: GeometryType::from_topology(&sub),
              corners,
              sub_entities,
            }
          })
          .collect()
      })
      .collect();

    Self { entities }
  }

  pub fn dim(&self) -> Dim {
    self.entities.len() - 1
  }
  pub fn size(&self, codim: Codim) -> usize {
    self.entities.get(codim).map_or(0, Vec::len)
  }
  pub fn get(&self, codim: Codim, i: usize) -> Option<&SubEntity> {
    self.entities.get(codim)?.get(i)
  }
}
