//! Error types for geometry operations.

use crate::GeometryType;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
  /// A basic type or geometry type string could not be parsed.
  #[error("invalid topology name: {0:?}")]
  InvalidTopologyName(String),

  /// A topology id has bits set outside of its dimension.
  #[error("invalid topology id {id:#b} for dimension {dim}")]
  InvalidTopologyId { dim: u64, id: u64 },

  #[error("no reference element exists for {0}")]
  NoReferenceElement(GeometryType),

  #[error("dimension mismatch in {context}: expected {expected}, found {found}")]
  DimensionMismatch {
    context: &'static str,
    expected: usize,
    found: usize,
  },

  #[error("jacobian is singular")]
  SingularJacobian,

  #[error("newton iteration did not converge after {iterations} iterations (last update norm {update_norm:e})")]
  ConvergenceFailure { iterations: usize, update_norm: f64 },

  #[error("{context} index {index} out of range (bound {bound})")]
  OutOfRangeIndex {
    context: &'static str,
    index: usize,
    bound: usize,
  },
}

impl Error {
  pub(crate) fn out_of_range(context: &'static str, index: usize, bound: usize) -> Self {
    Self::OutOfRangeIndex {
      context,
      index,
      bound,
    }
  }
  pub(crate) fn dimension_mismatch(context: &'static str, expected: usize, found: usize) -> Self {
    Self::DimensionMismatch {
      context,
      expected,
      found,
    }
  }
}
