use crate::Scalar;

pub type Coord<T> = na::DVector<T>;
pub type CoordRef<'a, T> = na::DVectorView<'a, T>;
pub type Matrix<T> = na::DMatrix<T>;

/// Relative singular value threshold (in machine epsilons) below which a
/// Jacobian is treated as rank deficient.
pub const SINGULAR_TOLERANCE_FACTOR: f64 = 64.0;

pub trait DMatrixExt<T> {
  fn gramian(&self) -> Self;
  fn gram_det(&self) -> T;
  fn gram_det_sqrt(&self) -> T;
}
impl<T: Scalar> DMatrixExt<T> for Matrix<T> {
  /// Gram matrix of the column vectors.
  fn gramian(&self) -> Self {
    self.transpose() * self
  }
  fn gram_det(&self) -> T {
    self.gramian().determinant()
  }
  fn gram_det_sqrt(&self) -> T {
    self.gram_det().max(T::zero()).sqrt()
  }
}

/// Integration element and (pseudo-)inverse of a Jacobian transposed.
#[derive(Debug, Clone)]
pub struct InvertedJacobian<T: Scalar> {
  pub integration_element: T,
  /// `None` if the Jacobian is rank deficient.
  pub inverse_transposed: Option<Matrix<T>>,
}

/// Ratio between the physical and the reference measure of a map with
/// Jacobian transposed `jt` (`dim_local x dim_global`, `dim_local <= dim_global`).
pub fn integration_element<T: Scalar>(jt: &Matrix<T>) -> T {
  let (dim_local, dim_global) = jt.shape();
  if dim_local == 0 {
    T::one()
  } else if dim_local == dim_global {
    jt.determinant().abs()
  } else {
    jt.transpose().gram_det_sqrt()
  }
}

/// Inverts the Jacobian transposed `jt` (`dim_local x dim_global`).
///
/// For `dim_local < dim_global` the inverse transposed is the Moore-Penrose
/// pseudo-inverse, so applying it yields least-squares solutions.
pub fn invert_jacobian_transposed<T: Scalar>(jt: &Matrix<T>) -> InvertedJacobian<T> {
  let (dim_local, dim_global) = jt.shape();
  if dim_local == 0 {
    return InvertedJacobian {
      integration_element: T::one(),
      inverse_transposed: Some(Matrix::zeros(dim_global, 0)),
    };
  }
  if dim_local > dim_global {
    return InvertedJacobian {
      integration_element: T::zero(),
      inverse_transposed: None,
    };
  }

  let integration_element = integration_element(jt);
  let svd = jt.clone().svd(true, true);
  let smax = svd.singular_values.max();
  let smin = svd.singular_values.min();
  let tolerance = T::lit(SINGULAR_TOLERANCE_FACTOR) * T::machine_epsilon() * smax;
  let inverse_transposed = if smax > T::zero() && smin > tolerance {
    svd.pseudo_inverse(tolerance).ok()
  } else {
    None
  };

  InvertedJacobian {
    integration_element,
    inverse_transposed,
  }
}

/// Vector orthogonal to the rows of `jt` (`dim - 1 x dim`) whose length is the
/// `dim - 1` dimensional volume spanned by them.
pub fn generalized_cross<T: Scalar>(jt: &Matrix<T>) -> Coord<T> {
  let dim = jt.ncols();
  assert_eq!(jt.nrows() + 1, dim, "need dim - 1 row vectors");
  if dim == 1 {
    return Coord::from_element(1, T::one());
  }
  Coord::from_fn(dim, |k, _| {
    let minor = jt.clone().remove_column(k).determinant();
    if k % 2 == 0 {
      minor
    } else {
      -minor
    }
  })
}

#[cfg(test)]
mod test {
  use super::*;

  use approx::assert_relative_eq;

  #[test]
  fn square_inverse() {
    let jt = Matrix::from_row_slice(2, 2, &[2.0, 1.0, 0.0, 3.0]);
    let inv = invert_jacobian_transposed(&jt);
    assert_relative_eq!(inv.integration_element, 6.0);
    let jit = inv.inverse_transposed.unwrap();
    assert_relative_eq!(&jt * &jit, Matrix::identity(2, 2), epsilon = 1e-14);
  }

  #[test]
  fn embedded_least_squares() {
    // unit square lying in the plane z = 1
    let jt = Matrix::from_row_slice(2, 3, &[1.0, 0.0, 0.0, 0.0, 1.0, 0.0]);
    let inv = invert_jacobian_transposed(&jt);
    assert_relative_eq!(inv.integration_element, 1.0);
    let jit = inv.inverse_transposed.unwrap();
    let local = jit.tr_mul(&Coord::from_vec(vec![0.25, 0.5, 7.0]));
    assert_relative_eq!(local, Coord::from_vec(vec![0.25, 0.5]), epsilon = 1e-14);
  }

  #[test]
  fn singular() {
    let jt = Matrix::from_row_slice(2, 2, &[1.0, 2.0, 2.0, 4.0]);
    let inv = invert_jacobian_transposed(&jt);
    assert!(inv.inverse_transposed.is_none());
    assert_relative_eq!(inv.integration_element, 0.0, epsilon = 1e-14);
    assert!(invert_jacobian_transposed(&Matrix::<f64>::zeros(1, 2))
      .inverse_transposed
      .is_none());
  }

  #[test]
  fn cross_lengths() {
    let jt = Matrix::from_row_slice(2, 3, &[1.0, 0.0, 0.0, 0.0, 2.0, 0.0]);
    let n = generalized_cross(&jt);
    assert_relative_eq!(n.norm(), 2.0);
    assert_relative_eq!((&jt * &n).norm(), 0.0);
  }
}
