//! Level-1 vector operations on owned-length slices.
//!
//! [`dot`] and [`norm2`] reduce across ranks and are collectives; the rest
//! are purely local.

use conduction_core::{CommError, Communicator, ReduceOp};

/// Global dot product `x · y`.
pub fn dot(comm: &dyn Communicator, x: &[f64], y: &[f64]) -> Result<f64, CommError> {
    comm.all_reduce_scalar(local_dot(x, y), ReduceOp::Sum)
}

/// Global Euclidean norm.
pub fn norm2(comm: &dyn Communicator, x: &[f64]) -> Result<f64, CommError> {
    Ok(dot(comm, x, x)?.sqrt())
}

/// Dot product of this rank's entries only.
#[inline]
pub fn local_dot(x: &[f64], y: &[f64]) -> f64 {
    debug_assert_eq!(x.len(), y.len());
    x.iter().zip(y).map(|(&a, &b)| a * b).sum()
}

/// `y = alpha * x + y`
#[inline]
pub fn axpy(alpha: f64, x: &[f64], y: &mut [f64]) {
    debug_assert_eq!(x.len(), y.len());
    for (yi, &xi) in y.iter_mut().zip(x) {
        *yi += alpha * xi;
    }
}

/// `y = x + alpha * y`
#[inline]
pub fn xpay(x: &[f64], alpha: f64, y: &mut [f64]) {
    debug_assert_eq!(x.len(), y.len());
    for (yi, &xi) in y.iter_mut().zip(x) {
        *yi = xi + alpha * *yi;
    }
}

/// `z = x - y`
#[inline]
pub fn sub(x: &[f64], y: &[f64], z: &mut [f64]) {
    debug_assert_eq!(x.len(), y.len());
    debug_assert_eq!(x.len(), z.len());
    for ((zi, &xi), &yi) in z.iter_mut().zip(x).zip(y) {
        *zi = xi - yi;
    }
}

/// `z = x ⊙ y` (elementwise product)
#[inline]
pub fn hadamard(x: &[f64], y: &[f64], z: &mut [f64]) {
    debug_assert_eq!(x.len(), y.len());
    debug_assert_eq!(x.len(), z.len());
    for ((zi, &xi), &yi) in z.iter_mut().zip(x).zip(y) {
        *zi = xi * yi;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use conduction_comm::{run_threaded, SerialComm};
    use proptest::prelude::*;

    #[test]
    fn local_kernels() {
        let x = [1.0, 2.0, 3.0];
        let mut y = [4.0, 5.0, 6.0];
        assert_eq!(local_dot(&x, &y), 32.0);
        axpy(2.0, &x, &mut y);
        assert_eq!(y, [6.0, 9.0, 12.0]);
        xpay(&x, 0.5, &mut y);
        assert_eq!(y, [4.0, 6.5, 9.0]);
        let mut z = [0.0; 3];
        sub(&y, &x, &mut z);
        assert_eq!(z, [3.0, 4.5, 6.0]);
        hadamard(&x, &x, &mut z);
        assert_eq!(z, [1.0, 4.0, 9.0]);
    }

    #[test]
    fn serial_norm() {
        assert_eq!(norm2(&SerialComm, &[3.0, 4.0]).unwrap(), 5.0);
    }

    proptest! {
        #[test]
        fn split_dot_equals_whole(v in prop::collection::vec(-100.0f64..100.0, 4..40)) {
            let whole = local_dot(&v, &v);
            let mid = v.len() / 2;
            let parts = run_threaded(2, |comm| {
                let part = if comm.rank() == 0 { &v[..mid] } else { &v[mid..] };
                dot(&comm, part, part).unwrap()
            });
            for p in parts {
                prop_assert!((p - whole).abs() <= 1e-9 * whole.max(1.0));
            }
        }
    }
}
