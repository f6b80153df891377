//! Block-tridiagonal solve of the Newton step.

use caustica_math::{mat22_inverse, Mat22, Vec2};

use crate::constants::{MAX_CAUSTIC_CASTERS, MIN_DETERMINANT};
use crate::vertex::ManifoldVertex;

/// One tangent-space displacement per chain vertex.
pub type Displacements = [Vec2; MAX_CAUSTIC_CASTERS];

/// Solve `J dx = C` where `J` has `a`, `b`, `c` on its sub-, main and
/// super-diagonal and `C` stacks the vertex constraints.
///
/// Block-LU forward elimination followed by back-substitution. Returns
/// `None` for an empty chain or when a pivot block is singular.
pub fn solve_block_tridiagonal(chain: &[ManifoldVertex]) -> Option<Displacements> {
    let count = chain.len();
    if count == 0 || count > MAX_CAUSTIC_CASTERS {
        return None;
    }

    let mut li = [Mat22::zeros(); MAX_CAUSTIC_CASTERS];
    let mut rhs = [Vec2::zeros(); MAX_CAUSTIC_CASTERS];

    li[0] = mat22_inverse(&chain[0].b, MIN_DETERMINANT)?.0;
    rhs[0] = chain[0].constraint;
    for k in 1..count {
        let a = chain[k].a * li[k - 1];
        let lk = chain[k].b - a * chain[k - 1].c;
        li[k] = mat22_inverse(&lk, MIN_DETERMINANT)?.0;
        rhs[k] = chain[k].constraint - a * rhs[k - 1];
    }

    let mut dx = [Vec2::zeros(); MAX_CAUSTIC_CASTERS];
    dx[count - 1] = li[count - 1] * rhs[count - 1];
    for k in (0..count - 1).rev() {
        dx[k] = li[k] * (rhs[k] - chain[k].c * dx[k + 1]);
    }
    Some(dx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn random_block(rng: &mut StdRng, scale: f64) -> Mat22 {
        Mat22::new(
            rng.gen_range(-scale..scale),
            rng.gen_range(-scale..scale),
            rng.gen_range(-scale..scale),
            rng.gen_range(-scale..scale),
        )
    }

    #[test]
    fn test_identity_returns_constraint() {
        let mut chain = vec![ManifoldVertex::empty(); 3];
        for (i, v) in chain.iter_mut().enumerate() {
            v.constraint = Vec2::new(i as f64, -0.5 * i as f64);
        }
        let dx = solve_block_tridiagonal(&chain).unwrap();
        for (i, v) in chain.iter().enumerate() {
            assert_eq!(dx[i], v.constraint);
        }
    }

    #[test]
    fn test_singular_pivot_fails() {
        let mut chain = vec![ManifoldVertex::empty()];
        chain[0].b = Mat22::new(1.0, 2.0, 2.0, 4.0);
        assert!(solve_block_tridiagonal(&chain).is_none());
        assert!(solve_block_tridiagonal(&[]).is_none());
    }

    #[test]
    fn test_solution_satisfies_system() {
        let mut rng = StdRng::seed_from_u64(7);
        for count in 1..=MAX_CAUSTIC_CASTERS {
            let mut chain = vec![ManifoldVertex::empty(); count];
            for v in chain.iter_mut() {
                // Diagonally dominant blocks keep every pivot invertible.
                v.a = random_block(&mut rng, 0.2);
                v.b = Mat22::identity() * 2.0 + random_block(&mut rng, 0.3);
                v.c = random_block(&mut rng, 0.2);
                v.constraint = Vec2::new(rng.gen_range(-1.0..1.0), rng.gen_range(-1.0..1.0));
            }
            let dx = solve_block_tridiagonal(&chain).unwrap();
            for k in 0..count {
                let mut row = chain[k].b * dx[k];
                if k > 0 {
                    row += chain[k].a * dx[k - 1];
                }
                if k + 1 < count {
                    row += chain[k].c * dx[k + 1];
                }
                assert_abs_diff_eq!(row, chain[k].constraint, epsilon = 1e-10);
            }
        }
    }
}
