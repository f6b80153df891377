//! Transfer matrix between the light and the first chain vertex.

use caustica_math::{make_orthonormals, mat22_inverse, mat22_project, normalize_len, Mat22, Point3};
use caustica_shading::LightSample;

use crate::constants::{MAX_CAUSTIC_CASTERS, MIN_DETERMINANT};
use crate::constraint::shading_frame;
use crate::vertex::ManifoldVertex;

/// Change-of-variable terms of a solved chain.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransferTerms {
    /// `|det(dx1/dx_light)|`, with the light parameterized by area for
    /// positional lights and by solid angle for fixed directions.
    pub dx1_dxlight: f64,
    /// `|det(dC/dx)|` of the whole constraint Jacobian.
    pub dh_dx: f64,
}

/// Propagate a displacement of the light sample back to the first vertex.
///
/// Expects the blocks of `chain` to be up to date and `ls` to have been
/// updated to the last vertex. The light is moved along the tangent plane
/// of its normal. Returns `None` when a pivot is singular or the light is
/// seen edge-on.
pub fn compute_transfer_matrix(
    chain: &[ManifoldVertex],
    surface: &Point3,
    ls: &LightSample,
) -> Option<TransferTerms> {
    let count = chain.len();
    if count == 0 || count > MAX_CAUSTIC_CASTERS {
        return None;
    }

    // Simplified block LU: only the inverse of the last pivot and the
    // upper factors are needed to walk back to the first vertex.
    let mut u = [Mat22::zeros(); MAX_CAUSTIC_CASTERS];
    let (mut li, det) = mat22_inverse(&chain[0].b, MIN_DETERMINANT)?;
    let mut det_dh_dx = det;
    for k in 1..count {
        u[k - 1] = li * chain[k - 1].c;
        let lk = chain[k].b - chain[k].a * u[k - 1];
        let (inv, det) = mat22_inverse(&lk, MIN_DETERMINANT)?;
        li = inv;
        det_dh_dx *= det;
    }

    let mv = &chain[count - 1];
    let prev_p = if count == 1 { *surface } else { chain[count - 2].p };
    let (wi, _) = normalize_len(&(prev_p - mv.p));
    let eta = if wi.dot(&mv.ng) < 0.0 { 1.0 / mv.eta } else { mv.eta };
    let (s, t, _) = shading_frame(mv);

    let (light_du, light_dv) = make_orthonormals(&ls.ng);

    let (wo, ilo, dxn_dwn) = if ls.fixed_direction {
        (ls.d, 1.0, 1.0)
    } else {
        let (wo, len) = normalize_len(&(ls.p - mv.p));
        let cos_light = ls.ng.dot(&wo).abs();
        if len <= 0.0 || cos_light <= 0.0 {
            return None;
        }
        (wo, 1.0 / len, len * len / cos_light)
    };

    let (h, len_h) = normalize_len(&-(wi + eta * wo));
    if len_h <= 0.0 {
        return None;
    }
    let ilo = ilo * eta / len_h;

    let mut dh_du = (light_du - wo * wo.dot(&light_du)) * ilo;
    let mut dh_dv = (light_dv - wo * wo.dot(&light_dv)) * ilo;
    dh_du = -(dh_du - h * dh_du.dot(&h));
    dh_dv = -(dh_dv - h * dh_dv.dot(&h));
    let dc_dlight = mat22_project(&dh_du, &dh_dv, &s, &t);

    let mut tp = -(li * dc_dlight);
    for k in (0..count - 1).rev() {
        tp = -(u[k] * tp);
    }

    Some(TransferTerms {
        dx1_dxlight: tp.determinant().abs() * dxn_dwn,
        dh_dx: det_dh_dx.abs(),
    })
}
