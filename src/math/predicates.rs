//! Adaptive and exact geometric predicates.
//!
//! The orientation test first evaluates the determinant in plain double precision and checks
//! it against a conservative error bound. Only if the sign cannot be certified, more precise
//! stages are used, ending with an exact evaluation based on [Expansion]s. The returned sign is
//! therefore always correct.
use std::sync::OnceLock;

use super::expansion::{two_diff_tail, Expansion};
use crate::Point2;

/// Machine epsilon and the derived error bounds of the predicates.
///
/// These values are computed once, on first use, the same way Shewchuk's `exactinit` does.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PredicateBounds {
    /// The largest power of two such that `1.0 + epsilon == 1.0` (after rounding).
    pub epsilon: f64,
    /// Used to split a double into two half-length significands for exact multiplication.
    pub splitter: f64,
    pub(crate) result_errbound: f64,
    pub(crate) ccw_errbound_a: f64,
    pub(crate) ccw_errbound_b: f64,
    pub(crate) ccw_errbound_c: f64,
    pub(crate) icc_errbound_a: f64,
}

impl PredicateBounds {
    fn compute() -> Self {
        let mut every_other = true;
        let mut epsilon = 1.0f64;
        let mut splitter = 1.0f64;
        let mut check = 1.0f64;
        loop {
            let last_check = check;
            epsilon *= 0.5;
            if every_other {
                splitter *= 2.0;
            }
            every_other = !every_other;
            check = 1.0 + epsilon;
            if check == 1.0 || check == last_check {
                break;
            }
        }
        splitter += 1.0;

        Self {
            epsilon,
            splitter,
            result_errbound: (3.0 + 8.0 * epsilon) * epsilon,
            ccw_errbound_a: (3.0 + 16.0 * epsilon) * epsilon,
            ccw_errbound_b: (2.0 + 12.0 * epsilon) * epsilon,
            ccw_errbound_c: (9.0 + 64.0 * epsilon) * epsilon * epsilon,
            icc_errbound_a: (10.0 + 96.0 * epsilon) * epsilon,
        }
    }
}

/// Returns the process wide predicate bounds.
pub fn bounds() -> &'static PredicateBounds {
    static BOUNDS: OnceLock<PredicateBounds> = OnceLock::new();
    BOUNDS.get_or_init(PredicateBounds::compute)
}

/// Returns a value whose sign equals the sign of twice the signed area of the triangle
/// `(pa, pb, pc)`.
///
/// The result is positive if the points are ordered counterclockwise, negative if they are
/// ordered clockwise and zero if they are collinear. The sign is exact for all finite inputs.
pub fn orient2d(pa: Point2<f64>, pb: Point2<f64>, pc: Point2<f64>) -> f64 {
    let detleft = (pa.x - pc.x) * (pb.y - pc.y);
    let detright = (pa.y - pc.y) * (pb.x - pc.x);
    let det = detleft - detright;

    let detsum = if detleft > 0.0 {
        if detright <= 0.0 {
            return det;
        } else {
            detleft + detright
        }
    } else if detleft < 0.0 {
        if detright >= 0.0 {
            return det;
        } else {
            -detleft - detright
        }
    } else {
        return det;
    };
    let errbound = bounds().ccw_errbound_a * detsum;
    if det >= errbound || -det >= errbound {
        det
    } else {
        orient2d_adapt(pa, pb, pc, detsum)
    }
}

fn orient2d_adapt(pa: Point2<f64>, pb: Point2<f64>, pc: Point2<f64>, detsum: f64) -> f64 {
    let bounds = bounds();
    let acx = pa.x - pc.x;
    let bcx = pb.x - pc.x;
    let acy = pa.y - pc.y;
    let bcy = pb.y - pc.y;

    let b = Expansion::from_product(acx, bcy).sub(&Expansion::from_product(acy, bcx));
    let mut det = b.estimate();
    let errbound = bounds.ccw_errbound_b * detsum;
    if det >= errbound || -det >= errbound {
        return det;
    }

    let acxtail = two_diff_tail(pa.x, pc.x, acx);
    let bcxtail = two_diff_tail(pb.x, pc.x, bcx);
    let acytail = two_diff_tail(pa.y, pc.y, acy);
    let bcytail = two_diff_tail(pb.y, pc.y, bcy);

    if acxtail == 0.0 && acytail == 0.0 && bcxtail == 0.0 && bcytail == 0.0 {
        // The differences were computed exactly, hence b is the exact determinant.
        return b.signed_estimate();
    }

    let errbound = bounds.ccw_errbound_c * detsum + bounds.result_errbound * det.abs();
    det += (acx * bcytail + bcy * acxtail) - (acy * bcxtail + bcx * acytail);
    if det >= errbound || -det >= errbound {
        return det;
    }

    orient2d_exact(pa, pb, pc)
}

fn orient2d_exact(pa: Point2<f64>, pb: Point2<f64>, pc: Point2<f64>) -> f64 {
    let acx = Expansion::from_diff(pa.x, pc.x);
    let bcx = Expansion::from_diff(pb.x, pc.x);
    let acy = Expansion::from_diff(pa.y, pc.y);
    let bcy = Expansion::from_diff(pb.y, pc.y);

    acx.mul(&bcy).sub(&acy.mul(&bcx)).signed_estimate()
}

/// Returns a positive value if `pd` lies inside the circle through `pa`, `pb` and `pc`, a
/// negative value if it lies outside and zero if all four points are cocircular.
///
/// `pa`, `pb` and `pc` must be ordered counterclockwise. The sign is exact for all finite
/// inputs.
pub fn incircle(pa: Point2<f64>, pb: Point2<f64>, pc: Point2<f64>, pd: Point2<f64>) -> f64 {
    let adx = pa.x - pd.x;
    let bdx = pb.x - pd.x;
    let cdx = pc.x - pd.x;
    let ady = pa.y - pd.y;
    let bdy = pb.y - pd.y;
    let cdy = pc.y - pd.y;

    let bdxcdy = bdx * cdy;
    let cdxbdy = cdx * bdy;
    let alift = adx * adx + ady * ady;

    let cdxady = cdx * ady;
    let adxcdy = adx * cdy;
    let blift = bdx * bdx + bdy * bdy;

    let adxbdy = adx * bdy;
    let bdxady = bdx * ady;
    let clift = cdx * cdx + cdy * cdy;

    let det = alift * (bdxcdy - cdxbdy) + blift * (cdxady - adxcdy) + clift * (adxbdy - bdxady);

    let permanent = (bdxcdy.abs() + cdxbdy.abs()) * alift
        + (cdxady.abs() + adxcdy.abs()) * blift
        + (adxbdy.abs() + bdxady.abs()) * clift;
    let errbound = bounds().icc_errbound_a * permanent;
    if det > errbound || -det > errbound {
        return det;
    }
    incircle_exact(pa, pb, pc, pd)
}

fn incircle_exact(pa: Point2<f64>, pb: Point2<f64>, pc: Point2<f64>, pd: Point2<f64>) -> f64 {
    let adx = Expansion::from_diff(pa.x, pd.x);
    let bdx = Expansion::from_diff(pb.x, pd.x);
    let cdx = Expansion::from_diff(pc.x, pd.x);
    let ady = Expansion::from_diff(pa.y, pd.y);
    let bdy = Expansion::from_diff(pb.y, pd.y);
    let cdy = Expansion::from_diff(pc.y, pd.y);

    let lift = |dx: &Expansion, dy: &Expansion| dx.mul(dx).add(&dy.mul(dy));
    let cross = |x0: &Expansion, y1: &Expansion, x1: &Expansion, y0: &Expansion| {
        x0.mul(y1).sub(&x1.mul(y0))
    };

    let bc = cross(&bdx, &cdy, &cdx, &bdy);
    let ca = cross(&cdx, &ady, &adx, &cdy);
    let ab = cross(&adx, &bdy, &bdx, &ady);

    lift(&adx, &ady)
        .mul(&bc)
        .add(&lift(&bdx, &bdy).mul(&ca))
        .add(&lift(&cdx, &cdy).mul(&ab))
        .signed_estimate()
}
