//! Arbitrary precision floating point expansions.
//!
//! The error free transformations and expansion algorithms follow Jonathan Richard Shewchuk's
//! "Adaptive Precision Floating-Point Arithmetic and Fast Robust Geometric Predicates"
//! (<https://www.cs.cmu.edu/~quake/robust.html>).
//!
//! An [Expansion] represents a real number as an unevaluated sum of `f64` components. The
//! components are non-overlapping and sorted by increasing magnitude; zero components are
//! eliminated. Sums, differences and products of expansions are exact, which makes the sign of
//! an expansion exact as well.
use std::cmp::Ordering;
use std::ops::Neg;

use smallvec::SmallVec;

use super::predicates::bounds;

type Components = SmallVec<[f64; 8]>;

/// An exact, multi-component floating point number.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Expansion {
    components: Components,
}

impl Expansion {
    /// The expansion representing zero.
    pub fn zero() -> Self {
        Self::default()
    }

    /// Creates an expansion holding a single value.
    pub fn from_f64(value: f64) -> Self {
        let mut components = Components::new();
        if value != 0.0 {
            components.push(value);
        }
        Self { components }
    }

    /// The exact sum `a + b`.
    pub fn from_sum(a: f64, b: f64) -> Self {
        let (x, y) = two_sum(a, b);
        Self::from_pair(x, y)
    }

    /// The exact difference `a - b`.
    pub fn from_diff(a: f64, b: f64) -> Self {
        let (x, y) = two_diff(a, b);
        Self::from_pair(x, y)
    }

    /// The exact product `a * b`.
    pub fn from_product(a: f64, b: f64) -> Self {
        let (x, y) = two_product(a, b);
        Self::from_pair(x, y)
    }

    fn from_pair(head: f64, tail: f64) -> Self {
        let mut components = Components::new();
        if tail != 0.0 {
            components.push(tail);
        }
        if head != 0.0 {
            components.push(head);
        }
        Self { components }
    }

    /// Returns the components, least significant first.
    pub fn components(&self) -> &[f64] {
        &self.components
    }

    /// Returns `true` if this expansion represents exactly zero.
    pub fn is_zero(&self) -> bool {
        self.components.iter().all(|c| *c == 0.0)
    }

    /// The exact sum of two expansions.
    pub fn add(&self, other: &Expansion) -> Expansion {
        if self.components.is_empty() {
            return other.clone();
        }
        if other.components.is_empty() {
            return self.clone();
        }
        let mut h = Components::from_elem(0.0, self.components.len() + other.components.len());
        let len = fast_expansion_sum_zeroelim(&self.components, &other.components, &mut h);
        h.truncate(len);
        Self::normalized(h)
    }

    /// The exact difference of two expansions.
    pub fn sub(&self, other: &Expansion) -> Expansion {
        self.add(&other.neg())
    }

    /// The exact product of this expansion and a scalar.
    pub fn scale(&self, factor: f64) -> Expansion {
        if self.components.is_empty() || factor == 0.0 {
            return Expansion::zero();
        }
        let mut h = Components::from_elem(0.0, self.components.len() * 2);
        let len = scale_expansion_zeroelim(&self.components, factor, &mut h);
        h.truncate(len);
        Self::normalized(h)
    }

    /// The exact product of two expansions, evaluated as a sum of scalings.
    pub fn mul(&self, other: &Expansion) -> Expansion {
        other
            .components
            .iter()
            .fold(Expansion::zero(), |acc, component| {
                acc.add(&self.scale(*component))
            })
    }

    /// Divides this expansion by a scalar.
    ///
    /// Division is not closed over floating point expansions. The quotient is refined with the
    /// exactly computed residual `self - quotient * divisor` until the residual vanishes or stops
    /// shrinking, which makes the result accurate to far more than `f64` precision.
    pub fn div(&self, divisor: f64) -> Expansion {
        let mut quotient = Expansion::zero();
        let mut residual = self.clone();
        for _ in 0..4 {
            if residual.is_zero() {
                break;
            }
            let q = residual.estimate() / divisor;
            if q == 0.0 || !q.is_finite() {
                break;
            }
            quotient = quotient.add(&Expansion::from_f64(q));
            residual = residual.sub(&Expansion::from_product(q, divisor));
        }
        quotient
    }

    /// Returns an `f64` approximation of this expansion.
    pub fn estimate(&self) -> f64 {
        estimate(&self.components)
    }

    /// Returns the exact sign of this expansion.
    ///
    /// The components are inspected from the most significant to the least significant one;
    /// the first non-zero component determines the sign.
    pub fn sign(&self) -> Ordering {
        self.components
            .iter()
            .rev()
            .find(|c| **c != 0.0)
            .map(|c| {
                if *c > 0.0 {
                    Ordering::Greater
                } else {
                    Ordering::Less
                }
            })
            .unwrap_or(Ordering::Equal)
    }

    /// Returns a value with the exact sign of this expansion and approximately its magnitude.
    pub(crate) fn signed_estimate(&self) -> f64 {
        match self.sign() {
            Ordering::Equal => 0.0,
            Ordering::Greater => self.estimate().abs().max(f64::MIN_POSITIVE),
            Ordering::Less => -self.estimate().abs().max(f64::MIN_POSITIVE),
        }
    }

    fn normalized(mut components: Components) -> Self {
        components.retain(|c| *c != 0.0);
        Self { components }
    }
}

impl Neg for Expansion {
    type Output = Expansion;

    fn neg(self) -> Expansion {
        (&self).neg()
    }
}

impl Neg for &Expansion {
    type Output = Expansion;

    fn neg(self) -> Expansion {
        Expansion {
            components: self.components.iter().map(|c| -c).collect(),
        }
    }
}

impl From<f64> for Expansion {
    fn from(value: f64) -> Self {
        Expansion::from_f64(value)
    }
}

pub(crate) fn estimate(e: &[f64]) -> f64 {
    e.iter().sum()
}

fn scale_expansion_zeroelim(e: &[f64], b: f64, h: &mut [f64]) -> usize {
    let (bhi, blo) = split(b);
    let (mut q, hh) = two_product_presplit(e[0], b, bhi, blo);
    let mut hindex = 0;
    if hh != 0.0 {
        h[hindex] = hh;
        hindex += 1;
    }
    for &enow in &e[1..] {
        let (product1, product0) = two_product_presplit(enow, b, bhi, blo);
        let (sum, hh) = two_sum(q, product0);
        if hh != 0.0 {
            h[hindex] = hh;
            hindex += 1;
        }
        let (new_q, hh) = fast_two_sum(product1, sum);
        q = new_q;
        if hh != 0.0 {
            h[hindex] = hh;
            hindex += 1;
        }
    }
    if q != 0.0 || hindex == 0 {
        h[hindex] = q;
        hindex += 1;
    }
    hindex
}

fn fast_expansion_sum_zeroelim(e: &[f64], f: &[f64], h: &mut [f64]) -> usize {
    let mut enow = e[0];
    let mut fnow = f[0];
    let mut eindex = 0;
    let mut findex = 0;
    let mut q;
    if (fnow > enow) == (fnow > -enow) {
        q = enow;
        eindex += 1;
    } else {
        q = fnow;
        findex += 1;
    }

    let mut hindex = 0;
    if eindex < e.len() && findex < f.len() {
        enow = e[eindex];
        fnow = f[findex];
        let (q_new, hh) = if (fnow > enow) == (fnow > -enow) {
            eindex += 1;
            fast_two_sum(enow, q)
        } else {
            findex += 1;
            fast_two_sum(fnow, q)
        };
        q = q_new;
        if hh != 0.0 {
            h[hindex] = hh;
            hindex += 1;
        }

        while eindex < e.len() && findex < f.len() {
            enow = e[eindex];
            fnow = f[findex];
            let (q_new, hh) = if (fnow > enow) == (fnow > -enow) {
                eindex += 1;
                two_sum(q, enow)
            } else {
                findex += 1;
                two_sum(q, fnow)
            };
            q = q_new;
            if hh != 0.0 {
                h[hindex] = hh;
                hindex += 1;
            }
        }
    }

    for &enow in &e[eindex..] {
        let (q_new, hh) = two_sum(q, enow);
        q = q_new;
        if hh != 0.0 {
            h[hindex] = hh;
            hindex += 1;
        }
    }

    for &fnow in &f[findex..] {
        let (q_new, hh) = two_sum(q, fnow);
        q = q_new;
        if hh != 0.0 {
            h[hindex] = hh;
            hindex += 1;
        }
    }

    if q != 0.0 || hindex == 0 {
        h[hindex] = q;
        hindex += 1;
    }
    hindex
}

#[inline]
pub(crate) fn two_product(a: f64, b: f64) -> (f64, f64) {
    let x = a * b;
    (x, two_product_tail(a, b, x))
}

#[inline]
fn two_product_tail(a: f64, b: f64, x: f64) -> f64 {
    let (ahi, alo) = split(a);
    let (bhi, blo) = split(b);
    let err1 = x - (ahi * bhi);
    let err2 = err1 - (alo * bhi);
    let err3 = err2 - (ahi * blo);
    (alo * blo) - err3
}

#[inline]
fn split(a: f64) -> (f64, f64) {
    let c = bounds().splitter * a;
    let abig = c - a;
    let ahi = c - abig;
    let alo = a - ahi;
    (ahi, alo)
}

#[inline]
fn two_product_presplit(a: f64, b: f64, bhi: f64, blo: f64) -> (f64, f64) {
    let x = a * b;
    let (ahi, alo) = split(a);
    let err1 = x - ahi * bhi;
    let err2 = err1 - alo * bhi;
    let err3 = err2 - ahi * blo;
    let y = alo * blo - err3;
    (x, y)
}

#[inline]
pub(crate) fn two_diff(a: f64, b: f64) -> (f64, f64) {
    let x = a - b;
    (x, two_diff_tail(a, b, x))
}

#[inline]
pub(crate) fn two_diff_tail(a: f64, b: f64, x: f64) -> f64 {
    let bvirt = a - x;
    let avirt = x + bvirt;
    let bround = bvirt - b;
    let around = a - avirt;
    around + bround
}

#[inline]
pub(crate) fn two_sum(a: f64, b: f64) -> (f64, f64) {
    let x = a + b;
    (x, two_sum_tail(a, b, x))
}

#[inline]
fn two_sum_tail(a: f64, b: f64, x: f64) -> f64 {
    let bvirt = x - a;
    let avirt = x - bvirt;
    let bround = b - bvirt;
    let around = a - avirt;
    around + bround
}

#[inline]
fn fast_two_sum(a: f64, b: f64) -> (f64, f64) {
    let x = a + b;
    let bvirt = x - a;
    (x, b - bvirt)
}

#[cfg(test)]
mod test {
    use super::Expansion;
    use std::cmp::Ordering;

    #[test]
    fn test_two_term_constructors_are_exact() {
        let sum = Expansion::from_sum(1.0, 1e-30);
        assert_eq!(sum.components(), &[1e-30, 1.0]);
        assert_eq!(sum.sign(), Ordering::Greater);

        let diff = Expansion::from_diff(1e-30, 1.0);
        assert_eq!(diff.sign(), Ordering::Less);

        let product = Expansion::from_product(1.0 + f64::EPSILON, 1.0 + f64::EPSILON);
        assert_eq!(product.components().len(), 2);
        assert_eq!(product.components()[0], f64::EPSILON * f64::EPSILON);
    }

    #[test]
    fn test_cancellation() {
        // (1 + 2^-60) - 1 - 2^-60 == 0, which plain f64 arithmetic cannot represent.
        let tiny = 2f64.powi(-60);
        let a = Expansion::from_sum(1.0, tiny);
        let b = a.sub(&Expansion::from_f64(1.0));
        assert_eq!(b.components(), &[tiny]);
        assert!(b.sub(&Expansion::from_f64(tiny)).is_zero());
        assert_eq!(b.sub(&Expansion::from_f64(tiny)).sign(), Ordering::Equal);
    }

    #[test]
    fn test_scale_and_mul() {
        let a = Expansion::from_sum(3.0, 2f64.powi(-70));
        let scaled = a.scale(-2.0);
        assert_eq!(scaled.sign(), Ordering::Less);
        assert_eq!(scaled.estimate(), -6.0);
        assert_eq!(a.scale(0.0), Expansion::zero());

        // (3 + e)^2 - 9 - 6e == e^2 > 0
        let e = 2f64.powi(-70);
        let square = a.mul(&a);
        let rest = square
            .sub(&Expansion::from_f64(9.0))
            .sub(&Expansion::from_product(6.0, e));
        assert_eq!(rest.sign(), Ordering::Greater);
        assert_eq!(rest.estimate(), e * e);
    }

    #[test]
    fn test_neg() {
        let a = Expansion::from_sum(5.0, 1e-20);
        let negated = -&a;
        assert_eq!(negated.sign(), Ordering::Less);
        assert!(a.add(&negated).is_zero());
    }

    #[test]
    fn test_div() {
        let a = Expansion::from_f64(1.0);
        let third = a.div(3.0);
        let back = third.scale(3.0).sub(&a);
        assert!(back.estimate().abs() < 1e-30);
        assert_eq!(Expansion::zero().div(7.0), Expansion::zero());
    }
}
