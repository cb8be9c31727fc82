//! Rational functions over named parameters.
//!
//! The value type of parametric models. A [`RationalFunction`] is a
//! fraction of multivariate polynomials with exact `Rational64`
//! coefficients; undefined `double` constants of a program become its
//! parameters. Only the ring operations needed during model construction
//! are provided, plus division with an explicit zero check.

use num_rational::Rational64;
use num_traits::{One, Signed, Zero};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::ops::{Add, Mul, Neg, Sub};

/// Parameter name to exponent, e.g. `p^2 * q` is `{p: 2, q: 1}`.
type Monomial = BTreeMap<String, u32>;

/// A polynomial as a map from monomial to coefficient. Zero coefficients
/// are never stored.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Polynomial {
    terms: BTreeMap<Monomial, Rational64>,
}

impl Polynomial {
    fn zero() -> Self {
        Self {
            terms: BTreeMap::new(),
        }
    }

    fn constant(value: Rational64) -> Self {
        let mut terms = BTreeMap::new();
        if !value.is_zero() {
            terms.insert(Monomial::new(), value);
        }
        Self { terms }
    }

    fn variable(name: &str) -> Self {
        let mut monomial = Monomial::new();
        monomial.insert(name.to_string(), 1);
        let mut terms = BTreeMap::new();
        terms.insert(monomial, Rational64::one());
        Self { terms }
    }

    fn is_zero(&self) -> bool {
        self.terms.is_empty()
    }

    /// The value of a constant polynomial, `None` if any parameter occurs.
    fn constant_value(&self) -> Option<Rational64> {
        match self.terms.len() {
            0 => Some(Rational64::zero()),
            1 => {
                let (monomial, coeff) = self.terms.iter().next()?;
                monomial.is_empty().then(|| *coeff)
            }
            _ => None,
        }
    }

    fn add(&self, other: &Self) -> Self {
        let mut terms = self.terms.clone();
        for (monomial, coeff) in &other.terms {
            let entry = terms.entry(monomial.clone()).or_insert_with(Rational64::zero);
            *entry += coeff;
            if entry.is_zero() {
                terms.remove(monomial);
            }
        }
        Self { terms }
    }

    fn neg(&self) -> Self {
        Self {
            terms: self
                .terms
                .iter()
                .map(|(m, c)| (m.clone(), -c))
                .collect(),
        }
    }

    fn mul(&self, other: &Self) -> Self {
        let mut terms: BTreeMap<Monomial, Rational64> = BTreeMap::new();
        for (m1, c1) in &self.terms {
            for (m2, c2) in &other.terms {
                let mut monomial = m1.clone();
                for (name, exp) in m2 {
                    *monomial.entry(name.clone()).or_insert(0) += exp;
                }
                let entry = terms.entry(monomial.clone()).or_insert_with(Rational64::zero);
                *entry += c1 * c2;
                if entry.is_zero() {
                    terms.remove(&monomial);
                }
            }
        }
        Self { terms }
    }

    fn scale(&self, factor: Rational64) -> Self {
        if factor.is_zero() {
            return Self::zero();
        }
        Self {
            terms: self
                .terms
                .iter()
                .map(|(m, c)| (m.clone(), c * factor))
                .collect(),
        }
    }

    fn collect_parameters(&self, out: &mut BTreeSet<String>) {
        for monomial in self.terms.keys() {
            for name in monomial.keys() {
                out.insert(name.clone());
            }
        }
    }
}

impl fmt::Display for Polynomial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.terms.is_empty() {
            return write!(f, "0");
        }
        for (i, (monomial, coeff)) in self.terms.iter().enumerate() {
            let coeff = if i == 0 {
                write!(f, "{}", if coeff.is_negative() { "-" } else { "" })?;
                coeff.abs()
            } else {
                write!(f, "{}", if coeff.is_negative() { " - " } else { " + " })?;
                coeff.abs()
            };
            if monomial.is_empty() {
                write!(f, "{coeff}")?;
                continue;
            }
            if !coeff.is_one() {
                write!(f, "{coeff}*")?;
            }
            for (j, (name, exp)) in monomial.iter().enumerate() {
                if j > 0 {
                    write!(f, "*")?;
                }
                if *exp == 1 {
                    write!(f, "{name}")?;
                } else {
                    write!(f, "{name}^{exp}")?;
                }
            }
        }
        Ok(())
    }
}

/// A fraction of two polynomials.
///
/// Fractions with a constant denominator are normalized to denominator 1,
/// so fully numeric arithmetic stays in canonical form. No multivariate
/// gcd is attempted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RationalFunction {
    numerator: Polynomial,
    denominator: Polynomial,
}

impl RationalFunction {
    fn new(numerator: Polynomial, denominator: Polynomial) -> Self {
        let mut result = Self {
            numerator,
            denominator,
        };
        result.normalize();
        result
    }

    fn normalize(&mut self) {
        if self.numerator.is_zero() {
            self.denominator = Polynomial::constant(Rational64::one());
            return;
        }
        if let Some(value) = self.denominator.constant_value() {
            if !value.is_zero() {
                self.numerator = self.numerator.scale(value.recip());
                self.denominator = Polynomial::constant(Rational64::one());
            }
        }
    }

    pub fn from_rational(value: Rational64) -> Self {
        Self {
            numerator: Polynomial::constant(value),
            denominator: Polynomial::constant(Rational64::one()),
        }
    }

    pub fn from_integer(value: i64) -> Self {
        Self::from_rational(Rational64::from_integer(value))
    }

    /// Exact rational reconstruction of a float literal; `None` for NaN or
    /// infinities.
    pub fn from_f64(value: f64) -> Option<Self> {
        Rational64::approximate_float(value).map(Self::from_rational)
    }

    /// The function consisting of the single parameter `name`.
    pub fn parameter(name: &str) -> Self {
        Self {
            numerator: Polynomial::variable(name),
            denominator: Polynomial::constant(Rational64::one()),
        }
    }

    /// All parameters occurring in numerator or denominator.
    pub fn parameters(&self) -> BTreeSet<String> {
        let mut out = BTreeSet::new();
        self.numerator.collect_parameters(&mut out);
        self.denominator.collect_parameters(&mut out);
        out
    }

    pub fn is_constant(&self) -> bool {
        self.parameters().is_empty()
    }

    /// The exact value of a parameter-free function.
    pub fn constant_value(&self) -> Option<Rational64> {
        let num = self.numerator.constant_value()?;
        let den = self.denominator.constant_value()?;
        (!den.is_zero()).then(|| num / den)
    }

    /// `self / rhs`, `None` when `rhs` is zero.
    pub fn checked_div(&self, rhs: &Self) -> Option<Self> {
        if rhs.is_zero() {
            return None;
        }
        Some(Self::new(
            self.numerator.mul(&rhs.denominator),
            self.denominator.mul(&rhs.numerator),
        ))
    }
}

impl Add for RationalFunction {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        if self.denominator == rhs.denominator {
            return Self::new(self.numerator.add(&rhs.numerator), self.denominator);
        }
        Self::new(
            self.numerator
                .mul(&rhs.denominator)
                .add(&rhs.numerator.mul(&self.denominator)),
            self.denominator.mul(&rhs.denominator),
        )
    }
}

impl Sub for RationalFunction {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        self + (-rhs)
    }
}

impl Neg for RationalFunction {
    type Output = Self;

    fn neg(self) -> Self {
        Self {
            numerator: self.numerator.neg(),
            denominator: self.denominator,
        }
    }
}

impl Mul for RationalFunction {
    type Output = Self;

    fn mul(self, rhs: Self) -> Self {
        Self::new(
            self.numerator.mul(&rhs.numerator),
            self.denominator.mul(&rhs.denominator),
        )
    }
}

impl Zero for RationalFunction {
    fn zero() -> Self {
        Self::from_rational(Rational64::zero())
    }

    fn is_zero(&self) -> bool {
        self.numerator.is_zero()
    }
}

impl One for RationalFunction {
    fn one() -> Self {
        Self::from_rational(Rational64::one())
    }
}

impl fmt::Display for RationalFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.denominator.constant_value() == Some(Rational64::one()) {
            write!(f, "{}", self.numerator)
        } else {
            write!(f, "({})/({})", self.numerator, self.denominator)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rat(n: i64, d: i64) -> RationalFunction {
        RationalFunction::from_rational(Rational64::new(n, d))
    }

    #[test]
    fn test_constant_arithmetic_is_exact() {
        let half = rat(1, 2);
        let third = rat(1, 3);
        let sum = half.clone() + third;
        assert_eq!(sum.constant_value(), Some(Rational64::new(5, 6)));
        assert_eq!((half.clone() * half).constant_value(), Some(Rational64::new(1, 4)));
    }

    #[test]
    fn test_parameters_propagate() {
        let p = RationalFunction::parameter("p");
        let one_minus_p = RationalFunction::one() - p.clone();
        let product = p.clone() * one_minus_p;
        assert!(!product.is_constant());
        assert_eq!(
            product.parameters().into_iter().collect::<Vec<_>>(),
            vec!["p".to_string()]
        );
        assert_eq!(product.constant_value(), None);
    }

    #[test]
    fn test_addition_collapses_terms() {
        let p = RationalFunction::parameter("p");
        let double = p.clone() + p.clone();
        assert_eq!(double.to_string(), "2*p");
        let zero = p.clone() - p;
        assert!(zero.is_zero());
    }

    #[test]
    fn test_from_f64_is_exact_for_dyadic_literals() {
        assert_eq!(RationalFunction::from_f64(0.5), Some(rat(1, 2)));
        assert_eq!(RationalFunction::from_f64(0.25), Some(rat(1, 4)));
        assert_eq!(RationalFunction::from_f64(f64::NAN), None);
    }

    #[test]
    fn test_division() {
        let p = RationalFunction::parameter("p");
        let q = p.checked_div(&rat(1, 2)).unwrap();
        assert_eq!(q.to_string(), "2*p");
        assert!(p.checked_div(&RationalFunction::zero()).is_none());
    }

    #[test]
    fn test_display() {
        assert_eq!(rat(1, 2).to_string(), "1/2");
        assert_eq!(rat(-3, 1).to_string(), "-3");
        let p = RationalFunction::parameter("p");
        let expr = rat(1, 2) * p.clone() * p.clone() + rat(1, 3);
        assert_eq!(expr.to_string(), "1/3 + 1/2*p^2");
        let frac = RationalFunction::one()
            .checked_div(&(RationalFunction::one() - p))
            .unwrap();
        assert_eq!(frac.to_string(), "(1)/(1 - p)");
    }
}
