//! A named, serializable function reference from a datum to a number.

use crate::error::QuantityError;
use std::fmt;
use std::rc::Rc;

/// The value a quantity evaluates to: a number, a boolean gate, or a
/// categorical key.
#[derive(Debug, Clone, PartialEq)]
pub enum QuantityValue {
    Number(f64),
    Bool(bool),
    Text(String),
}

impl QuantityValue {
    /// Cast a boolean to `0.0`/`1.0`, as every numeric cut in this crate
    /// tolerates a quantity that returns a boolean (§4.C).
    pub fn as_f64(&self) -> f64 {
        match self {
            QuantityValue::Number(x) => *x,
            QuantityValue::Bool(b) => {
                if *b {
                    1.0
                } else {
                    0.0
                }
            }
            QuantityValue::Text(_) => f64::NAN,
        }
    }

    pub fn as_str(&self) -> String {
        match self {
            QuantityValue::Text(s) => s.clone(),
            QuantityValue::Number(x) => x.to_string(),
            QuantityValue::Bool(b) => b.to_string(),
        }
    }
}

type QuantityFn<D> = Rc<dyn Fn(&D) -> Result<QuantityValue, QuantityError>>;

/// A callable plus an optional symbolic name, used to route observations
/// and to round-trip through the document form.
pub struct Quantity<D> {
    name: Option<String>,
    func: QuantityFn<D>,
}

impl<D> Clone for Quantity<D> {
    fn clone(&self) -> Self {
        Quantity {
            name: self.name.clone(),
            func: self.func.clone(),
        }
    }
}

impl<D> Quantity<D> {
    /// An anonymous quantity. Two anonymous quantities are equal only when
    /// they are the same `Rc` (Open Question resolved in DESIGN.md).
    pub fn new<F>(func: F) -> Self
    where
        F: Fn(&D) -> Result<QuantityValue, QuantityError> + 'static,
    {
        Quantity {
            name: None,
            func: Rc::new(func),
        }
    }

    /// A named quantity. The name is what round-trips through `serialize`.
    pub fn named<F>(name: impl Into<String>, func: F) -> Self
    where
        F: Fn(&D) -> Result<QuantityValue, QuantityError> + 'static,
    {
        Quantity {
            name: Some(name.into()),
            func: Rc::new(func),
        }
    }

    /// Build a quantity from a plain numeric closure that cannot fail.
    pub fn from_fn<F>(name: Option<&str>, func: F) -> Self
    where
        F: Fn(&D) -> f64 + 'static,
    {
        let wrapped = move |d: &D| Ok(QuantityValue::Number(func(d)));
        match name {
            Some(n) => Quantity::named(n.to_string(), wrapped),
            None => Quantity::new(wrapped),
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    fn qualified_name(&self) -> &str {
        self.name.as_deref().unwrap_or("<anonymous>")
    }

    pub fn eval(&self, datum: &D) -> Result<QuantityValue, QuantityError> {
        (self.func)(datum).map_err(|mut e| {
            if e.name.is_empty() {
                e.name = self.qualified_name().to_string();
            }
            e
        })
    }

    pub fn eval_f64(&self, datum: &D) -> Result<f64, QuantityError> {
        self.eval(datum).map(|v| v.as_f64())
    }
}

impl<D> fmt::Debug for Quantity<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Quantity")
            .field("name", &self.name)
            .finish()
    }
}

impl<D> PartialEq for Quantity<D> {
    /// Named quantities compare by name; unnamed quantities compare by
    /// identity, since the library has no other handle on "the same"
    /// anonymous function (§4.C, §9).
    fn eq(&self, other: &Self) -> bool {
        match (&self.name, &other.name) {
            (Some(a), Some(b)) => a == b,
            (None, None) => Rc::ptr_eq(&self.func, &other.func),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn named_quantities_compare_by_name() {
        let a = Quantity::<f64>::from_fn(Some("x"), |d| *d);
        let b = Quantity::<f64>::from_fn(Some("x"), |d| d * 2.0);
        assert_eq!(a, b);
    }

    #[test]
    fn anonymous_quantities_compare_by_identity() {
        let a = Quantity::<f64>::from_fn(None, |d| *d);
        let b = Quantity::<f64>::from_fn(None, |d| *d);
        assert_ne!(a, b);
        let c = a.clone();
        assert_eq!(a, c);
    }

    #[test]
    fn bool_quantity_casts_to_zero_one() {
        assert_eq!(QuantityValue::Bool(true).as_f64(), 1.0);
        assert_eq!(QuantityValue::Bool(false).as_f64(), 0.0);
    }
}
