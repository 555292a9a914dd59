//! `Fraction`: a numerator/denominator pair of identically-shaped inner
//! aggregators tracking how much weight passes a predicate (§3, §4.F).

use crate::container::{Primitive, Shape};
use crate::error::{ContainerError, Result};
use crate::numeric::Tolerance;
use crate::quantity::Quantity;
use serde_json::{json, Value};
use std::any::Any;
use std::fmt;

pub struct Fraction<D> {
    quantity: Quantity<D>,
    numerator: Box<dyn Primitive<D>>,
    denominator: Box<dyn Primitive<D>>,
    entries: f64,
}

impl<D> Fraction<D> {
    pub fn new(quantity: Quantity<D>, template: &dyn Primitive<D>) -> Self {
        Fraction {
            quantity,
            numerator: template.zero_box(),
            denominator: template.zero_box(),
            entries: 0.0,
        }
    }

    pub fn numerator(&self) -> &dyn Primitive<D> {
        self.numerator.as_ref()
    }

    pub fn denominator(&self) -> &dyn Primitive<D> {
        self.denominator.as_ref()
    }

    /// `NaN` when the denominator is empty, per `0.0 / 0.0`.
    pub fn fraction_passing(&self) -> f64 {
        self.numerator.entries() / self.denominator.entries()
    }
}

impl<D> Clone for Fraction<D> {
    fn clone(&self) -> Self {
        Fraction {
            quantity: self.quantity.clone(),
            numerator: self.numerator.clone_box(),
            denominator: self.denominator.clone_box(),
            entries: self.entries,
        }
    }
}

impl<D> fmt::Debug for Fraction<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Fraction")
            .field("fraction_passing", &self.fraction_passing())
            .field("entries", &self.entries)
            .finish()
    }
}

impl<D: 'static> Primitive<D> for Fraction<D> {
    fn type_name(&self) -> &'static str {
        "Fraction"
    }

    fn entries(&self) -> f64 {
        self.entries
    }

    fn fill(&mut self, datum: &D, weight: f64) -> Result<()> {
        let q = self.quantity.eval_f64(datum)?;
        self.denominator.fill(datum, weight)?;
        if q > 0.0 {
            self.numerator.fill(datum, weight * q)?;
        }
        self.entries += weight;
        Ok(())
    }

    fn shape(&self) -> Shape {
        Shape::Fraction {
            inner: Box::new(self.denominator.shape()),
        }
    }

    fn zero_box(&self) -> Box<dyn Primitive<D>> {
        Box::new(Fraction {
            quantity: self.quantity.clone(),
            numerator: self.numerator.zero_box(),
            denominator: self.denominator.zero_box(),
            entries: 0.0,
        })
    }

    fn merge_box(&self, other: &dyn Primitive<D>) -> Result<Box<dyn Primitive<D>>> {
        let other = other.as_any().downcast_ref::<Fraction<D>>().ok_or_else(|| ContainerError::ShapeMismatch {
            this: self.shape().to_string(),
            other: other.shape().to_string(),
        })?;
        Ok(Box::new(Fraction {
            quantity: self.quantity.clone(),
            numerator: self.numerator.merge_box(other.numerator.as_ref())?,
            denominator: self.denominator.merge_box(other.denominator.as_ref())?,
            entries: self.entries + other.entries,
        }))
    }

    fn equals_box(&self, other: &dyn Primitive<D>, tol: &Tolerance) -> bool {
        other.as_any().downcast_ref::<Fraction<D>>().is_some_and(|o| {
            tol.close(self.entries, o.entries)
                && self.numerator.equals_box(o.numerator.as_ref(), tol)
                && self.denominator.equals_box(o.denominator.as_ref(), tol)
        })
    }

    fn to_document(&self) -> Value {
        let mut body = json!({
            "entries": crate::numeric::encode_number(self.entries),
            "sub:type": self.denominator.type_name(),
            "numerator": self.numerator.to_document(),
            "denominator": self.denominator.to_document(),
        });
        if let Some(name) = self.quantity.name() {
            body["name"] = json!(name);
        }
        body
    }

    fn clone_box(&self) -> Box<dyn Primitive<D>> {
        Box::new(self.clone())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

pub fn from_document<D: 'static>(
    data: &Value,
    path: &str,
    registry: &crate::registry::Registry<D>,
) -> Result<Box<dyn Primitive<D>>> {
    let entries = crate::doc::as_f64(data, "entries", path)?;
    let name = data.get("name").and_then(Value::as_str);
    let sub_type = crate::doc::as_str(data, "sub:type", path)?;

    let shell = |body: &Value| -> Value { crate::container::wrap_document(sub_type, body.clone()) };

    let numerator_body = crate::doc::field(data, "numerator", path)?;
    let denominator_body = crate::doc::field(data, "denominator", path)?;
    let numerator = registry.from_document(&shell(numerator_body), &format!("{path}.numerator"))?;
    let denominator = registry.from_document(&shell(denominator_body), &format!("{path}.denominator"))?;

    Ok(Box::new(Fraction {
        quantity: crate::deserialized_quantity(name),
        numerator,
        denominator,
        entries,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitives::count::Count;

    #[test]
    fn tracks_fraction_passing() {
        let q = Quantity::from_fn(Some("positive"), |d: &f64| if *d > 0.0 { 1.0 } else { 0.0 });
        let mut frac = Fraction::new(q, &Count::<f64>::new());
        for x in [1.0, -1.0, 2.0, -2.0, 3.0] {
            frac.fill(&x, 1.0).unwrap();
        }
        assert_eq!(frac.denominator().entries(), 5.0);
        assert_eq!(frac.numerator().entries(), 3.0);
        assert!((frac.fraction_passing() - 0.6).abs() < 1e-12);
    }
}
