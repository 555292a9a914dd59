//! `Sum`: Σwᵢxᵢ (§3, §4.D).

use crate::container::{Primitive, Shape};
use crate::error::{ContainerError, Result};
use crate::numeric::Tolerance;
use crate::quantity::Quantity;
use serde_json::{json, Value};
use std::any::Any;
use std::fmt;

pub struct Sum<D> {
    quantity: Quantity<D>,
    sum: f64,
    entries: f64,
}

impl<D> Sum<D> {
    pub fn new(quantity: Quantity<D>) -> Self {
        Sum {
            quantity,
            sum: 0.0,
            entries: 0.0,
        }
    }

    pub fn sum(&self) -> f64 {
        self.sum
    }

    pub fn set_quantity(&mut self, quantity: Quantity<D>) {
        self.quantity = quantity;
    }
}

impl<D> Clone for Sum<D> {
    fn clone(&self) -> Self {
        Sum {
            quantity: self.quantity.clone(),
            sum: self.sum,
            entries: self.entries,
        }
    }
}

impl<D> fmt::Debug for Sum<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sum")
            .field("sum", &self.sum)
            .field("entries", &self.entries)
            .finish()
    }
}

impl<D: 'static> Primitive<D> for Sum<D> {
    fn type_name(&self) -> &'static str {
        "Sum"
    }

    fn entries(&self) -> f64 {
        self.entries
    }

    fn fill(&mut self, datum: &D, weight: f64) -> Result<()> {
        if weight > 0.0 {
            let x = self.quantity.eval_f64(datum)?;
            self.sum += weight * x;
        }
        self.entries += weight;
        Ok(())
    }

    fn shape(&self) -> Shape {
        Shape::Leaf("Sum")
    }

    fn zero_box(&self) -> Box<dyn Primitive<D>> {
        Box::new(Sum {
            quantity: self.quantity.clone(),
            sum: 0.0,
            entries: 0.0,
        })
    }

    fn merge_box(&self, other: &dyn Primitive<D>) -> Result<Box<dyn Primitive<D>>> {
        let other = other.as_any().downcast_ref::<Sum<D>>().ok_or_else(|| ContainerError::ShapeMismatch {
            this: self.shape().to_string(),
            other: other.shape().to_string(),
        })?;
        Ok(Box::new(Sum {
            quantity: self.quantity.clone(),
            sum: self.sum + other.sum,
            entries: self.entries + other.entries,
        }))
    }

    fn equals_box(&self, other: &dyn Primitive<D>, tol: &Tolerance) -> bool {
        other.as_any().downcast_ref::<Sum<D>>().is_some_and(|o| {
            tol.close(self.sum, o.sum) && tol.close(self.entries, o.entries)
        })
    }

    fn to_document(&self) -> Value {
        let mut body = json!({
            "sum": crate::numeric::encode_number(self.sum),
            "entries": crate::numeric::encode_number(self.entries),
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

pub fn from_document<D: 'static>(data: &Value, path: &str, _registry: &crate::registry::Registry<D>) -> Result<Box<dyn Primitive<D>>> {
    let sum = crate::doc::as_f64(data, "sum", path)?;
    let entries = crate::doc::as_f64(data, "entries", path)?;
    let name = data.get("name").and_then(Value::as_str);
    let quantity = crate::deserialized_quantity(name);
    Ok(Box::new(Sum { quantity, sum, entries }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity() -> Quantity<f64> {
        Quantity::from_fn(Some("x"), |d: &f64| *d)
    }

    #[test]
    fn fill_accumulates_weighted_sum() {
        let mut s = Sum::new(identity());
        for x in [1.0, 2.0, 3.0] {
            s.fill(&x, 1.0).unwrap();
        }
        assert_eq!(s.sum(), 6.0);
        assert_eq!(s.entries(), 3.0);
    }

    #[test]
    fn non_positive_weight_skips_sum_but_not_entries() {
        let mut s = Sum::new(identity());
        s.fill(&5.0, -1.0).unwrap();
        assert_eq!(s.sum(), 0.0);
        assert_eq!(s.entries(), -1.0);
    }

    #[test]
    fn merge_requires_matching_shape() {
        let a = Sum::new(identity());
        let b = crate::primitives::count::Count::<f64>::new();
        assert!(a.merge_box(&b).is_err());
    }
}
