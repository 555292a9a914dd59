//! `AbsoluteErr`: weighted running mean of `|x|` (§3, §4.D).

use crate::container::{Primitive, Shape};
use crate::error::{ContainerError, Result};
use crate::numeric::Tolerance;
use crate::quantity::Quantity;
use serde_json::{json, Value};
use std::any::Any;
use std::fmt;

pub struct AbsoluteErr<D> {
    quantity: Quantity<D>,
    mae: f64,
    entries: f64,
}

impl<D> AbsoluteErr<D> {
    pub fn new(quantity: Quantity<D>) -> Self {
        AbsoluteErr {
            quantity,
            mae: 0.0,
            entries: 0.0,
        }
    }

    pub fn mae(&self) -> f64 {
        self.mae
    }
}

impl<D> Clone for AbsoluteErr<D> {
    fn clone(&self) -> Self {
        AbsoluteErr {
            quantity: self.quantity.clone(),
            mae: self.mae,
            entries: self.entries,
        }
    }
}

impl<D> fmt::Debug for AbsoluteErr<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AbsoluteErr")
            .field("mae", &self.mae)
            .field("entries", &self.entries)
            .finish()
    }
}

impl<D: 'static> Primitive<D> for AbsoluteErr<D> {
    fn type_name(&self) -> &'static str {
        "AbsoluteErr"
    }

    fn entries(&self) -> f64 {
        self.entries
    }

    fn fill(&mut self, datum: &D, weight: f64) -> Result<()> {
        if weight > 0.0 {
            let x = self.quantity.eval_f64(datum)?.abs();
            let entries_prime = self.entries + weight;
            if entries_prime != 0.0 {
                self.mae += (weight / entries_prime) * (x - self.mae);
            }
        }
        self.entries += weight;
        Ok(())
    }

    fn shape(&self) -> Shape {
        Shape::Leaf("AbsoluteErr")
    }

    fn zero_box(&self) -> Box<dyn Primitive<D>> {
        Box::new(AbsoluteErr {
            quantity: self.quantity.clone(),
            mae: 0.0,
            entries: 0.0,
        })
    }

    fn merge_box(&self, other: &dyn Primitive<D>) -> Result<Box<dyn Primitive<D>>> {
        let other = other
            .as_any()
            .downcast_ref::<AbsoluteErr<D>>()
            .ok_or_else(|| ContainerError::ShapeMismatch {
                this: self.shape().to_string(),
                other: other.shape().to_string(),
            })?;
        let entries = self.entries + other.entries;
        let mae = if entries == 0.0 {
            0.0
        } else {
            (self.entries * self.mae + other.entries * other.mae) / entries
        };
        Ok(Box::new(AbsoluteErr {
            quantity: self.quantity.clone(),
            mae,
            entries,
        }))
    }

    fn equals_box(&self, other: &dyn Primitive<D>, tol: &Tolerance) -> bool {
        other.as_any().downcast_ref::<AbsoluteErr<D>>().is_some_and(|o| {
            tol.close(self.mae, o.mae) && tol.close(self.entries, o.entries)
        })
    }

    fn to_document(&self) -> Value {
        let mut body = json!({
            "mae": crate::numeric::encode_number(self.mae),
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
    let mae = crate::doc::as_f64(data, "mae", path)?;
    let entries = crate::doc::as_f64(data, "entries", path)?;
    let name = data.get("name").and_then(Value::as_str);
    Ok(Box::new(AbsoluteErr {
        quantity: crate::deserialized_quantity(name),
        mae,
        entries,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tracks_mean_absolute_value() {
        let q = Quantity::from_fn(Some("x"), |d: &f64| *d);
        let mut mae = AbsoluteErr::new(q);
        for x in [-3.0, 3.0, -1.0, 1.0] {
            mae.fill(&x, 1.0).unwrap();
        }
        assert_eq!(mae.mae(), 2.0);
    }
}
