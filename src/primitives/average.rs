//! `Average`: weighted running mean via the Welford/Tony-Finch update (§4.D).

use crate::container::{Primitive, Shape};
use crate::error::{ContainerError, Result};
use crate::numeric::Tolerance;
use crate::quantity::Quantity;
use serde_json::{json, Value};
use std::any::Any;
use std::fmt;

pub struct Average<D> {
    quantity: Quantity<D>,
    mean: f64,
    entries: f64,
}

impl<D> Average<D> {
    pub fn new(quantity: Quantity<D>) -> Self {
        Average {
            quantity,
            mean: 0.0,
            entries: 0.0,
        }
    }

    pub fn mean(&self) -> f64 {
        self.mean
    }
}

impl<D> Clone for Average<D> {
    fn clone(&self) -> Self {
        Average {
            quantity: self.quantity.clone(),
            mean: self.mean,
            entries: self.entries,
        }
    }
}

impl<D> fmt::Debug for Average<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Average")
            .field("mean", &self.mean)
            .field("entries", &self.entries)
            .finish()
    }
}

impl<D: 'static> Primitive<D> for Average<D> {
    fn type_name(&self) -> &'static str {
        "Average"
    }

    fn entries(&self) -> f64 {
        self.entries
    }

    fn fill(&mut self, datum: &D, weight: f64) -> Result<()> {
        if weight > 0.0 {
            let x = self.quantity.eval_f64(datum)?;
            let entries_prime = self.entries + weight;
            if entries_prime != 0.0 {
                self.mean += (weight / entries_prime) * (x - self.mean);
            }
        }
        self.entries += weight;
        Ok(())
    }

    fn shape(&self) -> Shape {
        Shape::Leaf("Average")
    }

    fn zero_box(&self) -> Box<dyn Primitive<D>> {
        Box::new(Average {
            quantity: self.quantity.clone(),
            mean: 0.0,
            entries: 0.0,
        })
    }

    fn merge_box(&self, other: &dyn Primitive<D>) -> Result<Box<dyn Primitive<D>>> {
        let other = other.as_any().downcast_ref::<Average<D>>().ok_or_else(|| ContainerError::ShapeMismatch {
            this: self.shape().to_string(),
            other: other.shape().to_string(),
        })?;
        let entries = self.entries + other.entries;
        let mean = if entries == 0.0 {
            0.0
        } else {
            (self.entries * self.mean + other.entries * other.mean) / entries
        };
        Ok(Box::new(Average {
            quantity: self.quantity.clone(),
            mean,
            entries,
        }))
    }

    fn equals_box(&self, other: &dyn Primitive<D>, tol: &Tolerance) -> bool {
        other.as_any().downcast_ref::<Average<D>>().is_some_and(|o| {
            tol.close(self.mean, o.mean) && tol.close(self.entries, o.entries)
        })
    }

    fn to_document(&self) -> Value {
        let mut body = json!({
            "mean": crate::numeric::encode_number(self.mean),
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
    let mean = crate::doc::as_f64(data, "mean", path)?;
    let entries = crate::doc::as_f64(data, "entries", path)?;
    let name = data.get("name").and_then(Value::as_str);
    Ok(Box::new(Average {
        quantity: crate::deserialized_quantity(name),
        mean,
        entries,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity() -> Quantity<f64> {
        Quantity::from_fn(Some("x"), |d: &f64| *d)
    }

    #[test]
    fn unweighted_mean_of_one_two_three_four() {
        let mut avg = Average::new(identity());
        for x in [1.0, 2.0, 3.0, 4.0] {
            avg.fill(&x, 1.0).unwrap();
        }
        assert_eq!(avg.mean(), 2.5);
        assert_eq!(avg.entries(), 4.0);
    }

    #[test]
    fn merging_with_a_singleton_shifts_the_mean() {
        let mut avg = Average::new(identity());
        for x in [1.0, 2.0, 3.0, 4.0] {
            avg.fill(&x, 1.0).unwrap();
        }
        let mut singleton = Average::new(identity());
        singleton.fill(&10.0, 1.0).unwrap();

        let merged = avg.merge_box(&singleton).unwrap();
        assert_eq!(merged.entries(), 5.0);
        let merged_mean = merged
            .as_any()
            .downcast_ref::<Average<f64>>()
            .unwrap()
            .mean();
        assert_eq!(merged_mean, 4.0);
    }

    #[test]
    fn zero_weight_leaves_mean_unchanged() {
        let mut avg = Average::new(identity());
        avg.fill(&1.0, 1.0).unwrap();
        let before = avg.mean();
        avg.fill(&99.0, 0.0).unwrap();
        assert_eq!(avg.mean(), before);
        assert_eq!(avg.entries(), 1.0);
    }
}
