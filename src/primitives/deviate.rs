//! `Deviate`: mean and variance via Welford's update and Chan's parallel
//! variance merge formula (§4.D).

use crate::container::{Primitive, Shape};
use crate::error::{ContainerError, Result};
use crate::numeric::Tolerance;
use crate::quantity::Quantity;
use serde_json::{json, Value};
use std::any::Any;
use std::fmt;

pub struct Deviate<D> {
    quantity: Quantity<D>,
    mean: f64,
    m2: f64,
    entries: f64,
}

impl<D> Deviate<D> {
    pub fn new(quantity: Quantity<D>) -> Self {
        Deviate {
            quantity,
            mean: 0.0,
            m2: 0.0,
            entries: 0.0,
        }
    }

    pub fn mean(&self) -> f64 {
        self.mean
    }

    /// `variance = M2 / entries`.
    pub fn variance(&self) -> f64 {
        if self.entries == 0.0 {
            0.0
        } else {
            self.m2 / self.entries
        }
    }
}

impl<D> Clone for Deviate<D> {
    fn clone(&self) -> Self {
        Deviate {
            quantity: self.quantity.clone(),
            mean: self.mean,
            m2: self.m2,
            entries: self.entries,
        }
    }
}

impl<D> fmt::Debug for Deviate<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Deviate")
            .field("mean", &self.mean)
            .field("variance", &self.variance())
            .field("entries", &self.entries)
            .finish()
    }
}

impl<D: 'static> Primitive<D> for Deviate<D> {
    fn type_name(&self) -> &'static str {
        "Deviate"
    }

    fn entries(&self) -> f64 {
        self.entries
    }

    fn fill(&mut self, datum: &D, weight: f64) -> Result<()> {
        if weight > 0.0 {
            let x = self.quantity.eval_f64(datum)?;
            let entries_prime = self.entries + weight;
            if entries_prime != 0.0 {
                let delta = x - self.mean;
                self.mean += (weight / entries_prime) * delta;
                self.m2 += weight * delta * (x - self.mean);
            }
        }
        self.entries += weight;
        Ok(())
    }

    fn shape(&self) -> Shape {
        Shape::Leaf("Deviate")
    }

    fn zero_box(&self) -> Box<dyn Primitive<D>> {
        Box::new(Deviate {
            quantity: self.quantity.clone(),
            mean: 0.0,
            m2: 0.0,
            entries: 0.0,
        })
    }

    fn merge_box(&self, other: &dyn Primitive<D>) -> Result<Box<dyn Primitive<D>>> {
        let other = other.as_any().downcast_ref::<Deviate<D>>().ok_or_else(|| ContainerError::ShapeMismatch {
            this: self.shape().to_string(),
            other: other.shape().to_string(),
        })?;
        let entries = self.entries + other.entries;
        let (mean, m2) = if entries == 0.0 {
            (0.0, 0.0)
        } else {
            let delta = other.mean - self.mean;
            let mean = (self.entries * self.mean + other.entries * other.mean) / entries;
            let m2 = self.m2 + other.m2 + delta * delta * (self.entries * other.entries) / entries;
            (mean, m2)
        };
        Ok(Box::new(Deviate {
            quantity: self.quantity.clone(),
            mean,
            m2,
            entries,
        }))
    }

    fn equals_box(&self, other: &dyn Primitive<D>, tol: &Tolerance) -> bool {
        other.as_any().downcast_ref::<Deviate<D>>().is_some_and(|o| {
            tol.close(self.mean, o.mean) && tol.close(self.m2, o.m2) && tol.close(self.entries, o.entries)
        })
    }

    fn to_document(&self) -> Value {
        let mut body = json!({
            "mean": crate::numeric::encode_number(self.mean),
            "variance": crate::numeric::encode_number(self.variance()),
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
    let variance = crate::doc::as_f64(data, "variance", path)?;
    let entries = crate::doc::as_f64(data, "entries", path)?;
    let name = data.get("name").and_then(Value::as_str);
    Ok(Box::new(Deviate {
        quantity: crate::deserialized_quantity(name),
        mean,
        m2: variance * entries,
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
    fn variance_of_one_two_three_four() {
        let mut dev = Deviate::new(identity());
        for x in [1.0, 2.0, 3.0, 4.0] {
            dev.fill(&x, 1.0).unwrap();
        }
        assert_eq!(dev.mean(), 2.5);
        assert!((dev.variance() - 1.25).abs() < 1e-9);
    }

    #[test]
    fn merge_matches_single_pass_variance() {
        let data = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
        let mut whole = Deviate::new(identity());
        for x in data {
            whole.fill(&x, 1.0).unwrap();
        }

        let mut left = Deviate::new(identity());
        for x in &data[..3] {
            left.fill(x, 1.0).unwrap();
        }
        let mut right = Deviate::new(identity());
        for x in &data[3..] {
            right.fill(x, 1.0).unwrap();
        }
        let merged = left.merge_box(&right).unwrap();
        let merged = merged.as_any().downcast_ref::<Deviate<f64>>().unwrap();
        assert!((merged.mean() - whole.mean()).abs() < 1e-9);
        assert!((merged.variance() - whole.variance()).abs() < 1e-9);
    }
}
