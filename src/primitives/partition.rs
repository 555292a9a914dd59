//! `Partition`: the same sorted cuts as [`crate::primitives::stack::Stack`],
//! but an observation falls into exactly one half-open bucket (§3, §4.F).

use crate::container::{Primitive, Shape};
use crate::error::{ConfigError, ContainerError, Result};
use crate::numeric::Tolerance;
use crate::quantity::Quantity;
use serde_json::{json, Value};
use std::any::Any;
use std::fmt;

pub struct Partition<D> {
    quantity: Quantity<D>,
    cuts: Vec<f64>,
    values: Vec<Box<dyn Primitive<D>>>,
    entries: f64,
}

fn check_cuts(cuts: &[f64]) -> Result<()> {
    if cuts.windows(2).any(|w| !(w[0] < w[1])) {
        return Err(ConfigError::InvalidConstruction("cuts must be strictly increasing".into()).into());
    }
    Ok(())
}

impl<D> Partition<D> {
    pub fn new(cuts: Vec<f64>, quantity: Quantity<D>, template: &dyn Primitive<D>) -> Result<Self> {
        check_cuts(&cuts)?;
        let values = (0..=cuts.len()).map(|_| template.zero_box()).collect();
        Ok(Partition {
            quantity,
            cuts,
            values,
            entries: 0.0,
        })
    }

    pub fn cuts(&self) -> &[f64] {
        &self.cuts
    }

    pub fn value(&self, index: usize) -> &dyn Primitive<D> {
        self.values[index].as_ref()
    }

    /// Index of the half-open bucket `[cᵢ, cᵢ₊₁)` that `q` falls into, with
    /// implicit sentinel edges `-∞` and `+∞`.
    fn bucket_index(&self, q: f64) -> usize {
        match self.cuts.iter().position(|&c| q < c) {
            Some(i) => i,
            None => self.cuts.len(),
        }
    }
}

impl<D> Clone for Partition<D> {
    fn clone(&self) -> Self {
        Partition {
            quantity: self.quantity.clone(),
            cuts: self.cuts.clone(),
            values: self.values.iter().map(|v| v.clone_box()).collect(),
            entries: self.entries,
        }
    }
}

impl<D> fmt::Debug for Partition<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Partition")
            .field("cuts", &self.cuts)
            .field("entries", &self.entries)
            .finish()
    }
}

impl<D: 'static> Primitive<D> for Partition<D> {
    fn type_name(&self) -> &'static str {
        "Partition"
    }

    fn entries(&self) -> f64 {
        self.entries
    }

    fn fill(&mut self, datum: &D, weight: f64) -> Result<()> {
        let q = self.quantity.eval_f64(datum)?;
        if weight > 0.0 {
            let index = self.bucket_index(q);
            self.values[index].fill(datum, weight)?;
        }
        self.entries += weight;
        Ok(())
    }

    fn shape(&self) -> Shape {
        Shape::Partition {
            cuts: self.cuts.clone(),
            inner: Box::new(self.values[0].shape()),
        }
    }

    fn zero_box(&self) -> Box<dyn Primitive<D>> {
        Box::new(Partition {
            quantity: self.quantity.clone(),
            cuts: self.cuts.clone(),
            values: self.values.iter().map(|v| v.zero_box()).collect(),
            entries: 0.0,
        })
    }

    fn merge_box(&self, other: &dyn Primitive<D>) -> Result<Box<dyn Primitive<D>>> {
        let other = other
            .as_any()
            .downcast_ref::<Partition<D>>()
            .ok_or_else(|| ContainerError::ShapeMismatch {
                this: self.shape().to_string(),
                other: other.shape().to_string(),
            })?;
        if self.shape() != other.shape() {
            return Err(ContainerError::ShapeMismatch {
                this: self.shape().to_string(),
                other: other.shape().to_string(),
            }
            .into());
        }
        let mut values = Vec::with_capacity(self.values.len());
        for (a, b) in self.values.iter().zip(&other.values) {
            values.push(a.merge_box(b.as_ref())?);
        }
        Ok(Box::new(Partition {
            quantity: self.quantity.clone(),
            cuts: self.cuts.clone(),
            values,
            entries: self.entries + other.entries,
        }))
    }

    fn equals_box(&self, other: &dyn Primitive<D>, tol: &Tolerance) -> bool {
        let Some(other) = other.as_any().downcast_ref::<Partition<D>>() else {
            return false;
        };
        self.cuts.len() == other.cuts.len()
            && self.cuts.iter().zip(&other.cuts).all(|(a, b)| tol.close(*a, *b))
            && tol.close(self.entries, other.entries)
            && self
                .values
                .iter()
                .zip(&other.values)
                .all(|(a, b)| a.equals_box(b.as_ref(), tol))
    }

    fn to_document(&self) -> Value {
        let mut body = json!({
            "entries": crate::numeric::encode_number(self.entries),
            "cuts": self.cuts.iter().map(|c| crate::numeric::encode_number(*c)).collect::<Vec<_>>(),
            "values:type": self.values[0].type_name(),
            "values": self.values.iter().map(|v| v.to_document()).collect::<Vec<_>>(),
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
    let values_type = crate::doc::as_str(data, "values:type", path)?;

    let cuts_arr = crate::doc::field(data, "cuts", path)?
        .as_array()
        .ok_or_else(|| crate::error::FormatError::WrongType {
            path: path.to_string(),
            field: "cuts",
            expected: "array",
        })?;
    let mut cuts = Vec::with_capacity(cuts_arr.len());
    for c in cuts_arr {
        cuts.push(crate::numeric::decode_number(c, &format!("{path}.cuts"))?);
    }
    check_cuts(&cuts)?;

    let values_arr = crate::doc::field(data, "values", path)?
        .as_array()
        .ok_or_else(|| crate::error::FormatError::WrongType {
            path: path.to_string(),
            field: "values",
            expected: "array",
        })?;
    let mut values = Vec::with_capacity(values_arr.len());
    for (i, body) in values_arr.iter().enumerate() {
        let shell = crate::container::wrap_document(values_type, body.clone());
        values.push(registry.from_document(&shell, &format!("{path}.values[{i}]"))?);
    }

    Ok(Box::new(Partition {
        quantity: crate::deserialized_quantity(name),
        cuts,
        values,
        entries,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitives::count::Count;

    fn identity() -> Quantity<f64> {
        Quantity::from_fn(Some("x"), |d: &f64| *d)
    }

    #[test]
    fn cuts_example_from_spec() {
        let mut partition = Partition::new(vec![-1.0, 0.0, 1.0], identity(), &Count::<f64>::new()).unwrap();
        partition.fill(&0.5, 1.0).unwrap();
        assert_eq!(partition.value(0).entries(), 0.0);
        assert_eq!(partition.value(1).entries(), 0.0);
        assert_eq!(partition.value(2).entries(), 1.0);
        assert_eq!(partition.value(3).entries(), 0.0);
    }

    #[test]
    fn sentinel_edges_catch_extremes() {
        let mut partition = Partition::new(vec![-1.0, 0.0, 1.0], identity(), &Count::<f64>::new()).unwrap();
        partition.fill(&-100.0, 1.0).unwrap();
        partition.fill(&100.0, 1.0).unwrap();
        assert_eq!(partition.value(0).entries(), 1.0);
        assert_eq!(partition.value(3).entries(), 1.0);
    }
}
