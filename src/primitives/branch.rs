//! `Branch`: a heterogeneous ordered tuple of inner aggregators, filled in
//! parallel (§3, §4.G).

use crate::container::{Primitive, Shape};
use crate::error::{ConfigError, ContainerError, Result};
use crate::numeric::Tolerance;
use serde_json::{json, Value};
use std::any::Any;
use std::fmt;

pub struct Branch<D> {
    values: Vec<Box<dyn Primitive<D>>>,
    entries: f64,
}

impl<D> Branch<D> {
    pub fn new(values: Vec<Box<dyn Primitive<D>>>) -> Result<Self> {
        if values.is_empty() {
            return Err(ConfigError::InvalidConstruction("Branch requires at least one entry".into()).into());
        }
        Ok(Branch { values, entries: 0.0 })
    }

    pub fn get(&self, index: usize) -> &dyn Primitive<D> {
        self.values[index].as_ref()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl<D> Clone for Branch<D> {
    fn clone(&self) -> Self {
        Branch {
            values: self.values.iter().map(|v| v.clone_box()).collect(),
            entries: self.entries,
        }
    }
}

impl<D> fmt::Debug for Branch<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Branch")
            .field("len", &self.values.len())
            .field("entries", &self.entries)
            .finish()
    }
}

impl<D: 'static> Primitive<D> for Branch<D> {
    fn type_name(&self) -> &'static str {
        "Branch"
    }

    fn entries(&self) -> f64 {
        self.entries
    }

    fn fill(&mut self, datum: &D, weight: f64) -> Result<()> {
        for value in &mut self.values {
            value.fill(datum, weight)?;
        }
        self.entries += weight;
        Ok(())
    }

    fn shape(&self) -> Shape {
        Shape::Branch {
            entries: self.values.iter().map(|v| v.shape()).collect(),
        }
    }

    fn zero_box(&self) -> Box<dyn Primitive<D>> {
        Box::new(Branch {
            values: self.values.iter().map(|v| v.zero_box()).collect(),
            entries: 0.0,
        })
    }

    fn merge_box(&self, other: &dyn Primitive<D>) -> Result<Box<dyn Primitive<D>>> {
        let other = other.as_any().downcast_ref::<Branch<D>>().ok_or_else(|| ContainerError::ShapeMismatch {
            this: self.shape().to_string(),
            other: other.shape().to_string(),
        })?;
        if self.values.len() != other.values.len() {
            return Err(ContainerError::ShapeMismatch {
                this: self.shape().to_string(),
                other: other.shape().to_string(),
            }
            .into());
        }
        let mut values = Vec::with_capacity(self.values.len());
        for (a, b) in self.values.iter().zip(&other.values) {
            if a.shape() != b.shape() {
                return Err(ContainerError::ShapeMismatch {
                    this: a.shape().to_string(),
                    other: b.shape().to_string(),
                }
                .into());
            }
            values.push(a.merge_box(b.as_ref())?);
        }
        Ok(Box::new(Branch {
            values,
            entries: self.entries + other.entries,
        }))
    }

    fn equals_box(&self, other: &dyn Primitive<D>, tol: &Tolerance) -> bool {
        let Some(other) = other.as_any().downcast_ref::<Branch<D>>() else {
            return false;
        };
        tol.close(self.entries, other.entries)
            && self.values.len() == other.values.len()
            && self
                .values
                .iter()
                .zip(&other.values)
                .all(|(a, b)| a.equals_box(b.as_ref(), tol))
    }

    fn to_document(&self) -> Value {
        let data: Vec<Value> = self
            .values
            .iter()
            .map(|v| {
                json!({
                    "type": v.type_name(),
                    "data": v.to_document(),
                })
            })
            .collect();
        json!({
            "entries": crate::numeric::encode_number(self.entries),
            "data": data,
        })
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
    let items = crate::doc::field(data, "data", path)?
        .as_array()
        .ok_or_else(|| crate::error::FormatError::WrongType {
            path: path.to_string(),
            field: "data",
            expected: "array",
        })?;
    let mut values = Vec::with_capacity(items.len());
    for (i, item) in items.iter().enumerate() {
        let item_path = format!("{path}.data[{i}]");
        let type_name = crate::doc::as_str(item, "type", &item_path)?;
        let body = crate::doc::field(item, "data", &item_path)?;
        let shell = crate::container::wrap_document(type_name, body.clone());
        values.push(registry.from_document(&shell, &format!("{item_path}.data"))?);
    }
    Ok(Box::new(Branch { values, entries }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitives::average::Average;
    use crate::primitives::count::Count;
    use crate::quantity::Quantity;

    #[test]
    fn fill_duplicates_to_every_slot_regardless_of_shape() {
        let mut branch = Branch::new(vec![
            Box::new(Count::<f64>::new()),
            Box::new(Average::new(Quantity::from_fn(Some("x"), |d: &f64| *d))),
        ])
        .unwrap();
        branch.fill(&3.0, 1.0).unwrap();
        assert_eq!(branch.get(0).entries(), 1.0);
        assert_eq!(branch.get(1).entries(), 1.0);
    }

    #[test]
    fn merge_checks_shape_pairwise() {
        let a = Branch::new(vec![Box::new(Count::<f64>::new()) as Box<dyn Primitive<f64>>]).unwrap();
        let b = Branch::new(vec![Box::new(Average::new(Quantity::from_fn(Some("x"), |d: &f64| *d)))
            as Box<dyn Primitive<f64>>])
        .unwrap();
        assert!(a.merge_box(&b).is_err());
    }
}
