//! `Index`: a positional array of identically-shaped inner aggregators,
//! filled in parallel (§3, §4.G).

use crate::container::{Primitive, Shape};
use crate::error::{ConfigError, ContainerError, Result};
use crate::numeric::Tolerance;
use serde_json::{json, Value};
use std::any::Any;
use std::fmt;

pub struct Index<D> {
    values: Vec<Box<dyn Primitive<D>>>,
    entries: f64,
}

impl<D> Index<D> {
    pub fn new(values: Vec<Box<dyn Primitive<D>>>) -> Result<Self> {
        if values.is_empty() {
            return Err(ConfigError::InvalidConstruction("Index requires at least one entry".into()).into());
        }
        let shapes: Vec<Shape> = values.iter().map(|v| v.shape()).collect();
        if shapes.windows(2).any(|w| w[0] != w[1]) {
            return Err(ConfigError::InvalidConstruction("Index entries must share one shape".into()).into());
        }
        Ok(Index { values, entries: 0.0 })
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

impl<D> Clone for Index<D> {
    fn clone(&self) -> Self {
        Index {
            values: self.values.iter().map(|v| v.clone_box()).collect(),
            entries: self.entries,
        }
    }
}

impl<D> fmt::Debug for Index<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Index")
            .field("len", &self.values.len())
            .field("entries", &self.entries)
            .finish()
    }
}

impl<D: 'static> Primitive<D> for Index<D> {
    fn type_name(&self) -> &'static str {
        "Index"
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
        Shape::Index {
            len: self.values.len(),
            inner: Box::new(self.values[0].shape()),
        }
    }

    fn zero_box(&self) -> Box<dyn Primitive<D>> {
        Box::new(Index {
            values: self.values.iter().map(|v| v.zero_box()).collect(),
            entries: 0.0,
        })
    }

    fn merge_box(&self, other: &dyn Primitive<D>) -> Result<Box<dyn Primitive<D>>> {
        let other = other.as_any().downcast_ref::<Index<D>>().ok_or_else(|| ContainerError::ShapeMismatch {
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
            values.push(a.merge_box(b.as_ref())?);
        }
        Ok(Box::new(Index {
            values,
            entries: self.entries + other.entries,
        }))
    }

    fn equals_box(&self, other: &dyn Primitive<D>, tol: &Tolerance) -> bool {
        let Some(other) = other.as_any().downcast_ref::<Index<D>>() else {
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
        json!({
            "entries": crate::numeric::encode_number(self.entries),
            "type": self.values[0].type_name(),
            "data": self.values.iter().map(|v| v.to_document()).collect::<Vec<_>>(),
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
    let type_name = crate::doc::as_str(data, "type", path)?;
    let bodies = crate::doc::field(data, "data", path)?
        .as_array()
        .ok_or_else(|| crate::error::FormatError::WrongType {
            path: path.to_string(),
            field: "data",
            expected: "array",
        })?;
    let mut values = Vec::with_capacity(bodies.len());
    for (i, body) in bodies.iter().enumerate() {
        let shell = crate::container::wrap_document(type_name, body.clone());
        values.push(registry.from_document(&shell, &format!("{path}.data[{i}]"))?);
    }
    Ok(Box::new(Index { values, entries }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitives::count::Count;

    #[test]
    fn fill_duplicates_to_every_slot() {
        let index = Index::new(vec![Box::new(Count::<f64>::new()), Box::new(Count::new())]).unwrap();
        let mut index = index;
        index.fill(&1.0, 1.0).unwrap();
        assert_eq!(index.get(0).entries(), 1.0);
        assert_eq!(index.get(1).entries(), 1.0);
    }

    #[test]
    fn merge_requires_equal_length() {
        let a = Index::new(vec![Box::new(Count::<f64>::new())]).unwrap();
        let b = Index::new(vec![Box::new(Count::<f64>::new()), Box::new(Count::new())]).unwrap();
        assert!(a.merge_box(&b).is_err());
    }
}
