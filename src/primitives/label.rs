//! `Label`: a string-keyed bundle of identically-shaped inner aggregators,
//! all filled from the same observation (§3, §4.G).

use crate::container::{Primitive, Shape};
use crate::error::{ConfigError, ContainerError, Result};
use crate::numeric::Tolerance;
use serde_json::{json, Value};
use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;

pub struct Label<D> {
    values: BTreeMap<String, Box<dyn Primitive<D>>>,
    entries: f64,
}

impl<D> Label<D> {
    pub fn new(values: BTreeMap<String, Box<dyn Primitive<D>>>) -> Result<Self> {
        if values.is_empty() {
            return Err(ConfigError::InvalidConstruction("Label requires at least one entry".into()).into());
        }
        let shapes: Vec<Shape> = values.values().map(|v| v.shape()).collect();
        if shapes.windows(2).any(|w| w[0] != w[1]) {
            return Err(ConfigError::InvalidConstruction("Label entries must share one shape".into()).into());
        }
        Ok(Label { values, entries: 0.0 })
    }

    pub fn get(&self, key: &str) -> Option<&dyn Primitive<D>> {
        self.values.get(key).map(|v| v.as_ref())
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }
}

impl<D> Clone for Label<D> {
    fn clone(&self) -> Self {
        Label {
            values: self.values.iter().map(|(k, v)| (k.clone(), v.clone_box())).collect(),
            entries: self.entries,
        }
    }
}

impl<D> fmt::Debug for Label<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Label")
            .field("keys", &self.values.keys().collect::<Vec<_>>())
            .field("entries", &self.entries)
            .finish()
    }
}

impl<D: 'static> Primitive<D> for Label<D> {
    fn type_name(&self) -> &'static str {
        "Label"
    }

    fn entries(&self) -> f64 {
        self.entries
    }

    fn fill(&mut self, datum: &D, weight: f64) -> Result<()> {
        for value in self.values.values_mut() {
            value.fill(datum, weight)?;
        }
        self.entries += weight;
        Ok(())
    }

    fn shape(&self) -> Shape {
        let first = self.values.values().next().expect("Label is never empty");
        Shape::Label {
            keys: self.values.keys().cloned().collect(),
            inner: Box::new(first.shape()),
        }
    }

    fn zero_box(&self) -> Box<dyn Primitive<D>> {
        Box::new(Label {
            values: self.values.iter().map(|(k, v)| (k.clone(), v.zero_box())).collect(),
            entries: 0.0,
        })
    }

    fn merge_box(&self, other: &dyn Primitive<D>) -> Result<Box<dyn Primitive<D>>> {
        let other = other.as_any().downcast_ref::<Label<D>>().ok_or_else(|| ContainerError::ShapeMismatch {
            this: self.shape().to_string(),
            other: other.shape().to_string(),
        })?;
        if self.values.len() != other.values.len() || self.values.keys().ne(other.values.keys()) {
            return Err(ContainerError::ShapeMismatch {
                this: self.shape().to_string(),
                other: other.shape().to_string(),
            }
            .into());
        }
        let mut values = BTreeMap::new();
        for (key, value) in &self.values {
            let other_value = &other.values[key];
            values.insert(key.clone(), value.merge_box(other_value.as_ref())?);
        }
        Ok(Box::new(Label {
            values,
            entries: self.entries + other.entries,
        }))
    }

    fn equals_box(&self, other: &dyn Primitive<D>, tol: &Tolerance) -> bool {
        let Some(other) = other.as_any().downcast_ref::<Label<D>>() else {
            return false;
        };
        tol.close(self.entries, other.entries)
            && self.values.len() == other.values.len()
            && self.values.iter().all(|(k, v)| {
                other.values.get(k).is_some_and(|o| v.equals_box(o.as_ref(), tol))
            })
    }

    fn to_document(&self) -> Value {
        let first = self.values.values().next().expect("Label is never empty");
        let mut data = serde_json::Map::new();
        for (key, value) in &self.values {
            data.insert(key.clone(), value.to_document());
        }
        json!({
            "entries": crate::numeric::encode_number(self.entries),
            "type": first.type_name(),
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
    let type_name = crate::doc::as_str(data, "type", path)?;
    let inner_map = crate::doc::field(data, "data", path)?
        .as_object()
        .ok_or_else(|| crate::error::FormatError::WrongType {
            path: path.to_string(),
            field: "data",
            expected: "object",
        })?;
    let mut values = BTreeMap::new();
    for (key, body) in inner_map {
        let shell = crate::container::wrap_document(type_name, body.clone());
        values.insert(key.clone(), registry.from_document(&shell, &format!("{path}.data.{key}"))?);
    }
    Ok(Box::new(Label { values, entries }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitives::count::Count;

    #[test]
    fn fill_forwards_to_every_inner() {
        let mut values: BTreeMap<String, Box<dyn Primitive<f64>>> = BTreeMap::new();
        values.insert("a".into(), Box::new(Count::new()));
        values.insert("b".into(), Box::new(Count::new()));
        let mut label = Label::new(values).unwrap();
        label.fill(&1.0, 1.0).unwrap();
        assert_eq!(label.get("a").unwrap().entries(), 1.0);
        assert_eq!(label.get("b").unwrap().entries(), 1.0);
        assert_eq!(label.entries(), 1.0);
    }

    #[test]
    fn rejects_empty_or_heterogeneous_shapes() {
        let empty: BTreeMap<String, Box<dyn Primitive<f64>>> = BTreeMap::new();
        assert!(Label::new(empty).is_err());
    }

    #[test]
    fn merge_requires_equal_key_sets() {
        let mut a: BTreeMap<String, Box<dyn Primitive<f64>>> = BTreeMap::new();
        a.insert("a".into(), Box::new(Count::new()));
        let a = Label::new(a).unwrap();

        let mut b: BTreeMap<String, Box<dyn Primitive<f64>>> = BTreeMap::new();
        b.insert("b".into(), Box::new(Count::new()));
        let b = Label::new(b).unwrap();

        assert!(a.merge_box(&b).is_err());
    }
}
