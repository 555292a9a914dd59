//! `UntypedLabel`: like [`crate::primitives::label::Label`], but inner
//! aggregators may be of heterogeneous shapes (§3, §4.G).

use crate::container::{Primitive, Shape};
use crate::error::{ConfigError, ContainerError, Result};
use crate::numeric::Tolerance;
use serde_json::{json, Value};
use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;

pub struct UntypedLabel<D> {
    values: BTreeMap<String, Box<dyn Primitive<D>>>,
    entries: f64,
}

impl<D> UntypedLabel<D> {
    pub fn new(values: BTreeMap<String, Box<dyn Primitive<D>>>) -> Result<Self> {
        if values.is_empty() {
            return Err(ConfigError::InvalidConstruction("UntypedLabel requires at least one entry".into()).into());
        }
        Ok(UntypedLabel { values, entries: 0.0 })
    }

    pub fn get(&self, key: &str) -> Option<&dyn Primitive<D>> {
        self.values.get(key).map(|v| v.as_ref())
    }
}

impl<D> Clone for UntypedLabel<D> {
    fn clone(&self) -> Self {
        UntypedLabel {
            values: self.values.iter().map(|(k, v)| (k.clone(), v.clone_box())).collect(),
            entries: self.entries,
        }
    }
}

impl<D> fmt::Debug for UntypedLabel<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UntypedLabel")
            .field("keys", &self.values.keys().collect::<Vec<_>>())
            .field("entries", &self.entries)
            .finish()
    }
}

impl<D: 'static> Primitive<D> for UntypedLabel<D> {
    fn type_name(&self) -> &'static str {
        "UntypedLabel"
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
        Shape::UntypedLabel {
            entries: self.values.iter().map(|(k, v)| (k.clone(), v.shape())).collect(),
        }
    }

    fn zero_box(&self) -> Box<dyn Primitive<D>> {
        Box::new(UntypedLabel {
            values: self.values.iter().map(|(k, v)| (k.clone(), v.zero_box())).collect(),
            entries: 0.0,
        })
    }

    fn merge_box(&self, other: &dyn Primitive<D>) -> Result<Box<dyn Primitive<D>>> {
        let other = other
            .as_any()
            .downcast_ref::<UntypedLabel<D>>()
            .ok_or_else(|| ContainerError::ShapeMismatch {
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
            if value.shape() != other_value.shape() {
                return Err(ContainerError::ShapeMismatch {
                    this: value.shape().to_string(),
                    other: other_value.shape().to_string(),
                }
                .into());
            }
            values.insert(key.clone(), value.merge_box(other_value.as_ref())?);
        }
        Ok(Box::new(UntypedLabel {
            values,
            entries: self.entries + other.entries,
        }))
    }

    fn equals_box(&self, other: &dyn Primitive<D>, tol: &Tolerance) -> bool {
        let Some(other) = other.as_any().downcast_ref::<UntypedLabel<D>>() else {
            return false;
        };
        tol.close(self.entries, other.entries)
            && self.values.len() == other.values.len()
            && self.values.iter().all(|(k, v)| {
                other.values.get(k).is_some_and(|o| v.equals_box(o.as_ref(), tol))
            })
    }

    fn to_document(&self) -> Value {
        let mut data = serde_json::Map::new();
        for (key, value) in &self.values {
            data.insert(
                key.clone(),
                json!({
                    "type": value.type_name(),
                    "data": value.to_document(),
                }),
            );
        }
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
    let inner_map = crate::doc::field(data, "data", path)?
        .as_object()
        .ok_or_else(|| crate::error::FormatError::WrongType {
            path: path.to_string(),
            field: "data",
            expected: "object",
        })?;
    let mut values = BTreeMap::new();
    for (key, entry) in inner_map {
        let entry_path = format!("{path}.data.{key}");
        let type_name = crate::doc::as_str(entry, "type", &entry_path)?;
        let body = crate::doc::field(entry, "data", &entry_path)?;
        let shell = crate::container::wrap_document(type_name, body.clone());
        values.insert(key.clone(), registry.from_document(&shell, &format!("{entry_path}.data"))?);
    }
    Ok(Box::new(UntypedLabel { values, entries }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitives::average::Average;
    use crate::primitives::count::Count;
    use crate::quantity::Quantity;

    #[test]
    fn permits_heterogeneous_inner_shapes() {
        let mut values: BTreeMap<String, Box<dyn Primitive<f64>>> = BTreeMap::new();
        values.insert("count".into(), Box::new(Count::new()));
        values.insert(
            "average".into(),
            Box::new(Average::new(Quantity::from_fn(Some("x"), |d: &f64| *d))),
        );
        let mut label = UntypedLabel::new(values).unwrap();
        label.fill(&3.0, 1.0).unwrap();
        assert_eq!(label.get("count").unwrap().entries(), 1.0);
        assert_eq!(label.get("average").unwrap().entries(), 1.0);
    }
}
