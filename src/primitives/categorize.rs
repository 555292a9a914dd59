//! `Categorize`: a string-keyed histogram, keys materialized lazily from a
//! stored template the first time they are observed (§3, §4.I).

use crate::container::{Primitive, Shape};
use crate::error::{ContainerError, Result};
use crate::numeric::Tolerance;
use crate::quantity::Quantity;
use serde_json::{json, Value};
use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;

pub struct Categorize<D> {
    quantity: Quantity<D>,
    template: Box<dyn Primitive<D>>,
    values: BTreeMap<String, Box<dyn Primitive<D>>>,
    entries: f64,
}

impl<D> Categorize<D> {
    pub fn new(quantity: Quantity<D>, template: &dyn Primitive<D>) -> Self {
        Categorize {
            quantity,
            template: template.zero_box(),
            values: BTreeMap::new(),
            entries: 0.0,
        }
    }

    pub fn get(&self, key: &str) -> Option<&dyn Primitive<D>> {
        self.values.get(key).map(|v| v.as_ref())
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }
}

impl<D> Clone for Categorize<D> {
    fn clone(&self) -> Self {
        Categorize {
            quantity: self.quantity.clone(),
            template: self.template.clone_box(),
            values: self.values.iter().map(|(k, v)| (k.clone(), v.clone_box())).collect(),
            entries: self.entries,
        }
    }
}

impl<D> fmt::Debug for Categorize<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Categorize")
            .field("keys", &self.values.keys().collect::<Vec<_>>())
            .field("entries", &self.entries)
            .finish()
    }
}

impl<D: 'static> Primitive<D> for Categorize<D> {
    fn type_name(&self) -> &'static str {
        "Categorize"
    }

    fn entries(&self) -> f64 {
        self.entries
    }

    fn fill(&mut self, datum: &D, weight: f64) -> Result<()> {
        let key = self.quantity.eval(datum)?.as_str();
        if weight > 0.0 {
            let template = &self.template;
            let bucket = self.values.entry(key).or_insert_with(|| template.zero_box());
            bucket.fill(datum, weight)?;
        }
        self.entries += weight;
        Ok(())
    }

    fn shape(&self) -> Shape {
        Shape::Categorize {
            inner: Box::new(self.template.shape()),
        }
    }

    fn zero_box(&self) -> Box<dyn Primitive<D>> {
        Box::new(Categorize {
            quantity: self.quantity.clone(),
            template: self.template.clone_box(),
            values: BTreeMap::new(),
            entries: 0.0,
        })
    }

    fn merge_box(&self, other: &dyn Primitive<D>) -> Result<Box<dyn Primitive<D>>> {
        let other = other
            .as_any()
            .downcast_ref::<Categorize<D>>()
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
        let mut values: BTreeMap<String, Box<dyn Primitive<D>>> =
            self.values.iter().map(|(k, v)| (k.clone(), v.clone_box())).collect();
        for (key, bucket) in &other.values {
            match values.remove(key) {
                Some(existing) => values.insert(key.clone(), existing.merge_box(bucket.as_ref())?),
                None => values.insert(key.clone(), bucket.clone_box()),
            };
        }
        Ok(Box::new(Categorize {
            quantity: self.quantity.clone(),
            template: self.template.clone_box(),
            values,
            entries: self.entries + other.entries,
        }))
    }

    fn equals_box(&self, other: &dyn Primitive<D>, tol: &Tolerance) -> bool {
        let Some(other) = other.as_any().downcast_ref::<Categorize<D>>() else {
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
            data.insert(key.clone(), value.to_document());
        }
        let mut body = json!({
            "entries": crate::numeric::encode_number(self.entries),
            "values:type": self.template.type_name(),
            "values": data,
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
    let values_obj = crate::doc::field(data, "values", path)?
        .as_object()
        .ok_or_else(|| crate::error::FormatError::WrongType {
            path: path.to_string(),
            field: "values",
            expected: "object",
        })?;
    let mut values = BTreeMap::new();
    for (key, body) in values_obj {
        let shell = crate::container::wrap_document(values_type, body.clone());
        values.insert(key.clone(), registry.from_document(&shell, &format!("{path}.values.{key}"))?);
    }
    let template = match values.values().next() {
        Some(v) => v.zero_box(),
        None => {
            return Err(crate::error::FormatError::Malformed {
                path: path.to_string(),
                message: "Categorize with no keys cannot recover its template shape".to_string(),
            }
            .into())
        }
    };
    Ok(Box::new(Categorize {
        quantity: crate::deserialized_quantity(name),
        template,
        values,
        entries,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitives::count::Count;

    fn key_of_sign() -> Quantity<f64> {
        Quantity::new(|d: &f64| Ok(crate::quantity::QuantityValue::Text(if *d >= 0.0 { "pos".into() } else { "neg".into() })))
    }

    #[test]
    fn lazily_creates_keys_on_first_observation() {
        let mut cat = Categorize::new(key_of_sign(), &Count::<f64>::new());
        cat.fill(&1.0, 1.0).unwrap();
        cat.fill(&-1.0, 1.0).unwrap();
        cat.fill(&2.0, 1.0).unwrap();
        assert_eq!(cat.get("pos").unwrap().entries(), 2.0);
        assert_eq!(cat.get("neg").unwrap().entries(), 1.0);
        assert_eq!(cat.entries(), 3.0);
    }

    #[test]
    fn merge_unions_keys() {
        let mut a = Categorize::new(key_of_sign(), &Count::<f64>::new());
        a.fill(&1.0, 1.0).unwrap();
        let mut b = Categorize::new(key_of_sign(), &Count::<f64>::new());
        b.fill(&1.0, 1.0).unwrap();
        b.fill(&-1.0, 1.0).unwrap();
        let merged = a.merge_box(&b).unwrap();
        let merged = merged.as_any().downcast_ref::<Categorize<f64>>().unwrap();
        assert_eq!(merged.get("pos").unwrap().entries(), 2.0);
        assert_eq!(merged.get("neg").unwrap().entries(), 1.0);
    }
}
