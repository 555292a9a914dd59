//! `Select`: a weighted gate, `w' = w·q(x)` forwarded to an inner aggregator
//! when positive (§3, §4.F).

use crate::container::{Primitive, Shape};
use crate::error::{ContainerError, Result};
use crate::numeric::Tolerance;
use crate::quantity::Quantity;
use serde_json::{json, Value};
use std::any::Any;
use std::fmt;

pub struct Select<D> {
    quantity: Quantity<D>,
    cut: Box<dyn Primitive<D>>,
    entries: f64,
}

impl<D> Select<D> {
    pub fn new(quantity: Quantity<D>, cut: Box<dyn Primitive<D>>) -> Self {
        Select {
            quantity,
            cut,
            entries: 0.0,
        }
    }

    pub fn cut(&self) -> &dyn Primitive<D> {
        self.cut.as_ref()
    }
}

impl<D> Clone for Select<D> {
    fn clone(&self) -> Self {
        Select {
            quantity: self.quantity.clone(),
            cut: self.cut.clone_box(),
            entries: self.entries,
        }
    }
}

impl<D> fmt::Debug for Select<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Select")
            .field("cut", &self.cut)
            .field("entries", &self.entries)
            .finish()
    }
}

impl<D: 'static> Primitive<D> for Select<D> {
    fn type_name(&self) -> &'static str {
        "Select"
    }

    fn entries(&self) -> f64 {
        self.entries
    }

    fn fill(&mut self, datum: &D, weight: f64) -> Result<()> {
        let q = self.quantity.eval_f64(datum)?;
        let w_prime = weight * q;
        if w_prime > 0.0 {
            self.cut.fill(datum, w_prime)?;
        }
        self.entries += weight;
        Ok(())
    }

    fn shape(&self) -> Shape {
        Shape::Select {
            inner: Box::new(self.cut.shape()),
        }
    }

    fn zero_box(&self) -> Box<dyn Primitive<D>> {
        Box::new(Select {
            quantity: self.quantity.clone(),
            cut: self.cut.zero_box(),
            entries: 0.0,
        })
    }

    fn merge_box(&self, other: &dyn Primitive<D>) -> Result<Box<dyn Primitive<D>>> {
        let other = other.as_any().downcast_ref::<Select<D>>().ok_or_else(|| ContainerError::ShapeMismatch {
            this: self.shape().to_string(),
            other: other.shape().to_string(),
        })?;
        Ok(Box::new(Select {
            quantity: self.quantity.clone(),
            cut: self.cut.merge_box(other.cut.as_ref())?,
            entries: self.entries + other.entries,
        }))
    }

    fn equals_box(&self, other: &dyn Primitive<D>, tol: &Tolerance) -> bool {
        other.as_any().downcast_ref::<Select<D>>().is_some_and(|o| {
            tol.close(self.entries, o.entries) && self.cut.equals_box(o.cut.as_ref(), tol)
        })
    }

    fn to_document(&self) -> Value {
        let mut body = json!({
            "entries": crate::numeric::encode_number(self.entries),
            "type": self.cut.type_name(),
            "data": self.cut.to_document(),
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
    let type_name = crate::doc::as_str(data, "type", path)?;
    let inner_body = crate::doc::field(data, "data", path)?;
    let cut = registry.from_document(
        &crate::container::wrap_document(type_name, inner_body.clone()),
        &format!("{path}.data"),
    )?;
    Ok(Box::new(Select {
        quantity: crate::deserialized_quantity(name),
        cut,
        entries,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitives::count::Count;

    #[test]
    fn max_with_zero_example_from_spec() {
        let q = Quantity::from_fn(Some("clamped"), |d: &f64| d.max(0.0));
        let mut select = Select::new(q, Box::new(Count::<f64>::new()));
        select.fill(&-2.0, 1.0).unwrap();
        select.fill(&3.0, 1.0).unwrap();
        assert_eq!(select.entries(), 2.0);
        assert_eq!(select.cut().entries(), 3.0);
    }
}
