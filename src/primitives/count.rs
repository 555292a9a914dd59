//! `Count`: just `entries`, optionally scaled on fill (§3, §4.D).

use crate::container::{Primitive, Shape};
use crate::error::{ContainerError, Result};
use crate::numeric::Tolerance;
use crate::quantity::Quantity;
use serde_json::{json, Value};
use std::any::Any;
use std::fmt;

pub struct Count<D> {
    entries: f64,
    transform: Option<Quantity<D>>,
}

impl<D> Count<D> {
    pub fn new() -> Self {
        Count {
            entries: 0.0,
            transform: None,
        }
    }

    /// A `Count` whose fill weight is scaled by `transform(datum)` before
    /// accumulating into `entries`.
    pub fn scaled(transform: Quantity<D>) -> Self {
        Count {
            entries: 0.0,
            transform: Some(transform),
        }
    }
}

impl<D> Default for Count<D> {
    fn default() -> Self {
        Count::new()
    }
}

impl<D> Clone for Count<D> {
    fn clone(&self) -> Self {
        Count {
            entries: self.entries,
            transform: self.transform.clone(),
        }
    }
}

impl<D> fmt::Debug for Count<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Count").field("entries", &self.entries).finish()
    }
}

impl<D: 'static> Primitive<D> for Count<D> {
    fn type_name(&self) -> &'static str {
        "Count"
    }

    fn entries(&self) -> f64 {
        self.entries
    }

    fn fill(&mut self, datum: &D, weight: f64) -> Result<()> {
        let scale = match &self.transform {
            Some(q) => q.eval_f64(datum)?,
            None => 1.0,
        };
        self.entries += weight * scale;
        Ok(())
    }

    fn shape(&self) -> Shape {
        Shape::Leaf("Count")
    }

    fn zero_box(&self) -> Box<dyn Primitive<D>> {
        Box::new(Count {
            entries: 0.0,
            transform: self.transform.clone(),
        })
    }

    fn merge_box(&self, other: &dyn Primitive<D>) -> Result<Box<dyn Primitive<D>>> {
        let other = other.as_any().downcast_ref::<Count<D>>().ok_or_else(|| ContainerError::ShapeMismatch {
            this: self.shape().to_string(),
            other: other.shape().to_string(),
        })?;
        Ok(Box::new(Count {
            entries: self.entries + other.entries,
            transform: self.transform.clone(),
        }))
    }

    fn equals_box(&self, other: &dyn Primitive<D>, tol: &Tolerance) -> bool {
        other
            .as_any()
            .downcast_ref::<Count<D>>()
            .is_some_and(|o| tol.close(self.entries, o.entries))
    }

    fn to_document(&self) -> Value {
        json!({ "entries": crate::numeric::encode_number(self.entries) })
    }

    fn clone_box(&self) -> Box<dyn Primitive<D>> {
        Box::new(self.clone())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

pub fn from_document<D: 'static>(data: &Value, path: &str, _registry: &crate::registry::Registry<D>) -> Result<Box<dyn Primitive<D>>> {
    let entries = crate::doc::as_f64(data, "entries", path)?;
    Ok(Box::new(Count {
        entries,
        transform: None,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fill_accumulates_weight() {
        let mut c = Count::<f64>::new();
        c.fill(&1.0, 1.0).unwrap();
        c.fill(&2.0, 2.0).unwrap();
        assert_eq!(c.entries(), 3.0);
    }

    #[test]
    fn zero_weight_is_a_no_op_but_entries_unchanged() {
        let mut c = Count::<f64>::new();
        c.fill(&1.0, 0.0).unwrap();
        assert_eq!(c.entries(), 0.0);
    }

    #[test]
    fn merge_sums_entries() {
        let mut a = Count::<f64>::new();
        a.fill(&1.0, 3.0).unwrap();
        let mut b = Count::<f64>::new();
        b.fill(&1.0, 4.0).unwrap();
        let merged = a.merge_box(&b).unwrap();
        assert_eq!(merged.entries(), 7.0);
    }

    #[test]
    fn round_trips_through_document() {
        let mut c = Count::<f64>::new();
        c.fill(&1.0, 5.0).unwrap();
        let doc = c.to_document();
        let registry = crate::registry::Registry::<f64>::new();
        let restored: Box<dyn Primitive<f64>> = from_document(&doc, "$", &registry).unwrap();
        assert_eq!(restored.entries(), 5.0);
    }
}
