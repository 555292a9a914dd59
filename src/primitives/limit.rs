//! `Limit`: wraps an inner aggregator with a weight budget. Once the budget
//! is exceeded the container saturates: inner content is discarded and only
//! `entries` continues to advance (§3, §4.F).

use crate::container::{Primitive, Shape};
use crate::error::{ContainerError, Result};
use crate::numeric::Tolerance;
use serde_json::{json, Value};
use std::any::Any;
use std::fmt;

pub struct Limit<D> {
    threshold: f64,
    inner: Box<dyn Primitive<D>>,
    saturated: bool,
    entries: f64,
}

impl<D> Limit<D> {
    pub fn new(threshold: f64, template: &dyn Primitive<D>) -> Self {
        Limit {
            threshold,
            inner: template.zero_box(),
            saturated: false,
            entries: 0.0,
        }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn is_saturated(&self) -> bool {
        self.saturated
    }

    pub fn inner(&self) -> &dyn Primitive<D> {
        self.inner.as_ref()
    }
}

impl<D> Clone for Limit<D> {
    fn clone(&self) -> Self {
        Limit {
            threshold: self.threshold,
            inner: self.inner.clone_box(),
            saturated: self.saturated,
            entries: self.entries,
        }
    }
}

impl<D> fmt::Debug for Limit<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Limit")
            .field("threshold", &self.threshold)
            .field("saturated", &self.saturated)
            .field("entries", &self.entries)
            .finish()
    }
}

impl<D: 'static> Primitive<D> for Limit<D> {
    fn type_name(&self) -> &'static str {
        "Limit"
    }

    fn entries(&self) -> f64 {
        self.entries
    }

    fn fill(&mut self, datum: &D, weight: f64) -> Result<()> {
        if !self.saturated {
            if self.entries + weight > self.threshold {
                log::debug!("Limit saturated at threshold {}", self.threshold);
                self.inner = self.inner.zero_box();
                self.saturated = true;
            } else {
                self.inner.fill(datum, weight)?;
            }
        }
        self.entries += weight;
        Ok(())
    }

    fn shape(&self) -> Shape {
        Shape::Limit {
            threshold: self.threshold,
            inner: Box::new(self.inner.shape()),
        }
    }

    fn zero_box(&self) -> Box<dyn Primitive<D>> {
        Box::new(Limit {
            threshold: self.threshold,
            inner: self.inner.zero_box(),
            saturated: false,
            entries: 0.0,
        })
    }

    fn merge_box(&self, other: &dyn Primitive<D>) -> Result<Box<dyn Primitive<D>>> {
        let other = other.as_any().downcast_ref::<Limit<D>>().ok_or_else(|| ContainerError::ShapeMismatch {
            this: self.shape().to_string(),
            other: other.shape().to_string(),
        })?;
        if self.threshold != other.threshold {
            return Err(ContainerError::ShapeMismatch {
                this: self.shape().to_string(),
                other: other.shape().to_string(),
            }
            .into());
        }
        let entries = self.entries + other.entries;
        let saturated = self.saturated || other.saturated || entries > self.threshold;
        let inner = if saturated {
            self.inner.zero_box()
        } else {
            self.inner.merge_box(other.inner.as_ref())?
        };
        Ok(Box::new(Limit {
            threshold: self.threshold,
            inner,
            saturated,
            entries,
        }))
    }

    fn equals_box(&self, other: &dyn Primitive<D>, tol: &Tolerance) -> bool {
        other.as_any().downcast_ref::<Limit<D>>().is_some_and(|o| {
            tol.close(self.threshold, o.threshold)
                && self.saturated == o.saturated
                && tol.close(self.entries, o.entries)
                && self.inner.equals_box(o.inner.as_ref(), tol)
        })
    }

    fn to_document(&self) -> Value {
        json!({
            "threshold": crate::numeric::encode_number(self.threshold),
            "entries": crate::numeric::encode_number(self.entries),
            "saturated": self.saturated,
            "type": self.inner.type_name(),
            "data": self.inner.to_document(),
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
    let threshold = crate::doc::as_f64(data, "threshold", path)?;
    let entries = crate::doc::as_f64(data, "entries", path)?;
    let saturated = crate::doc::field(data, "saturated", path)?
        .as_bool()
        .ok_or_else(|| crate::error::FormatError::WrongType {
            path: path.to_string(),
            field: "saturated",
            expected: "bool",
        })?;
    let type_name = crate::doc::as_str(data, "type", path)?;
    let inner_body = crate::doc::field(data, "data", path)?;
    let inner = registry.from_document(
        &crate::container::wrap_document(type_name, inner_body.clone()),
        &format!("{path}.data"),
    )?;
    Ok(Box::new(Limit {
        threshold,
        inner,
        saturated,
        entries,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitives::count::Count;

    #[test]
    fn threshold_two_example_from_spec() {
        let mut limit = Limit::new(2.0, &Count::<f64>::new());
        limit.fill(&1.0, 1.0).unwrap();
        limit.fill(&1.0, 1.0).unwrap();
        assert_eq!(limit.inner().entries(), 2.0);
        assert!(!limit.is_saturated());
        limit.fill(&1.0, 1.0).unwrap();
        assert!(limit.is_saturated());
        assert_eq!(limit.inner().entries(), 0.0);
        assert_eq!(limit.entries(), 3.0);
    }

    #[test]
    fn saturation_is_sticky_across_merges() {
        let mut saturated = Limit::new(1.0, &Count::<f64>::new());
        saturated.fill(&1.0, 1.0).unwrap();
        saturated.fill(&1.0, 1.0).unwrap();
        assert!(saturated.is_saturated());

        let fresh = Limit::new(1.0, &Count::<f64>::new());
        let merged = saturated.merge_box(&fresh).unwrap();
        let merged = merged.as_any().downcast_ref::<Limit<f64>>().unwrap();
        assert!(merged.is_saturated());
        assert_eq!(merged.entries(), 2.0);
    }
}
