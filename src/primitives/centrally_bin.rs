//! `CentrallyBin`: nearest-center routing over a fixed, sorted list of
//! centers decided at construction (§3, §4.E).

use crate::container::{Primitive, Shape};
use crate::error::{ConfigError, ContainerError, Result};
use crate::numeric::Tolerance;
use crate::quantity::Quantity;
use serde_json::{json, Value};
use std::any::Any;
use std::fmt;

pub struct CentrallyBin<D> {
    quantity: Quantity<D>,
    centers: Vec<f64>,
    values: Vec<Box<dyn Primitive<D>>>,
    nanflow: Box<dyn Primitive<D>>,
    entries: f64,
}

impl<D> CentrallyBin<D> {
    pub fn new(mut centers: Vec<f64>, quantity: Quantity<D>, template: &dyn Primitive<D>) -> Result<Self> {
        if centers.is_empty() {
            return Err(ConfigError::InvalidConstruction("CentrallyBin requires at least one center".into()).into());
        }
        centers.sort_by(|a, b| a.partial_cmp(b).expect("centers must be finite and comparable"));
        if centers.windows(2).any(|w| w[0] == w[1]) {
            return Err(ConfigError::InvalidConstruction("CentrallyBin centers must be distinct".into()).into());
        }
        let values = centers.iter().map(|_| template.zero_box()).collect();
        Ok(CentrallyBin {
            quantity,
            centers,
            values,
            nanflow: template.zero_box(),
            entries: 0.0,
        })
    }

    pub fn centers(&self) -> &[f64] {
        &self.centers
    }

    pub fn value(&self, index: usize) -> &dyn Primitive<D> {
        self.values[index].as_ref()
    }

    /// Index of the center closest to `x`; ties break to the lower center.
    fn closest_index(&self, x: f64) -> usize {
        let mut best = 0;
        let mut best_dist = f64::INFINITY;
        for (i, &center) in self.centers.iter().enumerate() {
            let dist = (x - center).abs();
            if dist < best_dist {
                best_dist = dist;
                best = i;
            }
        }
        best
    }
}

impl<D> Clone for CentrallyBin<D> {
    fn clone(&self) -> Self {
        CentrallyBin {
            quantity: self.quantity.clone(),
            centers: self.centers.clone(),
            values: self.values.iter().map(|v| v.clone_box()).collect(),
            nanflow: self.nanflow.clone_box(),
            entries: self.entries,
        }
    }
}

impl<D> fmt::Debug for CentrallyBin<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CentrallyBin")
            .field("centers", &self.centers)
            .field("entries", &self.entries)
            .finish()
    }
}

impl<D: 'static> Primitive<D> for CentrallyBin<D> {
    fn type_name(&self) -> &'static str {
        "CentrallyBin"
    }

    fn entries(&self) -> f64 {
        self.entries
    }

    fn fill(&mut self, datum: &D, weight: f64) -> Result<()> {
        let x = self.quantity.eval_f64(datum)?;
        if weight > 0.0 {
            if x.is_nan() {
                self.nanflow.fill(datum, weight)?;
            } else {
                let index = self.closest_index(x);
                self.values[index].fill(datum, weight)?;
            }
        }
        self.entries += weight;
        Ok(())
    }

    fn shape(&self) -> Shape {
        Shape::CentrallyBin {
            centers: self.centers.clone(),
            inner: Box::new(self.values[0].shape()),
        }
    }

    fn zero_box(&self) -> Box<dyn Primitive<D>> {
        Box::new(CentrallyBin {
            quantity: self.quantity.clone(),
            centers: self.centers.clone(),
            values: self.values.iter().map(|v| v.zero_box()).collect(),
            nanflow: self.nanflow.zero_box(),
            entries: 0.0,
        })
    }

    fn merge_box(&self, other: &dyn Primitive<D>) -> Result<Box<dyn Primitive<D>>> {
        let other = other
            .as_any()
            .downcast_ref::<CentrallyBin<D>>()
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
        Ok(Box::new(CentrallyBin {
            quantity: self.quantity.clone(),
            centers: self.centers.clone(),
            values,
            nanflow: self.nanflow.merge_box(other.nanflow.as_ref())?,
            entries: self.entries + other.entries,
        }))
    }

    fn equals_box(&self, other: &dyn Primitive<D>, tol: &Tolerance) -> bool {
        let Some(other) = other.as_any().downcast_ref::<CentrallyBin<D>>() else {
            return false;
        };
        if self.centers.len() != other.centers.len()
            || !self
                .centers
                .iter()
                .zip(&other.centers)
                .all(|(a, b)| tol.close(*a, *b))
            || !tol.close(self.entries, other.entries)
            || !self.nanflow.equals_box(other.nanflow.as_ref(), tol)
        {
            return false;
        }
        self.values
            .iter()
            .zip(&other.values)
            .all(|(a, b)| a.equals_box(b.as_ref(), tol))
    }

    fn to_document(&self) -> Value {
        let bins: Vec<Value> = self
            .centers
            .iter()
            .zip(&self.values)
            .map(|(center, value)| {
                json!({
                    "center": crate::numeric::encode_number(*center),
                    "data": value.to_document(),
                })
            })
            .collect();
        let mut body = json!({
            "entries": crate::numeric::encode_number(self.entries),
            "values:type": self.values[0].type_name(),
            "bins": bins,
            "nanflow:type": self.nanflow.type_name(),
            "nanflow": self.nanflow.to_document(),
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

    let shell = |body: &Value| -> Value { crate::container::wrap_document(values_type, body.clone()) };

    let nanflow_body = crate::doc::field(data, "nanflow", path)?;
    let nanflow = registry.from_document(&shell(nanflow_body), &format!("{path}.nanflow"))?;

    let bins = crate::doc::field(data, "bins", path)?
        .as_array()
        .ok_or_else(|| crate::error::FormatError::WrongType {
            path: path.to_string(),
            field: "bins",
            expected: "array",
        })?;
    let mut centers = Vec::with_capacity(bins.len());
    let mut values = Vec::with_capacity(bins.len());
    for (i, bin) in bins.iter().enumerate() {
        let bin_path = format!("{path}.bins[{i}]");
        let center = crate::doc::as_f64(bin, "center", &bin_path)?;
        let body = crate::doc::field(bin, "data", &bin_path)?;
        centers.push(center);
        values.push(registry.from_document(&shell(body), &format!("{bin_path}.data"))?);
    }

    Ok(Box::new(CentrallyBin {
        quantity: crate::deserialized_quantity(name),
        centers,
        values,
        nanflow,
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
    fn routes_to_nearest_center_with_lower_tiebreak() {
        let template = Count::<f64>::new();
        let mut cb = CentrallyBin::new(vec![0.0, 10.0], identity(), &template).unwrap();
        cb.fill(&4.0, 1.0).unwrap();
        cb.fill(&5.0, 1.0).unwrap();
        cb.fill(&6.0, 1.0).unwrap();
        assert_eq!(cb.value(0).entries(), 2.0);
        assert_eq!(cb.value(1).entries(), 1.0);
        assert_eq!(cb.entries(), 3.0);
    }

    #[test]
    fn rejects_empty_or_duplicate_centers() {
        let template = Count::<f64>::new();
        assert!(CentrallyBin::new(vec![], identity(), &template).is_err());
        assert!(CentrallyBin::new(vec![1.0, 1.0], identity(), &template).is_err());
    }

    #[test]
    fn nan_routes_to_nanflow() {
        let template = Count::<f64>::new();
        let mut cb = CentrallyBin::new(vec![0.0, 1.0], identity(), &template).unwrap();
        cb.fill(&f64::NAN, 1.0).unwrap();
        assert_eq!(cb.value(0).entries(), 0.0);
        assert_eq!(cb.value(1).entries(), 0.0);
        assert_eq!(cb.entries(), 1.0);
    }
}
