//! `SparselyBin`: fixed-width bins over a growable integer index, materialized
//! lazily from a stored template (§3, §4.E).

use crate::container::{Primitive, Shape};
use crate::error::{ConfigError, ContainerError, Result};
use crate::numeric::Tolerance;
use crate::quantity::Quantity;
use hashbrown::HashMap;
use serde_json::{json, Value};
use std::any::Any;
use std::fmt;

pub struct SparselyBin<D> {
    quantity: Quantity<D>,
    bin_width: f64,
    origin: f64,
    template: Box<dyn Primitive<D>>,
    bins: HashMap<i64, Box<dyn Primitive<D>>>,
    nanflow: Box<dyn Primitive<D>>,
    entries: f64,
}

impl<D> SparselyBin<D> {
    pub fn new(bin_width: f64, origin: f64, quantity: Quantity<D>, template: &dyn Primitive<D>) -> Result<Self> {
        if !(bin_width > 0.0) {
            return Err(ConfigError::InvalidConstruction("SparselyBin requires binWidth > 0".into()).into());
        }
        Ok(SparselyBin {
            quantity,
            bin_width,
            origin,
            template: template.zero_box(),
            bins: HashMap::new(),
            nanflow: template.zero_box(),
            entries: 0.0,
        })
    }

    pub fn bin_width(&self) -> f64 {
        self.bin_width
    }

    pub fn origin(&self) -> f64 {
        self.origin
    }

    fn bin_index(&self, x: f64) -> i64 {
        ((x - self.origin) / self.bin_width).floor() as i64
    }

    /// Inner container for bin `index`, or `None` if never filled.
    pub fn bin(&self, index: i64) -> Option<&dyn Primitive<D>> {
        self.bins.get(&index).map(|b| b.as_ref())
    }

    pub fn num_filled(&self) -> usize {
        self.bins.len()
    }
}

impl<D> Clone for SparselyBin<D> {
    fn clone(&self) -> Self {
        SparselyBin {
            quantity: self.quantity.clone(),
            bin_width: self.bin_width,
            origin: self.origin,
            template: self.template.clone_box(),
            bins: self.bins.iter().map(|(k, v)| (*k, v.clone_box())).collect(),
            nanflow: self.nanflow.clone_box(),
            entries: self.entries,
        }
    }
}

impl<D> fmt::Debug for SparselyBin<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SparselyBin")
            .field("bin_width", &self.bin_width)
            .field("origin", &self.origin)
            .field("num_filled", &self.bins.len())
            .field("entries", &self.entries)
            .finish()
    }
}

impl<D: 'static> Primitive<D> for SparselyBin<D> {
    fn type_name(&self) -> &'static str {
        "SparselyBin"
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
                let index = self.bin_index(x);
                let template = &self.template;
                let bin = self.bins.entry(index).or_insert_with(|| template.zero_box());
                bin.fill(datum, weight)?;
            }
        }
        self.entries += weight;
        Ok(())
    }

    fn shape(&self) -> Shape {
        Shape::SparselyBin {
            bin_width: self.bin_width,
            origin: self.origin,
            inner: Box::new(self.template.shape()),
        }
    }

    fn zero_box(&self) -> Box<dyn Primitive<D>> {
        Box::new(SparselyBin {
            quantity: self.quantity.clone(),
            bin_width: self.bin_width,
            origin: self.origin,
            template: self.template.clone_box(),
            bins: HashMap::new(),
            nanflow: self.template.zero_box(),
            entries: 0.0,
        })
    }

    fn merge_box(&self, other: &dyn Primitive<D>) -> Result<Box<dyn Primitive<D>>> {
        let other = other
            .as_any()
            .downcast_ref::<SparselyBin<D>>()
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
        let mut bins: HashMap<i64, Box<dyn Primitive<D>>> = HashMap::new();
        for (index, bin) in &self.bins {
            bins.insert(*index, bin.clone_box());
        }
        for (index, bin) in &other.bins {
            match bins.remove(index) {
                Some(existing) => bins.insert(*index, existing.merge_box(bin.as_ref())?),
                None => bins.insert(*index, bin.clone_box()),
            };
        }
        Ok(Box::new(SparselyBin {
            quantity: self.quantity.clone(),
            bin_width: self.bin_width,
            origin: self.origin,
            template: self.template.clone_box(),
            bins,
            nanflow: self.nanflow.merge_box(other.nanflow.as_ref())?,
            entries: self.entries + other.entries,
        }))
    }

    fn equals_box(&self, other: &dyn Primitive<D>, tol: &Tolerance) -> bool {
        let Some(other) = other.as_any().downcast_ref::<SparselyBin<D>>() else {
            return false;
        };
        if !tol.close(self.bin_width, other.bin_width)
            || !tol.close(self.origin, other.origin)
            || !tol.close(self.entries, other.entries)
            || self.bins.len() != other.bins.len()
            || !self.nanflow.equals_box(other.nanflow.as_ref(), tol)
        {
            return false;
        }
        self.bins.iter().all(|(index, bin)| {
            other
                .bins
                .get(index)
                .is_some_and(|o| bin.equals_box(o.as_ref(), tol))
        })
    }

    fn to_document(&self) -> Value {
        let mut bins = serde_json::Map::new();
        for (index, bin) in &self.bins {
            bins.insert(index.to_string(), bin.to_document());
        }
        let mut body = json!({
            "binWidth": crate::numeric::encode_number(self.bin_width),
            "origin": crate::numeric::encode_number(self.origin),
            "entries": crate::numeric::encode_number(self.entries),
            "values:type": self.template.type_name(),
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
    let bin_width = crate::doc::as_f64(data, "binWidth", path)?;
    let origin = crate::doc::as_f64(data, "origin", path)?;
    let entries = crate::doc::as_f64(data, "entries", path)?;
    let name = data.get("name").and_then(Value::as_str);
    let values_type = crate::doc::as_str(data, "values:type", path)?;

    let shell = |type_name: &str, body: &Value| -> Value {
        crate::container::wrap_document(type_name, body.clone())
    };

    let nanflow_body = crate::doc::field(data, "nanflow", path)?;
    let nanflow = registry.from_document(&shell(values_type, nanflow_body), &format!("{path}.nanflow"))?;

    let bins_body = crate::doc::field(data, "bins", path)?;
    let bins_obj = bins_body
        .as_object()
        .ok_or_else(|| crate::error::FormatError::WrongType {
            path: path.to_string(),
            field: "bins",
            expected: "object",
        })?;
    let mut bins = HashMap::new();
    for (key, body) in bins_obj {
        let index: i64 = key
            .parse()
            .map_err(|_| crate::error::FormatError::Malformed {
                path: path.to_string(),
                message: format!("bin key `{key}` is not an integer"),
            })?;
        let bin = registry.from_document(&shell(values_type, body), &format!("{path}.bins.{key}"))?;
        bins.insert(index, bin);
    }

    Ok(Box::new(SparselyBin {
        quantity: crate::deserialized_quantity(name),
        bin_width,
        origin,
        template: nanflow.zero_box(),
        bins,
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
    fn width_point_one_example_from_spec() {
        let template = Count::<f64>::new();
        let mut sb = SparselyBin::new(0.1, 0.0, identity(), &template).unwrap();
        for x in [0.0, 0.05, 0.1, -0.05] {
            sb.fill(&x, 1.0).unwrap();
        }
        assert_eq!(sb.bin(0).unwrap().entries(), 2.0);
        assert_eq!(sb.bin(1).unwrap().entries(), 1.0);
        assert_eq!(sb.bin(-1).unwrap().entries(), 1.0);
        assert_eq!(sb.entries(), 4.0);
    }

    #[test]
    fn rejects_nonpositive_width() {
        let template = Count::<f64>::new();
        assert!(SparselyBin::new(0.0, 0.0, identity(), &template).is_err());
    }

    #[test]
    fn nan_routes_to_nanflow() {
        let template = Count::<f64>::new();
        let mut sb = SparselyBin::new(1.0, 0.0, identity(), &template).unwrap();
        sb.fill(&f64::NAN, 1.0).unwrap();
        assert_eq!(sb.num_filled(), 0);
        assert_eq!(sb.entries(), 1.0);
    }

    #[test]
    fn merge_unions_bins() {
        let template = Count::<f64>::new();
        let mut a = SparselyBin::new(1.0, 0.0, identity(), &template).unwrap();
        a.fill(&0.5, 1.0).unwrap();
        let mut b = SparselyBin::new(1.0, 0.0, identity(), &template).unwrap();
        b.fill(&0.5, 1.0).unwrap();
        b.fill(&5.5, 1.0).unwrap();
        let merged = a.merge_box(&b).unwrap();
        let merged = merged.as_any().downcast_ref::<SparselyBin<f64>>().unwrap();
        assert_eq!(merged.bin(0).unwrap().entries(), 2.0);
        assert_eq!(merged.bin(5).unwrap().entries(), 1.0);
        assert_eq!(merged.entries(), 3.0);
    }
}
