//! `Bin`: a dense, fixed-width histogram with under/over/nan flows (§3, §4.E).

use crate::container::{Primitive, Shape};
use crate::error::{ConfigError, ContainerError, Result};
use crate::numeric::Tolerance;
use crate::quantity::Quantity;
use serde_json::{json, Value};
use std::any::Any;
use std::fmt;

pub struct Bin<D> {
    quantity: Quantity<D>,
    low: f64,
    high: f64,
    values: Vec<Box<dyn Primitive<D>>>,
    underflow: Box<dyn Primitive<D>>,
    overflow: Box<dyn Primitive<D>>,
    nanflow: Box<dyn Primitive<D>>,
    entries: f64,
}

impl<D: 'static> Bin<D> {
    /// `num` equal-width bins covering `[low, high)`; `template` is cloned
    /// to build the `num` bins plus the three flows, all starting at
    /// identity state.
    pub fn new(
        num: usize,
        low: f64,
        high: f64,
        quantity: Quantity<D>,
        template: &dyn Primitive<D>,
    ) -> Result<Self> {
        if num == 0 {
            return Err(ConfigError::InvalidConstruction("Bin requires num > 0".to_string()).into());
        }
        if !(low < high) {
            return Err(ConfigError::InvalidConstruction("Bin requires low < high".to_string()).into());
        }
        let zero = template.zero_box();
        let values = (0..num).map(|_| zero.zero_box()).collect();
        Ok(Bin {
            quantity,
            low,
            high,
            values,
            underflow: zero.zero_box(),
            overflow: zero.zero_box(),
            nanflow: zero.zero_box(),
            entries: 0.0,
        })
    }

    pub fn num(&self) -> usize {
        self.values.len()
    }

    pub fn low(&self) -> f64 {
        self.low
    }

    pub fn high(&self) -> f64 {
        self.high
    }

    pub fn values(&self) -> &[Box<dyn Primitive<D>>] {
        &self.values
    }

    pub fn underflow(&self) -> &dyn Primitive<D> {
        self.underflow.as_ref()
    }

    pub fn overflow(&self) -> &dyn Primitive<D> {
        self.overflow.as_ref()
    }

    pub fn nanflow(&self) -> &dyn Primitive<D> {
        self.nanflow.as_ref()
    }

    fn bin_index(&self, x: f64) -> usize {
        let frac = (x - self.low) / (self.high - self.low);
        let i = (self.values.len() as f64 * frac).floor();
        (i as usize).min(self.values.len() - 1)
    }
}

impl<D> Clone for Bin<D> {
    fn clone(&self) -> Self {
        Bin {
            quantity: self.quantity.clone(),
            low: self.low,
            high: self.high,
            values: self.values.clone(),
            underflow: self.underflow.clone(),
            overflow: self.overflow.clone(),
            nanflow: self.nanflow.clone(),
            entries: self.entries,
        }
    }
}

impl<D> fmt::Debug for Bin<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bin")
            .field("low", &self.low)
            .field("high", &self.high)
            .field("num", &self.values.len())
            .field("entries", &self.entries)
            .finish()
    }
}

impl<D: 'static> Primitive<D> for Bin<D> {
    fn type_name(&self) -> &'static str {
        "Bin"
    }

    fn entries(&self) -> f64 {
        self.entries
    }

    fn fill(&mut self, datum: &D, weight: f64) -> Result<()> {
        let x = self.quantity.eval_f64(datum)?;
        if x.is_nan() {
            self.nanflow.fill(datum, weight)?;
        } else if x < self.low {
            self.underflow.fill(datum, weight)?;
        } else if x >= self.high {
            self.overflow.fill(datum, weight)?;
        } else {
            let i = self.bin_index(x);
            self.values[i].fill(datum, weight)?;
        }
        self.entries += weight;
        Ok(())
    }

    fn shape(&self) -> Shape {
        Shape::Bin {
            low: self.low,
            high: self.high,
            num: self.values.len(),
            inner: Box::new(self.values[0].shape()),
        }
    }

    fn zero_box(&self) -> Box<dyn Primitive<D>> {
        let zero_inner = self.values[0].zero_box();
        Box::new(Bin {
            quantity: self.quantity.clone(),
            low: self.low,
            high: self.high,
            values: (0..self.values.len()).map(|_| zero_inner.zero_box()).collect(),
            underflow: self.underflow.zero_box(),
            overflow: self.overflow.zero_box(),
            nanflow: self.nanflow.zero_box(),
            entries: 0.0,
        })
    }

    fn merge_box(&self, other: &dyn Primitive<D>) -> Result<Box<dyn Primitive<D>>> {
        let other = other.as_any().downcast_ref::<Bin<D>>().ok_or_else(|| ContainerError::ShapeMismatch {
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
        let values = self
            .values
            .iter()
            .zip(other.values.iter())
            .map(|(a, b)| a.merge_box(b.as_ref()))
            .collect::<Result<Vec<_>>>()?;
        Ok(Box::new(Bin {
            quantity: self.quantity.clone(),
            low: self.low,
            high: self.high,
            values,
            underflow: self.underflow.merge_box(other.underflow.as_ref())?,
            overflow: self.overflow.merge_box(other.overflow.as_ref())?,
            nanflow: self.nanflow.merge_box(other.nanflow.as_ref())?,
            entries: self.entries + other.entries,
        }))
    }

    fn equals_box(&self, other: &dyn Primitive<D>, tol: &Tolerance) -> bool {
        match other.as_any().downcast_ref::<Bin<D>>() {
            Some(o) => {
                tol.close(self.low, o.low)
                    && tol.close(self.high, o.high)
                    && tol.close(self.entries, o.entries)
                    && self.values.len() == o.values.len()
                    && self.values.iter().zip(o.values.iter()).all(|(a, b)| a.equals_box(b.as_ref(), tol))
                    && self.underflow.equals_box(o.underflow.as_ref(), tol)
                    && self.overflow.equals_box(o.overflow.as_ref(), tol)
                    && self.nanflow.equals_box(o.nanflow.as_ref(), tol)
            }
            None => false,
        }
    }

    fn to_document(&self) -> Value {
        let values_type = self.values[0].type_name();
        let values_docs: Vec<Value> = self.values.iter().map(|v| v.to_document()).collect();
        json!({
            "low": crate::numeric::encode_number(self.low),
            "high": crate::numeric::encode_number(self.high),
            "entries": crate::numeric::encode_number(self.entries),
            "values:type": values_type,
            "values": values_docs,
            "underflow:type": self.underflow.type_name(),
            "underflow": self.underflow.to_document(),
            "overflow:type": self.overflow.type_name(),
            "overflow": self.overflow.to_document(),
            "nanflow:type": self.nanflow.type_name(),
            "nanflow": self.nanflow.to_document(),
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
    let low = crate::doc::as_f64(data, "low", path)?;
    let high = crate::doc::as_f64(data, "high", path)?;
    let entries = crate::doc::as_f64(data, "entries", path)?;
    let values_type = crate::doc::as_str(data, "values:type", path)?;
    let values_array = crate::doc::field(data, "values", path)?
        .as_array()
        .ok_or_else(|| crate::error::FormatError::WrongType {
            path: path.to_string(),
            field: "values",
            expected: "array",
        })?;

    let shell = |type_name: &str, body: &Value| json!({ "version": crate::doc::CURRENT_VERSION, "type": type_name, "data": body });

    let mut values = Vec::with_capacity(values_array.len());
    for (i, body) in values_array.iter().enumerate() {
        let inner_path = format!("{path}.values[{i}]");
        values.push(registry.from_document(&shell(values_type, body), &inner_path)?);
    }

    let underflow_type = crate::doc::as_str(data, "underflow:type", path)?;
    let underflow = registry.from_document(
        &shell(underflow_type, crate::doc::field(data, "underflow", path)?),
        &format!("{path}.underflow"),
    )?;
    let overflow_type = crate::doc::as_str(data, "overflow:type", path)?;
    let overflow = registry.from_document(
        &shell(overflow_type, crate::doc::field(data, "overflow", path)?),
        &format!("{path}.overflow"),
    )?;
    let nanflow_type = crate::doc::as_str(data, "nanflow:type", path)?;
    let nanflow = registry.from_document(
        &shell(nanflow_type, crate::doc::field(data, "nanflow", path)?),
        &format!("{path}.nanflow"),
    )?;

    Ok(Box::new(Bin {
        quantity: crate::deserialized_quantity(None),
        low,
        high,
        values,
        underflow,
        overflow,
        nanflow,
        entries,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitives::count::Count;

    fn make_bin() -> Bin<f64> {
        let quantity = Quantity::from_fn(Some("x"), |d: &f64| *d);
        Bin::new(100, -3.0, 3.0, quantity, &Count::<f64>::new()).unwrap()
    }

    #[test]
    fn seven_point_example_from_spec() {
        let mut bin = make_bin();
        for x in [-4.0, -3.0, 0.0, 2.9999999, 3.0, 5.0, f64::NAN] {
            bin.fill(&x, 1.0).unwrap();
        }
        assert_eq!(bin.underflow().entries(), 1.0);
        assert_eq!(bin.values()[0].entries(), 1.0);
        assert_eq!(bin.values()[50].entries(), 1.0);
        assert_eq!(bin.values()[99].entries(), 1.0);
        assert_eq!(bin.overflow().entries(), 2.0);
        assert_eq!(bin.nanflow().entries(), 1.0);
        assert_eq!(bin.entries(), 7.0);
    }

    #[test]
    fn construction_rejects_bad_geometry() {
        let q = Quantity::from_fn(Some("x"), |d: &f64| *d);
        assert!(Bin::new(0, -3.0, 3.0, q.clone(), &Count::<f64>::new()).is_err());
        assert!(Bin::new(10, 3.0, -3.0, q, &Count::<f64>::new()).is_err());
    }

    #[test]
    fn merge_rejects_mismatched_geometry() {
        let q = Quantity::from_fn(Some("x"), |d: &f64| *d);
        let a = Bin::new(100, -3.0, 3.0, q.clone(), &Count::<f64>::new()).unwrap();
        let b = Bin::new(50, -3.0, 3.0, q, &Count::<f64>::new()).unwrap();
        assert!(a.merge_box(&b).is_err());
    }
}
