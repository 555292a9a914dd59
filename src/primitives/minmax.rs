//! `Minimize`/`Maximize`: running extrema, initialized to `+inf`/`-inf` (§3).

use crate::container::{Primitive, Shape};
use crate::error::{ContainerError, Result};
use crate::numeric::Tolerance;
use crate::quantity::Quantity;
use serde_json::{json, Value};
use std::any::Any;
use std::fmt;

macro_rules! extremum_primitive {
    ($name:ident, $type_name:literal, $identity:expr, $combine:expr) => {
        pub struct $name<D> {
            quantity: Quantity<D>,
            value: f64,
            entries: f64,
        }

        impl<D> $name<D> {
            pub fn new(quantity: Quantity<D>) -> Self {
                $name {
                    quantity,
                    value: $identity,
                    entries: 0.0,
                }
            }

            pub fn value(&self) -> f64 {
                self.value
            }
        }

        impl<D> Clone for $name<D> {
            fn clone(&self) -> Self {
                $name {
                    quantity: self.quantity.clone(),
                    value: self.value,
                    entries: self.entries,
                }
            }
        }

        impl<D> fmt::Debug for $name<D> {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.debug_struct($type_name)
                    .field("value", &self.value)
                    .field("entries", &self.entries)
                    .finish()
            }
        }

        impl<D: 'static> Primitive<D> for $name<D> {
            fn type_name(&self) -> &'static str {
                $type_name
            }

            fn entries(&self) -> f64 {
                self.entries
            }

            fn fill(&mut self, datum: &D, weight: f64) -> Result<()> {
                if weight > 0.0 {
                    let x = self.quantity.eval_f64(datum)?;
                    let combine: fn(f64, f64) -> f64 = $combine;
                    self.value = combine(self.value, x);
                }
                self.entries += weight;
                Ok(())
            }

            fn shape(&self) -> Shape {
                Shape::Leaf($type_name)
            }

            fn zero_box(&self) -> Box<dyn Primitive<D>> {
                Box::new($name {
                    quantity: self.quantity.clone(),
                    value: $identity,
                    entries: 0.0,
                })
            }

            fn merge_box(&self, other: &dyn Primitive<D>) -> Result<Box<dyn Primitive<D>>> {
                let other = other.as_any().downcast_ref::<$name<D>>().ok_or_else(|| ContainerError::ShapeMismatch {
                    this: self.shape().to_string(),
                    other: other.shape().to_string(),
                })?;
                let combine: fn(f64, f64) -> f64 = $combine;
                Ok(Box::new($name {
                    quantity: self.quantity.clone(),
                    value: combine(self.value, other.value),
                    entries: self.entries + other.entries,
                }))
            }

            fn equals_box(&self, other: &dyn Primitive<D>, tol: &Tolerance) -> bool {
                other.as_any().downcast_ref::<$name<D>>().is_some_and(|o| {
                    tol.close(self.value, o.value) && tol.close(self.entries, o.entries)
                })
            }

            fn to_document(&self) -> Value {
                let mut body = json!({
                    "value": crate::numeric::encode_number(self.value),
                    "entries": crate::numeric::encode_number(self.entries),
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
    };
}

extremum_primitive!(Minimize, "Minimize", f64::INFINITY, f64::min);
extremum_primitive!(Maximize, "Maximize", f64::NEG_INFINITY, f64::max);

pub fn minimize_from_document<D: 'static>(data: &Value, path: &str, _registry: &crate::registry::Registry<D>) -> Result<Box<dyn Primitive<D>>> {
    let value = crate::doc::as_f64(data, "value", path)?;
    let entries = crate::doc::as_f64(data, "entries", path)?;
    let name = data.get("name").and_then(Value::as_str);
    Ok(Box::new(Minimize {
        quantity: crate::deserialized_quantity(name),
        value,
        entries,
    }))
}

pub fn maximize_from_document<D: 'static>(data: &Value, path: &str, _registry: &crate::registry::Registry<D>) -> Result<Box<dyn Primitive<D>>> {
    let value = crate::doc::as_f64(data, "value", path)?;
    let entries = crate::doc::as_f64(data, "entries", path)?;
    let name = data.get("name").and_then(Value::as_str);
    Ok(Box::new(Maximize {
        quantity: crate::deserialized_quantity(name),
        value,
        entries,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity() -> Quantity<f64> {
        Quantity::from_fn(Some("x"), |d: &f64| *d)
    }

    #[test]
    fn minimize_tracks_minimum() {
        let mut m = Minimize::new(identity());
        for x in [5.0, -2.0, 3.0] {
            m.fill(&x, 1.0).unwrap();
        }
        assert_eq!(m.value(), -2.0);
    }

    #[test]
    fn maximize_tracks_maximum() {
        let mut m = Maximize::new(identity());
        for x in [5.0, -2.0, 3.0] {
            m.fill(&x, 1.0).unwrap();
        }
        assert_eq!(m.value(), 5.0);
    }

    #[test]
    fn merge_of_empty_extrema_stays_at_identity() {
        let a = Minimize::<f64>::new(identity());
        let b = Minimize::<f64>::new(identity());
        let merged = a.merge_box(&b).unwrap();
        assert_eq!(merged.as_any().downcast_ref::<Minimize<f64>>().unwrap().value(), f64::INFINITY);
    }
}
