//! Composable, mergeable aggregation primitives for streams of weighted
//! observations: histograms, running moments and nested bundles that fill
//! from one observation at a time and merge associatively and commutatively
//! (§1, §2).
//!
//! The primitive set lives under [`primitives`]; [`container::Primitive`] is
//! the trait every one of them implements, and [`registry::Registry`] is how
//! a caller rebuilds a tree of them from a serialized [`doc`] tree.

pub mod container;
pub mod doc;
pub mod error;
pub mod numeric;
pub mod primitives;
pub mod quantity;
pub mod registry;

pub use container::{Primitive, Shape};
pub use error::{Error, Result};
pub use numeric::Tolerance;
pub use quantity::{Quantity, QuantityValue};
pub use registry::Registry;

/// A placeholder quantity installed on a primitive reconstructed from a
/// document, since the document format cannot carry a Rust closure (§4.C,
/// §9). Evaluating it is an error until a caller reattaches a live quantity
/// via the primitive's `set_quantity` (where one is exposed) or by rebuilding
/// around a fresh closure of the same name.
pub fn deserialized_quantity<D: 'static>(name: Option<&str>) -> Quantity<D> {
    let failing = move |n: String| {
        move |_: &D| {
            Err(error::QuantityError::new(
                n.clone(),
                "quantity was deserialized from a document and has no live function attached",
            ))
        }
    };
    match name {
        Some(n) => Quantity::named(n.to_string(), failing(n.to_string())),
        None => Quantity::new(failing("<anonymous>".to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserialized_quantity_errors_on_eval() {
        let q: Quantity<f64> = deserialized_quantity(Some("x"));
        assert!(q.eval_f64(&1.0).is_err());
    }
}
