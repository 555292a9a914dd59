//! The contract every primitive implements (§4.A).

use crate::error::Result;
use crate::numeric::Tolerance;
use serde_json::Value;
use std::any::Any;
use std::fmt;

/// A structural descriptor of a container's type, geometry and inner-shape
/// tree. `merge` between two containers is only defined when their shapes
/// are equal; geometry fields (bin edges, cuts, centers, thresholds) take
/// part in the comparison because the spec requires them to match exactly,
/// not just within tolerance.
#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    Leaf(&'static str),
    Bin {
        low: f64,
        high: f64,
        num: usize,
        inner: Box<Shape>,
    },
    SparselyBin {
        bin_width: f64,
        origin: f64,
        inner: Box<Shape>,
    },
    CentrallyBin {
        centers: Vec<f64>,
        inner: Box<Shape>,
    },
    Select {
        inner: Box<Shape>,
    },
    Fraction {
        inner: Box<Shape>,
    },
    Stack {
        cuts: Vec<f64>,
        inner: Box<Shape>,
    },
    Partition {
        cuts: Vec<f64>,
        inner: Box<Shape>,
    },
    Limit {
        threshold: f64,
        inner: Box<Shape>,
    },
    Label {
        keys: Vec<String>,
        inner: Box<Shape>,
    },
    UntypedLabel {
        entries: Vec<(String, Shape)>,
    },
    Index {
        len: usize,
        inner: Box<Shape>,
    },
    Branch {
        entries: Vec<Shape>,
    },
    Categorize {
        inner: Box<Shape>,
    },
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

/// The shared contract of every aggregation primitive in this crate.
///
/// Object-safe so that heterogeneous collections (`UntypedLabel`, `Branch`)
/// can hold `Box<dyn Primitive<D>>` of differing concrete shapes, and so
/// that new primitives can be added by third parties without touching this
/// trait (§9: "keep the variant open via a trait/interface abstraction").
pub trait Primitive<D>: fmt::Debug {
    /// The registry key used to dispatch deserialization.
    fn type_name(&self) -> &'static str;

    /// Total weight observed so far.
    fn entries(&self) -> f64;

    /// Consume one observation. Implementations evaluate their quantity and
    /// perform any inner fill before touching `entries`, so a failing
    /// quantity or inner fill leaves the receiver unchanged (§4.J, §9).
    fn fill(&mut self, datum: &D, weight: f64) -> Result<()>;

    /// The structural shape used to check merge-compatibility.
    fn shape(&self) -> Shape;

    /// A fresh container of the same shape with identity state.
    fn zero_box(&self) -> Box<dyn Primitive<D>>;

    /// Merge with another container of matching shape, returning a new
    /// container. Never mutates `self` or `other`.
    fn merge_box(&self, other: &dyn Primitive<D>) -> Result<Box<dyn Primitive<D>>>;

    /// Tolerance-aware structural equality.
    fn equals_box(&self, other: &dyn Primitive<D>, tol: &Tolerance) -> bool;

    /// Serialize to the canonical `{type, data}` shell's `data` body.
    fn to_document(&self) -> Value;

    fn clone_box(&self) -> Box<dyn Primitive<D>>;

    fn as_any(&self) -> &dyn Any;
}

impl<D> Clone for Box<dyn Primitive<D>> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

/// Wrap a container's document body in the canonical `{version, type, data}`
/// shell (§4.H).
pub fn wrap_document(type_name: &str, data: Value) -> Value {
    serde_json::json!({
        "version": crate::doc::CURRENT_VERSION,
        "type": type_name,
        "data": data,
    })
}
