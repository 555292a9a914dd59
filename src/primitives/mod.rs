//! Concrete aggregation primitives and their registry factories (§3, §4.D–§4.I).

pub mod absolute_err;
pub mod average;
pub mod bin;
pub mod branch;
pub mod categorize;
pub mod centrally_bin;
pub mod count;
pub mod deviate;
pub mod fraction;
pub mod index;
pub mod label;
pub mod limit;
pub mod minmax;
pub mod partition;
pub mod select;
pub mod sparsely_bin;
pub mod stack;
pub mod sum;
pub mod untyped_label;

use crate::error::Result;
use crate::registry::Registry;
use std::rc::Rc;

/// Register every built-in primitive's factory under its `type_name()`.
pub fn register_builtins<D: 'static>(reg: &mut Registry<D>) -> Result<()> {
    reg.register("Count", Rc::new(count::from_document))?;
    reg.register("Sum", Rc::new(sum::from_document))?;
    reg.register("Average", Rc::new(average::from_document))?;
    reg.register("Deviate", Rc::new(deviate::from_document))?;
    reg.register("AbsoluteErr", Rc::new(absolute_err::from_document))?;
    reg.register("Minimize", Rc::new(minmax::minimize_from_document))?;
    reg.register("Maximize", Rc::new(minmax::maximize_from_document))?;
    reg.register("Bin", Rc::new(bin::from_document))?;
    reg.register("SparselyBin", Rc::new(sparsely_bin::from_document))?;
    reg.register("CentrallyBin", Rc::new(centrally_bin::from_document))?;
    reg.register("Select", Rc::new(select::from_document))?;
    reg.register("Fraction", Rc::new(fraction::from_document))?;
    reg.register("Stack", Rc::new(stack::from_document))?;
    reg.register("Partition", Rc::new(partition::from_document))?;
    reg.register("Limit", Rc::new(limit::from_document))?;
    reg.register("Label", Rc::new(label::from_document))?;
    reg.register("UntypedLabel", Rc::new(untyped_label::from_document))?;
    reg.register("Index", Rc::new(index::from_document))?;
    reg.register("Branch", Rc::new(branch::from_document))?;
    reg.register("Categorize", Rc::new(categorize::from_document))?;
    Ok(())
}
