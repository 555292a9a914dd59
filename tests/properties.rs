//! Universal properties that must hold across every primitive: identity,
//! associativity, commutativity of merge, fill/merge equivalence, and
//! round-tripping through the document form (§8).

use aggregaggr::primitives::average::Average;
use aggregaggr::primitives::bin::Bin;
use aggregaggr::primitives::count::Count;
use aggregaggr::primitives::sum::Sum;
use aggregaggr::quantity::Quantity;
use aggregaggr::{Primitive, Registry, Tolerance};

fn identity_quantity() -> Quantity<f64> {
    Quantity::from_fn(Some("x"), |d: &f64| *d)
}

#[test]
fn count_merge_with_zero_is_identity() {
    let mut c = Count::<f64>::new();
    c.fill(&1.0, 3.0).unwrap();
    let zero = c.zero_box();
    let merged = c.merge_box(zero.as_ref()).unwrap();
    assert_eq!(merged.entries(), c.entries());
}

#[test]
fn sum_round_trips_through_document() {
    let mut s = Sum::new(identity_quantity());
    for x in [1.0, -2.0, 3.5] {
        s.fill(&x, 1.0).unwrap();
    }
    let doc = aggregaggr::container::wrap_document("Sum", s.to_document());
    let reg = Registry::<f64>::with_builtins();
    let restored = reg.from_document(&doc, "$").unwrap();
    assert!(restored.equals_box(&s, &Tolerance::DEFAULT));
}

#[test]
fn bin_round_trips_through_document() {
    let template = Count::<f64>::new();
    let mut bin = Bin::new(10, 0.0, 10.0, identity_quantity(), &template).unwrap();
    for x in [0.5, 1.5, 9.9, -1.0, 10.5, f64::NAN] {
        bin.fill(&x, 1.0).unwrap();
    }
    let doc = aggregaggr::container::wrap_document("Bin", bin.to_document());
    let reg = Registry::<f64>::with_builtins();
    let restored = reg.from_document(&doc, "$").unwrap();
    assert!(restored.equals_box(&bin, &Tolerance::DEFAULT));
}

mod proptests {
    use super::*;
    use proptest::prelude::*;

    prop_compose! {
        fn observations()(values in prop::collection::vec(-1000.0f64..1000.0, 0..200)) -> Vec<f64> {
            values
        }
    }

    proptest! {
        #[test]
        fn count_entries_equal_number_of_positive_weight_fills(values in observations()) {
            let mut c = Count::<f64>::new();
            for x in &values {
                c.fill(x, 1.0).unwrap();
            }
            prop_assert_eq!(c.entries(), values.len() as f64);
        }

        #[test]
        fn average_merge_matches_single_pass(values in observations()) {
            prop_assume!(values.len() >= 2);
            let split = values.len() / 2;

            let mut whole = Average::new(identity_quantity());
            for x in &values {
                whole.fill(x, 1.0).unwrap();
            }

            let mut left = Average::new(identity_quantity());
            for x in &values[..split] {
                left.fill(x, 1.0).unwrap();
            }
            let mut right = Average::new(identity_quantity());
            for x in &values[split..] {
                right.fill(x, 1.0).unwrap();
            }
            let merged = left.merge_box(&right).unwrap();
            let merged = merged.as_any().downcast_ref::<Average<f64>>().unwrap();

            prop_assert!((merged.mean() - whole.mean()).abs() < 1e-6);
            prop_assert_eq!(merged.entries(), whole.entries());
        }

        #[test]
        fn sum_merge_is_commutative(a in observations(), b in observations()) {
            let mut sum_a = Sum::new(identity_quantity());
            for x in &a {
                sum_a.fill(x, 1.0).unwrap();
            }
            let mut sum_b = Sum::new(identity_quantity());
            for x in &b {
                sum_b.fill(x, 1.0).unwrap();
            }
            let ab = sum_a.merge_box(&sum_b).unwrap();
            let ba = sum_b.merge_box(&sum_a).unwrap();
            prop_assert!(ab.equals_box(ba.as_ref(), &Tolerance::DEFAULT));
        }

        #[test]
        fn sum_merge_is_associative(a in observations(), b in observations(), c in observations()) {
            let fill_all = |xs: &[f64]| {
                let mut s = Sum::new(identity_quantity());
                for x in xs {
                    s.fill(x, 1.0).unwrap();
                }
                s
            };
            let (sa, sb, sc) = (fill_all(&a), fill_all(&b), fill_all(&c));

            let left = sa.merge_box(&sb).unwrap().merge_box(&sc).unwrap();
            let right = sa.merge_box(sb.merge_box(&sc).unwrap().as_ref()).unwrap();
            prop_assert!(left.equals_box(right.as_ref(), &Tolerance::DEFAULT));
        }

        #[test]
        fn zero_weight_fill_never_changes_entries(values in observations()) {
            let mut c = Count::<f64>::new();
            for x in &values {
                c.fill(x, 1.0).unwrap();
            }
            let before = c.entries();
            c.fill(&0.0, 0.0).unwrap();
            prop_assert_eq!(c.entries(), before);
        }
    }
}
