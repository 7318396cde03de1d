//! Property-based tests over small, randomly generated nouns: materialise/
//! externalise round-tripping, `equal` agreeing with `ExternalNoun`'s own
//! `PartialEq`, and `slot` agreeing with a straightforward recursive
//! reference implementation written directly against `ExternalNoun` rather
//! than the heap.

use nock_core::{equal, externalise, materialise, slot, ExternalNoun, NounHeap};
use quickcheck::{Arbitrary, Gen, TestResult};
use quickcheck_macros::quickcheck;

/// A small, depth-bounded noun, wrapped so this crate's own `Arbitrary` impl
/// doesn't run afoul of the orphan rule on `nock_core::ExternalNoun`.
#[derive(Clone, Debug)]
struct SmallNoun(ExternalNoun);

impl Arbitrary for SmallNoun {
    fn arbitrary(g: &mut Gen) -> Self {
        SmallNoun(gen_noun(g, 0))
    }
}

fn gen_noun(g: &mut Gen, depth: u32) -> ExternalNoun {
    let can_branch = depth < 5;
    if can_branch && bool::arbitrary(g) {
        ExternalNoun::cell(gen_noun(g, depth + 1), gen_noun(g, depth + 1))
    } else {
        ExternalNoun::Atom(u64::arbitrary(g) % 1000)
    }
}

/// A recursive axis walk over `ExternalNoun` directly, independent of the
/// heap-backed `slot`, to compare against.
fn reference_slot(axis: u64, noun: &ExternalNoun) -> Option<ExternalNoun> {
    if axis == 1 {
        return Some(noun.clone());
    }
    match noun {
        ExternalNoun::Atom(_) => None,
        ExternalNoun::Cell(h, t) => {
            if axis % 2 == 0 {
                reference_slot(axis / 2, h)
            } else {
                reference_slot((axis - 1) / 2, t)
            }
        }
    }
}

#[quickcheck]
fn materialise_externalise_roundtrip(n: SmallNoun) -> bool {
    let mut heap = NounHeap::new();
    let idx = materialise(&n.0, &mut heap).unwrap();
    externalise(idx, &heap).unwrap() == n.0
}

#[quickcheck]
fn equal_agrees_with_external_partial_eq(a: SmallNoun, b: SmallNoun) -> bool {
    let mut heap = NounHeap::new();
    let ia = materialise(&a.0, &mut heap).unwrap();
    let ib = materialise(&b.0, &mut heap).unwrap();
    equal(ia, ib, &heap) == (a.0 == b.0)
}

#[quickcheck]
fn equal_is_reflexive(n: SmallNoun) -> bool {
    let mut heap = NounHeap::new();
    let idx = materialise(&n.0, &mut heap).unwrap();
    equal(idx, idx, &heap)
}

#[quickcheck]
fn slot_matches_reference_axis_walk(n: SmallNoun, axis: u8) -> TestResult {
    if axis == 0 {
        // axis 0 is `BadAxis`, not modeled by `reference_slot`.
        return TestResult::discard();
    }
    let mut heap = NounHeap::new();
    let idx = materialise(&n.0, &mut heap).unwrap();
    let heap_result = slot(axis as u64, idx, &heap).ok().map(|i| externalise(i, &heap).unwrap());
    let ref_result = reference_slot(axis as u64, &n.0);
    TestResult::from_bool(heap_result == ref_result)
}
