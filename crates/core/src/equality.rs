//! Structural equality between nouns.
//!
//! Two nouns are equal iff they are both atoms of equal value, or both cells
//! whose heads and tails are (recursively) equal. An atom is never equal to a
//! cell. This is implemented with an explicit worklist rather than host
//! recursion so that deeply right-nested nouns (long lists, in particular)
//! cannot overflow the host stack the way a naive recursive `equal` would.

use crate::heap::NounHeap;

/// Whether `a` and `b` denote the same noun, short-circuiting on the first
/// mismatch found.
pub fn equal(a: usize, b: usize, heap: &NounHeap) -> bool {
    let mut worklist = vec![(a, b)];
    while let Some((x, y)) = worklist.pop() {
        match (heap.is_cell(x), heap.is_cell(y)) {
            (false, false) => {
                if heap.value(x).unwrap() != heap.value(y).unwrap() {
                    return false;
                }
            }
            (true, true) => {
                worklist.push((heap.head(x).unwrap(), heap.head(y).unwrap()));
                worklist.push((heap.tail(x).unwrap(), heap.tail(y).unwrap()));
            }
            _ => return false,
        }
    }
    true
}
