//! Tree addressing by binary-encoded path ("axis"), the `/` operator in Nock
//! notation and op 0's argument.
//!
//! Axis 1 is the root; an even axis `n` descends to the head of `slot(n/2)`,
//! an odd axis `n > 1` descends to the tail of `slot((n-1)/2)`. This matches
//! reading the axis in binary and walking left-to-right after the leading
//! `1` bit, head on `0`, tail on `1`.

use crate::error::NockError;
use crate::heap::NounHeap;

/// Navigate `root` by axis `n`, returning the index of the subtree at that
/// axis. Iterative and constant-space: no recursion, just a `while` loop
/// over the remaining axis bits.
pub fn slot(n: u64, root: usize, heap: &NounHeap) -> Result<usize, NockError> {
    if n < 1 {
        return Err(NockError::BadAxis(n));
    }
    let mut current = root;
    let mut remaining = n;
    while remaining > 1 {
        if !heap.is_cell(current) {
            return Err(NockError::SlotOutOfRange { axis: n, index: current });
        }
        if remaining % 2 == 0 {
            current = heap.head(current)?;
            remaining /= 2;
        } else {
            current = heap.tail(current)?;
            remaining = (remaining - 1) / 2;
        }
    }
    Ok(current)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build_sample(heap: &mut NounHeap) -> usize {
        // [4 5]
        let a = heap.alloc_atom(4).unwrap();
        let b = heap.alloc_atom(5).unwrap();
        heap.alloc_cell(a, b).unwrap()
    }

    #[test]
    fn axis_one_is_root() {
        let mut heap = NounHeap::new();
        let root = build_sample(&mut heap);
        assert_eq!(slot(1, root, &heap).unwrap(), root);
    }

    #[test]
    fn axis_two_is_head() {
        let mut heap = NounHeap::new();
        let root = build_sample(&mut heap);
        let head = heap.head(root).unwrap();
        assert_eq!(slot(2, root, &heap).unwrap(), head);
    }

    #[test]
    fn axis_three_is_tail() {
        let mut heap = NounHeap::new();
        let root = build_sample(&mut heap);
        let tail = heap.tail(root).unwrap();
        assert_eq!(slot(3, root, &heap).unwrap(), tail);
    }

    #[test]
    fn zero_axis_is_bad_axis() {
        let mut heap = NounHeap::new();
        let root = build_sample(&mut heap);
        assert_eq!(slot(0, root, &heap), Err(NockError::BadAxis(0)));
    }

    #[test]
    fn deep_axis_into_atom_is_out_of_range() {
        let mut heap = NounHeap::new();
        let atom = heap.alloc_atom(7).unwrap();
        assert_eq!(
            slot(2, atom, &heap),
            Err(NockError::SlotOutOfRange { axis: 2, index: atom })
        );
    }

    #[test]
    fn deeper_nesting_matches_recursive_reference() {
        let mut heap = NounHeap::new();
        // [1 [2 3]]
        let one = heap.alloc_atom(1).unwrap();
        let two = heap.alloc_atom(2).unwrap();
        let three = heap.alloc_atom(3).unwrap();
        let inner = heap.alloc_cell(two, three).unwrap();
        let root = heap.alloc_cell(one, inner).unwrap();
        // axis 7 = tail(tail(root)) = 3
        assert_eq!(slot(7, root, &heap).unwrap(), three);
        // axis 6 = head(tail(root)) = 2
        assert_eq!(slot(6, root, &heap).unwrap(), two);
    }
}
