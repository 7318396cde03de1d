//! Conversion between the heap's index-addressed nouns and an ordinary,
//! host-side tree representation (`ExternalNoun`), plus the diagnostic
//! bracket-format printer and parser.
//!
//! This module is the "host-language conversion helper" spec.md treats as an
//! external collaborator to the interpreter's semantics; it is implemented in
//! this crate because a library with no way to construct or read back nouns
//! is not usable, but nothing in `heap`, `task_stack`, `slot`, or `equality`
//! depends on it.

use crate::error::NockError;
use crate::heap::{NounHeap, Tag};

/// The default depth limit `materialise` enforces, matching spec.md §4.3.
pub const DEFAULT_MAX_DEPTH: usize = 500;

/// A noun expressed as an ordinary Rust tree, for building test fixtures and
/// CLI input/output without touching the heap directly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExternalNoun {
    Atom(u64),
    Cell(Box<ExternalNoun>, Box<ExternalNoun>),
}

impl ExternalNoun {
    /// Build a two-element cell.
    pub fn cell(a: impl Into<ExternalNoun>, b: impl Into<ExternalNoun>) -> Self {
        ExternalNoun::Cell(Box::new(a.into()), Box::new(b.into()))
    }

    /// Build a right-nested noun from a sequence of three or more elements:
    /// `list([x1, x2, x3]) == cell(x1, cell(x2, x3))`.
    ///
    /// # Panics
    /// Panics if given fewer than two elements; use `ExternalNoun::from` or
    /// `cell` directly for those cases.
    pub fn list(items: Vec<ExternalNoun>) -> Self {
        let mut iter = items.into_iter().rev();
        let mut acc = iter.next().expect("list needs at least two elements");
        let mut any = false;
        for item in iter {
            acc = ExternalNoun::Cell(Box::new(item), Box::new(acc));
            any = true;
        }
        assert!(any, "list needs at least two elements");
        acc
    }
}

impl From<u64> for ExternalNoun {
    fn from(value: u64) -> Self {
        ExternalNoun::Atom(value)
    }
}

/// One frame of the iterative materialiser's explicit work stack: either
/// "expand this external noun at this depth" or "pop the two most recently
/// completed values and combine them into a cell." Because frames are a LIFO
/// stack, a cell's head is always fully expanded (and its value pushed) before
/// its tail is even looked at, so `Build` always finds `[head, tail]` on top
/// of the value stack in that order.
enum BuildFrame<'a> {
    Expand(&'a ExternalNoun, usize),
    Build,
}

/// Convert an `ExternalNoun` into heap entries, returning the root index.
///
/// Iterative (an explicit work stack mirrors the recursion a naive version
/// would need) so that deeply nested host literals cannot exhaust the host
/// stack the way the evaluator itself is built never to.
pub fn materialise(noun: &ExternalNoun, heap: &mut NounHeap) -> Result<usize, NockError> {
    materialise_with_depth(noun, heap, DEFAULT_MAX_DEPTH)
}

/// As `materialise`, but with an explicit depth limit instead of
/// `DEFAULT_MAX_DEPTH`.
pub fn materialise_with_depth(
    noun: &ExternalNoun,
    heap: &mut NounHeap,
    max_depth: usize,
) -> Result<usize, NockError> {
    let mut frames = vec![BuildFrame::Expand(noun, 0)];
    let mut values: Vec<usize> = Vec::new();

    while let Some(frame) = frames.pop() {
        match frame {
            BuildFrame::Expand(n, depth) => {
                if depth > max_depth {
                    return Err(NockError::NounTooDeep { limit: max_depth });
                }
                match n {
                    ExternalNoun::Atom(v) => {
                        values.push(heap.alloc_atom(*v)?);
                    }
                    ExternalNoun::Cell(h, t) => {
                        frames.push(BuildFrame::Build);
                        frames.push(BuildFrame::Expand(t, depth + 1));
                        frames.push(BuildFrame::Expand(h, depth + 1));
                    }
                }
            }
            BuildFrame::Build => {
                let tail = values.pop().expect("tail materialised before combine");
                let head = values.pop().expect("head materialised before combine");
                values.push(heap.alloc_cell(head, tail)?);
            }
        }
    }

    values.pop().ok_or_else(|| NockError::MalformedNoun("empty input".to_string()))
}

/// Convert a heap index back into an `ExternalNoun`. Iterative for the same
/// reason `materialise` is.
pub fn externalise(idx: usize, heap: &NounHeap) -> Result<ExternalNoun, NockError> {
    enum Frame {
        Visit(usize),
        Combine,
    }
    let mut frames = vec![Frame::Visit(idx)];
    let mut built: Vec<ExternalNoun> = Vec::new();

    while let Some(frame) = frames.pop() {
        match frame {
            Frame::Visit(i) => {
                if heap.is_cell(i) {
                    frames.push(Frame::Combine);
                    frames.push(Frame::Visit(heap.tail(i)?));
                    frames.push(Frame::Visit(heap.head(i)?));
                } else {
                    built.push(ExternalNoun::Atom(heap.value(i)?));
                }
            }
            Frame::Combine => {
                let tail = built.pop().expect("tail externalised before combine");
                let head = built.pop().expect("head externalised before combine");
                built.push(ExternalNoun::Cell(Box::new(head), Box::new(tail)));
            }
        }
    }

    built.pop().ok_or_else(|| NockError::MalformedNoun("empty heap read".to_string()))
}

/// Read a heap entry directly into `ExternalNoun`, without going through the
/// tag check twice; used by the printer to avoid allocating an intermediate
/// `ExternalNoun` tree for diagnostics-only output. Kept private since
/// `print_noun` is the supported entry point.
fn print_into(idx: usize, heap: &NounHeap, out: &mut String) -> Result<(), NockError> {
    if heap.is_cell(idx) {
        out.push('[');
        print_into(heap.head(idx)?, heap, out)?;
        out.push(' ');
        print_into(heap.tail(idx)?, heap, out)?;
        out.push(']');
    } else {
        out.push_str(&heap.value(idx)?.to_string());
    }
    Ok(())
}

/// Render the noun at `idx` as `[head tail]` / decimal-atom diagnostic text.
/// This is the CLI's output format; it is not a wire protocol (§6).
pub fn print_noun(idx: usize, heap: &NounHeap) -> Result<String, NockError> {
    let mut out = String::new();
    print_into(idx, heap, &mut out)?;
    Ok(out)
}

/// Render an `ExternalNoun` directly, without a heap round-trip.
pub fn print_external(noun: &ExternalNoun) -> String {
    match noun {
        ExternalNoun::Atom(v) => v.to_string(),
        ExternalNoun::Cell(h, t) => format!("[{} {}]", print_external(h), print_external(t)),
    }
}

/// Parse the diagnostic bracket format (`atom := decimal`, `cell := '[' noun
/// ' ' noun ']'`) back into an `ExternalNoun`.
pub fn parse_external_noun(input: &str) -> Result<ExternalNoun, NockError> {
    let mut chars = input.trim().chars().peekable();
    let noun = parse_one(&mut chars)?;
    match chars.peek() {
        None => Ok(noun),
        Some(c) => Err(NockError::MalformedNoun(format!("trailing input starting at '{c}'"))),
    }
}

fn parse_one(chars: &mut std::iter::Peekable<std::str::Chars<'_>>) -> Result<ExternalNoun, NockError> {
    skip_whitespace(chars);
    match chars.peek() {
        Some('[') => {
            chars.next();
            let head = parse_one(chars)?;
            skip_whitespace(chars);
            let tail = parse_one(chars)?;
            skip_whitespace(chars);
            match chars.next() {
                Some(']') => Ok(ExternalNoun::Cell(Box::new(head), Box::new(tail))),
                _ => Err(NockError::MalformedNoun("expected closing ']'".to_string())),
            }
        }
        Some(c) if c.is_ascii_digit() => {
            let mut digits = String::new();
            while let Some(c) = chars.peek() {
                if c.is_ascii_digit() {
                    digits.push(*c);
                    chars.next();
                } else {
                    break;
                }
            }
            digits
                .parse::<u64>()
                .map(ExternalNoun::Atom)
                .map_err(|e| NockError::MalformedNoun(format!("bad atom literal: {e}")))
        }
        Some(c) => Err(NockError::MalformedNoun(format!("unexpected character '{c}'"))),
        None => Err(NockError::MalformedNoun("unexpected end of input".to_string())),
    }
}

fn skip_whitespace(chars: &mut std::iter::Peekable<std::str::Chars<'_>>) {
    while matches!(chars.peek(), Some(c) if c.is_whitespace()) {
        chars.next();
    }
}

/// Whether the tag at `idx` is an atom; a thin, public re-export of
/// `heap::is_cell`'s negation for callers that only have a `Tag`.
pub fn tag_of(idx: usize, heap: &NounHeap) -> Tag {
    if heap.is_cell(idx) {
        Tag::Cell
    } else {
        Tag::Atom
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn materialise_atom() {
        let mut heap = NounHeap::new();
        let idx = materialise(&ExternalNoun::Atom(42), &mut heap).unwrap();
        assert_eq!(heap.value(idx).unwrap(), 42);
    }

    #[test]
    fn materialise_cell() {
        let mut heap = NounHeap::new();
        let noun = ExternalNoun::cell(1u64, 2u64);
        let idx = materialise(&noun, &mut heap).unwrap();
        assert!(heap.is_cell(idx));
    }

    #[test]
    fn materialise_right_nested_list() {
        let mut heap = NounHeap::new();
        let noun = ExternalNoun::list(vec![1u64.into(), 2u64.into(), 3u64.into()]);
        let idx = materialise(&noun, &mut heap).unwrap();
        let back = externalise(idx, &heap).unwrap();
        assert_eq!(back, ExternalNoun::cell(1u64, ExternalNoun::cell(2u64, 3u64)));
    }

    #[test]
    fn roundtrip_materialise_externalise() {
        let mut heap = NounHeap::new();
        let noun = ExternalNoun::cell(ExternalNoun::cell(1u64, 2u64), 3u64);
        let idx = materialise(&noun, &mut heap).unwrap();
        assert_eq!(externalise(idx, &heap).unwrap(), noun);
    }

    #[test]
    fn too_deep_faults() {
        let mut heap = NounHeap::with_capacity(10_000);
        let mut noun = ExternalNoun::Atom(0);
        for _ in 0..10 {
            noun = ExternalNoun::cell(noun, 0u64);
        }
        assert_eq!(
            materialise_with_depth(&noun, &mut heap, 3),
            Err(NockError::NounTooDeep { limit: 3 })
        );
    }

    #[test]
    fn deep_list_does_not_overflow_host_stack() {
        let mut heap = NounHeap::with_capacity(20_000);
        let items: Vec<ExternalNoun> = (0..5000u64).map(ExternalNoun::Atom).collect();
        let noun = ExternalNoun::list(items);
        let idx = materialise_with_depth(&noun, &mut heap, 10_000).unwrap();
        assert!(heap.is_cell(idx));
    }

    #[test]
    fn print_matches_diagnostic_format() {
        let mut heap = NounHeap::new();
        let noun = ExternalNoun::cell(1u64, ExternalNoun::cell(2u64, 3u64));
        let idx = materialise(&noun, &mut heap).unwrap();
        assert_eq!(print_noun(idx, &heap).unwrap(), "[1 [2 3]]");
    }

    #[test]
    fn parse_matches_printer_output() {
        let noun = parse_external_noun("[1 [2 3]]").unwrap();
        assert_eq!(noun, ExternalNoun::cell(1u64, ExternalNoun::cell(2u64, 3u64)));
    }

    #[test]
    fn parse_bare_atom() {
        assert_eq!(parse_external_noun("42").unwrap(), ExternalNoun::Atom(42));
    }

    #[test]
    fn parse_rejects_trailing_garbage() {
        assert!(parse_external_noun("42 7").is_err());
    }

    #[test]
    fn parse_print_roundtrip() {
        let original = "[[1 2] [3 [4 5]]]";
        let noun = parse_external_noun(original).unwrap();
        assert_eq!(print_external(&noun), original);
    }
}
