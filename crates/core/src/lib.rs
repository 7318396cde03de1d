//! Core primitives for a Nock interpreter: a noun heap, an explicit task
//! stack, axis-based slot navigation, structural equality, and conversion
//! between heap-resident nouns and an ordinary host-side tree.
//!
//! This crate has no evaluator and no garbage collector; both live in
//! `nock-runtime`, which depends on this crate's `NounHeap` and `TaskStack`
//! as its two pieces of owned state. Splitting the store from the engine
//! keeps the store testable (and reusable) on its own, and keeps the
//! evaluator free of allocation-layout details it doesn't need.

pub mod equality;
pub mod error;
pub mod heap;
pub mod noun;
pub mod slot;
pub mod task_stack;

pub use equality::equal;
pub use error::NockError;
pub use heap::{NounHeap, Tag, DEFAULT_HEAP_CAPACITY, MAX_GENERATION};
pub use noun::{
    externalise, materialise, materialise_with_depth, parse_external_noun, print_external,
    print_noun, ExternalNoun, DEFAULT_MAX_DEPTH,
};
pub use slot::slot;
pub use task_stack::{Task, TaskKind, TaskStack, DEFAULT_STACK_CAPACITY};
