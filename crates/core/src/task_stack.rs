//! The explicit task stack that drives the evaluator's trampoline.
//!
//! Nock programs can recurse unboundedly deep (most visibly through op 9's
//! core invocation). Rather than mirror that recursion in host stack frames,
//! the evaluator encodes every pending computation as a `Task` on this
//! fixed-capacity stack and loops until it is empty. The stack is also the
//! *sole* source of garbage-collection roots: anything the evaluator needs to
//! keep alive across an allocation must be sitting here.

use crate::error::NockError;

/// Which continuation or primitive step a `Task` represents.
///
/// These correspond to spec kinds 0, 2-4, 6-10 (kind 1, `REDUCE`, is a
/// trampoline helper the reference never actually needs once ops push their
/// continuations directly, so it has no variant here; kind 5 is unused in
/// the spec's own numbering). `Root` has no spec-kind counterpart — it is
/// this implementation's way of keeping the top-level result index alive as
/// a GC root (see `nock-runtime::evaluator::run`). These are Rust enum
/// variants rather than raw integers so the evaluator's `match` is
/// exhaustive and self-documenting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskKind {
    /// Compute `*[subject formula]` into `dst`.
    Eval,
    /// Write 0 if `temp` is a cell, else 1, into `dst`.
    IsCell,
    /// Require `temp` to be an atom; write `value(temp) + 1` into `dst`.
    Increment,
    /// Require `temp` to be a cell; write 0 if `head(temp) == tail(temp)` else 1.
    EqHeadTail,
    /// Dispatch on `value(temp)`, evaluating `then_f` or `else_f` against `subject`.
    IfElse,
    /// `Eval(new_subject, next_formula, dst)`; op 7's compose continuation.
    Compose,
    /// Allocate the cell `(pushed, old_subject)`, then `Eval` `formula` against it.
    Push,
    /// Resolve `slot(value(axis_atom), core)`, then `Eval(core, that, dst)`.
    Invoke,
    /// Write the cell `(x, y)` into `dst`.
    Cons,
    /// Sentinel parked at the bottom of the stack by `nock-runtime::evaluator::run`
    /// so the top-level result slot (`a1`) is a GC root — and thus relocated by
    /// `TaskStack::relocate` like any other task argument — for the entire
    /// trampoline run. Popped only once the stack is otherwise empty; never
    /// dispatched as a primitive step.
    Root,
}

/// A single pending unit of work on the task stack.
///
/// Every field beyond `kind` is either a heap index or a small scalar; which
/// fields are meaningful depends on `kind`, documented on each `TaskKind`
/// variant and realised in `nock-runtime::evaluator`.
#[derive(Debug, Clone, Copy)]
pub struct Task {
    pub kind: TaskKind,
    pub a1: usize,
    pub a2: usize,
    pub a3: usize,
    pub a4: usize,
    pub a5: usize,
}

impl Task {
    pub fn new(kind: TaskKind, a1: usize, a2: usize, a3: usize, a4: usize, a5: usize) -> Self {
        Task { kind, a1, a2, a3, a4, a5 }
    }

    /// Every argument slot that the GC mark phase should treat as a root
    /// index, in order. Not every slot is always a heap index (e.g.
    /// `IfElse`'s `a4` is a subject index, but none of `Task`'s fields are
    /// ever anything *other* than a heap index or an unused zero, so marking
    /// all five is always safe and simpler than special-casing per kind).
    pub fn roots(&self) -> [usize; 5] {
        [self.a1, self.a2, self.a3, self.a4, self.a5]
    }
}

/// Starting capacity for a stack constructed with `TaskStack::new`.
pub const DEFAULT_STACK_CAPACITY: usize = 4096;

/// A fixed-capacity LIFO stack of `Task`s.
#[derive(Debug, Clone)]
pub struct TaskStack {
    tasks: Vec<Task>,
    capacity: usize,
}

impl TaskStack {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_STACK_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        TaskStack { tasks: Vec::with_capacity(capacity), capacity }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Push a task recording `kind` and up to five index/scalar arguments.
    /// Unused trailing arguments should be passed as `0`.
    pub fn push(
        &mut self,
        kind: TaskKind,
        a1: usize,
        a2: usize,
        a3: usize,
        a4: usize,
        a5: usize,
    ) -> Result<(), NockError> {
        if self.tasks.len() >= self.capacity {
            return Err(NockError::StackOverflow);
        }
        self.tasks.push(Task::new(kind, a1, a2, a3, a4, a5));
        Ok(())
    }

    /// Pop and return the top task.
    pub fn pop(&mut self) -> Result<Task, NockError> {
        self.tasks.pop().ok_or(NockError::StackUnderflow)
    }

    /// All tasks currently on the stack, bottom to top. GC roots are derived
    /// from this; it is the collector's only way to discover live indices.
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    /// Rewrite every index on the stack in place through `remap`, preserving
    /// `kind` and any slot `remap` maps to itself unchanged. Called by the
    /// compacting collector once it has computed the old-to-new index map.
    pub fn relocate(&mut self, remap: &[usize]) {
        for task in &mut self.tasks {
            task.a1 = remap[task.a1];
            task.a2 = remap[task.a2];
            task.a3 = remap[task.a3];
            task.a4 = remap[task.a4];
            task.a5 = remap[task.a5];
        }
    }
}

impl Default for TaskStack {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_then_pop_roundtrips() {
        let mut stack = TaskStack::new();
        stack.push(TaskKind::Eval, 1, 2, 3, 0, 0).unwrap();
        let task = stack.pop().unwrap();
        assert_eq!(task.kind, TaskKind::Eval);
        assert_eq!((task.a1, task.a2, task.a3), (1, 2, 3));
    }

    #[test]
    fn pop_on_empty_underflows() {
        let mut stack = TaskStack::new();
        assert_eq!(stack.pop(), Err(NockError::StackUnderflow));
    }

    #[test]
    fn push_past_capacity_overflows() {
        let mut stack = TaskStack::with_capacity(1);
        stack.push(TaskKind::Eval, 0, 0, 0, 0, 0).unwrap();
        assert_eq!(
            stack.push(TaskKind::Eval, 0, 0, 0, 0, 0),
            Err(NockError::StackOverflow)
        );
    }

    #[test]
    fn is_lifo() {
        let mut stack = TaskStack::new();
        stack.push(TaskKind::Eval, 1, 0, 0, 0, 0).unwrap();
        stack.push(TaskKind::Eval, 2, 0, 0, 0, 0).unwrap();
        assert_eq!(stack.pop().unwrap().a1, 2);
        assert_eq!(stack.pop().unwrap().a1, 1);
    }
}
