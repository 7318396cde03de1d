//! The trampoline: `run` drives the task stack until empty, and `step`
//! dispatches a single popped task, including the op 0-11 table for
//! `TaskKind::Eval`.
//!
//! GC is probed exactly once per trampoline iteration, immediately before a
//! task is popped — never in the middle of executing a task's body. Every
//! task handler below allocates at most a handful of fresh result slots and
//! immediately pushes the continuations that reference them before
//! returning, so by the time the *next* iteration probes thresholds, every
//! index anyone still cares about is already sitting on the task stack. This
//! is what lets `gc::probe_thresholds` run a full mark-compact between any
//! two steps without ever invalidating a local variable — see spec.md
//! §4.7's "root-set completeness" contract.

use nock_core::{equal, slot, NockError, NounHeap, Task, TaskKind, TaskStack};

use crate::config::{GcConfig, GcStats};
use crate::gc;

/// Run `*[subject formula]` to completion and return the result index.
///
/// `subject` and `formula` must already be valid indices into `heap`
/// (typically produced by `nock_core::materialise`).
///
/// The result slot `dst` is allocated before the loop starts, but a bare
/// local variable is not itself a GC root: a relocating collection rewrites
/// indices sitting on the task stack (`TaskStack::relocate`) and nothing
/// else, so an ordinary `let dst = ...; ...; Ok(dst)` would go stale the
/// moment a collection fires after `dst` stops being referenced by any
/// pending task. A `TaskKind::Root` sentinel holding `dst` is parked at the
/// very bottom of the stack for that reason — it rides out every collection
/// like any other task argument — and is popped (carrying the relocated
/// index) only once the rest of the computation has finished.
pub fn run(
    heap: &mut NounHeap,
    stack: &mut TaskStack,
    stats: &mut GcStats,
    config: &GcConfig,
    subject: usize,
    formula: usize,
) -> Result<usize, NockError> {
    let dst = heap.alloc_atom(0)?;
    stack.push(TaskKind::Root, dst, 0, 0, 0, 0)?;
    stack.push(TaskKind::Eval, subject, formula, dst, 0, 0)?;

    let mut step_count: u64 = 0;
    let mut result = None;
    while !stack.is_empty() {
        gc::probe_thresholds(heap, stack, stats, config);
        step_count += 1;
        gc::maybe_collect_generational(heap, stack, stats, config, step_count);

        if let Some(budget) = config.step_budget {
            if step_count > budget {
                return Err(NockError::StepLimitExceeded { budget });
            }
        }

        let task = stack.pop()?;
        if task.kind == TaskKind::Root {
            result = Some(task.a1);
            continue;
        }
        if config.debug {
            tracing::trace!(?task.kind, a1 = task.a1, a2 = task.a2, "trampoline step");
        }
        step(heap, stack, task)?;
    }

    Ok(result.expect("Root sentinel is always the last task popped"))
}

fn step(heap: &mut NounHeap, stack: &mut TaskStack, task: Task) -> Result<(), NockError> {
    match task.kind {
        TaskKind::Eval => eval_step(heap, stack, task.a1, task.a2, task.a3),
        TaskKind::Root => unreachable!("run() intercepts Root tasks before dispatching to step"),
        TaskKind::IsCell => {
            let v = if heap.is_cell(task.a1) { 0 } else { 1 };
            heap.write_atom(task.a2, v);
            Ok(())
        }
        TaskKind::Increment => {
            if heap.is_cell(task.a1) {
                return Err(NockError::NonAtomIncrement(task.a1));
            }
            let v = heap.value(task.a1)?;
            heap.write_atom(task.a2, v + 1);
            Ok(())
        }
        TaskKind::EqHeadTail => {
            if !heap.is_cell(task.a1) {
                return Err(NockError::NonCellEquality(task.a1));
            }
            let h = heap.head(task.a1)?;
            let t = heap.tail(task.a1)?;
            let eq = equal(h, t, heap);
            heap.write_atom(task.a2, if eq { 0 } else { 1 });
            Ok(())
        }
        TaskKind::IfElse => {
            // temp=a1, then_f=a2, else_f=a3, subject=a4, dst=a5
            let v = heap.value(task.a1)?;
            match v {
                0 => stack.push(TaskKind::Eval, task.a4, task.a2, task.a5, 0, 0),
                1 => stack.push(TaskKind::Eval, task.a4, task.a3, task.a5, 0, 0),
                other => Err(NockError::BadBooleanCondition(other)),
            }
        }
        TaskKind::Compose => {
            stack.push(TaskKind::Eval, task.a1, task.a2, task.a3, 0, 0)
        }
        TaskKind::Push => {
            // pushed=a1, old_subject=a2, formula=a3, dst=a4
            let cell = heap.alloc_cell(task.a1, task.a2)?;
            stack.push(TaskKind::Eval, cell, task.a3, task.a4, 0, 0)
        }
        TaskKind::Invoke => {
            // core=a1, axis_atom=a2, dst=a3
            let axis = heap.value(task.a2)?;
            let target = slot(axis, task.a1, heap)?;
            stack.push(TaskKind::Eval, task.a1, target, task.a3, 0, 0)
        }
        TaskKind::Cons => {
            heap.write_cell(task.a3, task.a1, task.a2);
            Ok(())
        }
    }
}

/// Dispatch `*[subject formula]` into `dst`, pushing whatever continuations
/// the chosen op requires. Never recurses: every branch either writes `dst`
/// directly or pushes further `Eval`/helper tasks and returns.
fn eval_step(
    heap: &mut NounHeap,
    stack: &mut TaskStack,
    subject: usize,
    formula: usize,
    dst: usize,
) -> Result<(), NockError> {
    if !heap.is_cell(formula) {
        // A bare-atom formula self-evaluates: its value is the result. Op9's
        // `Invoke` continuation routinely produces this shape whenever the
        // resolved arm is itself an atom rather than a cons of code (see
        // S10), and the reference interpreter's dispatch copies the atom
        // straight into the result instead of faulting, so this follows
        // suit. `NotAFormula` stays in the error enum as a reserved fault
        // kind; this interpreter never constructs it.
        let v = heap.value(formula)?;
        heap.write_atom(dst, v);
        return Ok(());
    }
    let head = heap.head(formula)?;
    if heap.is_cell(head) {
        return Err(NockError::UnsupportedFormula(formula));
    }
    let op = heap.value(head)?;
    let rest = heap.tail(formula)?;

    match op {
        // [0 b]: copy slot(b, subject) into dst.
        0 => {
            let axis = heap.value(rest)?;
            let src = slot(axis, subject, heap)?;
            heap.copy_entry(src, dst);
            Ok(())
        }
        // [1 b]: copy the literal node b into dst.
        1 => {
            heap.copy_entry(rest, dst);
            Ok(())
        }
        // [2 b c]: x=*[s b], y=*[s c], dst=cons(x,y).
        2 => {
            let b = heap.head(rest)?;
            let c = heap.tail(rest)?;
            let x_dst = heap.alloc_atom(0)?;
            let y_dst = heap.alloc_atom(0)?;
            stack.push(TaskKind::Cons, x_dst, y_dst, dst, 0, 0)?;
            stack.push(TaskKind::Eval, subject, c, y_dst, 0, 0)?;
            stack.push(TaskKind::Eval, subject, b, x_dst, 0, 0)?;
            Ok(())
        }
        // [3 b]: temp=*[s b], dst = is_cell(temp) ? 0 : 1.
        3 => {
            let temp_dst = heap.alloc_atom(0)?;
            stack.push(TaskKind::IsCell, temp_dst, dst, 0, 0, 0)?;
            stack.push(TaskKind::Eval, subject, rest, temp_dst, 0, 0)?;
            Ok(())
        }
        // [4 b]: temp=*[s b], dst = temp + 1 (temp must be an atom).
        4 => {
            let temp_dst = heap.alloc_atom(0)?;
            stack.push(TaskKind::Increment, temp_dst, dst, 0, 0, 0)?;
            stack.push(TaskKind::Eval, subject, rest, temp_dst, 0, 0)?;
            Ok(())
        }
        // [5 b]: temp=*[s b], dst = equal(head(temp), tail(temp)) ? 0 : 1.
        5 => {
            let temp_dst = heap.alloc_atom(0)?;
            stack.push(TaskKind::EqHeadTail, temp_dst, dst, 0, 0, 0)?;
            stack.push(TaskKind::Eval, subject, rest, temp_dst, 0, 0)?;
            Ok(())
        }
        // [6 b c d]: temp=*[s b]; dispatch c or d by temp's value.
        6 => {
            let b = heap.head(rest)?;
            let cd = heap.tail(rest)?;
            let c = heap.head(cd)?;
            let d = heap.tail(cd)?;
            let temp_dst = heap.alloc_atom(0)?;
            stack.push(TaskKind::IfElse, temp_dst, c, d, subject, dst)?;
            stack.push(TaskKind::Eval, subject, b, temp_dst, 0, 0)?;
            Ok(())
        }
        // [7 b c]: temp=*[s b]; dst=*[temp c].
        7 => {
            let b = heap.head(rest)?;
            let c = heap.tail(rest)?;
            let temp_dst = heap.alloc_atom(0)?;
            stack.push(TaskKind::Compose, temp_dst, c, dst, 0, 0)?;
            stack.push(TaskKind::Eval, subject, b, temp_dst, 0, 0)?;
            Ok(())
        }
        // [8 b c]: temp=*[s b]; dst=*[cons(temp,s) c].
        8 => {
            let b = heap.head(rest)?;
            let c = heap.tail(rest)?;
            let temp_dst = heap.alloc_atom(0)?;
            stack.push(TaskKind::Push, temp_dst, subject, c, dst, 0)?;
            stack.push(TaskKind::Eval, subject, b, temp_dst, 0, 0)?;
            Ok(())
        }
        // [9 b c]: core=*[s c]; dst=*[core slot(b, core)].
        9 => {
            let b = heap.head(rest)?;
            let c = heap.tail(rest)?;
            let core_dst = heap.alloc_atom(0)?;
            stack.push(TaskKind::Invoke, core_dst, b, dst, 0, 0)?;
            stack.push(TaskKind::Eval, subject, c, core_dst, 0, 0)?;
            Ok(())
        }
        // [10 [b c] d]: edit not realised; reduces to dst=*[s d].
        10 => {
            let edit_pair = heap.head(rest)?;
            if !heap.is_cell(edit_pair) {
                return Err(NockError::UnsupportedFormula(formula));
            }
            let d = heap.tail(rest)?;
            stack.push(TaskKind::Eval, subject, d, dst, 0, 0)
        }
        // [11 b c]: hint payload b ignored; dst=*[s c].
        11 => {
            let c = heap.tail(rest)?;
            stack.push(TaskKind::Eval, subject, c, dst, 0, 0)
        }
        other => Err(NockError::UnsupportedOp(other)),
    }
}
