//! Mark-compact garbage collection: standard, emergency, and generational
//! entry points, plus heap growth.
//!
//! None of this lives in `nock-core::heap` because the collector needs to
//! reason about the task stack's roots and the configuration's thresholds,
//! neither of which the heap itself knows about. `NounHeap` only exposes the
//! raw accessors (`tag_raw`, `slots_raw`, `generations_mut`,
//! `install_compacted`) this module needs to perform a compaction; everything
//! about *when* and *how aggressively* to collect lives here.

use std::time::Instant;

use nock_core::{NounHeap, Tag, TaskStack, MAX_GENERATION};

use crate::config::{GcConfig, GcStats};

/// Trace reachability from every task-stack root (and, for a generational
/// pass, from every entry whose generation has reached the cap) and return a
/// `marked[idx]` table sized `heap.free()`.
///
/// Root indices are taken from `[0, free)` rather than spec.md's literal
/// `[1, free)`: index 0 is a valid first heap entry, and treating it as an
/// always-conservative root costs nothing (see DESIGN.md's Open Question
/// decisions).
fn mark(heap: &NounHeap, stack: &TaskStack, pre_mark_generation: Option<u8>) -> Vec<bool> {
    let free = heap.free();
    let mut marked = vec![false; free];
    let mut worklist: Vec<usize> = Vec::new();

    for task in stack.tasks() {
        for idx in task.roots() {
            if idx < free {
                worklist.push(idx);
            }
        }
    }

    if let Some(threshold) = pre_mark_generation {
        for idx in 0..free {
            if heap.generation(idx) >= threshold {
                worklist.push(idx);
            }
        }
    }

    while let Some(idx) = worklist.pop() {
        if marked[idx] {
            continue;
        }
        marked[idx] = true;
        if heap.is_cell(idx) {
            worklist.push(heap.head(idx).expect("marked cell has a head"));
            worklist.push(heap.tail(idx).expect("marked cell has a tail"));
        }
    }

    marked
}

/// Stable-compact the heap down to its marked entries, rewriting every
/// cell's head/tail through the resulting old-to-new index map and updating
/// the task stack's roots in place. Returns the number of cells freed.
fn compact(heap: &mut NounHeap, stack: &mut TaskStack, marked: &[bool]) -> u64 {
    let free = heap.free();
    let mut remap = vec![0usize; free];
    let mut next = 0usize;
    for (idx, &is_live) in marked.iter().enumerate() {
        if is_live {
            remap[idx] = next;
            next += 1;
        }
    }

    let mut new_tags = Vec::with_capacity(next);
    let mut new_slot1 = Vec::with_capacity(next);
    let mut new_slot2 = Vec::with_capacity(next);
    let mut new_generations = Vec::with_capacity(next);

    for idx in 0..free {
        if !marked[idx] {
            continue;
        }
        let tag = heap.tag_raw(idx);
        let (a, b) = heap.slots_raw(idx);
        let (new_a, new_b) = match tag {
            Tag::Atom => (a, b),
            Tag::Cell => (remap[a as usize] as u64, remap[b as usize] as u64),
        };
        new_tags.push(tag);
        new_slot1.push(new_a);
        new_slot2.push(new_b);
        new_generations.push(heap.generation(idx));
    }

    let cells_freed = (free - next) as u64;
    heap.install_compacted(new_tags, new_slot1, new_slot2, new_generations);
    stack.relocate(&remap);
    cells_freed
}

/// Bump every surviving entry's generation counter, capped at
/// `MAX_GENERATION`. Only standard and emergency collections call this — a
/// generational pass does not renumber the whole heap the way a full
/// compaction does, so it must not advance generations itself.
fn bump_generations(heap: &mut NounHeap) {
    let free = heap.free();
    let generations = heap.generations_mut();
    for gen in generations.iter_mut().take(free) {
        if *gen < MAX_GENERATION {
            *gen += 1;
        }
    }
}

fn mark_and_compact(heap: &mut NounHeap, stack: &mut TaskStack, generational: bool) -> u64 {
    let pre_mark_generation = generational.then_some(MAX_GENERATION);
    let marked = mark(heap, stack, pre_mark_generation);
    compact(heap, stack, &marked)
}

/// Grow the heap's backing capacity by `config.growth_factor`, capped at
/// `config.max_capacity`. Returns whether growth actually happened (it may
/// not, if disabled or already at the cap).
pub fn grow_heap(heap: &mut NounHeap, config: &GcConfig) -> bool {
    if !config.auto_expand {
        return false;
    }
    let grown = ((heap.capacity() as f64) * config.growth_factor) as usize;
    let new_capacity = grown.min(config.max_capacity);
    if new_capacity <= heap.capacity() {
        return false;
    }
    heap.grow_to(new_capacity);
    true
}

/// Run a standard mark-compact collection.
pub fn collect_standard(heap: &mut NounHeap, stack: &mut TaskStack, stats: &mut GcStats) -> u64 {
    let span = tracing::debug_span!("gc.standard", free = heap.free(), capacity = heap.capacity());
    let _enter = span.enter();
    let start = Instant::now();
    let freed = mark_and_compact(heap, stack, false);
    bump_generations(heap);
    let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;
    stats.record_collection(freed, elapsed_ms, false);
    stats.observe_usage(heap.free(), heap.capacity());
    tracing::trace!(freed, elapsed_ms, "standard collection complete");
    freed
}

/// Run a standard collection and, if still over `emergency_threshold`
/// afterward, request heap growth.
pub fn collect_emergency(
    heap: &mut NounHeap,
    stack: &mut TaskStack,
    stats: &mut GcStats,
    config: &GcConfig,
) -> u64 {
    let span = tracing::debug_span!("gc.emergency", free = heap.free(), capacity = heap.capacity());
    let _enter = span.enter();
    let start = Instant::now();
    let freed = mark_and_compact(heap, stack, false);
    bump_generations(heap);
    let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;
    stats.record_collection(freed, elapsed_ms, true);
    stats.observe_usage(heap.free(), heap.capacity());

    let still_tight = heap.free() as f64 >= config.emergency_threshold * heap.capacity() as f64;
    if still_tight && grow_heap(heap, config) {
        stats.record_expansion();
        stats.observe_usage(heap.free(), heap.capacity());
    }
    tracing::trace!(freed, elapsed_ms, still_tight, "emergency collection complete");
    freed
}

/// Run a cheaper generational collection: entries at `MAX_GENERATION` are
/// pre-marked (kept alive unconditionally), admitting floating garbage in
/// the old generation until a standard or emergency collect runs. Does not
/// advance generation counters.
pub fn collect_generational(heap: &mut NounHeap, stack: &mut TaskStack, stats: &mut GcStats) -> u64 {
    let span = tracing::debug_span!("gc.generational", free = heap.free(), capacity = heap.capacity());
    let _enter = span.enter();
    let freed = mark_and_compact(heap, stack, true);
    stats.record_generational_collection();
    stats.observe_usage(heap.free(), heap.capacity());
    tracing::trace!(freed, "generational collection complete");
    freed
}

/// The allocator-path safety net: run standard or emergency collection if
/// `heap`'s usage fraction has crossed the corresponding threshold. Called
/// before every allocation in the evaluator, per spec.md §4.7's "allocator
/// also probes thresholds on every alloc call" contract.
pub fn probe_thresholds(
    heap: &mut NounHeap,
    stack: &mut TaskStack,
    stats: &mut GcStats,
    config: &GcConfig,
) {
    if !config.enable_gc || heap.capacity() == 0 {
        return;
    }
    let usage = heap.free() as f64 / heap.capacity() as f64;
    if usage >= config.emergency_threshold {
        collect_emergency(heap, stack, stats, config);
    } else if usage >= config.gc_threshold {
        collect_standard(heap, stack, stats);
    }
}

/// The step-interval safety net: run a generational collection every
/// `config.generational_interval` trampoline steps, if usage has crossed
/// `config.generational_threshold`. An optimization layered on top of
/// `probe_thresholds`, not a correctness requirement.
pub fn maybe_collect_generational(
    heap: &mut NounHeap,
    stack: &mut TaskStack,
    stats: &mut GcStats,
    config: &GcConfig,
    step_count: u64,
) {
    if !config.enable_gc || heap.capacity() == 0 {
        return;
    }
    let interval = config.generational_interval.max(1);
    if step_count % interval != 0 {
        return;
    }
    let usage = heap.free() as f64 / heap.capacity() as f64;
    if usage >= config.generational_threshold {
        collect_generational(heap, stack, stats);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nock_core::{Task, TaskKind};

    fn build_chain(heap: &mut NounHeap, len: usize) -> usize {
        let mut idx = heap.alloc_atom(0).unwrap();
        for i in 1..len as u64 {
            let a = heap.alloc_atom(i).unwrap();
            idx = heap.alloc_cell(a, idx).unwrap();
        }
        idx
    }

    #[test]
    fn collect_standard_frees_unreachable_garbage() {
        let mut heap = NounHeap::with_capacity(64);
        let _garbage = build_chain(&mut heap, 10);
        let root = build_chain(&mut heap, 3);
        let mut stack = TaskStack::new();
        stack.push(TaskKind::Eval, root, 0, 0, 0, 0).unwrap();
        let mut stats = GcStats::new();

        let before = heap.free();
        let freed = collect_standard(&mut heap, &mut stack, &mut stats);
        assert!(freed > 0);
        assert!(heap.free() < before);
        assert_eq!(stats.collections, 1);
    }

    #[test]
    fn collect_preserves_reachable_structure() {
        let mut heap = NounHeap::with_capacity(64);
        let a = heap.alloc_atom(4).unwrap();
        let b = heap.alloc_atom(5).unwrap();
        let root = heap.alloc_cell(a, b).unwrap();
        let mut stack = TaskStack::new();
        stack.push(TaskKind::Eval, root, 0, 0, 0, 0).unwrap();
        let mut stats = GcStats::new();

        collect_standard(&mut heap, &mut stack, &mut stats);
        let new_root = stack.pop().unwrap().a1;
        assert!(heap.is_cell(new_root));
        assert_eq!(heap.value(heap.head(new_root).unwrap()).unwrap(), 4);
        assert_eq!(heap.value(heap.tail(new_root).unwrap()).unwrap(), 5);
    }

    #[test]
    fn generational_collect_keeps_old_generation_alive_without_a_root() {
        let mut heap = NounHeap::with_capacity(64);
        let idx = heap.alloc_atom(7).unwrap();
        for gen in heap.generations_mut().iter_mut() {
            *gen = MAX_GENERATION;
        }
        let mut stack = TaskStack::new();
        // Unrelated root, so `idx` survives only via generational pre-marking.
        let other = heap.alloc_atom(1).unwrap();
        stack.push(TaskKind::Eval, other, 0, 0, 0, 0).unwrap();
        let mut stats = GcStats::new();

        collect_generational(&mut heap, &mut stack, &mut stats);
        assert!(heap.free() >= 2);
        let _ = idx;
    }

    #[test]
    fn grow_heap_respects_max_capacity() {
        let mut heap = NounHeap::with_capacity(10);
        let config = GcConfig::new().with_growth_factor(2.0).with_max_capacity(15);
        assert!(grow_heap(&mut heap, &config));
        assert_eq!(heap.capacity(), 15);
        assert!(!grow_heap(&mut heap, &config));
    }

    #[test]
    fn grow_heap_disabled_does_nothing() {
        let mut heap = NounHeap::with_capacity(10);
        let config = GcConfig::new().with_auto_expand(false);
        assert!(!grow_heap(&mut heap, &config));
        assert_eq!(heap.capacity(), 10);
    }
}
