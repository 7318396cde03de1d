//! `NockContext`: the owned bundle of heap, task stack, configuration, and
//! stats that is the unit of interpreter state.
//!
//! spec.md's Design Notes point out that a faithful port of the reference
//! would keep the heap, stack, and stats as process-wide globals, then
//! recommend parameterising them instead so nested or parallel interpreters
//! are possible by constructing more than one context. This crate takes that
//! recommendation: there are no `static`s anywhere in `nock-core` or
//! `nock-runtime`, and every public entry point is a method on (or a thin
//! free-function wrapper around) a `NockContext` value.

use nock_core::{externalise, materialise, ExternalNoun, NockError, NounHeap, TaskStack};

use crate::config::{GcConfig, GcStats};
use crate::{evaluator, gc};

/// Owned interpreter state: a noun heap, a task stack, GC configuration, and
/// collection statistics.
///
/// A context is not reentrant: calling `nock` from within a callback reached
/// during another `nock` call on the *same* context returns
/// `NockError::AlreadyRunning` rather than corrupting heap state (see §5 and
/// the reentrancy Open Question in DESIGN.md). Separate contexts are fully
/// independent; nothing here is `Send`/`Sync`, matching §5's single-threaded
/// contract.
#[derive(Debug)]
pub struct NockContext {
    heap: NounHeap,
    stack: TaskStack,
    config: GcConfig,
    stats: GcStats,
    busy: bool,
}

impl NockContext {
    /// A fresh context with default heap/stack capacities and default GC
    /// configuration.
    pub fn new() -> Self {
        NockContext {
            heap: NounHeap::new(),
            stack: TaskStack::new(),
            config: GcConfig::default(),
            stats: GcStats::new(),
            busy: false,
        }
    }

    /// A fresh context using `config` instead of the defaults.
    pub fn with_config(config: GcConfig) -> Self {
        NockContext {
            heap: NounHeap::new(),
            stack: TaskStack::new(),
            config,
            stats: GcStats::new(),
            busy: false,
        }
    }

    /// Evaluate `*[subject formula]` to completion, materialising both
    /// arguments and externalising the result.
    ///
    /// Returns `NockError::AlreadyRunning` if called while this context is
    /// already mid-evaluation (only reachable via re-entrant misuse, since
    /// ordinary call sites hold `&mut self` for the duration).
    pub fn nock(
        &mut self,
        subject: &ExternalNoun,
        formula: &ExternalNoun,
    ) -> Result<ExternalNoun, NockError> {
        if self.busy {
            return Err(NockError::AlreadyRunning);
        }
        self.busy = true;
        let result = self.nock_inner(subject, formula);
        self.busy = false;
        result
    }

    fn nock_inner(
        &mut self,
        subject: &ExternalNoun,
        formula: &ExternalNoun,
    ) -> Result<ExternalNoun, NockError> {
        let span = tracing::debug_span!("nock");
        let _enter = span.enter();
        let s = materialise(subject, &mut self.heap)?;
        let f = materialise(formula, &mut self.heap)?;
        let result_idx = evaluator::run(
            &mut self.heap,
            &mut self.stack,
            &mut self.stats,
            &self.config,
            s,
            f,
        )?;
        externalise(result_idx, &self.heap)
    }

    /// Materialise `noun` into this context's heap, returning the root index.
    pub fn materialise(&mut self, noun: &ExternalNoun) -> Result<usize, NockError> {
        materialise(noun, &mut self.heap)
    }

    /// Read the heap entry at `idx` back out as an `ExternalNoun`.
    pub fn externalise(&self, idx: usize) -> Result<ExternalNoun, NockError> {
        externalise(idx, &self.heap)
    }

    /// A snapshot of current usage/capacity plus cumulative collection
    /// statistics.
    pub fn gc_status(&self) -> GcStats {
        let mut stats = self.stats.clone();
        stats.observe_usage(self.heap.free(), self.heap.capacity());
        stats
    }

    /// Force a collection now: standard, or emergency (which may also grow
    /// the heap) when `emergency` is true. Returns the stats snapshot after
    /// the collection completes.
    pub fn run_gc(&mut self, emergency: bool) -> GcStats {
        if emergency {
            gc::collect_emergency(&mut self.heap, &mut self.stack, &mut self.stats, &self.config);
        } else {
            gc::collect_standard(&mut self.heap, &mut self.stack, &mut self.stats);
        }
        self.gc_status()
    }

    /// Validate and install new GC configuration, returning the validated
    /// config (so callers can observe any normalisation) or a `ConfigError`.
    pub fn configure_gc(&mut self, options: GcConfig) -> Result<GcConfig, NockError> {
        let validated = options.build()?;
        self.config = validated.clone();
        Ok(validated)
    }

    /// The configuration currently in effect.
    pub fn config(&self) -> &GcConfig {
        &self.config
    }

    /// Zero `free`, drop every heap entry, empty the task stack, and reset
    /// stats to their defaults. Every index previously returned by
    /// `materialise` becomes invalid.
    pub fn reset_memory(&mut self) {
        self.heap.reset();
        self.stack = TaskStack::with_capacity(self.stack.capacity());
        self.stats = GcStats::new();
        self.busy = false;
    }
}

impl Default for NockContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Evaluate `*[subject formula]` in a fresh, throwaway context — the common
/// case when callers don't need to share heap state or GC configuration
/// across multiple evaluations.
pub fn nock(subject: &ExternalNoun, formula: &ExternalNoun) -> Result<ExternalNoun, NockError> {
    NockContext::new().nock(subject, formula)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn free_function_evaluates_constant() {
        let result = nock(&ExternalNoun::Atom(42), &ExternalNoun::cell(1u64, 3u64)).unwrap();
        assert_eq!(result, ExternalNoun::Atom(3));
    }

    #[test]
    fn context_reuse_across_calls() {
        let mut ctx = NockContext::new();
        assert_eq!(
            ctx.nock(&ExternalNoun::Atom(42), &ExternalNoun::cell(1u64, 3u64)).unwrap(),
            ExternalNoun::Atom(3)
        );
        assert_eq!(
            ctx.nock(&ExternalNoun::Atom(7), &ExternalNoun::cell(4u64, ExternalNoun::cell(0u64, 1u64))).unwrap(),
            ExternalNoun::Atom(8)
        );
        assert!(ctx.gc_status().usage > 0);
    }

    #[test]
    fn reset_memory_invalidates_prior_state() {
        let mut ctx = NockContext::new();
        ctx.nock(&ExternalNoun::Atom(1), &ExternalNoun::cell(1u64, 9u64)).unwrap();
        assert!(ctx.gc_status().usage > 0);
        ctx.reset_memory();
        assert_eq!(ctx.gc_status().usage, 0);
    }

    #[test]
    fn reset_is_idempotent() {
        let mut ctx = NockContext::new();
        ctx.reset_memory();
        ctx.reset_memory();
        assert_eq!(ctx.gc_status().usage, 0);
    }

    #[test]
    fn configure_gc_rejects_invalid_threshold() {
        let mut ctx = NockContext::new();
        let err = ctx.configure_gc(GcConfig::new().with_threshold(1.5)).unwrap_err();
        assert!(matches!(err, NockError::ConfigError(_)));
    }

    #[test]
    fn configure_gc_installs_valid_config() {
        let mut ctx = NockContext::new();
        let installed = ctx.configure_gc(GcConfig::new().with_threshold(0.5)).unwrap();
        assert_eq!(installed.gc_threshold, 0.5);
        assert_eq!(ctx.config().gc_threshold, 0.5);
    }

    #[test]
    fn run_gc_reports_a_collection() {
        let mut ctx = NockContext::new();
        for _ in 0..50 {
            ctx.nock(&ExternalNoun::Atom(1), &ExternalNoun::cell(1u64, 1u64)).unwrap();
        }
        let stats = ctx.run_gc(false);
        assert_eq!(stats.collections, 1);
    }

    #[test]
    fn busy_flag_is_not_left_set_after_a_fault() {
        let mut ctx = NockContext::new();
        let err = ctx.nock(&ExternalNoun::Atom(1), &ExternalNoun::cell(42u64, 1u64));
        assert!(err.is_err());
        // A second call must not observe AlreadyRunning left over from the
        // faulted first call.
        let ok = ctx.nock(&ExternalNoun::Atom(1), &ExternalNoun::cell(1u64, 5u64));
        assert_eq!(ok.unwrap(), ExternalNoun::Atom(5));
    }
}
