//! The evidence-to-call transform pipeline.
//!
//! Orchestrates the full call-stream rewrite as one lazy pull-based chain:
//!
//! 1. partition the (coordinate-sorted) input into breakend and other calls
//!    by tag, using two independent passes over the record source so neither
//!    side is buffered;
//! 2. reorder the breakend calls into evidence-start order (windowed, O(W));
//! 3. hand them to the injected annotate transform, whose output must still
//!    be W-disordered with respect to nominal position;
//! 4. reorder the transform's output back into nominal-position order;
//! 5. merge deterministically with the held-aside other calls (breakend
//!    stream listed first, so it wins position ties);
//! 6. emit once into the sink.
//!
//! The output is exactly the untouched other calls plus the transformed
//! breakend calls, sorted once by nominal position, with no loss or
//! duplication. Each stage draws one item at a time from its upstream; no
//! stage races ahead of its consumer, and any stage failure aborts the
//! whole transform before the sink is finalized.

use std::cell::Cell;
use std::rc::Rc;

use anyhow::Result;
use log::info;

use crate::calls::{BreakendCall, VariantCall};
use crate::errors::SvasmError;
use crate::merge::{MergeSortedIterator, SortedInput};
use crate::windowed_sort::WindowedSortingIterator;

/// Lazy stream of variant calls.
pub type CallStream = Box<dyn Iterator<Item = Result<VariantCall>>>;

/// Lazy stream of breakend calls.
pub type BreakendStream = Box<dyn Iterator<Item = Result<BreakendCall>>>;

/// A record source the pipeline can pass over more than once.
pub trait CallSource {
    /// Open a fresh pass over the calls, in original file order.
    fn open_calls(&self) -> Result<CallStream>;
}

/// A record sink with atomic replace-or-fail semantics.
pub trait CallSink {
    /// Append one call in final order.
    fn write_call(&mut self, call: &VariantCall) -> Result<()>;

    /// Close the sink, publishing the output; returns calls written.
    fn finish(&mut self) -> Result<u64>;
}

/// Strategy slot for the annotate-with-evidence step.
///
/// Contract: consumes the evidence-start-ordered breakend stream and emits
/// a breakend stream whose disorder relative to nominal position is bounded
/// by the pipeline's window W. Cardinality may change.
pub trait BreakendTransform {
    /// Wrap the sorted breakend stream with the transform.
    fn transform(&self, calls: BreakendStream) -> Result<BreakendStream>;
}

/// An identity transform; useful for re-sorting a call set and in tests.
pub struct PassthroughTransform;

impl BreakendTransform for PassthroughTransform {
    fn transform(&self, calls: BreakendStream) -> Result<BreakendStream> {
        Ok(calls)
    }
}

/// Counts reported by a pipeline run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PipelineCounts {
    /// Breakend calls read from the source.
    pub breakends_in: u64,
    /// Breakend calls written after the transform.
    pub breakends_out: u64,
    /// Other calls passed through untouched.
    pub others: u64,
    /// Total calls written to the sink.
    pub written: u64,
}

/// The orchestrated transform pipeline.
pub struct VariantTransformPipeline<T: BreakendTransform> {
    window: i64,
    transform: T,
}

impl<T: BreakendTransform> VariantTransformPipeline<T> {
    /// Create a pipeline with reorder window `window` (sort-key units).
    pub fn new(window: i64, transform: T) -> Result<Self> {
        if window <= 0 {
            return Err(SvasmError::InvalidParameter {
                parameter: "window".to_string(),
                reason: format!("reorder window must be positive, got {window}"),
            }
            .into());
        }
        Ok(Self { window, transform })
    }

    /// Run the full transform from `source` into `sink`.
    pub fn run(&self, source: &dyn CallSource, sink: &mut dyn CallSink) -> Result<PipelineCounts> {
        info!("Transforming breakend calls (reorder window {} bp)", self.window);

        // Pass 1: breakend calls only, re-sorted to evidence-start order.
        let breakends_in = Rc::new(Cell::new(0u64));
        let tally = Rc::clone(&breakends_in);
        let breakends: BreakendStream =
            Box::new(source.open_calls()?.filter_map(move |result| match result {
                Ok(VariantCall::Breakend(call)) => {
                    tally.set(tally.get() + 1);
                    Some(Ok(call))
                }
                Ok(VariantCall::Other(_)) => None,
                Err(e) => Some(Err(e)),
            }));
        let by_evidence_start =
            WindowedSortingIterator::new(breakends, self.window, |c: &BreakendCall| {
                c.evidence_key()
            });

        // Annotate, then restore nominal-position order.
        let transformed = self.transform.transform(Box::new(by_evidence_start))?;
        let by_nominal =
            WindowedSortingIterator::new(transformed, self.window, |c: &BreakendCall| {
                c.nominal_key()
            });
        let breakend_input: SortedInput<VariantCall> =
            Box::new(by_nominal.map(|result| result.map(VariantCall::Breakend)));

        // Pass 2: the untouched other calls, already in nominal order.
        let other_input: SortedInput<VariantCall> =
            Box::new(source.open_calls()?.filter(|result| {
                !matches!(result, Ok(call) if call.is_breakend())
            }));

        // Breakend stream first: it wins deterministic position ties.
        let merged = MergeSortedIterator::new(
            vec![breakend_input, other_input],
            VariantCall::nominal_key,
        );

        let mut counts = PipelineCounts::default();
        for result in merged {
            let call = result?;
            match &call {
                VariantCall::Breakend(_) => counts.breakends_out += 1,
                VariantCall::Other(_) => counts.others += 1,
            }
            sink.write_call(&call)?;
        }
        counts.written = sink.finish()?;
        counts.breakends_in = breakends_in.get();

        info!(
            "Transform complete: {} breakend calls in, {} out, {} other calls, {} written",
            counts.breakends_in, counts.breakends_out, counts.others, counts.written
        );
        Ok(counts)
    }
}
