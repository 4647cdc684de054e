//! Ordered output queue shared by all workers.
//!
//! The queue couples a [`ReorderBuffer`] with the output sink under a single
//! `parking_lot` mutex: a `provide` call buffers the finished output and, in the
//! same critical section, writes every output that has become contiguous. The
//! worker completing the oldest outstanding record therefore flushes all later
//! records that finished before it.
//!
//! Under [`OrderingPolicy::Unordered`] the reorder buffer is bypassed and outputs
//! are written as soon as they are provided.

use parking_lot::Mutex;

use crate::errors::{MultifoldError, Result};
use crate::output::{OutputSink, RecordOutput};
use crate::reorder_buffer::ReorderBuffer;

/// Whether outputs must appear in input order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OrderingPolicy {
    /// Outputs are written strictly in sequence-number order.
    #[default]
    KeepOrder,
    /// Outputs are written as soon as they are produced.
    Unordered,
}

struct QueueState<S> {
    buffer: ReorderBuffer<RecordOutput>,
    sink: S,
    flushed: u64,
}

/// Thread-safe ordered output queue.
pub struct OutputQueue<S: OutputSink> {
    policy: OrderingPolicy,
    state: Mutex<QueueState<S>>,
}

impl<S: OutputSink> OutputQueue<S> {
    /// Creates a queue whose first record has sequence number `first`.
    pub fn new(sink: S, policy: OrderingPolicy, first: u64) -> Self {
        let state = QueueState { buffer: ReorderBuffer::starting_at(first), sink, flushed: 0 };
        Self { policy, state: Mutex::new(state) }
    }

    /// The ordering policy.
    pub fn policy(&self) -> OrderingPolicy {
        self.policy
    }

    /// Reserves the slot for record `seq`. Must be called in dispatch order.
    ///
    /// # Errors
    ///
    /// Returns an ordering violation if `seq` is not the next sequence number.
    pub fn reserve(&self, seq: u64) -> Result<()> {
        if self.policy == OrderingPolicy::Unordered {
            return Ok(());
        }
        self.state.lock().buffer.reserve(seq)
    }

    /// Hands over a finished output and writes everything that became ready.
    ///
    /// # Errors
    ///
    /// Returns an ordering violation for an unexpected sequence number, or the sink's
    /// I/O error.
    pub fn provide(&self, output: RecordOutput) -> Result<()> {
        let mut state = self.state.lock();
        let state = &mut *state;
        match self.policy {
            OrderingPolicy::Unordered => {
                state.sink.write_output(&output)?;
                state.flushed += 1;
            }
            OrderingPolicy::KeepOrder => {
                state.buffer.provide(output.number, output)?;
                for ready in state.buffer.drain_ready() {
                    state.sink.write_output(&ready)?;
                    state.flushed += 1;
                }
            }
        }
        Ok(())
    }

    /// Writes text to the sink outside of any record.
    ///
    /// # Errors
    ///
    /// Returns the sink's I/O error.
    pub fn write_preamble(&self, text: &str) -> Result<()> {
        self.state.lock().sink.write_preamble(text)?;
        Ok(())
    }

    /// Number of outputs written to the sink so far.
    pub fn flushed(&self) -> u64 {
        self.state.lock().flushed
    }

    /// Closes the queue, flushing the sink and returning it.
    ///
    /// The sink is returned even if reserved records were never provided; that
    /// condition is reported in the accompanying result. Outputs that were waiting
    /// behind a missing record are written after a warning naming the gap.
    pub fn close(self) -> (S, Result<()>) {
        let QueueState { buffer, mut sink, .. } = self.state.into_inner();
        let (stranded, complete) = buffer.close();
        let written = write_stranded(&mut sink, &complete, stranded);
        let flushed = sink.flush().map_err(Into::into);
        (sink, complete.and(written).and(flushed))
    }
}

/// Writes outputs left behind a gap; the first one carries a note about the gap.
fn write_stranded<S: OutputSink>(
    sink: &mut S,
    complete: &Result<()>,
    mut stranded: Vec<RecordOutput>,
) -> Result<()> {
    let count = stranded.len();
    let (Err(MultifoldError::IncompleteOutput { missing, first }), Some(next)) =
        (complete, stranded.first_mut())
    else {
        return Ok(());
    };
    let mut note = RecordOutput::new(next.number);
    note.warn(&format!(
        "{missing} record(s) starting at record {first} produced no output; \
         writing the {count} record(s) completed after them"
    ));
    next.diagnostics.insert_str(0, &note.diagnostics);
    for output in &stranded {
        sink.write_output(output)?;
    }
    Ok(())
}
