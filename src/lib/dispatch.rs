//! Batch driver: reads records, folds them on a worker pool and writes the results.
//!
//! The calling thread owns the readers and the identifier control. It reserves an
//! output slot for every record before handing it to a worker, so the ordered queue
//! always knows which sequence numbers are outstanding. Workers receive records over
//! a zero-capacity (rendezvous) channel, which bounds the number of records in
//! flight by the number of workers.
//!
//! With a single job no threads are spawned and every record is folded on the
//! calling thread, producing byte-identical output.
//!
//! The first run-aborting error is kept; once it is set no further records are
//! admitted, records already in flight finish and everything completed is flushed.
//! A record a worker receives after the error is not folded; its slot is filled
//! with an empty output. A panic while folding a record is caught and treated as
//! that record's run-aborting error.

use std::fs::File;
use std::any::Any;
use std::io::{self, BufRead, BufReader, Cursor};
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::thread;

use log::{debug, warn};
use parking_lot::Mutex;

use crate::config::RunConfig;
use crate::errors::{MultifoldError, Result};
use crate::fold::FoldEngine;
use crate::output::{OutputSink, RecordOutput};
use crate::pipeline::{RecordFailure, malformed_output, process_record};
use crate::progress::ProgressTracker;
use crate::queue::OutputQueue;
use crate::reader::{ReaderEvent, RecordReader};
use crate::record::{IdControl, Record};

/// Records between progress log lines.
pub const PROGRESS_LOG_INTERVAL: u64 = 1_000;

/// A source of input records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputSource {
    /// Standard input.
    Stdin,
    /// A file on disk.
    File(PathBuf),
    /// In-memory text, mainly for tests and library users.
    Text {
        /// Name used in log messages.
        name: String,
        /// The input text.
        content: String,
    },
}

impl InputSource {
    /// Name of the source for log messages and error reports.
    #[must_use]
    pub fn name(&self) -> String {
        match self {
            Self::Stdin => "<stdin>".to_string(),
            Self::File(path) => path.display().to_string(),
            Self::Text { name, .. } => name.clone(),
        }
    }

    /// Opens the source for reading.
    ///
    /// # Errors
    ///
    /// Returns the I/O error if a file cannot be opened.
    pub fn open(&self) -> io::Result<Box<dyn BufRead>> {
        Ok(match self {
            Self::Stdin => Box::new(BufReader::new(io::stdin())),
            Self::File(path) => Box::new(BufReader::new(File::open(path)?)),
            Self::Text { content, .. } => Box::new(Cursor::new(content.clone().into_bytes())),
        })
    }
}

/// Counters of a finished (or aborted) run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Records that went through the pipeline, including a failed one.
    pub records: u64,
    /// Malformed records reported by the reader.
    pub malformed: u64,
    /// Outputs written to the sink, malformed records included.
    pub flushed: u64,
    /// Nucleotides of all folded records.
    pub nucleotides: u64,
    /// Largest number of records folded at the same time.
    pub peak_in_flight: usize,
    /// Inputs that could not be opened or read to the end.
    pub skipped_inputs: Vec<String>,
}

/// Outcome of [`run_batch`]: the sink is handed back even when the run failed.
pub struct BatchReport<S> {
    /// The output sink, flushed.
    pub sink: S,
    /// Run counters.
    pub summary: RunSummary,
    /// The error that ended the run, if any.
    pub error: Option<MultifoldError>,
}

impl<S> BatchReport<S> {
    /// Converts the report into a `Result`, dropping the sink on failure.
    ///
    /// # Errors
    ///
    /// Returns the error that ended the run.
    pub fn into_result(self) -> Result<(S, RunSummary)> {
        match self.error {
            Some(error) => Err(error),
            None => Ok((self.sink, self.summary)),
        }
    }
}

/// Folds every record of `inputs` and writes the results to `sink`.
///
/// Inputs are read one after the other and share one sequence numbering. An input
/// that cannot be opened, or fails while being read, is skipped with a warning and
/// reported as [`MultifoldError::SkippedInputs`] once everything else is done.
pub fn run_batch<E: FoldEngine, S: OutputSink>(
    engine: &E,
    config: &RunConfig,
    inputs: &[InputSource],
    sink: S,
) -> BatchReport<S> {
    let run = BatchRun {
        engine,
        config,
        queue: OutputQueue::new(sink, config.ordering, 0),
        state: RunState::new(),
    };
    if let Some(header) = config.tabular_header() {
        if let Err(error) = run.queue.write_preamble(&header) {
            run.state.set_error(error);
        }
    }

    let tally = run.execute(inputs);
    run.state.progress.log_final();

    let BatchRun { queue, state, .. } = run;
    let flushed = queue.flushed();
    let (sink, closed) = queue.close();

    let mut error = state.error.into_inner();
    if let Err(close_error) = closed {
        match &error {
            Some(_) => debug!("Output queue closed after failure: {close_error}"),
            None => error = Some(close_error),
        }
    }
    if error.is_none() && !tally.skipped.is_empty() {
        error = Some(MultifoldError::SkippedInputs { paths: tally.skipped.clone() });
    }

    let summary = RunSummary {
        records: state.progress.records(),
        malformed: tally.malformed,
        flushed,
        nucleotides: state.progress.nucleotides(),
        peak_in_flight: state.peak_in_flight.into_inner(),
        skipped_inputs: tally.skipped,
    };
    BatchReport { sink, summary, error }
}

/// What the dispatch loop saw while reading.
#[derive(Debug, Default)]
struct DispatchTally {
    malformed: u64,
    skipped: Vec<String>,
}

/// State shared between the dispatch loop and the workers.
struct RunState {
    /// Flag indicating a run-aborting error occurred.
    aborted: AtomicBool,
    /// Storage for the first error.
    error: Mutex<Option<MultifoldError>>,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
    progress: ProgressTracker,
}

impl RunState {
    fn new() -> Self {
        Self {
            aborted: AtomicBool::new(false),
            error: Mutex::new(None),
            in_flight: AtomicUsize::new(0),
            peak_in_flight: AtomicUsize::new(0),
            progress: ProgressTracker::new("Folded").with_interval(PROGRESS_LOG_INTERVAL),
        }
    }

    /// Record an error and stop admitting records.
    fn set_error(&self, error: MultifoldError) {
        self.aborted.store(true, Ordering::SeqCst);
        let mut guard = self.error.lock();
        if guard.is_none() {
            *guard = Some(error);
        } else {
            debug!("Additional error after run was aborted: {error}");
        }
    }

    fn has_error(&self) -> bool {
        self.aborted.load(Ordering::SeqCst)
    }
}

struct BatchRun<'a, E, S: OutputSink> {
    engine: &'a E,
    config: &'a RunConfig,
    queue: OutputQueue<S>,
    state: RunState,
}

impl<E: FoldEngine, S: OutputSink> BatchRun<'_, E, S> {
    fn execute(&self, inputs: &[InputSource]) -> DispatchTally {
        let jobs = self.config.jobs.max(1);
        if jobs == 1 {
            return self.dispatch(inputs, &mut |record| {
                self.fold(&record);
                true
            });
        }

        thread::scope(|scope| {
            let (tx, rx) = crossbeam_channel::bounded::<Record>(0);
            let mut handles = Vec::with_capacity(jobs);
            for i in 0..jobs {
                let rx = rx.clone();
                let name = format!("multifold-worker-{i}");
                let spawned = thread::Builder::new().name(name.clone()).spawn_scoped(scope, move || {
                    for record in rx {
                        if self.state.has_error() {
                            self.discard(&record);
                        } else {
                            self.fold(&record);
                        }
                    }
                });
                match spawned {
                    Ok(handle) => handles.push((name, handle)),
                    Err(error) => {
                        self.state.set_error(error.into());
                        break;
                    }
                }
            }
            drop(rx);
            debug!("Started {} worker thread(s)", handles.len());

            let tally = self.dispatch(inputs, &mut |record| tx.send(record).is_ok());
            drop(tx);

            for (name, handle) in handles {
                if handle.join().is_err() {
                    self.state.set_error(MultifoldError::WorkerPanicked { name });
                }
            }
            tally
        })
    }

    /// Reads all inputs on the calling thread, handing records to `submit`.
    ///
    /// `submit` returns `false` if the record could not be handed over.
    fn dispatch(
        &self,
        inputs: &[InputSource],
        submit: &mut dyn FnMut(Record) -> bool,
    ) -> DispatchTally {
        let mut tally = DispatchTally::default();
        let mut ids = IdControl::new(self.config.ids.clone());
        let limit = self.config.record_limit();
        let mut admitted = 0_u64;
        let mut next_number = 0_u64;

        'inputs: for input in inputs {
            let name = input.name();
            let source = match input.open() {
                Ok(source) => source,
                Err(error) => {
                    warn!("Skipping input '{name}': {error}");
                    tally.skipped.push(name);
                    continue;
                }
            };
            debug!("Reading records from '{name}'");

            let mut reader = RecordReader::starting_at(source, next_number);
            loop {
                if self.state.has_error() || limit.is_some_and(|limit| admitted >= limit) {
                    break 'inputs;
                }
                let event = match reader.next_event() {
                    Ok(Some(event)) => event,
                    Ok(None) => break,
                    Err(error) => {
                        warn!("Stopped reading '{name}' after a read error: {error}");
                        tally.skipped.push(name);
                        break;
                    }
                };
                match event {
                    ReaderEvent::Malformed(malformed) => {
                        tally.malformed += 1;
                        let output =
                            malformed_output(malformed.number, malformed.line, &malformed.reason);
                        let result = self
                            .queue
                            .reserve(malformed.number)
                            .and_then(|()| self.queue.provide(output));
                        if let Err(error) = result {
                            self.state.set_error(error);
                        }
                    }
                    ReaderEvent::Record(mut record) => {
                        ids.assign(&mut record);
                        if let Err(error) = self.queue.reserve(record.number) {
                            self.state.set_error(error);
                            break 'inputs;
                        }
                        admitted += 1;
                        if !submit(record) {
                            break 'inputs;
                        }
                    }
                }
            }
            next_number = reader.next_number();
        }
        tally
    }

    /// Folds one record and hands its output to the queue.
    fn fold(&self, record: &Record) {
        let current = self.state.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.state.peak_in_flight.fetch_max(current, Ordering::SeqCst);

        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            process_record(self.engine, self.config, record)
        }));
        let output = match result {
            Ok(Ok(output)) => output,
            Ok(Err(RecordFailure { output, error })) => {
                self.state.set_error(error);
                output
            }
            Err(panic_info) => {
                let error = MultifoldError::RecordPanicked {
                    number: record.number,
                    message: panic_message(&*panic_info),
                };
                let mut output = RecordOutput::new(record.number);
                output.error(&error.to_string());
                self.state.set_error(error);
                output
            }
        };
        if let Err(error) = self.queue.provide(output) {
            self.state.set_error(error);
        }

        self.state.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.state.progress.record(record.sequence.len() as u64);
    }

    /// Fills the slot of a record handed over after the run was aborted.
    fn discard(&self, record: &Record) {
        debug!("Not folding record {} after the run was aborted", record.number);
        if let Err(error) = self.queue.provide(RecordOutput::new(record.number)) {
            self.state.set_error(error);
        }
    }
}

/// Extracts the message of a caught panic.
fn panic_message(panic_info: &(dyn Any + Send)) -> String {
    if let Some(message) = panic_info.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic_info.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
