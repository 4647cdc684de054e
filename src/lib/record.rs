//! Input records and identifier assignment.

/// One unit of input: a (possibly two-stranded) sequence plus its sequence number.
///
/// Records are immutable once read and are consumed by exactly one worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    /// Position of the record in the input, unique across all input files of a run.
    pub number: u64,
    /// Running identifier number, printed as `seq_num` in tabular output.
    pub id_number: u64,
    /// Identifier from the FASTA header (without `>`), or an automatic one.
    pub id: Option<String>,
    /// Raw sequence text as read, including any `&` separator.
    pub sequence: String,
    /// Ancillary lines following the sequence (structure constraints, hints).
    pub rest: Vec<String>,
    /// True if the record was introduced by a header and may span several lines.
    pub multiline: bool,
}

/// Settings for identifier control.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdSettings {
    /// Generate identifiers for records without a header, or always if `replace` is set.
    pub auto_id: bool,
    /// Prefix of generated identifiers.
    pub prefix: String,
    /// Delimiter between prefix and number.
    pub delimiter: String,
    /// Zero-padded width of the number.
    pub digits: usize,
    /// First identifier number.
    pub start: u64,
}

impl Default for IdSettings {
    fn default() -> Self {
        Self {
            auto_id: false,
            prefix: "sequence".to_string(),
            delimiter: "_".to_string(),
            digits: 4,
            start: 1,
        }
    }
}

/// Assigns running identifier numbers and automatic identifiers to records.
///
/// Owned by the dispatch loop; never shared between threads.
#[derive(Debug)]
pub struct IdControl {
    settings: IdSettings,
    next: u64,
}

impl IdControl {
    /// Creates a new identifier control starting at `settings.start`.
    #[must_use]
    pub fn new(settings: IdSettings) -> Self {
        let next = settings.start;
        Self { settings, next }
    }

    /// Assigns the next identifier number, and an automatic identifier if enabled.
    pub fn assign(&mut self, record: &mut Record) {
        record.id_number = self.next;
        if self.settings.auto_id {
            record.id = Some(format!(
                "{}{}{:0width$}",
                self.settings.prefix,
                self.settings.delimiter,
                self.next,
                width = self.settings.digits
            ));
        }
        self.next += 1;
    }

    /// The identifier number that the next record will receive.
    #[must_use]
    pub fn next_id_number(&self) -> u64 {
        self.next
    }
}
