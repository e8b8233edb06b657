use super::{Record, Recorder};

/// Buffered recorder.
///
/// Keeps every record in memory. This is used for inspecting step records and
/// episode summaries after a run, mostly in tests.
#[derive(Default)]
pub struct BufferedRecorder {
    buf: Vec<Record>,
}

impl BufferedRecorder {
    /// Construct the recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns an iterator over the records.
    pub fn iter(&self) -> std::slice::Iter<Record> {
        self.buf.iter()
    }

    /// Returns the number of records written so far.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Returns `true` if no record has been written.
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Returns the last record, usually the episode summary.
    pub fn last(&self) -> Option<&Record> {
        self.buf.last()
    }
}

impl Recorder for BufferedRecorder {
    /// Push a [`Record`] to the buffer.
    fn write(&mut self, record: Record) {
        self.buf.push(record);
    }
}
