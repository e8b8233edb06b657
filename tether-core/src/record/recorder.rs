use super::Record;

/// Writes a record to an output destination with [`Recorder::write`].
///
/// The episode controller writes one record per applied action and one
/// summary record when the episode is finalized.
pub trait Recorder {
    /// Write a record to the [`Recorder`].
    fn write(&mut self, record: Record);
}

impl<R: Recorder + ?Sized> Recorder for &mut R {
    fn write(&mut self, record: Record) {
        (**self).write(record)
    }
}
