//! Capability-tagged byte streams owned by a context.
//!
//! An [`IoObject`] unifies the three stream backings the boundary accepts
//! (a file path, a caller-supplied buffer, and a growable output sink) under
//! one `Read`/`Write`/`Seek` surface that engine collaborators stream
//! through.
//!
//! The declared [`IoMode`] is advisory metadata describing caller intent; it
//! is validated at construction but not enforced against the operations
//! actually performed. Nothing at this layer rejects an out-of-mode read or
//! write, and callers must not rely on it doing so.

use crate::errors::FlowError;
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{Cursor, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// What is possible with an IO object.
///
/// Numeric values are part of the boundary contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IoMode {
    /// No capabilities.
    None,
    /// Sequential reads only.
    ReadSequential,
    /// Sequential writes only.
    WriteSequential,
    /// Reads with seeking.
    ReadSeekable,
    /// Writes with seeking.
    WriteSeekable,
    /// Reads and writes with seeking.
    ReadWriteSeekable,
}

impl IoMode {
    /// Returns the stable numeric value for this mode.
    #[must_use]
    pub fn value(self) -> i32 {
        match self {
            Self::None => 0,
            Self::ReadSequential => 1,
            Self::WriteSequential => 2,
            Self::ReadSeekable => 5,
            Self::WriteSeekable => 6,
            Self::ReadWriteSeekable => 15,
        }
    }

    /// Maps a numeric value to a mode; `None` for undefined combinations.
    #[must_use]
    pub fn from_value(value: i32) -> Option<Self> {
        match value {
            0 => Some(Self::None),
            1 => Some(Self::ReadSequential),
            2 => Some(Self::WriteSequential),
            5 => Some(Self::ReadSeekable),
            6 => Some(Self::WriteSeekable),
            15 => Some(Self::ReadWriteSeekable),
            _ => None,
        }
    }

    /// Returns true if the mode declares read capability.
    #[must_use]
    pub fn can_read(self) -> bool {
        matches!(
            self,
            Self::ReadSequential | Self::ReadSeekable | Self::ReadWriteSeekable
        )
    }

    /// Returns true if the mode declares write capability.
    #[must_use]
    pub fn can_write(self) -> bool {
        matches!(
            self,
            Self::WriteSequential | Self::WriteSeekable | Self::ReadWriteSeekable
        )
    }
}

/// Whether a stream feeds the engine or receives its output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// The engine reads from this stream.
    In,
    /// The engine writes to this stream.
    Out,
}

impl Direction {
    /// Returns the stable numeric value for this direction.
    #[must_use]
    pub fn value(self) -> i32 {
        match self {
            Self::In => 4,
            Self::Out => 8,
        }
    }

    /// Maps a numeric value to a direction.
    #[must_use]
    pub fn from_value(value: i32) -> Option<Self> {
        match value {
            4 => Some(Self::In),
            8 => Some(Self::Out),
            _ => None,
        }
    }
}

/// When a context-owned resource should be released.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CleanupWith {
    /// Released when the context is destroyed.
    Context,
    /// Released with the first job the item is associated with.
    /// Reserved; construction rejects it with a not-implemented error.
    FirstJob,
}

impl CleanupWith {
    /// Returns the stable numeric value for this policy.
    #[must_use]
    pub fn value(self) -> i32 {
        match self {
            Self::Context => 0,
            Self::FirstJob => 1,
        }
    }

    /// Maps a numeric value to a policy.
    #[must_use]
    pub fn from_value(value: i32) -> Option<Self> {
        match value {
            0 => Some(Self::Context),
            1 => Some(Self::FirstJob),
            _ => None,
        }
    }
}

/// The caller's promise about how long a supplied buffer stays valid.
///
/// Both values currently result in an immediate copy: a foreign borrow
/// pinned "until context destruction" cannot be checked from this side of
/// the boundary, so the port trades the zero-copy opportunity of
/// [`Lifetime::OutlivesContext`] for safety. Later mutation of the caller's
/// buffer is therefore never observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Lifetime {
    /// The buffer outlives this function call only; the engine copies it.
    OutlivesFunctionCall,
    /// The caller promises the buffer stays valid and unmoved until the
    /// context is destroyed.
    OutlivesContext,
}

impl Lifetime {
    /// Returns the stable numeric value for this lifetime contract.
    #[must_use]
    pub fn value(self) -> i32 {
        match self {
            Self::OutlivesFunctionCall => 0,
            Self::OutlivesContext => 1,
        }
    }

    /// Maps a numeric value to a lifetime contract.
    #[must_use]
    pub fn from_value(value: i32) -> Option<Self> {
        match value {
            0 => Some(Self::OutlivesFunctionCall),
            1 => Some(Self::OutlivesContext),
            _ => None,
        }
    }
}

#[derive(Debug)]
enum IoBacking {
    File { file: File, path: PathBuf },
    Buffer(Cursor<Vec<u8>>),
    OutputBuffer(Cursor<Vec<u8>>),
    /// Sink that accepts writes and refuses its teardown flush. Stands in
    /// for devices that fail at sync time in teardown tests.
    #[cfg(test)]
    FailingSink,
}

/// A context-owned stream over a file, a copied buffer, or a growable sink.
#[derive(Debug)]
pub struct IoObject {
    mode: IoMode,
    cleanup: CleanupWith,
    backing: IoBacking,
}

impl IoObject {
    /// Opens a file-backed stream.
    ///
    /// The file is opened according to `mode`: read modes open an existing
    /// file, write modes create or truncate, and `ReadWriteSeekable` opens
    /// for both without truncating.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` for `IoMode::None`, `NotImplemented` for the
    /// reserved `CleanupWith::FirstJob` policy, `Io` if the open fails.
    pub fn for_file(
        path: impl AsRef<Path>,
        mode: IoMode,
        cleanup: CleanupWith,
    ) -> Result<Self, FlowError> {
        reject_reserved_cleanup(cleanup)?;
        let path = path.as_ref();
        let mut options = OpenOptions::new();
        match mode {
            IoMode::None => {
                return Err(FlowError::InvalidArgument(
                    "IoMode::None is not an openable file mode".into(),
                ))
            }
            IoMode::ReadSequential | IoMode::ReadSeekable => {
                options.read(true);
            }
            IoMode::WriteSequential | IoMode::WriteSeekable => {
                options.write(true).create(true).truncate(true);
            }
            IoMode::ReadWriteSeekable => {
                options.read(true).write(true).create(true);
            }
        }
        let file = options.open(path)?;
        Ok(Self {
            mode,
            cleanup,
            backing: IoBacking::File {
                file,
                path: path.to_path_buf(),
            },
        })
    }

    /// Creates a stream over a copy of the caller's buffer.
    ///
    /// The bytes are copied immediately regardless of `lifetime`; the caller
    /// may free or mutate the original as soon as this returns. See
    /// [`Lifetime`] for why `OutlivesContext` does not borrow.
    ///
    /// # Errors
    ///
    /// `NotImplemented` for the reserved `CleanupWith::FirstJob` policy.
    pub fn from_buffer(
        bytes: &[u8],
        lifetime: Lifetime,
        cleanup: CleanupWith,
    ) -> Result<Self, FlowError> {
        reject_reserved_cleanup(cleanup)?;
        let _ = lifetime; // declared intent only; both contracts copy
        Ok(Self {
            mode: IoMode::ReadSeekable,
            cleanup,
            backing: IoBacking::Buffer(Cursor::new(bytes.to_vec())),
        })
    }

    /// Creates a growable output sink.
    ///
    /// Storage is engine-managed and append-oriented; it may reallocate as
    /// it grows, so borrowed views from [`output_buffer`](Self::output_buffer)
    /// are only stable until the next write.
    #[must_use]
    pub fn for_output_buffer() -> Self {
        Self {
            mode: IoMode::WriteSeekable,
            cleanup: CleanupWith::Context,
            backing: IoBacking::OutputBuffer(Cursor::new(Vec::new())),
        }
    }

    /// Creates a sink whose teardown flush always fails.
    #[cfg(test)]
    pub(crate) fn for_failing_sink() -> Self {
        Self {
            mode: IoMode::WriteSeekable,
            cleanup: CleanupWith::Context,
            backing: IoBacking::FailingSink,
        }
    }

    /// Returns the declared (advisory) mode.
    #[must_use]
    pub fn mode(&self) -> IoMode {
        self.mode
    }

    /// Returns the cleanup policy.
    #[must_use]
    pub fn cleanup(&self) -> CleanupWith {
        self.cleanup
    }

    /// Returns a short name for the backing kind.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match &self.backing {
            IoBacking::File { .. } => "file",
            IoBacking::Buffer(_) => "buffer",
            IoBacking::OutputBuffer(_) => "output_buffer",
            #[cfg(test)]
            IoBacking::FailingSink => "failing_sink",
        }
    }

    /// Returns the backing file path, if file-backed.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        match &self.backing {
            IoBacking::File { path, .. } => Some(path),
            _ => None,
        }
    }

    /// Returns a borrowed view of the output sink's current contents.
    ///
    /// `None` unless this object was created with
    /// [`for_output_buffer`](Self::for_output_buffer). The view is valid
    /// until the next write to this object or until it is destroyed with its
    /// context, whichever comes first.
    #[must_use]
    pub fn output_buffer(&self) -> Option<&[u8]> {
        match &self.backing {
            IoBacking::OutputBuffer(cursor) => Some(cursor.get_ref().as_slice()),
            _ => None,
        }
    }

    /// Flushes durable state ahead of teardown.
    ///
    /// Write-mode files are synced so a teardown failure surfaces as a
    /// collected I/O error instead of silent data loss. Memory backings have
    /// nothing to flush.
    pub fn flush_for_teardown(&mut self) -> Result<(), FlowError> {
        match &mut self.backing {
            IoBacking::File { file, path } => {
                if self.mode.can_write() {
                    file.flush()?;
                    file.sync_all().map_err(|e| {
                        tracing::warn!(path = %path.display(), error = %e, "file sync failed during teardown");
                        FlowError::Io(e)
                    })?;
                }
                Ok(())
            }
            IoBacking::Buffer(_) | IoBacking::OutputBuffer(_) => Ok(()),
            #[cfg(test)]
            IoBacking::FailingSink => Err(FlowError::Io(std::io::Error::other(
                "sink rejected the final flush",
            ))),
        }
    }
}

fn reject_reserved_cleanup(cleanup: CleanupWith) -> Result<(), FlowError> {
    match cleanup {
        CleanupWith::Context => Ok(()),
        CleanupWith::FirstJob => Err(FlowError::NotImplemented(
            "CleanupWith::FirstJob is reserved",
        )),
    }
}

impl Read for IoObject {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        match &mut self.backing {
            IoBacking::File { file, .. } => file.read(buf),
            IoBacking::Buffer(cursor) | IoBacking::OutputBuffer(cursor) => cursor.read(buf),
            #[cfg(test)]
            IoBacking::FailingSink => Ok(0),
        }
    }
}

impl Write for IoObject {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        match &mut self.backing {
            IoBacking::File { file, .. } => file.write(buf),
            IoBacking::Buffer(cursor) | IoBacking::OutputBuffer(cursor) => cursor.write(buf),
            #[cfg(test)]
            IoBacking::FailingSink => Ok(buf.len()),
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        match &mut self.backing {
            IoBacking::File { file, .. } => file.flush(),
            IoBacking::Buffer(_) | IoBacking::OutputBuffer(_) => Ok(()),
            #[cfg(test)]
            IoBacking::FailingSink => Ok(()),
        }
    }
}

impl Seek for IoObject {
    fn seek(&mut self, pos: SeekFrom) -> std::io::Result<u64> {
        match &mut self.backing {
            IoBacking::File { file, .. } => file.seek(pos),
            IoBacking::Buffer(cursor) | IoBacking::OutputBuffer(cursor) => cursor.seek(pos),
            #[cfg(test)]
            IoBacking::FailingSink => Ok(0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_enum_values_are_stable() {
        assert_eq!(IoMode::ReadSequential.value(), 1);
        assert_eq!(IoMode::WriteSequential.value(), 2);
        assert_eq!(IoMode::ReadSeekable.value(), 5);
        assert_eq!(IoMode::WriteSeekable.value(), 6);
        assert_eq!(IoMode::ReadWriteSeekable.value(), 15);
        assert_eq!(Direction::In.value(), 4);
        assert_eq!(Direction::Out.value(), 8);
        assert_eq!(CleanupWith::Context.value(), 0);
        assert_eq!(Lifetime::OutlivesContext.value(), 1);
    }

    #[test]
    fn test_mode_from_value_rejects_undefined_combinations() {
        assert_eq!(IoMode::from_value(3), None);
        assert_eq!(IoMode::from_value(7), None);
        assert_eq!(IoMode::from_value(15), Some(IoMode::ReadWriteSeekable));
    }

    #[test]
    fn test_from_buffer_copies_immediately() {
        let mut original = vec![1u8, 2, 3, 4];
        let mut io =
            IoObject::from_buffer(&original, Lifetime::OutlivesFunctionCall, CleanupWith::Context)
                .unwrap();
        // Caller-side mutation after construction must not be observed.
        original[0] = 99;
        let mut read_back = Vec::new();
        io.read_to_end(&mut read_back).unwrap();
        assert_eq!(read_back, vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_outlives_context_also_copies() {
        let mut original = vec![7u8; 16];
        let mut io =
            IoObject::from_buffer(&original, Lifetime::OutlivesContext, CleanupWith::Context)
                .unwrap();
        original.clear();
        let mut read_back = Vec::new();
        io.read_to_end(&mut read_back).unwrap();
        assert_eq!(read_back.len(), 16);
    }

    #[test]
    fn test_first_job_cleanup_is_reserved() {
        let err = IoObject::from_buffer(&[1], Lifetime::OutlivesFunctionCall, CleanupWith::FirstJob)
            .unwrap_err();
        assert_eq!(err.code().value(), 40);
    }

    #[test]
    fn test_output_buffer_grows_and_reads_back() {
        let mut io = IoObject::for_output_buffer();
        assert_eq!(io.output_buffer(), Some(&[][..]));
        io.write_all(b"frame data").unwrap();
        assert_eq!(io.output_buffer(), Some(&b"frame data"[..]));
        io.seek(SeekFrom::Start(0)).unwrap();
        let mut read_back = String::new();
        io.read_to_string(&mut read_back).unwrap();
        assert_eq!(read_back, "frame data");
    }

    #[test]
    fn test_output_buffer_only_on_output_backing() {
        let io = IoObject::from_buffer(&[1, 2], Lifetime::OutlivesFunctionCall, CleanupWith::Context)
            .unwrap();
        assert!(io.output_buffer().is_none());
    }

    #[test]
    fn test_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.bin");

        let mut writer =
            IoObject::for_file(&path, IoMode::WriteSeekable, CleanupWith::Context).unwrap();
        writer.write_all(b"abc").unwrap();
        writer.flush_for_teardown().unwrap();
        drop(writer);

        let mut reader =
            IoObject::for_file(&path, IoMode::ReadSeekable, CleanupWith::Context).unwrap();
        assert_eq!(reader.kind(), "file");
        assert_eq!(reader.path(), Some(path.as_path()));
        let mut contents = Vec::new();
        reader.read_to_end(&mut contents).unwrap();
        assert_eq!(contents, b"abc");
    }

    #[test]
    fn test_failing_sink_surfaces_io_error_at_teardown() {
        let mut io = IoObject::for_failing_sink();
        io.write_all(b"lost bytes").unwrap();
        let err = io.flush_for_teardown().unwrap_err();
        assert_eq!(err.code().value(), 20);
    }

    #[test]
    fn test_file_mode_none_rejected() {
        let err = IoObject::for_file("/tmp/never-opened", IoMode::None, CleanupWith::Context)
            .unwrap_err();
        assert_eq!(err.code().value(), 50);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = IoObject::for_file(
            dir.path().join("absent.jpg"),
            IoMode::ReadSequential,
            CleanupWith::Context,
        )
        .unwrap_err();
        assert_eq!(err.code().value(), 20);
    }
}
