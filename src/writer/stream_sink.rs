//! Streaming implementation of [`JsonSink`]

use std::{
    fmt::{Debug, Formatter},
    io::Write,
};

use super::{IoError, JsonSink, SerializeError};

pub(crate) const SINK_BUF_SIZE: usize = 1024;

/// Settings to customize the streaming sink
///
/// The settings are normally constructed by overwriting some of the default settings:
/// ```
/// # use chainjson::writer::SinkSettings;
/// SinkSettings {
///     trailing_newline: false,
///     // For all other settings use the default
///     ..Default::default()
/// }
/// # ;
/// ```
#[derive(Clone, Debug)]
pub struct SinkSettings {
    /// Whether to write a line break (`\n`) after the document
    ///
    /// Terminating the output with a line break is what most command line tools
    /// expect when the output is written to a file or the terminal.
    pub trailing_newline: bool,
}

impl Default for SinkSettings {
    /// Creates the default sink settings
    ///
    /// - trailing newline: enabled
    fn default() -> Self {
        SinkSettings {
            trailing_newline: true,
        }
    }
}

/// A sink which writes to a [`Write`]
///
/// The sink internally buffers data so it is normally not necessary to wrap the provided
/// writer in a [`std::io::BufWriter`]. [`finish_document`](Self::finish_document) has to be
/// called at the end to flush the buffer.
///
/// If the underlying writer returns an error of kind [`std::io::ErrorKind::Interrupted`],
/// the sink keeps retrying to write the data.
///
/// # Examples
/// ```
/// # use chainjson::writer::*;
/// let document = chainjson::parse_str("[a, b]")?;
///
/// let mut writer = Vec::<u8>::new();
/// let mut sink = JsonStreamSink::new(&mut writer);
/// serialize_to_sink(&document, &mut sink)?;
/// sink.finish_document()?;
///
/// assert_eq!("[\"a\",\"b\"]\n", String::from_utf8(writer)?);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub struct JsonStreamSink<W: Write> {
    // When adding more fields to this struct, adjust the Debug implementation below, if necessary
    writer: W,
    buf: [u8; SINK_BUF_SIZE],
    /// Number of bytes in [`buf`](Self::buf) which have not been written yet
    buf_write_pos: usize,
    settings: SinkSettings,
}

impl<W: Write> JsonStreamSink<W> {
    /// Creates a sink with [default settings](SinkSettings::default)
    pub fn new(writer: W) -> Self {
        JsonStreamSink::new_custom(writer, SinkSettings::default())
    }

    /// Creates a sink with custom settings
    pub fn new_custom(writer: W, settings: SinkSettings) -> Self {
        JsonStreamSink {
            writer,
            buf: [0_u8; SINK_BUF_SIZE],
            buf_write_pos: 0,
            settings,
        }
    }

    fn buffer(&mut self, bytes: &[u8]) -> Result<(), IoError> {
        let mut pos = 0;
        while pos < bytes.len() {
            let copied_count = (self.buf.len() - self.buf_write_pos).min(bytes.len() - pos);
            self.buf[self.buf_write_pos..(self.buf_write_pos + copied_count)]
                .copy_from_slice(&bytes[pos..(pos + copied_count)]);
            self.buf_write_pos += copied_count;
            pos += copied_count;

            if self.buf_write_pos >= self.buf.len() {
                // write_all retries on `ErrorKind::Interrupted`, as desired
                self.writer.write_all(&self.buf)?;
                self.buf_write_pos = 0;
            }
        }
        Ok(())
    }

    /// Writes the trailing line break if enabled, and flushes all buffered data
    pub fn finish_document(mut self) -> Result<(), SerializeError> {
        if self.settings.trailing_newline {
            self.buffer(b"\n")?;
        }
        // write_all retries on `ErrorKind::Interrupted`, as desired
        self.writer.write_all(&self.buf[..self.buf_write_pos])?;
        self.buf_write_pos = 0;
        self.writer.flush()?;
        Ok(())
    }
}

impl<W: Write> JsonSink for JsonStreamSink<W> {
    fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), SerializeError> {
        self.buffer(bytes)?;
        Ok(())
    }
}

impl<W: Write + Debug> Debug for JsonStreamSink<W> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsonStreamSink")
            .field("writer", &self.writer)
            .field("buf_count", &self.buf_write_pos)
            .field("settings", &self.settings)
            .finish()
    }
}
