//! Byte sources the decoder pulls compressed data from.

use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::Path;

/// Seekable/readable byte stream abstraction
pub trait ByteSource {
    /// Read up to `buf.len()` bytes, returning 0 only at end of data
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    /// Move to an absolute byte offset
    fn seek(&mut self, offset: u64) -> io::Result<()>;

    /// Current absolute byte offset
    fn position(&self) -> u64;

    /// Total length in bytes, if known
    fn len(&self) -> Option<u64>;

    fn supports_seeking(&self) -> bool;

    fn at_end(&self) -> bool {
        match self.len() {
            Some(len) => self.position() >= len,
            None => false,
        }
    }
}

impl<S: ByteSource + ?Sized> ByteSource for Box<S> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        (**self).read(buf)
    }

    fn seek(&mut self, offset: u64) -> io::Result<()> {
        (**self).seek(offset)
    }

    fn position(&self) -> u64 {
        (**self).position()
    }

    fn len(&self) -> Option<u64> {
        (**self).len()
    }

    fn supports_seeking(&self) -> bool {
        (**self).supports_seeking()
    }

    fn at_end(&self) -> bool {
        (**self).at_end()
    }
}

/// File-backed byte source
pub struct FileSource {
    file: File,
    position: u64,
    len: u64,
}

impl FileSource {
    pub fn open<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let file = File::open(path)?;
        let len = file.metadata()?.len();
        Ok(Self {
            file,
            position: 0,
            len,
        })
    }
}

impl ByteSource for FileSource {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = loop {
            match self.file.read(buf) {
                Ok(n) => break n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        };
        self.position += n as u64;
        Ok(n)
    }

    fn seek(&mut self, offset: u64) -> io::Result<()> {
        self.position = self.file.seek(SeekFrom::Start(offset))?;
        Ok(())
    }

    fn position(&self) -> u64 {
        self.position
    }

    fn len(&self) -> Option<u64> {
        Some(self.len)
    }

    fn supports_seeking(&self) -> bool {
        true
    }
}

/// In-memory byte source
#[derive(Debug, Clone)]
pub struct MemorySource {
    data: Vec<u8>,
    position: usize,
}

impl MemorySource {
    pub fn new(data: Vec<u8>) -> Self {
        Self { data, position: 0 }
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.data
    }
}

impl ByteSource for MemorySource {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let remaining = &self.data[self.position.min(self.data.len())..];
        let n = remaining.len().min(buf.len());
        buf[..n].copy_from_slice(&remaining[..n]);
        self.position += n;
        Ok(n)
    }

    fn seek(&mut self, offset: u64) -> io::Result<()> {
        if offset > self.data.len() as u64 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("offset {} beyond end of {} byte buffer", offset, self.data.len()),
            ));
        }
        self.position = offset as usize;
        Ok(())
    }

    fn position(&self) -> u64 {
        self.position as u64
    }

    fn len(&self) -> Option<u64> {
        Some(self.data.len() as u64)
    }

    fn supports_seeking(&self) -> bool {
        true
    }
}

/// Forward-only source over any reader, e.g. a network stream or pipe
pub struct ReaderSource<R: Read> {
    reader: R,
    position: u64,
    len_hint: Option<u64>,
    exhausted: bool,
}

impl<R: Read> ReaderSource<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            position: 0,
            len_hint: None,
            exhausted: false,
        }
    }

    /// Attach a known total length, e.g. from a Content-Length header
    pub fn with_len_hint(mut self, len: u64) -> Self {
        self.len_hint = Some(len);
        self
    }
}

impl<R: Read> ByteSource for ReaderSource<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        let n = loop {
            match self.reader.read(buf) {
                Ok(n) => break n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        };
        if n == 0 {
            self.exhausted = true;
        }
        self.position += n as u64;
        Ok(n)
    }

    fn seek(&mut self, _offset: u64) -> io::Result<()> {
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            "forward-only byte source cannot seek",
        ))
    }

    fn position(&self) -> u64 {
        self.position
    }

    fn len(&self) -> Option<u64> {
        self.len_hint
    }

    fn supports_seeking(&self) -> bool {
        false
    }

    fn at_end(&self) -> bool {
        self.exhausted || self.len_hint.map_or(false, |len| self.position >= len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Write};
    use tempfile::NamedTempFile;

    #[test]
    fn test_memory_source_read_and_seek() {
        let mut source = MemorySource::new((0u8..10).collect());
        let mut buf = [0u8; 4];

        assert_eq!(source.read(&mut buf).unwrap(), 4);
        assert_eq!(buf, [0, 1, 2, 3]);
        assert_eq!(source.position(), 4);

        source.seek(8).unwrap();
        assert_eq!(source.read(&mut buf).unwrap(), 2);
        assert_eq!(&buf[..2], &[8, 9]);
        assert!(source.at_end());
        assert_eq!(source.read(&mut buf).unwrap(), 0);
    }

    #[test]
    fn test_memory_source_rejects_seek_past_end() {
        let mut source = MemorySource::new(vec![0; 4]);
        assert!(source.seek(5).is_err());
        assert!(source.seek(4).is_ok());
        assert!(source.at_end());
    }

    #[test]
    fn test_reader_source_is_forward_only() {
        let mut source = ReaderSource::new(Cursor::new(vec![1u8, 2, 3])).with_len_hint(3);
        let mut buf = [0u8; 8];

        assert!(!source.supports_seeking());
        assert_eq!(source.len(), Some(3));
        assert_eq!(source.read(&mut buf).unwrap(), 3);
        assert!(source.at_end());

        let err = source.seek(0).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::Unsupported);
    }

    #[test]
    fn test_reader_source_without_hint_ends_on_zero_read() {
        let mut source = ReaderSource::new(Cursor::new(vec![7u8; 2]));
        let mut buf = [0u8; 8];

        assert!(!source.at_end());
        assert_eq!(source.read(&mut buf).unwrap(), 2);
        assert!(!source.at_end());
        assert_eq!(source.read(&mut buf).unwrap(), 0);
        assert!(source.at_end());
    }

    #[test]
    fn test_file_source() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"abcdef").unwrap();
        file.flush().unwrap();

        let mut source = FileSource::open(file.path()).unwrap();
        assert_eq!(source.len(), Some(6));

        source.seek(2).unwrap();
        let mut buf = [0u8; 3];
        assert_eq!(source.read(&mut buf).unwrap(), 3);
        assert_eq!(&buf, b"cde");
        assert_eq!(source.position(), 5);
    }

    #[test]
    fn test_file_source_missing_file() {
        assert!(FileSource::open("/nonexistent/file.mp3").is_err());
    }
}
