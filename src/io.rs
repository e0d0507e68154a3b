//! I/O utilities.
use std::io::{Read, Result, Write};

/// Combine a read-only stream and a write-only stream into one
/// read-write stream. Pairs with
/// [`StreamEngine`](crate::engine::StreamEngine) to run an exchange
/// against canned bytes.
pub struct ReadWriteAdapter<R: Read, W: Write> {
    reader: R,
    writer: W,
}

impl<R: Read, W: Write> ReadWriteAdapter<R, W> {
    pub fn new(reader: R, writer: W) -> Self {
        Self { reader, writer }
    }

    /// Take the adapter apart again, e.g. to inspect written bytes.
    pub fn into_parts(self) -> (R, W) {
        (self.reader, self.writer)
    }
}

impl<R: Read, W: Write> Read for ReadWriteAdapter<R, W> {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        self.reader.read(buf)
    }
}

impl<R: Read, W: Write> Write for ReadWriteAdapter<R, W> {
    fn write(&mut self, buf: &[u8]) -> Result<usize> {
        self.writer.write(buf)
    }

    fn flush(&mut self) -> Result<()> {
        self.writer.flush()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_adapter_read() {
        let data = b"read side";
        let mut adapter = ReadWriteAdapter::new(&data[..], Vec::new());
        let mut buf = vec![0; 1024];
        let read_size = adapter.read(&mut buf).unwrap();
        assert_eq!(read_size, 9);
        assert_eq!(data[..], buf[0..read_size]);
    }

    #[test]
    fn test_adapter_write() {
        let mut adapter = ReadWriteAdapter::new(&b""[..], Vec::new());
        adapter.write_all(b"write side").unwrap();
        let (_, written) = adapter.into_parts();
        assert_eq!(written, b"write side");
    }
}
