use std::cmp::min;
use std::io::{Error, ErrorKind, Read, Result, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::conn::ShutdownHandle;

pub struct MockStream {
    read_buf: Vec<u8>,
    read_pos: usize,
    pub written_buf: Vec<u8>,
    err_on_read: bool,
    eof_on_read: bool,
    read_delay: usize,
    closed: Arc<AtomicBool>,
}

impl Default for MockStream {
    fn default() -> Self {
        MockStream {
            read_buf: Vec::new(),
            read_pos: 0,
            written_buf: Vec::new(),
            err_on_read: false,
            eof_on_read: false,
            read_delay: 0,
            closed: Arc::new(AtomicBool::new(false)),
        }
    }
}

impl MockStream {
    pub fn new(read_buf: Vec<u8>) -> MockStream {
        MockStream::default().with_buf(read_buf)
    }

    /// A stream that answers the n-th command with `responses[n]`. `{tag}` in a response is
    /// replaced with the tag the client will use for that command.
    pub fn scripted(greeting: Option<&str>, responses: &[&str]) -> MockStream {
        let mut buf = greeting.unwrap_or_default().to_string();
        for (i, response) in responses.iter().enumerate() {
            buf.push_str(&response.replace("{tag}", &format!("a{}", i + 1)));
        }
        MockStream::new(buf.into_bytes())
    }

    pub fn with_buf(mut self, read_buf: Vec<u8>) -> MockStream {
        self.read_buf = read_buf;
        self
    }

    pub fn with_eof(mut self) -> MockStream {
        self.eof_on_read = true;
        self
    }

    pub fn with_err(mut self) -> MockStream {
        self.err_on_read = true;
        self
    }

    pub fn with_delay(mut self) -> MockStream {
        self.read_delay = 1;
        self
    }

    /// A handle that makes every later read fail, as a socket shutdown would.
    pub fn shutdown_handle(&self) -> ShutdownHandle {
        let closed = Arc::clone(&self.closed);
        ShutdownHandle::new(move || closed.store(true, Ordering::SeqCst))
    }

    /// The commands written so far, without tags and line endings.
    pub fn commands(&self) -> Vec<String> {
        String::from_utf8_lossy(&self.written_buf)
            .split("\r\n")
            .filter(|l| !l.is_empty())
            .map(|l| match l.split_once(' ') {
                Some((tag, rest)) if tag.starts_with('a') && tag[1..].parse::<u32>().is_ok() => {
                    rest.to_string()
                }
                _ => l.to_string(),
            })
            .collect()
    }
}

impl Read for MockStream {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(Error::new(ErrorKind::ConnectionAborted, "MockStream closed"));
        }
        if self.eof_on_read {
            return Ok(0);
        }
        if self.err_on_read {
            return Err(Error::new(ErrorKind::Other, "MockStream Error"));
        }
        if self.read_pos >= self.read_buf.len() {
            return Err(Error::new(ErrorKind::UnexpectedEof, "EOF"));
        }
        let mut write_len = min(buf.len(), self.read_buf.len() - self.read_pos);
        if self.read_delay > 0 {
            self.read_delay -= 1;
            write_len = min(write_len, 1);
        }
        let max_pos = self.read_pos + write_len;
        buf[..write_len].copy_from_slice(&self.read_buf[self.read_pos..max_pos]);
        self.read_pos += write_len;
        Ok(write_len)
    }
}

impl Write for MockStream {
    fn write(&mut self, buf: &[u8]) -> Result<usize> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(Error::new(ErrorKind::BrokenPipe, "MockStream closed"));
        }
        self.written_buf.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}
