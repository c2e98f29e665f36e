//! Shared test fixtures: an in-memory serial line

#![allow(dead_code)]

use serialview_core::config::SerialLinkConfig;
use serialview_core::error::TerminalError;
use serialview_core::events::{EventReceiver, TerminalEvent};
use serialview_core::refresh::{DisplaySink, TextDisplay};
use serialview_core::transport::{DeviceOpener, SerialDevice};
use std::collections::VecDeque;
use std::io;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::sync::mpsc::error::TryRecvError;

/// State of the simulated line, shared between the test and the worker
#[derive(Debug, Default)]
pub struct MockLine {
    pub incoming: VecDeque<u8>,
    pub written: Vec<u8>,
    pub unplugged: bool,
    pub short_write: Option<usize>,
    pub fail_write: bool,
    /// Hand out this many more bytes, then fail the next read once
    pub read_error_after: Option<usize>,
    pub opens: usize,
    pub last_config: Option<SerialLinkConfig>,
}

pub type SharedLine = Arc<Mutex<MockLine>>;

pub fn new_line() -> SharedLine {
    Arc::new(Mutex::new(MockLine::default()))
}

/// Make `bytes` available to the next device-ready poll in one piece
pub fn feed(line: &SharedLine, bytes: &[u8]) {
    line.lock().unwrap().incoming.extend(bytes);
}

pub fn unplug(line: &SharedLine) {
    line.lock().unwrap().unplugged = true;
}

pub fn written(line: &SharedLine) -> Vec<u8> {
    line.lock().unwrap().written.clone()
}

struct MockDevice {
    line: SharedLine,
}

impl SerialDevice for MockDevice {
    fn bytes_to_read(&mut self) -> io::Result<usize> {
        let line = self.line.lock().unwrap();
        if line.unplugged {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "device unplugged"));
        }
        Ok(line.incoming.len())
    }

    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut line = self.line.lock().unwrap();
        let mut n = buf.len().min(line.incoming.len());
        if let Some(allowance) = line.read_error_after {
            if allowance == 0 {
                line.read_error_after = None;
                return Err(io::Error::new(io::ErrorKind::Other, "parity"));
            }
            n = n.min(allowance);
            line.read_error_after = Some(allowance - n);
        }
        for slot in buf.iter_mut().take(n) {
            *slot = line.incoming.pop_front().unwrap();
        }
        Ok(n)
    }

    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        let mut line = self.line.lock().unwrap();
        if line.fail_write {
            return Err(io::Error::new(io::ErrorKind::Other, "write refused"));
        }
        let n = line.short_write.map_or(data.len(), |n| n.min(data.len()));
        line.written.extend_from_slice(&data[..n]);
        Ok(n)
    }
}

/// Opens [`MockDevice`]s on a shared line, or fails with a preset error
pub struct MockOpener {
    pub line: SharedLine,
    pub fail: Option<TerminalError>,
}

impl MockOpener {
    pub fn new(line: &SharedLine) -> Self {
        Self {
            line: line.clone(),
            fail: None,
        }
    }

    pub fn failing(line: &SharedLine, err: TerminalError) -> Self {
        Self {
            line: line.clone(),
            fail: Some(err),
        }
    }
}

impl DeviceOpener for MockOpener {
    fn open(&mut self, config: &SerialLinkConfig) -> Result<Box<dyn SerialDevice>, TerminalError> {
        if let Some(err) = self.fail.clone() {
            return Err(err);
        }
        let mut line = self.line.lock().unwrap();
        line.opens += 1;
        line.last_config = Some(config.clone());
        line.unplugged = false;
        drop(line);
        Ok(Box::new(MockDevice {
            line: self.line.clone(),
        }))
    }
}

pub fn valid_config() -> SerialLinkConfig {
    SerialLinkConfig::new("/dev/ttyMOCK0", 115200)
}

/// Block until the next event arrives (for tests without a runtime)
pub fn next_event(rx: &mut EventReceiver) -> TerminalEvent {
    let deadline = Instant::now() + Duration::from_secs(5);
    loop {
        match rx.try_recv() {
            Ok(event) => return event,
            Err(TryRecvError::Empty) => {
                assert!(Instant::now() < deadline, "timed out waiting for event");
                std::thread::sleep(Duration::from_millis(1));
            }
            Err(TryRecvError::Disconnected) => panic!("event stream closed"),
        }
    }
}

/// Skip events until one satisfies `pred`
pub fn wait_for(rx: &mut EventReceiver, pred: impl Fn(&TerminalEvent) -> bool) -> TerminalEvent {
    loop {
        let event = next_event(rx);
        if pred(&event) {
            return event;
        }
    }
}

/// Async variant of [`wait_for`]
pub async fn wait_for_async(
    rx: &mut EventReceiver,
    pred: impl Fn(&TerminalEvent) -> bool,
) -> TerminalEvent {
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let event = rx.recv().await.expect("event stream closed");
            if pred(&event) {
                return event;
            }
        }
    })
    .await
    .expect("timed out waiting for event")
}

/// Display that the test can inspect after the session takes ownership
#[derive(Clone, Default)]
pub struct SharedDisplay(pub Arc<Mutex<TextDisplay>>);

impl SharedDisplay {
    pub fn text(&self) -> String {
        self.0.lock().unwrap().text.clone()
    }

    pub fn appends(&self) -> usize {
        self.0.lock().unwrap().appends
    }
}

impl DisplaySink for SharedDisplay {
    fn append(&mut self, text: &str) {
        self.0.lock().unwrap().append(text);
    }

    fn scroll_to_bottom(&mut self) {
        self.0.lock().unwrap().scroll_to_bottom();
    }

    fn clear(&mut self) {
        self.0.lock().unwrap().clear();
    }
}
