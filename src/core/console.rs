//! # User-facing shutdown notices.
//!
//! The controller prints one-line notices when a termination request arrives:
//!
//! ```text
//! shutting down immediately
//! waiting 5s for graceful shutdown... press Ctrl+C again to quit now!
//! exiting...
//! ```
//!
//! These are operator hints, not log records, so they bypass `tracing` and go
//! to a [`Console`] chosen per instance: stdout, nowhere (quiet mode), or an
//! in-memory buffer.

use std::sync::{Arc, Mutex};

/// Output sink for shutdown notices.
#[derive(Clone, Debug, Default)]
pub enum Console {
    /// Print to standard output.
    #[default]
    Stdout,
    /// Discard everything.
    Quiet,
    /// Append lines to a shared buffer.
    Buffer(Arc<Mutex<String>>),
}

impl Console {
    /// Creates a buffering console.
    pub fn buffer() -> Self {
        Console::Buffer(Arc::new(Mutex::new(String::new())))
    }

    /// Writes one notice line.
    pub fn notice(&self, line: &str) {
        match self {
            Console::Stdout => println!("{line}"),
            Console::Quiet => {}
            Console::Buffer(buf) => {
                if let Ok(mut buf) = buf.lock() {
                    buf.push_str(line);
                    buf.push('\n');
                }
            }
        }
    }

    /// Buffered text so far; `None` unless this is a [`Console::Buffer`].
    pub fn contents(&self) -> Option<String> {
        match self {
            Console::Buffer(buf) => buf.lock().ok().map(|b| b.clone()),
            _ => None,
        }
    }
}
