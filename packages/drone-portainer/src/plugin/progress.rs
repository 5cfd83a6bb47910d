//! Progress output
//!
//! Human readable step markers on stdout, one line per phase:
//! `Connecting to portainer server... OK`.

use colored::Colorize;
use std::fmt::Display;
use std::future::Future;
use std::io::Write;

use portainer_api::Result;

pub struct Progress {
    out: Box<dyn Write>,
}

impl Progress {
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }

    pub fn new(out: impl Write + 'static) -> Self {
        Self { out: Box::new(out) }
    }

    /// Start a step line, left open until `ok` or `fail`
    pub fn begin(&mut self, message: impl Display) {
        let _ = write!(self.out, "{}...", message);
        let _ = self.out.flush();
    }

    pub fn ok(&mut self) {
        let _ = writeln!(self.out, " {}", "OK".green().bold());
    }

    /// Success with a short note, e.g. `OK (not found)`
    pub fn ok_with(&mut self, note: impl Display) {
        let _ = writeln!(self.out, " {} ({})", "OK".green().bold(), note);
    }

    pub fn fail(&mut self) {
        let _ = writeln!(self.out, " {}", "FAIL".red().bold());
    }

    /// Print a complete line
    pub fn line(&mut self, message: impl Display) {
        let _ = writeln!(self.out, "{}", message);
    }

    /// Run one step, closing its line with OK or FAIL
    pub async fn step<T, F>(&mut self, message: impl Display, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        self.begin(message);
        match fut.await {
            Ok(value) => {
                self.ok();
                Ok(value)
            }
            Err(e) => {
                self.fail();
                Err(e)
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::io::Write;
    use std::sync::{Arc, Mutex};

    /// Cloneable in-memory sink for asserting on progress output
    #[derive(Clone, Default)]
    pub struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

    impl SharedBuffer {
        pub fn contents(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
        }
    }

    impl Write for SharedBuffer {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }
}
