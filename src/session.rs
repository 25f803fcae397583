//! Session services: cooperative abort, messages and printing

use crate::error::{LibraryError, Result};
use crate::host::Runtime;
use std::io;

/// Severity tag attached to a host message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Severity {
    Info,
    Warning,
    Error,
    Assert,
}

impl Severity {
    /// Message tag the host shows next to the text
    pub fn tag(self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Error => "error",
            Severity::Assert => "assert",
        }
    }
}

/// Issue a host message. An absent payload is a no-op.
pub fn message(host: &dyn Runtime, msg: Option<&str>, severity: Severity) {
    if let Some(text) = msg {
        host.message(text, severity);
    }
}

/// Print through the host. Skipped while an abort is pending.
pub fn print(host: &dyn Runtime, msg: &str) {
    if host.abort_requested() {
        return;
    }
    host.print(msg);
}

/// Check for and honour a pending abort
pub fn check_abort(host: &dyn Runtime) -> Result<()> {
    if host.abort_requested() {
        log::warn!("abort requested, unwinding");
        return Err(LibraryError::UserAbort);
    }
    Ok(())
}

pub(crate) fn assertion_failed(
    host: &dyn Runtime,
    condition: &str,
    file: &str,
    line: u32,
) -> LibraryError {
    let text = format!("{}, file {}, line {}", condition, file, line);
    host.message(&text, Severity::Assert);
    LibraryError::new(crate::error::ErrorCode::FUNCTION)
}

/// Internal consistency check, active in debug builds only
macro_rules! host_assert {
    ($host:expr, $cond:expr) => {
        if cfg!(debug_assertions) && !($cond) {
            return Err($crate::session::assertion_failed(
                $host,
                stringify!($cond),
                file!(),
                line!(),
            ));
        }
    };
}
pub(crate) use host_assert;

/// Buffered writer that prints through the host on `flush`
pub struct HostOut<'h> {
    host: &'h dyn Runtime,
    buffer: Vec<u8>,
}

impl<'h> HostOut<'h> {
    pub fn new(host: &'h dyn Runtime) -> Self {
        Self {
            host,
            buffer: Vec::new(),
        }
    }
}

impl io::Write for HostOut<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buffer.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        if self.buffer.is_empty() {
            return Ok(());
        }
        let text = String::from_utf8_lossy(&self.buffer);
        print(self.host, text.trim_end_matches('\n'));
        self.buffer.clear();
        Ok(())
    }
}

impl Drop for HostOut<'_> {
    fn drop(&mut self) {
        if !self.buffer.is_empty() {
            log::trace!("HostOut dropped with {} unflushed bytes", self.buffer.len());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::memory::MemoryRuntime;
    use std::io::Write;

    #[test]
    fn absent_message_is_noop() {
        let host = MemoryRuntime::new();
        message(&host, None, Severity::Warning);
        assert!(host.messages().is_empty());

        message(&host, Some("careful"), Severity::Warning);
        assert_eq!(
            host.messages(),
            vec![(Severity::Warning, "careful".to_string())]
        );
    }

    #[test]
    fn check_abort_unwinds() {
        let host = MemoryRuntime::new();
        assert!(check_abort(&host).is_ok());
        host.set_abort(true);
        assert!(matches!(check_abort(&host), Err(LibraryError::UserAbort)));
    }

    #[test]
    fn print_skipped_during_abort() {
        let host = MemoryRuntime::new();
        print(&host, "first");
        host.set_abort(true);
        print(&host, "second");
        assert_eq!(host.printed(), vec!["first".to_string()]);
    }

    #[test]
    fn host_out_prints_on_flush() {
        let host = MemoryRuntime::new();
        let mut out = HostOut::new(&host);
        write!(out, "rows = {}", 3).unwrap();
        assert!(host.printed().is_empty());
        writeln!(out).unwrap();
        out.flush().unwrap();
        assert_eq!(host.printed(), vec!["rows = 3".to_string()]);

        out.flush().unwrap();
        assert_eq!(host.printed().len(), 1);
    }

    fn checked(host: &dyn Runtime, ok: bool) -> Result<()> {
        host_assert!(host, ok);
        Ok(())
    }

    #[test]
    fn failed_assertion_reports_condition() {
        let host = MemoryRuntime::new();
        assert!(checked(&host, true).is_ok());
        if cfg!(debug_assertions) {
            let err = checked(&host, false).unwrap_err();
            assert!(err.message().is_none());
            let messages = host.messages();
            assert_eq!(messages.len(), 1);
            assert_eq!(messages[0].0, Severity::Assert);
            assert!(messages[0].1.starts_with("ok, file "));
        }
    }
}
