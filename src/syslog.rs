use crate::record::{Level, LogRecord};
use crate::sink::{Sink, SinkError};
use std::sync::{Arc, Mutex, PoisonError};

/// Options passed when opening the system log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OpenOptions {
    /// Connect immediately instead of on the first message.
    pub no_delay: bool,
}

/// Syslog facility the messages are filed under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Facility {
    User,
}

/// Line-oriented OS log service, driven as open → emit → close per event.
pub trait SyslogTransport: Send + Sync {
    fn open(&self, tag: &str, options: OpenOptions, facility: Facility) -> Result<(), SinkError>;
    fn emit(&self, level: Level, text: &str) -> Result<(), SinkError>;
    fn close(&self);
}

// openlog/closelog act on process-wide state.
static SYSLOG_SESSION: Mutex<()> = Mutex::new(());

/// Forwards the message text of each record to the system log.
///
/// Only `record.message()` is transmitted, at the caller's level; the rest
/// of the record has no place in a syslog line. The facility is opened and
/// closed around every write, no handle is kept.
pub struct SystemLogSink {
    application_name: String,
    transport: Arc<dyn SyslogTransport>,
}

impl SystemLogSink {
    /// Sink writing to the local syslog daemon through libc.
    #[cfg(unix)]
    pub fn new(application_name: impl Into<String>) -> Self {
        Self::with_transport(application_name, Arc::new(LibcSyslog::default()))
    }

    pub fn with_transport(application_name: impl Into<String>, transport: Arc<dyn SyslogTransport>) -> Self {
        SystemLogSink { application_name: application_name.into(), transport }
    }

    pub fn application_name(&self) -> &str {
        &self.application_name
    }
}

impl Sink for SystemLogSink {
    fn write(&self, record: &LogRecord, level: Level) -> Result<(), SinkError> {
        let _session = SYSLOG_SESSION.lock().unwrap_or_else(PoisonError::into_inner);
        self.transport
            .open(&self.application_name, OpenOptions { no_delay: true }, Facility::User)?;
        let emitted = self.transport.emit(level, record.message());
        self.transport.close();
        emitted
    }
}

/// [`SyslogTransport`] backed by `openlog(3)` / `syslog(3)` / `closelog(3)`.
#[cfg(unix)]
#[derive(Default)]
pub struct LibcSyslog {
    // openlog keeps the ident pointer until closelog.
    ident: Mutex<Option<std::ffi::CString>>,
}

#[cfg(unix)]
impl SyslogTransport for LibcSyslog {
    fn open(&self, tag: &str, options: OpenOptions, facility: Facility) -> Result<(), SinkError> {
        let ident = std::ffi::CString::new(tag)
            .map_err(|_| SinkError::Transport("application name contains a NUL byte".into()))?;
        let option = if options.no_delay { libc::LOG_NDELAY } else { 0 };
        let facility = match facility {
            Facility::User => libc::LOG_USER,
        };

        let mut slot = self.ident.lock().unwrap_or_else(PoisonError::into_inner);
        let ident = slot.insert(ident);
        // SAFETY: `ident` stays alive in `self.ident` until `close` runs closelog.
        unsafe { libc::openlog(ident.as_ptr(), option, facility) };
        Ok(())
    }

    fn emit(&self, level: Level, text: &str) -> Result<(), SinkError> {
        let text = std::ffi::CString::new(until_nul(text))
            .map_err(|_| SinkError::Transport("message contains a NUL byte".into()))?;
        // SAFETY: constant format string with one matching `%s` argument.
        unsafe { libc::syslog(level.value(), b"%s\0".as_ptr().cast::<libc::c_char>(), text.as_ptr()) };
        Ok(())
    }

    fn close(&self) {
        let mut slot = self.ident.lock().unwrap_or_else(PoisonError::into_inner);
        // SAFETY: closelog has no preconditions.
        unsafe { libc::closelog() };
        slot.take();
    }
}

// syslog(3) reads a C string, so the line ends at the first NUL.
#[cfg_attr(not(unix), allow(dead_code))]
fn until_nul(text: &str) -> &str {
    text.split('\0').next().unwrap_or_default()
}
