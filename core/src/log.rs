//! Remote logging capability injected into every task

use core::fmt::{self, Write};

use heapless::String;

/// Longest message text carried to the log collector
pub const MESSAGE_CAPACITY: usize = 224;

/// Bounded log message text
pub type Message = String<MESSAGE_CAPACITY>;

/// Syslog severity levels (RFC 5424 numbering)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Severity {
    Emergency = 0,
    Alert = 1,
    Critical = 2,
    Error = 3,
    Warning = 4,
    Notice = 5,
    Info = 6,
    Debug = 7,
}

impl Severity {
    /// Numeric severity code
    pub const fn code(self) -> u8 {
        self as u8
    }
}

/// Sink for severity-tagged diagnostic messages.
///
/// Logging is infallible from the caller's point of view: implementations
/// swallow transport failures.
#[allow(async_fn_in_trait)]
pub trait LogSink {
    async fn log(&self, severity: Severity, message: &str);

    async fn info(&self, message: &str) {
        self.log(Severity::Info, message).await
    }

    async fn error(&self, message: &str) {
        self.log(Severity::Error, message).await
    }
}

impl<L: LogSink> LogSink for &L {
    async fn log(&self, severity: Severity, message: &str) {
        (**self).log(severity, message).await
    }
}

/// Format `args` into a [`Message`], truncating at capacity
pub fn message(args: fmt::Arguments<'_>) -> Message {
    let mut out = Truncating(Message::new());
    // Truncating never reports an error
    let _ = out.write_fmt(args);
    out.0
}

/// Writer that keeps as many whole characters as fit
pub(crate) struct Truncating<const N: usize>(pub(crate) String<N>);

impl<const N: usize> Write for Truncating<N> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        for c in s.chars() {
            if self.0.push(c).is_err() {
                break;
            }
        }
        Ok(())
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_formats_arguments() {
        let msg = message(format_args!("Temperature: {} C", 21.5));
        assert_eq!(msg.as_str(), "Temperature: 21.5 C");
    }

    #[test]
    fn test_message_truncates_at_capacity() {
        let long = "x".repeat(MESSAGE_CAPACITY + 40);
        let msg = message(format_args!("{}", long));
        assert_eq!(msg.len(), MESSAGE_CAPACITY);
    }

    #[test]
    fn test_severity_codes() {
        assert_eq!(Severity::Info.code(), 6);
        assert_eq!(Severity::Error.code(), 3);
    }
}
