//! # Termination signal kinds.
//!
//! [`SignalKind`] names the process-level termination requests a
//! [`ShutdownPolicy`](crate::ShutdownPolicy) can honor.
//!
//! | Variant     | Unix      | Non-unix             |
//! |-------------|-----------|----------------------|
//! | `Interrupt` | `SIGINT`  | Ctrl-C               |
//! | `Terminate` | `SIGTERM` | not observable       |
//! | `Hangup`    | `SIGHUP`  | not observable       |
//! | `Quit`      | `SIGQUIT` | not observable       |
//!
//! Kinds parse from the usual spellings (`"SIGINT"`, `"int"`, `"interrupt"`),
//! case-insensitively, so policies can be assembled from flags or env.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// A termination signal the lifecycle controller may observe.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SignalKind {
    /// `SIGINT` (Ctrl-C in a terminal).
    Interrupt,
    /// `SIGTERM` (default kill signal, used by systemd/Kubernetes).
    Terminate,
    /// `SIGHUP` (controlling terminal closed).
    Hangup,
    /// `SIGQUIT` (quit request, often a hard stop).
    Quit,
}

impl SignalKind {
    /// All kinds, in declaration order.
    pub const ALL: [SignalKind; 4] = [
        SignalKind::Interrupt,
        SignalKind::Terminate,
        SignalKind::Hangup,
        SignalKind::Quit,
    ];

    /// Conventional upper-case signal name.
    pub fn as_str(&self) -> &'static str {
        match self {
            SignalKind::Interrupt => "SIGINT",
            SignalKind::Terminate => "SIGTERM",
            SignalKind::Hangup => "SIGHUP",
            SignalKind::Quit => "SIGQUIT",
        }
    }
}

impl fmt::Display for SignalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a string does not name a known [`SignalKind`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown signal: {0:?}")]
pub struct ParseSignalError(pub String);

impl FromStr for SignalKind {
    type Err = ParseSignalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        let bare = lower.strip_prefix("sig").unwrap_or(&lower);
        match bare {
            "int" | "interrupt" => Ok(SignalKind::Interrupt),
            "term" | "terminate" => Ok(SignalKind::Terminate),
            "hup" | "hangup" => Ok(SignalKind::Hangup),
            "quit" => Ok(SignalKind::Quit),
            _ => Err(ParseSignalError(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_accepts_common_spellings() {
        assert_eq!("SIGINT".parse::<SignalKind>(), Ok(SignalKind::Interrupt));
        assert_eq!("int".parse::<SignalKind>(), Ok(SignalKind::Interrupt));
        assert_eq!("Terminate".parse::<SignalKind>(), Ok(SignalKind::Terminate));
        assert_eq!(" sighup ".parse::<SignalKind>(), Ok(SignalKind::Hangup));
        assert_eq!("QUIT".parse::<SignalKind>(), Ok(SignalKind::Quit));
    }

    #[test]
    fn test_parse_rejects_unknown() {
        let err = "SIGUSR1".parse::<SignalKind>().unwrap_err();
        assert_eq!(err, ParseSignalError("SIGUSR1".into()));
    }

    #[test]
    fn test_display_matches_name() {
        for kind in SignalKind::ALL {
            assert_eq!(kind.to_string().parse::<SignalKind>(), Ok(kind));
        }
    }
}
