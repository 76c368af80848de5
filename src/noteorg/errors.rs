use std::convert::From;
use std::fmt;
use std::io::Error as IoError;
use std::string::FromUtf8Error;
use std::time::SystemTimeError;

use thiserror::Error as ThisError;

use crate::note::{CardId, NoteId};

pub type Result<T> = ::std::result::Result<T, Error>;

#[derive(ThisError, Debug)]
pub enum ErrorKind {
    #[error("date/time parse error")]
    Chrono(#[from] chrono::ParseError),
    #[error("i/o error")]
    InternalIo(#[from] IoError),
    #[error("yaml error")]
    Yaml(#[from] serde_yaml::Error),
    #[error("note {0} not found")]
    NoteNotFound(NoteId),
    #[error("card {0} not found")]
    CardNotFound(CardId),
    #[error("note type '{0}' not found")]
    NotetypeNotFound(String),
    #[error("note id {0} is already taken")]
    IdCollision(NoteId),
    #[error("no free note id within {probes} ids after {from}")]
    IdSpaceExhausted { from: NoteId, probes: i64 },
    #[error("invalid row '{0}'")]
    InvalidToken(String),
    #[error("error")]
    Generic,
}

#[derive(ThisError, Debug)]
pub struct Error {
    #[source]
    pub kind: ErrorKind,
    pub desc: String,
    pub detail: Option<String>,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", &self.desc)?;
        if let Some(ref detail) = self.detail {
            write!(f, " ({})", detail)?;
        }
        Ok(())
    }
}

impl Error {
    /// build an error whose description is the kind's own message
    pub fn of(kind: ErrorKind) -> Error {
        Error {
            desc: kind.to_string(),
            kind,
            detail: None,
        }
    }

    pub fn with_detail<S: Into<String>>(mut self, detail: S) -> Error {
        self.detail = Some(detail.into());
        self
    }

    pub fn note_not_found(nid: NoteId) -> Error {
        Error::of(ErrorKind::NoteNotFound(nid))
    }

    pub fn is_note_not_found(&self) -> bool {
        matches!(self.kind, ErrorKind::NoteNotFound(_))
    }
}

// Global macros for easier error generation
#[macro_export]
macro_rules! specific_fail {
    ($short:expr) => {{
        use $crate::errors::{Error, ErrorKind};
        Err(::std::convert::From::from(
            Error {
                kind: ErrorKind::Generic,
                desc: $short,
                detail: None
            }
        ))
    }}
}

#[macro_export]
macro_rules! specific_fail_str {
    ($s:expr) => {
        $crate::specific_fail!($s.to_string())
    }
}

impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Error {
        Error::of(kind)
    }
}

impl From<chrono::ParseError> for Error {
    fn from(err: chrono::ParseError) -> Error {
        Error {
            detail: Some(err.to_string()),
            kind: ErrorKind::Chrono(err),
            desc: "Failed to parse date/time".to_string(),
        }
    }
}

impl From<IoError> for Error {
    fn from(err: IoError) -> Error {
        Error {
            desc: err.to_string(),
            kind: ErrorKind::InternalIo(err),
            detail: None,
        }
    }
}

impl From<SystemTimeError> for Error {
    fn from(err: SystemTimeError) -> Error {
        Error {
            kind: ErrorKind::Generic,
            desc: err.to_string(),
            detail: None,
        }
    }
}

impl From<FromUtf8Error> for Error {
    fn from(err: FromUtf8Error) -> Error {
        Error {
            kind: ErrorKind::Generic,
            desc: format!("UTF-8 error: {}", err),
            detail: None,
        }
    }
}

impl From<serde_yaml::Error> for Error {
    fn from(err: serde_yaml::Error) -> Error {
        Error {
            desc: format!("YAML error: {}", err),
            kind: ErrorKind::Yaml(err),
            detail: None,
        }
    }
}

impl From<tempfile::PersistError> for Error {
    fn from(err: tempfile::PersistError) -> Error {
        Error::from(err.error)
    }
}

impl From<String> for Error {
    fn from(err: String) -> Error {
        Error {
            kind: ErrorKind::Generic,
            desc: err,
            detail: None,
        }
    }
}

impl From<&str> for Error {
    fn from(err: &str) -> Error {
        Error {
            kind: ErrorKind::Generic,
            desc: err.to_string(),
            detail: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_uses_desc_and_detail() {
        let e = Error::of(ErrorKind::IdSpaceExhausted { from: 10, probes: 5 });
        assert_eq!(e.to_string(), "no free note id within 5 ids after 10");
        let e = e.with_detail("while moving note 3");
        assert_eq!(e.to_string(), "no free note id within 5 ids after 10 (while moving note 3)");
    }

    #[test]
    fn specific_fail_builds_generic_error() {
        fn fails() -> Result<()> {
            specific_fail_str!("ok bye")
        }
        let e = fails().unwrap_err();
        assert!(matches!(e.kind, ErrorKind::Generic));
        assert_eq!(e.desc, "ok bye");
    }

    #[test]
    fn note_not_found_is_recognised() {
        assert!(Error::note_not_found(7).is_note_not_found());
        assert!(!Error::from("x").is_note_not_found());
    }
}
