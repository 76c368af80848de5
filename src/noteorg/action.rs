//! Row tokens of the organizer's working list.
//!
//! A row is either a bare note id or `"<action>: <payload>"`:
//!
//! | row                               | meaning                                   |
//! |-----------------------------------|-------------------------------------------|
//! | `1580064801573`                   | existing note                             |
//! | `New: Cloze`                      | new note of the named type                |
//! | `New: Same note type as previous` | new note with the neighbor's type         |
//! | `Dupe: 1580064801573`             | copy of that note                         |
//! | `Dupe (sched): 1580064801573`     | copy including card scheduling            |
//! | `Del: 1580064801573`              | delete that note                          |

use std::fmt;
use std::str::FromStr;

use serde::{Serialize, Deserialize};

use crate::errors::{Error, ErrorKind};
use crate::note::NoteId;

pub const NEW_NOTE: &str = "New";
pub const DUPE_NOTE: &str = "Dupe";
pub const DUPE_NOTE_SCHED: &str = "Dupe (sched)";
pub const DEL_NOTE: &str = "Del";
/// payload of a `New` row that reuses the neighbor's note type
pub const MODEL_SAME: &str = "Same note type as previous";

const SEPARATOR: &str = ": ";

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub enum Token {
    Existing(NoteId),
    /// `None` means "same type as the neighbor"
    New(Option<String>),
    Dupe { neighbor: NoteId, sched: bool },
    Del(NoteId),
}

impl Token {
    pub fn new_note(notetype: Option<&str>) -> Token {
        match notetype {
            Some(name) if name != MODEL_SAME => Token::New(Some(name.to_string())),
            _ => Token::New(None),
        }
    }

    /// the note id a row refers to, if any
    pub fn nid(&self) -> Option<NoteId> {
        match *self {
            Token::Existing(nid) | Token::Del(nid) => Some(nid),
            Token::Dupe { neighbor, .. } => Some(neighbor),
            Token::New(_) => None,
        }
    }

    pub fn existing(&self) -> Option<NoteId> {
        match *self {
            Token::Existing(nid) => Some(nid),
            _ => None,
        }
    }

    /// rows that will create a note
    pub fn is_insertion(&self) -> bool {
        matches!(self, Token::New(_) | Token::Dupe { .. })
    }

    pub fn is_deletion(&self) -> bool {
        matches!(self, Token::Del(_))
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Token::Existing(nid) => write!(f, "{}", nid),
            Token::New(Some(name)) => write!(f, "{}{}{}", NEW_NOTE, SEPARATOR, name),
            Token::New(None) => write!(f, "{}{}{}", NEW_NOTE, SEPARATOR, MODEL_SAME),
            Token::Dupe { neighbor, sched: false } => write!(f, "{}{}{}", DUPE_NOTE, SEPARATOR, neighbor),
            Token::Dupe { neighbor, sched: true } => write!(f, "{}{}{}", DUPE_NOTE_SCHED, SEPARATOR, neighbor),
            Token::Del(nid) => write!(f, "{}{}{}", DEL_NOTE, SEPARATOR, nid),
        }
    }
}

fn invalid(s: &str) -> Error {
    Error::of(ErrorKind::InvalidToken(s.to_string()))
}

impl FromStr for Token {
    type Err = Error;

    fn from_str(s: &str) -> Result<Token, Error> {
        let s = s.trim();
        if let Ok(nid) = s.parse::<NoteId>() {
            return Ok(Token::Existing(nid));
        }
        let (action, payload) = s.split_once(SEPARATOR).ok_or_else(|| invalid(s))?;
        let payload = payload.trim();
        let payload_nid = || payload.parse::<NoteId>().map_err(|_| invalid(s));
        match action {
            DEL_NOTE => Ok(Token::Del(payload_nid()?)),
            DUPE_NOTE_SCHED => Ok(Token::Dupe { neighbor: payload_nid()?, sched: true }),
            DUPE_NOTE => Ok(Token::Dupe { neighbor: payload_nid()?, sched: false }),
            NEW_NOTE if !payload.is_empty() => Ok(Token::new_note(Some(payload))),
            _ => Err(invalid(s)),
        }
    }
}

/// parse every row, failing on the first malformed one
pub fn parse_rows<S: AsRef<str>>(rows: &[S]) -> Result<Vec<Token>, Error> {
    rows.iter().map(|r| r.as_ref().parse()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_every_row_kind() {
        assert_eq!("1580064801573".parse::<Token>().unwrap(), Token::Existing(1580064801573));
        assert_eq!("New: Cloze".parse::<Token>().unwrap(), Token::New(Some("Cloze".to_string())));
        assert_eq!("New: Same note type as previous".parse::<Token>().unwrap(), Token::New(None));
        assert_eq!("Dupe: 12".parse::<Token>().unwrap(), Token::Dupe { neighbor: 12, sched: false });
        assert_eq!("Dupe (sched): 12".parse::<Token>().unwrap(), Token::Dupe { neighbor: 12, sched: true });
        assert_eq!("Del: 12".parse::<Token>().unwrap(), Token::Del(12));
    }

    #[test]
    fn notetype_names_may_contain_separator() {
        let t: Token = "New: Japanese: Vocab".parse().unwrap();
        assert_eq!(t, Token::New(Some("Japanese: Vocab".to_string())));
        assert_eq!(t.to_string(), "New: Japanese: Vocab");
    }

    #[test]
    fn rejects_malformed_rows() {
        for bad in ["", "abc", "Del: x", "Dupe:12", "Move: 12", "New: "] {
            let err = bad.parse::<Token>().unwrap_err();
            assert!(matches!(err.kind, ErrorKind::InvalidToken(_)), "{}", bad);
        }
    }

    #[test]
    fn display_matches_row_grammar() {
        let rows = ["12", "New: Basic", "New: Same note type as previous", "Dupe: 12", "Dupe (sched): 12", "Del: 12"];
        let tokens = parse_rows(&rows).unwrap();
        let back: Vec<String> = tokens.iter().map(|t| t.to_string()).collect();
        assert_eq!(back, rows);
    }

    #[test]
    fn token_helpers() {
        assert_eq!(Token::Del(5).nid(), Some(5));
        assert_eq!(Token::New(None).nid(), None);
        assert!(Token::Dupe { neighbor: 1, sched: true }.is_insertion());
        assert!(Token::Del(1).is_deletion());
        assert_eq!(Token::Existing(3).existing(), Some(3));
        assert_eq!(Token::Del(3).existing(), None);
    }
}
