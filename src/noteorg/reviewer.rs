//! Inserting a note next to the card under review.

use std::fmt;
use std::str::FromStr;

use tracing::debug;

use crate::action::Token;
use crate::collection::Collection;
use crate::config::Config;
use crate::errors::{Error, Result};
use crate::note::{Card, NoteId};
use crate::rearranger::{Rearranger, Report};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    New,
    Dupe,
    DupeSched,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    Before,
    After,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReviewerCommand {
    pub action: Action,
    pub placement: Placement,
}

impl ReviewerCommand {
    pub fn new(action: Action, placement: Placement) -> ReviewerCommand {
        ReviewerCommand { action, placement }
    }

    fn offset(&self) -> usize {
        match self.placement {
            Placement::Before => 0,
            Placement::After => 1,
        }
    }

    /// the row this command adds next to `nid`
    pub fn token(&self, nid: NoteId) -> Token {
        match self.action {
            Action::New => Token::New(None),
            Action::Dupe => Token::Dupe { neighbor: nid, sched: false },
            Action::DupeSched => Token::Dupe { neighbor: nid, sched: true },
        }
    }
}

impl fmt::Display for ReviewerCommand {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let what = match self.action {
            Action::New => "New Note",
            Action::Dupe => "Duplicate Note",
            Action::DupeSched => "Duplicate Note (with scheduling)",
        };
        let place = match self.placement {
            Placement::Before => "before",
            Placement::After => "after",
        };
        write!(f, "{} - {}", what, place)
    }
}

impl FromStr for Action {
    type Err = Error;

    fn from_str(s: &str) -> Result<Action> {
        match s {
            "new" => Ok(Action::New),
            "dupe" => Ok(Action::Dupe),
            "dupe-sched" => Ok(Action::DupeSched),
            _ => Err(Error::from(format!("unknown action '{}', expected new, dupe or dupe-sched", s))),
        }
    }
}

impl FromStr for Placement {
    type Err = Error;

    fn from_str(s: &str) -> Result<Placement> {
        match s {
            "before" => Ok(Placement::Before),
            "after" => Ok(Placement::After),
            _ => Err(Error::from(format!("unknown position '{}', expected before or after", s))),
        }
    }
}

/// Add a note before or after the note of `card`.
///
/// Works on the whole collection in id order, so the new note sorts
/// between the reviewed note and its neighbor regardless of deck. Returns
/// `None` when the reviewed note is not in the collection.
pub fn insert_from_review<C: Collection + ?Sized>(col: &mut C,
                                                  config: &Config,
                                                  card: &Card,
                                                  command: ReviewerCommand)
                                                  -> Result<Option<Report>> {
    let mut rows: Vec<Token> = col.note_ids().into_iter().map(Token::Existing).collect();
    let idx = match rows.iter().position(|t| t.existing() == Some(card.nid)) {
        Some(i) => i,
        None => {
            debug!(nid = card.nid, "reviewed note not in collection");
            return Ok(None);
        }
    };
    rows.insert(idx + command.offset(), command.token(card.nid));

    let start = rows.iter().find_map(Token::existing).map(|nid| nid / 1000);
    let report = Rearranger::new(col, config).with_source_card(card.id)
                                             .process(&rows, start, &[], false)?;
    Ok(Some(report))
}
