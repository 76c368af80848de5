//! Headless working list of the organizer.
//!
//! A session starts from a set of notes in id order. Rows can then be
//! moved, marked for deletion, or followed by new and duplicated notes.
//! `accept` hands the final rows to the `Rearranger`.

use std::fmt;

use serde::Serialize;
use tracing::{debug, info};

use crate::action::Token;
use crate::collection::Collection;
use crate::config::Config;
use crate::errors::Result;
use crate::note::NoteId;
use crate::rearranger::{Rearranger, Report};
use crate::specific_fail;

/// Counts shown to the user before a session is applied
#[derive(Serialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChangePlan {
    /// notes the user moved; more may be renumbered alongside
    pub to_move: usize,
    pub to_delete: usize,
    pub to_add: usize,
}

impl fmt::Display for ChangePlan {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "Overview of changes:")?;
        writeln!(f, "  move at least {} note(s)", self.to_move)?;
        writeln!(f, "  remove {} note(s)", self.to_delete)?;
        writeln!(f, "  create {} new note(s)", self.to_add)?;
        write!(f, "Additional notes might have to be updated to allow for the changes above.")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// rows were left as they started; nothing was touched
    Unchanged,
    Applied(Report),
}

#[derive(Debug, Clone, Default)]
pub struct Session {
    original: Vec<Token>,
    rows: Vec<Token>,
    moved: Vec<NoteId>,
    clipboard: Vec<usize>,
    start: Option<i64>,
    /// reposition new cards after applying
    pub repos: bool,
}

/// true when loading `card_count` cards deserves a confirmation
pub fn needs_count_warning(card_count: usize, threshold: usize) -> bool {
    threshold > 0 && card_count > threshold
}

impl Session {
    /// a session over `nids`, shown in id order
    pub fn new(mut nids: Vec<NoteId>) -> Session {
        nids.sort_unstable();
        nids.dedup();
        let rows: Vec<Token> = nids.into_iter().map(Token::Existing).collect();
        Session {
            original: rows.clone(),
            rows,
            ..Default::default()
        }
    }

    /// A session whose rows were already edited elsewhere.
    ///
    /// The starting list is rebuilt from the ids the rows refer to, so rows
    /// that are simply in id order count as unchanged.
    pub fn from_rows(rows: Vec<Token>, moved: Vec<NoteId>) -> Session {
        let nids: Vec<NoteId> = rows.iter()
                                    .filter(|t| !t.is_insertion())
                                    .filter_map(Token::nid)
                                    .collect();
        let mut session = Session::new(nids);
        session.rows = rows;
        session.moved = moved;
        session
    }

    pub fn rows(&self) -> &[Token] {
        &self.rows
    }

    pub fn moved(&self) -> &[NoteId] {
        &self.moved
    }

    pub fn is_modified(&self) -> bool {
        self.rows != self.original
    }

    fn check_row(&self, row: usize) -> Result<()> {
        if row >= self.rows.len() {
            return specific_fail!(format!("row {} is out of range ({} rows)", row, self.rows.len()));
        }
        Ok(())
    }

    /// add a new note marker below `row`; `None` keeps the neighbor's type
    pub fn insert_note(&mut self, row: usize, notetype: Option<&str>) -> Result<()> {
        self.check_row(row)?;
        self.rows.insert(row + 1, Token::new_note(notetype));
        Ok(())
    }

    /// Add a copy marker below `row`.
    ///
    /// Rows marked for deletion and rows without a note id cannot be copied;
    /// returns whether a marker was added.
    pub fn duplicate_note(&mut self, row: usize, sched: bool) -> Result<bool> {
        self.check_row(row)?;
        let token = &self.rows[row];
        let neighbor = match token.nid() {
            Some(nid) if !token.is_deletion() => nid,
            _ => {
                debug!(row, "row cannot be duplicated");
                return Ok(false);
            }
        };
        self.rows.insert(row + 1, Token::Dupe { neighbor, sched });
        Ok(true)
    }

    /// Drop new note markers and toggle the deletion mark on the other rows.
    pub fn toggle_remove(&mut self, rows: &[usize]) {
        let mut drop = vec![];
        for &row in rows {
            match self.rows.get_mut(row) {
                Some(t) if t.is_insertion() => drop.push(row),
                Some(t) => {
                    *t = match *t {
                        Token::Del(nid) => Token::Existing(nid),
                        Token::Existing(nid) => Token::Del(nid),
                        ref other => other.clone(),
                    }
                }
                None => {}
            }
        }
        drop.sort_unstable();
        drop.dedup();
        for row in drop.into_iter().rev() {
            self.rows.remove(row);
        }
    }

    /// remember rows for the next `paste`
    pub fn cut(&mut self, rows: &[usize]) {
        let mut rows: Vec<usize> = rows.iter().copied().filter(|r| *r < self.rows.len()).collect();
        rows.sort_unstable();
        rows.dedup();
        self.clipboard = rows;
    }

    /// Move the cut rows in front of row `at`.
    ///
    /// Pasting into the cut range is refused. Existing notes that move are
    /// recorded as moved. Returns whether anything moved.
    pub fn paste(&mut self, at: usize) -> bool {
        let (first, last) = match (self.clipboard.first(), self.clipboard.last()) {
            (Some(f), Some(l)) => (*f, *l),
            _ => return false,
        };
        if at > self.rows.len() || (first..=last).contains(&at) {
            return false;
        }
        let cut = std::mem::take(&mut self.clipboard);

        let block: Vec<Token> = cut.iter().map(|r| self.rows[*r].clone()).collect();
        for row in cut.iter().rev() {
            self.rows.remove(*row);
        }
        let target = at - cut.iter().filter(|r| **r < at).count();
        for (offset, token) in block.into_iter().enumerate() {
            if let Some(nid) = token.existing() {
                if !self.moved.contains(&nid) {
                    self.moved.push(nid);
                }
            }
            self.rows.insert(target + offset, token);
        }
        true
    }

    /// back to the starting rows
    pub fn reset(&mut self) {
        self.rows = self.original.clone();
        self.moved.clear();
        self.clipboard.clear();
        self.start = None;
    }

    pub fn set_start(&mut self, start: Option<i64>) {
        self.start = start;
    }

    /// Requested creation second of the first row.
    ///
    /// Without an override this follows the note currently at the top, so
    /// the first existing note keeps its id.
    pub fn start(&self) -> Option<i64> {
        self.start
            .or_else(|| self.rows.iter().find_map(Token::existing).map(|nid| nid / 1000))
    }

    pub fn plan(&self) -> ChangePlan {
        ChangePlan {
            to_move: self.moved.len(),
            to_delete: self.rows.iter().filter(|t| t.is_deletion()).count(),
            to_add: self.rows.iter().filter(|t| t.is_insertion()).count(),
        }
    }

    /// Apply the rows to `col`.
    pub fn accept<C: Collection + ?Sized>(&self, col: &mut C, config: &Config) -> Result<Outcome> {
        if !self.is_modified() && self.start.is_none() {
            info!("no changes performed");
            return Ok(Outcome::Unchanged);
        }
        let report = Rearranger::new(col, config).process(&self.rows, self.start(), &self.moved, self.repos)?;
        Ok(Outcome::Applied(report))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::note::Note;
    use crate::store::{Store, BASIC};

    fn store_with(nids: &[NoteId]) -> Store {
        let mut store = Store::with_defaults();
        let nt = store.notetype_by_name(BASIC).unwrap();
        for nid in nids {
            let mut note = Note::new(&nt);
            note.id = *nid;
            note.fields[0] = nid.to_string();
            store.add_note(note, 1).unwrap();
        }
        store
    }

    fn rows(session: &Session) -> Vec<String> {
        session.rows().iter().map(|t| t.to_string()).collect()
    }

    #[test]
    fn starts_in_id_order() {
        let session = Session::new(vec![3000, 1000, 2000, 1000]);
        assert_eq!(rows(&session), ["1000", "2000", "3000"]);
        assert_eq!(session.start(), Some(1));
        assert!(!session.is_modified());
    }

    #[test]
    fn insert_and_duplicate_go_below_the_row() {
        let mut session = Session::new(vec![1000, 2000]);
        session.insert_note(0, Some("Cloze")).unwrap();
        assert!(session.duplicate_note(2, true).unwrap());
        assert_eq!(rows(&session), ["1000", "New: Cloze", "2000", "Dupe (sched): 2000"]);
        assert!(session.insert_note(9, None).is_err());
    }

    #[test]
    fn duplicate_refuses_deleted_and_new_rows() {
        let mut session = Session::new(vec![1000, 2000]);
        session.toggle_remove(&[0]);
        session.insert_note(1, None).unwrap();
        assert!(!session.duplicate_note(0, false).unwrap());
        assert!(!session.duplicate_note(2, false).unwrap());
        assert_eq!(rows(&session), ["Del: 1000", "2000", "New: Same note type as previous"]);
    }

    #[test]
    fn toggle_remove_marks_unmarks_and_drops() {
        let mut session = Session::new(vec![1000, 2000]);
        session.insert_note(0, None).unwrap();
        session.duplicate_note(2, false).unwrap();
        session.toggle_remove(&[0, 1, 3]);
        assert_eq!(rows(&session), ["Del: 1000", "2000"]);
        session.toggle_remove(&[0]);
        assert_eq!(rows(&session), ["1000", "2000"]);
    }

    #[test]
    fn cut_and_paste_moves_block_and_records_moved() {
        let mut session = Session::new(vec![1000, 2000, 3000, 4000]);
        session.cut(&[0, 1]);
        assert!(session.paste(4));
        assert_eq!(rows(&session), ["3000", "4000", "1000", "2000"]);
        assert_eq!(session.moved(), [1000, 2000]);

        session.cut(&[3]);
        assert!(session.paste(0));
        assert_eq!(rows(&session), ["2000", "3000", "4000", "1000"]);
        assert_eq!(session.moved(), [1000, 2000]);
    }

    #[test]
    fn paste_into_own_range_is_refused() {
        let mut session = Session::new(vec![1000, 2000, 3000]);
        session.cut(&[0, 1]);
        assert!(!session.paste(1));
        assert!(!session.is_modified());
        let mut empty = Session::new(vec![1000]);
        assert!(!empty.paste(0));
    }

    #[test]
    fn plan_counts_rows() {
        let mut session = Session::new(vec![1000, 2000, 3000]);
        session.toggle_remove(&[2]);
        session.insert_note(0, None).unwrap();
        session.cut(&[0]);
        session.paste(3);
        let plan = session.plan();
        assert_eq!(plan, ChangePlan { to_move: 1, to_delete: 1, to_add: 1 });
        assert!(plan.to_string().contains("move at least 1 note(s)"));
    }

    #[test]
    fn unchanged_rows_touch_nothing() {
        let mut store = store_with(&[1000, 2000]);
        let session = Session::new(vec![1000, 2000]);
        let outcome = session.accept(&mut store, &Config::default()).unwrap();
        assert_eq!(outcome, Outcome::Unchanged);
        assert!(store.checkpoint.is_none());
    }

    #[test]
    fn reset_restores_the_start() {
        let mut session = Session::new(vec![1000, 2000]);
        session.cut(&[1]);
        session.paste(0);
        session.set_start(Some(5));
        session.reset();
        assert!(!session.is_modified());
        assert!(session.moved().is_empty());
        assert_eq!(session.start(), Some(1));
    }

    #[test]
    fn moving_to_the_end_renumbers_moved_note() {
        let mut store = store_with(&[1000, 2000, 3000]);
        let mut session = Session::new(store.note_ids());
        session.cut(&[0]);
        session.paste(3);
        let report = match session.accept(&mut store, &Config::default()).unwrap() {
            Outcome::Applied(r) => r,
            Outcome::Unchanged => panic!("expected changes"),
        };
        // 2000 is now on top and keeps its id; 3000 and 1000 follow it
        assert_eq!(report.moved, vec![1000]);
        assert_eq!(report.order.len(), 3);
        assert_eq!(report.order[0], 2000);
        assert_eq!(report.nid_map.len(), 2);
        assert_eq!(report.incidental, vec![report.nid_map[&3000]]);
        assert!(report.order.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(store.get_note(*report.order.last().unwrap()).unwrap().fields[0], "1000");
        assert_eq!(store.notes.len(), 3);
    }

    #[test]
    fn start_follows_the_note_on_top() {
        let mut session = Session::new(vec![1000, 2000, 3000]);
        session.cut(&[2]);
        session.paste(0);
        assert_eq!(session.start(), Some(3));
        session.insert_note(0, None).unwrap();
        session.cut(&[0]);
        session.paste(4);
        assert_eq!(rows(&session), ["New: Same note type as previous", "1000", "2000", "3000"]);
        // a marker on top is skipped
        assert_eq!(session.start(), Some(1));
        session.set_start(Some(7));
        assert_eq!(session.start(), Some(7));
    }

    #[test]
    fn dragged_note_on_top_keeps_its_id() {
        let mut store = store_with(&[1000, 2000, 3000]);
        let mut session = Session::new(store.note_ids());
        session.cut(&[2]);
        session.paste(0);
        let report = match session.accept(&mut store, &Config::default()).unwrap() {
            Outcome::Applied(r) => r,
            Outcome::Unchanged => panic!("expected changes"),
        };
        assert_eq!(report.order[0], 3000);
        assert!(!report.nid_map.contains_key(&3000));
        assert!(report.order[1] > 3000 && report.order[1] < report.order[2]);
        assert_eq!(report.incidental.len(), 2);
    }

    #[test]
    fn from_rows_in_id_order_is_unchanged() {
        let session = Session::from_rows(vec![Token::Existing(2000), Token::Existing(1000)], vec![]);
        assert!(session.is_modified());
        let session = Session::from_rows(vec![Token::Existing(1000), Token::Existing(2000)], vec![]);
        assert!(!session.is_modified());
    }

    #[test]
    fn count_warning_threshold() {
        assert!(needs_count_warning(1001, 1000));
        assert!(!needs_count_warning(1000, 1000));
        assert!(!needs_count_warning(50_000, 0));
    }
}
