//! Applies an edited row list to the collection.
//!
//! A run has three phases. Action rows are executed first (deletions and
//! new notes happen right away), then the surviving ids are walked in row
//! order and renumbered only where they are out of order, and finally new
//! cards can be repositioned to follow the new note order.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;

use serde::Serialize;
use tracing::{debug, info, trace, warn};

use crate::action::Token;
use crate::collection::Collection;
use crate::config::Config;
use crate::errors::{Error, ErrorKind, Result};
use crate::fields::fields_to_fill;
use crate::note::{CardId, Note, NoteId};

pub const CHECKPOINT_NAME: &str = "Reorganize notes";

/// free ids to leave after a renumbered note, so later inserts fit in
pub const ROOM_FOR_LATER: i64 = 20;

/// how far allocation looks for a free id before giving up
pub const MAX_ID_PROBES: i64 = 100_000;

/// filler for fields that must not be empty on a new note
const FILLER: &str = ".";

/// What the action phase did
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedRows {
    /// surviving and new ids in row order
    pub kept: Vec<NoteId>,
    pub deleted: Vec<NoteId>,
    pub created: Vec<NoteId>,
}

/// Summary of one run
#[derive(Serialize, Debug, Clone, Default, PartialEq)]
pub struct Report {
    /// ids the user dragged, as they were before the run
    pub moved: Vec<NoteId>,
    pub deleted: Vec<NoteId>,
    /// ids of created notes right after creation; see `nid_map` for their final ids
    pub created: Vec<NoteId>,
    /// final ids of renumbered notes that existed before the run
    pub modified: Vec<NoteId>,
    /// the part of `modified` the user did not move
    pub incidental: Vec<NoteId>,
    pub nid_map: BTreeMap<NoteId, NoteId>,
    /// final ids in row order
    pub order: Vec<NoteId>,
    /// moved and created notes under their final ids
    pub to_select: Vec<NoteId>,
    pub selected_cards: Vec<CardId>,
}

impl Report {
    pub fn updated_alongside(&self) -> usize {
        self.incidental.len()
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "Reorganization complete:")?;
        writeln!(f, "  {} note(s) moved", self.moved.len())?;
        writeln!(f, "  {} note(s) deleted", self.deleted.len())?;
        writeln!(f, "  {} note(s) created", self.created.len())?;
        write!(f, "  {} note(s) updated alongside", self.updated_alongside())
    }
}

fn exhausted(from: NoteId, probes: i64, old: NoteId) -> Error {
    Error::of(ErrorKind::IdSpaceExhausted { from, probes })
        .with_detail(format!("while renumbering note {}", old))
}

pub struct Rearranger<'a, C: Collection + ?Sized> {
    col: &'a mut C,
    config: &'a Config,
    /// card the user was looking at; preferred as template source for new notes
    source_card: Option<CardId>,
    nid_map: HashMap<NoteId, NoteId>,
}

impl<'a, C: Collection + ?Sized> Rearranger<'a, C> {
    pub fn new(col: &'a mut C, config: &'a Config) -> Rearranger<'a, C> {
        Rearranger {
            col,
            config,
            source_card: None,
            nid_map: HashMap::new(),
        }
    }

    pub fn with_source_card(mut self, cid: CardId) -> Rearranger<'a, C> {
        self.source_card = Some(cid);
        self
    }

    /// current id of a note that may have been renumbered during this run
    pub fn mapped(&self, nid: NoteId) -> NoteId {
        self.nid_map.get(&nid).copied().unwrap_or(nid)
    }

    /// Run all phases on `rows`.
    ///
    /// `start` is the requested creation time (seconds) of the first row,
    /// `moved` the ids the user dragged and `repos` turns on repositioning
    /// of new cards.
    pub fn process(&mut self,
                   rows: &[Token],
                   start: Option<i64>,
                   moved: &[NoteId],
                   repos: bool)
                   -> Result<Report> {
        self.col.checkpoint(CHECKPOINT_NAME);

        let parsed = self.process_actions(rows)?;
        let (modified, order) = self.adjust_nid_order(&parsed.kept, start, moved, &parsed.created)?;

        if repos {
            self.reposition(&order)?;
        }

        let moved_set: HashSet<NoteId> = moved.iter().copied().collect();
        let created_set: HashSet<NoteId> = parsed.created.iter().copied().collect();
        let mut incidental: Vec<NoteId> = self.nid_map
                                              .iter()
                                              .filter(|(old, _)| !moved_set.contains(*old) && !created_set.contains(*old))
                                              .map(|(_, new)| *new)
                                              .collect();
        incidental.sort_unstable();

        let mut to_select = vec![];
        for nid in moved.iter().chain(parsed.created.iter()) {
            let nid = self.mapped(*nid);
            if self.col.note_exists(nid) && !to_select.contains(&nid) {
                to_select.push(nid);
            }
        }
        let selected_cards = to_select.iter()
                                      .flat_map(|nid| self.col.cards_of_note(*nid))
                                      .map(|c| c.id)
                                      .collect();

        let report = Report {
            moved: moved.to_vec(),
            deleted: parsed.deleted,
            created: parsed.created,
            modified,
            incidental,
            nid_map: self.nid_map.iter().map(|(k, v)| (*k, *v)).collect(),
            order,
            to_select,
            selected_cards,
        };
        info!(moved = report.moved.len(),
              deleted = report.deleted.len(),
              created = report.created.len(),
              updated = report.updated_alongside(),
              "reorganization complete");
        Ok(report)
    }

    /// first row that names a live note
    pub fn first_valid_nid(&self, rows: &[Token]) -> Option<NoteId> {
        rows.iter()
            .filter_map(Token::existing)
            .find(|nid| self.col.note_exists(*nid))
    }

    /// Execute deletions and insertions; returns the ids to keep in row order.
    pub fn process_actions(&mut self, rows: &[Token]) -> Result<ParsedRows> {
        let mut parsed = ParsedRows::default();

        for (idx, token) in rows.iter().enumerate() {
            match token {
                Token::Existing(nid) => parsed.kept.push(*nid),
                Token::Del(nid) => {
                    if !self.col.note_exists(*nid) {
                        debug!(nid, "note already gone, nothing to delete");
                        continue;
                    }
                    self.col.remove_notes(&[*nid])?;
                    parsed.deleted.push(*nid);
                }
                Token::New(_) | Token::Dupe { .. } => {
                    let neighbor = match token {
                        // the note the copy was made from
                        Token::Dupe { neighbor, .. } => Some(*neighbor),
                        // the following note, else any note in the list
                        _ => rows.get(idx + 1)
                                 .and_then(Token::existing)
                                 .filter(|n| self.col.note_exists(*n))
                                 .or_else(|| self.first_valid_nid(rows)),
                    };
                    let neighbor = match neighbor.map(|n| self.mapped(n)).filter(|n| self.col.note_exists(*n)) {
                        Some(n) => n,
                        None => {
                            warn!(row = %token, "no existing note to base the new note on, skipping");
                            continue;
                        }
                    };
                    if let Some(nid) = self.add_note(neighbor, token)? {
                        parsed.created.push(nid);
                        parsed.kept.push(nid);
                    }
                }
            }
        }
        Ok(parsed)
    }

    /// Create a note for a `New` or `Dupe` row, using `neighbor` as template.
    ///
    /// For `Dupe (sched)` the scheduling of the neighbor's cards is copied
    /// card by card in template order. Both notes are expected to have the
    /// same cards; if not, only the leading pairs are copied.
    fn add_note(&mut self, neighbor: NoteId, token: &Token) -> Result<Option<NoteId>> {
        let source = self.col.get_note(neighbor)?;
        let source_cards = self.col.cards_of_note(neighbor);
        let source_card = match self.source_card
                                    .and_then(|cid| source_cards.iter().find(|c| c.id == cid))
                                    .or_else(|| source_cards.first()) {
            Some(c) => c.clone(),
            None => {
                warn!(neighbor, "neighbor note has no cards, skipping new note");
                return Ok(None);
            }
        };
        let did = source_card.home_deck();

        let notetype = match token {
            Token::New(Some(name)) => match self.col.notetype_by_name(name) {
                Some(nt) => nt,
                None => {
                    warn!(notetype = %name, "unknown note type, skipping new note");
                    return Ok(None);
                }
            },
            _ => self.col.notetype(source.notetype_id)?,
        };
        self.col.assign_notetype_to_deck(notetype.id, did)?;

        let mut note = Note::new(&notetype);
        note.tags = source.tags.clone();
        if let Token::Dupe { .. } = token {
            note.fields = source.fields.clone();
        } else {
            match fields_to_fill(&*self.col, notetype.id) {
                Some(indices) => {
                    for i in indices {
                        if let Some(f) = note.fields.get_mut(i) {
                            *f = FILLER.to_string();
                        }
                    }
                }
                None => {
                    for f in note.fields.iter_mut() {
                        *f = FILLER.to_string();
                    }
                }
            }
        }
        // a copy must not claim the original's old id
        if let Some(f) = self.config.backup_field().and_then(|name| notetype.field_index(name)) {
            if let Some(v) = note.fields.get_mut(f) {
                v.clear();
            }
        }

        let nid = self.col.add_note(note, did)?;
        debug!(nid, neighbor, row = %token, "created note");

        if let Token::Dupe { sched: true, .. } = token {
            let copies = self.col.cards_of_note(nid);
            for (orig, copy) in source_cards.iter().zip(copies.iter()) {
                self.col.set_card_schedule(copy.id, &orig.schedule)?;
            }
        }
        Ok(Some(nid))
    }

    /// Renumber `kept` so ids increase in row order, touching as few notes as
    /// possible.
    ///
    /// A note keeps its id when it already sits between the previous final
    /// id and the next row's id, unless it and the next row both were moved
    /// or created in this run; such blocks are renumbered together. The first
    /// row is only renumbered when `start` asks for a different second.
    /// Returns the final ids of renumbered pre-existing notes and the final
    /// id order.
    pub fn adjust_nid_order(&mut self,
                            kept: &[NoteId],
                            start: Option<i64>,
                            moved: &[NoteId],
                            created: &[NoteId])
                            -> Result<(Vec<NoteId>, Vec<NoteId>)> {
        let altered: HashSet<NoteId> = moved.iter().chain(created.iter()).copied().collect();
        let created: HashSet<NoteId> = created.iter().copied().collect();
        let mut placed: HashSet<NoteId> = HashSet::new();
        let mut modified = vec![];
        let mut order = vec![];
        let mut last: NoteId = 0;

        for (idx, &nid) in kept.iter().enumerate() {
            if !self.col.note_exists(nid) {
                debug!(nid, "note gone, skipping");
                continue;
            }
            let nxt = kept.get(idx + 1).copied().unwrap_or_else(|| nid.saturating_add(1));
            if !placed.insert(nid) {
                warn!(nid, "note listed twice, keeping the first position");
                continue;
            }

            if last != 0 && last < nid && nid < nxt {
                if altered.contains(&nid) && altered.contains(&nxt) {
                    trace!(last, nid, nxt, "inside a moved block");
                } else {
                    trace!(last, nid, nxt, "already in order");
                    last = nid;
                    order.push(nid);
                    continue;
                }
            }

            let target = if last != 0 {
                last.checked_add(1).ok_or_else(|| exhausted(last, 0, nid))?
            } else if let Some(start) = start.filter(|s| *s != nid / 1000) {
                // first row, date changed
                start.checked_mul(1000)
                     .ok_or_else(|| Error::from(format!("start {} is out of range", start)))?
            } else {
                trace!(nid, "first row keeps its id");
                last = nid;
                order.push(nid);
                continue;
            };

            let new_nid = self.update_nid_safely(nid, target)?;
            let was_created = created.contains(&nid);
            if !was_created {
                modified.push(new_nid);
            }
            self.set_nid_fields(new_nid, nid, was_created)?;
            self.nid_map.insert(nid, new_nid);
            debug!(old = nid, new = new_nid, "renumbered note");

            order.push(new_nid);
            last = new_nid;
        }

        Ok((modified, order))
    }

    /// Move `old` to the first free id at or after `candidate`, leaving up to
    /// `ROOM_FOR_LATER` free ids behind it.
    fn update_nid_safely(&mut self, old: NoteId, candidate: NoteId) -> Result<NoteId> {
        let mut new_nid = candidate;
        let mut probes = 0;
        while self.col.note_exists(new_nid) {
            probes += 1;
            new_nid = match new_nid.checked_add(1) {
                Some(n) if probes < MAX_ID_PROBES => n,
                _ => return Err(exhausted(candidate, probes, old)),
            };
        }

        for _ in 0..ROOM_FOR_LATER {
            match new_nid.checked_add(1) {
                Some(n) if !self.col.note_exists(n) => new_nid = n,
                _ => break,
            }
        }

        self.col.reassign_note_id(old, new_nid)?;
        Ok(new_nid)
    }

    /// keep the old id in the backup field; show the final id on new notes
    fn set_nid_fields(&mut self, nid: NoteId, onid: NoteId, created: bool) -> Result<()> {
        let mut note = self.col.get_note(nid)?;
        let notetype = self.col.notetype(note.notetype_id)?;
        let mut changed = false;

        if let Some(i) = self.config.backup_field().and_then(|f| notetype.field_index(f)) {
            if let Some(v) = note.fields.get_mut(i) {
                if v.is_empty() {
                    *v = onid.to_string();
                    changed = true;
                }
            }
        }
        if created && self.config.overwrite_display_id {
            if let Some(i) = self.config.display_id_field().and_then(|f| notetype.field_index(f)) {
                if let Some(v) = note.fields.get_mut(i) {
                    *v = nid.to_string();
                    changed = true;
                }
            }
        }

        if changed {
            self.col.update_note(&note)?;
        }
        Ok(())
    }

    /// give the new cards of `order` due positions 0, 1, ... in that order
    pub fn reposition(&mut self, order: &[NoteId]) -> Result<()> {
        let cids: Vec<CardId> = order.iter()
                                     .flat_map(|nid| self.col.cards_of_note(*nid))
                                     .filter(|c| c.schedule.is_new())
                                     .map(|c| c.id)
                                     .collect();
        if cids.is_empty() {
            return Ok(());
        }
        debug!(cards = cids.len(), "repositioning new cards");
        self.col.reorder_new_cards(&cids, 0, 1, false, true)
    }
}
