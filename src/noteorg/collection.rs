//! The storage capabilities the organizer needs from its host.
//!
//! Everything here is synchronous. A rearrangement borrows the collection
//! mutably for its whole run and opens a checkpoint first, so the host can
//! undo the run as a single step.

use crate::errors::Result;
use crate::note::{Card, CardId, DeckId, Note, NoteId, Notetype, NotetypeId, Schedule};

pub trait Collection {
    fn note_exists(&self, nid: NoteId) -> bool;

    fn get_note(&self, nid: NoteId) -> Result<Note>;

    /// write back a changed note and mark it for sync
    fn update_note(&mut self, note: &Note) -> Result<()>;

    /// add a note, generate its cards in `deck` and return the new id
    fn add_note(&mut self, note: Note, deck: DeckId) -> Result<NoteId>;

    /// remove notes and their cards; unknown ids are ignored
    fn remove_notes(&mut self, nids: &[NoteId]) -> Result<()>;

    /// cards of a note, ordered by template position
    fn cards_of_note(&self, nid: NoteId) -> Vec<Card>;

    fn get_card(&self, cid: CardId) -> Result<Card>;

    /// Move a note to a new id.
    ///
    /// Fails if `new` is taken or `old` is missing. Every card of `old` is
    /// relinked to `new` and both the note and its cards are marked for sync.
    fn reassign_note_id(&mut self, old: NoteId, new: NoteId) -> Result<()>;

    fn set_card_schedule(&mut self, cid: CardId, schedule: &Schedule) -> Result<()>;

    /// Give the new cards in `cids` consecutive due positions, one position
    /// per note in the order the notes first appear. With `shift`, other new
    /// cards at or after `start` are pushed back to make room.
    fn reorder_new_cards(&mut self,
                         cids: &[CardId],
                         start: i64,
                         step: i64,
                         shuffle: bool,
                         shift: bool)
                         -> Result<()>;

    fn notetype(&self, id: NotetypeId) -> Result<Notetype>;

    fn notetype_by_name(&self, name: &str) -> Option<Notetype>;

    /// make `deck` the notetype's default deck and the notetype the deck's current one
    fn assign_notetype_to_deck(&mut self, ntid: NotetypeId, deck: DeckId) -> Result<()>;

    fn notes_of_notetype(&self, ntid: NotetypeId) -> Vec<NoteId>;

    /// all note ids, ascending
    fn note_ids(&self) -> Vec<NoteId>;

    /// start an undoable unit of work
    fn checkpoint(&mut self, name: &str);

    /// roll back to the last checkpoint, returning its name
    fn undo(&mut self) -> Option<String>;
}
