// std lib imports
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fs::{File, create_dir_all};
use std::io::{Read, Write};
use std::path::PathBuf;

use rand::seq::SliceRandom;
use serde::{Serialize, Deserialize};
use tracing::debug;

// noteorg imports
use crate::collection::Collection;
use crate::errors::{Error, ErrorKind, Result};
use crate::fields::template_generates;
use crate::note::{Card, CardId, CardQueue, Deck, DeckId, Note, NoteId, Notetype, NotetypeId,
                  Schedule, Template, USN_PENDING, new_guid};
use crate::utils::{find_collection_folder, get_yn_input, collection_fingerprint, now_millis,
                   now_secs, pretty_line, istty, nid_to_datetime_string, format_field, print_header,
                   termsize};
use crate::{specific_fail, specific_fail_str};

pub const DEFAULT_DECK: &str = "Default";
pub const BASIC: &str = "Basic";

/// Main container of a collection file: notetypes, decks, notes and cards
#[derive(Deserialize, Serialize, Clone, Debug, Default)]
pub struct Store {
    #[serde(default)]
    pub notetypes: BTreeMap<NotetypeId, Notetype>,
    #[serde(default)]
    pub decks: BTreeMap<DeckId, Deck>,
    #[serde(default)]
    pub notes: BTreeMap<NoteId, Note>,
    #[serde(default)]
    pub cards: BTreeMap<CardId, Card>,
    /// due position handed to the next note's new cards
    #[serde(default)]
    pub next_new_pos: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checkpoint: Option<Checkpoint>,
}

/// state saved before an undoable operation
#[derive(Deserialize, Serialize, Clone, Debug)]
pub struct Checkpoint {
    pub name: String,
    pub state: Box<Store>,
}

fn free_id<T>(taken: &BTreeMap<i64, T>, from: i64) -> i64 {
    let mut id = from;
    while taken.contains_key(&id) {
        id += 1;
    }
    id
}

impl Store {
    /// an empty collection with a "Default" deck and a "Basic" notetype
    pub fn with_defaults() -> Store {
        let mut store = Store::default();
        store.decks.insert(1, Deck {
            id: 1,
            name: DEFAULT_DECK.to_string(),
            current_notetype: Some(1),
        });
        store.notetypes.insert(1, Notetype {
            id: 1,
            name: BASIC.to_string(),
            fields: vec!["Front".to_string(), "Back".to_string()],
            templates: vec![Template {
                name: "Card 1".to_string(),
                front: "{{Front}}".to_string(),
                back: "{{FrontSide}}<hr id=answer>{{Back}}".to_string(),
            }],
            default_deck: Some(1),
        });
        store
    }

    fn from_scratch(collection_folder: &Option<String>, yes: bool) -> Result<(Store, u64)> {
        let folder = find_collection_folder(collection_folder)?;
        // if the folder doesn't exist, make it
        if !folder.exists() {
            if !yes {
                let message = format!("{} doesn't exist, would you like to create it?\n",
                                      folder.display());
                if !get_yn_input(&message)? {
                    return specific_fail_str!("ok bye ♥");
                }
            }
            create_dir_all(&folder)?;
        }
        Ok((Store::with_defaults(), 0u64))
    }

    fn from_existing(name: &str, collection_folder: &Option<String>) -> Result<(Store, u64)> {
        let path = Store::path(name, collection_folder)?;

        if path.is_file() {
            let mut file = File::open(&path)?;
            let mut contents = String::new();
            file.read_to_string(&mut contents)?;
            let decoded: Store = match serde_yaml::from_str(&contents) {
                Ok(s) => s,
                Err(e) => {
                    return specific_fail!(format!("invalid YAML in {}: {}", path.display(), e))
                }
            };
            let fingerprint = collection_fingerprint(&path)?;
            Ok((decoded, fingerprint))
        } else if path.exists() {
            specific_fail!(format!("{} is not a file.", path.display()))
        } else {
            specific_fail!(format!("{} does not exist, run `noteorg init` first.", path.display()))
        }
    }

    pub fn path(name: &str, collection_folder: &Option<String>) -> Result<PathBuf> {
        let mut path = find_collection_folder(collection_folder)?;
        path.push(&(name.to_string() + ".yaml"));
        Ok(path)
    }

    /// load a collection file, or start a fresh one when `new_collection` is set
    pub fn new(name: &str,
               collection_folder: &Option<String>,
               new_collection: bool,
               yes: bool)
               -> Result<(Store, u64)> {
        if new_collection {
            Store::from_scratch(collection_folder, yes)
        } else {
            Store::from_existing(name, collection_folder)
        }
    }

    /// save the collection back to its file
    pub fn save_to_file(&self,
                        name: &str,
                        collection_folder: &Option<String>,
                        new_collection: bool,
                        yes: bool,
                        fingerprint: &u64)
                        -> Result<()> {
        let path = Store::path(name, collection_folder)?;

        if new_collection && path.exists() && !yes {
            let message = format!("collection {} already exists would you like to overwrite it?\n",
                                  path.display());
            if !get_yn_input(&message)? {
                return specific_fail_str!("ok bye ♥");
            }
        }

        if *fingerprint > 0u64 {
            let new_fingerprint = collection_fingerprint(&path)?;
            if new_fingerprint != *fingerprint && !yes {
                return specific_fail!(format!("Collection '{}' has been modified on disk. Please reload.", name));
            }
        }

        let yaml = serde_yaml::to_string(&self).map_err(|e| format!("Serialization error: {}", e))?;

        // write next to the target, then swap it in
        let dir = match path.parent() {
            Some(d) => d.to_path_buf(),
            None => PathBuf::from("."),
        };
        let mut tmp = tempfile::Builder::new()
            .prefix(".noteorg")
            .suffix(".yaml")
            .tempfile_in(&dir)?;
        tmp.write_all(yaml.as_bytes())?;
        tmp.flush()?;
        tmp.persist(&path)?;
        debug!(path = %path.display(), notes = self.notes.len(), "saved collection");
        Ok(())
    }

    pub fn default_deck_id(&self) -> DeckId {
        self.decks
            .values()
            .find(|d| d.name == DEFAULT_DECK)
            .or_else(|| self.decks.values().next())
            .map_or(1, |d| d.id)
    }

    pub fn deck_by_name(&self, name: &str) -> Option<&Deck> {
        self.decks.values().find(|d| d.name == name)
    }

    /// find or create a deck by name
    pub fn add_deck(&mut self, name: &str) -> DeckId {
        if let Some(d) = self.deck_by_name(name) {
            return d.id;
        }
        let id = free_id(&self.decks, self.decks.keys().next_back().map_or(1, |k| k + 1));
        self.decks.insert(id, Deck { id, name: name.to_string(), current_notetype: None });
        id
    }

    /// add a notetype, giving it a fresh id when its own is 0 or taken
    pub fn add_notetype(&mut self, mut notetype: Notetype) -> NotetypeId {
        if notetype.id == 0 || self.notetypes.contains_key(&notetype.id) {
            notetype.id = free_id(&self.notetypes, self.notetypes.keys().next_back().map_or(1, |k| k + 1));
        }
        let id = notetype.id;
        self.notetypes.insert(id, notetype);
        id
    }

    /// ids of notes with at least one card homed in `deck`, ascending
    pub fn note_ids_in_deck(&self, deck: DeckId) -> Vec<NoteId> {
        let nids: BTreeSet<NoteId> = self.cards
                                         .values()
                                         .filter(|c| c.home_deck() == deck)
                                         .map(|c| c.nid)
                                         .collect();
        nids.into_iter().collect()
    }

    pub fn card_count(&self, nids: &[NoteId]) -> usize {
        let set: BTreeSet<&NoteId> = nids.iter().collect();
        self.cards.values().filter(|c| set.contains(&c.nid)).count()
    }

    fn generate_cards(&mut self, note: &Note, notetype: &Notetype, deck: DeckId) {
        let due = self.next_new_pos;
        let mut made = 0;
        for (ord, template) in notetype.templates.iter().enumerate() {
            if !template_generates(&template.front, &notetype.fields, &note.fields) {
                continue;
            }
            let id = free_id(&self.cards, now_millis());
            self.cards.insert(id, Card {
                id,
                nid: note.id,
                did: deck,
                odid: None,
                ord,
                schedule: Schedule::new_card(due),
                usn: USN_PENDING,
                mtime: now_secs(),
            });
            made += 1;
        }
        if made > 0 {
            self.next_new_pos += 1;
        }
    }

    /// print information about the collection
    pub fn stats(&self, name: &str) -> Result<()> {
        let tty = istty();
        pretty_line("name: ", &format!("{}\n", name), tty)?;
        pretty_line("notes: ", &format!("{}\n", self.notes.len()), tty)?;
        pretty_line("cards: ", &format!("{}\n", self.cards.len()), tty)?;
        let new_cards = self.cards.values().filter(|c| c.schedule.is_new()).count();
        pretty_line("new cards: ", &format!("{}\n", new_cards), tty)?;
        if let (Some(first), Some(last)) = (self.notes.keys().next(), self.notes.keys().next_back()) {
            pretty_line("note ages: ",
                        &format!("oldest: {}, newest: {}\n",
                                 nid_to_datetime_string(*first),
                                 nid_to_datetime_string(*last)),
                        tty)?;
        }
        if let Some(ref c) = self.checkpoint {
            pretty_line("undo: ", &format!("{}\n", c.name), tty)?;
        }
        Ok(())
    }

    /// print notes in id order
    pub fn list_notes(&self, deck: Option<DeckId>, limit: usize, yaml: bool) -> Result<()> {
        let nids = match deck {
            Some(d) => self.note_ids_in_deck(d),
            None => self.note_ids(),
        };
        let limit = if limit != 0 && limit < nids.len() { limit } else { nids.len() };
        let notes: Vec<&Note> = nids[..limit].iter().filter_map(|n| self.notes.get(n)).collect();

        if yaml {
            println!("{}", serde_yaml::to_string(&notes)?);
            return Ok(());
        }
        if notes.is_empty() {
            println!("this collection is empty");
            return Ok(());
        }

        let id_width = 16;
        let type_width = 12;
        let date_width = 19;
        let sort_width = match termsize() {
            0 => 30,
            cols => cols.saturating_sub(id_width + type_width + date_width + 3).max(10),
        };
        print_header(&[("id", id_width), ("type", type_width), ("sort field", sort_width), ("created", date_width)], 1)?;
        for n in notes {
            let ntname = self.notetypes.get(&n.notetype_id).map_or("?", |nt| nt.name.as_str());
            let sort_field = n.fields.first().map_or("", |f| f.as_str());
            println!("{} {} {} {}",
                     format_field(&n.id.to_string(), id_width, false),
                     format_field(ntname, type_width, true),
                     format_field(&sort_field.replace('\n', " "), sort_width, true),
                     nid_to_datetime_string(n.id));
        }
        Ok(())
    }

    fn mark_note(note: &mut Note) {
        note.usn = USN_PENDING;
        note.mtime = now_secs();
    }

    fn mark_card(card: &mut Card) {
        card.usn = USN_PENDING;
        card.mtime = now_secs();
    }
}

impl Collection for Store {
    fn note_exists(&self, nid: NoteId) -> bool {
        self.notes.contains_key(&nid)
    }

    fn get_note(&self, nid: NoteId) -> Result<Note> {
        self.notes.get(&nid).cloned().ok_or_else(|| Error::note_not_found(nid))
    }

    fn update_note(&mut self, note: &Note) -> Result<()> {
        match self.notes.get_mut(&note.id) {
            Some(n) => {
                *n = note.clone();
                Store::mark_note(n);
                Ok(())
            }
            None => Err(Error::note_not_found(note.id)),
        }
    }

    /// A non-zero `note.id` that is still free is kept, otherwise the note
    /// gets a timestamp id.
    fn add_note(&mut self, mut note: Note, deck: DeckId) -> Result<NoteId> {
        let notetype = self.notetype(note.notetype_id)?;
        if !self.decks.contains_key(&deck) {
            return specific_fail!(format!("deck {} does not exist", deck));
        }
        if note.id <= 0 || self.notes.contains_key(&note.id) {
            note.id = free_id(&self.notes, now_millis());
        }
        note.fields.resize(notetype.fields.len(), String::new());
        Store::mark_note(&mut note);
        self.generate_cards(&note, &notetype, deck);
        let nid = note.id;
        self.notes.insert(nid, note);
        Ok(nid)
    }

    fn remove_notes(&mut self, nids: &[NoteId]) -> Result<()> {
        let set: BTreeSet<NoteId> = nids.iter().copied().collect();
        for nid in &set {
            self.notes.remove(nid);
        }
        self.cards.retain(|_, c| !set.contains(&c.nid));
        Ok(())
    }

    fn cards_of_note(&self, nid: NoteId) -> Vec<Card> {
        let mut cards: Vec<Card> = self.cards.values().filter(|c| c.nid == nid).cloned().collect();
        cards.sort_by_key(|c| (c.ord, c.id));
        cards
    }

    fn get_card(&self, cid: CardId) -> Result<Card> {
        self.cards.get(&cid).cloned().ok_or_else(|| Error::of(ErrorKind::CardNotFound(cid)))
    }

    fn reassign_note_id(&mut self, old: NoteId, new: NoteId) -> Result<()> {
        if self.notes.contains_key(&new) {
            return Err(Error::of(ErrorKind::IdCollision(new)));
        }
        let mut note = self.notes.remove(&old).ok_or_else(|| Error::note_not_found(old))?;
        note.id = new;
        note.guid = new_guid();
        Store::mark_note(&mut note);
        self.notes.insert(new, note);
        for card in self.cards.values_mut().filter(|c| c.nid == old) {
            card.nid = new;
            Store::mark_card(card);
        }
        Ok(())
    }

    fn set_card_schedule(&mut self, cid: CardId, schedule: &Schedule) -> Result<()> {
        match self.cards.get_mut(&cid) {
            Some(c) => {
                c.schedule = *schedule;
                Store::mark_card(c);
                Ok(())
            }
            None => Err(Error::of(ErrorKind::CardNotFound(cid))),
        }
    }

    fn reorder_new_cards(&mut self,
                         cids: &[CardId],
                         start: i64,
                         step: i64,
                         shuffle: bool,
                         shift: bool)
                         -> Result<()> {
        let mut nids: Vec<NoteId> = vec![];
        for cid in cids {
            let nid = self.get_card(*cid)?.nid;
            if !nids.contains(&nid) {
                nids.push(nid);
            }
        }
        if nids.is_empty() {
            return Ok(());
        }
        if shuffle {
            nids.shuffle(&mut rand::thread_rng());
        }
        let due: HashMap<NoteId, i64> = nids.iter()
                                            .enumerate()
                                            .map(|(i, nid)| (*nid, start + i as i64 * step))
                                            .collect();
        let high = start + (nids.len() as i64 - 1) * step;
        let selected: BTreeSet<CardId> = cids.iter().copied().collect();

        if shift {
            let low = self.cards
                          .values()
                          .filter(|c| !selected.contains(&c.id) && c.schedule.is_new() && c.schedule.due >= start)
                          .map(|c| c.schedule.due)
                          .min();
            if let Some(low) = low {
                let shift_by = high - low + 1;
                for card in self.cards.values_mut().filter(|c| {
                    !selected.contains(&c.id) && c.schedule.queue == CardQueue::New && c.schedule.due >= low
                }) {
                    card.schedule.due += shift_by;
                    Store::mark_card(card);
                }
                debug!(low, shift_by, "shifted new cards");
            }
        }

        for cid in &selected {
            if let Some(card) = self.cards.get_mut(cid) {
                if card.schedule.is_new() {
                    card.schedule.due = due[&card.nid];
                    Store::mark_card(card);
                }
            }
        }
        let top = self.cards.values().filter(|c| c.schedule.is_new()).map(|c| c.schedule.due).max();
        self.next_new_pos = self.next_new_pos.max(top.map_or(0, |d| d + 1));
        Ok(())
    }

    fn notetype(&self, id: NotetypeId) -> Result<Notetype> {
        self.notetypes
            .get(&id)
            .cloned()
            .ok_or_else(|| Error::of(ErrorKind::NotetypeNotFound(id.to_string())))
    }

    fn notetype_by_name(&self, name: &str) -> Option<Notetype> {
        self.notetypes.values().find(|nt| nt.name == name).cloned()
    }

    fn assign_notetype_to_deck(&mut self, ntid: NotetypeId, deck: DeckId) -> Result<()> {
        match self.decks.get_mut(&deck) {
            Some(d) => d.current_notetype = Some(ntid),
            None => return specific_fail!(format!("deck {} does not exist", deck)),
        }
        match self.notetypes.get_mut(&ntid) {
            Some(nt) => nt.default_deck = Some(deck),
            None => return Err(Error::of(ErrorKind::NotetypeNotFound(ntid.to_string()))),
        }
        Ok(())
    }

    fn notes_of_notetype(&self, ntid: NotetypeId) -> Vec<NoteId> {
        self.notes.values().filter(|n| n.notetype_id == ntid).map(|n| n.id).collect()
    }

    fn note_ids(&self) -> Vec<NoteId> {
        self.notes.keys().copied().collect()
    }

    fn checkpoint(&mut self, name: &str) {
        let mut state = self.clone();
        state.checkpoint = None;
        self.checkpoint = Some(Checkpoint { name: name.to_string(), state: Box::new(state) });
    }

    fn undo(&mut self) -> Option<String> {
        let checkpoint = self.checkpoint.take()?;
        *self = *checkpoint.state;
        Some(checkpoint.name)
    }
}
