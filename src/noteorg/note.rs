use std::fmt;

use base64::{Engine as _, engine::general_purpose};
use rand::RngCore;
use serde::{Serialize, Deserialize};

/// note ids double as creation timestamps (milliseconds since the epoch)
pub type NoteId = i64;
pub type CardId = i64;
pub type DeckId = i64;
pub type NotetypeId = i64;

/// usn value that marks an object as changed since the last sync
pub const USN_PENDING: i32 = -1;

/// Represents a note, the content record behind one or more cards
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Note {
    pub id: NoteId,
    pub guid: String,
    pub notetype_id: NotetypeId,
    pub fields: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub usn: i32,
    #[serde(default)]
    pub mtime: i64,
}

impl Note {
    pub fn new(notetype: &Notetype) -> Note {
        Note {
            id: 0,
            guid: new_guid(),
            notetype_id: notetype.id,
            fields: vec![String::new(); notetype.fields.len()],
            tags: vec![],
            usn: USN_PENDING,
            mtime: 0,
        }
    }

    pub fn filled_field_count(&self) -> usize {
        self.fields.iter().filter(|f| !f.is_empty()).count()
    }
}

/// a random, url safe guid
pub fn new_guid() -> String {
    let mut bytes = [0u8; 8];
    rand::thread_rng().fill_bytes(&mut bytes);
    general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}

#[derive(Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Debug)]
#[serde(rename_all = "lowercase")]
pub enum CardType {
    New,
    Learning,
    Review,
    Relearning,
}

#[derive(Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Debug)]
#[serde(rename_all = "lowercase")]
pub enum CardQueue {
    Suspended,
    Buried,
    New,
    Learning,
    Review,
    DayLearning,
}

/// scheduling state of a card
#[derive(Serialize, Deserialize, Clone, Copy, PartialEq, Debug)]
pub struct Schedule {
    pub ctype: CardType,
    pub queue: CardQueue,
    pub due: i64,
    pub interval: i32,
    pub factor: i32,
    pub reps: i32,
    pub lapses: i32,
    pub left: i32,
}

impl Schedule {
    /// a card nobody has studied yet, at position `due` of the new queue
    pub fn new_card(due: i64) -> Schedule {
        Schedule {
            ctype: CardType::New,
            queue: CardQueue::New,
            due,
            interval: 0,
            factor: 0,
            reps: 0,
            lapses: 0,
            left: 0,
        }
    }

    pub fn is_new(&self) -> bool {
        self.ctype == CardType::New
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Card {
    pub id: CardId,
    pub nid: NoteId,
    pub did: DeckId,
    /// home deck while the card sits in a filtered deck
    #[serde(default)]
    pub odid: Option<DeckId>,
    pub ord: usize,
    pub schedule: Schedule,
    #[serde(default)]
    pub usn: i32,
    #[serde(default)]
    pub mtime: i64,
}

impl Card {
    pub fn home_deck(&self) -> DeckId {
        self.odid.unwrap_or(self.did)
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Template {
    pub name: String,
    pub front: String,
    #[serde(default)]
    pub back: String,
}

/// a note schema: field names plus the templates that generate cards
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Notetype {
    pub id: NotetypeId,
    pub name: String,
    pub fields: Vec<String>,
    pub templates: Vec<Template>,
    #[serde(default)]
    pub default_deck: Option<DeckId>,
}

impl Notetype {
    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f == name)
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Deck {
    pub id: DeckId,
    pub name: String,
    #[serde(default)]
    pub current_notetype: Option<NotetypeId>,
}

impl fmt::Display for CardType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f,
               "{}",
               match *self {
                   CardType::New => "new",
                   CardType::Learning => "learning",
                   CardType::Review => "review",
                   CardType::Relearning => "relearning",
               })
    }
}
