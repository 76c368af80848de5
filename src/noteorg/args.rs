use clap::{ArgAction, Parser, Subcommand, ValueEnum};

use crate::reviewer::{Action, Placement};

#[derive(Parser, Debug, Clone)]
#[command(name = "noteorg")]
#[command(version)]
#[command(about = "reorder, insert and delete flashcard notes by rewriting their ids", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Collection to use
    #[arg(short, long, default_value = "collection")]
    pub collection: String,

    /// Folder holding collections and config.yaml
    #[arg(long, env = "NOTEORG_FOLDER")]
    pub collection_folder: Option<String>,

    /// Do not ask for confirmation
    #[arg(short, long)]
    pub yes: bool,

    /// More log output on stderr (-v, -vv, -vvv)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertAction {
    New,
    Dupe,
    DupeSched,
}

impl From<InsertAction> for Action {
    fn from(a: InsertAction) -> Action {
        match a {
            InsertAction::New => Action::New,
            InsertAction::Dupe => Action::Dupe,
            InsertAction::DupeSched => Action::DupeSched,
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertPosition {
    Before,
    After,
}

impl From<InsertPosition> for Placement {
    fn from(p: InsertPosition) -> Placement {
        match p {
            InsertPosition::Before => Placement::Before,
            InsertPosition::After => Placement::After,
        }
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Create a new collection
    Init,

    /// Add a note
    Add {
        /// Note type of the note
        #[arg(short, long, default_value = "Basic")]
        notetype: String,

        /// Deck for the note's cards
        #[arg(short, long)]
        deck: Option<String>,

        /// Tags of the note
        #[arg(short, long, num_args = 1..)]
        tags: Vec<String>,

        /// Field values in note type order
        #[arg(required = true)]
        fields: Vec<String>,
    },

    /// List notes in id order (default if no command)
    List {
        /// Only notes with cards in this deck
        #[arg(short, long)]
        deck: Option<String>,

        /// Limit results
        #[arg(short, long)]
        limit: Option<usize>,

        /// Output as YAML
        #[arg(long)]
        yaml: bool,
    },

    /// Apply an edited row list: note ids, "New: <type>", "Dupe: <id>",
    /// "Dupe (sched): <id>" or "Del: <id>"
    Rearrange {
        /// Rows in their new order
        #[arg(required = true)]
        rows: Vec<String>,

        /// Creation date for the first row ("YYYY-MM-DD[ HH:MM:SS]" or seconds)
        #[arg(short, long)]
        start: Option<String>,

        /// Ids the user moved
        #[arg(short, long, num_args = 1..)]
        moved: Vec<i64>,

        /// Reposition new cards to follow the new order
        #[arg(short, long)]
        repos: bool,

        /// Print the report as YAML
        #[arg(long)]
        yaml: bool,
    },

    /// Add a note next to the note of a card, the way the reviewer does
    Insert {
        /// Card under review
        card: i64,

        #[arg(short, long, value_enum, default_value_t = InsertAction::New)]
        action: InsertAction,

        #[arg(short, long, value_enum, default_value_t = InsertPosition::After)]
        position: InsertPosition,
    },

    /// Undo the last rearrangement
    Undo,

    /// Show collection info
    Info,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rearrange_rows_and_flags() {
        let cli = Cli::try_parse_from(["noteorg", "-y", "rearrange", "3000", "Del: 1000", "New: Basic",
                                       "--moved", "3000", "--repos"]).unwrap();
        assert!(cli.yes);
        match cli.command {
            Some(Commands::Rearrange { rows, moved, repos, start, .. }) => {
                assert_eq!(rows, ["3000", "Del: 1000", "New: Basic"]);
                assert_eq!(moved, [3000]);
                assert!(repos);
                assert!(start.is_none());
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn insert_defaults() {
        let cli = Cli::try_parse_from(["noteorg", "insert", "42", "--action", "dupe-sched"]).unwrap();
        match cli.command {
            Some(Commands::Insert { card, action, position }) => {
                assert_eq!(card, 42);
                assert_eq!(Action::from(action), Action::DupeSched);
                assert_eq!(Placement::from(position), Placement::After);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn defaults_to_list_collection() {
        let cli = Cli::try_parse_from(["noteorg", "-vv"]).unwrap();
        assert!(cli.command.is_none());
        assert_eq!(cli.collection, "collection");
        assert_eq!(cli.verbose, 2);
    }
}
