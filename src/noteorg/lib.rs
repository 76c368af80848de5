pub mod action;
pub mod args;
pub mod collection;
pub mod config;
pub mod errors;
pub mod fields;
pub mod logging;
pub mod note;
pub mod organizer;
pub mod rearranger;
pub mod reviewer;
pub mod store;
pub mod utils;

use clap::Parser;
use tracing::debug;

use args::{Cli, Commands};
use collection::Collection;
use config::Config;
use errors::{Error, ErrorKind, Result};
use note::{Note, NoteId};
use organizer::{needs_count_warning, Outcome, Session};
use rearranger::Report;
use reviewer::{insert_from_review, ReviewerCommand};
use store::Store;
use utils::{get_yn_input, istty, parse_start, pretty_line};

pub fn r#run() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose);
    run_with(cli)
}

fn print_report(report: &Report, yaml: bool) -> Result<()> {
    if yaml {
        print!("{}", serde_yaml::to_string(report)?);
        return Ok(());
    }
    println!("{}", report);
    if !report.to_select.is_empty() {
        let ids: Vec<String> = report.to_select.iter().map(|n| n.to_string()).collect();
        pretty_line("notes: ", &format!("{}\n", ids.join(" ")), istty())?;
    }
    Ok(())
}

fn add_note(store: &mut Store,
            notetype: &str,
            deck: &Option<String>,
            tags: &[String],
            fields: &[String])
            -> Result<NoteId> {
    let nt = store.notetype_by_name(notetype)
                  .ok_or_else(|| Error::of(ErrorKind::NotetypeNotFound(notetype.to_string())))?;
    if fields.len() > nt.fields.len() {
        return specific_fail!(format!("note type '{}' has {} field(s), got {}",
                                      nt.name, nt.fields.len(), fields.len()));
    }
    let did = match deck {
        Some(name) => store.add_deck(name),
        None => nt.default_deck
                  .filter(|d| store.decks.contains_key(d))
                  .unwrap_or_else(|| store.default_deck_id()),
    };
    let mut note = Note::new(&nt);
    for (slot, value) in note.fields.iter_mut().zip(fields) {
        *slot = value.clone();
    }
    note.tags = tags.to_vec();
    let nid = store.add_note(note, did)?;
    store.assign_notetype_to_deck(nt.id, did)?;
    Ok(nid)
}

/// Run a parsed command line.
pub fn run_with(cli: Cli) -> Result<()> {
    if let Some(Commands::Init) = cli.command {
        let (store, _) = Store::new(&cli.collection, &cli.collection_folder, true, cli.yes)?;
        store.save_to_file(&cli.collection, &cli.collection_folder, true, cli.yes, &0)?;
        println!("created collection '{}'", cli.collection);
        return Ok(());
    }

    let (mut store, fingerprint) = Store::new(&cli.collection, &cli.collection_folder, false, cli.yes)?;
    let config = Config::load(&cli.collection_folder)?;
    debug!(collection = %cli.collection, notes = store.notes.len(), "loaded collection");

    match &cli.command {
        Some(Commands::Init) => {}
        Some(Commands::Add { notetype, deck, tags, fields }) => {
            let nid = add_note(&mut store, notetype, deck, tags, fields)?;
            store.save_to_file(&cli.collection, &cli.collection_folder, false, cli.yes, &fingerprint)?;
            println!("added note {}", nid);
        }
        Some(Commands::List { deck, limit, yaml }) => {
            let did = match deck {
                Some(name) => match store.deck_by_name(name) {
                    Some(d) => Some(d.id),
                    None => return specific_fail!(format!("deck '{}' does not exist", name)),
                },
                None => None,
            };
            store.list_notes(did, limit.unwrap_or(0), *yaml)?;
        }
        Some(Commands::Rearrange { rows, start, moved, repos, yaml }) => {
            let tokens = action::parse_rows(rows)?;
            let mut session = Session::from_rows(tokens, moved.clone());
            if let Some(s) = start {
                session.set_start(Some(parse_start(s)?));
            }
            session.repos = *repos || config.reposition;

            let nids: Vec<NoteId> = session.rows().iter().filter_map(|t| t.nid()).collect();
            let cards = store.card_count(&nids);
            if needs_count_warning(cards, config.card_count_warning) && !cli.yes {
                let message = format!("This will organize {} cards, which may be slow. Continue?\n", cards);
                if !get_yn_input(&message)? {
                    return Ok(());
                }
            }
            if session.is_modified() && config.ask_confirmation && !cli.yes {
                println!("{}", session.plan());
                if !get_yn_input("Are you sure you want to proceed?\n")? {
                    return Ok(());
                }
            }

            match session.accept(&mut store, &config)? {
                Outcome::Unchanged => println!("No changes performed"),
                Outcome::Applied(report) => {
                    store.save_to_file(&cli.collection, &cli.collection_folder, false, cli.yes, &fingerprint)?;
                    print_report(&report, *yaml)?;
                }
            }
        }
        Some(Commands::Insert { card, action, position }) => {
            let card = store.get_card(*card)?;
            let command = ReviewerCommand::new((*action).into(), (*position).into());
            match insert_from_review(&mut store, &config, &card, command)? {
                Some(report) => {
                    store.save_to_file(&cli.collection, &cli.collection_folder, false, cli.yes, &fingerprint)?;
                    println!("{}", command);
                    print_report(&report, false)?;
                }
                None => println!("note {} is not in the collection", card.nid),
            }
        }
        Some(Commands::Undo) => match store.undo() {
            Some(name) => {
                store.save_to_file(&cli.collection, &cli.collection_folder, false, cli.yes, &fingerprint)?;
                println!("undid '{}'", name);
            }
            None => println!("nothing to undo"),
        },
        Some(Commands::Info) => {
            store.stats(&cli.collection)?;
        }
        None => {
            store.list_notes(None, 0, false)?;
        }
    }

    Ok(())
}
