use std::fs::File;
use std::io::{Write, Read, stdout, stdin};
use std::iter::repeat;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use chrono::{Local, NaiveDateTime, TimeZone};
use crossterm::{
    style::{Attribute, SetAttribute},
    execute,
    tty::IsTty,
};

use crate::{specific_fail, specific_fail_str};
use crate::errors::{Error, Result};
use crate::note::NoteId;

/// datetime formating string
pub static DATEFMT: &str = "%F %T";

pub fn istty() -> bool {
    stdout().is_tty()
}

pub fn termsize() -> usize {
    if let Ok((cols, _rows)) = crossterm::terminal::size() {
        cols as usize
    } else {
        0
    }
}

/// current time in milliseconds, the shape of a freshly minted id
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

pub fn now_secs() -> i64 {
    chrono::Utc::now().timestamp()
}

/// local creation time encoded in a note id
pub fn nid_to_datetime_string(nid: NoteId) -> String {
    match Local.timestamp_millis_opt(nid) {
        chrono::LocalResult::Single(t) => t.format(DATEFMT).to_string(),
        chrono::LocalResult::Ambiguous(t, _) => t.format(DATEFMT).to_string(),
        chrono::LocalResult::None => "?".to_string(),
    }
}

/// Parse a `--start` date into a unix timestamp in seconds.
///
/// Accepts a bare integer (already seconds), `YYYY-MM-DD HH:MM:SS` or
/// `YYYY-MM-DD`, the latter two in local time.
pub fn parse_start(s: &str) -> Result<i64> {
    let s = s.trim();
    if let Ok(secs) = s.parse::<i64>() {
        return Ok(secs);
    }
    let naive = match NaiveDateTime::parse_from_str(s, DATEFMT) {
        Ok(t) => t,
        Err(_) => {
            let date = chrono::NaiveDate::parse_from_str(s, "%F").map_err(Error::from)?;
            match date.and_hms_opt(0, 0, 0) {
                Some(t) => t,
                None => return specific_fail!(format!("invalid date '{}'", s)),
            }
        }
    };
    match Local.from_local_datetime(&naive).earliest() {
        Some(t) => Ok(t.timestamp()),
        None => specific_fail!(format!("'{}' does not exist in the local timezone", s)),
    }
}

pub fn get_yn_input(message: &str) -> Result<bool> {
    print!("{}", message);
    stdout().flush()?;

    let stdin = stdin();
    let yes = ["y", "Y", "yes", "YES", "Yes"];
    let no = ["n", "N", "no", "NO", "No", ""];

    loop {
        print!("[y/N]# ");
        stdout().flush()?;
        let mut input = String::new();
        if stdin.read_line(&mut input)? == 0 {
            return Ok(false);
        }
        let input = input.trim();
        if yes.contains(&input) {
            return Ok(true);
        } else if no.contains(&input) {
            return Ok(false);
        };
        println!("invalid input.");
    }
}

pub fn pretty_line(bold: &str, plain: &str, tty: bool) -> Result<()> {
    let mut stdout = stdout();
    if tty {
        execute!(stdout, SetAttribute(Attribute::Bold))?;
    }
    print!("{}", bold);
    if tty {
        execute!(stdout, SetAttribute(Attribute::Reset))?;
    }
    print!("{}", plain);
    Ok(())
}

pub fn format_field(value: &str, width: usize, truncate: bool) -> String {
    if value.chars().count() > width && width > 3 && truncate {
        let cut: String = value.chars().take(width - 3).collect();
        format!("{}...", cut)
    } else {
        format!("{: <1$.1$}", value, width)
    }
}

pub fn print_header(columns: &[(&str, usize)], colsep: usize) -> Result<()> {
    let mut stdout = stdout();
    let column_seperator: String = repeat(' ').take(colsep).collect();
    let width = columns.iter().map(|c| c.1).sum::<usize>() + colsep * columns.len().saturating_sub(1);
    let header_seperator: String = repeat('-').take(width).collect();
    let tty = istty();
    let line = columns.iter()
                      .map(|(name, w)| format_field(name, *w, false))
                      .collect::<Vec<_>>()
                      .join(&column_seperator);
    if tty {
        execute!(stdout, SetAttribute(Attribute::Bold))?;
    }
    print!("{}\n{}\n", line, header_seperator);
    if tty {
        execute!(stdout, SetAttribute(Attribute::Reset))?;
    }
    Ok(())
}

pub fn find_collection_folder(collection_folder: &Option<String>) -> Result<PathBuf> {
    if let Some(pf) = collection_folder {
        Ok(PathBuf::from(pf))
    } else {
        match dirs::home_dir() {
            Some(p) => {
                let default_path = p.join(".noteorg");
                if default_path.is_file() {
                    let mut file = File::open(&default_path)?;
                    let mut contents = String::new();
                    file.read_to_string(&mut contents)?;
                    let trimmed = contents.trim();
                    if trimmed.is_empty() {
                         return specific_fail_str!("~/.noteorg is a file but is empty. It should contain a path to the collection directory.");
                    }
                    Ok(PathBuf::from(trimmed))
                } else {
                    Ok(default_path)
                }
            },
            None => specific_fail_str!("failed to find your home directory"),
        }
    }
}

pub fn collection_fingerprint<P: AsRef<Path>>(path: P) -> Result<u64> {
    let path = path.as_ref();
    let metadata = path.metadata()?;
    let modified = metadata.modified()?;
    let since_epoch = modified.duration_since(UNIX_EPOCH)?;
    Ok(since_epoch.as_nanos() as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_start_accepts_seconds_and_dates() {
        assert_eq!(parse_start("1580064801").unwrap(), 1580064801);
        let day = parse_start("2020-01-26").unwrap();
        let with_time = parse_start("2020-01-26 00:00:10").unwrap();
        assert_eq!(with_time - day, 10);
        assert!(parse_start("yesterday").is_err());
    }

    #[test]
    fn format_field_pads_and_truncates() {
        assert_eq!(format_field("ab", 4, false), "ab  ");
        assert_eq!(format_field("abcdefgh", 6, true), "abc...");
        assert_eq!(format_field("abcdefgh", 3, false), "abc");
    }

    #[test]
    fn nid_dates_render() {
        assert_ne!(nid_to_datetime_string(1580064801573), "?");
    }
}
