//! Parsing for per-scrobbler ignore-list files (spec.md §6): groups of
//! `field = value` lines separated by blank lines, same grammar family as
//! the journal but matched against [`IgnoreListEntry`].

use crate::models::{IgnoreList, IgnoreListEntry};

pub fn load_ignore_list(text: &str) -> IgnoreList {
    let mut entries = Vec::new();
    let mut current = IgnoreListEntry::default();
    let mut dirty = false;

    for raw_line in text.lines() {
        let line = raw_line.trim();
        if line.is_empty() {
            if dirty {
                entries.push(std::mem::take(&mut current));
                dirty = false;
            }
            continue;
        }
        if line.starts_with('#') {
            continue;
        }

        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        let key = key.trim();
        let value = value.trim().to_string();
        dirty = true;

        match key {
            "artist" => current.artist = value,
            "album" => current.album = value,
            "title" => current.title = value,
            "track_number" => current.track_number = value,
            _ => {}
        }
    }

    if dirty {
        entries.push(current);
    }

    IgnoreList { entries }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Record, Source};

    #[test]
    fn parses_multiple_groups_separated_by_blank_lines() {
        let text = "artist = A\ntitle = X\n\nartist = B\n";
        let list = load_ignore_list(text);
        assert_eq!(list.entries.len(), 2);
        assert_eq!(list.entries[0].artist, "A");
        assert_eq!(list.entries[0].title, "X");
        assert_eq!(list.entries[1].artist, "B");
    }

    #[test]
    fn parsed_entry_matches_as_expected() {
        let list = load_ignore_list("artist = A\ntitle = X\n");
        let record = Record::new("A", "X", None, None, None, 10, "1".into(), false, Source::Playlist)
            .unwrap();
        assert!(list.matches(&record));
    }
}
