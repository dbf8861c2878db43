//! Minimal INI reader/writer, hand-rolled rather than pulled from a crate.
//!
//! Grounded in `original_source/sysmodule/src/config.cpp`'s `BrowseIniFunc`:
//! the original walks the file with `minIni`'s `ini_browse` callback and
//! does its own `strncmp`/`strtoul`-based key matching. This module plays
//! the same role as `minIni` (generic section/key/value walking) while the
//! semantic validation (hex title IDs, `<profile>_<module>` key shapes,
//! decimal MHz parsing) stays in `config::ConfigStore`, matching the
//! original's split between `minIni` (generic) and `BrowseIniFunc`
//! (semantic).

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::Path;

/// One parsed `key=value` pair together with the section it lives under.
/// `section` is `""` for keys appearing before any `[section]` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub section: String,
    pub key: String,
    pub value: String,
}

/// Parses generic INI syntax: `;`/`#` full-line comments, `[section]`
/// headers, `key=value` pairs. Leading/trailing whitespace is trimmed from
/// every component. Lines that are neither a section header nor a
/// `key=value` pair are silently dropped — the caller sees only the valid
/// entries and is responsible for any policy around what's "recognized".
pub fn parse(text: &str) -> Vec<Entry> {
    let mut entries = Vec::new();
    let mut section = String::new();

    for raw_line in text.lines() {
        let line = raw_line.trim();
        if line.is_empty() || line.starts_with(';') || line.starts_with('#') {
            continue;
        }
        if let Some(name) = line.strip_prefix('[').and_then(|s| s.strip_suffix(']')) {
            section = name.trim().to_string();
            continue;
        }
        if let Some((key, value)) = line.split_once('=') {
            entries.push(Entry {
                section: section.clone(),
                key: key.trim().to_string(),
                value: value.trim().to_string(),
            });
        }
    }

    entries
}

/// Renders `sections` (in the given order) back to INI text. Sections
/// with no entries are omitted.
pub fn serialize<'a>(sections: impl IntoIterator<Item = (&'a str, Vec<(String, String)>)>) -> String {
    let mut out = String::new();
    for (name, entries) in sections {
        if entries.is_empty() {
            continue;
        }
        out.push('[');
        out.push_str(name);
        out.push_str("]\n");
        for (k, v) in entries {
            out.push_str(&k);
            out.push('=');
            out.push_str(&v);
            out.push('\n');
        }
        out.push('\n');
    }
    out
}

/// Writes `contents` to `path` atomically: write to a sibling temp file,
/// `fsync`, then rename over the destination (spec.md §4.6 "Write": "write
/// to a temp path, fsync, rename. Any IO error returns false and leaves
/// the file unchanged").
pub fn atomic_write(path: &Path, contents: &str) -> io::Result<()> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(dir)?;
    let tmp_path = dir.join(format!(
        ".{}.tmp",
        path.file_name().and_then(|n| n.to_str()).unwrap_or("config")
    ));

    {
        let mut tmp = File::create(&tmp_path)?;
        tmp.write_all(contents.as_bytes())?;
        tmp.sync_all()?;
    }
    fs::rename(&tmp_path, path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_sections_and_keys() {
        let text = "[0100000000000001]\n; comment\nhandheld_cpu=1224\ndocked_gpu=768\n\n[values]\npolling_interval_ms=300\n";
        let entries = parse(text);
        assert_eq!(
            entries,
            vec![
                Entry { section: "0100000000000001".into(), key: "handheld_cpu".into(), value: "1224".into() },
                Entry { section: "0100000000000001".into(), key: "docked_gpu".into(), value: "768".into() },
                Entry { section: "values".into(), key: "polling_interval_ms".into(), value: "300".into() },
            ]
        );
    }

    #[test]
    fn ignores_malformed_lines() {
        let text = "[values]\nnot a valid line\nfoo=bar\n";
        let entries = parse(text);
        assert_eq!(entries, vec![Entry { section: "values".into(), key: "foo".into(), value: "bar".into() }]);
    }

    #[test]
    fn atomic_write_then_parse_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.ini");
        let body = serialize([("0100000000000001", vec![("handheld_cpu".to_string(), "1224".to_string())])]);
        atomic_write(&path, &body).unwrap();
        let read_back = fs::read_to_string(&path).unwrap();
        let entries = parse(&read_back);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].value, "1224");
    }
}
