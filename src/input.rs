use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

/// Splits semicolon-separated input ("a; b;; c") into trimmed, non-empty items.
pub fn parse_list(raw: &str) -> Vec<String> {
    raw.split(';')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// One keyword per non-blank line.
pub fn parse_lines(raw: &str) -> Vec<String> {
    raw.lines()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

pub fn read_keywords_file(path: &Path) -> Result<Vec<String>> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read keywords file {}", path.display()))?;
    Ok(parse_lines(&raw))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_list_trims_and_drops_empties() {
        assert_eq!(parse_list("a; b;;  c ;"), vec!["a", "b", "c"]);
        assert!(parse_list(" ; ").is_empty());
    }

    #[test]
    fn parse_list_keeps_commas_inside_items() {
        assert_eq!(
            parse_list("Austin, Texas; Paris, France"),
            vec!["Austin, Texas", "Paris, France"]
        );
    }

    #[test]
    fn parse_lines_handles_crlf_and_blanks() {
        assert_eq!(parse_lines("one\r\n\r\n two \nthree"), vec!["one", "two", "three"]);
    }

    #[test]
    fn read_keywords_file_reads_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("keywords.txt");
        fs::write(&path, "best coffee\nespresso machine\n").unwrap();
        assert_eq!(
            read_keywords_file(&path).unwrap(),
            vec!["best coffee", "espresso machine"]
        );
    }

    #[test]
    fn read_keywords_file_missing_is_error() {
        let err = read_keywords_file(Path::new("/definitely/not/here.txt")).unwrap_err();
        assert!(format!("{:#}", err).contains("keywords file"));
    }
}
