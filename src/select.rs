//! Interactive version picker.

use std::io::{BufRead, Write};

use anyhow::Result;
use colored::Colorize;

use crate::domain::types::VersionCandidate;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    Version(String),
    MonitorOnly,
    Cancelled,
}

/// Interpret one line of input. `None` means the answer was not understood.
///
/// Accepts a menu index (`0` is monitor-only), a date version with or
/// without its `v`, `w`/`wait`, and `q`/`quit` or an empty line to cancel.
pub fn parse_choice(input: &str, candidates: &[VersionCandidate]) -> Option<Selection> {
    let answer = input.trim().to_lowercase();

    match answer.as_str() {
        "" | "q" | "quit" => return Some(Selection::Cancelled),
        "w" | "wait" => return Some(Selection::MonitorOnly),
        _ => {}
    }

    // Digits that are not a menu entry may still be a bare date version.
    if let Ok(index) = answer.parse::<usize>() {
        if index == 0 {
            return Some(Selection::MonitorOnly);
        }
        if let Some(c) = candidates.get(index - 1) {
            return Some(Selection::Version(c.date_version.clone()));
        }
    }

    let date = answer.strip_prefix('v').unwrap_or(&answer);
    candidates
        .iter()
        .find(|c| c.date_version == date)
        .map(|c| Selection::Version(c.date_version.clone()))
}

/// Show the menu on stderr and read answers from stdin until one parses.
/// End of input cancels.
pub fn prompt(candidates: &[VersionCandidate]) -> Result<Selection> {
    let stdin = std::io::stdin();
    prompt_from(candidates, &mut stdin.lock(), &mut std::io::stderr())
}

fn prompt_from<R: BufRead, W: Write>(
    candidates: &[VersionCandidate],
    input: &mut R,
    out: &mut W,
) -> Result<Selection> {
    writeln!(out, "{}", "Available AMI Versions".bold())?;
    writeln!(
        out,
        "  {} Just wait (monitor nodeclaims)",
        format!("{:>3})", 0).dimmed()
    )?;
    for (i, candidate) in candidates.iter().enumerate() {
        writeln!(
            out,
            "  {} {} - Created: {}",
            format!("{:>3})", i + 1).dimmed(),
            candidate.label().bold(),
            candidate.created_display()
        )?;
    }

    loop {
        write!(out, "{} Select a version (q to cancel): ", "??".blue().bold())?;
        out.flush()?;

        let mut line = String::new();
        if input.read_line(&mut line)? == 0 {
            return Ok(Selection::Cancelled);
        }
        match parse_choice(&line, candidates) {
            Some(selection) => return Ok(selection),
            None => writeln!(out, "{} '{}' is not an option", "!!".yellow().bold(), line.trim())?,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidates() -> Vec<VersionCandidate> {
        ["20251001", "20250901"]
            .iter()
            .map(|d| VersionCandidate {
                date_version: d.to_string(),
                created_at: "2025-10-01T00:00:00.000Z".to_string(),
            })
            .collect()
    }

    #[test]
    fn indexes_map_to_menu_entries() {
        let c = candidates();
        assert_eq!(parse_choice("0", &c), Some(Selection::MonitorOnly));
        assert_eq!(parse_choice("1", &c), Some(Selection::Version("20251001".into())));
        assert_eq!(parse_choice(" 2\n", &c), Some(Selection::Version("20250901".into())));
        assert_eq!(parse_choice("3", &c), None);
    }

    #[test]
    fn dates_with_or_without_prefix() {
        let c = candidates();
        assert_eq!(parse_choice("v20250901", &c), Some(Selection::Version("20250901".into())));
        assert_eq!(parse_choice("20251001", &c), Some(Selection::Version("20251001".into())));
        assert_eq!(parse_choice("V20251001", &c), Some(Selection::Version("20251001".into())));
        assert_eq!(parse_choice("20240101", &c), None);
    }

    #[test]
    fn bare_date_is_not_read_as_an_index() {
        let only = vec![VersionCandidate {
            date_version: "20251001".into(),
            created_at: "2025-10-01T00:00:00.000Z".into(),
        }];
        assert_eq!(parse_choice("20251001", &only), Some(Selection::Version("20251001".into())));
        assert_eq!(parse_choice("2", &only), None);
    }

    #[test]
    fn wait_and_quit_words() {
        let c = candidates();
        assert_eq!(parse_choice("wait", &c), Some(Selection::MonitorOnly));
        assert_eq!(parse_choice("q", &c), Some(Selection::Cancelled));
        assert_eq!(parse_choice("", &c), Some(Selection::Cancelled));
        assert_eq!(parse_choice("latest", &c), None);
    }

    #[test]
    fn prompt_reprompts_until_valid() {
        let c = candidates();
        let mut input = "nope\n2\n".as_bytes();
        let mut out = Vec::new();

        let selection = prompt_from(&c, &mut input, &mut out).unwrap();

        assert_eq!(selection, Selection::Version("20250901".into()));
        let shown = String::from_utf8(out).unwrap();
        assert!(shown.contains("v20251001"));
        assert!(shown.contains("'nope' is not an option"));
    }

    #[test]
    fn prompt_blank_line_and_eof_cancel() {
        let c = candidates();
        let mut out = Vec::new();
        assert_eq!(
            prompt_from(&c, &mut "\n".as_bytes(), &mut out).unwrap(),
            Selection::Cancelled
        );
        assert_eq!(
            prompt_from(&c, &mut "".as_bytes(), &mut out).unwrap(),
            Selection::Cancelled
        );
    }
}
