//! Console prompts for the interactive mode.

use std::{
    io::{self, BufRead, Write},
    path::PathBuf,
};

use anyhow::{bail, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Split,
    Merge,
}

/// Removes one pair of surrounding double quotes, as left by drag-and-drop.
pub fn strip_quotes(input: &str) -> &str {
    let input = input.trim();
    input
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .unwrap_or(input)
}

fn parse_mode(input: &str) -> Option<Mode> {
    match input.trim() {
        "1" => Some(Mode::Split),
        "2" => Some(Mode::Merge),
        _ => None,
    }
}

fn parse_positive(input: &str) -> Option<u32> {
    input.trim().parse::<u32>().ok().filter(|&n| n > 0)
}

/// Asks until `parse` accepts the answer; fails once stdin is exhausted.
pub fn retry<T>(question: &str, mut parse: impl FnMut(&str) -> Result<T, String>) -> Result<T> {
    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        print!("{question}");
        io::stdout().flush()?;
        let Some(line) = lines.next() else {
            bail!("Input ended before a valid answer was given");
        };
        match parse(&line?) {
            Ok(value) => return Ok(value),
            Err(message) => println!("{message}"),
        }
    }
}

pub fn work_mode() -> Result<Mode> {
    println!("Choose operation mode:");
    println!("1 - Split image into frames");
    println!("2 - Merge frames into one image");
    println!();
    retry("Enter mode number (1 or 2): ", |input| {
        parse_mode(input).ok_or_else(|| "Please enter 1 or 2!".to_string())
    })
}

pub fn positive_integer(question: &str) -> Result<u32> {
    retry(question, |input| {
        parse_positive(input).ok_or_else(|| "Please enter a positive integer!".to_string())
    })
}

pub fn path(question: &str) -> Result<PathBuf> {
    retry(question, |input| match strip_quotes(input) {
        "" => Err("Path cannot be empty!".to_string()),
        path => Ok(PathBuf::from(path)),
    })
}

pub fn existing_dir(question: &str) -> Result<PathBuf> {
    retry(question, |input| match strip_quotes(input) {
        "" => Err("Path cannot be empty!".to_string()),
        path if !PathBuf::from(path).is_dir() => Err("Folder not found!".to_string()),
        path => Ok(PathBuf::from(path)),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("\"C:\\images\\a.png\"", "C:\\images\\a.png" ; "quoted")]
    #[test_case("  plain.png ", "plain.png" ; "trimmed")]
    #[test_case("\"half.png", "\"half.png" ; "unbalanced")]
    #[test_case("\"\"", "" ; "empty quotes")]
    fn test_strip_quotes(input: &str, expected: &str) {
        assert_eq!(strip_quotes(input), expected);
    }

    #[test_case("1", Some(Mode::Split))]
    #[test_case(" 2 ", Some(Mode::Merge))]
    #[test_case("3", None)]
    #[test_case("", None)]
    fn test_parse_mode(input: &str, expected: Option<Mode>) {
        assert_eq!(parse_mode(input), expected);
    }

    #[test_case("4", Some(4))]
    #[test_case("0", None)]
    #[test_case("-2", None)]
    #[test_case("two", None)]
    fn test_parse_positive(input: &str, expected: Option<u32>) {
        assert_eq!(parse_positive(input), expected);
    }
}
