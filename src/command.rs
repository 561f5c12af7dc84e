// src/command.rs

use std::str::FromStr;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::capture::Side;

// One user intent read from a session script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Fix,
    // Streams readings until the count or the end of the provider's track.
    Watch(Option<usize>),
    Label(String),
    Add,
    Clear,
    Select { index: usize, side: Side },
    Compare,
    Show,
    List,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CommandError {
    #[error("empty command")]
    Empty,
    #[error("unknown command `{0}`")]
    Unknown(String),
    #[error("`{command}` expects {expected}")]
    BadArguments {
        command: &'static str,
        expected: &'static str,
    },
}

impl FromStr for Command {
    type Err = CommandError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let line = line.trim();
        let (word, rest) = match line.split_once(char::is_whitespace) {
            Some((word, rest)) => (word, rest.trim()),
            None => (line, ""),
        };

        let no_args = |cmd: Command, name: &'static str| {
            if rest.is_empty() {
                Ok(cmd)
            } else {
                Err(CommandError::BadArguments { command: name, expected: "no arguments" })
            }
        };

        match word.to_ascii_lowercase().as_str() {
            "" => Err(CommandError::Empty),
            "fix" => no_args(Command::Fix, "fix"),
            "watch" if rest.is_empty() => Ok(Command::Watch(None)),
            "watch" => match rest.parse::<usize>() {
                Ok(count) if count > 0 => Ok(Command::Watch(Some(count))),
                _ => Err(CommandError::BadArguments {
                    command: "watch",
                    expected: "an optional positive reading count",
                }),
            },
            // The label keeps its inner spacing; trimming happens on commit.
            "label" => Ok(Command::Label(rest.to_string())),
            "add" => no_args(Command::Add, "add"),
            "clear" => no_args(Command::Clear, "clear"),
            "compare" => no_args(Command::Compare, "compare"),
            "show" => no_args(Command::Show, "show"),
            "list" => no_args(Command::List, "list"),
            "select" => {
                let bad = CommandError::BadArguments {
                    command: "select",
                    expected: "<index> <left|right>",
                };
                let mut args = rest.split_whitespace();
                let (Some(index), Some(side), None) = (args.next(), args.next(), args.next()) else {
                    return Err(bad);
                };
                let index: usize = index.parse().map_err(|_| bad.clone())?;
                let side: Side = side.parse().map_err(|_| bad)?;
                Ok(Command::Select { index, side })
            }
            other => Err(CommandError::Unknown(other.to_string())),
        }
    }
}

// A `#` opens a comment at the start of a line or as a standalone word,
// so `label Gate #4` keeps its label.
static COMMENT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:^|\s)#(?:\s|$)").expect("Invalid comment regex"));

fn strip_comment(line: &str) -> &str {
    let line = line.trim();
    if line.starts_with('#') {
        return "";
    }
    match COMMENT_RE.find(line) {
        Some(m) => line[..m.start()].trim_end(),
        None => line,
    }
}

// Strips comments and blank lines, keeping 1-based line numbers.
pub fn script_lines(text: &str) -> impl Iterator<Item = (usize, &str)> {
    text.lines()
        .enumerate()
        .map(|(i, l)| (i + 1, strip_comment(l)))
        .filter(|(_, l)| !l.is_empty())
}

/* ---------------- TEST ---------------- */

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_commands() {
        assert_eq!("fix".parse::<Command>(), Ok(Command::Fix));
        assert_eq!("  ADD ".parse::<Command>(), Ok(Command::Add));
        assert_eq!("clear".parse::<Command>(), Ok(Command::Clear));
        assert_eq!("compare".parse::<Command>(), Ok(Command::Compare));
        assert_eq!("show".parse::<Command>(), Ok(Command::Show));
        assert_eq!("list".parse::<Command>(), Ok(Command::List));
    }

    #[test]
    fn test_parse_label() {
        assert_eq!("label My  Home".parse::<Command>(), Ok(Command::Label("My  Home".into())));
        assert_eq!("label".parse::<Command>(), Ok(Command::Label(String::new())));
    }

    #[test]
    fn test_parse_select() {
        assert_eq!(
            "select 2 right".parse::<Command>(),
            Ok(Command::Select { index: 2, side: Side::Right })
        );
        assert!(matches!(
            "select two left".parse::<Command>(),
            Err(CommandError::BadArguments { command: "select", .. })
        ));
        assert!(matches!(
            "select 1".parse::<Command>(),
            Err(CommandError::BadArguments { .. })
        ));
        assert!(matches!(
            "select 1 up".parse::<Command>(),
            Err(CommandError::BadArguments { .. })
        ));
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!("".parse::<Command>(), Err(CommandError::Empty));
        assert_eq!("fly".parse::<Command>(), Err(CommandError::Unknown("fly".into())));
        assert!(matches!(
            "fix now".parse::<Command>(),
            Err(CommandError::BadArguments { command: "fix", .. })
        ));
    }

    #[test]
    fn test_script_lines() {
        let script = "# session\nfix\n\nlabel Home # trailing\n  add\n";
        let lines: Vec<_> = script_lines(script).collect();
        assert_eq!(lines, vec![(2, "fix"), (4, "label Home"), (5, "add")]);
    }

    #[test]
    fn test_hash_inside_label_is_kept() {
        let script = "label Gate #4\nlabel C# club\t# note\n#comment\nlabel #\n";
        let commands: Vec<_> = script_lines(script)
            .map(|(_, text)| text.parse::<Command>().unwrap())
            .collect();
        assert_eq!(
            commands,
            vec![
                Command::Label("Gate #4".into()),
                Command::Label("C# club".into()),
                Command::Label(String::new()),
            ]
        );
    }

    #[test]
    fn test_parse_watch() {
        assert_eq!("watch".parse::<Command>(), Ok(Command::Watch(None)));
        assert_eq!("watch 3".parse::<Command>(), Ok(Command::Watch(Some(3))));
        assert!(matches!(
            "watch 0".parse::<Command>(),
            Err(CommandError::BadArguments { command: "watch", .. })
        ));
        assert!(matches!(
            "watch all".parse::<Command>(),
            Err(CommandError::BadArguments { command: "watch", .. })
        ));
    }
}
