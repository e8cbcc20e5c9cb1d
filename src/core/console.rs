//! In-game console: scrollback, line editing and slash commands.
use std::collections::VecDeque;

use crate::render::casters::{MIN_FOV, MIN_VIEW_ACCURACY};

/// Scrollback lines kept on screen.
pub const CONSOLE_LINES: usize = 8;
/// Longest line or entry, in characters.
pub const CONSOLE_WIDTH: usize = 64;

pub const HELP: [&str; 4] = [
    "Commands:",
    "  quit echo help host clear",
    "  join name fullscreen",
    "  fov view_accuracy view_distance",
];

#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    Quit,
    Echo(String),
    Host(Option<u16>),
    Join(String),
    Name(String),
    Fov(f32),
    ViewAccuracy(f32),
    ViewDistance(f32),
    Fullscreen,
    Clear,
    Help,
    /// Known command with a missing or malformed argument.
    Invalid { usage: &'static str },
    Unknown(String),
}

/// What a submitted entry line turned into.
#[derive(Clone, Debug, PartialEq)]
pub enum Submission {
    Command(Command),
    Chat(String),
    Empty,
}

/// Parses `/name [argument]`. Returns `None` for lines that are not commands.
pub fn parse_command(line: &str) -> Option<Command> {
    let body = line.strip_prefix('/')?;
    if body.is_empty() {
        return None;
    }
    let (name, arg) = match body.split_once(char::is_whitespace) {
        Some((name, rest)) => (name, Some(rest.trim()).filter(|a| !a.is_empty())),
        None => (body, None),
    };

    let command = match name {
        "quit" => Command::Quit,
        "echo" => Command::Echo(arg.unwrap_or_default().to_string()),
        "host" => match arg.map(str::parse::<u16>) {
            None => Command::Host(None),
            Some(Ok(port)) => Command::Host(Some(port)),
            Some(Err(_)) => Command::Invalid {
                usage: "Usage: /host [port]",
            },
        },
        "join" => match arg {
            Some(addr) => Command::Join(addr.to_string()),
            None => Command::Invalid {
                usage: "Usage: /join address[:port]",
            },
        },
        "name" => match arg {
            Some(name) => Command::Name(name.to_string()),
            None => Command::Invalid {
                usage: "Usage: /name your_name_here",
            },
        },
        "fov" => parse_at_least(arg, MIN_FOV).map_or(
            Command::Invalid {
                usage: "Usage: /fov radians",
            },
            Command::Fov,
        ),
        "view_accuracy" => parse_at_least(arg, MIN_VIEW_ACCURACY).map_or(
            Command::Invalid {
                usage: "Usage: /view_accuracy step",
            },
            Command::ViewAccuracy,
        ),
        "view_distance" => parse_at_least(arg, f32::MIN_POSITIVE).map_or(
            Command::Invalid {
                usage: "Usage: /view_distance tiles",
            },
            Command::ViewDistance,
        ),
        "fullscreen" => Command::Fullscreen,
        "clear" => Command::Clear,
        "help" => Command::Help,
        other => Command::Unknown(other.to_string()),
    };
    Some(command)
}

fn parse_at_least(arg: Option<&str>, min: f32) -> Option<f32> {
    arg?.parse::<f32>()
        .ok()
        .filter(|v| v.is_finite() && *v >= min)
}

#[derive(Debug, Default)]
pub struct Console {
    lines: VecDeque<String>,
    entry: String,
    previous_entry: String,
    entry_active: bool,
}

impl Console {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a line at the bottom, scrolling the oldest one away.
    pub fn push(&mut self, text: &str) {
        let line: String = text.chars().take(CONSOLE_WIDTH).collect();
        tracing::info!(target: "console", "{line}");
        self.lines.push_front(line);
        self.lines.truncate(CONSOLE_LINES);
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }

    /// Newest first.
    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.lines.iter().map(String::as_str)
    }

    pub fn entry(&self) -> &str {
        &self.entry
    }

    pub fn entry_active(&self) -> bool {
        self.entry_active
    }

    pub fn open(&mut self) {
        self.entry_active = true;
    }

    pub fn close(&mut self) {
        self.entry_active = false;
    }

    /// Appends a printable ASCII character if there is room.
    pub fn push_char(&mut self, c: char) {
        if (' '..='~').contains(&c) && self.entry.len() < CONSOLE_WIDTH {
            self.entry.push(c);
        }
    }

    pub fn pop_char(&mut self) {
        self.entry.pop();
    }

    pub fn clear_entry(&mut self) {
        self.entry.clear();
    }

    pub fn load_previous_entry(&mut self) {
        self.entry.clone_from(&self.previous_entry);
    }

    /// Closes the entry line and interprets what was typed.
    pub fn submit_entry(&mut self) -> Submission {
        self.entry_active = false;
        if self.entry.is_empty() {
            return Submission::Empty;
        }
        let text = std::mem::take(&mut self.entry);
        let submission = match parse_command(&text) {
            Some(command) => Submission::Command(command),
            None if text.starts_with('/') => Submission::Empty,
            None => Submission::Chat(text.clone()),
        };
        self.previous_entry = text;
        submission
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_commands_and_arguments() {
        assert_eq!(parse_command("/quit"), Some(Command::Quit));
        assert_eq!(
            parse_command("/echo hello  world "),
            Some(Command::Echo("hello  world".into()))
        );
        assert_eq!(parse_command("/host"), Some(Command::Host(None)));
        assert_eq!(parse_command("/host 4000"), Some(Command::Host(Some(4000))));
        assert_eq!(
            parse_command("/join 10.0.0.2:1234"),
            Some(Command::Join("10.0.0.2:1234".into()))
        );
        assert_eq!(parse_command("/fov 1.5"), Some(Command::Fov(1.5)));
        assert_eq!(
            parse_command("/view_accuracy 0.02"),
            Some(Command::ViewAccuracy(0.02))
        );
        assert_eq!(
            parse_command("/view_distance 12"),
            Some(Command::ViewDistance(12.0))
        );
        assert_eq!(parse_command("/help"), Some(Command::Help));
    }

    #[test]
    fn rejects_bad_arguments() {
        assert!(matches!(parse_command("/name"), Some(Command::Invalid { .. })));
        assert!(matches!(parse_command("/join  "), Some(Command::Invalid { .. })));
        assert!(matches!(parse_command("/fov wide"), Some(Command::Invalid { .. })));
        assert!(matches!(parse_command("/fov -1"), Some(Command::Invalid { .. })));
        assert!(matches!(parse_command("/view_accuracy 0"), Some(Command::Invalid { .. })));
        assert!(matches!(
            parse_command("/view_accuracy 0.000000001"),
            Some(Command::Invalid { .. })
        ));
        assert!(matches!(parse_command("/fov 1e-9"), Some(Command::Invalid { .. })));
        assert!(matches!(parse_command("/view_distance 0"), Some(Command::Invalid { .. })));
        assert!(matches!(parse_command("/host 99999"), Some(Command::Invalid { .. })));
        assert_eq!(parse_command("/dance"), Some(Command::Unknown("dance".into())));
    }

    #[test]
    fn non_commands() {
        assert_eq!(parse_command("hello"), None);
        assert_eq!(parse_command("/"), None);
        assert_eq!(parse_command(""), None);
    }

    #[test]
    fn scrollback_is_bounded_and_truncated() {
        let mut console = Console::new();
        for i in 0..CONSOLE_LINES + 3 {
            console.push(&format!("line {i}"));
        }
        let lines: Vec<&str> = console.lines().collect();
        assert_eq!(lines.len(), CONSOLE_LINES);
        assert_eq!(lines[0], format!("line {}", CONSOLE_LINES + 2));

        console.push(&"x".repeat(CONSOLE_WIDTH * 2));
        assert_eq!(console.lines().next().unwrap().len(), CONSOLE_WIDTH);

        console.clear();
        assert_eq!(console.lines().count(), 0);
    }

    #[test]
    fn entry_editing() {
        let mut console = Console::new();
        console.open();
        for c in "hi\u{7}é!".chars() {
            console.push_char(c);
        }
        assert_eq!(console.entry(), "hi!");
        console.pop_char();
        assert_eq!(console.entry(), "hi");
        for _ in 0..CONSOLE_WIDTH * 2 {
            console.push_char('a');
        }
        assert_eq!(console.entry().len(), CONSOLE_WIDTH);
        console.clear_entry();
        assert_eq!(console.entry(), "");
    }

    #[test]
    fn submit_recalls_previous_entry() {
        let mut console = Console::new();
        console.open();
        "hello".chars().for_each(|c| console.push_char(c));
        assert_eq!(console.submit_entry(), Submission::Chat("hello".into()));
        assert!(!console.entry_active());
        assert_eq!(console.entry(), "");

        console.open();
        console.load_previous_entry();
        assert_eq!(console.entry(), "hello");
        console.clear_entry();
        "/clear".chars().for_each(|c| console.push_char(c));
        assert_eq!(console.submit_entry(), Submission::Command(Command::Clear));
        assert_eq!(console.submit_entry(), Submission::Empty);
    }
}
