//! Line protocol vocabulary.
//!
//! Parsing of inbound command lines and the text of every line the server
//! sends. Pure: nothing here touches shared state.
//!
//! # Grammar
//!
//! A command line starts with [`COMMAND_PREFIX`], followed by a verb
//! (case-insensitive) and an optional whitespace-separated argument
//! remainder. Anything else is not a command.

use std::fmt;

use crate::state::RoomState;

/// Character that marks a line as a command.
pub const COMMAND_PREFIX: char = '/';

/// Verb that ends a session. Handled by the connection, not the dispatcher.
pub const EXIT_COMMAND: &str = "/exit";

/// Default longest command line, in bytes, excluding the newline.
pub const MAX_LINE_LENGTH: usize = 1024;

/// Human-readable list of supported commands.
pub const COMMAND_LIST: &str = "/subscribe, /unsubscribe, /getwindow, /resize <width> <height>, \
                                /rename <name>, /getswap, /help, /exit";

/// Whether `line` asks to end the session.
pub fn is_exit(line: &str) -> bool {
    line.trim().eq_ignore_ascii_case(EXIT_COMMAND)
}

/// A parsed command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command<'a> {
    /// Line without the command prefix
    Invalid,
    /// `/subscribe`
    Subscribe,
    /// `/unsubscribe`
    Unsubscribe,
    /// `/getwindow`
    GetWindow,
    /// `/rename <name>`, with the raw (possibly blank) remainder
    Rename(&'a str),
    /// `/resize <width> <height>`, with the raw remainder
    Resize(&'a str),
    /// `/getswap`
    GetSwap,
    /// `/help`
    Help,
    /// Prefixed line with an unrecognized verb (lowercased)
    Unknown(String),
}

impl<'a> Command<'a> {
    /// Parse one inbound line.
    pub fn parse(line: &'a str) -> Self {
        let line = line.trim();
        if !line.starts_with(COMMAND_PREFIX) {
            return Self::Invalid;
        }

        let (verb, args) = match line.split_once(char::is_whitespace) {
            Some((verb, args)) => (verb, args.trim()),
            None => (line, ""),
        };

        match verb.to_lowercase().as_str() {
            "/subscribe" => Self::Subscribe,
            "/unsubscribe" => Self::Unsubscribe,
            "/getwindow" => Self::GetWindow,
            "/rename" => Self::Rename(args),
            "/resize" => Self::Resize(args),
            "/getswap" => Self::GetSwap,
            "/help" => Self::Help,
            other => Self::Unknown(other.to_string()),
        }
    }
}

/// Parse `<width> <height>` resize arguments.
pub fn parse_dimensions(args: &str) -> Option<(u32, u32)> {
    let mut parts = args.split_whitespace();
    let width = parts.next()?.parse().ok()?;
    let height = parts.next()?.parse().ok()?;
    if parts.next().is_some() {
        return None;
    }
    Some((width, height))
}

/// Reply to one dispatched command. Always a single line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// Input was not a command
    Invalid,
    /// Subscription recorded (or already present)
    Subscribed,
    /// Subscription removed (or already absent)
    Unsubscribed,
    /// Current room state
    Window(RoomState),
    /// Title changed
    Renamed(String),
    /// Rename rejected, nothing mutated
    BlankName,
    /// Geometry changed
    Resized {
        /// New width
        width: u32,
        /// New height
        height: u32,
    },
    /// Resize arguments missing or malformed, nothing mutated
    ResizeUsage,
    /// Report from the host metric source
    Swap(String),
    /// Metric source failed
    SwapUnavailable,
    /// Command list
    Help,
    /// Unrecognized verb
    Unknown(String),
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Invalid => f.write_str("Invalid command. Type /help"),
            Self::Subscribed => f.write_str("Subscribed to window changes"),
            Self::Unsubscribed => f.write_str("Unsubscribed from window changes"),
            Self::Window(state) => write!(f, "Window size: {state}"),
            Self::Renamed(name) => write!(f, "Success: title changed to '{name}'"),
            Self::BlankName => f.write_str("Error: name must not be empty"),
            Self::Resized { width, height } => {
                write!(f, "Success: window resized to {width}x{height}")
            },
            Self::ResizeUsage => f.write_str("Error: usage /resize <width> <height>"),
            Self::Swap(report) => f.write_str(report),
            Self::SwapUnavailable => f.write_str("Error: swap metrics unavailable"),
            Self::Help => write!(f, "Commands: {COMMAND_LIST}"),
            Self::Unknown(verb) => write!(f, "Unknown command: {verb}"),
        }
    }
}

/// Unsolicited lines the server sends outside command dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    /// First line on an admitted connection
    Greeting,
    /// Last line after `/exit`
    Farewell,
    /// Only line on a refused connection
    Overloaded,
    /// Debounced broadcast of the room state
    StateChanged(RoomState),
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Greeting => write!(f, "Connected. Commands: {COMMAND_LIST}"),
            Self::Farewell => f.write_str("Goodbye!"),
            Self::Overloaded => f.write_str("Server full. Try again later."),
            Self::StateChanged(state) => write!(f, "Window changed: {state}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_known_verbs() {
        assert_eq!(Command::parse("/subscribe"), Command::Subscribe);
        assert_eq!(Command::parse("/UNSUBSCRIBE"), Command::Unsubscribe);
        assert_eq!(Command::parse("  /GetWindow  "), Command::GetWindow);
        assert_eq!(Command::parse("/getswap"), Command::GetSwap);
        assert_eq!(Command::parse("/help"), Command::Help);
    }

    #[test]
    fn parse_rename_keeps_inner_whitespace() {
        assert_eq!(Command::parse("/rename   Main  Hall "), Command::Rename("Main  Hall"));
        assert_eq!(Command::parse("/rename"), Command::Rename(""));
        assert_eq!(Command::parse("/rename \t "), Command::Rename(""));
    }

    #[test]
    fn parse_without_prefix_is_invalid() {
        assert_eq!(Command::parse("hello"), Command::Invalid);
        assert_eq!(Command::parse(""), Command::Invalid);
        assert_eq!(Command::parse("subscribe /now"), Command::Invalid);
    }

    #[test]
    fn parse_unknown_verb_is_lowercased() {
        assert_eq!(Command::parse("/Frobnicate now"), Command::Unknown("/frobnicate".into()));
        assert_eq!(Command::parse("/"), Command::Unknown("/".into()));
    }

    #[test]
    fn exit_is_case_insensitive_exact_match() {
        assert!(is_exit("/exit"));
        assert!(is_exit("  /EXIT\r"));
        assert!(!is_exit("/exit now"));
        assert!(!is_exit("exit"));
    }

    #[test]
    fn dimensions() {
        assert_eq!(parse_dimensions("800 600"), Some((800, 600)));
        assert_eq!(parse_dimensions(" 1\t2 "), Some((1, 2)));
        assert_eq!(parse_dimensions("800"), None);
        assert_eq!(parse_dimensions("800 600 1"), None);
        assert_eq!(parse_dimensions("-1 600"), None);
        assert_eq!(parse_dimensions("wide tall"), None);
    }

    #[test]
    fn reply_text() {
        assert_eq!(
            Reply::Window(RoomState::new(400, 200, "Lobby")).to_string(),
            "Window size: 400x200, title: 'Lobby'"
        );
        assert_eq!(Reply::Renamed("Lobby".into()).to_string(), "Success: title changed to 'Lobby'");
        assert_eq!(Reply::Unknown("/frobnicate".into()).to_string(), "Unknown command: /frobnicate");
        assert_eq!(
            Reply::Help.to_string(),
            "Commands: /subscribe, /unsubscribe, /getwindow, /resize <width> <height>, \
             /rename <name>, /getswap, /help, /exit"
        );
    }

    #[test]
    fn notice_text() {
        assert_eq!(Notice::Farewell.to_string(), "Goodbye!");
        assert_eq!(Notice::Overloaded.to_string(), "Server full. Try again later.");
        assert_eq!(
            Notice::StateChanged(RoomState::new(1, 2, "x")).to_string(),
            "Window changed: 1x2, title: 'x'"
        );
    }
}
