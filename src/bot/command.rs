//! Chat command parsing

use crate::telegram::BotCommand;

/// Commands the bot understands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Start,
    Help,
    LinkAccount,
    LinkStatus,
    Balance,
    WebApp,
    /// Force-link the sender; inert unless debug commands are enabled
    DebugLink,
    /// A command this bot doesn't know
    Unknown,
    /// A command explicitly addressed to a different bot (`/cmd@other_bot`)
    OtherBot,
}

struct CommandInfo {
    name: &'static str,
    command: Command,
    description: &'static str,
    debug_only: bool,
}

const COMMANDS: &[CommandInfo] = &[
    CommandInfo {
        name: "start",
        command: Command::Start,
        description: "Show what this bot does",
        debug_only: false,
    },
    CommandInfo {
        name: "help",
        command: Command::Help,
        description: "List commands",
        debug_only: false,
    },
    CommandInfo {
        name: "link_account",
        command: Command::LinkAccount,
        description: "Get a one-time link to connect your account",
        debug_only: false,
    },
    CommandInfo {
        name: "link_status",
        command: Command::LinkStatus,
        description: "Check whether your account is linked",
        debug_only: false,
    },
    CommandInfo {
        name: "balance",
        command: Command::Balance,
        description: "Show your points",
        debug_only: false,
    },
    CommandInfo {
        name: "webapp",
        command: Command::WebApp,
        description: "Open the web app",
        debug_only: false,
    },
    CommandInfo {
        name: "debug_link",
        command: Command::DebugLink,
        description: "Mark yourself as linked (debug builds)",
        debug_only: true,
    },
];

/// Parse a message as a bot command.
///
/// Returns `None` for text that is not a command. A trailing `@username`
/// must match `bot_username` (case-insensitively) or the command is treated
/// as addressed to another bot. Arguments after the command are ignored.
pub fn parse_command(text: &str, bot_username: Option<&str>) -> Option<Command> {
    let first = text.split_whitespace().next()?;
    let body = first.strip_prefix('/')?;
    if body.is_empty() {
        return None;
    }

    let (name, target) = match body.split_once('@') {
        Some((name, target)) => (name, Some(target)),
        None => (body, None),
    };

    if let (Some(target), Some(me)) = (target, bot_username) {
        if !target.eq_ignore_ascii_case(me) {
            return Some(Command::OtherBot);
        }
    }

    let name = name.to_ascii_lowercase();
    let command = match name.as_str() {
        "points" => Command::Balance,
        other => COMMANDS
            .iter()
            .find(|info| info.name == other)
            .map_or(Command::Unknown, |info| info.command),
    };
    Some(command)
}

/// Command menu to register with Telegram
pub fn command_menu(include_debug: bool) -> Vec<BotCommand> {
    COMMANDS
        .iter()
        .filter(|info| include_debug || !info.debug_only)
        .map(|info| BotCommand {
            command: info.name.to_string(),
            description: info.description.to_string(),
        })
        .collect()
}

/// Human-readable command list for `/help`
pub fn help_text(include_debug: bool) -> String {
    let mut text = String::from(
        "I award points for helpful answers in this group once your account is linked.\n\n",
    );
    for info in COMMANDS.iter().filter(|i| include_debug || !i.debug_only) {
        text.push_str(&format!("/{} - {}\n", info.name, info.description));
    }
    text
}
