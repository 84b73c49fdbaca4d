//! Prefix command parsing.
//!
//! `!sentry` and the `!tag` group are real commands; any other `!text` is a
//! tag shortcut whose name is the whole trimmed remainder.

use crate::domain::MessageId;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    Sentry { error_id: String },
    Tag(TagCommand),
    /// `!<name>`: post a tag without the `tag` keyword.
    Shortcut { name: String },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TagCommand {
    /// Bare `!tag`.
    Usage,
    Show {
        name: String,
        target: Option<MessageId>,
    },
    Create {
        name: String,
        content: String,
    },
    Edit {
        name: String,
        content: String,
    },
    Delete {
        name: String,
    },
    List,
    All,
}

/// Failures surfaced to the invoking user. `Display` is the reply text.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum CommandError {
    #[error("You're missing some arguments.")]
    MissingArguments,

    #[error("This command cannot be used in direct messages.")]
    NoPrivateMessage,

    #[error("You don't have the permissions to run this command. 😔 RIP")]
    MissingPermissions,

    #[error("Something went wrong. 👇\n* {0}")]
    Failed(String),
}

impl From<crate::Error> for CommandError {
    fn from(e: crate::Error) -> Self {
        CommandError::Failed(e.to_string())
    }
}

/// Parse a message into a command. `None` means the message is not addressed to the bot.
pub fn parse(prefix: &str, text: &str) -> Option<Result<Command, CommandError>> {
    let body = text.strip_prefix(prefix)?.trim();
    if body.is_empty() {
        return None;
    }

    let (name, rest) = split_word(body);
    let parsed = match name.to_lowercase().as_str() {
        "sentry" => parse_sentry(rest),
        "tag" => parse_tag(rest).map(Command::Tag),
        _ => Ok(Command::Shortcut {
            name: body.to_string(),
        }),
    };
    Some(parsed)
}

fn parse_sentry(rest: &str) -> Result<Command, CommandError> {
    let (error_id, _) = split_word(rest);
    if error_id.is_empty() {
        return Err(CommandError::MissingArguments);
    }
    Ok(Command::Sentry {
        error_id: error_id.to_string(),
    })
}

fn parse_tag(rest: &str) -> Result<TagCommand, CommandError> {
    let (sub, args) = split_word(rest);
    match sub.to_lowercase().as_str() {
        "" => Ok(TagCommand::Usage),
        "create" => {
            let (name, content) = name_and_content(args)?;
            Ok(TagCommand::Create { name, content })
        }
        "edit" => {
            let (name, content) = name_and_content(args)?;
            Ok(TagCommand::Edit { name, content })
        }
        "delete" => {
            let (name, _) = split_word(args);
            if name.is_empty() {
                return Err(CommandError::MissingArguments);
            }
            Ok(TagCommand::Delete {
                name: name.to_string(),
            })
        }
        "list" => Ok(TagCommand::List),
        "all" => Ok(TagCommand::All),
        _ => {
            let (target, _) = split_word(args);
            let target = if target.is_empty() {
                None
            } else {
                let id = target.parse::<u64>().map_err(|_| {
                    CommandError::Failed(format!("Converting to \"int\" failed for parameter \"target_message_id\": {target}"))
                })?;
                Some(MessageId(id))
            };
            Ok(TagCommand::Show {
                name: sub.to_string(),
                target,
            })
        }
    }
}

fn name_and_content(args: &str) -> Result<(String, String), CommandError> {
    let (name, content) = split_word(args);
    if name.is_empty() || content.is_empty() {
        return Err(CommandError::MissingArguments);
    }
    Ok((name.to_string(), content.to_string()))
}

/// Split off the first whitespace-delimited word; the remainder is trimmed.
fn split_word(s: &str) -> (&str, &str) {
    let s = s.trim();
    match s.split_once(char::is_whitespace) {
        Some((first, rest)) => (first, rest.trim()),
        None => (s, ""),
    }
}
