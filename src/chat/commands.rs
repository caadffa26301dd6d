//! Slash command parsing for the chat application.
//!
//! Lines starting with `/` control the conversation instead of being sent to
//! the model.

/// A parsed chat command.
#[derive(Debug, Clone, PartialEq)]
pub enum ChatCommand {
    /// Display help information.
    Help,

    /// Exit the chat application.
    Quit,

    /// List the models the backend offers.
    Models,

    /// Change the model.
    Model(String),

    /// Set the system prompt.  `None` restores the default.
    System(Option<String>),

    /// Set the sampling temperature.
    Temperature(f64),

    /// Print every turn with its index and feedback.
    History,

    /// Print the rolling context.
    Context,

    /// Mark a server turn as good.
    Up(usize),

    /// Mark a server turn as bad and start correcting it.
    Down(usize),

    /// Replace the draft of the open correction.
    Draft(String),

    /// Show the open correction.
    Show,

    /// Commit the open correction.
    Save,

    /// Discard the open correction.
    Cancel,

    /// Display conversation statistics.
    Stats,

    /// Report a parsing error back to the caller.
    Invalid(String),
}

/// Parses user input for slash commands.
///
/// Returns `Some(ChatCommand)` if the input is a command, or `None` if it
/// should be sent as a user turn.
///
/// # Examples
///
/// ```
/// # use palaver::chat::{ChatCommand, parse_command};
/// assert_eq!(parse_command("/down 3"), Some(ChatCommand::Down(3)));
/// assert!(parse_command("/model llama2").is_some());
/// assert!(parse_command("What is 2+2?").is_none());
/// ```
pub fn parse_command(input: &str) -> Option<ChatCommand> {
    let input = input.trim();
    let rest = input.strip_prefix('/')?;

    let mut parts = rest.splitn(2, ' ');
    let command = parts.next()?.to_lowercase();
    let argument = parts.next().map(|s| s.trim()).filter(|s| !s.is_empty());

    let result = match command.as_str() {
        "help" | "?" => ChatCommand::Help,
        "quit" | "exit" | "q" => ChatCommand::Quit,
        "models" => ChatCommand::Models,
        "model" => match argument {
            Some(model) => ChatCommand::Model(model.to_string()),
            None => ChatCommand::Invalid("/model requires a model name".to_string()),
        },
        "system" => ChatCommand::System(argument.map(|s| s.to_string())),
        "temperature" => match argument {
            Some(arg) => match parse_f64_in_range(arg, 0.0, 2.0) {
                Ok(value) => ChatCommand::Temperature(value),
                Err(err) => ChatCommand::Invalid(format!("/temperature {err}")),
            },
            None => ChatCommand::Invalid("/temperature requires a value".to_string()),
        },
        "history" => ChatCommand::History,
        "context" => ChatCommand::Context,
        "up" => parse_index_command(argument, ChatCommand::Up, "/up"),
        "down" => parse_index_command(argument, ChatCommand::Down, "/down"),
        "draft" => match argument {
            Some(text) => ChatCommand::Draft(text.to_string()),
            None => ChatCommand::Invalid("/draft requires replacement text".to_string()),
        },
        "show" => ChatCommand::Show,
        "save" => ChatCommand::Save,
        "cancel" => ChatCommand::Cancel,
        "stats" | "status" => ChatCommand::Stats,
        _ => ChatCommand::Invalid(format!("Unknown command: /{}", command)),
    };

    Some(result)
}

fn parse_index_command<F>(argument: Option<&str>, constructor: F, name: &str) -> ChatCommand
where
    F: Fn(usize) -> ChatCommand,
{
    match argument {
        Some(arg) => match arg.parse::<usize>() {
            Ok(value) => constructor(value),
            Err(_) => ChatCommand::Invalid(format!("{} expects a turn index", name)),
        },
        None => ChatCommand::Invalid(format!("{} requires a turn index", name)),
    }
}

pub(super) fn parse_f64_in_range(value: &str, min: f64, max: f64) -> Result<f64, String> {
    let parsed: f64 = value
        .parse()
        .map_err(|_| format!("expects a value between {min} and {max}"))?;
    if parsed.is_finite() && parsed >= min && parsed <= max {
        Ok(parsed)
    } else {
        Err(format!("expects a value between {min} and {max}"))
    }
}

/// Returns help text describing available commands.
pub fn help_text() -> &'static str {
    r#"Available commands:
  /models                List models offered by the backend
  /model <name>          Change the model (e.g., /model llama2)
  /system [prompt]       Set system prompt (no argument restores the default)
  /temperature <v>       Set temperature 0.0-2.0
  /history               Show all turns with their indices
  /context               Show the rolling context
  /up <i>                Mark response <i> as good
  /down <i>              Mark response <i> as bad and start correcting it
  /draft <text>          Replace the correction draft
  /show                  Show the correction in progress
  /save                  Commit the correction
  /cancel                Discard the correction
  /stats                 Show conversation statistics
  /help                  Show this help message
  /quit                  Exit the chat"#
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_quit_commands() {
        assert_eq!(parse_command("/quit"), Some(ChatCommand::Quit));
        assert_eq!(parse_command("/exit"), Some(ChatCommand::Quit));
        assert_eq!(parse_command("/q"), Some(ChatCommand::Quit));
        assert_eq!(parse_command("  /QUIT  "), Some(ChatCommand::Quit));
    }

    #[test]
    fn parse_model() {
        assert_eq!(
            parse_command("/model   llama2:13b  "),
            Some(ChatCommand::Model("llama2:13b".to_string()))
        );
        assert_eq!(
            parse_command("/model"),
            Some(ChatCommand::Invalid(
                "/model requires a model name".to_string()
            ))
        );
        assert_eq!(parse_command("/models"), Some(ChatCommand::Models));
    }

    #[test]
    fn parse_system() {
        assert_eq!(
            parse_command("/system You are terse."),
            Some(ChatCommand::System(Some("You are terse.".to_string())))
        );
        assert_eq!(parse_command("/system"), Some(ChatCommand::System(None)));
    }

    #[test]
    fn parse_temperature() {
        assert_eq!(
            parse_command("/temperature 0.5"),
            Some(ChatCommand::Temperature(0.5))
        );
        assert!(matches!(
            parse_command("/temperature 7"),
            Some(ChatCommand::Invalid(msg)) if msg.contains("between")
        ));
        assert!(matches!(
            parse_command("/temperature"),
            Some(ChatCommand::Invalid(msg)) if msg.contains("requires")
        ));
    }

    #[test]
    fn parse_feedback_commands() {
        assert_eq!(parse_command("/up 1"), Some(ChatCommand::Up(1)));
        assert_eq!(parse_command("/down 5"), Some(ChatCommand::Down(5)));
        assert!(matches!(
            parse_command("/down last"),
            Some(ChatCommand::Invalid(msg)) if msg.contains("turn index")
        ));
        assert!(matches!(
            parse_command("/up"),
            Some(ChatCommand::Invalid(msg)) if msg.contains("requires")
        ));
    }

    #[test]
    fn parse_edit_commands() {
        assert_eq!(
            parse_command("/draft The answer is 4."),
            Some(ChatCommand::Draft("The answer is 4.".to_string()))
        );
        assert_eq!(parse_command("/show"), Some(ChatCommand::Show));
        assert_eq!(parse_command("/save"), Some(ChatCommand::Save));
        assert_eq!(parse_command("/cancel"), Some(ChatCommand::Cancel));
    }

    #[test]
    fn parse_inspection_commands() {
        assert_eq!(parse_command("/history"), Some(ChatCommand::History));
        assert_eq!(parse_command("/context"), Some(ChatCommand::Context));
        assert_eq!(parse_command("/stats"), Some(ChatCommand::Stats));
    }

    #[test]
    fn unknown_command() {
        assert_eq!(
            parse_command("/frobnicate"),
            Some(ChatCommand::Invalid("Unknown command: /frobnicate".to_string()))
        );
    }

    #[test]
    fn non_commands() {
        assert_eq!(parse_command("What is 2+2?"), None);
        assert_eq!(parse_command(""), None);
        assert_eq!(parse_command("  "), None);
    }

    #[test]
    fn help_text_lists_commands() {
        let help = help_text();
        for command in ["/quit", "/models", "/down", "/draft", "/save", "/cancel"] {
            assert!(help.contains(command), "missing {command}");
        }
    }
}
