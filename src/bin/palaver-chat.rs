//! Interactive chat application for conversing with a local model.
//!
//! This binary provides a streaming REPL over an Ollama-style generate API.
//!
//! # Usage
//!
//! ```bash
//! # Use the first model the backend lists
//! palaver-chat
//!
//! # Specify a model and a system prompt
//! palaver-chat --model llama2 --system "You are terse."
//!
//! # Talk to another host (PALAVER_HOST works too)
//! palaver-chat --host http://gpu-box:11434/api/
//! ```
//!
//! # Commands
//!
//! While chatting, you can use slash commands:
//! - `/help` - Show available commands
//! - `/models` - List available models
//! - `/up <i>`, `/down <i>` - Rate a response; `/down` starts a correction
//! - `/draft <text>`, `/save`, `/cancel` - Edit the correction
//! - `/stats` - Show conversation statistics
//! - `/quit` - Exit the application

use arrrg::CommandLine;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;

use palaver::chat::{
    ChatArgs, ChatCommand, ChatConfig, PlainTextRenderer, Renderer, help_text, parse_command,
};
use palaver::config::DEFAULT_SYSTEM_PROMPT;
use palaver::{Conversation, FeedbackMark, FeedbackOutcome, Ollama, Role};

/// Main entry point for the palaver-chat application.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let (args, _) = ChatArgs::from_command_line_relaxed("palaver-chat [OPTIONS]");
    let config =
        ChatConfig::try_from(args)?.with_default_base_url(std::env::var("PALAVER_HOST").ok());
    let use_color = config.use_color;

    let client = Ollama::with_options(
        Some(config.session.base_url.clone()),
        Some(config.session.timeout),
    )?;
    let mut conversation = Conversation::new(client, config.session);
    conversation.subscribe(Box::new(PlainTextRenderer::with_color(use_color)));
    let mut renderer = PlainTextRenderer::with_color(use_color);
    let mut rl = DefaultEditor::new()?;

    if !conversation.config().has_model() {
        match conversation.backend().list_models().await {
            Ok(models) => match models.first_name() {
                Some(name) => conversation.set_model(name),
                None => renderer.print_error("The backend lists no models; use /model <name>."),
            },
            Err(err) => renderer.print_error(&format!("Failed to list models: {err}")),
        }
    }

    println!(
        "palaver (model: {}, host: {})",
        describe_model(&conversation.config().model),
        conversation.backend().base_url()
    );
    println!("Type /help for commands, /quit to exit\n");

    loop {
        let readline = rl.readline("You: ");

        match readline {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }

                let _ = rl.add_history_entry(line);

                if let Some(cmd) = parse_command(line) {
                    if cmd == ChatCommand::Quit {
                        println!("Goodbye!");
                        break;
                    }
                    run_command(&mut conversation, &mut renderer, cmd).await;
                    continue;
                }

                println!("{}:", describe_model(&conversation.config().model));
                match conversation.send(line).await {
                    Ok(outcome) if outcome.is_failed() => {
                        renderer.print_info(&format!(
                            "[response {} ended early; send again to retry]",
                            outcome.index
                        ));
                    }
                    Ok(_) => {}
                    Err(e) => renderer.print_error(&e.to_string()),
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!();
                continue;
            }
            Err(ReadlineError::Eof) => {
                println!("\nGoodbye!");
                break;
            }
            Err(err) => {
                renderer.print_error(&format!("Input error: {}", err));
                break;
            }
        }
    }

    Ok(())
}

async fn run_command(
    conversation: &mut Conversation<Ollama>,
    renderer: &mut PlainTextRenderer,
    cmd: ChatCommand,
) {
    match cmd {
        ChatCommand::Quit => {}
        ChatCommand::Help => {
            for line in help_text().lines() {
                println!("    {}", line);
            }
        }
        ChatCommand::Models => match conversation.backend().list_models().await {
            Ok(models) => {
                println!("    Models:");
                for name in models.names() {
                    let marker = if name == conversation.config().model {
                        "*"
                    } else {
                        " "
                    };
                    println!("     {marker} {name}");
                }
            }
            Err(err) => renderer.print_error(&format!("Failed to list models: {err}")),
        },
        ChatCommand::Model(model_name) => {
            renderer.print_info(&format!("Model changed to: {}", model_name));
            conversation.set_model(model_name);
        }
        ChatCommand::System(prompt) => {
            let prompt = prompt.unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.to_string());
            renderer.print_info(&format!("System prompt set to: {}", prompt));
            conversation.set_system_prompt(prompt);
        }
        ChatCommand::Temperature(value) => match conversation.set_temperature(value) {
            Ok(()) => renderer.print_info(&format!("temperature set to {:.2}", value)),
            Err(err) => renderer.print_error(&err.to_string()),
        },
        ChatCommand::History => print_history(conversation),
        ChatCommand::Context => match conversation.session().context() {
            Some(context) => println!("    Context ({} tokens): {:?}", context.len(), context.tokens()),
            None => println!("    Context: (none)"),
        },
        ChatCommand::Up(index) => match conversation.mark_feedback(index, FeedbackMark::Up) {
            Ok(_) => renderer.print_info(&format!("Marked response {index} as good.")),
            Err(err) => renderer.print_error(&err.to_string()),
        },
        ChatCommand::Down(index) => match conversation.mark_feedback(index, FeedbackMark::Down) {
            Ok(FeedbackOutcome::EditStarted { discarded }) => {
                if let Some(edit) = discarded {
                    renderer.print_info(&format!(
                        "Discarded unsaved correction of response {}.",
                        edit.target_index()
                    ));
                }
                renderer.print_info(&format!(
                    "Correcting response {index}. Use /draft <text>, then /save or /cancel."
                ));
            }
            Ok(FeedbackOutcome::Recorded) => {
                renderer.print_info(&format!("Still correcting response {index}."));
            }
            Err(err) => renderer.print_error(&err.to_string()),
        },
        ChatCommand::Draft(text) => match conversation.update_draft(text) {
            Ok(()) => renderer.print_info("Draft updated."),
            Err(err) => renderer.print_error(&err.to_string()),
        },
        ChatCommand::Show => match conversation.editor().edit_session() {
            Some(edit) => {
                println!("    Correcting response {}:", edit.target_index());
                println!("    {}", edit.draft_text());
            }
            None => renderer.print_info("No correction in progress."),
        },
        ChatCommand::Save => match conversation.save_edit() {
            Ok(Some(index)) => renderer.print_info(&format!("Response {index} updated.")),
            Ok(None) => renderer.print_info("No correction in progress."),
            Err(err) => renderer.print_error(&err.to_string()),
        },
        ChatCommand::Cancel => match conversation.cancel_edit() {
            Some(edit) => renderer.print_info(&format!(
                "Correction of response {} discarded.",
                edit.target_index()
            )),
            None => renderer.print_info("No correction in progress."),
        },
        ChatCommand::Stats => print_stats(conversation),
        ChatCommand::Invalid(message) => renderer.print_error(&message),
    }
}

fn print_history(conversation: &Conversation<Ollama>) {
    let session = conversation.session();
    if session.is_empty() {
        println!("    (no turns yet)");
        return;
    }
    for turn in session.turns() {
        let who = match turn.role() {
            Role::User => "you",
            Role::Server => "model",
        };
        println!(
            "    [{}] {} ({}, {}): {}",
            turn.index(),
            who,
            turn.timestamp().time(),
            turn.feedback(),
            turn.text()
        );
    }
}

fn print_stats(conversation: &Conversation<Ollama>) {
    let stats = conversation.stats();
    println!("    Conversation Statistics:");
    println!("      Model: {}", describe_model(&stats.model));
    println!("      Turns: {}", stats.turns);
    println!("      Temperature: {:.2}", stats.temperature);
    println!("      System prompt: {}", stats.system_prompt);
    println!("      Context tokens: {}", stats.context_len);
    println!(
        "      Requests: {} ({} failed, {} chunks skipped)",
        stats.requests, stats.failed_requests, stats.chunk_errors
    );
    println!("      Tokens generated: {}", stats.eval_tokens);
    if let Some(rate) = stats.last_tokens_per_second() {
        println!("      Last response: {rate:.1} tokens/s");
    }
}

fn describe_model(model: &str) -> &str {
    if model.is_empty() { "(none)" } else { model }
}
