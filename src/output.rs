use console::style;

use crate::app::TurnOutcome;
use crate::chat::{ConversationTurn, Role};

pub struct OutputHandler;

impl OutputHandler {
    pub fn new() -> Self {
        Self
    }

    pub fn print_assistant(&self, content: &str) {
        println!("{} {}", style("CodeMaster:").green().bold(), content);
    }

    pub fn print_error(&self, content: &str) {
        println!("{} {}", style("Error:").red().bold(), content);
    }

    pub fn print_system(&self, content: &str) {
        println!("{}", style(content).yellow().dim());
    }

    pub fn print_banner(&self, today: &str, providers: &[String]) {
        let status = if providers.is_empty() {
            style("No AI providers configured".to_string()).red().to_string()
        } else {
            format!("Connected: {}", providers.join(", "))
        };
        println!("{}", style(format!("Today is {today}")).magenta().bold());
        println!("{}", style(status).dim());
        println!(
            "{}",
            style("Type 'help' for commands, 'exit' to quit").dim()
        );
    }

    pub fn print_help(&self) {
        println!("{}", style("Commands:").yellow().bold());
        println!("  {}      show this help", style("help").cyan());
        println!("  {}    provider connection status", style("status").cyan());
        println!("  {}   recent conversation turns", style("history").cyan());
        println!("  {}      leave the session", style("exit").cyan());
        println!();
        println!("Anything else is sent to the AI. When a reply contains code,");
        println!("tell me where to put it, e.g. 'save it to my projects folder,");
        println!("call it calc.py'.");
    }

    pub fn print_history(&self, history: &[ConversationTurn]) {
        if history.is_empty() {
            self.print_system("No conversation history yet.");
            return;
        }
        for (i, turn) in history.iter().rev().take(10).rev().enumerate() {
            let label = match turn.role {
                Role::User => style("You:").cyan().bold(),
                Role::Assistant => style("CodeMaster:").green().bold(),
            };
            let preview: String = turn.content.chars().take(100).collect();
            let ellipsis = if turn.content.chars().count() > 100 { "…" } else { "" };
            println!("{} {label} {preview}{ellipsis}", style(format!("[{}]", i + 1)).dim());
        }
    }

    pub fn print_outcome(&self, outcome: &TurnOutcome) {
        match outcome {
            TurnOutcome::Reply { text, staged } => {
                self.print_assistant(text);
                if *staged > 0 {
                    self.print_system(
                        "I generated some code for you. Tell me where to put it \
                         (e.g. 'save to storage', 'put it in my projects folder', \
                         'create file calculator.py').",
                    );
                }
            }
            TurnOutcome::Error(reason) => self.print_error(reason),
            TurnOutcome::Saved { directive, report } => {
                if !report.saved.is_empty() {
                    println!(
                        "{}",
                        style(format!(
                            "Saved {} file(s) to {}:",
                            report.saved.len(),
                            directive.directory
                        ))
                        .green()
                        .bold()
                    );
                    for file in &report.saved {
                        println!("  • {}: {}", file.language.to_uppercase(), file.path.display());
                    }
                }
                for (path, reason) in &report.failed {
                    self.print_error(&format!("could not write {}: {reason}", path.display()));
                }
            }
            TurnOutcome::NothingToSave => {
                self.print_system("No code to save. Generate some code first!");
            }
        }
    }
}

impl Default for OutputHandler {
    fn default() -> Self {
        Self::new()
    }
}
