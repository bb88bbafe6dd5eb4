//! UI utilities for the support chat

use colored::*;
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    terminal::{disable_raw_mode, enable_raw_mode, size},
};
use std::io::{self, IsTerminal, Write};

use ampdesk_core::{ChatReply, Citation, IndexStats, Result};

const PROMPT: &str = "ampdesk>";

/// Returned by [`read_input_with_history`] on Ctrl+C, Ctrl+D or end of input
pub const EXIT_COMMAND: &str = "exit";

/// Display startup banner
pub fn display_banner(documents_count: usize) {
    let terminal_width = size().map(|(w, _)| w as usize).unwrap_or(80);
    let banner_width = std::cmp::min(60, terminal_width.saturating_sub(4)).max(40);
    let inner = banner_width - 2;

    println!();
    println!("{}", format!("┌{}┐", "─".repeat(inner)).blue());

    let lines = [
        "UA2-125 Support Assistant".to_string(),
        String::new(),
        "Answers from the installation and support docs".to_string(),
        format!("{} passages indexed", documents_count),
        String::new(),
        format!("v{}", env!("CARGO_PKG_VERSION")),
    ];
    for line in &lines {
        let padding = inner.saturating_sub(line.chars().count() + 2);
        println!("{}", format!("│  {}{}│", line, " ".repeat(padding)).blue());
    }

    println!("{}", format!("└{}┘", "─".repeat(inner)).blue());
    println!();
    println!("{}", "Tip: describe your setup or problem, or type 'help'".dimmed());
    println!();
}

/// Read one line, with ↑/↓ recall of earlier questions on a terminal
pub fn read_input_with_history(history: &mut Vec<String>) -> Result<String> {
    if !io::stdin().is_terminal() {
        let mut input = String::new();
        if io::stdin().read_line(&mut input)? == 0 {
            return Ok(EXIT_COMMAND.to_string());
        }
        let input = input.trim().to_string();
        if !input.is_empty() {
            history.push(input.clone());
        }
        return Ok(input);
    }

    print!("{} ", PROMPT.green().bold());
    io::stdout().flush()?;

    enable_raw_mode()?;
    let result = read_raw_line(history);
    disable_raw_mode()?;
    println!();

    let input = result?;
    if !input.is_empty() {
        history.push(input.clone());
    }
    Ok(input)
}

fn redraw(input: &str) -> io::Result<()> {
    print!("\r\x1b[2K{} {}", PROMPT.green().bold(), input);
    io::stdout().flush()
}

/// Ctrl+C and Ctrl+D end the session instead of being typed
pub fn is_interrupt(key: &KeyEvent) -> bool {
    key.modifiers.contains(KeyModifiers::CONTROL)
        && matches!(key.code, KeyCode::Char('c') | KeyCode::Char('d'))
}

fn read_raw_line(history: &[String]) -> Result<String> {
    let mut input = String::new();
    let mut history_index: Option<usize> = None;

    loop {
        let Event::Key(key_event) = event::read()? else {
            continue;
        };
        if key_event.kind != KeyEventKind::Press {
            continue;
        }
        if is_interrupt(&key_event) {
            return Ok(EXIT_COMMAND.to_string());
        }

        match key_event.code {
            KeyCode::Enter => return Ok(input.trim().to_string()),
            KeyCode::Esc => return Ok(String::new()),
            KeyCode::Char(c) => {
                input.push(c);
                redraw(&input)?;
            }
            KeyCode::Backspace => {
                input.pop();
                redraw(&input)?;
            }
            KeyCode::Up if !history.is_empty() => {
                let idx = match history_index {
                    None => history.len() - 1,
                    Some(idx) => idx.saturating_sub(1),
                };
                history_index = Some(idx);
                input = history[idx].clone();
                redraw(&input)?;
            }
            KeyCode::Down => {
                if let Some(idx) = history_index {
                    if idx + 1 < history.len() {
                        history_index = Some(idx + 1);
                        input = history[idx + 1].clone();
                    } else {
                        history_index = None;
                        input.clear();
                    }
                    redraw(&input)?;
                }
            }
            _ => {}
        }
    }
}

/// Display help message
pub fn print_help() {
    println!("{}", "Available commands:".bold());
    println!("  {} - Ask about installation, wiring, setup or a problem", "question".green());
    println!("  {} - Show knowledge base statistics", "stats".green());
    println!("  {} - Start a new conversation", "reset".green());
    println!("  {} - Show this help message", "help".green());
    println!("  {} - Exit the application", "exit/quit".green());
    println!();
    println!("{}", "Examples:".bold());
    println!("  How do I wire the amplifier for mono bridging?");
    println!("  I'm not getting any audio from the HDMI ARC input");
    println!("  What happens when both HDMI and analog inputs are active?");
}

/// One numbered citation line, without styling
pub fn format_citation(rank: usize, citation: &Citation) -> String {
    let excerpt: String = citation.content_excerpt.split_whitespace().collect::<Vec<_>>().join(" ");
    format!(
        "[{}] {} (similarity {:.3})\n    {}",
        rank, citation.source, citation.similarity, excerpt
    )
}

/// Print an answer followed by its sources
pub fn print_reply(reply: &ChatReply) {
    println!();
    println!("{}", reply.answer);
    println!();

    if reply.citations.is_empty() {
        println!("{}", "No matching passages in the knowledge base.".dimmed());
        return;
    }

    println!("{}", "Sources:".bold());
    for (i, citation) in reply.citations.iter().enumerate() {
        println!("{}", format_citation(i + 1, citation).dimmed());
    }
    if reply.is_low_confidence() {
        println!(
            "{} {}",
            "⚠️".yellow(),
            "The sources matched this question weakly; verify against the manual.".yellow()
        );
    }
}

pub fn print_stats(stats: &IndexStats) {
    println!("{}", "Knowledge base:".bold());
    println!("  {:<12} {}", "entries", stats.total_count);
    println!("  {:<12} {}", "active", stats.active_count);
    println!("  {:<12} {}", "categories", stats.category_count);
    println!("  {:<12} {}", "sources", stats.source_count);
    println!("  {:<12} {}", "model", stats.model_name);
    println!("  {:<12} {}", "dimension", stats.dimension);
}

/// Ask a yes/no question; anything but y/yes is a no
pub fn confirm(question: &str) -> Result<bool> {
    print!("{} {} [y/N]: ", "❓".cyan(), question);
    io::stdout().flush()?;

    let mut response = String::new();
    io::stdin().read_line(&mut response)?;
    let response = response.trim().to_lowercase();

    Ok(response == "y" || response == "yes")
}
