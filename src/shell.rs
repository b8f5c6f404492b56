//! Interactive shell: line parsing and terminal rendering.
//!
//! A line that does not start with `/` is typed text, the whole line
//! replacing the search input as a keystroke would. An empty line is
//! Enter. Everything else is a slash command:
//!
//! | Command | Effect |
//! |---------|--------|
//! | `/search <text>` | Set the query and search immediately |
//! | `/pick <n>` | Pick suggestion `n` (adds it and searches) |
//! | `/tab <category>` | Switch category |
//! | `/country <code>` | Country filter for interests (`ALL` for none) |
//! | `/education major\|school` | Education sub-type |
//! | `/limit <n>` | Result limit for committed searches |
//! | `/add <n>` / `/add all` | Add result row `n`, or every row |
//! | `/remove <id>` | Remove an entry from the selection |
//! | `/clear` | Empty the selection |
//! | `/results`, `/selection` | Show the results table or the selection |
//! | `/export csv\|json [path]` | Export the selection |
//! | `/copy` | Copy the selection as JSON |
//! | `/close`, `/blur` | Close the dropdown now, or after the blur delay |
//! | `/help`, `/quit` | |

use anyhow::{bail, Context, Result};
use std::io::Write;
use std::path::PathBuf;
use tokio::io::AsyncBufReadExt;
use tokio::sync::mpsc::UnboundedSender;

use targeting_finder_core::export::ExportFormat;
use targeting_finder_core::models::{country_flag, Category, EducationKind, TaxonomyItem};
use targeting_finder_core::selection::{display_audience, SelectionSet};
use targeting_finder_core::suggest::SuggestionBox;

use crate::session::SessionEvent;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellCommand {
    Type(String),
    Enter,
    Search(String),
    /// Zero-based suggestion index.
    Pick(usize),
    Tab(Category),
    Country(String),
    Education(EducationKind),
    Limit(i64),
    /// Zero-based result row.
    Add(usize),
    AddAll,
    Remove(String),
    Clear,
    Results,
    Selection,
    Export(ExportFormat, Option<PathBuf>),
    Copy,
    Blur,
    Close,
    Help,
    Quit,
}

pub const HELP: &str = "\
Type text to get suggestions, press Enter to search.
  /search <text>           search immediately
  /pick <n>                pick suggestion n
  /tab <category>          interests, behaviors, jobtitles, employers, education, industry
  /country <code>          country filter for interests (ALL for none)
  /education major|school  education sub-type
  /limit <n>               result limit (1-500)
  /add <n> | /add all      add result rows to the selection
  /remove <id>             remove from the selection
  /clear                   empty the selection
  /results | /selection    show results or selection
  /export csv|json [path]  export the selection
  /copy                    copy the selection as JSON
  /close | /blur           close suggestions
  /quit";

/// Parse one line of shell input.
pub fn parse_line(line: &str) -> Result<ShellCommand> {
    let line = line.trim_end_matches(['\r', '\n']);
    if line.trim().is_empty() {
        return Ok(ShellCommand::Enter);
    }
    let Some(command) = line.trim_start().strip_prefix('/') else {
        return Ok(ShellCommand::Type(line.to_string()));
    };

    let (name, rest) = match command.split_once(char::is_whitespace) {
        Some((name, rest)) => (name, rest.trim()),
        None => (command, ""),
    };

    let cmd = match name.to_ascii_lowercase().as_str() {
        "search" | "s" => {
            if rest.is_empty() {
                ShellCommand::Enter
            } else {
                ShellCommand::Search(rest.to_string())
            }
        }
        "pick" | "p" => ShellCommand::Pick(parse_index(rest)?),
        "tab" | "category" => ShellCommand::Tab(rest.parse()?),
        "country" => ShellCommand::Country(rest.to_string()),
        "education" | "edu" => ShellCommand::Education(rest.parse()?),
        "limit" => ShellCommand::Limit(
            rest.parse()
                .with_context(|| format!("limit must be a number, got '{}'", rest))?,
        ),
        "add" | "a" if rest.eq_ignore_ascii_case("all") => ShellCommand::AddAll,
        "add" | "a" => ShellCommand::Add(parse_index(rest)?),
        "remove" | "rm" => {
            if rest.is_empty() {
                bail!("usage: /remove <id>");
            }
            ShellCommand::Remove(rest.to_string())
        }
        "clear" => ShellCommand::Clear,
        "results" | "r" => ShellCommand::Results,
        "selection" | "sel" | "list" => ShellCommand::Selection,
        "export" => {
            let mut parts = rest.splitn(2, char::is_whitespace);
            let format = parts.next().unwrap_or_default();
            if format.is_empty() {
                bail!("usage: /export csv|json [path]");
            }
            let path = parts
                .next()
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .map(PathBuf::from);
            ShellCommand::Export(format.parse()?, path)
        }
        "copy" => ShellCommand::Copy,
        "blur" => ShellCommand::Blur,
        "close" => ShellCommand::Close,
        "help" | "h" | "?" => ShellCommand::Help,
        "quit" | "exit" | "q" => ShellCommand::Quit,
        other => bail!("Unknown command: /{}. Type /help for a list.", other),
    };
    Ok(cmd)
}

/// Parse a one-based row number into a zero-based index.
fn parse_index(raw: &str) -> Result<usize> {
    let n: usize = raw
        .parse()
        .with_context(|| format!("expected a row number, got '{}'", raw))?;
    if n == 0 {
        bail!("row numbers start at 1");
    }
    Ok(n - 1)
}

/// Read stdin line by line and post each parsed command into the session.
///
/// A prompt is printed only when stdin is a terminal. End of input posts
/// [`SessionEvent::InputClosed`] so work already in flight can finish.
pub async fn read_commands(tx: UnboundedSender<SessionEvent>) -> Result<()> {
    let interactive = atty::is(atty::Stream::Stdin);
    let mut lines = tokio::io::BufReader::new(tokio::io::stdin()).lines();

    loop {
        if interactive {
            print!("tfind> ");
            std::io::stdout().flush()?;
        }
        let Some(line) = lines.next_line().await? else {
            let _ = tx.send(SessionEvent::InputClosed);
            return Ok(());
        };
        let event = match parse_line(&line) {
            Ok(command) => SessionEvent::Command(command),
            Err(e) => SessionEvent::Invalid(e.to_string()),
        };
        // Stop reading after /quit so no stdin read is left pending.
        let quit = matches!(event, SessionEvent::Command(ShellCommand::Quit));
        if tx.send(event).is_err() || quit {
            return Ok(());
        }
    }
}

// ============ Rendering ============

fn item_detail(item: &TaxonomyItem) -> String {
    if let Some(path) = item.path.as_ref().filter(|p| !p.is_empty()) {
        path.join(" > ")
    } else if let Some(topic) = &item.topic {
        topic.clone()
    } else if let Some(description) = &item.description {
        description.clone()
    } else {
        String::new()
    }
}

/// Dropdown lines for `suggest`; nothing when it is closed.
pub fn suggestion_lines(suggest: &SuggestionBox) -> Vec<String> {
    if !suggest.is_open() {
        return Vec::new();
    }
    suggest
        .items()
        .iter()
        .enumerate()
        .map(|(i, item)| {
            let detail = item_detail(item);
            if detail.is_empty() {
                format!("  {:>2}. {}  {}", i + 1, item.name, display_audience(item))
            } else {
                format!(
                    "  {:>2}. {}  {}  ({})",
                    i + 1,
                    item.name,
                    display_audience(item),
                    detail
                )
            }
        })
        .collect()
}

pub fn render_suggestions(suggest: &SuggestionBox) {
    for line in suggestion_lines(suggest) {
        println!("{}", line);
    }
}

pub fn render_results(results: &[TaxonomyItem], selection: &SelectionSet) {
    if results.is_empty() {
        println!("No results.");
        return;
    }
    let width = results.iter().map(|r| r.name.len()).max().unwrap_or(0).min(48);
    for (i, item) in results.iter().enumerate() {
        let mark = if selection.contains(&item.id) { "*" } else { " " };
        println!(
            "{} {:>3}. {:<width$}  {:>14}  {}",
            mark,
            i + 1,
            item.name,
            display_audience(item),
            item.id,
            width = width
        );
    }
    println!("{} results ({} selected)", results.len(), selection.len());
}

pub fn render_selection(selection: &SelectionSet) {
    if selection.is_empty() {
        println!("Selection is empty.");
        return;
    }
    for item in selection.iter() {
        println!("  {}  {}  {}", item.id, item.name, display_audience(item));
    }
    println!("{} selected", selection.len());
}

pub fn describe_country(code: &str) -> String {
    format!("{} {}", country_flag(code), code).trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use targeting_finder_core::models::ProxyResponse;

    #[test]
    fn test_plain_text_is_typing() {
        assert_eq!(
            parse_line("coffee shop\n").unwrap(),
            ShellCommand::Type("coffee shop".to_string())
        );
        assert_eq!(parse_line("   ").unwrap(), ShellCommand::Enter);
    }

    #[test]
    fn test_commands() {
        assert_eq!(parse_line("/pick 2").unwrap(), ShellCommand::Pick(1));
        assert_eq!(
            parse_line("/tab industry").unwrap(),
            ShellCommand::Tab(Category::Industry)
        );
        assert_eq!(
            parse_line("/education school").unwrap(),
            ShellCommand::Education(EducationKind::School)
        );
        assert_eq!(parse_line("/limit 600").unwrap(), ShellCommand::Limit(600));
        assert_eq!(parse_line("/add all").unwrap(), ShellCommand::AddAll);
        assert_eq!(parse_line("/add 3").unwrap(), ShellCommand::Add(2));
        assert_eq!(
            parse_line("/search  running shoes ").unwrap(),
            ShellCommand::Search("running shoes".to_string())
        );
        assert_eq!(
            parse_line("/export csv out/aud.csv").unwrap(),
            ShellCommand::Export(ExportFormat::Csv, Some(PathBuf::from("out/aud.csv")))
        );
        assert_eq!(
            parse_line("/export json").unwrap(),
            ShellCommand::Export(ExportFormat::Json, None)
        );
        assert_eq!(parse_line("/quit").unwrap(), ShellCommand::Quit);
    }

    #[test]
    fn test_bad_commands() {
        assert!(parse_line("/pick 0").is_err());
        assert!(parse_line("/pick x").is_err());
        assert!(parse_line("/tab pets").is_err());
        assert!(parse_line("/limit many").is_err());
        assert!(parse_line("/export xml").is_err());
        assert!(parse_line("/remove").is_err());
        assert!(parse_line("/frobnicate").is_err());
    }

    #[test]
    fn test_item_detail() {
        let mut item = TaxonomyItem::new("1", "Coffee", None);
        assert_eq!(item_detail(&item), "");
        item.topic = Some("Food".to_string());
        assert_eq!(item_detail(&item), "Food");
        item.path = Some(vec!["Interests".to_string(), "Coffee".to_string()]);
        assert_eq!(item_detail(&item), "Interests > Coffee");
    }

    #[test]
    fn test_suggestion_lines() {
        let mut sb = SuggestionBox::new();
        assert!(suggestion_lines(&sb).is_empty());

        let ticket = sb.input("cof").unwrap();
        let fetch = sb.debounce_elapsed(ticket).unwrap();
        let mut coffee = TaxonomyItem::new("1", "Coffee", Some(1200));
        coffee.topic = Some("Food and drink".to_string());
        let items = vec![coffee, TaxonomyItem::new("2", "Coffeehouses", Some(50))];
        assert!(sb.suggestions(fetch.seq, Ok(ProxyResponse::success(items))));

        let lines = suggestion_lines(&sb);
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("   1. Coffee"));
        assert!(lines[0].ends_with("(Food and drink)"));
        assert!(lines[1].starts_with("   2. Coffeehouses"));

        // an empty answer closes the dropdown and renders nothing
        let ticket = sb.input("coff").unwrap();
        let fetch = sb.debounce_elapsed(ticket).unwrap();
        sb.suggestions(fetch.seq, Ok(ProxyResponse::empty()));
        assert!(suggestion_lines(&sb).is_empty());
    }

    #[test]
    fn test_negative_limit_parses() {
        assert_eq!(parse_line("/limit -5").unwrap(), ShellCommand::Limit(-5));
    }
}
