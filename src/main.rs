mod birthdays;
mod config;
mod contact;
mod format;
mod helper;
mod loader;
mod logging;
mod search;
mod ui;
mod view;

use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::{Args, Parser, Subcommand};
use flexi_logger::LoggerHandle;
use log::{info, warn};
use time::OffsetDateTime;

use config::Config;
use contact::AddressBook;
use helper::HelperAction;
use loader::{LoadError, Locator, Resolved, SourceFetcher};
use view::{ExpandedNotes, EMPTY_PLACEHOLDER};

#[derive(Parser, Debug)]
#[command(name = "abview", version, about = "Read-only viewer for the assistant bot's address book")]
struct Cli {
    /// Configuration file (default: <config dir>/abview/config.toml)
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Load this contacts file or URL instead of searching the default locations
    #[arg(long, value_name = "PATH")]
    data: Option<String>,

    /// Directory relative candidate paths resolve against
    #[arg(long, value_name = "DIR")]
    base_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the filtered table as tab-separated rows
    List(ListArgs),
    /// Print the bot commands for an action
    Helper(HelperArgs),
    /// Print upcoming birthdays
    Birthdays(BirthdaysArgs),
    /// Print every tag with the contacts carrying it
    Tags,
}

#[derive(Args, Debug)]
struct ListArgs {
    /// Search term (matches name, phones, email, birthday, tags, notes)
    query: Option<String>,

    /// Only contacts carrying this tag
    #[arg(long)]
    tag: Option<String>,
}

#[derive(Args, Debug)]
struct HelperArgs {
    /// One of: add, delete, edit
    action: HelperAction,

    /// Contact the edit commands should target
    name: Option<String>,
}

#[derive(Args, Debug)]
struct BirthdaysArgs {
    /// Look-ahead window in days (default from config)
    #[arg(long)]
    days: Option<u32>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut config = config::load(cli.config.as_deref())?;
    if let Some(base_dir) = &cli.base_dir {
        config.base_dir = base_dir.clone();
    }

    let _logger = start_logging(&config);
    match &config.config_path {
        Some(path) => info!("configuration loaded from {}", path.display()),
        None => info!("no configuration file, using defaults"),
    }

    // The helper text does not depend on the contacts file.
    if let Some(Command::Helper(args)) = &cli.command {
        print_helper(args);
        return Ok(());
    }

    let candidates = match &cli.data {
        Some(data) => vec![Locator::parse(data)],
        None => loader::candidate_locators(
            &config.candidates,
            &config.base_dir,
            config.remote_base.as_ref(),
        )?,
    };
    let fetcher = SourceFetcher::new()?;
    let loaded = loader::load_address_book(&candidates, &fetcher);

    match cli.command {
        Some(Command::List(args)) => handle_list(args, &config, unwrap_book(loaded)?),
        Some(Command::Birthdays(args)) => handle_birthdays(args, &config, unwrap_book(loaded)?),
        Some(Command::Tags) => handle_tags(unwrap_book(loaded)?),
        Some(Command::Helper(_)) => Ok(()),
        None => {
            if let Err(err) = &loaded {
                warn!("starting without contacts: {}", err);
            }
            let data = ui::app::DataState::from_load(loaded);
            let mut app = ui::app::App::new(&config, data);
            app.run()?;
            info!("event=app_exit");
            Ok(())
        }
    }
}

/// Logging failures are reported but never stop the viewer.
fn start_logging(config: &Config) -> Option<LoggerHandle> {
    let dir = match config.log.dir.clone() {
        Some(dir) => dir,
        None => match config::default_log_dir() {
            Ok(dir) => dir,
            Err(err) => {
                eprintln!("warning: logging disabled: {:#}", err);
                return None;
            }
        },
    };
    match logging::init(&config.log.level, &dir) {
        Ok(handle) => Some(handle),
        Err(err) => {
            eprintln!("warning: logging disabled: {:#}", err);
            None
        }
    }
}

fn unwrap_book(loaded: Result<Resolved<AddressBook>, LoadError>) -> Result<AddressBook> {
    match loaded {
        Ok(resolved) => Ok(resolved.value),
        Err(err) => bail!("{}", err.guidance()),
    }
}

fn print_helper(args: &HelperArgs) {
    let content = helper::helper_content(args.action, args.name.as_deref());
    println!("{}", content.title);
    println!();
    println!("{}", content.text());
}

fn handle_list(args: ListArgs, config: &Config, book: AddressBook) -> Result<()> {
    let mut indices = search::filter(book.contacts(), args.query.as_deref().unwrap_or(""));
    if let Some(tag) = args.tag.as_deref() {
        let tagged = search::filter_by_tag(book.contacts(), tag);
        indices.retain(|index| tagged.contains(index));
    }

    let visible: Vec<_> = indices
        .iter()
        .filter_map(|&index| book.contacts().get(index))
        .collect();
    let table = view::render_table(
        &visible,
        book.len(),
        &ExpandedNotes::default(),
        config.note_preview_chars,
    );

    println!("{}", table.status);
    if table.no_match {
        println!("No contacts match");
        return Ok(());
    }

    // Results: name<TAB>phones<TAB>email<TAB>birthday<TAB>tags<TAB>notes
    for contact in visible {
        println!(
            "{}\t{}\t{}\t{}\t{}\t{}",
            contact.name,
            view::join_or_placeholder(&contact.phones, ", "),
            contact.email.as_deref().unwrap_or(EMPTY_PLACEHOLDER),
            contact
                .birthday
                .as_deref()
                .map(format::format_date)
                .unwrap_or_else(|| EMPTY_PLACEHOLDER.to_string()),
            view::join_or_placeholder(&contact.tags, ", "),
            view::join_or_placeholder(&contact.notes, " | "),
        );
    }

    Ok(())
}

fn handle_birthdays(args: BirthdaysArgs, config: &Config, book: AddressBook) -> Result<()> {
    let days = args.days.unwrap_or(config.birthday_lookahead_days);
    let today = OffsetDateTime::now_utc().date();
    let upcoming = birthdays::upcoming_birthdays(book.contacts(), today, days);

    if upcoming.is_empty() {
        println!("No birthdays in the next {} days", days);
        return Ok(());
    }

    for entry in upcoming {
        println!(
            "{}\t{}\t{}",
            entry.name,
            format::format_date(&entry.birthday),
            birthdays::describe_days(entry.days_until)
        );
    }
    Ok(())
}

fn handle_tags(book: AddressBook) -> Result<()> {
    let tags = book.unique_tags();
    if tags.is_empty() {
        println!("No tags");
        return Ok(());
    }

    for tag in tags {
        let names: Vec<&str> = search::filter_by_tag(book.contacts(), &tag)
            .into_iter()
            .filter_map(|index| book.contacts().get(index))
            .map(|contact| contact.name.as_str())
            .collect();
        println!("{}\t{}", tag, names.join(", "));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_helper_action_parses_from_cli() {
        let cli = Cli::parse_from(["abview", "helper", "edit", "Bob Smith"]);
        match cli.command {
            Some(Command::Helper(args)) => {
                assert_eq!(args.action, HelperAction::Edit);
                assert_eq!(args.name.as_deref(), Some("Bob Smith"));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_unwrap_book_reports_guidance() {
        let err = unwrap_book(Err(LoadError::Exhausted {
            tried: vec![Locator::parse("missing.json")],
        }))
        .unwrap_err();
        let message = err.to_string();
        assert!(message.starts_with("Contacts file not found"));
        assert!(message.contains("missing.json"));
    }
}
