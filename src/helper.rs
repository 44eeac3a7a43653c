//! Static command-syntax help for the assistant bot.
//!
//! The viewer never changes data. These texts only tell the user what to type
//! into the bot to do so.

use std::fmt;
use std::str::FromStr;

use anyhow::{bail, Error};

/// Token shown in place of a contact name when no row was chosen.
pub const NAME_PLACEHOLDER: &str = "<name>";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HelperAction {
    Add,
    Delete,
    Edit,
}

impl HelperAction {
    pub fn as_str(self) -> &'static str {
        match self {
            HelperAction::Add => "add",
            HelperAction::Delete => "delete",
            HelperAction::Edit => "edit",
        }
    }
}

impl fmt::Display for HelperAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HelperAction {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "add" => Ok(HelperAction::Add),
            "delete" => Ok(HelperAction::Delete),
            "edit" => Ok(HelperAction::Edit),
            other => bail!("unknown helper action '{}', expected one of: add, delete, edit", other),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HelperContent {
    pub action: HelperAction,
    pub title: String,
    pub lines: Vec<String>,
}

impl HelperContent {
    pub fn text(&self) -> String {
        self.lines.join("\n")
    }
}

/// The bot tokenizes its input shell-style, so multi-word names need quotes.
fn quote_name(name: &str) -> String {
    if name.chars().any(char::is_whitespace) {
        format!("\"{}\"", name)
    } else {
        name.to_string()
    }
}

pub fn helper_content(action: HelperAction, target: Option<&str>) -> HelperContent {
    match action {
        HelperAction::Add => HelperContent {
            action,
            title: "Add a contact".to_string(),
            lines: vec![
                "Run the assistant bot and type:".to_string(),
                String::new(),
                "  add <name> [phone] [email] [birthday]".to_string(),
                String::new(),
                "Example:".to_string(),
                "  add \"Ada Lovelace\" 0501234567 ada@example.com 10-12-1815".to_string(),
                String::new(),
                "Phones use the +380XXXXXXXXX format, birthdays DD-MM-YYYY.".to_string(),
                "Reload this viewer afterwards to see the change.".to_string(),
            ],
        },
        HelperAction::Delete => HelperContent {
            action,
            title: "Delete a contact".to_string(),
            lines: vec![
                "Run the assistant bot and type:".to_string(),
                String::new(),
                "  delete <name>".to_string(),
                String::new(),
                "To remove every contact at once:".to_string(),
                "  delete_all".to_string(),
                String::new(),
                "Reload this viewer afterwards to see the change.".to_string(),
            ],
        },
        HelperAction::Edit => {
            let name = target
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .map(quote_name)
                .unwrap_or_else(|| NAME_PLACEHOLDER.to_string());
            HelperContent {
                action,
                title: "Edit a contact".to_string(),
                lines: vec![
                    "Run the assistant bot and type one of:".to_string(),
                    String::new(),
                    format!("  change {} <old_phone> <new_phone>", name),
                    format!("  add_email {} <email>", name),
                    format!("  add_birthday {} <DD-MM-YYYY>", name),
                    format!("  add_tag {} <tag>", name),
                    String::new(),
                    "Reload this viewer afterwards to see the change.".to_string(),
                ],
            }
        }
    }
}

/// Open/closed state of the helper modal.
#[derive(Debug, Clone, Default)]
pub struct HelperModal {
    content: Option<HelperContent>,
}

impl HelperModal {
    pub fn open(&mut self, action: HelperAction, target: Option<&str>) {
        self.content = Some(helper_content(action, target));
    }

    pub fn close(&mut self) {
        self.content = None;
    }

    pub fn is_open(&self) -> bool {
        self.content.is_some()
    }

    pub fn content(&self) -> Option<&HelperContent> {
        self.content.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn command_lines(content: &HelperContent) -> Vec<&String> {
        content.lines.iter().filter(|l| l.starts_with("  ")).collect()
    }

    #[test]
    fn test_edit_interpolates_name_in_every_command() {
        let content = helper_content(HelperAction::Edit, Some("Bob Smith"));
        let commands = command_lines(&content);
        assert_eq!(commands.len(), 4);
        for line in commands {
            assert!(line.contains("Bob Smith"), "missing name in {line:?}");
            assert!(line.contains("\"Bob Smith\""));
        }
    }

    #[test]
    fn test_edit_without_target_uses_placeholder() {
        for target in [None, Some(""), Some("   ")] {
            let content = helper_content(HelperAction::Edit, target);
            let commands = command_lines(&content);
            assert_eq!(commands.len(), 4);
            assert!(commands.iter().all(|l| l.contains(NAME_PLACEHOLDER)));
        }
    }

    #[test]
    fn test_single_word_name_is_not_quoted() {
        let content = helper_content(HelperAction::Edit, Some("Prince"));
        assert!(content.text().contains("add_tag Prince <tag>"));
    }

    #[test]
    fn test_static_variants() {
        let add = helper_content(HelperAction::Add, Some("ignored"));
        assert!(add.text().contains("add <name> [phone] [email] [birthday]"));
        assert!(!add.text().contains("ignored"));

        let delete = helper_content(HelperAction::Delete, None);
        assert!(delete.text().contains("delete <name>"));
        assert_eq!(delete.title, "Delete a contact");
    }

    #[test]
    fn test_parse_action() {
        assert_eq!("EDIT".parse::<HelperAction>().unwrap(), HelperAction::Edit);
        assert_eq!(" add ".parse::<HelperAction>().unwrap(), HelperAction::Add);
        assert!("rename".parse::<HelperAction>().is_err());
    }

    #[test]
    fn test_modal_lifecycle() {
        let mut modal = HelperModal::default();
        assert!(!modal.is_open());
        modal.open(HelperAction::Delete, None);
        assert!(modal.is_open());
        assert_eq!(modal.content().map(|c| c.action), Some(HelperAction::Delete));
        modal.close();
        assert!(modal.content().is_none());
    }
}
