//! Row view-models for the contact table.
//!
//! Everything here is a pure function of the loaded contacts, the current
//! filter result and the per-note expansion flags. Drawing is left to the UI.

use std::collections::HashSet;

use crate::contact::Contact;
use crate::format;

/// Stand-in shown for a field without values.
pub const EMPTY_PLACEHOLDER: &str = "—";

/// Notes longer than this many characters get an expand/collapse toggle.
pub const NOTE_PREVIEW_CHARS: usize = 80;

/// Expansion flags keyed by (contact name, note index).
#[derive(Debug, Clone, Default)]
pub struct ExpandedNotes {
    expanded: HashSet<(String, usize)>,
}

impl ExpandedNotes {
    pub fn is_expanded(&self, name: &str, index: usize) -> bool {
        self.expanded.contains(&(name.to_string(), index))
    }

    /// Flip one note and return its new state.
    pub fn toggle(&mut self, name: &str, index: usize) -> bool {
        let key = (name.to_string(), index);
        if self.expanded.remove(&key) {
            false
        } else {
            self.expanded.insert(key);
            true
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailLink {
    pub address: String,
    pub href: String,
}

impl EmailLink {
    pub fn new(address: &str) -> Self {
        Self {
            address: address.to_string(),
            href: format!("mailto:{}", address),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteView {
    pub index: usize,
    /// Text to display given the current expansion state.
    pub text: String,
    pub collapsible: bool,
    pub expanded: bool,
}

impl NoteView {
    fn build(index: usize, note: &str, expanded: bool, preview_chars: usize) -> Self {
        let collapsible = note.chars().count() > preview_chars;
        let text = if collapsible && !expanded {
            let mut preview: String = note.chars().take(preview_chars).collect();
            preview.push('…');
            preview
        } else {
            note.to_string()
        };
        Self {
            index,
            text,
            collapsible,
            expanded: collapsible && expanded,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowView {
    pub initials: String,
    pub name: String,
    pub phones: Vec<String>,
    pub email: Option<EmailLink>,
    pub birthday: Option<String>,
    pub tags: Vec<String>,
    pub notes: Vec<NoteView>,
}

impl RowView {
    pub fn build(contact: &Contact, expanded: &ExpandedNotes, preview_chars: usize) -> Self {
        Self {
            initials: format::initials(&contact.name),
            name: contact.name.clone(),
            phones: contact.phones.clone(),
            email: contact.email.as_deref().map(EmailLink::new),
            birthday: contact.birthday.as_deref().map(format::format_date),
            tags: contact.tags.clone(),
            notes: contact
                .notes
                .iter()
                .enumerate()
                .map(|(index, note)| {
                    NoteView::build(
                        index,
                        note,
                        expanded.is_expanded(&contact.name, index),
                        preview_chars,
                    )
                })
                .collect(),
        }
    }

    /// Number of terminal lines the tallest fixed-height cell needs.
    pub fn line_count(&self) -> usize {
        [self.phones.len(), self.tags.len(), self.notes.len(), 1]
            .into_iter()
            .max()
            .unwrap_or(1)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableView {
    pub rows: Vec<RowView>,
    pub status: String,
    /// True when nothing matched; the UI shows a single "no match" row.
    pub no_match: bool,
}

/// Build the table for the `visible` subset of a book holding `total` contacts.
pub fn render_table(
    visible: &[&Contact],
    total: usize,
    expanded: &ExpandedNotes,
    preview_chars: usize,
) -> TableView {
    let rows: Vec<RowView> = visible
        .iter()
        .map(|contact| RowView::build(contact, expanded, preview_chars))
        .collect();
    let no_match = rows.is_empty();
    TableView {
        status: status_line(rows.len(), total),
        rows,
        no_match,
    }
}

/// "N contacts", "1 contact", or "0 of N contacts" when nothing matched.
pub fn status_line(shown: usize, total: usize) -> String {
    match shown {
        0 => format!("0 of {} contacts", total),
        1 => "1 contact".to_string(),
        n => format!("{} contacts", n),
    }
}

/// Join a list field for single-line output, or the placeholder when empty.
pub fn join_or_placeholder(values: &[String], separator: &str) -> String {
    if values.is_empty() {
        EMPTY_PLACEHOLDER.to_string()
    } else {
        values.join(separator)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contact(name: &str) -> Contact {
        Contact {
            name: name.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_row_fields() {
        let mut ada = contact("Ada Lovelace");
        ada.phones = vec!["+380501112233".into(), "+380671112233".into()];
        ada.email = Some("ada@example.com".into());
        ada.birthday = Some("15-03-1990".into());
        ada.tags = vec!["math".into()];

        let row = RowView::build(&ada, &ExpandedNotes::default(), NOTE_PREVIEW_CHARS);
        assert_eq!(row.initials, "AL");
        assert_eq!(row.phones.len(), 2);
        assert_eq!(
            row.email,
            Some(EmailLink {
                address: "ada@example.com".into(),
                href: "mailto:ada@example.com".into(),
            })
        );
        assert_eq!(row.birthday.as_deref(), Some("15 Mar 1990"));
        assert_eq!(row.line_count(), 2);
    }

    #[test]
    fn test_empty_fields() {
        let row = RowView::build(&contact("Prince"), &ExpandedNotes::default(), 80);
        assert!(row.phones.is_empty());
        assert!(row.email.is_none());
        assert!(row.birthday.is_none());
        assert!(row.notes.is_empty());
        assert_eq!(row.line_count(), 1);
        assert_eq!(join_or_placeholder(&row.tags, ", "), EMPTY_PLACEHOLDER);
    }

    #[test]
    fn test_long_notes_collapse_and_expand_independently() {
        let mut bob = contact("Bob Smith");
        let long = "x".repeat(81);
        bob.notes = vec![long.clone(), "short".into(), long.clone()];

        let mut expanded = ExpandedNotes::default();
        let row = RowView::build(&bob, &expanded, NOTE_PREVIEW_CHARS);
        assert!(row.notes[0].collapsible);
        assert!(!row.notes[1].collapsible);
        assert_eq!(row.notes[0].text.chars().count(), 81);
        assert!(row.notes[0].text.ends_with('…'));

        assert!(expanded.toggle("Bob Smith", 2));
        let row = RowView::build(&bob, &expanded, NOTE_PREVIEW_CHARS);
        assert!(!row.notes[0].expanded);
        assert!(row.notes[2].expanded);
        assert_eq!(row.notes[2].text, long);

        assert!(!expanded.toggle("Bob Smith", 2));
        assert!(!expanded.is_expanded("Bob Smith", 2));
    }

    #[test]
    fn test_note_of_exactly_preview_length_is_not_collapsible() {
        let mut c = contact("C");
        c.notes = vec!["y".repeat(80)];
        let row = RowView::build(&c, &ExpandedNotes::default(), NOTE_PREVIEW_CHARS);
        assert!(!row.notes[0].collapsible);
        assert_eq!(row.notes[0].text, "y".repeat(80));
    }

    #[test]
    fn test_status_line() {
        let ada = contact("Ada");
        let bob = contact("Bob");
        let expanded = ExpandedNotes::default();

        let view = render_table(&[&ada, &bob], 2, &expanded, 80);
        assert_eq!(view.status, "2 contacts");
        assert!(!view.no_match);

        let view = render_table(&[&bob], 2, &expanded, 80);
        assert_eq!(view.status, "1 contact");

        let view = render_table(&[], 2, &expanded, 80);
        assert_eq!(view.status, "0 of 2 contacts");
        assert!(view.no_match);
        assert!(view.rows.is_empty());
    }
}
