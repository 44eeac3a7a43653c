use std::io::stdout;
use std::time::Duration;

use anyhow::Result;
use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyModifiers,
    MouseButton, MouseEvent, MouseEventKind,
};
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::ExecutableCommand;
use log::{debug, info};
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Position, Rect};
use ratatui::widgets::TableState;
use ratatui::Terminal;
use time::OffsetDateTime;
use tui_input::backend::crossterm::EventHandler;
use tui_input::Input;
use tui_widgets::popup::PopupState;

use crate::birthdays::{self, UpcomingBirthday};
use crate::config::{Config, TopBarAction, TopBarButton, UiColors};
use crate::contact::{AddressBook, Contact};
use crate::helper::{HelperAction, HelperModal};
use crate::loader::{LoadError, Locator, Resolved};
use crate::search;
use crate::view::{self, ExpandedNotes, TableView};

use super::draw;

const PAGE_ROWS: isize = 5;

/// Outcome of the startup load.
#[derive(Debug)]
pub enum DataState {
    Loaded { book: AddressBook, source: Locator },
    /// No candidate produced a contacts file. Holds the banner text.
    Unavailable { guidance: String },
}

impl DataState {
    pub fn from_load(result: Result<Resolved<AddressBook>, LoadError>) -> Self {
        match result {
            Ok(resolved) => DataState::Loaded {
                book: resolved.value,
                source: resolved.locator,
            },
            Err(err) => DataState::Unavailable {
                guidance: err.guidance(),
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchFocus {
    Input,
    Table,
}

/// Scrollable modal state shared by the help and birthdays dialogs.
#[derive(Debug, Clone)]
pub struct ScrollModal {
    /// Current scroll offset (line index at top of viewport)
    pub scroll: usize,
    /// Total number of content lines
    pub total_lines: usize,
    /// Viewport height (set during rendering)
    pub viewport_height: usize,
}

impl ScrollModal {
    pub fn new(total_lines: usize) -> Self {
        Self {
            scroll: 0,
            total_lines,
            viewport_height: 10,
        }
    }

    pub fn scroll_down(&mut self, lines: usize) {
        let max_scroll = self.total_lines.saturating_sub(self.viewport_height);
        self.scroll = (self.scroll + lines).min(max_scroll);
    }

    pub fn scroll_up(&mut self, lines: usize) {
        self.scroll = self.scroll.saturating_sub(lines);
    }

    pub fn can_scroll_up(&self) -> bool {
        self.scroll > 0
    }

    pub fn can_scroll_down(&self) -> bool {
        self.scroll + self.viewport_height < self.total_lines
    }
}

#[derive(Debug, Clone)]
pub struct BirthdaysModal {
    pub days: u32,
    pub entries: Vec<UpcomingBirthday>,
    pub scroll: ScrollModal,
}

/// A section in the help modal (e.g., "Global", "Table")
pub struct HelpSection {
    pub title: &'static str,
    pub entries: Vec<HelpEntry>,
}

/// A single help entry (action name + key bindings)
pub struct HelpEntry {
    pub action: &'static str,
    pub keys: String,
}

pub struct App<'a> {
    config: &'a Config,
    pub data: DataState,
    pub search_input: Input,
    pub search_focus: SearchFocus,
    /// Indices into the book of the rows currently shown.
    pub visible: Vec<usize>,
    pub selected: usize,
    pub table_state: TableState,
    pub expanded: ExpandedNotes,
    pub helper: HelperModal,
    pub birthdays_modal: Option<BirthdaysModal>,
    pub help_modal: Option<ScrollModal>,
    // Popup state for the helper dialog (tui-widgets popup)
    pub modal_popup: PopupState,
    /// Screen area of the open modal, recorded while drawing.
    pub modal_area: Option<Rect>,
    pub status: Option<String>,
}

impl<'a> App<'a> {
    pub fn new(config: &'a Config, data: DataState) -> Self {
        let mut app = Self {
            config,
            data,
            search_input: Input::default(),
            search_focus: SearchFocus::Input,
            visible: Vec::new(),
            selected: 0,
            table_state: TableState::default(),
            expanded: ExpandedNotes::default(),
            helper: HelperModal::default(),
            birthdays_modal: None,
            help_modal: None,
            modal_popup: PopupState::default(),
            modal_area: None,
            status: None,
        };
        app.refilter();
        app
    }

    pub fn run(&mut self) -> Result<()> {
        enable_raw_mode()?;
        let mut stdout = stdout();
        stdout.execute(EnterAlternateScreen)?;
        stdout.execute(EnableMouseCapture)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;
        terminal.clear()?;

        let result = self.event_loop(&mut terminal);

        disable_raw_mode()?;
        terminal.backend_mut().execute(DisableMouseCapture)?;
        terminal.backend_mut().execute(LeaveAlternateScreen)?;
        terminal.show_cursor()?;

        result
    }

    fn event_loop<B>(&mut self, terminal: &mut Terminal<B>) -> Result<()>
    where
        B: ratatui::backend::Backend,
    {
        loop {
            draw::render(terminal, self)?;

            if event::poll(Duration::from_millis(250))? {
                match event::read()? {
                    Event::Key(key) => {
                        if self.handle_key(key) {
                            break;
                        }
                    }
                    Event::Mouse(mouse) => self.handle_mouse(mouse),
                    _ => {}
                }
            }
        }
        Ok(())
    }

    // =========================================================================
    // Data access
    // =========================================================================

    pub fn book(&self) -> Option<&AddressBook> {
        match &self.data {
            DataState::Loaded { book, .. } => Some(book),
            DataState::Unavailable { .. } => None,
        }
    }

    pub fn source(&self) -> Option<&Locator> {
        match &self.data {
            DataState::Loaded { source, .. } => Some(source),
            DataState::Unavailable { .. } => None,
        }
    }

    pub fn selected_contact(&self) -> Option<&Contact> {
        let book = self.book()?;
        let index = *self.visible.get(self.selected)?;
        book.contacts().get(index)
    }

    /// View-models for the rows currently visible.
    pub fn table_view(&self) -> Option<TableView> {
        let book = self.book()?;
        let visible: Vec<&Contact> = self
            .visible
            .iter()
            .filter_map(|&index| book.contacts().get(index))
            .collect();
        Some(view::render_table(
            &visible,
            book.len(),
            &self.expanded,
            self.config.note_preview_chars,
        ))
    }

    pub fn ui_colors(&self) -> &UiColors {
        &self.config.ui.colors
    }

    pub fn top_bar_buttons(&self) -> &[TopBarButton] {
        &self.config.top_bar.buttons
    }

    pub fn any_modal_open(&self) -> bool {
        self.helper.is_open() || self.birthdays_modal.is_some() || self.help_modal.is_some()
    }

    fn refilter(&mut self) {
        self.visible = match self.book() {
            Some(book) => search::filter(book.contacts(), self.search_input.value()),
            None => Vec::new(),
        };
        self.selected = self.selected.min(self.visible.len().saturating_sub(1));
        self.table_state
            .select((!self.visible.is_empty()).then_some(self.selected));
    }

    fn move_selection(&mut self, delta: isize) {
        if self.visible.is_empty() {
            return;
        }
        let last = self.visible.len() as isize - 1;
        let next = (self.selected as isize + delta).clamp(0, last);
        self.selected = next as usize;
        self.table_state.select(Some(self.selected));
    }

    fn set_status<S: Into<String>>(&mut self, message: S) {
        self.status = Some(message.into());
    }

    // =========================================================================
    // Input handling
    // =========================================================================

    /// Returns true when the application should exit.
    fn handle_key(&mut self, key: KeyEvent) -> bool {
        // Ctrl+C always quits
        if key.modifiers.contains(KeyModifiers::CONTROL)
            && matches!(key.code, KeyCode::Char('c') | KeyCode::Char('C'))
        {
            return true;
        }

        self.status = None;

        if self.help_modal.is_some() || self.birthdays_modal.is_some() {
            self.handle_scroll_modal_key(key);
            return false;
        }

        if self.helper.is_open() {
            if self.key_matches_any(&key, &self.config.keys.modal.cancel) {
                self.close_modals();
            }
            return false;
        }

        if let Some(action) = self.top_bar_action_for_key(&key) {
            self.handle_top_bar_action(action);
            return false;
        }

        if self.book().is_some() && self.search_focus == SearchFocus::Input {
            self.handle_search_key(key);
            return false;
        }

        self.handle_table_key(key)
    }

    fn handle_search_key(&mut self, key: KeyEvent) {
        let config = self.config;
        let keys = &config.keys.search;

        if self.key_matches_any(&key, &keys.cancel) || self.key_matches_any(&key, &keys.confirm) {
            self.search_focus = SearchFocus::Table;
            return;
        }

        if let Some(change) = self.search_input.handle_event(&Event::Key(key)) {
            if change.value {
                self.refilter();
                debug!(
                    "filter `{}` matched {} contacts",
                    self.search_input.value(),
                    self.visible.len()
                );
            }
        }
    }

    fn handle_table_key(&mut self, key: KeyEvent) -> bool {
        let config = self.config;
        let global = &config.keys.global;
        let table = &config.keys.table;

        if self.key_matches_any(&key, &global.quit) {
            return true;
        }

        if self.key_matches_any(&key, &global.help) {
            self.show_help();
            return false;
        }

        if self.book().is_none() {
            return false;
        }

        if self.key_matches_any(&key, &global.search) {
            self.search_focus = SearchFocus::Input;
            return false;
        }

        if self.key_matches_any(&key, &table.next) {
            self.move_selection(1);
        } else if self.key_matches_any(&key, &table.prev) {
            self.move_selection(-1);
        } else if self.key_matches_any(&key, &table.page_down) {
            self.move_selection(PAGE_ROWS);
        } else if self.key_matches_any(&key, &table.page_up) {
            self.move_selection(-PAGE_ROWS);
        } else if self.key_matches_any(&key, &table.edit) {
            self.edit_selected();
        } else if let KeyCode::Char(c) = key.code {
            if let Some(digit) = c.to_digit(10).filter(|d| *d >= 1) {
                self.toggle_note(digit as usize - 1);
            }
        }

        false
    }

    fn handle_scroll_modal_key(&mut self, key: KeyEvent) {
        let config = self.config;
        let keys = &config.keys.modal;
        if self.key_matches_any(&key, &keys.cancel) {
            self.close_modals();
            return;
        }

        let down = self.key_matches_any(&key, &keys.next);
        let up = self.key_matches_any(&key, &keys.prev);
        let modal = match (self.help_modal.as_mut(), self.birthdays_modal.as_mut()) {
            (Some(help), _) => help,
            (None, Some(birthdays)) => &mut birthdays.scroll,
            (None, None) => return,
        };

        if down {
            modal.scroll_down(1);
        } else if up {
            modal.scroll_up(1);
        } else {
            match key.code {
                KeyCode::PageDown => {
                    let page = modal.viewport_height.saturating_sub(1).max(1);
                    modal.scroll_down(page);
                }
                KeyCode::PageUp => {
                    let page = modal.viewport_height.saturating_sub(1).max(1);
                    modal.scroll_up(page);
                }
                _ => {}
            }
        }
    }

    /// A left click outside the open modal dismisses it.
    fn handle_mouse(&mut self, mouse: MouseEvent) {
        if !matches!(mouse.kind, MouseEventKind::Down(MouseButton::Left)) {
            return;
        }
        if !self.any_modal_open() {
            return;
        }

        let inside = self
            .modal_area
            .map(|rect| rect.contains(Position::new(mouse.column, mouse.row)))
            .unwrap_or(false);
        if !inside {
            self.close_modals();
        }
    }

    // =========================================================================
    // Actions
    // =========================================================================

    fn close_modals(&mut self) {
        self.helper.close();
        self.birthdays_modal = None;
        self.help_modal = None;
        self.modal_area = None;
    }

    fn open_helper(&mut self, action: HelperAction, target: Option<String>) {
        self.modal_popup = PopupState::default();
        self.helper.open(action, target.as_deref());
        info!("helper opened for `{}`", action);
    }

    fn edit_selected(&mut self) {
        let target = self.selected_contact().map(|contact| contact.name.clone());
        match target {
            Some(name) => self.open_helper(HelperAction::Edit, Some(name)),
            None => self.set_status("No contact selected"),
        }
    }

    fn toggle_note(&mut self, index: usize) {
        let Some(contact) = self.selected_contact() else {
            return;
        };
        let Some(note) = contact.notes.get(index) else {
            self.set_status(format!("No note {}", index + 1));
            return;
        };
        if note.chars().count() <= self.config.note_preview_chars {
            self.set_status(format!("Note {} is shown in full", index + 1));
            return;
        }
        let name = contact.name.clone();
        let expanded = self.expanded.toggle(&name, index);
        self.set_status(if expanded {
            format!("Expanded note {}", index + 1)
        } else {
            format!("Collapsed note {}", index + 1)
        });
    }

    fn show_birthdays(&mut self) {
        let Some(book) = self.book() else {
            self.set_status("No contacts loaded");
            return;
        };
        let days = self.config.birthday_lookahead_days;
        let today = OffsetDateTime::now_utc().date();
        let entries = birthdays::upcoming_birthdays(book.contacts(), today, days);
        let total_lines = entries.len().max(1);
        self.birthdays_modal = Some(BirthdaysModal {
            days,
            entries,
            scroll: ScrollModal::new(total_lines),
        });
    }

    /// Open the help modal
    pub fn show_help(&mut self) {
        let total_lines = self.help_total_lines();
        self.help_modal = Some(ScrollModal::new(total_lines));
    }

    // =========================================================================
    // Key matching
    // =========================================================================

    /// Check if the key event matches any of the bindings in the list
    fn key_matches_any(&self, event: &KeyEvent, bindings: &[String]) -> bool {
        bindings.iter().any(|b| key_matches_single(event, b))
    }

    // =========================================================================
    // Help Modal
    // =========================================================================

    /// Generate help content from current keybindings configuration
    pub fn help_entries(&self) -> Vec<HelpSection> {
        let keys = &self.config.keys;

        let mut buttons: Vec<HelpEntry> = self
            .config
            .top_bar
            .buttons
            .iter()
            .map(|b| HelpEntry {
                action: b.action.title(),
                keys: b.key.clone(),
            })
            .collect();
        buttons.push(HelpEntry {
            action: "Force quit",
            keys: "Ctrl+C".to_string(),
        });

        vec![
            HelpSection {
                title: "Global",
                entries: vec![
                    HelpEntry {
                        action: "Quit",
                        keys: keys.global.quit.join(", "),
                    },
                    HelpEntry {
                        action: "Focus search",
                        keys: keys.global.search.join(", "),
                    },
                    HelpEntry {
                        action: "Help",
                        keys: keys.global.help.join(", "),
                    },
                ],
            },
            HelpSection {
                title: "Top Bar",
                entries: buttons,
            },
            HelpSection {
                title: "Search",
                entries: vec![
                    HelpEntry {
                        action: "Type to filter",
                        keys: "any text".to_string(),
                    },
                    HelpEntry {
                        action: "Back to table",
                        keys: keys
                            .search
                            .cancel
                            .iter()
                            .chain(keys.search.confirm.iter())
                            .cloned()
                            .collect::<Vec<_>>()
                            .join(", "),
                    },
                ],
            },
            HelpSection {
                title: "Table",
                entries: vec![
                    HelpEntry {
                        action: "Next row",
                        keys: keys.table.next.join(", "),
                    },
                    HelpEntry {
                        action: "Previous row",
                        keys: keys.table.prev.join(", "),
                    },
                    HelpEntry {
                        action: "Page down",
                        keys: keys.table.page_down.join(", "),
                    },
                    HelpEntry {
                        action: "Page up",
                        keys: keys.table.page_up.join(", "),
                    },
                    HelpEntry {
                        action: "Edit contact",
                        keys: keys.table.edit.join(", "),
                    },
                    HelpEntry {
                        action: "Toggle note N",
                        keys: "1-9".to_string(),
                    },
                ],
            },
            HelpSection {
                title: "Dialogs",
                entries: vec![
                    HelpEntry {
                        action: "Close",
                        keys: format!("{}, click outside", keys.modal.cancel.join(", ")),
                    },
                    HelpEntry {
                        action: "Scroll",
                        keys: keys
                            .modal
                            .next
                            .iter()
                            .chain(keys.modal.prev.iter())
                            .cloned()
                            .collect::<Vec<_>>()
                            .join(", "),
                    },
                ],
            },
        ]
    }

    /// Calculate total number of lines in help content
    fn help_total_lines(&self) -> usize {
        self.help_entries()
            .iter()
            .map(|section| section.entries.len() + 2)
            .sum()
    }

    // =========================================================================
    // Top Bar Actions
    // =========================================================================

    /// Check if a key event matches a top bar button and return its action
    fn top_bar_action_for_key(&self, key: &KeyEvent) -> Option<TopBarAction> {
        let KeyCode::F(number) = key.code else {
            return None;
        };
        self.config
            .top_bar
            .buttons
            .iter()
            .find(|button| button.function_key_number() == Some(number))
            .map(|button| button.action)
    }

    fn handle_top_bar_action(&mut self, action: TopBarAction) {
        if let Some(helper_action) = action.helper_action() {
            self.open_helper(helper_action, None);
            return;
        }
        match action {
            TopBarAction::Birthdays => self.show_birthdays(),
            TopBarAction::Help => self.show_help(),
            _ => {}
        }
    }
}

/// Check if the key event matches a single binding string
fn key_matches_single(event: &KeyEvent, binding: &str) -> bool {
    let trimmed = binding.trim();
    if trimmed.is_empty() {
        return false;
    }

    // Ctrl/Alt/Super chords are not bindable
    let disallowed = KeyModifiers::CONTROL | KeyModifiers::ALT | KeyModifiers::SUPER;
    if event.modifiers.intersects(disallowed) {
        return false;
    }

    match trimmed.to_ascii_lowercase().as_str() {
        "enter" => matches!(event.code, KeyCode::Enter),
        "tab" => matches!(event.code, KeyCode::Tab),
        "backtab" | "shift+tab" => matches!(event.code, KeyCode::BackTab),
        "backspace" => matches!(event.code, KeyCode::Backspace),
        "esc" | "escape" => matches!(event.code, KeyCode::Esc),
        "space" => matches!(event.code, KeyCode::Char(' ')),
        "up" => matches!(event.code, KeyCode::Up),
        "down" => matches!(event.code, KeyCode::Down),
        "left" => matches!(event.code, KeyCode::Left),
        "right" => matches!(event.code, KeyCode::Right),
        "pageup" | "page_up" => matches!(event.code, KeyCode::PageUp),
        "pagedown" | "page_down" => matches!(event.code, KeyCode::PageDown),
        "home" => matches!(event.code, KeyCode::Home),
        "end" => matches!(event.code, KeyCode::End),
        lower if lower.len() > 1 && lower.starts_with('f') => match lower[1..].parse::<u8>() {
            Ok(n) => matches!(event.code, KeyCode::F(f) if f == n),
            Err(_) => false,
        },
        // Single character - case-sensitive (m != M, since M requires Shift)
        _ => {
            let mut chars = trimmed.chars();
            if let (Some(first), None) = (chars.next(), chars.next()) {
                matches!(event.code, KeyCode::Char(c) if c == first)
            } else {
                false
            }
        }
    }
}
