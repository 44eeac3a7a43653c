use anyhow::Result;
use ratatui::backend::Backend;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::symbols::line::NORMAL as LINE;
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table, Wrap};
use ratatui::{Frame, Terminal};
// Use Popup from tui-widgets to render modals
use tui_widgets::popup::Popup;

use crate::birthdays;
use crate::config::{RgbColor, TopBarButton};
use crate::format;
use crate::view::{EmailLink, RowView, EMPTY_PLACEHOLDER};

use super::app::{App, DataState, SearchFocus};

const TABLE_HELP: &str = "j/k: move  e: edit  1-9: toggle note  /: search  ?: help  q: quit";
const SEARCH_HELP_INPUT: &str = "Type to filter  Esc/Enter: focus table";
const UNAVAILABLE_HELP: &str = "?: help  q: quit";
const HELPER_MODAL_FOOTER: &str = "Esc/q or click outside: close";
const SCROLL_MODAL_FOOTER: &str = "j/k: scroll  Esc/q: close";
const NO_MATCH_MESSAGE: &str = "No contacts match your search";

const COLUMN_TITLES: [&str; 7] = [
    "NAME", "PHONES", "EMAIL", "BIRTHDAY", "TAGS", "NOTES", "ACTIONS",
];
const COLUMN_WIDTHS: [Constraint; 7] = [
    Constraint::Length(26),
    Constraint::Length(16),
    Constraint::Length(28),
    Constraint::Length(12),
    Constraint::Length(14),
    Constraint::Min(20),
    Constraint::Length(7),
];
const NOTES_COLUMN: usize = 5;

pub fn render<B: Backend>(terminal: &mut Terminal<B>, app: &mut App) -> Result<()> {
    terminal.draw(|frame| draw_frame(frame, app))?;
    Ok(())
}

fn draw_frame(frame: &mut Frame<'_>, app: &mut App) {
    let size = frame.area();
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(0),
            Constraint::Length(1),
        ])
        .split(size);

    draw_header(frame, layout[0], app);
    draw_body(frame, layout[1], app);
    draw_footer(frame, layout[2], app);
    draw_helper_modal(frame, size, app);
    draw_birthdays_modal(frame, size, app);
    draw_help_modal(frame, size, app);
}

fn draw_header(frame: &mut Frame<'_>, area: Rect, app: &App) {
    let buttons = app.top_bar_buttons();
    let total_buttons_width = calculate_buttons_width(buttons);

    // Split area: left for the data source, right for buttons
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Min(0),
            Constraint::Length(total_buttons_width),
        ])
        .split(area);

    draw_header_left(frame, chunks[0], app);
    draw_top_bar_buttons(frame, chunks[1], app);
}

fn draw_header_left(frame: &mut Frame<'_>, area: Rect, app: &App) {
    let header_style = header_text_style(app);
    let text = match app.source() {
        Some(source) => format!("CONTACTS://{}", source),
        None => "NO CONTACTS FILE".to_string(),
    };
    frame.render_widget(Paragraph::new(Span::styled(text, header_style)), area);
}

fn calculate_buttons_width(buttons: &[TopBarButton]) -> u16 {
    if buttons.is_empty() {
        return 0;
    }

    let max_title_len = buttons
        .iter()
        .map(|b| b.action.title().len())
        .max()
        .unwrap_or(0);

    // Format: " F1: TITLE " = 1 (space) + key.len() + 2 (": ") + title + 1 (space)
    // Keys are F1-F12, so 2-3 chars. Use 3 for consistency.
    let button_width = (1 + 3 + 2 + max_title_len + 1) as u16;

    let num_buttons = buttons.len() as u16;
    let separators = num_buttons.saturating_sub(1);
    button_width * num_buttons + separators
}

fn draw_top_bar_buttons(frame: &mut Frame<'_>, area: Rect, app: &App) {
    let buttons = app.top_bar_buttons();
    if buttons.is_empty() || area.width == 0 {
        return;
    }

    let max_title_len = buttons
        .iter()
        .map(|b| b.action.title().len())
        .max()
        .unwrap_or(0);
    let button_content_width = (1 + 3 + 2 + max_title_len + 1) as u16;

    let colors = app.ui_colors();
    let button_style = Style::default()
        .fg(color(colors.selection_fg))
        .bg(color(colors.selection_bg))
        .add_modifier(Modifier::BOLD);

    let mut x = area.x;
    for (idx, button) in buttons.iter().enumerate() {
        if x + button_content_width > area.x + area.width {
            break;
        }

        let text = format!(
            " {}: {:^width$} ",
            button.key,
            button.action.title(),
            width = max_title_len
        );
        let button_area = Rect {
            x,
            y: area.y,
            width: button_content_width,
            height: 1,
        };
        frame.render_widget(
            Paragraph::new(text).style(button_style).alignment(Alignment::Center),
            button_area,
        );

        x += button_content_width;

        if idx < buttons.len() - 1 && x < area.x + area.width {
            let sep_area = Rect {
                x,
                y: area.y,
                width: 1,
                height: 1,
            };
            frame.render_widget(Paragraph::new(" "), sep_area);
            x += 1;
        }
    }
}

fn draw_body(frame: &mut Frame<'_>, area: Rect, app: &mut App) {
    if let DataState::Unavailable { guidance } = &app.data {
        draw_unavailable(frame, area, guidance, app);
        return;
    }

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(border_style(app));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    if inner.width == 0 || inner.height == 0 {
        return;
    }

    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(2), Constraint::Min(0)])
        .split(inner);

    draw_search_header(frame, layout[0], app, area.width);
    draw_table(frame, layout[1], app);
}

fn draw_unavailable(frame: &mut Frame<'_>, area: Rect, guidance: &str, app: &App) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(border_style(app))
        .title(Span::styled(" CONTACTS UNAVAILABLE ", header_text_style(app)));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let text: Vec<Line> = guidance.lines().map(|line| Line::from(line.to_string())).collect();
    let height = (text.len() as u16).min(inner.height);
    let target = Rect {
        x: inner.x.saturating_add(2),
        y: inner.y + inner.height.saturating_sub(height) / 2,
        width: inner.width.saturating_sub(4),
        height,
    };
    frame.render_widget(Paragraph::new(text).wrap(Wrap { trim: false }), target);
}

fn draw_search_header(frame: &mut Frame<'_>, area: Rect, app: &App, outer_width: u16) {
    if area.width == 0 || area.height == 0 {
        return;
    }

    let active = app.search_focus == SearchFocus::Input && !app.any_modal_open();
    let label = "SEARCH: ";
    let value_style = if active {
        selection_style(app)
    } else {
        Style::default()
    };
    let status = app
        .table_view()
        .map(|view| view.status)
        .unwrap_or_default();

    let line_area = Rect { height: 1, ..area };
    let parts = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Min(0),
            Constraint::Length(status.chars().count() as u16 + 1),
        ])
        .split(line_area);

    let line = Line::from(vec![
        Span::styled(label, header_text_style(app)),
        Span::styled(app.search_input.value().to_string(), value_style),
    ]);
    render_header_with_separator(frame, area, line, app, outer_width);
    frame.render_widget(
        Paragraph::new(Span::styled(status, header_text_style(app))).alignment(Alignment::Right),
        parts[1],
    );

    if active {
        let column = Span::raw(label).width() + app.search_input.visual_cursor();
        let x = parts[0].x.saturating_add(column as u16);
        frame.set_cursor_position((x, parts[0].y));
    }
}

fn draw_table(frame: &mut Frame<'_>, area: Rect, app: &mut App) {
    let Some(view) = app.table_view() else {
        return;
    };

    let header = Row::new(COLUMN_TITLES.iter().map(|title| Cell::from(*title)))
        .style(header_text_style(app).add_modifier(Modifier::BOLD));

    if view.no_match {
        frame.render_widget(Table::new(Vec::<Row>::new(), COLUMN_WIDTHS).header(header), area);
        let message_area = Rect {
            y: area.y.saturating_add(2),
            height: area.height.saturating_sub(2).min(1),
            ..area
        };
        frame.render_widget(
            Paragraph::new(NO_MATCH_MESSAGE).alignment(Alignment::Center),
            message_area,
        );
        return;
    }

    let notes_width = Layout::default()
        .direction(Direction::Horizontal)
        .constraints(COLUMN_WIDTHS)
        .spacing(1)
        .split(area)[NOTES_COLUMN]
        .width as usize;

    let styles = RowStyles::new(app);
    let rows: Vec<Row> = view
        .rows
        .iter()
        .map(|row| build_row(row, notes_width, &styles))
        .collect();

    let table = Table::new(rows, COLUMN_WIDTHS)
        .header(header)
        .column_spacing(1)
        .highlight_style(selection_style(app));

    frame.render_stateful_widget(table, area, &mut app.table_state);
}

struct RowStyles {
    badge: Style,
    placeholder: Style,
    link: Style,
    marker: Style,
}

impl RowStyles {
    fn new(app: &App) -> Self {
        let colors = app.ui_colors();
        Self {
            badge: Style::default()
                .fg(color(colors.badge_fg))
                .bg(color(colors.badge_bg))
                .add_modifier(Modifier::BOLD),
            placeholder: Style::default().add_modifier(Modifier::DIM),
            link: Style::default().add_modifier(Modifier::UNDERLINED),
            marker: header_text_style(app),
        }
    }
}

fn build_row(row: &RowView, notes_width: usize, styles: &RowStyles) -> Row<'static> {
    let placeholder = || Text::from(Span::styled(EMPTY_PLACEHOLDER, styles.placeholder));

    let name = Text::from(Line::from(vec![
        Span::styled(format!(" {} ", row.initials), styles.badge),
        Span::raw(" "),
        Span::raw(row.name.clone()),
    ]));

    let phones = if row.phones.is_empty() {
        placeholder()
    } else {
        Text::from(
            row.phones
                .iter()
                .map(|phone| Line::from(phone.clone()))
                .collect::<Vec<_>>(),
        )
    };

    let email = match &row.email {
        Some(link) => Text::from(Span::styled(link.address.clone(), styles.link)),
        None => placeholder(),
    };

    let birthday = match &row.birthday {
        Some(birthday) => Text::from(birthday.clone()),
        None => placeholder(),
    };

    let tags = if row.tags.is_empty() {
        placeholder()
    } else {
        Text::from(
            row.tags
                .iter()
                .map(|tag| Line::from(Span::styled(format!(" {} ", tag), styles.badge)))
                .collect::<Vec<_>>(),
        )
    };

    let mut note_lines: Vec<Line> = Vec::new();
    for note in &row.notes {
        let marker = match (note.collapsible, note.expanded) {
            (true, false) => format!("{}[+] ", note.index + 1),
            (true, true) => format!("{}[-] ", note.index + 1),
            (false, _) => format!("{}. ", note.index + 1),
        };
        let indent = " ".repeat(marker.chars().count());
        let body_width = notes_width.saturating_sub(indent.len()).max(1);
        for (idx, chunk) in wrap_text(&note.text, body_width).into_iter().enumerate() {
            let lead = if idx == 0 {
                Span::styled(marker.clone(), styles.marker)
            } else {
                Span::raw(indent.clone())
            };
            note_lines.push(Line::from(vec![lead, Span::raw(chunk)]));
        }
    }
    let note_height = note_lines.len();
    let notes = if note_lines.is_empty() {
        placeholder()
    } else {
        Text::from(note_lines)
    };

    let height = row.line_count().max(note_height).max(1) as u16;

    Row::new(vec![
        Cell::from(name),
        Cell::from(phones),
        Cell::from(email),
        Cell::from(birthday),
        Cell::from(tags),
        Cell::from(notes),
        Cell::from(Span::styled("[Edit]", styles.marker)),
    ])
    .height(height)
}

/// Greedy word wrap on character counts. Words longer than `width` are split.
fn wrap_text(text: &str, width: usize) -> Vec<String> {
    let width = width.max(1);
    let mut lines = Vec::new();
    let mut current = String::new();
    let mut current_len = 0usize;

    for word in text.split_whitespace() {
        let mut word: Vec<char> = word.chars().collect();
        let needed = if current_len == 0 { word.len() } else { current_len + 1 + word.len() };
        if needed <= width {
            if current_len > 0 {
                current.push(' ');
                current_len += 1;
            }
            current.extend(word.iter());
            current_len += word.len();
            continue;
        }

        if current_len > 0 {
            lines.push(std::mem::take(&mut current));
        }
        while word.len() > width {
            let rest = word.split_off(width);
            lines.push(word.into_iter().collect());
            word = rest;
        }
        current_len = word.len();
        current = word.into_iter().collect();
    }

    if current_len > 0 || lines.is_empty() {
        lines.push(current);
    }
    lines
}

fn centered_rect(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    let x = area.x + (area.width.saturating_sub(width)) / 2;
    let y = area.y + (area.height.saturating_sub(height)) / 2;
    Rect::new(x, y, width, height)
}

fn draw_helper_modal(frame: &mut Frame<'_>, area: Rect, app: &mut App) {
    let Some(content) = app.helper.content() else {
        return;
    };

    let mut lines: Vec<Line> = content
        .lines
        .iter()
        .map(|line| Line::from(format!(" {} ", line)))
        .collect();
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        format!(" {} ", HELPER_MODAL_FOOTER),
        header_text_style(app),
    )));

    let title_line = Line::from(Span::styled(
        format!(" {} ", content.title.to_uppercase()),
        header_text_style(app),
    ));
    let body = Text::from(lines);
    let width = (body.width().max(title_line.width()) as u16).saturating_add(2);
    let height = (body.height() as u16).saturating_add(2);
    app.modal_area = Some(centered_rect(area, width, height));

    let popup = Popup::new(body)
        .title(title_line)
        .border_style(border_style(app));

    frame.render_stateful_widget_ref(popup, area, &mut app.modal_popup);
}

fn draw_birthdays_modal(frame: &mut Frame<'_>, area: Rect, app: &mut App) {
    let Some(modal) = app.birthdays_modal.as_ref() else {
        return;
    };

    let header_style = header_text_style(app);
    let border_s = border_style(app);

    let mut lines: Vec<Line> = Vec::new();
    if modal.entries.is_empty() {
        lines.push(Line::from(format!(
            "No birthdays in the next {} days",
            modal.days
        )));
    }
    let name_width = modal
        .entries
        .iter()
        .map(|entry| entry.name.chars().count())
        .max()
        .unwrap_or(0);
    for entry in &modal.entries {
        let when = birthdays::describe_days(entry.days_until);
        lines.push(Line::from(vec![
            Span::raw(format!("{:<width$}  ", entry.name, width = name_width)),
            Span::raw(format!("{:<12}", format::format_date(&entry.birthday))),
            Span::styled(when, header_style),
        ]));
    }

    let title = Line::from(Span::styled(
        format!(" UPCOMING BIRTHDAYS ({} DAYS) ", modal.days),
        header_style,
    ));
    let widest = lines.iter().map(|line| line.width()).max().unwrap_or(0) as u16;
    let width = (widest + 4).max(SCROLL_MODAL_FOOTER.len() as u16 + 6).max(40);
    let height = (lines.len() as u16 + 2).max(5).min(area.height.saturating_mul(4) / 5);
    let modal_area = centered_rect(area, width, height);
    let viewport_height = modal_area.height.saturating_sub(2) as usize;

    let Some(modal) = app.birthdays_modal.as_mut() else {
        return;
    };
    modal.scroll.total_lines = lines.len();
    modal.scroll.viewport_height = viewport_height;
    let max_scroll = lines.len().saturating_sub(viewport_height);
    modal.scroll.scroll = modal.scroll.scroll.min(max_scroll);
    let scroll = modal.scroll.scroll;
    app.modal_area = Some(modal_area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(border_s)
        .title(title)
        .title_bottom(Line::from(Span::styled(
            format!(" {} ", SCROLL_MODAL_FOOTER),
            header_style,
        )))
        .title_alignment(Alignment::Center);

    let visible: Vec<Line> = lines.into_iter().skip(scroll).take(viewport_height).collect();
    frame.render_widget(Clear, modal_area);
    frame.render_widget(Paragraph::new(visible).block(block), modal_area);
}

fn draw_help_modal(frame: &mut Frame<'_>, area: Rect, app: &mut App) {
    if app.help_modal.is_none() {
        return;
    }

    // Calculate modal size: 2/3 width, 80% height
    let width = area.width.saturating_mul(2).saturating_div(3).max(40).min(area.width);
    let height = area.height.saturating_mul(4).saturating_div(5).max(10).min(area.height);
    let modal_area = centered_rect(area, width, height);

    frame.render_widget(Clear, modal_area);

    // Get styles before any mutable borrows
    let header_style = header_text_style(app);
    let border_s = border_style(app);

    let sections = app.help_entries();
    let mut lines: Vec<Line> = Vec::new();

    let content_width = width.saturating_sub(4) as usize;
    let action_width = 20usize;

    for (section_idx, section) in sections.iter().enumerate() {
        let header_text = format!(" {} ", section.title);
        let padding_total = content_width.saturating_sub(header_text.len());
        let left_pad = padding_total / 2;
        let right_pad = padding_total - left_pad;
        let header_line = format!(
            "{}{}{}",
            LINE.horizontal.to_string().repeat(left_pad),
            header_text,
            LINE.horizontal.to_string().repeat(right_pad)
        );
        lines.push(Line::from(Span::styled(header_line, header_style)));

        for entry in &section.entries {
            let action = format!("{:<width$}", entry.action, width = action_width);
            lines.push(Line::from(vec![
                Span::styled(action, Style::default()),
                Span::styled(entry.keys.clone(), header_style),
            ]));
        }

        if section_idx < sections.len() - 1 {
            lines.push(Line::from(""));
        }
    }

    let total_lines = lines.len();
    // borders (2) + footer line (1)
    let inner_height = height.saturating_sub(3) as usize;

    let Some(modal) = app.help_modal.as_mut() else {
        return;
    };
    modal.total_lines = total_lines;
    modal.viewport_height = inner_height;

    let max_scroll = modal.total_lines.saturating_sub(modal.viewport_height);
    if modal.scroll > max_scroll {
        modal.scroll = max_scroll;
    }

    let scroll = modal.scroll;
    let viewport_height = modal.viewport_height;
    let scroll_indicator = match (modal.can_scroll_up(), modal.can_scroll_down()) {
        (true, true) => "▲▼",
        (true, false) => "▲ ",
        (false, true) => " ▼",
        (false, false) => "  ",
    };
    app.modal_area = Some(modal_area);

    let visible_lines: Vec<Line> = lines
        .into_iter()
        .skip(scroll)
        .take(viewport_height)
        .collect();

    let title = Line::from(vec![
        Span::styled(" HELP ", header_style),
        Span::styled(scroll_indicator, header_style),
    ]);
    let footer = Line::from(Span::styled(
        format!(" {} ", SCROLL_MODAL_FOOTER),
        header_style,
    ));

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(border_s)
        .title(title)
        .title_bottom(footer)
        .title_alignment(Alignment::Center);

    let inner = block.inner(modal_area);
    frame.render_widget(block, modal_area);
    frame.render_widget(Paragraph::new(visible_lines), inner);
}

fn draw_footer(frame: &mut Frame<'_>, area: Rect, app: &App) {
    let message: String = if app.helper.is_open() {
        HELPER_MODAL_FOOTER.to_string()
    } else if app.help_modal.is_some() || app.birthdays_modal.is_some() {
        SCROLL_MODAL_FOOTER.to_string()
    } else if app.book().is_none() {
        UNAVAILABLE_HELP.to_string()
    } else if app.search_focus == SearchFocus::Input {
        SEARCH_HELP_INPUT.to_string()
    } else if let Some(status) = &app.status {
        status.clone()
    } else {
        let email = app
            .selected_contact()
            .and_then(|contact| contact.email.as_deref())
            .map(EmailLink::new);
        match email {
            Some(link) => format!("{}  {}", link.href, TABLE_HELP),
            None => TABLE_HELP.to_string(),
        }
    };
    let colors = app.ui_colors();
    let style = Style::default()
        .fg(color(colors.status_fg))
        .bg(color(colors.status_bg));

    let background = Block::default().style(Style::default().bg(color(colors.status_bg)));
    frame.render_widget(background, area);

    frame.render_widget(Paragraph::new(message).style(style), area);
}

fn selection_style(app: &App) -> Style {
    let colors = app.ui_colors();
    Style::default()
        .fg(color(colors.selection_fg))
        .bg(color(colors.selection_bg))
}

fn border_style(app: &App) -> Style {
    let colors = app.ui_colors();
    Style::default().fg(color(colors.border))
}

fn header_text_style(app: &App) -> Style {
    let colors = app.ui_colors();
    Style::default().fg(color(colors.separator))
}

fn separator_style(app: &App) -> Style {
    let colors = app.ui_colors();
    Style::default().fg(color(colors.separator))
}

/// Render a header line with a separator below it.
/// `area` is the inner content area for the header.
/// `outer_width` is the full pane width (including borders) for drawing connected separators.
fn render_header_with_separator(
    frame: &mut Frame<'_>,
    area: Rect,
    content: Line<'static>,
    app: &App,
    outer_width: u16,
) {
    if area.width == 0 || area.height == 0 {
        return;
    }

    if area.height == 1 {
        frame.render_widget(Paragraph::new(content), area);
        return;
    }

    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Length(1)])
        .split(area);

    frame.render_widget(Paragraph::new(content), layout[0]);

    // Build separator with connector characters: ├───┤
    let inner_width = outer_width.saturating_sub(2) as usize;
    let separator = format!(
        "{}{}{}",
        LINE.vertical_right,
        LINE.horizontal.to_string().repeat(inner_width),
        LINE.vertical_left
    );
    let separator_line = Line::from(Span::styled(separator, separator_style(app)));

    // Shifted left by 1 to start at the border
    let separator_area = Rect {
        x: layout[1].x.saturating_sub(1),
        y: layout[1].y,
        width: outer_width,
        height: 1,
    };
    frame.render_widget(Paragraph::new(separator_line), separator_area);
}

fn color(rgb: RgbColor) -> Color {
    Color::Rgb(rgb.r, rgb.g, rgb.b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrap_text_breaks_on_words() {
        assert_eq!(
            wrap_text("call back after the meeting", 10),
            vec!["call back", "after the", "meeting"]
        );
    }

    #[test]
    fn test_wrap_text_splits_long_words() {
        assert_eq!(wrap_text("abcdefghij xy", 4), vec!["abcd", "efgh", "ij", "xy"]);
    }

    #[test]
    fn test_wrap_text_flushes_before_long_word() {
        assert_eq!(wrap_text("ab cdefgh", 4), vec!["ab", "cdef", "gh"]);
    }

    #[test]
    fn test_column_titles_fit_fixed_widths() {
        assert_eq!(COLUMN_TITLES[6], "ACTIONS");
        for (title, width) in COLUMN_TITLES.iter().zip(COLUMN_WIDTHS) {
            if let Constraint::Length(width) = width {
                assert!(title.len() <= width as usize, "{} is wider than {}", title, width);
            }
        }
    }

    #[test]
    fn test_wrap_text_empty() {
        assert_eq!(wrap_text("", 10), vec![String::new()]);
    }

    #[test]
    fn test_centered_rect_clamps_to_area() {
        let area = Rect::new(0, 0, 30, 10);
        assert_eq!(centered_rect(area, 10, 4), Rect::new(10, 3, 10, 4));
        assert_eq!(centered_rect(area, 50, 20), area);
    }
}
