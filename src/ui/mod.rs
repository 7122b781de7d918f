use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame,
};

use crate::adjust::{format_value, Binding, ControlKind, FormId};
use crate::app::{App, Popup, Row, Section};
use crate::theme::Theme;

/// Width of the quantity field box, in characters
const FIELD_WIDTH: usize = 8;

pub fn draw(f: &mut Frame, app: &App) {
    let area = f.area();

    // Notices box only takes room while something is unresolved
    let notices_height = if app.notices.is_empty() {
        0
    } else {
        app.notices.len().min(4) as u16 + 2
    };

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),               // Info line
            Constraint::Length(notices_height),  // Notices
            Constraint::Min(4),                  // Stock cards
            Constraint::Length(1),               // Footer
        ])
        .split(area);

    draw_info_line(f, app, chunks[0]);
    if notices_height > 0 {
        draw_notices_box(f, app, chunks[1]);
    }
    draw_stock_box(f, app, chunks[2]);
    draw_footer(f, app, chunks[3]);

    match app.popup {
        Popup::None => {}
        Popup::Help => draw_help_popup(f, &app.theme),
        Popup::Confirm => draw_confirm_popup(f, app),
        Popup::Alert => draw_alert_popup(f, app),
    }
}

fn box_block<'a>(title: &'a str, active: bool, theme: &Theme) -> Block<'a> {
    let border_color = if active { theme.accent } else { theme.inactive };
    let title_style = if active {
        Style::default().fg(theme.accent).add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(theme.inactive)
    };

    Block::default()
        .title(Span::styled(title, title_style))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
}

fn draw_info_line(f: &mut Frame, app: &App, area: Rect) {
    let t = &app.theme;

    // Priority: note editing > flash message > hint
    let line = if app.editing_note {
        Line::from(vec![
            Span::styled("Editing note", Style::default().fg(t.accent)),
            Span::styled(" │ Enter/Esc to finish", Style::default().fg(t.text_dim)),
        ])
    } else if let Some(ref status) = app.status_message {
        Line::from(Span::styled(status, Style::default().fg(t.success)))
    } else {
        Line::from(Span::styled("Ready", Style::default().fg(t.text_dim)))
    };

    f.render_widget(Paragraph::new(line).alignment(Alignment::Center), area);
}

fn draw_notices_box(f: &mut Frame, app: &App, area: Rect) {
    let t = &app.theme;
    let is_active = app.section == Section::Notices;
    let block = box_block(" Notices ", is_active, t);

    let lines: Vec<Line> = app
        .notices
        .iter()
        .enumerate()
        .map(|(i, notice)| {
            let style = if is_active && i == app.selected_notice {
                Style::default().bg(t.bg_selected).fg(t.text)
            } else {
                Style::default()
            };
            Line::from(vec![
                Span::styled(" ⚠ ", Style::default().fg(t.warning)),
                Span::styled(notice.message(), Style::default().fg(t.text)),
            ])
            .style(style)
        })
        .collect();

    f.render_widget(Paragraph::new(lines).block(block), area);
}

fn draw_stock_box(f: &mut Frame, app: &App, area: Rect) {
    let t = &app.theme;
    let is_active = app.section == Section::Stock;
    let block = box_block(" Stock ", is_active, t);

    let rows = app.rows();
    let lines: Vec<Line> = rows
        .iter()
        .enumerate()
        .map(|(i, row)| {
            let selected = is_active && i == app.selected_row;
            match *row {
                Row::Category(c) => category_line(app, c, selected),
                Row::Item { form, .. } => card_line(app, form, selected),
            }
        })
        .collect();

    // Keep the selected row in view
    let inner_height = area.height.saturating_sub(2) as usize;
    let scroll = app.selected_row.saturating_sub(inner_height.saturating_sub(1));

    let content = Paragraph::new(lines)
        .block(block)
        .scroll((scroll as u16, 0));

    f.render_widget(content, area);
}

fn category_line(app: &App, index: usize, selected: bool) -> Line<'static> {
    let t = &app.theme;
    let Some(category) = app.categories.get(index) else {
        return Line::from("");
    };

    let arrow = if category.open { "▼" } else { "▶" };
    let style = if selected {
        Style::default().bg(t.bg_selected)
    } else {
        Style::default()
    };

    Line::from(vec![
        Span::styled(format!(" {} ", arrow), Style::default().fg(t.header)),
        Span::styled(category.name.clone(), Style::default().fg(t.header).add_modifier(Modifier::BOLD)),
        Span::styled(format!("  ({})", category.forms.len()), Style::default().fg(t.text_dim)),
    ])
    .style(style)
}

fn card_line(app: &App, form_id: FormId, selected: bool) -> Line<'static> {
    let t = &app.theme;
    let Some(form) = app.form(form_id) else {
        return Line::from("");
    };
    let field = app.adjuster.field(form_id).map(|f| f.text()).unwrap_or("");

    let mut spans = vec![
        Span::styled(format!("   {:<12}", form.name), Style::default().fg(t.text)),
        Span::styled(
            format!(
                "{:>7} {:<5}",
                format_value(form.current_quantity),
                form.unit
            ),
            Style::default().fg(if form.is_low_stock() { t.danger } else { t.text_dim }),
        ),
        Span::styled(" Δ[", Style::default().fg(t.text_dim)),
        Span::styled(
            format!("{:<width$}", field, width = FIELD_WIDTH),
            Style::default().fg(t.accent_bright).add_modifier(Modifier::BOLD),
        ),
        Span::styled("] ", Style::default().fg(t.text_dim)),
    ];

    let emphasized = app.adjuster.emphasized();
    for (i, binding) in app.controls(form_id).iter().enumerate() {
        spans.push(control_span(binding, selected && i == app.selected_control, emphasized == Some(binding.control), t));
        spans.push(Span::raw(" "));
    }

    let reason = form
        .reason
        .and_then(|i| app.reasons.get(i))
        .map(String::as_str)
        .unwrap_or("(reason)");
    spans.push(Span::styled(
        format!(" {}", reason),
        Style::default().fg(if form.reason.is_some() { t.text } else { t.text_dim }),
    ));

    if let Some(ref supplier) = form.supplier {
        spans.push(Span::styled(format!("  @{}", supplier), Style::default().fg(t.text_dim)));
    }

    if !form.note.is_empty() || (selected && app.editing_note) {
        spans.push(Span::styled(format!("  ✎ {}", form.note), Style::default().fg(t.text_dim)));
    }

    let style = if selected {
        Style::default().bg(t.bg_selected)
    } else if form.is_low_stock() {
        Style::default().bg(if app.blink_on { t.low_stock_alt } else { t.low_stock })
    } else {
        Style::default()
    };

    Line::from(spans).style(style)
}

fn control_span(binding: &Binding, selected: bool, emphasized: bool, t: &Theme) -> Span<'static> {
    let color = match binding.kind {
        ControlKind::QuickAdjust { step } if step < 0.0 => t.danger,
        ControlKind::QuickAdjust { .. } => t.success,
        ControlKind::Reset => t.text_dim,
    };

    let mut style = Style::default().fg(color);
    if selected {
        style = style.add_modifier(Modifier::REVERSED);
    }
    if emphasized {
        style = style.fg(t.accent_bright).add_modifier(Modifier::BOLD);
    }

    // Emphasis widens the button, standing in for the scale-up
    let label = control_label(&binding.kind);
    let text = if emphasized {
        format!("[ {} ]", label)
    } else {
        format!("[{}]", label)
    };
    Span::styled(text, style)
}

pub fn control_label(kind: &ControlKind) -> String {
    match *kind {
        ControlKind::QuickAdjust { step } if step > 0.0 => format!("+{}", format_value(step)),
        ControlKind::QuickAdjust { step } => format_value(step),
        ControlKind::Reset => "Reset".to_string(),
    }
}

fn draw_footer(f: &mut Frame, app: &App, area: Rect) {
    let t = &app.theme;
    let hints: Vec<(&str, &str)> = match app.section {
        Section::Stock => vec![
            ("↑↓", "Card"),
            ("←→", "Button"),
            ("Space", "Press"),
            ("0-9", "Type"),
            ("r", "Reason"),
            ("n", "Note"),
            ("s", "Submit"),
            ("?", "Help"),
        ],
        Section::Notices => vec![
            ("↑↓", "Nav"),
            ("x", "Resolve"),
            ("Tab", "Cards"),
            ("?", "Help"),
        ],
    };

    // Responsive: show fewer hints on narrow terminals
    let max_hints = if area.width < 60 { 4 } else if area.width < 80 { 6 } else { hints.len() };

    let hint_spans: Vec<Span> = hints
        .iter()
        .take(max_hints)
        .flat_map(|(key, action)| {
            vec![
                Span::styled(*key, Style::default().fg(t.accent)),
                Span::styled(format!(" {} │ ", action), Style::default().fg(t.text_dim)),
            ]
        })
        .collect();

    f.render_widget(Paragraph::new(Line::from(hint_spans)).alignment(Alignment::Center), area);
}

fn draw_help_popup(f: &mut Frame, t: &Theme) {
    let area = f.area();
    let popup_area = centered_rect(
        if area.width < 80 { 95 } else { 70 },
        if area.height < 30 { 95 } else { 70 },
        area
    );

    f.render_widget(Clear, popup_area);

    let heading = |s: &'static str| {
        Line::from(Span::styled(s, Style::default().fg(t.header).add_modifier(Modifier::BOLD)))
    };
    let entry = |key: &'static str, what: &'static str| {
        Line::from(vec![
            Span::styled(format!("  {:<10}", key), Style::default().fg(t.accent)),
            Span::raw(what),
        ])
    };

    let help_text = vec![
        heading("═══ Navigation ═══"),
        entry("Tab", "Switch between notices and stock cards"),
        entry("↑/↓ j/k", "Move between cards and category headers"),
        entry("←/→ h/l", "Move between a card's buttons"),
        entry("Enter", "Open/close a category (on its header)"),
        Line::from(""),
        heading("═══ Quantity ═══"),
        entry("Space", "Press the selected quick button or Reset"),
        entry("0-9 . -", "Type a quantity (first key replaces the field)"),
        entry("Backspace", "Delete the last character"),
        Line::from(""),
        heading("═══ Submitting ═══"),
        entry("r", "Cycle the reason"),
        entry("n", "Edit the note"),
        entry("s", "Submit the card"),
        Line::from(""),
        heading("═══ Notices ═══"),
        entry("x/Enter", "Mark the selected notice as resolved"),
        Line::from(""),
        Line::from(vec![
            Span::styled("  Press ", Style::default().fg(t.text_dim)),
            Span::styled("?", Style::default().fg(t.accent)),
            Span::styled("/", Style::default().fg(t.text_dim)),
            Span::styled("Esc", Style::default().fg(t.accent)),
            Span::styled(" to close, ", Style::default().fg(t.text_dim)),
            Span::styled("q", Style::default().fg(t.accent)),
            Span::styled(" to quit", Style::default().fg(t.text_dim)),
        ]),
    ];

    let help = Paragraph::new(help_text)
        .block(
            Block::default()
                .title(Span::styled(" zaiko Help ", Style::default().fg(t.accent)))
                .borders(Borders::ALL)
                .border_style(Style::default().fg(t.accent)),
        )
        .wrap(Wrap { trim: false });

    f.render_widget(help, popup_area);
}

fn draw_confirm_popup(f: &mut Frame, app: &App) {
    let t = &app.theme;
    let popup_area = centered_rect(50, 25, f.area());

    f.render_widget(Clear, popup_area);

    let item = app
        .notices
        .get(app.selected_notice)
        .map(|n| n.item.clone())
        .unwrap_or_default();

    let confirm = Paragraph::new(vec![
        Line::from(""),
        Line::from(Span::styled("Mark this notice as resolved?", Style::default().fg(t.warning))),
        Line::from(Span::styled(item, Style::default().fg(t.text))),
        Line::from(""),
        Line::from(vec![
            Span::styled("  y", Style::default().fg(t.success).add_modifier(Modifier::BOLD)),
            Span::raw(" Yes   "),
            Span::styled("n", Style::default().fg(t.danger).add_modifier(Modifier::BOLD)),
            Span::raw(" No"),
        ]),
    ])
    .block(
        Block::default()
            .title(Span::styled(" Confirm ", Style::default().fg(t.warning)))
            .borders(Borders::ALL)
            .border_style(Style::default().fg(t.warning)),
    )
    .alignment(Alignment::Center);

    f.render_widget(confirm, popup_area);
}

fn draw_alert_popup(f: &mut Frame, app: &App) {
    let t = &app.theme;
    let popup_area = centered_rect(40, 30, f.area());

    f.render_widget(Clear, popup_area);

    let message = app.alert_message.as_deref().unwrap_or("");

    let alert = Paragraph::new(vec![
        Line::from(""),
        Line::from(Span::styled(message, Style::default().fg(t.danger))),
        Line::from(""),
        Line::from(Span::styled("Enter to close", Style::default().fg(t.text_dim))),
    ])
    .block(
        Block::default()
            .title(Span::styled(" Check the form ", Style::default().fg(t.danger)))
            .borders(Borders::ALL)
            .border_style(Style::default().fg(t.danger)),
    )
    .alignment(Alignment::Center);

    f.render_widget(alert, popup_area);
}

fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
    use ratatui::{backend::TestBackend, Terminal};

    fn render(app: &App) -> String {
        let mut terminal = Terminal::new(TestBackend::new(140, 24)).unwrap();
        terminal.draw(|f| draw(f, app)).unwrap();
        let buffer = terminal.backend().buffer();
        buffer
            .content()
            .chunks(buffer.area.width as usize)
            .map(|row| row.iter().map(|c| c.symbol()).collect::<String>())
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[test]
    fn test_control_labels() {
        assert_eq!(control_label(&ControlKind::QuickAdjust { step: 0.5 }), "+0.5");
        assert_eq!(control_label(&ControlKind::QuickAdjust { step: -10.0 }), "-10");
        assert_eq!(control_label(&ControlKind::Reset), "Reset");
    }

    #[test]
    fn test_renders_cards_notices_and_field() {
        let mut app = App::new(&AppConfig::default()).unwrap();
        app.handle_key(KeyEvent::new(KeyCode::Char('7'), KeyModifiers::NONE));

        let screen = render(&app);
        assert!(screen.contains("Onion"));
        assert!(screen.contains("Δ[7"));
        assert!(screen.contains("[+0.5]"));
        assert!(screen.contains("[Reset]"));
        assert!(screen.contains("Milk is running low"));
        // Dairy is collapsed, so its cards are not listed
        assert!(screen.contains("Dairy"));
        assert!(!screen.contains("Butter"));
    }

    #[test]
    fn test_renders_alert_popup() {
        let mut app = App::new(&AppConfig::default()).unwrap();
        app.handle_key(KeyEvent::new(KeyCode::Char('s'), KeyModifiers::NONE));

        let screen = render(&app);
        assert!(screen.contains("Enter a quantity"));
    }
}
