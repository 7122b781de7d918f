use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent};
use std::time::{Duration, Instant};

use crate::adjust::{Binding, ControlId, FormId, QuantityAdjuster};
use crate::config::AppConfig;
use crate::stock::{bind_page, NoticeBoard, StockForm, Submission};
use crate::theme::Theme;

/// Low-stock cards alternate their tint at this interval
const BLINK_INTERVAL: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    Notices,
    Stock,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Popup {
    None,
    Help,
    Confirm,  // Resolve the selected notice?
    Alert,    // Submit-time validation hint
}

/// A line of the stock list as currently visible
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Row {
    Category(usize),
    Item { category: usize, form: FormId },
}

/// Accordion section of item cards
#[derive(Debug, Clone)]
pub struct Category {
    pub name: String,
    pub forms: Vec<FormId>,
    pub open: bool,
}

pub struct App {
    pub section: Section,
    pub popup: Popup,
    pub theme: Theme,

    pub categories: Vec<Category>,
    pub forms: Vec<StockForm>,       // Indexed by FormId
    pub adjuster: QuantityAdjuster,
    pub reasons: Vec<String>,
    pub notices: NoticeBoard,

    // Selection
    pub selected_row: usize,
    pub selected_control: usize,     // Position within the selected card's controls
    pub selected_notice: usize,

    // Typing
    pub replace_on_type: bool,       // First keystroke after focusing a card replaces the field
    pub editing_note: bool,

    pub alert_message: Option<String>,

    // Flash message (auto-clears after flash_duration)
    pub status_message: Option<String>,
    pub status_message_time: Option<Instant>,
    pub flash_duration: Duration,

    // Low-stock highlight
    pub blink_on: bool,
    pub last_blink: Instant,

    /// Handed to the server side when the session ends
    pub submissions: Vec<Submission>,
}

impl App {
    pub fn new(config: &AppConfig) -> Result<Self> {
        config.validate()?;

        let (forms, bindings) = bind_page(config);

        let mut next = 0;
        let categories = config
            .categories
            .iter()
            .enumerate()
            .map(|(i, c)| {
                let ids = (next..next + c.items.len()).map(FormId).collect();
                next += c.items.len();
                Category {
                    name: c.name.clone(),
                    forms: ids,
                    open: i == 0,  // Only the first category starts open
                }
            })
            .collect();

        let mut app = Self {
            section: Section::Stock,
            popup: Popup::None,
            theme: Theme::from_config(&config.theme),

            categories,
            forms,
            adjuster: QuantityAdjuster::new(bindings),
            reasons: config.reasons.clone(),
            notices: NoticeBoard::new(&config.notices),

            selected_row: 0,
            selected_control: 0,
            selected_notice: 0,

            replace_on_type: true,
            editing_note: false,

            alert_message: None,

            status_message: None,
            status_message_time: None,
            flash_duration: Duration::from_secs(config.flash_secs),

            blink_on: false,
            last_blink: Instant::now(),

            submissions: Vec::new(),
        };

        // Land on the first card rather than its header
        if let Some(pos) = app.rows().iter().position(|r| matches!(r, Row::Item { .. })) {
            app.selected_row = pos;
        }

        tracing::info!(
            "Page ready: {} categories, {} cards, {} notices",
            app.categories.len(),
            app.forms.len(),
            app.notices.len()
        );
        Ok(app)
    }

    /// Set a flash message (auto-clears after `flash_duration`)
    fn set_status(&mut self, msg: impl Into<String>, now: Instant) {
        self.status_message = Some(msg.into());
        self.status_message_time = Some(now);
    }

    pub fn rows(&self) -> Vec<Row> {
        let mut rows = Vec::new();
        for (i, category) in self.categories.iter().enumerate() {
            rows.push(Row::Category(i));
            if category.open {
                rows.extend(category.forms.iter().map(|&form| Row::Item { category: i, form }));
            }
        }
        rows
    }

    pub fn selected_form(&self) -> Option<FormId> {
        match self.rows().get(self.selected_row) {
            Some(Row::Item { form, .. }) => Some(*form),
            _ => None,
        }
    }

    pub fn form(&self, form: FormId) -> Option<&StockForm> {
        self.forms.get(form.0)
    }

    /// Controls of a card, in display order
    pub fn controls(&self, form: FormId) -> Vec<Binding> {
        let bindings = self.adjuster.bindings();
        bindings
            .controls_for(form)
            .iter()
            .filter_map(|&c| bindings.resolve(c).copied())
            .collect()
    }

    pub fn selected_control_id(&self) -> Option<ControlId> {
        let form = self.selected_form()?;
        self.adjuster
            .bindings()
            .controls_for(form)
            .get(self.selected_control)
            .copied()
    }

    /// Whether keys currently go into a text field (so 'q' must not quit)
    pub fn captures_text(&self) -> bool {
        self.editing_note || self.popup != Popup::None
    }

    pub fn handle_key(&mut self, key: KeyEvent) {
        self.handle_key_at(key, Instant::now());
    }

    pub fn handle_key_at(&mut self, key: KeyEvent, now: Instant) {
        if self.popup != Popup::None {
            self.handle_popup_key(key, now);
            return;
        }

        if self.editing_note {
            self.handle_note_key(key);
            return;
        }

        match key.code {
            KeyCode::Tab | KeyCode::BackTab => {
                self.section = match self.section {
                    Section::Stock if !self.notices.is_empty() => Section::Notices,
                    _ => Section::Stock,
                };
            }
            KeyCode::Char('?') => self.popup = Popup::Help,
            _ => match self.section {
                Section::Stock => self.handle_stock_key(key, now),
                Section::Notices => self.handle_notice_key(key),
            },
        }
    }

    fn handle_stock_key(&mut self, key: KeyEvent, now: Instant) {
        match key.code {
            KeyCode::Char('j') | KeyCode::Down => self.move_row(1),
            KeyCode::Char('k') | KeyCode::Up => self.move_row(-1),
            KeyCode::Char('h') | KeyCode::Left => self.move_control(-1),
            KeyCode::Char('l') | KeyCode::Right => self.move_control(1),

            KeyCode::Enter | KeyCode::Char(' ') => self.activate_selected(now),

            KeyCode::Char(c) if c.is_ascii_digit() || matches!(c, '.' | '-' | '+') => {
                self.type_char(c);
            }
            KeyCode::Backspace => {
                if let Some(field) = self.selected_form().and_then(|f| self.adjuster.field_mut(f)) {
                    field.pop_char();
                }
                self.replace_on_type = false;
            }

            KeyCode::Char('r') => {
                let count = self.reasons.len();
                if let Some(form) = self.selected_form() {
                    self.forms[form.0].cycle_reason(count);
                }
            }
            KeyCode::Char('n') => {
                if self.selected_form().is_some() {
                    self.editing_note = true;
                }
            }
            KeyCode::Char('s') => self.submit_selected(now),

            _ => {}
        }
    }

    fn handle_note_key(&mut self, key: KeyEvent) {
        let Some(form) = self.selected_form() else {
            self.editing_note = false;
            return;
        };
        let note = &mut self.forms[form.0].note;

        match key.code {
            KeyCode::Enter | KeyCode::Esc => self.editing_note = false,
            KeyCode::Backspace => {
                note.pop();
            }
            KeyCode::Char(c) => note.push(c),
            _ => {}
        }
    }

    fn handle_notice_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('j') | KeyCode::Down => {
                if !self.notices.is_empty() {
                    self.selected_notice = (self.selected_notice + 1) % self.notices.len();
                }
            }
            KeyCode::Char('k') | KeyCode::Up => {
                if !self.notices.is_empty() {
                    self.selected_notice = self
                        .selected_notice
                        .checked_sub(1)
                        .unwrap_or(self.notices.len() - 1);
                }
            }
            KeyCode::Enter | KeyCode::Char(' ') | KeyCode::Char('x') => {
                if self.notices.get(self.selected_notice).is_some() {
                    self.popup = Popup::Confirm;
                }
            }
            _ => {}
        }
    }

    fn handle_popup_key(&mut self, key: KeyEvent, now: Instant) {
        match self.popup {
            Popup::Help => {
                if matches!(key.code, KeyCode::Esc | KeyCode::Char('?') | KeyCode::Enter | KeyCode::Char('q')) {
                    self.popup = Popup::None;
                }
            }
            Popup::Confirm => match key.code {
                KeyCode::Char('y') | KeyCode::Enter => {
                    self.resolve_selected_notice(now);
                    self.popup = Popup::None;
                }
                KeyCode::Char('n') | KeyCode::Esc => self.popup = Popup::None,
                _ => {}
            },
            Popup::Alert => {
                if matches!(key.code, KeyCode::Esc | KeyCode::Enter | KeyCode::Char(' ')) {
                    self.popup = Popup::None;
                    self.alert_message = None;
                }
            }
            Popup::None => {}
        }
    }

    fn move_row(&mut self, delta: isize) {
        let len = self.rows().len();
        if len == 0 {
            return;
        }
        let next = (self.selected_row as isize + delta).rem_euclid(len as isize) as usize;
        if next != self.selected_row {
            self.selected_row = next;
            self.selected_control = 0;
            self.replace_on_type = true;
        }
    }

    fn move_control(&mut self, delta: isize) {
        let Some(form) = self.selected_form() else { return };
        let len = self.adjuster.bindings().controls_for(form).len();
        if len == 0 {
            return;
        }
        self.selected_control = (self.selected_control as isize + delta).rem_euclid(len as isize) as usize;
    }

    /// Enter on a header toggles the accordion; on a card it fires the selected control
    fn activate_selected(&mut self, now: Instant) {
        match self.rows().get(self.selected_row).copied() {
            Some(Row::Category(i)) => self.toggle_category(i),
            Some(Row::Item { .. }) => {
                if let Some(control) = self.selected_control_id() {
                    self.adjuster.activate(control, now);
                    self.replace_on_type = false;
                }
            }
            None => {}
        }
    }

    pub fn toggle_category(&mut self, index: usize) {
        if let Some(category) = self.categories.get_mut(index) {
            category.open = !category.open;
            tracing::debug!("Category '{}' open: {}", category.name, category.open);
        }
        let len = self.rows().len();
        if self.selected_row >= len {
            self.selected_row = len.saturating_sub(1);
        }
    }

    fn type_char(&mut self, c: char) {
        let replace = self.replace_on_type;
        if let Some(field) = self.selected_form().and_then(|f| self.adjuster.field_mut(f)) {
            if replace {
                field.clear();
            }
            field.push_char(c);
            self.replace_on_type = false;
        }
    }

    fn submit_selected(&mut self, now: Instant) {
        let Some(form_id) = self.selected_form() else { return };
        let Some(field) = self.adjuster.field(form_id) else { return };

        match self.forms[form_id.0].validate(field, &self.reasons) {
            Ok(submission) => {
                tracing::info!(
                    "Submitted {} {} for item {} ({})",
                    submission.quantity_delta,
                    submission.unit,
                    submission.item_id,
                    submission.reason
                );
                self.set_status(submission.summary(), now);
                self.submissions.push(submission);

                // Same as the page coming back after the form posts
                self.adjuster.clear_form(form_id);
                let form = &mut self.forms[form_id.0];
                form.reason = None;
                form.note.clear();
                self.replace_on_type = true;
            }
            Err(e) => {
                tracing::debug!("Submit blocked for form {:?}: {}", form_id, e);
                self.alert_message = Some(e.to_string());
                self.popup = Popup::Alert;
            }
        }
    }

    fn resolve_selected_notice(&mut self, now: Instant) {
        if let Some(notice) = self.notices.resolve(self.selected_notice) {
            tracing::info!("Resolved notice for {}", notice.item);
            self.set_status(format!("Notice for {} resolved", notice.item), now);
        }
        if self.selected_notice >= self.notices.len() {
            self.selected_notice = self.notices.len().saturating_sub(1);
        }
        if self.notices.is_empty() {
            self.section = Section::Stock;
        }
    }

    pub fn tick(&mut self) {
        self.tick_at(Instant::now());
    }

    pub fn tick_at(&mut self, now: Instant) {
        self.adjuster.expire_emphasis(now);

        if let Some(time) = self.status_message_time {
            if now.saturating_duration_since(time) >= self.flash_duration {
                self.status_message = None;
                self.status_message_time = None;
            }
        }

        if now.saturating_duration_since(self.last_blink) >= BLINK_INTERVAL {
            self.blink_on = !self.blink_on;
            self.last_blink = now;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyModifiers;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn press(app: &mut App, codes: &[KeyCode], now: Instant) {
        for &code in codes {
            app.handle_key_at(key(code), now);
        }
    }

    fn field_text(app: &App, form: FormId) -> String {
        app.adjuster.field(form).unwrap().text().to_string()
    }

    /// Move the control cursor onto the control with this step
    fn select_step(app: &mut App, step: f64) {
        let form = app.selected_form().unwrap();
        app.selected_control = app
            .controls(form)
            .iter()
            .position(|b| b.kind == crate::adjust::ControlKind::QuickAdjust { step })
            .unwrap();
    }

    fn select_reset(app: &mut App) {
        let form = app.selected_form().unwrap();
        app.selected_control = app.controls(form).len() - 1;
    }

    #[test]
    fn test_starts_on_first_card_with_first_category_open() {
        let app = App::new(&AppConfig::default()).unwrap();
        assert_eq!(app.selected_form(), Some(FormId(0)));
        assert!(app.categories[0].open);
        assert!(!app.categories[1].open);
        assert_eq!(app.rows().len(), 3 + 2);
    }

    #[test]
    fn test_rejects_invalid_layout() {
        let mut config = AppConfig::default();
        config.reasons.clear();
        assert!(App::new(&config).is_err());
    }

    #[test]
    fn test_quick_adjust_scenario() {
        let mut app = App::new(&AppConfig::default()).unwrap();
        let now = Instant::now();
        let form = app.selected_form().unwrap();

        select_step(&mut app, 1.0);
        press(&mut app, &[KeyCode::Enter], now);
        assert_eq!(field_text(&app, form), "1");

        select_step(&mut app, 0.5);
        press(&mut app, &[KeyCode::Enter], now);
        assert_eq!(field_text(&app, form), "1.5");

        select_step(&mut app, -1.0);
        press(&mut app, &[KeyCode::Enter, KeyCode::Enter], now);
        assert_eq!(field_text(&app, form), "-0.5");

        select_reset(&mut app);
        press(&mut app, &[KeyCode::Char(' ')], now);
        assert_eq!(field_text(&app, form), "");
    }

    #[test]
    fn test_adjusting_one_card_leaves_the_other_alone() {
        let mut app = App::new(&AppConfig::default()).unwrap();
        let now = Instant::now();

        select_step(&mut app, 10.0);
        press(&mut app, &[KeyCode::Enter], now);
        press(&mut app, &[KeyCode::Down], now);
        select_step(&mut app, -0.5);
        press(&mut app, &[KeyCode::Enter], now);

        assert_eq!(field_text(&app, FormId(0)), "10");
        assert_eq!(field_text(&app, FormId(1)), "-0.5");

        select_reset(&mut app);
        press(&mut app, &[KeyCode::Enter], now);
        assert_eq!(field_text(&app, FormId(0)), "10");
        assert_eq!(field_text(&app, FormId(1)), "");
    }

    #[test]
    fn test_typing_replaces_on_focus_then_appends() {
        let mut app = App::new(&AppConfig::default()).unwrap();
        let now = Instant::now();
        let form = app.selected_form().unwrap();

        select_step(&mut app, 1.0);
        press(&mut app, &[KeyCode::Enter], now);
        // Leave and come back: the next keystroke replaces "1"
        press(&mut app, &[KeyCode::Down, KeyCode::Up], now);
        press(&mut app, &[KeyCode::Char('2'), KeyCode::Char('.'), KeyCode::Char('5')], now);
        assert_eq!(field_text(&app, form), "2.5");

        press(&mut app, &[KeyCode::Backspace], now);
        assert_eq!(field_text(&app, form), "2.");
    }

    #[test]
    fn test_typed_garbage_reads_as_zero_on_next_step() {
        let mut app = App::new(&AppConfig::default()).unwrap();
        let now = Instant::now();
        let form = app.selected_form().unwrap();

        app.adjuster.field_mut(form).unwrap().set_text("abc");
        app.replace_on_type = false;
        select_step(&mut app, 1.0);
        press(&mut app, &[KeyCode::Enter, KeyCode::Enter, KeyCode::Enter], now);
        assert_eq!(field_text(&app, form), "3");
    }

    #[test]
    fn test_submit_requires_quantity_and_reason() {
        let mut app = App::new(&AppConfig::default()).unwrap();
        let now = Instant::now();

        press(&mut app, &[KeyCode::Char('s')], now);
        assert_eq!(app.popup, Popup::Alert);
        assert_eq!(app.alert_message.as_deref(), Some("Enter a quantity"));
        press(&mut app, &[KeyCode::Esc], now);
        assert_eq!(app.popup, Popup::None);

        press(&mut app, &[KeyCode::Char('3'), KeyCode::Char('s')], now);
        assert_eq!(app.alert_message.as_deref(), Some("Select a reason"));
        press(&mut app, &[KeyCode::Enter], now);
        assert!(app.submissions.is_empty());
    }

    #[test]
    fn test_successful_submit_clears_the_form() {
        let mut app = App::new(&AppConfig::default()).unwrap();
        let now = Instant::now();
        let form = app.selected_form().unwrap();

        press(&mut app, &[KeyCode::Char('-'), KeyCode::Char('2'), KeyCode::Char('r')], now);
        press(&mut app, &[KeyCode::Char('n'), KeyCode::Char('q'), KeyCode::Enter], now);
        assert_eq!(app.forms[form.0].note, "q");
        press(&mut app, &[KeyCode::Char('s')], now);

        assert_eq!(app.popup, Popup::None);
        assert_eq!(app.submissions.len(), 1);
        assert_eq!(app.submissions[0].quantity_delta, -2.0);
        assert_eq!(app.submissions[0].reason, "Received");
        assert_eq!(app.status_message.as_deref(), Some("Stock updated (change: -2 kg)"));
        assert_eq!(field_text(&app, form), "");
        assert_eq!(app.forms[form.0].reason, None);
        assert!(app.forms[form.0].note.is_empty());
    }

    #[test]
    fn test_accordion_toggles_on_header() {
        let mut app = App::new(&AppConfig::default()).unwrap();
        let now = Instant::now();

        // Header of "Dairy" is the row after the open Vegetables cards
        app.selected_row = 3;
        assert_eq!(app.rows()[3], Row::Category(1));
        press(&mut app, &[KeyCode::Enter], now);
        assert!(app.categories[1].open);
        assert_eq!(app.rows().len(), 7);

        press(&mut app, &[KeyCode::Enter], now);
        assert!(!app.categories[1].open);
        assert_eq!(app.rows().len(), 5);
    }

    #[test]
    fn test_resolving_a_notice_asks_first() {
        let mut app = App::new(&AppConfig::default()).unwrap();
        let now = Instant::now();

        press(&mut app, &[KeyCode::Tab], now);
        assert_eq!(app.section, Section::Notices);

        press(&mut app, &[KeyCode::Enter], now);
        assert_eq!(app.popup, Popup::Confirm);
        press(&mut app, &[KeyCode::Char('n')], now);
        assert_eq!(app.notices.len(), 1);

        press(&mut app, &[KeyCode::Char('x'), KeyCode::Char('y')], now);
        assert!(app.notices.is_empty());
        assert_eq!(app.section, Section::Stock);
        assert_eq!(app.status_message.as_deref(), Some("Notice for Milk resolved"));
    }

    #[test]
    fn test_tick_expires_flash_emphasis_and_blinks() {
        let mut app = App::new(&AppConfig::default()).unwrap();
        let start = app.last_blink;

        select_step(&mut app, 1.0);
        press(&mut app, &[KeyCode::Enter], start);
        app.set_status("hello", start);
        assert!(app.adjuster.emphasized().is_some());

        app.tick_at(start + Duration::from_millis(250));
        assert!(app.adjuster.emphasized().is_none());
        assert!(app.status_message.is_some());
        assert!(!app.blink_on);

        app.tick_at(start + Duration::from_secs(3));
        assert!(app.status_message.is_none());
        assert!(app.blink_on);
    }

    #[test]
    fn test_q_is_text_while_editing_note() {
        let mut app = App::new(&AppConfig::default()).unwrap();
        press(&mut app, &[KeyCode::Char('n')], Instant::now());
        assert!(app.captures_text());
    }
}
