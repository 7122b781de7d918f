pub mod form;

pub use form::{StockForm, Submission};

use crate::adjust::{format_value, Bindings, FormId};
use crate::config::{AppConfig, NoticeConfig};

/// Setup step: one form per item card, in page order, and the bindings of
/// every card's quick-adjust and reset controls to that form.
pub fn bind_page(config: &AppConfig) -> (Vec<StockForm>, Bindings) {
    let items: Vec<_> = config.items().collect();

    let forms = items
        .iter()
        .enumerate()
        .map(|(i, item)| StockForm::from_item(FormId(i), item))
        .collect();

    let bindings = Bindings::build(
        items
            .iter()
            .enumerate()
            .map(|(i, item)| (FormId(i), config.steps_for(item))),
    );

    (forms, bindings)
}

/// Unresolved low-stock notice shown above the cards
#[derive(Debug, Clone, PartialEq)]
pub struct Notice {
    pub item: String,
    pub threshold: f64,
    pub quantity: f64,
}

impl Notice {
    pub fn message(&self) -> String {
        format!(
            "{} is running low: {} left (minimum {})",
            self.item,
            format_value(self.quantity),
            format_value(self.threshold)
        )
    }
}

impl From<&NoticeConfig> for Notice {
    fn from(n: &NoticeConfig) -> Self {
        Self {
            item: n.item.clone(),
            threshold: n.threshold,
            quantity: n.quantity,
        }
    }
}

/// Notices still waiting for someone to resolve them (dismissal is local only)
#[derive(Debug, Clone, Default)]
pub struct NoticeBoard {
    notices: Vec<Notice>,
}

impl NoticeBoard {
    pub fn new(notices: &[NoticeConfig]) -> Self {
        Self {
            notices: notices.iter().map(Notice::from).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.notices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notices.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Notice> {
        self.notices.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Notice> {
        self.notices.iter()
    }

    pub fn resolve(&mut self, index: usize) -> Option<Notice> {
        if index < self.notices.len() {
            Some(self.notices.remove(index))
        } else {
            None
        }
    }
}
