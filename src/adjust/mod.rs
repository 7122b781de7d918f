//! Quantity adjustment core
//! Lenient reading, tenths rounding and display of the pending stock delta

pub mod binding;

pub use binding::{Binding, Bindings, ControlId, ControlKind, FormId, QuantityAdjuster};

/// Read a field the way a browser `parseFloat` would, falling back to zero.
/// Leading whitespace is skipped and the longest numeric prefix wins ("3abc" -> 3).
pub fn parse_lenient(text: &str) -> f64 {
    let s = text.trim_start();
    let end = numeric_prefix_len(s);
    s[..end]
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .unwrap_or(0.0)
}

/// Length in bytes of the leading `[+-]digits[.digits][e[+-]digits]` run
fn numeric_prefix_len(s: &str) -> usize {
    let b = s.as_bytes();
    let mut i = 0;

    if matches!(b.first(), Some(b'+' | b'-')) {
        i += 1;
    }

    let int_start = i;
    while i < b.len() && b[i].is_ascii_digit() {
        i += 1;
    }
    let mut digits = i - int_start;

    if i < b.len() && b[i] == b'.' {
        let frac_start = i + 1;
        let mut j = frac_start;
        while j < b.len() && b[j].is_ascii_digit() {
            j += 1;
        }
        if digits > 0 || j > frac_start {
            digits += j - frac_start;
            i = j;
        }
    }

    if digits == 0 {
        return 0;
    }

    // Exponent only counts when at least one digit follows it
    if i < b.len() && matches!(b[i], b'e' | b'E') {
        let mut j = i + 1;
        if j < b.len() && matches!(b[j], b'+' | b'-') {
            j += 1;
        }
        let exp_start = j;
        while j < b.len() && b[j].is_ascii_digit() {
            j += 1;
        }
        if j > exp_start {
            i = j;
        }
    }

    i
}

/// Round to one decimal place, ties away from zero
pub fn round_tenths(value: f64) -> f64 {
    let scaled = value * 10.0;
    if !scaled.is_finite() {
        // Magnitude is far beyond the tenths digit already
        return value;
    }
    scaled.round() / 10.0
}

/// Shortest display form: 1, 1.5, -0.5. Negative zero shows as 0.
pub fn format_value(value: f64) -> String {
    if value == 0.0 {
        return "0".to_string();
    }
    value.to_string()
}

/// The text of one form's `quantity_delta` field
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdjustmentField {
    text: String,
}

impl AdjustmentField {
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
    }

    pub fn clear(&mut self) {
        self.text.clear();
    }

    pub fn push_char(&mut self, c: char) {
        self.text.push(c);
    }

    pub fn pop_char(&mut self) {
        self.text.pop();
    }

    /// Current numeric value; empty or malformed text reads as zero
    pub fn current(&self) -> f64 {
        parse_lenient(&self.text)
    }

    /// Add `step`, round to tenths and write the result back.
    /// Returns false (field untouched) only when the sum overflows.
    pub fn apply_step(&mut self, step: f64) -> bool {
        let sum = self.current() + step;
        if !sum.is_finite() {
            tracing::warn!("Quantity overflow ignored: {} + {}", self.text, step);
            return false;
        }
        self.text = format_value(round_tenths(sum));
        true
    }
}
