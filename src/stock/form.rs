use serde::Serialize;

use crate::adjust::{format_value, AdjustmentField, FormId};
use crate::config::ItemConfig;
use crate::error::SubmitError;

/// One item card: the fields submitted alongside the quantity delta
#[derive(Debug, Clone, PartialEq)]
pub struct StockForm {
    pub form: FormId,
    pub item_id: u32,
    pub name: String,
    pub unit: String,
    pub current_quantity: f64,
    pub min_threshold: f64,
    pub supplier: Option<String>,
    pub reason: Option<usize>,  // Index into the page's reasons
    pub note: String,
}

/// What gets handed to the server once a form passes the client-side hints
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Submission {
    pub item_id: u32,
    pub item: String,
    pub quantity_delta: f64,
    pub unit: String,
    pub reason: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub note: String,
}

impl StockForm {
    pub fn from_item(form: FormId, item: &ItemConfig) -> Self {
        Self {
            form,
            item_id: item.id,
            name: item.name.clone(),
            unit: item.unit.clone(),
            current_quantity: item.current_quantity,
            min_threshold: item.min_threshold,
            supplier: item.supplier.clone(),
            reason: None,
            note: String::new(),
        }
    }

    pub fn is_low_stock(&self) -> bool {
        self.current_quantity < self.min_threshold
    }

    /// Step through the reason selector: unselected, first, ..., last, unselected
    pub fn cycle_reason(&mut self, count: usize) {
        self.reason = match self.reason {
            _ if count == 0 => None,
            None => Some(0),
            Some(i) if i + 1 < count => Some(i + 1),
            Some(_) => None,
        };
    }

    /// Apply the submit-time hints: a non-zero numeric quantity and a reason
    pub fn validate(
        &self,
        field: &AdjustmentField,
        reasons: &[String],
    ) -> Result<Submission, SubmitError> {
        let quantity_delta = parse_quantity(field.text())?;

        let reason = self
            .reason
            .and_then(|i| reasons.get(i))
            .ok_or(SubmitError::ReasonMissing)?;

        Ok(Submission {
            item_id: self.item_id,
            item: self.name.clone(),
            quantity_delta,
            unit: self.unit.clone(),
            reason: reason.clone(),
            note: self.note.trim().to_string(),
        })
    }
}

/// Unlike the adjuster's lenient read, submission needs the whole text to be a number
fn parse_quantity(text: &str) -> Result<f64, SubmitError> {
    if text.is_empty() {
        return Err(SubmitError::QuantityMissing);
    }

    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(SubmitError::QuantityZero);
    }

    match trimmed.parse::<f64>() {
        Ok(v) if !v.is_finite() => Err(SubmitError::QuantityInvalid),
        Ok(v) if v == 0.0 => Err(SubmitError::QuantityZero),
        Ok(v) => Ok(v),
        Err(_) => Err(SubmitError::QuantityInvalid),
    }
}

impl Submission {
    /// Flash text, e.g. "Stock updated (change: +1.5 kg)"
    pub fn summary(&self) -> String {
        format!(
            "Stock updated (change: {} {})",
            format_signed(self.quantity_delta),
            self.unit
        )
    }
}

fn format_signed(value: f64) -> String {
    if value > 0.0 {
        format!("+{}", format_value(value))
    } else {
        format_value(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn reasons() -> Vec<String> {
        vec!["Received".to_string(), "Used".to_string()]
    }

    fn onion() -> StockForm {
        let item = ItemConfig {
            id: 1,
            name: "Onion".to_string(),
            unit: "kg".to_string(),
            current_quantity: 4.0,
            min_threshold: 5.0,
            supplier: None,
            quick_steps: None,
        };
        StockForm::from_item(FormId(0), &item)
    }

    fn field(text: &str) -> AdjustmentField {
        let mut field = AdjustmentField::default();
        field.set_text(text);
        field
    }

    #[rstest]
    #[case("", SubmitError::QuantityMissing)]
    #[case("0", SubmitError::QuantityZero)]
    #[case("-0.0", SubmitError::QuantityZero)]
    #[case("   ", SubmitError::QuantityZero)]
    #[case("abc", SubmitError::QuantityInvalid)]
    #[case("3abc", SubmitError::QuantityInvalid)]
    #[case("inf", SubmitError::QuantityInvalid)]
    fn test_quantity_hints(#[case] text: &str, #[case] expected: SubmitError) {
        let mut form = onion();
        form.reason = Some(0);
        assert_eq!(form.validate(&field(text), &reasons()), Err(expected));
    }

    #[test]
    fn test_reason_required() {
        let form = onion();
        assert_eq!(
            form.validate(&field("2"), &reasons()),
            Err(SubmitError::ReasonMissing)
        );
    }

    #[test]
    fn test_valid_submission() {
        let mut form = onion();
        form.reason = Some(1);
        form.note = "  lunch prep ".to_string();

        let submission = form.validate(&field("-1.5"), &reasons()).unwrap();
        assert_eq!(submission.quantity_delta, -1.5);
        assert_eq!(submission.reason, "Used");
        assert_eq!(submission.note, "lunch prep");
        assert_eq!(submission.summary(), "Stock updated (change: -1.5 kg)");
    }

    #[test]
    fn test_summary_signs_positive_changes() {
        let mut form = onion();
        form.reason = Some(0);
        let submission = form.validate(&field(" 10 "), &reasons()).unwrap();
        assert_eq!(submission.summary(), "Stock updated (change: +10 kg)");
    }

    #[test]
    fn test_cycle_reason_wraps_to_unselected() {
        let mut form = onion();
        form.cycle_reason(2);
        assert_eq!(form.reason, Some(0));
        form.cycle_reason(2);
        assert_eq!(form.reason, Some(1));
        form.cycle_reason(2);
        assert_eq!(form.reason, None);
        form.cycle_reason(0);
        assert_eq!(form.reason, None);
    }

    #[test]
    fn test_low_stock() {
        assert!(onion().is_low_stock());
    }

    #[test]
    fn test_submission_json_omits_empty_note() {
        let mut form = onion();
        form.reason = Some(0);
        let submission = form.validate(&field("2"), &reasons()).unwrap();
        let json = serde_json::to_value(&submission).unwrap();
        assert_eq!(json["quantity_delta"], 2.0);
        assert!(json.get("note").is_none());
    }
}
