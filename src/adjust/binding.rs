//! Control-to-field bindings, built once at setup
//!
//! Every quick-adjust and reset control resolves to exactly one form.
//! Handlers look the form up in the map instead of walking the page.

use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::time::{Duration, Instant};

use super::AdjustmentField;

/// How long an activated quick-adjust control stays emphasized
pub const EMPHASIS_DURATION: Duration = Duration::from_millis(200);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct FormId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ControlId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ControlKind {
    QuickAdjust { step: f64 },
    Reset,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Binding {
    pub control: ControlId,
    pub form: FormId,
    #[serde(flatten)]
    pub kind: ControlKind,
}

#[derive(Debug, Clone, Default)]
pub struct Bindings {
    by_control: HashMap<ControlId, Binding>,
    by_form: BTreeMap<FormId, Vec<ControlId>>,
}

impl Bindings {
    /// Enumerate every form's controls once: its quick-adjust steps in order,
    /// then a single reset control. Control ids are assigned sequentially.
    pub fn build<'a, I>(forms: I) -> Self
    where
        I: IntoIterator<Item = (FormId, &'a [f64])>,
    {
        let mut bindings = Self::default();
        let mut next = 0;

        for (form, steps) in forms {
            let kinds = steps
                .iter()
                .map(|&step| ControlKind::QuickAdjust { step })
                .chain(std::iter::once(ControlKind::Reset));

            for kind in kinds {
                let control = ControlId(next);
                next += 1;
                bindings.by_control.insert(control, Binding { control, form, kind });
                bindings.by_form.entry(form).or_default().push(control);
            }
        }

        tracing::debug!(
            "Bound {} controls across {} forms",
            bindings.by_control.len(),
            bindings.by_form.len()
        );
        bindings
    }

    pub fn resolve(&self, control: ControlId) -> Option<&Binding> {
        self.by_control.get(&control)
    }

    /// Controls of a form in display order (quick-adjust first, reset last)
    pub fn controls_for(&self, form: FormId) -> &[ControlId] {
        self.by_form.get(&form).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn forms(&self) -> impl Iterator<Item = FormId> + '_ {
        self.by_form.keys().copied()
    }

    /// All bindings ordered by control id
    pub fn to_list(&self) -> Vec<Binding> {
        let mut list: Vec<Binding> = self.by_control.values().copied().collect();
        list.sort_by_key(|b| b.control);
        list
    }
}

/// Holds one adjustment field per form and applies control activations to it
#[derive(Debug, Clone)]
pub struct QuantityAdjuster {
    bindings: Bindings,
    fields: HashMap<FormId, AdjustmentField>,
    emphasis: Option<(ControlId, Instant)>,
}

impl QuantityAdjuster {
    pub fn new(bindings: Bindings) -> Self {
        let fields = bindings.forms().map(|f| (f, AdjustmentField::default())).collect();
        Self {
            bindings,
            fields,
            emphasis: None,
        }
    }

    pub fn bindings(&self) -> &Bindings {
        &self.bindings
    }

    pub fn field(&self, form: FormId) -> Option<&AdjustmentField> {
        self.fields.get(&form)
    }

    pub fn field_mut(&mut self, form: FormId) -> Option<&mut AdjustmentField> {
        self.fields.get_mut(&form)
    }

    /// Dispatch a control by kind. Returns the affected form.
    pub fn activate(&mut self, control: ControlId, now: Instant) -> Option<FormId> {
        let binding = *self.bindings.resolve(control)?;
        match binding.kind {
            ControlKind::QuickAdjust { .. } => self.apply_step(control, now).map(|_| binding.form),
            ControlKind::Reset => self.reset(control).then_some(binding.form),
        }
    }

    /// Apply a quick-adjust control's step to its bound field and return the new text.
    /// Unknown ids and reset controls are ignored.
    pub fn apply_step(&mut self, control: ControlId, now: Instant) -> Option<&str> {
        let Some(binding) = self.bindings.resolve(control).copied() else {
            tracing::debug!("Ignoring unknown control {:?}", control);
            return None;
        };
        let ControlKind::QuickAdjust { step } = binding.kind else {
            return None;
        };

        let field = self.fields.entry(binding.form).or_default();
        field.apply_step(step);
        self.emphasis = Some((control, now));
        Some(field.text())
    }

    /// Clear the field of the form a reset control belongs to
    pub fn reset(&mut self, control: ControlId) -> bool {
        match self.bindings.resolve(control) {
            Some(Binding { form, kind: ControlKind::Reset, .. }) => {
                let form = *form;
                self.fields.entry(form).or_default().clear();
                true
            }
            _ => {
                tracing::debug!("Ignoring reset from {:?}", control);
                false
            }
        }
    }

    /// Clear a form's field directly (after a submission)
    pub fn clear_form(&mut self, form: FormId) {
        if let Some(field) = self.fields.get_mut(&form) {
            field.clear();
        }
    }

    pub fn emphasized(&self) -> Option<ControlId> {
        self.emphasis.map(|(control, _)| control)
    }

    /// Drop the emphasis once it has been shown long enough
    pub fn expire_emphasis(&mut self, now: Instant) {
        if let Some((_, since)) = self.emphasis {
            if now.saturating_duration_since(since) >= EMPHASIS_DURATION {
                self.emphasis = None;
            }
        }
    }
}
