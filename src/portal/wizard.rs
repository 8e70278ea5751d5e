//! Multi-step form controller shared by the appointment and enrollment flows.
//!
//! A [`FormWizard`] is an ordered list of steps, each owning a set of fields
//! and a validator over them. Moving forward is guarded by the current step's
//! validator; moving back is always allowed. Validating the whole form runs
//! every step and concatenates their errors, so a final submission reports all
//! problems at once.

use chrono::NaiveDate;

use super::{form::FormFields, validation::FieldError};

/// Validates the fields of one step. `today` anchors date rules.
pub type StepValidator = fn(&FormFields, NaiveDate) -> Vec<FieldError>;

#[derive(Debug, Clone, Copy)]
pub struct Step {
    pub name: &'static str,
    pub fields: &'static [&'static str],
    validate: StepValidator,
}

impl Step {
    #[must_use]
    pub const fn new(
        name: &'static str,
        fields: &'static [&'static str],
        validate: StepValidator,
    ) -> Self {
        Self {
            name,
            fields,
            validate,
        }
    }

    #[must_use]
    pub fn validate(&self, fields: &FormFields, today: NaiveDate) -> Vec<FieldError> {
        (self.validate)(fields, today)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FormWizard {
    name: &'static str,
    steps: &'static [Step],
}

/// Result of validating a single step, numbered from 1.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepReport {
    pub step: usize,
    pub name: &'static str,
    pub fields: &'static [&'static str],
    pub prev_step: Option<usize>,
    pub next_step: Option<usize>,
    pub errors: Vec<FieldError>,
}

impl StepReport {
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

impl FormWizard {
    #[must_use]
    pub const fn new(name: &'static str, steps: &'static [Step]) -> Self {
        Self { name, steps }
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    #[must_use]
    pub fn step_count(&self) -> usize {
        self.steps.len()
    }

    /// Step `number`, counting from 1.
    #[must_use]
    pub fn step(&self, number: usize) -> Option<&Step> {
        number.checked_sub(1).and_then(|index| self.steps.get(index))
    }

    /// A cursor on step `number`; `None` if there is no such step.
    #[must_use]
    pub fn at(&self, number: usize) -> Option<WizardState> {
        self.step(number).map(|_| WizardState {
            wizard: *self,
            current: number,
        })
    }

    /// Validate step `number` and report where the wizard may move from it.
    #[must_use]
    pub fn validate_step(
        &self,
        number: usize,
        fields: &FormFields,
        today: NaiveDate,
    ) -> Option<StepReport> {
        let cursor = self.at(number)?;
        let step = cursor.step()?;

        let mut forward = cursor;
        let (next_step, errors) = match forward.next(fields, today) {
            Ok(next_step) => (next_step, Vec::new()),
            Err(errors) => (None, errors),
        };
        let mut back = cursor;

        Some(StepReport {
            step: cursor.current(),
            name: step.name,
            fields: step.fields,
            prev_step: back.prev(),
            next_step,
            errors,
        })
    }

    /// Every step's errors, in step order.
    #[must_use]
    pub fn validate_all(&self, fields: &FormFields, today: NaiveDate) -> Vec<FieldError> {
        self.steps
            .iter()
            .flat_map(|step| step.validate(fields, today))
            .collect()
    }
}

/// Cursor over a wizard's steps.
#[derive(Debug, Clone, Copy)]
pub struct WizardState {
    wizard: FormWizard,
    current: usize,
}

impl WizardState {
    #[must_use]
    pub fn current(&self) -> usize {
        self.current
    }

    #[must_use]
    pub fn step(&self) -> Option<&'static Step> {
        let steps = self.wizard.steps;
        self.current.checked_sub(1).and_then(|index| steps.get(index))
    }

    #[must_use]
    pub fn is_last(&self) -> bool {
        self.current == self.wizard.step_count()
    }

    /// Advance when the current step validates. `Ok(None)` on the last step.
    ///
    /// # Errors
    /// Returns the current step's errors; the cursor does not move.
    pub fn next(
        &mut self,
        fields: &FormFields,
        today: NaiveDate,
    ) -> Result<Option<usize>, Vec<FieldError>> {
        let errors = self
            .step()
            .map(|step| step.validate(fields, today))
            .unwrap_or_default();
        if !errors.is_empty() {
            return Err(errors);
        }
        if self.is_last() {
            return Ok(None);
        }
        self.current += 1;
        Ok(Some(self.current))
    }

    /// Step back without validation. `None` on the first step.
    pub fn prev(&mut self) -> Option<usize> {
        if self.current <= 1 {
            return None;
        }
        self.current -= 1;
        Some(self.current)
    }
}
