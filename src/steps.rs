//! The four wizard steps and navigation between them.

use crate::config::Configuration;

/// A wizard step, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Step {
    Mode,
    Upload,
    Parameters,
    Submit,
}

impl Step {
    pub const ALL: [Step; 4] = [Step::Mode, Step::Upload, Step::Parameters, Step::Submit];

    pub fn index(self) -> usize {
        match self {
            Step::Mode => 0,
            Step::Upload => 1,
            Step::Parameters => 2,
            Step::Submit => 3,
        }
    }

    pub fn from_index(index: usize) -> Option<Step> {
        Step::ALL.get(index).copied()
    }

    pub fn title(self) -> &'static str {
        match self {
            Step::Mode => "Exploration mode",
            Step::Upload => "Upload input",
            Step::Parameters => "Simulation setup",
            Step::Submit => "Submit simulation",
        }
    }

    /// Short status line shown under the step title.
    pub fn summary(self, config: &Configuration) -> Option<String> {
        match self {
            Step::Mode => Some(config.mode.label().to_string()),
            Step::Upload => Some(
                if config.raw_input.is_empty() {
                    "Upload a file"
                } else {
                    "Uploaded"
                }
                .to_string(),
            ),
            Step::Parameters => Some(config.model.display_name()),
            Step::Submit => None,
        }
    }
}

/// Current position in the wizard.
///
/// Navigation is never gated on validation: a user may move forward with
/// invalid input and come back to fix it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StepController {
    current: usize,
}

impl StepController {
    const LAST: usize = Step::ALL.len() - 1;

    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Step {
        Step::ALL[self.current]
    }

    pub fn index(&self) -> usize {
        self.current
    }

    /// Advance one step; no-op on the last step.
    pub fn next(&mut self) -> Step {
        if self.current < Self::LAST {
            self.current += 1;
        }
        self.current()
    }

    /// Go back one step; no-op on the first step.
    pub fn back(&mut self) -> Step {
        if self.current > 0 {
            self.current -= 1;
        }
        self.current()
    }

    /// Jump straight to a step. Indices past the last step are ignored.
    pub fn jump(&mut self, index: usize) -> Step {
        if index <= Self::LAST {
            self.current = index;
        }
        self.current()
    }

    pub fn is_first(&self) -> bool {
        self.current == 0
    }

    /// On the last step the wizard offers "execute" instead of "next".
    pub fn is_terminal(&self) -> bool {
        self.current == Self::LAST
    }

    /// Title and summary of every step, for a step indicator.
    pub fn overview(&self, config: &Configuration) -> Vec<(Step, Option<String>)> {
        Step::ALL.iter().map(|s| (*s, s.summary(config))).collect()
    }
}
