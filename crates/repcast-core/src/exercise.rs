//! Exercise records and the instruction text spoken for each one.

use crate::error::{RepcastError, RepcastResult};
use std::fmt;

/// Language used when a record does not name one
pub const DEFAULT_LANGUAGE: &str = "en";

/// One movement in a workout.
///
/// Fields are read through accessors so a record cannot change after it has
/// been loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExerciseRecord {
    name: String,
    duration_secs: u32,
    reps: Option<u32>,
    language: String,
    slow: bool,
}

impl ExerciseRecord {
    /// Create a new exercise
    ///
    /// A rep count of zero means "no rep count".
    ///
    /// # Errors
    ///
    /// Returns an error if the name is blank or the duration is zero
    pub fn new<S: Into<String>>(
        name: S,
        duration_secs: u32,
        reps: Option<u32>,
    ) -> RepcastResult<Self> {
        let name = name.into().trim().to_string();
        if name.is_empty() {
            return Err(RepcastError::invalid_input("Exercise name cannot be empty"));
        }
        if duration_secs == 0 {
            return Err(RepcastError::invalid_input(format!(
                "Exercise '{name}' must last at least one second"
            )));
        }

        Ok(Self {
            name,
            duration_secs,
            reps: reps.filter(|&r| r > 0),
            language: DEFAULT_LANGUAGE.to_string(),
            slow: false,
        })
    }

    /// Set the synthesis language
    #[must_use]
    pub fn with_language<S: Into<String>>(mut self, language: S) -> Self {
        self.language = language.into();
        self
    }

    /// Ask the speech service for slower speech
    #[must_use]
    pub fn with_slow(mut self, slow: bool) -> Self {
        self.slow = slow;
        self
    }

    /// Exercise name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Exercise duration
    #[must_use]
    pub fn duration(&self) -> std::time::Duration {
        std::time::Duration::from_secs(u64::from(self.duration_secs))
    }

    /// Rep count, if any
    #[must_use]
    pub const fn reps(&self) -> Option<u32> {
        self.reps
    }

    /// Language code passed to the speech service
    #[must_use]
    pub fn language(&self) -> &str {
        &self.language
    }

    /// Whether slow speech was requested
    #[must_use]
    pub const fn slow(&self) -> bool {
        self.slow
    }

    /// Text spoken before the exercise starts
    #[must_use]
    pub fn instruction_text(&self) -> String {
        match self.reps {
            Some(reps) => format!("{reps} {} in {} seconds", self.name, self.duration_secs),
            None => format!("{} for {} seconds", self.name, self.duration_secs),
        }
    }
}

impl fmt::Display for ExerciseRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.instruction_text())
    }
}
