use crate::protocol::{Flow, ScenarioStep, Target};
use std::collections::HashSet;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("Name cannot be empty")]
    EmptyName,
    #[error("Flow '{0}' must have at least one step")]
    NoSteps(String),
    #[error("Duplicate step name: {0}")]
    DuplicateStep(String),
    #[error("Target '{0}' has no locator strategies")]
    NoStrategies(String),
    #[error("Target '{0}' uses a coordinate before its last strategy")]
    CoordinateNotLast(String),
    #[error("Step '{step}' needs a target for action '{action}'")]
    MissingTarget { step: String, action: String },
}

pub trait Validatable {
    fn validate(&self) -> Result<(), ValidationError>;
}

impl Validatable for Target {
    fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::EmptyName);
        }
        if self.strategies.is_empty() {
            return Err(ValidationError::NoStrategies(self.name.clone()));
        }

        let last = self.strategies.len() - 1;
        if self.strategies[..last].iter().any(|s| s.is_coordinate()) {
            return Err(ValidationError::CoordinateNotLast(self.name.clone()));
        }
        Ok(())
    }
}

impl Validatable for ScenarioStep {
    fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::EmptyName);
        }
        match &self.target {
            Some(target) => target.validate(),
            None if self.action.needs_target() => Err(ValidationError::MissingTarget {
                step: self.name.clone(),
                action: self.action.label().to_string(),
            }),
            None => Ok(()),
        }
    }
}

impl Validatable for Flow {
    fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::EmptyName);
        }
        if self.steps.is_empty() {
            return Err(ValidationError::NoSteps(self.name.clone()));
        }

        let mut names = HashSet::new();
        for step in &self.steps {
            step.validate()?;
            if !names.insert(step.name.as_str()) {
                return Err(ValidationError::DuplicateStep(step.name.clone()));
            }
        }
        Ok(())
    }
}
