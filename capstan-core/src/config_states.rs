//! TypeState helpers for cluster configs (unvalidated -> validated).
//!
//! A create run only accepts a `ValidatedConfig`, so a spec that failed static checks can never
//! reach the workflow.

use anyhow::Result;

pub trait ValidateConfig {
    fn validate_cfg(&self) -> Result<()>;
}

#[derive(Debug, Clone)]
pub struct UnvalidatedConfig<T>(pub T);

#[derive(Debug, Clone)]
pub struct ValidatedConfig<T>(pub T);

impl<T> UnvalidatedConfig<T> {
    pub fn new(cfg: T) -> Self {
        Self(cfg)
    }
}

impl<T: ValidateConfig> UnvalidatedConfig<T> {
    pub fn validate(self) -> Result<ValidatedConfig<T>> {
        self.0.validate_cfg()?;
        Ok(ValidatedConfig(self.0))
    }
}

impl<T> ValidatedConfig<T> {
    pub fn into_inner(self) -> T {
        self.0
    }
}
