//! Password policy evaluation.
//!
//! [`PasswordPolicy`] holds the enabled rules in evaluation order and checks
//! passwords against them, collecting the message id of every failed rule.

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

use super::rules::{
    anchored, BuiltinCheck, Rule, RuleType, ValidationType, USER_NAME_PLACEHOLDER,
};
use crate::error::{Error, Result};

/// Overall verdict of a password validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidationResult {
    /// Every applied rule passed.
    Valid,
    /// At least one rule failed.
    Invalid,
}

/// Result of validating one password.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationOutcome {
    /// Overall verdict.
    pub result: ValidationResult,
    /// Message ids of failed rules, in evaluation order.
    pub messages: Vec<String>,
}

impl ValidationOutcome {
    fn from_messages(messages: Vec<String>) -> Self {
        let result = if messages.is_empty() {
            ValidationResult::Valid
        } else {
            ValidationResult::Invalid
        };
        Self { result, messages }
    }

    /// Whether the password passed every applied rule.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.result == ValidationResult::Valid
    }
}

/// An ordered set of enabled password rules.
#[derive(Debug, Clone, Default)]
pub struct PasswordPolicy {
    rules: Vec<Rule>,
}

impl PasswordPolicy {
    /// Build a policy from registry rules.
    ///
    /// Disabled rules are dropped; the rest are sorted by `order_no`.
    #[must_use]
    pub fn new(rules: impl IntoIterator<Item = Rule>) -> Self {
        let mut rules: Vec<Rule> = rules.into_iter().filter(Rule::is_enabled).collect();
        rules.sort_by_key(|r| r.order_no);
        Self { rules }
    }

    /// The rules that will be applied, in order.
    #[must_use]
    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Validate a password.
    ///
    /// `user_name` replaces `<USER_NAME>` in expressions and feeds the
    /// `no_user_name` check; registration passes the patient ID.
    ///
    /// # Errors
    ///
    /// Returns [`Error::RuleEvaluation`] when a strong rule cannot be
    /// evaluated (bad expression or unknown implementation reference).
    pub fn validate(&self, password: &str, user_name: Option<&str>) -> Result<ValidationOutcome> {
        let mut messages = Vec::new();

        for rule in &self.rules {
            let passed = match rule.rule_type {
                RuleType::RegExp => Self::check_regexp(rule, password, user_name)?,
                RuleType::Programmatic => Self::check_programmatic(rule, password, user_name)?,
            };

            match passed {
                Some(true) => trace!(rule = %rule.name, "Password passed rule"),
                Some(false) => {
                    debug!(rule = %rule.name, "Password failed rule");
                    messages.push(rule.err_message_id.clone());
                }
                None => {}
            }
        }

        Ok(ValidationOutcome::from_messages(messages))
    }

    /// `None` means the rule was skipped.
    fn check_regexp(rule: &Rule, password: &str, user_name: Option<&str>) -> Result<Option<bool>> {
        let Some(expression) = rule.expression.as_deref() else {
            return Err(Error::rule_evaluation(&rule.name, "missing expression"));
        };

        let expression = if expression.contains(USER_NAME_PLACEHOLDER) {
            match user_name.filter(|u| !u.is_empty()) {
                Some(user) => expression.replace(USER_NAME_PLACEHOLDER, &regex::escape(user)),
                None => {
                    debug!(rule = %rule.name, "No user name to substitute; skipping rule");
                    return Ok(None);
                }
            }
        } else {
            expression.to_string()
        };

        let regex = Regex::new(&anchored(&expression))
            .map_err(|e| Error::rule_evaluation(&rule.name, format!("invalid expression: {e}")))?;
        Ok(Some(regex.is_match(password)))
    }

    fn check_programmatic(
        rule: &Rule,
        password: &str,
        user_name: Option<&str>,
    ) -> Result<Option<bool>> {
        let reference = rule.implementation_reference.as_deref().unwrap_or_default();

        match BuiltinCheck::from_reference(reference) {
            Some(check) => Ok(Some(check.passes(password, user_name))),
            None => match rule.validation_type {
                ValidationType::Strong => Err(Error::rule_evaluation(
                    &rule.name,
                    format!("unknown implementation reference '{reference}'"),
                )),
                ValidationType::Soft => {
                    warn!(
                        rule = %rule.name,
                        reference = %reference,
                        "Unknown implementation reference; skipping soft rule"
                    );
                    Ok(None)
                }
            },
        }
    }
}
