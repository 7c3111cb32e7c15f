//! Password policy rule definitions.
//!
//! A [`Rule`] is either a regular expression the password must match or a
//! reference to one of the [`BuiltinCheck`]s. Rules are stored in the rule
//! registry and serialized with the registry's camelCase JSON field names.

use std::fmt;
use std::str::FromStr;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Placeholder in a `RegExp` expression that is replaced by the patient ID.
pub const USER_NAME_PLACEHOLDER: &str = "<USER_NAME>";

/// Wrap a rule expression so it has to match the whole password.
pub(crate) fn anchored(expression: &str) -> String {
    format!("^(?:{expression})$")
}

const ORDER_NUMBER_ERROR: &str = "Order number cannot be negative";
const VALIDATION_TYPE_ERROR: &str = "In case of RegExp rule Validation Type can only be Strong";
const IMPLEMENTATION_REFERENCE_REQUIRED_ERROR: &str =
    "In case of Programmatic rule Implementation reference should be provided";
const EXPRESSION_REQUIRED_ERROR: &str = "In case of RegExp rule Expression should be provided";

/// How a rule decides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RuleType {
    /// The password must match `expression`.
    RegExp,
    /// The password is checked by the built-in named in `implementation_reference`.
    Programmatic,
}

/// What happens when a rule cannot be evaluated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValidationType {
    /// Failure to evaluate aborts the whole validation.
    Strong,
    /// Failure to evaluate skips the rule.
    Soft,
}

/// Whether a rule takes part in validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum RuleState {
    /// The rule is applied.
    #[default]
    Enabled,
    /// The rule is kept but ignored.
    Disabled,
}

macro_rules! str_enum {
    ($ty:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $ty {
            /// The stored and serialized name.
            #[must_use]
            pub fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $text),+
                }
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $ty {
            type Err = String;

            fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
                match s {
                    $(_ if s.eq_ignore_ascii_case($text) => Ok(Self::$variant),)+
                    _ => Err(format!("unknown {}: {s}", stringify!($ty))),
                }
            }
        }
    };
}

str_enum!(RuleType { RegExp => "RegExp", Programmatic => "Programmatic" });
str_enum!(ValidationType { Strong => "Strong", Soft => "Soft" });
str_enum!(RuleState { Enabled => "Enabled", Disabled => "Disabled" });

/// A password policy rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rule {
    /// Identifier assigned by the registry; absent until the rule is created.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rule_id: Option<String>,
    /// Short machine-friendly name.
    pub name: String,
    /// How the rule decides.
    #[serde(rename = "type")]
    pub rule_type: RuleType,
    /// Behavior when the rule cannot be evaluated.
    pub validation_type: ValidationType,
    /// Whether the rule is applied.
    #[serde(default)]
    pub state: RuleState,
    /// Regular expression, for `RegExp` rules.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expression: Option<String>,
    /// Built-in check name, for `Programmatic` rules.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub implementation_reference: Option<String>,
    /// Human-readable description.
    #[serde(default)]
    pub description: String,
    /// Evaluation order, ascending.
    pub order_no: i32,
    /// Message id reported when the password fails this rule.
    pub err_message_id: String,
}

impl Rule {
    /// Check the rule definition before it is stored.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidRule`] describing the first problem found.
    pub fn check(&self) -> Result<()> {
        if self.order_no < 0 {
            return Err(Error::invalid_rule(ORDER_NUMBER_ERROR));
        }

        match self.rule_type {
            RuleType::RegExp => {
                if self.validation_type != ValidationType::Strong {
                    return Err(Error::invalid_rule(VALIDATION_TYPE_ERROR));
                }
                let Some(expression) = self.expression.as_deref().filter(|e| !e.is_empty())
                else {
                    return Err(Error::invalid_rule(EXPRESSION_REQUIRED_ERROR));
                };
                // Compile with a neutral stand-in for the placeholder
                let stand_in = expression.replace(USER_NAME_PLACEHOLDER, "user");
                if let Err(e) = Regex::new(&anchored(&stand_in)) {
                    return Err(Error::invalid_rule(format!(
                        "Invalid regular expression: {e}"
                    )));
                }
            }
            RuleType::Programmatic => {
                if self
                    .implementation_reference
                    .as_deref()
                    .map_or(true, str::is_empty)
                {
                    return Err(Error::invalid_rule(IMPLEMENTATION_REFERENCE_REQUIRED_ERROR));
                }
            }
        }

        Ok(())
    }

    /// Whether the rule takes part in validation.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.state == RuleState::Enabled
    }
}

/// Checks that `Programmatic` rules can refer to by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuiltinCheck {
    /// At least one lower case and one upper case ASCII letter.
    MixedCase,
    /// At least one ASCII digit.
    Digit,
    /// At least one ASCII punctuation character.
    SpecialCharacter,
    /// Does not contain the user name, ignoring case.
    NoUserName,
    /// Does not contain a common keyboard run such as `qwe` or `123`.
    KeyboardSequence,
    /// No character appears twice in a row.
    RepeatingCharacters,
    /// No whitespace at all.
    NoWhiteSpace,
}

/// Three-key runs rejected by [`BuiltinCheck::KeyboardSequence`].
const KEYBOARD_SEQUENCES: &[&str] = &[
    "qwe", "asd", "zxc", "qaz", "zaq", "xsw", "wsx", "edc", "cde", "rfv", "vfr", "tgb", "bgt",
    "yhn", "nhy", "ujm", "mju", "ik,", ",ki", "ol.", ".lo", "p;/", "/;p", "123",
];

impl BuiltinCheck {
    /// Every built-in check.
    pub const ALL: [BuiltinCheck; 7] = [
        Self::MixedCase,
        Self::Digit,
        Self::SpecialCharacter,
        Self::NoUserName,
        Self::KeyboardSequence,
        Self::RepeatingCharacters,
        Self::NoWhiteSpace,
    ];

    /// The implementation reference naming this check.
    #[must_use]
    pub fn reference(self) -> &'static str {
        match self {
            Self::MixedCase => "mixed_case",
            Self::Digit => "digit",
            Self::SpecialCharacter => "special_character",
            Self::NoUserName => "no_user_name",
            Self::KeyboardSequence => "keyboard_sequence",
            Self::RepeatingCharacters => "repeating_characters",
            Self::NoWhiteSpace => "no_white_space",
        }
    }

    /// Resolve an implementation reference.
    #[must_use]
    pub fn from_reference(reference: &str) -> Option<Self> {
        let reference = reference.trim();
        Self::ALL
            .into_iter()
            .find(|check| check.reference().eq_ignore_ascii_case(reference))
    }

    /// Whether `password` passes this check.
    #[must_use]
    pub fn passes(self, password: &str, user_name: Option<&str>) -> bool {
        match self {
            Self::MixedCase => {
                password.chars().any(|c| c.is_ascii_lowercase())
                    && password.chars().any(|c| c.is_ascii_uppercase())
            }
            Self::Digit => password.chars().any(|c| c.is_ascii_digit()),
            Self::SpecialCharacter => password.chars().any(|c| c.is_ascii_punctuation()),
            Self::NoUserName => match user_name.map(str::trim).filter(|u| !u.is_empty()) {
                Some(user) => !password.to_lowercase().contains(&user.to_lowercase()),
                None => true,
            },
            Self::KeyboardSequence => {
                let lowered = password.to_lowercase();
                !KEYBOARD_SEQUENCES.iter().any(|seq| lowered.contains(seq))
            }
            Self::RepeatingCharacters => {
                let mut chars = password.chars();
                let mut previous = chars.next();
                for c in chars {
                    if previous == Some(c) {
                        return false;
                    }
                    previous = Some(c);
                }
                true
            }
            Self::NoWhiteSpace => !password.chars().any(char::is_whitespace),
        }
    }
}
