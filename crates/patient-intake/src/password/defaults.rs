//! The built-in rule set seeded into a fresh rule registry.

use super::rules::{BuiltinCheck, Rule, RuleState, RuleType, ValidationType};

fn regexp(
    id: &str,
    name: &str,
    expression: &str,
    description: &str,
    order_no: i32,
    message: &str,
) -> Rule {
    Rule {
        rule_id: Some(id.to_string()),
        name: name.to_string(),
        rule_type: RuleType::RegExp,
        validation_type: ValidationType::Strong,
        state: RuleState::Enabled,
        expression: Some(expression.to_string()),
        implementation_reference: None,
        description: description.to_string(),
        order_no,
        err_message_id: message.to_string(),
    }
}

fn programmatic(
    id: &str,
    name: &str,
    check: BuiltinCheck,
    description: &str,
    order_no: i32,
    message: &str,
) -> Rule {
    Rule {
        rule_id: Some(id.to_string()),
        name: name.to_string(),
        rule_type: RuleType::Programmatic,
        validation_type: ValidationType::Strong,
        state: RuleState::Enabled,
        expression: None,
        implementation_reference: Some(check.reference().to_string()),
        description: description.to_string(),
        order_no,
        err_message_id: message.to_string(),
    }
}

/// The default password rules, in evaluation order.
#[must_use]
pub fn default_rules() -> Vec<Rule> {
    vec![
        regexp(
            "5105b55a-b9a3-4f76-9402-a5243ea63c95",
            "password_length",
            "^.{8,}$",
            "The password length must be minimum 8 digits",
            0,
            "password.length.invalid",
        ),
        programmatic(
            "dc653de8-f0df-48ab-9630-13aacfe8e8f4",
            "alphabetical_letters",
            BuiltinCheck::MixedCase,
            "The password must contain both upper and lower case letters",
            1,
            "password.alphabetical.invalid",
        ),
        programmatic(
            "3e3c53ae-73c2-4eba-9f09-f2c9a892c7a2",
            "numeric_symbol",
            BuiltinCheck::Digit,
            "The password must contain at least one numeric character",
            2,
            "password.number.invalid",
        ),
        programmatic(
            "2e82f890-49e8-46fc-923d-644f33dc5c3f",
            "special_character",
            BuiltinCheck::SpecialCharacter,
            "The password must contain at least one special character",
            3,
            "password.specialCharacter.invalid",
        ),
        programmatic(
            "2f390fa6-a2f8-4027-abaf-ee61952668bc",
            "no_user_name",
            BuiltinCheck::NoUserName,
            "The password must not contain your patient ID, in any letter case",
            4,
            "password.usernameDuplicate.invalid",
        ),
        programmatic(
            "8d4a2124-8a54-4c49-84c8-36a8f7fc01a8",
            "keyboard_sequence",
            BuiltinCheck::KeyboardSequence,
            "The password must not contain a three-key run such as qwe, 123 or ol.",
            5,
            "password.keyboardSequence.invalid",
        ),
        programmatic(
            "98b961b4-16b8-4e62-a359-abf3805e16b0",
            "repeating_characters",
            BuiltinCheck::RepeatingCharacters,
            "The password must not contain repeating symbols",
            6,
            "password.repeatingSymbols.invalid",
        ),
        regexp(
            "51e201ba-95d3-44e5-b4ec-f0059f11afcb",
            "no_white_space_character",
            r"^\S+$",
            "The password must not contain a white space",
            7,
            "password.whiteSpace.invalid",
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_default_rules_are_valid() {
        for rule in default_rules() {
            assert!(rule.check().is_ok(), "invalid default rule: {}", rule.name);
        }
    }

    #[test]
    fn test_default_rules_ordered_and_unique() {
        let rules = default_rules();
        let orders: Vec<_> = rules.iter().map(|r| r.order_no).collect();
        assert_eq!(orders, (0..8).collect::<Vec<_>>());

        let ids: HashSet<_> = rules.iter().filter_map(|r| r.rule_id.clone()).collect();
        assert_eq!(ids.len(), rules.len());
    }

    #[test]
    fn test_default_rules_all_enabled_and_strong() {
        assert!(default_rules()
            .iter()
            .all(|r| r.is_enabled() && r.validation_type == ValidationType::Strong));
    }
}
