//! Password rule registry queries.

use rusqlite::{params, Connection, OptionalExtension};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::Storage;
use crate::error::{Error, Result};
use crate::password::{Rule, RuleState, RuleType, ValidationType};

const RULE_COLUMNS: &str = "rule_id, name, rule_type, validation_type, state, expression, \
                            implementation_reference, description, order_no, err_message_id";

/// Selection and paging for [`Storage::list_rules`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuleFilter {
    /// Only rules in this state; `None` lists all.
    pub state: Option<RuleState>,
    /// Maximum number of rules returned.
    pub limit: usize,
    /// Number of rules skipped.
    pub offset: usize,
}

impl Default for RuleFilter {
    fn default() -> Self {
        Self {
            state: None,
            limit: 100,
            offset: 0,
        }
    }
}

/// Insert a rule row under the given id.
pub(super) fn insert_rule(conn: &Connection, rule: &Rule, rule_id: &str) -> Result<()> {
    conn.execute(
        r"
        INSERT INTO validation_rules
            (rule_id, name, rule_type, validation_type, state, expression,
             implementation_reference, description, order_no, err_message_id)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
        ",
        params![
            rule_id,
            rule.name,
            rule.rule_type.as_str(),
            rule.validation_type.as_str(),
            rule.state.as_str(),
            rule.expression,
            rule.implementation_reference,
            rule.description,
            rule.order_no,
            rule.err_message_id,
        ],
    )?;
    Ok(())
}

impl Storage {
    /// List rules in evaluation order.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn list_rules(&self, filter: &RuleFilter) -> Result<Vec<Rule>> {
        let sql = format!(
            "SELECT {RULE_COLUMNS} FROM validation_rules
             WHERE (?1 IS NULL OR state = ?1)
             ORDER BY order_no ASC, rule_id ASC LIMIT ?2 OFFSET ?3"
        );
        let mut stmt = self.conn.prepare(&sql)?;

        let state = filter.state.map(RuleState::as_str);
        let limit_i64 = i64::try_from(filter.limit).unwrap_or(i64::MAX);
        let offset_i64 = i64::try_from(filter.offset).unwrap_or(i64::MAX);
        let rules = stmt
            .query_map(params![state, limit_i64, offset_i64], row_to_rule)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(rules)
    }

    /// All enabled rules, in evaluation order.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn enabled_rules(&self) -> Result<Vec<Rule>> {
        self.list_rules(&RuleFilter {
            state: Some(RuleState::Enabled),
            limit: usize::MAX,
            offset: 0,
        })
    }

    /// Count rules, optionally only those in one state.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn count_rules(&self, state: Option<RuleState>) -> Result<i64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM validation_rules WHERE (?1 IS NULL OR state = ?1)",
            [state.map(RuleState::as_str)],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// Get a rule by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn get_rule(&self, rule_id: &str) -> Result<Option<Rule>> {
        let sql = format!("SELECT {RULE_COLUMNS} FROM validation_rules WHERE rule_id = ?1");
        let rule = self
            .conn
            .query_row(&sql, [rule_id], row_to_rule)
            .optional()?;
        Ok(rule)
    }

    /// Register a new rule under a freshly generated id.
    ///
    /// Any `rule_id` on the input is ignored. Returns the stored rule.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidRule`] if the definition fails [`Rule::check`],
    /// or an error if the database operation fails.
    pub fn create_rule(&self, rule: &Rule) -> Result<Rule> {
        rule.check()?;

        let rule_id = Uuid::new_v4().to_string();
        insert_rule(&self.conn, rule, &rule_id)?;
        info!(rule_id = %rule_id, name = %rule.name, "Created password rule");

        Ok(Rule {
            rule_id: Some(rule_id),
            ..rule.clone()
        })
    }

    /// Replace the rule identified by `rule.rule_id`.
    ///
    /// Returns `None` if no such rule exists.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidRule`] if the id is missing or the definition
    /// fails [`Rule::check`], or an error if the database operation fails.
    pub fn update_rule(&self, rule: &Rule) -> Result<Option<Rule>> {
        let Some(rule_id) = rule.rule_id.as_deref().filter(|id| !id.is_empty()) else {
            return Err(Error::invalid_rule("Rule id should be provided"));
        };
        rule.check()?;

        let affected = self.conn.execute(
            r"
            UPDATE validation_rules SET
                name = ?2, rule_type = ?3, validation_type = ?4, state = ?5, expression = ?6,
                implementation_reference = ?7, description = ?8, order_no = ?9,
                err_message_id = ?10
            WHERE rule_id = ?1
            ",
            params![
                rule_id,
                rule.name,
                rule.rule_type.as_str(),
                rule.validation_type.as_str(),
                rule.state.as_str(),
                rule.expression,
                rule.implementation_reference,
                rule.description,
                rule.order_no,
                rule.err_message_id,
            ],
        )?;

        if affected == 0 {
            debug!(rule_id = %rule_id, "No rule to update");
            return Ok(None);
        }
        info!(rule_id = %rule_id, "Updated password rule");
        Ok(Some(rule.clone()))
    }

    /// Enable or disable a rule.
    ///
    /// Returns `true` if the rule exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn set_rule_state(&self, rule_id: &str, state: RuleState) -> Result<bool> {
        let affected = self.conn.execute(
            "UPDATE validation_rules SET state = ?2 WHERE rule_id = ?1",
            params![rule_id, state.as_str()],
        )?;
        if affected > 0 {
            info!(rule_id = %rule_id, state = %state, "Changed password rule state");
        }
        Ok(affected > 0)
    }
}

/// Convert a database row to a `Rule`.
fn row_to_rule(row: &rusqlite::Row) -> rusqlite::Result<Rule> {
    let rule_type_str: String = row.get(2)?;
    let validation_type_str: String = row.get(3)?;
    let state_str: String = row.get(4)?;

    let rule_type = rule_type_str.parse().unwrap_or_else(|_| {
        warn!(
            "Unknown rule type: {}, defaulting to Programmatic",
            rule_type_str
        );
        RuleType::Programmatic
    });
    let validation_type = validation_type_str.parse().unwrap_or_else(|_| {
        warn!(
            "Unknown validation type: {}, defaulting to Strong",
            validation_type_str
        );
        ValidationType::Strong
    });
    let state = state_str.parse().unwrap_or_else(|_| {
        warn!("Unknown rule state: {}, defaulting to Disabled", state_str);
        RuleState::Disabled
    });

    Ok(Rule {
        rule_id: row.get(0)?,
        name: row.get(1)?,
        rule_type,
        validation_type,
        state,
        expression: row.get(5)?,
        implementation_reference: row.get(6)?,
        description: row.get(7)?,
        order_no: row.get(8)?,
        err_message_id: row.get(9)?,
    })
}
