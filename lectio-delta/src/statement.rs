//! Change descriptor → parameterized SQL.

use crate::allowlist::{validate_change, Allowlist};
use crate::error::{DeltaError, DeltaResult, ValidationIssue};
use crate::types::{ChangeDescriptor, ColumnMap, Operation, SqlValue};

/// A built statement plus its positional parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    /// Position of the source descriptor in its manifest.
    pub index: usize,
    pub table: String,
    pub sql: String,
    pub params: Vec<SqlValue>,
}

/// Quote an identifier for SQLite. Callers validate first; quoting is a
/// second layer, not a substitute.
pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Build the statement for a single descriptor.
pub fn build_statement(allowlist: &Allowlist, change: &ChangeDescriptor) -> DeltaResult<Statement> {
    build_at(allowlist, 0, change)
}

/// Build statements for a whole manifest, or none at all.
///
/// Every descriptor is validated before the first statement is returned, so
/// a single bad change rejects the batch.
pub fn build_statements(
    allowlist: &Allowlist,
    changes: &[ChangeDescriptor],
) -> DeltaResult<Vec<Statement>> {
    changes
        .iter()
        .enumerate()
        .map(|(index, change)| build_at(allowlist, index, change))
        .collect()
}

fn build_at(allowlist: &Allowlist, index: usize, change: &ChangeDescriptor) -> DeltaResult<Statement> {
    validate_change(allowlist, index, change)?;

    let table = quote_identifier(&change.table);
    let mut params = Vec::with_capacity(change.payload.len() + change.predicate.len());

    let sql = match change.operation {
        Operation::Insert => {
            let columns: Vec<String> = change.payload.keys().map(|c| quote_identifier(c)).collect();
            let placeholders: Vec<String> = (1..=columns.len()).map(|n| format!("?{n}")).collect();
            params.extend(change.payload.values().cloned());
            format!(
                "INSERT OR REPLACE INTO {table} ({}) VALUES ({})",
                columns.join(", "),
                placeholders.join(", ")
            )
        }
        Operation::Update => {
            let assignments: Vec<String> = change
                .payload
                .keys()
                .enumerate()
                .map(|(i, c)| format!("{} = ?{}", quote_identifier(c), i + 1))
                .collect();
            params.extend(change.payload.values().cloned());
            let predicate = where_clause(&change.predicate, &mut params);
            format!("UPDATE {table} SET {} WHERE {predicate}", assignments.join(", "))
        }
        Operation::Delete => {
            let predicate = where_clause(&change.predicate, &mut params);
            format!("DELETE FROM {table} WHERE {predicate}")
        }
        Operation::Unsupported => {
            return Err(DeltaError::Validation {
                index,
                issue: ValidationIssue::UnsupportedOperation,
                change: Box::new(change.clone()),
            });
        }
    };

    Ok(Statement {
        index,
        table: change.table.clone(),
        sql,
        params,
    })
}

/// AND-joined equality over the predicate. Placeholders continue numbering
/// after whatever is already in `params`.
fn where_clause(predicate: &ColumnMap, params: &mut Vec<SqlValue>) -> String {
    let mut terms = Vec::with_capacity(predicate.len());
    for (column, value) in predicate {
        // `= NULL` never matches in SQL
        let op = if value.is_null() { "IS" } else { "=" };
        params.push(value.clone());
        terms.push(format!("{} {op} ?{}", quote_identifier(column), params.len()));
    }
    terms.join(" AND ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn cols(pairs: &[(&str, SqlValue)]) -> ColumnMap {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn insert_uses_insert_or_replace() {
        let change = ChangeDescriptor::insert(
            "bible_books",
            cols(&[
                ("id", SqlValue::Integer(66)),
                ("name", SqlValue::from("Revelation")),
            ]),
        );
        let stmt = build_statement(&Allowlist::bundled(), &change).unwrap();
        assert_eq!(
            stmt.sql,
            r#"INSERT OR REPLACE INTO "bible_books" ("id", "name") VALUES (?1, ?2)"#
        );
        assert_eq!(
            stmt.params,
            vec![SqlValue::Integer(66), SqlValue::from("Revelation")]
        );
    }

    #[test]
    fn update_binds_payload_before_predicate() {
        let change = ChangeDescriptor::update(
            "bible_verses",
            cols(&[
                ("book_id", SqlValue::Integer(43)),
                ("chapter", SqlValue::Integer(3)),
                ("verse", SqlValue::Integer(16)),
            ]),
            cols(&[("text", SqlValue::from("For God so loved"))]),
        );
        let stmt = build_statement(&Allowlist::bundled(), &change).unwrap();
        assert_eq!(
            stmt.sql,
            r#"UPDATE "bible_verses" SET "text" = ?1 WHERE "book_id" = ?2 AND "chapter" = ?3 AND "verse" = ?4"#
        );
        assert_eq!(
            stmt.params,
            vec![
                SqlValue::from("For God so loved"),
                SqlValue::Integer(43),
                SqlValue::Integer(3),
                SqlValue::Integer(16),
            ]
        );
    }

    #[test]
    fn delete_uses_predicate_only() {
        let change = ChangeDescriptor::delete(
            "cross_references",
            cols(&[("id", SqlValue::Integer(9))]),
        );
        let stmt = build_statement(&Allowlist::bundled(), &change).unwrap();
        assert_eq!(stmt.sql, r#"DELETE FROM "cross_references" WHERE "id" = ?1"#);
        assert_eq!(stmt.params, vec![SqlValue::Integer(9)]);
    }

    #[test]
    fn null_predicate_uses_is() {
        let change = ChangeDescriptor::delete(
            "cross_references",
            cols(&[("votes", SqlValue::Null)]),
        );
        let stmt = build_statement(&Allowlist::bundled(), &change).unwrap();
        assert_eq!(stmt.sql, r#"DELETE FROM "cross_references" WHERE "votes" IS ?1"#);
    }

    #[test]
    fn batch_is_all_or_nothing() {
        let good = ChangeDescriptor::delete("bible_verses", cols(&[("id", SqlValue::Integer(1))]));
        let bad = ChangeDescriptor::delete("user_notes", cols(&[("id", SqlValue::Integer(1))]));
        let err = build_statements(&Allowlist::bundled(), &[good.clone(), bad, good]).unwrap_err();
        match err {
            DeltaError::Validation { index, issue, .. } => {
                assert_eq!(index, 1);
                assert_eq!(issue, ValidationIssue::DisallowedTable("user_notes".into()));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn quoting_doubles_embedded_quotes() {
        assert_eq!(quote_identifier("a\"b"), "\"a\"\"b\"");
    }
}
