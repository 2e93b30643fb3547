//! Turning operator arguments into a validated manifest.

use crate::assignments::parse_assignments;
use crate::error::{AuthorError, AuthorResult};
use chrono::{DateTime, Utc};
use lectio_delta::{validate_change, Allowlist, ChangeDescriptor, ColumnMap, ManifestFile, Operation};

/// One change as given on the command line, before parsing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSpec {
    pub table: String,
    pub operation: String,
    pub where_clause: Option<String>,
    pub data: Option<String>,
}

impl ChangeSpec {
    /// Shorthand for an `--update TABLE WHERE DATA` group.
    pub fn update(table: &str, where_clause: &str, data: &str) -> Self {
        Self {
            table: table.to_string(),
            operation: Operation::Update.as_str().to_string(),
            where_clause: Some(where_clause.to_string()),
            data: Some(data.to_string()),
        }
    }

    pub fn into_descriptor(self) -> AuthorResult<ChangeDescriptor> {
        let table = self.table.trim().to_string();
        if table.is_empty() {
            return Err(AuthorError::MissingArgument("--table".into()));
        }
        let operation = Operation::parse(&self.operation).ok_or_else(|| {
            AuthorError::InvalidArgument(format!(
                "unknown operation {:?} (expected insert, update or delete)",
                self.operation
            ))
        })?;
        let predicate = parse_optional(self.where_clause.as_deref())?;
        let payload = parse_optional(self.data.as_deref())?;

        let needs_where = matches!(operation, Operation::Update | Operation::Delete);
        let needs_data = matches!(operation, Operation::Update | Operation::Insert);
        if needs_where && predicate.is_empty() {
            return Err(AuthorError::MissingArgument(format!(
                "--where is required for {operation} on {table}"
            )));
        }
        if needs_data && payload.is_empty() {
            return Err(AuthorError::MissingArgument(format!(
                "--set/--data is required for {operation} on {table}"
            )));
        }

        Ok(ChangeDescriptor {
            table,
            operation,
            predicate,
            payload,
        })
    }
}

fn parse_optional(raw: Option<&str>) -> AuthorResult<ColumnMap> {
    raw.map(parse_assignments)
        .transpose()
        .map(Option::unwrap_or_default)
}

/// Everything needed to produce one manifest file.
#[derive(Debug, Clone, Default)]
pub struct ManifestDraft {
    pub version: i64,
    pub description: String,
    pub created_by: String,
    pub changes: Vec<ChangeSpec>,
}

impl ManifestDraft {
    /// Parse and validate every change, then stamp the manifest with `now`.
    pub fn build(self, allowlist: &Allowlist, now: DateTime<Utc>) -> AuthorResult<ManifestFile> {
        if self.version <= 0 {
            return Err(AuthorError::InvalidArgument(format!(
                "--version must be a positive integer, got {}",
                self.version
            )));
        }
        let description = self.description.trim();
        if description.is_empty() {
            return Err(AuthorError::MissingArgument("--description".into()));
        }
        if self.changes.is_empty() {
            return Err(AuthorError::NoChanges);
        }

        let changes = self
            .changes
            .into_iter()
            .map(ChangeSpec::into_descriptor)
            .collect::<AuthorResult<Vec<_>>>()?;
        for (index, change) in changes.iter().enumerate() {
            validate_change(allowlist, index, change)?;
        }

        Ok(ManifestFile {
            version: self.version,
            description: description.to_string(),
            created_at: now,
            created_by: self.created_by,
            changes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lectio_delta::SqlValue;
    use pretty_assertions::assert_eq;

    fn draft(changes: Vec<ChangeSpec>) -> ManifestDraft {
        ManifestDraft {
            version: 7,
            description: "Fix typo in John 3:16".into(),
            created_by: "editor".into(),
            changes,
        }
    }

    #[test]
    fn update_group_becomes_descriptor() {
        let change = ChangeSpec::update(
            "bible_verses",
            "book_id=43,chapter=3,verse=16",
            r#"text="For God so loved the world""#,
        )
        .into_descriptor()
        .unwrap();
        assert_eq!(change.operation, Operation::Update);
        assert_eq!(change.predicate.len(), 3);
        assert_eq!(
            change.payload["text"],
            SqlValue::Text("For God so loved the world".into())
        );
    }

    #[test]
    fn operation_requirements() {
        let insert_without_data = ChangeSpec {
            table: "translations".into(),
            operation: "insert".into(),
            where_clause: Some("id=1".into()),
            data: None,
        };
        assert!(matches!(
            insert_without_data.into_descriptor(),
            Err(AuthorError::MissingArgument(_))
        ));

        let delete_without_where = ChangeSpec {
            table: "translations".into(),
            operation: "DELETE".into(),
            ..Default::default()
        };
        assert!(matches!(
            delete_without_where.into_descriptor(),
            Err(AuthorError::MissingArgument(_))
        ));

        let update_without_data = ChangeSpec {
            data: None,
            ..ChangeSpec::update("bible_verses", "id=1", "")
        };
        assert!(matches!(
            update_without_data.into_descriptor(),
            Err(AuthorError::MissingArgument(_))
        ));
    }

    #[test]
    fn unknown_operation_is_rejected() {
        let spec = ChangeSpec {
            table: "translations".into(),
            operation: "upsert".into(),
            data: Some("id=1".into()),
            ..Default::default()
        };
        assert!(matches!(
            spec.into_descriptor(),
            Err(AuthorError::InvalidArgument(_))
        ));
    }

    #[test]
    fn builds_manifest_file() {
        let now = Utc::now();
        let file = draft(vec![ChangeSpec::update("bible_verses", "id=26137", "text=fixed")])
            .build(&Allowlist::bundled(), now)
            .unwrap();
        assert_eq!(file.version, 7);
        assert_eq!(file.created_at, now);
        assert_eq!(file.created_by, "editor");
        assert_eq!(file.changes.len(), 1);
        assert_eq!(file.file_name(), "update_v7.json");
    }

    #[test]
    fn refuses_zero_changes() {
        assert!(matches!(
            draft(vec![]).build(&Allowlist::bundled(), Utc::now()),
            Err(AuthorError::NoChanges)
        ));
    }

    #[test]
    fn refuses_non_positive_version_and_blank_description() {
        let mut bad_version = draft(vec![ChangeSpec::update("bible_verses", "id=1", "text=x")]);
        bad_version.version = 0;
        assert!(matches!(
            bad_version.build(&Allowlist::bundled(), Utc::now()),
            Err(AuthorError::InvalidArgument(_))
        ));

        let mut blank = draft(vec![ChangeSpec::update("bible_verses", "id=1", "text=x")]);
        blank.description = "  ".into();
        assert!(matches!(
            blank.build(&Allowlist::bundled(), Utc::now()),
            Err(AuthorError::MissingArgument(_))
        ));
    }

    #[test]
    fn disallowed_table_names_the_change() {
        let err = draft(vec![
            ChangeSpec::update("bible_verses", "id=1", "text=x"),
            ChangeSpec::update("users", "id=1", "role=admin"),
        ])
        .build(&Allowlist::bundled(), Utc::now())
        .unwrap_err();
        let AuthorError::Delta(delta) = &err else {
            panic!("expected delta error, got {err:?}");
        };
        assert!(delta.validation_issue().is_some());
        assert!(err.to_string().contains("#1"), "{err}");
    }

    #[test]
    fn bad_column_is_rejected() {
        let err = draft(vec![ChangeSpec::update(
            "bible_verses",
            "id=1",
            "Text=x",
        )])
        .build(&Allowlist::bundled(), Utc::now())
        .unwrap_err();
        assert!(matches!(err, AuthorError::Delta(_)));
    }
}
