use std::collections::HashSet;

use serde::Deserialize;

use crate::shared::{
    ColumnType, ExportConfig, FilterGroupConfig, IdentifierConfig, LocatorConfig, PgConnectionConfig,
    TableConfig, ValidationError,
};

/// Top level configuration of the exporter binary.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ExporterConfig {
    pub source: PgConnectionConfig,
    pub identifier: IdentifierConfig,
    #[serde(default)]
    pub locator: LocatorConfig,
    #[serde(default)]
    pub export: ExportConfig,
    pub groups: Vec<FilterGroupConfig>,
    pub tables: Vec<TableConfig>,
}

impl ExporterConfig {
    /// Validates every section, then the table to group relationship.
    ///
    /// Each table must belong to exactly one group and must declare that
    /// group's filter column as a timestamp.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.source.validate()?;
        self.identifier.validate()?;
        self.locator.validate()?;
        self.export.validate()?;

        let mut table_names = HashSet::new();
        for table in &self.tables {
            table.validate()?;
            if !table_names.insert(table.name.as_str()) {
                return Err(ValidationError::DuplicateTable(table.name.clone()));
            }
        }

        let mut group_names = HashSet::new();
        for group in &self.groups {
            if !group_names.insert(group.name.as_str()) {
                return Err(ValidationError::DuplicateGroup(group.name.clone()));
            }
        }

        for group in &self.groups {
            for member in &group.tables {
                let Some(table) = self.table(member) else {
                    return Err(ValidationError::UnknownGroupMember {
                        group: group.name.clone(),
                        table: member.clone(),
                    });
                };

                let Some(column) = table.column(&group.filter_column) else {
                    return Err(ValidationError::MissingFilterColumn {
                        table: member.clone(),
                        column: group.filter_column.clone(),
                    });
                };

                if column.column_type != ColumnType::Timestamp {
                    return Err(ValidationError::FilterColumnNotTimestamp {
                        table: member.clone(),
                        column: column.name.clone(),
                        declared: column.column_type.to_string(),
                    });
                }
            }
        }

        Ok(())
    }

    /// Returns the table with the given name.
    pub fn table(&self, name: &str) -> Option<&TableConfig> {
        self.tables.iter().find(|table| table.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONFIG: &str = r#"{
        "source": {"host": "localhost", "port": 5432, "name": "dw", "username": "reader"},
        "identifier": {
            "table": "public.booking",
            "id_column": "booking_id",
            "time_column": "created_at"
        },
        "groups": [
            {"name": "booking", "filter_column": "created_at", "tables": ["booking"]},
            {"name": "payment", "filter_column": "paid_at", "tables": ["payment"]}
        ],
        "tables": [
            {
                "name": "booking",
                "query": "select * from booking where booking_id between $1 and $2",
                "columns": [
                    {"name": "booking_id", "type": "int64"},
                    {"name": "created_at", "type": "timestamp"}
                ]
            },
            {
                "name": "payment",
                "query": "select * from payment where booking_id between $1 and $2",
                "columns": [
                    {"name": "payment_id", "type": "int64"},
                    {"name": "paid_at", "type": "timestamp"}
                ]
            }
        ]
    }"#;

    fn config() -> ExporterConfig {
        serde_json::from_str(CONFIG).unwrap()
    }

    #[test]
    fn valid_config_passes() {
        assert!(config().validate().is_ok());
    }

    #[test]
    fn rejects_duplicate_tables() {
        let mut config = config();
        config.tables.push(config.tables[0].clone());

        assert_eq!(
            config.validate(),
            Err(ValidationError::DuplicateTable("booking".to_string()))
        );
    }

    #[test]
    fn rejects_duplicate_groups() {
        let mut config = config();
        config.groups.push(config.groups[1].clone());

        assert_eq!(
            config.validate(),
            Err(ValidationError::DuplicateGroup("payment".to_string()))
        );
    }

    #[test]
    fn rejects_unknown_group_members() {
        let mut config = config();
        config.groups[0].tables.push("refund".to_string());

        assert_eq!(
            config.validate(),
            Err(ValidationError::UnknownGroupMember {
                group: "booking".to_string(),
                table: "refund".to_string(),
            })
        );
    }

    #[test]
    fn rejects_missing_filter_columns() {
        let mut config = config();
        config.tables[1].columns.retain(|column| column.name != "paid_at");

        assert_eq!(
            config.validate(),
            Err(ValidationError::MissingFilterColumn {
                table: "payment".to_string(),
                column: "paid_at".to_string(),
            })
        );
    }

    #[test]
    fn rejects_filter_columns_not_declared_as_timestamp() {
        let mut config = config();
        config.tables[0].columns[1].column_type = ColumnType::String;

        assert_eq!(
            config.validate(),
            Err(ValidationError::FilterColumnNotTimestamp {
                table: "booking".to_string(),
                column: "created_at".to_string(),
                declared: "string".to_string(),
            })
        );
    }

    #[test]
    fn rejects_out_of_range_locator_settings() {
        let mut config = config();
        config.locator.tolerance_secs = u64::MAX;

        assert!(matches!(
            config.validate(),
            Err(ValidationError::InvalidFieldValue { ref field, .. }) if field == "locator.tolerance_secs"
        ));
    }
}
