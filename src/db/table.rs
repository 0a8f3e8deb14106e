//! Validated, quoted Postgres table identifiers.

use crate::types::{AppError, AppResult};

/// Table holding the stored chunks, optionally schema-qualified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableName {
    schema: Option<String>,
    table: String,
}

impl TableName {
    /// Parse `table` or `schema.table`. Each part must be a plain SQL
    /// identifier (letters, digits, underscores, not starting with a digit).
    pub fn parse(raw: &str) -> AppResult<Self> {
        let raw = raw.trim();
        let (schema, table) = match raw.split_once('.') {
            Some((schema, table)) => (Some(schema), table),
            None => (None, raw),
        };

        if let Some(schema) = schema {
            validate_ident(schema)?;
        }
        validate_ident(table)?;

        Ok(Self {
            schema: schema.map(str::to_string),
            table: table.to_string(),
        })
    }

    /// Quoted reference usable directly in SQL text.
    pub fn qualified(&self) -> String {
        match &self.schema {
            Some(schema) => format!("{}.{}", quote_ident(schema), quote_ident(&self.table)),
            None => quote_ident(&self.table),
        }
    }

    pub fn table(&self) -> &str {
        &self.table
    }
}

fn validate_ident(ident: &str) -> AppResult<()> {
    let mut chars = ident.chars();
    let valid = match chars.next() {
        Some(first) => {
            (first.is_ascii_alphabetic() || first == '_')
                && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        None => false,
    };

    if valid {
        Ok(())
    } else {
        Err(AppError::Configuration(format!("invalid table identifier {ident:?}")))
    }
}

pub fn quote_ident(input: &str) -> String {
    format!("\"{}\"", input.replace('"', "\"\""))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_table() {
        let table = TableName::parse("vectors").unwrap();
        assert_eq!(table.qualified(), "\"vectors\"");
        assert_eq!(table.table(), "vectors");
    }

    #[test]
    fn test_schema_qualified() {
        let table = TableName::parse("rag.chunk_vectors").unwrap();
        assert_eq!(table.qualified(), "\"rag\".\"chunk_vectors\"");
    }

    #[test]
    fn test_rejects_injection() {
        assert!(TableName::parse("vectors; DROP TABLE users").is_err());
        assert!(TableName::parse("").is_err());
        assert!(TableName::parse("1vectors").is_err());
        assert!(TableName::parse("a.b.c").is_err());
        assert!(TableName::parse("\"quoted\"").is_err());
    }

    #[test]
    fn test_quote_ident_escapes() {
        assert_eq!(quote_ident("we\"ird"), "\"we\"\"ird\"");
    }
}
