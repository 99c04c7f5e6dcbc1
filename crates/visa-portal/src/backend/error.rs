use serde::Serialize;

const MISSING_COLUMN_CODE: &str = "PGRST204";
const MISSING_FUNCTION_CODE: &str = "PGRST202";

/// Failure talking to the hosted database.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BackendError {
    #[error("database unreachable: {0}")]
    Network(String),
    #[error("database returned {status}: {message}")]
    Api {
        status: u16,
        code: Option<String>,
        message: String,
    },
    #[error("unexpected database payload: {0}")]
    Decode(String),
    #[error("no {table} row matched")]
    NotFound { table: String },
}

/// Column the database schema cache reported as unknown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MissingColumn {
    pub table: String,
    pub column: String,
}

impl BackendError {
    pub fn not_found(table: &str) -> Self {
        Self::NotFound {
            table: table.to_string(),
        }
    }

    /// Error the database raises when a payload names a column its schema cache lacks.
    pub fn schema_cache_column(table: &str, column: &str) -> Self {
        Self::Api {
            status: 400,
            code: Some(MISSING_COLUMN_CODE.to_string()),
            message: format!(
                "Could not find the '{column}' column of '{table}' in the schema cache"
            ),
        }
    }

    pub fn missing_function(function: &str) -> Self {
        Self::Api {
            status: 404,
            code: Some(MISSING_FUNCTION_CODE.to_string()),
            message: format!(
                "Could not find the function public.{function} in the schema cache"
            ),
        }
    }

    pub fn missing_column(&self) -> Option<MissingColumn> {
        let Self::Api { message, .. } = self else {
            return None;
        };

        let rest = message.split("Could not find the '").nth(1)?;
        let (column, rest) = rest.split_once('\'')?;
        let rest = rest.strip_prefix(" column of '")?;
        let (table, _) = rest.split_once('\'')?;

        Some(MissingColumn {
            table: table.to_string(),
            column: column.to_string(),
        })
    }

    pub fn is_missing_function(&self) -> bool {
        match self {
            Self::Api { code, message, .. } => {
                code.as_deref() == Some(MISSING_FUNCTION_CODE)
                    || message.contains("Could not find the function")
            }
            _ => false,
        }
    }

}
