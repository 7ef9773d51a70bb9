use thiserror::Error;

#[derive(Error, Debug)]
pub enum InsightsError {
    #[error("Generation error: {0}")]
    Generation(String),

    #[error("No SQL statement found in model output: {0}")]
    NoSqlExtracted(String),

    #[error("Structurally invalid SQL: {0}")]
    StructuralInvalid(String),

    #[error("SQL rejected by semantic check, retry budget exhausted: {0}")]
    SemanticRejected(String),

    #[error("Disallowed statement: {0}")]
    DisallowedStatement(String),

    #[error("Query rejected by database: {0}")]
    QueryRejected(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Chat transport error: {0}")]
    Transport(String),
}

impl InsightsError {
    /// Failures caused by what was asked rather than by the system itself.
    /// The chat front end answers these with a "please rephrase" message.
    pub fn is_user_facing(&self) -> bool {
        matches!(
            self,
            InsightsError::NoSqlExtracted(_)
                | InsightsError::StructuralInvalid(_)
                | InsightsError::SemanticRejected(_)
                | InsightsError::DisallowedStatement(_)
                | InsightsError::QueryRejected(_)
        )
    }
}

impl From<sqlx::Error> for InsightsError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            // The server parsed and refused the statement (unknown column, bad cast, ...)
            sqlx::Error::Database(db_err) => InsightsError::QueryRejected(db_err.to_string()),
            other => InsightsError::Database(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, InsightsError>;
