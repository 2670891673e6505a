//! Error types for scalar relation resolution.

use std::fmt;

/// The primary error type for all resolver and query operations.
#[derive(Debug)]
pub enum Error {
    /// Connection-related errors (connect, disconnect, timeout)
    Connection(ConnectionError),
    /// Query execution errors
    Query(QueryError),
    /// Type conversion errors and missing result columns
    Type(TypeError),
    /// Relation or entity configuration errors
    Config(ConfigError),
    /// A relation name that is not registered for an entity type
    NotFound(NotFoundError),
    /// A registered relation whose query does not fit the requested entity type
    TypeMismatch(TypeMismatchError),
    /// Operation timed out
    Timeout,
    /// Operation was cancelled via asupersync
    Cancelled,
    /// Custom error with message
    Custom(String),
}

#[derive(Debug)]
pub struct ConnectionError {
    pub kind: ConnectionErrorKind,
    pub message: String,
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionErrorKind {
    /// Failed to establish connection
    Connect,
    /// Connection lost during operation
    Disconnected,
    /// Connection pool exhausted
    PoolExhausted,
}

#[derive(Debug)]
pub struct QueryError {
    pub kind: QueryErrorKind,
    pub sql: Option<String>,
    pub sqlstate: Option<String>,
    pub message: String,
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryErrorKind {
    /// Syntax error in SQL
    Syntax,
    /// Table or column not found
    NotFound,
    /// Permission denied
    Permission,
    /// Deadlock detected
    Deadlock,
    /// Statement timeout
    Timeout,
    /// Other database error
    Database,
}

#[derive(Debug)]
pub struct TypeError {
    pub expected: &'static str,
    pub actual: String,
    pub column: Option<String>,
}

/// Misconfiguration detected before any query runs.
#[derive(Debug)]
pub struct ConfigError {
    pub message: String,
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

/// A relation that is not registered on an entity type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotFoundError {
    pub relation: String,
    pub entity: String,
}

/// A registry entry whose query factory builds for a different entity type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeMismatchError {
    pub relation: String,
    pub entity: String,
    pub expected: &'static str,
}

impl Error {
    /// Shorthand for a configuration error without a source.
    pub fn config(message: impl Into<String>) -> Self {
        Error::Config(ConfigError {
            message: message.into(),
            source: None,
        })
    }

    /// Is this a misconfiguration (raised before anything executes)?
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            Error::Config(_) | Error::NotFound(_) | Error::TypeMismatch(_)
        )
    }

    /// Is this a retryable error (deadlock, pool exhausted, timeouts)?
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Query(q) => matches!(q.kind, QueryErrorKind::Deadlock | QueryErrorKind::Timeout),
            Error::Connection(c) => matches!(c.kind, ConnectionErrorKind::PoolExhausted),
            Error::Timeout => true,
            _ => false,
        }
    }

    /// Get the SQL that caused this error, if available
    pub fn sql(&self) -> Option<&str> {
        match self {
            Error::Query(q) => q.sql.as_deref(),
            _ => None,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Connection(e) => write!(f, "Connection error: {}", e.message),
            Error::Query(e) => {
                if let Some(sqlstate) = &e.sqlstate {
                    write!(f, "Query error (SQLSTATE {}): {}", sqlstate, e.message)
                } else {
                    write!(f, "Query error: {}", e.message)
                }
            }
            Error::Type(e) => {
                if let Some(col) = &e.column {
                    write!(
                        f,
                        "Type error in column '{}': expected {}, found {}",
                        col, e.expected, e.actual
                    )
                } else {
                    write!(f, "Type error: expected {}, found {}", e.expected, e.actual)
                }
            }
            Error::Config(e) => write!(f, "Configuration error: {}", e.message),
            Error::NotFound(e) => write!(f, "Not found: {}", e),
            Error::TypeMismatch(e) => write!(f, "Type mismatch: {}", e),
            Error::Timeout => write!(f, "Operation timed out"),
            Error::Cancelled => write!(f, "Operation cancelled"),
            Error::Custom(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Connection(e) => e
                .source
                .as_deref()
                .map(|err| err as &(dyn std::error::Error + 'static)),
            Error::Query(e) => e
                .source
                .as_deref()
                .map(|err| err as &(dyn std::error::Error + 'static)),
            Error::Config(e) => e
                .source
                .as_deref()
                .map(|err| err as &(dyn std::error::Error + 'static)),
            _ => None,
        }
    }
}

impl fmt::Display for ConnectionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl fmt::Display for QueryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(sqlstate) = &self.sqlstate {
            write!(f, "{} (SQLSTATE {})", self.message, sqlstate)
        } else {
            write!(f, "{}", self.message)
        }
    }
}

impl fmt::Display for TypeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(col) = &self.column {
            write!(
                f,
                "expected {} for column '{}', found {}",
                self.expected, col, self.actual
            )
        } else {
            write!(f, "expected {}, found {}", self.expected, self.actual)
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl fmt::Display for NotFoundError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "relation '{}' is not defined for {}",
            self.relation, self.entity
        )
    }
}

impl fmt::Display for TypeMismatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "relation '{}' on {} does not build a {}",
            self.relation, self.entity, self.expected
        )
    }
}

impl From<ConnectionError> for Error {
    fn from(err: ConnectionError) -> Self {
        Error::Connection(err)
    }
}

impl From<QueryError> for Error {
    fn from(err: QueryError) -> Self {
        Error::Query(err)
    }
}

impl From<TypeError> for Error {
    fn from(err: TypeError) -> Self {
        Error::Type(err)
    }
}

impl From<ConfigError> for Error {
    fn from(err: ConfigError) -> Self {
        Error::Config(err)
    }
}

impl From<NotFoundError> for Error {
    fn from(err: NotFoundError) -> Self {
        Error::NotFound(err)
    }
}

impl From<TypeMismatchError> for Error {
    fn from(err: TypeMismatchError) -> Self {
        Error::TypeMismatch(err)
    }
}

/// Result type alias for resolver operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_names_relation_and_entity() {
        let err = Error::from(NotFoundError {
            relation: "activeOrders".to_string(),
            entity: "users".to_string(),
        });

        assert_eq!(
            err.to_string(),
            "Not found: relation 'activeOrders' is not defined for users"
        );
        assert!(err.is_config_error());
    }

    #[test]
    fn query_errors_are_not_config_errors() {
        let err = Error::Query(QueryError {
            kind: QueryErrorKind::Deadlock,
            sql: Some("SELECT 1".to_string()),
            sqlstate: Some("40P01".to_string()),
            message: "deadlock detected".to_string(),
            source: None,
        });

        assert!(!err.is_config_error());
        assert!(err.is_retryable());
        assert_eq!(err.sql(), Some("SELECT 1"));
        assert_eq!(
            err.to_string(),
            "Query error (SQLSTATE 40P01): deadlock detected"
        );
    }

    #[test]
    fn config_source_is_chained() {
        use std::error::Error as _;

        let err = Error::Config(ConfigError {
            message: "bad relation".to_string(),
            source: Some(Box::new(Error::Custom("inner".to_string()))),
        });

        assert_eq!(err.source().map(ToString::to_string).as_deref(), Some("inner"));
        assert!(Error::config("plain").source().is_none());
    }
}
