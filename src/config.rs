use clap::ValueEnum;

/// Scrollability of result cursors requested from the driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, ValueEnum)]
pub enum ResultSetType {
    /// Rows can only be read front to back; paging skips rows one at a time.
    #[default]
    ForwardOnly,
    /// Random access cursor, insensitive to concurrent changes.
    ScrollInsensitive,
    /// Random access cursor, sensitive to concurrent changes.
    ScrollSensitive,
}

impl ResultSetType {
    #[must_use]
    pub fn is_scrollable(self) -> bool {
        !matches!(self, ResultSetType::ForwardOnly)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, ValueEnum)]
pub enum ResultSetConcurrency {
    #[default]
    ReadOnly,
    Updatable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum)]
pub enum ResultSetHoldability {
    HoldOverCommit,
    CloseAtCommit,
}

/// How a `Null` argument bound to a comparison placeholder is treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, ValueEnum)]
pub enum NullHandling {
    /// Bind SQL NULL like any other value.
    #[default]
    Bind,
    /// Compatibility mode: rewrite `col = ?` to `col is null` (and `<>`/`!=`
    /// to `is not null`) after the `where` keyword when the argument is null.
    ///
    /// This is a textual heuristic and can misfire on complex predicates.
    RewriteComparisons,
}

/// Options passed to the driver whenever a statement is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StatementOptions {
    pub result_set_type: ResultSetType,
    pub concurrency: ResultSetConcurrency,
    pub holdability: Option<ResultSetHoldability>,
}

/// Facade configuration.
///
/// ```rust
/// use sql_facade::prelude::*;
///
/// let config = SqlConfig::builder()
///     .cache_statements(true)
///     .result_set_type(ResultSetType::ScrollInsensitive)
///     .finish();
/// assert!(config.cache_statements);
/// assert!(config.cache_named_queries);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SqlConfig {
    pub cache_statements: bool,
    pub cache_named_queries: bool,
    pub enable_named_queries: bool,
    pub statement_options: StatementOptions,
    pub null_handling: NullHandling,
}

impl Default for SqlConfig {
    fn default() -> Self {
        Self {
            cache_statements: false,
            cache_named_queries: true,
            enable_named_queries: true,
            statement_options: StatementOptions::default(),
            null_handling: NullHandling::default(),
        }
    }
}

impl SqlConfig {
    #[must_use]
    pub fn builder() -> SqlConfigBuilder {
        SqlConfigBuilder::default()
    }
}

/// Fluent builder for [`SqlConfig`].
#[derive(Debug, Clone, Default)]
pub struct SqlConfigBuilder {
    config: SqlConfig,
}

impl SqlConfigBuilder {
    #[must_use]
    pub fn cache_statements(mut self, enabled: bool) -> Self {
        self.config.cache_statements = enabled;
        self
    }

    #[must_use]
    pub fn cache_named_queries(mut self, enabled: bool) -> Self {
        self.config.cache_named_queries = enabled;
        self
    }

    #[must_use]
    pub fn enable_named_queries(mut self, enabled: bool) -> Self {
        self.config.enable_named_queries = enabled;
        self
    }

    #[must_use]
    pub fn result_set_type(mut self, result_set_type: ResultSetType) -> Self {
        self.config.statement_options.result_set_type = result_set_type;
        self
    }

    #[must_use]
    pub fn result_set_concurrency(mut self, concurrency: ResultSetConcurrency) -> Self {
        self.config.statement_options.concurrency = concurrency;
        self
    }

    #[must_use]
    pub fn result_set_holdability(mut self, holdability: ResultSetHoldability) -> Self {
        self.config.statement_options.holdability = Some(holdability);
        self
    }

    #[must_use]
    pub fn null_handling(mut self, null_handling: NullHandling) -> Self {
        self.config.null_handling = null_handling;
        self
    }

    #[must_use]
    pub fn finish(self) -> SqlConfig {
        self.config
    }
}
