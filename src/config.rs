use std::time::Duration;

pub const MEMORY_DATABASE: &str = ":memory:";

/// Session configuration
///
/// Built with chained setters or parsed from a `sqlite:` URL.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Database file path, or `:memory:`
    pub database: String,

    /// How many levels of foreign-key fields are loaded eagerly.
    /// Zero leaves references as bare identities.
    pub reference_depth: usize,

    /// Log every rendered statement at debug level
    pub log_statements: bool,

    /// Enforce foreign-key constraints in the engine
    pub foreign_keys: bool,

    /// How long a writer waits on a locked database
    pub busy_timeout: Duration,
}

impl SessionConfig {
    pub fn new(database: &str) -> Self {
        Self {
            database: database.to_string(),
            reference_depth: 0,
            log_statements: false,
            foreign_keys: true,
            busy_timeout: Duration::from_secs(5),
        }
    }

    pub fn memory() -> Self {
        Self::new(MEMORY_DATABASE)
    }

    pub fn is_memory(&self) -> bool {
        self.database == MEMORY_DATABASE
    }

    pub fn reference_depth(mut self, depth: usize) -> Self {
        self.reference_depth = depth;
        self
    }

    pub fn log_statements(mut self, enabled: bool) -> Self {
        self.log_statements = enabled;
        self
    }

    pub fn foreign_keys(mut self, enabled: bool) -> Self {
        self.foreign_keys = enabled;
        self
    }

    pub fn busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = timeout;
        self
    }

    /// Parse from a connection URL
    ///
    /// Format: `sqlite::memory:` or `sqlite://path/to/db?reference_depth=2&log_statements=true`
    ///
    /// # Examples
    ///
    /// ```
    /// use rustmemorm::SessionConfig;
    ///
    /// let config = SessionConfig::from_url("sqlite://app.db?reference_depth=1").unwrap();
    /// assert_eq!(config.database, "app.db");
    /// assert_eq!(config.reference_depth, 1);
    /// ```
    pub fn from_url(url: &str) -> Result<Self, String> {
        if url == "sqlite::memory:" {
            return Ok(Self::memory());
        }

        let rest = url
            .strip_prefix("sqlite://")
            .ok_or_else(|| "URL must start with sqlite:// or be sqlite::memory:".to_string())?;

        let (path, query) = match rest.split_once('?') {
            Some((path, query)) => (path, Some(query)),
            None => (rest, None),
        };

        if path.is_empty() {
            return Err("Missing database path".to_string());
        }

        let mut config = Self::new(path);

        for pair in query.into_iter().flat_map(|q| q.split('&')).filter(|p| !p.is_empty()) {
            let (key, value) = pair
                .split_once('=')
                .ok_or_else(|| format!("Invalid parameter: {}", pair))?;
            match key {
                "reference_depth" => {
                    config.reference_depth = value
                        .parse()
                        .map_err(|_| format!("Invalid reference_depth: {}", value))?;
                }
                "log_statements" => {
                    config.log_statements = parse_flag(key, value)?;
                }
                "foreign_keys" => {
                    config.foreign_keys = parse_flag(key, value)?;
                }
                "busy_timeout_ms" => {
                    let millis: u64 = value
                        .parse()
                        .map_err(|_| format!("Invalid busy_timeout_ms: {}", value))?;
                    config.busy_timeout = Duration::from_millis(millis);
                }
                other => return Err(format!("Unknown parameter: {}", other)),
            }
        }

        Ok(config)
    }
}

fn parse_flag(key: &str, value: &str) -> Result<bool, String> {
    match value {
        "true" | "1" | "on" => Ok(true),
        "false" | "0" | "off" => Ok(false),
        _ => Err(format!("Invalid {}: {}", key, value)),
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self::memory()
    }
}
