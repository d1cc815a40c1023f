// src/types.rs
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// How the search pattern is interpreted by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchMethod {
    Glob,
    Regex,
}

impl SearchMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            SearchMethod::Glob => "glob",
            SearchMethod::Regex => "regex",
        }
    }
}

/// Which side of the resource record the pattern is matched against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SearchTarget {
    #[default]
    Rrnames,
    Rdata,
}

impl SearchTarget {
    pub fn as_str(&self) -> &'static str {
        match self {
            SearchTarget::Rrnames => "rrnames",
            SearchTarget::Rdata => "rdata",
        }
    }
}

impl FromStr for SearchTarget {
    type Err = String;

    // n and d are accepted as abbreviations
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "rrnames" | "n" => Ok(SearchTarget::Rrnames),
            "rdata" | "d" => Ok(SearchTarget::Rdata),
            _ => Err("Illegal what to search, must be 'rrnames'|'n' or 'rdata'|'d'".to_string()),
        }
    }
}

/// Response verbosity requested from the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReturnMode {
    Terse,
    Details,
}

impl Default for ReturnMode {
    #[cfg(feature = "details")]
    fn default() -> Self {
        ReturnMode::Details
    }

    #[cfg(not(feature = "details"))]
    fn default() -> Self {
        ReturnMode::Terse
    }
}

impl FromStr for ReturnMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "terse" | "t" => Ok(ReturnMode::Terse),
            #[cfg(feature = "details")]
            "details" | "d" => Ok(ReturnMode::Details),
            #[cfg(feature = "details")]
            _ => Err("Illegal mode value, must be 'terse'|'t' or 'details'|'d'".to_string()),
            #[cfg(not(feature = "details"))]
            _ => Err("Illegal mode value, must be 'terse'|'t'".to_string()),
        }
    }
}

/// A fully validated search request. Built only by `validate::validate`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryDescriptor {
    pub search_method: SearchMethod,
    pub search_target: SearchTarget,
    pub return_mode: ReturnMode,
    pub value: String,
    pub exclude: Option<String>,
    pub rrtype: Option<String>,
    pub after: Option<i64>,
    pub before: Option<i64>,
    pub complete: bool,
    pub query_limit: Option<u64>,
    pub output_limit: Option<u64>,
    pub offset: u64,
}

impl fmt::Display for QueryDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "qdesc[ {} {} '{}'",
            self.search_method.as_str(),
            self.search_target.as_str(),
            self.value
        )?;
        if let Some(rrtype) = &self.rrtype {
            write!(f, ", rr '{}'", rrtype)?;
        }
        if let Some(after) = self.after {
            write!(f, " -A{}({})", after, crate::time::time_str(after))?;
        }
        if let Some(before) = self.before {
            write!(f, " -B{}({})", before, crate::time::time_str(before))?;
        }
        if let Some(limit) = self.query_limit {
            write!(f, " -l{}", limit)?;
        }
        if let Some(limit) = self.output_limit {
            write!(f, " -L{}", limit)?;
        }
        if self.offset > 0 {
            write!(f, " -O{}", self.offset)?;
        }
        if self.complete {
            write!(f, " -c")?;
        }
        if let Some(exclude) = &self.exclude {
            write!(f, " --exclude={}", exclude)?;
        }
        write!(f, " ]")
    }
}

/// The backend-independent part of a request path:
/// `{glob|regex}/{rrnames|rdata}/{value}[/{rrtype}]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryPath {
    pub method: SearchMethod,
    pub target: SearchTarget,
    pub value: String,
    pub rrtype: Option<String>,
}

impl QueryPath {
    /// Same layout as `Display`, with the user supplied segments
    /// percent-encoded for embedding in a URL.
    pub fn encoded(&self) -> String {
        let mut path = format!(
            "{}/{}/{}",
            self.method.as_str(),
            self.target.as_str(),
            urlencoding::encode(&self.value)
        );
        if let Some(rrtype) = &self.rrtype {
            path.push('/');
            path.push_str(&urlencoding::encode(rrtype));
        }
        path
    }
}

impl fmt::Display for QueryPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.method.as_str(), self.target.as_str(), self.value)?;
        if let Some(rrtype) = &self.rrtype {
            write!(f, "/{}", rrtype)?;
        }
        Ok(())
    }
}

/// How result records are rendered on stdout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Presentation {
    #[default]
    Json,
    Batch,
    BatchDedup,
}

#[derive(Debug, Error)]
pub enum FlexError {
    #[error("{0}")]
    UsageError(String),

    #[error("{0}")]
    ConfigError(String),

    #[error("{backend}: {message}")]
    BackendError {
        backend: String,
        message: String,
    },

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Output error: {0}")]
    OutputError(String),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

impl FlexError {
    pub fn usage(message: impl Into<String>) -> Self {
        FlexError::UsageError(message.into())
    }
}
