// src/validate.rs
use crate::error::Result;
use crate::time;
use crate::types::{FlexError, QueryDescriptor, ReturnMode, SearchMethod, SearchTarget};

/// Longest accepted pattern or option argument, in bytes.
pub const MAX_VALUE_LEN: usize = 1024;

const UNPRINTABLE_MESSAGE: &str = "expression argument is not printable ASCII.\n\
    Use \\DDD to encode non-printable characters, where DDD is the decimal value of the character";

/// Raw search options as collected from the command line.
#[derive(Debug, Clone, Default)]
pub struct SearchRequest {
    pub glob: Option<String>,
    pub regex: Option<String>,
    pub exclude: Option<String>,
    pub search_target: SearchTarget,
    pub return_mode: ReturnMode,
    pub rrtype: Option<String>,
    pub after: Option<String>,
    pub before: Option<String>,
    pub complete: bool,
    pub query_limit: Option<i64>,
    pub output_limit: Option<i64>,
    pub offset: Option<i64>,
    /// Downgrade the glob suffix check to a warning.
    pub force: bool,
    /// Skip the printable-ASCII check on patterns.
    pub allow_unprintable: bool,
}

/// A descriptor that passed validation, plus any non-fatal diagnostics.
#[derive(Debug, Clone)]
pub struct Validated {
    pub descriptor: QueryDescriptor,
    pub warnings: Vec<String>,
}

pub fn validate(request: SearchRequest) -> Result<Validated> {
    check_argument("--glob", request.glob.as_deref())?;
    check_argument("--regex", request.regex.as_deref())?;
    check_argument("--exclude", request.exclude.as_deref())?;

    let after = parse_bound("-A", request.after.as_deref())?;
    let before = parse_bound("-B", request.before.as_deref())?;
    let query_limit = non_negative("-l", request.query_limit)?;
    let mut output_limit = non_negative("-L", request.output_limit)?;
    let offset = non_negative("-O", request.offset)?.unwrap_or(0);

    let (search_method, value) = match (request.glob, request.regex) {
        (Some(_), Some(_)) => {
            return Err(FlexError::usage("Cannot specify --glob or --regex more than once"));
        }
        (Some(glob), None) => (SearchMethod::Glob, glob),
        (None, Some(regex)) => (SearchMethod::Regex, regex),
        (None, None) => {
            return Err(FlexError::usage(
                "Need to provide a --regex or --glob option and its argument",
            ));
        }
    };

    let mut warnings = Vec::new();
    match search_method {
        SearchMethod::Glob => {
            if let Some(warning) =
                check_glob_trailing_char(&value, request.search_target, request.force)?
            {
                warnings.push(warning);
            }
        }
        SearchMethod::Regex if request.force => {
            return Err(FlexError::usage("--force only makes sense with a glob query"));
        }
        SearchMethod::Regex => {}
    }

    if !request.allow_unprintable {
        check_printable_ascii(&value)?;
        if let Some(exclude) = &request.exclude {
            check_printable_ascii(exclude)?;
        }
    }

    if output_limit.is_none() && query_limit.is_some() {
        output_limit = query_limit;
    }

    if let (Some(after), Some(before)) = (after, before) {
        if request.complete && after > before {
            return Err(FlexError::usage(
                "-A value must be before -B value if using complete time matching",
            ));
        }
    }
    if request.complete && after.is_none() && before.is_none() {
        return Err(FlexError::usage("-c without -A or -B makes no sense."));
    }

    Ok(Validated {
        descriptor: QueryDescriptor {
            search_method,
            search_target: request.search_target,
            return_mode: request.return_mode,
            value,
            exclude: request.exclude,
            rrtype: request.rrtype,
            after,
            before,
            complete: request.complete,
            query_limit,
            output_limit,
            offset,
        },
        warnings,
    })
}

/// Rejects an empty or overlong option argument. `None` passes.
pub fn check_argument(option: &str, value: Option<&str>) -> Result<()> {
    match value {
        Some("") => Err(FlexError::usage(format!(
            "The {} option requires a non-empty argument",
            option
        ))),
        Some(v) if v.len() > MAX_VALUE_LEN => Err(FlexError::usage(format!(
            "The {} option is too long ({} is the maximum length)",
            option, MAX_VALUE_LEN
        ))),
        _ => Ok(()),
    }
}

fn parse_bound(option: &str, value: Option<&str>) -> Result<Option<i64>> {
    match value {
        None => Ok(None),
        Some(v) => match time::parse_time(v) {
            Some(t) if t > 0 => Ok(Some(t)),
            _ => Err(FlexError::usage(format!("bad {} timestamp", option))),
        },
    }
}

fn non_negative(option: &str, value: Option<i64>) -> Result<Option<u64>> {
    match value {
        None => Ok(None),
        Some(v) => u64::try_from(v)
            .map(Some)
            .map_err(|_| FlexError::usage(format!("{} must be zero or positive", option))),
    }
}

/// Fails unless every byte is printable ASCII (0x20..=0x7e).
pub fn check_printable_ascii(value: &str) -> Result<()> {
    if value.bytes().all(|b| (0x20..=0x7e).contains(&b)) {
        Ok(())
    } else {
        Err(FlexError::usage(UNPRINTABLE_MESSAGE))
    }
}

/// A glob is only useful to the backend if it ends in a period or a glob
/// metacharacter; rdata globs may also end in a double quote.
///
/// Returns a warning when `warn_only`, an error otherwise.
pub fn check_glob_trailing_char(
    value: &str,
    target: SearchTarget,
    warn_only: bool,
) -> Result<Option<String>> {
    let last = match value.chars().last() {
        Some(c) => c,
        None => return Err(FlexError::usage("search argument is blank.")),
    };

    if matches!(last, '*' | '?' | ']' | '.') {
        return Ok(None);
    }

    let msg = match target {
        SearchTarget::Rdata if last == '"' => return Ok(None),
        SearchTarget::Rdata => {
            "a glob search argument for rdata should end either in a period,\n\
             a double quote, or certain glob special characters (*, ?, or ])."
        }
        SearchTarget::Rrnames => {
            "a glob search argument for rrnames should end either in a period\n\
             or certain glob special characters (*, ?, or ])."
        }
    };
    let text = format!("{}\nYou may not get results from your search.", msg);

    if warn_only {
        Ok(Some(text))
    } else {
        Err(FlexError::usage(text))
    }
}
