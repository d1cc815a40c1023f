use crate::session::IpFamily;
use crate::types::{Presentation, ReturnMode, SearchTarget};
use crate::validate::SearchRequest;
use clap::{ArgAction, Parser};

const AFTER_HELP: &str = "\
for -A and -B, use absolute format YYYY-MM-DD[ HH:MM:SS],
\tor relative format %dw%dd%dh%dm%ds.
use -c to get complete (strict) time matching for -A and -B.
use -d one or more times to ramp up the diagnostic output.
use -F to get batch mode output.
use -T to get batch mode output with deduplicated rrtypes.
use --force to issue possibly invalid or non-useful queries.

for -u, system must be one of:
\tdnsdb2

Getting Started:
\tAdd your API key to ~/.dnsdb-query.conf like this:
\t\tDNSDB_API_KEY=\"YOURAPIKEYHERE\"";

#[derive(Parser, Debug, Clone)]
#[command(
    name = "dnsdbflex",
    about = "Flexible glob and regex searches against passive DNS",
    after_help = AFTER_HELP,
    disable_version_flag = true
)]
pub struct Args {
    /// Search with a regular expression
    #[arg(long = "regex", value_name = "REGEX")]
    pub regex: Option<String>,

    /// Search with a glob
    #[arg(long = "glob", value_name = "GLOB")]
    pub glob: Option<String>,

    /// Drop results matching this glob or regex
    #[arg(long = "exclude", value_name = "GLOB|REGEX")]
    pub exclude: Option<String>,

    /// Issue possibly invalid or non-useful queries
    #[arg(long = "force")]
    pub force: bool,

    /// Return mode: terse|t (or details|d when built with details support)
    #[arg(long = "mode", value_name = "MODE")]
    pub mode: Option<ReturnMode>,

    /// What to search: rrnames|n or rdata|d
    #[arg(short = 's', value_name = "WHAT", default_value = "rrnames")]
    pub search_target: SearchTarget,

    /// Restrict results to this RRtype
    #[arg(short = 't', value_name = "RRTYPE")]
    pub rrtype: Option<String>,

    /// Only records seen after this time
    #[arg(short = 'A', value_name = "AFTER", allow_hyphen_values = true)]
    pub after: Option<String>,

    /// Only records seen before this time
    #[arg(short = 'B', value_name = "BEFORE", allow_hyphen_values = true)]
    pub before: Option<String>,

    /// Complete (strict) time matching for -A and -B
    #[arg(short = 'c')]
    pub complete: bool,

    /// Maximum number of records requested from the server
    #[arg(short = 'l', value_name = "QUERY-LIMIT", allow_negative_numbers = true)]
    pub query_limit: Option<i64>,

    /// Maximum number of records written
    #[arg(short = 'L', value_name = "OUTPUT-LIMIT", allow_negative_numbers = true)]
    pub output_limit: Option<i64>,

    /// Skip this many results
    #[arg(short = 'O', value_name = "OFFSET", allow_negative_numbers = true)]
    pub offset: Option<i64>,

    /// Passive DNS system to query
    #[arg(short = 'u', value_name = "SYSTEM")]
    pub system: Option<String>,

    /// Request timeout in seconds
    #[arg(long = "timeout", value_name = "SECONDS")]
    pub timeout: Option<String>,

    /// JSON output (default). Of -j, -F and -T the last one given wins
    #[arg(short = 'j', overrides_with_all = ["batch", "batch_dedup"])]
    pub json: bool,

    /// Batch output
    #[arg(short = 'F', overrides_with_all = ["json", "batch_dedup"])]
    pub batch: bool,

    /// Batch output with deduplicated rrtypes
    #[arg(short = 'T', overrides_with_all = ["json", "batch"])]
    pub batch_dedup: bool,

    /// Raise diagnostic output; may be repeated
    #[arg(short = 'd', action = ArgAction::Count)]
    pub debug: u8,

    /// Warning reticence
    #[arg(short = 'q')]
    pub quiet: bool,

    /// Turn off TLS certificate verification
    #[arg(short = 'U')]
    pub no_verify: bool,

    /// Connect over IPv4 only
    #[arg(short = '4', conflicts_with = "ipv6")]
    pub ipv4: bool,

    /// Connect over IPv6 only
    #[arg(short = '6')]
    pub ipv6: bool,

    /// Show the program version
    #[arg(short = 'v')]
    pub version: bool,
}

impl Args {
    pub fn search_request(&self) -> SearchRequest {
        SearchRequest {
            glob: self.glob.clone(),
            regex: self.regex.clone(),
            exclude: self.exclude.clone(),
            search_target: self.search_target,
            return_mode: self.mode.unwrap_or_default(),
            rrtype: self.rrtype.clone(),
            after: self.after.clone(),
            before: self.before.clone(),
            complete: self.complete,
            query_limit: self.query_limit,
            output_limit: self.output_limit,
            offset: self.offset,
            force: self.force,
            // --force also lets non-printable patterns through
            allow_unprintable: self.force,
        }
    }

    pub fn presentation(&self) -> Presentation {
        if self.batch_dedup {
            Presentation::BatchDedup
        } else if self.batch {
            Presentation::Batch
        } else {
            Presentation::Json
        }
    }

    pub fn ip_family(&self) -> IpFamily {
        if self.ipv4 {
            IpFamily::V4
        } else if self.ipv6 {
            IpFamily::V6
        } else {
            IpFamily::Any
        }
    }

    pub fn log_level(&self) -> log::LevelFilter {
        match self.debug {
            0 => log::LevelFilter::Warn,
            1 => log::LevelFilter::Debug,
            _ => log::LevelFilter::Trace,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_glob_query() {
        let args = Args::try_parse_from([
            "dnsdbflex", "--glob", "*.example.com.", "-s", "n", "-t", "A", "-l", "10", "-F", "-dd",
        ])
        .unwrap();
        let request = args.search_request();
        assert_eq!(request.glob.as_deref(), Some("*.example.com."));
        assert_eq!(request.search_target, SearchTarget::Rrnames);
        assert_eq!(request.query_limit, Some(10));
        assert_eq!(args.presentation(), Presentation::Batch);
        assert_eq!(args.log_level(), log::LevelFilter::Trace);
    }

    #[test]
    fn test_relative_time_and_negative_limits() {
        let args = Args::try_parse_from(["dnsdbflex", "--regex", "^www", "-A", "-3600", "-l", "-1"]).unwrap();
        assert_eq!(args.after.as_deref(), Some("-3600"));
        assert_eq!(args.query_limit, Some(-1));
    }

    #[test]
    fn test_bad_search_target() {
        assert!(Args::try_parse_from(["dnsdbflex", "--glob", "a.", "-s", "x"]).is_err());
    }

    #[test]
    fn test_ip_family_conflict() {
        assert!(Args::try_parse_from(["dnsdbflex", "-4", "-6"]).is_err());
        let args = Args::try_parse_from(["dnsdbflex", "-6"]).unwrap();
        assert_eq!(args.ip_family(), IpFamily::V6);
    }

    #[test]
    fn test_last_presentation_flag_wins() {
        let args = Args::try_parse_from(["dnsdbflex", "--glob", "a.", "-T", "-j"]).unwrap();
        assert_eq!(args.presentation(), Presentation::Json);

        let args = Args::try_parse_from(["dnsdbflex", "--glob", "a.", "-j", "-T"]).unwrap();
        assert_eq!(args.presentation(), Presentation::BatchDedup);

        let args = Args::try_parse_from(["dnsdbflex", "--glob", "a.", "-T", "-F"]).unwrap();
        assert_eq!(args.presentation(), Presentation::Batch);
    }
}
