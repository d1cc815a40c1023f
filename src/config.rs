// src/config.rs
use crate::backends::{all_backends, create_backend, Backend, SelectedBackend, DEFAULT_BACKEND};
use crate::error::{ErrorContext, Result};
use crate::types::FlexError;
use crate::validate;
use log::{debug, warn};
use std::env;
use std::ffi::OsString;
use std::fs::File;
use std::io::{BufRead, Cursor};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

/// Names an explicit config file; bypasses the search list.
pub const ENV_CONFIG_FILE: &str = "DNSDBQ_CONFIG_FILE";
/// Shell variable in the config file that selects a backend.
pub const ENV_SYSTEM: &str = "DNSDBQ_SYSTEM";
/// Default request timeout in seconds.
pub const ENV_TIMEOUT: &str = "DNSDBQ_TIMEOUT";

/// Config namespace for settings that belong to this tool rather than a backend.
pub const TOOL_NAMESPACE: &str = "dnsdbq";

const CONF_FILES: &[&str] = &[
    "~/.isc-dnsdb-query.conf",
    "~/.dnsdb-query.conf",
    "/etc/isc-dnsdb-query.conf",
    "/etc/dnsdb-query.conf",
];

const CONF_LINE_MAX: usize = 4096;

/// Parse a timeout in seconds. `source` names the option or variable for the message.
pub fn parse_timeout(value: &str, source: &str) -> Result<u64> {
    value
        .trim()
        .parse::<u64>()
        .map_err(|_| FlexError::usage(format!("{} must be non-negative", source)))
}

/// Parse the `--timeout` argument, which overrides the environment.
pub fn timeout_from_option(value: &str) -> Result<u64> {
    validate::check_argument("--timeout", Some(value))?;
    parse_timeout(value, "--timeout")
}

/// Read the default timeout from the environment, if set.
pub fn timeout_from_env() -> Result<Option<u64>> {
    match env::var(ENV_TIMEOUT) {
        Ok(value) => parse_timeout(&value, ENV_TIMEOUT).map(Some),
        Err(_) => Ok(None),
    }
}

fn expand_home(path: &str) -> Option<PathBuf> {
    match path.strip_prefix("~/") {
        Some(rest) => env::var_os("HOME").map(|home| PathBuf::from(home).join(rest)),
        None => Some(PathBuf::from(path)),
    }
}

pub fn default_candidates() -> Vec<PathBuf> {
    CONF_FILES.iter().filter_map(|p| expand_home(p)).collect()
}

/// Find the config file for this run, honouring `DNSDBQ_CONFIG_FILE`.
pub fn locate_config() -> Result<Option<PathBuf>> {
    locate_config_from(env::var_os(ENV_CONFIG_FILE), &default_candidates())
}

/// An explicit path must be readable; otherwise the first readable
/// candidate wins, and no readable candidate means no config.
pub fn locate_config_from(
    explicit: Option<OsString>,
    candidates: &[PathBuf],
) -> Result<Option<PathBuf>> {
    if let Some(path) = explicit {
        let path = PathBuf::from(path);
        File::open(&path).or_flex(FlexError::ConfigError, || {
            format!(
                "Cannot read configuration file '{}' named in env variable",
                path.display()
            )
        })?;
        debug!("conf found via env variable: '{}'", path.display());
        return Ok(Some(path));
    }

    let found = candidates.iter().find(|path| File::open(path).is_ok()).cloned();
    match &found {
        Some(path) => debug!("conf found: '{}'", path.display()),
        None => debug!("no config file found"),
    }
    Ok(found)
}

fn shell_quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', r"'\''"))
}

/// Shell script that sources `path` and echoes one
/// `namespace key value` line per setting of interest.
pub fn shell_script(path: &Path, backends: &[Box<dyn Backend>]) -> String {
    let mut script = format!(". {};", shell_quote(&path.to_string_lossy()));
    script.push_str(&format!("echo {} system ${};", TOOL_NAMESPACE, ENV_SYSTEM));
    for backend in backends {
        for (key, expr) in backend.config_exports() {
            script.push_str(&format!("echo {} {} {};", backend.name(), key, expr));
        }
    }
    script.push_str("exit");
    script
}

/// Source the config file in `sh` and capture the emitted settings.
pub fn evaluate_config(path: &Path) -> Result<String> {
    let script = shell_script(path, &all_backends());
    debug!("conf cmd = '{}'", script);

    let output = Command::new("sh")
        .arg("-c")
        .arg(&script)
        .stdin(Stdio::null())
        .output()
        .or_flex(FlexError::ConfigError, || format!("[{}]", script))?;

    if !output.status.success() {
        warn!(
            "config evaluation of '{}' exited with {}: {}",
            path.display(),
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        );
    }

    String::from_utf8(output.stdout)
        .map_err(|e| FlexError::ConfigError(format!("{}: {}", path.display(), e)))
}

/// Resolves which backend serves this run and feeds it its settings.
///
/// A backend picked on the command line is never replaced. Otherwise the
/// `dnsdbq system` directive picks one, or failing that the first line
/// naming a known backend does.
#[derive(Debug, Default)]
pub struct ConfigResolver {
    selected: Option<SelectedBackend>,
}

impl ConfigResolver {
    pub fn new(cli_choice: Option<SelectedBackend>) -> Self {
        Self {
            selected: cli_choice,
        }
    }

    pub fn selected_name(&self) -> Option<&str> {
        self.selected.as_ref().map(|b| b.name())
    }

    /// Locate, evaluate and ingest the config file, then settle on a backend.
    pub fn resolve(mut self) -> Result<SelectedBackend> {
        if let Some(path) = locate_config()? {
            let settings = evaluate_config(&path)?;
            self.ingest(Cursor::new(settings))?;
        }
        self.finish()
    }

    /// Consume `namespace key value` lines.
    pub fn ingest<R: BufRead>(&mut self, mut reader: R) -> Result<()> {
        let mut line = String::new();
        let mut lineno = 0usize;
        loop {
            line.clear();
            let n = reader
                .read_line(&mut line)
                .map_err(|e| FlexError::ConfigError(format!("conf line #{}: {}", lineno + 1, e)))?;
            if n == 0 {
                return Ok(());
            }
            lineno += 1;
            if !line.ends_with('\n') || line.len() > CONF_LINE_MAX {
                return Err(FlexError::ConfigError(format!("conf line #{}: too long", lineno)));
            }
            self.ingest_line(lineno, &line)?;
        }
    }

    fn ingest_line(&mut self, lineno: usize, line: &str) -> Result<()> {
        let mut tokens = line.split([' ', '\n']).filter(|t| !t.is_empty());
        let (namespace, key) = match (tokens.next(), tokens.next()) {
            (Some(namespace), Some(key)) => (namespace, key),
            _ => {
                return Err(FlexError::ConfigError(format!("conf line #{}: malformed", lineno)));
            }
        };
        let value = match tokens.next() {
            Some(value) => value,
            // variable was not set in the config file
            None => return Ok(()),
        };

        if namespace == TOOL_NAMESPACE {
            // the config file never overrides -u
            if self.selected.is_none() && key == "system" {
                let backend = create_backend(value).ok_or_else(|| {
                    FlexError::ConfigError(format!("unknown {} {}", ENV_SYSTEM, value))
                })?;
                debug!("line #{}: {} selects system {}", lineno, ENV_SYSTEM, value);
                self.selected = Some(SelectedBackend::new(backend));
            }
            return Ok(());
        }

        if self.selected.is_none() {
            // first match wins and is sticky
            match create_backend(namespace) {
                Some(backend) => {
                    debug!("picked system {}", namespace);
                    self.selected = Some(SelectedBackend::new(backend));
                }
                None => return Ok(()),
            }
        }
        let selected = match self.selected.as_mut() {
            Some(selected) => selected,
            None => return Ok(()),
        };

        if namespace == selected.name() {
            debug!(
                "line #{}: sets {}|{}|{}",
                lineno,
                namespace,
                key,
                if key == "apikey" { "..." } else { value }
            );
            selected.settings_mut().ingest_setting(key, value)?;
        }
        Ok(())
    }

    /// Fall back to the default backend when nothing chose one.
    pub fn finish(self) -> Result<SelectedBackend> {
        match self.selected {
            Some(selected) => Ok(selected),
            None => create_backend(DEFAULT_BACKEND).map(SelectedBackend::new).ok_or_else(|| {
                FlexError::usage(format!(
                    "neither {} nor -u were specified, and there is no default.",
                    ENV_SYSTEM
                ))
            }),
        }
    }
}
