// src/backends/mod.rs
use crate::fence::Fence;
use crate::types::{FlexError, QueryDescriptor, QueryPath};
use std::fmt;
use std::ops::Deref;
use url::Url;

mod dnsdb;

pub use dnsdb::DnsdbBackend;

/// Backend used when neither `-u` nor the config file picks one.
pub const DEFAULT_BACKEND: &str = "dnsdb2";

const BACKEND_NAMES: &[&str] = &["dnsdb2"];

/// A passive DNS system that can answer flexible searches.
pub trait Backend: Send + Sync + fmt::Debug {
    /// Stable identifier, also the config-file namespace of its settings.
    fn name(&self) -> &str;

    /// Settings this backend reads from the config file, as
    /// `(key, shell expression)` pairs evaluated after sourcing it.
    fn config_exports(&self) -> &'static [(&'static str, &'static str)];

    /// Check that every required setting is present.
    fn ready(&self) -> Result<(), FlexError>;

    /// Store one setting from the config file.
    fn ingest_setting(&mut self, key: &str, value: &str) -> Result<(), FlexError>;

    fn build_url(
        &self,
        path: &QueryPath,
        qd: &QueryDescriptor,
        fence: &Fence,
    ) -> Result<Url, FlexError>;

    /// Extra headers sent with every request, e.g. credentials.
    fn request_headers(&self) -> Vec<(&'static str, String)>;

    /// Forget credentials and release anything the backend holds.
    fn teardown(&mut self);
}

pub fn create_backend(name: &str) -> Option<Box<dyn Backend>> {
    match name {
        "dnsdb2" => Some(Box::new(DnsdbBackend::new())),
        _ => None,
    }
}

pub fn backend_names() -> &'static [&'static str] {
    BACKEND_NAMES
}

pub fn all_backends() -> Vec<Box<dyn Backend>> {
    BACKEND_NAMES
        .iter()
        .filter_map(|name| create_backend(name))
        .collect()
}

/// The backend chosen for this run.
///
/// Only shared access is exposed once selection is finished; the backend
/// is torn down when the handle is dropped.
pub struct SelectedBackend {
    inner: Box<dyn Backend>,
}

impl SelectedBackend {
    pub fn new(inner: Box<dyn Backend>) -> Self {
        Self { inner }
    }

    pub(crate) fn settings_mut(&mut self) -> &mut (dyn Backend + 'static) {
        self.inner.as_mut()
    }
}

impl Deref for SelectedBackend {
    type Target = dyn Backend;

    fn deref(&self) -> &Self::Target {
        self.inner.as_ref()
    }
}

impl fmt::Debug for SelectedBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SelectedBackend").field(&self.inner.name()).finish()
    }
}

impl Drop for SelectedBackend {
    fn drop(&mut self) {
        log::debug!("tearing down backend {}", self.inner.name());
        self.inner.teardown();
    }
}
