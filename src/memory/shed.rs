//! Shed: the small scalar store of a memory space
//!
//! Two independent areas share one instance:
//! - the **code area**, an append-only list of lines. Programs seed it once with
//!   `NAME=VALUE` constant declarations and read them back with
//!   [`Shed::lookup_constant`]
//! - the **resource-link area**, a last-write-wins string map. Every value is a
//!   string; numeric or boolean coercion is up to the caller
//!
//! Reads of missing lines or keys return `None`.

use rustc_hash::FxHashMap;
use tracing::trace;

#[derive(Debug, Clone, Default)]
pub struct Shed {
    code_area: Vec<String>,
    resource_links: FxHashMap<String, String>,
}

impl Shed {
    pub fn new() -> Self {
        Shed::default()
    }

    /// Append a line to the code area
    pub fn write_code(&mut self, line: impl Into<String>) {
        let line = line.into();
        trace!(index = self.code_area.len(), %line, "write_code");
        self.code_area.push(line);
    }

    /// Read a code line by index
    pub fn read_code(&self, index: usize) -> Option<&str> {
        self.code_area.get(index).map(String::as_str)
    }

    pub fn code_len(&self) -> usize {
        self.code_area.len()
    }

    pub fn code_lines(&self) -> &[String] {
        &self.code_area
    }

    /// Find the value of the first `name=value` line declaring `name`
    pub fn lookup_constant(&self, name: &str) -> Option<&str> {
        self.code_area.iter().find_map(|line| {
            line.strip_prefix(name)
                .and_then(|rest| rest.strip_prefix('='))
        })
    }

    /// Set a resource link, replacing any previous value
    pub fn write_resource_link(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        trace!(%key, %value, "write_resource_link");
        self.resource_links.insert(key, value);
    }

    pub fn read_resource_link(&self, key: &str) -> Option<&str> {
        self.resource_links.get(key).map(String::as_str)
    }

    /// Drop a resource link, returning its last value
    pub fn remove_resource_link(&mut self, key: &str) -> Option<String> {
        self.resource_links.remove(key)
    }

    pub fn resource_link_count(&self) -> usize {
        self.resource_links.len()
    }
}
