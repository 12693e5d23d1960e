//! The `dataset` module provides [`Dataset`], the in-memory form of one ODIS
//! `PARAMETER_DATA` entry, and [`ConversionResult`], a dataset paired with its VCP text.

use std::fmt;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Dataset {
    /// Binary payload, checksum footer included
    pub(crate) payload: Vec<u8>,
    /// Address of the control unit the payload applies to
    diagnostic_address: u64,
    /// Offset of the payload in the control unit memory map
    start_address: u64,
    name: Option<String>,
    version: Option<String>,
    login: Option<String>,
}

impl Dataset {
    /// Creates a dataset without identification metadata.
    ///
    /// # Example
    /// ```
    /// use odisvcplib::Dataset;
    ///
    /// let ds = Dataset::new(vec![1, 2, 3, 4], 0x12, 0x100);
    /// assert_eq!(ds.payload(), &[1, 2, 3, 4]);
    /// assert!(ds.name().is_none());
    /// ```
    #[must_use]
    pub const fn new(payload: Vec<u8>, diagnostic_address: u64, start_address: u64) -> Self {
        Self {
            payload,
            diagnostic_address,
            start_address,
            name: None,
            version: None,
            login: None,
        }
    }

    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[must_use]
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    #[must_use]
    pub fn with_login(mut self, login: impl Into<String>) -> Self {
        self.login = Some(login.into());
        self
    }

    #[must_use]
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    #[must_use]
    pub const fn diagnostic_address(&self) -> u64 {
        self.diagnostic_address
    }

    #[must_use]
    pub const fn start_address(&self) -> u64 {
        self.start_address
    }

    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    #[must_use]
    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    #[must_use]
    pub fn login(&self) -> Option<&str> {
        self.login.as_deref()
    }

    /// Name used as the VCP data identifier.
    ///
    /// Falls back to `{prefix}-{diagnostic address as lowercase hex}` when the entry
    /// carried no name or an empty one.
    ///
    /// # Example
    /// ```
    /// use odisvcplib::Dataset;
    ///
    /// let ds = Dataset::new(vec![], 0x1F, 0);
    /// assert_eq!(ds.resolved_name("sample"), "sample-1f");
    ///
    /// let ds = ds.with_name("ZDC_ABC");
    /// assert_eq!(ds.resolved_name("sample"), "ZDC_ABC");
    /// ```
    #[must_use]
    pub fn resolved_name(&self, fallback_prefix: &str) -> String {
        match self.name() {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => format!("{fallback_prefix}-{:x}", self.diagnostic_address),
        }
    }
}

impl fmt::Display for Dataset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Dataset(name={}, address=0x{:x}, size={})",
            self.name().unwrap_or("None"),
            self.diagnostic_address,
            self.payload.len()
        )
    }
}

/// One dataset together with its serialized VCP document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionResult {
    pub dataset: Dataset,
    pub vcp: String,
}

impl fmt::Display for ConversionResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ConversionResult(dataset={}, vcp_size={})",
            self.dataset,
            self.vcp.len()
        )
    }
}
