//! Resource addressing: keys, kinds and reference parsing.

use std::fmt;

use url::Url;

use crate::error::{Error, Result};

/// Base used to resolve relative resource references such as
/// `projects/p/global/networks/n`.
const REFERENCE_BASE: &str = "https://www.googleapis.com/compute/v1/";

/// The kinds of compute resources the engine manages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ResourceKind {
    Network,
    Subnetwork,
    Router,
    Firewall,
    Route,
    Instance,
}

impl ResourceKind {
    /// REST collection name.
    #[must_use]
    pub const fn collection(self) -> &'static str {
        match self {
            Self::Network => "networks",
            Self::Subnetwork => "subnetworks",
            Self::Router => "routers",
            Self::Firewall => "firewalls",
            Self::Route => "routes",
            Self::Instance => "instances",
        }
    }

    /// Whether the kind is addressed by name only.
    #[must_use]
    pub const fn is_global(self) -> bool {
        matches!(self, Self::Network | Self::Firewall | Self::Route)
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Network => write!(f, "network"),
            Self::Subnetwork => write!(f, "subnetwork"),
            Self::Router => write!(f, "router"),
            Self::Firewall => write!(f, "firewall"),
            Self::Route => write!(f, "route"),
            Self::Instance => write!(f, "instance"),
        }
    }
}

/// Address of a resource: global, regional or zonal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Key {
    Global { name: String },
    Regional { name: String, region: String },
    Zonal { name: String, zone: String },
}

impl Key {
    #[must_use]
    pub fn global(name: impl Into<String>) -> Self {
        Self::Global { name: name.into() }
    }

    #[must_use]
    pub fn regional(name: impl Into<String>, region: impl Into<String>) -> Self {
        Self::Regional {
            name: name.into(),
            region: region.into(),
        }
    }

    #[must_use]
    pub fn zonal(name: impl Into<String>, zone: impl Into<String>) -> Self {
        Self::Zonal {
            name: name.into(),
            zone: zone.into(),
        }
    }

    /// Resource name.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Global { name } | Self::Regional { name, .. } | Self::Zonal { name, .. } => name,
        }
    }

    /// Path segment(s) locating the key's scope, e.g. `regions/us-east1`.
    #[must_use]
    pub fn scope_path(&self) -> String {
        match self {
            Self::Global { .. } => "global".to_string(),
            Self::Regional { region, .. } => format!("regions/{region}"),
            Self::Zonal { zone, .. } => format!("zones/{zone}"),
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.scope_path(), self.name())
    }
}

/// Extract the resource name (final path segment) from a resource reference.
///
/// Accepts full URLs (`https://www.googleapis.com/compute/v1/projects/...`)
/// and relative paths (`projects/p/global/networks/n`). An empty reference
/// yields an empty name.
///
/// # Errors
/// Returns [`Error::InvalidReference`] if the reference cannot be parsed.
pub fn resource_name(reference: &str) -> Result<String> {
    if reference.is_empty() {
        return Ok(String::new());
    }

    let base = Url::parse(REFERENCE_BASE).map_err(|source| Error::InvalidReference {
        reference: REFERENCE_BASE.to_string(),
        source,
    })?;
    let url = Url::options()
        .base_url(Some(&base))
        .parse(reference)
        .map_err(|source| Error::InvalidReference {
            reference: reference.to_string(),
            source,
        })?;

    Ok(url
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .unwrap_or_default()
        .to_string())
}

/// Last segment of a `/`-separated URL, or the input if there is none.
///
/// Used for provider-populated fields like an operation's `zone`, which
/// holds a full URL.
#[must_use]
pub fn last_segment(value: &str) -> &str {
    value.rsplit('/').next().unwrap_or(value)
}
