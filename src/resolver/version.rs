//! Version handling for package requirements.
//!
//! pkg-config versions are free-form (`1.3`, `2.10.0rc1`, `8.4.0-DEV`), so
//! they are coerced into semver before matching.

use semver::{Version, VersionReq};

use crate::errors::ConfigurationError;

/// Parse a version string leniently.
///
/// Anything after the leading digits and dots is dropped and missing
/// components default to zero: `1.3` becomes `1.3.0`, `2.10.0rc1` becomes
/// `2.10.0`.
pub fn parse_version_flexible(version_str: &str) -> Option<Version> {
    let clean = version_str
        .trim()
        .split(|c: char| !c.is_ascii_digit() && c != '.')
        .next()
        .unwrap_or(version_str)
        .trim_end_matches('.');

    if let Ok(v) = clean.parse() {
        return Some(v);
    }

    let parts: Vec<&str> = clean.split('.').collect();
    let major = parts.first().and_then(|s| s.parse().ok())?;
    let minor = parts.get(1).and_then(|s| s.parse().ok()).unwrap_or(0);
    let patch = parts.get(2).and_then(|s| s.parse().ok()).unwrap_or(0);

    Some(Version::new(major, minor, patch))
}

/// Parse a declared version requirement.
pub fn parse_requirement(package: &str, requirement: &str) -> Result<VersionReq, ConfigurationError> {
    VersionReq::parse(requirement.trim()).map_err(|_| ConfigurationError::InvalidVersionRequirement {
        package: package.to_string(),
        requirement: requirement.to_string(),
    })
}

/// Whether a reported version satisfies a requirement.
///
/// An unparseable version never satisfies a requirement.
pub fn satisfies(req: &VersionReq, found: &str) -> bool {
    parse_version_flexible(found).is_some_and(|v| req.matches(&v))
}
