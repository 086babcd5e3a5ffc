//! Extension package manifest (`extension.toml`).
//!
//! The manifest is parsed from TOML into a permissive raw form and then
//! validated into [`ExtensionManifest`]. Every validation failure is an
//! `INVALID_PACKAGE` error; nothing is defaulted silently except the route
//! prefix.

use serde::{Deserialize, Serialize};

use extensa_core::AppError;
use extensa_core::result::AppResult;

use super::kind::ExtensionType;

/// File name of the manifest at the package root.
pub const MANIFEST_FILE: &str = "extension.toml";

/// Maximum length of an extension name.
const MAX_NAME_LEN: usize = 64;

/// The route contributor unit declared by a package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutesUnit {
    /// Name of the module entrypoint (a compiled-in module, or the symbol
    /// namespace of a shared library).
    pub entrypoint: String,
    /// Path of a shared library inside the package, relative to its root.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub library: Option<String>,
}

/// Validated extension manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtensionManifest {
    /// Logical extension name.
    pub name: String,
    /// Semantic version string.
    pub version: String,
    /// Functional classification.
    #[serde(rename = "type")]
    pub extension_type: ExtensionType,
    /// Free-form description.
    #[serde(default)]
    pub description: Option<String>,
    /// Path segment under `/extensions` where routes are mounted.
    pub route_prefix: String,
    /// Supported locales.
    #[serde(default)]
    pub locales: Vec<String>,
    /// Capabilities the extension declares it requires.
    #[serde(default)]
    pub capabilities: Vec<String>,
    /// Run the schema phase during install instead of on first enable.
    #[serde(default)]
    pub eager_schema: bool,
    /// Route contributor unit, if any.
    #[serde(default)]
    pub routes: Option<RoutesUnit>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawManifest {
    name: Option<String>,
    version: Option<String>,
    #[serde(rename = "type")]
    extension_type: Option<String>,
    description: Option<String>,
    route_prefix: Option<String>,
    #[serde(default)]
    locales: Vec<String>,
    #[serde(default)]
    capabilities: Vec<String>,
    #[serde(default)]
    eager_schema: bool,
    routes: Option<RoutesUnit>,
}

impl ExtensionManifest {
    /// Parse and validate a manifest from TOML text.
    pub fn from_toml(text: &str) -> AppResult<Self> {
        let raw: RawManifest = toml::from_str(text)
            .map_err(|e| AppError::invalid_package(format!("Malformed manifest: {e}")))?;

        let name = raw
            .name
            .ok_or_else(|| AppError::invalid_package("Manifest is missing 'name'"))?;
        validate_name(&name)?;

        let version = raw
            .version
            .ok_or_else(|| AppError::invalid_package("Manifest is missing 'version'"))?;
        semver::Version::parse(&version).map_err(|e| {
            AppError::invalid_package(format!("Invalid version '{version}': {e}"))
        })?;

        let extension_type: ExtensionType = raw
            .extension_type
            .ok_or_else(|| AppError::invalid_package("Manifest is missing 'type'"))?
            .parse()?;

        let route_prefix = match raw.route_prefix {
            Some(prefix) => prefix.trim_matches('/').to_string(),
            None => name.to_lowercase(),
        };
        validate_route_prefix(&route_prefix)?;

        for locale in &raw.locales {
            if locale.is_empty()
                || !locale
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
            {
                return Err(AppError::invalid_package(format!(
                    "Invalid locale '{locale}'"
                )));
            }
        }

        if extension_type == ExtensionType::LanguagePack && raw.locales.is_empty() {
            return Err(AppError::invalid_package(
                "A language pack must declare at least one locale",
            ));
        }

        if let Some(routes) = &raw.routes {
            if routes.entrypoint.trim().is_empty() {
                return Err(AppError::invalid_package(
                    "[routes] entrypoint must not be empty",
                ));
            }
        }

        Ok(Self {
            name,
            version,
            extension_type,
            description: raw.description,
            route_prefix,
            locales: raw.locales,
            capabilities: raw.capabilities,
            eager_schema: raw.eager_schema,
            routes: raw.routes,
        })
    }

    /// Return the `name_version` key used for directories and lookups.
    pub fn key(&self) -> String {
        format!("{}_{}", self.name, self.version)
    }

    /// Return the parsed semantic version.
    pub fn semver(&self) -> Option<semver::Version> {
        semver::Version::parse(&self.version).ok()
    }

    /// Return the absolute base path under which route groups are mounted.
    pub fn mount_base(&self) -> String {
        format!("/extensions/{}", self.route_prefix)
    }
}

fn validate_name(name: &str) -> AppResult<()> {
    let valid_chars = name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    let starts_alnum = name
        .chars()
        .next()
        .map(|c| c.is_ascii_alphanumeric())
        .unwrap_or(false);

    if name.len() > MAX_NAME_LEN || !valid_chars || !starts_alnum {
        return Err(AppError::invalid_package(format!(
            "Invalid extension name '{name}': use 1-{MAX_NAME_LEN} ASCII letters, digits, '-' or '_'"
        )));
    }
    Ok(())
}

fn validate_route_prefix(prefix: &str) -> AppResult<()> {
    let valid = !prefix.is_empty()
        && prefix
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '_');
    if !valid {
        return Err(AppError::invalid_package(format!(
            "Invalid route prefix '{prefix}': use lowercase letters, digits, '-' or '_'"
        )));
    }
    Ok(())
}
