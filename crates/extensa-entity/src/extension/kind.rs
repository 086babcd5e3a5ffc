//! Functional classification of an extension.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The kind of functionality an extension package provides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "extension_type", rename_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum ExtensionType {
    /// Contributes routes and/or schema.
    Generic,
    /// Contributes translations for one or more locales.
    LanguagePack,
}

impl ExtensionType {
    /// Return the type as its manifest string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Generic => "generic",
            Self::LanguagePack => "language-pack",
        }
    }
}

impl fmt::Display for ExtensionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ExtensionType {
    type Err = extensa_core::AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "generic" => Ok(Self::Generic),
            "language-pack" => Ok(Self::LanguagePack),
            _ => Err(extensa_core::AppError::invalid_package(format!(
                "Unsupported extension type: '{s}'. Expected one of: generic, language-pack"
            ))),
        }
    }
}
