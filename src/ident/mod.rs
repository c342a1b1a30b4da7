//! Extension identifier shorthand: `publisher.extensionID[@version]`.
//!
//! Only the first `.` and the first `@` are landmarks; any later occurrence is
//! part of the extension ID or the version.

use std::fmt;
use std::str::FromStr;

/// Version requested when an identifier carries none.
pub const DEFAULT_VERSION: &str = "latest";

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum IdentifierError {
    #[error("found no '.' separating publisher and extension ID")]
    MissingSeparator,
    #[error("found no publisher before '.'")]
    MissingPublisher,
    #[error("found no extension ID after '.'")]
    MissingExtensionID,
    #[error("'@' must follow the extension ID and precede a version")]
    MalformedVersion,
}

/// A decoded extension identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Identifier {
    publisher: String,
    extension_id: String,
    version: Option<String>,
}

impl Identifier {
    pub fn parse(input: &str) -> Result<Self, IdentifierError> {
        let len = input.len();
        let dot = input.find('.').ok_or(IdentifierError::MissingSeparator)?;
        if dot == 0 {
            return Err(IdentifierError::MissingPublisher);
        }
        if dot == len - 1 {
            return Err(IdentifierError::MissingExtensionID);
        }

        let Some(at) = input.find('@') else {
            return Ok(Self {
                publisher: input[..dot].to_string(),
                extension_id: input[dot + 1..].to_string(),
                version: None,
            });
        };

        if at == 0 || at == len - 1 || at < dot {
            return Err(IdentifierError::MalformedVersion);
        }
        if at == dot + 1 {
            return Err(IdentifierError::MissingExtensionID);
        }

        Ok(Self {
            publisher: input[..dot].to_string(),
            extension_id: input[dot + 1..at].to_string(),
            version: Some(input[at + 1..].to_string()),
        })
    }

    pub fn publisher(&self) -> &str {
        &self.publisher
    }

    pub fn extension_id(&self) -> &str {
        &self.extension_id
    }

    /// The explicit version, if one followed `@`.
    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    pub fn version_set(&self) -> bool {
        self.version.is_some()
    }

    /// The version to request from the gallery.
    pub fn version_or_default(&self) -> &str {
        self.version().unwrap_or(DEFAULT_VERSION)
    }

    /// `publisher.extensionID-version`, used for install directories and
    /// downloaded package names.
    pub fn artifact_stem(&self) -> String {
        format!(
            "{}.{}-{}",
            self.publisher,
            self.extension_id,
            self.version_or_default()
        )
    }
}

impl FromStr for Identifier {
    type Err = IdentifierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.publisher, self.extension_id)?;
        if let Some(v) = &self.version {
            write!(f, "@{v}")?;
        }
        Ok(())
    }
}
