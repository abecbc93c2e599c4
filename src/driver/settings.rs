//! Settings that control desugaring
use std::fmt;
use std::fs;
use std::io;
use std::path::Path;
use std::str::FromStr;
use structopt::StructOpt;
use thiserror::Error;

/// Which class construction protocol to emit
#[derive(Copy, Debug, Clone, PartialEq, Eq)]
pub enum ClassProtocol {
    /// Namespace dict returned from the class suite, metaclass found
    /// via `__metaclass__`
    Legacy,
    /// Metaclass keyword, `__prepare__` namespace and `__class__` cell
    Modern,
}

impl Default for ClassProtocol {
    fn default() -> Self {
        ClassProtocol::Modern
    }
}

impl FromStr for ClassProtocol {
    type Err = SettingsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "legacy" | "2" => Ok(ClassProtocol::Legacy),
            "modern" | "3" => Ok(ClassProtocol::Modern),
            _ => Err(SettingsError::UnknownClassProtocol(s.to_string())),
        }
    }
}

impl fmt::Display for ClassProtocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Legacy => write!(f, "legacy"),
            Self::Modern => write!(f, "modern"),
        }
    }
}

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("unknown class protocol {0} (expected legacy or modern)")]
    UnknownClassProtocol(String),
    #[error("setting {0} must be a string")]
    NotAString(String),
    #[error(transparent)]
    Toml(#[from] toml::de::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Settings to control desugaring, fixed for a whole compilation
#[derive(StructOpt, Debug, Clone, Default, PartialEq, Eq)]
pub struct DesugarSettings {
    /// Class construction protocol to emit (legacy or modern)
    #[structopt(long = "class-protocol", default_value)]
    pub class_protocol: ClassProtocol,
}

impl DesugarSettings {
    pub fn with_class_protocol(self, class_protocol: ClassProtocol) -> Self {
        DesugarSettings { class_protocol }
    }

    /// Read settings from the `[desugar]` table of a TOML document.
    /// Missing keys keep their defaults.
    pub fn from_toml_str(text: &str) -> Result<Self, SettingsError> {
        let doc: toml::Value = text.parse()?;
        let mut settings = DesugarSettings::default();

        if let Some(value) = doc.get("desugar").and_then(|t| t.get("class-protocol")) {
            let protocol = value
                .as_str()
                .ok_or_else(|| SettingsError::NotAString("class-protocol".to_string()))?;
            settings.class_protocol = protocol.parse()?;
        }

        Ok(settings)
    }

    /// Read settings from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, SettingsError> {
        let text = fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }
}
