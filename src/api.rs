use crate::converter::Converter;
use crate::error::ConvertError;
use crate::program::ProgramOracle;
use crate::project::ProjectReflection;
use serde::{Deserialize, Serialize};

/// Settings of a conversion run.
///
/// Every field has a default, so a configuration file only needs to name
/// what it changes:
///
/// ```yaml
/// name: My Library
/// excludePrivate: true
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ConverterOptions {
    /// Name of the resulting project.
    pub name: String,
    pub exclude_private: bool,
    pub exclude_protected: bool,
    /// Skip declarations without a doc comment.
    pub exclude_not_documented: bool,
    /// Skip declarations the oracle flags as external.
    pub exclude_externals: bool,
    /// Log every reference pruned by the dangling sweep and keep it as a
    /// warning.
    pub report_dangling_references: bool,
}

impl Default for ConverterOptions {
    fn default() -> Self {
        ConverterOptions {
            name: "Documentation".to_string(),
            exclude_private: false,
            exclude_protected: false,
            exclude_not_documented: false,
            exclude_externals: false,
            report_dangling_references: false,
        }
    }
}

impl ConverterOptions {
    /// Reads options from YAML.
    ///
    /// # Errors
    /// Returns a `serde_yaml::Error` if the text is not valid YAML or holds
    /// an unknown value for a known field.
    pub fn from_yaml(source: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(source)
    }

    /// Reads options from JSON.
    ///
    /// # Errors
    /// Returns a `serde_json::Error` if the text is not valid JSON or holds
    /// an unknown value for a known field.
    pub fn from_json(source: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(source)
    }

    /// Serializes the options into a YAML string.
    ///
    /// # Errors
    /// Returns a `serde_yaml::Error` if serialization fails.
    pub fn to_yaml(&self) -> Result<String, serde_yaml::Error> {
        serde_yaml::to_string(self)
    }
}

/// Converts `program` into a documentation project with the built-in node
/// converters.
///
/// This is the primary entry point when no custom converters or event
/// subscribers are needed. Use [`Converter`] directly otherwise.
///
/// # Arguments
///
/// * `program` - The oracle holding the checked program.
/// * `entry_points` - Source file paths to document. `.json` entries are skipped.
/// * `options` - Project name and exclusion settings.
///
/// # Errors
///
/// Returns [`ConvertError::Semantic`] if the oracle reported errors, or the
/// error of a node converter that failed.
pub fn convert(
    program: &dyn ProgramOracle,
    entry_points: &[String],
    options: ConverterOptions,
) -> Result<ProjectReflection, ConvertError> {
    Converter::with_default_converters(options).convert(program, entry_points)
}
