//! The format registry: every output format the service knows about.
//!
//! Entries are fixed at startup. Availability of dependency-gated entries is
//! decided once from [`Capabilities`]; nothing mutates the table afterwards.

use crate::capabilities::Capabilities;
use crate::error::ValidationError;
use serde::Serialize;
use std::fmt;

/// An optional external toolchain some formats depend on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Dependency {
    /// pandoc, for the word-processor and e-book formats.
    DocumentConverter,
    /// tabula on a Java runtime, for csv and xlsx.
    TableExtractor,
}

impl Dependency {
    /// Short name shown to users.
    pub fn name(&self) -> &'static str {
        match self {
            Dependency::DocumentConverter => "pandoc",
            Dependency::TableExtractor => "java + tabula",
        }
    }

    fn available_in(&self, caps: &Capabilities) -> bool {
        match self {
            Dependency::DocumentConverter => caps.document_converter,
            Dependency::TableExtractor => caps.table_extractor,
        }
    }
}

impl fmt::Display for Dependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Availability of a registry entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "status", content = "dependency")]
pub enum FormatStatus {
    /// Always available.
    Stable,
    /// Available because the named dependency initialised at startup.
    RequiresOptionalDependency(Dependency),
    /// The named dependency is missing.
    Disabled(Dependency),
}

impl FormatStatus {
    pub fn is_available(&self) -> bool {
        !matches!(self, FormatStatus::Disabled(_))
    }
}

/// One output format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SupportedFormat {
    /// Format key, e.g. `"docx"`.
    pub key: &'static str,
    /// Display name, e.g. `"Word (.docx)"`.
    pub name: &'static str,
    /// Extension of the produced file.
    pub extension: &'static str,
    #[serde(flatten)]
    pub status: FormatStatus,
}

/// Static table rows: key, display name, extension, gating dependency.
const FORMATS: &[(&str, &str, &str, Option<Dependency>)] = &[
    ("docx", "Word (.docx)", "docx", None),
    ("doc", "Word 97-2003 (.doc)", "doc", Some(Dependency::DocumentConverter)),
    ("txt", "Plain Text (.txt)", "txt", None),
    ("rtf", "Rich Text Format (.rtf)", "rtf", Some(Dependency::DocumentConverter)),
    ("epub", "EPUB (.epub)", "epub", Some(Dependency::DocumentConverter)),
    ("mobi", "MOBI (.mobi)", "mobi", Some(Dependency::DocumentConverter)),
    ("html", "HTML (.html)", "html", None),
    ("xml", "XML (.xml)", "xml", None),
    ("csv", "CSV (.csv)", "csv", Some(Dependency::TableExtractor)),
    ("xlsx", "Excel (.xlsx)", "xlsx", Some(Dependency::TableExtractor)),
    ("pptx", "PowerPoint (.pptx)", "pptx", None),
    ("png", "PNG Images (.zip)", "zip", None),
    ("jpeg", "JPEG Images (.zip)", "zip", None),
    ("tiff", "TIFF Images (.zip)", "zip", None),
    ("svg", "SVG Images (.zip)", "zip", None),
    ("odt", "OpenDocument Text (.odt)", "odt", Some(Dependency::DocumentConverter)),
    ("markdown", "Markdown (.md)", "md", Some(Dependency::DocumentConverter)),
    ("pages", "Apple Pages (.pages)", "pages", Some(Dependency::DocumentConverter)),
];

/// The immutable table of supported output formats.
#[derive(Debug, Clone)]
pub struct FormatRegistry {
    formats: Vec<SupportedFormat>,
    capabilities: Capabilities,
}

impl FormatRegistry {
    /// Build the registry, deciding each gated entry's status from `caps`.
    pub fn new(caps: Capabilities) -> Self {
        let formats = FORMATS
            .iter()
            .map(|&(key, name, extension, dependency)| SupportedFormat {
                key,
                name,
                extension,
                status: match dependency {
                    None => FormatStatus::Stable,
                    Some(dep) if dep.available_in(&caps) => {
                        FormatStatus::RequiresOptionalDependency(dep)
                    }
                    Some(dep) => FormatStatus::Disabled(dep),
                },
            })
            .collect();

        Self {
            formats,
            capabilities: caps,
        }
    }

    /// Find a format by key.
    pub fn lookup(&self, key: &str) -> Option<&SupportedFormat> {
        self.formats.iter().find(|f| f.key == key)
    }

    /// Find a format by key and require it to be usable.
    pub fn resolve(&self, key: &str) -> Result<&SupportedFormat, ValidationError> {
        let format = self
            .lookup(key)
            .ok_or_else(|| ValidationError::UnknownFormat { key: key.to_string() })?;

        match format.status {
            FormatStatus::Disabled(dependency) => Err(ValidationError::FormatUnavailable {
                key: key.to_string(),
                dependency,
            }),
            _ => Ok(format),
        }
    }

    /// All entries, in display order.
    pub fn iter(&self) -> impl Iterator<Item = &SupportedFormat> {
        self.formats.iter()
    }

    /// The capabilities this registry was built from.
    pub fn capabilities(&self) -> Capabilities {
        self.capabilities
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_are_unique() {
        let registry = FormatRegistry::new(Capabilities::all());
        let mut keys: Vec<_> = registry.iter().map(|f| f.key).collect();
        let total = keys.len();
        keys.sort_unstable();
        keys.dedup();
        assert_eq!(keys.len(), total);
        assert_eq!(total, 18);
    }

    #[test]
    fn gated_formats_disabled_without_capabilities() {
        let registry = FormatRegistry::new(Capabilities::none());
        for key in ["doc", "rtf", "epub", "mobi", "odt", "markdown", "pages"] {
            assert_eq!(
                registry.lookup(key).unwrap().status,
                FormatStatus::Disabled(Dependency::DocumentConverter),
                "{key}"
            );
        }
        for key in ["csv", "xlsx"] {
            assert_eq!(
                registry.lookup(key).unwrap().status,
                FormatStatus::Disabled(Dependency::TableExtractor),
                "{key}"
            );
        }
        assert_eq!(registry.lookup("docx").unwrap().status, FormatStatus::Stable);
    }

    #[test]
    fn gated_formats_enabled_with_capabilities() {
        let registry = FormatRegistry::new(Capabilities::all());
        assert_eq!(
            registry.lookup("epub").unwrap().status,
            FormatStatus::RequiresOptionalDependency(Dependency::DocumentConverter)
        );
        assert!(registry.resolve("csv").is_ok());
        assert!(registry.resolve("markdown").is_ok());
    }

    #[test]
    fn resolve_unknown_and_disabled() {
        let registry = FormatRegistry::new(Capabilities::none());
        assert_eq!(
            registry.resolve("ppt"),
            Err(ValidationError::UnknownFormat { key: "ppt".into() })
        );
        assert_eq!(
            registry.resolve("xlsx"),
            Err(ValidationError::FormatUnavailable {
                key: "xlsx".into(),
                dependency: Dependency::TableExtractor,
            })
        );
    }

    #[test]
    fn image_families_produce_zip() {
        let registry = FormatRegistry::new(Capabilities::none());
        for key in ["png", "jpeg", "tiff", "svg"] {
            assert_eq!(registry.lookup(key).unwrap().extension, "zip");
        }
        assert_eq!(registry.lookup("markdown").unwrap().extension, "md");
    }

    #[test]
    fn status_serialises_snake_case() {
        let json = serde_json::to_value(FormatStatus::Disabled(Dependency::TableExtractor)).unwrap();
        assert_eq!(json["status"], "disabled");
        assert_eq!(json["dependency"], "table_extractor");
        let stable = serde_json::to_value(FormatStatus::Stable).unwrap();
        assert_eq!(stable["status"], "stable");
    }
}
