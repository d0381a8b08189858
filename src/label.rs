//! Label resolution for files found under a group directory
//!
//! Pure path classification: no filesystem access happens here, so the
//! naming and eligibility rules can be exercised with plain paths.

use std::path::{Component, Path};

/// Extension (without the dot) a file needs to be imported. Case-sensitive.
pub const MBOX_EXTENSION: &str = "mbox";

/// Suffix of a derived label that marks an Apple Mail style export
/// (a directory `X.mbox` holding a file literally named `mbox`).
pub const NESTED_EXPORT_SUFFIX: &str = ".mbox/mbox";

/// Inner file name used by nested exports
pub const NESTED_EXPORT_FILE: &str = "mbox";

/// Outcome of classifying one directory entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LabelDecision {
    /// File is an mbox archive that should be imported into `label`
    Eligible { label: String },
    /// File does not carry the `.mbox` extension
    Skipped { relative_path: String },
    /// Nested export that is recognized but not imported
    NestedExport { label: String },
    /// Entry could not be expressed as a clean path relative to the group root
    Unresolvable { entry: String },
}

impl LabelDecision {
    /// Label name if the file should be read
    pub fn eligible_label(&self) -> Option<&str> {
        match self {
            LabelDecision::Eligible { label } => Some(label),
            _ => None,
        }
    }
}

/// Classify a file given its path relative to the group base directory
///
/// The label is the relative path with its extension removed. Directory
/// segments are kept verbatim and joined with `/`.
pub fn resolve_relative(relative: &Path) -> LabelDecision {
    let mut segments = Vec::new();
    for component in relative.components() {
        match component {
            Component::Normal(part) => match part.to_str() {
                Some(part) => segments.push(part),
                None => {
                    return LabelDecision::Unresolvable {
                        entry: relative.display().to_string(),
                    }
                }
            },
            Component::CurDir => {}
            _ => {
                return LabelDecision::Unresolvable {
                    entry: relative.display().to_string(),
                }
            }
        }
    }

    let Some(file_name) = segments.pop() else {
        return LabelDecision::Unresolvable {
            entry: relative.display().to_string(),
        };
    };

    let (stem, extension) = split_extension(file_name);
    let mut label = segments.join("/");
    if !label.is_empty() {
        label.push('/');
    }
    label.push_str(stem);

    if label.ends_with(NESTED_EXPORT_SUFFIX) {
        return LabelDecision::NestedExport { label };
    }

    if extension != Some(MBOX_EXTENSION) {
        let mut relative_path = label;
        if let Some(extension) = extension {
            relative_path.push('.');
            relative_path.push_str(extension);
        }
        return LabelDecision::Skipped { relative_path };
    }

    LabelDecision::Eligible { label }
}

/// Classify a file given the group base directory and the file's full path
pub fn resolve_entry(base: &Path, full_path: &Path) -> LabelDecision {
    match full_path.strip_prefix(base) {
        Ok(relative) => resolve_relative(relative),
        Err(_) => LabelDecision::Unresolvable {
            entry: full_path.display().to_string(),
        },
    }
}

/// Split `name` at its last dot, ignoring leading dots so that hidden files
/// such as `.mbox` have no extension.
fn split_extension(name: &str) -> (&str, Option<&str>) {
    let leading_dots = name.len() - name.trim_start_matches('.').len();
    match name[leading_dots..].rfind('.') {
        Some(pos) => {
            let split = leading_dots + pos;
            (&name[..split], Some(&name[split + 1..]))
        }
        None => (name, None),
    }
}
