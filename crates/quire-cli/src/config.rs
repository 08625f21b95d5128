//! KDL configuration file for the `quire` binary.
//!
//! ```kdl
//! max-image-bytes 1048576
//! image-max-width "480px"
//! placeholder "Type here"
//! escape-table-cells false
//! ```

use std::path::{Path, PathBuf};

use kdl::{KdlDocument, KdlValue};
use miette::Diagnostic;
use quire_editor::EditorConfig;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("could not read config file {}", .path.display())]
    #[diagnostic(code(quire::config::io))]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Parse(#[from] kdl::KdlError),

    #[error("config node `{node}` expects {expected}")]
    #[diagnostic(
        code(quire::config::invalid_value),
        help("give the node a single value, e.g. `{node} <value>`")
    )]
    InvalidValue {
        node: &'static str,
        expected: &'static str,
    },
}

/// `$XDG_CONFIG_HOME/quire/config.kdl`, or the platform equivalent.
pub fn default_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("quire").join("config.kdl"))
}

/// Load the explicit file, else the default file if it exists, else defaults.
pub fn load(path: Option<&Path>) -> Result<EditorConfig, ConfigError> {
    let path = match path {
        Some(path) => path.to_path_buf(),
        None => match default_path() {
            Some(path) if path.exists() => path,
            _ => return Ok(EditorConfig::default()),
        },
    };
    tracing::debug!(path = %path.display(), "loading config");
    let text = std::fs::read_to_string(&path).map_err(|source| ConfigError::Io {
        path: path.clone(),
        source,
    })?;
    parse(&text)
}

/// Parse config text. Unknown nodes are ignored.
pub fn parse(text: &str) -> Result<EditorConfig, ConfigError> {
    let doc: KdlDocument = text.parse()?;
    let mut config = EditorConfig::default();

    if let Some(value) = node_value(&doc, "max-image-bytes", "a positive integer")? {
        config.max_image_bytes = value
            .as_integer()
            .and_then(|n| usize::try_from(n).ok())
            .filter(|n| *n > 0)
            .ok_or(ConfigError::InvalidValue {
                node: "max-image-bytes",
                expected: "a positive integer",
            })?;
    }
    if let Some(value) = node_value(&doc, "image-max-width", "a string")? {
        config.image_max_width = string_value(value, "image-max-width")?;
    }
    if let Some(value) = node_value(&doc, "placeholder", "a string")? {
        config.placeholder = string_value(value, "placeholder")?;
    }
    if let Some(value) = node_value(&doc, "escape-table-cells", "a boolean")? {
        config.escape_table_cells = value.as_bool().ok_or(ConfigError::InvalidValue {
            node: "escape-table-cells",
            expected: "a boolean",
        })?;
    }

    Ok(config)
}

/// First entry of a node, if the node is present at all.
fn node_value<'a>(
    doc: &'a KdlDocument,
    node: &'static str,
    expected: &'static str,
) -> Result<Option<&'a KdlValue>, ConfigError> {
    let Some(found) = doc.get(node) else {
        return Ok(None);
    };
    match found.entries().first() {
        Some(entry) => Ok(Some(entry.value())),
        None => Err(ConfigError::InvalidValue { node, expected }),
    }
}

fn string_value(value: &KdlValue, node: &'static str) -> Result<String, ConfigError> {
    value
        .as_string()
        .map(str::to_owned)
        .ok_or(ConfigError::InvalidValue {
            node,
            expected: "a string",
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        assert_eq!(parse("").unwrap(), EditorConfig::default());
    }

    #[test]
    fn nodes_override_defaults() {
        let config = parse(
            r#"
            max-image-bytes 1048576
            image-max-width "480px"
            escape-table-cells false
            theme "dark"
            "#,
        )
        .unwrap();
        assert_eq!(config.max_image_bytes, 1048576);
        assert_eq!(config.image_max_width, "480px");
        assert!(!config.escape_table_cells);
        assert_eq!(config.placeholder, EditorConfig::default().placeholder);
    }

    #[test]
    fn ill_typed_values_are_rejected() {
        assert!(matches!(
            parse("max-image-bytes \"big\""),
            Err(ConfigError::InvalidValue {
                node: "max-image-bytes",
                ..
            })
        ));
        assert!(matches!(
            parse("escape-table-cells"),
            Err(ConfigError::InvalidValue { .. })
        ));
        assert!(matches!(parse("placeholder 3"), Err(ConfigError::InvalidValue { .. })));
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let err = load(Some(Path::new("/nonexistent/quire/config.kdl"))).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
