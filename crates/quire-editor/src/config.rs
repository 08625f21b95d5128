//! Editor configuration.

use serde::{Deserialize, Serialize};

/// Default image size ceiling: 5 MiB.
pub const DEFAULT_MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;

/// Settings shared by every editor on an authoring screen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct EditorConfig {
    /// Images larger than this are rejected before any read starts.
    pub max_image_bytes: usize,
    /// CSS `max-width` applied to inserted images.
    pub image_max_width: String,
    /// Text shown on an empty preview surface.
    pub placeholder: String,
    /// HTML-escape table cell text before building table markup.
    pub escape_table_cells: bool,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            max_image_bytes: DEFAULT_MAX_IMAGE_BYTES,
            image_max_width: "100%".to_owned(),
            placeholder: "Write your answer here...".to_owned(),
            escape_table_cells: true,
        }
    }
}
