//! Category domain model and color normalization.
//!
//! # Responsibility
//! - Define the category record and the starter set installed on first run.
//! - Normalize persisted color values to canonical `#RRGGBB` hex.
//!
//! # Invariants
//! - `order` defines display sequence, lower first; only the relative
//!   sequence matters, integers may carry gaps until renormalization.
//! - `color` is always a canonical uppercase `#RRGGBB` string after
//!   normalization.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Stable identifier for categories. Human-readable slugs for the starter
/// set, UUID strings for user-created ones.
pub type CategoryId = String;

static HEX_COLOR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^#[0-9a-fA-F]{6}$").expect("valid hex color regex"));

/// Fallback palette cycled by category id when a stored color is unusable.
const DEFAULT_PALETTE: &[&str] = &[
    "#E07A5F", "#3D405B", "#81B29A", "#F2CC8F", "#5F797B", "#9A8C98", "#C9ADA7", "#4A5759",
];

/// User-defined grouping bucket for tasks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    pub icon: String,
    /// Canonical `#RRGGBB` hex string.
    pub color: String,
    /// Display sequence, lower first.
    #[serde(default)]
    pub order: i32,
}

impl Category {
    pub fn new(
        id: impl Into<CategoryId>,
        name: impl Into<String>,
        icon: impl Into<String>,
        color: impl Into<String>,
        order: i32,
    ) -> Self {
        let id = id.into();
        let color = normalize_hex_or_default(&color.into(), &id);
        Self {
            id,
            name: name.into(),
            icon: icon.into(),
            color,
            order,
        }
    }

    /// Starter categories installed when the store has none.
    pub fn default_set() -> Vec<Category> {
        [
            ("house", "House & Repairs", "🏠"),
            ("garage", "Garage & Workshop", "🔧"),
            ("printing", "3D Printing", "🖨️"),
            ("vehicle", "Vehicle & Motorcycle", "🏍️"),
            ("tech", "Tech & Apps", "💻"),
            ("finance", "Finance & Admin", "📊"),
            ("shopping", "Shopping & Errands", "🛒"),
            ("travel", "Travel & Health", "✈️"),
        ]
        .iter()
        .enumerate()
        .map(|(index, (id, name, icon))| {
            Category::new(*id, *name, *icon, default_color_for(id), index as i32)
        })
        .collect()
    }
}

/// Returns the deterministic fallback color for a category id.
pub fn default_color_for(category_id: &str) -> &'static str {
    let sum: usize = category_id.bytes().map(usize::from).sum();
    DEFAULT_PALETTE[sum % DEFAULT_PALETTE.len()]
}

/// Canonicalizes a color value to uppercase `#RRGGBB` hex.
///
/// Values that do not parse as 6-digit hex (legacy named colors, truncated
/// values) fall back to the deterministic default for the category id.
pub fn normalize_hex_or_default(color: &str, category_id: &str) -> String {
    let trimmed = color.trim();
    if HEX_COLOR_RE.is_match(trimmed) {
        return trimmed.to_ascii_uppercase();
    }
    default_color_for(category_id).to_string()
}
