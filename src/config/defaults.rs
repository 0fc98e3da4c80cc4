//! Default values for configuration

use crate::render::{FontFamily, Margins, PageSize};

/// Default database file name, relative to the base directory
pub fn default_database_file() -> String {
    "library.db".to_string()
}

/// Default SQLite pool size
pub fn default_max_connections() -> u32 {
    5
}

/// Default number of search results
pub fn default_search_limit() -> u32 {
    20
}

/// Default maximum search results per page
pub fn default_search_max_limit() -> u32 {
    100
}

/// Default snippet width in tokens
pub fn default_snippet_tokens() -> u32 {
    32
}

/// Default opening highlight marker
pub fn default_highlight_start() -> String {
    "<mark>".to_string()
}

/// Default closing highlight marker
pub fn default_highlight_end() -> String {
    "</mark>".to_string()
}

/// Default page size
pub fn default_page_size() -> PageSize {
    PageSize::A4
}

/// Default margins (one inch on every side)
pub fn default_margins() -> Margins {
    Margins::uniform(72.0)
}

/// Default font family
pub fn default_font_family() -> FontFamily {
    FontFamily::Times
}

/// Default body font size in points
pub fn default_font_size() -> f32 {
    11.0
}

/// Default chapter title font size in points
pub fn default_title_font_size() -> f32 {
    16.0
}

/// Default line height as a multiple of the font size
pub fn default_line_height() -> f32 {
    1.5
}

/// Default: include a table of contents page
pub fn default_include_toc() -> bool {
    true
}

/// Default maximum age of a job record in hours
pub fn default_job_max_age_hours() -> u64 {
    24
}

/// Default interval between job sweeps in seconds
pub fn default_sweep_interval_secs() -> u64 {
    3600
}
