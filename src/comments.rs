use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::normalize::CanonicalTable;
use crate::photos::{photo_stem, resize::OutputFormat};
use crate::table::is_blank;

/// Heading placed before the menu answer when it is appended to a comment.
pub const MENU_HEADING: &str = "【好きだったメニュー】";

const TIMESTAMP_FORMATS: &[&str] = &["%Y/%m/%d %H:%M:%S", "%Y-%m-%d %H:%M:%S", "%Y/%m/%d %H:%M"];

/// One message as shown on the page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentEntry {
    pub timestamp: String,
    pub content: String,
    pub name: String,
    pub menu: String,
    pub photo_url: String,
    /// Processed image expected in the output image directory.
    pub photo_filename: Option<String>,
}

pub fn parse_timestamp(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
}

/// Turn the merged table into display entries, newest first.
///
/// Rows whose timestamp does not parse sort after the dated ones and keep
/// their table order. Rows with no comment, menu or photo are dropped.
pub fn prepare_comments(table: &CanonicalTable, format: OutputFormat) -> Vec<CommentEntry> {
    let mut entries: Vec<(Option<NaiveDateTime>, CommentEntry)> = table
        .iter()
        .enumerate()
        .filter_map(|(idx, r)| {
            let has_photo = !is_blank(&r.photo);
            let mut content = if is_blank(&r.comment) {
                String::new()
            } else {
                r.comment.clone()
            };
            if !is_blank(&r.menu) {
                let menu = format!("{}\n{}", MENU_HEADING, r.menu);
                content = if content.is_empty() {
                    menu
                } else {
                    format!("{}\n\n{}", content, menu)
                };
            }
            if content.is_empty() && !has_photo {
                debug!(row = idx, "skipping row without comment, menu or photo");
                return None;
            }

            let entry = CommentEntry {
                timestamp: r.timestamp.clone(),
                content,
                name: r.name.clone(),
                menu: r.menu.clone(),
                photo_url: r.photo.clone(),
                photo_filename: has_photo
                    .then(|| format!("{}.{}", photo_stem(&r.timestamp, idx), format.extension())),
            };
            Some((parse_timestamp(&r.timestamp), entry))
        })
        .collect();

    // `None` orders before `Some`, so compare reversed keys; sort_by is stable
    entries.sort_by(|(a, _), (b, _)| match (a, b) {
        (Some(a), Some(b)) => b.cmp(a),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => std::cmp::Ordering::Equal,
    });

    entries.into_iter().map(|(_, e)| e).collect()
}
