//! Favourite-menu vote counting.

use indexmap::IndexMap;
use serde::{Serialize, Serializer};
use tracing::debug;

use crate::normalize::{rules, Field};
use crate::table::{is_blank, TableView};

/// Item separators accepted in a menu answer; a single cell may mix them.
pub const MENU_DELIMITERS: &[char] = &[',', '、', '，'];

/// Menu item → votes, highest first; equal counts keep first-seen order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VoteTally(IndexMap<String, usize>);

impl VoteTally {
    pub fn get(&self, item: &str) -> Option<usize> {
        self.0.get(item).copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, item: &str) -> bool {
        self.0.contains_key(item)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, usize)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn items(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// The `n` most voted items.
    pub fn top(&self, n: usize) -> impl Iterator<Item = (&str, usize)> {
        self.iter().take(n)
    }
}

#[derive(Serialize)]
struct Entry<'a> {
    item: &'a str,
    count: usize,
}

impl Serialize for VoteTally {
    /// A list rather than a map so the ranking survives any JSON consumer.
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.iter().map(|(item, count)| Entry { item, count }))
    }
}

/// Split one menu answer into trimmed, non-empty items.
pub fn split_menu_items(cell: &str) -> impl Iterator<Item = &str> {
    cell.split(MENU_DELIMITERS)
        .map(str::trim)
        .filter(|item| !item.is_empty())
}

/// Column holding menu answers: the canonical `menu` column if present,
/// otherwise the first column the normalizer's menu keywords would pick.
pub fn find_menu_column<T: TableView + ?Sized>(table: &T) -> Option<usize> {
    let columns = table.columns();
    columns
        .iter()
        .position(|c| *c == Field::Menu.name())
        .or_else(|| rules::find_by_keywords(&columns, rules::MENU_KEYWORDS, |_| false))
}

/// Count votes per menu item across every row of `table`.
///
/// Never fails; a table without rows or without a menu column gives an
/// empty tally.
pub fn aggregate_menu_items<T: TableView + ?Sized>(table: &T) -> VoteTally {
    let Some(col) = find_menu_column(table) else {
        debug!("no menu column; empty tally");
        return VoteTally::default();
    };

    let mut counts: IndexMap<String, usize> = IndexMap::new();
    for row in 0..table.row_count() {
        let Some(cell) = table.cell(row, col) else {
            continue;
        };
        if is_blank(cell) {
            continue;
        }
        for item in split_menu_items(cell) {
            *counts.entry(item.to_string()).or_insert(0) += 1;
        }
    }

    // stable: ties stay in first-seen order
    counts.sort_by(|_, a, _, b| b.cmp(a));
    debug!(items = counts.len(), "menu votes tallied");
    VoteTally(counts)
}
