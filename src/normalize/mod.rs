// src/normalize/mod.rs
//! Map the two form exports onto one fixed record shape.

pub mod rules;

use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use tracing::debug;

use crate::error::NormalizeError;
use crate::table::{RawTable, TableView};

pub const DEFAULT_PHOTO_COLUMN: &str = "思い出の写真";
pub const ANONYMOUS: &str = "匿名";

/// Which form an export came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FormKind {
    Comments,
    Photos,
}

impl fmt::Display for FormKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FormKind::Comments => "comments",
            FormKind::Photos => "photos",
        })
    }
}

impl FromStr for FormKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "comments" => Ok(FormKind::Comments),
            "photos" => Ok(FormKind::Photos),
            other => Err(anyhow::anyhow!("unknown form kind `{}`", other)),
        }
    }
}

/// Canonical fields, in canonical column order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Timestamp,
    Comment,
    Name,
    Menu,
    Photo,
}

impl Field {
    pub const ALL: [Field; 5] = [
        Field::Timestamp,
        Field::Comment,
        Field::Name,
        Field::Menu,
        Field::Photo,
    ];

    pub const fn name(self) -> &'static str {
        match self {
            Field::Timestamp => "timestamp",
            Field::Comment => "comment",
            Field::Name => "name",
            Field::Menu => "menu",
            Field::Photo => "photo",
        }
    }

    pub const fn index(self) -> usize {
        self as usize
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalRecord {
    pub timestamp: String,
    pub comment: String,
    pub name: String,
    pub menu: String,
    pub photo: String,
}

impl CanonicalRecord {
    pub fn get(&self, field: Field) -> &str {
        match field {
            Field::Timestamp => &self.timestamp,
            Field::Comment => &self.comment,
            Field::Name => &self.name,
            Field::Menu => &self.menu,
            Field::Photo => &self.photo,
        }
    }
}

/// Normalized rows from one or more forms, in source order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CanonicalTable {
    records: Vec<CanonicalRecord>,
}

impl CanonicalTable {
    pub fn new(records: Vec<CanonicalRecord>) -> Self {
        Self { records }
    }

    pub fn records(&self) -> &[CanonicalRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, CanonicalRecord> {
        self.records.iter()
    }

    /// Append `other`'s rows after this table's rows.
    pub fn merge(mut self, other: CanonicalTable) -> Self {
        self.records.extend(other.records);
        self
    }
}

impl FromIterator<CanonicalRecord> for CanonicalTable {
    fn from_iter<I: IntoIterator<Item = CanonicalRecord>>(iter: I) -> Self {
        Self {
            records: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a CanonicalTable {
    type Item = &'a CanonicalRecord;
    type IntoIter = std::slice::Iter<'a, CanonicalRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

impl TableView for CanonicalTable {
    fn columns(&self) -> Vec<&str> {
        Field::ALL.iter().map(|f| f.name()).collect()
    }

    fn row_count(&self) -> usize {
        self.records.len()
    }

    fn cell(&self, row: usize, col: usize) -> Option<&str> {
        let field = *Field::ALL.get(col)?;
        self.records.get(row).map(|r| r.get(field))
    }

    fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Knobs for normalization that belong to the deployment, not the code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizeOptions {
    /// Exact label of the upload column on the photos form.
    pub photo_column: String,
    /// Display name used when a submitter left the name blank.
    pub anonymous_name: String,
}

impl Default for NormalizeOptions {
    fn default() -> Self {
        Self {
            photo_column: DEFAULT_PHOTO_COLUMN.to_string(),
            anonymous_name: ANONYMOUS.to_string(),
        }
    }
}

fn clean_cell(value: &str) -> String {
    if value.trim().eq_ignore_ascii_case("nan") {
        String::new()
    } else {
        value.to_string()
    }
}

/// Normalize with default options.
pub fn normalize(raw: &RawTable, kind: FormKind) -> Result<CanonicalTable, NormalizeError> {
    normalize_form(raw, kind, &NormalizeOptions::default())
}

/// Map `raw` onto [`CanonicalRecord`]s using the rules for `kind`.
///
/// An export with no rows or no columns yields an empty table for either
/// kind. Fails only when a photos export lacks the exact upload column.
pub fn normalize_form(
    raw: &RawTable,
    kind: FormKind,
    opts: &NormalizeOptions,
) -> Result<CanonicalTable, NormalizeError> {
    if TableView::is_empty(raw) {
        debug!(%kind, "empty export; nothing to normalize");
        return Ok(CanonicalTable::default());
    }

    let columns = raw.columns();
    let resolved = rules::resolve_columns(kind, &columns, &rules::rules_for(kind, opts))?;
    for field in Field::ALL {
        debug!(
            %kind,
            field = field.name(),
            column = resolved.get(field).map(|i| columns[i]).unwrap_or("<empty>"),
            "resolved column"
        );
    }

    let records = (0..raw.row_count())
        .map(|row| {
            let value = |field: Field| {
                resolved
                    .get(field)
                    .and_then(|col| raw.cell(row, col))
                    .map(clean_cell)
                    .unwrap_or_default()
            };
            let name = value(Field::Name);
            CanonicalRecord {
                timestamp: value(Field::Timestamp),
                comment: value(Field::Comment),
                name: if name.trim().is_empty() {
                    opts.anonymous_name.clone()
                } else {
                    name
                },
                menu: value(Field::Menu),
                photo: value(Field::Photo),
            }
        })
        .collect();

    Ok(CanonicalTable { records })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn comments_export() -> RawTable {
        RawTable::from_rows(
            [
                "タイムスタンプ",
                "店主様やラーメンNORIにまつわる思い出を教えて下さい",
                "公開可能なお名前（ニックネーム、任意）",
                "好きだったメニューを教えて下さい（複数可、任意）",
                "思い出の写真（1枚/1MBまで、任意）",
            ],
            [
                vec!["2026/01/11 8:00:00", "美味しかった", "太郎", "塩ラーメン", ""],
                vec![
                    "2026/01/11 9:00:00",
                    "また食べたい",
                    "",
                    "nan",
                    "https://drive.google.com/open?id=abc",
                ],
            ],
        )
    }

    #[test]
    fn comments_export_normalizes() {
        let table = normalize(&comments_export(), FormKind::Comments).unwrap();
        assert_eq!(table.len(), 2);
        let first = &table.records()[0];
        assert_eq!(first.timestamp, "2026/01/11 8:00:00");
        assert_eq!(first.comment, "美味しかった");
        assert_eq!(first.name, "太郎");
        assert_eq!(first.menu, "塩ラーメン");
        assert_eq!(first.photo, "");

        let second = &table.records()[1];
        assert_eq!(second.name, ANONYMOUS);
        assert_eq!(second.menu, "");
        assert_eq!(second.photo, "https://drive.google.com/open?id=abc");
    }

    #[test]
    fn every_row_has_all_fields_even_when_columns_are_missing() {
        let raw = RawTable::from_rows(["Timestamp"], [vec!["t1"], vec![]]);
        let table = normalize(&raw, FormKind::Comments).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.columns(), vec!["timestamp", "comment", "name", "menu", "photo"]);
        for record in &table {
            assert_eq!(record.comment, "");
            assert_eq!(record.name, ANONYMOUS);
            assert_eq!(record.menu, "");
            assert_eq!(record.photo, "");
        }
        assert_eq!(table.records()[1].timestamp, "");
    }

    #[test]
    fn empty_exports_normalize_to_empty_tables() {
        let no_rows = RawTable::from_rows(["タイムスタンプ", "コメント"], Vec::<Vec<&str>>::new());
        let no_columns = RawTable::default();
        for kind in [FormKind::Comments, FormKind::Photos] {
            let t = normalize(&no_rows, kind).unwrap();
            assert!(t.is_empty());
            assert_eq!(t.columns().len(), 5);
            assert!(normalize(&no_columns, kind).unwrap().is_empty());
        }
    }

    #[test]
    fn photos_export_without_upload_column_fails() {
        let raw = RawTable::from_rows(["タイムスタンプ", "写真", "お名前"], [vec!["t", "u", "n"]]);
        let err = normalize(&raw, FormKind::Photos).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains(DEFAULT_PHOTO_COLUMN), "{msg}");
        assert!(msg.contains("写真"), "{msg}");
        assert!(msg.starts_with("photos form"), "{msg}");
    }

    #[test]
    fn name_column_is_not_read_as_comment() {
        let raw = RawTable::from_rows(
            ["タイムスタンプ", "お名前", "本文"],
            [vec!["2026/01/11 8:00:00", "太郎", "美味しかった"]],
        );
        let binding = normalize(&raw, FormKind::Comments).unwrap();
        let r = &binding.records()[0];
        assert_eq!(r.name, "太郎");
        assert_ne!(r.comment, "太郎");
    }

    #[test]
    fn comments_export_keeps_photo_url_out_of_comment() {
        let raw = RawTable::from_rows(
            [
                "タイムスタンプ",
                "エピソードを教えてください",
                "お名前",
                "好きだったメニュー",
                "思い出の写真",
            ],
            [vec![
                "2026/01/11 8:00:00",
                "開店日に並びました",
                "花子",
                "塩ラーメン",
                "https://drive.google.com/open?id=X",
            ]],
        );
        let binding = normalize(&raw, FormKind::Comments).unwrap();
        let r = &binding.records()[0];
        assert_eq!(r.comment, "開店日に並びました");
        assert_eq!(r.photo, "https://drive.google.com/open?id=X");
    }

    #[test]
    fn photos_export_with_configured_label() {
        let raw = RawTable::from_rows(
            ["タイムスタンプ", "アップロード", "この写真の思い出", "お名前"],
            [vec!["2026/01/12 10:00:00", "https://x/open?id=1", "開店日", "花子"]],
        );
        let opts = NormalizeOptions {
            photo_column: "アップロード".into(),
            ..Default::default()
        };
        let table = normalize_form(&raw, FormKind::Photos, &opts).unwrap();
        let r = &table.records()[0];
        assert_eq!(r.photo, "https://x/open?id=1");
        assert_eq!(r.comment, "開店日");
        assert_eq!(r.name, "花子");
        assert_eq!(r.menu, "");
    }

    #[test]
    fn merge_appends_in_order() {
        let rec = |c: &str| CanonicalRecord {
            comment: c.into(),
            ..Default::default()
        };
        let a = CanonicalTable::new(vec![rec("a1"), rec("a2")]);
        let b = CanonicalTable::new(vec![rec("b1")]);
        let merged = a.merge(b);
        let order: Vec<&str> = merged.iter().map(|r| r.comment.as_str()).collect();
        assert_eq!(order, vec!["a1", "a2", "b1"]);
    }

    #[test]
    fn canonical_table_cells_follow_field_order() {
        let table = normalize(&comments_export(), FormKind::Comments).unwrap();
        assert_eq!(table.cell(0, Field::Menu.index()), Some("塩ラーメン"));
        assert_eq!(table.cell(0, 5), None);
        assert_eq!(table.cell(9, 0), None);
    }

    #[test]
    fn form_kind_parses() {
        assert_eq!("Photos".parse::<FormKind>().unwrap(), FormKind::Photos);
        assert!("videos".parse::<FormKind>().is_err());
    }
}
