//! Table-driven column resolution.
//!
//! Each form kind has an ordered list of [`ColumnRule`]s. A rule says how to
//! find the column feeding one canonical field: an exact label, or a list of
//! keyword candidates. Candidate lists are in priority order, most specific
//! phrase first and the generic label last; the resolver tries every column
//! for a candidate before moving on to the next one, so reordering a list
//! changes which column wins on ambiguous headers.
//!
//! Resolution runs in two passes. The first applies every exact and keyword
//! matcher in rule order; the second gives positional fallbacks to the fields
//! still unresolved. A column claimed by one field is never handed to
//! another, so a fallback cannot take a column some later rule names
//! outright. Photo rules come before comment rules for both kinds: the upload
//! header (`思い出の写真`) also contains the comment keyword `思い出`.

use super::{Field, FormKind, NormalizeOptions};
use crate::error::NormalizeError;

pub const TIMESTAMP_KEYWORDS: &[&str] = &["タイムスタンプ", "timestamp", "日時"];

pub const NAME_KEYWORDS: &[&str] = &["公開可能なお名前", "お名前", "名前", "ニックネーム", "name"];

pub const MENU_KEYWORDS: &[&str] = &[
    "好きだったメニュー",
    "好きなメニュー",
    "メニュー",
    "favorite menu",
    "favourite menu",
    "menu",
];

/// Memory and story phrasing outranks a plain "comment" header.
pub const COMMENT_KEYWORDS: &[&str] = &[
    "思い出を教えて",
    "まつわる思い出",
    "エピソード",
    "memory",
    "story",
    "思い出",
    "メッセージ",
    "コメント",
    "comment",
];

/// Photo-form comments. A bare "写真"/"photo" never appears here: on this
/// form that label is the upload column.
pub const PHOTO_COMMENT_KEYWORDS: &[&str] = &[
    "写真の思い出",
    "写真について",
    "写真にまつわる",
    "エピソード",
    "思い出",
    "メッセージ",
    "コメント",
    "comment",
    "caption",
];

pub const PHOTO_KEYWORDS: &[&str] = &["思い出の写真", "写真", "photo", "image"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Matcher<'a> {
    /// First column containing a candidate, candidates tried in order.
    Keywords(&'a [&'a str]),
    /// The column label must equal this text; absence is a configuration error.
    Exact(&'a str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fallback {
    /// Take the column at this index.
    Position(usize),
    /// Leave the field empty for every row.
    Empty,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnRule<'a> {
    pub field: Field,
    pub matcher: Matcher<'a>,
    pub fallback: Fallback,
}

impl<'a> ColumnRule<'a> {
    pub const fn keywords(field: Field, candidates: &'a [&'a str], fallback: Fallback) -> Self {
        Self {
            field,
            matcher: Matcher::Keywords(candidates),
            fallback,
        }
    }
}

/// Menu rule shared by both kinds.
pub const MENU_RULE: ColumnRule<'static> =
    ColumnRule::keywords(Field::Menu, MENU_KEYWORDS, Fallback::Empty);

/// Rule list for `kind`, in evaluation order.
pub fn rules_for(kind: FormKind, opts: &NormalizeOptions) -> Vec<ColumnRule<'_>> {
    match kind {
        FormKind::Comments => vec![
            ColumnRule::keywords(Field::Timestamp, TIMESTAMP_KEYWORDS, Fallback::Position(0)),
            ColumnRule::keywords(Field::Photo, PHOTO_KEYWORDS, Fallback::Empty),
            ColumnRule::keywords(Field::Comment, COMMENT_KEYWORDS, Fallback::Position(1)),
            ColumnRule::keywords(Field::Name, NAME_KEYWORDS, Fallback::Position(2)),
            MENU_RULE,
        ],
        FormKind::Photos => vec![
            ColumnRule {
                field: Field::Photo,
                matcher: Matcher::Exact(opts.photo_column.as_str()),
                fallback: Fallback::Empty,
            },
            ColumnRule::keywords(Field::Timestamp, TIMESTAMP_KEYWORDS, Fallback::Position(0)),
            ColumnRule::keywords(Field::Comment, PHOTO_COMMENT_KEYWORDS, Fallback::Position(1)),
            ColumnRule::keywords(Field::Name, NAME_KEYWORDS, Fallback::Position(2)),
            MENU_RULE,
        ],
    }
}

/// Column index per canonical field, `None` meaning an all-empty column.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResolvedColumns([Option<usize>; Field::ALL.len()]);

impl ResolvedColumns {
    pub fn get(&self, field: Field) -> Option<usize> {
        self.0[field.index()]
    }

    fn set(&mut self, field: Field, col: Option<usize>) {
        self.0[field.index()] = col;
    }

    fn is_claimed(&self, col: usize) -> bool {
        self.0.contains(&Some(col))
    }
}

/// ASCII-case-insensitive substring test; non-ASCII text compares verbatim.
fn label_contains(label: &str, candidate: &str) -> bool {
    label
        .to_ascii_lowercase()
        .contains(&candidate.to_ascii_lowercase())
}

/// First column containing any candidate, trying candidates in priority order
/// and skipping columns for which `skip` returns true.
pub fn find_by_keywords(
    columns: &[&str],
    candidates: &[&str],
    skip: impl Fn(usize) -> bool,
) -> Option<usize> {
    candidates.iter().find_map(|candidate| {
        columns
            .iter()
            .enumerate()
            .find(|(i, label)| !skip(*i) && label_contains(label, candidate))
            .map(|(i, _)| i)
    })
}

/// Apply `rules` to `columns`: matchers first, in rule order, then
/// positional fallbacks for whatever is left.
pub fn resolve_columns(
    kind: FormKind,
    columns: &[&str],
    rules: &[ColumnRule<'_>],
) -> Result<ResolvedColumns, NormalizeError> {
    let mut resolved = ResolvedColumns::default();

    for rule in rules {
        let found = match rule.matcher {
            Matcher::Exact(expected) => {
                let col = columns.iter().position(|c| c.trim() == expected.trim());
                if col.is_none() {
                    return Err(NormalizeError::MissingColumn {
                        kind,
                        expected: expected.to_string(),
                        available: columns.iter().map(|c| c.to_string()).collect(),
                    });
                }
                col
            }
            Matcher::Keywords(candidates) => {
                find_by_keywords(columns, candidates, |i| resolved.is_claimed(i))
            }
        };
        resolved.set(rule.field, found);
    }

    for rule in rules {
        if resolved.get(rule.field).is_some() {
            continue;
        }
        if let Fallback::Position(i) = rule.fallback {
            if i < columns.len() && !resolved.is_claimed(i) {
                resolved.set(rule.field, Some(i));
            }
        }
    }

    Ok(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;

    const COMMENTS_FORM: &[&str] = &[
        "タイムスタンプ",
        "店主様やラーメンNORIにまつわる思い出を教えて下さい",
        "公開可能なお名前（ニックネーム、任意）",
        "好きだったメニューを教えて下さい（複数可、任意）",
        "思い出の写真（1枚/1MBまで、任意）",
    ];

    fn resolve(kind: FormKind, columns: &[&str]) -> Result<ResolvedColumns, NormalizeError> {
        let opts = NormalizeOptions::default();
        resolve_columns(kind, columns, &rules_for(kind, &opts))
    }

    #[test]
    fn comments_form_resolves_every_field() {
        let r = resolve(FormKind::Comments, COMMENTS_FORM).unwrap();
        assert_eq!(r.get(Field::Timestamp), Some(0));
        assert_eq!(r.get(Field::Comment), Some(1));
        assert_eq!(r.get(Field::Name), Some(2));
        assert_eq!(r.get(Field::Menu), Some(3));
        assert_eq!(r.get(Field::Photo), Some(4));
    }

    #[test]
    fn keyword_match_survives_header_drift() {
        let cols = ["Timestamp ", "  Your favorite MENU items:", "Memory / story", "Name"];
        let r = resolve(FormKind::Comments, &cols).unwrap();
        assert_eq!(r.get(Field::Timestamp), Some(0));
        assert_eq!(r.get(Field::Comment), Some(2));
        assert_eq!(r.get(Field::Name), Some(3));
        assert_eq!(r.get(Field::Menu), Some(1));
        assert_eq!(r.get(Field::Photo), None);
    }

    #[test]
    fn earlier_candidate_beats_earlier_column() {
        // "コメント" sits first, but the memory phrasing outranks it.
        let cols = ["時刻", "コメント", "思い出を教えてください"];
        let found = find_by_keywords(&cols, COMMENT_KEYWORDS, |_| false);
        assert_eq!(found, Some(2));
    }

    #[test]
    fn positional_fallback_for_unrecognised_headers() {
        let cols = ["col_a", "col_b", "col_c", "col_d"];
        let r = resolve(FormKind::Comments, &cols).unwrap();
        assert_eq!(r.get(Field::Timestamp), Some(0));
        assert_eq!(r.get(Field::Comment), Some(1));
        assert_eq!(r.get(Field::Name), Some(2));
        assert_eq!(r.get(Field::Menu), None);
        assert_eq!(r.get(Field::Photo), None);
    }

    #[test]
    fn positional_fallback_beyond_width_is_empty() {
        let r = resolve(FormKind::Comments, &["only"]).unwrap();
        assert_eq!(r.get(Field::Timestamp), Some(0));
        assert_eq!(r.get(Field::Comment), None);
        assert_eq!(r.get(Field::Name), None);
    }

    #[test]
    fn photos_form_never_uses_upload_column_as_comment() {
        let cols = ["タイムスタンプ", "思い出の写真", "お名前"];
        let r = resolve(FormKind::Photos, &cols).unwrap();
        assert_eq!(r.get(Field::Photo), Some(1));
        // "思い出" would match the upload column; it is already claimed and
        // position 1 is taken too, so the comment stays empty.
        assert_eq!(r.get(Field::Comment), None);
        assert_eq!(r.get(Field::Name), Some(2));
    }

    #[test]
    fn photos_form_prefers_photo_memory_phrasing() {
        let cols = ["タイムスタンプ", "思い出の写真", "コメント", "この写真の思い出", "お名前"];
        let r = resolve(FormKind::Photos, &cols).unwrap();
        assert_eq!(r.get(Field::Comment), Some(3));
    }

    #[test]
    fn photos_form_requires_exact_photo_label() {
        let cols = ["タイムスタンプ", "写真", "お名前"];
        let err = resolve(FormKind::Photos, &cols).unwrap_err();
        let NormalizeError::MissingColumn {
            expected,
            available,
            ..
        } = &err;
        assert_eq!(expected, "思い出の写真");
        assert_eq!(available, &vec!["タイムスタンプ", "写真", "お名前"]);
        assert!(err.to_string().contains("思い出の写真"));
    }

    #[test]
    fn fallback_never_takes_a_column_named_by_a_later_rule() {
        // comment has no keyword; its fallback position holds the name column
        let cols = ["タイムスタンプ", "お名前", "本文"];
        let r = resolve(FormKind::Comments, &cols).unwrap();
        assert_eq!(r.get(Field::Name), Some(1));
        assert_eq!(r.get(Field::Comment), None);
    }

    #[test]
    fn keyword_column_after_unmatched_fallback_positions() {
        let cols = ["メモ", "お名前", "タイムスタンプ"];
        let r = resolve(FormKind::Comments, &cols).unwrap();
        assert_eq!(r.get(Field::Timestamp), Some(2));
        assert_eq!(r.get(Field::Name), Some(1));
        assert_eq!(r.get(Field::Comment), None);

        // unclaimed fallback positions are still used
        let cols = ["日付", "本文", "ニックネーム", "メニュー"];
        let r = resolve(FormKind::Comments, &cols).unwrap();
        assert_eq!(r.get(Field::Timestamp), Some(0));
        assert_eq!(r.get(Field::Comment), Some(1));
        assert_eq!(r.get(Field::Name), Some(2));
        assert_eq!(r.get(Field::Menu), Some(3));
    }

    #[test]
    fn comments_form_with_episode_header_keeps_upload_column() {
        let cols = [
            "タイムスタンプ",
            "エピソードを教えてください",
            "お名前",
            "好きだったメニュー",
            "思い出の写真",
        ];
        let r = resolve(FormKind::Comments, &cols).unwrap();
        assert_eq!(r.get(Field::Comment), Some(1));
        assert_eq!(r.get(Field::Photo), Some(4));
        assert_eq!(r.get(Field::Menu), Some(3));
    }

    #[test]
    fn domain_phrases_outrank_bare_memory_keyword() {
        let cols = ["思い出メモ", "memory of the shop"];
        assert_eq!(find_by_keywords(&cols, COMMENT_KEYWORDS, |_| false), Some(1));
    }
}
