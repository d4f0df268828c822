//! Turns every shape of comment the services hand us into [`Comment`].
//!
//! A manuscript carries its own `comments` field (absent, a string, or a list
//! mixing strings and records) and the comments collection returns rows keyed
//! by editor id. Both are normalized here and concatenated, embedded first.
//! Nothing is de-duplicated: the same remark stored in both places is shown
//! twice, which is what reviewers have always seen.

use chrono::SecondsFormat;
use chrono::Utc;

use crate::state::Comment;
use crate::state::EmbeddedComment;
use crate::state::EmbeddedComments;
use crate::state::Manuscript;
use crate::state::RawComment;

pub const EDITOR_AUTHOR: &str = "Editor";
pub const ANONYMOUS_AUTHOR: &str = "Anonymous";

pub fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn editor_label(manuscript: &Manuscript) -> String {
    manuscript
        .editor_email
        .as_deref()
        .filter(|email| !email.trim().is_empty())
        .unwrap_or(EDITOR_AUTHOR)
        .to_string()
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .filter(|value| !value.trim().is_empty())
        .map(str::to_string)
}

pub fn normalize_embedded(manuscript: &Manuscript, now: &str) -> Vec<Comment> {
    match &manuscript.comments {
        EmbeddedComments::Absent => Vec::new(),
        EmbeddedComments::Text(text) if text.trim().is_empty() => Vec::new(),
        EmbeddedComments::Text(text) => vec![Comment {
            text: text.clone(),
            author: editor_label(manuscript),
            date: now.to_string(),
        }],
        EmbeddedComments::List(items) => items
            .iter()
            .map(|item| match item {
                EmbeddedComment::Bare(text) => Comment {
                    text: text.clone(),
                    author: editor_label(manuscript),
                    date: now.to_string(),
                },
                EmbeddedComment::Record(record) => Comment {
                    text: record.text.clone(),
                    author: non_empty(record.author.as_deref())
                        .unwrap_or_else(|| editor_label(manuscript)),
                    date: non_empty(record.date.as_deref()).unwrap_or_else(|| now.to_string()),
                },
            })
            .collect(),
    }
}

pub fn normalize_fetched(fetched: &[RawComment], now: &str) -> Vec<Comment> {
    fetched
        .iter()
        .map(|raw| Comment {
            text: raw.text.clone(),
            author: non_empty(raw.editor_id.as_deref())
                .unwrap_or_else(|| ANONYMOUS_AUTHOR.to_string()),
            date: non_empty(raw.timestamp.as_deref()).unwrap_or_else(|| now.to_string()),
        })
        .collect()
}

/// Embedded comments followed by fetched ones, each in source order.
pub fn all_comments(manuscript: &Manuscript, fetched: &[RawComment]) -> Vec<Comment> {
    all_comments_at(manuscript, fetched, &now_timestamp())
}

/// [`all_comments`] with an explicit stand-in date for undated sources.
pub fn all_comments_at(manuscript: &Manuscript, fetched: &[RawComment], now: &str) -> Vec<Comment> {
    let mut comments = normalize_embedded(manuscript, now);
    comments.extend(normalize_fetched(fetched, now));
    comments
}

pub fn authored_by(comments: &[Comment], author: &str) -> bool {
    comments.iter().any(|comment| comment.author == author)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::state::EmbeddedRecord;
    use crate::state::ManuscriptState;

    const NOW: &str = "2024-03-01T12:00:00.000Z";

    fn manuscript(comments: EmbeddedComments) -> Manuscript {
        let mut manuscript = Manuscript::new("m1", ManuscriptState::InReview);
        manuscript.comments = comments;
        manuscript
    }

    #[test]
    fn bare_string_becomes_single_comment() {
        let comments = all_comments(&manuscript(EmbeddedComments::Text("hello".to_string())), &[]);
        assert_eq!(comments.len(), 1);
        assert_eq!(comments[0].text, "hello");
        assert_eq!(comments[0].author, EDITOR_AUTHOR);
    }

    #[test]
    fn empty_or_absent_embedded_comments_yield_nothing() {
        assert!(all_comments_at(&manuscript(EmbeddedComments::Absent), &[], NOW).is_empty());
        assert!(all_comments_at(&manuscript(EmbeddedComments::Text("  ".to_string())), &[], NOW)
            .is_empty());
    }

    #[test]
    fn mixed_list_is_normalized_with_editor_email_default() {
        let mut source = manuscript(EmbeddedComments::List(vec![
            EmbeddedComment::Bare("first".to_string()),
            EmbeddedComment::Record(EmbeddedRecord {
                text: "second".to_string(),
                author: Some("ref@example.org".to_string()),
                date: Some("2024-01-01T00:00:00Z".to_string()),
            }),
        ]));
        source.editor_email = Some("ed@example.org".to_string());

        assert_eq!(
            normalize_embedded(&source, NOW),
            vec![
                Comment {
                    text: "first".to_string(),
                    author: "ed@example.org".to_string(),
                    date: NOW.to_string(),
                },
                Comment {
                    text: "second".to_string(),
                    author: "ref@example.org".to_string(),
                    date: "2024-01-01T00:00:00Z".to_string(),
                },
            ]
        );
    }

    #[test]
    fn fetched_rows_map_editor_and_timestamp() {
        let fetched = vec![
            RawComment {
                text: "looks good".to_string(),
                editor_id: Some("17".to_string()),
                timestamp: Some("2024-02-02T10:00:00Z".to_string()),
            },
            RawComment {
                text: "undated".to_string(),
                editor_id: None,
                timestamp: None,
            },
        ];

        assert_eq!(
            normalize_fetched(&fetched, NOW),
            vec![
                Comment {
                    text: "looks good".to_string(),
                    author: "17".to_string(),
                    date: "2024-02-02T10:00:00Z".to_string(),
                },
                Comment {
                    text: "undated".to_string(),
                    author: ANONYMOUS_AUTHOR.to_string(),
                    date: NOW.to_string(),
                },
            ]
        );
    }

    #[test]
    fn duplicates_across_sources_are_kept_in_order() {
        let source = manuscript(EmbeddedComments::Text("same".to_string()));
        let fetched = vec![RawComment {
            text: "same".to_string(),
            editor_id: None,
            timestamp: None,
        }];

        let texts: Vec<String> = all_comments_at(&source, &fetched, NOW)
            .into_iter()
            .map(|comment| comment.text)
            .collect();
        assert_eq!(texts, vec!["same", "same"]);
    }
}
