//! Incremental document synchronization
//!
//! Replays random ranged edits against a `ManagedDocument` and a plain
//! string model. LSP positions are UTF-16 based, so inserted text is drawn
//! from arbitrary unicode (minus line separators other than `\n`).

use quickcheck::{QuickCheck, TestResult};
use tower_lsp::lsp_types::{Position, Range, TextDocumentContentChangeEvent, Url};

use luau_language_server::lsp::document::{DocumentError, ManagedDocument, VersionedChanges};

fn sanitize(text: &str) -> String {
    text.chars()
        .filter(|c| *c == '\n' || !(c.is_control() || matches!(c, '\u{2028}' | '\u{2029}')))
        .collect()
}

/// UTF-16 position of a char offset in `text`.
fn position_of(text: &[char], offset: usize) -> Position {
    let before = &text[..offset];
    let line = before.iter().filter(|c| **c == '\n').count() as u32;
    let line_start = before.iter().rposition(|c| *c == '\n').map_or(0, |index| index + 1);
    let character = before[line_start..].iter().map(|c| c.len_utf16() as u32).sum();
    Position::new(line, character)
}

fn uri() -> Url {
    Url::parse("file:///workspace/src/main.luau").unwrap()
}

#[test]
fn test_ranged_edits_match_string_model() {
    fn prop(initial: String, edits: Vec<(usize, usize, String)>) -> TestResult {
        if edits.is_empty() {
            return TestResult::discard();
        }
        let mut model: Vec<char> = sanitize(&initial).chars().collect();
        let mut document = ManagedDocument::new(uri(), "luau", 1, &model.iter().collect::<String>());

        for (version, (a, b, insert)) in edits.into_iter().enumerate() {
            let insert = sanitize(&insert);
            let start = a % (model.len() + 1);
            let end = start + b % (model.len() - start + 1);
            let range = Range::new(position_of(&model, start), position_of(&model, end));

            let change = VersionedChanges {
                version: version as i32 + 2,
                changes: vec![TextDocumentContentChangeEvent {
                    range: Some(range),
                    range_length: None,
                    text: insert.clone(),
                }],
            };
            if document.apply(change).is_err() {
                return TestResult::failed();
            }
            model.splice(start..end, insert.chars());

            if document.text() != model.iter().collect::<String>() {
                return TestResult::failed();
            }
        }
        TestResult::passed()
    }

    QuickCheck::new()
        .tests(500)
        .max_tests(5000)
        .quickcheck(prop as fn(String, Vec<(usize, usize, String)>) -> TestResult);
}

#[test]
fn test_outdated_versions_are_rejected() {
    fn prop(text: String, replacement: String) -> bool {
        let mut document = ManagedDocument::new(uri(), "luau", 3, &text);
        let change = VersionedChanges {
            version: 3,
            changes: vec![TextDocumentContentChangeEvent {
                range: None,
                range_length: None,
                text: replacement,
            }],
        };
        let rejected = matches!(
            document.apply(change),
            Err(DocumentError::OutdatedVersion { version: 3, current: 3, .. })
        );
        rejected && document.text() == text && document.version == 3
    }

    QuickCheck::new()
        .tests(200)
        .quickcheck(prop as fn(String, String) -> bool);
}

#[test]
fn test_multiple_changes_apply_in_order() {
    let mut document = ManagedDocument::new(uri(), "luau", 1, "local x = 1\nprint(x)\n");
    let change = |start: (u32, u32), end: (u32, u32), text: &str| TextDocumentContentChangeEvent {
        range: Some(Range::new(Position::new(start.0, start.1), Position::new(end.0, end.1))),
        range_length: None,
        text: text.to_string(),
    };

    document
        .apply(VersionedChanges {
            version: 2,
            changes: vec![
                change((0, 6), (0, 7), "value"),
                change((1, 6), (1, 7), "value"),
                // Past the end of the line: clamped to the line end.
                change((0, 40), (0, 40), " -- 🌙"),
            ],
        })
        .unwrap();
    assert_eq!(document.text(), "local value = 1 -- 🌙\nprint(value)\n");

    // "🌙" is two UTF-16 code units.
    document
        .apply(VersionedChanges {
            version: 3,
            changes: vec![change((0, 19), (0, 21), "moon")],
        })
        .unwrap();
    assert_eq!(document.text(), "local value = 1 -- moon\nprint(value)\n");
}
