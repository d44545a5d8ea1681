//! End-to-end tests that run the preprocessor binary.

use std::io::Write;
use std::process::{Command, Stdio};
use std::str::FromStr;

use mdbook_preprocessor::PreprocessorContext;
use mdbook_preprocessor::book::{Book, BookItem, Chapter};
use mdbook_preprocessor::config::Config;

const BINARY: &str = env!("CARGO_BIN_EXE_mdbook-jiralink");

// =============================================================================
// CLI Support Check (html)
// =============================================================================

#[test]
fn test_e2e_cli_supports_html() {
    let output = Command::new(BINARY)
        .args(["supports", "html"])
        .output()
        .expect("Failed to run preprocessor binary");

    assert!(
        output.status.success(),
        "Preprocessor should support html renderer (exit 0)"
    );
}

// =============================================================================
// CLI Support Check (pdf - rejected)
// =============================================================================

#[test]
fn test_e2e_cli_rejects_pdf() {
    let output = Command::new(BINARY)
        .args(["supports", "pdf"])
        .output()
        .expect("Failed to run preprocessor binary");

    assert!(
        !output.status.success(),
        "Preprocessor should reject pdf renderer (exit non-zero)"
    );
}

// =============================================================================
// Invalid stdin
// =============================================================================

#[test]
fn test_e2e_invalid_input_fails() {
    let mut child = Command::new(BINARY)
        .stdin(Stdio::piped())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .spawn()
        .expect("Failed to run preprocessor binary");

    child
        .stdin
        .take()
        .expect("stdin is piped")
        .write_all(b"not json")
        .expect("Failed to write stdin");

    let output = child.wait_with_output().expect("Failed to wait for binary");
    assert!(!output.status.success(), "Garbage input should fail");
    assert!(String::from_utf8_lossy(&output.stderr).contains("Error"));
}

// =============================================================================
// Full preprocessor run (stdin -> stdout)
// =============================================================================

#[test]
fn test_e2e_links_book_from_stdin() {
    let config = Config::from_str(
        r#"
[book]
title = "Test"

[preprocessor.jiralink]
project-mappings = "PROJ=https://jira.test"
exclude-pages = ["changelog.md"]
"#,
    )
    .expect("Failed to parse book.toml");
    let ctx = PreprocessorContext::new("/tmp/book".into(), config, "html".to_string());

    let mut book = Book::new();
    book.push_item(Chapter::new(
        "Intro",
        "Tracking PROJ-1 and `PROJ-2`.\n".to_string(),
        "intro.md",
        Vec::new(),
    ));
    book.push_item(Chapter::new(
        "Changelog",
        "Fixed PROJ-3.\n".to_string(),
        "changelog.md",
        Vec::new(),
    ));
    let input = serde_json::to_vec(&(&ctx, &book)).expect("Failed to serialize input");

    let mut child = Command::new(BINARY)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("Failed to run preprocessor binary");
    child
        .stdin
        .take()
        .expect("stdin is piped")
        .write_all(&input)
        .expect("Failed to write stdin");

    let output = child.wait_with_output().expect("Failed to wait for binary");
    assert!(
        output.status.success(),
        "Preprocessor failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let processed: Book =
        serde_json::from_slice(&output.stdout).expect("Output should be a JSON book");
    let content = |name: &str| {
        processed
            .iter()
            .find_map(|item| match item {
                BookItem::Chapter(ch) if ch.name == name => Some(ch.content.clone()),
                _ => None,
            })
            .unwrap_or_else(|| panic!("chapter {name} not found"))
    };

    let intro = content("Intro");
    assert!(intro.contains(r#"href="https://jira.test/browse/PROJ-1""#));
    assert!(!intro.contains("browse/PROJ-2"));
    assert_eq!(content("Changelog"), "Fixed PROJ-3.\n");
}
