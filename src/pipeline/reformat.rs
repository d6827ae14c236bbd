//! Reformatting: turn OCR text into comma-delimited rows.
//!
//! The substitution is deliberately crude: every space becomes a field
//! separator, so a multi-word value such as `John Doe` lands in two columns.
//! There is no column detection. Per line, in this order:
//!
//! 1. remove every `,` (so OCR'd commas cannot create fields)
//! 2. replace every remaining space with `,`
//! 3. remove every `"`
//!
//! Lines keep their original ending and are never trimmed, merged, reordered
//! or deduplicated.

use crate::error::Pdf2CsvError;
use crate::output::{PageText, ReformattedLine};
use std::path::Path;
use tracing::{debug, info};

/// Field separator written in place of spaces.
pub const SEPARATOR: char = ',';

/// Apply the three substitutions to one line.
pub fn reformat_line(line: &str) -> String {
    line.replace(',', "")
        .replace(' ', &SEPARATOR.to_string())
        .replace('"', "")
}

/// Split `text` into lines (keeping endings) and reformat each.
pub fn reformat_text(page: usize, text: &str) -> Vec<ReformattedLine> {
    text.split_inclusive('\n')
        .map(|line| ReformattedLine {
            page,
            text: reformat_line(line),
        })
        .collect()
}

/// Read every successfully OCR'd page in order and reformat its lines.
///
/// Pages that failed OCR have no text file and contribute no lines.
pub async fn reformat_pages(pages: &[PageText]) -> Result<Vec<ReformattedLine>, Pdf2CsvError> {
    let mut lines = Vec::new();
    for page in pages.iter().filter(|p| p.is_ok()) {
        let text = tokio::fs::read_to_string(&page.path)
            .await
            .map_err(|e| Pdf2CsvError::io(&page.path, e))?;
        let before = lines.len();
        lines.extend(reformat_text(page.index, &text));
        debug!(
            "Page {}: reformatted {} lines from {}",
            page.index,
            lines.len() - before,
            page.path.display()
        );
    }
    Ok(lines)
}

/// Write all lines, concatenated in order, to `path`.
///
/// Uses atomic write (temp file + rename) so a failed run never leaves a
/// truncated CSV in place of a previous one.
pub async fn write_delimited(lines: &[ReformattedLine], path: &Path) -> Result<(), Pdf2CsvError> {
    let contents: String = lines.iter().map(|l| l.text.as_str()).collect();

    let tmp_path = path.with_extension("csv.tmp");
    tokio::fs::write(&tmp_path, contents.as_bytes())
        .await
        .map_err(|e| Pdf2CsvError::io(path, e))?;
    tokio::fs::rename(&tmp_path, path)
        .await
        .map_err(|e| Pdf2CsvError::io(path, e))?;

    info!("Wrote {} lines to {}", lines.len(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commas_are_removed_before_spaces_become_separators() {
        assert_eq!(reformat_line("John Doe, Age: 30"), "John,Doe,Age:,30");
    }

    #[test]
    fn quotes_are_removed() {
        assert_eq!(reformat_line("say \"hi\" now"), "say,hi,now");
    }

    #[test]
    fn each_space_is_its_own_separator() {
        assert_eq!(reformat_line("a  b"), "a,,b");
    }

    #[test]
    fn line_ending_is_preserved() {
        assert_eq!(reformat_line("Total 12\n"), "Total,12\n");
        assert_eq!(reformat_line("\n"), "\n");
    }

    #[test]
    fn tabs_are_left_alone() {
        assert_eq!(reformat_line("a\tb c"), "a\tb,c");
    }

    #[test]
    fn idempotent_on_comma_and_quote_free_input() {
        for input in ["Invoice No 42\n", "plain", "", "x y z\n"] {
            let once = reformat_line(input);
            assert_eq!(reformat_line(&once), once, "input {input:?}");
        }
    }

    #[test]
    fn line_count_is_preserved() {
        let text = "Name Age\nJohn Doe, 30\n\n\"Jane\" 41\nlast line no newline";
        let lines = reformat_text(1, text);
        assert_eq!(lines.len(), text.split_inclusive('\n').count());
        assert_eq!(lines.len(), 5);
        assert_eq!(lines[2].text, "\n");
        assert_eq!(lines[3].text, "Jane,41\n");
        assert_eq!(lines[4].text, "last,line,no,newline");
    }

    #[test]
    fn lines_carry_their_page() {
        let lines = reformat_text(7, "a b\nc\n");
        assert!(lines.iter().all(|l| l.page == 7));
    }

    #[tokio::test]
    async fn pages_are_read_in_order_and_failed_pages_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let p1 = dir.path().join("page_1.txt");
        let p3 = dir.path().join("page_3.txt");
        std::fs::write(&p1, "first page\n").unwrap();
        std::fs::write(&p3, "third page\n").unwrap();

        let pages = vec![
            PageText { index: 1, path: p1, line_count: 1, error: None },
            PageText {
                index: 2,
                path: dir.path().join("page_2.txt"),
                line_count: 0,
                error: Some(crate::error::PageError::OcrFailed {
                    page: 2,
                    detail: "boom".into(),
                }),
            },
            PageText { index: 3, path: p3, line_count: 1, error: None },
        ];

        let lines = reformat_pages(&pages).await.unwrap();
        let texts: Vec<&str> = lines.iter().map(|l| l.text.as_str()).collect();
        assert_eq!(texts, vec!["first,page\n", "third,page\n"]);
        assert_eq!(lines[1].page, 3);
    }

    #[tokio::test]
    async fn missing_text_file_reports_its_path() {
        let pages = vec![PageText {
            index: 1,
            path: "/nonexistent/page_1.txt".into(),
            line_count: 0,
            error: None,
        }];
        let err = reformat_pages(&pages).await.unwrap_err();
        match err {
            Pdf2CsvError::Io { path, .. } => assert_eq!(path, Path::new("/nonexistent/page_1.txt")),
            other => panic!("expected Io, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn delimited_file_concatenates_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("output.csv");
        let lines = vec![
            ReformattedLine { page: 1, text: "a,b\n".into() },
            ReformattedLine { page: 2, text: "c,d\n".into() },
        ];
        write_delimited(&lines, &path).await.unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "a,b\nc,d\n");
        assert!(!dir.path().join("output.csv.tmp").exists());
    }
}
