//! Pipeline integration tests against stand-in `pdftoppm` and `tesseract`
//! executables.
//!
//! The stand-ins are small shell scripts written into a temp directory:
//!
//! * `pdftoppm` reads `% pages=N` and an optional `% password=X` line from
//!   the "PDF", honours `-f`/`-l`/`-upw`, and writes `<prefix>-<n>.jpg`.
//! * `tesseract` answers `--list-langs` with a configurable list and prints
//!   a fixed block of text plus the language and the image contents.
//!
//! Unix only: the scripts need `/bin/sh` and an executable bit.

#![cfg(unix)]

use pdf2csv::{
    convert, convert_from_bytes, AnalysisConfig, AnalysisOutcome, OcrLanguage, PageError,
    PageSelection, Pdf2CsvError, PipelineConfig, PipelineProgressCallback, Stage, ToolSettings,
};
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

// ── Test helpers ─────────────────────────────────────────────────────────────

const FAKE_PDFTOPPM: &str = r#"#!/bin/sh
first=1; last=""; upw=""; ext=jpg
while [ $# -gt 2 ]; do
  case "$1" in
    -jpeg) ext=jpg ;;
    -png) ext=png ;;
    -r) shift ;;
    -f) shift; first=$1 ;;
    -l) shift; last=$1 ;;
    -upw) shift; upw=$1 ;;
  esac
  shift
done
pdf=$1; prefix=$2
pages=$(sed -n 's/^% pages=//p' "$pdf")
password=$(sed -n 's/^% password=//p' "$pdf")
if [ -n "$password" ] && [ "$upw" != "$password" ]; then
  echo "Command Line Error: Incorrect password" >&2
  exit 1
fi
[ -z "$last" ] && last=$pages
[ "$last" -gt "$pages" ] && last=$pages
i=$first
while [ "$i" -le "$last" ]; do
  echo "scan $i" > "${prefix}-${i}.${ext}"
  i=$((i+1))
done
exit 0
"#;

fn fake_tesseract(langs: &[&str], failing_image_text: Option<&str>) -> String {
    let listing: String = langs.iter().map(|l| format!("echo {l}\n")).collect();
    let fail = match failing_image_text {
        Some(text) => format!(
            "if [ \"$(cat \"$1\")\" = \"{text}\" ]; then echo \"Error in pixReadStream\" >&2; exit 1; fi\n"
        ),
        None => String::new(),
    };
    format!(
        r#"#!/bin/sh
if [ "$1" = "--list-langs" ]; then
  echo "List of available languages in \"/fake/tessdata/\" ({count}):"
{listing}  exit 0
fi
{fail}printf '%s\n' "lang $4"
printf '%s\n' 'John Doe, "Age" 30'
cat "$1"
"#,
        count = langs.len(),
    )
}

fn write_executable(path: &Path, body: &str) {
    std::fs::write(path, body).unwrap();
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755)).unwrap();
}

struct Fixture {
    _dir: tempfile::TempDir,
    tools: ToolSettings,
    workdir: PathBuf,
    root: PathBuf,
}

fn fixture(langs: &[&str], failing_image_text: Option<&str>) -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    let bin = dir.path().join("bin");
    std::fs::create_dir_all(&bin).unwrap();
    write_executable(&bin.join("pdftoppm"), FAKE_PDFTOPPM);
    write_executable(
        &bin.join("tesseract"),
        &fake_tesseract(langs, failing_image_text),
    );

    Fixture {
        tools: ToolSettings::new(&bin, bin.join("tesseract")),
        workdir: dir.path().join("work"),
        root: dir.path().to_path_buf(),
        _dir: dir,
    }
}

fn fake_pdf(pages: usize, password: Option<&str>) -> Vec<u8> {
    let mut pdf = format!("%PDF-1.4\n% pages={pages}\n");
    if let Some(pw) = password {
        pdf.push_str(&format!("% password={pw}\n"));
    }
    pdf.into_bytes()
}

fn base_config(fx: &Fixture) -> pdf2csv::PipelineConfigBuilder {
    PipelineConfig::builder()
        .tools(fx.tools.clone())
        .workdir(&fx.workdir)
        .analysis_enabled(false)
}

#[derive(Default)]
struct Recorder {
    events: Mutex<Vec<String>>,
}

impl PipelineProgressCallback for Recorder {
    fn on_stage_start(&self, stage: Stage) {
        self.events.lock().unwrap().push(format!("start {stage:?}"));
    }
    fn on_page_error(&self, stage: Stage, page: usize, _total: usize, _error: &str) {
        self.events
            .lock()
            .unwrap()
            .push(format!("error {stage:?} {page}"));
    }
    fn on_stage_complete(&self, stage: Stage) {
        self.events.lock().unwrap().push(format!("done {stage:?}"));
    }
}

// ── Happy paths ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn single_page_produces_all_artifacts() {
    let fx = fixture(&["eng"], None);
    let config = base_config(&fx).build().unwrap();

    let output = convert_from_bytes(&fake_pdf(1, None), &config).await.unwrap();

    assert!(fx.workdir.join("page_1.jpg").exists());
    assert!(fx.workdir.join("page_1.txt").exists());
    assert_eq!(output.csv_path, fx.workdir.join("output.csv"));

    let csv = std::fs::read_to_string(&output.csv_path).unwrap();
    assert_eq!(csv, "lang,eng\nJohn,Doe,Age,30\nscan,1\n");
    assert_eq!(csv, output.csv());
    assert_eq!(output.stats.rendered_pages, 1);
    assert_eq!(output.stats.csv_lines, 3);
    assert!(matches!(output.analysis, AnalysisOutcome::Skipped));
    assert!(!fx.workdir.join("gemini_analysis_output.csv").exists());
}

#[tokio::test]
async fn local_file_input_is_read() {
    let fx = fixture(&["eng"], None);
    let pdf_path = fx.root.join("scan.pdf");
    std::fs::write(&pdf_path, fake_pdf(2, None)).unwrap();
    let config = base_config(&fx).build().unwrap();

    let output = convert(pdf_path.to_str().unwrap(), &config).await.unwrap();
    assert_eq!(output.images.len(), 2);
}

#[tokio::test]
async fn page_range_limits_rendered_pages() {
    let fx = fixture(&["eng"], None);
    let config = base_config(&fx)
        .pages(PageSelection::Range(2, 4))
        .build()
        .unwrap();

    let output = convert_from_bytes(&fake_pdf(10, None), &config).await.unwrap();

    assert_eq!(output.images.len(), 3);
    let sources: Vec<usize> = output.images.iter().map(|i| i.source_page).collect();
    assert_eq!(sources, vec![2, 3, 4]);
    // Sequentially numbered regardless of the source page.
    assert!(fx.workdir.join("page_1.jpg").exists());
    assert!(fx.workdir.join("page_3.jpg").exists());
    assert!(!fx.workdir.join("page_4.jpg").exists());

    let csv = output.csv();
    assert!(csv.find("scan,2").unwrap() < csv.find("scan,4").unwrap());
}

#[tokio::test]
async fn every_language_reaches_the_engine() {
    for lang in OcrLanguage::ALL {
        let fx = fixture(&["eng", "fra", "msa", "deu", "spa"], None);
        let config = base_config(&fx).language(lang).build().unwrap();

        let output = convert_from_bytes(&fake_pdf(1, None), &config).await.unwrap();
        let expected = format!("lang,{}\n", lang.code());
        assert!(
            output.csv().starts_with(&expected),
            "{lang:?}: got {:?}",
            output.csv()
        );
    }
}

#[tokio::test]
async fn concurrent_ocr_keeps_page_order() {
    let fx = fixture(&["eng"], None);
    let config = base_config(&fx).ocr_concurrency(4).build().unwrap();

    let output = convert_from_bytes(&fake_pdf(6, None), &config).await.unwrap();
    let pages: Vec<usize> = output.texts.iter().map(|t| t.index).collect();
    assert_eq!(pages, vec![1, 2, 3, 4, 5, 6]);
    let scans: Vec<&str> = output
        .lines
        .iter()
        .map(|l| l.text.as_str())
        .filter(|t| t.starts_with("scan,"))
        .collect();
    assert_eq!(
        scans,
        vec!["scan,1\n", "scan,2\n", "scan,3\n", "scan,4\n", "scan,5\n", "scan,6\n"]
    );
}

// ── Failure paths ────────────────────────────────────────────────────────────

#[tokio::test]
async fn wrong_password_leaves_no_page_images() {
    let fx = fixture(&["eng"], None);
    let config = base_config(&fx).password("nope").build().unwrap();

    let err = convert_from_bytes(&fake_pdf(2, Some("secret")), &config)
        .await
        .unwrap_err();
    assert!(matches!(err, Pdf2CsvError::WrongPassword));
    assert!(!fx.workdir.join("page_1.jpg").exists());
}

#[tokio::test]
async fn missing_password_is_reported() {
    let fx = fixture(&["eng"], None);
    let config = base_config(&fx).build().unwrap();

    let err = convert_from_bytes(&fake_pdf(1, Some("secret")), &config)
        .await
        .unwrap_err();
    assert!(matches!(err, Pdf2CsvError::PasswordRequired));
    assert!(err.is_decryption());
}

#[tokio::test]
async fn correct_password_unlocks_the_document() {
    let fx = fixture(&["eng"], None);
    let config = base_config(&fx).password("secret").build().unwrap();

    let output = convert_from_bytes(&fake_pdf(1, Some("secret")), &config)
        .await
        .unwrap();
    assert_eq!(output.images.len(), 1);
}

#[tokio::test]
async fn language_not_installed_aborts_before_ocr() {
    let fx = fixture(&["eng"], None);
    let config = base_config(&fx)
        .language(OcrLanguage::Malay)
        .build()
        .unwrap();

    let err = convert_from_bytes(&fake_pdf(1, None), &config)
        .await
        .unwrap_err();
    match err {
        Pdf2CsvError::UnsupportedLanguage { code, .. } => assert_eq!(code, "msa"),
        other => panic!("expected UnsupportedLanguage, got {other:?}"),
    }
    assert!(fx.workdir.join("page_1.jpg").exists());
    assert!(!fx.workdir.join("page_1.txt").exists());
    assert!(!fx.workdir.join("output.csv").exists());
}

#[tokio::test]
async fn one_failing_page_does_not_stop_the_others() {
    let fx = fixture(&["eng"], Some("scan 2"));
    let recorder = Arc::new(Recorder::default());
    let config = base_config(&fx)
        .progress_callback(recorder.clone())
        .build()
        .unwrap();

    let output = convert_from_bytes(&fake_pdf(3, None), &config).await.unwrap();

    assert_eq!(output.stats.failed_pages, 1);
    assert_eq!(output.stats.ocr_pages, 2);
    let errors: Vec<&PageError> = output.page_errors().collect();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].page(), 2);
    assert!(!fx.workdir.join("page_2.txt").exists());

    let csv = output.csv();
    assert!(csv.contains("scan,1\n"));
    assert!(!csv.contains("scan,2"));
    assert!(csv.contains("scan,3\n"));

    let events = recorder.events.lock().unwrap();
    assert!(events.contains(&"error Ocr 2".to_string()));
}

#[tokio::test]
async fn every_page_failing_is_fatal() {
    let fx = fixture(&["eng"], Some("scan 1"));
    let config = base_config(&fx).build().unwrap();

    let err = convert_from_bytes(&fake_pdf(1, None), &config)
        .await
        .unwrap_err();
    assert!(matches!(err, Pdf2CsvError::AllPagesFailed { total: 1, .. }));
    assert!(!fx.workdir.join("output.csv").exists());
}

#[tokio::test]
async fn missing_settings_file_aborts_before_rasterizing() {
    let fx = fixture(&["eng"], None);
    let config = PipelineConfig::builder()
        .settings_path(fx.root.join("absent.ini"))
        .workdir(&fx.workdir)
        .analysis_enabled(false)
        .build()
        .unwrap();

    let err = convert_from_bytes(&fake_pdf(1, None), &config)
        .await
        .unwrap_err();
    assert!(matches!(err, Pdf2CsvError::ConfigNotFound { .. }));
    assert!(!fx.workdir.exists());
}

#[tokio::test]
async fn settings_file_locates_the_tools() {
    let fx = fixture(&["eng"], None);
    let ini = fx.root.join("config.ini");
    std::fs::write(
        &ini,
        format!(
            "[settings]\nPopplerPath = {}\nTesseractPath = {}\n",
            fx.tools.poppler_path.display(),
            fx.tools.tesseract_path.display()
        ),
    )
    .unwrap();
    let config = PipelineConfig::builder()
        .settings_path(&ini)
        .workdir(&fx.workdir)
        .analysis_enabled(false)
        .build()
        .unwrap();

    let output = convert_from_bytes(&fake_pdf(1, None), &config).await.unwrap();
    assert_eq!(output.stats.rendered_pages, 1);
}

#[tokio::test]
async fn missing_credential_keeps_the_csv() {
    let fx = fixture(&["eng"], None);
    let recorder = Arc::new(Recorder::default());
    let config = base_config(&fx)
        .analysis(AnalysisConfig {
            credential_env: Some("PDF2CSV_TEST_CREDENTIAL_THAT_IS_NEVER_SET".into()),
            ..AnalysisConfig::default()
        })
        .progress_callback(recorder.clone())
        .build()
        .unwrap();

    let output = convert_from_bytes(&fake_pdf(1, None), &config).await.unwrap();

    assert!(output.analysis.is_failed());
    assert!(fx.workdir.join("output.csv").exists());
    assert!(!fx.workdir.join("gemini_analysis_output.csv").exists());

    let events = recorder.events.lock().unwrap();
    assert_eq!(
        *events,
        vec![
            "start Configure",
            "done Configure",
            "start Rasterize",
            "done Rasterize",
            "start Ocr",
            "done Ocr",
            "start Reformat",
            "done Reformat",
            "start Analyze",
        ]
    );
}
