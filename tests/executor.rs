//! Executor behaviour with thread-backed workers and captured output

use anyhow::Result;
use parcheck::checks::{CheckReport, Checker};
use parcheck::config::{ExecutorConfig, LibraryMarkup};
use parcheck::external::RecordingToolRunner;
use parcheck::model::{FileSettings, Job, Language, ShowtimeMode, SourceFile, TimingSample};
use parcheck::parallel::{Executor, ThreadLauncher};
use parcheck::reports::ReportSink;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

fn source(dir: &Path, name: &str, text: &str) -> SourceFile {
    let path = dir.join(name);
    fs::write(&path, text).unwrap();
    SourceFile::from_path(path)
}

fn run(config: ExecutorConfig, files: &[SourceFile]) -> (parcheck::ExecutionResult, ReportSink) {
    let sink = ReportSink::capture();
    let result = Executor::new(config)
        .with_sink(sink.clone())
        .with_launcher(Arc::new(ThreadLauncher::default()))
        .check(files, &[])
        .unwrap();
    (result, sink)
}

fn jobs(n: usize) -> ExecutorConfig {
    ExecutorConfig {
        jobs: n,
        ..ExecutorConfig::default()
    }
}

/// Test 100 files with one distinct defect each under 16 workers
#[test]
fn test_hundred_files_sixteen_workers() {
    let dir = TempDir::new().unwrap();
    let files: Vec<_> = (0..100)
        .map(|i| {
            source(
                dir.path(),
                &format!("file_{i}.cpp"),
                "int main()\n{\n  {int i = *((int*)0);}\n  return 0;\n}\n",
            )
        })
        .collect();

    let (result, sink) = run(jobs(16), &files);
    assert_eq!(result.total, 100);
    assert_eq!(result.printed.len(), 100);
    assert_eq!(sink.captured_err().lines().count(), 100);
    assert!(result.printed.iter().all(|line| line.contains("[nullPointer]")));
}

/// Test count stays the same at every job count
#[test]
fn test_count_independent_of_job_count() {
    let dir = TempDir::new().unwrap();
    let files: Vec<_> = (0..7)
        .map(|i| {
            let body = "int x = 1 / 0;\n".repeat(i + 1);
            source(dir.path(), &format!("f{i}.c"), &body)
        })
        .collect();

    let baseline = run(jobs(1), &files).0.total;
    assert_eq!(baseline, 28);
    for j in 2..=7 {
        assert_eq!(run(jobs(j), &files).0.total, baseline, "jobs = {j}");
    }
}

/// Test a defect in a shared header counts twice but prints once
#[test]
fn test_shared_header_counted_twice_printed_once() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("inc.h"), "inline void f()\n{\n  (void)*((int*)0);\n}\n").unwrap();
    let files = vec![
        source(dir.path(), "a.cpp", "#include \"inc.h\"\n"),
        source(dir.path(), "b.cpp", "#include \"inc.h\"\n"),
    ];

    for j in [1, 2] {
        let (result, _) = run(jobs(j), &files);
        assert_eq!(result.total, 2);
        assert_eq!(result.printed.len(), 1);
        assert!(result.printed[0].contains("inc.h:3:11"));
    }
}

/// Test a library markup that does not report errors silences its files
#[test]
fn test_library_markup_suppresses_file() {
    let dir = TempDir::new().unwrap();
    let files = vec![source(dir.path(), "markup.cpp", "int i = *((int*)0);\n")];

    let mut config = jobs(2);
    config.library.markups.push(LibraryMarkup {
        ext: ".cpp".to_string(),
        report_errors: false,
    });
    let (result, sink) = run(config, &files);
    assert_eq!(result.total, 0);
    assert!(result.printed.is_empty());
    assert!(sink.captured_err().is_empty());
}

/// Test clean files produce nothing
#[test]
fn test_clean_files_two_workers() {
    let dir = TempDir::new().unwrap();
    let files: Vec<_> = (0..3)
        .map(|i| source(dir.path(), &format!("ok{i}.c"), "int main(void) { return 0; }\n"))
        .collect();

    let (result, sink) = run(jobs(2), &files);
    assert_eq!(result.total, 0);
    assert!(result.printed.is_empty());
    assert!(sink.captured_err().is_empty());
}

/// Test output far beyond a pipe buffer from every worker at once
#[test]
fn test_many_diagnostics_do_not_deadlock() {
    let dir = TempDir::new().unwrap();
    let body = "int x = 1 / 0;\n".repeat(2000);
    let files: Vec<_> = (0..8)
        .map(|i| source(dir.path(), &format!("flood{i}.c"), &body))
        .collect();

    let (result, _) = run(jobs(4), &files);
    assert_eq!(result.total, 16_000);
    assert_eq!(result.printed.len(), 16_000);
}

struct OneSample;

impl Checker for OneSample {
    fn run_checks(&self, _job: &Job) -> Result<CheckReport> {
        Ok(CheckReport {
            diagnostics: Vec::new(),
            timings: vec![TimingSample::new("check", Duration::from_millis(1), 0)],
        })
    }
}

/// Test TOP5_SUMMARY prints its scope line once for the run
#[test]
fn test_top5_summary_printed_once() {
    let files = vec![
        SourceFile::new("a.c", Language::C, 1),
        SourceFile::new("b.c", Language::C, 1),
    ];

    for j in [1, 2] {
        let sink = ReportSink::capture();
        let config = ExecutorConfig {
            jobs: j,
            showtime: ShowtimeMode::Top5Summary,
            ..ExecutorConfig::default()
        };
        let checker: Arc<dyn Checker> = Arc::new(OneSample);
        let result = Executor::new(config)
            .with_sink(sink.clone())
            .with_checker(checker.clone())
            .with_launcher(Arc::new(ThreadLauncher::new(
                Some(checker),
                Arc::new(RecordingToolRunner::default()),
            )))
            .check(&files, &[])
            .unwrap();

        assert_eq!(result.timing_report.matches("result(s)").count(), 1);
        assert!(result.timing_report.contains("- 2 result(s))"));
        assert!(result.timing_report.contains("Overall time:"));
        assert_eq!(sink.captured_out(), result.timing_report);
    }
}

/// Test the external tool runs only for jobs with settings
#[test]
fn test_external_tool_only_for_settings() {
    let dir = TempDir::new().unwrap();
    let plain = source(dir.path(), "plain.c", "int a;\n");
    let with_settings: Vec<_> = ["s1.cpp", "s2.cpp"]
        .iter()
        .map(|name| {
            let path = dir.path().join(name);
            fs::write(&path, "int b;\n").unwrap();
            let mut settings = FileSettings::new(&path, Language::Cpp, 7);
            settings.directory = Some(dir.path().to_path_buf());
            settings.defines.push("DEBUG=1".to_string());
            settings
        })
        .collect();

    let recorder = Arc::new(RecordingToolRunner::new(
        1,
        format!("{}:1:5: warning: bad [misc-bad]\n", dir.path().join("s1.cpp").display()),
    ));
    let mut config = jobs(2);
    config.external_tool.enabled = true;

    let result = Executor::new(config)
        .with_sink(ReportSink::capture())
        .with_launcher(Arc::new(ThreadLauncher::new(None, recorder.clone())))
        .check(&[plain], &with_settings)
        .unwrap();

    let calls = recorder.calls();
    assert_eq!(calls.len(), 2);
    assert!(calls.iter().all(|c| c.cwd == dir.path()));
    assert!(calls.iter().all(|c| c.args.contains(&"-DDEBUG=1".to_string())));
    // Same canned line for both files: counted twice, printed once
    assert_eq!(result.total, 2);
    assert_eq!(result.printed.len(), 1);
    assert!(result.printed[0].contains("clang-tidy-misc-bad"));
}

/// Test global suppressions and unmatched notices
#[test]
fn test_suppressions_and_unmatched_notices() {
    let dir = TempDir::new().unwrap();
    let files = vec![
        source(dir.path(), "a.c", "int i = *((int*)0);\n"),
        source(dir.path(), "b.cpp", "int j = 1 / 0;\n"),
    ];

    let mut config = jobs(2);
    config.suppressions = vec![
        "nullPointer:*.c".to_string(),
        "uninitvar".to_string(),
    ];
    config.report_unmatched_suppressions = true;

    let (result, _) = run(config, &files);
    assert_eq!(result.total, 1);
    assert_eq!(result.unmatched.len(), 1);
    assert_eq!(result.unmatched[0].message, "Unmatched suppression: uninitvar");
    assert_eq!(result.printed.len(), 2);
}

/// Test inline suppressions flow through workers
#[test]
fn test_inline_suppression_in_worker() {
    let dir = TempDir::new().unwrap();
    let files = vec![
        source(
            dir.path(),
            "inline.c",
            "int i = *((int*)0); // parcheck-suppress nullPointer\n// parcheck-suppress zerodiv\nint k;\n",
        ),
        source(dir.path(), "other.c", "int z;\n"),
    ];

    let mut config = jobs(2);
    config.inline_suppressions = true;
    config.report_unmatched_suppressions = true;
    let (result, _) = run(config, &files);
    assert_eq!(result.total, 0);
    assert_eq!(result.unmatched.len(), 1);
    assert_eq!(result.unmatched[0].line, 2);

    // A global rule can silence the notice itself
    let mut config = jobs(2);
    config.inline_suppressions = true;
    config.report_unmatched_suppressions = true;
    config.suppressions.push("unmatchedSuppression".to_string());
    let (result, _) = run(config, &files);
    assert!(result.unmatched.is_empty());
    assert!(result.printed.is_empty());
}

/// Test inline comments only apply when enabled, at every job count
#[test]
fn test_inline_suppressions_need_opt_in() {
    let dir = TempDir::new().unwrap();
    let files = vec![
        source(
            dir.path(),
            "3.cpp",
            "int f()\n{\n  // parcheck-suppress zerodiv\n  return 1 / 0;\n}\n",
        ),
        source(dir.path(), "4.cpp", "int g;\n"),
    ];

    for j in [1, 2] {
        let (result, sink) = run(jobs(j), &files);
        assert_eq!(result.total, 1, "jobs = {j}");
        assert!(result.printed[0].contains("3.cpp:4:12]: (error) Division by zero. [zerodiv]"));
        assert_eq!(sink.captured_err().lines().count(), 1);

        let mut config = jobs(j);
        config.inline_suppressions = true;
        let (result, sink) = run(config, &files);
        assert_eq!(result.total, 0, "jobs = {j}");
        assert!(sink.captured_err().is_empty());
    }
}

/// Test one plist per job
#[test]
fn test_plist_written_per_job() {
    let dir = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    let files = vec![
        source(dir.path(), "first.c", "int x = 1 / 0;\n"),
        source(dir.path(), "second.cpp", "int y;\n"),
    ];

    let mut config = jobs(2);
    config.plist_output = Some(out.path().to_path_buf());
    run(config, &files);

    let first = fs::read_to_string(out.path().join("first_0.plist")).unwrap();
    assert!(first.contains("zerodiv"));
    let second = fs::read_to_string(out.path().join("second_1.plist")).unwrap();
    assert!(!second.contains("zerodiv"));
}

/// Test a checker panic is contained to its file
#[test]
fn test_checker_panic_is_contained() {
    struct PanicOnB;
    impl Checker for PanicOnB {
        fn run_checks(&self, job: &Job) -> Result<CheckReport> {
            if job.file.ends_with("b.c") {
                panic!("analysis blew up");
            }
            Ok(CheckReport::default())
        }
    }

    let files: Vec<_> = ["a.c", "b.c", "c.c"]
        .iter()
        .map(|f| SourceFile::new(*f, Language::C, 0))
        .collect();
    let checker: Arc<dyn Checker> = Arc::new(PanicOnB);
    let result = Executor::new(jobs(2))
        .with_sink(ReportSink::capture())
        .with_launcher(Arc::new(ThreadLauncher::new(
            Some(checker),
            Arc::new(RecordingToolRunner::default()),
        )))
        .check(&files, &[])
        .unwrap();

    assert_eq!(result.total, 1);
    assert!(result.printed[0].contains("b.c"));
    assert!(result.printed[0].contains("[internalError]"));
}

/// Test configuration errors surface before any work
#[test]
fn test_bad_plist_directory_fails_fast() {
    let mut config = jobs(2);
    config.plist_output = Some(Path::new("/definitely/missing/parcheck-out").to_path_buf());
    let err = Executor::new(config)
        .with_sink(ReportSink::capture())
        .with_launcher(Arc::new(ThreadLauncher::default()))
        .check(&[SourceFile::new("a.c", Language::C, 0)], &[])
        .unwrap_err();
    assert!(err.to_string().contains("Plist output directory"));
}
