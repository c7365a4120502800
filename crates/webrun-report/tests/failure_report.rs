//! Failure formatting: asynchronous message cleanup must fan out, but the
//! printed report must follow original result order, not completion order.

use std::thread;
use std::time::Duration;

use webrun_core::{AssertionResult, AssertionStatus, TestResult};
use webrun_report::{ErrorProcessor, Printer, PrinterOptions};

/// Processor whose latency is inversely proportional to input length, so
/// later (shorter) messages finish first if ordering were by completion.
struct SlowestFirst;

impl ErrorProcessor for SlowestFirst {
    fn process(&self, raw: &str) -> String {
        let delay = 50u64.saturating_sub(raw.len() as u64);
        thread::sleep(Duration::from_millis(delay));
        format!("cleaned: {raw}")
    }
}

fn failing(suite: &str, title: &str, message: &str) -> TestResult {
    TestResult {
        description: title.to_string(),
        suite: vec![suite.to_string()],
        time: 1.0,
        failed: true,
        not_run: false,
        success: false,
        errors: vec![],
        assertion_result: AssertionResult {
            title: title.to_string(),
            full_name: format!("{suite} {title}"),
            ancestor_titles: vec![suite.to_string()],
            status: AssertionStatus::Failed,
            duration: None,
            failure_messages: vec![message.to_string()],
        },
        test_file_path: format!("{suite}.test.js"),
    }
}

#[test]
fn failures_print_in_result_order_despite_unordered_cleanup() {
    let mut p = Printer::new(Vec::new(), SlowestFirst, PrinterOptions::default());
    p.run_start(0);
    p.add_test_result(failing("alpha", "first", "a much longer failure message text")).unwrap();
    p.add_test_result(failing("beta", "second", "short")).unwrap();

    p.print_failures().unwrap();
    let out = String::from_utf8(p.into_inner()).unwrap();

    let first = out.find("alpha first").expect("first failure present");
    let second = out.find("beta second").expect("second failure present");
    assert!(first < second, "failures out of order:\n{out}");

    assert!(out.contains("Summary of all failing tests"));
    assert!(out.contains("cleaned: a much longer failure message text"));
    assert!(out.contains("cleaned: short"));
}

#[test]
fn passing_run_prints_no_failure_section() {
    let mut p = Printer::new(Vec::new(), SlowestFirst, PrinterOptions::default());
    p.run_start(0);
    p.print_failures().unwrap();
    let out = String::from_utf8(p.into_inner()).unwrap();
    assert!(out.is_empty());
}

#[test]
fn out_of_band_errors_are_included_in_the_report() {
    let mut p = Printer::new(Vec::new(), SlowestFirst, PrinterOptions::default());
    p.run_start(0);

    let mut result = failing("alpha", "first", "assertion text");
    result.errors.push("afterEach hook exploded".to_string());
    p.add_test_result(result).unwrap();

    p.print_failures().unwrap();
    let out = String::from_utf8(p.into_inner()).unwrap();
    assert!(out.contains("cleaned: afterEach hook exploded"));
}
