//! Output formatting for contract-verify results
//!
//! Renders a run as a colored table, plain text, JSON, YAML or JUnit XML.

use chrono::{DateTime, Utc};
use clap::ValueEnum;
use colored::Colorize;
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::path::Path;

use crate::error::VerifyError;
use crate::runner::{RunSummary, TestOutcome, TestResult};

/// Output format options for CLI results
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum, Debug, Default)]
pub enum OutputFormat {
    /// Human-readable table format with colors
    #[default]
    Table,
    /// Plain text, one line per contract
    Text,
    /// JSON format for machine processing
    Json,
    /// YAML format
    Yaml,
    /// JUnit XML for CI systems
    Junit,
}

/// Serializable run report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    /// True when every contract passed
    pub success: bool,
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub duration_ms: u64,
    pub generated_at: DateTime<Utc>,
    pub outcomes: Vec<TestOutcome>,
}

impl RunReport {
    /// Create a report from a run summary
    pub fn from_summary(summary: &RunSummary) -> Self {
        Self {
            success: summary.is_success(),
            total: summary.total(),
            passed: summary.passed,
            failed: summary.failed,
            duration_ms: summary.duration_ms,
            generated_at: Utc::now(),
            outcomes: summary.outcomes.clone(),
        }
    }

    /// Render the report in the specified format
    pub fn render(&self, format: OutputFormat) -> Result<String, VerifyError> {
        match format {
            OutputFormat::Json => serde_json::to_string_pretty(self)
                .map_err(|e| VerifyError::SerializationError(e.to_string())),
            OutputFormat::Yaml => serde_yaml::to_string(self)
                .map_err(|e| VerifyError::SerializationError(e.to_string())),
            OutputFormat::Table => Ok(self.render_table()),
            OutputFormat::Text => Ok(self.render_text()),
            OutputFormat::Junit => Ok(self.render_junit()),
        }
    }

    fn summary_line(&self) -> String {
        format!(
            "{} contract(s): {} passed, {} failed ({} ms)",
            self.total, self.passed, self.failed, self.duration_ms
        )
    }

    fn render_table(&self) -> String {
        let mut out = String::new();

        writeln!(out).ok();
        writeln!(out, "{}", "Contract Verification Results".cyan().bold()).ok();
        writeln!(out, "{}", "=".repeat(60)).ok();
        writeln!(out).ok();

        for outcome in &self.outcomes {
            let status = match outcome.result {
                TestResult::Pass => "PASS".green().bold(),
                TestResult::Fail => "FAIL".red().bold(),
            };
            writeln!(
                out,
                "{} {} {}",
                status,
                outcome.test_name,
                format!("({} ms)", outcome.duration_ms).dimmed()
            )
            .ok();
            for line in &outcome.report {
                writeln!(out, "     {} {}", "x".red(), line).ok();
            }
        }

        writeln!(out).ok();
        writeln!(out, "{}", "-".repeat(60)).ok();
        let summary = self.summary_line();
        if self.success {
            writeln!(out, "{} {}", "+".green(), summary.green()).ok();
        } else {
            writeln!(out, "{} {}", "x".red(), summary.red()).ok();
        }
        out
    }

    fn render_text(&self) -> String {
        let mut out = String::new();
        for outcome in &self.outcomes {
            writeln!(out, "{} {}", outcome.result, outcome.test_name).ok();
            for line in &outcome.report {
                writeln!(out, "    {}", line).ok();
            }
        }
        writeln!(out, "{}", self.summary_line()).ok();
        out
    }

    fn render_junit(&self) -> String {
        let mut out = String::new();
        writeln!(out, r#"<?xml version="1.0" encoding="UTF-8"?>"#).ok();
        writeln!(
            out,
            r#"<testsuites name="contract-verify" tests="{}" failures="{}" time="{}">"#,
            self.total,
            self.failed,
            seconds(self.duration_ms)
        )
        .ok();
        writeln!(
            out,
            concat!(
                r#"  <testsuite name="contracts" tests="{}" failures="{}" errors="0" "#,
                r#"time="{}" timestamp="{}">"#
            ),
            self.total,
            self.failed,
            seconds(self.duration_ms),
            self.generated_at.format("%Y-%m-%dT%H:%M:%S")
        )
        .ok();

        for outcome in &self.outcomes {
            let name = xml_escape(&outcome.test_name);
            let time = seconds(outcome.duration_ms);
            match outcome.result {
                TestResult::Pass => {
                    writeln!(
                        out,
                        r#"    <testcase name="{}" classname="contracts" time="{}"/>"#,
                        name, time
                    )
                    .ok();
                }
                TestResult::Fail => {
                    writeln!(
                        out,
                        r#"    <testcase name="{}" classname="contracts" time="{}">"#,
                        name, time
                    )
                    .ok();
                    let message = outcome.report.first().map(String::as_str).unwrap_or("failed");
                    writeln!(
                        out,
                        r#"      <failure message="{}">{}</failure>"#,
                        xml_escape(message),
                        xml_escape(&outcome.report.join("\n"))
                    )
                    .ok();
                    writeln!(out, "    </testcase>").ok();
                }
            }
        }

        writeln!(out, "  </testsuite>").ok();
        writeln!(out, "</testsuites>").ok();
        out
    }
}

/// Write rendered output to a file, or stdout when no path is given
pub fn emit(content: &str, output: Option<&Path>) -> Result<(), VerifyError> {
    match output {
        Some(path) => std::fs::write(path, content).map_err(|e| {
            VerifyError::file_error(format!("Failed to write report '{}': {}", path.display(), e))
        }),
        None => {
            print!("{}", content);
            if !content.ends_with('\n') {
                println!();
            }
            Ok(())
        }
    }
}

fn seconds(ms: u64) -> String {
    format!("{:.3}", ms as f64 / 1000.0)
}

fn xml_escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            c if (c as u32) < 0x20 && !matches!(c, '\n' | '\r' | '\t') => {}
            c => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report() -> RunReport {
        RunReport::from_summary(&RunSummary::from_outcomes(
            vec![
                TestOutcome::pass("users/get_user", 12),
                TestOutcome::fail(
                    "users/create_user",
                    vec!["Expected statusCode to be '201' but it was '400'".to_string()],
                    30,
                ),
            ],
            42,
        ))
    }

    #[test]
    fn test_text_output() {
        let text = report().render(OutputFormat::Text).unwrap();
        assert!(text.contains("PASS users/get_user\n"));
        assert!(text.contains(
            "FAIL users/create_user\n    Expected statusCode to be '201' but it was '400'\n"
        ));
        assert!(text.ends_with("2 contract(s): 1 passed, 1 failed (42 ms)\n"));
    }

    #[test]
    fn test_json_output() {
        let json = report().render(OutputFormat::Json).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["success"], false);
        assert_eq!(value["outcomes"][1]["result"], "FAIL");
        assert_eq!(value["outcomes"][1]["test_name"], "users/create_user");
    }

    #[test]
    fn test_yaml_output() {
        let yaml = report().render(OutputFormat::Yaml).unwrap();
        let value: serde_yaml::Value = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(value["passed"].as_u64(), Some(1));
    }

    #[test]
    fn test_junit_output() {
        let xml = report().render(OutputFormat::Junit).unwrap();
        assert!(xml.starts_with("<?xml"));
        assert!(xml.contains(
            r#"<testsuites name="contract-verify" tests="2" failures="1" time="0.042">"#
        ));
        assert!(xml.contains(
            r#"<testcase name="users/get_user" classname="contracts" time="0.012"/>"#
        ));
        assert!(xml.contains(concat!(
            r#"<failure message="Expected statusCode to be &apos;201&apos; "#,
            r#"but it was &apos;400&apos;">"#
        )));
    }

    #[test]
    fn test_xml_escape() {
        assert_eq!(xml_escape(r#"<a href="x">&'"#), "&lt;a href=&quot;x&quot;&gt;&amp;&apos;");
        assert_eq!(xml_escape("bell\u{7}"), "bell");
    }

    #[test]
    fn test_emit_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.txt");
        emit("hello\n", Some(&path)).unwrap();
        assert_eq!(std::fs::read_to_string(path).unwrap(), "hello\n");
    }
}
