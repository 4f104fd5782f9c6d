//! Parser for the analysis backend's free-form response text.
//!
//! The backend is asked to report one finding per line in the form
//! `行号:规则N:问题描述:建议修正`, or the sentinel line when a chunk is
//! clean. The far end is under no obligation to comply, so every line that
//! does not match the grammar is silently discarded — dropped output is data
//! loss by design, never a crash.

use regex::Regex;
use std::sync::OnceLock;

use crate::report::Finding;

/// Line the backend is instructed to emit when a chunk has no issues.
pub const NO_ISSUES_SENTINEL: &str = "OK";

static FINDING_RE: OnceLock<Regex> = OnceLock::new();

fn finding_re() -> &'static Regex {
    FINDING_RE.get_or_init(|| {
        Regex::new(r"(\d+):规则(\d+):([^:]+):(.+)").expect("finding line pattern is valid")
    })
}

/// Extract findings from one chunk's response text.
///
/// `start_line` is the chunk's 0-indexed file offset; reported line numbers
/// are chunk-local and are translated to file-global numbers here. Returns
/// matched lines in appearance order; never errors on malformed input.
pub fn parse_response(response: &str, file: &str, start_line: usize) -> Vec<Finding> {
    let mut findings = Vec::new();

    for line in response.lines() {
        let line = line.trim();
        if line.is_empty() || line == NO_ISSUES_SENTINEL {
            continue;
        }

        let Some(caps) = finding_re().captures(line) else {
            continue;
        };

        let Ok(local_line) = caps[1].parse::<usize>() else {
            continue;
        };

        findings.push(Finding {
            file: file.to_string(),
            line: start_line + local_line,
            rule: format!("规则{}", &caps[2]),
            original: caps[3].to_string(),
            suggested: caps[4].to_string(),
        });
    }

    findings
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_well_formed_line() {
        let findings = parse_response("42:规则2:危险的类型转换:使用static_cast", "a.cpp", 0);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].file, "a.cpp");
        assert_eq!(findings[0].line, 42);
        assert_eq!(findings[0].rule, "规则2");
        assert_eq!(findings[0].original, "危险的类型转换");
        assert_eq!(findings[0].suggested, "使用static_cast");
    }

    #[test]
    fn test_line_offset_applied() {
        let findings = parse_response("150:规则1:index type:use size_t", "a.cpp", 500);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].line, 650);
    }

    #[test]
    fn test_chunk_local_line_three_offset_five_hundred() {
        let findings = parse_response("3:规则3:未初始化指针:补充nullptr初始化", "a.cpp", 500);
        assert_eq!(findings[0].line, 503);
    }

    #[test]
    fn test_sentinel_and_garbage_skipped() {
        let response = "OK\nnot a finding at all\n===\n";
        assert!(parse_response(response, "a.cpp", 0).is_empty());
    }

    #[test]
    fn test_mixed_response_keeps_appearance_order() {
        let response = "\
some preamble from the model
12:规则1:signed index:use size_t
OK
garbage::line
7:规则3:raw pointer uninitialized:initialize with nullptr
";
        let findings = parse_response(response, "a.cpp", 100);
        assert_eq!(findings.len(), 2);
        assert_eq!(findings[0].line, 112);
        assert_eq!(findings[0].rule, "规则1");
        assert_eq!(findings[1].line, 107);
        assert_eq!(findings[1].rule, "规则3");
    }

    #[test]
    fn test_suggestion_may_contain_colons() {
        let findings = parse_response("5:规则2:c cast:use static_cast<int>(x): not (int)x", "a.cpp", 0);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].original, "c cast");
        assert_eq!(findings[0].suggested, "use static_cast<int>(x): not (int)x");
    }

    #[test]
    fn test_missing_fields_discarded() {
        assert!(parse_response("42:规则2:只有三段", "a.cpp", 0).is_empty());
        assert!(parse_response("规则2:缺少行号:fix", "a.cpp", 0).is_empty());
    }

    #[test]
    fn test_empty_response() {
        assert!(parse_response("", "a.cpp", 0).is_empty());
    }
}
