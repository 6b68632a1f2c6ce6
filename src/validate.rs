//! Reporting of config validation results
//!
//! The engine produces `ValidationIssue`s; this module turns them into log lines so
//! every run shows what was checked and what was wrong.

use feedbackcam_engine::config::{IssueLevel, ValidationIssue};

use crate::{logi, loge, logw};

pub fn emit_issues(tag: &str, issues: &[ValidationIssue]) {
    for it in issues {
        let line = match &it.hint {
            Some(h) => format!("{}: {} (hint: {})", it.path, it.message, h),
            None => format!("{}: {}", it.path, it.message),
        };
        match it.level {
            IssueLevel::Warn => logw!(tag, "{line}"),
            IssueLevel::Error => loge!(tag, "{line}"),
        }
    }
}

/// (warnings, errors)
pub fn count(issues: &[ValidationIssue]) -> (usize, usize) {
    let warns = issues.iter().filter(|i| i.level == IssueLevel::Warn).count();
    let errs = issues.iter().filter(|i| i.level == IssueLevel::Error).count();
    (warns, errs)
}

/// One summary line, also when there is nothing to report.
pub fn emit_summary(tag: &str, label: &str, issues: &[ValidationIssue]) {
    let (warns, errs) = count(issues);
    if errs == 0 && warns == 0 {
        logi!(tag, "validation: {label} OK (0 issues)");
    } else {
        logw!(tag, "validation: {label} issues found (errors={errs} warnings={warns})");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_by_level() {
        let issues = vec![
            ValidationIssue::warn("config.json:/midi/bipolar_cc", "same as unipolar_cc", None),
            ValidationIssue::warn("config.json:/foo", "unknown field 'foo'", None),
            ValidationIssue::error("config.json:/render/fps", "must be > 0", Some("try 30".into())),
        ];
        assert_eq!(count(&issues), (2, 1));
        assert_eq!(count(&[]), (0, 0));
    }
}
