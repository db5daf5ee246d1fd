//! HTML fragments returned to the form page.
//!
//! The page injects the response into its result pane, so everything here is
//! a fragment using the page's Bootstrap alert classes.

use crate::models::{AppType, InputSummary};
use crate::pipeline::{JobReport, LimitExceeded, LimitKind, Outcome};

pub const PAGE_HEADER: &str = "<h2 class=\"page-header\">Result</h2>\n";

const CLOSE_BUTTON: &str = "<button type=\"button\" class=\"close\" data-dismiss=\"alert\" aria-label=\"Close\"><span aria-hidden=\"true\">&times;</span></button>";

const TEMPLATE_INDEX_MESSAGE: &str = "Error: Building index of your input FASTA failed! Either your input sequences are not in FASTA format or there are some error in this web setting.";

/// Full response body for a finished job.
pub fn report(report: &JobReport) -> String {
    let mut out = String::from(PAGE_HEADER);
    out.push_str(&summary_alert(report.app_type, report.summary));
    match &report.outcome {
        Outcome::Completed(html) => out.push_str(html),
        Outcome::LimitExceeded(limit) => out.push_str(&limit_alert(limit)),
    }
    out
}

pub fn summary_alert(app_type: AppType, summary: InputSummary) -> String {
    let noun = match app_type {
        AppType::Design => "site(s)",
        AppType::Check => "primer group(s)",
    };
    dismissible(
        "alert-info",
        &format!(
            "<b>{}</b> {} detected; <b>{}</b> {} used",
            summary.detected, noun, summary.used, noun
        ),
    )
}

pub fn limit_alert(limit: &LimitExceeded) -> String {
    let message = match limit.kind {
        LimitKind::Sites => format!(
            "Warning: Too many sites. <b>{}</b> sites detected. However we only allow <b>{}</b> sites at one time.",
            limit.found, limit.allowed
        ),
        LimitKind::PrimerGroups => format!(
            "Warning: Too many primers. <b>{}</b> primer groups detected. However we only allow <b>{}</b> primer groups at one time.",
            limit.found, limit.allowed
        ),
        LimitKind::Databases => format!(
            "Warning: Too many databases selected. <b>{}</b> databases detected. However we only allow <b>{}</b> databases at one time.",
            limit.found, limit.allowed
        ),
    };
    dismissible("alert-danger", &message)
}

pub fn template_index_alert() -> String {
    format!(
        "{}<div class=\"alert alert-danger\" role=\"alert\">\n    {}\n</div>\n",
        PAGE_HEADER, TEMPLATE_INDEX_MESSAGE
    )
}

/// Error alert with `message` escaped.
pub fn error_alert(message: &str) -> String {
    format!(
        "{}<div class=\"alert alert-danger\" role=\"alert\">\n    Error: {}\n</div>\n",
        PAGE_HEADER,
        escape_html(message)
    )
}

fn dismissible(class: &str, body: &str) -> String {
    format!(
        "<div class=\"alert {} alert-dismissible\" role=\"alert\">\n    {}\n    {}\n</div>\n",
        class, CLOSE_BUTTON, body
    )
}

pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn summary_uses_mode_specific_noun() {
        let summary = InputSummary { detected: 4, used: 3 };

        let design = summary_alert(AppType::Design, summary);
        assert!(design.contains("<b>4</b> site(s) detected; <b>3</b> site(s) used"));
        assert!(design.contains("alert-info alert-dismissible"));

        let check = summary_alert(AppType::Check, summary);
        assert!(check.contains("<b>4</b> primer group(s) detected; <b>3</b> primer group(s) used"));
    }

    #[test]
    fn database_limit_message() {
        let html = limit_alert(&LimitExceeded {
            kind: LimitKind::Databases,
            found: 5,
            allowed: 3,
        });
        assert!(html.contains("alert-danger"));
        assert!(html.contains(
            "Too many databases selected. <b>5</b> databases detected. However we only allow <b>3</b> databases at one time."
        ));
    }

    #[test]
    fn report_appends_tool_html_after_summary() {
        let html = report(&JobReport {
            job_id: Uuid::new_v4(),
            app_type: AppType::Check,
            summary: InputSummary { detected: 1, used: 1 },
            outcome: Outcome::Completed("<table id=\"result\"></table>".to_string()),
        });

        let header = html.find("page-header").unwrap();
        let summary = html.find("primer group(s) detected").unwrap();
        let result = html.find("<table id=\"result\">").unwrap();
        assert!(header < summary && summary < result);
    }

    #[test]
    fn error_alert_escapes_message() {
        let html = error_alert("Invalid value for select-database: '<script>' is not valid");
        assert!(html.contains("&lt;script&gt;"));
        assert!(!html.contains("<script>"));
    }

    #[test]
    fn template_index_alert_is_not_dismissible() {
        let html = template_index_alert();
        assert!(html.contains("Building index of your input FASTA failed!"));
        assert!(!html.contains("alert-dismissible"));
    }
}
