use console::Style;
use fluxcheck_core::progress::TaskStatus;

pub fn error_prefix() -> String {
    Style::new().red().bold().apply_to("error:").to_string()
}

/// Leading glyph of a finished file line.
pub fn status_mark(status: TaskStatus) -> String {
    let (style, glyph) = match status {
        TaskStatus::Passed => (Style::new().green().bold(), "\u{2714}"),
        TaskStatus::Skipped => (Style::new().yellow(), "\u{2013}"),
        TaskStatus::Failed => (Style::new().red().bold(), "\u{2718}"),
    };
    style.apply_to(glyph).to_string()
}

/// Secondary text: step descriptions and skip reasons.
pub fn dim(s: &str) -> String {
    Style::new().dim().apply_to(s).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_status_has_a_distinct_mark() {
        let marks: Vec<String> = [TaskStatus::Passed, TaskStatus::Skipped, TaskStatus::Failed]
            .into_iter()
            .map(|status| console::strip_ansi_codes(&status_mark(status)).into_owned())
            .collect();
        assert_eq!(marks, vec!["\u{2714}", "\u{2013}", "\u{2718}"]);
    }

    #[test]
    fn error_prefix_reads_error() {
        assert_eq!(console::strip_ansi_codes(&error_prefix()), "error:");
    }

    #[test]
    fn dim_keeps_text() {
        assert!(dim("apps/redis.yaml").contains("apps/redis.yaml"));
    }
}
