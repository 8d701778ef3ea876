//! Project-name slugification.
//!
//! `workDir = baseDir/.noctua/pipelines/{projectName}`, so the slug must be
//! a safe path component: lowercase, `[a-z0-9-]+`, no leading or trailing
//! dash, capped length.

const MAX_SLUG_LEN: usize = 50;

/// Lowercase, collapse runs of non-alphanumerics to a single `-`, trim
/// leading/trailing dashes, truncate to `MAX_SLUG_LEN` bytes.
///
/// Idempotent: `slugify(slugify(s)) == slugify(s)`.
#[must_use]
pub fn slugify(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut last_was_dash = false;

    for ch in text.chars() {
        if ch.is_ascii_alphanumeric() {
            out.push(ch.to_ascii_lowercase());
            last_was_dash = false;
        } else if !last_was_dash {
            out.push('-');
            last_was_dash = true;
        }
    }

    let trimmed = out.trim_matches('-');
    let truncated: String = trimmed.chars().take(MAX_SLUG_LEN).collect();
    truncated.trim_end_matches('-').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn example_from_spec() {
        assert_eq!(
            slugify("OSCN court records – Oklahoma County"),
            "oscn-court-records-oklahoma-county"
        );
    }

    #[test]
    fn collapses_runs_and_trims() {
        assert_eq!(slugify("  --Hello   World!!--  "), "hello-world");
    }

    #[test]
    fn truncates_to_max_len() {
        let long = "a".repeat(200);
        let slug = slugify(&long);
        assert_eq!(slug.len(), MAX_SLUG_LEN);
    }

    #[test]
    fn truncation_does_not_leave_trailing_dash() {
        // Construct a string whose 50-char prefix lands exactly on a dash.
        let mut s = "a".repeat(49);
        s.push('-');
        s.push_str("rest-of-the-words-here");
        let slug = slugify(&s);
        assert!(!slug.ends_with('-'));
    }

    #[test]
    fn is_idempotent() {
        let cases = [
            "OSCN court records – Oklahoma County",
            "  --Hello   World!!--  ",
            "already-a-slug",
            "",
            "____",
        ];
        for case in cases {
            let once = slugify(case);
            let twice = slugify(&once);
            assert_eq!(once, twice, "not idempotent for {case:?}");
        }
    }

    #[test]
    fn empty_input_yields_empty_slug() {
        assert_eq!(slugify(""), "");
        assert_eq!(slugify("---"), "");
    }
}
