//! Report rendering. Everything here is pure text generation; writing the
//! results to disk lives in [`crate::output`].

pub mod markdown;
pub mod tables;

pub use markdown::{render_glove_markdown, render_integrity_markdown};
pub use tables::{
    render_combined_csv, render_split_csv, render_version_csv, render_version_summary_csv,
};

/// Four-decimal cell text; blank when absent.
pub fn format_score(value: Option<f64>) -> String {
    value.map(|v| format!("{v:.4}")).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_score() {
        assert_eq!(format_score(Some(0.25)), "0.2500");
        assert_eq!(format_score(Some(1.0 / 3.0)), "0.3333");
        assert_eq!(format_score(None), "");
    }
}
