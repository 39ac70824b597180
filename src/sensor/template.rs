//! Format-template renderer for the panel's `{N}` placeholders.
//!
//! | Placeholder | Value |
//! |---|---|
//! | `{0}` | latest sample (MB) |
//! | `{1}` | comma-joined history, oldest first |
//! | `{2}` | unit, always `MB` |
//! | `{3}` | label, `<mountPoint> (<blockDevice>)` |
//! | `{4}` | latest as a percentage of capacity; forces `max` to 100 |
//!
//! Any other index renders as `null`.

#![allow(missing_docs)]

use std::sync::OnceLock;

use regex::{Captures, Regex};

use crate::sensor::history::UsageHistory;

/// Unit reported by `{2}`.
pub const UNIT: &str = "MB";

/// Text used for unrecognised placeholders.
pub const UNKNOWN_PLACEHOLDER: &str = "null";

/// Display scale when the percentage placeholder is in use.
pub const PERCENT_SCALE: u64 = 100;

fn placeholder_regex() -> &'static Regex {
    static PLACEHOLDER: OnceLock<Regex> = OnceLock::new();
    PLACEHOLDER.get_or_init(|| Regex::new(r"\{([0-9]+)\}").expect("placeholder regex is valid"))
}

/// State the renderer reads from.
#[derive(Debug, Clone, Copy)]
pub struct RenderContext<'a> {
    pub history: &'a UsageHistory,
    pub max_capacity_mb: u64,
    pub mount_point: &'a str,
    pub block_device: &'a str,
}

/// Rendered text plus the display bounds the panel should use.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rendered {
    pub text: String,
    pub max: u64,
}

impl RenderContext<'_> {
    /// Latest sample, or 0 before the first successful measurement.
    #[must_use]
    pub fn latest(&self) -> u64 {
        self.history.latest().unwrap_or(0)
    }

    /// `floor(latest * 100 / capacity)`, 0 when capacity is unknown, never above 100.
    #[must_use]
    pub fn percent(&self) -> u64 {
        if self.max_capacity_mb == 0 {
            return 0;
        }
        let pct = u128::from(self.latest()) * u128::from(PERCENT_SCALE)
            / u128::from(self.max_capacity_mb);
        u64::try_from(pct.min(u128::from(PERCENT_SCALE))).unwrap_or(PERCENT_SCALE)
    }

    #[must_use]
    pub fn label(&self) -> String {
        format!("{} ({})", self.mount_point, self.block_device)
    }
}

/// Substitute every `{N}` in `format`.
#[must_use]
pub fn render(format: &str, ctx: &RenderContext<'_>) -> Rendered {
    let mut max = ctx.max_capacity_mb;
    let text = placeholder_regex()
        .replace_all(format, |caps: &Captures<'_>| match &caps[1] {
            "0" => ctx.latest().to_string(),
            "1" => ctx.history.joined(),
            "2" => UNIT.to_string(),
            "3" => ctx.label(),
            "4" => {
                max = PERCENT_SCALE;
                ctx.percent().to_string()
            }
            _ => UNKNOWN_PLACEHOLDER.to_string(),
        })
        .into_owned();
    Rendered { text, max }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn history_of(values: &[u64]) -> UsageHistory {
        let mut history = UsageHistory::default();
        for v in values {
            history.push(*v);
        }
        history
    }

    fn ctx<'a>(history: &'a UsageHistory, max: u64) -> RenderContext<'a> {
        RenderContext {
            history,
            max_capacity_mb: max,
            mount_point: "/",
            block_device: "/dev/sda1",
        }
    }

    #[test]
    fn renders_value_unit_and_percent() {
        let history = history_of(&[4096]);
        let out = render("{0}/{2} {4}%", &ctx(&history, 10240));
        assert_eq!(out.text, "4096/MB 40%");
        assert_eq!(out.max, 100);
    }

    #[test]
    fn max_is_capacity_without_percent_placeholder() {
        let history = history_of(&[4096]);
        let out = render("{0} {2}", &ctx(&history, 10240));
        assert_eq!(out.text, "4096 MB");
        assert_eq!(out.max, 10240);
    }

    #[test]
    fn renders_history_and_label() {
        let history = history_of(&[1, 2]);
        let out = render("{3}: {1}", &ctx(&history, 10));
        assert_eq!(out.text, "/ (/dev/sda1): 0,0,0,0,0,0,0,0,1,2");
    }

    #[test]
    fn unknown_placeholders_render_null() {
        let history = history_of(&[5]);
        let out = render("{5} {00} {x} {}", &ctx(&history, 10));
        assert_eq!(out.text, "null null {x} {}");
    }

    #[test]
    fn percent_is_zero_without_capacity() {
        let history = history_of(&[5]);
        let out = render("{4}", &ctx(&history, 0));
        assert_eq!(out.text, "0");
        assert_eq!(out.max, 100);
    }

    #[test]
    fn empty_history_renders_zero_and_blank() {
        let history = UsageHistory::default();
        let out = render("[{0}] [{1}]", &ctx(&history, 0));
        assert_eq!(out.text, "[0] []");
        assert_eq!(out.max, 0);
    }

    #[test]
    fn literal_text_passes_through() {
        let history = UsageHistory::default();
        assert_eq!(render("disk", &ctx(&history, 1)).text, "disk");
    }

    #[test]
    fn non_ascii_digits_are_not_placeholders() {
        let history = history_of(&[5]);
        let out = render("{٣} {0}", &ctx(&history, 10));
        assert_eq!(out.text, "{٣} 5");
        assert_eq!(out.max, 10);
    }

    proptest! {
        #[test]
        fn percent_stays_in_range(used in 0u64..2_000_000, size in 1u64..2_000_000) {
            let history = history_of(&[used]);
            let pct: u64 = render("{4}", &ctx(&history, size))
                .text
                .parse()
                .expect("numeric percent");
            prop_assert!(pct <= 100);
            if used <= size {
                prop_assert_eq!(pct, used * 100 / size);
            }
        }
    }
}
