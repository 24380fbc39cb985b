//! Markdown normalization for WeCom.
//!
//! WeCom markdown messages render bold, links, quotes and headings but not
//! fenced code blocks, so fences collapse to inline backticks.

use std::sync::LazyLock;

use regex::Regex;

/// Opening fence with an optional language tag, including its newline.
static FENCE_OPEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"```[a-z]*\n").expect("valid regex"));

/// Convert assistant markdown into the subset WeCom renders.
pub fn to_wecom_markdown(text: &str) -> String {
    FENCE_OPEN.replace_all(text, "`").replace("```", "`")
}
