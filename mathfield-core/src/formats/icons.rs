//! Shared icon mapping for tree visualization formats

/// Get the Unicode icon for an atom kind name (see [`crate::atom::AtomKind::name`])
///
/// Branch wrappers use the `"branch"` pseudo kind.
pub fn get_icon(kind: &str) -> &'static str {
    match kind {
        "root" => "⧉",
        "ord" => "◦",
        "bin" => "±",
        "rel" => "=",
        "punct" => ",",
        "open" => "(",
        "close" => ")",
        "large-op" => "∑",
        "function" => "ƒ",
        "fraction" => "⁄",
        "radical" => "√",
        "subsup" => "⁺",
        "fence" => "⟨",
        "smart-fence" => "⟪",
        "array" => "▦",
        "placeholder" => "□",
        "prompt" => "▣",
        "text" => "¶",
        "group" => "{",
        "accent" => "^",
        "space" => "⎵",
        "macro" => "ℳ",
        "error" => "⚠",
        "branch" => "➔",
        _ => "○",
    }
}
