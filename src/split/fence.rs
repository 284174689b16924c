/// Removal of markdown fences around model-produced code
use once_cell::sync::Lazy;
use regex::Regex;

/// A fenced block: opening fence, optional language tag, body, closing fence.
/// Any tag may end the fence line; a python tag may also be followed by the body
/// on the same line. Without a tag the body may start on the fence line itself.
static FENCE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"```(?:[A-Za-z0-9_+.#-]+[ \t]*\r?\n|(?i:python3?|py)[ \t]+|[ \t]*\r?\n?)([\s\S]*?)```",
    )
    .expect("fence pattern is valid")
});

/// Return the code inside all fenced blocks, joined by blank lines in source order.
/// Text without any fenced block is returned unchanged.
pub fn strip_code_fences(text: &str) -> String {
    let mut found_fence = false;
    let mut bodies = Vec::new();

    for caps in FENCE_RE.captures_iter(text) {
        found_fence = true;
        if let Some(body) = caps.get(1) {
            let body = body.as_str().trim();
            if !body.is_empty() {
                bodies.push(body);
            }
        }
    }

    if found_fence {
        bodies.join("\n\n")
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_code_unchanged() {
        let code = "def f():\n    return 1\n";
        assert_eq!(strip_code_fences(code), code);
    }

    #[test]
    fn test_single_tagged_block() {
        let text = "Here you go:\n```python\ndef f():\n    return 1\n```\nHope it helps.";
        assert_eq!(strip_code_fences(text), "def f():\n    return 1");
    }

    #[test]
    fn test_blocks_concatenated_in_order() {
        let text = "```py\ndef f():\n    return 1\n```\nthen tests\n```\ndef test_f():\n    assert f() == 1\n```";
        assert_eq!(
            strip_code_fences(text),
            "def f():\n    return 1\n\ndef test_f():\n    assert f() == 1"
        );
    }

    #[test]
    fn test_any_language_tag_ignored() {
        let text = "```Python3\nx = 1\n```";
        assert_eq!(strip_code_fences(text), "x = 1");
    }

    #[test]
    fn test_inline_fence_without_tag() {
        assert_eq!(strip_code_fences("```x = 1```"), "x = 1");
    }

    #[test]
    fn test_inline_fence_with_tag() {
        assert_eq!(strip_code_fences("```python x = 1```"), "x = 1");
        assert_eq!(strip_code_fences("```Py  print(2)```"), "print(2)");
        assert_eq!(strip_code_fences("```pyx = 1```"), "pyx = 1");
    }

    #[test]
    fn test_empty_blocks_skipped() {
        let text = "```\n\n```\n```python\ny = 2\n```";
        assert_eq!(strip_code_fences(text), "y = 2");
    }

    #[test]
    fn test_only_empty_blocks_yield_empty() {
        assert_eq!(strip_code_fences("```python\n```"), "");
    }
}
