/// Static safety screening of solution code
use crate::config::types::{Result, VerifyError};
use crate::safety::denylist::{DenyRule, Denylist, RuleStage};
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;

/// Start of an `open(` call; the argument list is found by balancing from here
static OPEN_CALL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\bopen\s*\(").expect("open call pattern is valid"));

/// `name=value` keyword argument (not `==`)
static KEYWORD_ARG_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([A-Za-z_]\w*)\s*=([^=][\s\S]*)$").expect("keyword argument pattern is valid")
});

/// String literal starting at a filesystem root, after any comment lines
static ABSOLUTE_LITERAL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"^(?:\s*#[^\n]*\n)*\s*[rRbBuUfF]{0,2}["'](?:/|\\|[A-Za-z]:[\\/])"#)
        .expect("absolute path literal pattern is valid")
});

/// Mode literal containing a write-capable flag
static WRITE_MODE_LITERAL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"^(?:\s*#[^\n]*\n)*\s*[rRbBuUfF]{0,2}["'][^"']*[wax+]"#)
        .expect("write mode literal pattern is valid")
});

/// Category of a screening violation
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ViolationKind {
    CodeTooLarge,
    BannedImport,
    BannedApi,
    OpenAbsolutePath,
    OpenWriteMode,
}

/// First violation found in a solution
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Violation {
    pub kind: ViolationKind,
    pub reason: String,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.reason)
    }
}

#[derive(Clone, Debug)]
enum CompiledDenyRule {
    Module { name: String, regex: Regex },
    CallPrefix(String),
    OpenFile,
}

impl CompiledDenyRule {
    fn compile(rule: &DenyRule) -> Result<Self> {
        match rule {
            DenyRule::Module(name) => Ok(CompiledDenyRule::Module {
                name: name.clone(),
                regex: module_regex(name)?,
            }),
            DenyRule::CallPrefix(prefix) => Ok(CompiledDenyRule::CallPrefix(prefix.clone())),
            DenyRule::OpenFile => Ok(CompiledDenyRule::OpenFile),
        }
    }

    fn check(&self, code: &str) -> Option<Violation> {
        match self {
            CompiledDenyRule::Module { name, regex } => regex.is_match(code).then(|| Violation {
                kind: ViolationKind::BannedImport,
                reason: format!("banned import: {}", name),
            }),
            CompiledDenyRule::CallPrefix(prefix) => code.contains(prefix.as_str()).then(|| Violation {
                kind: ViolationKind::BannedApi,
                reason: format!("banned api: {}", prefix),
            }),
            CompiledDenyRule::OpenFile => {
                let calls: Vec<OpenCall> = OPEN_CALL_RE
                    .find_iter(code)
                    .map(|m| OpenCall::parse(&call_arguments(code, m.end())))
                    .collect();

                if calls.iter().any(OpenCall::absolute_path) {
                    Some(Violation {
                        kind: ViolationKind::OpenAbsolutePath,
                        reason: "banned open on absolute path".to_string(),
                    })
                } else if calls.iter().any(OpenCall::write_mode) {
                    Some(Violation {
                        kind: ViolationKind::OpenWriteMode,
                        reason: "banned open in write mode".to_string(),
                    })
                } else {
                    None
                }
            }
        }
    }
}

/// `file` and `mode` arguments of one `open(...)` call, positional or keyword
struct OpenCall<'a> {
    file: Option<&'a str>,
    mode: Option<&'a str>,
}

impl<'a> OpenCall<'a> {
    fn parse(args: &[&'a str]) -> Self {
        let mut positional = Vec::new();
        let mut file = None;
        let mut mode = None;

        for &arg in args {
            match KEYWORD_ARG_RE.captures(arg) {
                Some(caps) => {
                    let value = caps.get(2).map(|v| v.as_str().trim());
                    match caps.get(1).map(|n| n.as_str()) {
                        Some("file") => file = value,
                        Some("mode") => mode = value,
                        _ => {}
                    }
                }
                None => positional.push(arg),
            }
        }

        OpenCall {
            file: file.or_else(|| positional.first().copied()),
            mode: mode.or_else(|| positional.get(1).copied()),
        }
    }

    fn absolute_path(&self) -> bool {
        self.file.map_or(false, |f| ABSOLUTE_LITERAL_RE.is_match(f))
    }

    fn write_mode(&self) -> bool {
        self.mode.map_or(false, |m| WRITE_MODE_LITERAL_RE.is_match(m))
    }
}

/// Top-level arguments of the call whose `(` ends at `start`. Brackets nest to any
/// depth; string literals and comments are skipped. An unclosed call yields what was seen.
fn call_arguments(code: &str, start: usize) -> Vec<&str> {
    let bytes = code.as_bytes();
    let mut args = Vec::new();
    let mut depth = 0usize;
    let mut arg_start = start;
    let mut i = start;

    while i < bytes.len() {
        match bytes[i] {
            b'\'' | b'"' => {
                i = skip_string(bytes, i);
                continue;
            }
            b'#' => {
                while i < bytes.len() && bytes[i] != b'\n' {
                    i += 1;
                }
                continue;
            }
            b'(' | b'[' | b'{' => depth += 1,
            b')' | b']' | b'}' => {
                if depth == 0 {
                    push_argument(&mut args, &code[arg_start..i]);
                    return args;
                }
                depth -= 1;
            }
            b',' if depth == 0 => {
                push_argument(&mut args, &code[arg_start..i]);
                arg_start = i + 1;
            }
            _ => {}
        }
        i += 1;
    }

    push_argument(&mut args, &code[arg_start..]);
    args
}

fn push_argument<'a>(args: &mut Vec<&'a str>, raw: &'a str) {
    let arg = raw.trim();
    if !arg.is_empty() {
        args.push(arg);
    }
}

/// Index just past the string literal opening at `start` (single, double, or triple quoted)
fn skip_string(bytes: &[u8], start: usize) -> usize {
    let quote = bytes[start];
    let triple = bytes.get(start + 1) == Some(&quote) && bytes.get(start + 2) == Some(&quote);
    let mut i = start + if triple { 3 } else { 1 };

    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b if b == quote => {
                if !triple {
                    return i + 1;
                }
                if bytes.get(i + 1) == Some(&quote) && bytes.get(i + 2) == Some(&quote) {
                    return i + 3;
                }
                i += 1;
            }
            b'\n' if !triple => return i + 1,
            _ => i += 1,
        }
    }
    bytes.len()
}

/// Matches `import NAME`, `import a, NAME`, or `from NAME import` at the start of a
/// statement (line start or after `;`).
fn module_regex(name: &str) -> Result<Regex> {
    let name = regex::escape(name);
    let pattern = format!(
        r"(?m)(?:^|;)[ \t]*(?:from[ \t]+{name}\b|import[ \t]+(?:[\w.]+(?:[ \t]+as[ \t]+\w+)?[ \t]*,[ \t]*)*{name}\b)"
    );
    Regex::new(&pattern)
        .map_err(|e| VerifyError::Config(format!("invalid banned import '{}': {}", name, e)))
}

/// Denylist scanner with all patterns compiled up front.
/// Only the solution is scanned; test code may legitimately import pytest helpers.
#[derive(Clone, Debug)]
pub struct SafetyScanner {
    max_code_chars: usize,
    import_rules: Vec<CompiledDenyRule>,
    api_rules: Vec<CompiledDenyRule>,
}

impl SafetyScanner {
    pub fn new(denylist: &Denylist) -> Result<Self> {
        let compile_stage = |stage| {
            denylist
                .rules_in_stage(stage)
                .map(CompiledDenyRule::compile)
                .collect::<Result<Vec<_>>>()
        };

        Ok(Self {
            max_code_chars: denylist.max_code_chars,
            import_rules: compile_stage(RuleStage::Import)?,
            api_rules: compile_stage(RuleStage::Api)?,
        })
    }

    /// First violation in check order (size, imports, APIs), or `None` when clean
    pub fn scan(&self, code: &str) -> Option<Violation> {
        let len = code.chars().count();
        if len > self.max_code_chars {
            return Some(Violation {
                kind: ViolationKind::CodeTooLarge,
                reason: format!("code too large ({} chars)", len),
            });
        }

        self.import_rules
            .iter()
            .chain(self.api_rules.iter())
            .find_map(|rule| rule.check(code))
    }
}
