/// Ordered rule table for locating the start of a test section
use crate::config::types::{Result, VerifyError};
use regex::Regex;

/// One line-level test-boundary pattern. Lower priority values are tried first.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SplitRule {
    pub name: &'static str,
    pub pattern: &'static str,
    pub priority: u8,
}

/// Built-in boundary rules in priority order
pub const DEFAULT_SPLIT_RULES: &[SplitRule] = &[
    SplitRule {
        name: "test_comment",
        pattern: r"(?im)^[ \t]*#[ \t]*tests?\b",
        priority: 1,
    },
    SplitRule {
        name: "unit_test_comment",
        pattern: r"(?im)^[ \t]*#[ \t]*unit[- \t]?tests?\b",
        priority: 2,
    },
    SplitRule {
        name: "import_pytest",
        pattern: r"(?im)^[ \t]*import[ \t]+pytest\b",
        priority: 3,
    },
    SplitRule {
        name: "from_pytest",
        pattern: r"(?im)^[ \t]*from[ \t]+pytest[ \t]+import\b",
        priority: 4,
    },
    SplitRule {
        name: "test_class",
        pattern: r"(?im)^[ \t]*class[ \t]+Test\w*[ \t]*[(:]",
        priority: 5,
    },
    SplitRule {
        name: "test_function",
        pattern: r"(?im)^[ \t]*def[ \t]+test_",
        priority: 6,
    },
    SplitRule {
        name: "main_guard",
        pattern: r#"(?im)^[ \t]*if[ \t]+__name__[ \t]*==[ \t]*["']__main__["'][ \t]*:"#,
        priority: 7,
    },
];

/// A rule with its pattern compiled
#[derive(Clone, Debug)]
pub struct CompiledRule {
    pub name: &'static str,
    pub priority: u8,
    regex: Regex,
}

impl CompiledRule {
    pub fn compile(rule: &SplitRule) -> Result<Self> {
        let regex = Regex::new(rule.pattern).map_err(|e| {
            VerifyError::Config(format!("invalid split rule '{}': {}", rule.name, e))
        })?;
        Ok(Self {
            name: rule.name,
            priority: rule.priority,
            regex,
        })
    }

    /// Byte offset of the first match anywhere in `text`
    pub fn find(&self, text: &str) -> Option<usize> {
        self.regex.find(text).map(|m| m.start())
    }
}

/// Compile a rule table, ordered by priority (stable for equal priorities)
pub fn compile_rules(rules: &[SplitRule]) -> Result<Vec<CompiledRule>> {
    let mut compiled = rules
        .iter()
        .map(CompiledRule::compile)
        .collect::<Result<Vec<_>>>()?;
    compiled.sort_by_key(|rule| rule.priority);
    Ok(compiled)
}
