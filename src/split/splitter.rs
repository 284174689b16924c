/// Separation of solution code from test code in one candidate text
use crate::config::types::Result;
use crate::split::rules::{compile_rules, CompiledRule, SplitRule, DEFAULT_SPLIT_RULES};

/// Module name the solution is written under inside a workspace
pub const SOLUTION_MODULE: &str = "solution";

/// Synthetic test used when a candidate carries no tests. It requires the solution
/// to import cleanly and to define at least one public top-level name.
pub const SMOKE_TEST: &str = r#"import solution


def test_solution_loads():
    public = [name for name in vars(solution) if not name.startswith("_")]
    assert public, "solution defines no public top-level names"
"#;

/// Result of splitting one candidate
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SplitOutcome {
    pub code: String,
    pub tests: String,
    /// Name of the boundary rule that matched; `None` means the smoke test was synthesized
    pub rule: Option<&'static str>,
}

impl SplitOutcome {
    pub fn is_synthetic(&self) -> bool {
        self.rule.is_none()
    }
}

/// Splits candidates on the first matching boundary rule
#[derive(Clone, Debug)]
pub struct CodeTestSplitter {
    rules: Vec<CompiledRule>,
}

impl CodeTestSplitter {
    pub fn new(rules: &[SplitRule]) -> Result<Self> {
        Ok(Self {
            rules: compile_rules(rules)?,
        })
    }

    pub fn with_default_rules() -> Result<Self> {
        Self::new(DEFAULT_SPLIT_RULES)
    }

    /// Rules are tried in priority order and the first rule matching anywhere wins,
    /// even if a lower-priority rule matches earlier in the text.
    pub fn split(&self, text: &str) -> SplitOutcome {
        for rule in &self.rules {
            if let Some(idx) = rule.find(text) {
                return SplitOutcome {
                    code: text[..idx].trim().to_string(),
                    tests: text[idx..].trim().to_string(),
                    rule: Some(rule.name),
                };
            }
        }

        SplitOutcome {
            code: text.trim().to_string(),
            tests: SMOKE_TEST.to_string(),
            rule: None,
        }
    }
}
