/// Denylist data for static screening of solution code
///
/// Rules are plain data so they can be replaced from configuration and tested
/// apart from the scanner. Order within each stage is the reporting order.
use crate::config::types::{VerifyConfig, DEFAULT_MAX_CODE_CHARS};

/// Modules whose import is refused: networking, process control, filesystem
/// mutation, threading/async, and dynamic import machinery
pub static BANNED_IMPORTS: &[&str] = &[
    "socket",
    "requests",
    "urllib",
    "http",
    "ftplib",
    "subprocess",
    "multiprocessing",
    "threading",
    "asyncio",
    "os",
    "shutil",
    "pathlib",
    "paramiko",
    "psutil",
    "importlib",
];

/// Literal call prefixes refused anywhere in the source
pub static BANNED_APIS: &[&str] = &[
    "os.system(",
    "os.remove(",
    "os.rmdir(",
    "shutil.rmtree(",
    "subprocess.run(",
    "subprocess.Popen(",
    "eval(",
    "exec(",
    "__import__(",
];

/// One denylist entry
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DenyRule {
    /// `import NAME` / `from NAME import ...` at statement start
    Module(String),
    /// Substring match on a call prefix such as `eval(`
    CallPrefix(String),
    /// `open(...)` on an absolute path, or in a write-capable mode on any path
    OpenFile,
}

/// Scan stage a rule belongs to. Stages run in declaration order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum RuleStage {
    Import,
    Api,
}

impl DenyRule {
    pub fn stage(&self) -> RuleStage {
        match self {
            DenyRule::Module(_) => RuleStage::Import,
            DenyRule::CallPrefix(_) | DenyRule::OpenFile => RuleStage::Api,
        }
    }
}

/// Immutable screening policy, built once per run
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Denylist {
    pub max_code_chars: usize,
    pub rules: Vec<DenyRule>,
}

impl Default for Denylist {
    fn default() -> Self {
        Self::build(DEFAULT_MAX_CODE_CHARS, BANNED_IMPORTS, BANNED_APIS)
    }
}

impl Denylist {
    /// Modules first, then call prefixes, then the compound open rule
    pub fn build<M, A>(max_code_chars: usize, modules: &[M], apis: &[A]) -> Self
    where
        M: AsRef<str>,
        A: AsRef<str>,
    {
        let mut rules: Vec<DenyRule> = modules
            .iter()
            .map(|m| DenyRule::Module(m.as_ref().to_string()))
            .collect();
        rules.extend(apis.iter().map(|a| DenyRule::CallPrefix(a.as_ref().to_string())));
        rules.push(DenyRule::OpenFile);

        Self {
            max_code_chars,
            rules,
        }
    }

    /// Built-in lists, replaced per list by the config when it provides one.
    /// The open rule stays active either way.
    pub fn from_config(config: &VerifyConfig) -> Self {
        let defaults = |list: &[&str]| list.iter().map(|s| s.to_string()).collect::<Vec<_>>();
        let modules = config
            .banned_imports
            .clone()
            .unwrap_or_else(|| defaults(BANNED_IMPORTS));
        let apis = config
            .banned_apis
            .clone()
            .unwrap_or_else(|| defaults(BANNED_APIS));

        Self::build(config.max_code_chars, &modules, &apis)
    }

    pub fn rules_in_stage(&self, stage: RuleStage) -> impl Iterator<Item = &DenyRule> {
        self.rules.iter().filter(move |rule| rule.stage() == stage)
    }
}
