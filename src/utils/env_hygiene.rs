/// Environment hygiene for the test-runner child
///
/// The child inherits the parent environment minus proxy configuration, so a
/// candidate cannot pick up an egress route even if it slipped past screening.
use std::collections::BTreeMap;
use std::env;

/// Canonical proxy variable names (compared lowercase)
const PROXY_VARS: &[&str] = &["http_proxy", "https_proxy", "ftp_proxy", "all_proxy", "no_proxy"];

/// Environment sanitization policy
#[derive(Debug, Clone)]
pub struct EnvPolicy {
    /// Remove `*_proxy` variables, any case
    pub strip_proxy_vars: bool,
    /// Keep the interpreter from writing bytecode caches into the workspace
    pub disable_bytecode: bool,
    /// Extra variables forced into the child environment
    pub overrides: Vec<(String, String)>,
}

impl Default for EnvPolicy {
    fn default() -> Self {
        EnvPolicy {
            strip_proxy_vars: true,
            disable_bytecode: true,
            overrides: Vec::new(),
        }
    }
}

/// True for names ending in `_proxy` or equal to a canonical proxy name, any case
pub fn is_proxy_var(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    lower.ends_with("_proxy") || PROXY_VARS.contains(&lower.as_str())
}

/// Environment hygiene manager
#[derive(Debug, Clone, Default)]
pub struct EnvHygiene {
    policy: EnvPolicy,
}

impl EnvHygiene {
    pub fn new(policy: EnvPolicy) -> Self {
        EnvHygiene { policy }
    }

    /// Sanitized copy of the current process environment
    pub fn child_environment(&self) -> BTreeMap<String, String> {
        self.sanitize(env::vars_os().filter_map(|(k, v)| {
            Some((k.into_string().ok()?, v.into_string().ok()?))
        }))
    }

    /// Sanitize an arbitrary environment; sorted for deterministic spawning
    pub fn sanitize<I>(&self, vars: I) -> BTreeMap<String, String>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut env_map = BTreeMap::new();

        for (key, value) in vars {
            if self.policy.strip_proxy_vars && is_proxy_var(&key) {
                log::debug!("Removed proxy environment variable: {}", key);
                continue;
            }
            env_map.insert(key, value);
        }

        if self.policy.disable_bytecode {
            env_map.insert("PYTHONDONTWRITEBYTECODE".to_string(), "1".to_string());
        }

        for (key, value) in &self.policy.overrides {
            env_map.insert(key.clone(), value.clone());
        }

        env_map
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_env_policy_default() {
        let policy = EnvPolicy::default();
        assert!(policy.strip_proxy_vars);
        assert!(policy.disable_bytecode);
        assert!(policy.overrides.is_empty());
    }

    #[test]
    fn test_proxy_names() {
        assert!(is_proxy_var("HTTP_PROXY"));
        assert!(is_proxy_var("https_proxy"));
        assert!(is_proxy_var("No_Proxy"));
        assert!(is_proxy_var("SOCKS_PROXY"));
        assert!(!is_proxy_var("PROXY"));
        assert!(!is_proxy_var("PATH"));
        assert!(!is_proxy_var("MY_PROXY_HOST"));
    }

    #[test]
    fn test_sanitize_strips_proxies_and_keeps_rest() {
        let hygiene = EnvHygiene::default();
        let env_map = hygiene.sanitize(vars(&[
            ("PATH", "/usr/bin"),
            ("HTTP_PROXY", "http://proxy:3128"),
            ("https_proxy", "http://proxy:3128"),
            ("HOME", "/home/ci"),
        ]));

        assert_eq!(env_map.get("PATH"), Some(&"/usr/bin".to_string()));
        assert_eq!(env_map.get("HOME"), Some(&"/home/ci".to_string()));
        assert!(!env_map.contains_key("HTTP_PROXY"));
        assert!(!env_map.contains_key("https_proxy"));
        assert_eq!(env_map.get("PYTHONDONTWRITEBYTECODE"), Some(&"1".to_string()));
    }

    #[test]
    fn test_overrides_win() {
        let hygiene = EnvHygiene::new(EnvPolicy {
            overrides: vec![("PATH".to_string(), "/opt/py/bin".to_string())],
            ..EnvPolicy::default()
        });
        let env_map = hygiene.sanitize(vars(&[("PATH", "/usr/bin")]));
        assert_eq!(env_map.get("PATH"), Some(&"/opt/py/bin".to_string()));
    }

    #[test]
    fn test_permissive_policy_keeps_proxies() {
        let hygiene = EnvHygiene::new(EnvPolicy {
            strip_proxy_vars: false,
            disable_bytecode: false,
            overrides: Vec::new(),
        });
        let env_map = hygiene.sanitize(vars(&[("HTTP_PROXY", "x")]));
        assert!(env_map.contains_key("HTTP_PROXY"));
        assert!(!env_map.contains_key("PYTHONDONTWRITEBYTECODE"));
    }

    #[test]
    fn test_proxy_names_any_case_stripped() {
        let env_map = EnvHygiene::default().sanitize(vars(&[
            ("HTTPS_PROXY", "http://proxy:3128"),
            ("socks_proxy", "socks5://proxy:1080"),
            ("Ftp_Proxy", "x"),
            ("NO_PROXY", "localhost"),
            ("PROXY_HOST", "kept"),
            ("LANG", "C.UTF-8"),
        ]));

        let keys: Vec<&str> = env_map.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["LANG", "PROXY_HOST", "PYTHONDONTWRITEBYTECODE"]);
    }

    #[test]
    fn test_child_environment_has_no_proxies() {
        let env_map = EnvHygiene::default().child_environment();
        assert!(env_map.keys().all(|k| !is_proxy_var(k)));
        assert_eq!(env_map.get("PYTHONDONTWRITEBYTECODE"), Some(&"1".to_string()));
    }
}
