// Startup validation: reject configurations that cannot produce a meaningful run
// before any record is read.

use crate::config::types::{Result, VerifyConfig, VerifyError};

/// Validation result with detailed errors
#[derive(Debug, Default)]
pub struct ValidationResult {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationResult {
    pub fn add_error(&mut self, error: String) {
        self.errors.push(error);
    }

    pub fn add_warning(&mut self, warning: String) {
        self.warnings.push(warning);
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Validate config at startup. Errors are fatal, warnings are logged.
pub fn validate_config(config: &VerifyConfig) -> Result<ValidationResult> {
    let mut result = ValidationResult::default();

    validate_limits(config, &mut result);
    validate_runner(config, &mut result);
    validate_denylist(config, &mut result);

    for warning in &result.warnings {
        log::warn!("config: {}", warning);
    }

    if !result.is_valid() {
        return Err(VerifyError::Config(format!(
            "Config validation failed:\n{}",
            result.errors.join("\n")
        )));
    }

    Ok(result)
}

fn validate_limits(config: &VerifyConfig, result: &mut ValidationResult) {
    if config.timeout_secs == 0 {
        result.add_error("timeout_secs cannot be zero".to_string());
    }
    if config.timeout_secs > 3600 {
        result.add_warning(format!(
            "timeout_secs {} is very high; a hanging candidate will stall its worker",
            config.timeout_secs
        ));
    }
    if config.workers == 0 {
        result.add_error("workers cannot be zero".to_string());
    }
    if config.progress_every == 0 {
        result.add_error("progress_every cannot be zero".to_string());
    }
    if config.max_code_chars == 0 {
        result.add_error("max_code_chars cannot be zero".to_string());
    }
    if config.output_capture_bytes < config.rejected_log_chars {
        result.add_warning(format!(
            "output_capture_bytes {} is smaller than rejected_log_chars {}",
            config.output_capture_bytes, config.rejected_log_chars
        ));
    }
}

fn validate_runner(config: &VerifyConfig, result: &mut ValidationResult) {
    if config.python.trim().is_empty() {
        result.add_error("python interpreter cannot be empty".to_string());
    }
    if config.runner.trim().is_empty() {
        result.add_error("runner cannot be empty".to_string());
    }
    if let Some(root) = &config.workspace_root {
        if !root.is_dir() {
            result.add_error(format!(
                "workspace_root {} is not an existing directory",
                root.display()
            ));
        }
    }
}

fn validate_denylist(config: &VerifyConfig, result: &mut ValidationResult) {
    if let Some(imports) = &config.banned_imports {
        if imports.is_empty() {
            result.add_warning("banned_imports is empty; import screening disabled".to_string());
        }
        for name in imports {
            if name.trim().is_empty() {
                result.add_error("banned_imports contains an empty module name".to_string());
            }
        }
    }
    if let Some(apis) = &config.banned_apis {
        for api in apis {
            if api.is_empty() {
                result.add_error("banned_apis contains an empty call prefix".to_string());
            }
        }
    }
}
