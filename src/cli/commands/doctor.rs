//! Doctor command - verify credentials and configuration.

use crate::cli::Output;
use crate::config::{Settings, VectorStoreProvider};
use console::style;
use std::path::Path;

/// Check result for a single item.
#[derive(Debug)]
pub struct CheckResult {
    pub name: String,
    pub status: CheckStatus,
    pub message: String,
    pub hint: Option<String>,
}

#[derive(Debug, PartialEq)]
pub enum CheckStatus {
    Ok,
    Warning,
    Error,
}

impl CheckResult {
    fn ok(name: &str, message: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Ok,
            message: message.to_string(),
            hint: None,
        }
    }

    fn warning(name: &str, message: &str, hint: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Warning,
            message: message.to_string(),
            hint: Some(hint.to_string()),
        }
    }

    fn error(name: &str, message: &str, hint: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Error,
            message: message.to_string(),
            hint: Some(hint.to_string()),
        }
    }

    fn print(&self) {
        let icon = match self.status {
            CheckStatus::Ok => style("✓").green(),
            CheckStatus::Warning => style("!").yellow(),
            CheckStatus::Error => style("✗").red(),
        };

        println!("  {} {} - {}", icon, style(&self.name).bold(), self.message);

        if let Some(hint) = &self.hint {
            println!("    {} {}", style("→").dim(), style(hint).dim());
        }
    }
}

/// Run all diagnostic checks.
pub fn run_doctor(settings: &Settings) -> anyhow::Result<()> {
    Output::header("Playlist Indexer Doctor");
    println!();

    let mut checks = Vec::new();

    let sections: [(&str, Vec<CheckResult>); 3] = [
        ("API Configuration", check_credentials(settings)),
        ("Directories", check_directories(settings)),
        ("Configuration", check_configuration(settings)),
    ];
    for (title, results) in sections {
        println!("{}", style(title).bold());
        for check in &results {
            check.print();
        }
        println!();
        checks.extend(results);
    }

    let errors = checks.iter().filter(|c| c.status == CheckStatus::Error).count();
    let warnings = checks.iter().filter(|c| c.status == CheckStatus::Warning).count();

    if errors > 0 {
        Output::error(&format!(
            "{} error(s) found. Fix them before running an upsert.",
            errors
        ));
        anyhow::bail!("doctor found {} error(s)", errors);
    } else if warnings > 0 {
        Output::warning(&format!("All checks passed with {} warning(s).", warnings));
    } else {
        Output::success("All checks passed! Ready to index.");
    }

    Ok(())
}

fn check_credentials(settings: &Settings) -> Vec<CheckResult> {
    let mut results = vec![check_secret(
        "OPENAI_API_KEY",
        std::env::var("OPENAI_API_KEY").ok(),
        Some("sk-"),
    )];

    if settings.vector_store.provider == VectorStoreProvider::Pinecone {
        results.push(check_secret(
            "PINECONE_API_KEY",
            std::env::var("PINECONE_API_KEY").ok(),
            None,
        ));
        results.push(match settings.vector_store.index_host.as_deref() {
            Some(host) if !host.trim().is_empty() => CheckResult::ok("Index host", host),
            _ => CheckResult::error(
                "Index host",
                "not set",
                "Set with: export PINECONE_INDEX_HOST='my-index-xxxx.svc.pinecone.io'",
            ),
        });
    } else {
        results.push(CheckResult::warning(
            "Vector store",
            "memory (vectors are discarded on exit)",
            "Set vector_store.provider = \"pinecone\" to persist vectors",
        ));
    }

    results
}

/// Check a secret from the environment without printing it.
fn check_secret(name: &str, value: Option<String>, expected_prefix: Option<&str>) -> CheckResult {
    let hint = format!("Set with: export {}='...'", name);
    match value {
        None => CheckResult::error(name, "not set", &hint),
        Some(key) if key.trim().is_empty() => CheckResult::error(name, "empty", &hint),
        Some(key) => {
            if let Some(prefix) = expected_prefix {
                if !key.starts_with(prefix) {
                    return CheckResult::warning(
                        name,
                        "set but format looks unusual",
                        &format!("Expected format: {}...", prefix),
                    );
                }
            }
            CheckResult::ok(name, &format!("configured ({})", mask(&key)))
        }
    }
}

fn mask(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() <= 12 {
        return "****".to_string();
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}...{}", head, tail)
}

fn check_directories(settings: &Settings) -> Vec<CheckResult> {
    vec![
        check_dir(
            "Input directory",
            &settings.input_dir(),
            "Playlist files are read from here",
        ),
        check_dir(
            "Checkpoint directory",
            &settings.checkpoint_dir(),
            "Will be created on first upsert",
        ),
    ]
}

fn check_dir(name: &str, dir: &Path, hint: &str) -> CheckResult {
    if dir.is_dir() {
        CheckResult::ok(name, &dir.display().to_string())
    } else {
        CheckResult::warning(name, &format!("{} (missing)", dir.display()), hint)
    }
}

fn check_configuration(settings: &Settings) -> Vec<CheckResult> {
    let config_path = Settings::default_config_path();
    let file = if config_path.exists() {
        CheckResult::ok("Config file", &config_path.display().to_string())
    } else {
        CheckResult::warning(
            "Config file",
            "using defaults",
            "Create with: playlist-indexer config init",
        )
    };

    let values = match settings.validate() {
        Ok(()) => CheckResult::ok(
            "Settings",
            &format!(
                "model {}, chunks of {} chars, concurrency {}",
                settings.embedding.model,
                settings.chunking.max_chunk_length,
                settings.pipeline.concurrency
            ),
        ),
        Err(e) => CheckResult::error("Settings", &e.to_string(), "Fix the value in the config file"),
    };

    vec![file, values]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_result_error() {
        let result = CheckResult::error("test", "failed", "fix it");
        assert_eq!(result.status, CheckStatus::Error);
        assert_eq!(result.hint, Some("fix it".to_string()));
    }

    #[test]
    fn test_check_secret() {
        assert_eq!(check_secret("K", None, None).status, CheckStatus::Error);
        assert_eq!(
            check_secret("K", Some("  ".to_string()), None).status,
            CheckStatus::Error
        );
        assert_eq!(
            check_secret("K", Some("abc-1234567890".to_string()), Some("sk-")).status,
            CheckStatus::Warning
        );
        let ok = check_secret("K", Some("sk-abcdefghijklmnop".to_string()), Some("sk-"));
        assert_eq!(ok.status, CheckStatus::Ok);
        assert!(!ok.message.contains("abcdefgh"));
    }

    #[test]
    fn test_mask_short_keys_fully() {
        assert_eq!(mask("short"), "****");
        assert_eq!(mask("sk-1234567890abcd"), "sk-1...abcd");
    }

    #[test]
    fn test_invalid_settings_reported() {
        let mut settings = Settings::default();
        settings.chunking.max_chunk_length = 0;
        let results = check_configuration(&settings);
        assert_eq!(results[1].status, CheckStatus::Error);
    }
}
