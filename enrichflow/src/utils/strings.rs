//! String helpers for prompts, model output and configuration paths.

use std::path::{Path, PathBuf};

const JSON_FENCE: &str = "```json";
const CODE_FENCE: &str = "```";

/// Trims the whole prompt and every line in it.
///
/// TOML multi-line strings keep their source indentation; models do not
/// need it.
#[must_use]
pub fn fix_prompt(value: &str) -> String {
    value
        .trim()
        .lines()
        .map(str::trim)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Strips markdown code fences a model wraps around JSON output.
#[must_use]
pub fn fix_output(value: &str) -> String {
    value.replace(JSON_FENCE, "").replace(CODE_FENCE, "")
}

/// Returns the environment-specific sibling of `path`, if it exists.
///
/// `config/env.toml` with `env = "prod"` maps to `config/env.prod.toml`.
/// Paths without exactly one extension have no sibling.
#[must_use]
pub fn env_file_name(path: &Path, env: &str) -> Option<PathBuf> {
    let candidate = env_file_candidate(path, env)?;
    candidate.is_file().then_some(candidate)
}

fn env_file_candidate(path: &Path, env: &str) -> Option<PathBuf> {
    let file_name = path.file_name()?.to_str()?;
    let (stem, ext) = file_name.split_once('.')?;
    if stem.is_empty() || ext.is_empty() || ext.contains('.') {
        return None;
    }
    Some(path.with_file_name(format!("{stem}.{env}.{ext}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_fix_prompt() {
        let prompt = "\n    Detect the category.\n      Use ${category_model}.   \n";
        assert_eq!(fix_prompt(prompt), "Detect the category.\nUse ${category_model}.");
    }

    #[test]
    fn test_fix_output() {
        let output = "```json\n{\"name\": \"shirt\"}\n```";
        assert_eq!(fix_output(output), "\n{\"name\": \"shirt\"}\n");
        assert_eq!(fix_output("plain"), "plain");
    }

    #[test]
    fn test_env_file_candidate() {
        assert_eq!(
            env_file_candidate(Path::new("config/env.toml"), "prod"),
            Some(PathBuf::from("config/env.prod.toml"))
        );
        assert_eq!(env_file_candidate(Path::new("env"), "prod"), None);
        assert_eq!(env_file_candidate(Path::new("env.local.toml"), "prod"), None);
    }

    #[test]
    fn test_env_file_name_requires_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("env.toml");
        std::fs::write(&base, "").unwrap();

        assert_eq!(env_file_name(&base, "staging"), None);

        let staging = dir.path().join("env.staging.toml");
        std::fs::write(&staging, "").unwrap();
        assert_eq!(env_file_name(&base, "staging"), Some(staging));
    }
}
