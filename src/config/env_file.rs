use crate::utils::error::Result;
use regex::Regex;
use std::path::Path;

/// Loads a dotenv-style file into the process environment. Variables that
/// are already set in the real environment are never overridden.
///
/// Returns the number of variables applied.
pub fn load_env_file<P: AsRef<Path>>(path: P) -> Result<usize> {
    let content = std::fs::read_to_string(&path)?;
    let mut applied = 0;

    for (key, value) in parse_env_content(&content) {
        if std::env::var(&key).is_err() {
            std::env::set_var(&key, value);
            applied += 1;
        }
    }

    Ok(applied)
}

/// Like [`load_env_file`], but a missing file is not an error.
pub fn load_env_file_if_present<P: AsRef<Path>>(path: P) -> Result<usize> {
    if path.as_ref().exists() {
        load_env_file(path)
    } else {
        Ok(0)
    }
}

/// Parses `KEY=VALUE` lines. Blank lines and `#` comments are skipped, an
/// optional leading `export ` is accepted, matching surrounding quotes are
/// stripped, and `${VAR}` references are substituted from the process
/// environment (unknown references are left verbatim).
pub fn parse_env_content(content: &str) -> Vec<(String, String)> {
    let mut entries = Vec::new();

    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let line = line.strip_prefix("export ").unwrap_or(line);
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };

        let key = key.trim();
        if key.is_empty() {
            continue;
        }

        let value = strip_matching_quotes(value.trim());
        entries.push((key.to_string(), substitute_env_vars(value)));
    }

    entries
}

fn strip_matching_quotes(value: &str) -> &str {
    for quote in ['"', '\''] {
        if value.len() >= 2 && value.starts_with(quote) && value.ends_with(quote) {
            return &value[1..value.len() - 1];
        }
    }
    value
}

fn substitute_env_vars(value: &str) -> String {
    let re = Regex::new(r"\$\{([^}]+)\}").unwrap();
    re.replace_all(value, |caps: &regex::Captures| {
        let var_name = &caps[1];
        std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
    })
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_skips_comments_and_blanks() {
        let content = "\n# comment\nLOG_LEVEL=DEBUG\n\nENV_STATE=dev\n";
        let entries = parse_env_content(content);
        assert_eq!(
            entries,
            vec![
                ("LOG_LEVEL".to_string(), "DEBUG".to_string()),
                ("ENV_STATE".to_string(), "dev".to_string()),
            ]
        );
    }

    #[test]
    fn test_parse_strips_matching_quotes() {
        let entries = parse_env_content("A=\"quoted\"\nB='single'\nC=\"unbalanced\n");
        assert_eq!(entries[0].1, "quoted");
        assert_eq!(entries[1].1, "single");
        assert_eq!(entries[2].1, "\"unbalanced");
    }

    #[test]
    fn test_parse_accepts_export_prefix() {
        let entries = parse_env_content("export TOKEN=abc123\n");
        assert_eq!(entries, vec![("TOKEN".to_string(), "abc123".to_string())]);
    }

    #[test]
    fn test_unknown_reference_left_verbatim() {
        let entries = parse_env_content("ENDPOINT=${SVC_BOOTSTRAP_NO_SUCH_VAR}/v1\n");
        assert_eq!(entries[0].1, "${SVC_BOOTSTRAP_NO_SUCH_VAR}/v1");
    }

    #[test]
    fn test_reference_substituted_from_process_env() {
        std::env::set_var("SVC_BOOTSTRAP_TEST_HOST", "collector.internal");
        let entries = parse_env_content("ENDPOINT=https://${SVC_BOOTSTRAP_TEST_HOST}/v1\n");
        assert_eq!(entries[0].1, "https://collector.internal/v1");
        std::env::remove_var("SVC_BOOTSTRAP_TEST_HOST");
    }

    #[test]
    fn test_lines_without_equals_are_ignored() {
        let entries = parse_env_content("not a pair\nKEY=value\n");
        assert_eq!(entries.len(), 1);
    }
}
