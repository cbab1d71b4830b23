use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

/// Command-line defaults that can be persisted between runs.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ConfigFlags {
    pub watch: bool,
    pub no_style: bool,
    pub output: Option<PathBuf>,
    pub config: Option<PathBuf>,
}

impl ConfigFlags {
    /// Merge `other` on top of `self`: booleans are OR-ed, options from
    /// `other` win when present.
    pub fn union(&self, other: &Self) -> Self {
        Self {
            watch: self.watch || other.watch,
            no_style: self.no_style || other.no_style,
            output: other.output.clone().or_else(|| self.output.clone()),
            config: other.config.clone().or_else(|| self.config.clone()),
        }
    }
}

pub fn global_config_path() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        if let Some(appdata) = std::env::var_os("APPDATA") {
            return PathBuf::from(appdata).join("jotpad").join("config");
        }
    }

    #[cfg(target_os = "macos")]
    {
        if let Some(home) = std::env::var_os("HOME") {
            return PathBuf::from(home)
                .join("Library")
                .join("Application Support")
                .join("jotpad")
                .join("config");
        }
    }

    #[cfg(not(any(target_os = "windows", target_os = "macos")))]
    {
        if let Some(xdg) = std::env::var_os("XDG_CONFIG_HOME") {
            return PathBuf::from(xdg).join("jotpad").join("config");
        }
        if let Some(home) = std::env::var_os("HOME") {
            return PathBuf::from(home).join(".config").join("jotpad").join("config");
        }
    }

    local_override_path()
}

pub fn local_override_path() -> PathBuf {
    PathBuf::from(".jotpadrc")
}

pub fn load_config_flags(path: &Path) -> Result<ConfigFlags> {
    if !path.exists() {
        return Ok(ConfigFlags::default());
    }
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config {}", path.display()))?;
    let tokens = content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .flat_map(line_tokens)
        .collect::<Vec<_>>();
    Ok(parse_flag_tokens(&tokens))
}

/// Split one defaults-file line into tokens. A path option takes the rest of
/// the line as its value, so saved paths may contain spaces.
fn line_tokens(line: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut rest = line;
    while !rest.is_empty() {
        let (token, tail) = rest
            .split_once(char::is_whitespace)
            .unwrap_or((rest, ""));
        if PATH_OPTIONS.contains(&token) {
            tokens.push(token.to_string());
            if !tail.trim().is_empty() {
                tokens.push(tail.trim().to_string());
            }
            break;
        }
        if PATH_OPTIONS
            .iter()
            .any(|option| token.starts_with(option) && token[option.len()..].starts_with('='))
        {
            tokens.push(rest.to_string());
            break;
        }
        tokens.push(token.to_string());
        rest = tail.trim_start();
    }
    tokens
}

pub fn save_config_flags(path: &Path, flags: &ConfigFlags) -> Result<()> {
    let mut lines = vec!["# jotpad defaults (saved with --save)".to_string()];
    if flags.watch {
        lines.push("--watch".to_string());
    }
    if flags.no_style {
        lines.push("--no-style".to_string());
    }
    if let Some(output) = &flags.output {
        lines.push(format!("--output={}", output.display()));
    }
    if let Some(config) = &flags.config {
        lines.push(format!("--config={}", config.display()));
    }
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create config dir {}", parent.display()))?;
    }
    fs::write(path, format!("{}\n", lines.join("\n")))
        .with_context(|| format!("Failed to write config {}", path.display()))
}

pub fn clear_config_flags(path: &Path) -> Result<()> {
    if path.exists() {
        fs::remove_file(path).with_context(|| format!("Failed to remove {}", path.display()))?;
    }
    Ok(())
}

const PATH_OPTIONS: &[&str] = &["--output", "--config", "-o"];

/// Pick the persistable flags out of a token list, ignoring anything else.
///
/// Understands the long forms, `--name=value`, and the short `-w` and
/// `-o PATH` / `-o=PATH` / `-oPATH` spellings.
pub fn parse_flag_tokens(tokens: &[String]) -> ConfigFlags {
    let mut flags = ConfigFlags::default();
    let mut i = 0;
    while i < tokens.len() {
        let token = tokens[i].as_str();
        match token {
            "--watch" | "-w" => flags.watch = true,
            "--no-style" => flags.no_style = true,
            "--output" | "--config" | "-o" => {
                if let Some(next) = tokens.get(i + 1) {
                    set_path_option(&mut flags, token, next);
                    i += 1;
                }
            }
            _ => {
                if let Some(value) = token.strip_prefix("--output=") {
                    set_path_option(&mut flags, "--output", value);
                } else if let Some(value) = token.strip_prefix("--config=") {
                    set_path_option(&mut flags, "--config", value);
                } else if let Some(value) = token.strip_prefix("-o").filter(|v| !v.is_empty()) {
                    let value = value.strip_prefix('=').unwrap_or(value);
                    set_path_option(&mut flags, "--output", value);
                }
            }
        }
        i += 1;
    }
    flags
}

fn set_path_option(flags: &mut ConfigFlags, name: &str, value: &str) {
    let path = Some(PathBuf::from(value));
    if name == "--config" {
        flags.config = path;
    } else {
        flags.output = path;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_parse_flag_tokens_extracts_known_flags() {
        let args = vec![
            "jotpad".to_string(),
            "--watch".to_string(),
            "--no-style".to_string(),
            "--output".to_string(),
            "preview.html".to_string(),
            "--config=editor.json".to_string(),
            "draft.html".to_string(),
        ];
        let flags = parse_flag_tokens(&args);
        assert!(flags.watch);
        assert!(flags.no_style);
        assert_eq!(flags.output, Some(PathBuf::from("preview.html")));
        assert_eq!(flags.config, Some(PathBuf::from("editor.json")));
    }

    #[test]
    fn test_parse_flag_tokens_understands_short_forms() {
        let args: Vec<String> = ["jotpad", "-w", "-o", "out.html", "draft.html"]
            .iter()
            .map(ToString::to_string)
            .collect();
        let flags = parse_flag_tokens(&args);
        assert!(flags.watch);
        assert_eq!(flags.output, Some(PathBuf::from("out.html")));

        let attached = parse_flag_tokens(&["-oout.html".to_string()]);
        assert_eq!(attached.output, Some(PathBuf::from("out.html")));
        let with_equals = parse_flag_tokens(&["-o=out.html".to_string()]);
        assert_eq!(with_equals.output, Some(PathBuf::from("out.html")));
    }

    #[test]
    fn test_line_tokens_keep_spaces_in_paths() {
        assert_eq!(line_tokens("--watch --no-style"), vec!["--watch", "--no-style"]);
        assert_eq!(
            line_tokens("--output my previews/out.html"),
            vec!["--output", "my previews/out.html"]
        );
        assert_eq!(
            line_tokens("--watch --config=My Config/editor.json"),
            vec!["--watch", "--config=My Config/editor.json"]
        );
    }

    #[test]
    fn test_trailing_option_without_value_is_ignored() {
        let flags = parse_flag_tokens(&["--output".to_string()]);
        assert_eq!(flags, ConfigFlags::default());
    }

    #[test]
    fn test_config_union_merges_cli_over_file_for_options() {
        let file = ConfigFlags {
            watch: true,
            output: Some(PathBuf::from("file.html")),
            ..ConfigFlags::default()
        };
        let cli = ConfigFlags {
            no_style: true,
            output: Some(PathBuf::from("cli.html")),
            ..ConfigFlags::default()
        };
        let merged = file.union(&cli);
        assert!(merged.watch);
        assert!(merged.no_style);
        assert_eq!(merged.output, Some(PathBuf::from("cli.html")));
    }

    #[test]
    fn test_save_load_and_clear_config() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join(".jotpadrc");
        let flags = ConfigFlags {
            watch: true,
            no_style: true,
            output: Some(PathBuf::from("preview.html")),
            config: Some(PathBuf::from("editor.json")),
        };

        save_config_flags(&path, &flags).unwrap();
        let loaded = load_config_flags(&path).unwrap();
        assert_eq!(loaded, flags);

        clear_config_flags(&path).unwrap();
        assert!(!path.exists());
        assert_eq!(load_config_flags(&path).unwrap(), ConfigFlags::default());
    }

    #[test]
    fn test_saved_paths_with_spaces_load_back_whole() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(".jotpadrc");
        let flags = ConfigFlags {
            output: Some(PathBuf::from("my previews/out file.html")),
            config: Some(PathBuf::from("Editor Settings/editor.json")),
            ..ConfigFlags::default()
        };

        save_config_flags(&path, &flags).unwrap();
        assert_eq!(load_config_flags(&path).unwrap(), flags);
    }
}
