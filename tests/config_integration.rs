use std::path::PathBuf;

use jotpad::config::{ConfigFlags, load_config_flags, parse_flag_tokens, save_config_flags};

#[test]
fn test_config_file_parsing_ignores_comments_and_blank_lines() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(".jotpadrc");
    let content = r"
# comment
--watch

--output preview.html
   
--config=editor.json
";
    std::fs::write(&path, content).unwrap();

    let flags = load_config_flags(&path).unwrap();
    assert!(flags.watch);
    assert!(!flags.no_style);
    assert_eq!(flags.output, Some(PathBuf::from("preview.html")));
    assert_eq!(flags.config, Some(PathBuf::from("editor.json")));
}

#[test]
fn test_cli_flags_override_file_flags() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(".jotpadrc");
    std::fs::write(&path, "--watch\n--output file.html\n--config file.json\n").unwrap();

    let file_flags = load_config_flags(&path).unwrap();
    let cli_args = vec![
        "jotpad".to_string(),
        "--output".to_string(),
        "cli.html".to_string(),
        "--no-style".to_string(),
        "draft.html".to_string(),
    ];
    let cli_flags = parse_flag_tokens(&cli_args);

    let effective = file_flags.union(&cli_flags);
    assert!(effective.watch, "file flags should remain enabled");
    assert!(effective.no_style, "cli flags should be applied");
    assert_eq!(
        effective.output,
        Some(PathBuf::from("cli.html")),
        "cli should override output"
    );
    assert_eq!(
        effective.config,
        Some(PathBuf::from("file.json")),
        "file config should be preserved when CLI does not override"
    );
}

#[test]
fn test_local_override_layers_over_global_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let global = dir.path().join("global").join("config");
    let local = dir.path().join(".jotpadrc");
    save_config_flags(
        &global,
        &ConfigFlags {
            no_style: true,
            config: Some(PathBuf::from("global.json")),
            ..ConfigFlags::default()
        },
    )
    .unwrap();
    std::fs::write(&local, "--config local.json\n").unwrap();

    let merged = load_config_flags(&global)
        .unwrap()
        .union(&load_config_flags(&local).unwrap());
    assert!(merged.no_style);
    assert_eq!(merged.config, Some(PathBuf::from("local.json")));
}

#[test]
fn test_unknown_tokens_are_ignored() {
    let args = vec![
        "jotpad".to_string(),
        "--seed".to_string(),
        "hello".to_string(),
        "--save".to_string(),
        "draft.html".to_string(),
    ];
    assert_eq!(parse_flag_tokens(&args), ConfigFlags::default());
}
