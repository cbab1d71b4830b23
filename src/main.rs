//! Jotpad - edit an HTML fragment in any editor and get a safe preview.
//!
//! # Usage
//!
//! ```bash
//! jotpad draft.html
//! jotpad --watch --output preview.html draft.html
//! jotpad --config editor.json --no-style draft.html
//! ```

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;

use jotpad::config::{
    ConfigFlags, clear_config_flags, global_config_path, load_config_flags, local_override_path,
    save_config_flags,
};
use jotpad::preview::{SafeMarkup, SanitizePolicy};
use jotpad::session::{ConfigSource, DEFAULT_SEED, FileEditor, Message, Session};
use jotpad::store::{ContentStore, FileStore};
use jotpad::watcher::DEFAULT_DEBOUNCE;

const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Edit an HTML fragment in any editor and get a sanitized preview
#[derive(Parser, Debug)]
#[command(name = "jotpad", version, about, long_about = None)]
struct Cli {
    /// Document being edited
    #[arg(value_name = "FILE")]
    file: PathBuf,

    /// Re-render the preview every time the document is saved
    #[arg(short, long)]
    watch: bool,

    /// Write the preview to a file instead of stdout
    #[arg(short, long, value_name = "PATH")]
    output: Option<PathBuf>,

    /// Editor configuration (JSON)
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Drop all inline styles from the preview
    #[arg(long)]
    no_style: bool,

    /// Content used when FILE does not exist yet
    #[arg(long, value_name = "TEXT", default_value = DEFAULT_SEED)]
    seed: String,

    /// Save current command-line flags as defaults
    #[arg(long)]
    save: bool,

    /// Clear saved defaults
    #[arg(long)]
    clear: bool,
}

impl Cli {
    /// The persistable flags given on this command line, in any spelling
    /// clap accepted (`-w`, `-o out.html`, `--output=out.html`, ...).
    fn flags(&self) -> ConfigFlags {
        ConfigFlags {
            watch: self.watch,
            no_style: self.no_style,
            output: self.output.clone(),
            config: self.config.clone(),
        }
    }
}

fn main() -> Result<()> {
    // Logs go to stderr; stdout carries the preview
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .init();

    let cli = Cli::parse();
    let global_path = global_config_path();
    let local_path = local_override_path();
    let cli_flags = cli.flags();

    if cli.clear {
        clear_config_flags(&global_path)?;
    }
    if cli.save {
        save_config_flags(&global_path, &cli_flags)?;
    }

    let file_flags = if cli.clear {
        ConfigFlags::default()
    } else {
        let global_flags = load_config_flags(&global_path)?;
        let local_flags = load_config_flags(&local_path)?;
        global_flags.union(&local_flags)
    };
    let effective = file_flags.union(&cli_flags);

    run(&cli, &effective)
}

fn run(cli: &Cli, flags: &ConfigFlags) -> Result<()> {
    let config_source = flags
        .config
        .clone()
        .map_or_else(ConfigSource::default, ConfigSource::File);
    let mut policy = SanitizePolicy::default();
    if flags.no_style {
        policy = policy.without_styles();
    }

    let mut session: Session<FileEditor> = Session::from_store(
        Box::new(FileStore::new(&cli.file)),
        &cli.seed,
        config_source,
    )
    .with_context(|| format!("Failed to open {}", cli.file.display()))?
    .with_policy(policy);

    let editor = if flags.watch {
        FileEditor::watching(&cli.file, DEFAULT_DEBOUNCE)
            .with_context(|| format!("Failed to watch {}", cli.file.display()))?
    } else {
        FileEditor::new(&cli.file)
    };
    session
        .mount(|initial, configuration| editor.seeded(initial, configuration))
        .context("Failed to mount editor")?;

    let output = flags.output.as_deref().map(FileStore::new);
    emit(session.preview()?, output.as_ref())?;
    if !flags.watch {
        return Ok(());
    }

    let mut rendered_revision = session.content().revision();
    loop {
        std::thread::sleep(POLL_INTERVAL);
        session.update(Message::PollEditor)?;
        let revision = session.content().revision();
        if revision != rendered_revision {
            rendered_revision = revision;
            emit(session.preview()?, output.as_ref())?;
        }
    }
}

fn emit(markup: &SafeMarkup, output: Option<&FileStore>) -> Result<()> {
    if markup.is_fallback() {
        tracing::warn!("preview replaced by fallback output");
    }
    match output {
        Some(store) => store
            .save(markup.as_str())
            .with_context(|| format!("Failed to write preview {}", store.path().display())),
        None => {
            println!("{markup}");
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_flags_reach_effective_config() {
        let cli = Cli::try_parse_from(["jotpad", "-w", "-o", "out.html", "draft.html"]).unwrap();
        let flags = ConfigFlags::default().union(&cli.flags());
        assert!(flags.watch);
        assert_eq!(flags.output, Some(PathBuf::from("out.html")));
    }

    #[test]
    fn test_cli_overrides_saved_defaults() {
        let saved = ConfigFlags {
            no_style: true,
            output: Some(PathBuf::from("saved.html")),
            ..ConfigFlags::default()
        };
        let cli =
            Cli::try_parse_from(["jotpad", "--output=cli.html", "--config", "e.json", "d.html"])
                .unwrap();
        let flags = saved.union(&cli.flags());
        assert!(flags.no_style);
        assert!(!flags.watch);
        assert_eq!(flags.output, Some(PathBuf::from("cli.html")));
        assert_eq!(flags.config, Some(PathBuf::from("e.json")));
        assert_eq!(cli.seed, DEFAULT_SEED);
    }
}
