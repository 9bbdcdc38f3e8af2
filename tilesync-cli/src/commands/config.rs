//! `tilesync config` - read and edit config.ini by key.

use clap::Subcommand;
use tilesync::config::{config_file_path, ConfigFile, ConfigKey};

use crate::error::CliError;

const UNSET: &str = "(not set)";

#[derive(Debug, Subcommand)]
pub enum ConfigCommands {
    /// Print one value
    Get {
        /// section.key, e.g. api.base_url
        key: String,
    },

    /// Change one value and write the file
    Set {
        /// section.key, e.g. sync.interval_mins
        key: String,

        #[arg(allow_hyphen_values = true)]
        value: String,
    },

    /// Print every setting, grouped by section
    List {
        /// Only show keys of this section (api, sync, area, logging)
        #[arg(long)]
        section: Option<String>,
    },

    /// Print where config.ini lives
    Path,
}

pub fn run(command: ConfigCommands) -> Result<(), CliError> {
    match command {
        ConfigCommands::Get { key } => {
            let key = lookup(&key)?;
            println!("{}", display_value(&key.get(&ConfigFile::load()?)));
        }
        ConfigCommands::Set { key, value } => {
            let key = lookup(&key)?;
            let mut config = ConfigFile::load()?;
            key.set(&mut config, &value)?;
            config.save()?;
            println!("{} = {}", key.name(), display_value(&key.get(&config)));
        }
        ConfigCommands::List { section } => {
            let config = ConfigFile::load()?;
            print!("{}", render(&config, section.as_deref())?);
        }
        ConfigCommands::Path => println!("{}", config_file_path().display()),
    }
    Ok(())
}

fn lookup(key: &str) -> Result<ConfigKey, CliError> {
    key.parse().map_err(|_| {
        CliError::Config(format!(
            "no such key '{}' (run `tilesync config list` for the valid keys)",
            key
        ))
    })
}

fn display_value(value: &str) -> &str {
    if value.is_empty() {
        UNSET
    } else {
        value
    }
}

/// INI-style listing of the settings, optionally limited to one section.
fn render(config: &ConfigFile, only: Option<&str>) -> Result<String, CliError> {
    let keys: Vec<&ConfigKey> = ConfigKey::all()
        .iter()
        .filter(|key| only.map_or(true, |s| key.section().eq_ignore_ascii_case(s)))
        .collect();
    if keys.is_empty() {
        return Err(CliError::Config(format!(
            "no such section '{}'",
            only.unwrap_or_default()
        )));
    }

    let mut out = String::new();
    let mut section = "";
    for key in keys {
        if key.section() != section {
            if !section.is_empty() {
                out.push('\n');
            }
            section = key.section();
            out.push_str(&format!("[{}]\n", section));
        }
        out.push_str(&format!(
            "{} = {}\n",
            key.key_name(),
            display_value(&key.get(config))
        ));
    }
    Ok(out)
}
