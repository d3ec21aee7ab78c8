//! Settings inspection and editing command.

use super::common::load_settings;
use clap::{Args, Subcommand};
use std::path::Path;

#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    command: Option<ConfigCommand>,
}

#[derive(Subcommand)]
enum ConfigCommand {
    /// Print the effective settings as TOML
    Show,

    /// Change one setting, e.g. `measurement.take_count 5`
    Set {
        /// Dotted key (section.field)
        key: String,

        /// New value
        value: String,
    },

    /// Print the settings file location
    Path,

    /// Write the default settings, replacing the file
    Reset,
}

pub fn run(args: ConfigArgs, config_path: &Path) -> anyhow::Result<()> {
    match args.command.unwrap_or(ConfigCommand::Show) {
        ConfigCommand::Show => {
            let settings = load_settings(config_path)?;
            print!("{}", settings.to_toml()?);
        }
        ConfigCommand::Set { key, value } => {
            let mut settings = load_settings(config_path)?;
            settings.set(&key, &value)?;
            settings.save(config_path)?;
            println!("Set {key} = {value} in {}", config_path.display());
        }
        ConfigCommand::Path => {
            println!("{}", config_path.display());
        }
        ConfigCommand::Reset => {
            micprobe_config::Settings::default().save(config_path)?;
            println!("Wrote default settings to {}", config_path.display());
        }
    }
    Ok(())
}
