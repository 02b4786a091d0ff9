//! `tilelayer config` - show, create, or locate the configuration file.

use clap::Subcommand;
use tilelayer::config::{config_file_path, format_size, ConfigFile, ConfigFileError};

use crate::error::CliError;

/// Config subcommands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommands {
    /// Print the effective configuration
    Show,

    /// Write a configuration file with default values
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Print the configuration file path
    Path,
}

/// Run a config subcommand.
///
/// `load_error` is the error from loading the file at startup, if any.
pub fn run(command: ConfigCommands, load_error: Option<ConfigFileError>) -> Result<(), CliError> {
    match command {
        ConfigCommands::Show => match load_error {
            Some(e) => Err(e.into()),
            None => run_show(),
        },
        ConfigCommands::Init { force } => run_init(force),
        ConfigCommands::Path => {
            println!("{}", config_file_path().display());
            Ok(())
        }
    }
}

fn run_show() -> Result<(), CliError> {
    let path = config_file_path();
    let config = ConfigFile::load_from(&path)?;

    if path.exists() {
        println!("# {}", path.display());
    } else {
        println!("# {} (not found, showing defaults)", path.display());
    }
    print!("{}", render(&config));
    Ok(())
}

fn run_init(force: bool) -> Result<(), CliError> {
    let path = config_file_path();
    if path.exists() && !force {
        return Err(CliError::Usage(format!(
            "{} already exists, use --force to overwrite it",
            path.display()
        )));
    }
    ConfigFile::default().save_to(&path)?;
    println!("Wrote default configuration to {}", path.display());
    Ok(())
}

/// Flat `section.key = value` listing of every setting.
fn render(config: &ConfigFile) -> String {
    let optional_path = |p: &Option<std::path::PathBuf>| {
        p.as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "(not set)".to_string())
    };

    let mut lines = vec![
        format!("cache.image_cache_size = {}", format_size(config.cache.image_cache_size)),
        format!("cache.buffer_grace_secs = {}", config.cache.buffer_grace_secs),
        format!("cache.sweep_interval_secs = {}", config.cache.sweep_interval_secs),
        format!("layers.definitions = {}", optional_path(&config.layers.definitions)),
        format!("logging.directory = {}", optional_path(&config.logging.directory)),
        format!("logging.file = {}", config.logging.file),
    ];
    lines.extend(
        config
            .zoom
            .overrides
            .iter()
            .map(|(layer, zoom)| format!("zoom.{} = {}", layer, zoom)),
    );

    let mut out = lines.join("\n");
    out.push('\n');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_defaults() {
        let text = render(&ConfigFile::default());
        assert!(text.contains("cache.image_cache_size = 64MB"));
        assert!(text.contains("layers.definitions = (not set)"));
        assert!(!text.contains("zoom."));
    }

    #[test]
    fn test_render_zoom_overrides() {
        let mut config = ConfigFile::default();
        config.zoom.overrides.insert("osm".into(), 8);
        assert!(render(&config).ends_with("zoom.osm = 8\n"));
    }
}
