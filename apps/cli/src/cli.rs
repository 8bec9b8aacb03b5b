//! Command-line arguments

use std::path::PathBuf;

use clap::Parser;

use crate::config::LogFormat;

/// Fill maps and sequences over pooled and plain allocators and print them
#[derive(Debug, Parser)]
#[command(name = "poolkit", version, about, long_about = None)]
pub struct Cli {
    /// Config file to read instead of ./poolkit.toml
    #[arg(short, long, value_name = "PATH", env = "POOLKIT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Number of keys and values per container (at most 21)
    #[arg(short = 'n', long, value_name = "N")]
    pub count: Option<usize>,

    /// Log filter directive, e.g. `debug` or `poolkit_memory=trace`
    #[arg(long, value_name = "FILTER")]
    pub log_level: Option<String>,

    /// Log output style
    #[arg(long, value_enum, value_name = "FORMAT")]
    pub log_format: Option<LogFormat>,
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_command_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_flags_parse() {
        let cli = Cli::parse_from(["poolkit", "-n", "3", "--log-format", "pretty"]);
        assert_eq!(cli.count, Some(3));
        assert_eq!(cli.log_format, Some(LogFormat::Pretty));
        assert_eq!(cli.log_level, None);
    }
}
