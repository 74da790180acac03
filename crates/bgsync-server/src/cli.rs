//! Command-line interface definitions and parsing

use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug)]
#[command(author, version, about = "Shared backgammon board server with undo/redo history", long_about = None)]
pub struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Configuration file path (TOML)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Address to bind the WebSocket listener to
    #[arg(short, long)]
    pub bind: Option<String>,

    /// Port to listen on
    #[arg(short, long)]
    pub port: Option<u16>,

    /// File holding the persisted history
    #[arg(short, long)]
    pub data_file: Option<PathBuf>,

    /// Key of this server's record in the data file
    #[arg(short, long)]
    pub server_id: Option<String>,

    /// Print an example configuration file and exit
    #[arg(long)]
    pub print_config: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_overrides() {
        let cli = Cli::parse_from([
            "bgsync",
            "--port",
            "6000",
            "--data-file",
            "/tmp/board.json",
            "-s",
            "table-2",
            "-v",
        ]);
        assert!(cli.verbose);
        assert_eq!(cli.port, Some(6000));
        assert_eq!(cli.data_file, Some(PathBuf::from("/tmp/board.json")));
        assert_eq!(cli.server_id.as_deref(), Some("table-2"));
        assert!(cli.bind.is_none());
        assert!(!cli.print_config);
    }
}
