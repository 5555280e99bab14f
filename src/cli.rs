use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::export::ExportFormat;

#[derive(Parser)]
#[command(name = "podscript", about = "Turn articles and notes into podcast scripts")]
pub struct Cli {
    /// Path to configuration file
    #[arg(long, short, global = true, default_value = "config.toml")]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the HTTP API (default when no command is given)
    Serve,

    /// Validate the configuration file
    Validate,

    /// Fetch a web page and print its extracted article text
    Fetch {
        url: String,

        /// Print title, content and word count as JSON
        #[arg(long)]
        json: bool,
    },

    /// Generate a script from a URL, a file, or stdin, and store it
    Generate {
        /// Fetch the article at this URL
        #[arg(long, conflicts_with = "file")]
        url: Option<String>,

        /// Read content from this file
        #[arg(long)]
        file: Option<PathBuf>,

        #[arg(long, default_value = "conversational", value_parser = ["conversational", "professional", "educational", "interview"])]
        style: String,

        #[arg(long, default_value = "10-20", value_parser = ["5-10", "10-20", "20-30", "30+"])]
        duration: String,

        #[arg(long)]
        show_name: Option<String>,

        /// Output format: txt, markdown, html or json
        #[arg(long, default_value = "txt")]
        format: ExportFormat,

        /// Write the rendered script to this file instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,

        /// Skip AI providers and use the local generator
        #[arg(long)]
        offline: bool,
    },

    /// List stored scripts, newest first
    List {
        #[arg(long, default_value_t = 20)]
        limit: i64,
    },

    /// Render a stored script
    Export {
        id: String,

        #[arg(long, default_value = "txt")]
        format: ExportFormat,

        #[arg(long)]
        output: Option<PathBuf>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_command_means_serve() {
        let cli = Cli::try_parse_from(["podscript"]).unwrap();
        assert!(cli.command.is_none());
        assert_eq!(cli.config, PathBuf::from("config.toml"));
    }

    #[test]
    fn generate_flags_parse() {
        let cli = Cli::try_parse_from([
            "podscript",
            "--config",
            "/etc/podscript.toml",
            "generate",
            "--url",
            "https://example.com/a",
            "--style",
            "interview",
            "--duration",
            "30+",
            "--format",
            "markdown",
            "--offline",
        ])
        .unwrap();
        match cli.command {
            Some(Commands::Generate {
                url,
                style,
                duration,
                format,
                offline,
                ..
            }) => {
                assert_eq!(url.as_deref(), Some("https://example.com/a"));
                assert_eq!(style, "interview");
                assert_eq!(duration, "30+");
                assert_eq!(format, ExportFormat::Markdown);
                assert!(offline);
            }
            _ => panic!("expected generate command"),
        }
    }

    #[test]
    fn generate_rejects_url_with_file() {
        assert!(Cli::try_parse_from(["podscript", "generate", "--url", "https://a.b", "--file", "x.txt"]).is_err());
        assert!(Cli::try_parse_from(["podscript", "generate", "--duration", "45"]).is_err());
    }

    #[test]
    fn export_format_is_validated() {
        assert!(Cli::try_parse_from(["podscript", "export", "abc", "--format", "pdf"]).is_err());
    }
}
