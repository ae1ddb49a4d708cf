use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "hoard",
    about = "hoard: a content-addressed personal archive",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Configuration file; a missing file means defaults
    #[arg(short, long, global = true, default_value = "hoard.toml")]
    pub config: PathBuf,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Store files and index them
    Ingest(IngestArgs),
    /// Show an entry
    Show(ShowArgs),
    /// Write an entry's stored bytes
    Cat(CatArgs),
    /// Bind a name to an entry
    Alias(AliasArgs),
    /// Remove a name
    Unalias(UnaliasArgs),
    /// Show the entry a name is bound to
    Resolve(ResolveArgs),
    /// Add a directed relation between two entries
    Relate(RelateArgs),
    /// Remove a directed relation
    Unrelate(RelateArgs),
    /// List the targets of an entry's relations
    Relations(RelationsArgs),
    /// List entries whose grid square starts with a prefix
    Near(NearArgs),
}

#[derive(Args)]
pub struct IngestArgs {
    #[arg(required = true)]
    pub paths: Vec<PathBuf>,
    /// Descend into directories
    #[arg(short, long)]
    pub recursive: bool,
}

#[derive(Args)]
pub struct ShowArgs {
    pub id: String,
}

#[derive(Args)]
pub struct CatArgs {
    pub id: String,
    /// Address role to read
    #[arg(long, default_value = "orig")]
    pub role: String,
    /// Write to a file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

#[derive(Args)]
pub struct AliasArgs {
    pub alias: String,
    pub id: String,
}

#[derive(Args)]
pub struct UnaliasArgs {
    pub alias: String,
}

#[derive(Args)]
pub struct ResolveArgs {
    pub alias: String,
}

#[derive(Args)]
pub struct RelateArgs {
    pub from: String,
    pub to: String,
}

#[derive(Args)]
pub struct RelationsArgs {
    pub id: String,
}

#[derive(Args)]
pub struct NearArgs {
    pub gridsquare: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_definition_is_valid() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_ingest() {
        let cli = Cli::try_parse_from(["hoard", "-v", "ingest", "-r", "a", "b"]).unwrap();
        assert!(cli.verbose);
        assert_eq!(cli.config, PathBuf::from("hoard.toml"));
        let Command::Ingest(args) = cli.command else {
            panic!("expected ingest");
        };
        assert!(args.recursive);
        assert_eq!(args.paths.len(), 2);
    }

    #[test]
    fn ingest_needs_a_path() {
        assert!(Cli::try_parse_from(["hoard", "ingest"]).is_err());
    }

    #[test]
    fn cat_defaults_to_original() {
        let cli = Cli::try_parse_from(["hoard", "--format", "json", "cat", "some-id"]).unwrap();
        assert_eq!(cli.format, OutputFormat::Json);
        let Command::Cat(args) = cli.command else {
            panic!("expected cat");
        };
        assert_eq!(args.role, "orig");
        assert!(args.output.is_none());
    }
}
