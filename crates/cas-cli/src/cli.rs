use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "cas",
    about = "Content-addressed blob store",
    version,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Store root directory [default: ./store/]
    #[arg(long, global = true)]
    pub root: Option<PathBuf>,

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
    /// Run the HTTP server
    Serve(ServeArgs),
    /// Store a file and print its address
    Put(PutArgs),
    /// Write an object's bytes to a file or stdout
    Get(GetArgs),
    /// Delete an object
    Rm(RmArgs),
    /// Re-hash one object and compare it with its address
    Verify(VerifyArgs),
    /// Verify every object in the store
    Fsck(FsckArgs),
    /// Remove orphaned staging files
    Sweep(SweepArgs),
    /// Show object and byte counts
    Stats(StatsArgs),
}

#[derive(Args)]
pub struct ServeArgs {
    /// TOML config file
    #[arg(short, long)]
    pub config: Option<PathBuf>,
    /// Listen address, overriding the config file
    #[arg(long)]
    pub bind: Option<SocketAddr>,
}

#[derive(Args)]
pub struct PutArgs {
    pub file: PathBuf,
    /// Expected address; the store is rejected if the content disagrees
    #[arg(long)]
    pub md5: Option<String>,
}

#[derive(Args)]
pub struct GetArgs {
    pub hash: String,
    #[arg(short, long)]
    pub output: Option<PathBuf>,
    /// Verify the object before writing it out
    #[arg(long)]
    pub validate: bool,
}

#[derive(Args)]
pub struct RmArgs {
    pub hash: String,
}

#[derive(Args)]
pub struct VerifyArgs {
    pub hash: String,
}

#[derive(Args)]
pub struct FsckArgs {}

#[derive(Args)]
pub struct SweepArgs {
    /// Only remove staging files at least this many seconds old
    #[arg(long, default_value = "3600")]
    pub older_than: u64,
}

#[derive(Args)]
pub struct StatsArgs {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_put() {
        let cli = Cli::try_parse_from(["cas", "put", "a.bin"]).unwrap();
        if let Command::Put(args) = cli.command {
            assert_eq!(args.file, PathBuf::from("a.bin"));
            assert!(args.md5.is_none());
        } else { panic!("wrong command"); }
    }

    #[test]
    fn parse_put_with_md5() {
        let cli = Cli::try_parse_from([
            "cas", "put", "a.bin", "--md5", "5d41402abc4b2a76b9719d911017c592",
        ]).unwrap();
        if let Command::Put(args) = cli.command {
            assert_eq!(args.md5.as_deref(), Some("5d41402abc4b2a76b9719d911017c592"));
        } else { panic!("wrong command"); }
    }

    #[test]
    fn parse_get() {
        let cli = Cli::try_parse_from(["cas", "get", "abc", "-o", "out.bin", "--validate"]).unwrap();
        if let Command::Get(args) = cli.command {
            assert_eq!(args.hash, "abc");
            assert_eq!(args.output, Some(PathBuf::from("out.bin")));
            assert!(args.validate);
        } else { panic!("wrong command"); }
    }

    #[test]
    fn parse_rm() {
        let cli = Cli::try_parse_from(["cas", "rm", "abc"]).unwrap();
        assert!(matches!(cli.command, Command::Rm(_)));
    }

    #[test]
    fn parse_fsck() {
        let cli = Cli::try_parse_from(["cas", "fsck"]).unwrap();
        assert!(matches!(cli.command, Command::Fsck(_)));
    }

    #[test]
    fn parse_sweep_default() {
        let cli = Cli::try_parse_from(["cas", "sweep"]).unwrap();
        if let Command::Sweep(args) = cli.command {
            assert_eq!(args.older_than, 3600);
        } else { panic!("wrong command"); }
    }

    #[test]
    fn parse_serve() {
        let cli = Cli::try_parse_from(["cas", "serve", "--bind", "0.0.0.0:8080"]).unwrap();
        if let Command::Serve(args) = cli.command {
            assert_eq!(args.bind, Some("0.0.0.0:8080".parse().unwrap()));
            assert!(args.config.is_none());
        } else { panic!("wrong command"); }
    }

    #[test]
    fn parse_serve_rejects_bad_bind() {
        assert!(Cli::try_parse_from(["cas", "serve", "--bind", "nowhere"]).is_err());
    }

    #[test]
    fn parse_global_root() {
        let cli = Cli::try_parse_from(["cas", "stats", "--root", "/srv/blobs"]).unwrap();
        assert_eq!(cli.root, Some(PathBuf::from("/srv/blobs")));
    }

    #[test]
    fn parse_verbose() {
        let cli = Cli::try_parse_from(["cas", "--verbose", "stats"]).unwrap();
        assert!(cli.verbose);
    }

    #[test]
    fn parse_json_format() {
        let cli = Cli::try_parse_from(["cas", "--format", "json", "fsck"]).unwrap();
        assert_eq!(cli.format, OutputFormat::Json);
    }
}
