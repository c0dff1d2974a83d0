mod cli_utils;
mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use cloudiplookup::config::DATA_DIR_ENV;
use std::path::PathBuf;

use commands::{cmd_build, cmd_config, cmd_export, cmd_info, cmd_lookup};

#[derive(Parser)]
#[command(name = "cloudiplookup")]
#[command(
    about = "Find which public cloud provider owns an IP address",
    long_about = "cloudiplookup - Fast lookup of IPv4/IPv6 addresses against the published network ranges\n\
    of public cloud providers (AWS, Azure, Google, Cloudflare, Oracle, DigitalOcean, JD Cloud).\n\n\
    Examples:\n  \
    cloudiplookup lookup 3.3.3.5,2400:cb00::1\n  \
    cloudiplookup lookup 8.8.8.8 --csv\n  \
    cloudiplookup build --feed aws=ip-ranges.json --feed azure=ServiceTags_Public.json\n  \
    cloudiplookup info --pretty\n  \
    cloudiplookup config"
)]
#[command(version)]
struct Cli {
    /// Directory holding cloudiplookup.dat.gz and cloudiplookup.json
    #[arg(long, global = true, env = DATA_DIR_ENV, value_name = "DIR")]
    data_dir: Option<PathBuf>,

    /// Show progress messages on stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Show debug messages on stderr
    #[arg(short, long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Look up one or more IP addresses
    Lookup {
        /// Addresses, separated by commas and/or spaces
        #[arg(value_name = "IPADDR", required = true)]
        addresses: Vec<String>,

        /// Print CSV (ip,cidr,region,cloud_provider,service,network_features,elapsed_time)
        #[arg(short, long)]
        csv: bool,

        /// Snapshot to query (default: <data-dir>/cloudiplookup.dat.gz)
        #[arg(long, value_name = "FILE")]
        db: Option<PathBuf>,
    },

    /// Build a snapshot from downloaded provider documents
    Build {
        /// Provider document as KIND=PATH, e.g. aws=ip-ranges.json (repeatable)
        #[arg(short, long = "feed", value_name = "KIND=PATH")]
        feeds: Vec<String>,

        /// Extra records as JSON lines, "-" for stdin
        #[arg(short, long, value_name = "FILE")]
        records: Option<PathBuf>,

        /// Output snapshot (default: <data-dir>/cloudiplookup.dat.gz)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Fail when one range starts inside another
        #[arg(long)]
        reject_overlaps: bool,
    },

    /// Show per-provider statistics of a snapshot
    Info {
        /// Snapshot to inspect (default: <data-dir>/cloudiplookup.dat.gz)
        #[arg(long, value_name = "FILE")]
        db: Option<PathBuf>,

        /// Print a table instead of JSON
        #[arg(short, long)]
        pretty: bool,
    },

    /// Print the provider download locations
    Config,

    /// Write every record of a snapshot as JSON lines
    Export {
        /// Snapshot to export (default: <data-dir>/cloudiplookup.dat.gz)
        #[arg(long, value_name = "FILE")]
        db: Option<PathBuf>,

        /// Output file (default: stdout)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    cli_utils::init_logging(cli.verbose, cli.debug);
    let settings = cli_utils::settings(cli.data_dir);

    match cli.command {
        Commands::Lookup {
            addresses,
            csv,
            db,
        } => cmd_lookup(&settings, addresses, csv, db),
        Commands::Build {
            feeds,
            records,
            output,
            reject_overlaps,
        } => cmd_build(&settings, feeds, records, output, reject_overlaps),
        Commands::Info { db, pretty } => cmd_info(&settings, db, pretty),
        Commands::Config => cmd_config(&settings),
        Commands::Export { db, output } => cmd_export(&settings, db, output),
    }
}
