use std::process;

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use tracing::Level;

use actorinfo::byml::format::to_text;
use actorinfo::byml::{Value, ValueKind};
use actorinfo::{Config, ContainerCodec, Result, Source};

/// Get, duplicate, edit and remove entries of an ActorInfo.product.sbyml file
#[derive(Parser)]
#[command(name = "actorinfo", version, about)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Yaz0 search depth used when the file is recompressed
    #[arg(long, default_value_t = 6, value_parser = clap::value_parser!(u32).range(0..=9))]
    compression_level: u32,

    /// Path to the ActorInfo file, or `-` to read stdin and write stdout
    actorinfo: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print an entry, or one of its keys
    #[command(alias = "g")]
    Get {
        entry: String,
        /// Key inside the entry, `.`-separated for nested values
        key: Option<String>,
    },
    /// Copy an entry under a new name
    #[command(alias = "d")]
    Duplicate { from: String, to: String },
    /// Set a key of an entry
    #[command(alias = "e")]
    Edit {
        entry: String,
        key: String,
        #[arg(allow_hyphen_values = true)]
        value: String,
        /// How VALUE is stored
        #[arg(long = "type", value_enum, default_value_t = ValueType::String)]
        kind: ValueType,
    },
    /// Remove an entry, or one of its keys
    #[command(alias = "r")]
    Remove { entry: String, key: Option<String> },
}

#[derive(Clone, Copy, ValueEnum)]
enum ValueType {
    String,
    Int,
    Uint,
    Float,
    Bool,
}

impl From<ValueType> for ValueKind {
    fn from(kind: ValueType) -> Self {
        match kind {
            ValueType::String => ValueKind::String,
            ValueType::Int => ValueKind::Int,
            ValueType::Uint => ValueKind::UInt,
            ValueType::Float => ValueKind::Float,
            ValueType::Bool => ValueKind::Bool,
        }
    }
}

fn main() {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(cli) {
        eprintln!("error: {}", e);
        process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let source = Source::parse(&cli.actorinfo);
    let codec = ContainerCodec::new(Config::new().compression_level(cli.compression_level));
    let (header, mut container) = codec.decode(&source.read()?)?;

    let description = match cli.command {
        Command::Get { entry, key } => {
            print!("{}", to_text(container.get(&entry, key.as_deref())?));
            return Ok(());
        }
        Command::Duplicate { from, to } => container.duplicate(&from, &to)?.to_string(),
        Command::Edit {
            entry,
            key,
            value,
            kind,
        } => {
            let value = Value::parse_as(kind.into(), &value)?;
            container.edit(&entry, &key, value)?.to_string()
        }
        Command::Remove { entry, key } => container.remove(&entry, key.as_deref())?.to_string(),
    };

    let data = codec.encode(&header, &container)?;
    source.write(&data)?;

    if !source.is_stdin() {
        println!("{}", description);
    }
    Ok(())
}
