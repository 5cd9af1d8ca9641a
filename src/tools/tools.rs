//! `remote-fmt-tools`: a small CLI around the crate's encoder and decoder,
//! for producing and inspecting frames from the command line. One
//! `clap::Subcommand` variant per operation, dispatched in `main`.

use std::fs::File;
use std::io::{BufWriter, Read, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use remote_fmt::catalog::JsonCatalog;
use remote_fmt::encode::{print, EncoderConfig};
use remote_fmt::value::Encodable;

/// Produce and inspect remote_fmt frames.
#[derive(Clone, Debug, Parser)]
struct Args {
    /// operation to execute
    #[command(subcommand)]
    operation: Operation,
}

#[derive(Clone, Debug, Subcommand)]
enum Operation {
    /// Encode a template and its arguments into one frame.
    Encode(EncodeArgs),
    /// Decode every frame found in an input file, resynchronizing past noise.
    Decode(DecodeArgs),
}

#[derive(Clone, Debug, Parser)]
struct EncodeArgs {
    /// the format template, e.g. "hello {}"
    template: String,
    /// one value per replacement field; parsed as bool/int/float, falling
    /// back to a string if none of those match
    args: Vec<String>,
    /// write the encoded frame here instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,
    /// JSON catalog file; when given, the template is interned through it
    #[arg(short, long)]
    catalog: Option<PathBuf>,
}

#[derive(Clone, Debug, Parser)]
struct DecodeArgs {
    /// frame bytes to parse
    input: PathBuf,
    /// JSON catalog file used to resolve cataloged strings and templates
    #[arg(short, long)]
    catalog: Option<PathBuf>,
}

/// A CLI argument's best-effort guessed type, since a command line only
/// ever hands us strings.
enum ArgValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl ArgValue {
    fn guess(raw: &str) -> Self {
        if let Ok(b) = raw.parse::<bool>() {
            ArgValue::Bool(b)
        } else if let Ok(i) = raw.parse::<i64>() {
            ArgValue::Int(i)
        } else if let Ok(f) = raw.parse::<f64>() {
            ArgValue::Float(f)
        } else {
            ArgValue::Str(raw.to_string())
        }
    }
}

impl Encodable for ArgValue {
    fn encode(&self, enc: &mut remote_fmt::encode::Encoder<'_>) {
        match self {
            ArgValue::Bool(v) => v.encode(enc),
            ArgValue::Int(v) => v.encode(enc),
            ArgValue::Float(v) => v.encode(enc),
            ArgValue::Str(v) => v.encode(enc),
        }
    }
}

fn encode(args: &EncodeArgs) -> Result<()> {
    let template: &'static str = Box::leak(args.template.clone().into_boxed_str());
    let values: Vec<ArgValue> = args.args.iter().map(|a| ArgValue::guess(a)).collect();
    let refs: Vec<&dyn Encodable> = values.iter().map(|v| v as &dyn Encodable).collect();

    let config = EncoderConfig {
        use_catalog: args.catalog.is_some(),
    };
    let intern = remote_fmt::catalog::InternTable::new();
    let intern_ref = config.use_catalog.then_some(&intern);

    let mut buf = Vec::new();
    print(&mut buf, config, intern_ref, template, &refs)?;

    if config.use_catalog {
        // One invocation interns at most one template, so the table built
        // during this run is the whole catalog; nothing to merge with a
        // previous run's file.
        let catalog_path = args.catalog.as_ref().unwrap();
        std::fs::write(catalog_path, intern.dump_json()?)
            .with_context(|| format!("writing catalog file {}", catalog_path.display()))?;
    }

    match &args.output {
        Some(path) => {
            let mut out = BufWriter::new(
                File::create(path).with_context(|| format!("creating output file {}", path.display()))?,
            );
            out.write_all(&buf)?;
        }
        None => std::io::stdout().write_all(&buf)?,
    }
    Ok(())
}

fn decode(args: &DecodeArgs) -> Result<()> {
    let mut bytes = Vec::new();
    File::open(&args.input)
        .with_context(|| format!("opening input file {}", args.input.display()))?
        .read_to_end(&mut bytes)?;

    let catalog = match &args.catalog {
        Some(path) => JsonCatalog::load(path)?,
        None => JsonCatalog::default(),
    };

    let mut remaining: &[u8] = &bytes;
    loop {
        if remaining.is_empty() {
            break;
        }
        let mut errors = Vec::new();
        let (message, rest, discarded) =
            remote_fmt::decode::parse(remaining, &catalog, &mut |e| errors.push(e.to_string()));
        if discarded > 0 {
            eprintln!("discarded {discarded} bytes of noise");
        }
        for err in &errors {
            eprintln!("warning: {err}");
        }
        match message {
            Some(text) => println!("{text}"),
            None => break,
        }
        if rest.len() == remaining.len() {
            break;
        }
        remaining = rest;
    }
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();
    match &args.operation {
        Operation::Encode(encode_args) => encode(encode_args),
        Operation::Decode(decode_args) => decode(decode_args),
    }
}
