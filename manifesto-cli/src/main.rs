use anyhow::{Context, Result};
use clap::{ArgAction, Parser};
use log::{info, LevelFilter};
use simplelog::{ColorChoice, Config, TermLogger, TerminalMode};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

use manifesto_core::mnfs;
use manifesto_core::{compile, VidPid};

#[derive(Parser)]
#[command(name = "manifesto", version, about = "Compile a .mnfs manifest source into a binary .mnfb")]
struct Cli {
    /// Manifest source (.mnfs)
    input: PathBuf,
    /// Vendor id override (hex), ignores the header's vendor-id
    #[arg(value_parser = parse_hex_u32, requires = "pid")]
    vid: Option<u32>,
    /// Product id override (hex), ignores the header's product-id
    #[arg(value_parser = parse_hex_u32)]
    pid: Option<u32>,
    /// Output path [default: <input>.mnfb next to the input]
    #[arg(short, long)]
    output: Option<PathBuf>,
    /// More log output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

fn parse_hex_u32(s: &str) -> std::result::Result<u32, String> {
    mnfs::parse_hex(s)
        .and_then(|v| u32::try_from(v).ok())
        .ok_or_else(|| format!("expected a 32-bit hex value, got {s:?}"))
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    let _ = TermLogger::init(level, Config::default(), TerminalMode::Stderr, ColorChoice::Auto);
}

fn default_output(input: &Path) -> PathBuf {
    input.with_extension("mnfb")
}

fn main() -> Result<()> {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            // usage errors exit 1; --help / --version exit 0
            let code = if e.use_stderr() { 1 } else { 0 };
            let _ = e.print();
            std::process::exit(code);
        }
    };
    init_logging(cli.verbose);

    let overrides = match (cli.vid, cli.pid) {
        (Some(vendor_id), Some(product_id)) => Some(VidPid { vendor_id, product_id }),
        _ => None,
    };
    let output = cli.output.unwrap_or_else(|| default_output(&cli.input));
    build(&cli.input, &output, overrides)
}

fn build(input: &Path, output: &Path, overrides: Option<VidPid>) -> Result<()> {
    let text =
        fs::read_to_string(input).with_context(|| format!("read {}", input.display()))?;
    let records = mnfs::parse(&text)?;
    let manifest = compile(&records, overrides)?;

    // stage next to the target; the temp file is removed unless persisted
    let dir = match output.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let mut tmp = NamedTempFile::new_in(dir)
        .with_context(|| format!("create temporary file in {}", dir.display()))?;
    tmp.write_all(manifest.as_bytes()).with_context(|| format!("write {}", output.display()))?;
    tmp.persist(output)
        .map_err(|e| e.error)
        .with_context(|| format!("create {}", output.display()))?;
    info!("wrote {} bytes to {}", manifest.len(), output.display());
    Ok(())
}
