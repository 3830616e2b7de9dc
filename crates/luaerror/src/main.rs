use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use luaerror_core::parser::ErrorParser;
use luaerror_core::symbols::table::{self, HANDLE_CLIENT_LUA_ERROR, HANDLE_CLIENT_LUA_ERROR_SIGNATURES};
use luaerror_core::symbols::{display_name, HostFlavor, ImageScanner, Signature};
use luaerror_core::types::TracebackEntry;
use luaerror_utils::{debug, init_logging, init_logging_with_level, LogFormat, LogLevel, LoggingError};

/// Inspect Lua error strings, binary images and hook signatures.
#[derive(Parser, Debug)]
#[command(name = "luaerror")]
#[command(version)]
#[command(about = "Inspect Lua error strings, binary images and hook signatures", long_about = None)]
struct Cli
{
    /// Log level (error, warn, info, debug, trace); defaults to `RUST_LOG`
    #[arg(long, global = true)]
    log_level: Option<String>,
    /// Emit logs as JSON
    #[arg(long, global = true, default_value_t = false)]
    json: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands
{
    /// Decode an error message (location, message and traceback)
    Parse
    {
        /// File holding the message, or `-` for stdin
        #[arg(default_value = "-")]
        input: String,
    },
    /// Resolve a signature inside an image on disk
    Scan
    {
        /// Path to the binary image
        image: PathBuf,
        /// `@symbol` or hex bytes with `??` wildcards
        signature: String,
    },
    /// List the built-in signatures of hooked functions
    Signatures,
}

fn main()
{
    let cli = Cli::parse();

    let _guard = match start_logging(&cli) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {e}");
            process::exit(1);
        }
    };

    if let Err(e) = run_command(cli) {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn start_logging(cli: &Cli) -> Result<luaerror_utils::LoggingGuard, LoggingError>
{
    let level = match cli.log_level.as_deref() {
        Some(level) => level.parse::<LogLevel>().map_err(LoggingError::InvalidLevel)?,
        // Environment decides both level and format
        None if !cli.json => return init_logging(),
        None => LogLevel::Warn,
    };
    let format = if cli.json { LogFormat::Json } else { LogFormat::Pretty };
    init_logging_with_level(level, format)
}

fn run_command(cli: Cli) -> Result<(), Box<dyn std::error::Error>>
{
    match cli.command {
        Commands::Parse { input } => {
            let text = read_input(&input)?;
            print_decoded(&text);
            Ok(())
        }
        Commands::Scan { image, signature } => {
            let signature = Signature::parse(&signature)?;
            debug!(image = %image.display(), %signature, "scanning image");
            match ImageScanner::new().scan_file(&image, &signature)? {
                Some(hit) => {
                    println!("address: {}", hit.address);
                    if let Some(section) = hit.section {
                        println!("section: {section}");
                    }
                    if let Some(symbol) = hit.symbol {
                        println!("symbol:  {}", display_name(&symbol));
                    }
                    Ok(())
                }
                None => Err(format!("{signature} not found in {}", image.display()).into()),
            }
        }
        Commands::Signatures => {
            println!("{HANDLE_CLIENT_LUA_ERROR}");
            for entry in HANDLE_CLIENT_LUA_ERROR_SIGNATURES {
                let flavor = entry.flavor.map_or_else(|| "any".to_string(), |flavor| flavor.to_string());
                let binary = table::server_binary(entry.os, entry.flavor.unwrap_or(HostFlavor::Dedicated));
                println!("  {:<8} {flavor:<10} {binary:<32} {}", entry.os.to_string(), entry.signature);
            }
            Ok(())
        }
    }
}

fn read_input(input: &str) -> io::Result<String>
{
    if input == "-" {
        let mut text = String::new();
        io::stdin().read_to_string(&mut text)?;
        Ok(text)
    } else {
        fs::read_to_string(input)
    }
}

fn print_decoded(text: &str)
{
    let parser = ErrorParser::default();
    let trimmed = text.trim();
    let cleaned = parser.strip_tag(trimmed);
    let decoded = parser.decode(cleaned);

    println!("tag stripped: {}", cleaned.len() != trimmed.len());
    match &decoded.parsed {
        Some(parsed) => {
            println!("source:  {}", parsed.source_file);
            println!("line:    {}", parsed.line);
            println!("message: {}", parsed.message);
        }
        None => println!("location: (not recognised)"),
    }
    println!("traceback: {} entries", decoded.traceback.len());
    for TracebackEntry {
        level,
        name,
        source,
        currentline,
    } in &decoded.traceback
    {
        println!("  {level:>3}. {name} - {source}:{currentline}");
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn test_logging_defaults_to_environment()
    {
        let cli = Cli::try_parse_from(["luaerror", "signatures"]).unwrap();
        assert!(cli.log_level.is_none());
        assert!(start_logging(&cli).is_ok());
    }

    #[test]
    fn test_bad_log_level_rejected()
    {
        let cli = Cli::try_parse_from(["luaerror", "--log-level", "loud", "signatures"]).unwrap();
        assert!(matches!(start_logging(&cli), Err(LoggingError::InvalidLevel(_))));
    }
}
