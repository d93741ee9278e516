//! asymcrypt command-line front end
//!
//! - `demo` runs encrypt, decrypt, sign and verify for one algorithm
//! - `serve` answers JSON-lines requests on stdin, one response line each
//!
//! Log verbosity follows `RUST_LOG` (default `info`); logs go to stderr.

use asymcrypt::{Algorithm, CryptoConfig, Dispatcher, Request, Response};
use clap::{Parser, Subcommand};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "asymcrypt")]
#[command(about = "RSA, ElGamal and elliptic-curve encryption and signatures", long_about = None)]
struct Cli {
    /// JSON configuration file; missing fields use defaults
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Round-trip one message through a single algorithm
    Demo {
        /// RSA, ELGAMAL or ECC
        #[arg(long, short = 'a', default_value = "ELGAMAL")]
        algorithm: String,

        #[arg(long, short = 'm', default_value = "Hello, ElGamal!")]
        message: String,
    },
    /// Read JSON-lines requests from stdin and answer on stdout
    Serve,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let config = match &cli.config {
        Some(path) => CryptoConfig::from_json_file(path)?,
        None => CryptoConfig::default(),
    };

    match cli.command {
        Commands::Demo { algorithm, message } => {
            let algorithm: Algorithm = algorithm.parse()?;
            let dispatcher = Dispatcher::generate(&config)?;
            demo(&dispatcher, algorithm, &message)
        }
        Commands::Serve => {
            let dispatcher = Dispatcher::generate(&config)?;
            info!("serving JSON-lines requests on stdin");
            serve(&dispatcher, io::stdin().lock(), io::stdout().lock())
        }
    }
}

fn demo(
    dispatcher: &Dispatcher,
    algorithm: Algorithm,
    message: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    println!("=== {} ===\n", algorithm);
    println!("message:    {}", message);

    let ciphertext = dispatcher.encrypt(algorithm, message)?;
    println!("ciphertext: {}", ciphertext);

    let decrypted = dispatcher.decrypt(algorithm, &ciphertext)?;
    println!("decrypted:  {}", decrypted);

    let signature = dispatcher.sign(algorithm, message)?;
    println!("signature:  {}", signature);

    let valid = dispatcher.verify(algorithm, message, &signature)?;
    println!("verified:   {}", valid);

    if decrypted != message || !valid {
        return Err("round trip failed".into());
    }
    Ok(())
}

/// Answers one JSON response line per request line until `input` ends
///
/// Lines are read as raw bytes, so a line that is not UTF-8 or not a valid
/// request gets an `invalid_request` response instead of ending the loop.
/// Only an I/O error on either stream stops serving.
fn serve<R: BufRead, W: Write>(
    dispatcher: &Dispatcher,
    mut input: R,
    mut output: W,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut line = Vec::new();
    loop {
        line.clear();
        if input.read_until(b'\n', &mut line)? == 0 {
            break;
        }
        if line.trim_ascii().is_empty() {
            continue;
        }

        let response = match serde_json::from_slice::<Request>(&line) {
            Ok(request) => dispatcher.handle(&request),
            Err(e) => {
                warn!("rejected malformed request: {}", e);
                Response::invalid_request(e.to_string())
            }
        };

        serde_json::to_writer(&mut output, &response)?;
        writeln!(output)?;
        output.flush()?;
    }

    Ok(())
}
