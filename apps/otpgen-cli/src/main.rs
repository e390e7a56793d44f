use std::io::{self, Write};

use clap::Parser;
use otpgen::{OtpError, OtpHashAlgorithm, Totp, TotpEngine};
use tracing::debug;

/// TOTP generator (RFC 6238)
#[derive(Debug, Parser)]
#[command(name = "otpgen", version)]
struct Cli {
    /// Base32 encoded shared secret
    #[arg(long)]
    secret: String,

    /// Number of digits of the code (6 to 10)
    #[arg(long, default_value_t = 6, allow_negative_numbers = true)]
    digits: i64,

    /// Time step in seconds
    #[arg(long, default_value_t = 30, allow_negative_numbers = true)]
    interval: i64,

    /// Use this time step instead of the current one
    #[arg(long)]
    counter: Option<u64>,

    /// HMAC hash: SHA1, SHA256 or SHA512
    #[arg(long, default_value_t = OtpHashAlgorithm::SHA1)]
    algorithm: OtpHashAlgorithm,

    /// Print every intermediate value of the computation to stderr
    #[arg(long)]
    debug: bool,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    run(&cli, &TotpEngine::new(), &mut io::stdout(), &mut io::stderr())
}

fn run<O, E>(cli: &Cli, engine: &TotpEngine, out: &mut O, err: &mut E) -> anyhow::Result<()>
where
    O: Write,
    E: Write,
{
    let digits = u32::try_from(cli.digits).map_err(|_| OtpError::InvalidDigits(cli.digits))?;

    let mut totp = Totp::new(cli.secret.as_str());
    totp.with_digits(digits)
        .with_period(cli.interval)
        .with_algorithm(cli.algorithm);

    // The clock is read once so the code and the remaining time agree
    let now = match cli.counter {
        Some(_) => None,
        None => Some(engine.now()?),
    };
    let result = totp.resolve(now.unwrap_or_default(), cli.counter)?;
    debug!(
        digits,
        interval = cli.interval,
        counter = result.counter,
        "generated code"
    );

    if cli.debug {
        let trace = totp.trace(result.counter)?;
        if let Some(now) = now {
            writeln!(err, "Current Time (UTC): {now}")?;
        }
        writeln!(err, "Time Step: {}", trace.counter)?;
        writeln!(err, "Time Bytes: {}", trace.counter_hex())?;
        writeln!(err, "HMAC-{}: {}", cli.algorithm, trace.digest_hex())?;
        writeln!(err, "Offset: {}", trace.offset)?;
        writeln!(err, "Truncated Hash: {}", trace.truncated)?;
        writeln!(err, "Final Code: {}", trace.code)?;
    }

    writeln!(out, "TOTP: {}", result.code)?;
    if let Some(now) = now {
        writeln!(out, "Valid for: {}s", totp.remaining_seconds(now)?)?;
    }

    Ok(())
}
