// demos/blocking_usage.rs
// Run with: cargo run --example blocking_usage

use rusty_ftps::blocking::FtpsSession;
use rusty_ftps::{DEFAULT_PORT, Error};

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let mut session = FtpsSession::new(
        "your_username",
        "your_password",
        "ftp.example.com",
        DEFAULT_PORT,
        "",
        false,
    )?;

    // Each call blocks until the transfer finishes or times out (30s)
    match session.upload("report.csv", "/tmp/report.csv") {
        Ok(()) => println!("✅ report.csv uploaded"),
        Err(Error::Transfer { code, message }) => {
            println!("❌ Upload failed with code {}: {}", code, message);
        }
        Err(e) => return Err(e.into()),
    }

    for name in session.n_list()? {
        println!("  - {}", name);
    }

    // Dropping the session releases the engine as well
    session.close();
    Ok(())
}
