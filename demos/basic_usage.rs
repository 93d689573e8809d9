// demos/basic_usage.rs
// Run with: cargo run --example basic_usage

use rusty_ftps::{DeleteOutcome, FtpsSession, SessionConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    // 1. Describe the server. Port 990 and active mode are the defaults.
    let config = SessionConfig::new("your_username", "your_password", "ftp.example.com")
        .initial_path("outgoing/")
        .passive_mode(true);

    // 2. Create the session; nothing connects until the first operation
    let mut session = FtpsSession::from_config(config)?;
    println!("✅ Session ready for {}", session.url());

    // 3. List the remote directory
    println!("\n📂 Listing files...");
    for line in session.raw_list().await? {
        println!("  {}", line);
    }
    let names = session.n_list().await?;
    println!("Found {} files", names.len());

    // 4. Upload a file
    println!("\n⬆️  Uploading file...");
    session
        .upload("document.pdf", "/local/path/document.pdf")
        .await?;
    println!("✅ Upload completed");

    // 5. Check its size on the server
    let size = session.remote_file_size("document.pdf").await?;
    if size < 0 {
        println!("⚠️  Server did not report a size");
    } else {
        println!("📏 Remote size: {} bytes", size);
    }

    // 6. Download a file
    println!("\n⬇️  Downloading file...");
    let content = session
        .download("/local/path/config.json", "config.json")
        .await?;
    println!("✅ Downloaded {} bytes", content.len());

    // 7. Delete the uploaded file
    match session.delete("document.pdf").await? {
        DeleteOutcome::Deleted(url) => println!("🗑️  Deleted {}", url),
        DeleteOutcome::NotConfirmed => println!("❌ File still listed after delete"),
    }

    // 8. Cleanup
    println!("\n🧹 Cleaning up...");
    session.close();

    println!("✅ All done!");
    Ok(())
}
