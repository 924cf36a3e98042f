//! Command-line arguments

/// Run mode
#[derive(Debug, PartialEq, Eq)]
pub enum RunMode {
    /// Serve the webhook and dashboard
    Server,
    /// Show help
    Help,
    /// Show version
    Version,
}

/// Parse command line arguments (without the program name)
pub fn parse_args<I>(args: I) -> RunMode
where
    I: IntoIterator<Item = String>,
{
    for arg in args {
        match arg.as_str() {
            "--help" | "-h" => return RunMode::Help,
            "--version" | "-v" => return RunMode::Version,
            _ => {}
        }
    }

    RunMode::Server
}

/// Print help message
pub fn print_help() {
    println!("sme-gateway - LINE Official Account bot for Thai SMEs");
    println!();
    println!("Usage:");
    println!("  sme-gateway           Start the webhook and admin dashboard");
    println!("  sme-gateway --help    Show this help message");
    println!("  sme-gateway --version Show version");
    println!();
    println!("Settings are read from ./sme-bot.toml (optional) and environment variables.");
    println!("A .env file in the working directory is loaded first.");
    println!();
    println!("Environment Variables:");
    println!("  LINE_CHANNEL_ACCESS_TOKEN  LINE channel access token (required)");
    println!("  LINE_CHANNEL_SECRET        LINE channel secret (required)");
    println!("  AZURE_OPENAI_API_KEY       Azure OpenAI key (required)");
    println!("  AZURE_OPENAI_ENDPOINT      Azure OpenAI resource endpoint (required)");
    println!("  AZURE_OPENAI_DEPLOYMENT    Deployment name (default: gpt-4.1-nano)");
    println!("  AZURE_OPENAI_API_VERSION   API version (default: 2024-02-01)");
    println!("  HOST / PORT                Bind address (default: 0.0.0.0:5000)");
    println!("  ADMIN_API_KEY              Bearer key for /api/* (optional)");
    println!("  DATABASE_PATH              SQLite file (default: data/sme-bot.db)");
    println!("  CONSOLE_ONLY_LOGGING       true = no database, console logs only");
    println!("  RATE_LIMIT_PER_USER        Messages per window (default: 10)");
    println!("  RATE_LIMIT_WINDOW_SECS     Window length (default: 60)");
    println!("  MAX_CONVERSATION_HISTORY   Remembered exchanges (default: 10)");
    println!("  SESSION_TIMEOUT_SECS       Idle session expiry (default: 3600)");
    println!("  DEFAULT_LANGUAGE           th, en, ja, ko or zh (default: th)");
    println!("  RUST_LOG                   Log filter (default: info)");
}
