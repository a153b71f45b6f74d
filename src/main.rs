use std::env;
use std::io::SeekFrom;
use std::process;
use std::sync::Arc;
use tail_file::Error;
use tokio::io::{AsyncWriteExt, Stdout};

const LOG_ENV: &str = "TAIL_FILE_LOG";

#[tokio::main]
async fn main() {
    init_logging();

    let args: Vec<String> = env::args().collect();

    if args.len() != 2 {
        eprintln!("Usage: {} <file_path>", args[0]);
        process::exit(1);
    }

    let file_path = &args[1];

    let file = match tail_file::follow(file_path).await {
        Ok(file) => Arc::new(file),
        Err(e) => {
            eprintln!("Error opening file: {}", e);
            process::exit(1);
        }
    };

    if let Err(e) = file.seek(SeekFrom::End(0)).await {
        eprintln!("Error seeking to end of file: {}", e);
        process::exit(1);
    }

    let closer = Arc::clone(&file);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let _ = closer.close().await;
        }
    });

    let mut stdout = tokio::io::stdout();
    let mut buf = vec![0u8; 8192];
    loop {
        match file.read(&mut buf).await {
            Ok(n) => {
                if let Err(e) = write_out(&mut stdout, &buf[..n]).await {
                    eprintln!("Error writing output: {}", e);
                    process::exit(1);
                }
            }
            Err(Error::Rotated { path }) => {
                eprintln!("{} was rotated, stopping", path.display());
                break;
            }
            Err(Error::Closed) => break,
            Err(e) => {
                eprintln!("Error reading file: {}", e);
                process::exit(1);
            }
        }
    }

    let _ = file.close().await;
}

async fn write_out(stdout: &mut Stdout, bytes: &[u8]) -> std::io::Result<()> {
    stdout.write_all(bytes).await?;
    stdout.flush().await
}

fn init_logging() {
    let level = env::var(LOG_ENV)
        .ok()
        .and_then(|s| parse_level_str(&s))
        .unwrap_or(tracing::Level::WARN);

    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();
}

fn parse_level_str(s: &str) -> Option<tracing::Level> {
    match s.trim().to_lowercase().as_str() {
        "error" => Some(tracing::Level::ERROR),
        "warn" | "warning" => Some(tracing::Level::WARN),
        "info" => Some(tracing::Level::INFO),
        "debug" => Some(tracing::Level::DEBUG),
        "trace" => Some(tracing::Level::TRACE),
        _ => None,
    }
}
