#![deny(dead_code)] // DO NOT REMOVE THIS EVER
use anyhow::{Context, Result};
use clap::Parser;
use log::{error, info};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};

use skillmate::{
    config,
    utils,
    Connection, ConnectionList, DebouncedSearch, HttpApi, RequestService, SocialApi, Toaster, ToastKind,
    WsPushChannel,
};

/// Command line arguments for SkillMate
#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "SkillMate: live connection list and user search from the terminal.",
    long_about = "SkillMate keeps your connection list in sync with the backend and its push channel.\n\n\
    Type to search users. Commands:\n\
    /list                 Show connections (with the current filter)\n\
    /filter <text>        Filter connections by name (empty to reset)\n\
    /connect <userId>     Send a connection request\n\
    /enroll <projectId>   Ask to contribute to a project\n\
    /refresh              Re-fetch the connection list\n\
    /quit                 Exit"
)]
struct Args {
    /// Settings file to use instead of the per-user one
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Write logs to this file instead of stdout
    #[arg(long, value_name = "PATH")]
    log_file: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn print_connections(connections: &[Connection], unread: u32) {
    println!("--- {} connection(s), {} unread ---", connections.len(), unread);
    for conn in connections {
        let at = conn
            .last_message_at
            .map(|t| t.with_timezone(&chrono::Local).format("%I:%M %p").to_string())
            .unwrap_or_default();
        let badge = if conn.unread_count > 0 {
            format!(" ({})", conn.unread_count)
        } else {
            String::new()
        };
        println!("  {}{}  {}  {}", conn.peer.display_name, badge, conn.preview_or_placeholder(), at);
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let log_file = args.log_file.as_ref().map(|p| p.display().to_string());
    utils::setup_logging(log_file.as_deref(), utils::parse_level(&args.log_level))?;
    info!("SkillMate client starting up");

    if let Some(path) = args.config {
        config::set_settings_path_override(path);
    }
    let settings = config::load_settings().context("failed to load settings")?;
    info!("Backend: {}, push: {}", settings.backend_url, settings.push_url);

    let api: Arc<dyn SocialApi> = Arc::new(
        HttpApi::new(&settings.backend_url, settings.request_timeout())?.with_paths(settings.paths.clone()),
    );
    let channel = Arc::new(WsPushChannel::connect(&settings.push_url, settings.reconnect_delay())?);
    let toaster = Toaster::with_ttl(settings.toast_ttl());

    // Toast banner
    let mut toasts = toaster.subscribe();
    tokio::spawn(async move {
        while toasts.changed().await.is_ok() {
            if let Some(toast) = toasts.borrow_and_update().clone() {
                let tag = match toast.kind {
                    ToastKind::Success => "ok",
                    ToastKind::Error => "error",
                };
                println!("[{}] {}", tag, toast.text);
            }
        }
    });

    let search = DebouncedSearch::with_delay(api.clone(), settings.debounce());
    let mut results = search.subscribe_results();
    tokio::spawn(async move {
        while results.changed().await.is_ok() {
            let users = results.borrow_and_update().clone();
            if users.is_empty() {
                continue;
            }
            println!("--- {} user(s) found ---", users.len());
            for user in users {
                println!("  {}  (/connect {})", user.display_name, user.id);
            }
        }
    });

    let requests = RequestService::new(api.clone(), toaster.clone());
    let mut list = ConnectionList::new(api, channel, toaster);

    println!("Connecting to {}... please wait...\n", settings.backend_url);
    list.mount(settings.user_id.as_deref()).await?;
    print_connections(&list.visible(""), list.total_unread());

    let mut filter = String::new();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim_end();
        let (command, rest) = line.split_once(' ').unwrap_or((line, ""));

        match command {
            "/quit" => break,
            "/list" => print_connections(&list.visible(&filter), list.total_unread()),
            "/filter" => {
                filter = rest.to_string();
                print_connections(&list.visible(&filter), list.total_unread());
            }
            "/refresh" => {
                if list.refresh().await {
                    print_connections(&list.visible(&filter), list.total_unread());
                }
            }
            "/connect" | "/enroll" => {
                let requests = requests.clone();
                let target = rest.trim().to_string();
                let enroll = command == "/enroll";
                tokio::spawn(async move {
                    let result = if enroll {
                        requests.send_contribution(&target).await
                    } else {
                        requests.send(&target).await
                    };
                    if let Err(e) = result {
                        error!("{} {}: {}", if enroll { "Enroll" } else { "Connect" }, target, e);
                        println!("[error] {}", e);
                    }
                });
            }
            _ => search.input(line),
        }
    }

    list.unmount();
    info!("SkillMate client shutting down");
    Ok(())
}
