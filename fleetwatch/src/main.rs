//! Entry point for the fleetwatch TUI. Parses args, resolves the profile and runs the App.

use std::env;
use std::io::{self, Write};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use fleetwatch::api::ApiClient;
use fleetwatch::app::App;
use fleetwatch::profiles::{
    compare_profile, load_profiles, save_profiles, ProfileChange, ProfileEntry, ProfileRequest,
    ResolveProfile,
};
use fleetwatch::{demo, logging};
use tracing::{info, warn};

const USAGE: &str = "[--tls-ca CERT_PEM|-t CERT_PEM] [--profile NAME|-P NAME] [--save] [--demo] [--dry-run] [--log-file PATH] [http://HOST:PORT]";

struct ParsedArgs {
    url: Option<String>,
    tls_ca: Option<String>,
    profile: Option<String>,
    log_file: Option<PathBuf>,
    save: bool,
    demo: bool,
    dry_run: bool,
}

fn parse_args<I: IntoIterator<Item = String>>(args: I) -> Result<ParsedArgs, String> {
    let mut it = args.into_iter();
    let prog = it.next().unwrap_or_else(|| "fleetwatch".into());
    let mut url: Option<String> = None;
    let mut tls_ca: Option<String> = None;
    let mut profile: Option<String> = None;
    let mut log_file: Option<PathBuf> = None;
    let mut save = false; // --save
    let mut demo = false; // --demo
    let mut dry_run = false; // --dry-run

    while let Some(arg) = it.next() {
        match arg.as_str() {
            "-h" | "--help" => return Err(format!("Usage: {prog} {USAGE}")),
            "--tls-ca" | "-t" => tls_ca = it.next(),
            "--profile" | "-P" => profile = it.next(),
            "--log-file" => log_file = it.next().map(PathBuf::from),
            "--save" => save = true,
            "--demo" => demo = true,
            "--dry-run" => dry_run = true,
            _ if arg.starts_with("--tls-ca=") || arg.starts_with("--profile=") => {
                if let Some((k, v)) = arg.split_once('=') {
                    if !v.is_empty() {
                        if k == "--tls-ca" {
                            tls_ca = Some(v.to_string());
                        } else {
                            profile = Some(v.to_string());
                        }
                    }
                }
            }
            _ if arg.starts_with('-') => {
                return Err(format!("Unknown option {arg}. Usage: {prog} {USAGE}"));
            }
            _ => {
                if url.is_none() {
                    url = Some(arg);
                } else {
                    return Err(format!("Unexpected argument. Usage: {prog} {USAGE}"));
                }
            }
        }
    }
    Ok(ParsedArgs { url, tls_ca, profile, log_file, save, demo, dry_run })
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let parsed = match parse_args(env::args()) {
        Ok(v) => v,
        Err(msg) => {
            let help = msg.starts_with("Usage:");
            eprintln!("{msg}");
            if help {
                return Ok(());
            }
            std::process::exit(2);
        }
    };

    let log_path = parsed.log_file.clone().unwrap_or_else(logging::default_log_path);
    if let Err(e) = logging::init(&log_path) {
        eprintln!("fleetwatch: logging disabled ({}): {e}", log_path.display());
    }

    // Demo mode short-circuit (ignore other args)
    if parsed.demo || matches!(parsed.profile.as_deref(), Some("demo")) {
        return run_demo_mode(parsed.dry_run).await;
    }

    let Some((url, tls_ca)) = resolve_connection(&parsed)? else {
        return Ok(());
    };

    if parsed.dry_run {
        match &tls_ca {
            Some(ca) => println!("fleetwatch: would connect to {url} (tls ca {ca})"),
            None => println!("fleetwatch: would connect to {url}"),
        }
        return Ok(());
    }

    let api = ApiClient::new(&url, tls_ca.as_deref().map(Path::new))?;
    let mut app = App::new(api, url);
    app.run().await
}

/// Work out the server to use, persisting the profile when asked to.
fn resolve_connection(parsed: &ParsedArgs) -> anyhow::Result<Option<(String, Option<String>)>> {
    let profiles_file = load_profiles();
    let req = ProfileRequest {
        profile_name: parsed.profile.clone(),
        url: parsed.url.clone(),
        tls_ca: parsed.tls_ca.clone(),
    };
    let mut profiles_mut = profiles_file.clone();

    let resolved = match req.resolve(&profiles_file) {
        ResolveProfile::Direct(u, t) => {
            if let Some(name) = parsed.profile.as_ref() {
                let entry = ProfileEntry { url: u.clone(), tls_ca: t.clone() };
                let store = match compare_profile(&profiles_mut, name, &entry) {
                    // New profile: auto-save immediately
                    ProfileChange::New => true,
                    ProfileChange::Changed => {
                        parsed.save
                            || prompt_yes_no(&format!("Overwrite existing profile '{name}'? [y/N]: "))
                    }
                    ProfileChange::Unchanged => false,
                };
                if store {
                    profiles_mut.profiles.insert(name.clone(), entry);
                    persist(&profiles_mut);
                }
            }
            (u, t)
        }
        ResolveProfile::Loaded(u, t) => (u, t),
        ResolveProfile::PromptSelect(names) => {
            eprintln!("Select profile:");
            for (i, n) in names.iter().enumerate() {
                eprintln!("  {}. {}", i + 1, n);
            }
            let line = prompt_string("Enter number (or blank to abort): ")?;
            let Some(name) = line
                .trim()
                .parse::<usize>()
                .ok()
                .and_then(|idx| idx.checked_sub(1))
                .and_then(|idx| names.get(idx))
            else {
                return Ok(None);
            };
            match profiles_mut.profiles.get(name) {
                Some(entry) => (entry.url.clone(), entry.tls_ca.clone()),
                None => return Ok(None),
            }
        }
        ResolveProfile::PromptCreate(name) => {
            eprintln!("Profile '{name}' does not exist yet.");
            let url = prompt_string("Enter server URL (http://HOST:PORT or https://...): ")?;
            if url.trim().is_empty() {
                return Ok(None);
            }
            let ca = prompt_string("Enter TLS CA path (or leave blank): ")?;
            let ca_opt = Some(ca.trim().to_string()).filter(|c| !c.is_empty());
            let entry = ProfileEntry { url: url.trim().to_string(), tls_ca: ca_opt.clone() };
            profiles_mut.profiles.insert(name, entry);
            persist(&profiles_mut);
            (url.trim().to_string(), ca_opt)
        }
        ResolveProfile::None => {
            eprintln!("No URL provided and no profiles to select.");
            return Ok(None);
        }
    };
    Ok(Some(resolved))
}

fn persist(p: &fleetwatch::profiles::ProfilesFile) {
    match save_profiles(p) {
        Ok(()) => info!("profiles saved"),
        Err(e) => {
            warn!(error = %e, "saving profiles failed");
            eprintln!("fleetwatch: could not save profiles: {e}");
        }
    }
}

fn prompt_yes_no(prompt: &str) -> bool {
    eprint!("{prompt}");
    let _ = io::stderr().flush();
    let mut line = String::new();
    if io::stdin().read_line(&mut line).is_ok() {
        matches!(line.trim().to_ascii_lowercase().as_str(), "y" | "yes")
    } else {
        false
    }
}

fn prompt_string(prompt: &str) -> io::Result<String> {
    eprint!("{prompt}");
    let _ = io::stderr().flush();
    let mut line = String::new();
    io::stdin().read_line(&mut line)?;
    Ok(line)
}

// --- Demo Mode ---

async fn run_demo_mode(dry_run: bool) -> anyhow::Result<()> {
    let (addr, server) = demo::spawn(SocketAddr::from(([127, 0, 0, 1], 0))).await?;
    let url = format!("http://{addr}");
    if dry_run {
        println!("fleetwatch: demo fleet at {url}");
        server.abort();
        return Ok(());
    }
    let api = ApiClient::new(&url, None)?;
    let mut app = App::new(api, format!("demo ({url})"));
    // Use select to handle Ctrl-C and normal quit
    let res = tokio::select! {
        res = app.run() => res,
        _ = tokio::signal::ctrl_c() => Ok(()),
    };
    server.abort();
    res
}
