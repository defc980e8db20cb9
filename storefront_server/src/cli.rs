use std::{env, env::VarError};

/// There's no real CLI for the server, so just do quick 'n dirty
pub fn handle_command_line_args() -> bool {
    let has_cli_args = env::args().count() > 1;
    if has_cli_args {
        // We don't expect any CLI args, so always print the help
        display_readme();
        display_envs();
    }
    has_cli_args
}

fn display_readme() {
    const README: &str = include_str!("./cli-help.txt");
    println!("\n{README}\n");
}

fn display_envs() {
    // Be explicit about which envars to print, so as to avoid accidentally exposing secrets
    const DISPLAY_ENVS: [&str; 18] = [
        "RUST_LOG",
        "SF_HOST",
        "SF_PORT",
        "SF_DATABASE_URL",
        "SF_ADMIN_USERNAME",
        "SF_TOKEN_LIFETIME_HOURS",
        "SF_USE_X_FORWARDED_FOR",
        "SF_USE_FORWARDED",
        "SF_STOREFRONT_URL",
        "SF_STRIPE_API_BASE",
        "SF_STRIPE_WEBHOOK_TOLERANCE",
        "SF_SOLANA_RPC_URL",
        "SF_SOLANA_RECIPIENT",
        "SF_SOLANA_SPL_TOKEN",
        "SF_SOLANA_TOKEN_DECIMALS",
        "SF_ETRANSFER_EMAIL",
        "SF_SHIPPING_FLAT_RATE",
        "SF_FREE_SHIPPING_THRESHOLD",
    ];

    println!("Current environment values (EXCLUDING variables that contain secrets):");
    DISPLAY_ENVS.iter().for_each(|&name| {
        let val = match env::var(name) {
            Ok(s) => s,
            Err(VarError::NotPresent) => "Not set".into(),
            Err(VarError::NotUnicode(s)) => format!("Invalid value: {}", s.to_string_lossy()),
        };
        println!("  {name:<35} {val:<15}");
    })
}
