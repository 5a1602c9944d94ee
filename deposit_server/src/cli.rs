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
    const DISPLAY_ENVS: [&str; 15] = [
        "RUST_LOG",
        "DG_HOST",
        "DG_PORT",
        "DG_DATABASE_URL",
        "DG_USE_X_FORWARDED_FOR",
        "DG_USE_FORWARDED",
        "DG_PAYSTACK_BASE_URL",
        "DG_PAYSTACK_IP_WHITELIST",
        "DG_GATEWAY_TIMEOUT_SECS",
        "DG_CALLBACK_BASE_URL",
        "DG_AUTH_URL",
        "DG_RUN_SCHEDULER",
        "DG_DEPOSIT_AMOUNT_PER_UNIT",
        "DG_PENDING_HOLD_MINUTES",
        "DG_PAID_HOLD_HOURS",
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
