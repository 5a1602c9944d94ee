use std::{env, net::IpAddr};

use chrono::Duration;
use deposit_engine::{
    db_types::Pesewas,
    engine_api::DepositTerms,
};
use dg_common::{parse_boolean_flag, parse_comma_separated, Secret};
use log::*;
use paystack_tools::PaystackConfig;

const DEFAULT_DG_HOST: &str = "127.0.0.1";
const DEFAULT_DG_PORT: u16 = 8370;
const DEFAULT_CALLBACK_BASE_URL: &str = "http://localhost:3000";

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub paystack: PaystackConfig,
    /// If supplied, requests against the webhook endpoint are checked against this list of Paystack IP addresses.
    /// To explicitly disable the whitelist, set `DG_PAYSTACK_IP_WHITELIST` to "false", "none", or "0".
    pub paystack_whitelist: Option<Vec<IpAddr>>,
    /// If true, the X-Forwarded-For header will be used to determine the client's IP address, rather than the
    /// connection's remote address.
    pub use_x_forwarded_for: bool,
    /// If true, the Forwarded header will be used to determine the client's IP address.
    pub use_forwarded: bool,
    /// The app's base URL. The gateway sends the buyer back to `{callback_base_url}/payment-callback` after checkout.
    pub callback_base_url: String,
    pub auth: AuthConfig,
    /// Shared secret that scheduled-job callers must present
    pub cron_secret: Secret<String>,
    /// Expo push access token. Push delivery is disabled when this is empty.
    pub expo_access_token: Secret<String>,
    pub terms: DepositTerms,
    /// Run the sweeper and reminder jobs in-process, instead of relying on an external cron hitting the job endpoints.
    pub run_scheduler: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_DG_HOST.to_string(),
            port: DEFAULT_DG_PORT,
            database_url: String::default(),
            paystack: PaystackConfig::default(),
            paystack_whitelist: None,
            use_x_forwarded_for: false,
            use_forwarded: false,
            callback_base_url: DEFAULT_CALLBACK_BASE_URL.to_string(),
            auth: AuthConfig::default(),
            cron_secret: Secret::default(),
            expo_access_token: Secret::default(),
            terms: DepositTerms::default(),
            run_scheduler: false,
        }
    }
}

impl ServerConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self { host: host.to_string(), port, ..Default::default() }
    }

    pub fn from_env_or_default() -> Self {
        let host = env::var("DG_HOST").ok().unwrap_or_else(|| DEFAULT_DG_HOST.into());
        let port = env::var("DG_PORT")
            .map(|s| {
                s.parse::<u16>().unwrap_or_else(|e| {
                    error!("🪛️ {s} is not a valid port for DG_PORT. {e} Using the default, {DEFAULT_DG_PORT}, instead.");
                    DEFAULT_DG_PORT
                })
            })
            .ok()
            .unwrap_or(DEFAULT_DG_PORT);
        let database_url = env::var("DG_DATABASE_URL").ok().unwrap_or_else(|| {
            error!("🪛️ DG_DATABASE_URL is not set. Please set it to the URL for the deposit gateway database.");
            String::default()
        });
        let paystack = PaystackConfig::new_from_env_or_default();
        let paystack_whitelist = configure_whitelist();
        let use_x_forwarded_for = parse_boolean_flag(env::var("DG_USE_X_FORWARDED_FOR").ok(), false);
        let use_forwarded = parse_boolean_flag(env::var("DG_USE_FORWARDED").ok(), false);
        let callback_base_url = env::var("DG_CALLBACK_BASE_URL").ok().unwrap_or_else(|| {
            info!("🪛️ DG_CALLBACK_BASE_URL is not set. Using {DEFAULT_CALLBACK_BASE_URL}");
            DEFAULT_CALLBACK_BASE_URL.to_string()
        });
        let auth = AuthConfig::from_env_or_default();
        let cron_secret = Secret::new(env::var("DG_CRON_SECRET").ok().unwrap_or_else(|| {
            warn!("🪛️ DG_CRON_SECRET is not set. The scheduled job endpoints will reject every call.");
            String::default()
        }));
        let expo_access_token = Secret::new(env::var("DG_EXPO_ACCESS_TOKEN").ok().unwrap_or_else(|| {
            info!("🪛️ DG_EXPO_ACCESS_TOKEN is not set. Push notifications are disabled.");
            String::default()
        }));
        let terms = configure_terms();
        let run_scheduler = parse_boolean_flag(env::var("DG_RUN_SCHEDULER").ok(), false);
        Self {
            host,
            port,
            database_url,
            paystack,
            paystack_whitelist,
            use_x_forwarded_for,
            use_forwarded,
            callback_base_url,
            auth,
            cron_secret,
            expo_access_token,
            terms,
            run_scheduler,
        }
    }
}

fn configure_whitelist() -> Option<Vec<IpAddr>> {
    let whitelist = env::var("DG_PAYSTACK_IP_WHITELIST").ok().and_then(|s| {
        if ["none", "false", "0"].contains(&s.to_lowercase().as_str()) {
            info!("🪛️ Paystack IP whitelist is disabled.");
            return None;
        }
        let ip_addrs = parse_comma_separated(&s)
            .into_iter()
            .filter_map(|s| {
                s.parse::<IpAddr>()
                    .map_err(|e| warn!("🪛️ Ignoring invalid IP address ({s}) in DG_PAYSTACK_IP_WHITELIST: {e}"))
                    .ok()
            })
            .collect::<Vec<IpAddr>>();
        Some(ip_addrs)
    });
    match &whitelist {
        Some(whitelist) if whitelist.is_empty() => {
            warn!(
                "🚨️ The Paystack IP whitelist was configured, but is empty. The server will run, but won't accept any \
                 webhook deliveries."
            );
        },
        None => {
            info!("🪛️ No Paystack IP whitelist is set. Only signature validation will be used.");
        },
        Some(v) => {
            let addrs = v.iter().map(|a| a.to_string()).collect::<Vec<_>>().join(", ");
            info!("🪛️ Paystack IP whitelist: {addrs}");
        },
    }
    whitelist
}

fn configure_terms() -> DepositTerms {
    let defaults = DepositTerms::default();
    let amount_per_unit = env_i64("DG_DEPOSIT_AMOUNT_PER_UNIT")
        .filter(|v| {
            let valid = *v > 0;
            if !valid {
                warn!("🪛️ DG_DEPOSIT_AMOUNT_PER_UNIT must be positive. Using the default");
            }
            valid
        })
        .map(Pesewas::from)
        .unwrap_or(defaults.amount_per_unit);
    let pending_hold = env_i64("DG_PENDING_HOLD_MINUTES").map(Duration::minutes).unwrap_or(defaults.pending_hold);
    let paid_hold = env_i64("DG_PAID_HOLD_HOURS").map(Duration::hours).unwrap_or(defaults.paid_hold);
    info!(
        "🪛️ Deposit terms: {amount_per_unit} per unit, {} min pending hold, {} hr paid hold",
        pending_hold.num_minutes(),
        paid_hold.num_hours()
    );
    DepositTerms { amount_per_unit, pending_hold, paid_hold }
}

fn env_i64(name: &str) -> Option<i64> {
    let s = env::var(name).ok()?;
    s.parse::<i64>().map_err(|e| warn!("🪛️ Invalid configuration value for {name} ({s}). {e}")).ok()
}

//-------------------------------------------------  AuthConfig  -------------------------------------------------------
/// Where user session tokens are checked.
#[derive(Clone, Debug, Default)]
pub struct AuthConfig {
    /// Base URL of the auth platform. Tokens are checked against `{auth_url}/auth/v1/user`.
    pub auth_url: String,
    pub api_key: Secret<String>,
}

impl AuthConfig {
    pub fn from_env_or_default() -> Self {
        let auth_url = env::var("DG_AUTH_URL").ok().unwrap_or_else(|| {
            error!("🪛️ DG_AUTH_URL is not set. Authenticated endpoints will reject every call.");
            String::default()
        });
        let api_key = Secret::new(env::var("DG_AUTH_API_KEY").ok().unwrap_or_else(|| {
            warn!("🪛️ DG_AUTH_API_KEY is not set.");
            String::default()
        }));
        Self { auth_url: auth_url.trim_end_matches('/').to_string(), api_key }
    }
}

//-------------------------------------------------  GuardConfig  ----------------------------------------------------
/// The part of the configuration that the request guards in [`crate::middleware`] need. It is registered as app data,
/// and the guards look it up on every request.
#[derive(Clone, Debug, Default)]
pub struct GuardConfig {
    pub paystack_secret: Secret<String>,
    pub cron_secret: Secret<String>,
    pub paystack_whitelist: Option<Vec<IpAddr>>,
    pub use_x_forwarded_for: bool,
    pub use_forwarded: bool,
}

impl GuardConfig {
    pub fn from_config(config: &ServerConfig) -> Self {
        Self {
            paystack_secret: config.paystack.secret_key.clone(),
            cron_secret: config.cron_secret.clone(),
            paystack_whitelist: config.paystack_whitelist.clone(),
            use_x_forwarded_for: config.use_x_forwarded_for,
            use_forwarded: config.use_forwarded,
        }
    }
}
