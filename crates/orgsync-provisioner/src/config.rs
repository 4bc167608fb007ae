use std::path::Path;

use config::{Config, Environment, File, FileFormat, Source};
use orgsync_token::claim::DEFAULT_ROLE_CLAIM;
use serde::Deserialize;
use url::Url;

use crate::{logger::LoggerConfig, Args};

const ENVIRONMENT_PREFIX: &str = "ORGSYNC";
const ENVIRONMENT_SEPARATOR: &str = "__";

#[derive(Deserialize, Debug)]
pub(crate) struct ApplicationConfig {
    pub port: u16,
    pub path_prefix: Option<String>,
    pub logger: LoggerConfig,
    pub token: TokenConfig,
    pub grafana: GrafanaConfig,
    pub reconciliation: ReconciliationConfig,
    pub inbound: InboundConfig,
}

#[derive(Deserialize, Debug)]
pub(crate) struct TokenConfig {
    pub jwks_url: Url,
    /// Seconds.
    pub jwks_refresh_interval: u64,
    pub audience: String,
    pub issuer: Option<String>,
    pub role_claim: String,
    pub derive_roles_from_raw: bool,
    /// Clock skew tolerated on `exp`/`nbf`, in seconds.
    pub leeway: u64,
}

#[derive(Deserialize, Debug)]
pub(crate) struct GrafanaConfig {
    pub endpoint: Url,
    /// Seconds.
    pub timeout: u64,
    pub auth: GrafanaAuthConfig,
}

#[derive(Deserialize, Debug)]
#[serde(tag = "method", rename_all = "SCREAMING_SNAKE_CASE")]
pub(crate) enum GrafanaAuthConfig {
    Basic { username: String, password: String },
    Bearer { token: String },
}

#[derive(Deserialize, Debug)]
pub(crate) struct ReconciliationConfig {
    pub remove_stale_memberships: bool,
    pub set_default_organization: bool,
}

#[derive(Deserialize, Debug, PartialEq, Eq)]
#[serde(tag = "scheme", rename_all = "SCREAMING_SNAKE_CASE")]
pub(crate) enum InboundConfig {
    Bearer,
    BasicBody { username: String, password: String },
}

pub(super) fn load_config(args: Args) -> anyhow::Result<ApplicationConfig> {
    let config_file_path = if let Some(path_override) = args.config.clone() {
        path_override
    } else {
        let xdg_dirs = xdg::BaseDirectories::with_prefix("orgsync")?;

        let user_config_dir = xdg_dirs.get_config_home();
        if !user_config_dir.exists() {
            std::fs::create_dir_all(&user_config_dir)?;
        }

        let mut config_file_path = user_config_dir.clone();
        config_file_path.push("provisioner_config.toml");

        if !config_file_path.exists() {
            write_default_config_file(&config_file_path)?;
        }

        config_file_path
    };

    build_config(File::from(config_file_path).format(FileFormat::Toml), environment(), &args)
}

fn environment() -> Environment {
    Environment::with_prefix(ENVIRONMENT_PREFIX)
        .prefix_separator(ENVIRONMENT_SEPARATOR)
        .separator(ENVIRONMENT_SEPARATOR)
        .try_parsing(true)
}

/// Layers, from weakest to strongest: built-in defaults, the config file, `ORGSYNC__*` variables, CLI flags.
fn build_config<S>(file: S, environment: Environment, args: &Args) -> anyhow::Result<ApplicationConfig>
where
    S: Source + Send + Sync + 'static,
{
    let config: ApplicationConfig = Config::builder()
        .set_default("port", 8080)?
        .set_default("logger.format", "JSON")?
        .set_default("token.jwks_refresh_interval", 3600)?
        .set_default("token.role_claim", DEFAULT_ROLE_CLAIM)?
        .set_default("token.derive_roles_from_raw", false)?
        .set_default("token.leeway", 0)?
        .set_default("grafana.timeout", 10)?
        .set_default("reconciliation.remove_stale_memberships", true)?
        .set_default("reconciliation.set_default_organization", true)?
        .set_default("inbound.scheme", "BEARER")?
        .add_source(file)
        .add_source(environment)
        .set_override_option("port", args.port.map(|port| port.to_string()))?
        .set_override_option("grafana.endpoint", args.grafana_endpoint.clone())?
        .set_override_option("token.jwks_url", args.jwks_url.clone())?
        .set_override_option("token.audience", args.audience.clone())?
        .build()?
        .try_deserialize()?;

    Ok(config)
}

fn write_default_config_file(path: &Path) -> anyhow::Result<()> {
    let default_config_content = include_str!("../static/default_config.toml");
    std::fs::write(path, default_config_content)?;
    Ok(())
}
