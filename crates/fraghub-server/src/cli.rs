use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "fraghub-server", version, about = "FragHub community server")]
pub struct Args {
    /// Path to the TOML configuration file.
    #[arg(short, long, default_value = "fraghub.toml")]
    pub config: String,

    /// Overrides `server.bind_address` from the config file.
    #[arg(long)]
    pub bind: Option<String>,

    /// Emit logs as JSON lines.
    #[arg(long)]
    pub log_json: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_local_config_file() {
        let args = Args::parse_from(["fraghub-server"]);
        assert_eq!(args.config, "fraghub.toml");
        assert!(args.bind.is_none());
        assert!(!args.log_json);
    }

    #[test]
    fn bind_override_is_parsed() {
        let args = Args::parse_from(["fraghub-server", "-c", "prod.toml", "--bind", "0.0.0.0:9000"]);
        assert_eq!(args.config, "prod.toml");
        assert_eq!(args.bind.as_deref(), Some("0.0.0.0:9000"));
    }
}
