use clap::Parser;
use std::time::Duration;

// CLI argument structure, every option can also come from the environment
#[derive(Parser, Debug, Clone)]
#[command(name = "n8n-proxy")]
#[command(about = "Rate limited forwarding proxy for the recoloring webhook")]
pub struct Args {
    // Port to run the server on
    #[arg(short, long, env = "PORT", default_value_t = 8080)]
    pub port: u16,

    // Max requests per client per window
    #[arg(long, env = "RATE_LIMIT_MAX", default_value_t = 5)]
    pub rate_limit_max: u32,

    // Window length in minutes
    #[arg(
        long,
        env = "RATE_LIMIT_WINDOW_MINUTES",
        default_value_t = 5,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub rate_limit_window_minutes: u64,

    // How often expired rate limit entries are swept (seconds)
    #[arg(
        long,
        env = "RATE_LIMIT_SWEEP_SECONDS",
        default_value_t = 60,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub sweep_interval: u64,

    // Deadline for the outbound call to the webhook (seconds)
    #[arg(
        long,
        env = "FORWARD_TIMEOUT_SECONDS",
        default_value_t = 30,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub forward_timeout: u64,

    // Largest inbound body accepted, images arrive as data URIs
    #[arg(long, env = "MAX_BODY_BYTES", default_value_t = 10 * 1024 * 1024)]
    pub max_body_bytes: usize,
}

impl Args {
    pub fn rate_window(&self) -> Duration {
        Duration::from_secs(self.rate_limit_window_minutes * 60)
    }

    pub fn sweep_period(&self) -> Duration {
        Duration::from_secs(self.sweep_interval)
    }

    pub fn forward_deadline(&self) -> Duration {
        Duration::from_secs(self.forward_timeout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_deployed_function() {
        let args = Args::try_parse_from(["n8n-proxy"]).unwrap();
        assert_eq!(args.rate_limit_max, 5);
        assert_eq!(args.rate_window(), Duration::from_secs(300));
        assert_eq!(args.sweep_period(), Duration::from_secs(60));
        assert_eq!(args.forward_deadline(), Duration::from_secs(30));
    }

    #[test]
    fn flags_override_defaults() {
        let args = Args::try_parse_from([
            "n8n-proxy",
            "--rate-limit-max",
            "20",
            "--rate-limit-window-minutes",
            "1",
            "--port",
            "3000",
        ])
        .unwrap();
        assert_eq!(args.port, 3000);
        assert_eq!(args.rate_limit_max, 20);
        assert_eq!(args.rate_window(), Duration::from_secs(60));
    }

    #[test]
    fn zero_window_is_rejected() {
        let result = Args::try_parse_from(["n8n-proxy", "--rate-limit-window-minutes", "0"]);
        assert!(result.is_err());
    }
}
