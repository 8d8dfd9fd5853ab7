use clap::Parser;
use std::net::IpAddr;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Host to bind to
    #[arg(long, env = "FARM_GEO_HOST", default_value = "127.0.0.1")]
    pub host: IpAddr,

    /// Port to bind to; the next free port is used if it is taken
    #[arg(long, env = "FARM_GEO_PORT", default_value_t = 12207)]
    pub port: u16,
}

impl Args {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let args = Args::parse_from(["farm-geo"]);
        assert_eq!(args.port, 12207);
        assert_eq!(args.host.to_string(), "127.0.0.1");
    }

    #[test]
    fn test_explicit_flags() {
        let args = Args::parse_from(["farm-geo", "--host", "0.0.0.0", "--port", "8080"]);
        assert_eq!(args.port, 8080);
        assert!(args.host.is_unspecified());
    }
}
