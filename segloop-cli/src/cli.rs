use std::path::PathBuf;

use clap::Parser;
use segloop_engine::{Result, SegloopConfig};

/// Relay a continuous media URL as a sliding-window live HLS stream.
#[derive(Debug, Parser)]
#[command(name = "segloop", version, about)]
pub struct Args {
    /// TOML configuration file
    #[arg(short, long, env = "SEGLOOP_CONFIG")]
    pub config: Option<PathBuf>,

    /// Upstream URL (overrides the config file)
    #[arg(short, long, env = "SEGLOOP_URL")]
    pub url: Option<String>,

    /// Output root; segments go to `<output>/channels/<channel>`
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Channel label
    #[arg(long)]
    pub channel: Option<String>,

    /// Number of segments kept in the playlist
    #[arg(long)]
    pub capacity: Option<usize>,

    /// Debug logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Errors only
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,
}

impl Args {
    /// Defaults, then the config file, then command-line overrides.
    pub fn resolve_config(&self) -> Result<SegloopConfig> {
        let mut config = match &self.config {
            Some(path) => SegloopConfig::load(path)?,
            None => SegloopConfig::default(),
        };

        if let Some(url) = &self.url {
            config.url = url.clone();
        }
        if let Some(output) = &self.output {
            config.output_root = output.clone();
        }
        if let Some(channel) = &self.channel {
            config.channel = channel.clone();
        }
        if let Some(capacity) = self.capacity {
            config.capacity = capacity;
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn command_definition_is_valid() {
        Args::command().debug_assert();
    }

    #[test]
    fn flags_override_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("segloop.toml");
        std::fs::write(
            &file,
            "url = \"https://example.com/a.ts\"\nchannel = \"news\"\ncapacity = 10\n",
        )
        .unwrap();

        let args = Args::try_parse_from([
            "segloop",
            "--config",
            file.to_str().unwrap(),
            "--channel",
            "tamil",
            "--output",
            "/srv/hls",
        ])
        .unwrap();
        let config = args.resolve_config().unwrap();

        assert_eq!(config.url, "https://example.com/a.ts");
        assert_eq!(config.channel, "tamil");
        assert_eq!(config.capacity, 10);
        assert_eq!(config.output_dir(), PathBuf::from("/srv/hls/channels/tamil"));
    }

    #[test]
    fn url_flag_without_config_file() {
        let args = Args::try_parse_from(["segloop", "-u", "https://example.com/live.ts"]).unwrap();
        let config = args.resolve_config().unwrap();
        assert_eq!(config.url, "https://example.com/live.ts");
        assert_eq!(config.capacity, 60);
        config.validate().unwrap();
    }

    #[test]
    fn verbose_and_quiet_conflict() {
        assert!(Args::try_parse_from(["segloop", "-v", "-q"]).is_err());
    }
}
