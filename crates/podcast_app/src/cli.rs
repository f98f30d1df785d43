use std::path::PathBuf;

use clap::builder::BoolishValueParser;
use clap::{Parser, ValueEnum};
use engine_logging::LogDestination;
use podcast_core::{GenerateSpec, PodcastLength, Tone};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
#[value(rename_all = "lowercase")]
pub(crate) enum LogTarget {
    File,
    Terminal,
    Both,
}

impl From<LogTarget> for LogDestination {
    fn from(target: LogTarget) -> Self {
        match target {
            LogTarget::File => LogDestination::File,
            LogTarget::Terminal => LogDestination::Terminal,
            LogTarget::Both => LogDestination::Both,
        }
    }
}

/// Generate a podcast episode from a topic and follow it until it is ready.
#[derive(Debug, Clone, Parser)]
#[command(name = "podcast-studio", version)]
pub(crate) struct Cli {
    /// What the episode is about
    #[arg(required_unless_present = "print_config")]
    pub topic: Option<String>,

    /// Extra guidance for the script writer
    #[arg(short, long, default_value = "")]
    pub description: String,

    /// funny, factual, serious, humorous or neutral
    #[arg(short, long, default_value = "neutral", value_parser = parse_tone)]
    pub tone: Tone,

    /// Episode length in minutes: 5, 10 or 15
    #[arg(short, long, default_value = "10", value_parser = parse_length)]
    pub length: PodcastLength,

    /// Use the built-in simulator instead of the generation service
    #[arg(
        long,
        env = "PODCAST_USE_MOCK",
        num_args = 0..=1,
        default_missing_value = "true",
        value_parser = BoolishValueParser::new()
    )]
    pub mock: Option<bool>,

    /// Base URL of the generation service API
    #[arg(long, env = "PODCAST_API_BASE")]
    pub api_base: Option<String>,

    /// RON config file (defaults to ./podcast_studio.ron when present)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Seconds between status checks
    #[arg(long)]
    pub poll_interval: Option<u64>,

    /// Seconds before the client gives up on a job
    #[arg(long)]
    pub poll_timeout: Option<u64>,

    /// error, warn, info, debug or trace
    #[arg(long, env = "PODCAST_LOG")]
    pub log_level: Option<String>,

    #[arg(long, value_enum, default_value_t = LogTarget::File)]
    pub log_to: LogTarget,

    /// Cancel on Ctrl-C without asking first
    #[arg(long)]
    pub no_confirm: bool,

    /// Print the effective configuration as RON and exit
    #[arg(long)]
    pub print_config: bool,
}

impl Cli {
    pub(crate) fn spec(&self) -> Option<GenerateSpec> {
        let topic = self.topic.as_deref()?;
        Some(
            GenerateSpec::new(topic)
                .with_description(self.description.as_str())
                .with_tone(self.tone)
                .with_length(self.length),
        )
    }
}

fn parse_tone(value: &str) -> Result<Tone, String> {
    value.parse().map_err(|err: podcast_core::JobError| err.to_string())
}

fn parse_length(value: &str) -> Result<PodcastLength, String> {
    let minutes: u32 = value
        .trim()
        .parse()
        .map_err(|_| format!("{value:?} is not a number of minutes"))?;
    PodcastLength::from_minutes(minutes).map_err(|err| err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn command_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn defaults_describe_a_standard_neutral_episode() {
        let cli = Cli::try_parse_from(["podcast-studio", "AI safety"]).unwrap();
        let spec = cli.spec().unwrap();
        assert_eq!(spec.topic, "AI safety");
        assert_eq!(spec.tone, Tone::Neutral);
        assert_eq!(spec.length, PodcastLength::Standard);
        assert_eq!(cli.log_to, LogTarget::File);
        assert!(!cli.no_confirm);
    }

    #[test]
    fn flags_are_parsed() {
        let cli = Cli::try_parse_from([
            "podcast-studio",
            "Tides",
            "--tone",
            "Humorous",
            "--length",
            "15",
            "--mock",
            "--api-base",
            "http://api.test/v1",
            "--poll-interval",
            "1",
        ])
        .unwrap();
        assert_eq!(cli.tone, Tone::Humorous);
        assert_eq!(cli.length, PodcastLength::Long);
        assert_eq!(cli.mock, Some(true));
        assert_eq!(cli.api_base.as_deref(), Some("http://api.test/v1"));
        assert_eq!(cli.poll_interval, Some(1));
    }

    #[test]
    fn mock_accepts_an_explicit_value() {
        let cli = Cli::try_parse_from(["podcast-studio", "x", "--mock", "off"]).unwrap();
        assert_eq!(cli.mock, Some(false));
    }

    #[test]
    fn bad_tone_and_length_are_rejected() {
        assert!(Cli::try_parse_from(["podcast-studio", "x", "--tone", "sarcastic"]).is_err());
        assert!(Cli::try_parse_from(["podcast-studio", "x", "--length", "7"]).is_err());
    }

    #[test]
    fn topic_is_optional_only_for_print_config() {
        assert!(Cli::try_parse_from(["podcast-studio"]).is_err());
        let cli = Cli::try_parse_from(["podcast-studio", "--print-config"]).unwrap();
        assert!(cli.spec().is_none());
    }
}
