use std::path::PathBuf;

use clap::Parser;

/// Command-line surface for the player binary.
///
/// Mirrors the historical `wavestreamer`-style flag set: `-d` is the only
/// required flag, everything else toggles an optional surface.
#[derive(Debug, Parser)]
#[command(
    name = "wavecast",
    version,
    about = "Community-radio streaming player",
    disable_version_flag = true
)]
pub struct Cli {
    /// Print version information and exit.
    ///
    /// clap's auto-generated version flag binds to `-V`/`--version`; the
    /// CLI contract calls for lowercase `-v`, so the auto flag is disabled
    /// above and rebound here.
    #[arg(short = 'v', long = "version", action = clap::ArgAction::Version)]
    pub version: (),

    /// Root directory of the media library (required).
    #[arg(short = 'd', long = "dir")]
    pub dir: PathBuf,

    /// Enable the hourly news fetch.
    #[arg(short = 'n', long = "news")]
    pub news: bool,

    /// RSS feed URL polled by the news scheduler, when enabled.
    #[arg(
        long = "news-feed-url",
        default_value = "https://www.tagesschau.de/xml/podcast/"
    )]
    pub news_feed_url: String,

    /// Enable the web UI.
    #[arg(short = 'w', long = "webapp")]
    pub webapp: bool,

    /// Port for the web UI, when enabled.
    #[arg(short = 'p', long = "port", default_value_t = 8080)]
    pub port: u16,

    /// Enable the GPIO button handler.
    #[arg(short = 'i', long = "gpio")]
    pub gpio: bool,

    /// GPIO pin number for the button, when enabled.
    #[arg(long = "gpio-pin", default_value_t = 17)]
    pub gpio_pin: u32,

    /// Disable adaptive loudness normalization.
    #[arg(long = "no-normalize")]
    pub no_normalize: bool,

    /// Name or path of the decoder executable (ffmpeg-compatible).
    #[arg(long = "decoder-bin", default_value = "ffmpeg")]
    pub decoder_bin: String,

    /// Name or path of the metadata probe executable (ffprobe-compatible).
    #[arg(long = "probe-bin", default_value = "ffprobe")]
    pub probe_bin: String,
}

/// Validated, resolved configuration handed to the rest of the program.
///
/// Kept distinct from [`Cli`] so construction can be unit-tested without
/// going through argument parsing.
#[derive(Debug, Clone)]
pub struct Config {
    pub music_root: PathBuf,
    pub news_enabled: bool,
    pub news_feed_url: String,
    pub webapp_enabled: bool,
    pub webapp_port: u16,
    pub gpio_enabled: bool,
    pub gpio_pin: u32,
    pub normalize: bool,
    pub decoder_bin: String,
    pub probe_bin: String,
}

impl From<Cli> for Config {
    fn from(cli: Cli) -> Self {
        Config {
            music_root: cli.dir,
            news_enabled: cli.news,
            news_feed_url: cli.news_feed_url,
            webapp_enabled: cli.webapp,
            webapp_port: cli.port,
            gpio_enabled: cli.gpio,
            gpio_pin: cli.gpio_pin,
            normalize: !cli.no_normalize,
            decoder_bin: cli.decoder_bin,
            probe_bin: cli.probe_bin,
        }
    }
}

impl Config {
    /// Confirms the decoder and probe binaries resolve on `PATH`.
    ///
    /// Matches the CLI contract's "exit nonzero if... dependencies...
    /// are absent" — called once at startup before anything else spins up.
    pub fn check_dependencies(&self) -> anyhow::Result<()> {
        for bin in [&self.decoder_bin, &self.probe_bin] {
            which(bin).ok_or_else(|| {
                anyhow::anyhow!("required executable '{bin}' was not found on PATH")
            })?;
        }
        Ok(())
    }
}

fn which(bin: &str) -> Option<PathBuf> {
    let path_candidate = PathBuf::from(bin);
    if path_candidate.is_absolute() && path_candidate.is_file() {
        return Some(path_candidate);
    }
    let path_var = std::env::var_os("PATH")?;
    std::env::split_paths(&path_var)
        .map(|dir| dir.join(bin))
        .find(|candidate| candidate.is_file())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_defaults_on() {
        let cli = Cli::parse_from(["wavecast", "-d", "/music"]);
        let config = Config::from(cli);
        assert!(config.normalize);
        assert!(!config.news_enabled);
    }

    #[test]
    fn no_normalize_flag_disables_normalization() {
        let cli = Cli::parse_from(["wavecast", "-d", "/music", "--no-normalize"]);
        let config = Config::from(cli);
        assert!(!config.normalize);
    }

    #[test]
    fn which_finds_known_system_binary() {
        assert!(which("sh").is_some());
    }

    #[test]
    fn lowercase_v_prints_version_and_exits() {
        let err = Cli::try_parse_from(["wavecast", "-v"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayVersion);
    }
}
