use clap::{ArgAction, Parser, ValueEnum, ValueHint};
use dirs_next::home_dir;
use embedded_graphics::pixelcolor::Rgb888;
use embedded_graphics::prelude::*;
use serde::{Deserialize, Serialize};
use std::{fs, path::{Path, PathBuf}, time::Duration};
use thiserror::Error;

use crate::dbfs::ForceCurve;
use crate::face::MeterColours;
use crate::samples::FRAME_BYTES;
use crate::sampler::SamplerConfig;

pub const DEFAULT_WIDTH: u32 = 800;
pub const DEFAULT_UPDATE_HZ: u32 = 85;
pub const MIN_WIDTH: u32 = 32;
pub const MAX_WIDTH: u32 = 4096;
pub const MAX_UPDATE_HZ: u32 = 1000;

/// Error type for config loading/validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid colour '{0}', expected #RRGGBB")]
    Colour(String),
    #[error("Validation error: {0}")]
    Validation(String),
}

/// Top-level app configuration as read from YAML; every field optional so
/// layers can be merged.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Config {
    pub log_level: Option<String>,     // e.g., "info" | "debug"
    pub width: Option<u32>,            // both meters, px
    pub update_hz: Option<u32>,
    pub colours: Option<ColourConfig>,
    pub audio: Option<AudioConfig>,
    pub force_curve: Option<ForceCurve>,
    pub startup_sweep: Option<bool>,
    pub window: Option<bool>,          // desktop window when built with `emulator`
    pub snapshot: Option<SnapshotConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ColourConfig {
    pub gradient_top: Option<String>,
    pub gradient_bottom: Option<String>,
    pub foreground: Option<String>,
    pub peak: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    #[default]
    Stdin,
    File,
    Tone,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct AudioConfig {
    pub source: Option<SourceKind>,
    pub path: Option<PathBuf>,
    pub buffer_bytes: Option<usize>,
    pub sample_rate: Option<u32>,
    pub tone_hz: Option<f64>,
    pub noise: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct SnapshotConfig {
    pub path: Option<PathBuf>,
    pub every: Option<u64>,
}

/// CLI overrides. All fields are Options so we can layer them over YAML.
#[derive(Debug, Parser, Clone, Default)]
#[command(
    name = "vumeter",
    version,
    long_version = concat!(env!("CARGO_PKG_VERSION"), " built ", env!("BUILD_DATE")),
    about = "Stereo VU meter with sprung needles"
)]
pub struct Cli {
    /// Path to a YAML config file (overrides search)
    #[arg(short = 'c', long, value_hint = ValueHint::FilePath)]
    pub config: Option<PathBuf>,
    /// Enable debug log level
    #[arg(short = 'v', long, alias = "verbose", action = ArgAction::SetTrue)]
    pub debug: bool,
    #[arg(long)]
    pub log_level: Option<String>,
    /// Width of both meters in pixels
    #[arg(short = 'w', long)]
    pub width: Option<u32>,
    /// Render rate
    #[arg(long)]
    pub update_hz: Option<u32>,
    #[arg(long, value_enum)]
    pub source: Option<SourceKind>,
    /// Raw S16_BE stereo file for `--source file`
    #[arg(long, value_hint = ValueHint::FilePath)]
    pub input: Option<PathBuf>,
    /// Amplitude to force curve, log or straight_ruler
    #[arg(long)]
    pub force_curve: Option<ForceCurve>,
    #[arg(long, action = ArgAction::SetTrue)]
    pub no_sweep: bool,
    /// Run without a window even when built with one
    #[arg(long, action = ArgAction::SetTrue)]
    pub headless: bool,
    /// Write a PPM snapshot here (with --snapshot-every)
    #[arg(long, value_hint = ValueHint::FilePath)]
    pub snapshot: Option<PathBuf>,
    #[arg(long)]
    pub snapshot_every: Option<u64>,
    /// dump fully merged config (after overrides) and exit
    #[arg(long, action = ArgAction::SetTrue)]
    pub dump_config: bool,
}

/// Fully resolved settings the meter runs with.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub log_level: String,
    pub width: u32,
    pub update_hz: u32,
    pub colours: MeterColours,
    pub source: SourceKind,
    pub input: Option<PathBuf>,
    pub buffer_bytes: usize,
    pub sample_rate: u32,
    pub tone_hz: f64,
    pub noise: f64,
    pub force_curve: ForceCurve,
    pub startup_sweep: bool,
    pub window: bool,
    pub snapshot: Option<(PathBuf, u64)>,
}

impl Settings {
    pub fn sampler(&self) -> SamplerConfig {
        SamplerConfig {
            buffer_bytes: self.buffer_bytes,
            curve: self.force_curve,
            startup_sweep: self.startup_sweep.then_some(Duration::from_secs(1)),
        }
    }
}

/// Public entry point: read YAML, merge, apply CLI, validate.
///
/// Returns the merged (unresolved) layer too, for `--dump-config`.
pub fn load(cli: &Cli) -> Result<(Config, Settings), ConfigError> {
    // 1) YAML file (explicit path or search)
    let mut cfg = Config::default();
    if let Some(p) = cli.config.as_ref() {
        if p.exists() {
            merge(&mut cfg, read_yaml(p)?);
        } else {
            return Err(ConfigError::Validation(format!(
                "Config file not found: {}",
                p.display()
            )));
        }
    } else if let Some(p) = find_config_file() {
        merge(&mut cfg, read_yaml(&p)?);
    }

    // 2) CLI overrides (highest precedence)
    apply_cli_overrides(&mut cfg, cli);

    // 3) defaults for whatever is left, then validate
    let settings = resolve(&cfg)?;
    Ok((cfg, settings))
}

/// Try common locations in order (first hit wins).
fn find_config_file() -> Option<PathBuf> {
    // XDG-style: ~/.config/vumeter/config.yaml
    if let Some(home) = home_dir() {
        let p = home.join(".config/vumeter/config.yaml");
        if p.exists() { return Some(p) }
        let p = home.join(".config/vumeter.yaml");
        if p.exists() { return Some(p) }
    }
    // project local
    for candidate in &["vumeter.yaml", "config/vumeter.yaml"] {
        let p = PathBuf::from(candidate);
        if p.exists() { return Some(p) }
    }
    None
}

pub fn read_yaml(path: &Path) -> Result<Config, ConfigError> {
    let s = fs::read_to_string(path)?;
    parse_yaml(&s)
}

pub fn parse_yaml(s: &str) -> Result<Config, ConfigError> {
    // an empty file is an empty config, not an error
    if s.trim().is_empty() {
        return Ok(Config::default());
    }
    Ok(serde_yaml::from_str(s)?)
}

/// Option-by-Option merge of `src` over `dst`.
pub fn merge(dst: &mut Config, src: Config) {
    if src.log_level.is_some()     { dst.log_level = src.log_level; }
    if src.width.is_some()         { dst.width = src.width; }
    if src.update_hz.is_some()     { dst.update_hz = src.update_hz; }
    if src.force_curve.is_some()   { dst.force_curve = src.force_curve; }
    if src.startup_sweep.is_some() { dst.startup_sweep = src.startup_sweep; }
    if src.window.is_some()        { dst.window = src.window; }
    match (&mut dst.colours, src.colours) {
        (None, Some(c)) => dst.colours = Some(c),
        (Some(d), Some(s)) => merge_colours(d, s),
        _ => {}
    }
    match (&mut dst.audio, src.audio) {
        (None, Some(a)) => dst.audio = Some(a),
        (Some(d), Some(s)) => merge_audio(d, s),
        _ => {}
    }
    match (&mut dst.snapshot, src.snapshot) {
        (None, Some(s)) => dst.snapshot = Some(s),
        (Some(d), Some(s)) => {
            if s.path.is_some()  { d.path = s.path; }
            if s.every.is_some() { d.every = s.every; }
        }
        _ => {}
    }
}

fn merge_colours(dst: &mut ColourConfig, src: ColourConfig) {
    if src.gradient_top.is_some()    { dst.gradient_top = src.gradient_top; }
    if src.gradient_bottom.is_some() { dst.gradient_bottom = src.gradient_bottom; }
    if src.foreground.is_some()      { dst.foreground = src.foreground; }
    if src.peak.is_some()            { dst.peak = src.peak; }
}

fn merge_audio(dst: &mut AudioConfig, src: AudioConfig) {
    if src.source.is_some()       { dst.source = src.source; }
    if src.path.is_some()         { dst.path = src.path; }
    if src.buffer_bytes.is_some() { dst.buffer_bytes = src.buffer_bytes; }
    if src.sample_rate.is_some()  { dst.sample_rate = src.sample_rate; }
    if src.tone_hz.is_some()      { dst.tone_hz = src.tone_hz; }
    if src.noise.is_some()        { dst.noise = src.noise; }
}

pub fn apply_cli_overrides(cfg: &mut Config, cli: &Cli) {
    if cli.debug                    { cfg.log_level = Some("debug".into()); }
    if cli.log_level.is_some()      { cfg.log_level = cli.log_level.clone(); }
    if cli.width.is_some()          { cfg.width = cli.width; }
    if cli.update_hz.is_some()      { cfg.update_hz = cli.update_hz; }
    if cli.force_curve.is_some()    { cfg.force_curve = cli.force_curve; }
    if cli.no_sweep                 { cfg.startup_sweep = Some(false); }
    if cli.headless                 { cfg.window = Some(false); }

    if cli.source.is_some() || cli.input.is_some() {
        let audio = cfg.audio.get_or_insert_with(AudioConfig::default);
        if cli.input.is_some() {
            audio.path = cli.input.clone();
            // a file on the command line implies reading it
            if cli.source.is_none() { audio.source = Some(SourceKind::File); }
        }
        if cli.source.is_some() { audio.source = cli.source; }
    }
    if cli.snapshot.is_some() || cli.snapshot_every.is_some() {
        let snap = cfg.snapshot.get_or_insert_with(SnapshotConfig::default);
        if cli.snapshot.is_some()       { snap.path = cli.snapshot.clone(); }
        if cli.snapshot_every.is_some() { snap.every = cli.snapshot_every; }
    }
}

/// Parse `#RRGGBB` (the `#` is optional).
pub fn parse_colour(s: &str) -> Result<Rgb888, ConfigError> {
    let hex = s.trim().trim_start_matches('#');
    if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(ConfigError::Colour(s.to_string()));
    }
    let v = u32::from_str_radix(hex, 16).map_err(|_| ConfigError::Colour(s.to_string()))?;
    Ok(Rgb888::new((v >> 16) as u8, (v >> 8) as u8, v as u8))
}

pub fn format_colour(c: Rgb888) -> String {
    format!("#{:02X}{:02X}{:02X}", c.r(), c.g(), c.b())
}

fn resolve_colours(cfg: Option<&ColourConfig>) -> Result<MeterColours, ConfigError> {
    let mut colours = MeterColours::default();
    let Some(c) = cfg else { return Ok(colours) };
    if let Some(s) = &c.gradient_top    { colours.gradient_top = parse_colour(s)?; }
    if let Some(s) = &c.gradient_bottom { colours.gradient_bottom = parse_colour(s)?; }
    if let Some(s) = &c.foreground      { colours.foreground = parse_colour(s)?; }
    if let Some(s) = &c.peak            { colours.peak = parse_colour(s)?; }
    Ok(colours)
}

/// Fill defaults and check invariants.
pub fn resolve(cfg: &Config) -> Result<Settings, ConfigError> {
    let audio = cfg.audio.clone().unwrap_or_default();
    let snapshot = cfg.snapshot.clone().unwrap_or_default();

    let settings = Settings {
        log_level: cfg.log_level.clone().unwrap_or_else(|| "info".into()),
        width: cfg.width.unwrap_or(DEFAULT_WIDTH),
        update_hz: cfg.update_hz.unwrap_or(DEFAULT_UPDATE_HZ),
        colours: resolve_colours(cfg.colours.as_ref())?,
        source: audio.source.unwrap_or_default(),
        input: audio.path,
        buffer_bytes: audio.buffer_bytes.unwrap_or(2048),
        sample_rate: audio.sample_rate.unwrap_or(44_100),
        tone_hz: audio.tone_hz.unwrap_or(440.0),
        noise: audio.noise.unwrap_or(0.0),
        force_curve: cfg.force_curve.unwrap_or_default(),
        startup_sweep: cfg.startup_sweep.unwrap_or(true),
        window: cfg.window.unwrap_or(true),
        snapshot: match (snapshot.path, snapshot.every.unwrap_or(0)) {
            (Some(p), n) if n > 0 => Some((p, n)),
            _ => None,
        },
    };
    validate(&settings)?;
    Ok(settings)
}

/// Put any invariants here (required fields, ranges, etc.)
fn validate(s: &Settings) -> Result<(), ConfigError> {
    if !(MIN_WIDTH..=MAX_WIDTH).contains(&s.width) || s.width % 2 != 0 {
        return Err(ConfigError::Validation(format!(
            "width must be even and within {MIN_WIDTH}..={MAX_WIDTH}, got {}", s.width
        )));
    }
    if !(1..=MAX_UPDATE_HZ).contains(&s.update_hz) {
        return Err(ConfigError::Validation(format!(
            "update_hz must be 1..={MAX_UPDATE_HZ}, got {}", s.update_hz
        )));
    }
    if s.buffer_bytes < FRAME_BYTES || s.buffer_bytes % FRAME_BYTES != 0 {
        return Err(ConfigError::Validation(format!(
            "audio.buffer_bytes must be a positive multiple of {FRAME_BYTES}, got {}", s.buffer_bytes
        )));
    }
    if s.source == SourceKind::File && s.input.is_none() {
        return Err(ConfigError::Validation("audio.path is required for the file source".into()));
    }
    if s.sample_rate == 0 {
        return Err(ConfigError::Validation("audio.sample_rate must be > 0".into()));
    }
    if !(s.tone_hz > 0.0) || s.tone_hz * 2.0 > s.sample_rate as f64 {
        return Err(ConfigError::Validation(format!(
            "audio.tone_hz must be within (0, {}], got {}", s.sample_rate / 2, s.tone_hz
        )));
    }
    if !(0.0..=1.0).contains(&s.noise) {
        return Err(ConfigError::Validation("audio.noise must be 0..=1".into()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let s = resolve(&Config::default()).unwrap();
        assert_eq!(s.width, 800);
        assert_eq!(s.update_hz, 85);
        assert_eq!(s.colours, MeterColours::default());
        assert_eq!(s.source, SourceKind::Stdin);
        assert_eq!(s.buffer_bytes, 2048);
        assert_eq!(s.force_curve, ForceCurve::Log);
        assert!(s.startup_sweep);
        assert!(s.window);
        assert_eq!(s.snapshot, None);
        assert_eq!(s.sampler().startup_sweep, Some(Duration::from_secs(1)));
    }

    #[test]
    fn test_parse_colour() {
        assert_eq!(parse_colour("#806633").unwrap(), Rgb888::new(0x80, 0x66, 0x33));
        assert_eq!(parse_colour("ffcc66").unwrap(), Rgb888::new(0xFF, 0xCC, 0x66));
        assert!(parse_colour("#80663").is_err());
        assert!(parse_colour("#80663G").is_err());
        assert!(parse_colour("+80663F").is_err());
        assert!(parse_colour("+12345").is_err());
        assert_eq!(format_colour(Rgb888::new(0xAA, 0, 0x0F)), "#AA000F");
    }

    #[test]
    fn test_yaml_layer() {
        let yaml = r##"
width: 400
update_hz: 60
force_curve: straight_ruler
colours:
  peak: "#FF0000"
audio:
  source: tone
  noise: 0.05
snapshot:
  path: /tmp/meter.ppm
  every: 100
"##;
        let cfg = parse_yaml(yaml).unwrap();
        let s = resolve(&cfg).unwrap();
        assert_eq!(s.width, 400);
        assert_eq!(s.update_hz, 60);
        assert_eq!(s.force_curve, ForceCurve::StraightRuler);
        assert_eq!(s.colours.peak, Rgb888::new(0xFF, 0, 0));
        assert_eq!(s.colours.foreground, MeterColours::default().foreground);
        assert_eq!(s.source, SourceKind::Tone);
        assert_eq!(s.noise, 0.05);
        assert_eq!(s.snapshot, Some((PathBuf::from("/tmp/meter.ppm"), 100)));
    }

    #[test]
    fn test_unknown_key_rejected() {
        assert!(matches!(parse_yaml("widht: 400"), Err(ConfigError::Yaml(_))));
        assert_eq!(parse_yaml("  \n").unwrap(), Config::default());
    }

    #[test]
    fn test_merge_is_per_field() {
        let mut base = parse_yaml("width: 400\ncolours:\n  foreground: '#111111'\n").unwrap();
        let over = parse_yaml("colours:\n  peak: '#222222'\naudio:\n  buffer_bytes: 512\n").unwrap();
        merge(&mut base, over);
        assert_eq!(base.width, Some(400));
        let c = base.colours.as_ref().unwrap();
        assert_eq!(c.foreground.as_deref(), Some("#111111"));
        assert_eq!(c.peak.as_deref(), Some("#222222"));
        assert_eq!(base.audio.as_ref().unwrap().buffer_bytes, Some(512));
    }

    #[test]
    fn test_cli_overrides_win() {
        let mut cfg = parse_yaml("width: 400\nstartup_sweep: true\naudio:\n  source: tone\n").unwrap();
        let cli = Cli::try_parse_from([
            "vumeter", "--width", "640", "--input", "take1.raw", "--no-sweep", "--headless", "-v",
        ])
        .unwrap();
        apply_cli_overrides(&mut cfg, &cli);
        let s = resolve(&cfg).unwrap();
        assert_eq!(s.width, 640);
        assert_eq!(s.source, SourceKind::File);
        assert_eq!(s.input, Some(PathBuf::from("take1.raw")));
        assert!(!s.startup_sweep);
        assert!(!s.window);
        assert_eq!(s.log_level, "debug");
        assert_eq!(s.sampler().startup_sweep, None);
    }

    #[test]
    fn test_cli_force_curve() {
        let cli = Cli::try_parse_from(["vumeter", "--force-curve", "straight_ruler", "--source", "tone"]).unwrap();
        assert_eq!(cli.force_curve, Some(ForceCurve::StraightRuler));
        assert_eq!(cli.source, Some(SourceKind::Tone));
        assert!(Cli::try_parse_from(["vumeter", "--force-curve", "cubic"]).is_err());
    }

    #[test]
    fn test_validation() {
        let bad = |yaml: &str| matches!(resolve(&parse_yaml(yaml).unwrap()), Err(ConfigError::Validation(_)));
        assert!(bad("width: 801"));
        assert!(bad("width: 30"));
        assert!(bad("width: 4098"));
        assert!(bad("width: 2000000000"));
        assert!(!bad("width: 4096"));
        assert!(bad("update_hz: 0"));
        assert!(bad("update_hz: 1001"));
        assert!(bad("audio:\n  buffer_bytes: 1022"));
        assert!(bad("audio:\n  source: file"));
        assert!(bad("audio:\n  noise: 1.5"));
        assert!(bad("audio:\n  tone_hz: 30000"));
        assert!(matches!(
            resolve(&parse_yaml("colours:\n  peak: red").unwrap()),
            Err(ConfigError::Colour(_))
        ));
    }

    #[test]
    fn test_missing_explicit_file() {
        let cli = Cli { config: Some(PathBuf::from("/nonexistent/vumeter.yaml")), ..Cli::default() };
        assert!(matches!(load(&cli), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_dump_round_trips() {
        let cfg = parse_yaml("width: 400\nforce_curve: log\n").unwrap();
        let text = serde_yaml::to_string(&cfg).unwrap();
        assert_eq!(parse_yaml(&text).unwrap(), cfg);
    }
}
