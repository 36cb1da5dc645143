use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use exporter_engine::{
    ExportOptions, FetchSettings, FrontMatterPreset, PipelineConfig, SiteAddress,
};
use exporter_logging::{export_info, export_warn};
use serde::{Deserialize, Serialize};

use crate::cli::Args;

pub const DEFAULT_CONFIG_FILE: &str = "post-exporter.ron";

/// Settings read from the optional RON file; every field may be omitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub connect_timeout_secs: u64,
    pub request_timeout_secs: u64,
    pub max_body_bytes: u64,
    pub output_dir: PathBuf,
    pub front_matter: String,
    pub block_arrays: bool,
    pub compress: bool,
    pub concurrency: Option<usize>,
    pub replacements: Vec<(String, String)>,
}

impl Default for AppConfig {
    fn default() -> Self {
        let fetch = FetchSettings::default();
        Self {
            connect_timeout_secs: fetch.connect_timeout.as_secs(),
            request_timeout_secs: fetch.request_timeout.as_secs(),
            max_body_bytes: fetch.max_bytes,
            output_dir: PathBuf::from("."),
            front_matter: FrontMatterPreset::Default.to_string(),
            block_arrays: false,
            compress: true,
            concurrency: None,
            replacements: Vec::new(),
        }
    }
}

/// Reads `path`, or `./post-exporter.ron` when no path was given.
///
/// A missing file yields defaults; a file that cannot be read or parsed is
/// reported and also yields defaults.
pub fn load_config(path: Option<&Path>) -> AppConfig {
    let explicit = path.is_some();
    let path = path.map_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE), Path::to_path_buf);

    let content = match fs::read_to_string(&path) {
        Ok(text) => text,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            if explicit {
                export_warn!("Config file {:?} not found, using defaults", path);
            }
            return AppConfig::default();
        }
        Err(err) => {
            export_warn!("Failed to read config from {:?}: {}", path, err);
            return AppConfig::default();
        }
    };

    match ron::from_str(&content) {
        Ok(config) => {
            export_info!("Loaded config from {:?}", path);
            config
        }
        Err(err) => {
            export_warn!("Failed to parse config from {:?}: {}", path, err);
            AppConfig::default()
        }
    }
}

/// Everything one run needs, with command-line flags taking precedence.
#[derive(Debug)]
pub struct RunSettings {
    pub site: SiteAddress,
    pub fetch: FetchSettings,
    pub pipeline: PipelineConfig,
    pub options: ExportOptions,
    pub output_dir: PathBuf,
}

impl RunSettings {
    pub fn resolve(args: &Args, config: &AppConfig) -> Result<Self> {
        let site = SiteAddress::parse(&args.site)?;

        let preset = match args.front_matter {
            Some(preset) => preset,
            None => config
                .front_matter
                .parse()
                .context("invalid front_matter in config file")?,
        };

        let concurrency = match args.concurrency {
            Some(n) => Some(usize::try_from(n).context("concurrency out of range")?),
            None => config.concurrency,
        };

        let pipeline = PipelineConfig::builder(site.url().as_str())
            .offset(args.offset)
            .limit(args.limit)
            .concurrency_limit(concurrency)
            .numbering(args.numbering)
            .text_replacements(config.replacements.iter().cloned())
            .text_replacements(args.replacements.iter().cloned())
            .build()?;

        let fetch = FetchSettings {
            connect_timeout: Duration::from_secs(config.connect_timeout_secs),
            request_timeout: Duration::from_secs(config.request_timeout_secs),
            max_bytes: config.max_body_bytes,
            ..FetchSettings::default()
        };

        let options = ExportOptions {
            front_matter: preset.into(),
            inline_arrays: !(args.block_arrays || config.block_arrays),
            compress: config.compress && !args.no_compress,
            identity: site.identity().to_string(),
            ..ExportOptions::default()
        };

        Ok(Self {
            site,
            fetch,
            pipeline,
            options,
            output_dir: args.output.clone().unwrap_or_else(|| config.output_dir.clone()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use exporter_engine::FrontMatterSource;
    use pretty_assertions::assert_eq;

    fn args(extra: &[&str]) -> Args {
        let mut argv = vec!["post-exporter", "writer"];
        argv.extend_from_slice(extra);
        Args::try_parse_from(argv).unwrap()
    }

    #[test]
    fn missing_file_yields_defaults() {
        let temp = tempfile::TempDir::new().unwrap();
        let config = load_config(Some(&temp.path().join("absent.ron")));
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("post-exporter.ron");
        fs::write(
            &path,
            r#"(
                output_dir: "exports",
                front_matter: "jekyll",
                concurrency: Some(3),
                replacements: [("substack.com", "example.com")],
            )"#,
        )
        .unwrap();

        let config = load_config(Some(&path));
        assert_eq!(config.output_dir, PathBuf::from("exports"));
        assert_eq!(config.front_matter, "jekyll");
        assert_eq!(config.concurrency, Some(3));
        assert_eq!(
            config.replacements,
            vec![("substack.com".to_string(), "example.com".to_string())]
        );
        assert!(config.compress);
        assert_eq!(config.request_timeout_secs, 30);
    }

    #[test]
    fn malformed_file_yields_defaults() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("broken.ron");
        fs::write(&path, "(output_dir: ").unwrap();
        assert_eq!(load_config(Some(&path)), AppConfig::default());
    }

    #[test]
    fn flags_override_file_values() {
        let config = AppConfig {
            front_matter: "jekyll".to_string(),
            concurrency: Some(3),
            output_dir: PathBuf::from("from-config"),
            replacements: vec![("a".to_string(), "b".to_string())],
            ..AppConfig::default()
        };
        let settings = RunSettings::resolve(
            &args(&["-f", "astro", "-c", "8", "-o", "from-flag", "-r", "c=d", "--no-compress"]),
            &config,
        )
        .unwrap();

        assert_eq!(settings.site.identity(), "writer");
        assert_eq!(settings.pipeline.base_url().as_str(), "https://writer.substack.com/");
        assert_eq!(settings.pipeline.concurrency_limit().map(|n| n.get()), Some(8));
        assert_eq!(
            settings.pipeline.text_replacements(),
            &[("a".to_string(), "b".to_string()), ("c".to_string(), "d".to_string())]
        );
        assert_eq!(settings.output_dir, PathBuf::from("from-flag"));
        assert!(!settings.options.compress);
        assert!(settings.options.inline_arrays);
        assert_eq!(settings.options.identity, "writer");
        assert!(matches!(
            settings.options.front_matter,
            FrontMatterSource::Preset(FrontMatterPreset::Astro)
        ));
    }

    #[test]
    fn config_values_apply_without_flags() {
        let config = AppConfig {
            front_matter: "hugo".to_string(),
            block_arrays: true,
            concurrency: Some(2),
            ..AppConfig::default()
        };
        let settings = RunSettings::resolve(&args(&[]), &config).unwrap();
        assert_eq!(settings.pipeline.concurrency_limit().map(|n| n.get()), Some(2));
        assert!(!settings.options.inline_arrays);
        assert!(matches!(
            settings.options.front_matter,
            FrontMatterSource::Preset(FrontMatterPreset::Hugo)
        ));
    }

    #[test]
    fn unknown_preset_in_config_fails_before_any_io() {
        let config = AppConfig {
            front_matter: "blogger".to_string(),
            ..AppConfig::default()
        };
        assert!(RunSettings::resolve(&args(&[]), &config).is_err());
    }

    #[test]
    fn zero_concurrency_in_config_is_rejected() {
        let config = AppConfig {
            concurrency: Some(0),
            ..AppConfig::default()
        };
        assert!(RunSettings::resolve(&args(&[]), &config).is_err());
    }
}
