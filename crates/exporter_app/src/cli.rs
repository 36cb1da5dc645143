//! Command-line arguments.

use std::path::PathBuf;

use clap::Parser;
use exporter_engine::{FrontMatterPreset, DEFAULT_LIMIT, DEFAULT_OFFSET};
use log::LevelFilter;

/// Export a publication's posts as a zip of Markdown files with front matter.
///
/// SITE may be a bare name (`writer`), a host (`writer.substack.com`) or a
/// full URL; custom domains need the `https://` prefix.
#[derive(Parser, Debug)]
#[command(name = "post-exporter")]
#[command(author, version, about)]
pub struct Args {
    /// Publication name, host or URL
    pub site: String,

    /// Index position of the first (newest) post to export
    #[arg(long, default_value_t = DEFAULT_OFFSET)]
    pub offset: u32,

    /// Number of posts to request from the index
    #[arg(short, long, default_value_t = DEFAULT_LIMIT, value_parser = clap::value_parser!(u32).range(1..))]
    pub limit: u32,

    /// Maximum concurrent post downloads (sequential when omitted)
    #[arg(short = 'c', long, value_parser = clap::value_parser!(u64).range(1..=256))]
    pub concurrency: Option<u64>,

    /// Prefix file names with their position, e.g. `3.my-post.md`
    #[arg(short, long)]
    pub numbering: bool,

    /// Front matter layout: hashnode, hugo, jekyll, astro or default
    #[arg(short = 'f', long, value_parser = parse_preset)]
    pub front_matter: Option<FrontMatterPreset>,

    /// Literal text replacement applied to every body, in order
    #[arg(short = 'r', long = "replace", value_name = "SEARCH=REPLACE", value_parser = parse_replacement)]
    pub replacements: Vec<(String, String)>,

    /// Write front matter lists as `- item` blocks instead of `[a, b]`
    #[arg(long)]
    pub block_arrays: bool,

    /// Store entries without deflate compression
    #[arg(long)]
    pub no_compress: bool,

    /// Directory receiving the archive
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// RON settings file (defaults to ./post-exporter.ron when present)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Also write logs to ./exporter.log
    #[arg(long)]
    pub log_file: bool,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, conflicts_with = "quiet")]
    pub verbose: u8,

    /// Only print errors
    #[arg(short, long)]
    pub quiet: bool,
}

impl Args {
    pub fn log_level(&self) -> LevelFilter {
        if self.quiet {
            return LevelFilter::Error;
        }
        match self.verbose {
            0 => LevelFilter::Warn,
            1 => LevelFilter::Info,
            2 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    }
}

fn parse_preset(value: &str) -> Result<FrontMatterPreset, String> {
    value.parse().map_err(|err: exporter_engine::UnknownPreset| err.to_string())
}

fn parse_replacement(value: &str) -> Result<(String, String), String> {
    match value.split_once('=') {
        Some((search, replace)) if !search.is_empty() => {
            Ok((search.to_string(), replace.to_string()))
        }
        _ => Err(format!("expected SEARCH=REPLACE with a non-empty SEARCH, got {value:?}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let args = Args::try_parse_from(["post-exporter", "writer"]).unwrap();
        assert_eq!(args.site, "writer");
        assert_eq!(args.offset, 0);
        assert_eq!(args.limit, 50);
        assert_eq!(args.concurrency, None);
        assert!(!args.numbering);
        assert_eq!(args.front_matter, None);
        assert!(args.replacements.is_empty());
        assert!(!args.block_arrays);
        assert!(!args.no_compress);
        assert_eq!(args.log_level(), LevelFilter::Warn);
    }

    #[test]
    fn site_is_required() {
        let err = Args::try_parse_from(["post-exporter"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn paging_and_concurrency() {
        let args = Args::try_parse_from([
            "post-exporter",
            "writer",
            "--offset",
            "10",
            "-l",
            "5",
            "-c",
            "4",
            "-n",
        ])
        .unwrap();
        assert_eq!(args.offset, 10);
        assert_eq!(args.limit, 5);
        assert_eq!(args.concurrency, Some(4));
        assert!(args.numbering);
    }

    #[test]
    fn zero_limit_and_concurrency_are_rejected() {
        let err = Args::try_parse_from(["post-exporter", "writer", "-l", "0"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
        let err = Args::try_parse_from(["post-exporter", "writer", "-c", "0"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
    }

    #[test]
    fn preset_names_parse() {
        let args = Args::try_parse_from(["post-exporter", "writer", "-f", "hugo"]).unwrap();
        assert_eq!(args.front_matter, Some(FrontMatterPreset::Hugo));
        let err = Args::try_parse_from(["post-exporter", "writer", "-f", "blogger"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
    }

    #[test]
    fn replacements_keep_order_and_split_on_first_equals() {
        let args = Args::try_parse_from([
            "post-exporter",
            "writer",
            "-r",
            "a=b",
            "--replace",
            "x==y",
            "-r",
            "gone=",
        ])
        .unwrap();
        assert_eq!(
            args.replacements,
            vec![
                ("a".to_string(), "b".to_string()),
                ("x".to_string(), "=y".to_string()),
                ("gone".to_string(), String::new()),
            ]
        );
        assert!(Args::try_parse_from(["post-exporter", "writer", "-r", "=x"]).is_err());
        assert!(Args::try_parse_from(["post-exporter", "writer", "-r", "plain"]).is_err());
    }

    #[test]
    fn verbosity_levels() {
        let args = Args::try_parse_from(["post-exporter", "writer", "-vv"]).unwrap();
        assert_eq!(args.log_level(), LevelFilter::Debug);
        let args = Args::try_parse_from(["post-exporter", "writer", "-q"]).unwrap();
        assert_eq!(args.log_level(), LevelFilter::Error);
        let err = Args::try_parse_from(["post-exporter", "writer", "-q", "-v"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ArgumentConflict);
    }
}
