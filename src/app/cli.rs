use std::path::PathBuf;

use clap::{ArgAction, Parser, ValueEnum};

use super::data_io::DataFormat;
use super::resources::ResourceKind;
use super::types::{DEFAULT_LIMIT, Filter};

#[derive(Debug, Parser, Clone)]
#[command(
    name = "reviewq",
    version,
    about = "Terminal review queue for confirming machine-labeled detections"
)]
pub struct Cli {
    #[arg(
        long,
        env = "REVIEWQ_API_BASE",
        value_name = "URL",
        default_value = "http://localhost:8000/v1"
    )]
    pub api_base: String,

    #[arg(long, value_name = "N", default_value_t = DEFAULT_LIMIT)]
    pub limit: u64,

    #[arg(long, value_name = "N", default_value_t = 0)]
    pub offset: u64,

    #[arg(long = "detector", value_name = "ID")]
    pub detector_id: Option<String>,

    #[arg(long, default_value_t = true, action = ArgAction::Set)]
    pub pending_only: bool,

    /// Label vocabulary offered by the form, bound to keys 1-9.
    #[arg(
        long,
        value_name = "LABELS",
        value_delimiter = ',',
        default_value = "YES,NO,UNCLEAR"
    )]
    pub labels: Vec<String>,

    #[arg(long, env = "REVIEWQ_USER", value_name = "NAME")]
    pub user: Option<String>,

    #[arg(long, value_name = "MS")]
    pub timeout_ms: Option<u64>,

    #[arg(long, default_value_t = false)]
    pub no_tui: bool,

    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = FileFormatArg::Csv)]
    pub format: FileFormatArg,

    /// Headless: open this item after loading the page.
    #[arg(long, value_name = "ID", requires = "no_tui")]
    pub select: Option<String>,

    /// Headless: submit this label for the selected item.
    #[arg(long, value_name = "LABEL", requires = "select")]
    pub label: Option<String>,

    #[arg(long, value_name = "0..1", requires = "label")]
    pub confidence: Option<String>,

    #[arg(long, value_name = "TEXT", requires = "label")]
    pub notes: Option<String>,

    #[arg(long, value_name = "N", requires = "label")]
    pub count: Option<String>,

    /// Headless: print a collaborator resource instead of the queue.
    #[arg(long, value_enum, value_name = "KIND", requires = "no_tui")]
    pub resource: Option<ResourceArg>,

    #[arg(long, value_name = "ID", requires = "resource")]
    pub resource_id: Option<String>,

    /// JSON body; creates a resource, or updates the one named by --resource-id.
    #[arg(long, value_name = "JSON", requires = "resource")]
    pub resource_body: Option<String>,

    #[arg(long, default_value_t = false, requires = "resource_id")]
    pub delete: bool,

    /// Write logs here while the TUI owns the terminal.
    #[arg(long, value_name = "PATH")]
    pub log_file: Option<PathBuf>,
}

impl Cli {
    pub fn filter(&self) -> Filter {
        Filter::new(
            self.pending_only,
            self.detector_id.clone(),
            self.limit,
            self.offset,
        )
    }

    pub fn labels(&self) -> Vec<String> {
        self.labels
            .iter()
            .map(|label| label.trim().to_string())
            .filter(|label| !label.is_empty())
            .collect()
    }
}

#[derive(Debug, Copy, Clone, ValueEnum, PartialEq, Eq)]
pub enum FileFormatArg {
    Csv,
    Json,
}

impl From<FileFormatArg> for DataFormat {
    fn from(value: FileFormatArg) -> Self {
        match value {
            FileFormatArg::Csv => DataFormat::Csv,
            FileFormatArg::Json => DataFormat::Json,
        }
    }
}

#[derive(Debug, Copy, Clone, ValueEnum, PartialEq, Eq)]
pub enum ResourceArg {
    AlertRules,
    Streams,
}

impl From<ResourceArg> for ResourceKind {
    fn from(value: ResourceArg) -> Self {
        match value {
            ResourceArg::AlertRules => ResourceKind::AlertRules,
            ResourceArg::Streams => ResourceKind::Streams,
        }
    }
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
    fn defaults_match_the_review_api() {
        let cli = Cli::try_parse_from(["reviewq", "--api-base", "http://api.local/v1"]).unwrap();
        assert_eq!(cli.filter(), Filter::default());
        assert_eq!(cli.labels(), ["YES", "NO", "UNCLEAR"]);
        assert!(!cli.no_tui);
    }

    #[test]
    fn parses_filter_and_headless_submit() {
        let cli = Cli::try_parse_from([
            "reviewq",
            "--api-base",
            "http://api.local/v1",
            "--pending-only",
            "false",
            "--detector",
            "det_dock",
            "--limit",
            "25",
            "--labels",
            "PERSON, VEHICLE ,,EMPTY",
            "--no-tui",
            "--select",
            "iq_9",
            "--label",
            "VEHICLE",
            "--count",
            "2",
            "--format",
            "json",
        ])
        .unwrap();
        assert_eq!(cli.filter(), Filter::new(false, Some("det_dock".into()), 25, 0));
        assert_eq!(cli.labels(), ["PERSON", "VEHICLE", "EMPTY"]);
        assert_eq!(cli.label.as_deref(), Some("VEHICLE"));
        assert_eq!(DataFormat::from(cli.format), DataFormat::Json);
    }

    #[test]
    fn label_needs_a_selection() {
        let err = Cli::try_parse_from(["reviewq", "--no-tui", "--label", "YES"]);
        assert!(err.is_err());
    }

    #[test]
    fn resource_kinds_parse_kebab_case() {
        let cli =
            Cli::try_parse_from(["reviewq", "--no-tui", "--resource", "alert-rules"]).unwrap();
        assert_eq!(cli.resource, Some(ResourceArg::AlertRules));
    }

    #[test]
    fn delete_needs_a_resource_id() {
        assert!(
            Cli::try_parse_from(["reviewq", "--no-tui", "--resource", "streams", "--delete"])
                .is_err()
        );
        let cli = Cli::try_parse_from([
            "reviewq",
            "--no-tui",
            "--resource",
            "streams",
            "--resource-id",
            "dock-cam",
            "--delete",
        ])
        .unwrap();
        assert!(cli.delete);
    }

    #[test]
    fn headless_actions_need_no_tui() {
        let attempts: [&[&str]; 4] = [
            &["reviewq", "--resource", "streams"],
            &["reviewq", "--resource", "streams", "--resource-id", "x", "--delete"],
            &["reviewq", "--select", "iq_1"],
            &["reviewq", "--select", "iq_1", "--label", "YES", "--count", "1"],
        ];
        for args in attempts {
            let err = Cli::try_parse_from(args).unwrap_err();
            assert_eq!(
                err.kind(),
                clap::error::ErrorKind::MissingRequiredArgument,
                "{args:?}"
            );
        }
        assert!(Cli::try_parse_from(["reviewq", "--no-tui", "--select", "iq_1"]).is_ok());
    }
}
