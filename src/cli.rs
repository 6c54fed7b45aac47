use std::path::PathBuf;

use clap::Parser;

use crate::models::FieldName;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Directory of syllabus text files to scan
    pub dir_path: String,

    /// Output file path
    #[arg(default_value = "output.json", short)]
    pub output_file: String,

    /// Maximum recursion depth (0 means no recursion)
    #[arg(short, long, default_value = "50")]
    pub max_depth: usize,

    /// Exclude patterns (glob patterns like "*.tmp" or "drafts")
    #[arg(short, long, value_delimiter = ',')]
    pub exclude: Vec<String>,

    /// Calibration overrides (.toml, .yaml or .yml)
    #[arg(short, long)]
    pub calibration: Option<PathBuf>,

    /// Only detect these fields (e.g. "email,office_hours"); all fields by default
    #[arg(short, long, value_delimiter = ',')]
    pub fields: Vec<FieldName>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_fields_and_calibration() {
        let cli = Cli::try_parse_from([
            "syllabus-check",
            "syllabi",
            "-o",
            "report.json",
            "--fields",
            "email,credit_hours",
            "--calibration",
            "tuning.yaml",
        ])
        .unwrap();
        assert_eq!(cli.dir_path, "syllabi");
        assert_eq!(cli.output_file, "report.json");
        assert_eq!(cli.fields, vec![FieldName::Email, FieldName::CreditHours]);
        assert_eq!(cli.calibration, Some(PathBuf::from("tuning.yaml")));
        assert_eq!(cli.max_depth, 50);
    }

    #[test]
    fn test_unknown_field_is_rejected() {
        assert!(Cli::try_parse_from(["syllabus-check", "syllabi", "--fields", "gpa"]).is_err());
    }
}
