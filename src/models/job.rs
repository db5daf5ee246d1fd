use std::fmt;

use serde::Serialize;

use crate::error::JobError;

use super::{FormFields, InputList, Primer3Settings};

/// Template selection value that means "use the pasted FASTA".
pub const CUSTOM_TEMPLATE: &str = "custom";

/// Which half of the tool the form was submitted from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AppType {
    Design,
    Check,
}

impl AppType {
    /// Only an explicit `design` selects design mode; anything else is a check.
    pub fn from_form(form: &FormFields) -> Self {
        match form.get("app-type").map(str::trim) {
            Some("design") => Self::Design,
            _ => Self::Check,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Design => "design",
            Self::Check => "check",
        }
    }
}

/// A database file name inside the configured database directory.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct DatabaseName(String);

impl DatabaseName {
    pub fn parse(field: &str, raw: &str) -> Result<Self, JobError> {
        let name = raw.trim();
        if name.is_empty() {
            return Err(JobError::invalid(field, "database name is empty"));
        }
        if name.starts_with('.') {
            return Err(JobError::invalid(
                field,
                format!("'{}' is not a valid database name", name),
            ));
        }
        let valid = name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'));
        if !valid {
            return Err(JobError::invalid(
                field,
                format!("'{}' is not a valid database name", name),
            ));
        }
        Ok(Self(name.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DatabaseName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The sequences primers are designed against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Template {
    /// A prepared database from the database directory.
    Database(DatabaseName),
    /// FASTA pasted into the form.
    Custom(String),
}

/// Amplicon size window for the specificity check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SizeRange {
    pub start: u32,
    pub stop: u32,
}

impl SizeRange {
    pub fn from_form(form: &FormFields) -> Result<Self, JobError> {
        let start = form.require_u32("size_start")?;
        let stop = form.require_u32("size_stop")?;
        if start > stop {
            return Err(JobError::invalid(
                "size_start",
                format!("{} is greater than size_stop {}", start, stop),
            ));
        }
        Ok(Self { start, stop })
    }
}

#[derive(Debug, Clone)]
pub struct DesignRequest {
    pub settings: Primer3Settings,
    pub template: Template,
    pub regions: InputList,
    pub databases: Vec<DatabaseName>,
    pub size_range: SizeRange,
    /// How many primer pairs to keep per site in the final selection.
    pub retain: u32,
}

#[derive(Debug, Clone)]
pub struct CheckRequest {
    pub primers: InputList,
    pub databases: Vec<DatabaseName>,
    pub size_range: SizeRange,
}

#[derive(Debug, Clone)]
pub enum JobRequest {
    Design(DesignRequest),
    Check(CheckRequest),
}

impl JobRequest {
    pub fn from_form(form: &FormFields) -> Result<Self, JobError> {
        match AppType::from_form(form) {
            AppType::Design => {
                let settings = Primer3Settings::from_form(form)?;
                let template = parse_template(form)?;
                let regions = InputList::parse(form.get("template-regions").unwrap_or_default());
                let databases = parse_databases(form)?;
                let size_range = SizeRange::from_form(form)?;
                let retain = form.require_u32("retain")?;

                Ok(Self::Design(DesignRequest {
                    settings,
                    template,
                    regions,
                    databases,
                    size_range,
                    retain,
                }))
            }
            AppType::Check => {
                let primers = InputList::parse(form.get("check-primers").unwrap_or_default());
                let databases = parse_databases(form)?;
                let size_range = SizeRange::from_form(form)?;

                Ok(Self::Check(CheckRequest {
                    primers,
                    databases,
                    size_range,
                }))
            }
        }
    }

    pub fn app_type(&self) -> AppType {
        match self {
            Self::Design(_) => AppType::Design,
            Self::Check(_) => AppType::Check,
        }
    }

    pub fn databases(&self) -> &[DatabaseName] {
        match self {
            Self::Design(req) => &req.databases,
            Self::Check(req) => &req.databases,
        }
    }
}

fn parse_template(form: &FormFields) -> Result<Template, JobError> {
    let selected = form.require("select-template")?.trim();
    if selected == CUSTOM_TEMPLATE {
        let sequences = form.get("custom-template-sequences").unwrap_or_default();
        if sequences.trim().is_empty() {
            return Err(JobError::invalid(
                "custom-template-sequences",
                "no sequences were provided for the custom template",
            ));
        }
        return Ok(Template::Custom(sequences.to_string()));
    }
    DatabaseName::parse("select-template", selected).map(Template::Database)
}

fn parse_databases(form: &FormFields) -> Result<Vec<DatabaseName>, JobError> {
    let databases = form
        .get_all("select-database")
        .into_iter()
        .map(|raw| DatabaseName::parse("select-database", raw))
        .collect::<Result<Vec<_>, _>>()?;

    if databases.is_empty() {
        return Err(JobError::invalid(
            "select-database",
            "select at least one database",
        ));
    }
    Ok(databases)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn app_type_defaults_to_check() {
        let form: FormFields = [("app-type", "anything")].into_iter().collect();
        assert_eq!(AppType::from_form(&form), AppType::Check);
        assert_eq!(AppType::from_form(&FormFields::default()), AppType::Check);

        let form: FormFields = [("app-type", "design")].into_iter().collect();
        assert_eq!(AppType::from_form(&form), AppType::Design);
    }

    #[test]
    fn database_names_cannot_escape_the_directory() {
        assert!(DatabaseName::parse("db", "hg19.fa").is_ok());
        assert!(DatabaseName::parse("db", "mouse_mm10-v2").is_ok());
        assert!(DatabaseName::parse("db", "../etc/passwd").is_err());
        assert!(DatabaseName::parse("db", ".hidden").is_err());
        assert!(DatabaseName::parse("db", "a b").is_err());
        assert!(DatabaseName::parse("db", "a;rm -rf").is_err());
        assert!(DatabaseName::parse("db", "  ").is_err());
    }

    #[test]
    fn size_range_must_be_ordered() {
        let form: FormFields = [("size_start", "500"), ("size_stop", "100")]
            .into_iter()
            .collect();
        assert!(SizeRange::from_form(&form).is_err());

        let form: FormFields = [("size_start", "50"), ("size_stop", "2000")]
            .into_iter()
            .collect();
        assert_eq!(
            SizeRange::from_form(&form).unwrap(),
            SizeRange { start: 50, stop: 2000 }
        );
    }

    #[test]
    fn check_request_collects_databases() {
        let form: FormFields = [
            ("app-type", "check"),
            ("check-primers", "P1 ACGTACGT TTGGCCAA\nP1 ACGTACGT TTGGCCAA"),
            ("select-database[]", "hg19"),
            ("select-database[]", "mm10"),
            ("size_start", "50"),
            ("size_stop", "1000"),
        ]
        .into_iter()
        .collect();

        let JobRequest::Check(req) = JobRequest::from_form(&form).unwrap() else {
            panic!("expected a check request");
        };
        assert_eq!(req.primers.used(), 1);
        assert_eq!(req.primers.detected(), 2);
        assert_eq!(
            req.databases.iter().map(|d| d.as_str()).collect::<Vec<_>>(),
            vec!["hg19", "mm10"]
        );
    }

    #[test]
    fn a_database_selection_is_required() {
        let form: FormFields = [
            ("check-primers", "P1 ACGT TGCA"),
            ("size_start", "50"),
            ("size_stop", "1000"),
        ]
        .into_iter()
        .collect();

        let err = JobRequest::from_form(&form).unwrap_err();
        assert!(matches!(err, JobError::InvalidField { ref field, .. } if field == "select-database"));
    }

    #[test]
    fn custom_template_requires_sequences() {
        let form: FormFields = [("select-template", "custom"), ("custom-template-sequences", " ")]
            .into_iter()
            .collect();
        assert!(parse_template(&form).is_err());

        let form: FormFields = [
            ("select-template", "custom"),
            ("custom-template-sequences", ">s1\nACGT"),
        ]
        .into_iter()
        .collect();
        assert_eq!(
            parse_template(&form).unwrap(),
            Template::Custom(">s1\nACGT".to_string())
        );
    }
}
