use crate::error::JobError;

use super::FormFields;

/// Header of a Primer3 Boulder-IO settings file.
const SETTINGS_HEADER: &str = "Primer3 File - http://primer3.sourceforge.net\nP3_FILE_TYPE=settings\n\n";

/// User-tunable Primer3 parameters, in the order they are written.
pub const PRIMER3_FIELDS: [&str; 20] = [
    "PRIMER_NUM_RETURN",
    "PRIMER_MIN_SIZE",
    "PRIMER_OPT_SIZE",
    "PRIMER_MAX_SIZE",
    "PRIMER_MIN_TM",
    "PRIMER_OPT_TM",
    "PRIMER_MAX_TM",
    "PRIMER_PAIR_MAX_DIFF_TM",
    "PRIMER_MIN_GC",
    "PRIMER_OPT_GC_PERCENT",
    "PRIMER_MAX_GC",
    "PRIMER_MAX_END_STABILITY",
    "PRIMER_LOWERCASE_MASKING",
    "PRIMER_MIN_LEFT_THREE_PRIME_DISTANCE",
    "PRIMER_MIN_RIGHT_THREE_PRIME_DISTANCE",
    "PRIMER_MAX_SELF_ANY_TH",
    "PRIMER_PAIR_MAX_COMPL_ANY_TH",
    "PRIMER_MAX_SELF_END_TH",
    "PRIMER_PAIR_MAX_COMPL_END_TH",
    "PRIMER_MAX_HAIRPIN_TH",
];

/// Fields Primer3 reads as integers.
const INTEGER_FIELDS: [&str; 6] = [
    "PRIMER_NUM_RETURN",
    "PRIMER_MIN_SIZE",
    "PRIMER_OPT_SIZE",
    "PRIMER_MAX_SIZE",
    "PRIMER_MIN_LEFT_THREE_PRIME_DISTANCE",
    "PRIMER_MIN_RIGHT_THREE_PRIME_DISTANCE",
];

/// Validated Primer3 parameters.
///
/// Values are kept as the user typed them (trimmed) once they have been
/// checked to be numbers, so nothing else can end up in the settings file.
#[derive(Debug, Clone, PartialEq)]
pub struct Primer3Settings {
    values: Vec<(&'static str, String)>,
}

impl Primer3Settings {
    pub fn from_form(form: &FormFields) -> Result<Self, JobError> {
        let values = PRIMER3_FIELDS
            .iter()
            .map(|&field| {
                let raw = form.require(field)?.trim();
                validate_value(field, raw)?;
                Ok((field, raw.to_string()))
            })
            .collect::<Result<Vec<_>, JobError>>()?;

        Ok(Self { values })
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.values
            .iter()
            .find(|(key, _)| *key == field)
            .map(|(_, value)| value.as_str())
    }

    /// Render the settings file Primer3 reads via `--primer3setting`.
    pub fn render(&self) -> String {
        let mut out = String::from(SETTINGS_HEADER);
        out.push_str("PRIMER_EXPLAIN_FLAG=1\n");
        for (key, value) in &self.values {
            out.push_str(key);
            out.push('=');
            out.push_str(value);
            out.push('\n');
        }
        out.push_str("=\n");
        out
    }
}

fn validate_value(field: &'static str, raw: &str) -> Result<(), JobError> {
    if field == "PRIMER_LOWERCASE_MASKING" {
        return match raw {
            "0" | "1" => Ok(()),
            _ => Err(JobError::invalid(field, "must be 0 or 1")),
        };
    }

    if INTEGER_FIELDS.contains(&field) {
        return raw
            .parse::<i64>()
            .map(|_| ())
            .map_err(|_| JobError::invalid(field, format!("'{}' is not an integer", raw)));
    }

    match raw.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(()),
        _ => Err(JobError::invalid(field, format!("'{}' is not a number", raw))),
    }
}
