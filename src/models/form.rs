use crate::error::JobError;

/// Raw form fields in submission order.
///
/// Fields may repeat. Multi-select inputs arrive either as repeated `name`
/// pairs or with the PHP-style `name[]` spelling; both are accepted.
#[derive(Debug, Clone, Default)]
pub struct FormFields {
    pairs: Vec<(String, String)>,
}

impl FormFields {
    pub fn new(pairs: Vec<(String, String)>) -> Self {
        Self { pairs }
    }

    /// First value submitted for `name`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Every value submitted for `name` or `name[]`.
    pub fn get_all(&self, name: &str) -> Vec<&str> {
        let array_name = format!("{}[]", name);
        self.pairs
            .iter()
            .filter(|(key, _)| key == name || *key == array_name)
            .map(|(_, value)| value.as_str())
            .collect()
    }

    pub fn require(&self, name: &'static str) -> Result<&str, JobError> {
        self.get(name).ok_or(JobError::MissingField(name))
    }

    /// Parse a required non-negative integer field.
    pub fn require_u32(&self, name: &'static str) -> Result<u32, JobError> {
        let raw = self.require(name)?.trim();
        raw.parse::<u32>()
            .map_err(|_| JobError::invalid(name, format!("'{}' is not a non-negative integer", raw)))
    }
}

impl From<Vec<(String, String)>> for FormFields {
    fn from(pairs: Vec<(String, String)>) -> Self {
        Self::new(pairs)
    }
}

impl<'a> FromIterator<(&'a str, &'a str)> for FormFields {
    fn from_iter<I: IntoIterator<Item = (&'a str, &'a str)>>(iter: I) -> Self {
        Self::new(
            iter.into_iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_returns_first_value() {
        let form: FormFields = [("a", "1"), ("a", "2")].into_iter().collect();
        assert_eq!(form.get("a"), Some("1"));
        assert_eq!(form.get("b"), None);
    }

    #[test]
    fn get_all_accepts_array_spelling() {
        let form: FormFields = [
            ("select-database", "hg19"),
            ("select-database[]", "mm10"),
            ("other", "x"),
        ]
        .into_iter()
        .collect();

        assert_eq!(form.get_all("select-database"), vec!["hg19", "mm10"]);
    }

    #[test]
    fn require_u32_rejects_negative_and_text() {
        let form: FormFields = [("retain", "-1"), ("size_start", "abc"), ("size_stop", " 300 ")]
            .into_iter()
            .collect();

        assert!(matches!(
            form.require_u32("retain"),
            Err(JobError::InvalidField { .. })
        ));
        assert!(form.require_u32("size_start").is_err());
        assert_eq!(form.require_u32("size_stop").unwrap(), 300);
        assert!(matches!(
            form.require_u32("missing"),
            Err(JobError::MissingField("missing"))
        ));
    }
}
