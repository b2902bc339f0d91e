//! Exam names: the built-in catalog and synonym normalization.

use std::collections::BTreeSet;

/// Exams the bundled science corpora are drawn from.
pub const KNOWN_EXAMS: &[&str] = &[
    "ACTAAP",
    "AIMS",
    "Louisiana Educational Assessment Program",
    "MCAS",
    "MEA",
    "MSA",
    "TIMSS",
    "WASL",
    "Alaska Department of Education and Early Development",
    "California Standards Test",
    "FCAT",
    "Maryland School Assessment",
    "MEAP",
    "NAEP",
    "North Carolina READY End-of-Grade Assessment",
    "NYSEDREGENTS",
    "Ohio Achievement Tests",
    "TAKS",
    "Virginia Standards of Learning - Science",
    "AMP",
];

/// Alternate spellings collapsed onto one canonical name at ingestion.
const SYNONYMS: &[(&str, &str)] = &[
    (
        "California Standards Test - Science",
        "California Standards Test",
    ),
    (
        "Maryland School Assessment - Science",
        "Maryland School Assessment",
    ),
    (
        "Alaska Department of Education & Early Development",
        "Alaska Department of Education and Early Development",
    ),
    (
        "Alaska Dept. of Education & Early Development",
        "Alaska Department of Education and Early Development",
    ),
    ("Texas Assessment of Knowledge and Skills", "TAKS"),
];

/// Map an exam label to its canonical spelling. Unknown labels are returned trimmed.
pub fn normalize_exam_name(name: &str) -> String {
    let trimmed = name.trim();
    SYNONYMS
        .iter()
        .find(|(alias, _)| alias.eq_ignore_ascii_case(trimmed))
        .map(|(_, canonical)| (*canonical).to_string())
        .or_else(|| {
            KNOWN_EXAMS
                .iter()
                .find(|known| known.eq_ignore_ascii_case(trimmed))
                .map(|known| (*known).to_string())
        })
        .unwrap_or_else(|| trimmed.to_string())
}

/// The set of exam names a session may prefer.
#[derive(Debug, Clone)]
pub struct ExamCatalog {
    names: BTreeSet<String>,
}

impl ExamCatalog {
    /// Catalog holding only the built-in exams.
    pub fn builtin() -> Self {
        Self {
            names: KNOWN_EXAMS.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Built-in exams plus any extra names (normalized).
    pub fn with_extra<I, S>(extra: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut catalog = Self::builtin();
        for name in extra {
            catalog.names.insert(normalize_exam_name(name.as_ref()));
        }
        catalog
    }

    /// Canonical name if `name` (or a synonym of it) is known.
    pub fn resolve(&self, name: &str) -> Option<String> {
        let canonical = normalize_exam_name(name);
        self.names.contains(&canonical).then_some(canonical)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.resolve(name).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn synonyms_collapse() {
        assert_eq!(
            normalize_exam_name("Alaska Dept. of Education & Early Development"),
            "Alaska Department of Education and Early Development"
        );
        assert_eq!(
            normalize_exam_name("  California Standards Test - Science "),
            "California Standards Test"
        );
        assert_eq!(normalize_exam_name("mcas"), "MCAS");
        assert_eq!(normalize_exam_name("Local Quiz"), "Local Quiz");
    }

    #[test]
    fn catalog_resolves_known_and_extra() {
        let catalog = ExamCatalog::with_extra(["Local Quiz"]);
        assert_eq!(catalog.resolve("taks").as_deref(), Some("TAKS"));
        assert_eq!(catalog.resolve("Local Quiz").as_deref(), Some("Local Quiz"));
        assert!(!catalog.contains("SAT"));
        assert!(!ExamCatalog::builtin().contains("Local Quiz"));
    }
}
