use serde::{Deserialize, Serialize};
use std::fmt;

//
// ─── IDENTITY FIELDS ──────────────────────────────────────────────────────────
//

/// The three identity fields collected before an interview starts, always
/// requested in this order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentityField {
    Name,
    Email,
    Phone,
}

impl IdentityField {
    /// All fields in the fixed collection order.
    pub const ORDERED: [IdentityField; 3] =
        [IdentityField::Name, IdentityField::Email, IdentityField::Phone];

    /// Human-readable label used in prompts ("Please provide your name").
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            IdentityField::Name => "name",
            IdentityField::Email => "email",
            IdentityField::Phone => "phone",
        }
    }
}

impl fmt::Display for IdentityField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Raw extraction result from the document-parsing collaborator. Any field
/// may be missing or blank; blank counts as missing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedFields {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    #[serde(default)]
    pub resume_text: String,
}

/// Candidate identity once collection is complete. Immutable for the
/// lifetime of the session it belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateIdentity {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub resume_text: String,
}

//
// ─── COLLECTOR ────────────────────────────────────────────────────────────────
//

fn present(value: Option<&String>) -> Option<String> {
    value
        .map(|v| v.to_string())
        .filter(|v| !v.trim().is_empty())
}

/// Incrementally fills in identity fields the extraction step could not
/// provide, prompting for one field at a time in the fixed order.
///
/// Supplied values are accepted verbatim; validating their shape is the
/// extraction collaborator's concern, not the core's.
#[derive(Debug, Clone)]
pub struct IdentityCollector {
    name: Option<String>,
    email: Option<String>,
    phone: Option<String>,
    resume_text: String,
}

impl IdentityCollector {
    /// Seeds the collector from an extraction result, treating blank values
    /// as missing.
    #[must_use]
    pub fn ingest(extracted: ExtractedFields) -> Self {
        Self {
            name: present(extracted.name.as_ref()),
            email: present(extracted.email.as_ref()),
            phone: present(extracted.phone.as_ref()),
            resume_text: extracted.resume_text,
        }
    }

    /// Fields still missing, in the order they will be requested.
    #[must_use]
    pub fn missing(&self) -> Vec<IdentityField> {
        IdentityField::ORDERED
            .into_iter()
            .filter(|field| self.get(*field).is_none())
            .collect()
    }

    /// The next field to prompt for, if any.
    #[must_use]
    pub fn next_missing(&self) -> Option<IdentityField> {
        self.missing().into_iter().next()
    }

    /// Records a value for the first missing field and returns the next one
    /// still missing, or `None` once collection is complete.
    ///
    /// Values are taken as-is, even if empty or whitespace-only.
    pub fn supply(&mut self, value: impl Into<String>) -> Option<IdentityField> {
        if let Some(field) = self.next_missing() {
            self.set(field, value.into());
        }
        self.next_missing()
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.missing().is_empty()
    }

    #[must_use]
    pub fn resume_text(&self) -> &str {
        &self.resume_text
    }

    /// Finishes collection, yielding the immutable identity.
    ///
    /// Returns `Err(self)` when fields are still missing, so the caller can
    /// keep prompting.
    pub fn finish(self) -> Result<CandidateIdentity, IdentityCollector> {
        match (&self.name, &self.email, &self.phone) {
            (Some(name), Some(email), Some(phone)) => Ok(CandidateIdentity {
                name: name.clone(),
                email: email.clone(),
                phone: phone.clone(),
                resume_text: self.resume_text,
            }),
            _ => Err(self),
        }
    }

    fn get(&self, field: IdentityField) -> Option<&String> {
        match field {
            IdentityField::Name => self.name.as_ref(),
            IdentityField::Email => self.email.as_ref(),
            IdentityField::Phone => self.phone.as_ref(),
        }
    }

    fn set(&mut self, field: IdentityField, value: String) {
        match field {
            IdentityField::Name => self.name = Some(value),
            IdentityField::Email => self.email = Some(value),
            IdentityField::Phone => self.phone = Some(value),
        }
    }
}

//
// ─── TESTS ────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;

    fn extracted(name: Option<&str>, email: Option<&str>, phone: Option<&str>) -> ExtractedFields {
        ExtractedFields {
            name: name.map(String::from),
            email: email.map(String::from),
            phone: phone.map(String::from),
            resume_text: "ten years of Rust".into(),
        }
    }

    #[test]
    fn complete_extraction_needs_no_prompts() {
        let collector =
            IdentityCollector::ingest(extracted(Some("Ana"), Some("a@b.c"), Some("+1")));
        assert!(collector.is_complete());

        let identity = collector.finish().unwrap();
        assert_eq!(identity.name, "Ana");
        assert_eq!(identity.resume_text, "ten years of Rust");
    }

    #[test]
    fn missing_fields_are_reported_in_fixed_order() {
        let collector = IdentityCollector::ingest(extracted(None, Some("a@b.c"), None));
        assert_eq!(
            collector.missing(),
            vec![IdentityField::Name, IdentityField::Phone]
        );
        assert_eq!(collector.next_missing(), Some(IdentityField::Name));
    }

    #[test]
    fn blank_extracted_values_count_as_missing() {
        let collector = IdentityCollector::ingest(extracted(Some("   "), Some(""), Some("+1")));
        assert_eq!(
            collector.missing(),
            vec![IdentityField::Name, IdentityField::Email]
        );
    }

    #[test]
    fn supply_fills_fields_one_at_a_time() {
        let mut collector = IdentityCollector::ingest(extracted(None, None, Some("+1")));

        assert_eq!(collector.supply("Ana"), Some(IdentityField::Email));
        assert_eq!(collector.supply("ana@example.com"), None);
        assert!(collector.is_complete());

        let identity = collector.finish().unwrap();
        assert_eq!(identity.email, "ana@example.com");
        assert_eq!(identity.phone, "+1");
    }

    #[test]
    fn supplied_whitespace_is_accepted_verbatim() {
        let mut collector =
            IdentityCollector::ingest(extracted(None, Some("a@b.c"), Some("+1")));
        assert_eq!(collector.supply("  "), None);
        assert_eq!(collector.finish().unwrap().name, "  ");
    }

    #[test]
    fn finish_returns_collector_while_incomplete() {
        let collector = IdentityCollector::ingest(extracted(None, None, None));
        let collector = collector.finish().unwrap_err();
        assert_eq!(collector.missing().len(), 3);
    }
}
