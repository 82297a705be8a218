/// Delivery note model
///
/// A delivery note records hours worked and/or materials supplied for one
/// project of one client. Notes start as drafts and are signed exactly once;
/// a signed note is immutable.
///
/// # Schema
///
/// ```sql
/// CREATE TYPE note_format AS ENUM ('hours', 'materials', 'both');
///
/// CREATE TABLE delivery_notes (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     owner_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     client_id UUID NOT NULL REFERENCES clients(id) ON DELETE CASCADE,
///     project_id UUID NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
///     format note_format NOT NULL,
///     description TEXT NOT NULL DEFAULT '',
///     workers JSONB NOT NULL DEFAULT '[]',
///     materials JSONB NOT NULL DEFAULT '[]',
///     work_date TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     sign TEXT NOT NULL DEFAULT '',
///     pending BOOLEAN NOT NULL DEFAULT TRUE,
///     pdf_url TEXT NOT NULL DEFAULT '',
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```
///
/// # State Machine
///
/// ```text
/// Draft (sign = '', pending = true) ──sign──> Signed (sign = url, pending = false)
/// ```
///
/// There is no way back to `Draft`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::FieldIssue;

/// Which kinds of lines a note carries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "note_format", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum NoteFormat {
    Hours,
    Materials,
    Both,
}

impl NoteFormat {
    pub fn has_hours(&self) -> bool {
        matches!(self, NoteFormat::Hours | NoteFormat::Both)
    }

    pub fn has_materials(&self) -> bool {
        matches!(self, NoteFormat::Materials | NoteFormat::Both)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            NoteFormat::Hours => "hours",
            NoteFormat::Materials => "materials",
            NoteFormat::Both => "both",
        }
    }
}

/// Hours worked by one person
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerLine {
    pub name: String,
    pub hours: f64,
}

/// Material supplied
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterialLine {
    pub name: String,
    pub quantity: f64,
    pub unit: String,
}

/// Lifecycle state derived from the `sign` field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoteState {
    Draft,
    Signed,
}

impl NoteState {
    /// Checks if a state transition is valid
    pub fn can_transition_to(&self, next: &NoteState) -> bool {
        matches!((self, next), (NoteState::Draft, NoteState::Signed))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryNote {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub client_id: Uuid,
    pub project_id: Uuid,
    pub format: NoteFormat,
    pub description: String,
    pub workers: Vec<WorkerLine>,
    pub materials: Vec<MaterialLine>,

    /// Day the work was done
    pub date: DateTime<Utc>,

    /// Signature artifact URL; empty while unsigned
    pub sign: String,

    /// True until signed
    pub pending: bool,

    /// Cached rendered PDF URL; empty when nothing is cached
    pub pdf_url: String,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DeliveryNote {
    pub fn state(&self) -> NoteState {
        if self.sign.is_empty() {
            NoteState::Draft
        } else {
            NoteState::Signed
        }
    }

    pub fn is_signed(&self) -> bool {
        self.state() == NoteState::Signed
    }

    /// Cached PDF URL that is safe to reuse without rendering again
    pub fn cached_signed_pdf(&self) -> Option<&str> {
        if self.is_signed() && !self.pdf_url.is_empty() {
            Some(&self.pdf_url)
        } else {
            None
        }
    }

    pub fn total_hours(&self) -> f64 {
        self.workers.iter().map(|w| w.hours).sum()
    }
}

/// Input for creating a delivery note
#[derive(Debug, Clone)]
pub struct NewDeliveryNote {
    pub client_id: Uuid,
    pub project_id: Uuid,
    pub format: NoteFormat,
    pub description: String,
    pub workers: Vec<WorkerLine>,
    pub materials: Vec<MaterialLine>,
    pub date: DateTime<Utc>,
}

/// Validates the lines of a note against its format
///
/// Hours formats need at least one worker, material formats at least one
/// material, and lines of a kind the format does not carry are rejected.
pub fn validate_lines(
    format: NoteFormat,
    workers: &[WorkerLine],
    materials: &[MaterialLine],
) -> Result<(), Vec<FieldIssue>> {
    let mut issues = Vec::new();

    if format.has_hours() {
        if workers.is_empty() {
            issues.push(FieldIssue::new(
                "workers",
                format!("at least one worker is required for format {}", format.as_str()),
            ));
        }
        for (i, worker) in workers.iter().enumerate() {
            if worker.name.trim().is_empty() {
                issues.push(FieldIssue::new(format!("workers[{}].name", i), "must not be empty"));
            }
            if !(worker.hours.is_finite() && worker.hours > 0.0) {
                issues.push(FieldIssue::new(
                    format!("workers[{}].hours", i),
                    "must be a positive number",
                ));
            }
        }
    } else if !workers.is_empty() {
        issues.push(FieldIssue::new("workers", "not allowed for format materials"));
    }

    if format.has_materials() {
        if materials.is_empty() {
            issues.push(FieldIssue::new(
                "materials",
                format!("at least one material is required for format {}", format.as_str()),
            ));
        }
        for (i, material) in materials.iter().enumerate() {
            if material.name.trim().is_empty() {
                issues.push(FieldIssue::new(format!("materials[{}].name", i), "must not be empty"));
            }
            if !(material.quantity.is_finite() && material.quantity > 0.0) {
                issues.push(FieldIssue::new(
                    format!("materials[{}].quantity", i),
                    "must be a positive number",
                ));
            }
            if material.unit.trim().is_empty() {
                issues.push(FieldIssue::new(format!("materials[{}].unit", i), "must not be empty"));
            }
        }
    } else if !materials.is_empty() {
        issues.push(FieldIssue::new("materials", "not allowed for format hours"));
    }

    if issues.is_empty() {
        Ok(())
    } else {
        Err(issues)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn worker() -> WorkerLine {
        WorkerLine {
            name: "Luis".into(),
            hours: 7.5,
        }
    }

    fn cable() -> MaterialLine {
        MaterialLine {
            name: "Cable".into(),
            quantity: 20.0,
            unit: "m".into(),
        }
    }

    #[test]
    fn test_hours_requires_workers() {
        let issues = validate_lines(NoteFormat::Hours, &[], &[]).unwrap_err();
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].field, "workers");

        assert!(validate_lines(NoteFormat::Hours, &[worker()], &[]).is_ok());
    }

    #[test]
    fn test_both_requires_both_lists() {
        assert!(validate_lines(NoteFormat::Both, &[worker()], &[]).is_err());
        assert!(validate_lines(NoteFormat::Both, &[], &[cable()]).is_err());
        assert!(validate_lines(NoteFormat::Both, &[worker()], &[cable()]).is_ok());
    }

    #[test]
    fn test_line_fields_are_checked() {
        let bad_worker = WorkerLine {
            name: "".into(),
            hours: -1.0,
        };
        let bad_material = MaterialLine {
            name: "Tubo".into(),
            quantity: 0.0,
            unit: " ".into(),
        };

        let issues = validate_lines(NoteFormat::Both, &[bad_worker], &[bad_material]).unwrap_err();
        let fields: Vec<_> = issues.iter().map(|i| i.field.as_str()).collect();
        assert_eq!(
            fields,
            vec![
                "workers[0].name",
                "workers[0].hours",
                "materials[0].quantity",
                "materials[0].unit"
            ]
        );
    }

    #[test]
    fn test_foreign_lines_rejected() {
        assert!(validate_lines(NoteFormat::Materials, &[worker()], &[cable()]).is_err());
        assert!(validate_lines(NoteFormat::Hours, &[worker()], &[cable()]).is_err());
    }

    #[test]
    fn test_state_transitions() {
        assert!(NoteState::Draft.can_transition_to(&NoteState::Signed));
        assert!(!NoteState::Signed.can_transition_to(&NoteState::Draft));
        assert!(!NoteState::Signed.can_transition_to(&NoteState::Signed));
    }

    #[test]
    fn test_format_deserializes_lowercase() {
        let format: NoteFormat = serde_json::from_str("\"both\"").unwrap();
        assert_eq!(format, NoteFormat::Both);
        assert!(format.has_hours() && format.has_materials());
    }
}
