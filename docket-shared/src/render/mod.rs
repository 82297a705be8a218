//! Document renderer for delivery notes
//!
//! Rendering is split in two: [`layout`] turns a note and its references
//! into semantic lines with no I/O, and a [`DocumentRenderer`] turns those
//! lines into document bytes. Nothing here uploads or persists.

use crate::models::client::Client;
use crate::models::delivery_note::DeliveryNote;
use crate::models::project::Project;
use crate::models::user::User;

mod pdf;

pub use pdf::PdfRenderer;

/// Error type for rendering
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("PDF generation failed: {0}")]
    Pdf(String),

    #[error("Render task failed: {0}")]
    Task(String),
}

/// Snapshot of everything a rendered note shows
///
/// Client and project are optional so that a note whose references were
/// removed still renders.
#[derive(Debug, Clone)]
pub struct RenderContext {
    pub note: DeliveryNote,
    pub owner: User,
    pub client: Option<Client>,
    pub project: Option<Project>,
}

/// Visual role of a line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineStyle {
    Title,
    Heading,
    Body,
    Status,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line {
    pub style: LineStyle,
    pub text: String,
}

impl Line {
    fn new(style: LineStyle, text: impl Into<String>) -> Self {
        Self {
            style,
            text: text.into(),
        }
    }

    fn body(text: impl Into<String>) -> Self {
        Self::new(LineStyle::Body, text)
    }
}

pub const SIGNED_LABEL: &str = "SIGNED";
pub const UNSIGNED_LABEL: &str = "NOT SIGNED";

/// Lays a note out as lines, top to bottom
pub fn layout(ctx: &RenderContext) -> Vec<Line> {
    let note = &ctx.note;
    let mut lines = vec![Line::new(
        LineStyle::Title,
        format!("Delivery note {}", note.id),
    )];

    lines.push(Line::new(LineStyle::Heading, "Details"));
    lines.push(Line::body(format!("Date: {}", note.date.format("%Y-%m-%d"))));

    let issuer = match ctx.owner.full_name() {
        Some(name) => format!("Issued by: {} <{}>", name, ctx.owner.email),
        None => format!("Issued by: {}", ctx.owner.email),
    };
    lines.push(Line::body(issuer));

    lines.push(Line::body(match &ctx.client {
        Some(client) => format!("Client: {} (CIF {})", client.name, client.cif),
        None => "Client: (no longer available)".to_string(),
    }));

    lines.push(Line::body(match &ctx.project {
        Some(project) => format!("Project: {} ({})", project.name, project.project_code),
        None => "Project: (no longer available)".to_string(),
    }));

    if !note.description.trim().is_empty() {
        lines.push(Line::body(format!("Description: {}", note.description.trim())));
    }

    if note.format.has_hours() {
        lines.push(Line::new(LineStyle::Heading, "Hours"));
        for worker in &note.workers {
            lines.push(Line::body(format!("{}: {} h", worker.name, worker.hours)));
        }
        lines.push(Line::body(format!("Total hours: {}", note.total_hours())));
    }

    if note.format.has_materials() {
        lines.push(Line::new(LineStyle::Heading, "Materials"));
        for material in &note.materials {
            lines.push(Line::body(format!(
                "{}: {} {}",
                material.name, material.quantity, material.unit
            )));
        }
    }

    if note.is_signed() {
        lines.push(Line::new(LineStyle::Status, format!("Status: {}", SIGNED_LABEL)));
        lines.push(Line::body(format!("Signature: {}", note.sign)));
    } else {
        lines.push(Line::new(LineStyle::Status, format!("Status: {}", UNSIGNED_LABEL)));
    }

    lines
}

/// Turns a render context into document bytes
///
/// Implementations are synchronous and CPU-bound; callers run them on the
/// blocking pool.
pub trait DocumentRenderer: Send + Sync {
    fn render(&self, ctx: &RenderContext) -> Result<Vec<u8>, RenderError>;

    /// File extension of produced documents
    fn extension(&self) -> &'static str {
        "pdf"
    }
}
