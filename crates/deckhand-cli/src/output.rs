//! Output formatting for CLI
//!
//! Provides consistent output formatting across all commands:
//! - Human-readable default output
//! - JSON output (--json flag)
//! - Quiet mode for scripting (--quiet flag)
//!
//! `Output` doubles as the sync engine's notifier, so notifications are
//! printed as soon as an operation resolves.

use deckhand_core::{
    Element, ElementKind, Notifier, Presentation, PresentationSummary, Selection, Severity,
};

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable output (default)
    Human,
    /// JSON output
    Json,
    /// Quiet mode - minimal output
    Quiet,
}

impl OutputFormat {
    /// Create format from CLI flags
    pub fn from_flags(json: bool, quiet: bool) -> Self {
        if quiet {
            OutputFormat::Quiet
        } else if json {
            OutputFormat::Json
        } else {
            OutputFormat::Human
        }
    }
}

/// Output helper for consistent formatting
#[derive(Debug, Clone, Copy)]
pub struct Output {
    /// The output format
    pub format: OutputFormat,
}

impl Output {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Check if output is in quiet mode
    pub fn is_quiet(&self) -> bool {
        matches!(self.format, OutputFormat::Quiet)
    }

    /// Whether destructive commands should ask before acting
    pub fn should_prompt(&self) -> bool {
        self.format == OutputFormat::Human
    }

    /// Print a presentation with its slides and elements
    pub fn print_presentation(&self, presentation: &Presentation, selection: &Selection) {
        match self.format {
            OutputFormat::Human => {
                println!("ID:     {}", presentation.id);
                println!("Title:  {}", presentation.title);
                println!("Slides: {}", presentation.slides.len());

                for slide in &presentation.slides {
                    let marker = if selection.active_slide() == Some(&slide.id) {
                        "*"
                    } else {
                        " "
                    };
                    println!();
                    println!(
                        "{} {:>2}. slide {}  {}  ({} element(s))",
                        marker,
                        slide.slide_number,
                        slide.id,
                        slide.background_color,
                        slide.elements.len()
                    );
                    for element in &slide.elements {
                        println!("       {}", describe_element(element));
                    }
                }
            }
            OutputFormat::Json => {
                print_json(&serde_json::json!({
                    "presentation": presentation,
                    "selection": selection,
                }));
            }
            OutputFormat::Quiet => {
                println!("{}", presentation.id);
            }
        }
    }

    /// Print a list of presentations
    pub fn print_summaries(&self, summaries: &[PresentationSummary]) {
        match self.format {
            OutputFormat::Human => {
                if summaries.is_empty() {
                    println!("No presentations found.");
                    return;
                }
                for summary in summaries {
                    let updated = summary
                        .updated_at
                        .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
                        .unwrap_or_else(|| "-".to_string());
                    println!(
                        "{} | {} | {}",
                        truncate(summary.id.as_str(), 36),
                        updated,
                        truncate(&summary.title, 40)
                    );
                }
                println!("\n{} presentation(s)", summaries.len());
            }
            OutputFormat::Json => print_json(&summaries),
            OutputFormat::Quiet => {
                for summary in summaries {
                    println!("{}", summary.id);
                }
            }
        }
    }

    /// Print a single presentation summary
    pub fn print_summary(&self, summary: &PresentationSummary) {
        match self.format {
            OutputFormat::Human => {
                println!("ID:    {}", summary.id);
                println!("Title: {}", summary.title);
            }
            OutputFormat::Json => print_json(summary),
            OutputFormat::Quiet => println!("{}", summary.id),
        }
    }

    /// Print a success message
    pub fn success(&self, message: &str) {
        match self.format {
            OutputFormat::Human => println!("✓ {}", message),
            OutputFormat::Json => {
                println!(
                    "{}",
                    serde_json::json!({"status": "success", "message": message})
                );
            }
            OutputFormat::Quiet => {}
        }
    }

    /// Print an informational message
    pub fn message(&self, msg: &str) {
        match self.format {
            OutputFormat::Human => println!("{}", msg),
            OutputFormat::Json => {
                println!("{}", serde_json::json!({"message": msg}));
            }
            OutputFormat::Quiet => {}
        }
    }

    /// Print an error message (always to stderr, even in quiet mode)
    pub fn error(&self, message: &str) {
        match self.format {
            OutputFormat::Json => {
                eprintln!(
                    "{}",
                    serde_json::json!({"status": "error", "message": message})
                );
            }
            OutputFormat::Human | OutputFormat::Quiet => eprintln!("✗ {}", message),
        }
    }
}

impl Notifier for Output {
    fn notify(&self, message: &str, severity: Severity) {
        match severity {
            Severity::Success => self.success(message),
            Severity::Info => self.message(message),
            Severity::Error => self.error(message),
        }
    }
}

fn print_json<T: serde::Serialize + ?Sized>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Failed to serialize output: {}", e),
    }
}

/// One-line description of an element
fn describe_element(element: &Element) -> String {
    let frame = &element.frame;
    let geometry = format!(
        "@({:.0},{:.0}) {:.0}x{:.0}",
        frame.pos_x, frame.pos_y, frame.width, frame.height
    );
    let detail = match &element.kind {
        ElementKind::Text { content, font_size } => {
            format!("\"{}\" {}pt", truncate_line(content, 40), font_size)
        }
        ElementKind::YoutubeVideo { url } => match element.kind.thumbnail_url() {
            Some(thumb) => format!("{} (thumbnail {})", truncate(url, 40), thumb),
            None => truncate(url, 40),
        },
        ElementKind::Image { url } | ElementKind::UploadedVideo { url } => truncate(url, 50),
    };
    format!(
        "{} {} {} {}",
        element.id,
        element.element_type(),
        geometry,
        detail
    )
}

/// Truncate a string to max characters, adding "..." if truncated
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

/// Truncate to first line and max length
fn truncate_line(s: &str, max_len: usize) -> String {
    let first_line = s.lines().next().unwrap_or("");
    truncate(first_line, max_len)
}

#[cfg(test)]
mod tests {
    use super::*;
    use deckhand_core::{ElementId, NewElement};

    #[test]
    fn test_format_from_flags() {
        assert_eq!(OutputFormat::from_flags(false, false), OutputFormat::Human);
        assert_eq!(OutputFormat::from_flags(true, false), OutputFormat::Json);
        assert_eq!(OutputFormat::from_flags(false, true), OutputFormat::Quiet);
        // Quiet takes precedence
        assert_eq!(OutputFormat::from_flags(true, true), OutputFormat::Quiet);
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("this is a long string", 10), "this is...");
        // Multi-byte characters are never split
        assert_eq!(truncate("ééééééé", 5), "éé...");
    }

    #[test]
    fn test_truncate_line() {
        assert_eq!(truncate_line("line one\nline two", 20), "line one");
        assert_eq!(truncate_line("", 5), "");
    }

    #[test]
    fn test_describe_element() {
        let text = NewElement::text("Hello\nworld")
            .build(ElementId::new("e1"))
            .unwrap();
        assert_eq!(
            describe_element(&text),
            "e1 TEXT @(100,100) 400x150 \"Hello\" 24pt"
        );
    }
}
