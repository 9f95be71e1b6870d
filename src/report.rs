use crate::error::Result;
use crate::parser::{Bucket, CategorizedItem, ParsedContent};
use chrono::{Local, NaiveDateTime};
use std::fs;
use std::path::{Path, PathBuf};

/// Discussions shown per report
pub const MAX_DISCUSSIONS: usize = 10;

/// Characters of tweet text shown on the console
const CONSOLE_TEXT_CHARS: usize = 200;

/// Report sections in display order
pub const SECTIONS: [(Bucket, &str); 4] = [
    (Bucket::News, "📰 Top News"),
    (Bucket::Threads, "🧵 Interesting Threads"),
    (Bucket::Resources, "🔗 Resources Shared"),
    (Bucket::Discussions, "💬 Notable Discussions"),
];

/// Items of a bucket ranked by engagement (highest first), with the
/// discussion bucket cut to the top entries. Ties keep insertion order.
pub fn ranked(content: &ParsedContent, bucket: Bucket) -> Vec<&CategorizedItem> {
    let mut items: Vec<&CategorizedItem> = content.bucket(bucket).iter().collect();
    items.sort_by(|a, b| b.engagement.cmp(&a.engagement));
    if bucket == Bucket::Discussions {
        items.truncate(MAX_DISCUSSIONS);
    }
    items
}

/// Timestamped file name: `{prefix}_YYYYmmdd_HHMMSS.md`
pub fn timestamped_filename(prefix: &str, at: NaiveDateTime) -> String {
    format!("{}_{}.md", prefix, at.format("%Y%m%d_%H%M%S"))
}

/// Make a source label safe to embed in a file name
pub fn file_label(label: &str) -> String {
    label
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect()
}

fn format_item(item: &CategorizedItem) -> String {
    let mut lines = vec![
        format!("### {} ({})", item.author_name, item.author),
        format!("*{}* | Engagement: {}", item.created_at, item.engagement),
        String::new(),
        item.text.clone(),
        String::new(),
    ];

    if !item.urls.is_empty() {
        lines.push("**Links:**".to_string());
        for url in &item.urls {
            lines.push(format!("- {}", url));
        }
        lines.push(String::new());
    }

    if item.is_quote {
        lines.push("*Quote tweet*".to_string());
        lines.push(String::new());
    }

    lines.push(format!("[View on X](https://x.com/i/status/{})", item.id));
    lines.push("---".to_string());

    lines.join("\n")
}

/// Render parsed content as a Markdown report
pub fn render_markdown(content: &ParsedContent, generated_at: NaiveDateTime) -> String {
    let mut lines = vec![
        format!(
            "# X Timeline Report - {}",
            generated_at.format("%Y-%m-%d %H:%M")
        ),
        String::new(),
        format!("*Source: {}*", content.metadata.source),
        format!("*Total items parsed: {}*", content.metadata.total_parsed),
        String::new(),
        "---".to_string(),
        String::new(),
    ];

    for (bucket, title) in SECTIONS {
        let items = ranked(content, bucket);
        if items.is_empty() {
            continue;
        }
        lines.push(format!("## {}", title));
        lines.push(String::new());
        for item in items {
            lines.push(format_item(item));
        }
        lines.push(String::new());
    }

    lines.join("\n")
}

/// Render parsed content as a plain-text console summary
pub fn render_console(content: &ParsedContent) -> String {
    let mut out = String::new();

    for (bucket, title) in SECTIONS {
        let items = ranked(content, bucket);
        if items.is_empty() {
            continue;
        }
        out.push_str(&format!("\n{}\n\n", title));
        for item in items {
            out.push_str(&format!("  {} ({} engagement)\n", item.author, item.engagement));
            let text: String = item.text.chars().take(CONSOLE_TEXT_CHARS).collect();
            out.push_str(&format!("  {}\n", text));
            for url in &item.urls {
                out.push_str(&format!("  {}\n", url));
            }
            out.push('\n');
        }
    }

    out
}

/// Writes reports into an output directory
#[derive(Debug, Clone)]
pub struct MarkdownWriter {
    output_dir: PathBuf,
}

impl MarkdownWriter {
    /// Create a writer, creating the output directory if needed
    pub fn new(output_dir: impl Into<PathBuf>) -> Result<Self> {
        let output_dir = output_dir.into();
        fs::create_dir_all(&output_dir)?;
        Ok(Self { output_dir })
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Write a report. Without a file name, `report_<timestamp>.md` is used.
    pub fn write_report(&self, content: &ParsedContent, filename: Option<&str>) -> Result<PathBuf> {
        let now = Local::now().naive_local();
        let filename = match filename {
            Some(name) => name.to_string(),
            None => timestamped_filename("report", now),
        };
        self.write(&filename, &render_markdown(content, now))
    }

    /// Write an arbitrary Markdown document into the output directory
    pub fn write(&self, filename: &str, body: &str) -> Result<PathBuf> {
        let path = self.output_dir.join(filename);
        if let Err(e) = fs::write(&path, body) {
            tracing::error!("Failed to write report {}: {}", path.display(), e);
            return Err(e.into());
        }
        tracing::info!("Report written to: {}", path.display());
        Ok(path)
    }
}
