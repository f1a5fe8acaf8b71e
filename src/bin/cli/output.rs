//! Output formatting for CLI operations.

use serde_json::{Value, json};
use std::path::Path;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use arcwalk::progress::format_bytes_iec;
use arcwalk::{ArchiveMeta, Object, TreeNode};

/// One registered tool, as shown by `formats`
pub struct FormatRow {
    pub name: &'static str,
    pub extensions: Vec<&'static str>,
    pub multipart: Vec<String>,
    pub list: bool,
}

/// What an extraction did
pub struct ExtractSummary<'a> {
    pub archive: &'a Path,
    pub inner: &'a str,
    pub output: &'a Path,
    pub elapsed: Duration,
}

/// Trait for output formatting
pub trait OutputFormatter {
    /// Formats archive metadata and its tree
    fn format_meta(&self, meta: &ArchiveMeta) -> String;

    /// Formats the children of one directory
    fn format_list(&self, objects: &[Object]) -> String;

    /// Formats extraction results
    fn format_extract_result(&self, summary: &ExtractSummary<'_>) -> String;

    /// Formats the registry table
    fn format_formats(&self, rows: &[FormatRow]) -> String;
}

/// Human-readable output formatter
pub struct HumanFormatter;

impl HumanFormatter {
    fn push_tree(output: &mut String, nodes: &[TreeNode], depth: usize) {
        for node in nodes {
            let size = if node.is_folder {
                String::new()
            } else {
                format_bytes_iec(node.size)
            };
            output.push_str(&format!(
                "{:>12}  {}{}{}\n",
                size,
                "  ".repeat(depth),
                node.name,
                if node.is_folder { "/" } else { "" }
            ));
            Self::push_tree(output, &node.children, depth + 1);
        }
    }
}

impl OutputFormatter for HumanFormatter {
    fn format_meta(&self, meta: &ArchiveMeta) -> String {
        let mut output = String::new();

        output.push_str("Archive Information:\n");
        output.push_str(&"-".repeat(40));
        output.push('\n');
        if !meta.comment.is_empty() {
            output.push_str(&format!("  Comment:        {}\n", meta.comment));
        }
        output.push_str(&format!(
            "  Encrypted:      {}\n",
            if meta.encrypted { "Yes" } else { "No" }
        ));
        output.push_str(&format!(
            "  Nodes:          {}\n",
            arcwalk::model::tree_count(&meta.tree)
        ));
        output.push_str(&"-".repeat(40));
        output.push('\n');
        Self::push_tree(&mut output, &meta.tree, 0);

        output
    }

    fn format_list(&self, objects: &[Object]) -> String {
        let mut output = String::new();

        output.push_str(&format!("{:>12} {:>19} {}\n", "Size", "Modified", "Name"));
        output.push_str(&"-".repeat(70));
        output.push('\n');

        let mut total_size: u64 = 0;
        let mut file_count = 0;
        let mut dir_count = 0;

        for object in objects {
            let size_str = if object.is_folder {
                dir_count += 1;
                String::new()
            } else {
                file_count += 1;
                total_size += object.size;
                format_bytes_iec(object.size)
            };
            let mtime_str = object
                .modified
                .map(format_timestamp)
                .unwrap_or_else(|| "-".to_string());

            output.push_str(&format!(
                "{:>12} {:>19} {}{}\n",
                size_str,
                mtime_str,
                object.name,
                if object.is_folder { "/" } else { "" }
            ));
        }

        output.push_str(&"-".repeat(70));
        output.push('\n');
        output.push_str(&format!(
            "{} files, {} directories, {} total\n",
            file_count,
            dir_count,
            format_bytes_iec(total_size)
        ));

        output
    }

    fn format_extract_result(&self, summary: &ExtractSummary<'_>) -> String {
        let what = if summary.inner == "/" {
            summary.archive.display().to_string()
        } else {
            format!("{} from {}", summary.inner, summary.archive.display())
        };
        format!(
            "Extracted {} to {} in {:.1}s\n",
            what,
            summary.output.display(),
            summary.elapsed.as_secs_f64()
        )
    }

    fn format_formats(&self, rows: &[FormatRow]) -> String {
        let mut output = String::new();
        output.push_str(&format!("{:<10} {:<6} {}\n", "Tool", "List", "Extensions"));
        output.push_str(&"-".repeat(70));
        output.push('\n');
        for row in rows {
            let mut names: Vec<String> = row.extensions.iter().map(|e| e.to_string()).collect();
            names.extend(row.multipart.iter().cloned());
            output.push_str(&format!(
                "{:<10} {:<6} {}\n",
                row.name,
                if row.list { "yes" } else { "no" },
                names.join(" ")
            ));
        }
        output
    }
}

/// JSON output formatter
pub struct JsonFormatter;

fn unix_secs(time: Option<SystemTime>) -> Option<u64> {
    time.and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map(|d| d.as_secs())
}

fn tree_json(node: &TreeNode) -> Value {
    json!({
        "name": node.name,
        "size": node.size,
        "modified": unix_secs(node.modified),
        "is_folder": node.is_folder,
        "children": node.children.iter().map(tree_json).collect::<Vec<_>>(),
    })
}

impl OutputFormatter for JsonFormatter {
    fn format_meta(&self, meta: &ArchiveMeta) -> String {
        let obj = json!({
            "comment": meta.comment,
            "encrypted": meta.encrypted,
            "tree": meta.tree.iter().map(tree_json).collect::<Vec<_>>(),
        });

        serde_json::to_string_pretty(&obj).unwrap_or_else(|_| "{}".to_string())
    }

    fn format_list(&self, objects: &[Object]) -> String {
        let items: Vec<_> = objects
            .iter()
            .map(|o| {
                json!({
                    "name": o.name,
                    "size": o.size,
                    "modified": unix_secs(o.modified),
                    "is_folder": o.is_folder,
                })
            })
            .collect();

        serde_json::to_string_pretty(&items).unwrap_or_else(|_| "[]".to_string())
    }

    fn format_extract_result(&self, summary: &ExtractSummary<'_>) -> String {
        let obj = json!({
            "success": true,
            "archive": summary.archive.display().to_string(),
            "inner_path": summary.inner,
            "output": summary.output.display().to_string(),
            "elapsed_ms": summary.elapsed.as_millis() as u64,
        });

        serde_json::to_string_pretty(&obj).unwrap_or_else(|_| "{}".to_string())
    }

    fn format_formats(&self, rows: &[FormatRow]) -> String {
        let items: Vec<_> = rows
            .iter()
            .map(|r| {
                json!({
                    "name": r.name,
                    "extensions": r.extensions,
                    "multipart": r.multipart,
                    "list": r.list,
                })
            })
            .collect();

        serde_json::to_string_pretty(&items).unwrap_or_else(|_| "[]".to_string())
    }
}

/// Creates the appropriate formatter based on output format
pub fn create_formatter(format: super::OutputFormat) -> Box<dyn OutputFormatter> {
    match format {
        super::OutputFormat::Human => Box::new(HumanFormatter),
        super::OutputFormat::Json => Box::new(JsonFormatter),
    }
}

/// Formats a SystemTime as a UTC datetime string
pub fn format_timestamp(time: SystemTime) -> String {
    let Ok(duration) = time.duration_since(UNIX_EPOCH) else {
        return "-".to_string();
    };
    let secs = duration.as_secs();
    let (year, month, day) = civil_from_days((secs / 86_400) as i64);
    let time_of_day = secs % 86_400;
    format!(
        "{:04}-{:02}-{:02} {:02}:{:02}:{:02}",
        year,
        month,
        day,
        time_of_day / 3600,
        (time_of_day % 3600) / 60,
        time_of_day % 60
    )
}

/// Converts days since 1970-01-01 to a proleptic Gregorian date.
fn civil_from_days(days: i64) -> (i64, u32, u32) {
    let z = days + 719_468;
    let era = z.div_euclid(146_097);
    let doe = z.rem_euclid(146_097);
    let yoe = (doe - doe / 1460 + doe / 36_524 - doe / 146_096) / 365;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let day = (doy - (153 * mp + 2) / 5 + 1) as u32;
    let month = if mp < 10 { mp + 3 } else { mp - 9 } as u32;
    let year = yoe + era * 400 + i64::from(month <= 2);
    (year, month, day)
}
