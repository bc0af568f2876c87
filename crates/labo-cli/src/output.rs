use std::io::Write;

use labo_core::{BulkDeleteReport, DetailViewModel, EmptyHint, ListViewModel};
use owo_colors::OwoColorize;

/// Whether to use colored output.
#[derive(Debug, Clone, Copy)]
pub struct ColorMode(pub bool);

impl ColorMode {
    pub fn enabled(&self) -> bool {
        self.0
    }
}

pub fn print_error(w: &mut dyn Write, message: &str, color: ColorMode) -> std::io::Result<()> {
    if color.enabled() {
        writeln!(w, "{}", message.red().bold())
    } else {
        writeln!(w, "{}", message)
    }
}

pub fn print_warning(w: &mut dyn Write, message: &str, color: ColorMode) -> std::io::Result<()> {
    if color.enabled() {
        writeln!(w, "{}", message.yellow())
    } else {
        writeln!(w, "{}", message)
    }
}

/// Print one page of the report list as a table.
pub fn print_list(w: &mut dyn Write, vm: &ListViewModel, color: ColorMode) -> std::io::Result<()> {
    if let Some(hint) = &vm.empty_hint {
        let text = match hint {
            EmptyHint::NoReports => {
                "No video reports yet. Run an analysis to create your first report.".to_string()
            }
            EmptyHint::NoMatches { term } => format!("No reports match \u{201c}{}\u{201d}.", term),
        };
        print_warning(w, &text, color)?;
        writeln!(w)?;
    }

    let header = format!("{:>3}  {:>4}  {:<40}  {:<10}  {}", "", "No", "Title", "Date", "Author");
    if color.enabled() {
        writeln!(w, "{}", header.bold())?;
    } else {
        writeln!(w, "{}", header)?;
    }

    if vm.rows.is_empty() {
        writeln!(w, "  No results.")?;
    }
    for row in &vm.rows {
        let mark = if row.selected { "[x]" } else { "[ ]" };
        let title = truncate(&row.report.title, 40);
        let line = format!(
            "{:>3}  {:>4}  {:<40}  {:<10}  {}",
            mark,
            row.number,
            title,
            row.report.display_date(),
            row.report.author
        );
        writeln!(w, "{}", line)?;
        if color.enabled() {
            writeln!(w, "{:>11}{}", "", format!("id {}", row.report.id).dimmed())?;
        } else {
            writeln!(w, "{:>11}id {}", "", row.report.id)?;
        }
    }

    if vm.show_pagination {
        writeln!(w)?;
        let pages: Vec<String> = (1..=vm.total_pages)
            .map(|p| {
                if p == vm.current_page {
                    format!("[{}]", p)
                } else {
                    p.to_string()
                }
            })
            .collect();
        writeln!(w, "Page {}", pages.join(" "))?;
    }

    if let Some(notice) = &vm.notice {
        print_warning(w, notice, color)?;
    }
    Ok(())
}

/// Print a single report.
pub fn print_detail(w: &mut dyn Write, vm: &DetailViewModel, color: ColorMode) -> std::io::Result<()> {
    let Some(detail) = &vm.report else {
        return Ok(());
    };

    writeln!(w, "{}", vm.display_date)?;
    if color.enabled() {
        writeln!(w, "{}", detail.report.title.bold())?;
    } else {
        writeln!(w, "{}", detail.report.title)?;
    }
    writeln!(w)?;

    if !detail.video_url.is_empty() {
        let kind = if vm.is_video_media { "Video" } else { "Image" };
        writeln!(w, "{}: {}", kind, detail.video_url)?;
        writeln!(w)?;
    }

    section(w, "Behaviour summary", color)?;
    writeln!(w, "{}", vm.summary_text)?;
    writeln!(w)?;

    if !vm.highlight_captions.is_empty() {
        section(w, "Highlights", color)?;
        for caption in &vm.highlight_captions {
            writeln!(w, "  - {}", caption)?;
        }
        writeln!(w)?;
    }

    if !detail.behavior_stats.is_empty() {
        section(w, "Behaviour stats", color)?;
        for (key, value) in &detail.behavior_stats {
            writeln!(w, "  {}: {}", key, value)?;
        }
        writeln!(w)?;
    }

    if let Some(notice) = &vm.notice {
        print_warning(w, notice, color)?;
    }
    Ok(())
}

/// Print the outcome of a bulk delete.
pub fn print_bulk_delete(
    w: &mut dyn Write,
    report: &BulkDeleteReport,
    color: ColorMode,
) -> std::io::Result<()> {
    let deleted = format!("Deleted {} report(s).", report.succeeded.len());
    if color.enabled() {
        writeln!(w, "{}", deleted.green())?;
    } else {
        writeln!(w, "{}", deleted)?;
    }
    if !report.failed.is_empty() {
        let ids: Vec<String> = report.failed.iter().map(|id| id.to_string()).collect();
        print_error(
            w,
            &format!("Failed to delete: {}", ids.join(", ")),
            color,
        )?;
    }
    Ok(())
}

fn section(w: &mut dyn Write, title: &str, color: ColorMode) -> std::io::Result<()> {
    if color.enabled() {
        writeln!(w, "{}", title.cyan().bold())
    } else {
        writeln!(w, "{}", title)
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", cut)
    }
}
