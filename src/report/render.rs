use std::fmt::Write;

use rust_decimal::Decimal;

use super::{AssetDetail, Report, ReportSection};
use crate::format::Formatter;

const QUANTITY_WIDTH: usize = 18;
const PRICE_WIDTH: usize = 14;
const VALUE_WIDTH: usize = 16;
const ALLOCATION_WIDTH: usize = 9;
const MIN_LABEL_WIDTH: usize = 12;

struct Columns {
    label: usize,
}

impl Columns {
    fn new(width: usize) -> Self {
        let fixed = QUANTITY_WIDTH + PRICE_WIDTH + VALUE_WIDTH + ALLOCATION_WIDTH;
        Self {
            label: width.saturating_sub(fixed).max(MIN_LABEL_WIDTH),
        }
    }

    fn total(&self) -> usize {
        self.label + QUANTITY_WIDTH + PRICE_WIDTH + VALUE_WIDTH + ALLOCATION_WIDTH
    }

    fn line(&self, label: &str, quantity: &str, price: &str, value: &str, allocation: &str) -> String {
        let line = format!(
            "{label:<lw$}{quantity:>qw$}{price:>pw$}{value:>vw$}{allocation:>aw$}",
            label = truncate(label, self.label),
            lw = self.label,
            qw = QUANTITY_WIDTH,
            pw = PRICE_WIDTH,
            vw = VALUE_WIDTH,
            aw = ALLOCATION_WIDTH,
        );
        line.trim_end().to_string()
    }
}

fn truncate(label: &str, width: usize) -> String {
    if label.chars().count() < width {
        return label.to_string();
    }
    let mut short: String = label.chars().take(width.saturating_sub(3)).collect();
    short.push_str(".. ");
    short
}

fn row_label(row: &AssetDetail<'_>) -> String {
    if row.symbol.eq_ignore_ascii_case(&row.name) {
        format!("  {}", row.name)
    } else {
        format!("  {} ({})", row.name, row.symbol)
    }
}

fn write_section(
    out: &mut String,
    section: &ReportSection<'_>,
    columns: &Columns,
    formatter: &Formatter,
    verbose: bool,
) -> std::fmt::Result {
    writeln!(out, "{}", section.name)?;
    for row in &section.rows {
        writeln!(
            out,
            "{}",
            columns.line(
                &row_label(row),
                &formatter.quantity(row.quantity),
                &formatter.currency(row.price),
                &formatter.currency(row.value),
                &formatter.percent(row.allocation),
            )
        )?;
        if verbose {
            for constituent in &row.constituents {
                for contribution in &constituent.quantity.contributions {
                    let label = format!("    {}/{}", constituent.asset.source, contribution.source);
                    let amount = match &contribution.error {
                        Some(_) => "failed".to_string(),
                        None => formatter.quantity(contribution.amount),
                    };
                    writeln!(out, "{}", columns.line(&label, &amount, "", "", ""))?;
                    if let Some(error) = &contribution.error {
                        writeln!(out, "      {error}")?;
                    }
                }
            }
        }
    }
    writeln!(
        out,
        "{}",
        columns.line(
            "  subtotal",
            "",
            "",
            &formatter.currency(section.subtotal),
            &formatter.percent(section.allocation),
        )
    )?;
    writeln!(out)
}

/// Render the report as aligned text. `verbose` lists every source of each row.
pub fn render_text(
    report: &Report<'_>,
    formatter: &Formatter,
    verbose: bool,
) -> Result<String, std::fmt::Error> {
    let mut out = String::new();
    write_text(&mut out, report, formatter, verbose)?;
    Ok(out)
}

fn write_text(
    out: &mut String,
    report: &Report<'_>,
    formatter: &Formatter,
    verbose: bool,
) -> std::fmt::Result {
    let columns = Columns::new(formatter.width());

    writeln!(
        out,
        "Net worth as of {}",
        report.generated_at.format("%Y-%m-%d %H:%M UTC")
    )?;
    writeln!(
        out,
        "{}",
        columns.line("", "quantity", "price", "value", "alloc")
    )?;
    for section in &report.sections {
        write_section(out, section, &columns, formatter, verbose)?;
    }

    writeln!(out, "{}", "=".repeat(columns.total()))?;
    writeln!(
        out,
        "{}",
        columns.line(
            &format!("Networth ({})", report.currency),
            "",
            "",
            &formatter.currency(report.total),
            "",
        )
    )?;

    if report.min_balance > Decimal::ZERO && !formatter.hides_values() {
        writeln!(
            out,
            "Rows under {} hidden",
            formatter.currency(report.min_balance)
        )?;
    }

    if !report.degraded.is_empty() {
        writeln!(out)?;
        writeln!(out, "Warnings (counted as zero):")?;
        for degraded in &report.degraded {
            writeln!(
                out,
                "  {} via {}: {}",
                degraded.identifier, degraded.source, degraded.error
            )?;
        }
    }

    if !report.unvalued.is_empty() {
        writeln!(out)?;
        writeln!(out, "Unvalued holdings (not in total):")?;
        for unvalued in &report.unvalued {
            writeln!(
                out,
                "  {} [{}]: {}",
                unvalued.asset.identifier, unvalued.asset.source, unvalued.error
            )?;
        }
    }

    Ok(())
}

/// Render the report as pretty JSON with exact decimal amounts.
pub fn render_json(report: &Report<'_>) -> serde_json::Result<String> {
    serde_json::to_string_pretty(report)
}
