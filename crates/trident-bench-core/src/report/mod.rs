//! Comparison tables built from experiment outputs.

pub mod console;
pub mod join;
pub mod tables;

use std::fmt::Write as _;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Text(String),
    Int(i64),
    /// Missing measurements render as `-1`.
    Num(Option<f64>),
}

impl Cell {
    pub fn text(s: impl Into<String>) -> Self {
        Cell::Text(s.into())
    }

    fn render(&self) -> String {
        match self {
            Cell::Text(s) => s.clone(),
            Cell::Int(i) => i.to_string(),
            Cell::Num(v) => format_num(*v),
        }
    }

    fn is_numeric(&self) -> bool {
        !matches!(self, Cell::Text(_))
    }
}

/// Integers print without a fraction; everything else with at most three decimals.
pub fn format_num(v: Option<f64>) -> String {
    match v {
        None => crate::extract::MISSING.to_string(),
        Some(v) if v.fract() == 0.0 && v.abs() < 1e15 => format!("{}", v as i64),
        Some(v) => {
            let s = format!("{:.3}", v);
            s.trim_end_matches('0').trim_end_matches('.').to_string()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TableFormat {
    #[default]
    Tab,
    Csv,
    Markdown,
    Latex,
    Fixed,
}

impl FromStr for TableFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "tab" | "tsv" => Ok(TableFormat::Tab),
            "csv" => Ok(TableFormat::Csv),
            "markdown" | "md" => Ok(TableFormat::Markdown),
            "latex" | "tex" => Ok(TableFormat::Latex),
            "fixed" | "fixed_width" => Ok(TableFormat::Fixed),
            other => Err(format!(
                "unknown table format '{}' (expected tab, csv, markdown, latex or fixed)",
                other
            )),
        }
    }
}

impl Table {
    pub fn new<S: Into<String>>(columns: impl IntoIterator<Item = S>) -> Self {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    pub fn push(&mut self, row: Vec<Cell>) {
        debug_assert_eq!(row.len(), self.columns.len());
        self.rows.push(row);
    }

    pub fn render(&self, format: TableFormat) -> anyhow::Result<String> {
        let cells: Vec<Vec<String>> = self
            .rows
            .iter()
            .map(|r| r.iter().map(Cell::render).collect())
            .collect();
        Ok(match format {
            TableFormat::Tab => self.render_tab(&cells),
            TableFormat::Csv => self.render_csv(&cells)?,
            TableFormat::Markdown => self.render_markdown(&cells),
            TableFormat::Latex => self.render_latex(&cells),
            TableFormat::Fixed => self.render_fixed(&cells),
        })
    }

    fn render_tab(&self, cells: &[Vec<String>]) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "{}", self.columns.join("\t"));
        for row in cells {
            let _ = writeln!(out, "{}", row.join("\t"));
        }
        out
    }

    fn render_csv(&self, cells: &[Vec<String>]) -> anyhow::Result<String> {
        let mut wtr = csv::Writer::from_writer(Vec::new());
        wtr.write_record(&self.columns)?;
        for row in cells {
            wtr.write_record(row)?;
        }
        let bytes = wtr
            .into_inner()
            .map_err(|e| anyhow::anyhow!("failed to flush csv output: {}", e.error()))?;
        Ok(String::from_utf8(bytes)?)
    }

    fn render_markdown(&self, cells: &[Vec<String>]) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "| {} |", self.columns.join(" | "));
        let rule: Vec<&str> = self.columns.iter().map(|_| "---").collect();
        let _ = writeln!(out, "|{}|", rule.join("|"));
        for row in cells {
            let row: Vec<String> = row.iter().map(|c| c.replace('|', "\\|")).collect();
            let _ = writeln!(out, "| {} |", row.join(" | "));
        }
        out
    }

    fn render_latex(&self, cells: &[Vec<String>]) -> String {
        let mut out = String::new();
        out.push_str("\\begin{table}\n");
        let _ = writeln!(out, "\\begin{{tabular}}{{{}}}", "c".repeat(self.columns.len()));
        let header: Vec<String> = self.columns.iter().map(|c| latex_escape(c)).collect();
        let _ = writeln!(out, "{} \\\\", header.join(" & "));
        for row in cells {
            let row: Vec<String> = row.iter().map(|c| latex_escape(c)).collect();
            let _ = writeln!(out, "{} \\\\", row.join(" & "));
        }
        out.push_str("\\end{tabular}\n");
        out.push_str("\\end{table}\n");
        out
    }

    fn render_fixed(&self, cells: &[Vec<String>]) -> String {
        let mut widths: Vec<usize> = self.columns.iter().map(|c| c.chars().count()).collect();
        for row in cells {
            for (w, c) in widths.iter_mut().zip(row) {
                *w = (*w).max(c.chars().count());
            }
        }
        let numeric: Vec<bool> = (0..self.columns.len())
            .map(|i| {
                !self.rows.is_empty() && self.rows.iter().all(|r| r.get(i).is_some_and(Cell::is_numeric))
            })
            .collect();

        let line = |values: &[String]| -> String {
            let parts: Vec<String> = values
                .iter()
                .enumerate()
                .map(|(i, v)| {
                    if numeric[i] {
                        format!("{:>w$}", v, w = widths[i])
                    } else {
                        format!("{:<w$}", v, w = widths[i])
                    }
                })
                .collect();
            parts.join("  ").trim_end().to_string()
        };

        let mut out = String::new();
        out.push_str(&line(&self.columns));
        out.push('\n');
        let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
        out.push_str(&rule.join("  "));
        out.push('\n');
        for row in cells {
            out.push_str(&line(row));
            out.push('\n');
        }
        out
    }
}

fn latex_escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '_' | '%' | '&' | '#' | '$' => {
                out.push('\\');
                out.push(ch);
            }
            _ => out.push(ch),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Table {
        let mut t = Table::new(["task", "snap(a)", "trident(a)"]);
        t.push(vec![Cell::text("pagerank"), Cell::Num(Some(130.0)), Cell::Num(Some(12.5))]);
        t.push(vec![Cell::text("max_wcc"), Cell::Num(None), Cell::Num(Some(1.0 / 3.0))]);
        t
    }

    #[test]
    fn numbers_are_trimmed() {
        assert_eq!(format_num(Some(4.0)), "4");
        assert_eq!(format_num(Some(2.5)), "2.5");
        assert_eq!(format_num(Some(1.0 / 3.0)), "0.333");
        assert_eq!(format_num(None), "-1");
    }

    #[test]
    fn tab_and_csv() {
        let t = sample();
        assert_eq!(
            t.render(TableFormat::Tab).unwrap(),
            "task\tsnap(a)\ttrident(a)\npagerank\t130\t12.5\nmax_wcc\t-1\t0.333\n"
        );
        let mut t = Table::new(["a,b"]);
        t.push(vec![Cell::text("x\"y")]);
        assert_eq!(t.render(TableFormat::Csv).unwrap(), "\"a,b\"\n\"x\"\"y\"\n");
    }

    #[test]
    fn csv_output_reads_back() {
        let mut t = Table::new(["task", "note"]);
        t.push(vec![Cell::text("bfs"), Cell::text("pairs=a,b\nsecond line")]);
        t.push(vec![Cell::text("mod"), Cell::Num(Some(2.5))]);
        let out = t.render(TableFormat::Csv).unwrap();

        let mut rdr = csv::Reader::from_reader(out.as_bytes());
        assert_eq!(rdr.headers().unwrap(), vec!["task", "note"]);
        let rows: Vec<Vec<String>> = rdr
            .records()
            .map(|r| r.unwrap().iter().map(str::to_string).collect())
            .collect();
        assert_eq!(rows[0][1], "pairs=a,b\nsecond line");
        assert_eq!(rows[1], vec!["mod", "2.5"]);
    }

    #[test]
    fn markdown_has_rule_row() {
        let md = sample().render(TableFormat::Markdown).unwrap();
        let lines: Vec<&str> = md.lines().collect();
        assert_eq!(lines[0], "| task | snap(a) | trident(a) |");
        assert_eq!(lines[1], "|---|---|---|");
        assert_eq!(lines[3], "| max_wcc | -1 | 0.333 |");
    }

    #[test]
    fn latex_escapes_underscores() {
        let tex = sample().render(TableFormat::Latex).unwrap();
        assert!(tex.starts_with("\\begin{table}\n\\begin{tabular}{ccc}\n"));
        assert!(tex.contains("max\\_wcc & -1 & 0.333 \\\\"));
        assert!(tex.ends_with("\\end{tabular}\n\\end{table}\n"));
    }

    #[test]
    fn fixed_width_aligns_numbers_right() {
        let fixed = sample().render(TableFormat::Fixed).unwrap();
        let lines: Vec<&str> = fixed.lines().collect();
        assert_eq!(lines[0], "task      snap(a)  trident(a)");
        assert_eq!(lines[1], "--------  -------  ----------");
        assert_eq!(lines[2], "pagerank      130        12.5");
    }

    #[test]
    fn parses_formats() {
        assert_eq!("md".parse::<TableFormat>(), Ok(TableFormat::Markdown));
        assert_eq!("LaTeX".parse::<TableFormat>(), Ok(TableFormat::Latex));
        assert!("html".parse::<TableFormat>().is_err());
    }
}
