//! Minimal SVG line/area charts.

use super::ResourceSample;
use std::fmt::Write as _;

const WIDTH: f64 = 800.0;
const PANEL_HEIGHT: f64 = 220.0;
const MARGIN_LEFT: f64 = 60.0;
const MARGIN_RIGHT: f64 = 20.0;
const MARGIN_TOP: f64 = 20.0;
const PANEL_GAP: f64 = 40.0;
const MARGIN_BOTTOM: f64 = 50.0;

/// Maps data coordinates into one panel.
struct Panel {
    top: f64,
    x_max: f64,
    y_max: f64,
}

impl Panel {
    fn plot_width() -> f64 {
        WIDTH - MARGIN_LEFT - MARGIN_RIGHT
    }

    fn x(&self, v: f64) -> f64 {
        MARGIN_LEFT + (v / self.x_max).clamp(0.0, 1.0) * Self::plot_width()
    }

    fn y(&self, v: f64) -> f64 {
        self.top + PANEL_HEIGHT - (v / self.y_max).clamp(0.0, 1.0) * PANEL_HEIGHT
    }

    fn bottom(&self) -> f64 {
        self.top + PANEL_HEIGHT
    }

    /// Filled area under `ys` plus its outline.
    fn area(&self, out: &mut String, xs: &[f64], ys: &[f64], fill: &str, label: &str) {
        if xs.is_empty() {
            return;
        }
        let line: Vec<String> = xs
            .iter()
            .zip(ys)
            .map(|(x, y)| format!("{:.1},{:.1}", self.x(*x), self.y(*y)))
            .collect();
        let _ = writeln!(
            out,
            r#"<polygon points="{:.1},{:.1} {} {:.1},{:.1}" fill="{}" fill-opacity="0.6" stroke="none"><title>{}</title></polygon>"#,
            self.x(xs[0]),
            self.bottom(),
            line.join(" "),
            self.x(xs[xs.len() - 1]),
            self.bottom(),
            fill,
            escape(label)
        );
        let _ = writeln!(
            out,
            r#"<polyline points="{}" fill="none" stroke="{}" stroke-width="1"/>"#,
            line.join(" "),
            fill
        );
    }

    fn frame(&self, out: &mut String, y_label: &str) {
        let _ = writeln!(
            out,
            r#"<rect x="{:.1}" y="{:.1}" width="{:.1}" height="{:.1}" fill="none" stroke="black"/>"#,
            MARGIN_LEFT,
            self.top,
            Self::plot_width(),
            PANEL_HEIGHT
        );
        let _ = writeln!(
            out,
            r#"<text x="{:.1}" y="{:.1}" font-size="12" text-anchor="middle" transform="rotate(-90 {:.1} {:.1})">{}</text>"#,
            MARGIN_LEFT - 40.0,
            self.top + PANEL_HEIGHT / 2.0,
            MARGIN_LEFT - 40.0,
            self.top + PANEL_HEIGHT / 2.0,
            escape(y_label)
        );
        for frac in [0.0, 0.5, 1.0] {
            let v = self.y_max * frac;
            let _ = writeln!(
                out,
                r#"<text x="{:.1}" y="{:.1}" font-size="10" text-anchor="end">{}</text>"#,
                MARGIN_LEFT - 4.0,
                self.y(v) + 3.0,
                trim_num(v)
            );
        }
    }

    fn markers(&self, out: &mut String, markers: &[(f64, String)], labelled: bool) {
        for (minute, label) in markers {
            let x = self.x(*minute);
            let _ = writeln!(
                out,
                r#"<line x1="{:.1}" y1="{:.1}" x2="{:.1}" y2="{:.1}" stroke="black" stroke-dasharray="2,3"/>"#,
                x,
                self.top,
                x,
                self.bottom()
            );
            if labelled {
                let _ = writeln!(
                    out,
                    r#"<text x="{:.1}" y="{:.1}" font-size="8" text-anchor="middle">{}</text>"#,
                    x,
                    self.bottom() + 12.0,
                    escape(label)
                );
            }
        }
    }

    fn minutes_axis(&self, out: &mut String) {
        for frac in [0.0, 0.25, 0.5, 0.75, 1.0] {
            let v = self.x_max * frac;
            let _ = writeln!(
                out,
                r#"<text x="{:.1}" y="{:.1}" font-size="10" text-anchor="middle">{}</text>"#,
                self.x(v),
                self.bottom() + 12.0,
                trim_num(v)
            );
        }
        let _ = writeln!(
            out,
            r#"<text x="{:.1}" y="{:.1}" font-size="12" text-anchor="middle">Minutes</text>"#,
            MARGIN_LEFT + Self::plot_width() / 2.0,
            self.bottom() + 28.0
        );
    }
}

fn trim_num(v: f64) -> String {
    if v.fract() == 0.0 {
        format!("{}", v as i64)
    } else {
        format!("{:.1}", v)
    }
}

fn escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn x_max(samples: &[ResourceSample], markers: &[(f64, String)]) -> f64 {
    samples
        .iter()
        .map(|s| s.minutes)
        .chain(markers.iter().map(|(m, _)| *m))
        .fold(0.0, f64::max)
        .max(1.0)
}

fn document(panels: usize, body: &str) -> String {
    let height = MARGIN_TOP + panels as f64 * PANEL_HEIGHT
        + (panels.saturating_sub(1)) as f64 * PANEL_GAP
        + MARGIN_BOTTOM;
    format!(
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{w}\" height=\"{h}\" viewBox=\"0 0 {w} {h}\">\n\
         <rect width=\"100%\" height=\"100%\" fill=\"white\"/>\n{body}</svg>\n",
        w = WIDTH,
        h = height,
        body = body
    )
}

/// CPU load (0..100 %) above memory (0..`mem_limit`), phase labels under the memory panel.
pub fn render_usage(samples: &[ResourceSample], markers: &[(f64, String)], mem_limit: f64) -> String {
    let xm = x_max(samples, markers);
    let xs: Vec<f64> = samples.iter().map(|s| s.minutes).collect();
    let cpu: Vec<f64> = samples.iter().map(|s| s.cpu).collect();
    let mem: Vec<f64> = samples.iter().map(|s| s.mem).collect();

    let cpu_panel = Panel {
        top: MARGIN_TOP,
        x_max: xm,
        y_max: 100.0,
    };
    let mem_panel = Panel {
        top: MARGIN_TOP + PANEL_HEIGHT + PANEL_GAP,
        x_max: xm,
        y_max: mem_limit.max(f64::EPSILON),
    };

    let mut body = String::new();
    cpu_panel.area(&mut body, &xs, &cpu, "blue", "CPU");
    cpu_panel.markers(&mut body, markers, false);
    cpu_panel.frame(&mut body, "CPU Load (%)");
    cpu_panel.minutes_axis(&mut body);

    mem_panel.area(&mut body, &xs, &mem, "blue", "RAM");
    mem_panel.markers(&mut body, markers, true);
    mem_panel.frame(&mut body, "RAM (GB)");
    document(2, &body)
}

/// Disk read, with writes stacked on top.
pub fn render_io(samples: &[ResourceSample], markers: &[(f64, String)]) -> String {
    let xm = x_max(samples, markers);
    let xs: Vec<f64> = samples.iter().map(|s| s.minutes).collect();
    let read: Vec<f64> = samples.iter().map(|s| s.read).collect();
    let stacked: Vec<f64> = samples.iter().map(|s| s.read + s.write).collect();
    let y_max = stacked.iter().copied().fold(0.0, f64::max);

    let panel = Panel {
        top: MARGIN_TOP,
        x_max: xm,
        y_max: if y_max > 0.0 { y_max } else { 1.0 },
    };
    let mut body = String::new();
    panel.area(&mut body, &xs, &stacked, "green", "Write");
    panel.area(&mut body, &xs, &read, "blue", "Read");
    panel.markers(&mut body, markers, false);
    panel.frame(&mut body, "I/O (MB)");
    panel.minutes_axis(&mut body);
    document(1, &body)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(minutes: f64, cpu: f64, mem: f64) -> ResourceSample {
        ResourceSample {
            timestamp: None,
            minutes,
            cpu,
            mem,
            read: 1.0,
            write: 2.0,
        }
    }

    #[test]
    fn usage_chart_has_two_panels_and_labelled_markers() {
        let samples = vec![sample(0.0, 10.0, 1.0), sample(2.0, 90.0, 3.0)];
        let markers = vec![(0.0, "Encoding".to_string()), (1.0, "Binary Tables".to_string())];
        let svg = render_usage(&samples, &markers, 4.0);
        assert!(svg.starts_with("<svg"));
        assert_eq!(svg.matches("<polygon").count(), 2);
        assert_eq!(svg.matches("stroke-dasharray").count(), 4);
        assert!(svg.contains(">Binary Tables</text>"));
        assert!(svg.contains("RAM (GB)"));
    }

    #[test]
    fn io_chart_stacks_writes_over_reads() {
        let svg = render_io(&[sample(0.0, 0.0, 0.0)], &[(0.0, "Encoding".to_string())]);
        assert!(svg.contains("<title>Write</title>"));
        assert!(svg.contains("<title>Read</title>"));
        assert!(svg.ends_with("</svg>\n"));
    }

    #[test]
    fn empty_timeline_still_renders() {
        let svg = render_io(&[], &[]);
        assert!(!svg.contains("<polygon"));
        assert!(escape("a<b & c").contains("&lt;b &amp; c"));
    }
}
