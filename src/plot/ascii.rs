//! ASCII plotting for terminal output.
//!
//! This is a fixed-size character grid, optimized for:
//! - quick visual sanity checks in a terminal
//! - deterministic output (helpful for golden tests)
//!
//! Plot elements:
//! - observed proportions: `.`, `o`, `O` by group size
//! - fitted curve: `*` line
//! - true mean curve: `-` line
//! - longevity-adjusted fitted curve (optional): `+` line

use crate::domain::ComparisonRow;

/// Render observed vs true vs fitted reproduction by age.
///
/// `adjusted` rows (same ages as `rows`) add a second fitted curve.
pub fn render_ascii_plot(
    rows: &[ComparisonRow],
    adjusted: Option<&[ComparisonRow]>,
    width: usize,
    height: usize,
) -> String {
    let width = width.max(10);
    let height = height.max(5);

    let Some((a_min, a_max)) = age_range(rows) else {
        return "Plot: not enough ages to draw.\n".to_string();
    };
    let (p_min, p_max) = prob_range(rows, adjusted.unwrap_or(&[])).unwrap_or((0.0, 1.0));
    let (p_min, p_max) = pad_range(p_min, p_max, 0.05);

    let mut grid = vec![vec![' '; width]; height];

    // Curves first so points can overlay; the fitted curve wins shared cells.
    let fitted: Vec<(f64, f64)> = rows.iter().map(|r| (f64::from(r.age), r.fitted)).collect();
    let truth: Vec<(f64, f64)> = rows.iter().map(|r| (f64::from(r.age), r.true_prob)).collect();
    draw_curve(&mut grid, &fitted, a_min, a_max, p_min, p_max, '*');
    if let Some(adjusted) = adjusted {
        let curve: Vec<(f64, f64)> =
            adjusted.iter().map(|r| (f64::from(r.age), r.fitted)).collect();
        draw_curve(&mut grid, &curve, a_min, a_max, p_min, p_max, '+');
    }
    draw_curve(&mut grid, &truth, a_min, a_max, p_min, p_max, '-');

    let n_max = rows.iter().map(|r| r.n).max().unwrap_or(1).max(1);
    for r in rows {
        let x = map_x(f64::from(r.age), a_min, a_max, width);
        let y = map_y(r.observed, p_min, p_max, height);
        grid[y][x] = point_glyph(r.n, n_max);
    }

    let mut out = String::new();
    out.push_str(&format!(
        "Plot: age=[{a_min:.0}, {a_max:.0}] | p=[{p_min:.2}, {p_max:.2}] \
         | .oO observed (by n), - true, * fitted{}\n",
        if adjusted.is_some() { ", + adjusted" } else { "" }
    ));

    for row in grid {
        out.push_str(row.into_iter().collect::<String>().trim_end());
        out.push('\n');
    }

    out
}

fn point_glyph(n: usize, n_max: usize) -> char {
    let share = n as f64 / n_max as f64;
    if share >= 2.0 / 3.0 {
        'O'
    } else if share >= 1.0 / 3.0 {
        'o'
    } else {
        '.'
    }
}

fn age_range(rows: &[ComparisonRow]) -> Option<(f64, f64)> {
    let min = rows.iter().map(|r| r.age).min()?;
    let max = rows.iter().map(|r| r.age).max()?;
    if max > min {
        Some((f64::from(min), f64::from(max)))
    } else {
        None
    }
}

fn prob_range(rows: &[ComparisonRow], adjusted: &[ComparisonRow]) -> Option<(f64, f64)> {
    let mut min_p = f64::INFINITY;
    let mut max_p = f64::NEG_INFINITY;
    for r in rows {
        for v in [r.observed, r.true_prob, r.fitted] {
            min_p = min_p.min(v);
            max_p = max_p.max(v);
        }
    }
    for r in adjusted {
        min_p = min_p.min(r.fitted);
        max_p = max_p.max(r.fitted);
    }
    if min_p.is_finite() && max_p.is_finite() && max_p > min_p {
        Some((min_p, max_p))
    } else {
        None
    }
}

fn pad_range(min: f64, max: f64, frac: f64) -> (f64, f64) {
    let span = (max - min).abs();
    let pad = (span * frac).max(1e-12);
    (min - pad, max + pad)
}

fn map_x(t: f64, t_min: f64, t_max: f64, width: usize) -> usize {
    let width = width.max(2);
    let u = ((t - t_min) / (t_max - t_min)).clamp(0.0, 1.0);
    (u * (width as f64 - 1.0)).round() as usize
}

fn map_y(y: f64, y_min: f64, y_max: f64, height: usize) -> usize {
    let height = height.max(2);
    let u = ((y - y_min) / (y_max - y_min)).clamp(0.0, 1.0);
    // y=top is max -> row 0
    (height as f64 - 1.0 - (u * (height as f64 - 1.0))).round() as usize
}

fn draw_curve(
    grid: &mut [Vec<char>],
    curve: &[(f64, f64)],
    x_min: f64,
    x_max: f64,
    y_min: f64,
    y_max: f64,
    ch: char,
) {
    if curve.len() < 2 {
        return;
    }
    let height = grid.len();
    let width = grid[0].len();

    let mut prev = None;
    for &(t, y) in curve {
        let x = map_x(t, x_min, x_max, width);
        let yy = map_y(y, y_min, y_max, height);
        if let Some((x0, y0)) = prev {
            draw_line(grid, x0, y0, x, yy, ch);
        } else if grid[yy][x] == ' ' {
            grid[yy][x] = ch;
        }
        prev = Some((x, yy));
    }
}

/// Integer line drawing (Bresenham-ish).
fn draw_line(grid: &mut [Vec<char>], x0: usize, y0: usize, x1: usize, y1: usize, ch: char) {
    let mut x0 = x0 as isize;
    let mut y0 = y0 as isize;
    let x1 = x1 as isize;
    let y1 = y1 as isize;

    let dx = (x1 - x0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let dy = -(y1 - y0).abs();
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;

    loop {
        if y0 >= 0
            && (y0 as usize) < grid.len()
            && x0 >= 0
            && (x0 as usize) < grid[0].len()
            && grid[y0 as usize][x0 as usize] == ' '
        {
            grid[y0 as usize][x0 as usize] = ch;
        }

        if x0 == x1 && y0 == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x0 += sx;
        }
        if e2 <= dx {
            err += dx;
            y0 += sy;
        }
    }
}
