use image::{Rgb, RgbImage};
use palette::{Hsl, IntoColor, Srgb};
use std::collections::HashMap;
use std::path::Path;
use tracing::debug;

use super::glyphs::{draw_text, draw_text_vertical, text_height, text_width};
use super::BarChart;
use crate::error::Result;

const BACKGROUND: Rgb<u8> = Rgb([255, 255, 255]);
const AXIS: Rgb<u8> = Rgb([40, 40, 40]);
const GRID: Rgb<u8> = Rgb([225, 225, 225]);
/// Colour of single-series bars
const SINGLE_SERIES: Rgb<u8> = Rgb([76, 120, 168]);
const GRID_LINES: u32 = 5;

/// Pixel size of a rendered chart.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderOptions {
    pub width: u32,
    pub height: u32,
    pub scale: u32,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            width: 750,
            height: 500,
            scale: 2,
        }
    }
}

/// Bounds of the bar area inside the image, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PlotArea {
    left: u32,
    right: u32,
    top: u32,
    bottom: u32,
}

/// Generates `n` visually distinct colours using evenly spaced hues.
pub fn generate_palette(n: usize) -> Vec<Rgb<u8>> {
    (0..n)
        .map(|i| {
            let hue = (i as f32 / n as f32) * 360.0;
            let hsl = Hsl::new(hue, 0.75, 0.55);
            let rgb: Srgb = hsl.into_color();
            Rgb([
                (rgb.red * 255.0) as u8,
                (rgb.green * 255.0) as u8,
                (rgb.blue * 255.0) as u8,
            ])
        })
        .collect()
}

/// Segment name → colour, in the chart's stacking order.
pub fn legend(chart: &BarChart) -> Vec<(String, Rgb<u8>)> {
    let series = chart.series();
    if series.len() == 1 {
        return vec![(series[0].clone(), SINGLE_SERIES)];
    }
    let palette = generate_palette(series.len());
    series.into_iter().zip(palette).collect()
}

/// Width reserved on the right for the colour legend; zero for single-series charts.
fn legend_width(chart: &BarChart, options: RenderOptions) -> u32 {
    let entries = legend(chart);
    if entries.len() <= 1 {
        return 0;
    }
    let s = options.scale;
    let swatch = text_height(s) + 4 * s;
    let widest = entries
        .iter()
        .map(|(name, _)| swatch + text_width(name, s))
        .chain(chart.legend_title.as_deref().map(|t| text_width(t, s)))
        .max()
        .unwrap_or(0);
    (widest + 20 * s).min(options.width * s * 2 / 5)
}

fn plot_area(chart: &BarChart, options: RenderOptions) -> PlotArea {
    let s = options.scale;
    let width = options.width * s;
    let height = options.height * s;
    PlotArea {
        left: 70 * s,
        right: width.saturating_sub(20 * s + legend_width(chart, options)),
        top: 40 * s,
        bottom: height.saturating_sub(50 * s),
    }
}

fn format_tick(value: f64) -> String {
    if value >= 10.0 || value == 0.0 {
        format!("{:.0}", value)
    } else {
        format!("{:.1}", value)
    }
}

/// Rasterize a (possibly stacked) bar chart with its title, axis titles,
/// country ticks, value ticks and a colour legend for stacked charts.
pub fn rasterize(chart: &BarChart, options: RenderOptions) -> RgbImage {
    let s = options.scale;
    let width = options.width * s;
    let height = options.height * s;
    let mut img = RgbImage::from_pixel(width, height, BACKGROUND);

    let area = plot_area(chart, options);
    if area.right <= area.left || area.bottom <= area.top {
        return img;
    }
    let plot_height = (area.bottom - area.top) as f64;
    let max_total = chart.max_total();

    if let Some(title) = &chart.title {
        let x = width.saturating_sub(text_width(title, s)) / 2;
        draw_text(&mut img, x, 14 * s, title, s, AXIS);
    }

    for i in 1..=GRID_LINES {
        let y = area.bottom - ((area.bottom - area.top) * i / GRID_LINES);
        paint_rect(&mut img, area.left, y, area.right, y + 1, GRID);
        if max_total > 0.0 {
            let tick = format_tick(max_total * i as f64 / GRID_LINES as f64);
            let x = area.left.saturating_sub(text_width(&tick, s) + 4 * s);
            draw_text(&mut img, x, y.saturating_sub(text_height(s) / 2), &tick, s, AXIS);
        }
    }

    let colors: HashMap<String, Rgb<u8>> = legend(chart).into_iter().collect();

    if !chart.bars.is_empty() && max_total > 0.0 {
        let slot = (area.right - area.left) as f64 / chart.bars.len() as f64;
        let bar_width = (slot * 0.8).max(1.0);

        for (i, bar) in chart.bars.iter().enumerate() {
            let x0 = area.left + (slot * i as f64 + (slot - bar_width) / 2.0) as u32;
            let x1 = (x0 + bar_width as u32).min(area.right);
            let mut base = area.bottom as f64;

            for (name, value) in &bar.segments {
                let segment_height = (value.max(0.0) / max_total) * plot_height;
                let y1 = base;
                let y0 = (base - segment_height).max(area.top as f64);
                let color = colors.get(name).copied().unwrap_or(SINGLE_SERIES);
                paint_rect(&mut img, x0, y0.round() as u32, x1, y1.round() as u32, color);
                base = y0;
            }

            let centre = area.left + (slot * (i as f64 + 0.5)) as u32;
            let label_x = centre.saturating_sub(text_width(&bar.label, s) / 2);
            draw_text(&mut img, label_x, area.bottom + 6 * s, &bar.label, s, AXIS);
        }
    }

    paint_rect(&mut img, area.left, area.top, area.left + s, area.bottom, AXIS);
    paint_rect(&mut img, area.left, area.bottom, area.right, area.bottom + s, AXIS);

    let x_title_x = area.left + (area.right - area.left).saturating_sub(text_width(&chart.x_title, s)) / 2;
    draw_text(&mut img, x_title_x, height.saturating_sub(20 * s), &chart.x_title, s, AXIS);
    let y_title_bottom = area.bottom - (area.bottom - area.top).saturating_sub(text_width(&chart.y_title, s)) / 2;
    draw_text_vertical(&mut img, 6 * s, y_title_bottom, &chart.y_title, s, AXIS);

    draw_legend(&mut img, chart, area, options);
    img
}

fn draw_legend(img: &mut RgbImage, chart: &BarChart, area: PlotArea, options: RenderOptions) {
    let entries = legend(chart);
    if entries.len() <= 1 {
        return;
    }
    let s = options.scale;
    let line = text_height(s) + 6 * s;
    let x = area.right + 12 * s;
    let mut y = area.top;

    if let Some(title) = &chart.legend_title {
        draw_text(img, x, y, title, s, AXIS);
        y += line;
    }
    for (name, color) in entries {
        let swatch = text_height(s);
        paint_rect(img, x, y, x + swatch, y + swatch, color);
        draw_text(img, x + swatch + 4 * s, y, &name, s, AXIS);
        y += line;
    }
}

/// Rasterize `chart` and write it as a PNG file.
pub fn save_png(chart: &BarChart, path: &Path, options: RenderOptions) -> Result<()> {
    let img = rasterize(chart, options);
    img.save(path)?;
    debug!("Wrote {}x{} chart to {}", img.width(), img.height(), path.display());
    Ok(())
}

fn paint_rect(img: &mut RgbImage, x0: u32, y0: u32, x1: u32, y1: u32, color: Rgb<u8>) {
    let x1 = x1.min(img.width());
    let y1 = y1.min(img.height());
    for y in y0..y1 {
        for x in x0..x1 {
            img.put_pixel(x, y, color);
        }
    }
}
