//! PNG chart rendering
//!
//! One image with two panels: the current level distribution per faction on
//! top, and online players per faction over time below it. Text is drawn with
//! the first usable sans-serif system font; without one the chart is rendered
//! without labels.

use crate::error::{Result, TrackerError};
use crate::models::{FactionSample, StatsSnapshot};
use crate::report::leader_text;
use ab_glyph::{FontVec, PxScale};
use fontdb::{Database, Family, Query};
use image::{ImageFormat, Rgb, RgbImage};
use imageproc::drawing::{
    draw_filled_rect_mut, draw_hollow_rect_mut, draw_line_segment_mut, draw_text_mut, text_size,
};
use imageproc::rect::Rect;
use std::io::Cursor;
use tracing::{debug, warn};

pub const CHART_WIDTH: u32 = 1100;
pub const CHART_HEIGHT: u32 = 900;

const BACKGROUND: Rgb<u8> = Rgb([0x0e, 0x11, 0x16]);
const GRID: Rgb<u8> = Rgb([0x3a, 0x3f, 0x44]);
const AXIS: Rgb<u8> = Rgb([0xcf, 0xd3, 0xd8]);
const TEXT: Rgb<u8> = Rgb([0xff, 0xff, 0xff]);
const BOX_FILL: Rgb<u8> = Rgb([0x1a, 0x1d, 0x22]);
const COLONIAL: Rgb<u8> = Rgb([0x4f, 0x9d, 0xff]);
const COLONIAL_EDGE: Rgb<u8> = Rgb([0xcf, 0xe8, 0xff]);
const CYLON: Rgb<u8> = Rgb([0xff, 0x00, 0x00]);
const CYLON_EDGE: Rgb<u8> = Rgb([0xff, 0xb3, 0xb3]);

const GRID_LINES: u32 = 5;

const TITLE_SIZE: f32 = 22.0;
const AXIS_LABEL_SIZE: f32 = 16.0;
const TICK_SIZE: f32 = 14.0;
const BOX_TEXT_SIZE: f32 = 15.0;

/// Plot area of one panel, in pixels
#[derive(Debug, Clone, Copy)]
struct PlotArea {
    left: i32,
    top: i32,
    right: i32,
    bottom: i32,
}

impl PlotArea {
    fn width(&self) -> i32 {
        self.right - self.left
    }

    fn height(&self) -> i32 {
        self.bottom - self.top
    }
}

const DISTRIBUTION_AREA: PlotArea = PlotArea { left: 80, top: 60, right: 1070, bottom: 380 };
const HISTORY_AREA: PlotArea = PlotArea { left: 80, top: 500, right: 1070, bottom: 820 };

/// Renders stats charts; holds the font so it is loaded once per process
pub struct ChartRenderer {
    font: Option<FontVec>,
}

impl Default for ChartRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl ChartRenderer {
    /// Create a renderer using a system sans-serif font for labels
    pub fn new() -> Self {
        let font = load_system_font();
        if font.is_none() {
            warn!("No usable system font found; charts will be rendered without text");
        }
        Self { font }
    }

    /// Renderer that draws shapes only
    pub fn without_text() -> Self {
        Self { font: None }
    }

    pub fn has_text(&self) -> bool {
        self.font.is_some()
    }

    /// Render the combined chart and return PNG bytes
    pub fn render(&self, label: &str, snapshot: &StatsSnapshot, history: &[FactionSample]) -> Result<Vec<u8>> {
        let mut canvas = Canvas::new(self.font.as_ref());
        let title_prefix = if label.is_empty() { String::new() } else { format!("[{label}] ") };

        draw_distribution(&mut canvas, &title_prefix, snapshot);
        draw_history(&mut canvas, &title_prefix, history);

        let mut png = Vec::new();
        canvas
            .img
            .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
            .map_err(|e| TrackerError::chart(format!("PNG encoding failed: {e}")))?;

        Ok(png)
    }
}

fn load_system_font() -> Option<FontVec> {
    let mut db = Database::new();
    db.load_system_fonts();

    let families =
        [Family::Name("DejaVu Sans"), Family::Name("Liberation Sans"), Family::Name("Arial"), Family::SansSerif];
    let id = db
        .query(&Query { families: &families, ..Query::default() })
        .or_else(|| db.faces().next().map(|face| face.id))?;

    let font = db
        .with_face_data(id, |data, index| FontVec::try_from_vec_and_index(data.to_vec(), index).ok())
        .flatten();
    if font.is_some() {
        debug!("Loaded chart font from {} system faces", db.len());
    }
    font
}

/// Image plus optional font; text calls are no-ops without a font
struct Canvas<'a> {
    img: RgbImage,
    font: Option<&'a FontVec>,
}

impl<'a> Canvas<'a> {
    fn new(font: Option<&'a FontVec>) -> Self {
        Self { img: RgbImage::from_pixel(CHART_WIDTH, CHART_HEIGHT, BACKGROUND), font }
    }

    fn text_width(&self, text: &str, size: f32) -> i32 {
        self.font.map(|font| text_size(PxScale::from(size), font, text).0 as i32).unwrap_or(0)
    }

    fn text(&mut self, x: i32, y: i32, size: f32, color: Rgb<u8>, text: &str) {
        if let Some(font) = self.font {
            draw_text_mut(&mut self.img, color, x, y, PxScale::from(size), font, text);
        }
    }

    fn text_centered(&mut self, center_x: i32, y: i32, size: f32, color: Rgb<u8>, text: &str) {
        let width = self.text_width(text, size);
        self.text(center_x - width / 2, y, size, color, text);
    }

    fn text_right(&mut self, right_x: i32, y: i32, size: f32, color: Rgb<u8>, text: &str) {
        let width = self.text_width(text, size);
        self.text(right_x - width, y, size, color, text);
    }

    fn fill_rect(&mut self, x: i32, y: i32, width: i32, height: i32, color: Rgb<u8>) {
        if width > 0 && height > 0 {
            draw_filled_rect_mut(&mut self.img, Rect::at(x, y).of_size(width as u32, height as u32), color);
        }
    }

    fn stroke_rect(&mut self, x: i32, y: i32, width: i32, height: i32, color: Rgb<u8>) {
        if width > 0 && height > 0 {
            draw_hollow_rect_mut(&mut self.img, Rect::at(x, y).of_size(width as u32, height as u32), color);
        }
    }

    fn line(&mut self, from: (f32, f32), to: (f32, f32), color: Rgb<u8>) {
        draw_line_segment_mut(&mut self.img, from, to, color);
    }

    /// Two-pixel line for data series
    fn thick_line(&mut self, from: (f32, f32), to: (f32, f32), color: Rgb<u8>) {
        self.line(from, to, color);
        self.line((from.0, from.1 + 1.0), (to.0, to.1 + 1.0), color);
    }

    /// Boxed annotation whose top-right corner is at (`right`, `top`)
    fn text_box(&mut self, right: i32, top: i32, text: &str) {
        let width = self.text_width(text, BOX_TEXT_SIZE);
        if width == 0 {
            return;
        }
        let (box_width, box_height) = (width + 16, BOX_TEXT_SIZE as i32 + 12);
        let left = right - box_width;
        self.fill_rect(left, top, box_width, box_height, BOX_FILL);
        self.stroke_rect(left, top, box_width, box_height, GRID);
        self.text(left + 8, top + 5, BOX_TEXT_SIZE, TEXT, text);
    }

    fn legend(&mut self, area: PlotArea) {
        let x = area.left + 12;
        let mut y = area.top + 10;
        for (name, fill) in [("Colonial", COLONIAL), ("Cylon", CYLON)] {
            self.fill_rect(x, y + 2, 14, 14, fill);
            self.text(x + 22, y, TICK_SIZE, TEXT, name);
            y += 22;
        }
    }

    /// Dashed horizontal grid with `max_value` scaled to `scale_height`
    fn grid(&mut self, area: PlotArea, max_value: u32, scale_height: i32) {
        for step in 1..=GRID_LINES {
            let offset = area.height() * step as i32 / (GRID_LINES as i32 + 1);
            let y = (area.bottom - offset) as f32;

            let mut x = area.left as f32;
            while x < area.right as f32 {
                let end = (x + 5.0).min(area.right as f32);
                self.line((x, y), (end, y), GRID);
                x += 9.0;
            }

            let value = max_value as f64 * offset as f64 / scale_height as f64;
            self.text_right(area.left - 8, y as i32 - 7, TICK_SIZE, AXIS, &format!("{:.0}", value));
        }
    }

    fn axes(&mut self, area: PlotArea) {
        let (left, top, right, bottom) =
            (area.left as f32, area.top as f32, area.right as f32, area.bottom as f32);
        self.line((left, bottom), (right, bottom), AXIS);
        self.line((left, top), (left, bottom), AXIS);
    }
}

fn draw_distribution(canvas: &mut Canvas, title_prefix: &str, snapshot: &StatsSnapshot) {
    let area = DISTRIBUTION_AREA;
    let timestamp = snapshot.fetched_at.format("%Y-%m-%d %H:%M:%S UTC");

    canvas.text_centered(
        CHART_WIDTH as i32 / 2,
        12,
        TITLE_SIZE,
        TEXT,
        &format!("{title_prefix}Player Level Distribution by Faction ({timestamp})"),
    );
    canvas.text(12, 36, AXIS_LABEL_SIZE, TEXT, "Count");
    canvas.text_centered(area.left + area.width() / 2, area.bottom + 30, AXIS_LABEL_SIZE, TEXT, "Level Range");

    let buckets = snapshot.level_distribution();
    let max_count = buckets.iter().map(|b| b.colonial.max(b.cylon)).max().unwrap_or(0).max(1) as u32;
    // headroom for the count labels above the tallest bar
    let scale_height = area.height() - 30;

    canvas.grid(area, max_count, scale_height);

    let slot_width = area.width() / buckets.len().max(1) as i32;
    let bar_width = slot_width * 45 / 100;

    for (index, bucket) in buckets.iter().enumerate() {
        let center = area.left + slot_width * index as i32 + slot_width / 2;
        let bars = [
            (center - bar_width, bucket.colonial as u32, COLONIAL, COLONIAL_EDGE),
            (center, bucket.cylon as u32, CYLON, CYLON_EDGE),
        ];

        for (x, count, fill, edge) in bars {
            let bar_height = (scale_height as i64 * count as i64 / max_count as i64) as i32;
            let y = area.bottom - bar_height;
            canvas.fill_rect(x, y, bar_width, bar_height, fill);
            canvas.stroke_rect(x, y, bar_width, bar_height, edge);
            canvas.text_centered(x + bar_width / 2, y - 18, 13.0, TEXT, &count.to_string());
        }

        canvas.text_centered(center, area.bottom + 8, TICK_SIZE, TEXT, &bucket.label());
    }

    canvas.axes(area);
    canvas.legend(area);
    canvas.text_box(
        area.right - 8,
        area.top + 8,
        &format!(
            "Colonial: {}   Cylon: {}   Total: {}",
            snapshot.colonial_count(),
            snapshot.cylon_count(),
            snapshot.total_count()
        ),
    );
}

fn draw_history(canvas: &mut Canvas, title_prefix: &str, history: &[FactionSample]) {
    let area = HISTORY_AREA;

    if history.is_empty() {
        canvas.text_centered(
            area.left + area.width() / 2,
            area.top + area.height() / 2 - 8,
            AXIS_LABEL_SIZE,
            TEXT,
            "No history yet to plot.",
        );
        return;
    }

    canvas.text_centered(
        CHART_WIDTH as i32 / 2,
        area.top - 48,
        TITLE_SIZE,
        TEXT,
        &format!("{title_prefix}Players Online Over Time"),
    );
    canvas.text(12, area.top - 22, AXIS_LABEL_SIZE, TEXT, "Players Online");
    canvas.text_centered(area.left + area.width() / 2, area.bottom + 30, AXIS_LABEL_SIZE, TEXT, "Timestamp (UTC)");

    let first = history[0].timestamp;
    let last = history[history.len() - 1].timestamp;
    let span = (last - first).num_seconds().max(1) as f32;
    let max_count = history.iter().map(|s| s.colonial.max(s.cylon)).max().unwrap_or(0).max(1);
    let scale_height = area.height() - 10;

    canvas.grid(area, max_count, scale_height);

    let project = |sample: &FactionSample, count: u32| -> (f32, f32) {
        let x = if history.len() == 1 {
            area.left as f32 + area.width() as f32 / 2.0
        } else {
            area.left as f32 + (sample.timestamp - first).num_seconds() as f32 / span * area.width() as f32
        };
        let y = area.bottom as f32 - count as f32 / max_count as f32 * scale_height as f32;
        (x, y)
    };

    let series: [(Rgb<u8>, fn(&FactionSample) -> u32); 2] =
        [(COLONIAL, |s| s.colonial), (CYLON, |s| s.cylon)];

    for (color, pick) in series {
        let points: Vec<(f32, f32)> = history.iter().map(|s| project(s, pick(s))).collect();
        if let [(x, y)] = points[..] {
            canvas.fill_rect(x as i32 - 2, y as i32 - 2, 5, 5, color);
        }
        for pair in points.windows(2) {
            canvas.thick_line(pair[0], pair[1], color);
        }
    }

    let ticks = if history.len() == 1 { vec![&history[0]] } else { vec![&history[0], &history[history.len() - 1]] };
    for sample in ticks {
        let (x, _) = project(sample, 0);
        let label = sample.timestamp.format("%m-%d %H:%M").to_string();
        let width = canvas.text_width(&label, TICK_SIZE);
        let x = (x as i32 - width / 2).clamp(area.left, area.right - width);
        canvas.text(x, area.bottom + 8, TICK_SIZE, TEXT, &label);
    }

    canvas.axes(area);
    canvas.legend(area);
    canvas.text_box(area.right - 8, area.bottom - BOX_TEXT_SIZE as i32 - 20, &leader_text(history));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Faction, PlayerRecord};
    use chrono::{Duration, Utc};

    fn snapshot() -> StatsSnapshot {
        let players = (0..40)
            .map(|i| PlayerRecord {
                faction: if i % 3 == 0 { Faction::Cylon } else { Faction::Colonial },
                player_id: i.to_string(),
                name: format!("Pilot {i}"),
                level: (i * 7) as u32,
            })
            .collect();
        StatsSnapshot::new(players)
    }

    fn history() -> Vec<FactionSample> {
        let start = Utc::now() - Duration::hours(3);
        (0..12)
            .map(|i| FactionSample {
                timestamp: start + Duration::minutes(15 * i),
                colonial: 20 + i as u32,
                cylon: 30 - i as u32,
            })
            .collect()
    }

    fn decode(png: &[u8]) -> RgbImage {
        image::load_from_memory_with_format(png, ImageFormat::Png).unwrap().to_rgb8()
    }

    fn region_is_blank(img: &RgbImage, rows: std::ops::Range<u32>, cols: std::ops::Range<u32>) -> bool {
        rows.clone().all(|y| cols.clone().all(|x| *img.get_pixel(x, y) == BACKGROUND))
    }

    #[test]
    fn test_render_chart_produces_png() {
        let png = ChartRenderer::without_text().render("EU", &snapshot(), &[]).unwrap();

        assert_eq!(&png[..8], b"\x89PNG\r\n\x1a\n");
        let img = decode(&png);
        assert_eq!(img.dimensions(), (CHART_WIDTH, CHART_HEIGHT));
        assert!(img.pixels().any(|p| *p == COLONIAL));
        assert!(img.pixels().any(|p| *p == CYLON));
    }

    #[test]
    fn test_render_chart_with_history() {
        let img = decode(&ChartRenderer::without_text().render("EU", &snapshot(), &history()).unwrap());

        let lower_has_series = (HISTORY_AREA.top as u32..HISTORY_AREA.bottom as u32)
            .any(|y| (0..CHART_WIDTH).any(|x| *img.get_pixel(x, y) == CYLON));
        assert!(lower_has_series);
    }

    #[test]
    fn test_render_chart_single_sample_and_empty_snapshot() {
        let history = [FactionSample { timestamp: Utc::now(), colonial: 0, cylon: 0 }];
        let png = ChartRenderer::new().render("", &StatsSnapshot::new(Vec::new()), &history).unwrap();
        assert_eq!(decode(&png).dimensions(), (CHART_WIDTH, CHART_HEIGHT));
    }

    #[test]
    fn test_title_is_drawn_when_a_font_is_available() {
        let renderer = ChartRenderer::new();
        let img = decode(&renderer.render("EU", &snapshot(), &history()).unwrap());
        let title_rows = 0..34;

        if renderer.has_text() {
            assert!(!region_is_blank(&img, title_rows, 0..CHART_WIDTH));
        } else {
            assert!(region_is_blank(&img, title_rows, 0..CHART_WIDTH));
        }

        let plain = decode(&ChartRenderer::without_text().render("EU", &snapshot(), &history()).unwrap());
        assert!(region_is_blank(&plain, 0..34, 0..CHART_WIDTH));
    }

    #[test]
    fn test_empty_history_panel_shows_placeholder_text() {
        let renderer = ChartRenderer::new();
        let img = decode(&renderer.render("EU", &snapshot(), &[]).unwrap());
        let panel_rows = HISTORY_AREA.top as u32 - 60..CHART_HEIGHT;

        // no series, axes or grid without history; only the placeholder message
        assert!(!img.pixels().skip((panel_rows.start * CHART_WIDTH) as usize).any(|p| *p == CYLON));
        assert_eq!(region_is_blank(&img, panel_rows.clone(), 0..CHART_WIDTH), !renderer.has_text());

        let plain = decode(&ChartRenderer::without_text().render("EU", &snapshot(), &[]).unwrap());
        assert!(region_is_blank(&plain, panel_rows, 0..CHART_WIDTH));
    }
}
