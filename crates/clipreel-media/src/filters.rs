//! FFmpeg video filter definitions.
//!
//! Every clip in a compilation is normalized to the same profile so the
//! concat demuxer can splice them without re-encoding.

/// Output profile applied to every clip before concatenation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizeProfile {
    pub pixel_format: &'static str,
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    pub video_codec: &'static str,
    pub audio_codec: &'static str,
}

impl Default for NormalizeProfile {
    fn default() -> Self {
        Self {
            pixel_format: "yuv420p",
            width: 1280,
            height: 720,
            fps: 30,
            video_codec: "libx264",
            audio_codec: "aac",
        }
    }
}

impl NormalizeProfile {
    /// Filters that bring a clip to the profile.
    pub fn filters(&self) -> Vec<String> {
        vec![
            filter_format(self.pixel_format),
            filter_scale(self.width, self.height),
            filter_frame_rate(self.fps),
        ]
    }
}

/// Credit overlay placement.
const CREDIT_OFFSET_X: u32 = 0;
const CREDIT_OFFSET_Y: u32 = 0;
const CREDIT_HEIGHT: u32 = 30;
const CREDIT_BACK_FORE_OFFSET: u32 = 5;
const CREDIT_CHAR_WIDTH: u32 = 15;
const CREDIT_PADDING: u32 = 30;
const CREDIT_FONT: &str = "Inconsolata";
const CREDIT_FONT_SIZE: u32 = 22;

/// Pixel format filter.
pub fn filter_format(format: &str) -> String {
    format!("format=pix_fmts={}", format)
}

/// Scale filter.
pub fn filter_scale(width: u32, height: u32) -> String {
    format!("scale={}x{}", width, height)
}

/// Frame rate filter.
pub fn filter_frame_rate(fps: u32) -> String {
    format!("fps=fps={}", fps)
}

/// Box drawn over the stream. `thickness` of `None` fills the box.
pub fn filter_draw_box(
    x: u32,
    y: u32,
    width: u32,
    height: u32,
    color: &str,
    thickness: Option<u32>,
) -> String {
    let t = thickness.map_or_else(|| "fill".to_string(), |t| t.to_string());
    format!(
        "drawbox=x={}:y={}:w={}:h={}:color={}:t={}",
        x, y, width, height, color, t
    )
}

/// Text drawn over the stream.
pub fn filter_draw_text(x: u32, y: u32, text: &str) -> String {
    format!(
        "drawtext=x={}:y={}:text='{}':expansion=none:font={}:fontsize={}",
        x,
        y,
        escape_filter_text(text),
        CREDIT_FONT,
        CREDIT_FONT_SIZE
    )
}

/// Credit overlay: a translucent backing box, a solid box, and the name.
///
/// Box width scales with the text length.
pub fn credit_box(text: &str) -> Vec<String> {
    let width = text.chars().count() as u32 * CREDIT_CHAR_WIDTH + CREDIT_PADDING;
    vec![
        filter_draw_box(
            CREDIT_OFFSET_X,
            CREDIT_OFFSET_Y,
            width,
            CREDIT_HEIGHT,
            "SlateGray@0.5",
            None,
        ),
        filter_draw_box(
            CREDIT_OFFSET_X + CREDIT_BACK_FORE_OFFSET,
            CREDIT_OFFSET_Y + CREDIT_BACK_FORE_OFFSET,
            width,
            CREDIT_HEIGHT,
            "Gray@0.8",
            None,
        ),
        filter_draw_text(
            CREDIT_OFFSET_X + CREDIT_BACK_FORE_OFFSET * 3,
            CREDIT_OFFSET_Y + CREDIT_BACK_FORE_OFFSET * 3,
            text,
        ),
    ]
}

/// Full normalization chain for one clip, credit overlay last.
pub fn normalize_chain(profile: &NormalizeProfile, credit: Option<&str>) -> String {
    let mut filters = profile.filters();
    if let Some(text) = credit.filter(|t| !t.trim().is_empty()) {
        filters.extend(credit_box(text));
    }
    filters.join(",")
}

/// Escape text for a single-quoted drawtext value inside a filter graph.
///
/// A quote cannot appear inside a quoted span, so it closes the span,
/// emits an escaped quote, and reopens. Graph separators are inert inside
/// quotes; backslashes and colons are escaped for the option parser.
pub fn escape_filter_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\'' => out.push_str("'\\''"),
            '\\' => out.push_str("\\\\"),
            ':' => out.push_str("\\:"),
            '\n' | '\r' => out.push(' '),
            _ => out.push(c),
        }
    }
    out
}
