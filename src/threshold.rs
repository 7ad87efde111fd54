//! Viewport-relative scroll positions, written `"<element-edge> <viewport-edge>"`.
//!
//! An edge is `top`, `center`, `bottom`, a percentage (`80%`), or a pixel
//! offset (`120px` or a bare number). `"top 80%"` is the scroll position at
//! which the element's top meets the line 80% down the viewport.

use kurbo::Rect;

use crate::error::{ScrollFxError, ScrollFxResult};

#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize)]
pub enum Edge {
    /// Fraction of the box height from its top.
    Fraction(f64),
    /// Absolute pixel offset from the box top.
    Pixels(f64),
}

impl Edge {
    pub fn parse(token: &str) -> ScrollFxResult<Self> {
        let t = token.trim().to_ascii_lowercase();
        let edge = match t.as_str() {
            "top" => Self::Fraction(0.0),
            "center" => Self::Fraction(0.5),
            "bottom" => Self::Fraction(1.0),
            _ => {
                if let Some(p) = t.strip_suffix('%') {
                    Self::Fraction(parse_finite(p, token)? / 100.0)
                } else if let Some(px) = t.strip_suffix("px") {
                    Self::Pixels(parse_finite(px, token)?)
                } else {
                    Self::Pixels(parse_finite(&t, token)?)
                }
            }
        };
        Ok(edge)
    }

    /// Offset of this edge inside a box of height `height`.
    pub fn offset(self, height: f64) -> f64 {
        match self {
            Self::Fraction(f) => f * height,
            Self::Pixels(px) => px,
        }
    }
}

fn parse_finite(s: &str, original: &str) -> ScrollFxResult<f64> {
    s.trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| ScrollFxError::config(format!("invalid threshold edge '{original}'")))
}

/// Meeting point of an element edge and a viewport edge.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize)]
pub struct Threshold {
    pub element: Edge,
    pub viewport: Edge,
}

impl Threshold {
    pub const fn new(element: Edge, viewport: Edge) -> Self {
        Self { element, viewport }
    }

    pub fn parse(s: &str) -> ScrollFxResult<Self> {
        let mut parts = s.split_whitespace();
        match (parts.next(), parts.next(), parts.next()) {
            (Some(e), Some(v), None) => Ok(Self::new(Edge::parse(e)?, Edge::parse(v)?)),
            _ => Err(ScrollFxError::config(format!(
                "threshold must be '<element> <viewport>', got '{s}'"
            ))),
        }
    }

    /// Parse `s`, or fall back to `default` with a warning.
    pub fn parse_or(s: &str, default: Self) -> Self {
        Self::parse(s).unwrap_or_else(|err| {
            tracing::warn!(%err, "falling back to default threshold");
            default
        })
    }

    /// Scroll offset at which this threshold is met for an element at
    /// `rect` (page coordinates) in a viewport `viewport_height` tall.
    pub fn scroll_position(self, rect: Rect, viewport_height: f64) -> f64 {
        rect.y0 + self.element.offset(rect.height()) - self.viewport.offset(viewport_height)
    }
}

/// End of a scroll span: an absolute threshold or a distance past the start.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize)]
pub enum SpanEnd {
    At(Threshold),
    After(f64),
}

impl SpanEnd {
    /// Parse `"+=500"` as [`SpanEnd::After`], anything else as a threshold.
    pub fn parse(s: &str) -> ScrollFxResult<Self> {
        match s.trim().strip_prefix("+=") {
            Some(px) => {
                let px = parse_finite(px.trim_end_matches("px"), s)?;
                Ok(Self::After(px.max(0.0)))
            }
            None => Ok(Self::At(Threshold::parse(s)?)),
        }
    }

    pub fn parse_or(s: &str, default: Self) -> Self {
        Self::parse(s).unwrap_or_else(|err| {
            tracing::warn!(%err, "falling back to default span end");
            default
        })
    }

    pub fn scroll_position(self, start: f64, rect: Rect, viewport_height: f64) -> f64 {
        match self {
            Self::At(t) => t.scroll_position(rect, viewport_height),
            Self::After(px) => start + px,
        }
    }
}
