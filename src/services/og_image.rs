//! Social-card SVG rendering.
//!
//! Pure string assembly: no I/O, no randomness, no timestamps. The same
//! parameters always produce the same bytes, which keeps the long
//! `Cache-Control` max-age on the endpoint honest.

use serde::Deserialize;

const DEFAULT_TITLE: &str = "GarlicLLM";
const ACCENT_COLOR: &str = "#6B4EFF";
const GRADIENT_END: &str = "#00FFD1";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Theme {
    Dark,
    Light,
}

impl Theme {
    /// `dark`, an absent parameter, and an empty value all select the dark
    /// theme. Any other value, including unrecognized ones, falls through
    /// to light.
    pub fn from_param(param: Option<&str>) -> Self {
        match param {
            None | Some("") | Some("dark") => Theme::Dark,
            Some(_) => Theme::Light,
        }
    }

    fn background(self) -> &'static str {
        match self {
            Theme::Dark => "#020712",
            Theme::Light => "#F8FAFC",
        }
    }

    fn text(self) -> &'static str {
        match self {
            Theme::Dark => "#E6EEF6",
            Theme::Light => "#0F172A",
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct OgImageParams {
    pub title: Option<String>,
    pub theme: Option<String>,
}

/// Renders a 1200x630 social card for the given title and theme.
pub fn render_og_image(params: &OgImageParams) -> String {
    let title = params
        .title
        .as_deref()
        .filter(|t| !t.is_empty())
        .unwrap_or(DEFAULT_TITLE);
    let theme = Theme::from_param(params.theme.as_deref());

    format!(
        r##"<svg width="1200" height="630" xmlns="http://www.w3.org/2000/svg">
  <rect width="100%" height="100%" fill="{bg}"/>
  <defs>
    <linearGradient id="grad" x1="0%" y1="0%" x2="100%" y2="100%">
      <stop offset="0%" style="stop-color:{accent};stop-opacity:1" />
      <stop offset="100%" style="stop-color:{grad_end};stop-opacity:1" />
    </linearGradient>
  </defs>
  <text x="100" y="280" font-family="Inter, sans-serif" font-size="72" font-weight="800" fill="url(#grad)">GARLIC LLM</text>
  <text x="100" y="380" font-family="Inter, sans-serif" font-size="36" fill="{text}">{title}</text>
  <text x="100" y="550" font-family="Inter, sans-serif" font-size="24" fill="{accent}">garlicllm.com</text>
  <circle cx="1050" cy="200" r="100" fill="{accent}" opacity="0.2"/>
  <circle cx="1100" cy="350" r="60" fill="{grad_end}" opacity="0.2"/>
</svg>
"##,
        bg = theme.background(),
        text = theme.text(),
        accent = ACCENT_COLOR,
        grad_end = GRADIENT_END,
        title = escape_xml(title),
    )
}

/// Escapes text for embedding in SVG element content.
fn escape_xml(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(ch),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(title: Option<&str>, theme: Option<&str>) -> OgImageParams {
        OgImageParams {
            title: title.map(str::to_string),
            theme: theme.map(str::to_string),
        }
    }

    #[test]
    fn test_theme_selection() {
        assert_eq!(Theme::from_param(None), Theme::Dark);
        assert_eq!(Theme::from_param(Some("dark")), Theme::Dark);
        // Empty values behave like an absent parameter
        assert_eq!(Theme::from_param(Some("")), Theme::Dark);
        assert_eq!(Theme::from_param(Some("light")), Theme::Light);
        // Unrecognized values fall through to light, matching the
        // binary theme choice
        assert_eq!(Theme::from_param(Some("neon")), Theme::Light);
    }

    #[test]
    fn test_dark_theme_colors() {
        let svg = render_og_image(&params(Some("Pricing"), None));
        assert!(svg.contains("fill=\"#020712\""));
        assert!(svg.contains("fill=\"#E6EEF6\""));
        assert!(svg.contains(">Pricing<"));
    }

    #[test]
    fn test_light_theme_colors() {
        let svg = render_og_image(&params(None, Some("light")));
        assert!(svg.contains("fill=\"#F8FAFC\""));
        assert!(svg.contains("fill=\"#0F172A\""));
    }

    #[test]
    fn test_default_title() {
        let svg = render_og_image(&params(None, None));
        assert!(svg.contains(">GarlicLLM<"));
    }

    #[test]
    fn test_empty_title_uses_default() {
        let svg = render_og_image(&params(Some(""), None));
        assert!(svg.contains(">GarlicLLM<"));
    }

    #[test]
    fn test_title_is_escaped() {
        let svg = render_og_image(&params(Some("<script>alert('x')</script>"), None));
        assert!(!svg.contains("<script>"));
        assert!(svg.contains("&lt;script&gt;alert(&apos;x&apos;)&lt;/script&gt;"));
    }

    #[test]
    fn test_rendering_is_deterministic() {
        let a = render_og_image(&params(Some("Benchmarks"), Some("dark")));
        let b = render_og_image(&params(Some("Benchmarks"), Some("dark")));
        assert_eq!(a, b);
    }

    #[test]
    fn test_fixed_layout_elements() {
        let svg = render_og_image(&params(None, None));
        assert!(svg.starts_with("<svg width=\"1200\" height=\"630\""));
        assert!(svg.contains("GARLIC LLM"));
        assert!(svg.contains("garlicllm.com"));
        assert!(svg.contains("cx=\"1050\" cy=\"200\" r=\"100\""));
        assert!(svg.contains("cx=\"1100\" cy=\"350\" r=\"60\""));
    }
}
