//! MOTD rendering: `§`-prefixed color codes to a single-line SVG banner.
use std::fmt::Write as FmtWrite;

const SECTION_SIGN: char = '§';
const DEFAULT_COLOR: &str = "#FFFFFF";
const BACKGROUND: &str = "#0f172a";

const PADDING: usize = 8;
const LINE_HEIGHT: usize = 22;
const CHAR_ADVANCE: usize = 8;
const MIN_WIDTH: usize = 200;
const MAX_WIDTH: usize = 800;

/// A stretch of MOTD text drawn in one color.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MotdRun {
    pub text: String,
    pub color: &'static str,
}

fn code_color(code: char) -> Option<&'static str> {
    let color = match code {
        '0' => "#000000",
        '1' => "#0000AA",
        '2' => "#00AA00",
        '3' => "#00AAAA",
        '4' => "#AA0000",
        '5' => "#AA00AA",
        '6' => "#FFAA00",
        '7' => "#AAAAAA",
        '8' => "#555555",
        '9' => "#5555FF",
        'a' => "#55FF55",
        'b' => "#55FFFF",
        'c' => "#FF5555",
        'd' => "#FF55FF",
        'e' => "#FFFF55",
        'f' => "#FFFFFF",
        _ => return None,
    };
    Some(color)
}

/// Splits a MOTD into colored runs.
///
/// `§` plus a hex digit switches color, `§r` resets to white, and any other
/// code (bold, obfuscated, ...) is swallowed without effect. Newlines are
/// flattened to spaces since the banner is a single line.
pub fn parse_motd(motd: &str) -> Vec<MotdRun> {
    let mut runs = Vec::new();
    let mut color = DEFAULT_COLOR;
    let mut text = String::new();
    let mut chars = motd.chars();

    while let Some(ch) = chars.next() {
        if ch != SECTION_SIGN {
            text.push(if ch == '\n' { ' ' } else { ch });
            continue;
        }
        let Some(code) = chars.next() else {
            // A dangling sign has no code to apply.
            text.push(ch);
            break;
        };
        if !text.is_empty() {
            runs.push(MotdRun {
                text: std::mem::take(&mut text),
                color,
            });
        }
        let code = code.to_ascii_lowercase();
        if let Some(next) = code_color(code) {
            color = next;
        } else if code == 'r' {
            color = DEFAULT_COLOR;
        }
    }

    if !text.is_empty() {
        runs.push(MotdRun { text, color });
    }
    runs
}

fn escape_xml(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

/// Renders the MOTD as an SVG document.
///
/// Run positions come from character counts rather than font metrics, so the
/// output only depends on the input text.
pub fn render_motd_svg(motd: &str) -> Vec<u8> {
    let runs = parse_motd(motd);
    let total_chars: usize = runs.iter().map(|run| run.text.chars().count()).sum();
    let width = (total_chars * CHAR_ADVANCE + PADDING * 2).clamp(MIN_WIDTH, MAX_WIDTH);
    let height = LINE_HEIGHT + PADDING * 2;

    let mut spans = String::new();
    let mut x = PADDING;
    for run in &runs {
        let _ = write!(
            spans,
            r#"<tspan fill="{}" x="{}" dy="0">{}</tspan>"#,
            run.color,
            x,
            escape_xml(&run.text)
        );
        x += (run.text.chars().count() * CHAR_ADVANCE).max(CHAR_ADVANCE);
    }

    let mut svg = String::new();
    svg.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    let _ = writeln!(
        svg,
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{width}" height="{height}">"#
    );
    let _ = writeln!(
        svg,
        r#"  <rect width="100%" height="100%" fill="{BACKGROUND}" rx="6"/>"#
    );
    let _ = writeln!(
        svg,
        r#"  <text x="{PADDING}" y="{}" font-family="Arial, sans-serif" font-size="14">{spans}</text>"#,
        PADDING + 16
    );
    svg.push_str("</svg>");
    svg.into_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(text: &str, color: &'static str) -> MotdRun {
        MotdRun {
            text: text.to_string(),
            color,
        }
    }

    #[test]
    fn test_parse_color_codes() {
        assert_eq!(
            parse_motd("§aOnline §2Fun"),
            vec![run("Online ", "#55FF55"), run("Fun", "#00AA00")]
        );
    }

    #[test]
    fn test_parse_plain_text_is_white() {
        assert_eq!(parse_motd("A Minecraft Server"), vec![run("A Minecraft Server", "#FFFFFF")]);
    }

    #[test]
    fn test_parse_reset_and_uppercase_codes() {
        assert_eq!(
            parse_motd("§CRed§rWhite"),
            vec![run("Red", "#FF5555"), run("White", "#FFFFFF")]
        );
    }

    #[test]
    fn test_parse_formatting_codes_are_ignored() {
        assert_eq!(
            parse_motd("§6§lGold bold§kx"),
            vec![run("Gold bold", "#FFAA00"), run("x", "#FFAA00")]
        );
    }

    #[test]
    fn test_parse_flattens_newlines_and_keeps_dangling_sign() {
        assert_eq!(
            parse_motd("§bline one\nline two §"),
            vec![run("line one line two §", "#55FFFF")]
        );
        assert!(parse_motd("").is_empty());
        assert!(parse_motd("§a§b").is_empty());
    }

    #[test]
    fn test_svg_positions_runs_by_character_count() {
        let svg = String::from_utf8(render_motd_svg("§aOnline §2Fun")).unwrap();
        assert!(svg.contains(r#"width="200" height="38""#));
        assert!(svg.contains(r##"<tspan fill="#55FF55" x="8" dy="0">Online </tspan>"##));
        assert!(svg.contains(r##"<tspan fill="#00AA00" x="64" dy="0">Fun</tspan>"##));
        assert!(svg.contains(r##"fill="#0f172a""##));
    }

    #[test]
    fn test_svg_escapes_markup_and_clamps_width() {
        let svg = String::from_utf8(render_motd_svg("<b>&</b>")).unwrap();
        assert!(svg.contains("&lt;b&gt;&amp;&lt;/b&gt;"));

        let long = "x".repeat(500);
        let svg = String::from_utf8(render_motd_svg(&long)).unwrap();
        assert!(svg.contains(r#"width="800""#));
    }

    #[test]
    fn test_svg_is_deterministic() {
        assert_eq!(render_motd_svg("§eHello"), render_motd_svg("§eHello"));
    }
}
