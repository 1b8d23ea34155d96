//! PURPOSE: Parses and renders `<xdr:twoCellAnchor>` drawing anchors,
//! spec.md §4.8.

use once_cell::sync::Lazy;
use regex::Regex;

/// One corner of a two-cell anchor: zero-based column/row plus the EMU
/// pixel offset within that cell.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnchorCorner {
    pub col: u32,
    pub col_off: i64,
    pub row: u32,
    pub row_off: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChartAnchor {
    pub from: AnchorCorner,
    pub to: AnchorCorner,
    /// The `<xdr:graphicFrame>...</xdr:graphicFrame>` body, kept verbatim
    /// except for the `r:id` it carries, which restore patches.
    pub graphic_frame_xml: String,
    pub rel_id: String,
}

static ANCHOR_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?s)<xdr:twoCellAnchor[^>]*>(.*?)</xdr:twoCellAnchor>"#).expect("valid regex")
});
static FROM_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?s)<xdr:from>.*?<xdr:col>(\d+)</xdr:col>.*?<xdr:colOff>(-?\d+)</xdr:colOff>.*?<xdr:row>(\d+)</xdr:row>.*?<xdr:rowOff>(-?\d+)</xdr:rowOff>.*?</xdr:from>"#)
        .expect("valid regex")
});
static TO_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?s)<xdr:to>.*?<xdr:col>(\d+)</xdr:col>.*?<xdr:colOff>(-?\d+)</xdr:colOff>.*?<xdr:row>(\d+)</xdr:row>.*?<xdr:rowOff>(-?\d+)</xdr:rowOff>.*?</xdr:to>"#)
        .expect("valid regex")
});
static GRAPHIC_FRAME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?s)<xdr:graphicFrame.*?</xdr:graphicFrame>"#).expect("valid regex")
});
static CHART_REL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"<c:chart[^>]*r:id="([^"]+)"[^>]*/>"#).expect("valid regex")
});

fn parse_corner(caps: &regex::Captures) -> AnchorCorner {
    AnchorCorner {
        col: caps[1].parse().unwrap_or(0),
        col_off: caps[2].parse().unwrap_or(0),
        row: caps[3].parse().unwrap_or(0),
        row_off: caps[4].parse().unwrap_or(0),
    }
}

/// Finds every `<xdr:twoCellAnchor>` in `drawing_xml` that anchors a chart
/// (carries a `<c:chart r:id="...">` inside its graphic frame), returning
/// each anchor's parsed geometry plus the full matched XML span so the
/// caller can remove it.
pub fn find_chart_anchors(drawing_xml: &str) -> Vec<(ChartAnchor, std::ops::Range<usize>)> {
    let mut found = Vec::new();
    for whole in ANCHOR_RE.captures_iter(drawing_xml) {
        let m = whole.get(0).unwrap();
        let body = &whole[1];

        let Some(rel_caps) = CHART_REL_RE.captures(body) else { continue };
        let rel_id = rel_caps[1].to_string();

        let Some(from_caps) = FROM_RE.captures(body) else { continue };
        let Some(to_caps) = TO_RE.captures(body) else { continue };
        let Some(frame_match) = GRAPHIC_FRAME_RE.find(body) else { continue };

        found.push((
            ChartAnchor {
                from: parse_corner(&from_caps),
                to: parse_corner(&to_caps),
                graphic_frame_xml: frame_match.as_str().to_string(),
                rel_id,
            },
            m.start()..m.end(),
        ));
    }
    found
}

fn render_corner(tag: &str, corner: &AnchorCorner) -> String {
    format!(
        "<xdr:{tag}><xdr:col>{}</xdr:col><xdr:colOff>{}</xdr:colOff><xdr:row>{}</xdr:row><xdr:rowOff>{}</xdr:rowOff></xdr:{tag}>",
        corner.col, corner.col_off, corner.row, corner.row_off
    )
}

/// Renders a `<xdr:twoCellAnchor>` element, substituting `rel_id` for the
/// original in the graphic frame body.
pub fn render_chart_anchor(anchor: &ChartAnchor, rel_id: &str) -> String {
    let frame = CHART_REL_RE
        .replace(&anchor.graphic_frame_xml, format!(r#"<c:chart r:id="{rel_id}""#) + "/>")
        .into_owned();
    format!(
        "<xdr:twoCellAnchor>{}{}{}<xdr:clientData/></xdr:twoCellAnchor>",
        render_corner("from", &anchor.from),
        render_corner("to", &anchor.to),
        frame,
    )
}
