//! Slide part XML.
//!
//! Every slide uses the blank layout and positions its own shapes, so the
//! output does not depend on placeholder geometry from the master.

use std::fmt::{self, Write as FmtWrite};

use super::{escape_xml, Image, ShapeKind, Slide, SlideBody, Table};

pub(crate) const SLIDE_WIDTH: i64 = 12_192_000;
pub(crate) const SLIDE_HEIGHT: i64 = 6_858_000;

const MARGIN: i64 = 609_600;
const CONTENT_WIDTH: i64 = SLIDE_WIDTH - 2 * MARGIN;
const BODY_TOP: i64 = 1_645_920;
const BODY_HEIGHT: i64 = SLIDE_HEIGHT - BODY_TOP - 457_200;
const TABLE_ROW_HEIGHT: i64 = 370_840;

const BACKGROUND: &str = "121212";
const TITLE_COLOR: &str = "FFFFFF";
const BODY_COLOR: &str = "D9D9D9";
const ACCENT: &str = "9FEF00";
const ON_ACCENT: &str = "0A0A0A";
const TABLE_HEADER_FILL: &str = "2A2A2A";
const TABLE_CELL_FILL: &str = "1A1A1A";

const NAMESPACES: &str = concat!(
    r#"xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" "#,
    r#"xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" "#,
    r#"xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main""#
);

#[derive(Clone, Copy)]
struct Rect {
    x: i64,
    y: i64,
    w: i64,
    h: i64,
}

struct TextStyle<'a> {
    size: u32,
    bold: bool,
    color: &'a str,
    bullets: bool,
    centered: bool,
}

/// Hands out unique shape ids; id 1 is the group shape of the tree.
struct SpTree {
    xml: String,
    next_id: u32,
}

impl SpTree {
    fn new() -> Self {
        Self {
            xml: String::with_capacity(4096),
            next_id: 2,
        }
    }

    fn id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn text_box(
        &mut self,
        name: &str,
        rect: Rect,
        paragraphs: &[String],
        style: TextStyle<'_>,
    ) -> fmt::Result {
        let id = self.id();
        write!(
            self.xml,
            r#"<p:sp><p:nvSpPr><p:cNvPr id="{id}" name="{name} {id}"/><p:cNvSpPr txBox="1"/><p:nvPr/></p:nvSpPr>"#
        )?;
        self.sp_pr(rect, "rect", None)?;
        self.text_body(paragraphs, &style, "t")?;
        self.xml.push_str("</p:sp>");
        Ok(())
    }

    fn preset_shape(
        &mut self,
        preset: &str,
        rect: Rect,
        fill: &str,
        text: Option<(&str, TextStyle<'_>)>,
    ) -> fmt::Result {
        let id = self.id();
        write!(
            self.xml,
            r#"<p:sp><p:nvSpPr><p:cNvPr id="{id}" name="Shape {id}"/><p:cNvSpPr/><p:nvPr/></p:nvSpPr>"#
        )?;
        self.sp_pr(rect, preset, Some(fill))?;
        match text {
            Some((text, style)) => self.text_body(&[text.to_string()], &style, "ctr")?,
            None => self.xml.push_str(EMPTY_TEXT_BODY),
        }
        self.xml.push_str("</p:sp>");
        Ok(())
    }

    fn picture(&mut self, rel_id: &str, rect: Rect) -> fmt::Result {
        let id = self.id();
        write!(
            self.xml,
            r#"<p:pic><p:nvPicPr><p:cNvPr id="{id}" name="Picture {id}"/><p:cNvPicPr><a:picLocks noChangeAspect="1"/></p:cNvPicPr><p:nvPr/></p:nvPicPr>"#
        )?;
        write!(
            self.xml,
            r#"<p:blipFill><a:blip r:embed="{rel_id}"/><a:stretch><a:fillRect/></a:stretch></p:blipFill>"#
        )?;
        self.sp_pr(rect, "rect", None)?;
        self.xml.push_str("</p:pic>");
        Ok(())
    }

    fn table(&mut self, table: &Table, rect: Rect) -> fmt::Result {
        let cols = table.column_count().max(1);
        let col_width = rect.w / cols as i64;
        let id = self.id();
        write!(
            self.xml,
            r#"<p:graphicFrame><p:nvGraphicFramePr><p:cNvPr id="{id}" name="Table {id}"/><p:cNvGraphicFramePr><a:graphicFrameLocks noGrp="1"/></p:cNvGraphicFramePr><p:nvPr/></p:nvGraphicFramePr>"#
        )?;
        write!(
            self.xml,
            r#"<p:xfrm><a:off x="{}" y="{}"/><a:ext cx="{}" cy="{}"/></p:xfrm>"#,
            rect.x, rect.y, rect.w, rect.h
        )?;
        self.xml.push_str(
            r#"<a:graphic><a:graphicData uri="http://schemas.openxmlformats.org/drawingml/2006/table"><a:tbl><a:tblPr firstRow="1" bandRow="1"/><a:tblGrid>"#,
        );
        for _ in 0..cols {
            write!(self.xml, r#"<a:gridCol w="{col_width}"/>"#)?;
        }
        self.xml.push_str("</a:tblGrid>");

        self.table_row(&table.header, cols, true)?;
        for row in &table.rows {
            self.table_row(row, cols, false)?;
        }
        self.xml.push_str("</a:tbl></a:graphicData></a:graphic></p:graphicFrame>");
        Ok(())
    }

    fn table_row(&mut self, cells: &[String], cols: usize, header: bool) -> fmt::Result {
        let (fill, color, bold) = if header {
            (TABLE_HEADER_FILL, ACCENT, "1")
        } else {
            (TABLE_CELL_FILL, BODY_COLOR, "0")
        };
        write!(self.xml, r#"<a:tr h="{TABLE_ROW_HEIGHT}">"#)?;
        for i in 0..cols {
            let text = cells.get(i).map(String::as_str).unwrap_or("");
            write!(
                self.xml,
                r#"<a:tc><a:txBody><a:bodyPr/><a:lstStyle/><a:p><a:r><a:rPr lang="en-US" sz="1400" b="{bold}" dirty="0"><a:solidFill><a:srgbClr val="{color}"/></a:solidFill></a:rPr><a:t>{}</a:t></a:r></a:p></a:txBody><a:tcPr><a:solidFill><a:srgbClr val="{fill}"/></a:solidFill></a:tcPr></a:tc>"#,
                escape_xml(text)
            )?;
        }
        self.xml.push_str("</a:tr>");
        Ok(())
    }

    fn sp_pr(&mut self, rect: Rect, preset: &str, fill: Option<&str>) -> fmt::Result {
        write!(
            self.xml,
            r#"<p:spPr><a:xfrm><a:off x="{}" y="{}"/><a:ext cx="{}" cy="{}"/></a:xfrm><a:prstGeom prst="{preset}"><a:avLst/></a:prstGeom>"#,
            rect.x, rect.y, rect.w, rect.h
        )?;
        match fill {
            Some(color) => write!(
                self.xml,
                r#"<a:solidFill><a:srgbClr val="{color}"/></a:solidFill><a:ln><a:noFill/></a:ln>"#
            )?,
            None => self.xml.push_str("<a:noFill/>"),
        }
        self.xml.push_str("</p:spPr>");
        Ok(())
    }

    fn text_body(
        &mut self,
        paragraphs: &[String],
        style: &TextStyle<'_>,
        anchor: &str,
    ) -> fmt::Result {
        write!(
            self.xml,
            r#"<p:txBody><a:bodyPr wrap="square" anchor="{anchor}"><a:normAutofit/></a:bodyPr><a:lstStyle/>"#
        )?;
        if paragraphs.is_empty() {
            self.xml.push_str(r#"<a:p><a:endParaRPr lang="en-US"/></a:p>"#);
        }
        for text in paragraphs {
            self.xml.push_str("<a:p>");
            if style.bullets {
                self.xml.push_str(
                    r#"<a:pPr marL="342900" indent="-342900"><a:spcBef><a:spcPts val="600"/></a:spcBef><a:buFont typeface="Arial"/><a:buChar char="&#8226;"/></a:pPr>"#,
                );
            } else if style.centered {
                self.xml.push_str(r#"<a:pPr algn="ctr"/>"#);
            }
            write!(
                self.xml,
                r#"<a:r><a:rPr lang="en-US" sz="{}" b="{}" dirty="0"><a:solidFill><a:srgbClr val="{}"/></a:solidFill><a:latin typeface="Calibri"/></a:rPr><a:t>{}</a:t></a:r></a:p>"#,
                style.size,
                if style.bold { "1" } else { "0" },
                style.color,
                escape_xml(text)
            )?;
        }
        self.xml.push_str("</p:txBody>");
        Ok(())
    }
}

/// Render one slide part. `image_rel_id` is the relationship id of the
/// slide's picture, when it has one.
pub(crate) fn slide_xml(
    slide: &Slide,
    image_rel_id: Option<&str>,
) -> Result<String, fmt::Error> {
    let mut tree = SpTree::new();

    tree.text_box(
        "Title",
        Rect {
            x: MARGIN,
            y: 365_760,
            w: CONTENT_WIDTH,
            h: 1_005_840,
        },
        &[slide.title.clone()],
        TextStyle {
            size: 3600,
            bold: true,
            color: TITLE_COLOR,
            bullets: false,
            centered: false,
        },
    )?;
    tree.preset_shape(
        "rect",
        Rect {
            x: MARGIN,
            y: 1_417_320,
            w: 1_828_800,
            h: 54_864,
        },
        ACCENT,
        None,
    )?;

    match &slide.body {
        SlideBody::Text { bullets, table } => render_text(&mut tree, bullets, table.as_ref())?,
        SlideBody::Picture { bullets, image } => {
            render_picture(&mut tree, bullets, image, image_rel_id)?
        }
        SlideBody::Process { shape, steps } => render_process(&mut tree, *shape, steps)?,
    }

    let mut xml = String::with_capacity(tree.xml.len() + 1024);
    xml.push_str(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#);
    write!(xml, "<p:sld {NAMESPACES}><p:cSld>")?;
    write!(
        xml,
        r#"<p:bg><p:bgPr><a:solidFill><a:srgbClr val="{BACKGROUND}"/></a:solidFill><a:effectLst/></p:bgPr></p:bg>"#
    )?;
    xml.push_str(GROUP_PROPERTIES_OPEN);
    xml.push_str(&tree.xml);
    xml.push_str("</p:spTree></p:cSld><p:clrMapOvr><a:masterClrMapping/></p:clrMapOvr></p:sld>");
    Ok(xml)
}

const EMPTY_TEXT_BODY: &str =
    r#"<p:txBody><a:bodyPr/><a:lstStyle/><a:p><a:endParaRPr lang="en-US"/></a:p></p:txBody>"#;

/// `<p:spTree>` opening plus its mandatory group shape properties.
pub(crate) const GROUP_PROPERTIES_OPEN: &str = concat!(
    r#"<p:spTree><p:nvGrpSpPr><p:cNvPr id="1" name=""/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr>"#,
    r#"<p:grpSpPr><a:xfrm><a:off x="0" y="0"/><a:ext cx="0" cy="0"/><a:chOff x="0" y="0"/><a:chExt cx="0" cy="0"/></a:xfrm></p:grpSpPr>"#
);

fn body_style(size: u32) -> TextStyle<'static> {
    TextStyle {
        size,
        bold: false,
        color: BODY_COLOR,
        bullets: true,
        centered: false,
    }
}

fn render_text(tree: &mut SpTree, bullets: &[String], table: Option<&Table>) -> fmt::Result {
    let Some(table) = table else {
        let size = if bullets.len() > 6 { 1800 } else { 2200 };
        return tree.text_box(
            "Content",
            Rect {
                x: MARGIN,
                y: BODY_TOP,
                w: CONTENT_WIDTH,
                h: BODY_HEIGHT,
            },
            bullets,
            body_style(size),
        );
    };

    let mut top = BODY_TOP;
    if !bullets.is_empty() {
        let height = 1_097_280;
        tree.text_box(
            "Content",
            Rect {
                x: MARGIN,
                y: top,
                w: CONTENT_WIDTH,
                h: height,
            },
            bullets,
            body_style(1800),
        )?;
        top += height + 91_440;
    }
    let rows = table.rows.len() as i64 + 1;
    let rect = Rect {
        x: MARGIN,
        y: top,
        w: CONTENT_WIDTH,
        h: rows * TABLE_ROW_HEIGHT,
    };
    tree.table(table, rect)
}

fn render_picture(
    tree: &mut SpTree,
    bullets: &[String],
    image: &Image,
    rel_id: Option<&str>,
) -> fmt::Result {
    let text_width = CONTENT_WIDTH / 2 - 152_400;
    tree.text_box(
        "Content",
        Rect {
            x: MARGIN,
            y: BODY_TOP,
            w: text_width,
            h: BODY_HEIGHT,
        },
        bullets,
        body_style(2000),
    )?;

    if let Some(rel_id) = rel_id {
        let box_x = MARGIN + CONTENT_WIDTH / 2 + 152_400;
        let box_w = CONTENT_WIDTH / 2 - 152_400;
        let (w, h) = image.fit_within(box_w, BODY_HEIGHT);
        // center inside the right-hand box
        let x = box_x + (box_w - w) / 2;
        let y = BODY_TOP + (BODY_HEIGHT - h) / 2;
        tree.picture(rel_id, Rect { x, y, w, h })?;
    }
    Ok(())
}

fn render_process(tree: &mut SpTree, shape: ShapeKind, steps: &[String]) -> fmt::Result {
    if steps.is_empty() {
        return Ok(());
    }
    let count = steps.len() as i64;
    let overlap = 91_440;
    let width = (CONTENT_WIDTH + overlap * (count - 1)) / count;
    let height = 1_600_200;
    let y = BODY_TOP + (BODY_HEIGHT - height) / 2;
    let size = match steps.len() {
        0..=3 => 1600,
        4..=5 => 1400,
        _ => 1100,
    };

    for (i, step) in steps.iter().enumerate() {
        let x = MARGIN + i as i64 * (width - overlap);
        // first arrow is a pentagon so the row starts flat; the rest chain as chevrons
        let preset = match (shape, i) {
            (ShapeKind::Pentagon, 0) => ShapeKind::Pentagon.preset(),
            _ => ShapeKind::Chevron.preset(),
        };
        let label = TextStyle {
            size,
            bold: true,
            color: ON_ACCENT,
            bullets: false,
            centered: true,
        };
        let rect = Rect {
            x,
            y,
            w: width,
            h: height,
        };
        tree.preset_shape(preset, rect, ACCENT, Some((step, label)))?;
    }
    Ok(())
}
