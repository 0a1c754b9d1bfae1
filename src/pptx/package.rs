//! OPC package assembly for `.pptx` output.
//!
//! Writes `[Content_Types].xml`, the package relationships, document
//! properties, a single master/layout/theme trio, and one part per slide.

use std::collections::BTreeSet;
use std::fmt::Write as FmtWrite;
use std::io::{Cursor, Write};

use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use super::slide::{slide_xml, GROUP_PROPERTIES_OPEN, SLIDE_HEIGHT, SLIDE_WIDTH};
use super::{escape_xml, Deck, PptxError, SlideBody};

const XML_DECL: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#;
const NS_P: &str = "http://schemas.openxmlformats.org/presentationml/2006/main";
const NS_A: &str = "http://schemas.openxmlformats.org/drawingml/2006/main";
const NS_R: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
const NS_PKG_RELS: &str = "http://schemas.openxmlformats.org/package/2006/relationships";

const REL_OFFICE_DOCUMENT: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument";
const REL_CORE_PROPS: &str =
    "http://schemas.openxmlformats.org/package/2006/relationships/metadata/core-properties";
const REL_EXTENDED_PROPS: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/extended-properties";
const REL_SLIDE_MASTER: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/slideMaster";
const REL_SLIDE_LAYOUT: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/slideLayout";
const REL_SLIDE: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships/slide";
const REL_THEME: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships/theme";
const REL_IMAGE: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships/image";

const CT_PRESENTATION: &str =
    "application/vnd.openxmlformats-officedocument.presentationml.presentation.main+xml";
const CT_SLIDE: &str = "application/vnd.openxmlformats-officedocument.presentationml.slide+xml";
const CT_SLIDE_MASTER: &str =
    "application/vnd.openxmlformats-officedocument.presentationml.slideMaster+xml";
const CT_SLIDE_LAYOUT: &str =
    "application/vnd.openxmlformats-officedocument.presentationml.slideLayout+xml";
const CT_THEME: &str = "application/vnd.openxmlformats-officedocument.theme+xml";
const CT_CORE_PROPS: &str = "application/vnd.openxmlformats-package.core-properties+xml";
const CT_EXTENDED_PROPS: &str =
    "application/vnd.openxmlformats-officedocument.extended-properties+xml";

/// Serialize a deck into `.pptx` bytes.
pub fn write_package(deck: &Deck) -> Result<Vec<u8>, PptxError> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    let part =
        |zip: &mut ZipWriter<Cursor<Vec<u8>>>, name: &str, data: &[u8]| -> Result<(), PptxError> {
            zip.start_file(name, options)?;
            zip.write_all(data)?;
            Ok(())
        };

    part(&mut zip, "[Content_Types].xml", content_types(deck)?.as_bytes())?;
    part(&mut zip, "_rels/.rels", package_rels()?.as_bytes())?;
    part(&mut zip, "docProps/core.xml", core_props(deck).as_bytes())?;
    part(&mut zip, "docProps/app.xml", app_props(deck).as_bytes())?;
    part(&mut zip, "ppt/presentation.xml", presentation_xml(deck)?.as_bytes())?;
    part(&mut zip, "ppt/_rels/presentation.xml.rels", presentation_rels(deck)?.as_bytes())?;
    part(&mut zip, "ppt/slideMasters/slideMaster1.xml", slide_master_xml().as_bytes())?;
    part(
        &mut zip,
        "ppt/slideMasters/_rels/slideMaster1.xml.rels",
        relationships(&[
            ("rId1", REL_SLIDE_LAYOUT, "../slideLayouts/slideLayout1.xml"),
            ("rId2", REL_THEME, "../theme/theme1.xml"),
        ])?
        .as_bytes(),
    )?;
    part(&mut zip, "ppt/slideLayouts/slideLayout1.xml", slide_layout_xml().as_bytes())?;
    part(
        &mut zip,
        "ppt/slideLayouts/_rels/slideLayout1.xml.rels",
        relationships(&[(
            "rId1",
            REL_SLIDE_MASTER,
            "../slideMasters/slideMaster1.xml",
        )])?
        .as_bytes(),
    )?;
    part(&mut zip, "ppt/theme/theme1.xml", THEME_XML.as_bytes())?;

    let mut image_counter = 0;
    for (index, slide) in deck.slides().iter().enumerate() {
        let number = index + 1;
        let mut rels = vec![(
            "rId1".to_string(),
            REL_SLIDE_LAYOUT,
            "../slideLayouts/slideLayout1.xml".to_string(),
        )];

        let image_rel = if let SlideBody::Picture { image, .. } = &slide.body {
            image_counter += 1;
            let media_name = format!("image{}.{}", image_counter, image.format.extension());
            part(&mut zip, &format!("ppt/media/{}", media_name), &image.data)?;
            rels.push(("rId2".to_string(), REL_IMAGE, format!("../media/{}", media_name)));
            Some("rId2")
        } else {
            None
        };

        part(
            &mut zip,
            &format!("ppt/slides/slide{}.xml", number),
            slide_xml(slide, image_rel)?.as_bytes(),
        )?;
        let rel_refs: Vec<(&str, &str, &str)> = rels
            .iter()
            .map(|(id, kind, target)| (id.as_str(), *kind, target.as_str()))
            .collect();
        part(
            &mut zip,
            &format!("ppt/slides/_rels/slide{}.xml.rels", number),
            relationships(&rel_refs)?.as_bytes(),
        )?;
    }

    Ok(zip.finish()?.into_inner())
}

fn content_types(deck: &Deck) -> Result<String, PptxError> {
    let mut xml = String::with_capacity(2048);
    xml.push_str(XML_DECL);
    xml.push_str(r#"<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">"#);
    xml.push_str(
        r#"<Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>"#,
    );
    xml.push_str(r#"<Default Extension="xml" ContentType="application/xml"/>"#);

    let formats: BTreeSet<(&str, &str)> = deck
        .slides()
        .iter()
        .filter_map(|s| match &s.body {
            SlideBody::Picture { image, .. } => {
                Some((image.format.extension(), image.format.content_type()))
            }
            _ => None,
        })
        .collect();
    for (ext, content_type) in formats {
        write!(xml, r#"<Default Extension="{ext}" ContentType="{content_type}"/>"#)?;
    }

    for (part_name, content_type) in [
        ("/ppt/presentation.xml", CT_PRESENTATION),
        ("/ppt/slideMasters/slideMaster1.xml", CT_SLIDE_MASTER),
        ("/ppt/slideLayouts/slideLayout1.xml", CT_SLIDE_LAYOUT),
        ("/ppt/theme/theme1.xml", CT_THEME),
        ("/docProps/core.xml", CT_CORE_PROPS),
        ("/docProps/app.xml", CT_EXTENDED_PROPS),
    ] {
        write!(xml, r#"<Override PartName="{part_name}" ContentType="{content_type}"/>"#)?;
    }
    for number in 1..=deck.slide_count() {
        write!(
            xml,
            r#"<Override PartName="/ppt/slides/slide{number}.xml" ContentType="{CT_SLIDE}"/>"#
        )?;
    }
    xml.push_str("</Types>");
    Ok(xml)
}

fn relationships(rels: &[(&str, &str, &str)]) -> Result<String, PptxError> {
    let mut xml = String::with_capacity(512);
    xml.push_str(XML_DECL);
    write!(xml, r#"<Relationships xmlns="{NS_PKG_RELS}">"#)?;
    for (id, kind, target) in rels {
        write!(xml, r#"<Relationship Id="{id}" Type="{kind}" Target="{target}"/>"#)?;
    }
    xml.push_str("</Relationships>");
    Ok(xml)
}

fn package_rels() -> Result<String, PptxError> {
    relationships(&[
        ("rId1", REL_OFFICE_DOCUMENT, "ppt/presentation.xml"),
        ("rId2", REL_CORE_PROPS, "docProps/core.xml"),
        ("rId3", REL_EXTENDED_PROPS, "docProps/app.xml"),
    ])
}

/// Slide relationships in `presentation.xml.rels` start after master and theme.
fn slide_rel_id(index: usize) -> String {
    format!("rId{}", index + 3)
}

fn presentation_rels(deck: &Deck) -> Result<String, PptxError> {
    let slide_rels: Vec<(String, String)> = (0..deck.slide_count())
        .map(|i| (slide_rel_id(i), format!("slides/slide{}.xml", i + 1)))
        .collect();

    let mut rels = vec![
        ("rId1", REL_SLIDE_MASTER, "slideMasters/slideMaster1.xml"),
        ("rId2", REL_THEME, "theme/theme1.xml"),
    ];
    rels.extend(
        slide_rels
            .iter()
            .map(|(id, target)| (id.as_str(), REL_SLIDE, target.as_str())),
    );
    relationships(&rels)
}

fn presentation_xml(deck: &Deck) -> Result<String, PptxError> {
    let mut xml = String::with_capacity(1024);
    xml.push_str(XML_DECL);
    write!(
        xml,
        r#"<p:presentation xmlns:a="{NS_A}" xmlns:r="{NS_R}" xmlns:p="{NS_P}" saveSubsetFonts="1">"#
    )?;
    xml.push_str(
        r#"<p:sldMasterIdLst><p:sldMasterId id="2147483648" r:id="rId1"/></p:sldMasterIdLst>"#,
    );
    if deck.slide_count() > 0 {
        xml.push_str("<p:sldIdLst>");
        for index in 0..deck.slide_count() {
            write!(xml, r#"<p:sldId id="{}" r:id="{}"/>"#, 256 + index, slide_rel_id(index))?;
        }
        xml.push_str("</p:sldIdLst>");
    }
    write!(xml, r#"<p:sldSz cx="{SLIDE_WIDTH}" cy="{SLIDE_HEIGHT}"/>"#)?;
    xml.push_str(r#"<p:notesSz cx="6858000" cy="9144000"/>"#);
    xml.push_str("</p:presentation>");
    Ok(xml)
}

fn slide_master_xml() -> String {
    format!(
        concat!(
            "{decl}",
            r#"<p:sldMaster xmlns:a="{a}" xmlns:r="{r}" xmlns:p="{p}">"#,
            r#"<p:cSld><p:bg><p:bgRef idx="1001"><a:schemeClr val="bg1"/></p:bgRef></p:bg>{tree}</p:spTree></p:cSld>"#,
            r#"<p:clrMap bg1="dk1" tx1="lt1" bg2="dk2" tx2="lt2" accent1="accent1" accent2="accent2" accent3="accent3" accent4="accent4" accent5="accent5" accent6="accent6" hlink="hlink" folHlink="folHlink"/>"#,
            r#"<p:sldLayoutIdLst><p:sldLayoutId id="2147483649" r:id="rId1"/></p:sldLayoutIdLst>"#,
            r#"<p:txStyles><p:titleStyle><a:lvl1pPr><a:defRPr sz="3600"/></a:lvl1pPr></p:titleStyle><p:bodyStyle><a:lvl1pPr><a:defRPr sz="2000"/></a:lvl1pPr></p:bodyStyle><p:otherStyle><a:lvl1pPr><a:defRPr sz="1800"/></a:lvl1pPr></p:otherStyle></p:txStyles>"#,
            "</p:sldMaster>"
        ),
        decl = XML_DECL,
        a = NS_A,
        r = NS_R,
        p = NS_P,
        tree = GROUP_PROPERTIES_OPEN,
    )
}

fn slide_layout_xml() -> String {
    format!(
        concat!(
            "{decl}",
            r#"<p:sldLayout xmlns:a="{a}" xmlns:r="{r}" xmlns:p="{p}" type="blank" preserve="1">"#,
            r#"<p:cSld name="Blank">{tree}</p:spTree></p:cSld>"#,
            r#"<p:clrMapOvr><a:masterClrMapping/></p:clrMapOvr></p:sldLayout>"#
        ),
        decl = XML_DECL,
        a = NS_A,
        r = NS_R,
        p = NS_P,
        tree = GROUP_PROPERTIES_OPEN,
    )
}

fn core_props(deck: &Deck) -> String {
    let now = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
    let title = deck
        .slides()
        .first()
        .map(|s| escape_xml(&s.title))
        .unwrap_or_default();
    format!(
        concat!(
            "{decl}",
            r#"<cp:coreProperties xmlns:cp="http://schemas.openxmlformats.org/package/2006/metadata/core-properties" xmlns:dc="http://purl.org/dc/elements/1.1/" xmlns:dcterms="http://purl.org/dc/terms/" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance">"#,
            "<dc:title>{title}</dc:title><dc:creator>slide_agent</dc:creator>",
            r#"<dcterms:created xsi:type="dcterms:W3CDTF">{now}</dcterms:created>"#,
            r#"<dcterms:modified xsi:type="dcterms:W3CDTF">{now}</dcterms:modified>"#,
            "</cp:coreProperties>"
        ),
        decl = XML_DECL,
        title = title,
        now = now,
    )
}

fn app_props(deck: &Deck) -> String {
    format!(
        concat!(
            "{decl}",
            r#"<Properties xmlns="http://schemas.openxmlformats.org/officeDocument/2006/extended-properties">"#,
            "<Application>slide_agent</Application><Slides>{slides}</Slides>",
            "<PresentationFormat>Widescreen</PresentationFormat>",
            "</Properties>"
        ),
        decl = XML_DECL,
        slides = deck.slide_count(),
    )
}

const THEME_XML: &str = concat!(
    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
    r#"<a:theme xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" name="Slide Agent Dark">"#,
    r#"<a:themeElements>"#,
    r#"<a:clrScheme name="Slide Agent Dark">"#,
    r#"<a:dk1><a:srgbClr val="121212"/></a:dk1><a:lt1><a:srgbClr val="FFFFFF"/></a:lt1>"#,
    r#"<a:dk2><a:srgbClr val="1A1A1A"/></a:dk2><a:lt2><a:srgbClr val="D9D9D9"/></a:lt2>"#,
    r#"<a:accent1><a:srgbClr val="9FEF00"/></a:accent1><a:accent2><a:srgbClr val="00B4D8"/></a:accent2>"#,
    r#"<a:accent3><a:srgbClr val="F72585"/></a:accent3><a:accent4><a:srgbClr val="FFB703"/></a:accent4>"#,
    r#"<a:accent5><a:srgbClr val="7209B7"/></a:accent5><a:accent6><a:srgbClr val="4CC9F0"/></a:accent6>"#,
    r#"<a:hlink><a:srgbClr val="4CC9F0"/></a:hlink><a:folHlink><a:srgbClr val="B5179E"/></a:folHlink>"#,
    r#"</a:clrScheme>"#,
    r#"<a:fontScheme name="Office">"#,
    r#"<a:majorFont><a:latin typeface="Calibri Light"/><a:ea typeface=""/><a:cs typeface=""/></a:majorFont>"#,
    r#"<a:minorFont><a:latin typeface="Calibri"/><a:ea typeface=""/><a:cs typeface=""/></a:minorFont>"#,
    r#"</a:fontScheme>"#,
    r#"<a:fmtScheme name="Office">"#,
    r#"<a:fillStyleLst><a:solidFill><a:schemeClr val="phClr"/></a:solidFill><a:solidFill><a:schemeClr val="phClr"/></a:solidFill><a:solidFill><a:schemeClr val="phClr"/></a:solidFill></a:fillStyleLst>"#,
    r#"<a:lnStyleLst><a:ln w="6350"><a:solidFill><a:schemeClr val="phClr"/></a:solidFill></a:ln><a:ln w="12700"><a:solidFill><a:schemeClr val="phClr"/></a:solidFill></a:ln><a:ln w="19050"><a:solidFill><a:schemeClr val="phClr"/></a:solidFill></a:ln></a:lnStyleLst>"#,
    r#"<a:effectStyleLst><a:effectStyle><a:effectLst/></a:effectStyle><a:effectStyle><a:effectLst/></a:effectStyle><a:effectStyle><a:effectLst/></a:effectStyle></a:effectStyleLst>"#,
    r#"<a:bgFillStyleLst><a:solidFill><a:schemeClr val="phClr"/></a:solidFill><a:solidFill><a:schemeClr val="phClr"/></a:solidFill><a:solidFill><a:schemeClr val="phClr"/></a:solidFill></a:bgFillStyleLst>"#,
    r#"</a:fmtScheme>"#,
    r#"</a:themeElements>"#,
    r#"</a:theme>"#
);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pptx::{Image, ImageFormat, ShapeKind, TINY_PNG};
    use std::io::Read;

    fn sample_deck() -> Deck {
        let mut deck = Deck::new("output.pptx");
        deck.add_text_slide("Renewable Energy in 2024", "Solar\nWind");
        deck.add_picture_slide(
            "Offshore Wind",
            "Bigger turbines",
            Image::new(TINY_PNG.to_vec(), ImageFormat::Png),
        );
        deck.add_process_slide("Rollout", ">> Step 1: Plan\n>> Step 2: Build", ShapeKind::Pentagon);
        deck
    }

    fn read_entry(bytes: &[u8], name: &str) -> String {
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        let mut file = archive.by_name(name).unwrap();
        let mut out = String::new();
        file.read_to_string(&mut out).unwrap();
        out
    }

    #[test]
    fn package_contains_required_parts() {
        let bytes = write_package(&sample_deck()).unwrap();
        let archive = zip::ZipArchive::new(Cursor::new(bytes.as_slice())).unwrap();
        let names: Vec<&str> = archive.file_names().collect();
        for required in [
            "[Content_Types].xml",
            "_rels/.rels",
            "ppt/presentation.xml",
            "ppt/_rels/presentation.xml.rels",
            "ppt/slideMasters/slideMaster1.xml",
            "ppt/slideLayouts/slideLayout1.xml",
            "ppt/theme/theme1.xml",
            "ppt/slides/slide1.xml",
            "ppt/slides/slide3.xml",
            "ppt/slides/_rels/slide2.xml.rels",
            "ppt/media/image1.png",
        ] {
            assert!(names.contains(&required), "missing {}", required);
        }
    }

    #[test]
    fn presentation_lists_every_slide() {
        let bytes = write_package(&sample_deck()).unwrap();
        let xml = read_entry(&bytes, "ppt/presentation.xml");
        assert_eq!(xml.matches("<p:sldId ").count(), 3);
        assert!(xml.contains(r#"<p:sldId id="258" r:id="rId5"/>"#));

        let rels = read_entry(&bytes, "ppt/_rels/presentation.xml.rels");
        assert!(rels.contains(r#"Id="rId5""#));
        assert!(rels.contains(r#"Target="slides/slide3.xml""#));
    }

    #[test]
    fn content_types_declare_media_and_slides() {
        let bytes = write_package(&sample_deck()).unwrap();
        let xml = read_entry(&bytes, "[Content_Types].xml");
        assert!(xml.contains(r#"<Default Extension="png" ContentType="image/png"/>"#));
        assert_eq!(xml.matches(CT_SLIDE).count(), 3);
    }

    #[test]
    fn empty_deck_is_still_a_valid_package() {
        let bytes = write_package(&Deck::new("empty.pptx")).unwrap();
        let xml = read_entry(&bytes, "ppt/presentation.xml");
        assert!(!xml.contains("<p:sldIdLst>"));
        assert!(bytes.starts_with(b"PK"));
    }
}
