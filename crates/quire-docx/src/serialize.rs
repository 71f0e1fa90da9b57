//! Document model to XML trees
//!
//! The mirror of hydration: the body, header and footer parts and the style
//! part are built as [`XmlElement`] trees that the writer renders. Every
//! relationship a part needs (images, hyperlinks, header and footer
//! references) is resolved against that part's own relationship table while
//! its tree is built, adding entries that are missing.

use std::sync::Arc;

use crate::config::Config;
use crate::document::{Block, Document, PartFamily};
use crate::error::{DocxError, Result};
use crate::field::{Field, FieldContext, PROP_ANCHOR, PROP_RELATIONSHIP_ID, PROP_URL};
use crate::image::{AxisPosition, Image, ImagePosition, WrapType};
use crate::media::MediaManager;
use crate::package::{resolve_target, DEFAULT_DOCUMENT_PATH, STYLES_PATH};
use crate::paragraph::Paragraph;
use crate::relationships::{Relationships, TargetMode};
use crate::run::{BreakType, Run, RunFormat, UnderlineStyle};
use crate::section::{HeaderFooter, Orientation, Section, SectionBreakType};
use crate::styles::{Style, StyleType};
use crate::table::{Border, Cell, CellBlock, Row, Table, VMerge, DEFAULT_TABLE_WIDTH_TWIPS};
use crate::xml::{self, XmlElement};

pub(crate) const W_NS: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";
pub(crate) const R_NS: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
const WP_NS: &str = "http://schemas.openxmlformats.org/drawingml/2006/wordprocessingDrawing";
const A_NS: &str = "http://schemas.openxmlformats.org/drawingml/2006/main";
const PIC_NS: &str = "http://schemas.openxmlformats.org/drawingml/2006/picture";

/// `<name w:val="value"/>`
fn val(name: &str, value: impl Into<String>) -> XmlElement {
    XmlElement::new(name).with_attr("w:val", value)
}

/// Root element carrying the namespaces body content may use
fn part_root(name: &str) -> XmlElement {
    XmlElement::new(name)
        .with_attr("xmlns:w", W_NS)
        .with_attr("xmlns:r", R_NS)
        .with_attr("xmlns:wp", WP_NS)
        .with_attr("xmlns:a", A_NS)
        .with_attr("xmlns:pic", PIC_NS)
}

/// State shared by every part written in one save
pub(crate) struct SerializeContext {
    /// Last `docPr` id handed out, shared across parts
    next_drawing_id: u32,
    fields: FieldContext,
    default_font: String,
    default_size: u32,
}

impl SerializeContext {
    pub(crate) fn new(config: &Config, fields: FieldContext) -> Self {
        Self {
            next_drawing_id: 0,
            fields,
            default_font: config.defaults.font.clone(),
            default_size: config.defaults.font_size,
        }
    }

    /// Build `w:document`, resolving relationships into `rels`
    pub(crate) fn document(&mut self, doc: &Document, rels: &mut Relationships) -> XmlElement {
        let mut part = PartSerializer {
            ctx: self,
            rels,
            media: &doc.media,
            part_path: DEFAULT_DOCUMENT_PATH,
        };

        let mut body = XmlElement::new("w:body");
        for block in &doc.blocks {
            match block {
                Block::Paragraph(p) => body.push(part.paragraph(p, None)),
                Block::Table(t) => body.push(part.table(t)),
                Block::SectionBreak(br) => {
                    let sect = part.section_properties(&br.section, Some(br.break_type));
                    body.push(part.paragraph(&Paragraph::new(), Some(sect)));
                }
            }
        }
        body.push(part.section_properties(&doc.section, None));

        part_root("w:document").with_child(body)
    }

    /// Build `w:hdr` or `w:ftr`, resolving relationships into the part's own table
    pub(crate) fn header_footer(
        &mut self,
        family: PartFamily,
        content: &HeaderFooter,
        media: &MediaManager,
        rels: &mut Relationships,
    ) -> XmlElement {
        let mut part = PartSerializer {
            ctx: self,
            rels,
            media,
            part_path: content.target.as_str(),
        };
        let mut root = part_root(match family {
            PartFamily::Header => "w:hdr",
            PartFamily::Footer => "w:ftr",
        });
        for paragraph in &content.paragraphs {
            root.push(part.paragraph(paragraph, None));
        }
        if content.paragraphs.is_empty() {
            root.push(XmlElement::new("w:p"));
        }
        root
    }
}

/// Serializer bound to one part and its relationship table
struct PartSerializer<'c> {
    ctx: &'c mut SerializeContext,
    rels: &'c mut Relationships,
    media: &'c MediaManager,
    part_path: &'c str,
}

impl PartSerializer<'_> {
    /// Id of a relationship with this type and target, reusing `preferred` when it matches
    fn relationship(&mut self, rel_type: &str, preferred: Option<&str>, target: &str, mode: TargetMode) -> String {
        if let Some(rel) = preferred.and_then(|id| self.rels.get(id)) {
            if rel.rel_type == rel_type && rel.target == target {
                return rel.id.clone();
            }
        }
        if let Some(rel) = self.rels.find(rel_type, target) {
            return rel.id.clone();
        }
        self.rels.add(rel_type, target, mode)
    }

    fn paragraph(&mut self, paragraph: &Paragraph, sect: Option<XmlElement>) -> XmlElement {
        let mut p = XmlElement::new("w:p");
        if let Some(ppr) = paragraph_properties(paragraph, sect) {
            p.push(ppr);
        }
        if let Some(bookmark) = &paragraph.bookmark {
            p.push(
                XmlElement::new("w:bookmarkStart")
                    .with_attr("w:id", bookmark.id.to_string())
                    .with_attr("w:name", bookmark.name.as_str()),
            );
        }

        p.children.extend(self.field_runs(&paragraph.runs, &[]));

        if let Some(bookmark) = &paragraph.bookmark {
            p.push(XmlElement::new("w:bookmarkEnd").with_attr("w:id", bookmark.id.to_string()));
        }
        p
    }

    /// Emit runs, wrapping each stretch that carries a field not yet in `open`.
    ///
    /// Fields nested inside a hyperlink or a field result are emitted inside
    /// the outer one, so a TOC entry keeps both its link and its PAGEREF.
    fn field_runs(&mut self, runs: &[Run], open: &[Arc<Field>]) -> Vec<XmlElement> {
        let mut out = Vec::new();
        let mut i = 0;
        while i < runs.len() {
            let Some(key) = field_key(&runs[i], open).cloned() else {
                out.extend(self.content_runs(&runs[i], &runs[i].text));
                i += 1;
                continue;
            };
            let len = runs[i..]
                .iter()
                .take_while(|r| r.fields.iter().any(|f| Arc::ptr_eq(f, &key)))
                .count();
            let group = &runs[i..i + len];
            let mut nested = open.to_vec();
            nested.push(key.clone());
            match self.hyperlink_element(&key, group, &nested) {
                Some(link) => out.push(link),
                None => out.extend(self.complex_field(&key, group, &nested)),
            }
            i += len;
        }
        out
    }

    /// Runs for `run` with `text` in place of its own, split at line feeds
    fn content_runs(&mut self, run: &Run, text: &str) -> Vec<XmlElement> {
        let rpr = run_properties(&run.format, Some((self.ctx.default_font.as_str(), self.ctx.default_size)));
        let segments: Vec<&str> = text.split('\n').collect();
        let last = segments.len() - 1;

        let mut out = Vec::new();
        for (i, segment) in segments.iter().enumerate() {
            if i > 0 {
                out.push(run_element(&rpr, vec![XmlElement::new("w:br")]));
            }
            let mut children = text_elements(segment);
            if i == last {
                children.extend(run.breaks.iter().map(break_element));
                if let Some(drawing) = run.image.as_ref().and_then(|img| self.drawing(img)) {
                    children.push(drawing);
                }
            }
            if !children.is_empty() {
                out.push(run_element(&rpr, children));
            }
        }
        out
    }

    /// `w:hyperlink` for runs sharing an external hyperlink field
    fn hyperlink_element(&mut self, field: &Arc<Field>, group: &[Run], open: &[Arc<Field>]) -> Option<XmlElement> {
        if !field.is_hyperlink() {
            return None;
        }
        let rel_id = field.property(PROP_RELATIONSHIP_ID)?;
        let rel_id = match field.property(PROP_URL) {
            Some(url) => self.relationship(
                Relationships::TYPE_HYPERLINK,
                Some(&rel_id),
                &url,
                TargetMode::External,
            ),
            None if self.rels.get(&rel_id).is_some() => rel_id,
            None => {
                log::warn!("{}: hyperlink {} has no URL and no relationship", self.part_path, rel_id);
                return None;
            }
        };
        let mut link = XmlElement::new("w:hyperlink").with_attr("r:id", rel_id);
        if let Some(anchor) = field.property(PROP_ANCHOR) {
            link.push_attr("w:anchor", anchor);
        }
        link.push_attr("w:history", "1");

        let styled: Vec<Run> = group
            .iter()
            .map(|run| {
                let mut styled = run.clone();
                styled.format.style.get_or_insert_with(|| "Hyperlink".to_string());
                styled
            })
            .collect();
        link.children.extend(self.field_runs(&styled, open));
        Some(link)
    }

    /// begin, instruction, separate, result, end
    fn complex_field(&mut self, field: &Arc<Field>, group: &[Run], open: &[Arc<Field>]) -> Vec<XmlElement> {
        if !field.is_hyperlink() {
            field.refresh_preserving_dirty(&self.ctx.fields);
        }
        let first = &group[0];
        let rpr = run_properties(&first.format, Some((self.ctx.default_font.as_str(), self.ctx.default_size)));

        let mut begin = XmlElement::new("w:fldChar").with_attr("w:fldCharType", "begin");
        if field.is_dirty() {
            begin.push_attr("w:dirty", "true");
        }
        let mut out = vec![
            run_element(&rpr, vec![begin]),
            run_element(
                &rpr,
                vec![XmlElement::new("w:instrText")
                    .with_attr("xml:space", "preserve")
                    .with_text(format!(" {} ", field.code()))],
            ),
            run_element(
                &rpr,
                vec![XmlElement::new("w:fldChar").with_attr("w:fldCharType", "separate")],
            ),
        ];

        match group {
            [only] if field_key(only, open).is_none() => {
                let result = field.result();
                let text = if result.is_empty() { only.text.as_str() } else { result.as_str() };
                out.extend(self.content_runs(only, text));
            }
            _ => out.extend(self.field_runs(group, open)),
        }

        out.push(run_element(
            &rpr,
            vec![XmlElement::new("w:fldChar").with_attr("w:fldCharType", "end")],
        ));
        out
    }

    fn drawing(&mut self, image: &Image) -> Option<XmlElement> {
        if image.target.is_empty() {
            log::warn!("{}: image {} has no media target, skipped", self.part_path, image.id);
            return None;
        }
        if self.media.get(&resolve_target(self.part_path, &image.target)).is_none() {
            log::warn!("{}: media {} is not registered, image skipped", self.part_path, image.target);
            return None;
        }
        let rel_id = self.relationship(
            Relationships::TYPE_IMAGE,
            image.rel_id.as_deref(),
            &image.target,
            TargetMode::Internal,
        );
        self.ctx.next_drawing_id += 1;
        let drawing_id = self.ctx.next_drawing_id;

        let extent = XmlElement::new("wp:extent")
            .with_attr("cx", image.width_emu.to_string())
            .with_attr("cy", image.height_emu.to_string());
        let mut doc_pr = XmlElement::new("wp:docPr")
            .with_attr("id", drawing_id.to_string())
            .with_attr("name", image.name.as_str());
        if let Some(descr) = &image.description {
            doc_pr.push_attr("descr", descr.as_str());
        }
        let frame = XmlElement::new("wp:cNvGraphicFramePr").with_child(
            XmlElement::new("a:graphicFrameLocks")
                .with_attr("xmlns:a", A_NS)
                .with_attr("noChangeAspect", "1"),
        );
        let graphic = graphic_element(image, &rel_id);

        let container = match &image.position {
            ImagePosition::Inline => distances(XmlElement::new("wp:inline"))
                .with_child(extent)
                .with_child(XmlElement::new("wp:effectExtent").with_attr("l", "0").with_attr("t", "0").with_attr("r", "0").with_attr("b", "0"))
                .with_child(doc_pr)
                .with_child(frame)
                .with_child(graphic),
            ImagePosition::Floating(pos) => {
                let mut anchor = distances(XmlElement::new("wp:anchor"))
                    .with_attr("simplePos", "0")
                    .with_attr("relativeHeight", pos.z_order.to_string())
                    .with_attr("behindDoc", if pos.behind_text { "1" } else { "0" })
                    .with_attr("locked", "0")
                    .with_attr("layoutInCell", "1")
                    .with_attr("allowOverlap", "1")
                    .with_child(XmlElement::new("wp:simplePos").with_attr("x", "0").with_attr("y", "0"))
                    .with_child(axis_element("wp:positionH", &pos.horizontal))
                    .with_child(axis_element("wp:positionV", &pos.vertical))
                    .with_child(extent)
                    .with_child(XmlElement::new("wp:effectExtent").with_attr("l", "0").with_attr("t", "0").with_attr("r", "0").with_attr("b", "0"));
                anchor.push(wrap_element(pos.wrap));
                anchor.with_child(doc_pr).with_child(frame).with_child(graphic)
            }
        };
        Some(XmlElement::new("w:drawing").with_child(container))
    }

    fn table(&mut self, table: &Table) -> XmlElement {
        let mut tbl_pr = XmlElement::new("w:tblPr");
        if let Some(style) = &table.style {
            tbl_pr.push(val("w:tblStyle", style.as_str()));
        }
        tbl_pr.push(match table.width {
            Some(w) => XmlElement::new("w:tblW").with_attr("w:w", w.to_string()).with_attr("w:type", "dxa"),
            None => XmlElement::new("w:tblW").with_attr("w:w", "0").with_attr("w:type", "auto"),
        });

        let mut grid = XmlElement::new("w:tblGrid");
        let widths = if table.grid.is_empty() {
            let cols = table.column_count().max(1) as u32;
            vec![table.width.unwrap_or(DEFAULT_TABLE_WIDTH_TWIPS) / cols; cols as usize]
        } else {
            table.grid.clone()
        };
        for w in widths {
            grid.push(XmlElement::new("w:gridCol").with_attr("w:w", w.to_string()));
        }

        let mut tbl = XmlElement::new("w:tbl").with_child(tbl_pr).with_child(grid);
        for row in &table.rows {
            tbl.push(self.row(row));
        }
        tbl
    }

    fn row(&mut self, row: &Row) -> XmlElement {
        let mut tr = XmlElement::new("w:tr");
        if let Some(height) = row.height {
            tr.push(XmlElement::new("w:trPr").with_child(val("w:trHeight", height.to_string())));
        }
        for cell in row.cells.iter().filter(|c| c.h_merge_owner.is_none()) {
            tr.push(self.cell(cell));
        }
        tr
    }

    fn cell(&mut self, cell: &Cell) -> XmlElement {
        let mut tc_pr = XmlElement::new("w:tcPr");
        tc_pr.push(match cell.width {
            Some(w) => XmlElement::new("w:tcW").with_attr("w:w", w.to_string()).with_attr("w:type", "dxa"),
            None => XmlElement::new("w:tcW").with_attr("w:w", "0").with_attr("w:type", "auto"),
        });
        if cell.grid_span > 1 {
            tc_pr.push(val("w:gridSpan", cell.grid_span.to_string()));
        }
        match cell.v_merge {
            VMerge::Restart => tc_pr.push(val("w:vMerge", "restart")),
            VMerge::Continue => tc_pr.push(XmlElement::new("w:vMerge")),
            VMerge::None => {}
        }
        if !cell.borders.is_empty() {
            let mut borders = XmlElement::new("w:tcBorders");
            for (edge, border) in cell.borders.edges() {
                if let Some(border) = border {
                    borders.push(border_element(&format!("w:{}", edge), border));
                }
            }
            tc_pr.push(borders);
        }
        if let Some(shading) = &cell.shading {
            tc_pr.push(
                val("w:shd", shading.pattern.as_str())
                    .with_attr("w:color", shading.color.as_deref().unwrap_or("auto"))
                    .with_attr("w:fill", shading.fill.as_deref().unwrap_or("auto")),
            );
        }
        if let Some(align) = cell.v_align {
            tc_pr.push(val("w:vAlign", align.as_val()));
        }

        let mut tc = XmlElement::new("w:tc").with_child(tc_pr);
        let only_tables = !cell.blocks.is_empty()
            && cell.blocks.iter().all(|b| matches!(b, CellBlock::Table(_)));
        if cell.blocks.is_empty() || only_tables {
            tc.push(XmlElement::new("w:p"));
        }
        for block in &cell.blocks {
            match block {
                CellBlock::Paragraph(p) => tc.push(self.paragraph(p, None)),
                CellBlock::Table(t) => tc.push(self.table(t)),
            }
        }
        if only_tables {
            tc.push(XmlElement::new("w:p"));
        }
        tc
    }

    fn section_properties(&mut self, section: &Section, break_type: Option<SectionBreakType>) -> XmlElement {
        let mut sect = XmlElement::new("w:sectPr");
        for (family, map) in [(PartFamily::Header, &section.headers), (PartFamily::Footer, &section.footers)] {
            for (kind, part) in map {
                if part.target.is_empty() {
                    log::warn!("{} {} has no part name, reference skipped", family.prefix(), kind.as_val());
                    continue;
                }
                let target = document_relative(&part.target);
                let rel_id = self.relationship(family.rel_type(), part.rel_id.as_deref(), &target, TargetMode::Internal);
                sect.push(
                    XmlElement::new(format!("w:{}Reference", family.prefix()))
                        .with_attr("w:type", kind.as_val())
                        .with_attr("r:id", rel_id),
                );
            }
        }
        if let Some(break_type) = break_type {
            sect.push(val("w:type", break_type.as_val()));
        }

        let mut pg_sz = XmlElement::new("w:pgSz")
            .with_attr("w:w", section.page_size.width.to_string())
            .with_attr("w:h", section.page_size.height.to_string());
        if section.orientation == Orientation::Landscape {
            pg_sz.push_attr("w:orient", "landscape");
        }
        sect.push(pg_sz);

        let m = &section.margins;
        sect.push(
            XmlElement::new("w:pgMar")
                .with_attr("w:top", m.top.to_string())
                .with_attr("w:right", m.right.to_string())
                .with_attr("w:bottom", m.bottom.to_string())
                .with_attr("w:left", m.left.to_string())
                .with_attr("w:header", m.header.to_string())
                .with_attr("w:footer", m.footer.to_string())
                .with_attr("w:gutter", m.gutter.to_string()),
        );

        if section.columns > 1 || section.column_spacing.is_some() {
            let mut cols = XmlElement::new("w:cols");
            if let Some(space) = section.column_spacing {
                cols.push_attr("w:space", space.to_string());
            }
            if section.columns > 1 {
                cols.push_attr("w:num", section.columns.to_string());
            }
            sect.push(cols);
        }
        if section.has_title_page() {
            sect.push(XmlElement::new("w:titlePg"));
        }
        sect
    }
}

/// Target of a `word/` part relative to the main document
pub(crate) fn document_relative(path: &str) -> String {
    match path.get(..5) {
        Some(prefix) if prefix.eq_ignore_ascii_case("word/") => path[5..].to_string(),
        _ => format!("/{}", path.trim_start_matches('/')),
    }
}

/// The field a run is grouped by; hyperlinks win over other fields
/// The outermost field of `run` not already in `open`, hyperlinks first
fn field_key<'r>(run: &'r Run, open: &[Arc<Field>]) -> Option<&'r Arc<Field>> {
    let fresh = |f: &&Arc<Field>| !open.iter().any(|o| Arc::ptr_eq(o, f));
    run.fields
        .iter()
        .filter(fresh)
        .find(|f| f.is_hyperlink())
        .or_else(|| run.fields.iter().find(fresh))
}

fn paragraph_properties(paragraph: &Paragraph, sect: Option<XmlElement>) -> Option<XmlElement> {
    let mut ppr = XmlElement::new("w:pPr");
    if let Some(style) = &paragraph.style {
        ppr.push(val("w:pStyle", style.as_str()));
    }
    if let Some(num) = &paragraph.numbering {
        ppr.push(
            XmlElement::new("w:numPr")
                .with_child(val("w:ilvl", num.level.to_string()))
                .with_child(val("w:numId", num.num_id.to_string())),
        );
    }
    if let Some(spacing) = spacing_element(&paragraph.spacing) {
        ppr.push(spacing);
    }
    if let Some(ind) = indentation_element(&paragraph.indentation) {
        ppr.push(ind);
    }
    if let Some(alignment) = paragraph.alignment {
        ppr.push(val("w:jc", alignment.as_val()));
    }
    if let Some(sect) = sect {
        ppr.push(sect);
    }
    (!ppr.is_empty()).then_some(ppr)
}

fn spacing_element(spacing: &crate::paragraph::Spacing) -> Option<XmlElement> {
    if spacing.is_empty() {
        return None;
    }
    let mut el = XmlElement::new("w:spacing");
    for (key, value) in [("w:before", spacing.before), ("w:after", spacing.after), ("w:line", spacing.line)] {
        if let Some(v) = value {
            el.push_attr(key, v.to_string());
        }
    }
    if let Some(rule) = spacing.line_rule {
        el.push_attr("w:lineRule", rule.as_val());
    }
    Some(el)
}

fn indentation_element(ind: &crate::paragraph::Indentation) -> Option<XmlElement> {
    if ind.is_empty() {
        return None;
    }
    let mut el = XmlElement::new("w:ind");
    if let Some(left) = ind.left {
        el.push_attr("w:left", left.to_string());
    }
    if let Some(right) = ind.right {
        el.push_attr("w:right", right.to_string());
    }
    if let Some(first) = ind.first_line {
        el.push_attr("w:firstLine", first.to_string());
    }
    if let Some(hanging) = ind.hanging {
        el.push_attr("w:hanging", hanging.to_string());
    }
    Some(el)
}

/// `w:rPr`, omitting values equal to the document defaults when given
fn run_properties(format: &RunFormat, defaults: Option<(&str, u32)>) -> Option<XmlElement> {
    let mut rpr = XmlElement::new("w:rPr");
    if let Some(style) = &format.style {
        rpr.push(val("w:rStyle", style.as_str()));
    }

    let fonts = &format.fonts;
    let default_font = defaults.map(|(font, _)| font);
    let non_default = [&fonts.ascii, &fonts.h_ansi, &fonts.cs]
        .iter()
        .any(|f| f.as_deref().is_some_and(|name| Some(name) != default_font));
    if non_default {
        let mut el = XmlElement::new("w:rFonts");
        for (key, value) in [("w:ascii", &fonts.ascii), ("w:hAnsi", &fonts.h_ansi), ("w:cs", &fonts.cs)] {
            if let Some(name) = value {
                el.push_attr(key, name.as_str());
            }
        }
        rpr.push(el);
    }

    if format.bold {
        rpr.push(XmlElement::new("w:b"));
    }
    if format.italic {
        rpr.push(XmlElement::new("w:i"));
    }
    if format.strike {
        rpr.push(XmlElement::new("w:strike"));
    }
    if let Some(color) = format
        .color
        .as_deref()
        .filter(|c| !c.eq_ignore_ascii_case("000000") && !c.eq_ignore_ascii_case("auto"))
    {
        rpr.push(val("w:color", color));
    }
    if let Some(size) = format.size.filter(|&s| Some(s) != defaults.map(|(_, size)| size)) {
        rpr.push(val("w:sz", size.to_string()));
        rpr.push(val("w:szCs", size.to_string()));
    }
    if let Some(highlight) = format.highlight.as_deref().filter(|h| *h != "none") {
        rpr.push(val("w:highlight", highlight));
    }
    if format.underline != UnderlineStyle::None {
        rpr.push(val("w:u", format.underline.as_val()));
    }
    (!rpr.is_empty()).then_some(rpr)
}

fn run_element(rpr: &Option<XmlElement>, children: Vec<XmlElement>) -> XmlElement {
    let mut r = XmlElement::new("w:r");
    if let Some(rpr) = rpr {
        r.push(rpr.clone());
    }
    r.children.extend(children);
    r
}

/// `w:t` pieces separated by `w:tab`
fn text_elements(text: &str) -> Vec<XmlElement> {
    let mut out = Vec::new();
    for (i, piece) in text.split('\t').enumerate() {
        if i > 0 {
            out.push(XmlElement::new("w:tab"));
        }
        if !piece.is_empty() {
            out.push(
                XmlElement::new("w:t")
                    .with_attr("xml:space", "preserve")
                    .with_text(piece),
            );
        }
    }
    out
}

fn break_element(kind: &BreakType) -> XmlElement {
    let mut br = XmlElement::new("w:br");
    if let Some(value) = kind.as_val() {
        br.push_attr("w:type", value);
    }
    br
}

fn border_element(name: &str, border: &Border) -> XmlElement {
    let mut el = val(name, border.style.as_str());
    if let Some(size) = border.size {
        el.push_attr("w:sz", size.to_string());
    }
    el.push_attr("w:space", "0");
    el.push_attr("w:color", border.color.as_deref().unwrap_or("auto"));
    el
}

fn distances(el: XmlElement) -> XmlElement {
    el.with_attr("distT", "0")
        .with_attr("distB", "0")
        .with_attr("distL", "0")
        .with_attr("distR", "0")
}

fn axis_element(name: &str, axis: &AxisPosition) -> XmlElement {
    let el = XmlElement::new(name).with_attr("relativeFrom", axis.relative_from.as_str());
    match &axis.align {
        Some(align) => el.with_child(XmlElement::new("wp:align").with_text(align.as_str())),
        None => el.with_child(XmlElement::new("wp:posOffset").with_text(axis.offset.to_string())),
    }
}

fn wrap_element(wrap: WrapType) -> XmlElement {
    let el = XmlElement::new(format!("wp:{}", wrap.element_name()));
    match wrap {
        WrapType::Square => el.with_attr("wrapText", "bothSides"),
        // Tight and through wrapping require a polygon; use the image bounds
        WrapType::Tight | WrapType::Through => {
            let point = |name: &str, x: i64, y: i64| {
                XmlElement::new(name)
                    .with_attr("x", x.to_string())
                    .with_attr("y", y.to_string())
            };
            let polygon = XmlElement::new("wp:wrapPolygon")
                .with_attr("edited", "0")
                .with_child(point("wp:start", 0, 0))
                .with_child(point("wp:lineTo", 0, 21600))
                .with_child(point("wp:lineTo", 21600, 21600))
                .with_child(point("wp:lineTo", 21600, 0))
                .with_child(point("wp:lineTo", 0, 0));
            el.with_attr("wrapText", "bothSides").with_child(polygon)
        }
        WrapType::None | WrapType::TopAndBottom => el,
    }
}

fn graphic_element(image: &Image, rel_id: &str) -> XmlElement {
    let size = XmlElement::new("a:ext")
        .with_attr("cx", image.width_emu.to_string())
        .with_attr("cy", image.height_emu.to_string());
    let pic = XmlElement::new("pic:pic")
        .with_attr("xmlns:pic", PIC_NS)
        .with_child(
            XmlElement::new("pic:nvPicPr")
                .with_child(
                    XmlElement::new("pic:cNvPr")
                        .with_attr("id", "0")
                        .with_attr("name", image.filename()),
                )
                .with_child(XmlElement::new("pic:cNvPicPr")),
        )
        .with_child(
            XmlElement::new("pic:blipFill")
                .with_child(XmlElement::new("a:blip").with_attr("r:embed", rel_id))
                .with_child(XmlElement::new("a:stretch").with_child(XmlElement::new("a:fillRect"))),
        )
        .with_child(
            XmlElement::new("pic:spPr")
                .with_child(
                    XmlElement::new("a:xfrm")
                        .with_child(XmlElement::new("a:off").with_attr("x", "0").with_attr("y", "0"))
                        .with_child(size),
                )
                .with_child(
                    XmlElement::new("a:prstGeom")
                        .with_attr("prst", "rect")
                        .with_child(XmlElement::new("a:avLst")),
                ),
        );
    XmlElement::new("a:graphic").with_attr("xmlns:a", A_NS).with_child(
        XmlElement::new("a:graphicData")
            .with_attr("uri", PIC_NS)
            .with_child(pic),
    )
}

/// Bytes of `word/styles.xml`.
///
/// A loaded document keeps its original part; custom styles added since are
/// appended to it. Generated documents get the built-in catalog.
pub(crate) fn styles_part(doc: &Document) -> Result<Vec<u8>> {
    let custom = doc
        .custom_styles
        .iter()
        .filter_map(|id| doc.styles.get(id))
        .map(style_element);

    let root = match &doc.original_styles {
        Some(bytes) if doc.custom_styles.is_empty() => return Ok(bytes.clone()),
        Some(bytes) => {
            let mut root = xml::parse(bytes).map_err(DocxError::parse(STYLES_PATH))?;
            root.children.extend(custom);
            root
        }
        None => {
            let defaults = &doc.config.defaults;
            let fonts = XmlElement::new("w:rFonts")
                .with_attr("w:ascii", defaults.font.as_str())
                .with_attr("w:eastAsia", defaults.font.as_str())
                .with_attr("w:hAnsi", defaults.font.as_str())
                .with_attr("w:cs", defaults.font.as_str());
            let doc_defaults = XmlElement::new("w:docDefaults")
                .with_child(
                    XmlElement::new("w:rPrDefault").with_child(
                        XmlElement::new("w:rPr")
                            .with_child(fonts)
                            .with_child(val("w:sz", defaults.font_size.to_string()))
                            .with_child(val("w:szCs", defaults.font_size.to_string()))
                            .with_child(val("w:lang", "en-US")),
                    ),
                )
                .with_child(
                    XmlElement::new("w:pPrDefault").with_child(
                        XmlElement::new("w:pPr").with_child(
                            XmlElement::new("w:spacing")
                                .with_attr("w:after", "160")
                                .with_attr("w:line", "259")
                                .with_attr("w:lineRule", "auto"),
                        ),
                    ),
                );
            let mut root = XmlElement::new("w:styles")
                .with_attr("xmlns:w", W_NS)
                .with_child(doc_defaults);
            root.children.extend(doc.styles.all().map(style_element));
            root
        }
    };
    root.to_xml_bytes().map_err(DocxError::serialize(STYLES_PATH))
}

/// A `w:style` definition
pub(crate) fn style_element(style: &Style) -> XmlElement {
    let mut el = XmlElement::new("w:style").with_attr("w:type", style.style_type.as_val());
    if style.is_default {
        el.push_attr("w:default", "1");
    }
    el.push_attr("w:styleId", style.id.as_str());
    el.push(val("w:name", style.name.as_str()));
    if let Some(base) = &style.based_on {
        el.push(val("w:basedOn", base.as_str()));
    }
    if let Some(next) = &style.next {
        el.push(val("w:next", next.as_str()));
    }
    if let Some(priority) = style.ui_priority {
        el.push(val("w:uiPriority", priority.to_string()));
    }
    if style.style_type != StyleType::Table {
        el.push(XmlElement::new("w:qFormat"));
    }

    let mut ppr = XmlElement::new("w:pPr");
    if style.keep_next {
        ppr.push(XmlElement::new("w:keepNext"));
    }
    if let Some(spacing) = spacing_element(&style.spacing) {
        ppr.push(spacing);
    }
    if let Some(ind) = indentation_element(&style.indentation) {
        ppr.push(ind);
    }
    if let Some(level) = style.outline_level {
        ppr.push(val("w:outlineLvl", level.to_string()));
    }
    if !ppr.is_empty() {
        el.push(ppr);
    }
    if let Some(rpr) = run_properties(&style.run_format, None) {
        el.push(rpr);
    }
    if style.table_borders {
        let mut borders = XmlElement::new("w:tblBorders");
        for edge in ["top", "left", "bottom", "right", "insideH", "insideV"] {
            borders.push(border_element(&format!("w:{}", edge), &Border::single()));
        }
        el.push(XmlElement::new("w:tblPr").with_child(borders));
    }
    el
}
