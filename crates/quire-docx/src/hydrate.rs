//! Package to document model
//!
//! The main document body is walked in order. Paragraph-level `sectPr`
//! elements close the open section; the body-level `sectPr` describes the
//! last section. Complex fields (`fldChar` begin / separate / end) are
//! tracked by a small state machine shared by every run of a paragraph.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::document::{Block, Document, PartFamily, RetainedPart, SectionBreak};
use crate::error::{DocxError, Result};
use crate::field::{Field, FieldType, HyperlinkTarget, PROP_ANCHOR};
use crate::ids::IdKind;
use crate::image::{AxisPosition, FloatingPosition, Image, ImagePosition, WrapType};
use crate::package::{normalize_path, rels_path_for, resolve_target, Package, FONT_TABLE_PATH};
use crate::paragraph::{Alignment, Bookmark, Indentation, LineRule, NumberingRef, Paragraph, Spacing};
use crate::properties::CoreProperties;
use crate::relationships::{Relationship, Relationships};
use crate::run::{BreakType, FontTriple, Run, RunFormat, UnderlineStyle};
use crate::section::{HeaderFooter, HeaderFooterKind, Orientation, PageMargins, PageSize, Section, SectionBreakType};
use crate::styles::StyleSheet;
use crate::table::{
    Border, Cell, CellBorders, Row, Shading, Table, VMerge, VerticalAlign, MAX_GRID_COLUMNS,
};
use crate::xml::{self, XmlElement};

/// Build a document from a loaded package
pub(crate) fn hydrate(package: &Package) -> Result<Document> {
    let document_path = package.document_path().to_string();
    let bytes = package
        .document()
        .ok_or_else(|| DocxError::MissingPart(document_path.clone()))?;
    let root = xml::parse(bytes).map_err(DocxError::parse(document_path.as_str()))?;
    let body = root
        .child("body")
        .ok_or_else(|| DocxError::InvalidStructure(format!("{} has no body", document_path)))?;

    let mut doc = Document::new();
    if let Some(rels) = package.document_rels() {
        doc.relationships = Relationships::parse(rels, &rels_path_for(&document_path))?;
    }
    if let Some(styles) = package.styles() {
        doc.styles = StyleSheet::parse(styles)?;
        doc.original_styles = Some(styles.to_vec());
    }
    if let Some(core) = package.core_properties() {
        doc.properties = CoreProperties::parse(core)?;
    }
    doc.numbering = package.numbering().map(|part| RetainedPart {
        path: part.path.clone(),
        content_type: part.content_type.clone(),
        data: part.data.clone(),
    });
    for media in package.media() {
        doc.media
            .register_existing(&media.path, media.data.clone(), &media.content_type);
    }

    let mut hydrator = Hydrator::new(package, doc, document_path);
    hydrator.body(body)?;
    if let Some(sect) = body.child("sectPr") {
        hydrator.section_properties(sect)?;
    }
    let mut doc = hydrator.finish();

    log::debug!(
        "hydrated {} blocks in {} sections, {} media, {} retained parts",
        doc.blocks.len(),
        doc.sections().len(),
        doc.media.len(),
        doc.retained.len()
    );
    Ok(doc)
}

/// Complex field tracking across the runs of one paragraph
#[derive(Debug, Default)]
struct FieldMachine {
    active: bool,
    dirty: bool,
    instruction: String,
    /// Built at `separate`, waiting for the run that carries its result
    pending: Option<(Arc<Field>, bool)>,
}

impl FieldMachine {
    fn reset(&mut self) {
        if self.active && self.pending.is_none() {
            log::trace!("dropping unterminated field '{}'", self.instruction.trim());
        }
        *self = Self::default();
    }

    fn begin(&mut self, dirty: bool) {
        self.reset();
        self.active = true;
        self.dirty = dirty;
        log::trace!("field begin");
    }

    fn instruction(&mut self, text: &str) {
        if self.active && self.pending.is_none() {
            self.instruction.push_str(text);
        }
    }

    fn separate(&mut self) {
        if !self.active || self.pending.is_some() {
            return;
        }
        let code = std::mem::take(&mut self.instruction);
        let field = Field::new(code);
        if field.field_type() == FieldType::Custom {
            log::warn!("unrecognized field instruction '{}', kept as custom", field.code());
        }
        log::trace!("field separate: {:?}", field.field_type());
        self.pending = Some((Arc::new(field), self.dirty));
    }

    /// The field a run must carry, if one is waiting
    fn take_pending(&mut self) -> Option<(Arc<Field>, bool)> {
        self.pending.take()
    }

    fn end(&mut self) -> Option<(Arc<Field>, bool)> {
        let pending = self.pending.take();
        *self = Self::default();
        log::trace!("field end");
        pending
    }
}

struct Hydrator<'a> {
    package: &'a Package,
    doc: Document,
    /// Part whose content is being walked
    part_path: String,
    /// Relationships of that part; `None` means the main document's
    part_rels: Option<Relationships>,
    section_index: usize,
    hydrated_headers: HashMap<usize, HashSet<HeaderFooterKind>>,
    hydrated_footers: HashMap<usize, HashSet<HeaderFooterKind>>,
    /// Normalized paths of header and footer parts already read
    hydrated_parts: HashSet<String>,
    /// Header/footer nesting depth; `sectPr` is ignored while non-zero
    suppress_sections: u32,
    fields: FieldMachine,
}

impl<'a> Hydrator<'a> {
    fn new(package: &'a Package, doc: Document, document_path: String) -> Self {
        Self {
            package,
            doc,
            part_path: document_path,
            part_rels: None,
            section_index: 0,
            hydrated_headers: HashMap::new(),
            hydrated_footers: HashMap::new(),
            hydrated_parts: HashSet::new(),
            suppress_sections: 0,
            fields: FieldMachine::default(),
        }
    }

    fn relationship(&self, id: &str) -> Option<&Relationship> {
        match &self.part_rels {
            Some(rels) => rels.get(id),
            None => self.doc.relationships.get(id),
        }
    }

    /// Collect the parts hydration did not consume and hand back the document
    fn finish(mut self) -> Document {
        let package = self.package;
        let mut retained = Vec::new();
        let mut keep = |part: &crate::package::PackagePart| {
            retained.push(RetainedPart {
                path: part.path.clone(),
                content_type: part.content_type.clone(),
                data: part.data.clone(),
            })
        };

        for part in [package.settings(), package.web_settings(), package.custom_properties()]
            .into_iter()
            .flatten()
        {
            keep(part);
        }
        if let Some(part) = package.get(FONT_TABLE_PATH) {
            keep(part);
        }
        package.themes().for_each(&mut keep);
        for part in package.headers().chain(package.footers()) {
            if self.hydrated_parts.contains(&part.normalized) {
                continue;
            }
            log::debug!("{} is not referenced by any section, keeping it verbatim", part.path);
            keep(part);
            if let Some(rels) = package.get(&rels_path_for(&part.path)) {
                keep(rels);
            }
        }
        package.additional().for_each(&mut keep);

        self.doc.retained = retained;
        self.doc
    }

    fn body(&mut self, parent: &XmlElement) -> Result<()> {
        for child in &parent.children {
            match child.local_name() {
                "p" => {
                    let paragraph = self.paragraph(child);
                    let sect = child
                        .child("pPr")
                        .and_then(|ppr| ppr.child("sectPr"))
                        .filter(|_| self.suppress_sections == 0);
                    match sect {
                        Some(sect) => {
                            if !paragraph.runs.is_empty() {
                                self.doc.blocks.push(Block::Paragraph(paragraph));
                            }
                            self.close_section(sect)?;
                        }
                        None => self.doc.blocks.push(Block::Paragraph(paragraph)),
                    }
                }
                "tbl" => {
                    let table = self.table(child)?;
                    self.doc.blocks.push(Block::Table(table));
                }
                "sdt" => {
                    if let Some(content) = child.child("sdtContent") {
                        self.body(content)?;
                    }
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Apply a paragraph-level `sectPr` to the open section and start a new one
    fn close_section(&mut self, sect: &XmlElement) -> Result<()> {
        self.section_properties(sect)?;
        let break_type = sect
            .child_val("type")
            .and_then(SectionBreakType::from_val)
            .unwrap_or_default();
        let closed = std::mem::take(&mut self.doc.section);
        self.doc.blocks.push(Block::SectionBreak(SectionBreak {
            section: closed,
            break_type,
        }));
        self.section_index += 1;
        log::debug!("closed section {} ({})", self.section_index, break_type.as_val());
        Ok(())
    }

    fn section_properties(&mut self, sect: &XmlElement) -> Result<()> {
        let section = &mut self.doc.section;
        if let Some(size) = sect.child("pgSz") {
            let width = size.attr_parse("w").unwrap_or(section.page_size.width);
            let height = size.attr_parse("h").unwrap_or(section.page_size.height);
            section.page_size = PageSize { width, height };
            section.orientation = match size.attr("orient") {
                Some("landscape") => Orientation::Landscape,
                Some("portrait") => Orientation::Portrait,
                _ if width > height => Orientation::Landscape,
                _ => Orientation::Portrait,
            };
        }
        if let Some(mar) = sect.child("pgMar") {
            let d = PageMargins::default();
            section.margins = PageMargins {
                top: mar.attr_parse("top").unwrap_or(d.top),
                right: mar.attr_parse("right").unwrap_or(d.right),
                bottom: mar.attr_parse("bottom").unwrap_or(d.bottom),
                left: mar.attr_parse("left").unwrap_or(d.left),
                header: mar.attr_parse("header").unwrap_or(d.header),
                footer: mar.attr_parse("footer").unwrap_or(d.footer),
                gutter: mar.attr_parse("gutter").unwrap_or(d.gutter),
            };
        }
        if let Some(cols) = sect.child("cols") {
            section.columns = cols.attr_parse("num").filter(|&n| n > 0).unwrap_or(1);
            section.column_spacing = cols.attr_parse("space");
        }

        for (family, element) in [(PartFamily::Header, "headerReference"), (PartFamily::Footer, "footerReference")] {
            for reference in sect.children_named(element) {
                let kind = reference
                    .attr("type")
                    .and_then(HeaderFooterKind::from_val)
                    .unwrap_or(HeaderFooterKind::Default);
                let Some(rel_id) = reference.attr("r:id") else {
                    log::warn!("{} without a relationship id", element);
                    continue;
                };
                self.header_footer(family, kind, rel_id)?;
            }
        }
        Ok(())
    }

    /// Hydrate a header or footer once per (section, kind)
    fn header_footer(&mut self, family: PartFamily, kind: HeaderFooterKind, rel_id: &str) -> Result<()> {
        let markers = match family {
            PartFamily::Header => &mut self.hydrated_headers,
            PartFamily::Footer => &mut self.hydrated_footers,
        };
        if !markers.entry(self.section_index).or_default().insert(kind) {
            return Ok(());
        }

        let Some(rel) = self.doc.relationships.get(rel_id) else {
            log::warn!("{} {} references unknown relationship {}", family.prefix(), kind.as_val(), rel_id);
            return Ok(());
        };
        let path = resolve_target(&self.part_path, &rel.target);
        let package = self.package;
        let Some(part) = package.get(&path) else {
            log::warn!("{} part {} is missing", family.prefix(), path);
            return Ok(());
        };
        let root = xml::parse(&part.data).map_err(DocxError::parse(part.path.as_str()))?;
        let relationships = match package.part_rels(&part.path) {
            Some(bytes) => Relationships::parse(bytes, &rels_path_for(&part.path))?,
            None => Relationships::new(),
        };

        let saved_path = std::mem::replace(&mut self.part_path, part.path.clone());
        let saved_rels = self.part_rels.replace(relationships);
        let saved_blocks = std::mem::take(&mut self.doc.blocks);
        self.suppress_sections += 1;
        self.body(&root)?;
        self.suppress_sections -= 1;
        let blocks = std::mem::replace(&mut self.doc.blocks, saved_blocks);

        // Table layout is not kept in headers; the text is
        let mut paragraphs = Vec::new();
        for block in blocks {
            match block {
                Block::Paragraph(p) => paragraphs.push(p),
                Block::Table(table) => {
                    for cell in table.rows.iter().flat_map(|r| r.cells.iter()) {
                        paragraphs.extend(cell.paragraphs().cloned());
                    }
                }
                Block::SectionBreak(_) => {}
            }
        }

        let relationships = std::mem::replace(&mut self.part_rels, saved_rels).unwrap_or_default();
        self.part_path = saved_path;
        self.hydrated_parts.insert(part.normalized.clone());

        let hydrated = HeaderFooter {
            paragraphs,
            rel_id: Some(rel_id.to_string()),
            target: part.path.clone(),
            relationships,
        };
        log::debug!("hydrated {} {} from {}", family.prefix(), kind.as_val(), part.path);
        let map = match family {
            PartFamily::Header => &mut self.doc.section.headers,
            PartFamily::Footer => &mut self.doc.section.footers,
        };
        map.insert(kind, hydrated);
        Ok(())
    }

    fn paragraph(&mut self, p: &XmlElement) -> Paragraph {
        let mut paragraph = Paragraph::new();
        if let Some(ppr) = p.child("pPr") {
            paragraph_properties(ppr, &mut paragraph);
        }

        self.fields.reset();
        self.paragraph_content(p, &mut paragraph);
        self.fields.reset();

        let heading = paragraph
            .style
            .as_deref()
            .map(|s| self.doc.is_heading_style(s))
            .unwrap_or(false);
        if heading {
            if let Some(start) = p
                .children_named("bookmarkStart")
                .find(|b| b.attr("name").is_some_and(|n| n != "_GoBack"))
            {
                let id = start.attr_parse("id").unwrap_or(0);
                self.doc.ids.observe(IdKind::Bookmark, id);
                paragraph.bookmark = Some(Bookmark {
                    id,
                    name: start.attr("name").unwrap_or_default().to_string(),
                });
            }
        }
        paragraph
    }

    fn paragraph_content(&mut self, parent: &XmlElement, paragraph: &mut Paragraph) {
        for child in &parent.children {
            match child.local_name() {
                "r" => {
                    if let Some(run) = self.run(child) {
                        paragraph.runs.push(run);
                    }
                }
                "hyperlink" => self.hyperlink(child, paragraph),
                "fldSimple" => self.simple_field(child, paragraph),
                "ins" | "smartTag" | "customXml" => self.paragraph_content(child, paragraph),
                _ => {}
            }
        }
    }

    fn run(&mut self, r: &XmlElement) -> Option<Run> {
        let mut carried = self.fields.take_pending();
        let mut run = Run::default();
        if let Some(rpr) = r.child("rPr") {
            run.format = run_format(rpr);
        }

        for child in &r.children {
            match child.local_name() {
                "t" => run.text.push_str(&child.text),
                "tab" => run.text.push('\t'),
                "br" => run.breaks.push(BreakType::from_val(child.attr("type"))),
                "cr" => run.breaks.push(BreakType::Line),
                "fldChar" => match child.attr("fldCharType") {
                    Some("begin") => self.fields.begin(child.attr_bool("dirty").unwrap_or(false)),
                    Some("separate") => self.fields.separate(),
                    Some("end") => {
                        if let Some(pending) = self.fields.end() {
                            carried.get_or_insert(pending);
                        }
                    }
                    _ => {}
                },
                "instrText" => self.fields.instruction(&child.text),
                "drawing" => run.image = self.drawing(child),
                "AlternateContent" => {
                    if let Some(drawing) = child.descendant("drawing") {
                        run.image = self.drawing(drawing);
                    }
                }
                _ => {}
            }
        }

        if let Some((field, dirty)) = carried {
            field.set_cached_result(run.text.clone());
            field.set_dirty(dirty);
            run.fields.push(field);
        }
        (!run.is_empty()).then_some(run)
    }

    fn hyperlink(&mut self, element: &XmlElement, paragraph: &mut Paragraph) {
        let mut inner = Paragraph::new();
        self.paragraph_content(element, &mut inner);
        let display = inner.text();

        let anchor = element.attr("w:anchor").map(str::to_string);
        let target = match element.attr("r:id") {
            Some(id) => match self.relationship(id) {
                Some(rel) => Some(HyperlinkTarget::External {
                    url: rel.target.clone(),
                    relationship_id: Some(id.to_string()),
                }),
                None => {
                    log::warn!("hyperlink references unknown relationship {}", id);
                    None
                }
            },
            None => anchor.clone().map(HyperlinkTarget::Anchor),
        };

        if let Some(target) = target {
            let is_external = matches!(target, HyperlinkTarget::External { .. });
            let field = Field::hyperlink(target, display);
            if let (true, Some(anchor)) = (is_external, anchor) {
                field.set_property(PROP_ANCHOR, anchor);
            }
            field.set_dirty(false);
            let field = Arc::new(field);
            if inner.runs.is_empty() {
                inner.runs.push(Run::default());
            }
            for run in &mut inner.runs {
                run.fields.push(field.clone());
            }
        }
        paragraph.runs.append(&mut inner.runs);
    }

    fn simple_field(&mut self, element: &XmlElement, paragraph: &mut Paragraph) {
        let mut inner = Paragraph::new();
        self.paragraph_content(element, &mut inner);

        let field = Field::new(element.attr("instr").unwrap_or_default());
        field.set_cached_result(inner.text());
        field.set_dirty(element.attr_bool("dirty").unwrap_or(false));
        let field = Arc::new(field);
        if inner.runs.is_empty() {
            inner.runs.push(Run::default());
        }
        for run in &mut inner.runs {
            run.fields.push(field.clone());
        }
        paragraph.runs.append(&mut inner.runs);
    }

    fn drawing(&mut self, drawing: &XmlElement) -> Option<Image> {
        let container = drawing
            .children
            .iter()
            .find(|c| c.is("inline") || c.is("anchor"))?;
        let rel_id = container.descendant("blip")?.attr("r:embed")?;
        let Some(rel) = self.relationship(rel_id) else {
            log::warn!("{}: drawing references unknown relationship {}", self.part_path, rel_id);
            return None;
        };
        let target = rel.target.clone();
        let path = resolve_target(&self.part_path, &target);
        let Some(media) = self.doc.media.get(&path) else {
            log::warn!("{}: media part {} is missing", self.part_path, normalize_path(&path));
            return None;
        };

        let doc_pr = container.child("docPr");
        let id = match doc_pr.and_then(|d| d.attr_parse::<u32>("id")) {
            Some(id) => {
                self.doc.ids.observe(IdKind::Image, id);
                id
            }
            // docPr ids are renumbered on save, so an exhausted sequence only loses the hint
            None => self.doc.ids.next(IdKind::Image).unwrap_or_else(|err| {
                log::warn!("{}: {}", self.part_path, err);
                0
            }),
        };
        let mut image = Image::new(id, media.data.clone(), media.content_type.as_str());
        if let Some(name) = doc_pr.and_then(|d| d.attr("name")) {
            image.name = name.to_string();
        }
        image.description = doc_pr.and_then(|d| d.attr("descr")).map(str::to_string);
        image.rel_id = Some(rel_id.to_string());
        image.target = target;

        if let Some(extent) = container.child("extent").or_else(|| container.descendant("ext")) {
            image.width_emu = extent.attr_parse("cx").unwrap_or(0);
            image.height_emu = extent.attr_parse("cy").unwrap_or(0);
        }

        if container.is("anchor") {
            let defaults = FloatingPosition::default();
            let wrap = container
                .children
                .iter()
                .find_map(|c| WrapType::from_element_name(c.local_name()))
                .unwrap_or(defaults.wrap);
            image.position = ImagePosition::Floating(FloatingPosition {
                horizontal: container
                    .child("positionH")
                    .map(axis_position)
                    .unwrap_or(defaults.horizontal),
                vertical: container
                    .child("positionV")
                    .map(axis_position)
                    .unwrap_or(defaults.vertical),
                wrap,
                z_order: container.attr_parse("relativeHeight").unwrap_or(0),
                behind_text: container.attr_bool("behindDoc").unwrap_or(false),
            });
        }
        Some(image)
    }

    fn table(&mut self, tbl: &XmlElement) -> Result<Table> {
        let mut table = Table::default();
        if let Some(tbl_pr) = tbl.child("tblPr") {
            table.style = tbl_pr.child_val("tblStyle").map(str::to_string);
            table.width = tbl_pr
                .child("tblW")
                .filter(|w| matches!(w.attr("type"), None | Some("dxa")))
                .and_then(|w| w.attr_parse("w"))
                .filter(|&w: &u32| w > 0);
        }
        if let Some(grid) = tbl.child("tblGrid") {
            table.grid = grid
                .children_named("gridCol")
                .map(|col| col.attr_parse("w").unwrap_or(0))
                .collect();
        }

        let columns = match table.grid.len() {
            0 => MAX_GRID_COLUMNS,
            n => n,
        };

        for tr in tbl.children_named("tr") {
            let mut row = Row {
                height: tr
                    .child("trPr")
                    .and_then(|pr| pr.child("trHeight"))
                    .and_then(|h| h.attr_parse("val")),
                cells: Vec::new(),
            };
            for tc in tr.children_named("tc") {
                let mut cell = self.cell(tc)?;
                let anchor = row.cells.len();
                let remaining = columns.saturating_sub(anchor).max(1);
                if cell.grid_span as usize > remaining {
                    log::warn!(
                        "{}: gridSpan {} at column {} exceeds the {} grid columns, clamped to {}",
                        self.part_path,
                        cell.grid_span,
                        anchor,
                        columns,
                        remaining
                    );
                    cell.grid_span = remaining as u32;
                }
                let span = cell.grid_span;
                row.cells.push(cell);
                for _ in 1..span {
                    row.cells.push(Cell {
                        h_merge_owner: Some(anchor),
                        ..Cell::new()
                    });
                }
            }
            table.rows.push(row);
        }
        Ok(table)
    }

    fn cell(&mut self, tc: &XmlElement) -> Result<Cell> {
        let mut cell = Cell::new();
        if let Some(pr) = tc.child("tcPr") {
            cell.width = pr
                .child("tcW")
                .and_then(|w| w.attr_parse("w"))
                .filter(|&w: &u32| w > 0);
            cell.grid_span = pr
                .child_val("gridSpan")
                .and_then(|v| v.parse().ok())
                .filter(|&s| s > 0)
                .unwrap_or(1);
            cell.v_merge = match pr.child("vMerge") {
                Some(v) if v.attr("val") == Some("restart") => VMerge::Restart,
                Some(_) => VMerge::Continue,
                None => VMerge::None,
            };
            cell.v_align = pr.child_val("vAlign").and_then(VerticalAlign::from_val);
            cell.shading = pr.child("shd").map(|shd| Shading {
                pattern: shd.attr("val").unwrap_or("clear").to_string(),
                color: shd.attr("color").map(str::to_string),
                fill: shd.attr("fill").map(str::to_string),
            });
            if let Some(borders) = pr.child("tcBorders") {
                let edge = |names: &[&str]| {
                    names.iter().find_map(|n| borders.child(n)).map(|b| Border {
                        style: b.attr("val").unwrap_or("single").to_string(),
                        size: b.attr_parse("sz"),
                        color: b.attr("color").map(str::to_string),
                    })
                };
                cell.borders = CellBorders {
                    top: edge(&["top"]),
                    left: edge(&["left", "start"]),
                    bottom: edge(&["bottom"]),
                    right: edge(&["right", "end"]),
                };
            }
        }

        for child in &tc.children {
            match child.local_name() {
                "p" => cell.add_paragraph(self.paragraph(child)),
                "tbl" => cell.add_table(self.table(child)?),
                _ => {}
            }
        }
        Ok(cell)
    }
}

fn paragraph_properties(ppr: &XmlElement, paragraph: &mut Paragraph) {
    paragraph.style = ppr.child_val("pStyle").map(str::to_string);

    if let Some(spacing) = ppr.child("spacing") {
        paragraph.spacing = Spacing {
            before: spacing.attr_parse("before"),
            after: spacing.attr_parse("after"),
            line: spacing.attr_parse("line"),
            line_rule: spacing.attr("lineRule").and_then(LineRule::from_val),
        };
    }

    if let Some(jc) = ppr.child_val("jc") {
        match jc.parse::<Alignment>() {
            Ok(alignment) => paragraph.alignment = Some(alignment),
            Err(e) => log::debug!("ignoring alignment: {}", e),
        }
    }

    if let Some(ind) = ppr.child("ind") {
        paragraph.indentation = Indentation {
            left: ind.attr_parse("left").or_else(|| ind.attr_parse("start")),
            right: ind.attr_parse("right").or_else(|| ind.attr_parse("end")),
            first_line: ind.attr_parse("firstLine"),
            hanging: ind.attr_parse("hanging"),
        };
    }

    paragraph.numbering = ppr.child("numPr").and_then(|num| {
        let num_id = num.child_val("numId")?.parse().ok()?;
        let level = num.child_val("ilvl").and_then(|l| l.parse().ok()).unwrap_or(0);
        Some(NumberingRef { num_id, level })
    });
}

/// Toggle properties are on when present unless `val` says otherwise
fn toggle(rpr: &XmlElement, name: &str) -> bool {
    rpr.child(name)
        .map(|e| !matches!(e.attr("val"), Some("0" | "false" | "off")))
        .unwrap_or(false)
}

fn run_format(rpr: &XmlElement) -> RunFormat {
    let fonts = rpr
        .child("rFonts")
        .map(|f| FontTriple {
            ascii: f.attr("ascii").map(str::to_string),
            h_ansi: f.attr("hAnsi").map(str::to_string),
            cs: f.attr("cs").map(str::to_string),
        })
        .unwrap_or_default();
    RunFormat {
        bold: toggle(rpr, "b"),
        italic: toggle(rpr, "i"),
        strike: toggle(rpr, "strike"),
        underline: rpr
            .child_val("u")
            .map(UnderlineStyle::from_val)
            .unwrap_or_default(),
        color: rpr.child_val("color").map(str::to_string),
        size: rpr.child_val("sz").and_then(|s| s.parse().ok()),
        fonts,
        highlight: rpr.child_val("highlight").map(str::to_string),
        style: rpr.child_val("rStyle").map(str::to_string),
    }
}

fn axis_position(element: &XmlElement) -> AxisPosition {
    let relative_from = element.attr("relativeFrom").unwrap_or("column");
    match element.child("align") {
        Some(align) => AxisPosition::aligned(relative_from, align.text.trim()),
        None => AxisPosition::offset(
            relative_from,
            element
                .child("posOffset")
                .and_then(|o| o.text.trim().parse().ok())
                .unwrap_or(0),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::tests::png_bytes;
    use crate::test_utils::{docx, docx_with, header_xml, rels_xml};

    fn load(bytes: &[u8]) -> Document {
        hydrate(&Package::from_bytes(bytes).unwrap()).unwrap()
    }

    fn first_paragraph(doc: &Document) -> &Paragraph {
        doc.paragraphs().next().unwrap()
    }

    #[test]
    fn test_paragraph_properties_and_runs() {
        let doc = load(&docx(
            r#"<w:p>
                <w:pPr>
                  <w:pStyle w:val="Quote"/>
                  <w:spacing w:before="120" w:after="240" w:line="360" w:lineRule="auto"/>
                  <w:jc w:val="center"/>
                  <w:ind w:left="720" w:hanging="360"/>
                  <w:numPr><w:ilvl w:val="1"/><w:numId w:val="4"/></w:numPr>
                </w:pPr>
                <w:r><w:rPr><w:b/><w:i w:val="0"/><w:u w:val="double"/><w:color w:val="FF0000"/><w:sz w:val="28"/></w:rPr><w:t>Hello</w:t></w:r>
                <w:r><w:rPr><w:rFonts w:ascii="Arial" w:hAnsi="Arial" w:cs="Mangal"/><w:strike w:val="true"/></w:rPr><w:t xml:space="preserve"> world</w:t><w:tab/><w:br w:type="page"/></w:r>
                <w:r><w:rPr><w:b/></w:rPr></w:r>
              </w:p>"#,
        ));
        let p = first_paragraph(&doc);
        assert_eq!(p.style.as_deref(), Some("Quote"));
        assert_eq!(p.alignment, Some(Alignment::Center));
        assert_eq!(p.spacing.before, Some(120));
        assert_eq!(p.spacing.line_rule, Some(LineRule::Auto));
        assert_eq!(p.indentation.left, Some(720));
        assert_eq!(p.indentation.hanging, Some(360));
        assert_eq!(p.numbering, Some(NumberingRef { num_id: 4, level: 1 }));

        assert_eq!(p.runs.len(), 2);
        let first = &p.runs[0];
        assert!(first.bold());
        assert!(!first.italic());
        assert_eq!(first.format.underline, UnderlineStyle::Double);
        assert_eq!(first.format.color.as_deref(), Some("FF0000"));
        assert_eq!(first.format.size, Some(28));

        let second = &p.runs[1];
        assert_eq!(second.text(), " world\t");
        assert!(second.strike());
        assert_eq!(second.format.fonts.cs.as_deref(), Some("Mangal"));
        assert_eq!(second.breaks, vec![BreakType::Page]);
    }

    #[test]
    fn test_numbering_without_num_id_is_cleared() {
        let doc = load(&docx(
            r#"<w:p><w:pPr><w:numPr><w:ilvl w:val="0"/></w:numPr></w:pPr><w:r><w:t>x</w:t></w:r></w:p>"#,
        ));
        assert_eq!(first_paragraph(&doc).numbering, None);
    }

    #[test]
    fn test_bookmark_kept_only_on_headings() {
        let doc = load(&docx(
            r#"<w:p><w:pPr><w:pStyle w:val="Heading1"/></w:pPr><w:bookmarkStart w:id="7" w:name="_Toc123"/><w:r><w:t>Intro</w:t></w:r><w:bookmarkEnd w:id="7"/></w:p>
               <w:p><w:bookmarkStart w:id="8" w:name="plain"/><w:r><w:t>Body</w:t></w:r></w:p>"#,
        ));
        let mut paragraphs = doc.paragraphs();
        let heading = paragraphs.next().unwrap();
        assert_eq!(heading.bookmark, Some(Bookmark { id: 7, name: "_Toc123".to_string() }));
        assert_eq!(paragraphs.next().unwrap().bookmark, None);
    }

    #[test]
    fn test_complex_field_without_result() {
        let doc = load(&docx(
            r#"<w:p>
                <w:r><w:fldChar w:fldCharType="begin"/></w:r>
                <w:r><w:instrText xml:space="preserve"> PAGE </w:instrText></w:r>
                <w:r><w:fldChar w:fldCharType="separate"/></w:r>
                <w:r><w:fldChar w:fldCharType="end"/></w:r>
              </w:p>"#,
        ));
        let fields = first_paragraph(&doc).fields();
        assert_eq!(fields.len(), 1);
        assert_eq!(fields[0].field_type(), FieldType::PageNumber);
        assert_eq!(fields[0].result(), "");
        assert!(!fields[0].is_dirty());
    }

    #[test]
    fn test_complex_field_with_result() {
        let doc = load(&docx(
            r#"<w:p>
                <w:r><w:t xml:space="preserve">Page </w:t></w:r>
                <w:r><w:fldChar w:fldCharType="begin" w:dirty="true"/></w:r>
                <w:r><w:instrText>NUMPAGES</w:instrText></w:r>
                <w:r><w:fldChar w:fldCharType="separate"/></w:r>
                <w:r><w:t>12</w:t></w:r>
                <w:r><w:fldChar w:fldCharType="end"/></w:r>
              </w:p>"#,
        ));
        let p = first_paragraph(&doc);
        assert_eq!(p.text(), "Page 12");
        let field = &p.runs[1].fields[0];
        assert_eq!(field.field_type(), FieldType::PageCount);
        assert_eq!(field.result(), "12");
        assert_eq!(field.property("display").as_deref(), Some("12"));
        assert!(field.is_dirty());
    }

    #[test]
    fn test_begin_without_end_resets() {
        let doc = load(&docx(
            r#"<w:p>
                <w:r><w:fldChar w:fldCharType="begin"/></w:r>
                <w:r><w:instrText>DATE</w:instrText></w:r>
                <w:r><w:fldChar w:fldCharType="begin"/></w:r>
                <w:r><w:instrText>TIME</w:instrText></w:r>
                <w:r><w:fldChar w:fldCharType="separate"/></w:r>
                <w:r><w:t>10:00</w:t></w:r>
                <w:r><w:fldChar w:fldCharType="end"/></w:r>
              </w:p>
              <w:p><w:r><w:fldChar w:fldCharType="begin"/></w:r></w:p>
              <w:p><w:r><w:t>plain</w:t></w:r></w:p>"#,
        ));
        let mut paragraphs = doc.paragraphs();
        let fields = paragraphs.next().unwrap().fields();
        assert_eq!(fields.len(), 1);
        assert_eq!(fields[0].code(), "TIME");
        assert!(paragraphs.next().unwrap().runs.is_empty());
        assert!(paragraphs.next().unwrap().fields().is_empty());
    }

    #[test]
    fn test_simple_field() {
        let doc = load(&docx(
            r#"<w:p><w:fldSimple w:instr=" SEQ Figure \* ARABIC "><w:r><w:t>3</w:t></w:r></w:fldSimple></w:p>"#,
        ));
        let fields = first_paragraph(&doc).fields();
        let field = &fields[0];
        assert_eq!(field.field_type(), FieldType::Seq);
        assert_eq!(field.result(), "3");
    }

    #[test]
    fn test_hyperlinks() {
        let rels = rels_xml(&[("rId5", "hyperlink", "https://example.com/")]);
        let doc = load(&docx_with(
            r#"<w:p>
                <w:hyperlink r:id="rId5"><w:r><w:rPr><w:rStyle w:val="Hyperlink"/></w:rPr><w:t>Example</w:t></w:r><w:r><w:t> site</w:t></w:r></w:hyperlink>
                <w:hyperlink w:anchor="_Toc1"><w:r><w:t>Intro</w:t></w:r></w:hyperlink>
              </w:p>"#,
            &[("word/_rels/document.xml.rels", rels.as_bytes())],
        ));
        let p = first_paragraph(&doc);
        assert_eq!(p.runs.len(), 3);
        let external = p.runs[0].hyperlink().unwrap();
        assert!(Arc::ptr_eq(external, p.runs[1].hyperlink().unwrap()));
        assert_eq!(external.property("url").as_deref(), Some("https://example.com/"));
        assert_eq!(external.property("relationshipId").as_deref(), Some("rId5"));
        assert_eq!(external.property("display").as_deref(), Some("Example site"));

        let internal = p.runs[2].hyperlink().unwrap();
        assert_eq!(internal.property("anchor").as_deref(), Some("_Toc1"));
        assert_eq!(internal.property("relationshipId"), None);
    }

    #[test]
    fn test_drawings() {
        let rels = rels_xml(&[("rId9", "image", "media/image1.png")]);
        let png = png_bytes(4, 3);
        let doc = load(&docx_with(
            r#"<w:p><w:r><w:drawing><wp:inline>
                 <wp:extent cx="952500" cy="714375"/>
                 <wp:docPr id="3" name="Logo" descr="Company logo"/>
                 <a:graphic><a:graphicData><pic:pic><pic:blipFill><a:blip r:embed="rId9"/></pic:blipFill></pic:pic></a:graphicData></a:graphic>
               </wp:inline></w:drawing></w:r></w:p>
               <w:p><w:r><w:drawing><wp:anchor behindDoc="1" relativeHeight="251659264">
                 <wp:positionH relativeFrom="page"><wp:align>center</wp:align></wp:positionH>
                 <wp:positionV relativeFrom="paragraph"><wp:posOffset>127000</wp:posOffset></wp:positionV>
                 <wp:wrapTopAndBottom/>
                 <wp:docPr id="4" name="Float"/>
                 <a:graphic><a:graphicData><pic:pic><pic:blipFill><a:blip r:embed="rId9"/></pic:blipFill>
                   <pic:spPr><a:xfrm><a:ext cx="100" cy="200"/></a:xfrm></pic:spPr></pic:pic></a:graphicData></a:graphic>
               </wp:anchor></w:drawing></w:r></w:p>"#,
            &[
                ("word/_rels/document.xml.rels", rels.as_bytes()),
                ("word/media/image1.png", png.as_slice()),
            ],
        ));
        let mut paragraphs = doc.paragraphs();
        let inline = paragraphs.next().unwrap().images().next().unwrap().clone();
        assert_eq!(inline.name, "Logo");
        assert_eq!(inline.description.as_deref(), Some("Company logo"));
        assert_eq!(inline.target, "media/image1.png");
        assert_eq!((inline.width_emu, inline.height_emu), (952500, 714375));
        assert_eq!(inline.content_type, "image/png");
        assert_eq!(&*inline.data, png.as_slice());
        assert!(inline.is_inline());

        let floating = paragraphs.next().unwrap().images().next().unwrap().clone();
        assert_eq!((floating.width_emu, floating.height_emu), (100, 200));
        let ImagePosition::Floating(pos) = floating.position else {
            panic!("expected a floating image");
        };
        assert_eq!(pos.horizontal, AxisPosition::aligned("page", "center"));
        assert_eq!(pos.vertical, AxisPosition::offset("paragraph", 127000));
        assert_eq!(pos.wrap, WrapType::TopAndBottom);
        assert_eq!(pos.z_order, 251659264);
        assert!(pos.behind_text);
    }

    #[test]
    fn test_drawing_with_missing_media_is_dropped() {
        let rels = rels_xml(&[("rId9", "image", "media/gone.png")]);
        let doc = load(&docx_with(
            r#"<w:p><w:r><w:drawing><wp:inline><a:blip r:embed="rId9"/></wp:inline></w:drawing></w:r></w:p>"#,
            &[("word/_rels/document.xml.rels", rels.as_bytes())],
        ));
        assert!(first_paragraph(&doc).runs.is_empty());
    }

    #[test]
    fn test_sections_headers_and_footers() {
        let rels = rels_xml(&[
            ("rId1", "header", "header1.xml"),
            ("rId2", "footer", "footer1.xml"),
            ("rId3", "footer", "footer2.xml"),
        ]);
        let header = header_xml("hdr", r#"<w:p><w:r><w:t>Top</w:t></w:r></w:p>"#);
        let footer = header_xml("ftr", r#"<w:p><w:pPr><w:sectPr/></w:pPr><w:r><w:t>Bottom</w:t></w:r></w:p>"#);
        let orphan = header_xml("ftr", r#"<w:p/>"#);
        let doc = load(&docx_with(
            r#"<w:p><w:r><w:t>one</w:t></w:r></w:p>
               <w:p><w:pPr><w:sectPr>
                 <w:headerReference w:type="default" r:id="rId1"/>
                 <w:headerReference w:type="default" r:id="rId1"/>
                 <w:type w:val="evenPage"/>
                 <w:pgSz w:w="16838" w:h="11906" w:orient="landscape"/>
                 <w:pgMar w:top="720" w:right="1000" w:bottom="720" w:left="1000" w:header="400" w:footer="400" w:gutter="0"/>
                 <w:cols w:num="2" w:space="708"/>
               </w:sectPr></w:pPr></w:p>
               <w:p><w:r><w:t>two</w:t></w:r></w:p>
               <w:sectPr>
                 <w:footerReference w:type="first" r:id="rId2"/>
                 <w:pgSz w:w="12240" w:h="15840"/>
                 <w:cols w:num="3"/>
               </w:sectPr>"#,
            &[
                ("word/_rels/document.xml.rels", rels.as_bytes()),
                ("word/header1.xml", header.as_bytes()),
                ("word/footer1.xml", footer.as_bytes()),
                ("word/footer2.xml", orphan.as_bytes()),
            ],
        ));

        let sections = doc.sections();
        assert_eq!(sections.len(), 2);
        let first = sections[0];
        assert_eq!(first.page_size, PageSize { width: 16838, height: 11906 });
        assert_eq!(first.orientation, Orientation::Landscape);
        assert_eq!(first.columns, 2);
        assert_eq!(first.column_spacing, Some(708));
        assert_eq!(first.margins.left, 1000);
        assert_eq!(first.headers.len(), 1);
        let header = first.header(HeaderFooterKind::Default).unwrap();
        assert_eq!(header.text(), "Top");
        assert_eq!(header.rel_id.as_deref(), Some("rId1"));
        assert_eq!(header.target, "word/header1.xml");

        let last = sections[1];
        assert_eq!(last.page_size, PageSize::LETTER);
        assert_eq!(last.orientation, Orientation::Portrait);
        assert_eq!(last.columns, 3);
        assert_eq!(last.footer(HeaderFooterKind::First).unwrap().text(), "Bottom");

        assert_eq!(doc.blocks.len(), 3);
        assert!(matches!(
            doc.blocks[1],
            Block::SectionBreak(SectionBreak { break_type: SectionBreakType::EvenPage, .. })
        ));
        let retained: Vec<&str> = doc.retained.iter().map(|p| p.path.as_str()).collect();
        assert_eq!(retained, vec!["word/footer2.xml"]);
    }

    #[test]
    fn test_tables_with_merges() {
        let doc = load(&docx(
            r#"<w:tbl>
                <w:tblPr><w:tblStyle w:val="TableGrid"/><w:tblW w:w="6000" w:type="dxa"/></w:tblPr>
                <w:tblGrid><w:gridCol w:w="2000"/><w:gridCol w:w="2000"/><w:gridCol w:w="2000"/></w:tblGrid>
                <w:tr>
                  <w:trPr><w:trHeight w:val="400"/></w:trPr>
                  <w:tc><w:tcPr><w:tcW w:w="4000" w:type="dxa"/><w:gridSpan w:val="2"/><w:vMerge w:val="restart"/><w:vAlign w:val="center"/>
                    <w:shd w:val="clear" w:color="auto" w:fill="D9D9D9"/>
                    <w:tcBorders><w:top w:val="single" w:sz="8" w:color="000000"/><w:start w:val="double"/></w:tcBorders></w:tcPr>
                    <w:p><w:r><w:t>merged</w:t></w:r></w:p></w:tc>
                  <w:tc><w:p><w:r><w:t>c</w:t></w:r></w:p></w:tc>
                </w:tr>
                <w:tr>
                  <w:tc><w:tcPr><w:gridSpan w:val="2"/><w:vMerge/></w:tcPr><w:p/></w:tc>
                  <w:tc><w:tbl><w:tr><w:tc><w:p><w:r><w:t>nested</w:t></w:r></w:p></w:tc></w:tr></w:tbl><w:p/></w:tc>
                </w:tr>
              </w:tbl>"#,
        ));
        let table = doc.tables().next().unwrap();
        assert_eq!(table.style.as_deref(), Some("TableGrid"));
        assert_eq!(table.width, Some(6000));
        assert_eq!(table.grid, vec![2000, 2000, 2000]);
        assert_eq!(table.rows[0].height, Some(400));
        assert_eq!(table.rows[0].cells.len(), 3);
        assert_eq!(table.rows[1].cells.len(), 3);

        let anchor = table.cell(0, 0).unwrap();
        assert_eq!(anchor.grid_span, 2);
        assert_eq!(anchor.v_merge, VMerge::Restart);
        assert_eq!(anchor.v_align, Some(VerticalAlign::Center));
        assert_eq!(anchor.shading.as_ref().unwrap().fill.as_deref(), Some("D9D9D9"));
        assert_eq!(anchor.borders.top.as_ref().unwrap().size, Some(8));
        assert_eq!(anchor.borders.left.as_ref().unwrap().style, "double");
        assert_eq!(table.cell(0, 1).unwrap().h_merge_owner, Some(0));
        assert_eq!(table.cell(1, 0).unwrap().v_merge, VMerge::Continue);
        assert_eq!(table.cell(1, 1).unwrap().h_merge_owner, Some(0));
        table.validate_merges().unwrap();

        assert!(matches!(table.cell(1, 2).unwrap().blocks[0], crate::table::CellBlock::Table(_)));
        assert_eq!(table.plain_text(), "merged\tc\nnested\n");
    }

    #[test]
    fn test_missing_body_is_structural_error() {
        let bytes = crate::test_utils::zip_entries(&[
            ("[Content_Types].xml", crate::test_utils::MANIFEST),
            ("word/document.xml", b"<w:document xmlns:w=\"urn:w\"/>"),
        ]);
        let err = hydrate(&Package::from_bytes(&bytes).unwrap()).unwrap_err();
        assert!(matches!(err, DocxError::InvalidStructure(_)));
    }

    #[test]
    fn test_malformed_document_names_the_part() {
        let bytes = crate::test_utils::zip_entries(&[
            ("[Content_Types].xml", crate::test_utils::MANIFEST),
            ("word/document.xml", b"<w:document><w:body>"),
        ]);
        match hydrate(&Package::from_bytes(&bytes).unwrap()) {
            Err(DocxError::Parse { part, .. }) => assert_eq!(part, "word/document.xml"),
            other => panic!("expected a parse error, got {:?}", other.map(|_| ())),
        }
    }
}
