//! Tables, rows, cells and the cell merge algorithm
//!
//! A table is a rectangular grid: every row keeps the cell count it was
//! created with, and merging only flags cells. A horizontal merge gives the
//! anchor `grid_span = n` and points the spanned cells back at it through
//! `h_merge_owner`; a vertical merge marks the anchor `VMerge::Restart` and
//! the cells below `VMerge::Continue`.
//!
//! ```
//! use quire_docx::table::{Table, VMerge};
//!
//! let mut table = Table::new(3, 3)?;
//! table.merge_cells(0, 0, 2, 2)?;
//! assert_eq!(table.cell(0, 0).unwrap().grid_span, 2);
//! assert_eq!(table.cell(1, 0).unwrap().v_merge, VMerge::Continue);
//! assert_eq!(table.cell(1, 1).unwrap().h_merge_owner, Some(0));
//! table.validate_merges()?;
//! # Ok::<(), quire_docx::DocxError>(())
//! ```

use crate::error::{DocxError, Result};
use crate::paragraph::Paragraph;

/// Widest table, column or cell accepted (22 inches)
pub const MAX_WIDTH_TWIPS: u32 = 31680;

/// Most grid columns Word lays out; bounds spans when a table has no `tblGrid`
pub const MAX_GRID_COLUMNS: usize = 63;

/// Text width of a Letter page with one-inch margins
pub const DEFAULT_TABLE_WIDTH_TWIPS: u32 = 9360;

/// Vertical merge state of a cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VMerge {
    #[default]
    None,
    /// First cell of a vertical merge
    Restart,
    /// Covered by the cell above
    Continue,
}

/// Vertical alignment of cell content
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerticalAlign {
    Top,
    Center,
    Bottom,
}

impl VerticalAlign {
    pub fn from_val(val: &str) -> Option<Self> {
        match val {
            "top" => Some(Self::Top),
            "center" => Some(Self::Center),
            "bottom" => Some(Self::Bottom),
            _ => None,
        }
    }

    pub fn as_val(&self) -> &'static str {
        match self {
            Self::Top => "top",
            Self::Center => "center",
            Self::Bottom => "bottom",
        }
    }
}

/// One cell edge (`<w:top w:val="single" w:sz="4" w:color="auto"/>`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Border {
    /// Line style (`single`, `double`, `nil`, ...)
    pub style: String,
    /// Width in eighths of a point
    pub size: Option<u32>,
    pub color: Option<String>,
}

impl Border {
    pub fn single() -> Self {
        Self {
            style: "single".to_string(),
            size: Some(4),
            color: Some("auto".to_string()),
        }
    }
}

/// Cell borders (`<w:tcBorders>`)
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CellBorders {
    pub top: Option<Border>,
    pub left: Option<Border>,
    pub bottom: Option<Border>,
    pub right: Option<Border>,
}

impl CellBorders {
    pub fn all(border: Border) -> Self {
        Self {
            top: Some(border.clone()),
            left: Some(border.clone()),
            bottom: Some(border.clone()),
            right: Some(border),
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Edges paired with their element names
    pub fn edges(&self) -> [(&'static str, Option<&Border>); 4] {
        [
            ("top", self.top.as_ref()),
            ("left", self.left.as_ref()),
            ("bottom", self.bottom.as_ref()),
            ("right", self.right.as_ref()),
        ]
    }
}

/// Cell shading (`<w:shd w:val="clear" w:color="auto" w:fill="D9D9D9"/>`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Shading {
    pub pattern: String,
    pub color: Option<String>,
    pub fill: Option<String>,
}

impl Shading {
    /// Solid background fill
    pub fn fill(hex: &str) -> Self {
        Self {
            pattern: "clear".to_string(),
            color: Some("auto".to_string()),
            fill: Some(hex.trim_start_matches('#').to_ascii_uppercase()),
        }
    }
}

/// Block content of a cell
#[derive(Debug, Clone)]
pub enum CellBlock {
    Paragraph(Paragraph),
    Table(Table),
}

/// A table cell
#[derive(Debug, Clone)]
pub struct Cell {
    /// Width in twips
    pub width: Option<u32>,
    pub v_align: Option<VerticalAlign>,
    pub borders: CellBorders,
    pub shading: Option<Shading>,
    /// Grid columns covered (at least 1)
    pub grid_span: u32,
    pub v_merge: VMerge,
    /// Column of the cell this one is a horizontal continuation of
    pub h_merge_owner: Option<usize>,
    pub blocks: Vec<CellBlock>,
}

impl Default for Cell {
    fn default() -> Self {
        Self {
            width: None,
            v_align: None,
            borders: CellBorders::default(),
            shading: None,
            grid_span: 1,
            v_merge: VMerge::None,
            h_merge_owner: None,
            blocks: Vec::new(),
        }
    }
}

impl Cell {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the content with a single paragraph of text
    pub fn set_text(&mut self, text: impl Into<String>) {
        self.blocks = vec![CellBlock::Paragraph(Paragraph::with_text(text))];
    }

    pub fn add_paragraph(&mut self, paragraph: Paragraph) {
        self.blocks.push(CellBlock::Paragraph(paragraph));
    }

    /// Nest a table inside this cell
    pub fn add_table(&mut self, table: Table) {
        self.blocks.push(CellBlock::Table(table));
    }

    /// Set the width in twips
    pub fn set_width(&mut self, twips: u32) -> Result<()> {
        check_width("set cell width", twips)?;
        self.width = Some(twips);
        Ok(())
    }

    /// Direct paragraphs (nested tables excluded)
    pub fn paragraphs(&self) -> impl Iterator<Item = &Paragraph> {
        self.blocks.iter().filter_map(|b| match b {
            CellBlock::Paragraph(p) => Some(p),
            CellBlock::Table(_) => None,
        })
    }

    /// Text of all paragraphs, nested tables included, one line each
    pub fn text(&self) -> String {
        self.blocks
            .iter()
            .map(|b| match b {
                CellBlock::Paragraph(p) => p.text(),
                CellBlock::Table(t) => t.plain_text(),
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Covered by another cell, horizontally or vertically
    pub fn is_continuation(&self) -> bool {
        self.h_merge_owner.is_some() || self.v_merge == VMerge::Continue
    }

    fn is_merged(&self) -> bool {
        self.h_merge_owner.is_some() || self.v_merge != VMerge::None || self.grid_span > 1
    }
}

/// A table row
#[derive(Debug, Clone, Default)]
pub struct Row {
    /// Height in twips
    pub height: Option<u32>,
    pub cells: Vec<Cell>,
}

impl Row {
    /// Row with `cols` empty cells
    pub fn with_cells(cols: usize) -> Self {
        Self {
            height: None,
            cells: (0..cols).map(|_| Cell::new()).collect(),
        }
    }

    pub fn set_height(&mut self, twips: u32) -> Result<()> {
        check_width("set row height", twips)?;
        self.height = Some(twips);
        Ok(())
    }
}

/// A table
#[derive(Debug, Clone, Default)]
pub struct Table {
    /// Table style id
    pub style: Option<String>,
    /// Preferred width in twips
    pub width: Option<u32>,
    /// Grid column widths in twips
    pub grid: Vec<u32>,
    pub rows: Vec<Row>,
}

impl Table {
    /// Create a `rows` x `cols` table with evenly split columns
    pub fn new(rows: usize, cols: usize) -> Result<Self> {
        if rows == 0 || cols == 0 {
            return Err(DocxError::invalid_argument(
                "create table",
                format!("a table needs at least one row and column, got {}x{}", rows, cols),
            ));
        }
        let col_width = DEFAULT_TABLE_WIDTH_TWIPS / cols as u32;
        Ok(Self {
            style: None,
            width: Some(col_width * cols as u32),
            grid: vec![col_width; cols],
            rows: (0..rows).map(|_| Row::with_cells(cols)).collect(),
        })
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Number of grid columns
    pub fn column_count(&self) -> usize {
        let widest = self.rows.iter().map(|r| r.cells.len()).max().unwrap_or(0);
        widest.max(self.grid.len())
    }

    pub fn cell(&self, row: usize, col: usize) -> Option<&Cell> {
        self.rows.get(row).and_then(|r| r.cells.get(col))
    }

    pub fn cell_mut(&mut self, row: usize, col: usize) -> Option<&mut Cell> {
        self.rows.get_mut(row).and_then(|r| r.cells.get_mut(col))
    }

    /// Append a row with one empty cell per grid column
    pub fn add_row(&mut self) -> &mut Row {
        let cols = self.column_count();
        self.rows.push(Row::with_cells(cols));
        let last = self.rows.len() - 1;
        &mut self.rows[last]
    }

    /// Set one grid column's width; unmerged cells in that column follow
    pub fn set_column_width(&mut self, col: usize, twips: u32) -> Result<()> {
        if col >= self.grid.len() {
            return Err(DocxError::invalid_argument(
                "set column width",
                format!("column {} out of range (table has {})", col, self.grid.len()),
            ));
        }
        check_width("set column width", twips)?;
        self.grid[col] = twips;
        for row in &mut self.rows {
            if let Some(cell) = row.cells.get_mut(col) {
                if cell.grid_span == 1 && cell.h_merge_owner.is_none() {
                    cell.width = Some(twips);
                }
            }
        }
        Ok(())
    }

    /// Set the preferred table width
    pub fn set_width(&mut self, twips: u32) -> Result<()> {
        check_width("set table width", twips)?;
        self.width = Some(twips);
        Ok(())
    }

    /// Merge the `cols` x `rows` rectangle whose top-left cell is (`row`, `col`).
    ///
    /// On failure the table is left untouched.
    pub fn merge_cells(&mut self, row: usize, col: usize, cols: usize, rows: usize) -> Result<()> {
        const OP: &str = "merge cells";

        if cols == 0 || rows == 0 {
            return Err(DocxError::invalid_argument(
                OP,
                format!("span {}x{} at ({}, {}) must be at least 1x1", cols, rows, row, col),
            ));
        }
        if row + rows > self.rows.len() {
            return Err(DocxError::invalid_argument(
                OP,
                format!(
                    "{} rows from row {} exceed the table's {} rows",
                    rows,
                    row,
                    self.rows.len()
                ),
            ));
        }
        for r in row..row + rows {
            let width = self.rows[r].cells.len();
            if col + cols > width {
                return Err(DocxError::invalid_argument(
                    OP,
                    format!(
                        "{} columns from column {} exceed the {} cells of row {}",
                        cols, col, width, r
                    ),
                ));
            }
        }

        let anchor = &self.rows[row].cells[col];
        if anchor.h_merge_owner.is_some() {
            return Err(DocxError::invalid_state(
                OP,
                format!("cell ({}, {}) is a horizontal continuation", row, col),
            ));
        }
        if anchor.v_merge == VMerge::Continue {
            return Err(DocxError::invalid_state(
                OP,
                format!("cell ({}, {}) is a vertical continuation", row, col),
            ));
        }
        if anchor.is_merged() {
            return Err(DocxError::invalid_state(
                OP,
                format!("cell ({}, {}) already anchors a merge", row, col),
            ));
        }
        for r in row..row + rows {
            for c in col..col + cols {
                if (r, c) != (row, col) && self.rows[r].cells[c].is_merged() {
                    return Err(DocxError::invalid_state(
                        OP,
                        format!("cell ({}, {}) is already part of a merge", r, c),
                    ));
                }
            }
        }

        for r in row..row + rows {
            let cells = &mut self.rows[r].cells;
            cells[col].grid_span = cols as u32;
            cells[col].v_merge = match (rows, r == row) {
                (1, _) => VMerge::None,
                (_, true) => VMerge::Restart,
                (_, false) => VMerge::Continue,
            };
            for cell in &mut cells[col + 1..col + cols] {
                cell.h_merge_owner = Some(col);
            }
        }
        log::debug!("merged {}x{} cells at ({}, {})", cols, rows, row, col);
        Ok(())
    }

    /// Check the merge invariants of every cell
    pub fn validate_merges(&self) -> Result<()> {
        const OP: &str = "validate merges";

        for (r, row) in self.rows.iter().enumerate() {
            for (c, cell) in row.cells.iter().enumerate() {
                if cell.grid_span == 0 {
                    return Err(DocxError::invalid_state(
                        OP,
                        format!("cell ({}, {}) has a zero grid span", r, c),
                    ));
                }
                let span = cell.grid_span as usize;
                if span > 1 {
                    if c + span > row.cells.len() {
                        return Err(DocxError::invalid_state(
                            OP,
                            format!("cell ({}, {}) spans past the end of its row", r, c),
                        ));
                    }
                    if let Some(k) = (c + 1..c + span).find(|&k| row.cells[k].h_merge_owner != Some(c)) {
                        return Err(DocxError::invalid_state(
                            OP,
                            format!(
                                "cell ({}, {}) is spanned by ({}, {}) but not marked as its continuation",
                                r, k, r, c
                            ),
                        ));
                    }
                }
                if let Some(owner) = cell.h_merge_owner {
                    let valid = owner < c
                        && row.cells[owner].h_merge_owner.is_none()
                        && owner + row.cells[owner].grid_span as usize > c;
                    if !valid {
                        return Err(DocxError::invalid_state(
                            OP,
                            format!("cell ({}, {}) names ({}, {}) as owner, which does not span it", r, c, r, owner),
                        ));
                    }
                }
                if cell.v_merge == VMerge::Continue {
                    let above = r
                        .checked_sub(1)
                        .and_then(|prev| self.rows[prev].cells.get(c))
                        .map(|above| above.v_merge);
                    if !matches!(above, Some(VMerge::Restart | VMerge::Continue)) {
                        return Err(DocxError::invalid_state(
                            OP,
                            format!("cell ({}, {}) continues a vertical merge with no start above", r, c),
                        ));
                    }
                }
            }
        }
        Ok(())
    }

    /// Cell text, tab-separated per row, newline-separated rows
    pub fn plain_text(&self) -> String {
        self.rows
            .iter()
            .map(|row| {
                row.cells
                    .iter()
                    .filter(|c| !c.is_continuation())
                    .map(Cell::text)
                    .collect::<Vec<_>>()
                    .join("\t")
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

fn check_width(operation: &'static str, twips: u32) -> Result<()> {
    if twips == 0 || twips > MAX_WIDTH_TWIPS {
        return Err(DocxError::invalid_argument(
            operation,
            format!("{} twips is outside 1..={}", twips, MAX_WIDTH_TWIPS),
        ));
    }
    Ok(())
}
