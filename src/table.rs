// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # HTML 表格模块
//!
//! [`Table`] 维护一个行 × 列的单元格网格。每个单元格有内容、属性和类型
//! （`td` 或 `th`）。单元格属性中的 `rowspan`/`colspan` 会把被覆盖的格子标记为
//! “已合并”，渲染时跳过，之后写入这些格子的内容也会被忽略。
//!
//! 关闭自动扩展时，写入表格范围之外的单元格返回 [`Exception::InvalidTableCell`]。

use log::debug;

use crate::common::Attributes;
use crate::exception::{Exception, Result};

/// 单元格类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CellKind {
    #[default]
    Data,
    Header,
}

impl CellKind {
    fn tag(self) -> &'static str {
        match self {
            CellKind::Data => "td",
            CellKind::Header => "th",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
struct Cell {
    contents: Option<String>,
    attributes: Attributes,
    kind: CellKind,
}

#[derive(Debug, Clone, PartialEq)]
enum Slot {
    Cell(Cell),
    /// 被其他单元格的 rowspan/colspan 覆盖
    Spanned,
}

impl Default for Slot {
    fn default() -> Self {
        Slot::Cell(Cell::default())
    }
}

#[derive(Debug, Clone)]
pub struct Table {
    attributes: Attributes,
    caption: Option<(String, Attributes)>,
    grid: Vec<Vec<Slot>>,
    row_attributes: Vec<Attributes>,
    rows: usize,
    cols: usize,
    auto_fill: String,
    auto_grow: bool,
}

impl Default for Table {
    fn default() -> Self {
        Self::new("")
    }
}

impl Table {
    pub fn new(attributes: impl Into<Attributes>) -> Self {
        Self {
            attributes: attributes.into(),
            caption: None,
            grid: Vec::new(),
            row_attributes: Vec::new(),
            rows: 0,
            cols: 0,
            auto_fill: "&nbsp;".to_string(),
            auto_grow: true,
        }
    }

    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    pub fn update_attributes(&mut self, attributes: impl Into<Attributes>) {
        self.attributes.update(&attributes.into());
    }

    pub fn set_caption(&mut self, caption: &str, attributes: impl Into<Attributes>) {
        self.caption = Some((caption.to_string(), attributes.into()));
    }

    /// 空单元格渲染时使用的内容
    pub fn set_auto_fill(&mut self, fill: &str) {
        self.auto_fill = fill.to_string();
    }

    pub fn auto_fill(&self) -> &str {
        &self.auto_fill
    }

    pub fn set_auto_grow(&mut self, grow: bool) {
        self.auto_grow = grow;
    }

    pub fn auto_grow(&self) -> bool {
        self.auto_grow
    }

    pub fn row_count(&self) -> usize {
        self.rows
    }

    pub fn col_count(&self) -> usize {
        self.cols
    }

    /// 直接设定行数，多出的行被丢弃
    pub fn set_row_count(&mut self, rows: usize) {
        self.rows = rows;
        self.grid.truncate(rows);
        self.row_attributes.truncate(rows);
    }

    /// 直接设定列数，多出的列被丢弃
    pub fn set_col_count(&mut self, cols: usize) {
        self.cols = cols;
        for row in &mut self.grid {
            row.truncate(cols);
        }
    }

    /// 确保 (row, col) 在表格范围内，必要时按自动扩展设置扩大表格
    fn ensure(&mut self, row: usize, col: usize) -> Result<()> {
        if row >= self.rows || col >= self.cols {
            if !self.auto_grow {
                return Err(Exception::InvalidTableCell(row, col));
            }
            self.rows = self.rows.max(row + 1);
            self.cols = self.cols.max(col + 1);
        }
        if self.grid.len() <= row {
            self.grid.resize_with(row + 1, Vec::new);
        }
        if self.grid[row].len() <= col {
            self.grid[row].resize_with(col + 1, Slot::default);
        }
        Ok(())
    }

    fn cell_mut(&mut self, row: usize, col: usize) -> Result<Option<&mut Cell>> {
        self.ensure(row, col)?;
        match &mut self.grid[row][col] {
            Slot::Cell(cell) => Ok(Some(cell)),
            Slot::Spanned => Ok(None),
        }
    }

    fn slot(&self, row: usize, col: usize) -> Result<Option<&Slot>> {
        if row >= self.rows || col >= self.cols {
            return Err(Exception::InvalidTableCell(row, col));
        }
        Ok(self.grid.get(row).and_then(|r| r.get(col)))
    }

    /// 写入单元格内容；已合并的格子保持不变
    pub fn set_cell_contents(&mut self, row: usize, col: usize, contents: &str, kind: CellKind) -> Result<()> {
        if let Some(cell) = self.cell_mut(row, col)? {
            cell.contents = Some(contents.to_string());
            cell.kind = kind;
        }
        Ok(())
    }

    pub fn set_header_contents(&mut self, row: usize, col: usize, contents: &str) -> Result<()> {
        self.set_cell_contents(row, col, contents, CellKind::Header)
    }

    pub fn get_cell_contents(&self, row: usize, col: usize) -> Result<Option<&str>> {
        Ok(match self.slot(row, col)? {
            Some(Slot::Cell(cell)) => cell.contents.as_deref(),
            _ => None,
        })
    }

    pub fn is_spanned(&self, row: usize, col: usize) -> bool {
        matches!(self.slot(row, col), Ok(Some(Slot::Spanned)))
    }

    /// 替换单元格属性
    pub fn set_cell_attributes(&mut self, row: usize, col: usize, attributes: impl Into<Attributes>) -> Result<()> {
        let attributes = attributes.into();
        if let Some(cell) = self.cell_mut(row, col)? {
            cell.attributes = attributes;
        } else {
            return Ok(());
        }
        self.update_span_grid(row, col)
    }

    /// 合并单元格属性
    pub fn update_cell_attributes(&mut self, row: usize, col: usize, attributes: impl Into<Attributes>) -> Result<()> {
        let attributes = attributes.into();
        if let Some(cell) = self.cell_mut(row, col)? {
            cell.attributes.update(&attributes);
        } else {
            return Ok(());
        }
        self.update_span_grid(row, col)
    }

    pub fn get_cell_attributes(&self, row: usize, col: usize) -> Result<Option<&Attributes>> {
        Ok(match self.slot(row, col)? {
            Some(Slot::Cell(cell)) => Some(&cell.attributes),
            Some(Slot::Spanned) => None,
            None => None,
        })
    }

    /// 根据 (row, col) 的 rowspan/colspan 标记被覆盖的格子
    fn update_span_grid(&mut self, row: usize, col: usize) -> Result<()> {
        let (rowspan, colspan) = match &self.grid[row][col] {
            Slot::Cell(cell) => (span(&cell.attributes, "rowspan"), span(&cell.attributes, "colspan")),
            Slot::Spanned => return Ok(()),
        };
        if rowspan <= 1 && colspan <= 1 {
            return Ok(());
        }
        self.ensure(row + rowspan - 1, col + colspan - 1)?;
        for r in row..row + rowspan {
            for c in col..col + colspan {
                if (r, c) != (row, col) {
                    self.ensure(r, c)?;
                    self.grid[r][c] = Slot::Spanned;
                }
            }
        }
        debug!("单元格 ({}, {}) 合并 {}x{}", row, col, rowspan, colspan);
        Ok(())
    }

    /// 追加一行，返回新行的下标
    pub fn add_row(&mut self, contents: &[&str], attributes: impl Into<Attributes>, kind: CellKind) -> Result<usize> {
        let row = self.rows;
        if !self.auto_grow && contents.len() > self.cols {
            return Err(Exception::InvalidTableCell(row, contents.len() - 1));
        }
        self.rows += 1;
        self.grid.resize_with(self.rows, Vec::new);
        for (col, text) in contents.iter().enumerate() {
            self.set_cell_contents(row, col, text, kind)?;
        }
        self.set_row_attributes(row, attributes, true)?;
        Ok(row)
    }

    /// 追加一列，返回新列的下标
    pub fn add_col(&mut self, contents: &[&str], attributes: impl Into<Attributes>, kind: CellKind) -> Result<usize> {
        let col = self.cols;
        if !self.auto_grow && contents.len() > self.rows {
            return Err(Exception::InvalidTableCell(contents.len() - 1, col));
        }
        self.cols += 1;
        for (row, text) in contents.iter().enumerate() {
            self.set_cell_contents(row, col, text, kind)?;
        }
        self.set_col_attributes(col, attributes)?;
        Ok(col)
    }

    /// `in_tr` 为真时属性写在 `<tr>` 上，否则写到该行的每个单元格
    pub fn set_row_attributes(&mut self, row: usize, attributes: impl Into<Attributes>, in_tr: bool) -> Result<()> {
        let attributes = attributes.into();
        if row >= self.rows {
            return Err(Exception::InvalidTableCell(row, 0));
        }
        if in_tr {
            if self.row_attributes.len() <= row {
                self.row_attributes.resize_with(row + 1, Attributes::new);
            }
            self.row_attributes[row] = attributes;
            return Ok(());
        }
        for col in 0..self.cols {
            self.set_cell_attributes(row, col, attributes.clone())?;
        }
        Ok(())
    }

    pub fn update_row_attributes(&mut self, row: usize, attributes: impl Into<Attributes>, in_tr: bool) -> Result<()> {
        let attributes = attributes.into();
        if row >= self.rows {
            return Err(Exception::InvalidTableCell(row, 0));
        }
        if in_tr {
            if self.row_attributes.len() <= row {
                self.row_attributes.resize_with(row + 1, Attributes::new);
            }
            self.row_attributes[row].update(&attributes);
            return Ok(());
        }
        for col in 0..self.cols {
            self.update_cell_attributes(row, col, attributes.clone())?;
        }
        Ok(())
    }

    pub fn get_row_attributes(&self, row: usize) -> Option<&Attributes> {
        self.row_attributes.get(row)
    }

    /// 从 `start` 行开始交替使用两组属性
    pub fn alt_row_attributes(&mut self, start: usize, odd: &Attributes, even: &Attributes, in_tr: bool) -> Result<()> {
        for row in start..self.rows {
            let attributes = if (row - start) % 2 == 0 { odd } else { even };
            self.update_row_attributes(row, attributes.clone(), in_tr)?;
        }
        Ok(())
    }

    /// 替换一列中每个单元格的属性
    pub fn set_col_attributes(&mut self, col: usize, attributes: impl Into<Attributes>) -> Result<()> {
        let attributes = attributes.into();
        if col >= self.cols {
            return Err(Exception::InvalidTableCell(0, col));
        }
        for row in 0..self.rows {
            self.set_cell_attributes(row, col, attributes.clone())?;
        }
        Ok(())
    }

    pub fn update_col_attributes(&mut self, col: usize, attributes: impl Into<Attributes>) -> Result<()> {
        let attributes = attributes.into();
        if col >= self.cols {
            return Err(Exception::InvalidTableCell(0, col));
        }
        for row in 0..self.rows {
            self.update_cell_attributes(row, col, attributes.clone())?;
        }
        Ok(())
    }

    pub fn to_html(&self) -> String {
        let tabs = self.attributes.tabs();
        let mut html = String::new();
        if let Some(comment) = self.attributes.comment() {
            html.push_str(&format!("{}<!-- {} -->\n", tabs, comment));
        }
        html.push_str(&format!("{}<table{}>\n", tabs, self.attributes.to_html()));
        if let Some((caption, attributes)) = &self.caption {
            html.push_str(&format!("{}\t<caption{}>{}</caption>\n", tabs, attributes.to_html(), caption));
        }
        for row in 0..self.rows {
            let tr_attributes = self
                .row_attributes
                .get(row)
                .map(Attributes::to_html)
                .unwrap_or_default();
            html.push_str(&format!("{}\t<tr{}>\n", tabs, tr_attributes));
            for col in 0..self.cols {
                let slot = self.grid.get(row).and_then(|r| r.get(col));
                let cell = match slot {
                    Some(Slot::Spanned) => continue,
                    Some(Slot::Cell(cell)) => cell.clone(),
                    None => Cell::default(),
                };
                let contents = match cell.contents.as_deref() {
                    Some(text) if !text.is_empty() => text,
                    _ => &self.auto_fill,
                };
                let tag = cell.kind.tag();
                html.push_str(&format!(
                    "{}\t\t<{}{}>{}</{}>\n",
                    tabs,
                    tag,
                    cell.attributes.to_html(),
                    contents,
                    tag
                ));
            }
            html.push_str(&format!("{}\t</tr>\n", tabs));
        }
        html.push_str(&format!("{}</table>", tabs));
        html
    }
}

fn span(attributes: &Attributes, name: &str) -> usize {
    attributes
        .get(name)
        .and_then(|v| v.trim().parse::<usize>().ok())
        .filter(|n| *n > 0)
        .unwrap_or(1)
}
