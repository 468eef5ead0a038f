use csaf_cms_models::{TrackingStatus, WorkflowState};
use failure::{Fail, ResultExt};
use serde_json::Value;
use std::{fmt, fs, io, path::Path};
use termion::style::{Bold, Reset};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use crate::Result;

pub fn parse_state(name: &str) -> Result<WorkflowState, UnknownNameError> {
    WorkflowState::from_name(name).ok_or_else(|| UnknownNameError("workflow state", name.into()))
}

pub fn parse_status(name: &str) -> Result<TrackingStatus, UnknownNameError> {
    TrackingStatus::from_name(name)
        .ok_or_else(|| UnknownNameError("tracking status", name.into()))
}

#[derive(Debug, Fail)]
#[fail(display = "Unknown {}: {}", _0, _1)]
pub struct UnknownNameError(&'static str, String);

/// Read a JSON document from a file, or from standard input if `path` is `-`.
pub fn read_json(path: &Path) -> Result<Value> {
    let value = if path == Path::new("-") {
        serde_json::from_reader(io::stdin())
            .context("cannot parse standard input")?
    } else {
        let data = fs::read(path)
            .with_context(|_| format!("cannot read {}", path.display()))?;
        serde_json::from_slice(&data)
            .with_context(|_| format!("cannot parse {}", path.display()))?
    };

    Ok(value)
}

/// Print a table, shrinking the last column to fit the terminal.
pub fn print_table<H, R>(header: H, rows: &[R])
where
    H: TableRow,
    R: TableRow<Size = H::Size>,
{
    let mut widths = (0..H::size())
        .map(|inx| UnicodeWidthStr::width(header.column(inx)))
        .collect::<Vec<_>>();

    for row in rows {
        for (inx, width) in widths.iter_mut().enumerate() {
            *width = (*width).max(UnicodeWidthStr::width(row.column(inx)));
        }
    }

    let total_width = widths.iter().sum::<usize>() + widths.len() - 1;
    let (terminal_width, _) = termion::terminal_size().unwrap_or((120, 20));
    let terminal_width = usize::from(terminal_width);

    if total_width > terminal_width {
        if let Some(last) = widths.last_mut() {
            let overflow = total_width - terminal_width;
            *last = last.saturating_sub(overflow).max(8);
        }
    }

    print_row(&header, &widths, true);

    for row in rows {
        print_row(row, &widths, false);
    }
}

fn print_row<R: TableRow>(row: &R, widths: &[usize], bold: bool) {
    for (inx, width) in widths.iter().enumerate() {
        if inx > 0 {
            print!(" ");
        }
        let column = Column(row.column(inx), *width);
        if bold {
            print!("{}{}{}", Bold, column, Reset);
        } else {
            print!("{}", column);
        }
    }
    println!();
}

pub trait TableRow {
    type Size;

    fn size() -> usize;

    fn column(&self, index: usize) -> &str;
}

macro_rules! impl_table_row {
    {
        $(
            $sizeconst:literal $size:ident => $($inx:tt : $ty:ident),+
        );+
        $(;)*
    } => {
        $(
            pub struct $size;

            impl<$($ty),+> TableRow for ($($ty,)+)
            where
                $($ty: AsRef<str>),+
            {
                type Size = $size;

                fn size() -> usize { $sizeconst }

                fn column(&self, index: usize) -> &str {
                    match index {
                        $($inx => self.$inx.as_ref(),)+
                        _ => "",
                    }
                }
            }
        )+
    };
}

impl_table_row! {
    4 Four  => 0: A, 1: B, 2: C, 3: D;
    5 Five  => 0: A, 1: B, 2: C, 3: D, 4: E;
}

/// A table cell, truncated or padded to a display width.
struct Column<'a>(&'a str, usize);

impl<'a> fmt::Display for Column<'a> {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        let mut len = 0;
        let mut end = 0;

        for (inx, chr) in self.0.char_indices() {
            let width = UnicodeWidthChar::width(chr).unwrap_or(0);
            if len + width > self.1 {
                break;
            }
            len += width;
            end = inx + chr.len_utf8();
        }

        write!(fmt, "{0}{1:2$}", &self.0[..end], "", self.1 - len)
    }
}
