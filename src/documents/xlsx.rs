use super::{decode_xml_text, pattern, read_zip_entry, zip_error};
use crate::HarvestError;
use regex::Regex;
use std::io::Cursor;

const SHARED_STRINGS_PART: &str = "xl/sharedStrings.xml";
const WORKBOOK_PART: &str = "xl/workbook.xml";

/// Column count of a worksheet (`A` through `XFD`)
const MAX_COLUMNS: usize = 16_384;

/// One worksheet's non-empty rows
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sheet {
    pub name: String,
    pub rows: Vec<Vec<String>>,
}

/// Reads every worksheet of an XLSX workbook, in sheet order
pub fn xlsx_sheets(bytes: &[u8]) -> Result<Vec<Sheet>, HarvestError> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).map_err(|e| zip_error("xlsx", e))?;

    let shared = if archive.index_for_name(SHARED_STRINGS_PART).is_some() {
        parse_shared_strings(&read_zip_entry(&mut archive, SHARED_STRINGS_PART, "xlsx")?)?
    } else {
        Vec::new()
    };

    let sheet_name_re = pattern(r"^xl/worksheets/sheet(\d+)\.xml$")?;
    let mut sheet_parts: Vec<(u32, String)> = archive
        .file_names()
        .filter_map(|name| {
            let number = sheet_name_re.captures(name)?.get(1)?.as_str().parse().ok()?;
            Some((number, name.to_string()))
        })
        .collect();
    sheet_parts.sort();

    if sheet_parts.is_empty() {
        return Err(HarvestError::Conversion {
            kind: "xlsx",
            message: "workbook has no worksheets".to_string(),
        });
    }

    let names = if archive.index_for_name(WORKBOOK_PART).is_some() {
        parse_sheet_names(&read_zip_entry(&mut archive, WORKBOOK_PART, "xlsx")?)?
    } else {
        Vec::new()
    };

    let cells = CellPatterns::new()?;
    let mut sheets = Vec::with_capacity(sheet_parts.len());
    for (number, part) in sheet_parts {
        let xml = read_zip_entry(&mut archive, &part, "xlsx")?;
        let name = (number as usize)
            .checked_sub(1)
            .and_then(|i| names.get(i))
            .cloned()
            .unwrap_or_else(|| format!("Sheet {}", number));
        sheets.push(Sheet {
            name,
            rows: parse_sheet_xml(&xml, &shared, &cells),
        });
    }

    Ok(sheets)
}

/// Sheet names from the workbook part, in workbook order
fn parse_sheet_names(xml: &str) -> Result<Vec<String>, HarvestError> {
    let sheet_re = pattern(r#"<sheet\b[^>]*?\bname="([^"]*)""#)?;
    Ok(sheet_re
        .captures_iter(xml)
        .map(|sheet| decode_xml_text(&sheet[1]))
        .collect())
}

fn parse_shared_strings(xml: &str) -> Result<Vec<String>, HarvestError> {
    let item_re = pattern(r"(?s)<si>(.*?)</si>")?;
    let text_re = pattern(r"(?s)<t(?:\s[^>]*)?>(.*?)</t>")?;

    Ok(item_re
        .captures_iter(xml)
        .map(|item| {
            text_re
                .captures_iter(&item[1])
                .map(|t| decode_xml_text(&t[1]))
                .collect::<String>()
        })
        .collect())
}

struct CellPatterns {
    row: Regex,
    cell: Regex,
    cell_ref: Regex,
    cell_type: Regex,
    value: Regex,
    inline: Regex,
}

impl CellPatterns {
    fn new() -> Result<Self, HarvestError> {
        Ok(Self {
            row: pattern(r"(?s)<row\b[^>]*?(?:/>|>(.*?)</row>)")?,
            cell: pattern(r"(?s)<c\b([^>]*?)(?:/>|>(.*?)</c>)")?,
            cell_ref: pattern(r#"\br="([A-Za-z]+)\d*""#)?,
            cell_type: pattern(r#"\bt="([^"]*)""#)?,
            value: pattern(r"(?s)<v>(.*?)</v>")?,
            inline: pattern(r"(?s)<t(?:\s[^>]*)?>(.*?)</t>")?,
        })
    }
}

fn parse_sheet_xml(xml: &str, shared: &[String], patterns: &CellPatterns) -> Vec<Vec<String>> {
    let mut rows = Vec::new();

    for row in patterns.row.captures_iter(xml) {
        let Some(row) = row.get(1) else {
            continue;
        };
        let mut values = Vec::new();
        for cell in patterns.cell.captures_iter(row.as_str()) {
            let attrs = cell.get(1).map_or("", |m| m.as_str());
            if let Some(column) = patterns
                .cell_ref
                .captures(attrs)
                .and_then(|c| column_index(&c[1]))
                .filter(|column| *column < MAX_COLUMNS)
            {
                if column > values.len() {
                    values.resize(column, String::new());
                }
            }
            let inner = cell.get(2).map_or("", |m| m.as_str());
            let cell_type = patterns
                .cell_type
                .captures(attrs)
                .and_then(|c| c.get(1))
                .map_or("", |m| m.as_str());

            let value = match cell_type {
                "s" => patterns
                    .value
                    .captures(inner)
                    .and_then(|v| v[1].trim().parse::<usize>().ok())
                    .and_then(|index| shared.get(index).cloned())
                    .unwrap_or_default(),
                "inlineStr" => patterns
                    .inline
                    .captures_iter(inner)
                    .map(|t| decode_xml_text(&t[1]))
                    .collect(),
                _ => patterns
                    .value
                    .captures(inner)
                    .map(|v| decode_xml_text(&v[1]))
                    .unwrap_or_default(),
            };
            values.push(value);
        }

        while values.last().is_some_and(|v| v.is_empty()) {
            values.pop();
        }
        if !values.is_empty() {
            rows.push(values);
        }
    }

    rows
}

/// Zero-based column index of a column reference such as `C` or `AB`
fn column_index(letters: &str) -> Option<usize> {
    letters
        .bytes()
        .try_fold(0usize, |acc, b| {
            let digit = (b.to_ascii_uppercase().checked_sub(b'A')? as usize) + 1;
            acc.checked_mul(26)?.checked_add(digit)
        })?
        .checked_sub(1)
}
