//! Pro-Football-Reference table extraction and cell converters.

use std::collections::HashMap;

use scraper::{ElementRef, Html, Node, Selector};

/// One table row, cell text keyed by the cell's `data-stat` attribute.
pub type PfrRow = HashMap<String, String>;

/// Which tables of a page feed one stat.
#[derive(Debug, Clone, Copy)]
pub enum TableSelection {
    /// The first id present on the page wins.
    FirstOf(&'static [&'static str]),
    /// Rows of every listed table, concatenated in order. All must be present.
    AllOf(&'static [&'static str]),
}

impl TableSelection {
    pub fn ids(&self) -> &'static [&'static str] {
        match self {
            TableSelection::FirstOf(ids) | TableSelection::AllOf(ids) => ids,
        }
    }
}

/// Rows for `selection`, or `Err` naming the table ids that were missing.
pub fn extract_rows(html: &str, selection: TableSelection) -> Result<Vec<PfrRow>, String> {
    let document = Html::parse_document(html);
    match selection {
        TableSelection::FirstOf(ids) => ids
            .iter()
            .find_map(|id| table_rows(&document, id))
            .ok_or_else(|| format!("no table with id {}", ids.join(" or "))),
        TableSelection::AllOf(ids) => {
            let mut rows = Vec::new();
            for id in ids {
                let found =
                    table_rows(&document, id).ok_or_else(|| format!("no table with id {id}"))?;
                rows.extend(found);
            }
            Ok(rows)
        }
    }
}

/// Looks in the live DOM first, then inside comments, where PFR parks
/// tables it renders client-side.
pub fn table_rows(document: &Html, table_id: &str) -> Option<Vec<PfrRow>> {
    let selector = Selector::parse(&format!("table[id=\"{table_id}\"]")).ok()?;
    if let Some(table) = document.select(&selector).next() {
        return Some(collect_rows(table));
    }

    for node in document.tree.nodes() {
        let Node::Comment(comment) = node.value() else {
            continue;
        };
        let text: &str = comment;
        if !text.contains(table_id) {
            continue;
        }
        let fragment = Html::parse_fragment(text);
        if let Some(table) = fragment.select(&selector).next() {
            return Some(collect_rows(table));
        }
    }
    None
}

fn collect_rows(table: ElementRef<'_>) -> Vec<PfrRow> {
    let (Ok(row_sel), Ok(cell_sel)) = (Selector::parse("tr"), Selector::parse("th, td")) else {
        return Vec::new();
    };

    let mut rows = Vec::new();
    for tr in table.select(&row_sel) {
        let in_head = tr
            .parent()
            .and_then(ElementRef::wrap)
            .is_some_and(|parent| parent.value().name() == "thead");
        let separator = tr
            .value()
            .classes()
            .any(|c| matches!(c, "thead" | "over_header" | "spacer"));
        if in_head || separator {
            continue;
        }

        let row: PfrRow = tr
            .select(&cell_sel)
            .filter_map(|cell| {
                let stat = cell.value().attr("data-stat")?;
                let text = cell.text().collect::<String>();
                Some((stat.to_string(), text.trim().to_string()))
            })
            .collect();
        if row.values().all(|v| v.is_empty()) {
            continue;
        }
        rows.push(row);
    }
    rows
}

fn strip(raw: &str, markers: &[char]) -> String {
    raw.chars()
        .filter(|c| !markers.contains(c))
        .collect::<String>()
        .trim()
        .to_string()
}

/// Integer cell. Tolerates thousands separators and the `*`/`+` markers;
/// a decimal value is truncated.
pub fn to_int(raw: &str) -> Option<i64> {
    let s = strip(raw, &[',', '*', '+']);
    if s.is_empty() {
        return None;
    }
    s.parse::<i64>().ok().or_else(|| {
        s.parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .map(|v| v.trunc() as i64)
    })
}

pub fn to_decimal(raw: &str) -> Option<f64> {
    let s = strip(raw, &[',', '*', '+', '%']);
    if s.is_empty() {
        return None;
    }
    s.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Drops the Pro Bowl (`*`) and All-Pro (`+`) markers.
pub fn clean_name(raw: &str) -> Option<String> {
    let s = strip(raw, &['*', '+']);
    (!s.is_empty()).then_some(s)
}

pub fn clean_text(raw: &str) -> Option<String> {
    let s = raw.trim();
    (!s.is_empty()).then(|| s.to_string())
}

/// Regular-season weeks are numeric; playoff rounds continue the count.
pub fn parse_week(raw: &str) -> Option<i64> {
    to_int(raw).or(match raw.trim() {
        "WildCard" => Some(19),
        "Division" => Some(20),
        "ConfChamp" => Some(21),
        "SuperBowl" => Some(22),
        _ => None,
    })
}
