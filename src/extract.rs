// File: ./src/extract.rs
// Pulls roster and course data out of portal pages
use anyhow::{Context, Result};
use scraper::{ElementRef, Html, Selector};
use serde::Deserialize;
use std::sync::LazyLock;

static TOTAL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(".total").expect("static selector"));
static PRESENTATION: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(r#"[role="presentation"]"#).expect("static selector"));
static COURSE_LIST: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(".my-courses-item-list").expect("static selector"));

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StudentEntry {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CourseEntry {
    pub id: String,
    /// Raw schedule text, e.g. `Algebra: 3-5(A,C-E)`.
    pub text: String,
}

#[derive(Deserialize)]
struct Popup {
    content: String,
}

/// Runs of whitespace, line breaks included, become one space.
fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn element_children(el: ElementRef<'_>) -> impl Iterator<Item = ElementRef<'_>> {
    el.children().filter_map(ElementRef::wrap)
}

/// Member count shown on a group's landing page. `None` means the page is
/// not a roster we can see.
pub fn roster_total(html: &str) -> Option<u32> {
    let doc = Html::parse_document(html);
    let total = doc.select(&TOTAL).next()?;
    let digits: String = total
        .text()
        .flat_map(str::chars)
        .filter(char::is_ascii_digit)
        .collect();
    digits.parse().ok()
}

/// Students listed on one roster page, in page order.
pub fn student_entries(html: &str) -> Vec<StudentEntry> {
    let doc = Html::parse_document(html);
    let Some(list) = doc
        .select(&PRESENTATION)
        .next()
        .and_then(|container| element_children(container).next())
    else {
        return Vec::new();
    };

    element_children(list)
        .filter_map(|row| {
            let link = element_children(row).nth(1)?;
            let link = element_children(link).next()?;
            let id = link.value().attr("href")?.strip_prefix("/user/")?;
            Some(StudentEntry {
                id: id.to_string(),
                name: collapse_whitespace(&link.text().collect::<String>()),
            })
        })
        .collect()
}

/// Courses in a student's course-list popup. `Ok(None)` when the popup has
/// no course list at all.
pub fn course_entries(popup_json: &str) -> Result<Option<Vec<CourseEntry>>> {
    let popup: Popup =
        serde_json::from_str(popup_json).context("Course list response is not a popup")?;
    let doc = Html::parse_document(&popup.content);
    let Some(list) = doc.select(&COURSE_LIST).next() else {
        return Ok(None);
    };

    let entries = element_children(list)
        .filter_map(|item| {
            let link = element_children(item).next()?;
            let link = element_children(link).nth(1)?;
            let link = element_children(link).next()?;
            let id = link.value().attr("href")?.strip_prefix("/course/")?;
            let text: String = link
                .children()
                .filter_map(|node| node.value().as_text().map(|t| t.to_string()))
                .collect();
            Some(CourseEntry {
                id: id.to_string(),
                text: collapse_whitespace(&text),
            })
        })
        .collect();
    Ok(Some(entries))
}
