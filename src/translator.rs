// File: ./src/translator.rs
// Rewrites the ids in both tables into names
use crate::config::ScheduleLayout;
use crate::model::{Block, Identity, SlotRow};
use crate::storage::TabularStore;
use anyhow::Result;
use std::collections::HashMap;
use std::path::Path;
use tracing::info;

/// Splits on commas that are not inside double quotes. Quotes are kept.
pub fn split_quoted(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    for ch in line.chars() {
        match ch {
            '"' => {
                in_quotes = !in_quotes;
                current.push(ch);
            }
            ',' if !in_quotes => fields.push(std::mem::take(&mut current)),
            _ => current.push(ch),
        }
    }
    fields.push(current);
    fields
}

/// The membership file with the leading course id split off each line.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CourseTable {
    /// Course id -> quoted name field, exactly as written.
    pub names: HashMap<String, String>,
    /// Remaining fields per line: the name field, then student ids.
    pub rows: Vec<Vec<String>>,
}

impl CourseTable {
    pub fn parse(text: &str) -> Self {
        let mut table = Self::default();
        for line in text.lines() {
            let mut fields = split_quoted(line);
            let id = fields.remove(0);
            if let Some(name) = fields.first() {
                table.names.entry(id).or_insert_with(|| name.clone());
            }
            table.rows.push(fields);
        }
        table
    }
}

#[derive(Debug, Default, Clone)]
pub struct IdTranslator {
    courses: HashMap<String, String>,
    students: HashMap<String, String>,
}

impl IdTranslator {
    pub fn new(courses: HashMap<String, String>, students: HashMap<String, String>) -> Self {
        Self { courses, students }
    }

    pub fn from_tables(courses: &CourseTable, blocks: &[Block]) -> Self {
        let students = blocks
            .iter()
            .filter_map(|b| match &b.identity {
                Identity::Keyed { id, name } => Some((id.clone(), name.clone())),
                Identity::Named(_) => None,
            })
            .collect();
        Self::new(courses.names.clone(), students)
    }

    /// Identity lines become the bare name; every schedule cell holding a
    /// known course id becomes that course's name field.
    pub fn translate_blocks(&self, blocks: &[Block]) -> Vec<Block> {
        blocks
            .iter()
            .map(|block| Block {
                identity: match &block.identity {
                    Identity::Keyed { id, .. } => match self.students.get(id) {
                        Some(name) => Identity::Named(name.clone()),
                        None => block.identity.clone(),
                    },
                    Identity::Named(_) => block.identity.clone(),
                },
                header: block.header.clone(),
                rows: block
                    .rows
                    .iter()
                    .map(|row| SlotRow {
                        slot: row.slot.clone(),
                        cells: row.cells.iter().map(|c| lookup(&self.courses, c)).collect(),
                    })
                    .collect(),
            })
            .collect()
    }

    /// Student ids after the name field become student names.
    pub fn translate_course_rows(&self, rows: &[Vec<String>]) -> Vec<Vec<String>> {
        rows.iter()
            .map(|row| {
                row.iter()
                    .enumerate()
                    .map(|(i, field)| {
                        if i == 0 {
                            field.clone()
                        } else {
                            lookup(&self.students, field)
                        }
                    })
                    .collect()
            })
            .collect()
    }
}

fn lookup(map: &HashMap<String, String>, token: &str) -> String {
    if token.is_empty() {
        return String::new();
    }
    map.get(token).cloned().unwrap_or_else(|| token.to_string())
}

fn render_rows(rows: &[Vec<String>]) -> String {
    let mut out = String::new();
    for row in rows {
        out.push_str(&row.join(","));
        out.push('\n');
    }
    out
}

/// Keeps the source's choice of ending the last line with a newline.
fn match_trailing_newline(mut rendered: String, source: &str) -> String {
    if !source.ends_with('\n') && rendered.ends_with('\n') {
        rendered.pop();
    }
    rendered
}

/// Translated (course file, student file) contents.
pub fn translate_text(
    course_text: &str,
    student_text: &str,
    layout: &ScheduleLayout,
) -> Result<(String, String)> {
    let courses = CourseTable::parse(course_text);
    let blocks = Block::parse_all(student_text, layout.stride())?;
    let translator = IdTranslator::from_tables(&courses, &blocks);
    info!(
        "Translating with {} course names and {} student names",
        translator.courses.len(),
        translator.students.len()
    );

    let course_out = render_rows(&translator.translate_course_rows(&courses.rows));
    let student_out = Block::render_all(&translator.translate_blocks(&blocks));
    Ok((
        match_trailing_newline(course_out, course_text),
        match_trailing_newline(student_out, student_text),
    ))
}

/// Reads both tables and writes translated copies. Nothing is written
/// unless both inputs translate.
pub fn translate_files(
    course_in: &Path,
    student_in: &Path,
    course_out: &Path,
    student_out: &Path,
    layout: &ScheduleLayout,
) -> Result<()> {
    let course_text = TabularStore::read(course_in)?;
    let student_text = TabularStore::read(student_in)?;
    let (courses, students) = translate_text(&course_text, &student_text, layout)?;
    TabularStore::atomic_write(course_out, courses)?;
    TabularStore::atomic_write(student_out, students)?;
    info!(
        "Wrote {} and {}",
        course_out.display(),
        student_out.display()
    );
    Ok(())
}
