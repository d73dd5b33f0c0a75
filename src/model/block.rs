// File: ./src/model/block.rs
// One student's fixed-stride block in the schedule file
use crate::config::ScheduleLayout;
use crate::model::item::{DAYS_PER_WEEK, StudentRecord};
use anyhow::{Result, bail};

/// First line of a block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identity {
    /// `id,name` as written by the scraper.
    Keyed { id: String, name: String },
    /// A bare name, after translation.
    Named(String),
}

impl Identity {
    fn parse(line: &str) -> Self {
        match line.split_once(',') {
            Some((id, name)) => Identity::Keyed {
                id: id.to_string(),
                name: name.to_string(),
            },
            None => Identity::Named(line.to_string()),
        }
    }

    fn render(&self) -> String {
        match self {
            Identity::Keyed { id, name } => format!("{id},{name}"),
            Identity::Named(name) => name.clone(),
        }
    }
}

/// `slot,cell,cell,...` where each cell is a course id or blank.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotRow {
    pub slot: String,
    pub cells: Vec<String>,
}

impl SlotRow {
    fn parse(line: &str) -> Self {
        let mut fields = line.split(',');
        let slot = fields.next().unwrap_or_default().to_string();
        Self {
            slot,
            cells: fields.map(str::to_string).collect(),
        }
    }

    fn render(&self) -> String {
        let mut line = self.slot.clone();
        for cell in &self.cells {
            line.push(',');
            line.push_str(cell);
        }
        line
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub identity: Identity,
    pub header: String,
    pub rows: Vec<SlotRow>,
}

impl Block {
    pub fn from_student(student: &StudentRecord, layout: &ScheduleLayout) -> Self {
        let rows = (1..=layout.slot_count)
            .map(|slot| SlotRow {
                slot: slot.to_string(),
                cells: (0..DAYS_PER_WEEK)
                    .map(|day| student.course_at(slot, day).unwrap_or_default().to_string())
                    .collect(),
            })
            .collect();

        Self {
            identity: Identity::Keyed {
                id: student.id.clone(),
                name: student.name.clone(),
            },
            header: layout.header_line(),
            rows,
        }
    }

    /// Lines of this block, separator included.
    pub fn lines(&self) -> Vec<String> {
        let mut lines = Vec::with_capacity(self.rows.len() + 3);
        lines.push(self.identity.render());
        lines.push(self.header.clone());
        lines.extend(self.rows.iter().map(SlotRow::render));
        lines.push(String::new());
        lines
    }

    /// Splits a schedule file into blocks of exactly `stride` lines.
    pub fn parse_all(text: &str, stride: usize) -> Result<Vec<Block>> {
        if stride < 3 {
            bail!("block stride {stride} is too small");
        }
        let lines: Vec<&str> = text.lines().collect();
        if lines.len() % stride != 0 {
            bail!(
                "schedule file has {} lines, not a multiple of the {stride}-line block stride",
                lines.len()
            );
        }

        lines
            .chunks(stride)
            .enumerate()
            .map(|(n, chunk)| {
                let separator = chunk[stride - 1];
                if !separator.trim().is_empty() {
                    bail!(
                        "block {} (line {}) should end with a blank line, found {separator:?}",
                        n + 1,
                        n * stride + stride
                    );
                }
                Ok(Block {
                    identity: Identity::parse(chunk[0]),
                    header: chunk[1].to_string(),
                    rows: chunk[2..stride - 1].iter().map(|l| SlotRow::parse(l)).collect(),
                })
            })
            .collect()
    }

    pub fn render_all(blocks: &[Block]) -> String {
        let mut out = String::new();
        for block in blocks {
            for line in block.lines() {
                out.push_str(&line);
                out.push('\n');
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::item::Course;

    fn layout(slots: u32) -> ScheduleLayout {
        ScheduleLayout {
            slot_count: slots,
            ..ScheduleLayout::default()
        }
    }

    #[test]
    fn student_block_places_course_ids() {
        let mut student = StudentRecord::new("101", "Ada Lovelace");
        let mut art = Course::unscheduled("900", "Art");
        art.time_slots.extend([1, 2]);
        art.active_days = [true, false, true, false, false];
        student.courses.push(art);
        student.courses.push(Course::unscheduled("901", "Homeroom"));

        let block = Block::from_student(&student, &layout(3));
        assert_eq!(
            block.lines(),
            vec![
                "101,Ada Lovelace",
                "Period,Monday,Tuesday,Wednesday,Thursday,Friday",
                "1,900,,900,,",
                "2,900,,900,,",
                "3,,,,,",
                "",
            ]
        );
    }

    #[test]
    fn parse_then_render_is_byte_identical() {
        let text = "101,Ada\nPeriod,Mon,Tue,Wed,Thu,Fri\n1,900,,900,,\n2,,,,,\n\n\
                    102,Bob, Jr\nPeriod,Mon,Tue,Wed,Thu,Fri\n1,,,,,901\n2,,,,,\n\n";
        let blocks = Block::parse_all(text, 5).unwrap();
        assert_eq!(blocks.len(), 2);
        assert_eq!(
            blocks[1].identity,
            Identity::Keyed {
                id: "102".into(),
                name: "Bob, Jr".into()
            }
        );
        assert_eq!(blocks[1].rows[0].cells, vec!["", "", "", "", "901"]);
        assert_eq!(Block::render_all(&blocks), text);
    }

    #[test]
    fn rejects_misaligned_stride() {
        let text = "101,Ada\nhdr\n1,,,,,\n\n102,Bob\n";
        let err = Block::parse_all(text, 4).unwrap_err();
        assert!(err.to_string().contains("not a multiple"));

        let shifted = "101,Ada\nhdr\n1,,,,,\n2,,,,,\n";
        assert!(Block::parse_all(shifted, 4).is_err());
    }

    #[test]
    fn empty_file_has_no_blocks() {
        assert!(Block::parse_all("", 12).unwrap().is_empty());
    }
}
