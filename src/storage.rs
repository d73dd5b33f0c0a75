// File: ./src/storage.rs
// Writes the schedule and membership tables
use crate::config::ScheduleLayout;
use crate::model::{Block, CourseMembership, StudentRecord};
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;
use tracing::info;

pub struct TabularStore;

impl TabularStore {
    /// Atomic write: Write to .tmp file then rename
    pub fn atomic_write<P: AsRef<Path>, C: AsRef<[u8]>>(path: P, contents: C) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let tmp_path = path.with_extension("tmp");
        fs::write(&tmp_path, contents)
            .with_context(|| format!("Failed to write {}", tmp_path.display()))?;
        fs::rename(&tmp_path, path)
            .with_context(|| format!("Failed to move {} into place", path.display()))?;
        Ok(())
    }

    pub fn read(path: &Path) -> Result<String> {
        fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
    }

    pub fn render_student_schedules(students: &[StudentRecord], layout: &ScheduleLayout) -> String {
        let blocks: Vec<Block> = students
            .iter()
            .map(|s| Block::from_student(s, layout))
            .collect();
        Block::render_all(&blocks)
    }

    pub fn render_course_membership(membership: &CourseMembership) -> String {
        let mut out = String::new();
        for roster in membership.iter() {
            out.push_str(&roster.id);
            out.push(',');
            out.push_str(&quote(&roster.name));
            for student in &roster.students {
                out.push(',');
                out.push_str(student);
            }
            out.push('\n');
        }
        out
    }

    pub fn write_student_schedules(
        path: &Path,
        students: &[StudentRecord],
        layout: &ScheduleLayout,
    ) -> Result<()> {
        Self::atomic_write(path, Self::render_student_schedules(students, layout))?;
        info!("Wrote {} student schedules to {}", students.len(), path.display());
        Ok(())
    }

    pub fn write_course_membership(path: &Path, membership: &CourseMembership) -> Result<()> {
        Self::atomic_write(path, Self::render_course_membership(membership))?;
        info!("Wrote {} courses to {}", membership.len(), path.display());
        Ok(())
    }
}

/// Double-quotes a field, doubling any quote inside it.
pub fn quote(field: &str) -> String {
    format!("\"{}\"", field.replace('"', "\"\""))
}
