// File: ./src/model/item.rs
use anyhow::{Result, bail};
use std::collections::{BTreeSet, HashMap};

pub const DAYS_PER_WEEK: usize = 5;

/// The institution's letters for Monday..Friday, e.g. `ABCDE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayCodes([char; DAYS_PER_WEEK]);

impl DayCodes {
    pub fn parse(codes: &str) -> Result<Self> {
        let chars: Vec<char> = codes.chars().collect();
        let Ok(arr) = <[char; DAYS_PER_WEEK]>::try_from(chars) else {
            bail!("day codes must be exactly {DAYS_PER_WEEK} letters, got {codes:?}");
        };
        for (i, c) in arr.iter().enumerate() {
            if arr[..i].contains(c) {
                bail!("day code {c:?} appears twice in {codes:?}");
            }
        }
        Ok(Self(arr))
    }

    /// Position of a single-letter day token, if it names a day.
    pub fn index_of(&self, token: &str) -> Option<usize> {
        let mut chars = token.chars();
        let c = chars.next()?;
        if chars.next().is_some() {
            return None;
        }
        self.0.iter().position(|d| *d == c)
    }
}

impl Default for DayCodes {
    fn default() -> Self {
        Self(['A', 'B', 'C', 'D', 'E'])
    }
}

/// One scheduled section of a class, as seen on one student's course list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Course {
    pub id: String,
    pub name: String,
    pub time_slots: BTreeSet<u32>,
    pub active_days: [bool; DAYS_PER_WEEK],
}

impl Course {
    /// A course whose schedule text could not be read.
    pub fn unscheduled(id: &str, name: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            time_slots: BTreeSet::new(),
            active_days: [false; DAYS_PER_WEEK],
        }
    }

    pub fn is_scheduled(&self) -> bool {
        !self.time_slots.is_empty() && self.active_days.iter().any(|d| *d)
    }

    pub fn meets(&self, slot: u32, day: usize) -> bool {
        self.time_slots.contains(&slot) && self.active_days.get(day).copied().unwrap_or(false)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StudentRecord {
    pub id: String,
    pub name: String,
    pub courses: Vec<Course>,
}

impl StudentRecord {
    pub fn new(id: &str, name: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            courses: Vec::new(),
        }
    }

    /// Id of the course occupying `slot` on `day`. Later courses win a clash.
    pub fn course_at(&self, slot: u32, day: usize) -> Option<&str> {
        self.courses
            .iter()
            .rev()
            .find(|c| c.meets(slot, day))
            .map(|c| c.id.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CourseRoster {
    pub id: String,
    pub name: String,
    pub students: Vec<String>,
}

/// Course id -> (name, students) in first-sighting order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CourseMembership {
    rosters: Vec<CourseRoster>,
    index: HashMap<String, usize>,
}

impl CourseMembership {
    pub fn new() -> Self {
        Self::default()
    }

    /// The first sighting of a course fixes its name; later sightings only
    /// append the student, once.
    pub fn record_sighting(&mut self, course_id: &str, name: &str, student_id: &str) {
        match self.index.get(course_id) {
            Some(&i) => {
                let roster = &mut self.rosters[i];
                if !roster.students.iter().any(|s| s == student_id) {
                    roster.students.push(student_id.to_string());
                }
            }
            None => {
                self.index.insert(course_id.to_string(), self.rosters.len());
                self.rosters.push(CourseRoster {
                    id: course_id.to_string(),
                    name: name.to_string(),
                    students: vec![student_id.to_string()],
                });
            }
        }
    }

    pub fn get(&self, course_id: &str) -> Option<&CourseRoster> {
        self.index.get(course_id).map(|&i| &self.rosters[i])
    }

    pub fn iter(&self) -> impl Iterator<Item = &CourseRoster> {
        self.rosters.iter()
    }

    pub fn len(&self) -> usize {
        self.rosters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rosters.is_empty()
    }
}
