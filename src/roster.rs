// File: ./src/roster.rs
// Walks group rosters and builds every student's schedule plus course membership
use crate::client::{Fetched, PortalClient};
use crate::config::Config;
use crate::extract::{self, StudentEntry};
use crate::model::{Course, CourseMembership, DayCodes, StudentRecord};
use anyhow::Result;
use std::collections::HashSet;
use std::fmt;
use tracing::{error, info, warn};

/// The roster landing page showed no member count, which is what the
/// portal serves to a session that is not logged in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidCredentials {
    pub group_id: String,
}

impl fmt::Display for InvalidCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "no member count on roster of group {}", self.group_id)
    }
}

impl std::error::Error for InvalidCredentials {}

#[derive(Debug, Default)]
pub struct ScrapeResult {
    pub students: Vec<StudentRecord>,
    pub membership: CourseMembership,
}

pub struct RosterAggregator<'a> {
    client: &'a PortalClient,
    days: DayCodes,
    slot_count: u32,
    page_size: u32,
}

impl<'a> RosterAggregator<'a> {
    pub fn new(client: &'a PortalClient, config: &Config) -> Result<Self> {
        Ok(Self {
            client,
            days: config.schedule.day_codes()?,
            slot_count: config.schedule.slot_count,
            page_size: config.page_size,
        })
    }

    pub async fn scrape_all(&self, group_ids: &[String]) -> Result<ScrapeResult> {
        let mut entries = Vec::new();
        for group_id in group_ids {
            let pages = self.page_count(group_id).await?;
            entries.extend(self.collect_entries(group_id, pages).await);
        }
        info!("Collected {} roster entries", entries.len());

        let mut result = ScrapeResult::default();
        let mut recorded: HashSet<String> = HashSet::new();
        for entry in &entries {
            if recorded.contains(&entry.id) {
                continue;
            }
            if let Some(student) = self.fetch_student(entry, &mut result.membership).await {
                recorded.insert(student.id.clone());
                result.students.push(student);
            }
        }

        info!(
            "Scraped {} students across {} courses",
            result.students.len(),
            result.membership.len()
        );
        Ok(result)
    }

    async fn page_count(&self, group_id: &str) -> Result<u32> {
        let total = match self.client.roster_landing(group_id).await? {
            Fetched::Ready(html) => extract::roster_total(&html),
            Fetched::Unavailable(status) => {
                warn!("Roster of group {} unavailable: {}", group_id, status);
                None
            }
        };
        let Some(total) = total else {
            return Err(InvalidCredentials {
                group_id: group_id.to_string(),
            }
            .into());
        };

        let pages = total.div_ceil(self.page_size);
        info!("Group {}: {} members on {} pages", group_id, total, pages);
        Ok(pages)
    }

    /// A page that fails is logged and skipped; the rest still count.
    async fn collect_entries(&self, group_id: &str, pages: u32) -> Vec<StudentEntry> {
        let mut entries = Vec::new();
        for page in 1..=pages {
            match self.client.roster_page(group_id, page).await {
                Ok(Fetched::Ready(html)) => {
                    let found = extract::student_entries(&html);
                    info!("Group {} page {}/{}: {} students", group_id, page, pages, found.len());
                    entries.extend(found);
                }
                Ok(Fetched::Unavailable(status)) => {
                    warn!("Skipping group {} page {}: {}", group_id, page, status);
                }
                Err(e) => {
                    error!("Skipping group {} page {}: {:#}", group_id, page, e);
                }
            }
        }
        entries
    }

    /// `None` when the student's course list cannot be read; the student is
    /// then left out of the output.
    async fn fetch_student(
        &self,
        entry: &StudentEntry,
        membership: &mut CourseMembership,
    ) -> Option<StudentRecord> {
        let body = match self.client.course_list(&entry.id).await {
            Ok(Fetched::Ready(body)) => body,
            Ok(Fetched::Unavailable(status)) => {
                warn!("Courses of {} ({}) unavailable: {}", entry.name, entry.id, status);
                return None;
            }
            Err(e) => {
                error!("Courses of {} ({}) failed: {:#}", entry.name, entry.id, e);
                return None;
            }
        };
        let courses = match extract::course_entries(&body) {
            Ok(Some(courses)) => courses,
            Ok(None) => {
                warn!("No course list for {} ({})", entry.name, entry.id);
                return None;
            }
            Err(e) => {
                warn!("Unreadable course list for {} ({}): {:#}", entry.name, entry.id, e);
                return None;
            }
        };

        let mut student = StudentRecord::new(&entry.id, &entry.name);
        for course in courses {
            let sections = Course::parse(&course.id, &course.text, &self.days, self.slot_count);
            if let Some(first) = sections.first() {
                membership.record_sighting(&course.id, &first.name, &student.id);
            }
            student.courses.extend(sections);
        }
        Some(student)
    }
}
