// File: ./src/cli.rs
// `generate` scrapes the portal into two tables, `translate` names their ids
use crate::client::PortalClient;
use crate::config::Config;
use crate::prompt::prompt_credentials;
use crate::roster::{InvalidCredentials, RosterAggregator, ScrapeResult};
use crate::storage::TabularStore;
use crate::translator::translate_files;
use anyhow::{Result, bail};
use std::io::{self, BufRead, Write};
use tracing::info;

const USAGE: &str = "\
Usage: schedscrape <command>...

Commands (run in the order given):
  generate    log in, scrape every configured roster, write the schedule and course tables
  translate   replace the ids in both tables with names, writing translated copies

Settings are read from ./schedscrape.toml or the per-user config.toml.";

pub async fn run() -> Result<()> {
    let commands: Vec<String> = std::env::args().skip(1).collect();
    if commands.is_empty() {
        eprintln!("{USAGE}");
        return Ok(());
    }
    for command in &commands {
        if !matches!(command.as_str(), "generate" | "translate") {
            bail!("Unknown command: {command}\n\n{USAGE}");
        }
    }

    let config = Config::load()?;
    for command in &commands {
        match command.as_str() {
            "generate" => {
                let stdin = io::stdin();
                generate(&config, &mut stdin.lock(), &mut io::stdout()).await?;
            }
            _ => translate(&config)?,
        }
    }
    Ok(())
}

/// Prompts until the portal accepts the credentials, then writes both tables.
pub async fn generate<R: BufRead, W: Write>(
    config: &Config,
    input: &mut R,
    out: &mut W,
) -> Result<ScrapeResult> {
    let result = loop {
        let credentials = prompt_credentials(input, out)?;
        let mut client = PortalClient::new(config)?;
        client.login(&credentials).await?;

        let aggregator = RosterAggregator::new(&client, config)?;
        match aggregator.scrape_all(&config.group_ids).await {
            Ok(result) => break result,
            Err(e) if e.downcast_ref::<InvalidCredentials>().is_some() => {
                info!("{:#}", e);
                writeln!(out, "Invalid credentials!")?;
            }
            Err(e) => return Err(e),
        }
    };

    TabularStore::write_student_schedules(
        &config.output.student_path(),
        &result.students,
        &config.schedule,
    )?;
    TabularStore::write_course_membership(&config.output.course_path(), &result.membership)?;
    Ok(result)
}

pub fn translate(config: &Config) -> Result<()> {
    let paths = &config.output;
    translate_files(
        &paths.course_path(),
        &paths.student_path(),
        &paths.translated_course_path(),
        &paths.translated_student_path(),
        &config.schedule,
    )
}
