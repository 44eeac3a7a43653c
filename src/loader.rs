//! Locating and loading the contacts file.
//!
//! Candidates are tried strictly in order, one at a time. Any failure to read
//! or validate a candidate moves on to the next; running out of candidates is
//! the only terminal error.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use log::{debug, info, warn};
use reqwest::blocking::Client;
use reqwest::Url;
use thiserror::Error;

use crate::contact::{AddressBook, ContactDocument};

/// Default candidate locations, relative to the base directory or remote base.
pub const DEFAULT_CANDIDATES: [&str; 6] = [
    "../test_addressbook/ex_contacts.json",
    "../user_address_book/contacts.json",
    "../contacts.json",
    "test_addressbook/ex_contacts.json",
    "user_address_book/contacts.json",
    "contacts.json",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Locator {
    File(PathBuf),
    Url(Url),
}

impl Locator {
    /// Interpret a user-supplied locator: http(s) URLs stay URLs, anything else is a path.
    pub fn parse(raw: &str) -> Self {
        match Url::parse(raw) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => Locator::Url(url),
            _ => Locator::File(PathBuf::from(raw)),
        }
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Locator::File(path) => write!(f, "{}", path.display()),
            Locator::Url(url) => write!(f, "{}", url),
        }
    }
}

/// Build the candidate list. Relative entries resolve against `remote_base`
/// when one is configured, otherwise against `base_dir`.
pub fn candidate_locators(
    candidates: &[String],
    base_dir: &Path,
    remote_base: Option<&Url>,
) -> Result<Vec<Locator>> {
    candidates
        .iter()
        .map(|candidate| match remote_base {
            Some(base) => base
                .join(candidate)
                .map(Locator::Url)
                .with_context(|| format!("invalid candidate `{}` for {}", candidate, base)),
            None => Ok(match Locator::parse(candidate) {
                Locator::File(path) if path.is_relative() => Locator::File(base_dir.join(path)),
                other => other,
            }),
        })
        .collect()
}

/// Source of candidate bodies.
pub trait Fetch {
    fn fetch(&self, locator: &Locator) -> Result<String>;
}

/// Reads local files directly and fetches URLs with a blocking HTTP client.
pub struct SourceFetcher {
    http: Client,
}

impl SourceFetcher {
    pub fn new() -> Result<Self> {
        let http = Client::builder()
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self { http })
    }
}

impl Fetch for SourceFetcher {
    fn fetch(&self, locator: &Locator) -> Result<String> {
        match locator {
            Locator::File(path) => fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display())),
            Locator::Url(url) => {
                let response = self
                    .http
                    .get(url.clone())
                    .send()
                    .with_context(|| format!("request to {} failed", url))?;
                let status = response.status();
                if !status.is_success() {
                    bail!("{} answered with status {}", url, status);
                }
                response
                    .text()
                    .with_context(|| format!("failed to read body from {}", url))
            }
        }
    }
}

#[derive(Debug)]
pub struct Resolved<T> {
    pub locator: Locator,
    pub value: T,
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("no contacts file found (tried {} locations)", .tried.len())]
    Exhausted { tried: Vec<Locator> },
}

impl LoadError {
    pub fn tried(&self) -> &[Locator] {
        match self {
            LoadError::Exhausted { tried } => tried,
        }
    }

    /// User-facing guidance shown in place of the table.
    pub fn guidance(&self) -> String {
        let mut text = String::from(
            "Contacts file not found. Run the assistant bot first so it writes its \
             address book, then start this viewer again.",
        );
        text.push_str("\n\nLocations tried:");
        for locator in self.tried() {
            text.push_str("\n  ");
            text.push_str(&locator.to_string());
        }
        text
    }
}

/// Return the first candidate whose body `validate` accepts.
pub fn resolve_first<T, F>(
    candidates: &[Locator],
    fetcher: &dyn Fetch,
    mut validate: F,
) -> Result<Resolved<T>, LoadError>
where
    F: FnMut(&str) -> Result<T>,
{
    for locator in candidates {
        let body = match fetcher.fetch(locator) {
            Ok(body) => body,
            Err(err) => {
                debug!("skipping {}: {:#}", locator, err);
                continue;
            }
        };
        match validate(&body) {
            Ok(value) => {
                return Ok(Resolved {
                    locator: locator.clone(),
                    value,
                })
            }
            Err(err) => {
                warn!("skipping {}: {:#}", locator, err);
            }
        }
    }

    Err(LoadError::Exhausted {
        tried: candidates.to_vec(),
    })
}

/// Load the address book from the first usable candidate.
pub fn load_address_book(
    candidates: &[Locator],
    fetcher: &dyn Fetch,
) -> Result<Resolved<AddressBook>, LoadError> {
    let Resolved { locator, value } = resolve_first(candidates, fetcher, |body| {
        ContactDocument::parse(body).context("not a contacts JSON object")
    })?;
    if !value.duplicates.is_empty() {
        warn!(
            "{} repeats {} contact name(s); later records won",
            locator,
            value.duplicates.len()
        );
    }

    let book = value.into_book();
    if book.is_empty() {
        warn!("{} holds no contacts", locator);
    }
    info!("loaded {} contacts from {}", book.len(), locator);
    Ok(Resolved {
        locator,
        value: book,
    })
}
