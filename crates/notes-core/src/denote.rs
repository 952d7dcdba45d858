//! Creation identifiers and `<id>--<title>__<tags>.md` filenames.

use std::sync::OnceLock;

use regex::Regex;
use time::OffsetDateTime;

use crate::{dates, Error, Record, Result};

pub const EXTENSION: &str = ".md";

fn filename_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(\d{8}T\d{6})--([^_]+)(?:__(.+))?$").unwrap())
}

/// Second-precision local timestamp, e.g. `20240601T093000`.
///
/// Two calls within the same second return the same value.
pub fn new_creation_id() -> String {
    format_creation_id(dates::now())
}

pub fn format_creation_id(at: OffsetDateTime) -> String {
    format!(
        "{:04}{:02}{:02}T{:02}{:02}{:02}",
        at.year(),
        u8::from(at.month()),
        at.day(),
        at.hour(),
        at.minute(),
        at.second()
    )
}

/// `YYYY-MM-DD` portion of a creation id, written as the header `date` key.
pub fn date_from_id(id: &str) -> Option<String> {
    let digits = id.get(0..8)?;
    if !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some(format!("{}-{}-{}", &digits[0..4], &digits[4..6], &digits[6..8]))
}

pub fn slugify(title: &str) -> String {
    slug::slugify(title)
}

/// Best-effort display title from a slug: `my-note` becomes `My Note`.
pub fn unslugify(slug: &str) -> String {
    slug.split('-')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn compose_filename(id: &str, title: &str, tags: &[String]) -> String {
    let mut name = format!("{id}--{}", slugify(title));
    if !tags.is_empty() {
        let cleaned: Vec<&str> = tags
            .iter()
            .map(|t| t.strip_prefix('@').unwrap_or(t))
            .collect();
        name.push_str("__");
        name.push_str(&cleaned.join("_"));
    }
    name.push_str(EXTENSION);
    name
}

/// Recovers id, an approximate title and the tags from a filename.
pub fn parse_filename(name: &str) -> Result<Record> {
    let stem = name.strip_suffix(EXTENSION).unwrap_or(name);
    let caps = filename_re()
        .captures(stem)
        .ok_or_else(|| Error::MalformedFilename(name.to_string()))?;
    let tags = caps
        .get(3)
        .map(|m| m.as_str().split('_').map(str::to_string).collect())
        .unwrap_or_default();
    Ok(Record::new(&caps[1], unslugify(&caps[2]), tags))
}

/// Tags encoded in the filename, without reading the file.
pub fn filename_tags(name: &str) -> Vec<&str> {
    let stem = name.strip_suffix(EXTENSION).unwrap_or(name);
    match stem.split_once("__") {
        Some((_, tags)) => tags.split('_').filter(|t| !t.is_empty()).collect(),
        None => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    fn tags(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn creation_id_is_fixed_width() {
        let id = format_creation_id(datetime!(2024-06-01 09:05:03 UTC));
        assert_eq!(id, "20240601T090503");
        assert_eq!(date_from_id(&id).as_deref(), Some("2024-06-01"));
        assert_eq!(date_from_id("bogus"), None);
    }

    #[test]
    fn slugify_collapses_punctuation() {
        assert_eq!(slugify("  Fix the: Build!! (again) "), "fix-the-build-again");
        assert_eq!(unslugify("fix-the-build"), "Fix The Build");
    }

    #[test]
    fn slugify_transliterates_accents() {
        assert_eq!(slugify("Café au lait"), "cafe-au-lait");
        let name = compose_filename("20240601T090000", "Crème brûlée", &tags(&["recipe"]));
        assert_eq!(name, "20240601T090000--creme-brulee__recipe.md");
        assert!(parse_filename(&name).is_ok());
    }

    #[test]
    fn filename_strips_ownership_marker() {
        let name = compose_filename("20240601T090503", "Call Bob", &tags(&["task", "@bob"]));
        assert_eq!(name, "20240601T090503--call-bob__task_bob.md");
        let bare = compose_filename("20240601T090503", "Idea", &[]);
        assert_eq!(bare, "20240601T090503--idea.md");
    }

    #[test]
    fn filename_round_trip_is_weak_on_title() {
        let title = "Plan the Q3 offsite";
        let name = compose_filename("20240601T090503", title, &tags(&["project", "work"]));
        let rec = parse_filename(&name).unwrap();
        assert_eq!(rec.id, "20240601T090503");
        assert_eq!(rec.title, unslugify(&slugify(title)));
        assert_eq!(rec.tags, tags(&["project", "work"]));
        assert_eq!(rec.kind(), crate::Kind::Project);
    }

    #[test]
    fn malformed_filenames_are_rejected() {
        assert!(matches!(
            parse_filename("README.md"),
            Err(Error::MalformedFilename(_))
        ));
        assert!(parse_filename("2024-06-01--x.md").is_err());
    }

    #[test]
    fn filename_tags_reads_tag_segment() {
        assert_eq!(
            filename_tags("20240601T090503--x__task_home.md"),
            vec!["task", "home"]
        );
        assert!(filename_tags("20240601T090503--x.md").is_empty());
    }
}
