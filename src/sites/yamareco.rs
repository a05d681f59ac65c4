//! Yamareco record extraction.
//!
//! Field locations follow the record-detail page layout: the summary `<dl>`
//! pairs (`dt.gps`, `dt.distance`, `dt.up`, `dt.down`), the course-time
//! section, and the detail table whose rows are identified by their heading
//! text rather than position.

use chrono::NaiveDate;
use regex::Regex;
use scraper::Html;
use std::sync::OnceLock;

use crate::adapter::{env_credentials, Credentials, SiteAdapter};
use crate::browser::DynamicSession;
use crate::models::{ActivityRecord, RecentEntry};
use crate::sites::{child_text, first_text, lines_of, selector, text_of};
use crate::units::{parse_float, parse_minutes};

const URL_PREFIX: &str = "https://www.yamareco.com/";
const LOGIN_URL: &str = "https://www.yamareco.com/login.php";

fn date_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\d{4}年\d{1,2}月\d{1,2}日").unwrap())
}

/// Cuts trailing decoration: parenthesized weekday, bracketed trip-type
/// suffix.
fn strip_decoration(text: &str) -> &str {
    let cut = text.find(['（', '(', '[']).unwrap_or(text.len());
    text[..cut].trim()
}

/// Pace relative to the standard course time, when the page itself shows
/// none: `(actual − rest) / standard × 100`, two decimals.
fn derived_pace(actual: Option<&str>, rest: Option<&str>, standard: Option<&str>) -> Option<f64> {
    let actual = parse_minutes(actual?).ok()?;
    let rest = parse_minutes(rest?).ok()?;
    let standard = parse_minutes(standard?).ok()?;
    if standard <= 0 {
        return None;
    }
    let pace = (actual - rest) as f64 / standard as f64 * 100.0;
    Some((pace * 100.0).round() / 100.0)
}

pub struct Yamareco;

impl SiteAdapter for Yamareco {
    fn name(&self) -> &str {
        "yamareco"
    }

    fn url_prefix(&self) -> &str {
        URL_PREFIX
    }

    fn parse_date(&self, text: &str) -> Option<NaiveDate> {
        NaiveDate::parse_from_str(strip_decoration(text), "%Y年%m月%d日").ok()
    }

    fn extract(&self, document: &Html, url: &str) -> ActivityRecord {
        let mut record = ActivityRecord::empty(url);

        record.title = first_text(document, "h1");

        // The record body carries no date of its own; the page title does.
        let title_text = first_text(document, "title").or_else(|| record.title.clone());
        if let Some(text) = title_text {
            if let Some(m) = date_re().find(&text) {
                record.date_text = Some(m.as_str().to_string());
            }
        }
        record.date = record
            .date_text
            .as_deref()
            .and_then(|t| self.parse_date(t));

        if let Some(level) = document
            .select(&selector(
                "div.record-detail-mainimg-bottom-left-info div.level",
            ))
            .next()
            .and_then(|el| el.value().attr("title"))
        {
            let parts: Vec<&str> = level.split(':').collect();
            if parts.len() == 2 {
                record.level = Some(parts[1].trim().to_string());
            }
        }

        record.duration = first_text(document, "dt.gps + dd");

        if let Some(section) = document
            .select(&selector("section.record-detail-content-time"))
            .next()
        {
            record.actual_duration = child_text(section, "dd.time1");
            record.rest_duration = child_text(section, "dd.time2");
            // The gps value reads "--:--" when the uploaded track lacks a
            // planned course time; the time section carries it instead.
            if record.duration.as_deref() == Some("--:--") {
                record.duration = child_text(section, "dd.time3");
            }
        }

        record.distance = first_text(document, "dt.distance + dd");
        record.elevation_gained = first_text(document, "dt.up + dd");
        record.elevation_lost = first_text(document, "dt.down + dd");

        let td = selector("td");
        for row in document.select(&selector("section.record-detail-content-table tr")) {
            let heading = row.text().collect::<String>();
            let Some(cell) = row.select(&td).next() else {
                continue;
            };
            if heading.contains("コース状況") {
                record.course_info = lines_of(cell);
            } else if heading.contains("アクセス") {
                for line in cell.text().flat_map(|t| t.split('\n')) {
                    let line = line.trim();
                    if !line.is_empty()
                        && !line.contains("アクセスを調べる")
                        && !line.contains("my出発地登録")
                    {
                        record.access.push(line.to_string());
                    }
                }
            } else if heading.contains("天候") {
                record.weather = lines_of(cell);
            }
        }

        for caption in document.select(&selector("div.photo-list-wrap-item-caption")) {
            if let Some(text) = text_of(caption) {
                record.photo_captions.push(text);
            }
        }

        record.pace = first_text(document, "div.pace-num").and_then(|t| parse_float(&t));
        if record.pace.is_none() {
            record.pace = derived_pace(
                record.actual_duration.as_deref(),
                record.rest_duration.as_deref(),
                record.duration.as_deref(),
            );
        }

        record.impression = first_text(document, "div.impression-txt");

        record
    }

    fn extract_listing(&self, document: &Html) -> Vec<RecentEntry> {
        let mut entries = Vec::new();
        for block in document.select(&selector("#reclist .block")) {
            let Some(url) = block
                .select(&selector(".title a"))
                .next()
                .and_then(|a| a.value().attr("href"))
                .map(str::to_string)
            else {
                continue;
            };

            let date_text = child_text(block, ".ft")
                .map(|t| strip_decoration(&t).to_string())
                .unwrap_or_default();
            let date = self.parse_date(&date_text);

            let mut level = None;
            'blocks: for el in block.select(&selector(".spr1")) {
                for class in el.value().classes() {
                    if let Some(grade) = class.strip_prefix("spr1-level_") {
                        if ["S", "A", "B", "C", "D"].contains(&grade) {
                            level = Some(grade.to_string());
                            break 'blocks;
                        }
                    }
                }
            }

            entries.push(RecentEntry {
                title: child_text(block, ".title a"),
                date_text,
                date,
                level,
                has_photo: block
                    .select(&selector(".spr1-ico_photo"))
                    .next()
                    .is_some(),
                has_route: block
                    .select(&selector(".spr1-ico_route"))
                    .next()
                    .is_some(),
                duration: None,
                distance: None,
                elevation: None,
                url,
            });
        }
        entries
    }

    fn credentials(&self) -> Option<Credentials> {
        env_credentials("YAMARECO_USER", "YAMARECO_PASSWORD")
    }

    fn login(
        &self,
        session: &dyn DynamicSession,
        credentials: &Credentials,
    ) -> anyhow::Result<()> {
        session.navigate(LOGIN_URL)?;
        session.fill("input[name=username]", &credentials.user)?;
        session.fill("input[name=password]", &credentials.password)?;
        session.click("button[type=submit]")?;
        session.wait_for("a.header-mypage")?;
        Ok(())
    }

    fn article_ready_selector(&self) -> &str {
        "section.record-detail-content-time"
    }
}
