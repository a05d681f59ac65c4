//! YAMAP activity extraction.
//!
//! The activity page is a rendered React tree; counters are keyed by their
//! label text, the rest time is displayed as individual digit elements, and
//! the standard course time never appears directly — it is reconstructed
//! from the recorded time and the pace percentage.

use chrono::NaiveDate;
use scraper::Html;

use crate::adapter::{env_credentials, Credentials, SiteAdapter};
use crate::browser::DynamicSession;
use crate::models::{ActivityRecord, RecentEntry};
use crate::sites::{child_text, first_text, selector, text_of};
use crate::units::{format_minutes, parse_float, parse_minutes};

const URL_PREFIX: &str = "https://yamap.com/";
const SITE_BASE: &str = "https://yamap.com";
const LOGIN_URL: &str = "https://yamap.com/login";

fn strip_decoration(text: &str) -> &str {
    let cut = text.find(['(', '（']).unwrap_or(text.len());
    text[..cut].trim()
}

/// Folds the page's single-digit rest-time elements into hours and minutes.
///
/// One element is a bare minute count, two are a tens/units minute pair,
/// four are hour and minute pairs. Minute overflow rolls into hours.
fn rest_from_digits(digits: &[u32]) -> Option<(i64, i64)> {
    let (mut hours, mut minutes) = match digits {
        [m] => (0i64, *m as i64),
        [m10, m1] => (0, (m10 * 10 + m1) as i64),
        [h10, h1, m10, m1] => ((h10 * 10 + h1) as i64, (m10 * 10 + m1) as i64),
        _ => return None,
    };
    hours += minutes / 60;
    minutes %= 60;
    Some((hours, minutes))
}

/// Standard course time reconstructed from the recorded time and pace:
/// `standard = actual / (pace / 100)`, to the nearest minute.
fn derived_standard(actual: Option<&str>, pace: Option<f64>) -> Option<String> {
    let actual = parse_minutes(actual?).ok()?;
    let pace = pace?;
    if pace <= 0.0 {
        return None;
    }
    let standard = (actual as f64 / (pace / 100.0)).round() as i64;
    Some(format_minutes(standard))
}

pub struct Yamap;

impl SiteAdapter for Yamap {
    fn name(&self) -> &str {
        "yamap"
    }

    fn url_prefix(&self) -> &str {
        URL_PREFIX
    }

    fn parse_date(&self, text: &str) -> Option<NaiveDate> {
        NaiveDate::parse_from_str(strip_decoration(text), "%Y.%m.%d").ok()
    }

    fn extract(&self, document: &Html, url: &str) -> ActivityRecord {
        let mut record = ActivityRecord::empty(url);

        record.title = first_text(document, "h1.ActivityDetailTabLayout__Title");
        record.date_text = first_text(document, "span.ActivityDetailTabLayout__Date")
            .map(|t| strip_decoration(&t).to_string());
        record.date = record
            .date_text
            .as_deref()
            .and_then(|t| self.parse_date(t));
        record.prefecture = first_text(document, "a.ActivityDetailTabLayout__Prefecture");

        for item in document.select(&selector("li.ActivityRecord__Item")) {
            let Some(label) = child_text(item, "span.ActivityRecord__Label") else {
                continue;
            };
            let value = child_text(item, "span.ActivityRecord__Count");
            if label.contains("活動時間") {
                record.actual_duration = value;
            } else if label.contains("距離") {
                record.distance = value;
            } else if label.contains("のぼり") {
                record.elevation_gained = value;
            } else if label.contains("くだり") {
                record.elevation_lost = value;
            }
        }

        let digits: Vec<u32> = document
            .select(&selector(
                "div.CourseTimeItem--rest span.CourseTimeItem__Number",
            ))
            .filter_map(text_of)
            .filter_map(|t| t.parse().ok())
            .collect();
        if let Some((hours, minutes)) = rest_from_digits(&digits) {
            record.rest_duration = Some(format_minutes(hours * 60 + minutes));
        }

        record.pace =
            first_text(document, "span.ActivityPace__Percentage").and_then(|t| parse_float(&t));
        record.duration = derived_standard(record.actual_duration.as_deref(), record.pace);

        for caption in document.select(&selector("p.ImagesGallery__Caption")) {
            if let Some(text) = text_of(caption) {
                record.photo_captions.push(text);
            }
        }

        record.impression = first_text(document, "p.ActivityDescription__Body");

        record
    }

    fn extract_listing(&self, document: &Html) -> Vec<RecentEntry> {
        let mut entries = Vec::new();
        for activity in document.select(&selector("article.MountainActivityItem")) {
            let date_text = child_text(activity, "span.MountainActivityItem__Date")
                .map(|t| strip_decoration(&t).to_string())
                .unwrap_or_default();
            let counters: Vec<String> = activity
                .select(&selector("span.ActivityCounters__Count__Record"))
                .filter_map(text_of)
                .collect();
            let url = activity
                .select(&selector("a.MountainActivityItem__Thumbnail"))
                .next()
                .and_then(|a| a.value().attr("href"))
                .map(|href| format!("{}{}", SITE_BASE, href));

            // Rows without a parseable date or a link are stubs the site
            // injects while content is still loading; they carry nothing.
            let (Some(date), Some(url)) = (self.parse_date(&date_text), url) else {
                continue;
            };

            entries.push(RecentEntry {
                title: child_text(activity, "h3.MountainActivityItem__Heading"),
                date_text,
                date: Some(date),
                level: None,
                has_photo: false,
                has_route: false,
                duration: counters.first().cloned(),
                distance: counters
                    .get(1)
                    .and_then(|t| t.split_whitespace().next().map(str::to_string)),
                elevation: counters
                    .get(2)
                    .and_then(|t| t.split_whitespace().next().map(str::to_string)),
                url,
            });
        }
        entries
    }

    fn is_valid(&self, record: &ActivityRecord) -> bool {
        record.has_core_fields() && !record.photo_captions.is_empty()
    }

    fn credentials(&self) -> Option<Credentials> {
        env_credentials("YAMAP_USER", "YAMAP_PASSWORD")
    }

    fn login(
        &self,
        session: &dyn DynamicSession,
        credentials: &Credentials,
    ) -> anyhow::Result<()> {
        session.navigate(LOGIN_URL)?;
        session.fill("input#email", &credentials.user)?;
        session.fill("input#password", &credentials.password)?;
        session.click("button[type=submit]")?;
        session.wait_for(".UserAvatar")?;
        Ok(())
    }

    fn article_ready_selector(&self) -> &str {
        "li.ActivityRecord__Item"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DETAIL_FIXTURE: &str = r#"
<html>
<body>
<h1 class="ActivityDetailTabLayout__Title">槍ヶ岳 表銀座縦走</h1>
<span class="ActivityDetailTabLayout__Date">2024.08.11 (日)</span>
<a class="ActivityDetailTabLayout__Prefecture" href="/prefectures/20">長野県</a>
<ul>
  <li class="ActivityRecord__Item">
    <span class="ActivityRecord__Label">活動時間</span>
    <span class="ActivityRecord__Count">10:25</span>
  </li>
  <li class="ActivityRecord__Item">
    <span class="ActivityRecord__Label">距離</span>
    <span class="ActivityRecord__Count">24.1 km</span>
  </li>
  <li class="ActivityRecord__Item">
    <span class="ActivityRecord__Label">のぼり</span>
    <span class="ActivityRecord__Count">2,680 m</span>
  </li>
  <li class="ActivityRecord__Item">
    <span class="ActivityRecord__Label">くだり</span>
    <span class="ActivityRecord__Count">1,930 m</span>
  </li>
</ul>
<div class="CourseTimeItem--rest">
  <span class="CourseTimeItem__Number">0</span>
  <span class="CourseTimeItem__Number">1</span>
  <span class="CourseTimeItem__Number">1</span>
  <span class="CourseTimeItem__Number">5</span>
</div>
<span class="ActivityPace__Percentage">90 %</span>
<p class="ImagesGallery__Caption">燕山荘から</p>
<p class="ImagesGallery__Caption">大天井岳</p>
<p class="ImagesGallery__Caption">槍の穂先</p>
<p class="ActivityDescription__Body">最高の縦走日和でした。</p>
</body>
</html>"#;

    #[test]
    fn extracts_detail_fields() {
        let doc = Html::parse_document(DETAIL_FIXTURE);
        let record = Yamap.extract(&doc, "https://yamap.com/activities/1");

        assert_eq!(record.title.as_deref(), Some("槍ヶ岳 表銀座縦走"));
        assert_eq!(record.date_text.as_deref(), Some("2024.08.11"));
        assert_eq!(record.date, NaiveDate::from_ymd_opt(2024, 8, 11));
        assert_eq!(record.prefecture.as_deref(), Some("長野県"));
        assert_eq!(record.actual_duration.as_deref(), Some("10:25"));
        assert_eq!(record.distance.as_deref(), Some("24.1 km"));
        assert_eq!(record.elevation_gained.as_deref(), Some("2,680 m"));
        assert_eq!(record.elevation_lost.as_deref(), Some("1,930 m"));
        assert_eq!(record.rest_duration.as_deref(), Some("1:15"));
        assert_eq!(record.pace, Some(90.0));
        // 625 / 0.9 = 694 minutes
        assert_eq!(record.duration.as_deref(), Some("11:34"));
        assert_eq!(record.photo_captions.len(), 3);
        assert_eq!(record.impression.as_deref(), Some("最高の縦走日和でした。"));
    }

    #[test]
    fn validity_requires_a_photo_caption() {
        let doc = Html::parse_document(DETAIL_FIXTURE);
        let mut record = Yamap.extract(&doc, "https://yamap.com/activities/1");
        assert!(Yamap.is_valid(&record));
        record.photo_captions.clear();
        assert!(!Yamap.is_valid(&record));
    }

    #[test]
    fn rest_digit_aggregation() {
        assert_eq!(rest_from_digits(&[5]), Some((0, 5)));
        assert_eq!(rest_from_digits(&[4, 5]), Some((0, 45)));
        assert_eq!(rest_from_digits(&[0, 1, 1, 5]), Some((1, 15)));
        // minute overflow folds into hours
        assert_eq!(rest_from_digits(&[7, 5]), Some((1, 15)));
        assert_eq!(rest_from_digits(&[0, 1, 7, 5]), Some((2, 15)));
        assert_eq!(rest_from_digits(&[]), None);
        assert_eq!(rest_from_digits(&[1, 2, 3]), None);
    }

    #[test]
    fn standard_duration_from_pace() {
        assert_eq!(derived_standard(Some("5:00"), Some(80.0)).as_deref(), Some("6:15"));
        assert_eq!(derived_standard(Some("5:00"), Some(100.0)).as_deref(), Some("5:00"));
        assert_eq!(derived_standard(Some("5:00"), Some(0.0)), None);
        assert_eq!(derived_standard(None, Some(80.0)), None);
        assert_eq!(derived_standard(Some("5:00"), None), None);
    }

    #[test]
    fn parse_date_strips_weekday() {
        assert_eq!(
            Yamap.parse_date("2024.08.11 (日)"),
            NaiveDate::from_ymd_opt(2024, 8, 11)
        );
        assert_eq!(Yamap.parse_date("2024年08月11日"), None);
    }

    const LISTING_FIXTURE: &str = r#"
<div>
  <article class="MountainActivityItem">
    <a class="MountainActivityItem__Thumbnail" href="/activities/111"></a>
    <h3 class="MountainActivityItem__Heading">槍ヶ岳</h3>
    <span class="MountainActivityItem__Date">2024.08.11 (日)</span>
    <span class="ActivityCounters__Count__Record">10:25</span>
    <span class="ActivityCounters__Count__Record">24.1 km</span>
    <span class="ActivityCounters__Count__Record">2680 m</span>
  </article>
  <article class="MountainActivityItem">
    <h3 class="MountainActivityItem__Heading">リンク無し</h3>
    <span class="MountainActivityItem__Date">2024.08.10 (土)</span>
  </article>
  <article class="MountainActivityItem">
    <a class="MountainActivityItem__Thumbnail" href="/activities/113"></a>
    <h3 class="MountainActivityItem__Heading">日付無し</h3>
  </article>
</div>"#;

    #[test]
    fn extracts_listing_rows() {
        let doc = Html::parse_document(LISTING_FIXTURE);
        let entries = Yamap.extract_listing(&doc);

        assert_eq!(entries.len(), 1);
        let entry = &entries[0];
        assert_eq!(entry.title.as_deref(), Some("槍ヶ岳"));
        assert_eq!(entry.url, "https://yamap.com/activities/111");
        assert_eq!(entry.date, NaiveDate::from_ymd_opt(2024, 8, 11));
        assert_eq!(entry.duration.as_deref(), Some("10:25"));
        assert_eq!(entry.distance.as_deref(), Some("24.1"));
        assert_eq!(entry.elevation.as_deref(), Some("2680"));
    }
}
