//! Show metadata merge engine.
//!
//! Merge rules:
//! 1. TheTVDB provides the base record, already resolved to a language.
//! 2. trakt overlays schedule, rating, country and first airing. Without a
//!    trakt link those fields are reset to sentinels.
//! 3. Flags saved on Hexagon win over the defaults of a fresh record.

use chrono::{DateTime, NaiveTime, Timelike, Utc, Weekday};
use seriesguide_core::types::ShowStatus;

use crate::hexagon::CloudShow;
use crate::trakt::TraktShow;
use crate::tvdb::{PosterCandidate, TvdbSeries};
use crate::ShowRecord;

/// Runtime in minutes used when the provider value is not a number.
pub const DEFAULT_RUNTIME: i32 = 60;

/// A show fetched from the primary source.
#[derive(Debug, Clone)]
pub struct PrimaryShow {
    pub tvdb_id: i64,
    pub series: TvdbSeries,
    /// The requested language, kept even if `series` is in the fallback language.
    pub language: String,
    /// No title existed in the requested language.
    pub no_translation: bool,
    pub poster: Option<String>,
}

/// The trakt side of a linked show.
#[derive(Debug, Clone)]
pub struct TraktDetails {
    pub trakt_id: i64,
    pub summary: TraktShow,
}

pub fn merge_show(
    primary: &PrimaryShow,
    secondary: Option<&TraktDetails>,
    cloud: Option<&CloudShow>,
) -> ShowRecord {
    let series = &primary.series;
    let mut show = ShowRecord {
        tvdb_id: primary.tvdb_id,
        slug: series.slug.clone(),
        title: series
            .series_name
            .as_deref()
            .map(str::trim)
            .unwrap_or_default()
            .to_string(),
        overview: translate_overview(
            &primary.language,
            primary.no_translation,
            series.overview.as_deref(),
        ),
        network: series.network.clone(),
        content_rating: series.rating.clone(),
        imdb_id: series.imdb_id.clone(),
        genres: series
            .genre
            .iter()
            .flatten()
            .map(|g| g.trim())
            .filter(|g| !g.is_empty())
            .map(String::from)
            .collect(),
        language: primary.language.clone(),
        runtime: parse_runtime(series.runtime.as_deref()),
        status: series
            .status
            .as_deref()
            .map(ShowStatus::from_tvdb)
            .unwrap_or_default(),
        rating: 0.0,
        trakt_id: None,
        poster: primary.poster.clone(),
        last_edited: series.last_updated.unwrap_or(0),
        release_time: -1,
        release_weekday: -1,
        release_timezone: None,
        country: None,
        first_aired: String::new(),
        favorite: false,
        notify: true,
        hidden: false,
    };

    if let Some(trakt) = secondary {
        let summary = &trakt.summary;
        show.trakt_id = summary
            .ids
            .as_ref()
            .and_then(|ids| ids.trakt)
            .or(Some(trakt.trakt_id));
        if let Some(airs) = &summary.airs {
            show.release_time = parse_release_time(airs.time.as_deref());
            show.release_weekday = parse_release_weekday(airs.day.as_deref());
            show.release_timezone = airs.timezone.clone();
        }
        show.country = summary.country.clone();
        show.first_aired = parse_first_aired(summary.first_aired.as_deref());
        show.rating = summary.rating.unwrap_or(0.0);
    }

    if let Some(cloud) = cloud {
        if let Some(favorite) = cloud.is_favorite {
            show.favorite = favorite;
        }
        if let Some(notify) = cloud.notify {
            show.notify = notify;
        }
        if let Some(hidden) = cloud.is_hidden {
            show.hidden = hidden;
        }
    }

    show
}

/// Overview to store for a show. Prepends a note if the requested language
/// had no translation or no overview.
pub fn translate_overview(language: &str, no_translation: bool, overview: Option<&str>) -> String {
    let overview = overview.map(str::trim).filter(|o| !o.is_empty());
    match overview {
        Some(text) if !no_translation => text.to_string(),
        Some(text) => format!("{}\n\n{text}", no_translation_note(language)),
        None => no_translation_note(language),
    }
}

pub fn no_translation_note(language: &str) -> String {
    format!("{} translation not available on TheTVDB.", language_name(language))
}

/// English name of a TheTVDB language code, or the code itself.
pub fn language_name(code: &str) -> &str {
    match code {
        "cs" => "Czech",
        "da" => "Danish",
        "de" => "German",
        "el" => "Greek",
        "en" => "English",
        "es" => "Spanish",
        "fi" => "Finnish",
        "fr" => "French",
        "he" => "Hebrew",
        "hr" => "Croatian",
        "hu" => "Hungarian",
        "it" => "Italian",
        "ja" => "Japanese",
        "ko" => "Korean",
        "nl" => "Dutch",
        "no" => "Norwegian",
        "pl" => "Polish",
        "pt" => "Portuguese",
        "ru" => "Russian",
        "sl" => "Slovenian",
        "sv" => "Swedish",
        "tr" => "Turkish",
        "zh" => "Chinese",
        other => other,
    }
}

/// File name of the best rated poster. Unrated posters rank lowest, earlier
/// posters win ties, and without any rating the first poster is used.
pub fn select_poster(posters: &[PosterCandidate]) -> Option<String> {
    let mut best: Option<(&PosterCandidate, f64)> = None;
    for poster in posters {
        let Some(rating) = poster.average_rating().filter(|r| !r.is_nan()) else {
            continue;
        };
        if best.is_none_or(|(_, highest)| rating > highest) {
            best = Some((poster, rating));
        }
    }
    best.map(|(poster, _)| poster)
        .or_else(|| posters.first())
        .map(|poster| poster.file_name.clone())
}

pub fn parse_runtime(runtime: Option<&str>) -> i32 {
    runtime
        .and_then(|r| r.trim().parse().ok())
        .unwrap_or(DEFAULT_RUNTIME)
}

/// `HH:MM` to `hour * 100 + minute`, -1 if missing or invalid.
pub fn parse_release_time(time: Option<&str>) -> i32 {
    time.and_then(|t| NaiveTime::parse_from_str(t.trim(), "%H:%M").ok())
        .map(|t| (t.hour() * 100 + t.minute()) as i32)
        .unwrap_or(-1)
}

/// ISO weekday (1 = Monday), 0 for "Daily", -1 if missing or invalid.
pub fn parse_release_weekday(day: Option<&str>) -> i32 {
    match day.map(str::trim) {
        Some(d) if d.eq_ignore_ascii_case("daily") => 0,
        Some(d) => d
            .parse::<Weekday>()
            .map(|w| w.number_from_monday() as i32)
            .unwrap_or(-1),
        None => -1,
    }
}

/// Normalize to a UTC timestamp with milliseconds, empty if missing or invalid.
pub fn parse_first_aired(first_aired: Option<&str>) -> String {
    first_aired
        .and_then(|s| DateTime::parse_from_rfc3339(s.trim()).ok())
        .map(|dt| {
            dt.with_timezone(&Utc)
                .format("%Y-%m-%dT%H:%M:%S%.3fZ")
                .to_string()
        })
        .unwrap_or_default()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::trakt::{TraktAirs, TraktIds};
    use crate::tvdb::RatingsInfo;

    fn series() -> TvdbSeries {
        TvdbSeries {
            id: 280619,
            series_name: Some(" The Expanse ".into()),
            slug: Some("the-expanse".into()),
            overview: Some("Two hundred years in the future...".into()),
            network: Some("Syfy".into()),
            rating: Some("TV-14".into()),
            imdb_id: Some("tt3230854".into()),
            genre: Some(vec!["Drama".into(), "Science-Fiction".into(), " ".into()]),
            runtime: Some("45".into()),
            status: Some("Ended".into()),
            last_updated: Some(1_600_000_000),
        }
    }

    pub(crate) fn primary() -> PrimaryShow {
        PrimaryShow {
            tvdb_id: 280619,
            series: series(),
            language: "en".into(),
            no_translation: false,
            poster: Some("posters/280619-1.jpg".into()),
        }
    }

    pub(crate) fn trakt() -> TraktDetails {
        TraktDetails {
            trakt_id: 77199,
            summary: TraktShow {
                title: Some("The Expanse".into()),
                ids: Some(TraktIds {
                    trakt: Some(77199),
                    ..Default::default()
                }),
                airs: Some(TraktAirs {
                    day: Some("Wednesday".into()),
                    time: Some("21:00".into()),
                    timezone: Some("America/New_York".into()),
                }),
                country: Some("us".into()),
                first_aired: Some("2015-12-15T02:00:00Z".into()),
                rating: Some(8.4),
            },
        }
    }

    pub(crate) fn sample_record() -> ShowRecord {
        merge_show(&primary(), Some(&trakt()), None)
    }

    fn poster(name: &str, average: Option<f64>) -> PosterCandidate {
        PosterCandidate {
            file_name: name.into(),
            ratings_info: Some(RatingsInfo {
                average,
                count: Some(1),
            }),
        }
    }

    #[test]
    fn merge_with_trakt_overlays_schedule() {
        let show = sample_record();
        assert_eq!(show.title, "The Expanse");
        assert_eq!(show.genres, vec!["Drama", "Science-Fiction"]);
        assert_eq!(show.runtime, 45);
        assert_eq!(show.status, ShowStatus::Ended);
        assert_eq!(show.trakt_id, Some(77199));
        assert_eq!(show.release_time, 2100);
        assert_eq!(show.release_weekday, 3);
        assert_eq!(show.release_timezone.as_deref(), Some("America/New_York"));
        assert_eq!(show.first_aired, "2015-12-15T02:00:00.000Z");
        assert_eq!(show.rating, 8.4);
        assert_eq!(show.overview, "Two hundred years in the future...");
    }

    #[test]
    fn merge_without_trakt_uses_sentinels() {
        let show = merge_show(&primary(), None, None);
        assert_eq!(show.trakt_id, None);
        assert_eq!(show.release_time, -1);
        assert_eq!(show.release_weekday, -1);
        assert_eq!(show.first_aired, "");
        assert_eq!(show.rating, 0.0);
        assert_eq!(show.country, None);
        assert_eq!(show.release_timezone, None);
    }

    #[test]
    fn trakt_summary_without_ids_keeps_resolved_id() {
        let mut details = trakt();
        details.summary.ids = None;
        details.summary.rating = None;
        let show = merge_show(&primary(), Some(&details), None);
        assert_eq!(show.trakt_id, Some(77199));
        assert_eq!(show.rating, 0.0);
    }

    #[test]
    fn cloud_flags_take_precedence() {
        let fresh = merge_show(&primary(), None, None);
        assert!(!fresh.favorite);
        assert!(fresh.notify);
        assert!(!fresh.hidden);

        let cloud = CloudShow {
            tvdb_id: 280619,
            is_favorite: Some(true),
            notify: Some(false),
            is_hidden: None,
            language: Some("de".into()),
        };
        let show = merge_show(&primary(), None, Some(&cloud));
        assert!(show.favorite);
        assert!(!show.notify);
        assert!(!show.hidden);
        // The cloud language only picks what is fetched, it is not merged.
        assert_eq!(show.language, "en");
    }

    #[test]
    fn missing_translation_keeps_requested_language() {
        let mut primary = primary();
        primary.language = "de".into();
        primary.no_translation = true;
        let show = merge_show(&primary, None, None);
        assert_eq!(show.language, "de");
        assert!(show.overview.starts_with(&no_translation_note("de")));
        assert!(show.overview.ends_with("\n\nTwo hundred years in the future..."));
    }

    #[test]
    fn overview_note() {
        assert_eq!(translate_overview("en", false, Some("Text")), "Text");
        assert_eq!(
            translate_overview("de", false, Some("  ")),
            "German translation not available on TheTVDB."
        );
        assert_eq!(
            translate_overview("xx", true, None),
            "xx translation not available on TheTVDB."
        );
    }

    #[test]
    fn runtime_defaults_to_an_hour() {
        assert_eq!(parse_runtime(Some("45")), 45);
        assert_eq!(parse_runtime(Some(" 30 ")), 30);
        for bad in ["", "abc", "45 min", "1.5", "99999999999"] {
            assert_eq!(parse_runtime(Some(bad)), DEFAULT_RUNTIME, "{bad:?}");
        }
        assert_eq!(parse_runtime(None), DEFAULT_RUNTIME);
    }

    #[test]
    fn highest_rated_poster_wins() {
        let posters = [
            poster("a.jpg", Some(6.0)),
            poster("b.jpg", None),
            poster("c.jpg", Some(8.5)),
            poster("d.jpg", Some(7.0)),
        ];
        assert_eq!(select_poster(&posters).as_deref(), Some("c.jpg"));
    }

    #[test]
    fn poster_ties_keep_first() {
        let posters = [
            poster("a.jpg", None),
            poster("b.jpg", Some(8.0)),
            poster("c.jpg", Some(8.0)),
        ];
        assert_eq!(select_poster(&posters).as_deref(), Some("b.jpg"));
    }

    #[test]
    fn poster_without_ratings() {
        let posters = [
            poster("a.jpg", None),
            PosterCandidate {
                file_name: "b.jpg".into(),
                ratings_info: None,
            },
        ];
        assert_eq!(select_poster(&posters).as_deref(), Some("a.jpg"));
        assert_eq!(select_poster(&[]), None);
    }

    #[test]
    fn selected_poster_is_rated_at_least_as_high_as_all_others() {
        let ratings = [3.0, 9.1, 0.0, 9.1, 4.4, 7.0];
        let posters: Vec<_> = ratings
            .iter()
            .enumerate()
            .map(|(i, r)| poster(&format!("{i}.jpg"), Some(*r)))
            .collect();
        let selected = select_poster(&posters).unwrap();
        let selected = posters.iter().find(|p| p.file_name == selected).unwrap();
        let best = selected.average_rating().unwrap();
        assert!(posters.iter().all(|p| p.average_rating().unwrap() <= best));
        assert_eq!(selected.file_name, "1.jpg");
    }

    #[test]
    fn release_time_and_weekday() {
        assert_eq!(parse_release_time(Some("21:00")), 2100);
        assert_eq!(parse_release_time(Some("08:30")), 830);
        assert_eq!(parse_release_time(Some("9pm")), -1);
        assert_eq!(parse_release_time(None), -1);

        assert_eq!(parse_release_weekday(Some("Monday")), 1);
        assert_eq!(parse_release_weekday(Some("Sunday")), 7);
        assert_eq!(parse_release_weekday(Some("Daily")), 0);
        assert_eq!(parse_release_weekday(Some("Someday")), -1);
        assert_eq!(parse_release_weekday(None), -1);
    }

    #[test]
    fn first_aired_is_normalized_to_utc() {
        assert_eq!(
            parse_first_aired(Some("2011-04-17T21:00:00-04:00")),
            "2011-04-18T01:00:00.000Z"
        );
        assert_eq!(parse_first_aired(Some("2011-04-17")), "");
        assert_eq!(parse_first_aired(None), "");
    }
}
