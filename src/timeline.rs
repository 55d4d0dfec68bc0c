use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::Serialize;

use crate::models::Photo;

/// One section of the chronological grid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DaySection {
    pub day: NaiveDate,
    pub photos: Vec<Photo>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DayCount {
    pub day: NaiveDate,
    pub count: usize,
}

/// Groups photos by UTC capture day, newest day first and newest photo first
/// within a day.
pub fn group_by_day(photos: &[Photo]) -> Vec<DaySection> {
    let mut days: BTreeMap<NaiveDate, Vec<Photo>> = BTreeMap::new();
    for photo in photos {
        days.entry(photo.created_at.date_naive())
            .or_default()
            .push(photo.clone());
    }

    days.into_iter()
        .rev()
        .map(|(day, mut photos)| {
            photos.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            DaySection { day, photos }
        })
        .collect()
}

pub fn day_counts(photos: &[Photo]) -> Vec<DayCount> {
    let mut counts: BTreeMap<NaiveDate, usize> = BTreeMap::new();
    for photo in photos {
        *counts.entry(photo.created_at.date_naive()).or_default() += 1;
    }

    counts
        .into_iter()
        .rev()
        .map(|(day, count)| DayCount { day, count })
        .collect()
}

pub fn favorites(photos: &[Photo]) -> Vec<Photo> {
    photos.iter().filter(|p| p.favorite).cloned().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn photo_at(id: &str, day: u32, hour: u32) -> Photo {
        Photo::new(
            id,
            format!("/media/{}.jpg", id),
            Utc.with_ymd_and_hms(2024, 3, day, hour, 0, 0).unwrap(),
        )
    }

    #[test]
    fn test_group_by_day_newest_first() {
        let photos = vec![
            photo_at("a", 1, 8),
            photo_at("b", 2, 9),
            photo_at("c", 1, 20),
            photo_at("d", 2, 7),
        ];

        let sections = group_by_day(&photos);

        assert_eq!(sections.len(), 2);
        assert_eq!(sections[0].day, NaiveDate::from_ymd_opt(2024, 3, 2).unwrap());
        let first: Vec<&str> = sections[0].photos.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(first, vec!["b", "d"]);
        let second: Vec<&str> = sections[1].photos.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(second, vec!["c", "a"]);
    }

    #[test]
    fn test_day_counts() {
        let photos = vec![photo_at("a", 1, 8), photo_at("b", 3, 9), photo_at("c", 1, 20)];

        let counts = day_counts(&photos);

        assert_eq!(
            counts,
            vec![
                DayCount {
                    day: NaiveDate::from_ymd_opt(2024, 3, 3).unwrap(),
                    count: 1
                },
                DayCount {
                    day: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
                    count: 2
                },
            ]
        );
        assert!(day_counts(&[]).is_empty());
    }

    #[test]
    fn test_favorites_keep_order() {
        let mut photos = vec![photo_at("a", 1, 8), photo_at("b", 2, 9), photo_at("c", 3, 10)];
        photos[0].favorite = true;
        photos[2].favorite = true;

        let ids: Vec<String> = favorites(&photos).into_iter().map(|p| p.id).collect();
        assert_eq!(ids, vec!["a".to_string(), "c".to_string()]);
    }
}
