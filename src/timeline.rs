//! Render-only grouping of a message list into calendar-date buckets with
//! consecutive-sender flags. Everything here is pure and recomputed on
//! every render.

use chrono::{DateTime, FixedOffset, Local, NaiveDate, TimeZone, Utc};

use crate::state::Message;

#[derive(Debug, Clone, PartialEq)]
pub struct GroupedMessage {
    pub message: Message,
    /// Same sender as the previous message in this bucket.
    pub consecutive: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DayGroup {
    pub date: NaiveDate,
    pub messages: Vec<GroupedMessage>,
}

/// Buckets by calendar date in `tz`, oldest bucket first. Arrival order is
/// preserved inside each bucket, and the consecutive flag compares against
/// the bucket's previous message.
pub fn group_by_day_in<Tz: TimeZone>(messages: &[Message], tz: &Tz) -> Vec<DayGroup> {
    let mut groups: Vec<DayGroup> = Vec::new();
    for message in messages {
        let date = message.created_at.with_timezone(tz).date_naive();
        match groups.iter_mut().find(|group| group.date == date) {
            Some(group) => {
                let consecutive = group
                    .messages
                    .last()
                    .is_some_and(|prev| prev.message.sender_id == message.sender_id);
                group.messages.push(GroupedMessage {
                    message: message.clone(),
                    consecutive,
                });
            }
            None => groups.push(DayGroup {
                date,
                messages: vec![GroupedMessage {
                    message: message.clone(),
                    consecutive: false,
                }],
            }),
        }
    }
    groups.sort_by_key(|group| group.date);
    groups
}

pub fn group_by_day(messages: &[Message]) -> Vec<DayGroup> {
    group_by_day_in(messages, &Local)
}

/// Today and yesterday collapse to fixed labels; any other date renders as
/// day.month.year.
pub fn date_label(date: NaiveDate, today: NaiveDate) -> String {
    if date == today {
        "Сегодня".to_owned()
    } else if today.pred_opt() == Some(date) {
        "Вчера".to_owned()
    } else {
        date.format("%d.%m.%Y").to_string()
    }
}

pub fn date_label_today(date: NaiveDate) -> String {
    date_label(date, Local::now().date_naive())
}

/// Moscow wall clock, the marketplace's display convention.
pub fn format_time_msk(time: DateTime<Utc>) -> String {
    let msk = FixedOffset::east_opt(3 * 3600).expect("UTC+3 is a valid offset");
    format!("{} (МСК)", time.with_timezone(&msk).format("%H:%M"))
}
