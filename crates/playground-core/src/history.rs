//! Grouping saved chats by calendar day for history listings.

use chrono::{Duration, Local, NaiveDate};

use crate::ChatState;

/// Chats created on the same day, newest first.
#[derive(Debug)]
pub struct DateGroup<'a> {
    /// "Today", "Yesterday" or e.g. "Mar 4, 2025".
    pub label: String,

    /// ISO date (`YYYY-MM-DD`).
    pub date_key: String,

    pub items: Vec<&'a ChatState>,
}

/// Group chats by local creation date relative to today.
pub fn group_by_date(chats: &[ChatState]) -> Vec<DateGroup<'_>> {
    group_by_date_on(chats, Local::now().date_naive())
}

/// Same as [`group_by_date`] with an explicit "today".
pub fn group_by_date_on(chats: &[ChatState], today: NaiveDate) -> Vec<DateGroup<'_>> {
    let mut sorted: Vec<&ChatState> = chats.iter().collect();
    sorted.sort_by(|a, b| b.created_at.cmp(&a.created_at));

    let mut groups: Vec<DateGroup<'_>> = Vec::new();
    for chat in sorted {
        let date = chat.created_at.with_timezone(&Local).date_naive();
        let date_key = date.format("%Y-%m-%d").to_string();
        match groups.last_mut() {
            Some(group) if group.date_key == date_key => group.items.push(chat),
            _ => groups.push(DateGroup {
                label: format_date_label(date, today),
                date_key,
                items: vec![chat],
            }),
        }
    }
    groups
}

/// Human label for a day.
pub fn format_date_label(date: NaiveDate, today: NaiveDate) -> String {
    if date == today {
        "Today".to_string()
    } else if date == today - Duration::days(1) {
        "Yesterday".to_string()
    } else {
        date.format("%b %-d, %Y").to_string()
    }
}
