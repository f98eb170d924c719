//! Weekly timetable grid built from slot records

use chrono::{NaiveTime, Weekday};

use crate::models::Record;

const WEEK: [Weekday; 7] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
    Weekday::Sun,
];

/// Day names or 1..7 with Monday as 1
pub fn parse_weekday(text: &str) -> Option<Weekday> {
    let text = text.trim().to_lowercase();
    if let Ok(n) = text.parse::<usize>() {
        return (1..=7).contains(&n).then(|| WEEK[n - 1]);
    }
    if text.len() < 3 {
        return None;
    }
    WEEK.iter()
        .copied()
        .find(|day| day_name(*day).to_lowercase().starts_with(&text))
}

pub fn day_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

fn parse_time(text: &str) -> Option<NaiveTime> {
    let text = text.trim();
    NaiveTime::parse_from_str(text, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(text, "%H:%M"))
        .ok()
}

#[derive(Debug, Clone, PartialEq)]
pub struct TimetableSlot {
    pub id: i64,
    pub day: Weekday,
    pub start: NaiveTime,
    pub end: NaiveTime,
    pub class_id: Option<i64>,
    pub class_name: String,
    pub subject_name: String,
    pub teacher_name: String,
    pub room: String,
}

impl TimetableSlot {
    pub fn from_record(record: &Record) -> Option<TimetableSlot> {
        let day_text = match record.text("day") {
            d if d.is_empty() => record.text("day_of_week"),
            d => d,
        };

        Some(TimetableSlot {
            id: record.id,
            day: parse_weekday(&day_text)?,
            start: parse_time(&record.text("start_time"))?,
            end: parse_time(&record.text("end_time"))?,
            class_id: record
                .number("class_id")
                .or_else(|| record.number("school_class"))
                .map(|n| n as i64),
            class_name: record.text("class_name"),
            subject_name: record.text("subject_name"),
            teacher_name: record.text("teacher_name"),
            room: record.text("room"),
        })
    }

    fn same_class(&self, other: &TimetableSlot) -> bool {
        match (self.class_id, other.class_id) {
            (Some(a), Some(b)) => a == b,
            _ => !self.class_name.is_empty() && self.class_name == other.class_name,
        }
    }

    fn overlaps(&self, other: &TimetableSlot) -> bool {
        self.day == other.day && self.start < other.end && other.start < self.end
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ClassFilter {
    Id(i64),
    Name(String),
}

impl ClassFilter {
    /// Numbers select by id, anything else by case-insensitive class name
    pub fn parse(text: &str) -> ClassFilter {
        match text.trim().parse::<i64>() {
            Ok(id) => ClassFilter::Id(id),
            Err(_) => ClassFilter::Name(text.trim().to_string()),
        }
    }

    fn accepts(&self, slot: &TimetableSlot) -> bool {
        match self {
            ClassFilter::Id(id) => slot.class_id == Some(*id),
            ClassFilter::Name(name) => slot.class_name.eq_ignore_ascii_case(name),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TimetableGrid {
    /// Days that have at least one slot, Monday first, slots by start time
    pub days: Vec<(Weekday, Vec<TimetableSlot>)>,
    /// Records missing a valid day or time
    pub skipped: usize,
}

impl TimetableGrid {
    pub fn slot_count(&self) -> usize {
        self.days.iter().map(|(_, slots)| slots.len()).sum()
    }

    pub fn day(&self, day: Weekday) -> &[TimetableSlot] {
        self.days
            .iter()
            .find(|(d, _)| *d == day)
            .map(|(_, slots)| slots.as_slice())
            .unwrap_or(&[])
    }

    /// Pairs of slots double-booking the same class, as (earlier id, later id)
    pub fn conflicts(&self) -> Vec<(i64, i64)> {
        let mut conflicts = Vec::new();
        for (_, slots) in &self.days {
            for (i, a) in slots.iter().enumerate() {
                for b in &slots[i + 1..] {
                    if a.same_class(b) && a.overlaps(b) {
                        conflicts.push((a.id, b.id));
                    }
                }
            }
        }
        conflicts
    }
}

pub fn build_grid(records: &[Record], filter: Option<&ClassFilter>) -> TimetableGrid {
    let mut grid = TimetableGrid::default();
    let mut slots: Vec<TimetableSlot> = Vec::new();

    for record in records {
        match TimetableSlot::from_record(record) {
            Some(slot) if filter.map_or(true, |f| f.accepts(&slot)) => slots.push(slot),
            Some(_) => {}
            None => grid.skipped += 1,
        }
    }

    for day in WEEK {
        let mut day_slots: Vec<TimetableSlot> =
            slots.iter().filter(|s| s.day == day).cloned().collect();
        if day_slots.is_empty() {
            continue;
        }
        day_slots.sort_by(|a, b| a.start.cmp(&b.start).then(a.id.cmp(&b.id)));
        grid.days.push((day, day_slots));
    }
    grid
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn slots() -> Vec<Record> {
        vec![
            json!({"id": 1, "day": "Monday", "start_time": "09:00:00", "end_time": "09:40:00",
                   "class_id": 7, "class_name": "7A", "subject_name": "Maths"}),
            json!({"id": 2, "day": "monday", "start_time": "08:00", "end_time": "08:40",
                   "class_id": 7, "class_name": "7A", "subject_name": "English"}),
            json!({"id": 3, "day": 3, "start_time": "10:00", "end_time": "10:40",
                   "class_id": 8, "class_name": "7B", "subject_name": "Science"}),
            json!({"id": 4, "day_of_week": "Mon", "start_time": "09:20", "end_time": "10:00",
                   "class_id": 7, "class_name": "7A", "subject_name": "Art"}),
            json!({"id": 5, "day": "Funday", "start_time": "09:00", "end_time": "10:00"}),
            json!({"id": 6, "day": "Monday", "start_time": "09:00", "end_time": "09:40",
                   "class_id": 8, "class_name": "7B", "subject_name": "History"}),
        ]
        .into_iter()
        .filter_map(Record::from_value)
        .collect()
    }

    #[test]
    fn test_parse_weekday() {
        assert_eq!(parse_weekday("Tuesday"), Some(Weekday::Tue));
        assert_eq!(parse_weekday("wed"), Some(Weekday::Wed));
        assert_eq!(parse_weekday("7"), Some(Weekday::Sun));
        assert_eq!(parse_weekday("0"), None);
        assert_eq!(parse_weekday("m"), None);
    }

    #[test]
    fn test_grid_groups_and_sorts() {
        let grid = build_grid(&slots(), None);
        assert_eq!(grid.skipped, 1);
        assert_eq!(grid.slot_count(), 5);

        let days: Vec<Weekday> = grid.days.iter().map(|(d, _)| *d).collect();
        assert_eq!(days, vec![Weekday::Mon, Weekday::Wed]);

        let monday: Vec<i64> = grid.day(Weekday::Mon).iter().map(|s| s.id).collect();
        assert_eq!(monday, vec![2, 1, 6, 4]);
        assert!(grid.day(Weekday::Fri).is_empty());
    }

    #[test]
    fn test_class_filter() {
        let by_name = build_grid(&slots(), Some(&ClassFilter::parse("7b")));
        assert_eq!(by_name.slot_count(), 2);

        let by_id = build_grid(&slots(), Some(&ClassFilter::parse("7")));
        assert_eq!(by_id.slot_count(), 3);
        assert_eq!(by_id.days.len(), 1);
    }

    #[test]
    fn test_conflicts_only_within_a_class() {
        let grid = build_grid(&slots(), None);
        // Maths 09:00-09:40 and Art 09:20-10:00 overlap for 7A; History is 7B
        assert_eq!(grid.conflicts(), vec![(1, 4)]);
    }
}
