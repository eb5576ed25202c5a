//! Transaction-date parsing and the dense calendar dimension.

use chrono::{Datelike, NaiveDate};

use crate::error::EtlError;
use crate::table::Table;

/// Header layout of the date dimension, in persisted order.
pub const DATE_HEADERS: [&str; 6] = ["date", "year", "month", "day", "weekday", "date_id"];

/// Parse a transaction date. The source dataset writes `M/D/YYYY`; ISO
/// `YYYY-MM-DD` is accepted as well since that is the normalized form.
pub fn parse_transaction_date(raw: &str) -> Result<NaiveDate, EtlError> {
    let s = raw.trim();
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(s, "%m/%d/%Y"))
        .map_err(|_| EtlError::Parse(format!("unparseable date `{raw}`")))
}

/// One row per calendar day from `start` to `end` inclusive, ascending,
/// with a dense 1-based `date_id`. Weekday is 0=Monday..6=Sunday.
pub fn generate_date_dimension(start: NaiveDate, end: NaiveDate) -> Result<Table, EtlError> {
    if end < start {
        return Err(EtlError::InvalidRange { start, end });
    }

    let mut table = Table::new(DATE_HEADERS.iter().map(|h| h.to_string()).collect());
    for (i, day) in start.iter_days().take_while(|d| *d <= end).enumerate() {
        table.rows.push(vec![
            day.format("%Y-%m-%d").to_string(),
            day.year().to_string(),
            day.month().to_string(),
            day.day().to_string(),
            day.weekday().num_days_from_monday().to_string(),
            (i + 1).to_string(),
        ]);
    }
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn accepts_iso_and_source_formats() {
        assert_eq!(parse_transaction_date("2019-01-05").unwrap(), d("2019-01-05"));
        assert_eq!(parse_transaction_date("1/5/2019").unwrap(), d("2019-01-05"));
        assert_eq!(parse_transaction_date(" 03/13/2019 ").unwrap(), d("2019-03-13"));
    }

    #[test]
    fn rejects_other_formats() {
        for bad in ["05.01.2019", "2019/01/05", "Jan 5 2019", ""] {
            assert!(
                matches!(parse_transaction_date(bad), Err(EtlError::Parse(_))),
                "accepted `{bad}`"
            );
        }
    }

    #[test]
    fn single_day_range_has_one_row() {
        let table = generate_date_dimension(d("2023-06-15"), d("2023-06-15")).unwrap();
        assert_eq!(table.rows.len(), 1);
        assert_eq!(
            table.rows[0],
            // 2023-06-15 is a Thursday
            vec!["2023-06-15", "2023", "6", "15", "3", "1"]
        );
    }

    #[test]
    fn end_before_start_is_invalid() {
        let err = generate_date_dimension(d("2023-06-15"), d("2023-06-14")).unwrap_err();
        assert!(matches!(err, EtlError::InvalidRange { .. }), "got: {err:?}");
    }

    #[test]
    fn range_is_dense_ascending_with_valid_weekdays() {
        let start = d("2018-12-28");
        let end = d("2019-01-04");
        let table = generate_date_dimension(start, end).unwrap();

        // (end - start).days + 1 rows
        assert_eq!(table.rows.len(), 8);

        let mut prev: Option<NaiveDate> = None;
        for (i, row) in table.rows.iter().enumerate() {
            let day = d(&row[0]);
            if let Some(p) = prev {
                assert_eq!(day, p.succ_opt().unwrap(), "gap before {day}");
            }
            prev = Some(day);

            let weekday: u32 = row[4].parse().unwrap();
            assert!(weekday <= 6);
            assert_eq!(row[5], (i + 1).to_string());
        }
    }

    #[test]
    fn weekday_is_monday_based() {
        // 2023-01-01 was a Sunday, 2023-01-02 a Monday
        let table = generate_date_dimension(d("2023-01-01"), d("2023-01-02")).unwrap();
        assert_eq!(table.rows[0][4], "6");
        assert_eq!(table.rows[1][4], "0");
    }
}
