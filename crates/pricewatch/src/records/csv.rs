//! Tolerant decoder for the worker's pricing CSV.
//!
//! The worker appends to the CSV while a run is in flight, so the text may end
//! in the middle of a row or inside a quoted field. Nothing here fails: bad
//! cells become `None`, rows without identity columns are dropped.

use std::collections::HashMap;

use crate::records::pricing::DailyPricingRecord;

/// Decodes CSV text into records, in input order.
pub fn decode(text: &str) -> Vec<DailyPricingRecord> {
    let mut rows = parse_rows(text).into_iter();

    let header = match rows.next() {
        Some(header) => header,
        None => return Vec::new(),
    };

    let mut columns: HashMap<String, usize> = HashMap::with_capacity(header.len());
    for (index, name) in header.iter().enumerate() {
        columns.entry(name.trim().to_string()).or_insert(index);
    }

    rows.filter_map(|row| decode_row(&columns, &row)).collect()
}

fn decode_row(columns: &HashMap<String, usize>, row: &[String]) -> Option<DailyPricingRecord> {
    let cell = |name: &str| {
        columns
            .get(name)
            .and_then(|&index| row.get(index))
            .map(|value| value.trim())
            .filter(|value| !value.is_empty())
    };
    let text = |name: &str| cell(name).map(str::to_string);
    let number = |name: &str| cell(name).and_then(parse_number);
    let count = |name: &str| number(name).map(|n| n.trunc() as i64);

    Some(DailyPricingRecord {
        hotel_name: text("hotel_name")?,
        check_in_date: text("check_in_date")?,
        availability: text("availability").unwrap_or_default(),
        total_price: number("total_price"),
        day_offset: count("day_offset").unwrap_or(0),
        total_room_types: count("total_room_types"),
        available_room_types: count("available_room_types"),
        sold_out_room_types: count("sold_out_room_types"),
        property_occupancy_rate: number("property_occupancy_rate"),
        hotel_slug: text("hotel_slug"),
        check_out_date: text("check_out_date"),
        price_per_night: number("price_per_night"),
        scrape_timestamp: text("scrape_timestamp"),
    })
}

fn parse_number(value: &str) -> Option<f64> {
    value.parse::<f64>().ok().filter(|n| n.is_finite())
}

/// Splits CSV text into rows of fields.
///
/// Supports quoted fields with embedded commas, newlines and `""` escapes.
/// A quote that appears mid-field is kept literally. Blank lines are skipped.
fn parse_rows(text: &str) -> Vec<Vec<String>> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);

    let mut rows = Vec::new();
    let mut row: Vec<String> = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut field_started = false;
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            match c {
                '"' if chars.peek() == Some(&'"') => {
                    field.push('"');
                    chars.next();
                }
                '"' => in_quotes = false,
                _ => field.push(c),
            }
            continue;
        }

        match c {
            '"' if !field_started => {
                in_quotes = true;
                field_started = true;
            }
            ',' => {
                row.push(std::mem::take(&mut field));
                field_started = false;
            }
            '\r' if matches!(chars.peek(), Some('\n') | None) => {}
            '\n' => {
                row.push(std::mem::take(&mut field));
                field_started = false;
                push_row(&mut rows, std::mem::take(&mut row));
            }
            _ => {
                field.push(c);
                field_started = true;
            }
        }
    }

    // Unterminated quotes and missing trailing newlines both land here.
    if field_started || !field.is_empty() || !row.is_empty() {
        row.push(field);
        push_row(&mut rows, row);
    }

    rows
}

fn push_row(rows: &mut Vec<Vec<String>>, row: Vec<String>) {
    let blank = row.len() == 1 && row[0].trim().is_empty();
    if !blank {
        rows.push(row);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "hotel_name,check_in_date,availability,total_price,day_offset,total_room_types,available_room_types,sold_out_room_types,property_occupancy_rate";

    #[test]
    fn test_decodes_rows_in_order() {
        let csv = format!(
            "{}\nAlpha Lodge,2026-01-01,available,1200.50,0,4,3,1,25.0\nBeta Inn,2026-01-02,sold_out,,1,2,0,2,100\nGamma House,2026-01-03,available,900,2,,,,\n",
            HEADER
        );

        let records = decode(&csv);
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].hotel_name, "Alpha Lodge");
        assert_eq!(records[0].total_price, Some(1200.5));
        assert_eq!(records[0].total_room_types, Some(4));
        assert_eq!(records[0].property_occupancy_rate, Some(25.0));
        assert_eq!(records[1].hotel_name, "Beta Inn");
        assert!(records[1].is_sold_out());
        assert_eq!(records[1].total_price, None);
        assert_eq!(records[1].day_offset, 1);
        assert_eq!(records[2].hotel_name, "Gamma House");
        assert_eq!(records[2].total_room_types, None);
    }

    #[test]
    fn test_bad_numeric_field_nulls_only_itself() {
        let csv = format!(
            "{}\nAlpha Lodge,2026-01-01,available,abc,3,NaN,2,1,inf\n",
            HEADER
        );

        let records = decode(&csv);
        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert_eq!(record.total_price, None);
        assert_eq!(record.total_room_types, None);
        assert_eq!(record.property_occupancy_rate, None);
        assert_eq!(record.available_room_types, Some(2));
        assert_eq!(record.day_offset, 3);
    }

    #[test]
    fn test_quoted_fields() {
        let csv = "hotel_name,check_in_date,room_names,total_price\n\"Smith, Jones & \"\"Co\"\"\",2026-01-01,\"Double, Twin\",500\r\n";

        let records = decode(csv);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].hotel_name, "Smith, Jones & \"Co\"");
        assert_eq!(records[0].total_price, Some(500.0));
    }

    #[test]
    fn test_quoted_newline_stays_in_field() {
        let csv = "hotel_name,check_in_date\n\"Two\nLines\",2026-01-01\n";
        let records = decode(csv);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].hotel_name, "Two\nLines");
    }

    #[test]
    fn test_columns_decoded_by_name() {
        let csv = "extra,total_price,check_in_date,hotel_name\nignored,750,2026-02-01,Delta Resort\n";
        let records = decode(csv);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].hotel_name, "Delta Resort");
        assert_eq!(records[0].check_in_date, "2026-02-01");
        assert_eq!(records[0].total_price, Some(750.0));
        assert_eq!(records[0].availability, "");
    }

    #[test]
    fn test_rows_missing_identity_are_dropped() {
        let csv = format!(
            "{}\n,2026-01-01,available,100,0,,,,\nAlpha Lodge,,available,100,0,,,,\nBeta Inn,2026-01-01,available,100,0,,,,\n",
            HEADER
        );
        let records = decode(&csv);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].hotel_name, "Beta Inn");
    }

    #[test]
    fn test_day_offset_truncates_and_defaults() {
        let csv = "hotel_name,check_in_date,day_offset\nA,2026-01-01,7.9\nB,2026-01-02,\nC,2026-01-03,soon\n";
        let records = decode(csv);
        assert_eq!(records[0].day_offset, 7);
        assert_eq!(records[1].day_offset, 0);
        assert_eq!(records[2].day_offset, 0);
    }

    #[test]
    fn test_unterminated_quote_does_not_panic() {
        let csv = "hotel_name,check_in_date\nAlpha,2026-01-01\n\"Beta, partial";
        let records = decode(csv);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].hotel_name, "Alpha");
    }

    #[test]
    fn test_truncated_mid_row() {
        let csv = format!("{}\nAlpha Lodge,2026-01-01,available,12", HEADER);
        let records = decode(&csv);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].total_price, Some(12.0));
        assert_eq!(records[0].day_offset, 0);
    }

    #[test]
    fn test_degenerate_inputs() {
        for input in ["", "\n\n", "\"", "\",\"", "\u{feff}", "a,b\n\r\n", ",,,\n,,,"] {
            assert!(decode(input).is_empty(), "input {:?}", input);
        }
    }

    #[test]
    fn test_bom_and_blank_lines() {
        let csv = "\u{feff}hotel_name,check_in_date\n\nAlpha,2026-01-01\n\n";
        let records = decode(csv);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].hotel_name, "Alpha");
    }
}
