//! The worker payload: a single pass over a headered CSV of booking records,
//! counting bookings made by couples per (continent, country, market) group.

use std::io::BufRead;
use std::path::Path;

use crate::Map;

/// Grouping key: (hotel continent, hotel country, hotel market).
pub type GroupKey = (i32, i32, i32);

#[derive(Debug, Default, PartialEq, Eq)]
pub struct BookingSummary {
    /// Up to three most frequent groups, most frequent first.
    pub top_groups: Vec<(GroupKey, u64)>,
    pub bad_records: u64,
}

#[derive(Default)]
struct Columns {
    continent: Option<usize>,
    country: Option<usize>,
    market: Option<usize>,
    adults: Option<usize>,
    booking: Option<usize>,
}

impl Columns {
    fn from_header(header: &str) -> Self {
        let mut columns = Columns::default();
        for (index, name) in header.split(',').enumerate() {
            match name.trim() {
                "hotel_continent" => columns.continent = Some(index),
                "hotel_country" => columns.country = Some(index),
                "hotel_market" => columns.market = Some(index),
                "srch_adults_cnt" => columns.adults = Some(index),
                "is_booking" => columns.booking = Some(index),
                _ => {}
            }
        }
        columns
    }
}

pub fn analyze<R: BufRead>(reader: R) -> crate::Result<BookingSummary> {
    let mut lines = reader.lines();
    let header = lines
        .next()
        .ok_or_else(|| crate::Error::InvalidInput("Input file is empty".to_string()))??;
    let columns = Columns::from_header(&header);

    let mut counts: Map<GroupKey, u64> = Map::new();
    let mut bad_records = 0;

    for line in lines {
        let line = line?;
        let fields: Vec<&str> = line.split(',').collect();
        match parse_row(&columns, &fields) {
            Ok(Some(key)) => *counts.entry(key).or_default() += 1,
            Ok(None) => {}
            Err(()) => bad_records += 1,
        }
    }

    let mut top_groups: Vec<_> = counts.into_iter().collect();
    top_groups.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
    top_groups.truncate(3);

    Ok(BookingSummary {
        top_groups,
        bad_records,
    })
}

/// A row counts when all three group fields are present, the booking flag is
/// set and the search was for exactly two adults (bookings made by couples).
/// Unparsable numeric fields make the whole row a bad record.
fn parse_row(columns: &Columns, fields: &[&str]) -> Result<Option<GroupKey>, ()> {
    let get = |index: Option<usize>| {
        index
            .and_then(|i| fields.get(i))
            .map(|value| value.trim())
            .filter(|value| !value.is_empty())
    };
    let parse = |index: Option<usize>| -> Result<i32, ()> {
        match get(index) {
            Some(value) => value.parse().map_err(|_| ()),
            None => Ok(-1),
        }
    };

    let continent = parse(columns.continent)?;
    let country = parse(columns.country)?;
    let market = parse(columns.market)?;
    let adults = parse(columns.adults)?;
    let booking = parse(columns.booking)? == 1;

    if continent == -1 || country == -1 || market == -1 || adults != 2 || !booking {
        return Ok(None);
    }
    Ok(Some((continent, country, market)))
}

pub fn run_worker(input: &Path) -> crate::Result<()> {
    log::info!("Analyzing booking records in {}", input.display());
    let file = std::fs::File::open(input)?;
    let summary = analyze(std::io::BufReader::new(file))?;

    for ((continent, country, market), count) in &summary.top_groups {
        println!("(({continent},{country},{market}),{count})");
    }
    println!("Amount of bad records: {}", summary.bad_records);
    Ok(())
}
