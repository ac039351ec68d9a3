//! Seeding a collection from a CSV file of `id,link` rows.

use anyhow::{bail, Context, Result};
use fundwatch_core::CampaignId;
use std::io::Read;
use std::path::Path;

/// Header names accepted for the link column.
const LINK_HEADERS: [&str; 2] = ["link", "url"];

fn reader<R: Read>(source: R) -> csv::Reader<R> {
    csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .comment(Some(b'#'))
        .trim(csv::Trim::All)
        .from_reader(source)
}

/// Parse `id,link` rows.
///
/// Extra columns are ignored. A leading header row whose first field is
/// `id` is skipped, and its `link` (or `url`) column is used for links.
/// Blank rows and `#` comments are ignored; an empty link is stored as no
/// link.
pub fn parse_campaign_csv(contents: &str) -> Result<Vec<(CampaignId, Option<String>)>> {
    parse_rows(reader(contents.as_bytes()))
}

/// Read and parse a CSV file.
pub fn read_campaign_csv(path: &Path) -> Result<Vec<(CampaignId, Option<String>)>> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    parse_rows(reader(file)).with_context(|| format!("in {}", path.display()))
}

fn parse_rows<R: Read>(mut reader: csv::Reader<R>) -> Result<Vec<(CampaignId, Option<String>)>> {
    let mut campaigns = Vec::new();
    let mut link_column = 1;
    let mut first_row = true;

    for row in reader.records() {
        let row = row.context("malformed CSV row")?;
        let line_no = row.position().map_or(0, csv::Position::line);
        if row.iter().all(str::is_empty) {
            continue;
        }

        let id_field = row.get(0).unwrap_or_default();
        if std::mem::take(&mut first_row) && id_field.eq_ignore_ascii_case("id") {
            if let Some(column) = row
                .iter()
                .position(|name| LINK_HEADERS.iter().any(|h| name.eq_ignore_ascii_case(h)))
            {
                link_column = column;
            }
            continue;
        }

        let Ok(raw_id) = id_field.parse::<i64>() else {
            bail!("line {line_no}: '{id_field}' is not a campaign id");
        };
        let id = CampaignId::new(raw_id).with_context(|| format!("line {line_no}"))?;

        let link = row
            .get(link_column)
            .filter(|link| !link.is_empty())
            .map(ToString::to_string);
        campaigns.push((id, link));
    }

    Ok(campaigns)
}
