//! 📄 CSV → [`Table`], shared by the flat-file sources.
//!
//! Header row names the columns. Empty fields are NULL. Short rows are padded,
//! rows longer than the header are malformed. A blank header cell is the
//! unnamed row-index column a dataframe writer leaves behind, and it is dropped.
//! Two columns with the same name are malformed: concatenation matches columns
//! by name, so the second one would overwrite the first.

use std::collections::HashSet;

use crate::common::{Cell, Table};
use crate::error::ChartError;

// -- 🧹 some exporters open with a byte order mark, as a treat
const UTF8_BOM: char = '\u{feff}';

pub(crate) fn parse_csv(origin: &str, content: &str) -> Result<Table, ChartError> {
    let content = content.strip_prefix(UTF8_BOM).unwrap_or(content);
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(content.as_bytes());

    let headers = reader
        .headers()
        .map_err(|e| ChartError::malformed(origin, e))?
        .clone();
    if headers.is_empty() {
        return Err(ChartError::malformed(origin, "no header row"));
    }

    let keep: Vec<bool> = headers.iter().map(|h| !h.trim().is_empty()).collect();
    let columns: Vec<String> = headers
        .iter()
        .zip(&keep)
        .filter(|(_, keep)| **keep)
        .map(|(h, _)| h.trim().to_string())
        .collect();
    if let Some(duplicate) = first_duplicate(&columns) {
        return Err(ChartError::malformed(
            origin,
            format!("column '{duplicate}' appears more than once in the header"),
        ));
    }
    let mut table = Table::with_columns(columns);

    for (line, record) in reader.records().enumerate() {
        let record = record.map_err(|e| ChartError::malformed(origin, e))?;
        if record.len() > headers.len() {
            return Err(ChartError::malformed(
                origin,
                format!(
                    "data row {} has {} fields but the header has {}",
                    line + 1,
                    record.len(),
                    headers.len()
                ),
            ));
        }
        let row: Vec<Cell> = record
            .iter()
            .zip(&keep)
            .filter(|(_, keep)| **keep)
            .map(|(field, _)| (!field.is_empty()).then(|| field.to_string()))
            .collect();
        table.push_row(row);
    }
    Ok(table)
}

fn first_duplicate(columns: &[String]) -> Option<&str> {
    let mut seen = HashSet::new();
    columns
        .iter()
        .map(String::as_str)
        .find(|column| !seen.insert(*column))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn the_one_where_a_plain_chart_parses_into_rows() -> anyhow::Result<()> {
        let table = parse_csv("shazam.csv", "Rank,Artist,Title\n1,Miley Cyrus,Flowers\n2,SZA,Kill Bill\n")?;
        assert_eq!(table.columns(), &["Rank", "Artist", "Title"]);
        assert_eq!(table.row_count(), 2);
        assert_eq!(
            table.column("Title").unwrap_or_default(),
            vec![Some("Flowers"), Some("Kill Bill")]
        );
        Ok(())
    }

    #[test]
    fn the_one_where_empty_fields_become_null_and_short_rows_get_padded() -> anyhow::Result<()> {
        let table = parse_csv("x.csv", "a,b,c\n1,,3\n4\n")?;
        assert_eq!(table.rows()[0], vec![Some("1".into()), None, Some("3".into())]);
        assert_eq!(table.rows()[1], vec![Some("4".into()), None, None]);
        Ok(())
    }

    #[test]
    fn the_one_where_the_dataframe_index_column_is_shown_the_door() -> anyhow::Result<()> {
        let table = parse_csv("spotify.csv", ",track_id,energy\n0,abc,0.5\n")?;
        assert_eq!(table.columns(), &["track_id", "energy"]);
        assert_eq!(table.rows()[0], vec![Some("abc".into()), Some("0.5".into())]);
        Ok(())
    }

    #[test]
    fn the_one_where_quoted_commas_stay_inside_their_cell() -> anyhow::Result<()> {
        let table = parse_csv("x.csv", "Artist,Title\n\"Tyler, The Creator\",\"See You Again\"\n")?;
        assert_eq!(
            table.column("Artist").unwrap_or_default(),
            vec![Some("Tyler, The Creator")]
        );
        Ok(())
    }

    #[test]
    fn the_one_where_a_header_with_twins_is_turned_away() {
        match parse_csv("twins.csv", "x,x\n1,2\n") {
            Err(ChartError::MalformedRecord { origin, reason }) => {
                assert_eq!(origin, "twins.csv");
                assert!(reason.contains("'x'"), "reason was {reason}");
            }
            other => panic!("💀 expected MalformedRecord, got {other:?}"),
        }
        // -- 🧹 trimmed names collide too
        assert!(parse_csv("x.csv", "Rank, Rank\n1,2\n").is_err());
    }

    #[test]
    fn the_one_where_two_blank_index_columns_are_not_twins() -> anyhow::Result<()> {
        let table = parse_csv("x.csv", ",,track_id\n0,0,abc\n")?;
        assert_eq!(table.columns(), &["track_id"]);
        Ok(())
    }

    #[test]
    fn the_one_where_too_many_fields_is_malformed() {
        let outcome = parse_csv("x.csv", "a,b\n1,2,3\n");
        assert!(matches!(outcome, Err(ChartError::MalformedRecord { .. })));
    }

    #[test]
    fn the_one_where_a_header_only_file_is_an_empty_table_not_an_error() -> anyhow::Result<()> {
        let table = parse_csv("x.csv", "\u{feff}Rank,Artist\n")?;
        assert_eq!(table.columns(), &["Rank", "Artist"]);
        assert!(table.is_empty());
        Ok(())
    }

    #[test]
    fn the_one_where_an_empty_file_has_no_header_to_stand_on() {
        let outcome = parse_csv("x.csv", "");
        assert!(matches!(outcome, Err(ChartError::MalformedRecord { .. })));
    }
}
