//! CSV export of extracted tables
use csv::Writer;
use trend_core::{digest, Result, Table, TrendError};

/// Encoded CSV plus what the artifact log needs to know about it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvExport {
    pub bytes: Vec<u8>,
    pub rows: usize,
    pub digest: String,
}

/// Header row of column names, then one record per row. Nulls are empty
/// fields; months are written as `YYYY-MM-DD`.
pub fn table_to_csv(table: &Table) -> Result<CsvExport> {
    let mut wtr = Writer::from_writer(vec![]);

    wtr.write_record(table.column_names())
        .map_err(|e| TrendError::ExportError(format!("CSV header: {}", e)))?;

    for row in 0..table.row_count() {
        let record: Vec<String> = table
            .columns()
            .iter()
            .map(|c| c.values[row].to_field())
            .collect();
        wtr.write_record(&record)
            .map_err(|e| TrendError::ExportError(format!("CSV row {}: {}", row, e)))?;
    }

    let bytes = wtr
        .into_inner()
        .map_err(|e| TrendError::ExportError(format!("CSV writer error: {}", e)))?;

    Ok(CsvExport {
        digest: digest(&bytes),
        rows: table.row_count(),
        bytes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use trend_core::Scalar;

    #[test]
    fn test_export_empty_table_has_header_only() {
        let table = Table::from_rows(["purchase_month", "revenue"], vec![]).unwrap();
        let export = table_to_csv(&table).unwrap();
        assert_eq!(String::from_utf8(export.bytes).unwrap(), "purchase_month,revenue\n");
        assert_eq!(export.rows, 0);
    }

    #[test]
    fn test_export_rows_and_nulls() {
        let table = Table::from_rows(
            ["purchase_month", "is_late", "avg_review_score"],
            vec![
                vec!["2021-01".into(), Scalar::Int(0), Scalar::Float(4.25)],
                vec!["2021-01".into(), Scalar::Int(1), Scalar::Null],
            ],
        )
        .unwrap();
        let export = table_to_csv(&table).unwrap();
        let text = String::from_utf8(export.bytes.clone()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines,
            vec!["purchase_month,is_late,avg_review_score", "2021-01,0,4.25", "2021-01,1,"]
        );
        assert_eq!(export.rows, 2);
        assert!(export.digest.starts_with("blake3:"));
    }

    #[test]
    fn test_digest_tracks_content() {
        let a = Table::from_rows(["x"], vec![vec![Scalar::Int(1)]]).unwrap();
        let b = Table::from_rows(["x"], vec![vec![Scalar::Int(2)]]).unwrap();
        assert_eq!(table_to_csv(&a).unwrap().digest, table_to_csv(&a).unwrap().digest);
        assert_ne!(table_to_csv(&a).unwrap().digest, table_to_csv(&b).unwrap().digest);
    }
}
