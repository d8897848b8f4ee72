//! CSV interchange for the inventory table

use shared::{CellValue, InventoryTable, RawTable};

use crate::error::{AppError, AppResult};

/// Reads uploaded CSV and writes the export
pub struct SpreadsheetService;

impl SpreadsheetService {
    /// Parse CSV text into an untyped table. The first record is the header
    /// row; ragged rows are allowed and short rows read as blank cells.
    pub fn parse_csv(body: &str) -> AppResult<RawTable> {
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .trim(csv::Trim::Headers)
            .from_reader(body.as_bytes());

        let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
        if headers.iter().all(|h| h.trim().is_empty()) {
            return Err(AppError::validation("file", "CSV has no header row"));
        }

        let mut raw = RawTable::new(headers);
        for record in reader.records() {
            let record = record?;
            raw.push_row(record.iter().map(|cell| {
                if cell.trim().is_empty() {
                    CellValue::Empty
                } else {
                    CellValue::text(cell)
                }
            }));
        }
        Ok(raw)
    }

    /// Export the active table with headers in reconcile order
    pub fn export_to_csv(table: &InventoryTable) -> AppResult<String> {
        let raw = table.to_raw_table();
        let mut wtr = csv::Writer::from_writer(vec![]);
        wtr.write_record(&raw.columns)?;
        for row in &raw.rows {
            wtr.write_record(row.iter().map(CellValue::display))?;
        }
        let csv_data = String::from_utf8(
            wtr.into_inner()
                .map_err(|e| AppError::Internal(format!("CSV writer error: {}", e)))?,
        )
        .map_err(|e| AppError::Internal(format!("UTF-8 conversion error: {}", e)))?;
        Ok(csv_data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use shared::{reconcile, InventoryRecord};

    #[test]
    fn test_parse_csv_blank_cells() {
        let raw = SpreadsheetService::parse_csv("SKU,QTYAVAILABLE,R1\nA1,,4\nB2,3\n").unwrap();
        assert_eq!(raw.columns, vec!["SKU", "QTYAVAILABLE", "R1"]);
        assert_eq!(raw.row_count(), 2);
        assert_eq!(raw.cell(0, 1), &CellValue::Empty);
        assert_eq!(raw.cell(1, 2), &CellValue::Empty);
    }

    #[test]
    fn test_export_headers_in_reconcile_order() {
        let table = InventoryTable::new(
            vec!["R1".to_string()],
            vec![InventoryRecord::new("A1", "Bolt").with_location("R1", Decimal::from(2))],
        );
        let csv = SpreadsheetService::export_to_csv(&table).unwrap();
        let header = csv.lines().next().unwrap();
        assert_eq!(
            header,
            "SKU,Description,QTYONHOLD,STDCUBE,QTYAVAILABLE,R1,TOTAL,STATUS,DELETED"
        );
    }

    #[test]
    fn test_export_reimports_cleanly() {
        let raw = SpreadsheetService::parse_csv(
            "SKU,Description,QTYAVAILABLE,R1,R2,TOTAL\nA1,Bolt,9,4,5,\nB2,\"Nut, hex\",2,1,1,2\n",
        )
        .unwrap();
        let first = reconcile(&raw, None).unwrap();
        let exported = SpreadsheetService::export_to_csv(&first.table).unwrap();
        let second = reconcile(&SpreadsheetService::parse_csv(&exported).unwrap(), None).unwrap();
        assert_eq!(second.table, first.table);
    }
}
